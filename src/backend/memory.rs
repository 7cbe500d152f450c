use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::{json, Value};
use std::collections::HashMap;
use tokio::sync::{broadcast, RwLock};
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::{
    normalize_email, validate_patch, AuthChange, AuthEvent, AuthUser, Backend, BackendError, NewUser, Session,
    SignUp, Table, AUTH_EVENT_CAPACITY,
};
use crate::auth::password::{hash_password, verify_password};
use crate::auth::{token_digest, Role, TokenIssuer};
use crate::filter::Query;

struct StoredUser {
    id: Uuid,
    email: String,
    password_hash: String,
}

struct StoredSession {
    user_id: Uuid,
    token_digest: String,
    expires_at: DateTime<Utc>,
}

#[derive(Default)]
struct MemoryState {
    users: HashMap<Uuid, StoredUser>,
    sessions: HashMap<Uuid, StoredSession>,
    tables: HashMap<Table, Vec<Value>>,
}

impl MemoryState {
    fn rows(&self, table: Table) -> &[Value] {
        self.tables.get(&table).map(Vec::as_slice).unwrap_or(&[])
    }

    fn user_by_email(&self, email: &str) -> Option<&StoredUser> {
        self.users.values().find(|u| u.email == email)
    }

    fn live_session(&self, session_id: Uuid, digest: &str) -> Option<&StoredSession> {
        self.sessions
            .get(&session_id)
            .filter(|s| s.token_digest == digest && s.expires_at > Utc::now())
    }
}

/// Process-local backend. Same contract as the Postgres one; used by the
/// test-suite and by `LAWDESK_BACKEND=memory` deployments.
pub struct MemoryBackend {
    tokens: TokenIssuer,
    events: broadcast::Sender<AuthChange>,
    state: RwLock<MemoryState>,
}

impl MemoryBackend {
    pub fn new(tokens: TokenIssuer) -> Self {
        let (events, _) = broadcast::channel(AUTH_EVENT_CAPACITY);
        Self {
            tokens,
            events,
            state: RwLock::new(MemoryState::default()),
        }
    }

    fn emit(&self, change: AuthChange) {
        // No receivers is fine: nobody is listening yet.
        let _ = self.events.send(change);
    }

    fn issue_session(&self, session_id: Uuid, user: &StoredUser) -> Result<(Session, StoredSession), BackendError> {
        let issued = self.tokens.issue(session_id, user.id, &user.email)?;
        let stored = StoredSession {
            user_id: user.id,
            token_digest: token_digest(&issued.token),
            expires_at: issued.expires_at(),
        };
        let session = Session {
            id: session_id,
            access_token: issued.token.clone(),
            user: AuthUser { id: user.id, email: user.email.clone() },
            expires_at: issued.expires_at(),
        };
        Ok((session, stored))
    }

    async fn create_account(&self, email: &str, password: &str, full_name: &str, role: Role) -> Result<AuthUser, BackendError> {
        let email = normalize_email(email);
        let password_hash = hash_password(password)?;

        let mut state = self.state.write().await;
        let taken = state.user_by_email(&email).is_some()
            || state.rows(Table::Profiles).iter().any(|p| p["email"] == email.as_str());
        if taken {
            return Err(BackendError::AlreadyRegistered);
        }

        let id = Uuid::new_v4();
        state.users.insert(id, StoredUser { id, email: email.clone(), password_hash });
        state.tables.entry(Table::Profiles).or_default().push(json!({
            "id": id,
            "full_name": full_name.trim(),
            "email": email,
            "role": role,
            "created_at": Utc::now(),
        }));

        info!("Created {} account {}", role, id);
        Ok(AuthUser { id, email })
    }
}

#[async_trait]
impl Backend for MemoryBackend {
    async fn get_session(&self, access_token: &str) -> Result<Option<Session>, BackendError> {
        let Ok(claims) = self.tokens.verify(access_token) else {
            return Ok(None);
        };
        let state = self.state.read().await;
        let Some(stored) = state.live_session(claims.sid, &token_digest(access_token)) else {
            return Ok(None);
        };
        let Some(user) = state.users.get(&stored.user_id) else {
            return Ok(None);
        };
        Ok(Some(Session {
            id: claims.sid,
            access_token: access_token.to_string(),
            user: AuthUser { id: user.id, email: user.email.clone() },
            expires_at: stored.expires_at,
        }))
    }

    async fn sign_in_with_password(&self, email: &str, password: &str) -> Result<Session, BackendError> {
        let email = normalize_email(email);
        let mut state = self.state.write().await;
        let Some(user) = state.user_by_email(&email) else {
            debug!("Sign-in for unknown email");
            return Err(BackendError::InvalidCredentials);
        };
        if !verify_password(password, &user.password_hash)? {
            return Err(BackendError::InvalidCredentials);
        }

        let (session, stored) = self.issue_session(Uuid::new_v4(), user)?;
        state.sessions.insert(session.id, stored);
        drop(state);

        self.emit(AuthChange {
            event: AuthEvent::SignedIn,
            session_id: Some(session.id),
            user_id: session.user.id,
            session: Some(session.clone()),
        });
        Ok(session)
    }

    async fn sign_up(&self, request: SignUp) -> Result<AuthUser, BackendError> {
        if request.requested_role.is_some_and(|role| role != Role::Client) {
            warn!("Self sign-up asked for {:?}; granting client", request.requested_role);
        }
        self.create_account(&request.email, &request.password, &request.full_name, Role::Client)
            .await
    }

    async fn sign_out(&self, access_token: &str) -> Result<(), BackendError> {
        let Ok(claims) = self.tokens.verify(access_token) else {
            return Ok(());
        };
        let removed = {
            let mut state = self.state.write().await;
            let digest = token_digest(access_token);
            let owned = state.sessions.get(&claims.sid).is_some_and(|s| s.token_digest == digest);
            if owned {
                state.sessions.remove(&claims.sid)
            } else {
                None
            }
        };
        if let Some(stored) = removed {
            self.emit(AuthChange {
                event: AuthEvent::SignedOut,
                session_id: Some(claims.sid),
                user_id: stored.user_id,
                session: None,
            });
        }
        Ok(())
    }

    async fn refresh_session(&self, access_token: &str) -> Result<Session, BackendError> {
        let claims = self.tokens.verify(access_token).map_err(|_| BackendError::SessionNotFound)?;
        let mut state = self.state.write().await;
        let user_id = state
            .live_session(claims.sid, &token_digest(access_token))
            .map(|s| s.user_id)
            .ok_or(BackendError::SessionNotFound)?;
        let user = state.users.get(&user_id).ok_or(BackendError::SessionNotFound)?;

        let (session, stored) = self.issue_session(claims.sid, user)?;
        state.sessions.insert(session.id, stored);
        drop(state);

        self.emit(AuthChange {
            event: AuthEvent::TokenRefreshed,
            session_id: Some(session.id),
            user_id: session.user.id,
            session: Some(session.clone()),
        });
        Ok(session)
    }

    async fn admin_create_user(&self, user: NewUser) -> Result<AuthUser, BackendError> {
        self.create_account(&user.email, &user.password, &user.full_name, user.role)
            .await
    }

    fn subscribe(&self) -> broadcast::Receiver<AuthChange> {
        self.events.subscribe()
    }

    async fn select(&self, table: Table, query: &Query) -> Result<Vec<Value>, BackendError> {
        query.validate()?;
        let state = self.state.read().await;
        Ok(query.apply(state.rows(table)))
    }

    async fn insert(&self, table: Table, row: Value) -> Result<Value, BackendError> {
        let Some(map) = row.as_object() else {
            return Err(BackendError::InvalidRow("row must be a JSON object".to_string()));
        };
        let Some(id) = map.get("id").filter(|id| !id.is_null()) else {
            return Err(BackendError::InvalidRow("row has no id".to_string()));
        };

        let mut state = self.state.write().await;
        let rows = state.tables.entry(table).or_default();
        if rows.iter().any(|r| &r["id"] == id) {
            return Err(BackendError::Conflict(format!("{} {} already exists", table.name(), id)));
        }
        if table == Table::Profiles {
            let email = map.get("email").cloned().unwrap_or(Value::Null);
            if rows.iter().any(|r| r["email"] == email) {
                return Err(BackendError::Conflict("email already in use".to_string()));
            }
        }
        rows.push(row.clone());
        Ok(row)
    }

    async fn update(&self, table: Table, patch: Value, query: &Query) -> Result<Vec<Value>, BackendError> {
        query.validate()?;
        let patch = validate_patch(&patch)?;

        let mut updated = Vec::new();
        {
            let mut state = self.state.write().await;
            for row in state.tables.entry(table).or_default().iter_mut() {
                if !query.matches(row) {
                    continue;
                }
                if let Some(fields) = row.as_object_mut() {
                    for (key, value) in patch {
                        fields.insert(key.clone(), value.clone());
                    }
                }
                updated.push(row.clone());
            }
        }

        if table == Table::Profiles {
            for row in &updated {
                if let Some(user_id) = row["id"].as_str().and_then(|id| id.parse().ok()) {
                    self.emit(AuthChange {
                        event: AuthEvent::UserUpdated,
                        session_id: None,
                        user_id,
                        session: None,
                    });
                }
            }
        }
        Ok(updated)
    }

    async fn health_check(&self) -> Result<(), BackendError> {
        Ok(())
    }
}
