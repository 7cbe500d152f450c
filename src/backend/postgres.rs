use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use sqlx::postgres::PgPoolOptions;
use sqlx::types::Json;
use sqlx::PgPool;
use std::time::Duration;
use tokio::sync::broadcast;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use super::{
    normalize_email, validate_patch, AuthChange, AuthEvent, AuthUser, Backend, BackendError, NewUser, Session,
    SignUp, Table, AUTH_EVENT_CAPACITY,
};
use crate::auth::password::{hash_password, verify_password};
use crate::auth::{token_digest, Role, TokenIssuer};
use crate::config::DatabaseConfig;
use crate::filter::Query;

const UNIQUE_VIOLATION: &str = "23505";
const FOREIGN_KEY_VIOLATION: &str = "23503";
const CHECK_VIOLATION: &str = "23514";

/// PostgreSQL backend. Rows travel as jsonb (`to_jsonb` out,
/// `jsonb_populate_record` in) so the data API stays schema-agnostic.
pub struct PgBackend {
    pool: PgPool,
    tokens: TokenIssuer,
    events: broadcast::Sender<AuthChange>,
}

impl PgBackend {
    pub async fn connect(config: &DatabaseConfig, tokens: TokenIssuer) -> Result<Self, BackendError> {
        let url = config.url.as_deref().ok_or(BackendError::ConfigMissing("DATABASE_URL"))?;
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(Duration::from_secs(config.connection_timeout))
            .connect(url)
            .await?;
        info!("Created database pool (max {} connections)", config.max_connections);
        Ok(Self::from_pool(pool, tokens))
    }

    pub fn from_pool(pool: PgPool, tokens: TokenIssuer) -> Self {
        let (events, _) = broadcast::channel(AUTH_EVENT_CAPACITY);
        Self { pool, tokens, events }
    }

    pub async fn migrate(&self) -> Result<(), BackendError> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        info!("Database migrations applied");
        Ok(())
    }

    pub async fn close(&self) {
        self.pool.close().await;
        info!("Closed database pool");
    }

    fn emit(&self, change: AuthChange) {
        let _ = self.events.send(change);
    }

    async fn create_account(&self, email: &str, password: &str, full_name: &str, role: Role) -> Result<AuthUser, BackendError> {
        let email = normalize_email(email);
        let password_hash = hash_password(password)?;
        let id = Uuid::new_v4();

        let mut tx = self.pool.begin().await?;
        sqlx::query("INSERT INTO auth_users (id, email, password_hash) VALUES ($1, $2, $3)")
            .bind(id)
            .bind(&email)
            .bind(&password_hash)
            .execute(&mut *tx)
            .await
            .map_err(account_error)?;
        sqlx::query("INSERT INTO profiles (id, full_name, email, role) VALUES ($1, $2, $3, $4)")
            .bind(id)
            .bind(full_name.trim())
            .bind(&email)
            .bind(role.as_str())
            .execute(&mut *tx)
            .await
            .map_err(account_error)?;
        tx.commit().await?;

        info!("Created {} account {}", role, id);
        Ok(AuthUser { id, email })
    }

    async fn live_session(&self, session_id: Uuid, access_token: &str) -> Result<Option<(Uuid, String, DateTime<Utc>)>, BackendError> {
        let row = sqlx::query_as::<_, (Uuid, String, DateTime<Utc>)>(
            "SELECT s.user_id, u.email, s.expires_at \
             FROM auth_sessions s JOIN auth_users u ON u.id = s.user_id \
             WHERE s.id = $1 AND s.token_hash = $2 AND s.revoked_at IS NULL AND s.expires_at > now()",
        )
        .bind(session_id)
        .bind(token_digest(access_token))
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }
}

#[async_trait]
impl Backend for PgBackend {
    async fn get_session(&self, access_token: &str) -> Result<Option<Session>, BackendError> {
        let Ok(claims) = self.tokens.verify(access_token) else {
            return Ok(None);
        };
        let Some((user_id, email, expires_at)) = self.live_session(claims.sid, access_token).await? else {
            return Ok(None);
        };
        Ok(Some(Session {
            id: claims.sid,
            access_token: access_token.to_string(),
            user: AuthUser { id: user_id, email },
            expires_at,
        }))
    }

    async fn sign_in_with_password(&self, email: &str, password: &str) -> Result<Session, BackendError> {
        let email = normalize_email(email);
        let user = sqlx::query_as::<_, (Uuid, String, String)>(
            "SELECT id, email, password_hash FROM auth_users WHERE email = $1",
        )
        .bind(&email)
        .fetch_optional(&self.pool)
        .await?;

        let Some((user_id, email, password_hash)) = user else {
            debug!("Sign-in for unknown email");
            return Err(BackendError::InvalidCredentials);
        };
        if !verify_password(password, &password_hash)? {
            return Err(BackendError::InvalidCredentials);
        }

        let session_id = Uuid::new_v4();
        let issued = self.tokens.issue(session_id, user_id, &email)?;
        sqlx::query("INSERT INTO auth_sessions (id, user_id, token_hash, expires_at) VALUES ($1, $2, $3, $4)")
            .bind(session_id)
            .bind(user_id)
            .bind(token_digest(&issued.token))
            .bind(issued.expires_at())
            .execute(&self.pool)
            .await?;

        let session = Session {
            id: session_id,
            access_token: issued.token.clone(),
            user: AuthUser { id: user_id, email },
            expires_at: issued.expires_at(),
        };
        self.emit(AuthChange {
            event: AuthEvent::SignedIn,
            session_id: Some(session_id),
            user_id,
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
        let revoked = sqlx::query_scalar::<_, Uuid>(
            "UPDATE auth_sessions SET revoked_at = now() \
             WHERE id = $1 AND token_hash = $2 AND revoked_at IS NULL RETURNING user_id",
        )
        .bind(claims.sid)
        .bind(token_digest(access_token))
        .fetch_optional(&self.pool)
        .await?;

        if let Some(user_id) = revoked {
            self.emit(AuthChange {
                event: AuthEvent::SignedOut,
                session_id: Some(claims.sid),
                user_id,
                session: None,
            });
        }
        Ok(())
    }

    async fn refresh_session(&self, access_token: &str) -> Result<Session, BackendError> {
        let claims = self.tokens.verify(access_token).map_err(|_| BackendError::SessionNotFound)?;
        let (user_id, email, _) = self
            .live_session(claims.sid, access_token)
            .await?
            .ok_or(BackendError::SessionNotFound)?;

        let issued = self.tokens.issue(claims.sid, user_id, &email)?;
        sqlx::query("UPDATE auth_sessions SET token_hash = $2, expires_at = $3 WHERE id = $1")
            .bind(claims.sid)
            .bind(token_digest(&issued.token))
            .bind(issued.expires_at())
            .execute(&self.pool)
            .await?;

        let session = Session {
            id: claims.sid,
            access_token: issued.token.clone(),
            user: AuthUser { id: user_id, email },
            expires_at: issued.expires_at(),
        };
        self.emit(AuthChange {
            event: AuthEvent::TokenRefreshed,
            session_id: Some(session.id),
            user_id,
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
        let sql = query.to_select_sql(table.name())?;
        let mut q = sqlx::query_scalar::<_, Value>(&sql.query);
        for param in &sql.params {
            q = q.bind(Json(param));
        }
        Ok(q.fetch_all(&self.pool).await?)
    }

    async fn insert(&self, table: Table, row: Value) -> Result<Value, BackendError> {
        if !row.is_object() {
            return Err(BackendError::InvalidRow("row must be a JSON object".to_string()));
        }
        let sql = format!(
            "INSERT INTO \"{0}\" AS t SELECT * FROM jsonb_populate_record(NULL::\"{0}\", $1) RETURNING to_jsonb(t)",
            table.name()
        );
        sqlx::query_scalar::<_, Value>(&sql)
            .bind(Json(&row))
            .fetch_one(&self.pool)
            .await
            .map_err(data_error)
    }

    async fn update(&self, table: Table, patch: Value, query: &Query) -> Result<Vec<Value>, BackendError> {
        let columns: Vec<String> = validate_patch(&patch)?.keys().cloned().collect();
        let where_sql = query.to_where_sql("to_jsonb(t)", 1)?;
        let sql = update_sql(table, &columns, &where_sql.query);

        let mut q = sqlx::query_scalar::<_, Value>(&sql).bind(Json(&patch));
        for param in &where_sql.params {
            q = q.bind(Json(param));
        }
        let updated = q.fetch_all(&self.pool).await.map_err(data_error)?;

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
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

fn update_sql(table: Table, columns: &[String], where_clause: &str) -> String {
    let assignments: Vec<String> = columns.iter().map(|c| format!("\"{0}\" = p.\"{0}\"", c)).collect();
    format!(
        "UPDATE \"{0}\" AS t SET {1} FROM jsonb_populate_record(NULL::\"{0}\", $1) AS p WHERE {2} RETURNING to_jsonb(t)",
        table.name(),
        assignments.join(", "),
        where_clause
    )
}

fn constraint_code(err: &sqlx::Error) -> Option<String> {
    match err {
        sqlx::Error::Database(db) => db.code().map(|c| c.into_owned()),
        _ => None,
    }
}

fn account_error(err: sqlx::Error) -> BackendError {
    match constraint_code(&err).as_deref() {
        Some(UNIQUE_VIOLATION) => BackendError::AlreadyRegistered,
        _ => err.into(),
    }
}

fn data_error(err: sqlx::Error) -> BackendError {
    match constraint_code(&err).as_deref() {
        Some(UNIQUE_VIOLATION) => BackendError::Conflict("record already exists".to_string()),
        Some(FOREIGN_KEY_VIOLATION) => BackendError::InvalidRow("referenced record does not exist".to_string()),
        Some(CHECK_VIOLATION) => BackendError::InvalidRow("value violates a table constraint".to_string()),
        _ => {
            error!("Data query failed: {}", err);
            err.into()
        }
    }
}
