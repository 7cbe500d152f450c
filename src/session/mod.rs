//! Session provider: the one owner of signed-in state.
//!
//! The provider subscribes to the backend's auth-change stream and keeps,
//! per live session, the loaded profile and any notices waiting to be shown.
//! Nothing else writes that map. Request handlers only ever see a
//! [`SessionView`] snapshot.
//!
//! Auth actions (`sign_in`, `sign_up`, `sign_out`, `create_user_account`)
//! pass straight through to the backend. A failure is logged, worded as a
//! user-facing notice and handed back to the caller as a [`SessionError`].

pub mod notice;
pub mod view;

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::Utc;
use thiserror::Error;
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::{broadcast, RwLock};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::auth::Role;
use crate::backend::{AuthChange, AuthEvent, AuthUser, Backend, BackendError, NewUser, Session, SignUp, Table};
use crate::filter::Query;
use crate::models::{self, Profile};
use crate::routes::AppRoute;

pub use notice::{Notice, NoticeLevel};
pub use view::{SessionStatus, SessionView};

pub const CREATE_ACCOUNT_DENIED: &str = "Only administrators can create user accounts";

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("{0}")]
    PermissionDenied(String),

    #[error("{notice}")]
    Backend {
        notice: String,
        #[source]
        source: BackendError,
    },
}

impl SessionError {
    fn backend(action: &str, source: BackendError) -> Self {
        error!("{}: {}", action, source);
        SessionError::Backend {
            notice: format!("{}: {}", action, public_message(&source)),
            source,
        }
    }
}

/// Wording safe to show a user; storage details stay in the logs.
pub fn public_message(err: &BackendError) -> String {
    match err {
        BackendError::InvalidCredentials
        | BackendError::AlreadyRegistered
        | BackendError::SessionNotFound
        | BackendError::Conflict(_)
        | BackendError::InvalidRow(_) => err.to_string(),
        _ => "the service is temporarily unavailable".to_string(),
    }
}

const PRUNE_INTERVAL: Duration = Duration::from_secs(60);

const PROFILE_UNAVAILABLE: &str = "Your profile could not be loaded; some pages are unavailable";

/// Navigation and notice that follow an auth event.
pub fn event_effects(event: AuthEvent) -> (Option<AppRoute>, Option<Notice>) {
    match event {
        AuthEvent::SignedIn => (Some(AppRoute::Dashboard), Some(Notice::success("Successfully signed in!"))),
        AuthEvent::SignedOut => (Some(AppRoute::Auth), Some(Notice::success("Signed out"))),
        AuthEvent::TokenRefreshed | AuthEvent::UserUpdated => (None, None),
    }
}

enum EntryState {
    Loading,
    Ready(Option<Profile>),
}

struct SessionEntry {
    session: Session,
    state: EntryState,
    notices: Vec<Notice>,
}

struct Inner {
    backend: Arc<dyn Backend>,
    sessions: RwLock<HashMap<Uuid, SessionEntry>>,
}

pub struct SessionProvider {
    inner: Arc<Inner>,
    listener: Mutex<Option<JoinHandle<()>>>,
}

impl SessionProvider {
    pub fn new(backend: Arc<dyn Backend>) -> Self {
        Self {
            inner: Arc::new(Inner {
                backend,
                sessions: RwLock::new(HashMap::new()),
            }),
            listener: Mutex::new(None),
        }
    }

    /// Subscribes to auth changes and starts applying them. Calling it again
    /// replaces the previous listener.
    pub fn start(&self) {
        let events = self.inner.backend.subscribe();
        let handle = tokio::spawn(listen(self.inner.clone(), events));
        if let Ok(mut slot) = self.listener.lock() {
            if let Some(previous) = slot.replace(handle) {
                previous.abort();
            }
        }
        debug!("Session listener started");
    }

    /// Stops the listener. Cached sessions stay readable.
    pub fn shutdown(&self) {
        if let Ok(mut slot) = self.listener.lock() {
            if let Some(handle) = slot.take() {
                handle.abort();
                debug!("Session listener stopped");
            }
        }
    }

    pub fn is_listening(&self) -> bool {
        self.listener
            .lock()
            .map(|slot| slot.as_ref().is_some_and(|h| !h.is_finished()))
            .unwrap_or(false)
    }

    pub fn backend(&self) -> &Arc<dyn Backend> {
        &self.inner.backend
    }

    /// View for a request carrying `token`. Unknown sessions are restored
    /// from the backend; queued notices move into the returned view.
    pub async fn resolve(&self, token: Option<&str>) -> SessionView {
        let Some(token) = token else {
            return SessionView::anonymous();
        };

        let session = match self.inner.backend.get_session(token).await {
            Ok(Some(session)) => session,
            Ok(None) => {
                self.inner.evict_token(token).await;
                return SessionView::anonymous();
            }
            Err(e) => {
                error!("Session lookup failed: {}", e);
                return SessionView::anonymous();
            }
        };

        {
            let mut sessions = self.inner.sessions.write().await;
            if let Some(entry) = sessions.get_mut(&session.id) {
                entry.session = session.clone();
                return match &entry.state {
                    EntryState::Loading => SessionView::loading(session.id, session.user),
                    EntryState::Ready(profile) => SessionView::active(
                        session.id,
                        session.user,
                        profile.clone(),
                        std::mem::take(&mut entry.notices),
                    ),
                };
            }
        }

        debug!("Restoring session {}", session.id);
        self.inner.load(session.clone(), None).await;
        self.view_of(session.id, session.user).await
    }

    async fn view_of(&self, session_id: Uuid, user: AuthUser) -> SessionView {
        let mut sessions = self.inner.sessions.write().await;
        match sessions.get_mut(&session_id) {
            Some(SessionEntry { state: EntryState::Ready(profile), notices, .. }) => {
                SessionView::active(session_id, user, profile.clone(), std::mem::take(notices))
            }
            Some(_) => SessionView::loading(session_id, user),
            None => SessionView::anonymous(),
        }
    }

    pub async fn sign_in(&self, email: &str, password: &str) -> Result<Session, SessionError> {
        self.inner
            .backend
            .sign_in_with_password(email, password)
            .await
            .map_err(|e| SessionError::backend("Error signing in", e))
    }

    pub async fn sign_up(&self, request: SignUp) -> Result<(AuthUser, Notice), SessionError> {
        let user = self
            .inner
            .backend
            .sign_up(request)
            .await
            .map_err(|e| SessionError::backend("Error signing up", e))?;
        info!("New self-service account {}", user.id);
        Ok((user, Notice::success("Account created! You can now sign in.")))
    }

    /// Revokes the session and forgets it locally without waiting for the
    /// sign-out event to come round.
    pub async fn sign_out(&self, token: &str) -> Result<Notice, SessionError> {
        self.inner
            .backend
            .sign_out(token)
            .await
            .map_err(|e| SessionError::backend("Error signing out", e))?;
        self.inner.evict_token(token).await;
        let (_, notice) = event_effects(AuthEvent::SignedOut);
        Ok(notice.unwrap_or_else(|| Notice::success("Signed out")))
    }

    pub async fn refresh(&self, token: &str) -> Result<Session, SessionError> {
        self.inner
            .backend
            .refresh_session(token)
            .await
            .map_err(|e| SessionError::backend("Error refreshing session", e))
    }

    /// Admin-only. A non-admin caller is refused before the backend is touched.
    pub async fn create_user_account(&self, caller: &SessionView, user: NewUser) -> Result<(AuthUser, Notice), SessionError> {
        if !caller.is_admin() {
            warn!("Account creation refused for {:?}", caller.user_id());
            return Err(SessionError::PermissionDenied(CREATE_ACCOUNT_DENIED.to_string()));
        }
        let email = user.email.clone();
        let created = self
            .inner
            .backend
            .admin_create_user(user)
            .await
            .map_err(|e| SessionError::backend("Error creating user account", e))?;
        Ok((created, Notice::success(format!("Account created for {}", email))))
    }

    /// Applies one auth change synchronously. The listener calls this for
    /// every event; tests call it to skip the channel.
    pub async fn apply(&self, change: AuthChange) {
        self.inner.apply(change).await;
    }

    pub async fn session_count(&self) -> usize {
        self.inner.sessions.read().await.len()
    }
}

impl Drop for SessionProvider {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Drops entries whose session has expired. Expiry happens without an auth
/// event, so nothing else would remove them.
fn prune_expired(sessions: &mut HashMap<Uuid, SessionEntry>) {
    let now = Utc::now();
    let before = sessions.len();
    sessions.retain(|_, entry| entry.session.expires_at > now);
    let pruned = before - sessions.len();
    if pruned > 0 {
        debug!("Pruned {} expired sessions", pruned);
    }
}

async fn listen(inner: Arc<Inner>, mut events: broadcast::Receiver<AuthChange>) {
    let mut sweep = tokio::time::interval(PRUNE_INTERVAL);
    sweep.set_missed_tick_behavior(MissedTickBehavior::Delay);
    loop {
        tokio::select! {
            received = events.recv() => match received {
                Ok(change) => inner.apply(change).await,
                Err(RecvError::Lagged(missed)) => {
                    warn!("Session listener missed {} auth events; dropping cached sessions", missed);
                    inner.sessions.write().await.clear();
                }
                Err(RecvError::Closed) => {
                    debug!("Auth event stream closed");
                    break;
                }
            },
            _ = sweep.tick() => inner.prune_expired().await,
        }
    }
}

impl Inner {
    async fn apply(&self, change: AuthChange) {
        debug!("Auth change {:?} for user {}", change.event, change.user_id);
        let (_, notice) = event_effects(change.event);
        match change.event {
            AuthEvent::SignedIn => {
                if let Some(session) = change.session {
                    self.load(session, notice).await;
                }
            }
            AuthEvent::TokenRefreshed => {
                let Some(session) = change.session else { return };
                let mut sessions = self.sessions.write().await;
                if let Some(entry) = sessions.get_mut(&session.id) {
                    entry.session = session;
                    return;
                }
                drop(sessions);
                self.load(session, None).await;
            }
            AuthEvent::SignedOut => {
                if let Some(session_id) = change.session_id {
                    self.sessions.write().await.remove(&session_id);
                }
            }
            AuthEvent::UserUpdated => self.reload_user(change.user_id).await,
        }
    }

    /// Fetches the session's profile and publishes it. A new entry answers
    /// `Loading` until then; a ready one keeps its profile while it is
    /// re-read. A sign-out that lands mid-fetch wins: the entry is not
    /// resurrected.
    async fn load(&self, session: Session, notice: Option<Notice>) {
        if session.expires_at <= Utc::now() {
            debug!("Not caching expired session {}", session.id);
            return;
        }
        let session_id = session.id;
        let user_id = session.user.id;
        {
            let mut sessions = self.sessions.write().await;
            prune_expired(&mut sessions);
            match sessions.get_mut(&session_id) {
                Some(entry) => entry.session = session,
                None => {
                    sessions.insert(
                        session_id,
                        SessionEntry {
                            session,
                            state: EntryState::Loading,
                            notices: Vec::new(),
                        },
                    );
                }
            }
        }

        let profile = self.fetch_profile(user_id).await;

        let mut sessions = self.sessions.write().await;
        if let Some(entry) = sessions.get_mut(&session_id) {
            if profile.is_none() && matches!(entry.state, EntryState::Loading) {
                entry.notices.push(Notice::error(PROFILE_UNAVAILABLE));
            }
            entry.state = EntryState::Ready(profile);
            entry.notices.extend(notice);
        }
    }

    async fn prune_expired(&self) {
        prune_expired(&mut *self.sessions.write().await);
    }

    async fn reload_user(&self, user_id: Uuid) {
        let affected: Vec<Uuid> = {
            let sessions = self.sessions.read().await;
            sessions
                .iter()
                .filter(|(_, entry)| entry.session.user.id == user_id)
                .map(|(id, _)| *id)
                .collect()
        };
        if affected.is_empty() {
            return;
        }

        let profile = self.fetch_profile(user_id).await;
        let mut sessions = self.sessions.write().await;
        for session_id in affected {
            if let Some(entry) = sessions.get_mut(&session_id) {
                entry.state = EntryState::Ready(profile.clone());
            }
        }
    }

    /// `None` when the row is missing or unreadable; the session then holds
    /// no role.
    async fn fetch_profile(&self, user_id: Uuid) -> Option<Profile> {
        let query = Query::new().eq("id", user_id.to_string()).limit(1);
        let rows = match self.backend.select(Table::Profiles, &query).await {
            Ok(rows) => rows,
            Err(e) => {
                error!("Error fetching profile for {}: {}", user_id, e);
                return None;
            }
        };
        match models::from_rows::<Profile>(rows) {
            Ok(mut profiles) if !profiles.is_empty() => Some(profiles.swap_remove(0)),
            Ok(_) => {
                warn!("No profile row for user {}", user_id);
                None
            }
            Err(e) => {
                error!("Unreadable profile for {}: {}", user_id, e);
                None
            }
        }
    }

    async fn evict_token(&self, token: &str) {
        self.sessions
            .write()
            .await
            .retain(|_, entry| entry.session.access_token != token);
    }
}

/// Role a self-service sign-up asks for; anything unparseable means client.
pub fn requested_role(raw: Option<&str>) -> Option<Role> {
    raw.and_then(|r| r.parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::TokenIssuer;
    use crate::backend::MemoryBackend;
    use async_trait::async_trait;
    use serde_json::Value;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    /// Memory backend that counts account-creation calls and can slow down
    /// or hide profile reads.
    struct CountingBackend {
        inner: MemoryBackend,
        creates: AtomicUsize,
        hide_profiles: bool,
        profile_delay: Duration,
    }

    #[async_trait]
    impl Backend for CountingBackend {
        async fn get_session(&self, token: &str) -> Result<Option<Session>, BackendError> {
            self.inner.get_session(token).await
        }
        async fn sign_in_with_password(&self, email: &str, password: &str) -> Result<Session, BackendError> {
            self.inner.sign_in_with_password(email, password).await
        }
        async fn sign_up(&self, request: SignUp) -> Result<AuthUser, BackendError> {
            self.inner.sign_up(request).await
        }
        async fn sign_out(&self, token: &str) -> Result<(), BackendError> {
            self.inner.sign_out(token).await
        }
        async fn refresh_session(&self, token: &str) -> Result<Session, BackendError> {
            self.inner.refresh_session(token).await
        }
        async fn admin_create_user(&self, user: NewUser) -> Result<AuthUser, BackendError> {
            self.creates.fetch_add(1, Ordering::SeqCst);
            self.inner.admin_create_user(user).await
        }
        fn subscribe(&self) -> broadcast::Receiver<AuthChange> {
            self.inner.subscribe()
        }
        async fn select(&self, table: Table, query: &Query) -> Result<Vec<Value>, BackendError> {
            if table == Table::Profiles {
                tokio::time::sleep(self.profile_delay).await;
                if self.hide_profiles {
                    return Ok(Vec::new());
                }
            }
            self.inner.select(table, query).await
        }
        async fn insert(&self, table: Table, row: Value) -> Result<Value, BackendError> {
            self.inner.insert(table, row).await
        }
        async fn update(&self, table: Table, patch: Value, query: &Query) -> Result<Vec<Value>, BackendError> {
            self.inner.update(table, patch, query).await
        }
        async fn health_check(&self) -> Result<(), BackendError> {
            Ok(())
        }
    }

    fn backend_with_lifetime(hours: u64) -> CountingBackend {
        CountingBackend {
            inner: MemoryBackend::new(TokenIssuer::new("session-test", hours).unwrap()),
            creates: AtomicUsize::new(0),
            hide_profiles: false,
            profile_delay: Duration::ZERO,
        }
    }

    fn counting_backend() -> Arc<CountingBackend> {
        Arc::new(backend_with_lifetime(1))
    }

    fn account(email: &str, role: Role) -> NewUser {
        NewUser {
            email: email.to_string(),
            password: "secret-password".to_string(),
            full_name: "Test User".to_string(),
            role,
        }
    }

    async fn signed_in(provider: &SessionProvider, email: &str, role: Role) -> (Session, SessionView) {
        provider.backend().admin_create_user(account(email, role)).await.unwrap();
        let session = provider.sign_in(email, "secret-password").await.unwrap();
        let view = provider.resolve(Some(&session.access_token)).await;
        (session, view)
    }

    #[tokio::test]
    async fn no_token_is_anonymous() {
        let provider = SessionProvider::new(counting_backend());
        let view = provider.resolve(None).await;
        assert_eq!(view.status(), SessionStatus::Anonymous);
        let view = provider.resolve(Some("garbage")).await;
        assert!(!view.has_session());
    }

    #[tokio::test]
    async fn lawyer_profile_sets_only_the_lawyer_flag() {
        let provider = SessionProvider::new(counting_backend());
        let (_, view) = signed_in(&provider, "lawyer@example.com", Role::Lawyer).await;
        assert_eq!(view.status(), SessionStatus::Active);
        assert!(view.is_lawyer());
        assert!(!view.is_admin());
        assert!(!view.is_client());
    }

    #[tokio::test]
    async fn non_admin_cannot_create_accounts_and_backend_is_untouched() {
        let backend = counting_backend();
        let provider = SessionProvider::new(backend.clone());
        let (_, view) = signed_in(&provider, "lawyer@example.com", Role::Lawyer).await;
        let before = backend.creates.load(Ordering::SeqCst);

        let err = provider
            .create_user_account(&view, account("new@example.com", Role::Client))
            .await
            .unwrap_err();
        assert!(matches!(err, SessionError::PermissionDenied(ref m) if m == CREATE_ACCOUNT_DENIED));
        assert_eq!(backend.creates.load(Ordering::SeqCst), before);

        let err = provider
            .create_user_account(&SessionView::anonymous(), account("new@example.com", Role::Client))
            .await
            .unwrap_err();
        assert!(matches!(err, SessionError::PermissionDenied(_)));
        assert_eq!(backend.creates.load(Ordering::SeqCst), before);
    }

    #[tokio::test]
    async fn admin_creates_accounts_with_a_notice() {
        let backend = counting_backend();
        let provider = SessionProvider::new(backend.clone());
        let (_, admin) = signed_in(&provider, "admin@example.com", Role::Admin).await;

        let (user, notice) = provider
            .create_user_account(&admin, account("clerk@example.com", Role::Lawyer))
            .await
            .unwrap();
        assert_eq!(user.email, "clerk@example.com");
        assert_eq!(notice.message, "Account created for clerk@example.com");

        let err = provider
            .create_user_account(&admin, account("clerk@example.com", Role::Lawyer))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Error creating user account: User already registered");
    }

    #[tokio::test]
    async fn sign_out_clears_profile_and_flags() {
        let provider = SessionProvider::new(counting_backend());
        let (session, view) = signed_in(&provider, "admin@example.com", Role::Admin).await;
        assert!(view.is_admin());

        let notice = provider.sign_out(&session.access_token).await.unwrap();
        assert_eq!(notice.message, "Signed out");
        assert_eq!(provider.session_count().await, 0);

        let after = provider.resolve(Some(&session.access_token)).await;
        assert!(!after.has_session());
        assert!(after.profile().is_none());
        assert!(!after.is_admin() && !after.is_lawyer() && !after.is_client());
        assert_eq!(event_effects(AuthEvent::SignedOut).0, Some(AppRoute::Auth));
    }

    #[tokio::test]
    async fn signed_in_event_queues_a_notice_once() {
        let provider = SessionProvider::new(counting_backend());
        let (session, _) = signed_in(&provider, "client@example.com", Role::Client).await;
        provider
            .apply(AuthChange {
                event: AuthEvent::SignedIn,
                session_id: Some(session.id),
                user_id: session.user.id,
                session: Some(session.clone()),
            })
            .await;

        let view = provider.resolve(Some(&session.access_token)).await;
        assert_eq!(view.notices(), &[Notice::success("Successfully signed in!")]);
        let again = provider.resolve(Some(&session.access_token)).await;
        assert!(again.notices().is_empty());
        assert_eq!(event_effects(AuthEvent::SignedIn).0, Some(AppRoute::Dashboard));
    }

    #[tokio::test]
    async fn missing_profile_leaves_a_roleless_session_with_an_error_notice() {
        let backend = Arc::new(CountingBackend {
            hide_profiles: true,
            ..backend_with_lifetime(1)
        });
        let provider = SessionProvider::new(backend.clone());
        backend.admin_create_user(account("ghost@example.com", Role::Lawyer)).await.unwrap();
        let session = provider.sign_in("ghost@example.com", "secret-password").await.unwrap();

        let view = provider.resolve(Some(&session.access_token)).await;
        assert!(view.has_session());
        assert!(view.profile().is_none());
        assert!(!view.is_lawyer());
        assert_eq!(view.notices(), &[Notice::error(PROFILE_UNAVAILABLE)]);
    }

    #[tokio::test]
    async fn expired_sessions_are_not_kept() {
        let backend = Arc::new(backend_with_lifetime(0));
        let provider = SessionProvider::new(backend.clone());
        provider.start();
        backend.admin_create_user(account("brief@example.com", Role::Client)).await.unwrap();

        let mut tokens = Vec::new();
        for _ in 0..20 {
            tokens.push(provider.sign_in("brief@example.com", "secret-password").await.unwrap().access_token);
        }
        tokio::time::sleep(Duration::from_millis(200)).await;

        assert_eq!(backend.get_session(&tokens[0]).await.unwrap(), None);
        assert_eq!(provider.session_count().await, 0);
        provider.shutdown();
    }

    #[tokio::test]
    async fn abandoned_sessions_are_pruned_once_expired() {
        let provider = SessionProvider::new(counting_backend());
        let user = AuthUser { id: Uuid::new_v4(), email: "gone@example.com".to_string() };
        for _ in 0..5 {
            let session = Session {
                id: Uuid::new_v4(),
                access_token: Uuid::new_v4().to_string(),
                user: user.clone(),
                expires_at: Utc::now() + chrono::Duration::milliseconds(100),
            };
            provider
                .apply(AuthChange {
                    event: AuthEvent::SignedIn,
                    session_id: Some(session.id),
                    user_id: user.id,
                    session: Some(session),
                })
                .await;
        }
        assert_eq!(provider.session_count().await, 5);

        tokio::time::sleep(Duration::from_millis(150)).await;
        let (session, view) = signed_in(&provider, "stays@example.com", Role::Client).await;
        assert!(view.is_client());
        assert_eq!(provider.session_count().await, 1);
        assert!(provider.resolve(Some(&session.access_token)).await.has_session());
    }

    #[tokio::test]
    async fn signed_in_event_keeps_a_ready_session_ready() {
        let backend = Arc::new(CountingBackend {
            profile_delay: Duration::from_millis(300),
            ..backend_with_lifetime(1)
        });
        let provider = Arc::new(SessionProvider::new(backend.clone()));
        let (session, view) = signed_in(&provider, "steady@example.com", Role::Lawyer).await;
        assert!(view.is_lawyer());

        let change = AuthChange {
            event: AuthEvent::SignedIn,
            session_id: Some(session.id),
            user_id: session.user.id,
            session: Some(session.clone()),
        };
        let applying = tokio::spawn({
            let provider = provider.clone();
            async move { provider.apply(change).await }
        });
        tokio::time::sleep(Duration::from_millis(50)).await;

        let during = provider.resolve(Some(&session.access_token)).await;
        assert!(!during.is_loading());
        assert!(during.is_lawyer());
        assert!(during.notices().is_empty());

        applying.await.unwrap();
        let after = provider.resolve(Some(&session.access_token)).await;
        assert_eq!(after.notices(), &[Notice::success("Successfully signed in!")]);
    }

    #[tokio::test]
    async fn listener_applies_events_until_shutdown() {
        let backend = counting_backend();
        let provider = SessionProvider::new(backend.clone());
        provider.start();
        assert!(provider.is_listening());

        backend.admin_create_user(account("c@example.com", Role::Client)).await.unwrap();
        let session = provider.sign_in("c@example.com", "secret-password").await.unwrap();

        let mut delivered = Vec::new();
        for _ in 0..50 {
            let mut view = provider.resolve(Some(&session.access_token)).await;
            delivered.extend(view.take_notices());
            if !delivered.is_empty() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        assert_eq!(delivered, vec![Notice::success("Successfully signed in!")]);

        provider.shutdown();
        assert!(!provider.is_listening());
    }

    #[tokio::test]
    async fn role_change_is_picked_up_on_user_updated() {
        let backend = counting_backend();
        let provider = SessionProvider::new(backend.clone());
        let (session, view) = signed_in(&provider, "p@example.com", Role::Client).await;
        assert!(view.is_client());

        backend
            .update(
                Table::Profiles,
                serde_json::json!({ "role": "lawyer" }),
                &Query::new().eq("id", session.user.id.to_string()),
            )
            .await
            .unwrap();
        provider
            .apply(AuthChange {
                event: AuthEvent::UserUpdated,
                session_id: None,
                user_id: session.user.id,
                session: None,
            })
            .await;

        let view = provider.resolve(Some(&session.access_token)).await;
        assert!(view.is_lawyer());
    }

    #[tokio::test]
    async fn failed_sign_in_is_worded_for_the_user() {
        let provider = SessionProvider::new(counting_backend());
        let err = provider.sign_in("nobody@example.com", "whatever").await.unwrap_err();
        assert_eq!(err.to_string(), "Error signing in: Invalid login credentials");
    }

    #[test]
    fn requested_role_parsing() {
        assert_eq!(requested_role(Some("lawyer")), Some(Role::Lawyer));
        assert_eq!(requested_role(Some("boss")), None);
        assert_eq!(requested_role(None), None);
    }
}
