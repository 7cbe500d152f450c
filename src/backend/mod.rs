//! The hosted auth + data collaborator, behind one trait.
//!
//! Everything the application knows about persistence and identity goes
//! through [`Backend`]: password sign-in, session lookup, the auth-change
//! stream, and select/insert/update over the three tables. The backend is
//! also the trust boundary for who may write what, the way row-level
//! security would be in a hosted service.

pub mod error;
pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::auth::{Role, TokenIssuer};
use crate::config::{AppConfig, BackendKind};
use crate::filter::Query;

pub use error::BackendError;
pub use memory::MemoryBackend;
pub use postgres::PgBackend;

/// Capacity of the auth-change broadcast. Slow listeners past this lag and
/// are told how many events they missed.
pub const AUTH_EVENT_CAPACITY: usize = 256;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Table {
    Profiles,
    Cases,
    Invoices,
}

impl Table {
    pub fn name(self) -> &'static str {
        match self {
            Table::Profiles => "profiles",
            Table::Cases => "cases",
            Table::Invoices => "invoices",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthUser {
    pub id: Uuid,
    pub email: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Session {
    pub id: Uuid,
    #[serde(skip_serializing)]
    pub access_token: String,
    pub user: AuthUser,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuthEvent {
    SignedIn,
    SignedOut,
    TokenRefreshed,
    UserUpdated,
}

/// One entry on the auth-change stream. `session` is present for sign-in and
/// refresh; sign-out names the session by id only.
#[derive(Debug, Clone)]
pub struct AuthChange {
    pub event: AuthEvent,
    pub session_id: Option<Uuid>,
    pub user_id: Uuid,
    pub session: Option<Session>,
}

/// Self-service registration. `requested_role` is advisory: backends only
/// ever grant [`Role::Client`] through this path.
#[derive(Debug, Clone)]
pub struct SignUp {
    pub email: String,
    pub password: String,
    pub full_name: String,
    pub requested_role: Option<Role>,
}

/// Account creation by an administrator, role honoured as given.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub password: String,
    pub full_name: String,
    pub role: Role,
}

#[async_trait]
pub trait Backend: Send + Sync {
    /// Live session for `access_token`, or `None` when it is unknown,
    /// revoked, expired or forged.
    async fn get_session(&self, access_token: &str) -> Result<Option<Session>, BackendError>;

    async fn sign_in_with_password(&self, email: &str, password: &str) -> Result<Session, BackendError>;

    async fn sign_up(&self, request: SignUp) -> Result<AuthUser, BackendError>;

    /// Revokes the session. Unknown tokens are not an error.
    async fn sign_out(&self, access_token: &str) -> Result<(), BackendError>;

    /// Swaps the token of a live session for a fresh one.
    async fn refresh_session(&self, access_token: &str) -> Result<Session, BackendError>;

    async fn admin_create_user(&self, user: NewUser) -> Result<AuthUser, BackendError>;

    fn subscribe(&self) -> broadcast::Receiver<AuthChange>;

    async fn select(&self, table: Table, query: &Query) -> Result<Vec<Value>, BackendError>;

    async fn insert(&self, table: Table, row: Value) -> Result<Value, BackendError>;

    /// Applies `patch` to every row matching `query` and returns the new rows.
    async fn update(&self, table: Table, patch: Value, query: &Query) -> Result<Vec<Value>, BackendError>;

    async fn health_check(&self) -> Result<(), BackendError>;
}

/// Picks the backend named by configuration.
pub async fn connect(config: &AppConfig) -> Result<Arc<dyn Backend>, BackendError> {
    let tokens = TokenIssuer::new(&config.security.jwt_secret, config.security.session_expiry_hours)?;
    match config.backend {
        BackendKind::Memory => {
            tracing::warn!("Using the in-memory backend; data is lost on restart");
            Ok(Arc::new(MemoryBackend::new(tokens)))
        }
        BackendKind::Postgres => {
            let backend = PgBackend::connect(&config.database, tokens).await?;
            backend.migrate().await?;
            Ok(Arc::new(backend))
        }
    }
}

/// Patch keys become column names, so they must be plain identifiers.
pub(crate) fn validate_patch(patch: &Value) -> Result<&serde_json::Map<String, Value>, BackendError> {
    let map = patch
        .as_object()
        .ok_or_else(|| BackendError::InvalidRow("patch must be a JSON object".to_string()))?;
    if map.is_empty() {
        return Err(BackendError::InvalidRow("patch is empty".to_string()));
    }
    if let Some(bad) = map.keys().find(|k| !crate::filter::is_identifier(k) || k.as_str() == "id") {
        return Err(BackendError::InvalidRow(format!("column '{}' cannot be patched", bad)));
    }
    Ok(map)
}

pub(crate) fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}
