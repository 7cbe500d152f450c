pub mod admin;
pub mod migrate;
pub mod password;

use crate::auth::TokenIssuer;
use crate::backend::PgBackend;
use crate::cli::utils::command_error;
use crate::config::AppConfig;

/// Postgres backend for operator commands, whatever `LAWDESK_BACKEND` says:
/// the in-memory store has nothing to migrate or bootstrap.
pub(crate) async fn connect_postgres(config: &AppConfig) -> anyhow::Result<PgBackend> {
    if config.database.url.is_none() {
        return Err(command_error("DATABASE_URL_MISSING", "DATABASE_URL is not set"));
    }
    let tokens = TokenIssuer::new(&config.security.jwt_secret, config.security.session_expiry_hours)?;
    Ok(PgBackend::connect(&config.database, tokens).await?)
}
