use serde_json::json;
use uuid::Uuid;

use crate::auth::password::validate_password_length;
use crate::auth::Role;
use crate::backend::{Backend, NewUser};
use crate::cli::utils::{command_error, output_success};
use crate::cli::OutputFormat;
use crate::config::AppConfig;

use super::connect_postgres;

/// Bootstraps an administrator. Account creation over HTTP needs an admin
/// session, so the first one has to come from here.
pub async fn handle(
    config: &AppConfig,
    email: String,
    name: String,
    password: Option<String>,
    output_format: OutputFormat,
) -> anyhow::Result<()> {
    let generated = password.is_none();
    let password = password.unwrap_or_else(|| Uuid::new_v4().simple().to_string());
    validate_password_length(&password, config.auth.min_password_length)
        .map_err(|msg| command_error("PASSWORD_TOO_SHORT", msg))?;

    let backend = connect_postgres(config).await?;
    backend.migrate().await?;

    let user = NewUser {
        email: email.trim().to_string(),
        password: password.clone(),
        full_name: name.trim().to_string(),
        role: Role::Admin,
    };
    let created = match backend.admin_create_user(user).await {
        Ok(created) => created,
        Err(e) => {
            backend.close().await;
            return Err(command_error("CREATE_FAILED", e.to_string()));
        }
    };
    backend.close().await;
    tracing::info!("Administrator {} created", created.id);

    let mut data = json!({ "id": created.id, "email": created.email });
    if generated {
        data["password"] = json!(password);
    }
    output_success(output_format, "Administrator created", Some(data))
}
