use crate::cli::utils::output_success;
use crate::cli::OutputFormat;
use crate::config::AppConfig;

use super::connect_postgres;

pub async fn handle(config: &AppConfig, output_format: OutputFormat) -> anyhow::Result<()> {
    let backend = connect_postgres(config).await?;
    backend.migrate().await?;
    backend.close().await;
    output_success(output_format, "Migrations applied", None)
}
