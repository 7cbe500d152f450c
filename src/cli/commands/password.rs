use anyhow::{anyhow, Context};
use serde_json::json;

use crate::auth::password::hash_password;
use crate::cli::utils::output_success;
use crate::cli::OutputFormat;

pub fn handle(password: Option<String>, output_format: OutputFormat) -> anyhow::Result<()> {
    let password = match password {
        Some(p) => p,
        None => std::env::var("LAWDESK_PASSWORD").context("pass a password or set LAWDESK_PASSWORD")?,
    };
    let hash = hash_password(&password).map_err(|e| anyhow!("hashing failed: {}", e))?;
    output_success(output_format, "Password hashed", Some(json!({ "hash": hash })))
}
