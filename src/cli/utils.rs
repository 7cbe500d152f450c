use serde_json::{json, Value};
use thiserror::Error;

use crate::cli::OutputFormat;

/// Print a success message; in JSON mode the fields of `data` are merged
/// into the top-level object.
pub fn output_success(output_format: OutputFormat, message: &str, data: Option<Value>) -> anyhow::Result<()> {
    match output_format {
        OutputFormat::Json => {
            let mut response = json!({
                "success": true,
                "message": message
            });
            if let (Some(Value::Object(extra)), Some(target)) = (data, response.as_object_mut()) {
                target.extend(extra);
            }
            println!("{}", serde_json::to_string_pretty(&response)?);
        }
        OutputFormat::Text => {
            println!("✓ {}", message);
            if let Some(Value::Object(fields)) = data {
                for (key, value) in fields {
                    match value {
                        Value::String(s) => println!("  {}: {}", key, s),
                        other => println!("  {}: {}", key, other),
                    }
                }
            }
        }
    }
    Ok(())
}

pub fn output_error(output_format: OutputFormat, message: &str, error_code: Option<&str>) -> anyhow::Result<()> {
    match output_format {
        OutputFormat::Json => {
            let mut response = json!({
                "success": false,
                "error": message
            });
            if let Some(code) = error_code {
                response["error_code"] = json!(code);
            }
            println!("{}", serde_json::to_string_pretty(&response)?);
        }
        OutputFormat::Text => {
            eprintln!("Error: {}", message);
        }
    }
    Ok(())
}

/// A command failure carrying the code shown by `--json` output.
#[derive(Debug, Error)]
#[error("{message}")]
pub struct CommandError {
    pub code: &'static str,
    pub message: String,
}

pub fn command_error(code: &'static str, message: impl Into<String>) -> anyhow::Error {
    CommandError { code, message: message.into() }.into()
}

pub fn error_code(err: &anyhow::Error) -> &'static str {
    err.downcast_ref::<CommandError>().map(|e| e.code).unwrap_or("COMMAND_FAILED")
}
