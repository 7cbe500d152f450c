pub mod commands;
pub mod utils;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "lawdesk-admin")]
#[command(about = "Lawdesk operator CLI - migrations and account bootstrap")]
#[command(version)]
pub struct Cli {
    #[arg(long, global = true, help = "Output in JSON format")]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    #[command(about = "Apply pending Postgres migrations")]
    Migrate,

    #[command(about = "Create an administrator account")]
    CreateAdmin {
        #[arg(long)]
        email: String,

        #[arg(long, help = "Full name shown in the app")]
        name: String,

        #[arg(long, help = "Generated and printed when omitted")]
        password: Option<String>,
    },

    #[command(about = "Print the Argon2 PHC hash of a password")]
    HashPassword {
        #[arg(help = "Read from LAWDESK_PASSWORD when omitted")]
        password: Option<String>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Text,
    Json,
}

impl OutputFormat {
    pub fn from_cli(cli: &Cli) -> Self {
        if cli.json {
            OutputFormat::Json
        } else {
            OutputFormat::Text
        }
    }
}

/// Runs one command. A failure is printed here, once, in the chosen output
/// format before it is handed back for the exit status.
pub async fn run(cli: Cli) -> anyhow::Result<()> {
    let output_format = OutputFormat::from_cli(&cli);
    let config = crate::config::config();

    let result = match cli.command {
        Commands::Migrate => commands::migrate::handle(config, output_format).await,
        Commands::CreateAdmin { email, name, password } => {
            commands::admin::handle(config, email, name, password, output_format).await
        }
        Commands::HashPassword { password } => commands::password::handle(password, output_format),
    };
    if let Err(e) = &result {
        utils::output_error(output_format, &e.to_string(), Some(utils::error_code(e)))?;
    }
    result
}
