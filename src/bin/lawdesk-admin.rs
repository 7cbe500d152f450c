use clap::Parser;
use lawdesk::cli::Cli;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("lawdesk=warn")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    // `run` has already printed the error; verbose mode adds the cause chain.
    if let Err(e) = lawdesk::cli::run(cli).await {
        if matches!(std::env::var("CLI_VERBOSE").as_deref(), Ok("true") | Ok("1")) {
            eprintln!("{e:?}");
        }
        std::process::exit(1);
    }

    Ok(())
}
