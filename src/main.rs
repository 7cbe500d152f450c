use lawdesk::app::{router, AppState};
use lawdesk::{backend, config};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present so cargo run picks up DATABASE_URL, JWT_SECRET, etc.
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("lawdesk=info,tower_http=info")),
        )
        .init();

    let config = config::config().clone();
    config.validate().map_err(anyhow::Error::msg)?;
    tracing::info!("Starting lawdesk in {:?} mode with the {:?} backend", config.environment, config.backend);

    let backend = backend::connect(&config).await?;
    let bind_addr = config.bind_addr();
    let state = AppState::new(config, backend);
    state.sessions.start();

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    tracing::info!("Listening on http://{}", listener.local_addr()?);

    axum::serve(listener, router(state.clone()))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    state.sessions.shutdown();
    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
