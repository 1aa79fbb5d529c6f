use std::net::SocketAddr;
use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use clinqna::config::{Cli, Config};
use clinqna::identity;
use clinqna::remote::{HttpConnector, InMemoryBackend, RemoteConnector};
use clinqna::routes;
use clinqna::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // Parse CLI args and load config
    let cli = Cli::parse();
    let config = Config::load(&cli)?;

    let connector: Arc<dyn RemoteConnector> = match config.backend.url {
        Some(ref url) => {
            tracing::info!("Forum backend: {}", url);
            Arc::new(HttpConnector::new(url))
        }
        None => {
            tracing::warn!("No backend URL configured, using in-memory forum");
            Arc::new(InMemoryBackend::new())
        }
    };

    let provider = identity::from_config(&config.identity)?;

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;
    let app = routes::app(AppState::new(config, connector, provider));

    tracing::info!("Listening on http://{}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
