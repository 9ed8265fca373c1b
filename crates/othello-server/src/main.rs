//! Othello Duel multiplayer game server.

use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod config;
mod hub;
mod protocol;
mod server;

use config::ServerConfig;
use hub::Hub;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = ServerConfig::from_env()?;

    info!("Starting Othello server...");

    let (hub, dispatcher) = Hub::new();
    tokio::spawn(dispatcher.run());

    server::run_server(&config, hub).await
}
