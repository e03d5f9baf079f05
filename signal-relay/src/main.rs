//! signal-relay binary entry point.
//!
//! Usage:
//! ```bash
//! signal-relay --config signal.toml
//! ```

use anyhow::Context;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;
use webrtc_signal_relay::config::Config;
use webrtc_signal_relay::http;
use webrtc_signal_relay::server::SignalRelay;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config_path = get_config_path();
    let config = if config_path.exists() {
        Config::from_file(&config_path)?
    } else {
        tracing::info!("no config file at {}, using defaults", config_path.display());
        Config::default()
    };

    http::health::init_start_time();

    let bind_address = config.server.bind_address.clone();
    let relay = Arc::new(SignalRelay::new(config));
    let app = http::build_router(relay);

    let listener = tokio::net::TcpListener::bind(&bind_address)
        .await
        .with_context(|| format!("failed to bind {bind_address}"))?;
    tracing::info!("signaling server listening on {bind_address}");

    axum::serve(listener, app).await.context("server error")?;
    Ok(())
}

fn get_config_path() -> PathBuf {
    std::env::args()
        .skip_while(|arg| arg != "--config")
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("signal.toml"))
}
