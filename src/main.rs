//! `brtax-server` - HTTP server for the tax engine.
//!
//! Environment:
//!
//! - `BRTAX_CONFIG_DIR` - rate configuration directory (default `./config/statutory`)
//! - `BRTAX_BIND_ADDR` - listen address (default `0.0.0.0:3000`)
//! - `RUST_LOG` - log filter (default `info`)

use std::net::SocketAddr;

use brtax_engine::api::{AppState, create_router};
use brtax_engine::config::ConfigLoader;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

const DEFAULT_CONFIG_DIR: &str = "./config/statutory";
const DEFAULT_BIND_ADDR: &str = "0.0.0.0:3000";

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config_dir =
        std::env::var("BRTAX_CONFIG_DIR").unwrap_or_else(|_| DEFAULT_CONFIG_DIR.to_string());
    let config = ConfigLoader::load(&config_dir).map_err(|e| {
        error!(path = %config_dir, error = %e, "Failed to load rate configuration");
        e
    })?;
    info!(
        path = %config_dir,
        schedule = %config.metadata().name,
        version = %config.metadata().version,
        overrides = config.overrides().len(),
        "Configuration loaded"
    );

    let addr: SocketAddr = std::env::var("BRTAX_BIND_ADDR")
        .unwrap_or_else(|_| DEFAULT_BIND_ADDR.to_string())
        .parse()?;

    let app = create_router(AppState::new(config));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, "brtax-server listening");
    axum::serve(listener, app).await?;

    Ok(())
}
