//! Vesper server
//!
//! Serves the resources described by a settings file over HTTP.

use clap::Parser;
use tracing::{info, warn};
use vesper_persistence::backends::memory::MemoryBackend;
use vesper_rest::{ServerConfig, Settings, create_app_with_config, init_logging};

/// Loads the API settings, falling back to the built-in defaults.
fn load_settings(config: &ServerConfig) -> anyhow::Result<Settings> {
    match &config.settings {
        Some(path) => {
            info!(path = %path.display(), "Loading settings");
            Ok(Settings::from_file(path)?)
        }
        None => {
            warn!("No settings file given, serving an empty domain");
            Ok(Settings::default())
        }
    }
}

/// Starts the Axum HTTP server.
async fn serve(app: axum::Router, config: &ServerConfig) -> anyhow::Result<()> {
    let addr = config.socket_addr();
    info!(address = %addr, "Server listening");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = ServerConfig::parse();
    init_logging(&config.log_level);

    if let Err(errors) = config.validate() {
        for error in &errors {
            eprintln!("Configuration error: {}", error);
        }
        std::process::exit(1);
    }

    let settings = load_settings(&config)?;
    info!(
        port = config.port,
        host = %config.host,
        resources = settings.domain.len(),
        base_uri = %settings.base_uri(),
        "Starting Vesper server"
    );

    let app = create_app_with_config(MemoryBackend::new(), settings, config.clone());
    serve(app, &config).await
}
