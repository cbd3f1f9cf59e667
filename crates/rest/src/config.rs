//! Server configuration for the Vesper REST API.
//!
//! This module configures the server process: where it listens, how much it
//! accepts, CORS, logging, and which settings file describes the API. What the
//! API serves lives in [`Settings`](crate::settings::Settings).
//!
//! # Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `VESPER_SERVER_PORT` | 5000 | Server port |
//! | `VESPER_SERVER_HOST` | 127.0.0.1 | Host to bind |
//! | `VESPER_LOG_LEVEL` | info | Log level |
//! | `VESPER_SETTINGS` | (none) | Settings file (.toml or .json) |
//! | `VESPER_MAX_BODY_SIZE` | 10485760 | Max request body (bytes) |
//! | `VESPER_REQUEST_TIMEOUT` | 30 | Request timeout (seconds) |
//! | `VESPER_ENABLE_CORS` | true | Enable CORS |
//! | `VESPER_CORS_ORIGINS` | * | Allowed origins |
//! | `VESPER_CORS_METHODS` | GET,POST,PATCH,DELETE,OPTIONS | Allowed methods |
//! | `VESPER_CORS_HEADERS` | see below | Allowed headers |
//!
//! `VESPER_CORS_HEADERS` defaults to
//! `Content-Type,Accept,If-Match,If-None-Match,If-Modified-Since`.
//!
//! # Example
//!
//! ```rust
//! use vesper_rest::ServerConfig;
//!
//! let config = ServerConfig {
//!     port: 3000,
//!     host: "0.0.0.0".to_string(),
//!     ..Default::default()
//! };
//! assert_eq!(config.socket_addr(), "0.0.0.0:3000");
//! ```

use std::path::PathBuf;

use clap::Parser;

/// Server configuration for the Vesper REST API.
#[derive(Debug, Clone, Parser)]
#[command(name = "vesper")]
#[command(about = "Settings-driven REST API server")]
pub struct ServerConfig {
    /// Port to listen on.
    #[arg(short, long, env = "VESPER_SERVER_PORT", default_value = "5000")]
    pub port: u16,

    /// Host address to bind to.
    #[arg(long, env = "VESPER_SERVER_HOST", default_value = "127.0.0.1")]
    pub host: String,

    /// Log level (error, warn, info, debug, trace).
    #[arg(long, env = "VESPER_LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    /// Settings file describing the API domain.
    #[arg(short, long, env = "VESPER_SETTINGS")]
    pub settings: Option<PathBuf>,

    /// Maximum request body size in bytes.
    #[arg(long, env = "VESPER_MAX_BODY_SIZE", default_value = "10485760")]
    pub max_body_size: usize,

    /// Request timeout in seconds.
    #[arg(long, env = "VESPER_REQUEST_TIMEOUT", default_value = "30")]
    pub request_timeout: u64,

    /// Enable CORS.
    #[arg(long, env = "VESPER_ENABLE_CORS", default_value = "true")]
    pub enable_cors: bool,

    /// Allowed CORS origins (comma-separated, or * for all).
    #[arg(long, env = "VESPER_CORS_ORIGINS", default_value = "*")]
    pub cors_origins: String,

    /// Allowed CORS methods (comma-separated, or * for all).
    #[arg(
        long,
        env = "VESPER_CORS_METHODS",
        default_value = "GET,POST,PATCH,DELETE,OPTIONS"
    )]
    pub cors_methods: String,

    /// Allowed CORS headers (comma-separated, or * for all).
    #[arg(
        long,
        env = "VESPER_CORS_HEADERS",
        default_value = "Content-Type,Accept,If-Match,If-None-Match,If-Modified-Since"
    )]
    pub cors_headers: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 5000,
            host: "127.0.0.1".to_string(),
            log_level: "info".to_string(),
            settings: None,
            max_body_size: 10 * 1024 * 1024, // 10MB
            request_timeout: 30,
            enable_cors: true,
            cors_origins: "*".to_string(),
            cors_methods: "GET,POST,PATCH,DELETE,OPTIONS".to_string(),
            cors_headers: "Content-Type,Accept,If-Match,If-None-Match,If-Modified-Since"
                .to_string(),
        }
    }
}

impl ServerConfig {
    /// Creates a new ServerConfig from environment variables.
    pub fn from_env() -> Self {
        Self::try_parse_from(["vesper"]).unwrap_or_default()
    }

    /// Returns the socket address to bind to.
    pub fn socket_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Validates the configuration and returns errors if any.
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        if self.port == 0 {
            errors.push("Port cannot be 0".to_string());
        }

        if self.max_body_size == 0 {
            errors.push("Max body size cannot be 0".to_string());
        }

        if self.request_timeout == 0 {
            errors.push("Request timeout cannot be 0".to_string());
        }

        if let Some(path) = &self.settings
            && !path.is_file()
        {
            errors.push(format!("Settings file {} does not exist", path.display()));
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    /// Creates a configuration suitable for testing.
    pub fn for_testing() -> Self {
        Self {
            port: 0, // Let OS assign port
            host: "127.0.0.1".to_string(),
            log_level: "debug".to_string(),
            settings: None,
            max_body_size: 1024 * 1024,
            request_timeout: 5, // Shorter timeout for tests
            enable_cors: false,
            cors_origins: "*".to_string(),
            cors_methods: "*".to_string(),
            cors_headers: "*".to_string(),
        }
    }
}
