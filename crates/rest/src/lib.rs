//! # vesper-rest - settings-driven REST API for document resources
//!
//! This crate serves collections of JSON documents over HTTP. What is served
//! is described by [`Settings`](settings::Settings): the resources of the
//! domain, their URLs, allowed methods, cache policy and schema.
//!
//! ## Features
//!
//! - **Listing**: filtering (`where`), sorting (`sort`) and paging
//!   (`max_results`, `page`) with `next`/`prev` links
//! - **Writes**: keyed inserts, partial updates and deletes, validated against
//!   the resource schema
//! - **Caching**: `Cache-Control`, `Expires`, `Last-Modified` and `ETag`
//!   headers, with conditional GETs answered by `304 Not Modified`
//! - **Concurrency control**: item writes require a matching `If-Match`
//! - **Hypermedia**: every payload carries `{rel, title, href}` links
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use vesper_persistence::backends::memory::MemoryBackend;
//! use vesper_rest::{ServerConfig, create_app_with_config, settings::Settings};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let settings = Settings::from_file("settings.toml")?;
//!     let config = ServerConfig::default();
//!
//!     let app = create_app_with_config(MemoryBackend::new(), settings, config.clone());
//!
//!     let listener = tokio::net::TcpListener::bind(config.socket_addr()).await?;
//!     axum::serve(listener, app).await?;
//!     Ok(())
//! }
//! ```
//!
//! ## API Endpoints
//!
//! | Endpoint | Methods | URL Pattern |
//! |----------|---------|-------------|
//! | home | GET | `[base]/` |
//! | collection | GET, POST, DELETE | `[base]/[url]/` |
//! | item | GET, PATCH, DELETE | `[base]/[url]/[lookup]/` |
//!
//! Each resource enables a subset of the methods; others answer 405. URLs
//! without the trailing slash are redirected with 301.
//!
//! ## Response Envelope
//!
//! Successful responses wrap their payload:
//!
//! ```json
//! {"response": {"contacts": [...], "links": [{"rel": "parent", "title": "home", "href": "..."}]}}
//! ```
//!
//! Writes report a status per document key; rejected documents list their
//! issues as `[message, field]` pairs:
//!
//! ```json
//! {"response": {"key1": {"status": "ERR", "issues": [["unknown field 'x'", "x"]]}}}
//! ```
//!
//! ## Architecture
//!
//! - [`settings`] - API settings and the resource domain
//! - [`validation`] - Schema validation of documents
//! - [`links`] - Hypermedia links
//! - [`error`] - Error types and HTTP mapping
//! - [`config`] - Server configuration
//! - [`state`] - Application state (storage, settings, configuration)
//! - [`handlers`] - HTTP request handlers
//! - [`middleware`] - Conditional request headers
//! - [`extractors`] - Axum extractors for listing parameters and bodies
//! - [`responses`] - Envelope, item rendering and caching headers
//! - [`routing`] - Route configuration

// Enforce documentation
#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

pub mod config;
pub mod error;
pub mod extractors;
pub mod handlers;
pub mod links;
pub mod middleware;
pub mod responses;
pub mod routing;
pub mod settings;
pub mod state;
pub mod validation;

// Re-export commonly used types
pub use config::ServerConfig;
pub use error::{RestError, RestResult};
pub use links::Link;
pub use settings::{Settings, SettingsError};
pub use state::AppState;

use std::sync::Arc;

use axum::{Router, extract::DefaultBodyLimit};
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};
use tracing::info;
use vesper_persistence::core::DataLayer;

/// Creates the Axum application with default server configuration.
///
/// For more control, use [`create_app_with_config`].
pub fn create_app<S>(storage: S, settings: Settings) -> Router
where
    S: DataLayer + Send + Sync + 'static,
{
    create_app_with_config(storage, settings, ServerConfig::default())
}

/// Creates the Axum application with custom configuration.
///
/// # Arguments
///
/// * `storage` - The storage backend to use
/// * `settings` - The API settings
/// * `config` - Server configuration
pub fn create_app_with_config<S>(storage: S, settings: Settings, config: ServerConfig) -> Router
where
    S: DataLayer + Send + Sync + 'static,
{
    create_app_with_state(AppState::new(Arc::new(storage), settings, config))
}

/// Creates the Axum application from an existing state.
///
/// Useful when the caller keeps a handle on the storage, e.g. to seed it.
pub fn create_app_with_state<S>(state: AppState<S>) -> Router
where
    S: DataLayer + Send + Sync + 'static,
{
    let config = state.config().clone();
    info!(
        backend = state.storage().backend_name(),
        resources = state.settings().domain.len(),
        base_uri = %state.settings().base_uri(),
        "Creating REST API server"
    );

    // Build the router with all routes
    let router = routing::create_routes(state);

    // Build middleware stack
    let service_builder = ServiceBuilder::new()
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::with_status_code(
            axum::http::StatusCode::REQUEST_TIMEOUT,
            std::time::Duration::from_secs(config.request_timeout),
        ));

    // Add CORS if enabled
    let router = if config.enable_cors {
        let cors = build_cors_layer(&config);
        router.layer(cors)
    } else {
        router
    };

    // Apply remaining middleware
    router
        .layer(DefaultBodyLimit::max(config.max_body_size))
        .layer(service_builder)
}

/// Builds the CORS layer based on configuration.
fn build_cors_layer(config: &ServerConfig) -> CorsLayer {
    let mut cors = CorsLayer::new();

    // Configure origins
    if config.cors_origins == "*" {
        cors = cors.allow_origin(Any);
    } else {
        let origins: Vec<_> = config
            .cors_origins
            .split(',')
            .filter_map(|s| s.trim().parse().ok())
            .collect();
        cors = cors.allow_origin(origins);
    }

    // Configure methods
    if config.cors_methods == "*" {
        cors = cors.allow_methods(Any);
    } else {
        let methods: Vec<_> = config
            .cors_methods
            .split(',')
            .filter_map(|s| s.trim().parse().ok())
            .collect();
        cors = cors.allow_methods(methods);
    }

    // Configure headers
    if config.cors_headers == "*" {
        cors = cors.allow_headers(Any);
    } else {
        let headers: Vec<_> = config
            .cors_headers
            .split(',')
            .filter_map(|s| s.trim().parse().ok())
            .collect();
        cors = cors.allow_headers(headers);
    }

    cors
}

/// Initializes the tracing subscriber for logging.
///
/// This should be called once at application startup. `RUST_LOG` takes
/// precedence over `level`.
///
/// # Arguments
///
/// * `level` - The log level (error, warn, info, debug, trace)
pub fn init_logging(level: &str) {
    use tracing_subscriber::{EnvFilter, fmt, prelude::*};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "vesper_rest={level},vesper_persistence={level},tower_http=debug"
        ))
    });

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter)
        .init();
}
