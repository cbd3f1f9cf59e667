//! Application state for the Vesper REST API.
//!
//! This module defines the shared application state that is available to all
//! request handlers: the data layer, the API settings, and the server
//! configuration.

use std::sync::Arc;

use vesper_persistence::core::DataLayer;

use crate::config::ServerConfig;
use crate::error::{RestError, RestResult};
use crate::settings::{Resource, Settings};

/// Shared application state for the REST API.
///
/// # Type Parameters
///
/// * `S` - The storage backend type (must implement [`DataLayer`])
///
/// # Example
///
/// ```rust
/// use std::sync::Arc;
/// use vesper_persistence::backends::memory::MemoryBackend;
/// use vesper_rest::{AppState, ServerConfig};
/// use vesper_rest::settings::Settings;
///
/// let state = AppState::new(
///     Arc::new(MemoryBackend::new()),
///     Settings::default(),
///     ServerConfig::default(),
/// );
/// assert_eq!(state.settings().paging_default, 25);
/// ```
pub struct AppState<S> {
    /// The storage backend.
    storage: Arc<S>,

    /// API settings.
    settings: Arc<Settings>,

    /// Server configuration.
    config: Arc<ServerConfig>,
}

// Manually implement Clone since S is wrapped in Arc and doesn't need to be Clone
impl<S> Clone for AppState<S> {
    fn clone(&self) -> Self {
        Self {
            storage: Arc::clone(&self.storage),
            settings: Arc::clone(&self.settings),
            config: Arc::clone(&self.config),
        }
    }
}

impl<S: DataLayer> AppState<S> {
    /// Creates a new AppState.
    pub fn new(storage: Arc<S>, settings: Settings, config: ServerConfig) -> Self {
        Self {
            storage,
            settings: Arc::new(settings),
            config: Arc::new(config),
        }
    }

    /// Returns a reference to the storage backend.
    pub fn storage(&self) -> &S {
        &self.storage
    }

    /// Returns a clone of the storage Arc.
    pub fn storage_arc(&self) -> Arc<S> {
        Arc::clone(&self.storage)
    }

    /// Returns the API settings.
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Returns a reference to the server configuration.
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Resolves a URL segment to a resource, or 404.
    pub fn resource(&self, url: &str) -> RestResult<&Resource> {
        self.settings
            .resource_by_url(url)
            .ok_or_else(|| RestError::NotFound {
                message: format!("Unknown resource: {}", url),
            })
    }
}
