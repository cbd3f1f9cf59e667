//! Test harness setup and request helpers.
//!
//! A [`TestHarness`] owns a fresh application built from a settings file, an
//! in-memory backend seeded with [`fixtures`](crate::fixtures), and an
//! in-process [`TestServer`]. Nothing is shared between harnesses.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

use axum_test::{TestRequest, TestResponse, TestServer};
use http::{HeaderName, HeaderValue, StatusCode};
use serde_json::Value;
use thiserror::Error;
use tracing::debug;
use url::form_urlencoded;
use vesper_persistence::StorageError;
use vesper_persistence::backends::memory::MemoryBackend;
use vesper_persistence::core::DataLayer;
use vesper_rest::settings::Resource;
use vesper_rest::{AppState, ServerConfig, Settings, SettingsError, create_app_with_state};

use crate::fixtures;

/// Settings bundled with the harness.
pub const TEST_SETTINGS: &str = include_str!("../fixtures/testsettings.toml");

/// Errors raised while building a harness.
#[derive(Error, Debug)]
pub enum HarnessError {
    /// The settings could not be loaded.
    #[error("failed to load settings: {0}")]
    Settings(#[from] SettingsError),

    /// Seeding the backend failed.
    #[error("failed to seed fixtures: {0}")]
    Storage(#[from] StorageError),

    /// A configured resource is not part of the domain.
    #[error("resource '{0}' is not in the domain")]
    UnknownResource(String),

    /// The in-process server could not be started.
    #[error("failed to start test server: {0}")]
    Server(String),

    /// The seeded data did not look as expected.
    #[error("unexpected fixture data: {0}")]
    Fixture(String),
}

/// Options for [`TestHarness::with_options`].
#[derive(Debug, Clone)]
pub struct HarnessOptions {
    /// Settings file to load instead of the bundled one.
    pub settings_path: Option<PathBuf>,
    /// Name of the resource seeded with fixtures.
    pub known_resource: String,
    /// Name of a resource left empty.
    pub empty_resource: String,
    /// Number of documents seeded into the known resource.
    pub seed_count: usize,
}

impl Default for HarnessOptions {
    fn default() -> Self {
        Self {
            settings_path: None,
            known_resource: "contacts".to_string(),
            empty_resource: "invoices".to_string(),
            seed_count: fixtures::CONTACT_COUNT,
        }
    }
}

impl HarnessOptions {
    /// Loads settings from `path`.
    pub fn with_settings_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.settings_path = Some(path.into());
        self
    }

    /// Seeds `name` instead of `contacts`.
    pub fn with_known_resource(mut self, name: impl Into<String>) -> Self {
        self.known_resource = name.into();
        self
    }

    /// Uses `name` as the empty resource.
    pub fn with_empty_resource(mut self, name: impl Into<String>) -> Self {
        self.empty_resource = name.into();
        self
    }

    /// Seeds `count` documents.
    pub fn with_seed_count(mut self, count: usize) -> Self {
        self.seed_count = count;
        self
    }
}

/// A parsed API response.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedResponse {
    /// The `response` payload of a 200, otherwise `None`.
    pub body: Option<Value>,
    /// The HTTP status.
    pub status: StatusCode,
}

impl ParsedResponse {
    /// Returns the payload, panicking when there is none.
    pub fn payload(&self) -> &Value {
        match &self.body {
            Some(body) => body,
            None => panic!("Expected a response payload, got status {}", self.status),
        }
    }
}

/// Test harness for a Vesper application.
pub struct TestHarness {
    /// The in-process server.
    pub server: TestServer,
    /// The backend behind the server.
    pub backend: Arc<MemoryBackend>,
    /// The loaded settings.
    pub settings: Arc<Settings>,
    /// Name of the seeded resource.
    pub known_resource: String,
    /// Collection path of the seeded resource, e.g. `/arbitraryurl/`.
    pub known_resource_url: String,
    /// Name of a resource without documents.
    pub empty_resource: String,
    /// A name that is not a resource.
    pub unknown_resource: String,
    /// A well formed identifier no document has.
    pub unknown_item_id: String,
    /// A lookup value no document has.
    pub unknown_item_name: String,
    /// Item path of `unknown_item_id` under the known resource.
    pub unknown_item_id_url: String,
    /// Item path of `unknown_item_name` under the known resource.
    pub unknown_item_name_url: String,
}

impl TestHarness {
    /// Builds a harness from the bundled settings.
    ///
    /// # Panics
    ///
    /// Panics if the harness cannot be built.
    pub async fn setup() -> Self {
        Self::with_options(HarnessOptions::default()).await
    }

    /// Builds a harness with custom options.
    ///
    /// # Panics
    ///
    /// Panics if the harness cannot be built.
    pub async fn with_options(options: HarnessOptions) -> Self {
        match Self::try_with_options(options).await {
            Ok(harness) => harness,
            Err(e) => panic!("Failed to set up test harness: {e}"),
        }
    }

    /// Builds a harness, reporting failures instead of panicking.
    pub async fn try_with_options(options: HarnessOptions) -> Result<Self, HarnessError> {
        let settings = match &options.settings_path {
            Some(path) => Settings::from_file(path)?,
            None => Settings::from_toml_str(TEST_SETTINGS)?,
        };

        let known = settings
            .resource(&options.known_resource)
            .ok_or_else(|| HarnessError::UnknownResource(options.known_resource.clone()))?;
        if settings.resource(&options.empty_resource).is_none() {
            return Err(HarnessError::UnknownResource(options.empty_resource));
        }

        let resource_path = format!("{}/{}", settings.base_path(), known.url);
        let unknown_item_id = "4f46445fc88e201858000000".to_string();
        let unknown_item_name = "unknown".to_string();

        let backend = Arc::new(MemoryBackend::new());
        backend
            .insert_many(
                &options.known_resource,
                fixtures::contacts(options.seed_count, &settings),
            )
            .await?;
        debug!(
            resource = %options.known_resource,
            count = options.seed_count,
            "Seeded test fixtures"
        );

        let state = AppState::new(
            Arc::clone(&backend),
            settings.clone(),
            ServerConfig::for_testing(),
        );
        let server = TestServer::new(create_app_with_state(state))
            .map_err(|e| HarnessError::Server(e.to_string()))?;

        Ok(Self {
            server,
            backend,
            known_resource_url: format!("{}/", resource_path),
            unknown_item_id_url: format!("{}/{}/", resource_path, unknown_item_id),
            unknown_item_name_url: format!("{}/{}/", resource_path, unknown_item_name),
            settings: Arc::new(settings),
            known_resource: options.known_resource,
            empty_resource: options.empty_resource,
            unknown_resource: "unknown".to_string(),
            unknown_item_id,
            unknown_item_name,
        })
    }

    /// The resources of the loaded settings, by name.
    pub fn domain(&self) -> &BTreeMap<String, Resource> {
        &self.settings.domain
    }

    /// Settings of the seeded resource.
    pub fn known(&self) -> &Resource {
        match self.settings.resource(&self.known_resource) {
            Some(resource) => resource,
            None => panic!("Known resource '{}' left the domain", self.known_resource),
        }
    }

    /// Path of an item of `resource`, which may be a resource name or a URL.
    pub fn item_path(&self, resource: &str, item: &str) -> String {
        format!("{}/{}/{}/", self.settings.base_path(), self.url_of(resource), item)
    }

    /// GETs a collection (with `query`, e.g. `?max_results=2`) or one of its
    /// items and parses the response.
    ///
    /// `resource` is mapped to its URL when it names a resource of the domain.
    pub async fn get(&self, resource: &str, query: &str, item: Option<&str>) -> ParsedResponse {
        let path = match item {
            Some(item) => self.item_path(resource, item),
            None => format!(
                "{}/{}/{}",
                self.settings.base_path(),
                self.url_of(resource),
                query
            ),
        };
        let response = self.get_raw(&path, &[]).await;
        Self::parse_response(&response)
    }

    /// PATCHes `data` as JSON and parses the response.
    pub async fn patch(&self, url: &str, data: &Value, headers: &[(&str, &str)]) -> ParsedResponse {
        let request = with_headers(self.server.patch(url), headers).json(data);
        Self::parse_response(&request.await)
    }

    /// POSTs `data` as JSON and parses the response.
    pub async fn post(&self, url: &str, data: &Value) -> ParsedResponse {
        let response = self.server.post(url).json(data).await;
        Self::parse_response(&response)
    }

    /// DELETEs `url` and parses the response.
    pub async fn delete(&self, url: &str, headers: &[(&str, &str)]) -> ParsedResponse {
        let response = with_headers(self.server.delete(url), headers).await;
        Self::parse_response(&response)
    }

    /// GETs a path, which may carry a query string, and returns the raw
    /// response for header checks.
    pub async fn get_raw(&self, path: &str, headers: &[(&str, &str)]) -> TestResponse {
        let (path, query) = match path.split_once('?') {
            Some((path, query)) => (path, query),
            None => (path, ""),
        };
        let mut request = with_headers(self.server.get(path), headers);
        for (key, value) in form_urlencoded::parse(query.as_bytes()) {
            request = request.add_query_param(&key, &value);
        }
        request.await
    }

    /// Extracts the `response` payload of a 200, together with the status.
    pub fn parse_response(response: &TestResponse) -> ParsedResponse {
        let status = response.status_code();
        let body = if status == StatusCode::OK {
            serde_json::from_slice::<Value>(response.as_bytes())
                .ok()
                .and_then(|mut value| value.get_mut("response").map(Value::take))
        } else {
            None
        };
        ParsedResponse { body, status }
    }

    fn url_of<'a>(&'a self, resource: &'a str) -> &'a str {
        self.settings
            .resource(resource)
            .map_or(resource, |r| r.url.as_str())
    }
}

fn with_headers(mut request: TestRequest, headers: &[(&str, &str)]) -> TestRequest {
    for (name, value) in headers {
        let name = match HeaderName::from_bytes(name.as_bytes()) {
            Ok(name) => name,
            Err(_) => panic!("Invalid header name: {name}"),
        };
        let value = match HeaderValue::from_str(value) {
            Ok(value) => value,
            Err(_) => panic!("Invalid value for header {name}: {value}"),
        };
        request = request.add_header(name, value);
    }
    request
}
