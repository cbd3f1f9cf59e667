//! API settings and the resource domain.
//!
//! Settings describe what the API serves: the resources, their URLs, methods,
//! cache policy, schema, and the global conventions (field names, date format,
//! paging). They are loaded from a TOML or JSON file; every key is optional.
//!
//! # Example
//!
//! ```rust
//! use vesper_rest::settings::Settings;
//!
//! let settings = Settings::from_toml_str(r#"
//!     server_name = "api.example.com"
//!
//!     [domain.contacts]
//!     url = "people"
//!     cache_control = "max-age=20,must-revalidate"
//!     item_methods = ["GET", "PATCH"]
//! "#).unwrap();
//!
//! let contacts = settings.resource("contacts").unwrap();
//! assert_eq!(contacts.url, "people");
//! assert_eq!(settings.base_uri(), "http://api.example.com");
//! assert_eq!(settings.resource_by_url("people").unwrap().name, "contacts");
//! ```

mod schema;

use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};

use axum::http::Method;
use chrono::format::{Item, StrftimeItems};
use chrono::{DateTime, NaiveDateTime, Utc};
use regex::Regex;
use serde::Deserialize;
use thiserror::Error;

pub use schema::{FieldSchema, FieldType, Schema};

/// Errors raised while loading settings.
#[derive(Error, Debug)]
pub enum SettingsError {
    /// The settings file could not be read.
    #[error("failed to read settings file {path}: {source}")]
    Io {
        /// The file path.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },

    /// The file extension is neither `.toml` nor `.json`.
    #[error("unsupported settings format for {0}: expected .toml or .json")]
    UnsupportedFormat(PathBuf),

    /// The TOML document is malformed.
    #[error("invalid TOML settings: {0}")]
    Toml(#[from] toml::de::Error),

    /// The JSON document is malformed.
    #[error("invalid JSON settings: {0}")]
    Json(#[from] serde_json::Error),

    /// The settings parsed but are inconsistent.
    #[error("invalid settings: {}", .0.join("; "))]
    Invalid(Vec<String>),
}

/// Settings as written in the settings file.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct RawSettings {
    server_name: String,
    url_protocol: String,
    url_prefix: String,
    api_version: String,
    id_field: String,
    last_updated: String,
    date_created: String,
    etag_field: String,
    date_format: String,
    item_url: String,
    paging_limit: usize,
    paging_default: usize,
    status_ok: String,
    status_err: String,
    cache_control: String,
    cache_expires: u64,
    resource_methods: Vec<String>,
    item_methods: Vec<String>,
    domain: BTreeMap<String, RawResource>,
}

impl Default for RawSettings {
    fn default() -> Self {
        Self {
            server_name: "localhost:5000".to_string(),
            url_protocol: "http".to_string(),
            url_prefix: String::new(),
            api_version: String::new(),
            id_field: "_id".to_string(),
            last_updated: "updated".to_string(),
            date_created: "created".to_string(),
            etag_field: "etag".to_string(),
            date_format: "%a, %d %b %Y %H:%M:%S UTC".to_string(),
            item_url: "[a-f0-9]{24}".to_string(),
            paging_limit: 50,
            paging_default: 25,
            status_ok: "OK".to_string(),
            status_err: "ERR".to_string(),
            cache_control: String::new(),
            cache_expires: 0,
            resource_methods: vec!["GET".to_string()],
            item_methods: vec!["GET".to_string()],
            domain: BTreeMap::new(),
        }
    }
}

/// Resource settings as written in the settings file.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct RawResource {
    url: Option<String>,
    item_title: Option<String>,
    cache_control: Option<String>,
    cache_expires: Option<u64>,
    resource_methods: Option<Vec<String>>,
    item_methods: Option<Vec<String>>,
    item_lookup: bool,
    additional_lookup: Option<RawLookup>,
    schema: Schema,
}

impl Default for RawResource {
    fn default() -> Self {
        Self {
            url: None,
            item_title: None,
            cache_control: None,
            cache_expires: None,
            resource_methods: None,
            item_methods: None,
            item_lookup: true,
            additional_lookup: None,
            schema: Schema::new(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawLookup {
    url: String,
    field: String,
}

/// A secondary way to address items, e.g. `/contacts/<ref>/`.
#[derive(Debug, Clone)]
pub struct AdditionalLookup {
    /// Pattern the lookup segment must fully match.
    pub pattern: Regex,
    /// Content field the segment is compared with.
    pub field: String,
}

/// A fully resolved resource of the domain.
#[derive(Debug, Clone)]
pub struct Resource {
    /// Resource name (the domain key and the list key in responses).
    pub name: String,
    /// URL segment.
    pub url: String,
    /// Title of item self links and the item key in responses.
    pub item_title: String,
    /// Cache-Control policy; empty means no header.
    pub cache_control: String,
    /// Seconds added to the response time for the Expires header.
    pub cache_expires: u64,
    /// Methods allowed on the collection endpoint.
    pub resource_methods: Vec<Method>,
    /// Methods allowed on the item endpoint.
    pub item_methods: Vec<Method>,
    /// Items are addressable by identifier.
    pub item_lookup: bool,
    /// Secondary item lookup.
    pub additional_lookup: Option<AdditionalLookup>,
    /// Document schema; empty accepts any document.
    pub schema: Schema,
}

impl Resource {
    /// Returns whether the collection endpoint accepts `method`.
    pub fn allows_resource_method(&self, method: &Method) -> bool {
        self.resource_methods.contains(method)
    }

    /// Returns whether the item endpoint accepts `method`.
    pub fn allows_item_method(&self, method: &Method) -> bool {
        self.item_methods.contains(method)
    }

    /// Returns the names of fields declared unique.
    pub fn unique_fields(&self) -> impl Iterator<Item = &str> {
        self.schema
            .iter()
            .filter(|(_, rules)| rules.unique)
            .map(|(name, _)| name.as_str())
    }
}

/// Resolved API settings.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Host (and port) part of the base URI.
    pub server_name: String,
    /// Scheme of the base URI.
    pub url_protocol: String,
    /// Path prefix of every route.
    pub url_prefix: String,
    /// Version segment after the prefix.
    pub api_version: String,
    /// Identifier field name in rendered items.
    pub id_field: String,
    /// Last-updated field name in rendered items.
    pub last_updated: String,
    /// Creation field name in rendered items.
    pub date_created: String,
    /// Etag field name in rendered items.
    pub etag_field: String,
    /// strftime format for rendered dates.
    pub date_format: String,
    /// Identifier pattern as configured.
    pub item_url_pattern: String,
    /// Identifier pattern anchored for full matches.
    pub item_url: Regex,
    /// Maximum page size.
    pub paging_limit: usize,
    /// Default page size.
    pub paging_default: usize,
    /// Status of successful document writes.
    pub status_ok: String,
    /// Status of rejected document writes.
    pub status_err: String,
    /// Resources by name.
    pub domain: BTreeMap<String, Resource>,
}

impl Default for Settings {
    fn default() -> Self {
        Self::resolve(RawSettings::default()).expect("built-in settings are valid")
    }
}

impl Settings {
    /// Loads settings from a `.toml` or `.json` file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, SettingsError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| SettingsError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        match path.extension().and_then(|ext| ext.to_str()) {
            Some("toml") => Self::from_toml_str(&text),
            Some("json") => Self::from_json_str(&text),
            _ => Err(SettingsError::UnsupportedFormat(path.to_path_buf())),
        }
    }

    /// Parses TOML settings.
    pub fn from_toml_str(text: &str) -> Result<Self, SettingsError> {
        let raw: RawSettings = toml::from_str(text)?;
        Self::resolve(raw)
    }

    /// Parses JSON settings.
    pub fn from_json_str(text: &str) -> Result<Self, SettingsError> {
        let raw: RawSettings = serde_json::from_str(text)?;
        Self::resolve(raw)
    }

    fn resolve(raw: RawSettings) -> Result<Self, SettingsError> {
        let mut errors = Vec::new();

        if raw.paging_default == 0 {
            errors.push("paging_default cannot be 0".to_string());
        }
        if raw.paging_default > raw.paging_limit {
            errors.push("paging_default cannot exceed paging_limit".to_string());
        }
        if StrftimeItems::new(&raw.date_format).any(|item| matches!(item, Item::Error)) {
            errors.push(format!("date_format '{}' is not a valid format", raw.date_format));
        }
        let item_url = compile_full_match("item_url", &raw.item_url, &mut errors);

        let default_resource_methods =
            parse_methods("resource_methods", &raw.resource_methods, RESOURCE_METHODS, &mut errors);
        let default_item_methods =
            parse_methods("item_methods", &raw.item_methods, ITEM_METHODS, &mut errors);

        let mut domain = BTreeMap::new();
        let mut urls = HashSet::new();
        for (name, resource) in raw.domain {
            let url = resource.url.unwrap_or_else(|| name.clone());
            let url = url.trim_matches('/').to_string();
            if url.is_empty() || url.contains('/') {
                errors.push(format!("resource '{}' has invalid url '{}'", name, url));
            }
            if !urls.insert(url.clone()) {
                errors.push(format!("resource url '{}' is used more than once", url));
            }

            let resource_methods = match &resource.resource_methods {
                Some(methods) => parse_methods(
                    &format!("{}.resource_methods", name),
                    methods,
                    RESOURCE_METHODS,
                    &mut errors,
                ),
                None => default_resource_methods.clone(),
            };
            let item_methods = match &resource.item_methods {
                Some(methods) => parse_methods(
                    &format!("{}.item_methods", name),
                    methods,
                    ITEM_METHODS,
                    &mut errors,
                ),
                None => default_item_methods.clone(),
            };

            let additional_lookup = resource.additional_lookup.and_then(|lookup| {
                compile_full_match(
                    &format!("{}.additional_lookup.url", name),
                    &lookup.url,
                    &mut errors,
                )
                .map(|pattern| AdditionalLookup {
                    pattern,
                    field: lookup.field,
                })
            });

            let item_title = resource
                .item_title
                .unwrap_or_else(|| name.strip_suffix('s').unwrap_or(&name).to_string());

            domain.insert(
                name.clone(),
                Resource {
                    name,
                    url,
                    item_title,
                    cache_control: resource
                        .cache_control
                        .unwrap_or_else(|| raw.cache_control.clone()),
                    cache_expires: resource.cache_expires.unwrap_or(raw.cache_expires),
                    resource_methods,
                    item_methods,
                    item_lookup: resource.item_lookup,
                    additional_lookup,
                    schema: resource.schema,
                },
            );
        }

        match item_url {
            Some(item_url) if errors.is_empty() => Ok(Self {
                server_name: raw.server_name,
                url_protocol: raw.url_protocol,
                url_prefix: raw.url_prefix.trim_matches('/').to_string(),
                api_version: raw.api_version.trim_matches('/').to_string(),
                id_field: raw.id_field,
                last_updated: raw.last_updated,
                date_created: raw.date_created,
                etag_field: raw.etag_field,
                date_format: raw.date_format,
                item_url_pattern: raw.item_url,
                item_url,
                paging_limit: raw.paging_limit,
                paging_default: raw.paging_default,
                status_ok: raw.status_ok,
                status_err: raw.status_err,
                domain,
            }),
            _ => Err(SettingsError::Invalid(errors)),
        }
    }

    /// Returns the route prefix, e.g. `/api/v1`, or an empty string.
    pub fn base_path(&self) -> String {
        [self.url_prefix.as_str(), self.api_version.as_str()]
            .iter()
            .filter(|part| !part.is_empty())
            .fold(String::new(), |path, part| format!("{}/{}", path, part))
    }

    /// Returns the absolute URI of the API root, without a trailing slash.
    pub fn base_uri(&self) -> String {
        format!("{}://{}{}", self.url_protocol, self.server_name, self.base_path())
    }

    /// Returns the absolute URI of the API root, with a trailing slash.
    pub fn home_uri(&self) -> String {
        format!("{}/", self.base_uri())
    }

    /// Returns the absolute URI of a resource collection, with a trailing slash.
    pub fn resource_uri(&self, resource: &Resource) -> String {
        format!("{}/{}/", self.base_uri(), resource.url)
    }

    /// Returns a resource by name.
    pub fn resource(&self, name: &str) -> Option<&Resource> {
        self.domain.get(name)
    }

    /// Returns the resource served under a URL segment.
    pub fn resource_by_url(&self, url: &str) -> Option<&Resource> {
        self.domain.values().find(|resource| resource.url == url)
    }

    /// Formats a timestamp with the configured date format.
    pub fn format_date(&self, date: DateTime<Utc>) -> String {
        date.format(&self.date_format).to_string()
    }

    /// Parses a string written in the configured date format.
    pub fn parse_date(&self, value: &str) -> Option<DateTime<Utc>> {
        NaiveDateTime::parse_from_str(value, &self.date_format)
            .ok()
            .map(|naive| naive.and_utc())
    }
}

const RESOURCE_METHODS: &[Method] = &[Method::GET, Method::POST, Method::DELETE];
const ITEM_METHODS: &[Method] = &[Method::GET, Method::PATCH, Method::DELETE];

fn parse_methods(
    key: &str,
    names: &[String],
    supported: &[Method],
    errors: &mut Vec<String>,
) -> Vec<Method> {
    let mut methods = Vec::new();
    for name in names {
        match supported
            .iter()
            .find(|method| method.as_str().eq_ignore_ascii_case(name))
        {
            Some(method) => methods.push(method.clone()),
            None => errors.push(format!("{}: method '{}' is not supported", key, name)),
        }
    }
    methods
}

fn compile_full_match(key: &str, pattern: &str, errors: &mut Vec<String>) -> Option<Regex> {
    match Regex::new(&format!("^(?:{})$", pattern)) {
        Ok(regex) => Some(regex),
        Err(e) => {
            errors.push(format!("{}: invalid pattern '{}': {}", key, pattern, e));
            None
        }
    }
}
