//! Item endpoint handlers.
//!
//! - `GET [base]/[url]/[lookup]/` - Read an item
//! - `PATCH [base]/[url]/[lookup]/` - Change an item
//! - `DELETE [base]/[url]/[lookup]/` - Remove an item
//!
//! `lookup` is either an identifier matching the `item_url` pattern or, for
//! resources with an additional lookup, a value of the lookup field.

use axum::{
    Json,
    body::Bytes,
    extract::{Path, State},
    http::{HeaderMap, Method, StatusCode, header},
    response::{IntoResponse, Response},
};
use chrono::Utc;
use serde_json::{Map, Value, json};
use tracing::{debug, info};
use vesper_persistence::core::DataLayer;
use vesper_persistence::types::{Condition, DocumentField, Filter, StoredDocument};

use crate::error::{RestError, RestResult};
use crate::extractors::DocumentBody;
use crate::links::Link;
use crate::middleware::conditional::ConditionalHeaders;
use crate::responses::{ResponseHeaders, envelope, render_document, write_err, write_ok};
use crate::settings::{Resource, Settings};
use crate::state::AppState;
use crate::validation::{ValidationMode, Validator, unique_issues};

fn ensure_allowed(resource: &Resource, method: Method) -> RestResult<()> {
    if resource.allows_item_method(&method) {
        Ok(())
    } else {
        Err(RestError::MethodNotAllowed {
            method,
            allowed: resource.item_methods.clone(),
        })
    }
}

/// Finds the item addressed by `lookup`, or 404.
pub async fn find_item<S>(
    storage: &S,
    settings: &Settings,
    resource: &Resource,
    lookup: &str,
) -> RestResult<StoredDocument>
where
    S: DataLayer + ?Sized,
{
    let found = if resource.item_lookup && settings.item_url.is_match(lookup) {
        storage.find_by_id(&resource.name, lookup).await?
    } else if let Some(additional) = resource
        .additional_lookup
        .as_ref()
        .filter(|additional| additional.pattern.is_match(lookup))
    {
        let filter = Filter::new().and(Condition::eq(
            DocumentField::Content(additional.field.clone()),
            lookup,
        ));
        storage.find_one(&resource.name, &filter).await?
    } else {
        None
    };

    found.ok_or_else(|| RestError::item_not_found(&resource.name, lookup))
}

/// Returns the If-Match value, or 403 when it is missing.
fn required_etag(conditional: &ConditionalHeaders) -> RestResult<&str> {
    conditional.if_match().ok_or_else(|| RestError::Forbidden {
        message: "An If-Match header is required to change an item".to_string(),
    })
}

fn ensure_etag(document: &StoredDocument, etag: &str) -> RestResult<()> {
    if document.matches_etag(etag) {
        Ok(())
    } else {
        Err(RestError::PreconditionFailed {
            message: format!("ETag {} does not match the current item", etag),
        })
    }
}

/// Handler for reading an item.
///
/// # Response
///
/// - `200 OK` - `{"response": {"<item_title>": item, "links": [home, collection]}}`
/// - `304 Not Modified` - If-None-Match or If-Modified-Since matched
/// - `404 Not Found` - No such item
pub async fn get_item_handler<S>(
    State(state): State<AppState<S>>,
    Path((url, lookup)): Path<(String, String)>,
    conditional: ConditionalHeaders,
) -> RestResult<Response>
where
    S: DataLayer + Send + Sync,
{
    let settings = state.settings();
    let resource = state.resource(&url)?;
    ensure_allowed(resource, Method::GET)?;

    debug!(resource = %resource.name, lookup = %lookup, "Processing item read");
    let document = find_item(state.storage(), settings, resource, &lookup).await?;

    if conditional.is_not_modified(&document) {
        debug!(id = %document.id(), "Returning 304 Not Modified");
        return Ok(StatusCode::NOT_MODIFIED.into_response());
    }

    let headers = ResponseHeaders::cached(resource, Utc::now())
        .with_last_modified(Some(document.updated()))
        .with_etag(document.etag());

    let mut payload = Map::new();
    payload.insert(
        resource.item_title.clone(),
        render_document(settings, resource, &document),
    );
    payload.insert(
        "links".to_string(),
        serde_json::to_value([Link::home(settings), Link::collection(settings, resource)])?,
    );

    Ok((
        StatusCode::OK,
        headers.to_header_map(),
        Json(envelope(Value::Object(payload))),
    )
        .into_response())
}

/// Handler for changing an item.
///
/// The body is `{"<key>": {changes}}`; only the first key is used.
///
/// # Response
///
/// - `200 OK` - `{"response": {"<key>": {"status": "OK", ..}}}`, or
///   `{"status": "ERR", "issues": [..]}` when the changes are rejected
/// - `400 Bad Request` - Empty body or changes that are not an object
/// - `403 Forbidden` - If-Match is missing
/// - `404 Not Found` - No such item
/// - `412 Precondition Failed` - If-Match does not match the item's etag
pub async fn patch_item_handler<S>(
    State(state): State<AppState<S>>,
    Path((url, lookup)): Path<(String, String)>,
    conditional: ConditionalHeaders,
    headers: HeaderMap,
    body: Bytes,
) -> RestResult<Response>
where
    S: DataLayer + Send + Sync,
{
    let settings = state.settings();
    let resource = state.resource(&url)?;
    ensure_allowed(resource, Method::PATCH)?;

    debug!(resource = %resource.name, lookup = %lookup, "Processing item patch");
    let document = find_item(state.storage(), settings, resource, &lookup).await?;
    let etag = required_etag(&conditional)?;

    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("application/json");
    let body = DocumentBody::parse(content_type, &body)?;
    let (key, changes) = body.first().ok_or_else(|| RestError::BadRequest {
        message: "Request body must contain a document key".to_string(),
    })?;
    let changes = changes.as_object().ok_or_else(|| RestError::BadRequest {
        message: format!("Value of '{}' must be a JSON object", key),
    })?;

    ensure_etag(&document, etag)?;

    let validator = Validator::new(&resource.schema, &settings.date_format);
    let mut issues = validator.validate(changes, ValidationMode::Update);
    issues.extend(unique_issues(state.storage(), resource, changes, Some(document.id())).await?);

    let result = if issues.is_empty() {
        let updated = state
            .storage()
            .update(&resource.name, document.id(), Some(etag), changes.clone())
            .await?;
        info!(resource = %resource.name, id = %updated.id(), "Item updated");
        write_ok(settings, resource, &updated)
    } else {
        debug!(resource = %resource.name, issues = issues.len(), "Changes rejected");
        write_err(settings, &issues)
    };

    let mut payload = Map::new();
    payload.insert(key.clone(), result);
    Ok(Json(envelope(Value::Object(payload))).into_response())
}

/// Handler for removing an item.
///
/// # Response
///
/// - `200 OK` - Item removed
/// - `403 Forbidden` - If-Match is missing
/// - `404 Not Found` - No such item
/// - `412 Precondition Failed` - If-Match does not match the item's etag
pub async fn delete_item_handler<S>(
    State(state): State<AppState<S>>,
    Path((url, lookup)): Path<(String, String)>,
    conditional: ConditionalHeaders,
) -> RestResult<Response>
where
    S: DataLayer + Send + Sync,
{
    let settings = state.settings();
    let resource = state.resource(&url)?;
    ensure_allowed(resource, Method::DELETE)?;

    debug!(resource = %resource.name, lookup = %lookup, "Processing item delete");
    let document = find_item(state.storage(), settings, resource, &lookup).await?;
    let etag = required_etag(&conditional)?;
    ensure_etag(&document, etag)?;

    state
        .storage()
        .remove(&resource.name, document.id(), Some(etag))
        .await?;
    info!(resource = %resource.name, id = %document.id(), "Item removed");

    Ok(Json(envelope(json!({}))).into_response())
}

/// Answers methods the item endpoint never serves with 405.
pub async fn item_fallback_handler<S>(
    State(state): State<AppState<S>>,
    Path((url, _lookup)): Path<(String, String)>,
    method: Method,
) -> RestResult<Response>
where
    S: DataLayer + Send + Sync,
{
    let resource = state.resource(&url)?;
    Err(RestError::MethodNotAllowed {
        method,
        allowed: resource.item_methods.clone(),
    })
}
