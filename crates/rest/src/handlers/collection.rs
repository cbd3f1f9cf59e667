//! Collection endpoint handlers.
//!
//! - `GET [base]/[url]/` - List a page of items
//! - `POST [base]/[url]/` - Insert one or more documents
//! - `DELETE [base]/[url]/` - Remove every document

use axum::{
    Json,
    extract::{Path, State},
    http::{Method, StatusCode},
    response::{IntoResponse, Response},
};
use chrono::Utc;
use serde_json::{Map, Value, json};
use tracing::{debug, info};
use vesper_persistence::core::DataLayer;

use crate::error::{RestError, RestResult};
use crate::extractors::{DocumentBody, ListParams, ListQuery};
use crate::links::{Link, pagination_links};
use crate::middleware::conditional::ConditionalHeaders;
use crate::responses::{ResponseHeaders, envelope, render_document, write_err, write_ok};
use crate::settings::Resource;
use crate::state::AppState;
use crate::validation::{ValidationIssue, ValidationMode, Validator, unique_issues};

fn ensure_allowed(resource: &Resource, method: Method) -> RestResult<()> {
    if resource.allows_resource_method(&method) {
        Ok(())
    } else {
        Err(RestError::MethodNotAllowed {
            method,
            allowed: resource.resource_methods.clone(),
        })
    }
}

/// Handler for listing a collection.
///
/// # Query Parameters
///
/// - `where` - JSON filter, e.g. `{"prog": {"$gt": 5}}`
/// - `sort` - `-prog,ref` or `[["prog", -1]]`
/// - `max_results` - Page size, capped at `paging_limit`
/// - `page` - 1-based page number
///
/// # Response
///
/// - `200 OK` - `{"response": {"<name>": [items], "links": [..]}}`
/// - `304 Not Modified` - Nothing changed since If-Modified-Since
/// - `400 Bad Request` - Malformed query parameters
pub async fn list_handler<S>(
    State(state): State<AppState<S>>,
    Path(url): Path<String>,
    conditional: ConditionalHeaders,
    query: ListQuery,
) -> RestResult<Response>
where
    S: DataLayer + Send + Sync,
{
    let settings = state.settings();
    let resource = state.resource(&url)?;
    ensure_allowed(resource, Method::GET)?;

    let params = ListParams::parse(query, settings)?;
    debug!(
        resource = %resource.name,
        page = params.page,
        max_results = params.max_results,
        "Processing list request"
    );

    let since = conditional.if_modified_since();
    let found = state
        .storage()
        .find(&resource.name, &params.to_query(since))
        .await?;

    if since.is_some() && found.documents.is_empty() {
        debug!(resource = %resource.name, "Returning 304 Not Modified");
        return Ok(StatusCode::NOT_MODIFIED.into_response());
    }

    let last_modified = found.documents.iter().map(|doc| doc.updated()).max();
    let items: Vec<Value> = found
        .documents
        .iter()
        .map(|doc| render_document(settings, resource, doc))
        .collect();

    let mut links = vec![Link::home(settings), Link::collection(settings, resource)];
    links.extend(pagination_links(
        settings,
        resource,
        &params.page_request(),
        found.total,
    ));

    let mut payload = Map::new();
    payload.insert(resource.name.clone(), Value::Array(items));
    payload.insert("links".to_string(), serde_json::to_value(links)?);

    let headers = ResponseHeaders::cached(resource, Utc::now()).with_last_modified(last_modified);

    debug!(
        resource = %resource.name,
        returned = found.documents.len(),
        total = found.total,
        "Returning list"
    );
    Ok((
        StatusCode::OK,
        headers.to_header_map(),
        Json(envelope(Value::Object(payload))),
    )
        .into_response())
}

/// Handler for inserting documents.
///
/// The body maps client keys to documents. Each document is validated and
/// stored independently; the response reports a status per key.
///
/// # Response
///
/// - `200 OK` - `{"response": {"<key>": {"status": "OK", ..}}}` per key, or
///   `{"status": "ERR", "issues": [..]}` for rejected documents
/// - `400 Bad Request` - The body is not a keyed JSON object
pub async fn insert_handler<S>(
    State(state): State<AppState<S>>,
    Path(url): Path<String>,
    DocumentBody(payload): DocumentBody,
) -> RestResult<Response>
where
    S: DataLayer + Send + Sync,
{
    let settings = state.settings();
    let resource = state.resource(&url)?;
    ensure_allowed(resource, Method::POST)?;

    debug!(resource = %resource.name, documents = payload.len(), "Processing insert request");

    let validator = Validator::new(&resource.schema, &settings.date_format);
    let mut results = Map::new();
    for (key, document) in payload {
        let Value::Object(document) = document else {
            let issue = ValidationIssue {
                message: "document must be a JSON object".to_string(),
                field: String::new(),
            };
            results.insert(key, write_err(settings, &[issue]));
            continue;
        };

        let mut issues = validator.validate(&document, ValidationMode::Insert);
        issues.extend(unique_issues(state.storage(), resource, &document, None).await?);
        if !issues.is_empty() {
            debug!(
                resource = %resource.name,
                key = %key,
                issues = issues.len(),
                "Document rejected"
            );
            results.insert(key, write_err(settings, &issues));
            continue;
        }

        let stored = state.storage().insert(&resource.name, document).await?;
        info!(resource = %resource.name, id = %stored.id(), "Document inserted");
        results.insert(key, write_ok(settings, resource, &stored));
    }

    Ok(Json(envelope(Value::Object(results))).into_response())
}

/// Handler for removing every document of a collection.
pub async fn delete_all_handler<S>(
    State(state): State<AppState<S>>,
    Path(url): Path<String>,
) -> RestResult<Response>
where
    S: DataLayer + Send + Sync,
{
    let resource = state.resource(&url)?;
    ensure_allowed(resource, Method::DELETE)?;

    let removed = state.storage().remove_all(&resource.name).await?;
    info!(resource = %resource.name, removed, "Collection emptied");

    Ok(Json(envelope(json!({}))).into_response())
}

/// Answers methods the collection endpoint never serves with 405.
pub async fn collection_fallback_handler<S>(
    State(state): State<AppState<S>>,
    Path(url): Path<String>,
    method: Method,
) -> RestResult<Response>
where
    S: DataLayer + Send + Sync,
{
    let resource = state.resource(&url)?;
    Err(RestError::MethodNotAllowed {
        method,
        allowed: resource.resource_methods.clone(),
    })
}
