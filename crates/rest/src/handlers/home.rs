//! API root handler.
//!
//! `GET [base]/` lists the resources of the domain as `child` links.

use axum::{
    Json,
    extract::State,
    http::Uri,
    response::{IntoResponse, Response},
};
use serde_json::json;
use tracing::debug;
use vesper_persistence::core::DataLayer;

use crate::error::{RestError, RestResult};
use crate::links::Link;
use crate::responses::envelope;
use crate::state::AppState;

/// Handler for the API root.
///
/// # Response
///
/// ```json
/// {"response": {"links": [
///     {"rel": "child", "title": "contacts", "href": "http://localhost:5000/contacts/"}
/// ]}}
/// ```
pub async fn home_handler<S>(State(state): State<AppState<S>>) -> RestResult<Response>
where
    S: DataLayer + Send + Sync,
{
    let settings = state.settings();
    debug!(resources = settings.domain.len(), "Processing home request");

    let links: Vec<Link> = settings
        .domain
        .values()
        .map(|resource| Link::child(settings, resource))
        .collect();

    Ok(Json(envelope(json!({ "links": links }))).into_response())
}

/// Answers paths outside the API with a JSON 404.
pub async fn not_found_handler(uri: Uri) -> RestError {
    RestError::NotFound {
        message: format!("No route for {}", uri.path()),
    }
}
