//! Trailing slash redirects.
//!
//! Collection and item URLs end with a slash. Requests without it are
//! answered with `301 Moved Permanently` to the canonical URL, keeping the
//! query string, as long as the resource exists.

use axum::{
    extract::{Path, RawQuery, State},
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use tracing::debug;
use vesper_persistence::core::DataLayer;

use crate::error::{RestError, RestResult};
use crate::state::AppState;

fn moved_permanently(location: String, query: Option<String>) -> RestResult<Response> {
    let location = match query {
        Some(query) if !query.is_empty() => format!("{}?{}", location, query),
        _ => location,
    };
    debug!(location = %location, "Redirecting to canonical URL");

    let value = HeaderValue::from_str(&location).map_err(|e| RestError::BadRequest {
        message: format!("Invalid redirect location: {}", e),
    })?;
    Ok((StatusCode::MOVED_PERMANENTLY, [(header::LOCATION, value)]).into_response())
}

/// Redirects `[base]` to `[base]/` when the API is mounted under a prefix.
pub async fn home_redirect_handler<S>(
    State(state): State<AppState<S>>,
    RawQuery(query): RawQuery,
) -> RestResult<Response>
where
    S: DataLayer + Send + Sync,
{
    moved_permanently(format!("{}/", state.settings().base_path()), query)
}

/// Redirects `[base]/[url]` to `[base]/[url]/`.
pub async fn collection_redirect_handler<S>(
    State(state): State<AppState<S>>,
    Path(url): Path<String>,
    RawQuery(query): RawQuery,
) -> RestResult<Response>
where
    S: DataLayer + Send + Sync,
{
    let resource = state.resource(&url)?;
    let location = format!("{}/{}/", state.settings().base_path(), resource.url);
    moved_permanently(location, query)
}

/// Redirects `[base]/[url]/[lookup]` to `[base]/[url]/[lookup]/`.
pub async fn item_redirect_handler<S>(
    State(state): State<AppState<S>>,
    Path((url, lookup)): Path<(String, String)>,
    RawQuery(query): RawQuery,
) -> RestResult<Response>
where
    S: DataLayer + Send + Sync,
{
    let resource = state.resource(&url)?;
    let location = format!(
        "{}/{}/{}/",
        state.settings().base_path(),
        resource.url,
        lookup
    );
    moved_permanently(location, query)
}
