//! Vesper route configuration.
//!
//! Routes are mounted under the settings' base path (`url_prefix` and
//! `api_version`). Resource URLs are path parameters resolved against the
//! domain by the handlers.

use axum::{
    Router,
    routing::{any, get},
};
use vesper_persistence::core::DataLayer;

use crate::handlers;
use crate::state::AppState;

/// Creates all Vesper REST API routes.
///
/// # Routes
///
/// - `GET [base]/` - API root, with `[base]` redirected to it under a prefix
/// - `GET|POST|DELETE [base]/{url}/` - Collection
/// - `GET|PATCH|DELETE [base]/{url}/{lookup}/` - Item
/// - `[base]/{url}` and `[base]/{url}/{lookup}` - 301 to the trailing slash form
pub fn create_routes<S>(state: AppState<S>) -> Router
where
    S: DataLayer + Send + Sync + 'static,
{
    let base = state.settings().base_path();

    let router = if base.is_empty() {
        Router::new()
    } else {
        Router::new().route(&base, any(handlers::home_redirect_handler::<S>))
    };

    router
        .route(&format!("{}/", base), get(handlers::home_handler::<S>))
        .route(
            &format!("{}/{{url}}/", base),
            get(handlers::list_handler::<S>)
                .post(handlers::insert_handler::<S>)
                .delete(handlers::delete_all_handler::<S>)
                .fallback(handlers::collection_fallback_handler::<S>),
        )
        .route(
            &format!("{}/{{url}}/{{lookup}}/", base),
            get(handlers::get_item_handler::<S>)
                .patch(handlers::patch_item_handler::<S>)
                .delete(handlers::delete_item_handler::<S>)
                .fallback(handlers::item_fallback_handler::<S>),
        )
        .route(
            &format!("{}/{{url}}", base),
            any(handlers::collection_redirect_handler::<S>),
        )
        .route(
            &format!("{}/{{url}}/{{lookup}}", base),
            any(handlers::item_redirect_handler::<S>),
        )
        .fallback(handlers::not_found_handler)
        .with_state(state)
}
