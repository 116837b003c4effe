pub mod admin;
pub mod auth;
pub mod tickets;

use axum::{
    extract::{FromRequest, OriginalUri},
    routing::get,
    Router,
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use crate::{error::ApiError, AppState};

/// JSON body whose parse failures answer with the usual `{status, msg}` body.
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct ApiJson<T>(pub T);

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .merge(auth::routes())
        .merge(tickets::routes())
        .nest("/admin", admin::routes())
}

/// The whole HTTP surface, ready to be served.
pub fn app(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(|| async { "FdP Tickets API v1.0" }))
        .route("/health", get(|| async { "OK" }))
        .merge(routes())
        .fallback(not_found)
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

/// Unknown paths and unsupported methods on known paths.
pub(crate) async fn not_found(OriginalUri(uri): OriginalUri) -> ApiError {
    ApiError::not_found(format!("Resource requested at {} not found.", uri.path()))
}
