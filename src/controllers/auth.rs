use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;

use super::{not_found, ApiJson};
use crate::{error::ApiError, middleware::AuthUser, services::auth, AppState};

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/login", post(login).fallback(not_found))
        .route("/logout", get(logout).fallback(not_found))
        .route("/ping", get(ping).fallback(not_found))
}

// POST /login
#[derive(Debug, Deserialize)]
struct LoginRequest {
    username: String,
    password: String,
}

async fn login(
    State(state): State<Arc<AppState>>,
    ApiJson(req): ApiJson<LoginRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let staff = auth::authenticate(
        state.store.as_ref(),
        state.config.database.store_timeout(),
        &req.username,
        &req.password,
    )
    .await?;

    let token = state.jwt.issue(&staff.username, staff.admin)?;
    tracing::info!("User {} logged in", staff.username);

    Ok(Json(json!({
        "token": token,
        "status": StatusCode::OK.as_u16(),
        "msg": "correct login performed",
    })))
}

// GET /logout - tokens simply expire
async fn logout() -> ApiError {
    ApiError::new(StatusCode::NOT_IMPLEMENTED, "logout function not implemented yet")
}

// GET /ping
async fn ping(
    State(state): State<Arc<AppState>>,
    _user: AuthUser,
) -> Result<impl IntoResponse, ApiError> {
    state.tickets.ping().await?;
    Ok(Json(json!({
        "message": format!("Pong - {}", Utc::now().to_rfc3339()),
    })))
}
