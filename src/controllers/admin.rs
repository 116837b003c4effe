//! Admin area: door sales, resets, entrance undo and vendor lookup.

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use validator::Validate;

use super::{
    not_found,
    tickets::{rollback_reply, TicketRequest},
    ApiJson,
};
use crate::{
    error::{ApiError, Refusal, TicketError},
    middleware::{AdminUser, TicketPath},
    AppState,
};

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/sell", post(sell_ticket).fallback(not_found))
        .route("/reset", post(reset_ticket).fallback(not_found))
        .route("/entered/undo", post(undo_entrance).fallback(not_found))
        .route("/vendor/{ticket_num}", get(get_ticket_vendor).fallback(not_found))
}

// POST /admin/sell
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
struct SellRequest {
    ticket_num: i64,
    #[serde(default)]
    #[validate(length(max = 64))]
    first_name: String,
    #[serde(default)]
    #[validate(length(max = 64))]
    last_name: String,
}

async fn sell_ticket(
    State(state): State<Arc<AppState>>,
    AdminUser(admin): AdminUser,
    ApiJson(req): ApiJson<SellRequest>,
) -> Result<Response, ApiError> {
    let ticket_num = req.ticket_num;
    let reply = |status: StatusCode, sold_now: bool, entered: bool, msg: String| {
        let body = json!({
            "ticketNum": ticket_num,
            "status": status.as_u16(),
            "soldNow": sold_now,
            "entered": entered,
            "msg": msg,
        });
        (status, Json(body)).into_response()
    };

    if let Err(e) = req.validate() {
        tracing::warn!("ticket {} sale with invalid attendee details: {}", ticket_num, e);
        return Ok(reply(
            StatusCode::BAD_REQUEST,
            false,
            false,
            format!("invalid attendee details: {e}"),
        ));
    }

    let result = state
        .tickets
        .sell(ticket_num, &req.first_name, &req.last_name, &admin.username)
        .await;

    match result {
        Ok(sold_to) => Ok(reply(
            StatusCode::OK,
            true,
            true,
            format!(
                "ticket sold correctly to {} {}",
                sold_to.first_name, sold_to.last_name
            ),
        )),
        Err(TicketError::Precondition(refusal @ Refusal::AlreadySold { entered })) => Ok(reply(
            StatusCode::BAD_REQUEST,
            false,
            entered,
            refusal.message().to_string(),
        )),
        Err(err @ TicketError::MissingAttendee { .. }) => {
            Ok(reply(StatusCode::BAD_REQUEST, false, false, err.to_string()))
        }
        Err(err) => Err(err.into()),
    }
}

// POST /admin/reset
async fn reset_ticket(
    State(state): State<Arc<AppState>>,
    AdminUser(admin): AdminUser,
    ApiJson(req): ApiJson<TicketRequest>,
) -> Result<impl IntoResponse, ApiError> {
    state.tickets.reset(req.ticket_num).await?;
    tracing::info!("ticket {} reset by {}", req.ticket_num, admin.username);

    Ok(Json(json!({
        "ticketNum": req.ticket_num,
        "status": StatusCode::OK.as_u16(),
        "msg": "ticket reset correctly",
    })))
}

// POST /admin/entered/undo
async fn undo_entrance(
    State(state): State<Arc<AppState>>,
    _admin: AdminUser,
    ApiJson(req): ApiJson<TicketRequest>,
) -> Result<Response, ApiError> {
    rollback_reply(&state, req.ticket_num).await
}

// GET /admin/vendor/{ticket_num}
async fn get_ticket_vendor(
    State(state): State<Arc<AppState>>,
    TicketPath(ticket_num): TicketPath,
    _admin: AdminUser,
) -> Result<impl IntoResponse, ApiError> {
    let vendor = state.tickets.vendor(ticket_num).await?;

    Ok(Json(json!({
        "status": StatusCode::OK.as_u16(),
        "vendor": vendor,
    })))
}
