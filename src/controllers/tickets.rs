//! Entrance desk endpoints, available to every logged in staff member.

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

use super::{not_found, ApiJson};
use crate::{
    error::{ApiError, Refusal, TicketError},
    middleware::{AuthUser, TicketPath},
    AppState,
};

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/when-entered/{ticket_num}", get(when_entered).fallback(not_found))
        .route("/tickets", get(get_tickets).fallback(not_found))
        .route("/tickets-info", get(get_tickets_stats).fallback(not_found))
        .route("/tickets/{ticket_num}", get(get_ticket_details).fallback(not_found))
        .route("/tickets/entered", post(set_entered).fallback(not_found))
        .route(
            "/tickets/entered/rollback",
            post(rollback_entrance).fallback(not_found),
        )
}

/// Body of the ticket mutations.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TicketRequest {
    pub ticket_num: i64,
}

/// Counter value on the wire; -1 marks an unavailable count.
fn counter(value: Option<i64>) -> i64 {
    value.unwrap_or(-1)
}

// GET /when-entered/{ticket_num}
async fn when_entered(
    State(state): State<Arc<AppState>>,
    TicketPath(ticket_num): TicketPath,
    _user: AuthUser,
) -> Result<impl IntoResponse, ApiError> {
    let entered = state.tickets.when_entered(ticket_num).await?;

    Ok(Json(json!({
        "ticketNum": ticket_num,
        "time": entered,
        "isEntered": entered.is_some(),
        "status": StatusCode::OK.as_u16(),
    })))
}

// GET /tickets
async fn get_tickets(
    State(state): State<Arc<AppState>>,
    _user: AuthUser,
) -> Result<impl IntoResponse, ApiError> {
    let attendees = state.tickets.list().await?;

    Ok(Json(json!({
        "status": StatusCode::OK.as_u16(),
        "attendees": attendees,
    })))
}

// GET /tickets-info
async fn get_tickets_stats(
    State(state): State<Arc<AppState>>,
    _user: AuthUser,
) -> Response {
    let stats = state.tickets.stats().await;

    let mut body = json!({
        "status": StatusCode::OK.as_u16(),
        "currentInside": counter(stats.inside),
        "currentSold": counter(stats.sold),
        "currentPayingEntered": counter(stats.paying_entered),
    });

    if stats.is_complete() {
        return (StatusCode::OK, Json(body)).into_response();
    }

    let status = StatusCode::INTERNAL_SERVER_ERROR;
    body["status"] = json!(status.as_u16());
    body["msg"] = json!(format!(
        "error retrieving tickets stats - current inside: {}, current sold: {}, currently paying inside: {}",
        counter(stats.inside),
        counter(stats.sold),
        counter(stats.paying_entered),
    ));
    (status, Json(body)).into_response()
}

// GET /tickets/{ticket_num}
async fn get_ticket_details(
    State(state): State<Arc<AppState>>,
    TicketPath(ticket_num): TicketPath,
    _user: AuthUser,
) -> Result<impl IntoResponse, ApiError> {
    let attendee = state.tickets.details(ticket_num).await?;

    Ok(Json(json!({
        "status": StatusCode::OK.as_u16(),
        "state": attendee.state(),
        "attendee": attendee,
    })))
}

// POST /tickets/entered
async fn set_entered(
    State(state): State<Arc<AppState>>,
    _user: AuthUser,
    ApiJson(req): ApiJson<TicketRequest>,
) -> Result<Response, ApiError> {
    let ticket_num = req.ticket_num;
    let reply = |status: StatusCode, entered: bool, msg: &str| {
        let body = json!({
            "ticketNum": ticket_num,
            "status": status.as_u16(),
            "entered": entered,
            "msg": msg,
        });
        (status, Json(body)).into_response()
    };

    match state.tickets.set_entered(ticket_num).await {
        Ok(()) => Ok(reply(StatusCode::OK, true, "ticket set as entered correctly")),
        Err(TicketError::Precondition(refusal @ Refusal::AlreadyEntered)) => {
            Ok(reply(StatusCode::BAD_REQUEST, true, refusal.message()))
        }
        Err(TicketError::Precondition(refusal)) => {
            Ok(reply(StatusCode::BAD_REQUEST, false, refusal.message()))
        }
        Err(err) => Err(err.into()),
    }
}

// POST /tickets/entered/rollback
async fn rollback_entrance(
    State(state): State<Arc<AppState>>,
    _user: AuthUser,
    ApiJson(req): ApiJson<TicketRequest>,
) -> Result<Response, ApiError> {
    rollback_reply(&state, req.ticket_num).await
}

/// Shared by the desk rollback and the admin undo.
pub(crate) async fn rollback_reply(state: &AppState, ticket_num: i64) -> Result<Response, ApiError> {
    let reply = |status: StatusCode, rollback: bool, msg: &str| {
        let body = json!({
            "ticketNum": ticket_num,
            "status": status.as_u16(),
            "rollback": rollback,
            "msg": msg,
        });
        (status, Json(body)).into_response()
    };

    match state.tickets.rollback_entrance(ticket_num).await {
        Ok(()) => Ok(reply(StatusCode::OK, true, "entrance rollback correctly executed")),
        Err(TicketError::Precondition(refusal)) => {
            Ok(reply(StatusCode::BAD_REQUEST, false, refusal.message()))
        }
        Err(err @ (TicketError::StoreUnavailable(_) | TicketError::Consistency { .. })) => {
            tracing::error!("entrance rollback of ticket {} failed: {}", ticket_num, err);
            Ok(reply(StatusCode::INTERNAL_SERVER_ERROR, false, "entrance rollback failed"))
        }
        Err(err) => Err(err.into()),
    }
}
