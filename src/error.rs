//! Error types shared by the ticket core and the HTTP layer.
//!
//! `TicketError` is the taxonomy of the transition core. `ApiError` is what
//! handlers return: every error body carries the numeric `status` and a `msg`.

use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::store::StoreError;

/// A transition guard that refused the operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Refusal {
    AlreadyEntered,
    Unsold,
    NotEntered,
    /// Carries whether the ticket that blocked the sale is already inside.
    AlreadySold { entered: bool },
}

impl Refusal {
    pub fn message(&self) -> &'static str {
        match self {
            Refusal::AlreadyEntered => "ticket is sold and already entered",
            Refusal::Unsold => "ticket unsold - can not enter",
            Refusal::NotEntered => "ticket not entered - rollback not performed",
            Refusal::AlreadySold { .. } => {
                "this ticket can not be sold - either reserved or already sold"
            }
        }
    }
}

#[derive(Debug, Error)]
pub enum TicketError {
    #[error("ticket {0} does not exist")]
    NotFound(i64),
    #[error("{}", .0.message())]
    Precondition(Refusal),
    #[error("missing some attendee details - first_name: {first_name:?}, last_name: {last_name:?}")]
    MissingAttendee { first_name: String, last_name: String },
    #[error("ticket store unavailable: {0}")]
    StoreUnavailable(#[from] StoreError),
    #[error("ticket {ticket_num}: expected exactly one row to change, {rows} changed")]
    Consistency { ticket_num: i32, rows: u64 },
}

impl From<Refusal> for TicketError {
    fn from(refusal: Refusal) -> Self {
        TicketError::Precondition(refusal)
    }
}

impl TicketError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            TicketError::NotFound(_) => StatusCode::NOT_FOUND,
            TicketError::Precondition(_) | TicketError::MissingAttendee { .. } => {
                StatusCode::BAD_REQUEST
            }
            TicketError::StoreUnavailable(_) | TicketError::Consistency { .. } => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

/// Error answered by a handler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiError {
    pub status: StatusCode,
    pub msg: String,
}

impl ApiError {
    pub fn new(status: StatusCode, msg: impl Into<String>) -> Self {
        Self { status, msg: msg.into() }
    }

    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, msg)
    }

    pub fn unauthorized(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, msg)
    }

    pub fn forbidden(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::FORBIDDEN, msg)
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, msg)
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, msg)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = json!({
            "status": self.status.as_u16(),
            "msg": self.msg,
        });
        (self.status, Json(body)).into_response()
    }
}

impl From<TicketError> for ApiError {
    fn from(err: TicketError) -> Self {
        let status = err.status_code();
        // store details stay in the logs
        let msg = match &err {
            TicketError::StoreUnavailable(_) | TicketError::Consistency { .. } => {
                "Server has encountered an error and can not satisfy the request.".to_string()
            }
            other => other.to_string(),
        };
        ApiError::new(status, msg)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::bad_request(format!(
            "impossible to parse request's JSON data: {}",
            rejection.body_text()
        ))
    }
}
