use axum::{
    extract::{FromRequestParts, Path},
    http::{header, request::Parts},
};
use std::sync::Arc;

use crate::{error::ApiError, services::AuthError, AppState};

/// Staff member authenticated by a bearer token.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub username: String,
    pub is_admin: bool,
}

/// Authenticated staff member holding the admin grant.
#[derive(Debug, Clone)]
pub struct AdminUser(pub AuthUser);

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::NotAdmin => ApiError::forbidden(err.to_string()),
            AuthError::Signing(_) | AuthError::Store(_) => {
                tracing::error!("authentication failure: {}", err);
                ApiError::internal("Server has encountered an error and can not satisfy the request.")
            }
            AuthError::MissingToken | AuthError::InvalidToken(_) | AuthError::BadCredentials => {
                ApiError::unauthorized(err.to_string())
            }
        }
    }
}

// Bearer token extractor
impl FromRequestParts<Arc<AppState>> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "))
            .map(str::trim)
            .filter(|token| !token.is_empty())
            .ok_or(AuthError::MissingToken)?;

        let claims = state.jwt.verify(token).map_err(|e| {
            tracing::debug!("{} - rejected token: {:?}", parts.uri.path(), e);
            e
        })?;

        Ok(AuthUser {
            username: claims.sub,
            is_admin: claims.is_admin,
        })
    }
}

impl FromRequestParts<Arc<AppState>> for AdminUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let user = AuthUser::from_request_parts(parts, state).await?;
        if !user.is_admin {
            tracing::warn!("{} - {} is not an administrator", parts.uri.path(), user.username);
            return Err(AuthError::NotAdmin.into());
        }
        Ok(AdminUser(user))
    }
}

/// Ticket number taken from the last path segment. Anything that is not an
/// integer in `0..=ticket_max` answers 404 before authentication runs.
#[derive(Debug, Clone, Copy)]
pub struct TicketPath(pub i64);

impl FromRequestParts<Arc<AppState>> for TicketPath {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let path = parts.uri.path().to_string();
        let not_found = || ApiError::not_found(format!("Resource requested at {path} not found."));

        let Path(raw) = Path::<String>::from_request_parts(parts, state)
            .await
            .map_err(|_| not_found())?;

        raw.parse::<i64>()
            .ok()
            .filter(|num| state.tickets.check_range(*num).is_ok())
            .map(TicketPath)
            .ok_or_else(not_found)
    }
}
