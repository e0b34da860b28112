use axum::{extract::FromRequestParts, http::request::Parts};

use crate::error::AppError;

pub const USER_ID_HEADER: &str = "X-User-Id";

/// Caller identity, taken from the `X-User-Id` header the gateway sets after
/// authenticating the request.
#[derive(Debug, Clone, Copy)]
pub struct CurrentUser {
    pub user_id: i32,
}

impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let user_id = parts
            .headers
            .get(USER_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse::<i32>().ok())
            .filter(|id| *id > 0)
            .ok_or(AppError::Unauthorized)?;

        Ok(CurrentUser { user_id })
    }
}
