//! `AuthUser` extractor: pulls the JWT from the Authorization header and
//! validates it.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use uuid::Uuid;

use chatter_core::error::AppError;

use crate::error::ApiError;
use crate::state::AppState;

/// Authenticated caller identity available to handlers.
#[derive(Debug, Clone)]
pub struct AuthUser {
    /// The authenticated user's ID.
    pub user_id: Uuid,
    /// Username from the token claims.
    pub username: String,
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let auth_header = parts
            .headers
            .get("authorization")
            .and_then(|value| value.to_str().ok())
            .ok_or_else(|| AppError::unauthorized("Missing Authorization header"))?;

        let token = auth_header
            .strip_prefix("Bearer ")
            .ok_or_else(|| AppError::unauthorized("Invalid Authorization header format"))?;

        let claims = state.jwt_decoder.decode_token(token)?;

        Ok(AuthUser {
            user_id: claims.user_id(),
            username: claims.username,
        })
    }
}
