use axum::{extract::FromRequestParts, http::request::Parts};

use crate::error::AppError;
use crate::state::AppState;
use crate::utils::jwt;

/// Caller identified by the `Authorization: Bearer <token>` header.
///
/// Tokens are issued by an external identity provider and signed with the
/// shared secret from `auth.jwt_secret`.
pub struct AuthUser {
    pub subject: String,
}

impl AuthUser {
    /// Returns `Ok(())` if the caller owns the resource, `Err(PermissionDenied)` otherwise.
    pub fn require_owner(&self, owner: &str) -> Result<(), AppError> {
        if self.subject == owner {
            Ok(())
        } else {
            Err(AppError::PermissionDenied)
        }
    }
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let auth_header = parts
            .headers
            .get("Authorization")
            .and_then(|v| v.to_str().ok())
            .ok_or(AppError::TokenMissing)?;

        let token = auth_header
            .strip_prefix("Bearer ")
            .ok_or(AppError::TokenInvalid)?;

        let claims = jwt::verify(token, &state.config.auth.jwt_secret)
            .map_err(|_| AppError::TokenInvalid)?;

        Ok(AuthUser {
            subject: claims.sub,
        })
    }
}
