//! JWT-based authentication extractor for Axum handlers.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use refly_core::error::CoreError;

use crate::auth::jwt::validate_token;
use crate::error::AppError;
use crate::state::AppState;

/// Authenticated user extracted from a JWT Bearer token in the `Authorization` header.
///
/// ```ignore
/// async fn my_handler(user: AuthUser) -> AppResult<Json<()>> {
///     tracing::info!(uid = %user.uid, "handling request");
///     Ok(Json(()))
/// }
/// ```
#[derive(Debug, Clone)]
pub struct AuthUser {
    /// The caller's uid (from `claims.sub`).
    pub uid: String,
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let auth_header = parts
            .headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| {
                AppError::Core(CoreError::Unauthorized(
                    "Missing Authorization header".into(),
                ))
            })?;

        let token = auth_header.strip_prefix("Bearer ").ok_or_else(|| {
            AppError::Core(CoreError::Unauthorized(
                "Invalid Authorization format. Expected: Bearer <token>".into(),
            ))
        })?;

        let claims = validate_token(token, &state.config.jwt).map_err(|_| {
            AppError::Core(CoreError::Unauthorized("Invalid or expired token".into()))
        })?;

        Ok(AuthUser { uid: claims.sub })
    }
}
