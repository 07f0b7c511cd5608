//! `AuthUser` extractor: resolves the bearer token on the Authorization header.

use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;

use cropwatch_auth::identity::{Identity, UserIdentity};
use cropwatch_core::error::AppError;

use crate::error::ApiError;
use crate::state::AppState;

/// The authenticated caller.
#[derive(Debug, Clone)]
pub struct AuthUser(pub UserIdentity);

impl std::ops::Deref for AuthUser {
    type Target = UserIdentity;
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| AppError::authentication("Missing Authorization header"))?;

        let token = header
            .strip_prefix("Bearer ")
            .or_else(|| header.strip_prefix("Token "))
            .ok_or_else(|| AppError::authentication("Invalid Authorization header format"))?;

        match state.resolver.resolve_identity(token.trim()).await {
            Identity::User(user) => Ok(AuthUser(user)),
            Identity::Anonymous => Err(AppError::authentication("Invalid or expired token").into()),
        }
    }
}
