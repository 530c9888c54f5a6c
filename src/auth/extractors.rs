use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};

use super::{claims::TokenKind, dto::Principal, jwt::JwtKeys, services::authorize};
use crate::{error::AppError, state::AppState};

/// Extracts and validates the admin session, returning its principal.
pub struct AdminSession(pub Principal);

#[async_trait]
impl FromRequestParts<AppState> for AdminSession {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        // Read Authorization header
        let auth = parts
            .headers
            .get(axum::http::header::AUTHORIZATION)
            .and_then(|h| h.to_str().ok())
            .ok_or_else(|| AppError::Auth("Unauthorized".into()))?;

        // Expect "Bearer <token>"
        let token = auth
            .strip_prefix("Bearer ")
            .or_else(|| auth.strip_prefix("bearer "))
            .ok_or_else(|| AppError::Auth("Invalid auth scheme".into()))?;

        let keys = JwtKeys::from_ref(state);
        let (claims, _) =
            authorize(state.credentials.as_ref(), &keys, token.trim(), TokenKind::Access).await?;

        Ok(AdminSession(Principal::from(&claims)))
    }
}
