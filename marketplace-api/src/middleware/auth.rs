use axum::{
    extract::{FromRequestParts, Request, State},
    http::{header, request::Parts},
    middleware::Next,
    response::Response,
};
use marketplace_core::error::AppError;

use crate::{services::IdentityClaim, AppState};

/// Require `Authorization: Bearer <token>` and attach the verified claim.
///
/// No header at all is a 401; a header that is malformed or carries a bad
/// token is a 403.
pub async fn require_authenticated(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let header_value = req
        .headers()
        .get(header::AUTHORIZATION)
        .ok_or(AppError::Unauthenticated)?;

    let token = header_value
        .to_str()
        .ok()
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .ok_or_else(|| {
            tracing::debug!("Malformed Authorization header");
            AppError::forbidden()
        })?;

    let claims = state.tokens.verify(token)?;

    req.extensions_mut().insert(claims);

    Ok(next.run(req).await)
}

/// Extractor for the claim placed by [`require_authenticated`].
pub struct AuthUser(pub IdentityClaim);

#[axum::async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let claims = parts
            .extensions
            .get::<IdentityClaim>()
            .ok_or(AppError::Unauthenticated)?;

        Ok(AuthUser(claims.clone()))
    }
}
