use axum::{
    extract::{Query, State},
    http::StatusCode,
    Json,
};
use marketplace_core::error::AppError;

use crate::{
    dtos::{JwtQuery, TokenResponse},
    AppState,
};

/// `GET /jwt?email=` issues a token to registered emails and a bare 403 to everyone else.
pub async fn issue_token(
    State(state): State<AppState>,
    Query(query): Query<JwtQuery>,
) -> Result<(StatusCode, Json<TokenResponse>), AppError> {
    let token = state
        .tokens
        .issue_for_registered(state.users.as_ref(), &query.email)
        .await?;

    Ok(match token {
        Some(access_token) => (StatusCode::OK, Json(TokenResponse { access_token })),
        None => (StatusCode::FORBIDDEN, Json(TokenResponse::denied())),
    })
}
