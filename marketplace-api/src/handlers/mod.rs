//! HTTP handlers for the marketplace API.

pub mod auth;
pub mod bookings;
pub mod catalog;
pub mod payments;
pub mod users;

use axum::{
    extract::State,
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};
use marketplace_core::error::AppError;
use serde_json::json;

use crate::AppState;

pub async fn root() -> &'static str {
    "server is running"
}

pub async fn health_check(
    State(state): State<AppState>,
) -> Result<Json<serde_json::Value>, AppError> {
    if let Some(database) = &state.database {
        database.health_check().await.map_err(|e| {
            tracing::error!(error = %e, "MongoDB health check failed");
            e
        })?;
    }

    Ok(Json(json!({ "status": "ok", "service": state.config.service_name })))
}

pub async fn metrics() -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        marketplace_core::middleware::render_metrics(),
    )
}
