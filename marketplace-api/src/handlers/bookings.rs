use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use marketplace_core::error::AppError;
use validator::Validate;

use crate::{
    dtos::{CreateBookingRequest, EmailQuery},
    middleware::AuthUser,
    models::Booking,
    services::{DeleteOutcome, InsertOutcome, MarketplaceError},
    AppState,
};

pub async fn create_booking(
    State(state): State<AppState>,
    Json(req): Json<CreateBookingRequest>,
) -> Result<(StatusCode, Json<InsertOutcome>), AppError> {
    req.validate()?;
    let booking = req.into_booking();
    let outcome = state.bookings.insert(&booking).await?;

    tracing::info!(booking_id = %booking.id, "Booking created");
    Ok((StatusCode::CREATED, Json(outcome)))
}

/// Callers may only list their own bookings.
pub async fn list_bookings(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
    Query(query): Query<EmailQuery>,
) -> Result<Json<Vec<Booking>>, AppError> {
    if query.email != caller.email {
        tracing::warn!(
            caller = %caller.email,
            requested = %query.email,
            "Booking lookup for another user refused"
        );
        return Err(AppError::forbidden());
    }

    Ok(Json(state.bookings.list(Some(&query.email)).await?))
}

/// Owners may delete their own bookings until they are paid.
pub async fn delete_booking(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
    Path(id): Path<String>,
) -> Result<Json<DeleteOutcome>, AppError> {
    let booking = state
        .bookings
        .find_by_id(&id)
        .await?
        .ok_or_else(|| MarketplaceError::NotFound(format!("Booking {} not found", id)))?;

    if booking.email != caller.email {
        tracing::warn!(
            booking_id = %id,
            caller = %caller.email,
            "Deletion of another user's booking refused"
        );
        return Err(AppError::forbidden());
    }
    if booking.paid {
        return Err(MarketplaceError::Conflict(format!(
            "Booking {} is paid and cannot be deleted",
            id
        ))
        .into());
    }

    let outcome = state.bookings.delete(&id).await?;
    tracing::info!(booking_id = %id, deleted_by = %caller.email, "Booking deleted");
    Ok(Json(outcome))
}
