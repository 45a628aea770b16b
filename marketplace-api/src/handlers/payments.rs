use axum::{
    extract::{Query, State},
    Json,
};
use marketplace_core::error::AppError;
use validator::Validate;

use crate::{
    dtos::{ConfirmPaymentRequest, CreateIntentRequest, CreateIntentResponse, EmailQuery},
    models::Payment,
    services::{InsertOutcome, ReconcileReport},
    AppState,
};

/// `POST /create-payment-intent`. `price` is in major units.
pub async fn create_payment_intent(
    State(state): State<AppState>,
    Json(req): Json<CreateIntentRequest>,
) -> Result<Json<CreateIntentResponse>, AppError> {
    req.validate()?;

    let created = state
        .payments
        .create_intent(req.price, req.currency.as_deref(), req.booking_id.as_deref())
        .await?;

    Ok(Json(CreateIntentResponse {
        client_secret: created.client_secret,
    }))
}

/// `POST /payments`. Records the charge and settles the booking.
pub async fn confirm_payment(
    State(state): State<AppState>,
    Json(req): Json<ConfirmPaymentRequest>,
) -> Result<Json<InsertOutcome>, AppError> {
    req.validate()?;
    tracing::info!(booking_id = %req.booking_id, "Confirming payment");

    let outcome = state.payments.confirm_payment(req.into()).await?;
    Ok(Json(outcome))
}

pub async fn list_payments(
    State(state): State<AppState>,
    Query(query): Query<EmailQuery>,
) -> Result<Json<Vec<Payment>>, AppError> {
    Ok(Json(state.payments.payments_for(&query.email).await?))
}

/// `POST /payments/reconcile`. Guarded by the admin layer.
pub async fn reconcile(State(state): State<AppState>) -> Result<Json<ReconcileReport>, AppError> {
    Ok(Json(state.payments.reconcile().await?))
}
