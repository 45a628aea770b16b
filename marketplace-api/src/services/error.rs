use marketplace_core::error::AppError;
use thiserror::Error;

use crate::services::store::StoreError;
use crate::services::stripe::GatewayError;

#[derive(Error, Debug)]
pub enum MarketplaceError {
    #[error("Invalid token")]
    InvalidToken,

    #[error("Forbidden")]
    Forbidden,

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    BadRequest(String),

    #[error("Payment gateway error: {0}")]
    PaymentGateway(#[from] GatewayError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// The payment was recorded but its booking could not be marked paid.
    #[error("Payment {payment_id} recorded but booking {booking_id} was not settled")]
    ConsistencyGap {
        payment_id: String,
        booking_id: String,
        #[source]
        source: StoreError,
    },

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl From<MarketplaceError> for AppError {
    fn from(err: MarketplaceError) -> Self {
        match err {
            MarketplaceError::InvalidToken | MarketplaceError::Forbidden => AppError::forbidden(),
            MarketplaceError::NotFound(msg) => AppError::NotFound(anyhow::anyhow!(msg)),
            MarketplaceError::Conflict(msg) => AppError::Conflict(anyhow::anyhow!(msg)),
            MarketplaceError::BadRequest(msg) => AppError::BadRequest(anyhow::anyhow!(msg)),
            MarketplaceError::PaymentGateway(e) => AppError::BadGateway(e.to_string()),
            MarketplaceError::Store(StoreError::Duplicate(what)) => {
                AppError::Conflict(anyhow::anyhow!("Already exists: {}", what))
            }
            MarketplaceError::Store(StoreError::Backend(e)) => AppError::DatabaseError(e),
            MarketplaceError::ConsistencyGap {
                payment_id,
                booking_id,
                source,
            } => {
                tracing::error!(
                    payment_id = %payment_id,
                    booking_id = %booking_id,
                    error = %source,
                    "Payment recorded without booking settlement"
                );
                AppError::InternalError(anyhow::anyhow!(
                    "Payment {} was recorded but booking {} is not yet marked paid",
                    payment_id,
                    booking_id
                ))
            }
            MarketplaceError::Internal(e) => AppError::InternalError(e),
        }
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        MarketplaceError::Store(err).into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;
    use axum::response::IntoResponse;

    fn status_of(err: MarketplaceError) -> StatusCode {
        AppError::from(err).into_response().status()
    }

    #[test]
    fn duplicate_key_is_a_conflict() {
        let err = MarketplaceError::Store(StoreError::Duplicate("email a@x.com".into()));
        assert_eq!(status_of(err), StatusCode::CONFLICT);
    }

    #[test]
    fn backend_failure_is_a_server_error() {
        let err = MarketplaceError::Store(StoreError::Backend(anyhow::anyhow!("down")));
        assert_eq!(status_of(err), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn invalid_token_is_forbidden() {
        assert_eq!(status_of(MarketplaceError::InvalidToken), StatusCode::FORBIDDEN);
    }

    #[test]
    fn gateway_failure_is_bad_gateway() {
        let err = MarketplaceError::PaymentGateway(GatewayError::NotConfigured);
        assert_eq!(status_of(err), StatusCode::BAD_GATEWAY);
    }
}
