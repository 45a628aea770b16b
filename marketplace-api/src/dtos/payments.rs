use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::services::PaymentReport;

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateIntentRequest {
    /// Major units, e.g. dollars.
    pub price: f64,

    #[validate(length(equal = 3, message = "Currency must be a 3-letter ISO code"))]
    pub currency: Option<String>,

    pub booking_id: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateIntentResponse {
    pub client_secret: String,
}

/// Reported by the client once the charge has completed.
/// Extra fields sent by older clients are ignored.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ConfirmPaymentRequest {
    #[validate(length(min = 1, message = "bookingId is required"))]
    pub booking_id: String,

    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    #[validate(range(min = 0.0, message = "Amount must not be negative"))]
    pub amount: f64,

    #[validate(length(min = 1, message = "transactionId is required"))]
    pub transaction_id: String,
}

impl From<ConfirmPaymentRequest> for PaymentReport {
    fn from(req: ConfirmPaymentRequest) -> Self {
        PaymentReport {
            booking_id: req.booking_id,
            email: req.email,
            amount: req.amount,
            transaction_id: req.transaction_id,
        }
    }
}
