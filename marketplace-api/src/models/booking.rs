use serde::{Deserialize, Serialize};

/// Where a booking sits in the payment flow.
#[derive(Debug, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PaymentState {
    Unpaid,
    IntentCreated,
    Paid,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Booking {
    #[serde(rename = "_id")]
    pub id: String,
    pub email: String,
    pub product_ref: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub product_name: Option<String>,
    pub price: f64,
    #[serde(default)]
    pub paid: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transaction_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub intent_id: Option<String>,
}

impl Booking {
    pub fn payment_state(&self) -> PaymentState {
        if self.paid {
            PaymentState::Paid
        } else if self.intent_id.is_some() {
            PaymentState::IntentCreated
        } else {
            PaymentState::Unpaid
        }
    }
}
