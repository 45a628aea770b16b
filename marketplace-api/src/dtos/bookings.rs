use serde::Deserialize;
use validator::Validate;

use crate::models::{new_id, Booking};

#[derive(Debug, Deserialize)]
pub struct EmailQuery {
    pub email: String,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateBookingRequest {
    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    #[validate(length(min = 1, message = "Product reference is required"))]
    pub product_ref: String,

    pub product_name: Option<String>,

    #[validate(range(min = 0.0, message = "Price must not be negative"))]
    pub price: f64,
}

impl CreateBookingRequest {
    pub fn into_booking(self) -> Booking {
        Booking {
            id: new_id(),
            email: self.email,
            product_ref: self.product_ref,
            product_name: self.product_name,
            price: self.price,
            paid: false,
            transaction_id: None,
            intent_id: None,
        }
    }
}
