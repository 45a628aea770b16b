use serde::Deserialize;
use validator::Validate;

use crate::models::{new_id, Product};

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateProductRequest {
    #[validate(length(min = 1, message = "Name is required"))]
    pub name: String,

    #[serde(alias = "category_id")]
    #[validate(length(min = 1, message = "Category is required"))]
    pub category_id: String,

    /// Seller email.
    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    #[validate(range(min = 0.0, message = "Price must not be negative"))]
    pub price: f64,

    pub original_price: Option<f64>,
    pub location: Option<String>,
    pub image: Option<String>,
    pub condition: Option<String>,
}

impl CreateProductRequest {
    pub fn into_product(self) -> Product {
        Product {
            id: new_id(),
            name: self.name,
            category_id: self.category_id,
            email: self.email,
            price: self.price,
            original_price: self.original_price,
            location: self.location,
            image: self.image,
            condition: self.condition,
        }
    }
}
