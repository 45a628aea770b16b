use serde::{Deserialize, Serialize};

/// A recorded charge. Written once per settled booking and never updated.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Payment {
    #[serde(rename = "_id")]
    pub id: String,
    pub booking_id: String,
    pub email: String,
    pub amount: f64,
    pub transaction_id: String,
}
