//! Storage seams.
//!
//! Handlers and the payment orchestrator only see these traits. `MongoStore`
//! backs them in production and `InMemoryStore` in tests.

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;

use crate::models::{Booking, Category, Payment, Product, Role, User, VerificationStatus};

#[derive(Debug, Error)]
pub enum StoreError {
    /// A unique index rejected the write.
    #[error("Duplicate key: {0}")]
    Duplicate(String),

    #[error(transparent)]
    Backend(#[from] anyhow::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Result of an insert, shaped like the driver acknowledgement clients expect.
#[derive(Debug, Serialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct InsertOutcome {
    pub acknowledged: bool,
    pub inserted_id: String,
}

impl InsertOutcome {
    pub fn new(inserted_id: impl Into<String>) -> Self {
        Self {
            acknowledged: true,
            inserted_id: inserted_id.into(),
        }
    }
}

#[derive(Debug, Serialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UpdateOutcome {
    pub acknowledged: bool,
    pub matched_count: u64,
    pub modified_count: u64,
    pub upserted_id: Option<String>,
}

impl UpdateOutcome {
    pub fn new(matched_count: u64, modified_count: u64, upserted_id: Option<String>) -> Self {
        Self {
            acknowledged: true,
            matched_count,
            modified_count,
            upserted_id,
        }
    }
}

#[derive(Debug, Serialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DeleteOutcome {
    pub acknowledged: bool,
    pub deleted_count: u64,
}

impl DeleteOutcome {
    pub fn new(deleted_count: u64) -> Self {
        Self {
            acknowledged: true,
            deleted_count,
        }
    }
}

#[async_trait]
pub trait UserDirectory: Send + Sync {
    async fn find_by_email(&self, email: &str) -> StoreResult<Option<User>>;
    async fn find_by_id(&self, id: &str) -> StoreResult<Option<User>>;
    async fn insert(&self, user: &User) -> StoreResult<InsertOutcome>;
    /// Upsert: an unknown id gets a new record carrying only the role.
    async fn set_role(&self, id: &str, role: Role) -> StoreResult<UpdateOutcome>;
    /// Plain update; never creates a record.
    async fn set_verification(
        &self,
        id: &str,
        status: VerificationStatus,
    ) -> StoreResult<UpdateOutcome>;
    async fn list_by_role(&self, role: Role) -> StoreResult<Vec<User>>;
    async fn delete(&self, id: &str) -> StoreResult<DeleteOutcome>;
}

#[async_trait]
pub trait BookingStore: Send + Sync {
    async fn insert(&self, booking: &Booking) -> StoreResult<InsertOutcome>;
    async fn find_by_id(&self, id: &str) -> StoreResult<Option<Booking>>;
    async fn list(&self, email: Option<&str>) -> StoreResult<Vec<Booking>>;
    async fn delete(&self, id: &str) -> StoreResult<DeleteOutcome>;
    async fn record_intent(&self, id: &str, intent_id: &str) -> StoreResult<UpdateOutcome>;
}

/// Payment records plus the booking settlement they imply.
#[async_trait]
pub trait PaymentLedger: Send + Sync {
    async fn insert_payment(&self, payment: &Payment) -> StoreResult<InsertOutcome>;

    /// Sets `paid = true` and the transaction id. Replaying it is harmless.
    async fn mark_booking_paid(
        &self,
        booking_id: &str,
        transaction_id: &str,
    ) -> StoreResult<UpdateOutcome>;

    /// Insert the payment and settle its booking as one unit.
    ///
    /// `Ok(None)` means the backend cannot do this and the caller falls back
    /// to the two separate writes.
    async fn settle_atomically(&self, _payment: &Payment) -> StoreResult<Option<InsertOutcome>> {
        Ok(None)
    }

    async fn payment_for_booking(&self, booking_id: &str) -> StoreResult<Option<Payment>>;

    async fn payments_for_email(&self, email: &str) -> StoreResult<Vec<Payment>>;

    /// Payments whose booking is missing the paid flag.
    async fn unsettled_payments(&self) -> StoreResult<Vec<Payment>>;
}

#[async_trait]
pub trait Catalog: Send + Sync {
    async fn categories(&self) -> StoreResult<Vec<Category>>;
    async fn products(&self) -> StoreResult<Vec<Product>>;
    async fn products_in_category(&self, category_id: &str) -> StoreResult<Vec<Product>>;
    async fn products_by_seller(&self, email: &str) -> StoreResult<Vec<Product>>;
    async fn insert_product(&self, product: &Product) -> StoreResult<InsertOutcome>;
    async fn delete_product(&self, id: &str) -> StoreResult<DeleteOutcome>;
}
