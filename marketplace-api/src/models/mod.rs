pub mod booking;
pub mod catalog;
pub mod payment;
pub mod user;

pub use booking::{Booking, PaymentState};
pub use catalog::{Category, Product};
pub use payment::Payment;
pub use user::{Role, User, VerificationStatus};

/// Server-generated document id.
pub fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}
