//! Request and response contracts for the HTTP surface.

pub mod auth;
pub mod bookings;
pub mod catalog;
pub mod payments;
pub mod users;

pub use auth::{JwtQuery, TokenResponse};
pub use bookings::{CreateBookingRequest, EmailQuery};
pub use catalog::CreateProductRequest;
pub use payments::{ConfirmPaymentRequest, CreateIntentRequest, CreateIntentResponse};
pub use users::CreateUserRequest;
