//! Services layer: token handling, storage seams, the Stripe client and the
//! payment orchestrator.

mod database;
pub mod error;
mod jwt;
mod memory;
mod payments;
pub mod store;
pub mod stripe;

pub use database::MongoStore;
pub use error::MarketplaceError;
pub use jwt::{IdentityClaim, TokenService};
pub use memory::InMemoryStore;
pub use payments::{to_minor_units, CreatedIntent, PaymentOrchestrator, PaymentReport, ReconcileReport};
pub use store::{
    BookingStore, Catalog, DeleteOutcome, InsertOutcome, PaymentLedger, StoreError, StoreResult,
    UpdateOutcome, UserDirectory,
};
pub use stripe::{GatewayError, MockGateway, PaymentGateway, PaymentIntent, StripeClient};
