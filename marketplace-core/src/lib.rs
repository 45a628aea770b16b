//! marketplace-core: shared plumbing for the marketplace backend.
pub mod config;
pub mod error;
pub mod middleware;
pub mod observability;

pub use axum;
pub use mongodb;
pub use tracing;
pub use validator;
