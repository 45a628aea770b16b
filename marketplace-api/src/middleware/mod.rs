pub mod auth;
pub mod role;

pub use auth::{require_authenticated, AuthUser};
pub use role::{admin_only, require_role};
