use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use marketplace_core::error::AppError;

use crate::{
    models::{Role, User},
    services::{IdentityClaim, MarketplaceError, UserDirectory},
    AppState,
};

/// Look the caller up and require `role`. Consulted on every call.
pub async fn require_role(
    identity: &IdentityClaim,
    role: Role,
    users: &dyn UserDirectory,
) -> Result<User, MarketplaceError> {
    if identity.email.trim().is_empty() {
        tracing::warn!("Role check for a token without an email");
        return Err(MarketplaceError::Forbidden);
    }

    match users.find_by_email(&identity.email).await? {
        Some(user) if user.has_role(role) => Ok(user),
        Some(user) => {
            tracing::warn!(
                email = %identity.email,
                required = role.as_str(),
                actual = user.role.as_str(),
                "Role check failed"
            );
            Err(MarketplaceError::Forbidden)
        }
        None => {
            tracing::warn!(email = %identity.email, "Role check for unknown user");
            Err(MarketplaceError::Forbidden)
        }
    }
}

/// Runs after [`super::require_authenticated`]; lets only admins through.
pub async fn admin_only(
    State(state): State<AppState>,
    req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let identity = req
        .extensions()
        .get::<IdentityClaim>()
        .cloned()
        .ok_or(AppError::Unauthenticated)?;

    require_role(&identity, Role::Admin, state.users.as_ref()).await?;

    Ok(next.run(req).await)
}
