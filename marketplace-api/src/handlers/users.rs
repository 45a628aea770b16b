use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use marketplace_core::error::AppError;
use serde_json::{json, Value};
use validator::Validate;

use crate::{
    dtos::CreateUserRequest,
    middleware::AuthUser,
    models::{Role, User, VerificationStatus},
    services::{DeleteOutcome, InsertOutcome, UpdateOutcome},
    AppState,
};

pub async fn create_user(
    State(state): State<AppState>,
    Json(req): Json<CreateUserRequest>,
) -> Result<(StatusCode, Json<InsertOutcome>), AppError> {
    req.validate()?;

    if req.role == Role::Admin {
        return Err(AppError::forbidden());
    }

    let user = req.into_user();
    let outcome = state.users.insert(&user).await?;

    tracing::info!(user_id = %user.id, role = user.role.as_str(), "User registered");
    Ok((StatusCode::CREATED, Json(outcome)))
}

/// `PUT /users/admin/:id`. Guarded by the admin layer.
pub async fn make_admin(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
    Path(id): Path<String>,
) -> Result<Json<UpdateOutcome>, AppError> {
    let outcome = state.users.set_role(&id, Role::Admin).await?;

    tracing::info!(
        target_id = %id,
        granted_by = %caller.email,
        upserted = outcome.upserted_id.is_some(),
        "Admin role granted"
    );
    Ok(Json(outcome))
}

/// `PUT /users/verify/:id`. Guarded by the admin layer; unknown ids are a 404.
pub async fn verify_user(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<UpdateOutcome>, AppError> {
    let outcome = state
        .users
        .set_verification(&id, VerificationStatus::Verified)
        .await?;

    if outcome.matched_count == 0 {
        return Err(AppError::NotFound(anyhow::anyhow!("User {} not found", id)));
    }
    Ok(Json(outcome))
}

async fn has_role(state: &AppState, email: &str, role: Role) -> Result<bool, AppError> {
    Ok(state
        .users
        .find_by_email(email)
        .await?
        .is_some_and(|user| user.has_role(role)))
}

pub async fn is_admin(
    State(state): State<AppState>,
    Path(email): Path<String>,
) -> Result<Json<Value>, AppError> {
    let answer = has_role(&state, &email, Role::Admin).await?;
    Ok(Json(json!({ "isAdmin": answer })))
}

pub async fn is_seller(
    State(state): State<AppState>,
    Path(email): Path<String>,
) -> Result<Json<Value>, AppError> {
    let answer = has_role(&state, &email, Role::Seller).await?;
    Ok(Json(json!({ "isSeller": answer })))
}

pub async fn is_buyer(
    State(state): State<AppState>,
    Path(email): Path<String>,
) -> Result<Json<Value>, AppError> {
    let answer = has_role(&state, &email, Role::Buyer).await?;
    Ok(Json(json!({ "isBuyer": answer })))
}

pub async fn list_admins(State(state): State<AppState>) -> Result<Json<Vec<User>>, AppError> {
    Ok(Json(state.users.list_by_role(Role::Admin).await?))
}

pub async fn list_sellers(State(state): State<AppState>) -> Result<Json<Vec<User>>, AppError> {
    Ok(Json(state.users.list_by_role(Role::Seller).await?))
}

pub async fn list_buyers(State(state): State<AppState>) -> Result<Json<Vec<User>>, AppError> {
    Ok(Json(state.users.list_by_role(Role::Buyer).await?))
}

/// Serves both `/admin/delete/:id` and `/users/delete/:id`.
pub async fn delete_user(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
    Path(id): Path<String>,
) -> Result<Json<DeleteOutcome>, AppError> {
    let outcome = state.users.delete(&id).await?;
    tracing::info!(
        target_id = %id,
        deleted_by = %caller.email,
        deleted = outcome.deleted_count,
        "User deleted"
    );
    Ok(Json(outcome))
}
