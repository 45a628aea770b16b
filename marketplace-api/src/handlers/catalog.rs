use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use marketplace_core::error::AppError;
use validator::Validate;

use crate::{
    dtos::CreateProductRequest,
    models::{Category, Product},
    services::{DeleteOutcome, InsertOutcome},
    AppState,
};

pub async fn list_categories(
    State(state): State<AppState>,
) -> Result<Json<Vec<Category>>, AppError> {
    Ok(Json(state.catalog.categories().await?))
}

/// `GET /categories/:id` lists the products filed under that category.
pub async fn category_products(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Vec<Product>>, AppError> {
    Ok(Json(state.catalog.products_in_category(&id).await?))
}

pub async fn list_products(State(state): State<AppState>) -> Result<Json<Vec<Product>>, AppError> {
    Ok(Json(state.catalog.products().await?))
}

pub async fn seller_products(
    State(state): State<AppState>,
    Path(email): Path<String>,
) -> Result<Json<Vec<Product>>, AppError> {
    Ok(Json(state.catalog.products_by_seller(&email).await?))
}

pub async fn create_product(
    State(state): State<AppState>,
    Json(req): Json<CreateProductRequest>,
) -> Result<(StatusCode, Json<InsertOutcome>), AppError> {
    req.validate()?;
    let product = req.into_product();
    let outcome = state.catalog.insert_product(&product).await?;

    tracing::info!(product_id = %product.id, seller = %product.email, "Product listed");
    Ok((StatusCode::CREATED, Json(outcome)))
}

pub async fn delete_product(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<DeleteOutcome>, AppError> {
    Ok(Json(state.catalog.delete_product(&id).await?))
}
