//! Cart endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use cart::{Cart, CartStore};
use catalog::CatalogStore;
use common::ItemType;
use orders::OrderStore;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ApiError;
use crate::routes::orders::AppState;

// -- Request/response types --

#[derive(Deserialize)]
pub struct AddItemRequest {
    pub item_type: String,
    pub item_id: Uuid,
    pub quantity: i64,
}

#[derive(Deserialize)]
pub struct UpdateQuantityRequest {
    pub quantity: i64,
}

#[derive(Deserialize)]
pub struct MergeRequest {
    pub guest_key: String,
}

#[derive(Serialize)]
pub struct ValidationResponse {
    pub valid: bool,
    pub issues: Vec<String>,
}

fn parse_item_type(s: &str) -> Result<ItemType, ApiError> {
    ItemType::parse(s).ok_or_else(|| ApiError::BadRequest(format!("unknown item type {s:?}")))
}

// -- Handlers --

/// GET /carts/{key} — returns the cart, empty if none exists.
pub async fn get<S: CartStore, C: CatalogStore, O: OrderStore>(
    State(state): State<Arc<AppState<S, C, O>>>,
    Path(key): Path<String>,
) -> Result<Json<Cart>, ApiError> {
    Ok(Json(state.carts.get_cart(&key).await?))
}

/// POST /carts/{key}/items — adds an item, summing quantities on repeat.
pub async fn add_item<S: CartStore, C: CatalogStore, O: OrderStore>(
    State(state): State<Arc<AppState<S, C, O>>>,
    Path(key): Path<String>,
    Json(req): Json<AddItemRequest>,
) -> Result<Json<Cart>, ApiError> {
    let item_type = parse_item_type(&req.item_type)?;
    let cart = state
        .carts
        .add_item(&key, item_type, req.item_id, req.quantity)
        .await?;
    Ok(Json(cart))
}

/// PUT /carts/{key}/items/{item_type}/{item_id} — sets a quantity; zero removes.
pub async fn update_item<S: CartStore, C: CatalogStore, O: OrderStore>(
    State(state): State<Arc<AppState<S, C, O>>>,
    Path((key, item_type, item_id)): Path<(String, String, Uuid)>,
    Json(req): Json<UpdateQuantityRequest>,
) -> Result<Json<Cart>, ApiError> {
    let item_type = parse_item_type(&item_type)?;
    let cart = state
        .carts
        .update_item_quantity(&key, item_type, item_id, req.quantity)
        .await?;
    Ok(Json(cart))
}

/// DELETE /carts/{key}/items/{item_type}/{item_id} — removes an item.
pub async fn remove_item<S: CartStore, C: CatalogStore, O: OrderStore>(
    State(state): State<Arc<AppState<S, C, O>>>,
    Path((key, item_type, item_id)): Path<(String, String, Uuid)>,
) -> Result<Json<Cart>, ApiError> {
    let item_type = parse_item_type(&item_type)?;
    let cart = state.carts.remove_item(&key, item_type, item_id).await?;
    Ok(Json(cart))
}

/// DELETE /carts/{key} — deletes the stored cart.
pub async fn clear<S: CartStore, C: CatalogStore, O: OrderStore>(
    State(state): State<Arc<AppState<S, C, O>>>,
    Path(key): Path<String>,
) -> Result<axum::http::StatusCode, ApiError> {
    state.carts.clear_cart(&key).await?;
    Ok(axum::http::StatusCode::NO_CONTENT)
}

/// POST /carts/{key}/merge — merges a guest cart into this cart.
pub async fn merge<S: CartStore, C: CatalogStore, O: OrderStore>(
    State(state): State<Arc<AppState<S, C, O>>>,
    Path(key): Path<String>,
    Json(req): Json<MergeRequest>,
) -> Result<Json<Cart>, ApiError> {
    let cart = state.carts.merge_guest_cart(&req.guest_key, &key).await?;
    Ok(Json(cart))
}

/// GET /carts/{key}/validate — re-checks items against the live catalog.
pub async fn validate<S: CartStore, C: CatalogStore, O: OrderStore>(
    State(state): State<Arc<AppState<S, C, O>>>,
    Path(key): Path<String>,
) -> Result<Json<ValidationResponse>, ApiError> {
    let issues = state.carts.validate_cart(&key).await?;
    Ok(Json(ValidationResponse {
        valid: issues.is_empty(),
        issues,
    }))
}
