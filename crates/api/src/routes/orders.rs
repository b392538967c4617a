//! Checkout and order lifecycle endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use cart::{CartService, CartStore};
use catalog::CatalogStore;
use common::{OrderId, UserId};
use orders::{Order, OrderService, OrderStore};
use serde::Deserialize;
use uuid::Uuid;

use crate::error::ApiError;

/// Shared application state accessible from all handlers.
pub struct AppState<S, C, O> {
    pub carts: CartService<S, C>,
    pub orders: OrderService<O>,
}

// -- Request types --

#[derive(Deserialize)]
pub struct CheckoutRequest {
    pub user_id: Uuid,
    pub cart_key: String,
}

#[derive(Deserialize)]
pub struct AttachPaymentRequest {
    pub payment_reference: String,
}

#[derive(Default, Deserialize)]
pub struct FulfillRequest {
    pub cart_key: Option<String>,
}

// -- Handlers --

/// POST /orders — checkout: turns the cart into an order.
///
/// The cart is kept: a checkout whose payment later fails or is cancelled
/// leaves the user with their selections intact. Fulfillment clears it.
#[tracing::instrument(skip(state, req))]
pub async fn checkout<S: CartStore, C: CatalogStore, O: OrderStore>(
    State(state): State<Arc<AppState<S, C, O>>>,
    Json(req): Json<CheckoutRequest>,
) -> Result<(StatusCode, Json<Order>), ApiError> {
    let cart = state.carts.get_cart(&req.cart_key).await?;
    let order = state
        .orders
        .create_order(UserId::from_uuid(req.user_id), cart.items())
        .await?;
    Ok((StatusCode::CREATED, Json(order)))
}

/// GET /orders/{id} — returns an order with its lines.
pub async fn get<S: CartStore, C: CatalogStore, O: OrderStore>(
    State(state): State<Arc<AppState<S, C, O>>>,
    Path(id): Path<Uuid>,
) -> Result<Json<Order>, ApiError> {
    let order = state.orders.get_order(OrderId::from_uuid(id)).await?;
    Ok(Json(order))
}

/// POST /orders/{id}/payment — attaches an external payment reference.
#[tracing::instrument(skip(state, req))]
pub async fn attach_payment<S: CartStore, C: CatalogStore, O: OrderStore>(
    State(state): State<Arc<AppState<S, C, O>>>,
    Path(id): Path<Uuid>,
    Json(req): Json<AttachPaymentRequest>,
) -> Result<Json<Order>, ApiError> {
    let order = state
        .orders
        .attach_payment_reference(OrderId::from_uuid(id), &req.payment_reference)
        .await?;
    Ok(Json(order))
}

/// POST /orders/{id}/paid — payment confirmation from the payment provider.
#[tracing::instrument(skip(state))]
pub async fn mark_paid<S: CartStore, C: CatalogStore, O: OrderStore>(
    State(state): State<Arc<AppState<S, C, O>>>,
    Path(id): Path<Uuid>,
) -> Result<Json<Order>, ApiError> {
    let order = state.orders.mark_paid(OrderId::from_uuid(id)).await?;
    Ok(Json(order))
}

/// POST /orders/{id}/process — moves a paid order into fulfillment.
#[tracing::instrument(skip(state))]
pub async fn start_processing<S: CartStore, C: CatalogStore, O: OrderStore>(
    State(state): State<Arc<AppState<S, C, O>>>,
    Path(id): Path<Uuid>,
) -> Result<Json<Order>, ApiError> {
    let order = state.orders.start_processing(OrderId::from_uuid(id)).await?;
    Ok(Json(order))
}

/// POST /orders/{id}/fulfill — applies fulfillment side effects.
///
/// Safe to call more than once; redelivered webhooks get the completed
/// order back without new side effects. When the body names the
/// originating `cart_key`, the now-fulfilled cart is cleared; the order
/// stays fulfilled even if that clear fails.
#[tracing::instrument(skip(state, req))]
pub async fn fulfill<S: CartStore, C: CatalogStore, O: OrderStore>(
    State(state): State<Arc<AppState<S, C, O>>>,
    Path(id): Path<Uuid>,
    req: Option<Json<FulfillRequest>>,
) -> Result<Json<Order>, ApiError> {
    let order = state.orders.fulfill_order(OrderId::from_uuid(id)).await?;
    if let Some(cart_key) = req.and_then(|Json(req)| req.cart_key) {
        if let Err(err) = state.carts.clear_cart(&cart_key).await {
            tracing::warn!(%cart_key, error = %err, "failed to clear cart after fulfillment");
        }
    }
    Ok(Json(order))
}

/// POST /orders/{id}/cancel — cancels before payment confirmation.
#[tracing::instrument(skip(state))]
pub async fn cancel<S: CartStore, C: CatalogStore, O: OrderStore>(
    State(state): State<Arc<AppState<S, C, O>>>,
    Path(id): Path<Uuid>,
) -> Result<Json<Order>, ApiError> {
    let order = state.orders.cancel_order(OrderId::from_uuid(id)).await?;
    Ok(Json(order))
}

/// POST /orders/{id}/refund — refunds a completed order.
#[tracing::instrument(skip(state))]
pub async fn refund<S: CartStore, C: CatalogStore, O: OrderStore>(
    State(state): State<Arc<AppState<S, C, O>>>,
    Path(id): Path<Uuid>,
) -> Result<Json<Order>, ApiError> {
    let order = state.orders.refund_order(OrderId::from_uuid(id)).await?;
    Ok(Json(order))
}
