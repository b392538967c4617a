//! HTTP API server for the commerce core.
//!
//! Exposes the cart engine and order lifecycle as REST endpoints, with
//! structured logging (tracing) and Prometheus metrics.

pub mod config;
pub mod error;
pub mod routes;

use std::sync::Arc;

use axum::Router;
use axum::routing::{delete, get, post, put};
use cart::{CartService, CartStore, InMemoryCartStore};
use catalog::{CatalogStore, InMemoryCatalog};
use common::TaxPolicy;
use metrics_exporter_prometheus::PrometheusHandle;
use orders::{InMemoryOrderStore, OrderService, OrderStore};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use routes::orders::AppState;

/// Creates the Axum application router with all routes and shared state.
pub fn create_app<S, C, O>(
    state: Arc<AppState<S, C, O>>,
    metrics_handle: PrometheusHandle,
) -> Router
where
    S: CartStore + 'static,
    C: CatalogStore + 'static,
    O: OrderStore + 'static,
{
    let metrics_router = Router::new()
        .route("/metrics", get(routes::metrics::render))
        .with_state(metrics_handle);

    Router::new()
        .route("/health", get(routes::health::check))
        .route("/carts/{key}", get(routes::carts::get::<S, C, O>))
        .route("/carts/{key}", delete(routes::carts::clear::<S, C, O>))
        .route("/carts/{key}/items", post(routes::carts::add_item::<S, C, O>))
        .route(
            "/carts/{key}/items/{item_type}/{item_id}",
            put(routes::carts::update_item::<S, C, O>),
        )
        .route(
            "/carts/{key}/items/{item_type}/{item_id}",
            delete(routes::carts::remove_item::<S, C, O>),
        )
        .route("/carts/{key}/merge", post(routes::carts::merge::<S, C, O>))
        .route("/carts/{key}/validate", get(routes::carts::validate::<S, C, O>))
        .route("/orders", post(routes::orders::checkout::<S, C, O>))
        .route("/orders/{id}", get(routes::orders::get::<S, C, O>))
        .route(
            "/orders/{id}/payment",
            post(routes::orders::attach_payment::<S, C, O>),
        )
        .route("/orders/{id}/paid", post(routes::orders::mark_paid::<S, C, O>))
        .route(
            "/orders/{id}/process",
            post(routes::orders::start_processing::<S, C, O>),
        )
        .route("/orders/{id}/fulfill", post(routes::orders::fulfill::<S, C, O>))
        .route("/orders/{id}/cancel", post(routes::orders::cancel::<S, C, O>))
        .route("/orders/{id}/refund", post(routes::orders::refund::<S, C, O>))
        .with_state(state)
        .merge(metrics_router)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
}

/// Creates application state over the in-memory stores.
///
/// Returns handles to the catalog and order store alongside the state so
/// callers can seed items and users.
pub fn create_default_state(
    tax: TaxPolicy,
) -> (
    Arc<AppState<InMemoryCartStore, InMemoryCatalog, InMemoryOrderStore>>,
    InMemoryCatalog,
    InMemoryOrderStore,
) {
    let catalog = InMemoryCatalog::new();
    let order_store = InMemoryOrderStore::new(catalog.clone(), tax);

    let state = Arc::new(AppState {
        carts: CartService::new(InMemoryCartStore::default(), catalog.clone(), tax),
        orders: OrderService::new(order_store.clone()),
    });

    (state, catalog, order_store)
}
