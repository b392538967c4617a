//! API server entry point.

use std::sync::Arc;

use api::config::Config;
use api::routes::orders::AppState;
use cart::{CartService, CartStore, RedisCartStore};
use catalog::{CatalogStore, PostgresCatalog};
use orders::{OrderService, PostgresOrderStore};
use tokio::signal;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Waits for a shutdown signal (SIGINT or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install SIGINT handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("received SIGINT, starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("received SIGTERM, starting graceful shutdown");
        }
    }
}

async fn serve<S, C, O>(
    state: Arc<AppState<S, C, O>>,
    metrics_handle: metrics_exporter_prometheus::PrometheusHandle,
    config: &Config,
) where
    S: CartStore + 'static,
    C: CatalogStore + 'static,
    O: orders::OrderStore + 'static,
{
    let app = api::create_app(state, metrics_handle);
    let addr = config.addr();
    tracing::info!(%addr, "starting API server");

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .expect("failed to bind address");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("server error");

    tracing::info!("server shut down gracefully");
}

#[tokio::main]
async fn main() {
    let config = Config::from_env();

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let prometheus_builder = metrics_exporter_prometheus::PrometheusBuilder::new();
    let metrics_handle = prometheus_builder
        .install_recorder()
        .expect("failed to install Prometheus recorder");

    // Postgres + Redis when configured, in-memory stores otherwise.
    match (&config.database_url, &config.redis_url) {
        (Some(database_url), Some(redis_url)) => {
            let pool = sqlx::postgres::PgPoolOptions::new()
                .max_connections(10)
                .connect(database_url)
                .await
                .expect("failed to connect to Postgres");

            let order_store = PostgresOrderStore::new(pool.clone(), config.tax_policy());
            order_store
                .run_migrations()
                .await
                .expect("failed to run migrations");

            let cart_store = RedisCartStore::connect(redis_url, None, config.cart_ttl_secs)
                .await
                .expect("failed to connect to Redis");

            let state = Arc::new(AppState {
                carts: CartService::new(
                    cart_store,
                    PostgresCatalog::new(pool),
                    config.tax_policy(),
                ),
                orders: OrderService::new(order_store),
            });
            serve(state, metrics_handle, &config).await;
        }
        _ => {
            tracing::warn!("DATABASE_URL/REDIS_URL not set, using in-memory stores");
            let (state, _catalog, _orders) = api::create_default_state(config.tax_policy());
            serve(state, metrics_handle, &config).await;
        }
    }
}
