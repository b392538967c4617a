//! Application configuration loaded from environment variables.

use cart::DEFAULT_CART_TTL_SECS;
use common::{DEFAULT_TAX_BASIS_POINTS, TaxPolicy};

/// Server configuration with sensible defaults.
///
/// Reads from environment variables:
/// - `HOST` — bind address (default: `"0.0.0.0"`)
/// - `PORT` — listen port (default: `3000`)
/// - `RUST_LOG` — tracing filter directive (default: `"info"`)
/// - `DATABASE_URL` — Postgres connection string (in-memory stores when unset)
/// - `REDIS_URL` — Redis connection string for the cart store
/// - `CART_TTL_SECS` — cart expiry in seconds (default: 7 days)
/// - `TAX_RATE_BASIS_POINTS` — flat tax rate (default: 800 = 8%)
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub log_level: String,
    pub database_url: Option<String>,
    pub redis_url: Option<String>,
    pub cart_ttl_secs: u64,
    pub tax_basis_points: u32,
}

impl Config {
    /// Loads configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self {
            host: std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: std::env::var("PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(3000),
            log_level: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
            database_url: std::env::var("DATABASE_URL").ok(),
            redis_url: std::env::var("REDIS_URL").ok(),
            cart_ttl_secs: std::env::var("CART_TTL_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(DEFAULT_CART_TTL_SECS),
            tax_basis_points: std::env::var("TAX_RATE_BASIS_POINTS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(DEFAULT_TAX_BASIS_POINTS),
        }
    }

    /// Returns the `"host:port"` bind address string.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Returns the tax policy this deployment applies.
    pub fn tax_policy(&self) -> TaxPolicy {
        TaxPolicy::new(self.tax_basis_points)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            log_level: "info".to_string(),
            database_url: None,
            redis_url: None,
            cart_ttl_secs: DEFAULT_CART_TTL_SECS,
            tax_basis_points: DEFAULT_TAX_BASIS_POINTS,
        }
    }
}
