//! Cart store trait.

use async_trait::async_trait;
use thiserror::Error;

use common::ErrorKind;

use crate::cart::Cart;

/// Default cart retention window: seven days.
pub const DEFAULT_CART_TTL_SECS: u64 = 7 * 24 * 60 * 60;

/// Errors raised by cart store implementations.
#[derive(Debug, Error)]
pub enum CartStoreError {
    /// The ephemeral store is unreachable or failed a command.
    #[error("cart store error: {0}")]
    Redis(#[from] redis::RedisError),

    /// The stored cart blob could not be (de)serialized.
    #[error("cart serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl CartStoreError {
    /// Classifies the error for the request layer.
    pub fn kind(&self) -> ErrorKind {
        ErrorKind::Infrastructure
    }
}

/// Keyed, expiring cart storage.
///
/// Keys are opaque user/session identifiers. Writes refresh the retention
/// window; an untouched cart disappears after it elapses. Implementations
/// provide last-write-wins semantics only; correctness enforcement lives
/// in the order core's transactions, never here.
#[async_trait]
pub trait CartStore: Send + Sync {
    /// Loads the cart stored under `key`, if present and unexpired.
    async fn get(&self, key: &str) -> Result<Option<Cart>, CartStoreError>;

    /// Stores the cart under `key` with a fresh retention window.
    async fn put(&self, key: &str, cart: &Cart) -> Result<(), CartStoreError>;

    /// Deletes the cart stored under `key`, if any.
    async fn delete(&self, key: &str) -> Result<(), CartStoreError>;
}
