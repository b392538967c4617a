//! Cart engine: an ephemeral, per-user collection of prospective purchases
//! with derived totals.
//!
//! Carts live in a keyed, expiring store (Redis in production, an in-memory
//! map in tests) and are cache-only: the durable source of truth for a
//! purchase is always the order, never the cart. Nothing here is a
//! concurrency-safety boundary; the store provides last-write-wins
//! persistence per user key.

pub mod cart;
pub mod error;
pub mod memory;
pub mod redis;
pub mod service;
pub mod store;

pub use cart::{Cart, CartItem};
pub use error::CartError;
pub use memory::InMemoryCartStore;
pub use redis::RedisCartStore;
pub use service::CartService;
pub use store::{CartStore, CartStoreError, DEFAULT_CART_TTL_SECS};
