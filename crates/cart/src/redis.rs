//! Redis-backed cart store.

use async_trait::async_trait;
use redis::{AsyncCommands, Client, aio::ConnectionManager};
use tracing::{debug, info};

use crate::cart::Cart;
use crate::store::{CartStore, CartStoreError};

/// Cart storage in Redis.
///
/// Each cart is one JSON blob under `<prefix>:cart:<key>`, written with
/// `SET .. EX` so the retention window is refreshed on every write and
/// expiry is enforced server-side.
pub struct RedisCartStore {
    conn: ConnectionManager,
    key_prefix: String,
    ttl_secs: u64,
}

impl RedisCartStore {
    /// Connects to Redis.
    ///
    /// # Arguments
    /// * `url` - Redis connection URL (e.g., redis://localhost:6379)
    /// * `key_prefix` - Prefix for all keys (default: "commerce")
    /// * `ttl_secs` - Cart retention window in seconds
    pub async fn connect(
        url: &str,
        key_prefix: Option<&str>,
        ttl_secs: u64,
    ) -> Result<Self, CartStoreError> {
        let client = Client::open(url)?;
        let conn = ConnectionManager::new(client).await?;

        info!(url = %url, ttl_secs, "connected to Redis for carts");

        Ok(Self {
            conn,
            key_prefix: key_prefix.unwrap_or("commerce").to_string(),
            ttl_secs,
        })
    }

    fn cart_key(&self, key: &str) -> String {
        format!("{}:cart:{}", self.key_prefix, key)
    }
}

#[async_trait]
impl CartStore for RedisCartStore {
    async fn get(&self, key: &str) -> Result<Option<Cart>, CartStoreError> {
        let redis_key = self.cart_key(key);
        let mut conn = self.conn.clone();

        let raw: Option<String> = conn.get(&redis_key).await?;
        match raw {
            Some(json) => {
                let cart = serde_json::from_str(&json)?;
                debug!(key = %key, "loaded cart from Redis");
                Ok(Some(cart))
            }
            None => Ok(None),
        }
    }

    async fn put(&self, key: &str, cart: &Cart) -> Result<(), CartStoreError> {
        let redis_key = self.cart_key(key);
        let mut conn = self.conn.clone();

        let json = serde_json::to_string(cart)?;
        let _: () = conn.set_ex(&redis_key, json, self.ttl_secs).await?;

        debug!(key = %key, items = cart.items().len(), "stored cart in Redis");
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), CartStoreError> {
        let redis_key = self.cart_key(key);
        let mut conn = self.conn.clone();

        let _: () = conn.del(&redis_key).await?;
        Ok(())
    }
}
