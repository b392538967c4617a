//! In-memory cart store for tests and local runs.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};

use async_trait::async_trait;

use crate::cart::Cart;
use crate::store::{CartStore, CartStoreError, DEFAULT_CART_TTL_SECS};

/// In-memory cart store with per-entry deadlines and lazy expiry.
#[derive(Debug, Clone)]
pub struct InMemoryCartStore {
    entries: Arc<RwLock<HashMap<String, (Cart, Instant)>>>,
    ttl: Duration,
}

impl InMemoryCartStore {
    /// Creates a store with the given retention window.
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: Arc::new(RwLock::new(HashMap::new())),
            ttl,
        }
    }

    /// Returns the number of stored (possibly expired) carts.
    pub fn len(&self) -> usize {
        self.entries.read().unwrap().len()
    }

    /// Returns true if no carts are stored.
    pub fn is_empty(&self) -> bool {
        self.entries.read().unwrap().is_empty()
    }

    /// Backdates a cart's deadline so the next read sees it expired.
    /// Test hook.
    pub fn expire(&self, key: &str) {
        let mut entries = self.entries.write().unwrap();
        if let Some((_, deadline)) = entries.get_mut(key) {
            *deadline = Instant::now();
        }
    }
}

impl Default for InMemoryCartStore {
    fn default() -> Self {
        Self::new(Duration::from_secs(DEFAULT_CART_TTL_SECS))
    }
}

#[async_trait]
impl CartStore for InMemoryCartStore {
    async fn get(&self, key: &str) -> Result<Option<Cart>, CartStoreError> {
        let expired = {
            let entries = self.entries.read().unwrap();
            match entries.get(key) {
                Some((cart, deadline)) if *deadline > Instant::now() => {
                    return Ok(Some(cart.clone()));
                }
                Some(_) => true,
                None => false,
            }
        };
        if expired {
            self.entries.write().unwrap().remove(key);
        }
        Ok(None)
    }

    async fn put(&self, key: &str, cart: &Cart) -> Result<(), CartStoreError> {
        let deadline = Instant::now() + self.ttl;
        self.entries
            .write()
            .unwrap()
            .insert(key.to_string(), (cart.clone(), deadline));
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), CartStoreError> {
        self.entries.write().unwrap().remove(key);
        Ok(())
    }
}
