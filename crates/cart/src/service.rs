//! Cart service providing the cart engine operations.

use catalog::{AvailabilityChecker, CatalogStore, UnavailableReason};
use common::{ItemType, TaxPolicy};
use uuid::Uuid;

use crate::cart::{Cart, CartItem};
use crate::error::CartError;
use crate::store::CartStore;

/// High-level cart operations over an ephemeral store and the catalog.
///
/// All availability checks made here are advisory: they inform the user
/// before checkout, while the order core re-validates inside its own
/// transaction.
pub struct CartService<S, C> {
    store: S,
    checker: AvailabilityChecker<C>,
    tax: TaxPolicy,
}

impl<S: CartStore, C: CatalogStore> CartService<S, C> {
    /// Creates a cart service.
    pub fn new(store: S, catalog: C, tax: TaxPolicy) -> Self {
        Self {
            store,
            checker: AvailabilityChecker::new(catalog),
            tax,
        }
    }

    /// Returns the tax policy applied to cart totals.
    pub fn tax_policy(&self) -> TaxPolicy {
        self.tax
    }

    /// Adds an item to the cart, snapshotting its current title and price.
    ///
    /// Quantities sum when the item is already present. Fails with a
    /// not-found error when the catalog item is absent and a validation
    /// error when it is unavailable or the quantity is below one.
    #[tracing::instrument(skip(self))]
    pub async fn add_item(
        &self,
        key: &str,
        item_type: ItemType,
        item_id: Uuid,
        quantity: i64,
    ) -> Result<Cart, CartError> {
        if quantity < 1 {
            return Err(CartError::InvalidQuantity { quantity });
        }
        let quantity =
            u32::try_from(quantity).map_err(|_| CartError::InvalidQuantity { quantity })?;

        let (item, availability) = self.checker.check_and_fetch(item_type, item_id).await?;
        let price = match availability.into_result() {
            Ok(price) => price,
            Err(UnavailableReason::NotFound) => {
                return Err(CartError::ItemNotFound { item_type, item_id });
            }
            Err(reason) => return Err(CartError::ItemUnavailable { reason }),
        };
        let Some(item) = item else {
            return Err(CartError::ItemNotFound { item_type, item_id });
        };

        let mut cart = self.load(key).await?;
        cart.upsert_item(
            CartItem::new(item_type, item_id, item.title(), price, quantity),
            self.tax,
        );
        self.store.put(key, &cart).await?;

        metrics::counter!("cart_items_added").increment(1);
        Ok(cart)
    }

    /// Sets an item's quantity; zero removes it, negative is rejected.
    #[tracing::instrument(skip(self))]
    pub async fn update_item_quantity(
        &self,
        key: &str,
        item_type: ItemType,
        item_id: Uuid,
        quantity: i64,
    ) -> Result<Cart, CartError> {
        if quantity < 0 {
            return Err(CartError::InvalidQuantity { quantity });
        }
        let quantity =
            u32::try_from(quantity).map_err(|_| CartError::InvalidQuantity { quantity })?;

        let mut cart = self.load(key).await?;
        if !cart.set_quantity(item_type, item_id, quantity, self.tax) {
            return Err(CartError::CartItemNotFound { item_type, item_id });
        }
        self.store.put(key, &cart).await?;
        Ok(cart)
    }

    /// Removes an item from the cart.
    pub async fn remove_item(
        &self,
        key: &str,
        item_type: ItemType,
        item_id: Uuid,
    ) -> Result<Cart, CartError> {
        self.update_item_quantity(key, item_type, item_id, 0).await
    }

    /// Returns the current cart, or an empty cart if none exists.
    #[tracing::instrument(skip(self))]
    pub async fn get_cart(&self, key: &str) -> Result<Cart, CartError> {
        self.load(key).await
    }

    /// Deletes the stored cart entirely (used after fulfillment).
    #[tracing::instrument(skip(self))]
    pub async fn clear_cart(&self, key: &str) -> Result<(), CartError> {
        self.store.delete(key).await?;
        Ok(())
    }

    /// Merges a guest cart into a user cart at login.
    ///
    /// Quantities sum on key collision; the merged cart is persisted under
    /// `user_key` and the guest cart is deleted. Idempotent: a second call
    /// finds no guest cart and leaves the user cart untouched.
    #[tracing::instrument(skip(self))]
    pub async fn merge_guest_cart(
        &self,
        guest_key: &str,
        user_key: &str,
    ) -> Result<Cart, CartError> {
        let guest = self.store.get(guest_key).await?;
        let mut user = self.load(user_key).await?;

        if let Some(guest) = guest {
            user.merge_from(guest, self.tax);
            self.store.put(user_key, &user).await?;
            self.store.delete(guest_key).await?;
            metrics::counter!("cart_merges").increment(1);
        }

        Ok(user)
    }

    /// Re-checks every cart item against current catalog state and returns
    /// human-readable discrepancies. An empty list means the cart is safe
    /// to check out. Never mutates the cart.
    #[tracing::instrument(skip(self))]
    pub async fn validate_cart(&self, key: &str) -> Result<Vec<String>, CartError> {
        let cart = self.load(key).await?;
        let mut issues = Vec::new();

        for item in cart.items() {
            let availability = self.checker.check(item.item_type, item.item_id).await?;
            match availability.into_result() {
                Err(reason) => {
                    issues.push(format!("\"{}\" is no longer available: {reason}", item.title));
                }
                Ok(price) if price != item.unit_price => {
                    issues.push(format!(
                        "price of \"{}\" changed from {} to {}",
                        item.title, item.unit_price, price
                    ));
                }
                Ok(_) => {}
            }
        }

        Ok(issues)
    }

    async fn load(&self, key: &str) -> Result<Cart, CartError> {
        Ok(self.store.get(key).await?.unwrap_or_else(Cart::empty))
    }
}
