//! Cart aggregate with derived totals.

use common::{ItemType, Money, TaxPolicy, Totals};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A prospective purchase in a cart.
///
/// Title and unit price are snapshots taken at add time; the order core
/// re-prices from the live catalog at commit time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartItem {
    pub item_type: ItemType,
    pub item_id: Uuid,
    pub title: String,
    pub unit_price: Money,
    /// Always >= 1; quantity zero means removal, not storage.
    pub quantity: u32,
}

impl CartItem {
    /// Creates a new cart item.
    pub fn new(
        item_type: ItemType,
        item_id: Uuid,
        title: impl Into<String>,
        unit_price: Money,
        quantity: u32,
    ) -> Self {
        Self {
            item_type,
            item_id,
            title: title.into(),
            unit_price,
            quantity,
        }
    }

    /// Returns `unit_price * quantity`.
    pub fn line_subtotal(&self) -> Money {
        self.unit_price.multiply(self.quantity)
    }
}

/// A per-user cart with totals derived from its items.
///
/// Items are unique per `(item_type, item_id)`. Every mutation recomputes
/// the derived fields from the items; they are never stored independently
/// of the items that produced them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cart {
    items: Vec<CartItem>,
    subtotal: Money,
    tax: Money,
    total: Money,
    item_count: u32,
}

impl Cart {
    /// Creates an empty cart with zero totals.
    pub fn empty() -> Self {
        Self {
            items: Vec::new(),
            subtotal: Money::zero(),
            tax: Money::zero(),
            total: Money::zero(),
            item_count: 0,
        }
    }

    /// Returns the items in the cart.
    pub fn items(&self) -> &[CartItem] {
        &self.items
    }

    /// Returns true if the cart has no items.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Returns an item by its uniqueness key.
    pub fn get_item(&self, item_type: ItemType, item_id: Uuid) -> Option<&CartItem> {
        self.items
            .iter()
            .find(|i| i.item_type == item_type && i.item_id == item_id)
    }

    /// Returns the subtotal over all lines.
    pub fn subtotal(&self) -> Money {
        self.subtotal
    }

    /// Returns the tax on the subtotal.
    pub fn tax(&self) -> Money {
        self.tax
    }

    /// Returns `subtotal + tax`.
    pub fn total(&self) -> Money {
        self.total
    }

    /// Returns the sum of quantities over all lines.
    pub fn item_count(&self) -> u32 {
        self.item_count
    }

    /// Adds an item, summing quantities when the key already exists.
    pub fn upsert_item(&mut self, item: CartItem, policy: TaxPolicy) {
        if let Some(existing) = self
            .items
            .iter_mut()
            .find(|i| i.item_type == item.item_type && i.item_id == item.item_id)
        {
            existing.quantity += item.quantity;
        } else {
            self.items.push(item);
        }
        self.recompute(policy);
    }

    /// Sets an item's quantity; zero removes the item entirely.
    ///
    /// Returns false if the item is not in the cart.
    pub fn set_quantity(
        &mut self,
        item_type: ItemType,
        item_id: Uuid,
        quantity: u32,
        policy: TaxPolicy,
    ) -> bool {
        let Some(pos) = self
            .items
            .iter()
            .position(|i| i.item_type == item_type && i.item_id == item_id)
        else {
            return false;
        };
        if quantity == 0 {
            self.items.remove(pos);
        } else {
            self.items[pos].quantity = quantity;
        }
        self.recompute(policy);
        true
    }

    /// Unions another cart's items into this one, summing quantities on
    /// key collision. Used when a guest cart is merged into a user cart at
    /// login.
    pub fn merge_from(&mut self, other: Cart, policy: TaxPolicy) {
        for item in other.items {
            if let Some(existing) = self
                .items
                .iter_mut()
                .find(|i| i.item_type == item.item_type && i.item_id == item.item_id)
            {
                existing.quantity += item.quantity;
            } else {
                self.items.push(item);
            }
        }
        self.recompute(policy);
    }

    fn recompute(&mut self, policy: TaxPolicy) {
        let totals = Totals::compute(
            self.items.iter().map(|i| (i.unit_price, i.quantity)),
            policy,
        );
        self.subtotal = totals.subtotal;
        self.tax = totals.tax;
        self.total = totals.total;
        self.item_count = totals.item_count;
    }
}

impl Default for Cart {
    fn default() -> Self {
        Self::empty()
    }
}
