//! Cart engine error types.

use catalog::{CatalogError, UnavailableReason};
use common::{ErrorKind, ItemType};
use thiserror::Error;
use uuid::Uuid;

use crate::store::CartStoreError;

/// Errors that can occur during cart operations.
#[derive(Debug, Error)]
pub enum CartError {
    /// The referenced catalog item does not exist (or is soft-deleted).
    #[error("catalog item not found: {item_type} {item_id}")]
    ItemNotFound { item_type: ItemType, item_id: Uuid },

    /// The catalog item exists but cannot be purchased right now.
    #[error("item is not available: {reason}")]
    ItemUnavailable { reason: UnavailableReason },

    /// The item is not in the cart.
    #[error("cart item not found: {item_type} {item_id}")]
    CartItemNotFound { item_type: ItemType, item_id: Uuid },

    /// The requested quantity is invalid.
    #[error("invalid quantity: {quantity}")]
    InvalidQuantity { quantity: i64 },

    /// The ephemeral store failed.
    #[error(transparent)]
    Store(#[from] CartStoreError),

    /// The catalog store failed.
    #[error(transparent)]
    Catalog(#[from] CatalogError),
}

impl CartError {
    /// Classifies the error for the request layer.
    pub fn kind(&self) -> ErrorKind {
        match self {
            CartError::ItemNotFound { .. } | CartError::CartItemNotFound { .. } => {
                ErrorKind::NotFound
            }
            CartError::ItemUnavailable { .. } | CartError::InvalidQuantity { .. } => {
                ErrorKind::Validation
            }
            CartError::Store(e) => e.kind(),
            CartError::Catalog(e) => e.kind(),
        }
    }
}
