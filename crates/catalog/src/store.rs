//! Catalog store trait.

use async_trait::async_trait;
use common::ItemType;
use uuid::Uuid;

use crate::error::CatalogError;
use crate::item::CatalogItem;

/// Read access to catalog records.
///
/// Soft-deleted rows are returned with `deleted_at` set; the availability
/// rules map them to "not found". Counter mutations happen inside the order
/// core's transactions, not through this trait.
#[async_trait]
pub trait CatalogStore: Send + Sync {
    /// Loads a catalog item by type and ID.
    async fn get(&self, item_type: ItemType, item_id: Uuid)
    -> Result<Option<CatalogItem>, CatalogError>;
}
