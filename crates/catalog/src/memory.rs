//! In-memory catalog for tests and local runs.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use chrono::Utc;
use common::{ItemType, Money};
use uuid::Uuid;

use crate::availability::{UnavailableReason, evaluate};
use crate::error::CatalogError;
use crate::item::CatalogItem;
use crate::store::CatalogStore;

/// In-memory catalog store.
///
/// Besides the read trait it exposes the admin-side mutations (normally
/// owned by an external collaborator) and the counter/seat operations the
/// in-memory order store applies during create/fulfill/refund. Seat claims
/// are atomic under the write lock, which stands in for the relational
/// store's row-level locking.
#[derive(Debug, Clone, Default)]
pub struct InMemoryCatalog {
    items: Arc<RwLock<HashMap<(ItemType, Uuid), CatalogItem>>>,
}

impl InMemoryCatalog {
    /// Creates an empty catalog.
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or replaces a catalog item.
    pub fn insert(&self, item: CatalogItem) {
        let key = (item.item_type(), item.id());
        self.items.write().unwrap().insert(key, item);
    }

    /// Returns a snapshot of an item.
    pub fn fetch(&self, item_type: ItemType, item_id: Uuid) -> Option<CatalogItem> {
        self.items.read().unwrap().get(&(item_type, item_id)).cloned()
    }

    /// Changes an item's price. Returns false if the item is absent.
    pub fn set_price(&self, item_type: ItemType, item_id: Uuid, price: Money) -> bool {
        let mut items = self.items.write().unwrap();
        match items.get_mut(&(item_type, item_id)) {
            Some(CatalogItem::Course(c)) => {
                c.price = price;
                true
            }
            Some(CatalogItem::Event(e)) => {
                e.price = price;
                true
            }
            Some(CatalogItem::DigitalProduct(p)) => {
                p.price = price;
                true
            }
            None => false,
        }
    }

    /// Publishes or unpublishes an item. Returns false if absent.
    pub fn set_published(&self, item_type: ItemType, item_id: Uuid, published: bool) -> bool {
        let mut items = self.items.write().unwrap();
        match items.get_mut(&(item_type, item_id)) {
            Some(CatalogItem::Course(c)) => {
                c.is_published = published;
                true
            }
            Some(CatalogItem::Event(e)) => {
                e.is_published = published;
                true
            }
            Some(CatalogItem::DigitalProduct(p)) => {
                p.is_published = published;
                true
            }
            None => false,
        }
    }

    /// Soft-deletes an item. Returns false if absent.
    pub fn soft_delete(&self, item_type: ItemType, item_id: Uuid) -> bool {
        let now = Utc::now();
        let mut items = self.items.write().unwrap();
        match items.get_mut(&(item_type, item_id)) {
            Some(CatalogItem::Course(c)) => {
                c.deleted_at = Some(now);
                true
            }
            Some(CatalogItem::Event(e)) => {
                e.deleted_at = Some(now);
                true
            }
            Some(CatalogItem::DigitalProduct(p)) => {
                p.deleted_at = Some(now);
                true
            }
            None => false,
        }
    }

    /// Atomically claims `quantity` seats on an event, re-running the full
    /// availability rules first. This is the in-memory equivalent of the
    /// conditional UPDATE the relational store issues inside the order
    /// transaction.
    pub fn claim_event_seats(
        &self,
        event_id: Uuid,
        quantity: u32,
    ) -> Result<(), UnavailableReason> {
        let mut items = self.items.write().unwrap();
        let item = items
            .get_mut(&(ItemType::Event, event_id))
            .ok_or(UnavailableReason::NotFound)?;

        // Evaluate on a snapshot, then apply under the same lock.
        let snapshot = item.clone();
        evaluate(Some(&snapshot), Utc::now()).into_result()?;

        let CatalogItem::Event(event) = item else {
            return Err(UnavailableReason::NotFound);
        };
        if event.booked_count + quantity > event.capacity {
            return Err(UnavailableReason::FullyBooked);
        }
        event.booked_count += quantity;
        Ok(())
    }

    /// Releases previously claimed event seats, flooring at zero.
    pub fn release_event_seats(&self, event_id: Uuid, quantity: u32) {
        let mut items = self.items.write().unwrap();
        if let Some(CatalogItem::Event(event)) = items.get_mut(&(ItemType::Event, event_id)) {
            event.booked_count = event.booked_count.saturating_sub(quantity);
        }
    }

    /// Increments a course's enrollment counter.
    pub fn increment_enrollment(&self, course_id: Uuid) {
        let mut items = self.items.write().unwrap();
        if let Some(CatalogItem::Course(course)) = items.get_mut(&(ItemType::Course, course_id)) {
            course.enrolled_count += 1;
        }
    }

    /// Decrements a course's enrollment counter, flooring at zero.
    pub fn decrement_enrollment(&self, course_id: Uuid) {
        let mut items = self.items.write().unwrap();
        if let Some(CatalogItem::Course(course)) = items.get_mut(&(ItemType::Course, course_id)) {
            course.enrolled_count = course.enrolled_count.saturating_sub(1);
        }
    }

    /// Increments a digital product's download counter.
    pub fn increment_downloads(&self, product_id: Uuid) {
        let mut items = self.items.write().unwrap();
        if let Some(CatalogItem::DigitalProduct(product)) =
            items.get_mut(&(ItemType::DigitalProduct, product_id))
        {
            product.download_count += 1;
        }
    }

    /// Decrements a digital product's download counter, flooring at zero.
    pub fn decrement_downloads(&self, product_id: Uuid) {
        let mut items = self.items.write().unwrap();
        if let Some(CatalogItem::DigitalProduct(product)) =
            items.get_mut(&(ItemType::DigitalProduct, product_id))
        {
            product.download_count = product.download_count.saturating_sub(1);
        }
    }
}

#[async_trait]
impl CatalogStore for InMemoryCatalog {
    async fn get(
        &self,
        item_type: ItemType,
        item_id: Uuid,
    ) -> Result<Option<CatalogItem>, CatalogError> {
        Ok(self.fetch(item_type, item_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::item::{Course, EventItem};
    use chrono::Duration;

    fn seeded_event(capacity: u32) -> (InMemoryCatalog, Uuid) {
        let catalog = InMemoryCatalog::new();
        let id = Uuid::new_v4();
        catalog.insert(CatalogItem::Event(EventItem::new(
            id,
            "Retreat",
            Money::from_cents(14_999),
            Utc::now() + Duration::days(1),
            capacity,
        )));
        (catalog, id)
    }

    #[tokio::test]
    async fn get_returns_inserted_item() {
        let catalog = InMemoryCatalog::new();
        let id = Uuid::new_v4();
        catalog.insert(CatalogItem::Course(Course::new(
            id,
            "Meditation 101",
            Money::from_cents(5999),
        )));

        let item = catalog.get(ItemType::Course, id).await.unwrap().unwrap();
        assert_eq!(item.title(), "Meditation 101");
        assert!(catalog.get(ItemType::Event, id).await.unwrap().is_none());
    }

    #[test]
    fn claim_seats_enforces_capacity() {
        let (catalog, id) = seeded_event(2);

        catalog.claim_event_seats(id, 1).unwrap();
        catalog.claim_event_seats(id, 1).unwrap();
        let err = catalog.claim_event_seats(id, 1).unwrap_err();
        assert_eq!(err, UnavailableReason::FullyBooked);
    }

    #[test]
    fn claim_more_than_remaining_fails_whole_claim() {
        let (catalog, id) = seeded_event(3);
        catalog.claim_event_seats(id, 2).unwrap();

        assert_eq!(
            catalog.claim_event_seats(id, 2),
            Err(UnavailableReason::FullyBooked)
        );
        // The failed claim must not consume the last seat.
        catalog.claim_event_seats(id, 1).unwrap();
    }

    #[test]
    fn release_seats_floors_at_zero() {
        let (catalog, id) = seeded_event(2);
        catalog.claim_event_seats(id, 1).unwrap();
        catalog.release_event_seats(id, 5);

        let item = catalog.fetch(ItemType::Event, id).unwrap();
        assert_eq!(item.as_event().unwrap().booked_count, 0);
    }

    #[test]
    fn enrollment_counter_floors_at_zero() {
        let catalog = InMemoryCatalog::new();
        let id = Uuid::new_v4();
        catalog.insert(CatalogItem::Course(Course::new(
            id,
            "Meditation 101",
            Money::from_cents(5999),
        )));

        catalog.decrement_enrollment(id);
        catalog.increment_enrollment(id);
        catalog.increment_enrollment(id);
        catalog.decrement_enrollment(id);

        let CatalogItem::Course(course) = catalog.fetch(ItemType::Course, id).unwrap() else {
            panic!("expected course");
        };
        assert_eq!(course.enrolled_count, 1);
    }

    #[test]
    fn soft_delete_marks_item() {
        let (catalog, id) = seeded_event(2);
        assert!(catalog.soft_delete(ItemType::Event, id));
        let item = catalog.fetch(ItemType::Event, id).unwrap();
        assert!(item.deleted_at().is_some());
    }
}
