//! Catalog item variants.

use chrono::{DateTime, Utc};
use common::{ItemType, Money};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A purchasable course.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Course {
    pub id: Uuid,
    pub title: String,
    pub price: Money,
    pub is_published: bool,
    pub deleted_at: Option<DateTime<Utc>>,
    /// Number of active enrollments, maintained by order fulfillment.
    pub enrolled_count: u32,
}

impl Course {
    /// Creates a published course with no enrollments.
    pub fn new(id: Uuid, title: impl Into<String>, price: Money) -> Self {
        Self {
            id,
            title: title.into(),
            price,
            is_published: true,
            deleted_at: None,
            enrolled_count: 0,
        }
    }
}

/// A scheduled event with limited seating.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventItem {
    pub id: Uuid,
    pub title: String,
    pub price: Money,
    pub is_published: bool,
    pub deleted_at: Option<DateTime<Utc>>,
    pub start_time: DateTime<Utc>,
    /// Total seats available.
    pub capacity: u32,
    /// Seats claimed by orders. Never exceeds `capacity`.
    pub booked_count: u32,
}

impl EventItem {
    /// Creates a published event with no seats claimed.
    pub fn new(
        id: Uuid,
        title: impl Into<String>,
        price: Money,
        start_time: DateTime<Utc>,
        capacity: u32,
    ) -> Self {
        Self {
            id,
            title: title.into(),
            price,
            is_published: true,
            deleted_at: None,
            start_time,
            capacity,
            booked_count: 0,
        }
    }

    /// Returns the number of unclaimed seats.
    pub fn remaining_capacity(&self) -> u32 {
        self.capacity.saturating_sub(self.booked_count)
    }
}

/// A digital product granted as a download.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DigitalProduct {
    pub id: Uuid,
    pub title: String,
    pub price: Money,
    pub is_published: bool,
    pub deleted_at: Option<DateTime<Utc>>,
    /// Number of active download grants, maintained by order fulfillment.
    pub download_count: u32,
}

impl DigitalProduct {
    /// Creates a published digital product with no grants.
    pub fn new(id: Uuid, title: impl Into<String>, price: Money) -> Self {
        Self {
            id,
            title: title.into(),
            price,
            is_published: true,
            deleted_at: None,
            download_count: 0,
        }
    }
}

/// A purchasable catalog entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "item_type", rename_all = "snake_case")]
pub enum CatalogItem {
    Course(Course),
    Event(EventItem),
    DigitalProduct(DigitalProduct),
}

impl CatalogItem {
    /// Returns the item's identifier.
    pub fn id(&self) -> Uuid {
        match self {
            CatalogItem::Course(c) => c.id,
            CatalogItem::Event(e) => e.id,
            CatalogItem::DigitalProduct(p) => p.id,
        }
    }

    /// Returns the item's type tag.
    pub fn item_type(&self) -> ItemType {
        match self {
            CatalogItem::Course(_) => ItemType::Course,
            CatalogItem::Event(_) => ItemType::Event,
            CatalogItem::DigitalProduct(_) => ItemType::DigitalProduct,
        }
    }

    /// Returns the item's title.
    pub fn title(&self) -> &str {
        match self {
            CatalogItem::Course(c) => &c.title,
            CatalogItem::Event(e) => &e.title,
            CatalogItem::DigitalProduct(p) => &p.title,
        }
    }

    /// Returns the current price.
    pub fn price(&self) -> Money {
        match self {
            CatalogItem::Course(c) => c.price,
            CatalogItem::Event(e) => e.price,
            CatalogItem::DigitalProduct(p) => p.price,
        }
    }

    /// Returns true if the item is published.
    pub fn is_published(&self) -> bool {
        match self {
            CatalogItem::Course(c) => c.is_published,
            CatalogItem::Event(e) => e.is_published,
            CatalogItem::DigitalProduct(p) => p.is_published,
        }
    }

    /// Returns the soft-delete timestamp, if any.
    pub fn deleted_at(&self) -> Option<DateTime<Utc>> {
        match self {
            CatalogItem::Course(c) => c.deleted_at,
            CatalogItem::Event(e) => e.deleted_at,
            CatalogItem::DigitalProduct(p) => p.deleted_at,
        }
    }

    /// Returns the event variant, if this item is an event.
    pub fn as_event(&self) -> Option<&EventItem> {
        match self {
            CatalogItem::Event(e) => Some(e),
            _ => None,
        }
    }

    /// Returns the course record, if this item is a course.
    pub fn as_course(&self) -> Option<&Course> {
        match self {
            CatalogItem::Course(c) => Some(c),
            _ => None,
        }
    }

    /// Returns the digital product record, if this item is one.
    pub fn as_digital_product(&self) -> Option<&DigitalProduct> {
        match self {
            CatalogItem::DigitalProduct(p) => Some(p),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn accessors_cover_all_variants() {
        let id = Uuid::new_v4();
        let course = CatalogItem::Course(Course::new(id, "Breathwork Basics", Money::from_cents(5999)));
        assert_eq!(course.id(), id);
        assert_eq!(course.item_type(), ItemType::Course);
        assert_eq!(course.title(), "Breathwork Basics");
        assert_eq!(course.price().cents(), 5999);
        assert!(course.is_published());
        assert!(course.deleted_at().is_none());
        assert!(course.as_event().is_none());
    }

    #[test]
    fn event_remaining_capacity_saturates() {
        let mut event = EventItem::new(
            Uuid::new_v4(),
            "Full Moon Retreat",
            Money::from_cents(14_999),
            Utc::now() + Duration::days(7),
            10,
        );
        assert_eq!(event.remaining_capacity(), 10);
        event.booked_count = 12;
        assert_eq!(event.remaining_capacity(), 0);
    }

    #[test]
    fn serde_tags_by_item_type() {
        let event = CatalogItem::Event(EventItem::new(
            Uuid::new_v4(),
            "Retreat",
            Money::from_cents(100),
            Utc::now(),
            5,
        ));
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["item_type"], "event");
        let back: CatalogItem = serde_json::from_value(json).unwrap();
        assert_eq!(back, event);
    }
}
