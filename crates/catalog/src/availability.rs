//! Availability rules.
//!
//! A pure capability answering "is this item purchasable right now, and at
//! what price?". The check is advisory when called from the cart engine and
//! re-evaluated inside the order transaction at commit time, because a
//! time-of-check/time-of-use gap exists between the two.

use chrono::{DateTime, Utc};
use common::{ItemType, Money};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::CatalogError;
use crate::item::CatalogItem;
use crate::store::CatalogStore;

/// Why an item cannot be purchased. First failing rule wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnavailableReason {
    /// Item does not exist or is soft-deleted.
    NotFound,
    /// Item exists but is not published.
    Unpublished,
    /// Event start time is not in the future.
    AlreadyStarted,
    /// Event has no seats left.
    FullyBooked,
}

impl std::fmt::Display for UnavailableReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            UnavailableReason::NotFound => "not found",
            UnavailableReason::Unpublished => "unpublished",
            UnavailableReason::AlreadyStarted => "already started",
            UnavailableReason::FullyBooked => "fully booked",
        };
        write!(f, "{s}")
    }
}

/// Result of an availability check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Availability {
    pub available: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<UnavailableReason>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_price: Option<Money>,
}

impl Availability {
    fn ok(price: Money) -> Self {
        Self {
            available: true,
            reason: None,
            current_price: Some(price),
        }
    }

    fn unavailable(reason: UnavailableReason) -> Self {
        Self {
            available: false,
            reason: Some(reason),
            current_price: None,
        }
    }

    /// Returns the current price, or the blocking reason.
    pub fn into_result(self) -> Result<Money, UnavailableReason> {
        match (self.available, self.current_price) {
            (true, Some(price)) => Ok(price),
            _ => Err(self.reason.unwrap_or(UnavailableReason::NotFound)),
        }
    }
}

/// Evaluates the purchasability rules against a loaded item.
///
/// Rules in order, first failure wins: existence (soft-delete counts as
/// absent), published flag, and for events a future start time and
/// remaining capacity.
pub fn evaluate(item: Option<&CatalogItem>, now: DateTime<Utc>) -> Availability {
    let Some(item) = item else {
        return Availability::unavailable(UnavailableReason::NotFound);
    };
    if item.deleted_at().is_some() {
        return Availability::unavailable(UnavailableReason::NotFound);
    }
    if !item.is_published() {
        return Availability::unavailable(UnavailableReason::Unpublished);
    }
    if let Some(event) = item.as_event() {
        if event.start_time <= now {
            return Availability::unavailable(UnavailableReason::AlreadyStarted);
        }
        if event.booked_count >= event.capacity {
            return Availability::unavailable(UnavailableReason::FullyBooked);
        }
    }
    Availability::ok(item.price())
}

/// Async wrapper over a catalog store applying [`evaluate`].
#[derive(Debug, Clone)]
pub struct AvailabilityChecker<C> {
    catalog: C,
}

impl<C: CatalogStore> AvailabilityChecker<C> {
    /// Creates a checker over the given catalog store.
    pub fn new(catalog: C) -> Self {
        Self { catalog }
    }

    /// Returns a reference to the underlying catalog store.
    pub fn catalog(&self) -> &C {
        &self.catalog
    }

    /// Checks whether an item is purchasable right now.
    #[tracing::instrument(skip(self))]
    pub async fn check(
        &self,
        item_type: ItemType,
        item_id: Uuid,
    ) -> Result<Availability, CatalogError> {
        let item = self.catalog.get(item_type, item_id).await?;
        Ok(evaluate(item.as_ref(), Utc::now()))
    }

    /// Checks availability and also returns the loaded item, for callers
    /// that need the title/price snapshot (the cart engine).
    pub async fn check_and_fetch(
        &self,
        item_type: ItemType,
        item_id: Uuid,
    ) -> Result<(Option<CatalogItem>, Availability), CatalogError> {
        let item = self.catalog.get(item_type, item_id).await?;
        let availability = evaluate(item.as_ref(), Utc::now());
        Ok((item, availability))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::item::{Course, EventItem};
    use chrono::Duration;

    fn course() -> CatalogItem {
        CatalogItem::Course(Course::new(
            Uuid::new_v4(),
            "Meditation 101",
            Money::from_cents(5999),
        ))
    }

    fn future_event(capacity: u32, booked: u32) -> CatalogItem {
        let mut event = EventItem::new(
            Uuid::new_v4(),
            "Retreat",
            Money::from_cents(14_999),
            Utc::now() + Duration::days(3),
            capacity,
        );
        event.booked_count = booked;
        CatalogItem::Event(event)
    }

    #[test]
    fn absent_item_is_not_found() {
        let availability = evaluate(None, Utc::now());
        assert!(!availability.available);
        assert_eq!(availability.reason, Some(UnavailableReason::NotFound));
        assert_eq!(availability.current_price, None);
    }

    #[test]
    fn soft_deleted_item_is_not_found() {
        let mut item = course();
        if let CatalogItem::Course(c) = &mut item {
            c.deleted_at = Some(Utc::now());
        }
        let availability = evaluate(Some(&item), Utc::now());
        assert_eq!(availability.reason, Some(UnavailableReason::NotFound));
    }

    #[test]
    fn unpublished_beats_event_rules() {
        let mut item = future_event(0, 0);
        if let CatalogItem::Event(e) = &mut item {
            e.is_published = false;
        }
        let availability = evaluate(Some(&item), Utc::now());
        assert_eq!(availability.reason, Some(UnavailableReason::Unpublished));
    }

    #[test]
    fn started_event_is_unavailable() {
        let mut item = future_event(10, 0);
        if let CatalogItem::Event(e) = &mut item {
            e.start_time = Utc::now() - Duration::hours(1);
        }
        let availability = evaluate(Some(&item), Utc::now());
        assert_eq!(availability.reason, Some(UnavailableReason::AlreadyStarted));
    }

    #[test]
    fn full_event_is_unavailable() {
        let availability = evaluate(Some(&future_event(2, 2)), Utc::now());
        assert_eq!(availability.reason, Some(UnavailableReason::FullyBooked));
    }

    #[test]
    fn published_course_is_available_at_current_price() {
        let availability = evaluate(Some(&course()), Utc::now());
        assert!(availability.available);
        assert_eq!(availability.current_price, Some(Money::from_cents(5999)));
        assert_eq!(availability.into_result().unwrap().cents(), 5999);
    }

    #[test]
    fn event_with_remaining_seats_is_available() {
        let availability = evaluate(Some(&future_event(2, 1)), Utc::now());
        assert!(availability.available);
    }
}
