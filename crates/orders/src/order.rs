//! Order aggregate and booking records.

use chrono::{DateTime, Utc};
use common::{ItemType, Money, OrderId, UserId};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::status::OrderStatus;

/// A frozen order line.
///
/// Title, unit price, and line subtotal are captured when the order is
/// created and never change afterwards, regardless of later catalog edits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderLine {
    pub item_type: ItemType,
    pub item_id: Uuid,
    pub title: String,
    pub unit_price: Money,
    pub quantity: u32,
    pub line_subtotal: Money,
}

impl OrderLine {
    /// Creates a line, deriving the line subtotal.
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
            line_subtotal: unit_price.multiply(quantity),
        }
    }
}

/// The durable record of a purchase.
///
/// Created atomically with its lines in a single transaction; totals are
/// captured at creation time and stay frozen independent of later catalog
/// price changes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub user_id: UserId,
    pub status: OrderStatus,
    pub subtotal: Money,
    pub tax: Money,
    pub total: Money,
    pub payment_reference: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub items: Vec<OrderLine>,
}

impl Order {
    /// Returns the line for a given catalog item, if present.
    pub fn get_line(&self, item_type: ItemType, item_id: Uuid) -> Option<&OrderLine> {
        self.items
            .iter()
            .find(|l| l.item_type == item_type && l.item_id == item_id)
    }
}

/// Status of an event seat reservation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BookingStatus {
    Confirmed,
    Cancelled,
}

impl BookingStatus {
    /// Returns the storage/wire name of this status.
    pub fn as_str(self) -> &'static str {
        match self {
            BookingStatus::Confirmed => "confirmed",
            BookingStatus::Cancelled => "cancelled",
        }
    }

    /// Parses a storage/wire name back into a status.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "confirmed" => Some(BookingStatus::Confirmed),
            "cancelled" => Some(BookingStatus::Cancelled),
            _ => None,
        }
    }
}

/// A reservation of event seats, created only by order fulfillment.
///
/// Mirrors refund/cancellation of its originating order item. The count of
/// confirmed bookings for an event never exceeds that event's capacity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Booking {
    pub id: Uuid,
    pub order_id: OrderId,
    pub user_id: UserId,
    pub event_id: Uuid,
    pub quantity: u32,
    pub status: BookingStatus,
    pub created_at: DateTime<Utc>,
}
