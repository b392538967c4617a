//! In-memory order store for tests and local runs.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use cart::CartItem;
use catalog::{InMemoryCatalog, evaluate};
use chrono::Utc;
use common::{ItemType, OrderId, TaxPolicy, Totals, UserId};
use uuid::Uuid;

use crate::error::OrderError;
use crate::order::{Booking, BookingStatus, Order, OrderLine};
use crate::status::{OrderStatus, ensure_transition};
use crate::store::OrderStore;

#[derive(Debug, Default)]
struct State {
    users: HashSet<UserId>,
    orders: HashMap<OrderId, Order>,
    bookings: HashMap<(OrderId, Uuid), Booking>,
    enrollments: HashSet<(OrderId, Uuid)>,
    download_grants: HashSet<(OrderId, Uuid)>,
}

/// In-memory order store backed by a shared [`InMemoryCatalog`].
///
/// One mutex over the whole order state plays the role of the relational
/// store's transactions: each operation runs to completion under the lock,
/// and a failed multi-item `create_order` releases any seats it already
/// claimed before returning, so no partial order is ever observable.
#[derive(Debug, Clone)]
pub struct InMemoryOrderStore {
    catalog: InMemoryCatalog,
    tax: TaxPolicy,
    state: Arc<Mutex<State>>,
}

impl InMemoryOrderStore {
    /// Creates a store over the given catalog and tax policy.
    pub fn new(catalog: InMemoryCatalog, tax: TaxPolicy) -> Self {
        Self {
            catalog,
            tax,
            state: Arc::new(Mutex::new(State::default())),
        }
    }

    /// Returns the catalog this store adjusts counters on.
    pub fn catalog(&self) -> &InMemoryCatalog {
        &self.catalog
    }

    /// Registers a known user (stands in for the identity collaborator).
    pub fn add_user(&self, user_id: UserId) {
        self.state.lock().unwrap().users.insert(user_id);
    }

    /// Returns the booking created for an order's event line, if any.
    pub fn booking(&self, order_id: OrderId, event_id: Uuid) -> Option<Booking> {
        self.state
            .lock()
            .unwrap()
            .bookings
            .get(&(order_id, event_id))
            .cloned()
    }

    /// Returns the number of confirmed seats booked for an event.
    pub fn confirmed_seats(&self, event_id: Uuid) -> u32 {
        self.state
            .lock()
            .unwrap()
            .bookings
            .values()
            .filter(|b| b.event_id == event_id && b.status == BookingStatus::Confirmed)
            .map(|b| b.quantity)
            .sum()
    }

    /// Returns true if an enrollment grant exists for the order line.
    pub fn has_enrollment(&self, order_id: OrderId, course_id: Uuid) -> bool {
        self.state
            .lock()
            .unwrap()
            .enrollments
            .contains(&(order_id, course_id))
    }

    /// Returns true if a download grant exists for the order line.
    pub fn has_download_grant(&self, order_id: OrderId, product_id: Uuid) -> bool {
        self.state
            .lock()
            .unwrap()
            .download_grants
            .contains(&(order_id, product_id))
    }

    fn release_claims(&self, claimed: &[(Uuid, u32)]) {
        for (event_id, quantity) in claimed {
            self.catalog.release_event_seats(*event_id, *quantity);
        }
    }
}

#[async_trait]
impl OrderStore for InMemoryOrderStore {
    async fn create_order(&self, user_id: UserId, items: &[CartItem]) -> Result<Order, OrderError> {
        if items.is_empty() {
            return Err(OrderError::EmptyCart);
        }
        for item in items {
            if item.quantity == 0 {
                return Err(OrderError::InvalidQuantity {
                    item_id: item.item_id,
                    quantity: item.quantity,
                });
            }
        }

        let mut state = self.state.lock().unwrap();
        if !state.users.contains(&user_id) {
            return Err(OrderError::UserNotFound(user_id));
        }

        // Re-validate each item against the live catalog, claiming event
        // seats as we go. Any failure releases the claims made so far,
        // leaving no trace of the aborted order.
        let mut claimed: Vec<(Uuid, u32)> = Vec::new();
        let mut lines = Vec::with_capacity(items.len());
        for item in items {
            if item.item_type == ItemType::Event {
                if let Err(reason) = self.catalog.claim_event_seats(item.item_id, item.quantity) {
                    self.release_claims(&claimed);
                    return Err(OrderError::ItemUnavailable {
                        item_type: item.item_type,
                        item_id: item.item_id,
                        reason,
                    });
                }
                claimed.push((item.item_id, item.quantity));
            }

            let snapshot = self.catalog.fetch(item.item_type, item.item_id);
            let price = match evaluate(snapshot.as_ref(), Utc::now()).into_result() {
                Ok(price) => price,
                // Seats for this event were just claimed, so a full event
                // does not fail its own line here.
                Err(catalog::UnavailableReason::FullyBooked)
                    if item.item_type == ItemType::Event =>
                {
                    match &snapshot {
                        Some(snap) => snap.price(),
                        None => {
                            self.release_claims(&claimed);
                            return Err(OrderError::ItemUnavailable {
                                item_type: item.item_type,
                                item_id: item.item_id,
                                reason: catalog::UnavailableReason::NotFound,
                            });
                        }
                    }
                }
                Err(reason) => {
                    self.release_claims(&claimed);
                    return Err(OrderError::ItemUnavailable {
                        item_type: item.item_type,
                        item_id: item.item_id,
                        reason,
                    });
                }
            };

            let title = snapshot.map(|s| s.title().to_string()).unwrap_or_default();
            lines.push(OrderLine::new(
                item.item_type,
                item.item_id,
                title,
                price,
                item.quantity,
            ));
        }

        let totals = Totals::compute(lines.iter().map(|l| (l.unit_price, l.quantity)), self.tax);
        let now = Utc::now();
        let order = Order {
            id: OrderId::new(),
            user_id,
            status: OrderStatus::Pending,
            subtotal: totals.subtotal,
            tax: totals.tax,
            total: totals.total,
            payment_reference: None,
            created_at: now,
            updated_at: now,
            completed_at: None,
            items: lines,
        };
        state.orders.insert(order.id, order.clone());
        Ok(order)
    }

    async fn get_order(&self, order_id: OrderId) -> Result<Option<Order>, OrderError> {
        Ok(self.state.lock().unwrap().orders.get(&order_id).cloned())
    }

    async fn attach_payment_reference(
        &self,
        order_id: OrderId,
        payment_reference: &str,
    ) -> Result<Order, OrderError> {
        let mut state = self.state.lock().unwrap();
        let order = state
            .orders
            .get_mut(&order_id)
            .ok_or(OrderError::OrderNotFound(order_id))?;

        if order.payment_reference.is_some() {
            return Err(OrderError::PaymentReferenceAttached(order_id));
        }
        ensure_transition(order.status, OrderStatus::PaymentPending)?;

        order.payment_reference = Some(payment_reference.to_string());
        order.status = OrderStatus::PaymentPending;
        order.updated_at = Utc::now();
        Ok(order.clone())
    }

    async fn mark_paid(&self, order_id: OrderId) -> Result<Order, OrderError> {
        let mut state = self.state.lock().unwrap();
        let order = state
            .orders
            .get_mut(&order_id)
            .ok_or(OrderError::OrderNotFound(order_id))?;

        ensure_transition(order.status, OrderStatus::Paid)?;
        order.status = OrderStatus::Paid;
        order.updated_at = Utc::now();
        Ok(order.clone())
    }

    async fn start_processing(&self, order_id: OrderId) -> Result<Order, OrderError> {
        let mut state = self.state.lock().unwrap();
        let order = state
            .orders
            .get_mut(&order_id)
            .ok_or(OrderError::OrderNotFound(order_id))?;

        ensure_transition(order.status, OrderStatus::Processing)?;
        order.status = OrderStatus::Processing;
        order.updated_at = Utc::now();
        Ok(order.clone())
    }

    async fn fulfill_order(&self, order_id: OrderId) -> Result<Order, OrderError> {
        let mut state = self.state.lock().unwrap();
        let order = state
            .orders
            .get(&order_id)
            .cloned()
            .ok_or(OrderError::OrderNotFound(order_id))?;

        // Webhook redelivery: fulfilling a completed order is a no-op.
        if order.status == OrderStatus::Completed {
            return Ok(order);
        }
        if !matches!(order.status, OrderStatus::Paid | OrderStatus::Processing) {
            return Err(OrderError::NotFulfillable {
                status: order.status,
            });
        }

        let user_id = order.user_id;
        for line in &order.items {
            match line.item_type {
                ItemType::Course => {
                    if state.enrollments.insert((order_id, line.item_id)) {
                        self.catalog.increment_enrollment(line.item_id);
                    }
                }
                ItemType::Event => {
                    state
                        .bookings
                        .entry((order_id, line.item_id))
                        .or_insert_with(|| Booking {
                            id: Uuid::new_v4(),
                            order_id,
                            user_id,
                            event_id: line.item_id,
                            quantity: line.quantity,
                            status: BookingStatus::Confirmed,
                            created_at: Utc::now(),
                        });
                }
                ItemType::DigitalProduct => {
                    if state.download_grants.insert((order_id, line.item_id)) {
                        self.catalog.increment_downloads(line.item_id);
                    }
                }
            }
        }

        let order = state
            .orders
            .get_mut(&order_id)
            .ok_or(OrderError::OrderNotFound(order_id))?;
        if order.status == OrderStatus::Paid {
            ensure_transition(order.status, OrderStatus::Processing)?;
            order.status = OrderStatus::Processing;
        }
        ensure_transition(order.status, OrderStatus::Completed)?;
        order.status = OrderStatus::Completed;
        let now = Utc::now();
        order.updated_at = now;
        order.completed_at = Some(now);
        Ok(order.clone())
    }

    async fn cancel_order(&self, order_id: OrderId) -> Result<Order, OrderError> {
        let mut state = self.state.lock().unwrap();
        let order = state
            .orders
            .get_mut(&order_id)
            .ok_or(OrderError::OrderNotFound(order_id))?;

        ensure_transition(order.status, OrderStatus::Cancelled)?;
        if !matches!(
            order.status,
            OrderStatus::Pending | OrderStatus::PaymentPending
        ) {
            return Err(OrderError::NotCancellable {
                status: order.status,
            });
        }

        for line in &order.items {
            if line.item_type == ItemType::Event {
                self.catalog.release_event_seats(line.item_id, line.quantity);
            }
        }
        order.status = OrderStatus::Cancelled;
        order.updated_at = Utc::now();
        Ok(order.clone())
    }

    async fn refund_order(&self, order_id: OrderId) -> Result<Order, OrderError> {
        let mut state = self.state.lock().unwrap();
        let order = state
            .orders
            .get(&order_id)
            .cloned()
            .ok_or(OrderError::OrderNotFound(order_id))?;

        ensure_transition(order.status, OrderStatus::Refunded)?;

        for line in &order.items {
            match line.item_type {
                ItemType::Course => {
                    if state.enrollments.remove(&(order_id, line.item_id)) {
                        self.catalog.decrement_enrollment(line.item_id);
                    }
                }
                ItemType::Event => {
                    if let Some(booking) = state.bookings.get_mut(&(order_id, line.item_id))
                        && booking.status == BookingStatus::Confirmed
                    {
                        booking.status = BookingStatus::Cancelled;
                        self.catalog.release_event_seats(line.item_id, line.quantity);
                    }
                }
                ItemType::DigitalProduct => {
                    if state.download_grants.remove(&(order_id, line.item_id)) {
                        self.catalog.decrement_downloads(line.item_id);
                    }
                }
            }
        }

        let order = state
            .orders
            .get_mut(&order_id)
            .ok_or(OrderError::OrderNotFound(order_id))?;
        order.status = OrderStatus::Refunded;
        order.updated_at = Utc::now();
        Ok(order.clone())
    }
}
