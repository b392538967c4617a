//! Order store trait.

use async_trait::async_trait;
use cart::CartItem;
use common::{OrderId, UserId};

use crate::error::OrderError;
use crate::order::Order;

/// Transactional order/booking storage.
///
/// Every mutating method is one transactional unit: it either applies all
/// of its effects (status change, line inserts, counter adjustments,
/// fulfillment records) or none of them. The relational store is the sole
/// arbiter of the capacity invariant; implementations must make the
/// availability re-check and the resulting seat claim a single atomic step
/// so concurrent orders for the last seat cannot both succeed.
#[async_trait]
pub trait OrderStore: Send + Sync {
    /// Converts validated cart items into a persisted order with frozen
    /// lines and status `pending`.
    ///
    /// Re-validates every item against live catalog state inside the
    /// transaction and claims event seats there; totals are recomputed
    /// from current catalog prices (the order is the authoritative
    /// re-price at commit time). Any violation aborts the whole
    /// transaction; no partial order is ever created.
    async fn create_order(&self, user_id: UserId, items: &[CartItem]) -> Result<Order, OrderError>;

    /// Loads an order with its lines.
    async fn get_order(&self, order_id: OrderId) -> Result<Option<Order>, OrderError>;

    /// Attaches an external payment reference and moves the order to
    /// `payment_pending`. Fails with a conflict if a reference is already
    /// attached.
    async fn attach_payment_reference(
        &self,
        order_id: OrderId,
        payment_reference: &str,
    ) -> Result<Order, OrderError>;

    /// Records external payment confirmation: `payment_pending -> paid`.
    async fn mark_paid(&self, order_id: OrderId) -> Result<Order, OrderError>;

    /// Moves a paid order into fulfillment: `paid -> processing`.
    async fn start_processing(&self, order_id: OrderId) -> Result<Order, OrderError>;

    /// Applies fulfillment side effects and completes the order.
    ///
    /// Requires status `paid` or `processing`. Each side effect is
    /// insert-if-absent keyed on (order, item), and calling this again on
    /// an already-completed order is a safe no-op, so at-least-once
    /// webhook delivery cannot double-grant anything.
    async fn fulfill_order(&self, order_id: OrderId) -> Result<Order, OrderError>;

    /// Cancels an order before payment confirmation (`pending` or
    /// `payment_pending` only), releasing any claimed event seats.
    async fn cancel_order(&self, order_id: OrderId) -> Result<Order, OrderError>;

    /// Reverses fulfillment side effects of a `completed` order and moves
    /// it to `refunded`. Counters never go below zero.
    async fn refund_order(&self, order_id: OrderId) -> Result<Order, OrderError>;
}
