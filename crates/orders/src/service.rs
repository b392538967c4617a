//! Order service: the application-facing surface over an [`OrderStore`].

use cart::CartItem;
use common::{OrderId, UserId};
use metrics::counter;

use crate::error::OrderError;
use crate::order::Order;
use crate::store::OrderStore;

/// Drives the order lifecycle against a store, adding telemetry.
///
/// All business rules live in the store implementations; this layer exists
/// so callers get consistent spans and counters no matter which store
/// backs the deployment.
#[derive(Debug, Clone)]
pub struct OrderService<S> {
    store: S,
}

impl<S: OrderStore> OrderService<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Creates an order from validated cart items.
    #[tracing::instrument(skip(self, items), fields(item_count = items.len()))]
    pub async fn create_order(
        &self,
        user_id: UserId,
        items: &[CartItem],
    ) -> Result<Order, OrderError> {
        let order = self.store.create_order(user_id, items).await?;
        counter!("orders_created_total").increment(1);
        tracing::info!(order_id = %order.id, total = %order.total, "order created");
        Ok(order)
    }

    /// Loads an order, failing with not-found if it does not exist.
    #[tracing::instrument(skip(self))]
    pub async fn get_order(&self, order_id: OrderId) -> Result<Order, OrderError> {
        self.store
            .get_order(order_id)
            .await?
            .ok_or(OrderError::OrderNotFound(order_id))
    }

    /// Attaches a payment reference, moving the order to `payment_pending`.
    #[tracing::instrument(skip(self, payment_reference))]
    pub async fn attach_payment_reference(
        &self,
        order_id: OrderId,
        payment_reference: &str,
    ) -> Result<Order, OrderError> {
        let order = self
            .store
            .attach_payment_reference(order_id, payment_reference)
            .await?;
        tracing::info!(order_id = %order.id, "payment reference attached");
        Ok(order)
    }

    /// Records payment confirmation from the payment collaborator.
    #[tracing::instrument(skip(self))]
    pub async fn mark_paid(&self, order_id: OrderId) -> Result<Order, OrderError> {
        let order = self.store.mark_paid(order_id).await?;
        counter!("orders_paid_total").increment(1);
        Ok(order)
    }

    /// Moves a paid order into fulfillment.
    #[tracing::instrument(skip(self))]
    pub async fn start_processing(&self, order_id: OrderId) -> Result<Order, OrderError> {
        self.store.start_processing(order_id).await
    }

    /// Applies fulfillment side effects and completes the order.
    #[tracing::instrument(skip(self))]
    pub async fn fulfill_order(&self, order_id: OrderId) -> Result<Order, OrderError> {
        let order = self.store.fulfill_order(order_id).await?;
        counter!("orders_fulfilled_total").increment(1);
        tracing::info!(order_id = %order.id, "order fulfilled");
        Ok(order)
    }

    /// Cancels an order before payment confirmation.
    #[tracing::instrument(skip(self))]
    pub async fn cancel_order(&self, order_id: OrderId) -> Result<Order, OrderError> {
        let order = self.store.cancel_order(order_id).await?;
        counter!("orders_cancelled_total").increment(1);
        tracing::info!(order_id = %order.id, "order cancelled");
        Ok(order)
    }

    /// Refunds a completed order, reversing its fulfillment side effects.
    #[tracing::instrument(skip(self))]
    pub async fn refund_order(&self, order_id: OrderId) -> Result<Order, OrderError> {
        let order = self.store.refund_order(order_id).await?;
        counter!("orders_refunded_total").increment(1);
        tracing::info!(order_id = %order.id, "order refunded");
        Ok(order)
    }
}
