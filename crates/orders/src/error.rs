//! Order core error types.

use catalog::UnavailableReason;
use common::{ErrorKind, ItemType, OrderId, UserId};
use thiserror::Error;
use uuid::Uuid;

use crate::status::OrderStatus;

/// Errors that can occur during order operations.
///
/// Business-rule failures (validation, not-found, conflict) are typed
/// separately from infrastructure failures so the caller can tell a bad
/// request apart from an unreachable store. Any error raised inside a
/// transaction rolls the whole transaction back.
#[derive(Debug, Error)]
pub enum OrderError {
    /// An order cannot be created from an empty cart.
    #[error("cannot create an order from an empty cart")]
    EmptyCart,

    /// A cart line carried an invalid quantity.
    #[error("invalid quantity {quantity} for item {item_id}")]
    InvalidQuantity { item_id: Uuid, quantity: u32 },

    /// The purchasing user does not exist.
    #[error("user not found: {0}")]
    UserNotFound(UserId),

    /// The order does not exist.
    #[error("order not found: {0}")]
    OrderNotFound(OrderId),

    /// A cart item failed re-validation inside the order transaction.
    #[error("item {item_type} {item_id} is not available: {reason}")]
    ItemUnavailable {
        item_type: ItemType,
        item_id: Uuid,
        reason: UnavailableReason,
    },

    /// The requested status change is not in the transition table.
    #[error("invalid status transition from {from} to {to}")]
    InvalidTransition { from: OrderStatus, to: OrderStatus },

    /// Fulfillment requires a paid order.
    #[error("order must be paid before fulfillment (status is {status})")]
    NotFulfillable { status: OrderStatus },

    /// Cancellation is only permitted before payment confirmation.
    #[error("order can no longer be cancelled (status is {status})")]
    NotCancellable { status: OrderStatus },

    /// The idempotency guard fired: a payment reference is already attached.
    #[error("order {0} already has a payment reference attached")]
    PaymentReferenceAttached(OrderId),

    /// The relational store failed.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A stored status or item type could not be decoded.
    #[error("unrecognized value in storage: {0}")]
    CorruptRecord(String),
}

impl OrderError {
    /// Classifies the error for the request layer.
    pub fn kind(&self) -> ErrorKind {
        match self {
            OrderError::EmptyCart
            | OrderError::InvalidQuantity { .. }
            | OrderError::ItemUnavailable { .. }
            | OrderError::InvalidTransition { .. }
            | OrderError::NotFulfillable { .. }
            | OrderError::NotCancellable { .. } => ErrorKind::Validation,
            OrderError::UserNotFound(_) | OrderError::OrderNotFound(_) => ErrorKind::NotFound,
            OrderError::PaymentReferenceAttached(_) => ErrorKind::Conflict,
            OrderError::Database(_) | OrderError::CorruptRecord(_) => ErrorKind::Infrastructure,
        }
    }
}
