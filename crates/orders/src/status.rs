//! Order state machine.

use serde::{Deserialize, Serialize};

use crate::error::OrderError;

/// The status of an order in its lifecycle.
///
/// Status transitions:
/// ```text
/// pending ──► payment_pending ──► paid ──► processing ──► completed ──► refunded
///    │               │              │           │
///    └───────────────┴──────────────┴───────────┴──► cancelled
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    /// Order created, no payment attempt yet.
    #[default]
    Pending,

    /// A payment reference is attached, awaiting confirmation.
    PaymentPending,

    /// Payment confirmed by the external collaborator.
    Paid,

    /// Fulfillment in progress.
    Processing,

    /// Fulfillment side effects applied.
    Completed,

    /// Order abandoned before payment (terminal state).
    Cancelled,

    /// Fulfillment side effects reversed (terminal state).
    Refunded,
}

impl OrderStatus {
    /// Returns true if `next` is a legal transition from this status.
    ///
    /// This table is the single source of truth consulted by every
    /// status-mutating operation; nothing writes a status without going
    /// through [`ensure_transition`].
    pub fn can_transition_to(self, next: OrderStatus) -> bool {
        use OrderStatus::*;
        matches!(
            (self, next),
            (Pending, PaymentPending)
                | (Pending, Cancelled)
                | (PaymentPending, Paid)
                | (PaymentPending, Cancelled)
                | (Paid, Processing)
                | (Paid, Cancelled)
                | (Processing, Completed)
                | (Processing, Cancelled)
                | (Completed, Refunded)
        )
    }

    /// Returns true if this is a terminal status.
    pub fn is_terminal(self) -> bool {
        matches!(self, OrderStatus::Cancelled | OrderStatus::Refunded)
    }

    /// Returns the storage/wire name of this status.
    pub fn as_str(self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::PaymentPending => "payment_pending",
            OrderStatus::Paid => "paid",
            OrderStatus::Processing => "processing",
            OrderStatus::Completed => "completed",
            OrderStatus::Cancelled => "cancelled",
            OrderStatus::Refunded => "refunded",
        }
    }

    /// Parses a storage/wire name back into a status.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(OrderStatus::Pending),
            "payment_pending" => Some(OrderStatus::PaymentPending),
            "paid" => Some(OrderStatus::Paid),
            "processing" => Some(OrderStatus::Processing),
            "completed" => Some(OrderStatus::Completed),
            "cancelled" => Some(OrderStatus::Cancelled),
            "refunded" => Some(OrderStatus::Refunded),
            _ => None,
        }
    }

    /// Every status, in lifecycle order.
    pub fn all() -> [OrderStatus; 7] {
        [
            OrderStatus::Pending,
            OrderStatus::PaymentPending,
            OrderStatus::Paid,
            OrderStatus::Processing,
            OrderStatus::Completed,
            OrderStatus::Cancelled,
            OrderStatus::Refunded,
        ]
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Checks the transition table, naming both statuses on rejection.
pub fn ensure_transition(from: OrderStatus, to: OrderStatus) -> Result<(), OrderError> {
    if from.can_transition_to(to) {
        Ok(())
    } else {
        Err(OrderError::InvalidTransition { from, to })
    }
}
