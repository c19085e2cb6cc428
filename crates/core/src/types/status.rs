//! Status enums reported by the commerce backend.
//!
//! Every enum carries an `Unknown` catch-all so that a backend upgrade that
//! introduces a new status does not break deserialization of a whole order.

use serde::{Deserialize, Serialize};

/// Payment status of an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    #[default]
    NotPaid,
    Awaiting,
    Captured,
    PartiallyRefunded,
    Refunded,
    Canceled,
    RequiresAction,
    #[serde(other)]
    Unknown,
}

impl PaymentStatus {
    /// Whether the provider has taken the customer's money.
    #[must_use]
    pub const fn is_paid(self) -> bool {
        matches!(self, Self::Captured | Self::PartiallyRefunded)
    }
}

/// Fulfillment status of an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum FulfillmentStatus {
    #[default]
    NotFulfilled,
    PartiallyFulfilled,
    Fulfilled,
    PartiallyShipped,
    Shipped,
    Returned,
    Canceled,
    #[serde(other)]
    Unknown,
}

/// Status of a single payment session on a cart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum PaymentSessionStatus {
    #[default]
    Pending,
    Authorized,
    RequiresMore,
    Error,
    Canceled,
    #[serde(other)]
    Unknown,
}
