//! Payment Callback Reconciler.
//!
//! Hosted payment pages send the customer back with a return URL while the
//! backend learns about the payment through its own webhook. The two channels
//! are not ordered, so the reconciler:
//!
//! 1. short-circuits on cancellation or provider errors in the return URL
//! 2. polls "is there an order for this cart" on a bounded schedule
//! 3. falls back to completing the cart directly
//! 4. on an "already completed" answer, runs one more short lookup round
//!
//! and reports [`StorefrontError::AmbiguousOutcome`](crate::StorefrontError)
//! when none of these produce an order.

mod callback;
mod lookup;
mod reconciler;

pub use callback::CallbackParams;
pub use reconciler::{PaymentReconciler, ReconcileOutcome, ReconcilePolicy};

pub(crate) use lookup::poll_order_for_cart;
