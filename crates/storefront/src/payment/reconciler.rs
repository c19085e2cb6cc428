use std::sync::Arc;
use std::time::Duration;

use tracing::{info, instrument, warn};
use url::Url;

use dorsal_core::CartId;

use crate::backend::Completion;
use crate::cart::{CartManager, CartSession};
use crate::error::{Result, StorefrontError, add_breadcrumb, report};
use crate::medusa::Order;
use crate::navigation::Navigation;
use crate::state::StorefrontInner;
use crate::storage::StorageSlot;

use super::callback::CallbackParams;
use super::lookup::poll_order_for_cart;

/// Bounded polling schedule used to confirm out-of-band payments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconcilePolicy {
    /// Order lookups before falling back to a direct completion.
    pub poll_attempts: u32,
    /// Delay between those lookups.
    pub poll_delay: Duration,
    /// Lookups after the backend answers "already completed".
    pub retry_attempts: u32,
    /// Delay between those lookups.
    pub retry_delay: Duration,
}

impl Default for ReconcilePolicy {
    fn default() -> Self {
        Self {
            poll_attempts: 5,
            poll_delay: Duration::from_secs(2),
            retry_attempts: 3,
            retry_delay: Duration::from_secs(1),
        }
    }
}

impl ReconcilePolicy {
    /// Total time spent sleeping in the worst case, excluding request time.
    #[must_use]
    pub fn worst_case_wait(&self) -> Duration {
        self.poll_delay * self.poll_attempts.saturating_sub(1)
            + self.retry_delay * self.retry_attempts.saturating_sub(1)
    }
}

/// A successfully reconciled payment callback.
#[derive(Debug, Clone, PartialEq)]
pub enum ReconcileOutcome {
    /// The order exists; local cart state has been cleared.
    Confirmed { order: Box<Order> },
    /// The provider wants the customer on a hosted page again.
    RedirectRequired { url: Url },
}

impl ReconcileOutcome {
    /// Where to send the customer.
    #[must_use]
    pub fn navigation(&self) -> Navigation {
        match self {
            Self::Confirmed { order } => Navigation::OrderConfirmation(order.id.clone()),
            Self::RedirectRequired { url } => Navigation::External(url.clone()),
        }
    }
}

/// Converges a payment return on a single order.
#[derive(Clone)]
pub struct PaymentReconciler {
    inner: Arc<StorefrontInner>,
}

impl PaymentReconciler {
    pub(crate) const fn new(inner: Arc<StorefrontInner>) -> Self {
        Self { inner }
    }

    fn policy(&self) -> &ReconcilePolicy {
        &self.inner.settings.reconcile
    }

    /// Reconcile a return from a hosted payment page.
    ///
    /// # Errors
    ///
    /// - `PaymentCancelled` / `PaymentProvider` when the return URL says so
    ///   (no backend call is made)
    /// - `MissingCartReference` when neither the URL nor the stash names a cart
    /// - `AmbiguousOutcome` when no order could be confirmed
    /// - `Backend` when the fallback completion was authoritatively rejected
    #[instrument(skip(self, session, params), fields(cart_id))]
    pub async fn reconcile(
        &self,
        session: &mut CartSession,
        params: &CallbackParams,
    ) -> Result<ReconcileOutcome> {
        if params.canceled {
            info!("Customer cancelled the hosted payment page");
            return Err(StorefrontError::PaymentCancelled);
        }
        if let Some(message) = params.provider_error() {
            warn!(error = message, "Payment provider reported an error");
            return Err(StorefrontError::PaymentProvider(message.to_string()));
        }

        let cart_id = self.resolve_cart_id(params)?;
        tracing::Span::current().record("cart_id", cart_id.as_str());
        add_breadcrumb(
            "payment",
            "Reconciling payment callback",
            Some(&[("cart_id", cart_id.as_str())]),
        );

        let policy = self.policy().clone();
        if let Some(order) = self
            .lookup(&cart_id, policy.poll_attempts, policy.poll_delay)
            .await
        {
            return Ok(self.confirmed(session, order));
        }

        info!("No order after polling; completing the cart directly");
        match self.inner.backend.complete_cart(&cart_id).await {
            Ok(Completion::Order(order)) => Ok(self.confirmed(session, *order)),
            Ok(Completion::Redirect { url }) => {
                info!(%url, "Provider requested another redirect");
                Ok(ReconcileOutcome::RedirectRequired { url })
            }
            Err(e) if e.is_already_completed() => {
                info!(error = %e, "Cart already completed; looking the order up again");
                match self
                    .lookup(&cart_id, policy.retry_attempts, policy.retry_delay)
                    .await
                {
                    Some(order) => Ok(self.confirmed(session, order)),
                    None => Err(self.ambiguous(cart_id)),
                }
            }
            Err(e) if e.is_rejection() => Err(StorefrontError::Backend(e)),
            Err(e) => {
                warn!(error = %e, "Fallback completion failed");
                Err(self.ambiguous(cart_id))
            }
        }
    }

    fn resolve_cart_id(&self, params: &CallbackParams) -> Result<CartId> {
        if let Some(cart_id) = &params.cart_id {
            return Ok(cart_id.clone());
        }
        self.inner
            .storage
            .load(StorageSlot::PendingPayment)?
            .as_deref()
            .and_then(CartId::try_new)
            .ok_or(StorefrontError::MissingCartReference)
    }

    async fn lookup(&self, cart_id: &CartId, attempts: u32, delay: Duration) -> Option<Order> {
        poll_order_for_cart(
            self.inner.backend.as_ref(),
            self.inner.sleeper.as_ref(),
            cart_id,
            attempts,
            delay,
        )
        .await
    }

    fn confirmed(&self, session: &mut CartSession, order: Order) -> ReconcileOutcome {
        info!(order_id = %order.id, "Payment reconciled");
        add_breadcrumb(
            "payment",
            "Order confirmed",
            Some(&[("order_id", order.id.as_str())]),
        );
        CartManager::new(Arc::clone(&self.inner)).finish_order(session);
        ReconcileOutcome::Confirmed {
            order: Box::new(order),
        }
    }

    fn ambiguous(&self, cart_id: CartId) -> StorefrontError {
        let err = StorefrontError::AmbiguousOutcome { cart_id };
        report(&err);
        warn!(
            worst_case_wait_ms = u64::try_from(self.policy().worst_case_wait().as_millis())
                .unwrap_or(u64::MAX),
            "Payment could not be confirmed"
        );
        err
    }
}
