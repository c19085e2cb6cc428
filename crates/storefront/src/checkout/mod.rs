//! Checkout Orchestrator.
//!
//! Sequences one cart through address, shipping, payment and completion:
//!
//! ```text
//! CartLoaded -> AddressSet -> ShippingOptionsReady -> ShippingSet
//!   -> PaymentSessionsReady -> PaymentSet -> OrderCreated | PaymentRedirectRequired
//! ```
//!
//! The backend does not enforce this order, so [`Checkout`] does: each call
//! checks the current [`CheckoutStep`] before touching the network and
//! rejects out-of-order calls with `InvalidTransition`. A failed call leaves
//! the step unchanged so the customer can retry from the same place.

mod debounce;
mod step;

pub use debounce::{AddressDraft, settle_address};
pub use step::CheckoutStep;

use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{info, instrument, warn};
use url::Url;

use dorsal_core::{AddressInput, CartId, Email, PaymentProviderId, ShippingOptionId};

use crate::backend::Completion;
use crate::cart::{CartManager, CartSession, LoadedCart};
use crate::error::{Result, StorefrontError, ValidationError, add_breadcrumb, report};
use crate::medusa::{Cart, Order, PaymentSession, ShippingOption};
use crate::navigation::Navigation;
use crate::payment::poll_order_for_cart;
use crate::state::StorefrontInner;
use crate::storage::StorageSlot;

/// Result of offering a list of choices.
#[derive(Debug, Clone, PartialEq)]
pub enum Selection<T> {
    /// Exactly one choice existed and it has been applied.
    AutoSelected(T),
    /// The customer has to pick one.
    ChooseOne(Vec<T>),
}

/// Result of a completion attempt.
#[derive(Debug, Clone, PartialEq)]
pub enum CheckoutOutcome {
    /// The order exists; local cart state has been cleared.
    OrderPlaced { order: Box<Order> },
    /// The payment provider needs the customer on a hosted page. The cart id
    /// has been stashed for the return trip.
    RedirectRequired { url: Url },
}

impl CheckoutOutcome {
    /// Where to send the customer.
    #[must_use]
    pub fn navigation(&self) -> Navigation {
        match self {
            Self::OrderPlaced { order } => Navigation::OrderConfirmation(order.id.clone()),
            Self::RedirectRequired { url } => Navigation::External(url.clone()),
        }
    }
}

/// A checkout of one cart.
pub struct Checkout<'s> {
    inner: Arc<StorefrontInner>,
    carts: CartManager,
    session: &'s mut CartSession,
    cart_id: CartId,
    step: CheckoutStep,
    shipping_options: Vec<ShippingOption>,
    provider: Option<PaymentProviderId>,
    order: Option<Order>,
}

impl<'s> Checkout<'s> {
    /// Start a checkout of the session's cart.
    ///
    /// A cart that has already become an order (e.g. a completion whose
    /// response was lost) resumes at `OrderCreated` with that order, so
    /// [`complete`](Self::complete) returns it without placing another.
    ///
    /// # Errors
    ///
    /// - `EmptyCart` (navigate to cart review) when there is no cart or it
    ///   has no line items
    /// - `AmbiguousOutcome` when the cart is completed but its order cannot
    ///   be found
    #[instrument(skip(inner, session))]
    pub(crate) async fn begin(
        inner: Arc<StorefrontInner>,
        session: &'s mut CartSession,
    ) -> Result<Self> {
        let carts = CartManager::new(Arc::clone(&inner));
        let cart = match carts.load(session).await? {
            LoadedCart::Open(cart) if !cart.is_empty() => cart,
            LoadedCart::Completed(cart_id) => {
                return Self::resume_completed(inner, carts, session, cart_id).await;
            }
            _ => {
                info!("Checkout refused for a missing or empty cart");
                return Err(StorefrontError::EmptyCart);
            }
        };

        add_breadcrumb(
            "checkout",
            "Checkout started",
            Some(&[("cart_id", cart.id.as_str())]),
        );
        info!(cart_id = %cart.id, items = cart.item_count(), "Checkout started");

        Ok(Self {
            inner,
            carts,
            session,
            cart_id: cart.id,
            step: CheckoutStep::CartLoaded,
            shipping_options: Vec::new(),
            provider: None,
            order: None,
        })
    }

    async fn resume_completed(
        inner: Arc<StorefrontInner>,
        carts: CartManager,
        session: &'s mut CartSession,
        cart_id: CartId,
    ) -> Result<Self> {
        info!(cart_id = %cart_id, "Cart already completed; looking up its order");
        let Some(order) = existing_order(&inner, &cart_id).await else {
            // The next checkout starts from a fresh cart.
            carts.clear(session)?;
            return Err(ambiguous(cart_id));
        };

        let mut checkout = Self {
            inner,
            carts,
            session,
            cart_id,
            step: CheckoutStep::CartLoaded,
            shipping_options: Vec::new(),
            provider: None,
            order: None,
        };
        checkout.placed(order);
        Ok(checkout)
    }

    #[must_use]
    pub const fn step(&self) -> CheckoutStep {
        self.step
    }

    #[must_use]
    pub const fn cart_id(&self) -> &CartId {
        &self.cart_id
    }

    /// The placed order, once there is one.
    #[must_use]
    pub const fn order(&self) -> Option<&Order> {
        self.order.as_ref()
    }

    /// Latest canonical cart.
    #[must_use]
    pub fn cart(&self) -> Option<&Cart> {
        self.session.cart()
    }

    /// Options loaded by [`load_shipping_options`](Self::load_shipping_options).
    #[must_use]
    pub fn shipping_options(&self) -> &[ShippingOption] {
        &self.shipping_options
    }

    /// Payment sessions the cart currently knows.
    #[must_use]
    pub fn payment_sessions(&self) -> &[PaymentSession] {
        self.cart()
            .map_or(&[][..], |cart| cart.payment_sessions.as_slice())
    }

    // =========================================================================
    // Address
    // =========================================================================

    /// Validate and save the shipping address and contact email.
    ///
    /// Any shipping or payment selection made earlier is discarded, since it
    /// depended on the previous address.
    ///
    /// # Errors
    ///
    /// Returns `Validation` for a missing field or a malformed email, before
    /// any network call.
    #[instrument(skip(self, address, email), fields(cart_id = %self.cart_id))]
    pub async fn submit_address(&mut self, address: &AddressInput, email: &str) -> Result<Cart> {
        self.require(CheckoutStep::CartLoaded, "set the shipping address")?;

        let address = address.validate().map_err(ValidationError::from)?;
        let email = Email::parse(email).map_err(ValidationError::from)?;

        self.inner
            .backend
            .set_shipping_address(&self.cart_id, &address, email.as_str())
            .await?;
        let cart = self.carts.refetch(self.session, &self.cart_id).await?;

        self.shipping_options.clear();
        self.provider = None;
        self.step = CheckoutStep::AddressSet;
        add_breadcrumb(
            "checkout",
            "Shipping address saved",
            Some(&[("country_code", address.country_code.as_str())]),
        );
        Ok(cart)
    }

    /// The debounced "address is complete" event: save the draft and fetch
    /// shipping options for it.
    ///
    /// # Errors
    ///
    /// Returns an error if saving the address or loading options fails.
    pub async fn address_settled(
        &mut self,
        draft: &AddressDraft,
    ) -> Result<Selection<ShippingOption>> {
        self.submit_address(&draft.address, &draft.email).await?;
        self.load_shipping_options().await
    }

    /// Follow an address form as it is edited. Once a complete draft stays
    /// unchanged for the configured quiet period (`ADDRESS_DEBOUNCE_MS`), it
    /// is saved and shipping options are loaded for it.
    ///
    /// Returns `None` when the form goes away without a complete draft.
    ///
    /// # Errors
    ///
    /// Same as [`address_settled`](Self::address_settled).
    pub async fn follow_address(
        &mut self,
        drafts: &mut mpsc::Receiver<AddressDraft>,
    ) -> Result<Option<Selection<ShippingOption>>> {
        let quiet = self.inner.settings.address_debounce;
        let Some(draft) = settle_address(drafts, quiet).await else {
            return Ok(None);
        };
        self.address_settled(&draft).await.map(Some)
    }

    // =========================================================================
    // Shipping
    // =========================================================================

    /// Fetch the shipping options for the saved address. A single option is
    /// selected immediately.
    ///
    /// # Errors
    ///
    /// - `InvalidTransition` before an address is saved
    /// - `NoShippingOptions` when the backend offers none
    #[instrument(skip(self), fields(cart_id = %self.cart_id))]
    pub async fn load_shipping_options(&mut self) -> Result<Selection<ShippingOption>> {
        self.require(CheckoutStep::AddressSet, "load shipping options")?;

        let options = self
            .inner
            .backend
            .list_shipping_options(&self.cart_id)
            .await?;
        if options.is_empty() {
            warn!("No shipping options for the saved address");
            return Err(StorefrontError::NoShippingOptions);
        }

        self.shipping_options = options;
        self.provider = None;
        self.step = CheckoutStep::ShippingOptionsReady;

        if let [only] = self.shipping_options.as_slice() {
            let only = only.clone();
            info!(option_id = %only.id, "Single shipping option; selecting it");
            self.select_shipping_option(&only.id).await?;
            return Ok(Selection::AutoSelected(only));
        }
        Ok(Selection::ChooseOne(self.shipping_options.clone()))
    }

    /// Save a shipping option on the cart.
    ///
    /// # Errors
    ///
    /// - `InvalidTransition` before options are loaded
    /// - `Validation` for an option that was not offered
    #[instrument(skip(self), fields(cart_id = %self.cart_id, option_id = %option_id))]
    pub async fn select_shipping_option(&mut self, option_id: &ShippingOptionId) -> Result<Cart> {
        self.require(CheckoutStep::ShippingOptionsReady, "select a shipping option")?;

        if !self.shipping_options.iter().any(|o| &o.id == option_id) {
            return Err(ValidationError::UnknownShippingOption(option_id.clone()).into());
        }

        self.inner
            .backend
            .add_shipping_method(&self.cart_id, option_id)
            .await?;
        let cart = self.carts.refetch(self.session, &self.cart_id).await?;

        self.provider = None;
        self.step = CheckoutStep::ShippingSet;
        add_breadcrumb(
            "checkout",
            "Shipping option selected",
            Some(&[("option_id", option_id.as_str())]),
        );
        Ok(cart)
    }

    // =========================================================================
    // Payment
    // =========================================================================

    /// Create payment sessions for the cart. A single provider is selected
    /// immediately.
    ///
    /// # Errors
    ///
    /// - `InvalidTransition` before a shipping method is saved
    /// - `NoPaymentProviders` when the cart ends up without sessions
    #[instrument(skip(self), fields(cart_id = %self.cart_id))]
    pub async fn initialize_payment_sessions(&mut self) -> Result<Selection<PaymentSession>> {
        self.require(CheckoutStep::ShippingSet, "initialize payment sessions")?;

        self.inner
            .backend
            .init_payment_sessions(&self.cart_id)
            .await?;
        let cart = self.carts.refetch(self.session, &self.cart_id).await?;

        if cart.payment_sessions.is_empty() {
            warn!("Cart has no payment sessions after initialization");
            return Err(StorefrontError::NoPaymentProviders);
        }

        self.provider = None;
        self.step = CheckoutStep::PaymentSessionsReady;

        if let [only] = cart.payment_sessions.as_slice() {
            info!(provider_id = %only.provider_id, "Single payment provider; selecting it");
            self.select_payment_provider(&only.provider_id).await?;
            return Ok(Selection::AutoSelected(only.clone()));
        }
        Ok(Selection::ChooseOne(cart.payment_sessions))
    }

    /// Select the payment provider used at completion.
    ///
    /// # Errors
    ///
    /// - `InvalidTransition` before payment sessions are initialized
    /// - `Validation` for a provider without a session on the cart
    #[instrument(skip(self), fields(cart_id = %self.cart_id, provider_id = %provider_id))]
    pub async fn select_payment_provider(
        &mut self,
        provider_id: &PaymentProviderId,
    ) -> Result<Cart> {
        self.require(CheckoutStep::PaymentSessionsReady, "select a payment provider")?;
        self.ensure_known_provider(provider_id)?;

        self.inner
            .backend
            .select_payment_session(&self.cart_id, provider_id)
            .await?;
        let cart = self.carts.refetch(self.session, &self.cart_id).await?;

        self.provider = Some(provider_id.clone());
        self.step = CheckoutStep::PaymentSet;
        add_breadcrumb(
            "checkout",
            "Payment provider selected",
            Some(&[("provider_id", provider_id.as_str())]),
        );
        Ok(cart)
    }

    // =========================================================================
    // Completion
    // =========================================================================

    /// Complete the cart.
    ///
    /// Calling this again after an order was placed returns the same order
    /// without contacting the backend. An "already completed" answer is
    /// resolved by looking the order up by cart.
    ///
    /// # Errors
    ///
    /// - `InvalidTransition` before a payment provider is selected
    /// - `Validation` when the selected provider no longer has a session
    /// - `Backend` when the backend refuses; nothing is cleared and the
    ///   checkout stays at `PaymentSet`
    /// - `AmbiguousOutcome` when the backend says the cart is completed but
    ///   the order cannot be found
    #[instrument(skip(self), fields(cart_id = %self.cart_id))]
    pub async fn complete(&mut self) -> Result<CheckoutOutcome> {
        if let Some(order) = &self.order {
            info!(order_id = %order.id, "Order already placed");
            return Ok(CheckoutOutcome::OrderPlaced {
                order: Box::new(order.clone()),
            });
        }
        if !matches!(
            self.step,
            CheckoutStep::PaymentSet | CheckoutStep::PaymentRedirectRequired
        ) {
            return Err(self.invalid("complete the checkout"));
        }

        let provider = self
            .provider
            .clone()
            .ok_or_else(|| self.invalid("complete the checkout"))?;
        self.ensure_known_provider(&provider)?;

        add_breadcrumb(
            "checkout",
            "Completing checkout",
            Some(&[("provider_id", provider.as_str())]),
        );

        let completion = self.inner.backend.complete_cart(&self.cart_id).await;
        match completion {
            Ok(Completion::Order(order)) => Ok(self.placed(*order)),
            Ok(Completion::Redirect { url }) => {
                self.inner
                    .storage
                    .store(StorageSlot::PendingPayment, self.cart_id.as_str())?;
                self.step = CheckoutStep::PaymentRedirectRequired;
                info!(%url, "Payment requires a redirect");
                Ok(CheckoutOutcome::RedirectRequired { url })
            }
            Err(e) if e.is_already_completed() => {
                info!(error = %e, "Cart already completed; looking up its order");
                match existing_order(&self.inner, &self.cart_id).await {
                    Some(order) => Ok(self.placed(order)),
                    None => Err(ambiguous(self.cart_id.clone())),
                }
            }
            Err(e) => {
                warn!(error = %e, "Checkout completion failed");
                Err(e.into())
            }
        }
    }

    fn placed(&mut self, order: Order) -> CheckoutOutcome {
        info!(order_id = %order.id, reference = %order.reference(), "Order placed");
        add_breadcrumb(
            "checkout",
            "Order placed",
            Some(&[("order_id", order.id.as_str())]),
        );
        self.carts.finish_order(self.session);
        self.step = CheckoutStep::OrderCreated;
        self.order = Some(order.clone());
        CheckoutOutcome::OrderPlaced {
            order: Box::new(order),
        }
    }

    // =========================================================================
    // Sequencing
    // =========================================================================

    /// Allow the call from `at_least` onwards, but not once the checkout has
    /// left the process (order placed or redirect issued).
    fn require(&self, at_least: CheckoutStep, action: &'static str) -> Result<()> {
        if self.step < at_least || self.step.is_terminal() {
            return Err(self.invalid(action));
        }
        Ok(())
    }

    const fn invalid(&self, action: &'static str) -> StorefrontError {
        StorefrontError::InvalidTransition {
            action,
            step: self.step,
        }
    }

    fn ensure_known_provider(&self, provider_id: &PaymentProviderId) -> Result<()> {
        if self
            .cart()
            .and_then(|cart| cart.payment_session(provider_id))
            .is_none()
        {
            return Err(ValidationError::UnknownPaymentProvider(provider_id.clone()).into());
        }
        Ok(())
    }
}

/// Order created from a completed cart, looked up with the retry-round policy.
async fn existing_order(inner: &StorefrontInner, cart_id: &CartId) -> Option<Order> {
    let policy = &inner.settings.reconcile;
    poll_order_for_cart(
        inner.backend.as_ref(),
        inner.sleeper.as_ref(),
        cart_id,
        policy.retry_attempts,
        policy.retry_delay,
    )
    .await
}

fn ambiguous(cart_id: CartId) -> StorefrontError {
    let err = StorefrontError::AmbiguousOutcome { cart_id };
    report(&err);
    err
}
