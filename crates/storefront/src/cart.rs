//! Cart Session Manager.
//!
//! Owns the client-held cart identifier. The cart itself lives in the backend;
//! every mutation is followed by a re-fetch so callers only ever see the
//! canonical cart, and a failed mutation leaves the [`CartSession`] as it was.

use std::sync::Arc;

use rust_decimal::Decimal;
use tracing::{debug, info, instrument, warn};

use dorsal_core::{CartId, LineItemId, VariantId};

use crate::error::{Result, StorefrontError, ValidationError};
use crate::events::CartEvent;
use crate::medusa::{Cart, Region};
use crate::state::StorefrontInner;
use crate::storage::{CartStorage, StorageError, StorageSlot};

/// Backend-reported total of a cart, in major units.
///
/// Never derived from line items; tax, shipping and discount rules are the
/// backend's.
#[must_use]
pub fn compute_total(cart: &Cart) -> Decimal {
    cart.total()
}

/// Number of units in a cart, for badges.
#[must_use]
pub fn item_count(cart: &Cart) -> u32 {
    cart.item_count()
}

// =============================================================================
// CartSession
// =============================================================================

/// The cart handle threaded through cart and checkout calls.
///
/// Holds the cart id and the last canonical snapshot of the cart.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CartSession {
    cart_id: Option<CartId>,
    cart: Option<Cart>,
}

impl CartSession {
    /// A session without a cart.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A session bound to a known cart id; the cart is fetched on first use.
    #[must_use]
    pub fn with_cart_id(cart_id: CartId) -> Self {
        Self {
            cart_id: Some(cart_id),
            cart: None,
        }
    }

    /// Restore the session from the persisted cart id, if any.
    ///
    /// # Errors
    ///
    /// Returns an error if storage cannot be read.
    pub fn restore(storage: &dyn CartStorage) -> std::result::Result<Self, StorageError> {
        Ok(Self {
            cart_id: storage
                .load(StorageSlot::Cart)?
                .as_deref()
                .and_then(CartId::try_new),
            cart: None,
        })
    }

    #[must_use]
    pub const fn cart_id(&self) -> Option<&CartId> {
        self.cart_id.as_ref()
    }

    /// Last canonical cart seen by this session.
    #[must_use]
    pub const fn cart(&self) -> Option<&Cart> {
        self.cart.as_ref()
    }

    pub(crate) fn adopt(&mut self, cart: Cart) {
        self.cart_id = Some(cart.id.clone());
        self.cart = Some(cart);
    }

    pub(crate) fn reset(&mut self) {
        self.cart_id = None;
        self.cart = None;
    }
}

// =============================================================================
// CartManager
// =============================================================================

/// What the backend says about the session's cart.
#[derive(Debug)]
pub(crate) enum LoadedCart {
    Open(Cart),
    /// The cart has been completed; its order may be looked up by cart id.
    Completed(CartId),
    Missing,
}

/// Cart operations against the commerce backend.
#[derive(Clone)]
pub struct CartManager {
    inner: Arc<StorefrontInner>,
}

impl CartManager {
    pub(crate) const fn new(inner: Arc<StorefrontInner>) -> Self {
        Self { inner }
    }

    /// Session restored from the persisted cart id.
    ///
    /// # Errors
    ///
    /// Returns an error if storage cannot be read.
    pub fn session(&self) -> Result<CartSession> {
        Ok(CartSession::restore(self.inner.storage.as_ref())?)
    }

    /// Return the session's cart, creating one if there is none.
    ///
    /// A persisted id that the backend no longer knows, or whose cart has
    /// already become an order, is dropped silently and a fresh cart is created
    /// in the default region.
    ///
    /// # Errors
    ///
    /// - `NoRegionAvailable` if the backend reports no regions
    /// - `Backend` on network failure (the persisted id is kept)
    #[instrument(skip(self, session), fields(cart_id))]
    pub async fn get_or_create_cart(&self, session: &mut CartSession) -> Result<Cart> {
        let known = match session.cart_id() {
            Some(id) => Some(id.clone()),
            None => CartSession::restore(self.inner.storage.as_ref())?.cart_id,
        };

        if let Some(cart_id) = known {
            tracing::Span::current().record("cart_id", cart_id.as_str());
            match self.inner.backend.retrieve_cart(&cart_id).await {
                Ok(cart) if cart.is_completed() => {
                    info!("Persisted cart already became an order; starting a new cart");
                }
                Ok(cart) => {
                    let cart = self.ensure_region(cart).await?;
                    session.adopt(cart.clone());
                    return Ok(cart);
                }
                Err(e) if e.is_rejection() => {
                    info!(error = %e, "Persisted cart is gone; starting a new cart");
                }
                Err(e) => return Err(e.into()),
            }
        }

        let region = self.default_region().await?;
        let cart = self.inner.backend.create_cart(Some(&region.id)).await?;
        self.inner.storage.store(StorageSlot::Cart, cart.id.as_str())?;
        info!(cart_id = %cart.id, region_id = %region.id, "Created cart");
        session.adopt(cart.clone());
        Ok(cart)
    }

    /// Add `quantity` units of a variant.
    ///
    /// # Errors
    ///
    /// Returns `Validation` for a quantity below 1, before any network call.
    #[instrument(skip(self, session), fields(variant_id = %variant_id))]
    pub async fn add_line_item(
        &self,
        session: &mut CartSession,
        variant_id: &VariantId,
        quantity: i64,
    ) -> Result<Cart> {
        let quantity = positive_quantity(quantity)?;
        let cart = self.get_or_create_cart(session).await?;

        self.inner
            .backend
            .add_line_item(&cart.id, variant_id, quantity)
            .await?;
        self.refetch(session, &cart.id).await
    }

    /// Set a line item's quantity. Anything below 1 removes the line.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend call fails.
    #[instrument(skip(self, session), fields(line_item_id = %line_item_id))]
    pub async fn update_line_item_quantity(
        &self,
        session: &mut CartSession,
        line_item_id: &LineItemId,
        quantity: i64,
    ) -> Result<Cart> {
        if quantity < 1 {
            debug!(quantity, "Non-positive quantity; removing line item");
            return self.remove_line_item(session, line_item_id).await;
        }
        let quantity = positive_quantity(quantity)?;
        let cart = self.get_or_create_cart(session).await?;

        self.inner
            .backend
            .update_line_item(&cart.id, line_item_id, quantity)
            .await?;
        self.refetch(session, &cart.id).await
    }

    /// Remove a line item.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend call fails.
    #[instrument(skip(self, session), fields(line_item_id = %line_item_id))]
    pub async fn remove_line_item(
        &self,
        session: &mut CartSession,
        line_item_id: &LineItemId,
    ) -> Result<Cart> {
        let cart = self.get_or_create_cart(session).await?;

        self.inner
            .backend
            .remove_line_item(&cart.id, line_item_id)
            .await?;
        self.refetch(session, &cart.id).await
    }

    /// Re-fetch the session's cart without creating one.
    ///
    /// Returns `None` when the session has no cart, or when the backend no
    /// longer knows it or it has become an order (the persisted id is then
    /// dropped).
    ///
    /// # Errors
    ///
    /// Returns an error on network failure.
    #[instrument(skip(self, session))]
    pub async fn refresh(&self, session: &mut CartSession) -> Result<Option<Cart>> {
        match self.load(session).await? {
            LoadedCart::Open(cart) => Ok(Some(cart)),
            LoadedCart::Completed(_) => {
                self.clear(session)?;
                Ok(None)
            }
            LoadedCart::Missing => Ok(None),
        }
    }

    /// Fetch the session's cart, telling an open cart from one that has
    /// already become an order. A cart the backend no longer knows is
    /// forgotten.
    pub(crate) async fn load(&self, session: &mut CartSession) -> Result<LoadedCart> {
        let Some(cart_id) = self.known_cart_id(session)? else {
            return Ok(LoadedCart::Missing);
        };

        match self.inner.backend.retrieve_cart(&cart_id).await {
            Ok(cart) if !cart.is_completed() => {
                session.adopt(cart.clone());
                Ok(LoadedCart::Open(cart))
            }
            Ok(_) => {
                info!(cart_id = %cart_id, "Cart already became an order");
                Ok(LoadedCart::Completed(cart_id))
            }
            Err(e) if e.is_rejection() => {
                info!(cart_id = %cart_id, error = %e, "Cart is gone");
                self.clear(session)?;
                Ok(LoadedCart::Missing)
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Forget the cart: drop the persisted id and notify observers.
    ///
    /// # Errors
    ///
    /// Returns an error if storage cannot be written.
    pub fn clear(&self, session: &mut CartSession) -> Result<()> {
        self.inner.storage.clear(StorageSlot::Cart)?;
        session.reset();
        self.inner.events.publish(CartEvent::Cleared);
        Ok(())
    }

    /// Item count for a header badge.
    ///
    /// Best effort: any failure degrades to the last count the session saw.
    pub async fn badge_count(&self, session: &mut CartSession) -> u32 {
        let last_known = session.cart().map_or(0, Cart::item_count);
        let cart_id = match self.known_cart_id(session) {
            Ok(Some(id)) => id,
            Ok(None) => return 0,
            Err(e) => {
                debug!(error = %e, "Badge refresh could not read storage");
                return last_known;
            }
        };

        match self.inner.backend.retrieve_cart(&cart_id).await {
            Ok(cart) => {
                let count = cart.item_count();
                session.adopt(cart);
                count
            }
            Err(e) => {
                debug!(error = %e, "Badge refresh failed; keeping last count");
                last_known
            }
        }
    }

    /// Drop every trace of a cart that has become an order.
    ///
    /// The order is authoritative at this point, so storage failures are
    /// logged rather than returned.
    pub(crate) fn finish_order(&self, session: &mut CartSession) {
        for slot in [StorageSlot::Cart, StorageSlot::PendingPayment] {
            if let Err(e) = self.inner.storage.clear(slot) {
                warn!(error = %e, slot = slot.key(), "Failed to clear cart id after order");
            }
        }
        session.reset();
        // Stock levels changed
        self.inner.backend.invalidate_catalog();
        self.inner.events.publish(CartEvent::Cleared);
    }

    /// Re-fetch the canonical cart after a mutation and notify observers.
    pub(crate) async fn refetch(&self, session: &mut CartSession, cart_id: &CartId) -> Result<Cart> {
        let cart = self.inner.backend.retrieve_cart(cart_id).await?;
        self.inner.events.publish(CartEvent::Changed {
            cart_id: cart.id.clone(),
            item_count: cart.item_count(),
        });
        session.adopt(cart.clone());
        Ok(cart)
    }

    fn known_cart_id(&self, session: &CartSession) -> Result<Option<CartId>> {
        if let Some(id) = session.cart_id() {
            return Ok(Some(id.clone()));
        }
        Ok(CartSession::restore(self.inner.storage.as_ref())?.cart_id)
    }

    async fn ensure_region(&self, cart: Cart) -> Result<Cart> {
        if cart.region_id.is_some() {
            return Ok(cart);
        }
        let region = self.default_region().await?;
        info!(cart_id = %cart.id, region_id = %region.id, "Binding cart to default region");
        Ok(self
            .inner
            .backend
            .set_cart_region(&cart.id, &region.id)
            .await?)
    }

    /// Region in the preferred currency, else the first region reported.
    async fn default_region(&self) -> Result<Region> {
        let regions = self.inner.backend.list_regions().await?;
        let preferred = &self.inner.settings.preferred_currency;

        let position = regions
            .iter()
            .position(|region| &region.currency_code == preferred)
            .unwrap_or(0);
        regions
            .into_iter()
            .nth(position)
            .ok_or(StorefrontError::NoRegionAvailable)
    }
}

fn positive_quantity(quantity: i64) -> Result<u32> {
    u32::try_from(quantity)
        .ok()
        .filter(|q| *q >= 1)
        .ok_or_else(|| ValidationError::Quantity(quantity).into())
}
