//! Shared storefront state.

use std::sync::Arc;
use std::time::Duration;

use tracing::instrument;

use dorsal_core::{CurrencyCode, OrderId};

use crate::backend::CommerceBackend;
use crate::cart::{CartManager, CartSession};
use crate::checkout::Checkout;
use crate::config::StorefrontConfig;
use crate::delay::{Sleeper, TokioSleeper};
use crate::error::Result;
use crate::events::CartEvents;
use crate::medusa::{MedusaClient, MedusaError, Order};
use crate::payment::{PaymentReconciler, ReconcilePolicy};
use crate::storage::{CartStorage, FileStorage};

/// Behavior knobs of the cart, checkout and reconciliation flows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    /// Currency whose region new carts are created in
    pub preferred_currency: CurrencyCode,
    /// Bounded polling for out-of-band payment confirmation
    pub reconcile: ReconcilePolicy,
    /// Quiet period before a typed address counts as settled
    pub address_debounce: Duration,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            preferred_currency: CurrencyCode::default(),
            reconcile: ReconcilePolicy::default(),
            address_debounce: Duration::from_millis(400),
        }
    }
}

impl From<&StorefrontConfig> for Settings {
    fn from(config: &StorefrontConfig) -> Self {
        Self {
            preferred_currency: config.preferred_currency.clone(),
            reconcile: config.reconcile.clone(),
            address_debounce: config.address_debounce,
        }
    }
}

/// Storefront state shared by the cart, checkout and payment flows.
///
/// This struct is cheaply cloneable via `Arc`. The backend, storage and
/// delay are injected ports.
#[derive(Clone)]
pub struct Storefront {
    inner: Arc<StorefrontInner>,
}

pub(crate) struct StorefrontInner {
    pub(crate) backend: Arc<dyn CommerceBackend>,
    pub(crate) storage: Arc<dyn CartStorage>,
    pub(crate) sleeper: Arc<dyn Sleeper>,
    pub(crate) events: CartEvents,
    pub(crate) settings: Settings,
}

impl Storefront {
    /// Start building a storefront over a backend and a storage.
    #[must_use]
    pub fn builder(
        backend: Arc<dyn CommerceBackend>,
        storage: Arc<dyn CartStorage>,
    ) -> StorefrontBuilder {
        StorefrontBuilder {
            backend,
            storage,
            sleeper: Arc::new(TokioSleeper),
            settings: Settings::default(),
        }
    }

    /// Storefront over the Medusa backend and file storage of `config`.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn from_config(config: &StorefrontConfig) -> std::result::Result<Self, MedusaError> {
        let client = MedusaClient::new(&config.medusa)?;
        Ok(Self::builder(
            Arc::new(client),
            Arc::new(FileStorage::new(&config.state_dir)),
        )
        .settings(Settings::from(config))
        .build())
    }

    /// Cart Session Manager.
    #[must_use]
    pub fn carts(&self) -> CartManager {
        CartManager::new(Arc::clone(&self.inner))
    }

    /// Start a checkout of the session's cart. A cart that already became an
    /// order resumes at `OrderCreated`.
    ///
    /// # Errors
    ///
    /// Returns `EmptyCart` for a missing or empty cart, and `AmbiguousOutcome`
    /// for a completed cart whose order cannot be found.
    pub async fn checkout<'s>(&self, session: &'s mut CartSession) -> Result<Checkout<'s>> {
        Checkout::begin(Arc::clone(&self.inner), session).await
    }

    /// Payment Callback Reconciler.
    #[must_use]
    pub fn reconciler(&self) -> PaymentReconciler {
        PaymentReconciler::new(Arc::clone(&self.inner))
    }

    /// Cart-changed notifications.
    #[must_use]
    pub fn events(&self) -> &CartEvents {
        &self.inner.events
    }

    #[must_use]
    pub fn settings(&self) -> &Settings {
        &self.inner.settings
    }

    /// Fetch a placed order, e.g. for a confirmation page.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend call fails or the order does not exist.
    #[instrument(skip(self), fields(order_id = %order_id))]
    pub async fn order(&self, order_id: &OrderId) -> Result<Order> {
        Ok(self.inner.backend.retrieve_order(order_id).await?)
    }
}

/// Builder for [`Storefront`].
pub struct StorefrontBuilder {
    backend: Arc<dyn CommerceBackend>,
    storage: Arc<dyn CartStorage>,
    sleeper: Arc<dyn Sleeper>,
    settings: Settings,
}

impl StorefrontBuilder {
    /// Replace the delay used by bounded polling.
    #[must_use]
    pub fn sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    #[must_use]
    pub fn settings(mut self, settings: Settings) -> Self {
        self.settings = settings;
        self
    }

    #[must_use]
    pub fn build(self) -> Storefront {
        Storefront {
            inner: Arc::new(StorefrontInner {
                backend: self.backend,
                storage: self.storage,
                sleeper: self.sleeper,
                events: CartEvents::new(),
                settings: self.settings,
            }),
        }
    }
}
