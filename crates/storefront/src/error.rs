//! Unified error handling with Sentry integration.
//!
//! Every public operation returns [`Result<T>`]. Errors fall into the
//! categories of [`ErrorKind`]; callers show [`StorefrontError::user_message`]
//! to the customer and follow [`StorefrontError::navigation`] when present.

use thiserror::Error;

use dorsal_core::{AddressError, CartId, EmailError, PaymentProviderId, ShippingOptionId};

use crate::checkout::CheckoutStep;
use crate::medusa::MedusaError;
use crate::navigation::Navigation;
use crate::storage::StorageError;

/// Input rejected locally, before any network call.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("Quantity must be at least 1 (got {0})")]
    Quantity(i64),

    #[error("Invalid address: {0}")]
    Address(#[from] AddressError),

    #[error("Invalid email: {0}")]
    Email(#[from] EmailError),

    #[error("Shipping option {0} is not available for this cart")]
    UnknownShippingOption(ShippingOptionId),

    #[error("Payment provider {0} is not available for this cart")]
    UnknownPaymentProvider(PaymentProviderId),
}

/// Application-level error type for the storefront.
#[derive(Debug, Error)]
pub enum StorefrontError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Commerce backend call failed.
    #[error("Commerce backend error: {0}")]
    Backend(#[from] MedusaError),

    /// Local cart id persistence failed.
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("No region is available to create a cart in")]
    NoRegionAvailable,

    #[error("Cart is empty")]
    EmptyCart,

    /// A checkout step was called out of order.
    #[error("Cannot {action} while checkout is at {step}")]
    InvalidTransition {
        action: &'static str,
        step: CheckoutStep,
    },

    #[error("No shipping options are available for this address")]
    NoShippingOptions,

    #[error("No payment providers are available for this cart")]
    NoPaymentProviders,

    #[error("Payment was cancelled")]
    PaymentCancelled,

    #[error("Payment provider reported an error: {0}")]
    PaymentProvider(String),

    #[error("Payment callback carries no cart reference")]
    MissingCartReference,

    /// The payment may have succeeded, but no order could be confirmed.
    #[error("Payment outcome for cart {cart_id} could not be confirmed")]
    AmbiguousOutcome { cart_id: CartId },
}

/// Coarse error category.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Backend unreachable or not answering.
    Network,
    /// Bad input, caught before any network call.
    Validation,
    /// Backend answered with a structured failure.
    Backend,
    /// Payment may have succeeded but could not be confirmed.
    AmbiguousOutcome,
    /// Local persistence failed.
    Storage,
}

impl StorefrontError {
    /// Category of this error.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation(_)
            | Self::EmptyCart
            | Self::InvalidTransition { .. }
            | Self::MissingCartReference => ErrorKind::Validation,
            Self::Backend(err) if err.is_network() => ErrorKind::Network,
            Self::Backend(MedusaError::RateLimited(_)) => ErrorKind::Network,
            Self::Backend(_)
            | Self::NoRegionAvailable
            | Self::NoShippingOptions
            | Self::NoPaymentProviders
            | Self::PaymentCancelled
            | Self::PaymentProvider(_) => ErrorKind::Backend,
            Self::Storage(_) => ErrorKind::Storage,
            Self::AmbiguousOutcome { .. } => ErrorKind::AmbiguousOutcome,
        }
    }

    /// Whether the error came from the backend being unreachable.
    #[must_use]
    pub const fn is_network(&self) -> bool {
        matches!(self.kind(), ErrorKind::Network)
    }

    /// Text to show the customer.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Validation(err) => err.to_string(),
            Self::Backend(err) => backend_message(err),
            Self::Storage(_) => {
                "Your cart could not be saved on this device. Please try again.".to_string()
            }
            Self::NoRegionAvailable => {
                "The store is not accepting orders right now. Please try again later.".to_string()
            }
            Self::EmptyCart => "Your cart is empty. Add a product before checking out.".to_string(),
            Self::InvalidTransition { .. } => {
                "Please complete the previous checkout step first.".to_string()
            }
            Self::NoShippingOptions => {
                "We cannot ship to this address. Please check it or use a different one."
                    .to_string()
            }
            Self::NoPaymentProviders => {
                "No payment method is available for this order. Please contact support."
                    .to_string()
            }
            Self::PaymentCancelled => {
                "The payment was cancelled. You can choose a payment method and try again."
                    .to_string()
            }
            Self::PaymentProvider(message) => format!("The payment failed: {message}"),
            Self::MissingCartReference => {
                "We could not find the order this payment belongs to. Please contact support."
                    .to_string()
            }
            Self::AmbiguousOutcome { cart_id } => format!(
                "We could not confirm your payment yet. If you were charged, your order was \
                 placed and a confirmation email is on its way. Otherwise contact support and \
                 mention reference {cart_id}."
            ),
        }
    }

    /// Where to send the customer, when the error implies a move.
    #[must_use]
    pub fn navigation(&self) -> Option<Navigation> {
        match self {
            Self::EmptyCart => Some(Navigation::CartReview),
            Self::PaymentCancelled | Self::PaymentProvider(_) => Some(Navigation::Checkout),
            _ => None,
        }
    }

    /// Whether the error points at a problem on our side rather than the
    /// customer's input or an authoritative backend answer.
    #[must_use]
    pub const fn is_server_error(&self) -> bool {
        match self {
            Self::Backend(err) => !err.is_rejection() && !err.is_network(),
            Self::Storage(_) | Self::AmbiguousOutcome { .. } | Self::NoRegionAvailable => true,
            _ => false,
        }
    }
}

fn backend_message(err: &MedusaError) -> String {
    match err {
        MedusaError::Http(e) if e.is_timeout() => {
            "The store took too long to answer. Please try again.".to_string()
        }
        MedusaError::Http(_) | MedusaError::Unavailable(_) => {
            "Could not reach the store. Check your connection and try again.".to_string()
        }
        MedusaError::RateLimited(secs) => {
            format!("Too many requests. Please wait {secs} seconds and try again.")
        }
        MedusaError::NotFound(_) => "The requested item no longer exists.".to_string(),
        MedusaError::Api { status: 401 | 403, .. } => {
            "You are not allowed to do that.".to_string()
        }
        MedusaError::Api { message, .. } | MedusaError::CheckoutRejected(message) => {
            message.clone()
        }
        MedusaError::Parse(_)
        | MedusaError::UnexpectedResponse(_)
        | MedusaError::InvalidUrl(_)
        | MedusaError::InvalidHeader(_) => {
            "The store sent an unexpected answer. Please try again later.".to_string()
        }
    }
}

/// Result type alias for `StorefrontError`.
pub type Result<T> = std::result::Result<T, StorefrontError>;

/// Capture an error to Sentry if it is server-class, and log it.
pub fn report(err: &StorefrontError) {
    if err.is_server_error() {
        let event_id = sentry::capture_error(err);
        tracing::error!(
            error = %err,
            sentry_event_id = %event_id,
            "Storefront error"
        );
    } else {
        tracing::warn!(error = %err, kind = ?err.kind(), "Storefront operation failed");
    }
}

/// Add a breadcrumb for a checkout action.
///
/// Breadcrumbs appear in Sentry error reports to show the trail of actions
/// leading up to an error.
///
/// # Example
///
/// ```rust,ignore
/// add_breadcrumb("checkout", "Shipping option selected", Some(&[("cart_id", "cart_01")]));
/// ```
pub fn add_breadcrumb(category: &str, message: &str, data: Option<&[(&str, &str)]>) {
    let mut breadcrumb = sentry::Breadcrumb {
        category: Some(category.to_string()),
        message: Some(message.to_string()),
        level: sentry::Level::Info,
        ..Default::default()
    };

    if let Some(pairs) = data {
        for (key, value) in pairs {
            breadcrumb.data.insert(
                (*key).to_string(),
                serde_json::Value::String((*value).to_string()),
            );
        }
    }

    sentry::add_breadcrumb(breadcrumb);
}
