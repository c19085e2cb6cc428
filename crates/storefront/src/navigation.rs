//! Where the caller should send the customer next.

use url::Url;
use urlencoding::encode;

use dorsal_core::OrderId;

/// A navigation target produced by checkout and reconciliation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Navigation {
    /// Back to the cart, e.g. when checkout is refused for an empty cart.
    CartReview,
    /// Back into checkout, e.g. after a cancelled hosted payment.
    Checkout,
    /// The confirmation page of a placed order.
    OrderConfirmation(OrderId),
    /// A page outside the storefront (hosted payment page).
    External(Url),
}

impl Navigation {
    /// Path or absolute URL of the target.
    #[must_use]
    pub fn location(&self) -> String {
        match self {
            Self::CartReview => "/cart".to_string(),
            Self::Checkout => "/checkout".to_string(),
            Self::OrderConfirmation(order_id) => {
                format!("/checkout/confirmation?order_id={}", encode(order_id.as_str()))
            }
            Self::External(url) => url.to_string(),
        }
    }
}
