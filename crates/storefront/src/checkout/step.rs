use std::fmt;

/// Position of a checkout in the address, shipping, payment and completion
/// sequence. Steps are ordered; a later step implies every earlier one.
///
/// Failures are not a step: a failed call returns an error and the checkout
/// stays where it was.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum CheckoutStep {
    CartLoaded,
    AddressSet,
    ShippingOptionsReady,
    ShippingSet,
    PaymentSessionsReady,
    PaymentSet,
    PaymentRedirectRequired,
    OrderCreated,
}

impl CheckoutStep {
    /// No further in-process transition is possible.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::PaymentRedirectRequired | Self::OrderCreated)
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::CartLoaded => "cart loaded",
            Self::AddressSet => "address set",
            Self::ShippingOptionsReady => "shipping options ready",
            Self::ShippingSet => "shipping set",
            Self::PaymentSessionsReady => "payment sessions ready",
            Self::PaymentSet => "payment set",
            Self::PaymentRedirectRequired => "payment redirect required",
            Self::OrderCreated => "order created",
        }
    }
}

impl fmt::Display for CheckoutStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
