//! The commerce backend as seen by the orchestration code.
//!
//! [`MedusaClient`](crate::medusa::MedusaClient) is the production
//! implementation. Tests drive the cart, checkout and reconciliation logic
//! through in-memory implementations of the same trait.

use async_trait::async_trait;
use url::Url;

use dorsal_core::{
    CartId, LineItemId, OrderId, PaymentProviderId, RegionId, ShippingAddress, ShippingOptionId,
    VariantId,
};

use crate::medusa::MedusaError;
use crate::medusa::types::{Cart, Order, Region, ShippingOption};

/// Outcome of a cart completion call.
#[derive(Debug, Clone, PartialEq)]
pub enum Completion {
    /// The backend created an order.
    Order(Box<Order>),
    /// The payment provider needs the customer on a hosted page first.
    Redirect { url: Url },
}

/// Cart, shipping, payment and order operations of a commerce backend.
///
/// Every cart mutation returns the cart as the backend reported it in the
/// mutation response. Callers that need the canonical state re-fetch with
/// [`retrieve_cart`](Self::retrieve_cart).
#[async_trait]
pub trait CommerceBackend: Send + Sync {
    async fn list_regions(&self) -> Result<Vec<Region>, MedusaError>;

    async fn create_cart(&self, region_id: Option<&RegionId>) -> Result<Cart, MedusaError>;

    async fn retrieve_cart(&self, cart_id: &CartId) -> Result<Cart, MedusaError>;

    async fn set_cart_region(
        &self,
        cart_id: &CartId,
        region_id: &RegionId,
    ) -> Result<Cart, MedusaError>;

    async fn add_line_item(
        &self,
        cart_id: &CartId,
        variant_id: &VariantId,
        quantity: u32,
    ) -> Result<Cart, MedusaError>;

    async fn update_line_item(
        &self,
        cart_id: &CartId,
        line_item_id: &LineItemId,
        quantity: u32,
    ) -> Result<Cart, MedusaError>;

    async fn remove_line_item(
        &self,
        cart_id: &CartId,
        line_item_id: &LineItemId,
    ) -> Result<Cart, MedusaError>;

    async fn set_shipping_address(
        &self,
        cart_id: &CartId,
        address: &ShippingAddress,
        email: &str,
    ) -> Result<Cart, MedusaError>;

    async fn list_shipping_options(
        &self,
        cart_id: &CartId,
    ) -> Result<Vec<ShippingOption>, MedusaError>;

    async fn add_shipping_method(
        &self,
        cart_id: &CartId,
        option_id: &ShippingOptionId,
    ) -> Result<Cart, MedusaError>;

    /// Create payment sessions for every provider enabled in the cart's region.
    async fn init_payment_sessions(&self, cart_id: &CartId) -> Result<Cart, MedusaError>;

    async fn select_payment_session(
        &self,
        cart_id: &CartId,
        provider_id: &PaymentProviderId,
    ) -> Result<Cart, MedusaError>;

    async fn complete_cart(&self, cart_id: &CartId) -> Result<Completion, MedusaError>;

    async fn retrieve_order(&self, order_id: &OrderId) -> Result<Order, MedusaError>;

    /// Order created from a cart, or `None` while none exists.
    ///
    /// A single request: callers that poll own the schedule.
    async fn order_for_cart(&self, cart_id: &CartId) -> Result<Option<Order>, MedusaError>;

    /// Drop cached catalog data, e.g. once an order has changed stock levels.
    fn invalidate_catalog(&self) {}
}
