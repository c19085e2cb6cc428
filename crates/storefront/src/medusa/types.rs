//! Domain types for the Medusa Store API.
//!
//! These are the shapes the rest of the crate works with. The raw JSON
//! shapes live in `wire` and are turned into these by `conversions`.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use dorsal_core::{
    CartId, CollectionId, CurrencyCode, Email, FulfillmentStatus, LineItemId, Money, OrderId,
    PaymentProviderId, PaymentSessionId, PaymentSessionStatus, PaymentStatus, ProductId,
    RegionId, ShippingAddress, ShippingMethodId, ShippingOptionId, VariantId,
};

// =============================================================================
// Region Types
// =============================================================================

/// A region: a set of countries sharing one currency and tax setup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Region {
    pub id: RegionId,
    pub name: String,
    pub currency_code: CurrencyCode,
    /// Lowercase ISO 3166-1 alpha-2 codes served by this region.
    pub countries: Vec<String>,
}

// =============================================================================
// Cart Types
// =============================================================================

/// Backend-computed totals. Never recomputed client-side.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Totals {
    pub subtotal: Money,
    pub shipping_total: Money,
    pub tax_total: Money,
    pub discount_total: Money,
    pub total: Money,
}

/// A quantity of one product variant in a cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItem {
    pub id: LineItemId,
    pub variant_id: Option<VariantId>,
    pub title: String,
    pub quantity: u32,
    pub unit_price: Money,
    pub total: Money,
    pub thumbnail: Option<String>,
}

/// Shipping method attached to a cart or order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShippingMethod {
    pub id: ShippingMethodId,
    pub shipping_option_id: Option<ShippingOptionId>,
    pub name: String,
    pub amount: Money,
}

/// A priced delivery method offered for the cart's destination.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShippingOption {
    pub id: ShippingOptionId,
    pub name: String,
    pub amount: Money,
}

/// A provider-specific payment attempt for a cart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentSession {
    pub id: PaymentSessionId,
    pub provider_id: PaymentProviderId,
    pub status: PaymentSessionStatus,
    pub is_selected: bool,
    /// Provider payload, passed through untouched.
    pub data: serde_json::Value,
}

impl PaymentSession {
    /// Hosted payment page the customer must visit, if the provider asks for one.
    ///
    /// Providers disagree on where they put it: `redirect_url`, `url`, or
    /// Stripe's `next_action.redirect_to_url.url`.
    #[must_use]
    pub fn redirect_url(&self) -> Option<&str> {
        let data = &self.data;
        data.get("redirect_url")
            .and_then(serde_json::Value::as_str)
            .or_else(|| data.get("url").and_then(serde_json::Value::as_str))
            .or_else(|| {
                data.pointer("/next_action/redirect_to_url/url")
                    .and_then(serde_json::Value::as_str)
            })
            .filter(|url| !url.is_empty())
    }
}

/// Canonical server-side cart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cart {
    pub id: CartId,
    pub region_id: Option<RegionId>,
    pub currency_code: CurrencyCode,
    pub email: Option<Email>,
    pub items: Vec<LineItem>,
    /// Present only when the backend holds a complete, valid address.
    pub shipping_address: Option<ShippingAddress>,
    pub shipping_methods: Vec<ShippingMethod>,
    pub payment_sessions: Vec<PaymentSession>,
    pub totals: Totals,
    pub completed_at: Option<DateTime<Utc>>,
}

impl Cart {
    /// Whether the cart has no line items.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Whether the backend has already turned this cart into an order.
    #[must_use]
    pub const fn is_completed(&self) -> bool {
        self.completed_at.is_some()
    }

    /// Sum of line-item quantities.
    #[must_use]
    pub fn item_count(&self) -> u32 {
        self.items
            .iter()
            .fold(0_u32, |count, item| count.saturating_add(item.quantity))
    }

    /// Backend-reported total in major units.
    #[must_use]
    pub fn total(&self) -> Decimal {
        self.totals.total.to_decimal()
    }

    /// Find a line item by id.
    #[must_use]
    pub fn line_item(&self, id: &LineItemId) -> Option<&LineItem> {
        self.items.iter().find(|item| &item.id == id)
    }

    /// Payment session for a provider, if the cart knows one.
    #[must_use]
    pub fn payment_session(&self, provider_id: &PaymentProviderId) -> Option<&PaymentSession> {
        self.payment_sessions
            .iter()
            .find(|session| &session.provider_id == provider_id)
    }

    /// Currently selected payment session.
    #[must_use]
    pub fn selected_payment_session(&self) -> Option<&PaymentSession> {
        self.payment_sessions.iter().find(|session| session.is_selected)
    }
}

// =============================================================================
// Order Types
// =============================================================================

/// Snapshot of a purchased line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderItem {
    pub id: LineItemId,
    pub title: String,
    pub quantity: u32,
    pub unit_price: Money,
    pub variant_id: Option<VariantId>,
    pub product_handle: Option<String>,
}

/// Immutable record created by a successful checkout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    /// Human-facing order number.
    pub display_id: Option<i64>,
    pub cart_id: Option<CartId>,
    pub email: Option<String>,
    pub items: Vec<OrderItem>,
    pub shipping_address: Option<ShippingAddress>,
    pub shipping_methods: Vec<ShippingMethod>,
    pub payment_status: PaymentStatus,
    pub fulfillment_status: FulfillmentStatus,
    pub currency_code: CurrencyCode,
    pub totals: Totals,
    pub created_at: Option<DateTime<Utc>>,
}

impl Order {
    /// Order number to show the customer (`#1042`), falling back to the id.
    #[must_use]
    pub fn reference(&self) -> String {
        self.display_id
            .map_or_else(|| self.id.to_string(), |display_id| format!("#{display_id}"))
    }
}

// =============================================================================
// Catalog Types
// =============================================================================

/// A purchasable variant of a product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductVariant {
    pub id: VariantId,
    pub title: String,
    pub sku: Option<String>,
    pub prices: Vec<Money>,
    pub inventory_quantity: Option<i64>,
}

impl ProductVariant {
    /// Price in a given currency.
    #[must_use]
    pub fn price_in(&self, currency: &CurrencyCode) -> Option<&Money> {
        self.prices
            .iter()
            .find(|price| &price.currency_code == currency)
    }
}

/// A catalog product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub title: String,
    pub handle: String,
    pub description: Option<String>,
    pub thumbnail: Option<String>,
    pub collection_id: Option<CollectionId>,
    pub variants: Vec<ProductVariant>,
}

/// A page of products with pagination info.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductPage {
    pub products: Vec<Product>,
    /// Total products matching the query across all pages.
    pub count: u64,
    pub offset: u64,
    pub limit: u64,
}

impl ProductPage {
    /// Whether another page follows this one.
    #[must_use]
    pub const fn has_next_page(&self) -> bool {
        self.offset.saturating_add(self.limit) < self.count
    }
}

/// A product collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Collection {
    pub id: CollectionId,
    pub title: String,
    pub handle: String,
}
