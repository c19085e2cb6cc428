//! Raw JSON shapes of Medusa Store API responses.
//!
//! Fields are optional wherever the backend omits or nulls them depending on
//! version and `expand` settings. Nothing outside `medusa` sees these types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use dorsal_core::{FulfillmentStatus, PaymentSessionStatus, PaymentStatus};

// =============================================================================
// Envelopes
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct RegionsResponse {
    pub regions: Vec<Region>,
}

#[derive(Debug, Deserialize)]
pub struct CartResponse {
    pub cart: Cart,
}

#[derive(Debug, Deserialize)]
pub struct ShippingOptionsResponse {
    pub shipping_options: Vec<ShippingOption>,
}

#[derive(Debug, Deserialize)]
pub struct OrderResponse {
    pub order: Order,
}

#[derive(Debug, Deserialize)]
pub struct CompleteResponse {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub data: serde_json::Value,
}

#[derive(Debug, Deserialize)]
pub struct ProductsResponse {
    pub products: Vec<Product>,
    pub count: Option<u64>,
    pub offset: Option<u64>,
    pub limit: Option<u64>,
}

#[derive(Debug, Deserialize)]
pub struct CollectionsResponse {
    pub collections: Vec<Collection>,
}

/// Body of a non-2xx response.
#[derive(Debug, Default, Deserialize)]
pub struct ErrorBody {
    pub message: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub code: Option<String>,
}

// =============================================================================
// Request Bodies
// =============================================================================

#[derive(Debug, Default, Serialize)]
pub struct CreateCart<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub region_id: Option<&'a str>,
}

#[derive(Debug, Serialize)]
pub struct UpdateCartRegion<'a> {
    pub region_id: &'a str,
}

#[derive(Debug, Serialize)]
pub struct UpdateCartAddress<'a> {
    pub shipping_address: &'a dorsal_core::ShippingAddress,
    pub email: &'a str,
}

#[derive(Debug, Serialize)]
pub struct AddLineItem<'a> {
    pub variant_id: &'a str,
    pub quantity: u32,
}

#[derive(Debug, Serialize)]
pub struct UpdateLineItem {
    pub quantity: u32,
}

#[derive(Debug, Serialize)]
pub struct AddShippingMethod<'a> {
    pub option_id: &'a str,
}

#[derive(Debug, Serialize)]
pub struct SelectPaymentSession<'a> {
    pub provider_id: &'a str,
}

// =============================================================================
// Entities
// =============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct Region {
    pub id: String,
    pub name: Option<String>,
    pub currency_code: String,
    #[serde(default)]
    pub countries: Vec<Country>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Country {
    pub iso_2: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Address {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub address_1: Option<String>,
    pub address_2: Option<String>,
    pub city: Option<String>,
    pub postal_code: Option<String>,
    pub province: Option<String>,
    pub country_code: Option<String>,
    pub phone: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Cart {
    pub id: String,
    pub region_id: Option<String>,
    pub region: Option<Region>,
    pub currency_code: Option<String>,
    pub email: Option<String>,
    #[serde(default)]
    pub items: Vec<LineItem>,
    pub shipping_address: Option<Address>,
    #[serde(default)]
    pub shipping_methods: Vec<ShippingMethod>,
    #[serde(default)]
    pub payment_sessions: Vec<PaymentSession>,
    pub payment_session: Option<PaymentSession>,
    pub completed_at: Option<DateTime<Utc>>,
    pub subtotal: Option<i64>,
    pub shipping_total: Option<i64>,
    pub tax_total: Option<i64>,
    pub discount_total: Option<i64>,
    pub total: Option<i64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LineItem {
    pub id: String,
    pub variant_id: Option<String>,
    pub title: Option<String>,
    pub quantity: i64,
    pub unit_price: Option<i64>,
    pub total: Option<i64>,
    pub thumbnail: Option<String>,
    pub variant: Option<VariantRef>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct VariantRef {
    pub product: Option<ProductRef>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProductRef {
    pub handle: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ShippingMethod {
    pub id: String,
    pub shipping_option_id: Option<String>,
    pub name: Option<String>,
    pub price: Option<i64>,
    pub amount: Option<i64>,
    pub shipping_option: Option<ShippingOptionRef>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ShippingOptionRef {
    pub name: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ShippingOption {
    pub id: String,
    pub name: Option<String>,
    pub amount: Option<i64>,
    pub currency_code: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PaymentSession {
    pub id: String,
    pub provider_id: String,
    pub status: Option<PaymentSessionStatus>,
    pub is_selected: Option<bool>,
    #[serde(default)]
    pub data: serde_json::Value,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Order {
    pub id: String,
    pub display_id: Option<i64>,
    pub cart_id: Option<String>,
    pub email: Option<String>,
    #[serde(default)]
    pub items: Vec<LineItem>,
    pub shipping_address: Option<Address>,
    #[serde(default)]
    pub shipping_methods: Vec<ShippingMethod>,
    pub payment_status: Option<PaymentStatus>,
    pub fulfillment_status: Option<FulfillmentStatus>,
    pub currency_code: String,
    pub subtotal: Option<i64>,
    pub shipping_total: Option<i64>,
    pub tax_total: Option<i64>,
    pub discount_total: Option<i64>,
    pub total: Option<i64>,
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Product {
    pub id: String,
    pub title: String,
    pub handle: Option<String>,
    pub description: Option<String>,
    pub thumbnail: Option<String>,
    pub collection_id: Option<String>,
    #[serde(default)]
    pub variants: Vec<Variant>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Variant {
    pub id: String,
    pub title: Option<String>,
    pub sku: Option<String>,
    #[serde(default)]
    pub prices: Vec<Price>,
    pub inventory_quantity: Option<i64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Price {
    pub amount: i64,
    pub currency_code: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Collection {
    pub id: String,
    pub title: String,
    pub handle: Option<String>,
}
