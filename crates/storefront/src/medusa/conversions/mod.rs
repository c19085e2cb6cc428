//! Conversion of raw Medusa responses into domain types.

pub mod cart;
pub mod catalog;
pub mod order;

pub use cart::{convert_cart, convert_completion, convert_region, convert_shipping_option};
pub use catalog::{convert_collection, convert_product, convert_product_page};
pub use order::convert_order;

use tracing::warn;

use dorsal_core::{AddressInput, CurrencyCode, Money, ShippingAddress};

use super::wire;

/// Parse a currency code from the backend, falling back to the default.
fn currency_or_default(code: Option<&str>) -> CurrencyCode {
    code.and_then(|code| {
        CurrencyCode::parse(code)
            .map_err(|e| warn!(code, error = %e, "Ignoring malformed currency code"))
            .ok()
    })
    .unwrap_or_default()
}

fn money(amount: Option<i64>, currency: &CurrencyCode) -> Money {
    Money::new(amount.unwrap_or(0), currency.clone())
}

/// Keep an address only when it is complete enough to ship to.
fn convert_address(address: wire::Address) -> Option<ShippingAddress> {
    let input = AddressInput {
        first_name: address.first_name.unwrap_or_default(),
        last_name: address.last_name.unwrap_or_default(),
        address_1: address.address_1.unwrap_or_default(),
        address_2: address.address_2,
        city: address.city.unwrap_or_default(),
        postal_code: address.postal_code.unwrap_or_default(),
        province: address.province,
        country_code: address.country_code.unwrap_or_default(),
        phone: address.phone,
    };
    input.validate().ok()
}

/// Quantities are never negative on the backend; clamp anything odd to zero.
fn quantity(raw: i64) -> u32 {
    u32::try_from(raw).unwrap_or_else(|_| {
        warn!(quantity = raw, "Backend reported out-of-range quantity");
        0
    })
}
