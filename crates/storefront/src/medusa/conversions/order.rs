//! Order conversions.

use dorsal_core::{CartId, LineItemId, OrderId, VariantId};

use crate::medusa::types::{Order, OrderItem, Totals};

use super::cart::convert_shipping_method;
use super::{convert_address, currency_or_default, money, quantity, wire};

pub fn convert_order(order: wire::Order) -> Order {
    let currency = currency_or_default(Some(&order.currency_code));

    Order {
        id: OrderId::new(order.id),
        display_id: order.display_id,
        cart_id: order.cart_id.and_then(|id| CartId::try_new(&id)),
        email: order.email,
        items: order
            .items
            .into_iter()
            .map(|item| OrderItem {
                id: LineItemId::new(item.id),
                title: item.title.unwrap_or_default(),
                quantity: quantity(item.quantity),
                unit_price: money(item.unit_price, &currency),
                variant_id: item.variant_id.and_then(|id| VariantId::try_new(&id)),
                product_handle: item.variant.and_then(|v| v.product).and_then(|p| p.handle),
            })
            .collect(),
        shipping_address: order.shipping_address.and_then(convert_address),
        shipping_methods: order
            .shipping_methods
            .into_iter()
            .map(|m| convert_shipping_method(m, &currency))
            .collect(),
        payment_status: order.payment_status.unwrap_or_default(),
        fulfillment_status: order.fulfillment_status.unwrap_or_default(),
        totals: Totals {
            subtotal: money(order.subtotal, &currency),
            shipping_total: money(order.shipping_total, &currency),
            tax_total: money(order.tax_total, &currency),
            discount_total: money(order.discount_total, &currency),
            total: money(order.total, &currency),
        },
        created_at: order.created_at,
        currency_code: currency,
    }
}
