//! Plain-text rendering of storefront data.

use std::fmt::Write;

use dorsal_storefront::medusa::{
    Cart, Collection, Order, PaymentSession, Product, Region, ShippingOption,
};

pub fn cart(cart: &Cart) -> String {
    let mut out = format!("Cart {} ({})\n", cart.id, cart.currency_code);
    for item in &cart.items {
        let _ = writeln!(
            out,
            "  {} x {}  {}  [{}]",
            item.quantity, item.title, item.total, item.id
        );
    }
    if !cart.shipping_methods.is_empty() {
        let _ = writeln!(out, "Shipping: {}", cart.totals.shipping_total);
    }
    let _ = write!(
        out,
        "Items: {}  Total: {}",
        cart.item_count(),
        cart.totals.total
    );
    out
}

pub fn order(order: &Order) -> String {
    let number = order
        .display_id
        .map_or_else(|| order.id.to_string(), |id| format!("#{id}"));
    let mut out = format!("Order {number} ({})\n", order.id);
    for item in &order.items {
        let _ = writeln!(out, "  {} x {}  {}", item.quantity, item.title, item.unit_price);
    }
    if let Some(email) = &order.email {
        let _ = writeln!(out, "Confirmation sent to {email}");
    }
    let _ = write!(
        out,
        "Payment: {:?}  Total: {}",
        order.payment_status, order.totals.total
    );
    out
}

pub fn shipping_options(options: &[ShippingOption]) -> String {
    let mut out = String::from("Shipping options:");
    for option in options {
        let _ = write!(out, "\n  {}  {}  {}", option.id, option.name, option.amount);
    }
    out
}

pub fn payment_sessions(sessions: &[PaymentSession]) -> String {
    let mut out = String::from("Payment providers:");
    for session in sessions {
        let _ = write!(out, "\n  {}", session.provider_id);
    }
    out
}

pub fn regions(regions: &[Region]) -> String {
    regions
        .iter()
        .map(|r| format!("{}  {}  {}", r.id, r.name, r.currency_code))
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn product(product: &Product) -> String {
    let mut out = format!("{} ({})", product.title, product.handle);
    if let Some(description) = &product.description {
        let _ = write!(out, "\n{description}");
    }
    for variant in &product.variants {
        let prices = variant
            .prices
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(", ");
        let _ = write!(out, "\n  {}  {}  {prices}", variant.id, variant.title);
    }
    out
}

pub fn products(products: &[Product]) -> String {
    products
        .iter()
        .map(|p| format!("{}  {}", p.handle, p.title))
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn collections(collections: &[Collection]) -> String {
    collections
        .iter()
        .map(|c| format!("{}  {}", c.handle, c.title))
        .collect::<Vec<_>>()
        .join("\n")
}
