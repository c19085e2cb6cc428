//! Cart, region, shipping and completion conversions.

use tracing::warn;
use url::Url;

use dorsal_core::{
    CartId, CurrencyCode, Email, LineItemId, PaymentProviderId, PaymentSessionId, RegionId,
    ShippingMethodId, ShippingOptionId, VariantId,
};

use crate::backend::Completion;
use crate::medusa::MedusaError;
use crate::medusa::types::{
    Cart, LineItem, PaymentSession, Region, ShippingMethod, ShippingOption, Totals,
};

use super::{convert_address, convert_order, currency_or_default, money, quantity, wire};

pub fn convert_region(region: wire::Region) -> Region {
    Region {
        name: region.name.unwrap_or_else(|| region.id.clone()),
        id: RegionId::new(region.id),
        currency_code: currency_or_default(Some(&region.currency_code)),
        countries: region
            .countries
            .into_iter()
            .map(|c| c.iso_2.to_ascii_lowercase())
            .collect(),
    }
}

pub fn convert_cart(cart: wire::Cart) -> Cart {
    let currency = currency_or_default(
        cart.region
            .as_ref()
            .map(|r| r.currency_code.as_str())
            .or(cart.currency_code.as_deref()),
    );

    let region_id = cart
        .region_id
        .or_else(|| cart.region.map(|r| r.id))
        .and_then(|id| RegionId::try_new(&id));

    // Older backends only flag the selection on the singular field
    let selected_id = cart.payment_session.as_ref().map(|s| s.id.clone());
    let mut payment_sessions: Vec<PaymentSession> = cart
        .payment_sessions
        .into_iter()
        .map(|s| {
            let mut session = convert_payment_session(s);
            if selected_id.as_deref() == Some(session.id.as_str()) {
                session.is_selected = true;
            }
            session
        })
        .collect();
    if payment_sessions.is_empty()
        && let Some(selected) = cart.payment_session
    {
        let mut session = convert_payment_session(selected);
        session.is_selected = true;
        payment_sessions.push(session);
    }

    Cart {
        id: CartId::new(cart.id),
        region_id,
        email: cart.email.as_deref().and_then(|e| Email::parse(e).ok()),
        items: cart
            .items
            .into_iter()
            .map(|item| convert_line_item(item, &currency))
            .collect(),
        shipping_address: cart.shipping_address.and_then(convert_address),
        shipping_methods: cart
            .shipping_methods
            .into_iter()
            .map(|m| convert_shipping_method(m, &currency))
            .collect(),
        payment_sessions,
        totals: Totals {
            subtotal: money(cart.subtotal, &currency),
            shipping_total: money(cart.shipping_total, &currency),
            tax_total: money(cart.tax_total, &currency),
            discount_total: money(cart.discount_total, &currency),
            total: money(cart.total, &currency),
        },
        completed_at: cart.completed_at,
        currency_code: currency,
    }
}

fn convert_line_item(item: wire::LineItem, currency: &CurrencyCode) -> LineItem {
    LineItem {
        id: LineItemId::new(item.id),
        variant_id: item.variant_id.and_then(|id| VariantId::try_new(&id)),
        title: item.title.unwrap_or_default(),
        quantity: quantity(item.quantity),
        unit_price: money(item.unit_price, currency),
        total: money(item.total, currency),
        thumbnail: item.thumbnail,
    }
}

pub(super) fn convert_shipping_method(
    method: wire::ShippingMethod,
    currency: &CurrencyCode,
) -> ShippingMethod {
    ShippingMethod {
        id: ShippingMethodId::new(method.id),
        shipping_option_id: method
            .shipping_option_id
            .and_then(|id| ShippingOptionId::try_new(&id)),
        name: method
            .name
            .or_else(|| method.shipping_option.and_then(|o| o.name))
            .unwrap_or_else(|| "Shipping".to_string()),
        amount: money(method.amount.or(method.price), currency),
    }
}

pub fn convert_shipping_option(
    option: wire::ShippingOption,
    cart_currency: &CurrencyCode,
) -> ShippingOption {
    let currency = option
        .currency_code
        .as_deref()
        .map_or_else(|| cart_currency.clone(), |code| currency_or_default(Some(code)));
    ShippingOption {
        name: option.name.unwrap_or_else(|| option.id.clone()),
        id: ShippingOptionId::new(option.id),
        amount: money(option.amount, &currency),
    }
}

fn convert_payment_session(session: wire::PaymentSession) -> PaymentSession {
    PaymentSession {
        id: PaymentSessionId::new(session.id),
        provider_id: PaymentProviderId::new(session.provider_id),
        status: session.status.unwrap_or_default(),
        is_selected: session.is_selected.unwrap_or(false),
        data: session.data,
    }
}

/// Interpret the `{type, data}` envelope of a completion call.
///
/// # Errors
///
/// Returns [`MedusaError::CheckoutRejected`] when the backend neither created
/// an order nor asked for a redirect, carrying the backend's message.
pub fn convert_completion(response: wire::CompleteResponse) -> Result<Completion, MedusaError> {
    match response.kind.as_str() {
        "order" => {
            let order: wire::Order = serde_json::from_value(response.data)?;
            Ok(Completion::Order(Box::new(convert_order(order))))
        }
        "cart" => {
            let message = rejection_message(&response.data);
            let Ok(cart) = serde_json::from_value::<wire::Cart>(response.data) else {
                return Err(MedusaError::CheckoutRejected(message));
            };
            let cart = convert_cart(cart);
            let redirect = cart
                .selected_payment_session()
                .or_else(|| cart.payment_sessions.first())
                .and_then(PaymentSession::redirect_url)
                .map(Url::parse);
            match redirect {
                Some(Ok(url)) => Ok(Completion::Redirect { url }),
                Some(Err(e)) => {
                    warn!(cart_id = %cart.id, error = %e, "Payment provider returned an unusable redirect URL");
                    Err(MedusaError::UnexpectedResponse(format!(
                        "invalid payment redirect URL: {e}"
                    )))
                }
                None => Err(MedusaError::CheckoutRejected(message)),
            }
        }
        other => {
            warn!(kind = other, "Unexpected completion response type");
            Err(MedusaError::CheckoutRejected(rejection_message(
                &response.data,
            )))
        }
    }
}

fn rejection_message(data: &serde_json::Value) -> String {
    data.get("message")
        .and_then(serde_json::Value::as_str)
        .filter(|m| !m.is_empty())
        .unwrap_or("The order could not be placed")
        .to_string()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    fn wire_cart(value: serde_json::Value) -> wire::Cart {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_convert_cart_reads_region_currency() {
        let cart = convert_cart(wire_cart(json!({
            "id": "cart_1",
            "region_id": "reg_eu",
            "region": {"id": "reg_eu", "name": "Europe", "currency_code": "EUR"},
            "email": "fan@example.com",
            "items": [{
                "id": "item_1",
                "variant_id": "variant_1",
                "title": "Home jersey",
                "quantity": 2,
                "unit_price": 4500,
                "total": 9000
            }],
            "subtotal": 9000,
            "total": 9495
        })));

        assert_eq!(cart.id.as_str(), "cart_1");
        assert_eq!(cart.region_id.as_ref().unwrap().as_str(), "reg_eu");
        assert_eq!(cart.currency_code.as_str(), "eur");
        assert_eq!(cart.item_count(), 2);
        assert_eq!(cart.items[0].unit_price.amount, 4500);
        assert_eq!(cart.totals.total.amount, 9495);
        assert_eq!(cart.totals.shipping_total.amount, 0);
        assert!(cart.shipping_address.is_none());
        assert!(!cart.is_completed());
    }

    #[test]
    fn test_convert_cart_marks_singular_selected_session() {
        let cart = convert_cart(wire_cart(json!({
            "id": "cart_1",
            "payment_sessions": [
                {"id": "ps_manual", "provider_id": "manual", "status": "pending"},
                {"id": "ps_stripe", "provider_id": "stripe", "status": "pending"}
            ],
            "payment_session": {"id": "ps_stripe", "provider_id": "stripe"}
        })));

        let selected = cart.selected_payment_session().unwrap();
        assert_eq!(selected.provider_id.as_str(), "stripe");
        assert_eq!(cart.payment_sessions.len(), 2);
    }

    #[test]
    fn test_shipping_method_name_fallbacks() {
        let cart = convert_cart(wire_cart(json!({
            "id": "cart_1",
            "shipping_methods": [
                {"id": "sm_1", "shipping_option_id": "so_1", "price": 495,
                 "shipping_option": {"name": "Standard"}},
                {"id": "sm_2", "amount": 995}
            ]
        })));
        assert_eq!(cart.shipping_methods[0].name, "Standard");
        assert_eq!(cart.shipping_methods[0].amount.amount, 495);
        assert_eq!(cart.shipping_methods[1].name, "Shipping");
        assert_eq!(cart.shipping_methods[1].amount.amount, 995);
    }

    #[test]
    fn test_completion_order() {
        let response = wire::CompleteResponse {
            kind: "order".to_string(),
            data: json!({
                "id": "order_1",
                "display_id": 1042,
                "cart_id": "cart_1",
                "currency_code": "eur",
                "payment_status": "captured",
                "total": 9495
            }),
        };
        let Completion::Order(order) = convert_completion(response).unwrap() else {
            panic!("expected an order");
        };
        assert_eq!(order.id.as_str(), "order_1");
        assert_eq!(order.reference(), "#1042");
    }

    #[test]
    fn test_completion_redirect() {
        let response = wire::CompleteResponse {
            kind: "cart".to_string(),
            data: json!({
                "id": "cart_1",
                "payment_session": {
                    "id": "ps_1",
                    "provider_id": "stripe",
                    "status": "requires_more",
                    "data": {"next_action": {"redirect_to_url": {"url": "https://hooks.stripe.com/3ds"}}}
                }
            }),
        };
        assert_eq!(
            convert_completion(response).unwrap(),
            Completion::Redirect {
                url: Url::parse("https://hooks.stripe.com/3ds").unwrap()
            }
        );
    }

    #[test]
    fn test_completion_cart_without_redirect_is_rejected() {
        let response = wire::CompleteResponse {
            kind: "cart".to_string(),
            data: json!({"id": "cart_1", "message": "Payment was declined"}),
        };
        let err = convert_completion(response).unwrap_err();
        assert!(matches!(err, MedusaError::CheckoutRejected(ref m) if m == "Payment was declined"));
    }

    #[test]
    fn test_completion_unknown_type_uses_default_message() {
        let response = wire::CompleteResponse {
            kind: "swap".to_string(),
            data: json!({}),
        };
        let err = convert_completion(response).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Checkout rejected: The order could not be placed"
        );
    }
}
