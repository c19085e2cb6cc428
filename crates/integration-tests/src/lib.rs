//! Integration tests for the Dorsal storefront.
//!
//! Each test drives the real [`Storefront`] (Medusa HTTP client, file
//! storage, tokio delays) against a `wiremock` server standing in for the
//! Medusa Store API.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p dorsal-integration-tests
//! ```
//!
//! # Test Categories
//!
//! - `cart_session` - Cart persistence and recovery
//! - `checkout_flow` - Address to order, including provider redirects
//! - `payment_callback` - Reconciliation of hosted payment returns

#![allow(clippy::missing_panics_doc)]

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU32, Ordering};

use serde_json::{Value, json};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use dorsal_storefront::Storefront;
use dorsal_storefront::config::StorefrontConfig;
use dorsal_storefront::storage::{CartStorage, FileStorage, StorageSlot};

static NEXT_DIR: AtomicU32 = AtomicU32::new(0);

/// A mocked Medusa backend plus a private state directory.
pub struct TestBackend {
    pub server: MockServer,
    state_dir: PathBuf,
}

impl TestBackend {
    pub async fn start() -> Self {
        let state_dir = std::env::temp_dir().join(format!(
            "dorsal-it-{}-{}",
            std::process::id(),
            NEXT_DIR.fetch_add(1, Ordering::Relaxed)
        ));
        Self {
            server: MockServer::start().await,
            state_dir,
        }
    }

    /// Configuration as the environment would provide it: no read retries
    /// and 10 ms polling delays.
    #[must_use]
    pub fn config(&self) -> StorefrontConfig {
        self.config_with(&[])
    }

    /// [`config`](Self::config) with some variables replaced.
    #[must_use]
    pub fn config_with(&self, overrides: &[(&'static str, &str)]) -> StorefrontConfig {
        let mut vars: HashMap<&str, String> = HashMap::from([
            ("MEDUSA_BACKEND_URL", self.server.uri()),
            ("MEDUSA_PUBLISHABLE_KEY", "pk_test".to_string()),
            ("MEDUSA_MAX_RETRIES", "0".to_string()),
            ("STOREFRONT_PREFERRED_CURRENCY", "eur".to_string()),
            ("ORDER_POLL_ATTEMPTS", "3".to_string()),
            ("ORDER_POLL_DELAY_MS", "10".to_string()),
            ("ORDER_RETRY_ATTEMPTS", "2".to_string()),
            ("ORDER_RETRY_DELAY_MS", "10".to_string()),
            ("DORSAL_STATE_DIR", self.state_dir.display().to_string()),
        ]);
        for (key, value) in overrides {
            vars.insert(*key, (*value).to_string());
        }
        StorefrontConfig::from_source(|key| vars.get(key).cloned())
            .expect("test configuration is valid")
    }

    /// A fresh storefront over this backend. Storefronts built from the same
    /// backend share the persisted cart id, like two runs of the same client.
    #[must_use]
    pub fn storefront(&self) -> Storefront {
        self.storefront_with(&[])
    }

    /// A storefront built from [`config_with`](Self::config_with).
    #[must_use]
    pub fn storefront_with(&self, overrides: &[(&'static str, &str)]) -> Storefront {
        Storefront::from_config(&self.config_with(overrides)).expect("client builds")
    }

    /// The storage the storefronts persist to.
    #[must_use]
    pub fn storage(&self) -> FileStorage {
        FileStorage::new(&self.state_dir)
    }

    #[must_use]
    pub fn stored(&self, slot: StorageSlot) -> Option<String> {
        self.storage().load(slot).expect("storage readable")
    }

    /// `(method, path)` of every request received so far, in order.
    pub async fn requests(&self) -> Vec<(String, String)> {
        self.server
            .received_requests()
            .await
            .unwrap_or_default()
            .into_iter()
            .map(|r| (r.method.to_string(), r.url.path().to_string()))
            .collect()
    }

    /// Paths of the POST requests received so far, in order.
    pub async fn posts(&self) -> Vec<String> {
        self.requests()
            .await
            .into_iter()
            .filter(|(m, _)| m == "POST")
            .map(|(_, p)| p)
            .collect()
    }

    /// Bodies of the requests received on `request_path`.
    pub async fn bodies(&self, request_path: &str) -> Vec<Value> {
        self.server
            .received_requests()
            .await
            .unwrap_or_default()
            .into_iter()
            .filter(|r| r.url.path() == request_path)
            .filter_map(|r| serde_json::from_slice(&r.body).ok())
            .collect()
    }

    // =========================================================================
    // Fixtures
    // =========================================================================

    pub async fn mount_regions(&self) {
        self.respond(
            "GET",
            "/store/regions",
            json!({ "regions": [region("reg_us", "usd"), region("reg_eu", "eur")] }),
        )
        .await;
    }

    /// Cart creation returning an empty cart `cart_id` in the EU region.
    pub async fn mount_create_cart(&self, cart_id: &str) {
        self.respond("POST", "/store/carts", json!({ "cart": cart(cart_id, &[]) }))
            .await;
    }

    /// Every cart read and mutation of `cart_id` answers with `body`.
    pub async fn mount_cart(&self, cart_id: &str, body: Value) {
        let envelope = json!({ "cart": body });
        for request_path in [
            format!("/store/carts/{cart_id}"),
            format!("/store/carts/{cart_id}/line-items"),
            format!("/store/carts/{cart_id}/shipping-methods"),
            format!("/store/carts/{cart_id}/payment-sessions"),
            format!("/store/carts/{cart_id}/payment-session"),
        ] {
            Mock::given(path(request_path))
                .respond_with(ResponseTemplate::new(200).set_body_json(&envelope))
                .mount(&self.server)
                .await;
        }
    }

    pub async fn mount_shipping_options(&self, cart_id: &str, options: Value) {
        self.respond(
            "GET",
            &format!("/store/shipping-options/{cart_id}"),
            json!({ "shipping_options": options }),
        )
        .await;
    }

    /// Completion of `cart_id` places `order_id`.
    pub async fn mount_complete_with_order(&self, cart_id: &str, order_id: &str) {
        self.respond(
            "POST",
            &format!("/store/carts/{cart_id}/complete"),
            json!({ "type": "order", "data": order(order_id, cart_id) }),
        )
        .await;
    }

    /// Completion of `cart_id` asks for a hosted payment page at `url`.
    pub async fn mount_complete_with_redirect(&self, cart_id: &str, url: &str) {
        let mut body = ready_cart(cart_id);
        body["payment_sessions"] = json!([payment_session("mollie", true, Some(url))]);
        self.respond(
            "POST",
            &format!("/store/carts/{cart_id}/complete"),
            json!({ "type": "cart", "data": body }),
        )
        .await;
    }

    /// Completion of `cart_id` fails with `status` and a Medusa error body.
    pub async fn mount_complete_error(&self, cart_id: &str, status: u16, message: &str) {
        Mock::given(method("POST"))
            .and(path(format!("/store/carts/{cart_id}/complete")))
            .respond_with(
                ResponseTemplate::new(status)
                    .set_body_json(json!({ "type": "not_allowed", "message": message })),
            )
            .mount(&self.server)
            .await;
    }

    /// Order lookup by cart answers 404 `misses` times, then finds `order_id`.
    pub async fn mount_order_lookup(&self, cart_id: &str, order_id: &str, misses: u64) {
        let lookup_path = format!("/store/orders/cart/{cart_id}");
        if misses > 0 {
            Mock::given(method("GET"))
                .and(path(lookup_path.clone()))
                .respond_with(not_found())
                .up_to_n_times(misses)
                .with_priority(1)
                .mount(&self.server)
                .await;
        }
        self.respond("GET", &lookup_path, json!({ "order": order(order_id, cart_id) }))
            .await;
    }

    /// Order lookup by cart never finds anything.
    pub async fn mount_order_missing(&self, cart_id: &str) {
        Mock::given(method("GET"))
            .and(path(format!("/store/orders/cart/{cart_id}")))
            .respond_with(not_found())
            .mount(&self.server)
            .await;
    }

    async fn respond(&self, http_method: &str, request_path: &str, body: Value) {
        Mock::given(method(http_method))
            .and(path(request_path))
            .respond_with(ResponseTemplate::new(200).set_body_json(body))
            .mount(&self.server)
            .await;
    }
}

impl Drop for TestBackend {
    fn drop(&mut self) {
        let _ = std::fs::remove_dir_all(&self.state_dir);
    }
}

fn not_found() -> ResponseTemplate {
    ResponseTemplate::new(404).set_body_json(json!({
        "type": "not_found",
        "message": "Not found"
    }))
}

// =============================================================================
// Medusa JSON builders
// =============================================================================

#[must_use]
pub fn region(id: &str, currency: &str) -> Value {
    json!({ "id": id, "name": id, "currency_code": currency, "countries": [] })
}

/// A line item of `quantity` units at 25.00.
#[must_use]
pub fn line_item(id: &str, variant_id: &str, quantity: u32) -> Value {
    json!({
        "id": id,
        "variant_id": variant_id,
        "title": "Home Jersey",
        "quantity": quantity,
        "unit_price": 2500,
        "total": 2500 * i64::from(quantity)
    })
}

/// An EU cart with the given line items and nothing else.
#[must_use]
pub fn cart(id: &str, items: &[Value]) -> Value {
    let total: i64 = items
        .iter()
        .filter_map(|item| item["total"].as_i64())
        .sum();
    json!({
        "id": id,
        "region_id": "reg_eu",
        "currency_code": "eur",
        "items": items,
        "shipping_methods": [],
        "payment_sessions": [],
        "completed_at": null,
        "subtotal": total,
        "total": total
    })
}

/// A cart with one line item and a single payment session, as it looks once
/// payment sessions have been initialized.
#[must_use]
pub fn ready_cart(id: &str) -> Value {
    let mut body = cart(id, &[line_item("item_1", "variant_1", 2)]);
    body["payment_sessions"] = json!([payment_session("pp_system_default", false, None)]);
    body
}

#[must_use]
pub fn payment_session(provider_id: &str, selected: bool, redirect_url: Option<&str>) -> Value {
    let data = redirect_url.map_or_else(|| json!({}), |url| json!({ "redirect_url": url }));
    json!({
        "id": format!("ps_{provider_id}"),
        "provider_id": provider_id,
        "status": "pending",
        "is_selected": selected,
        "data": data
    })
}

#[must_use]
pub fn shipping_option(id: &str, amount: i64) -> Value {
    json!({ "id": id, "name": id, "amount": amount, "currency_code": "eur" })
}

#[must_use]
pub fn order(id: &str, cart_id: &str) -> Value {
    json!({
        "id": id,
        "display_id": 1001,
        "cart_id": cart_id,
        "email": "ana@example.com",
        "items": [line_item("item_1", "variant_1", 2)],
        "currency_code": "eur",
        "payment_status": "captured",
        "total": 5495
    })
}
