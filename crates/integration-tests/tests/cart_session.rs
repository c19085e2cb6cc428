//! Cart persistence across storefront instances and recovery from stale ids.

#![allow(clippy::unwrap_used)]

use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, ResponseTemplate};

use dorsal_core::{CartId, LineItemId, VariantId};
use dorsal_integration_tests::{TestBackend, cart, line_item};
use dorsal_storefront::cart::compute_total;
use dorsal_storefront::events::CartEvent;
use dorsal_storefront::storage::{CartStorage, StorageSlot};
use dorsal_storefront::{ErrorKind, StorefrontError};

#[tokio::test]
async fn test_cart_id_survives_restart() {
    let backend = TestBackend::start().await;
    backend.mount_regions().await;
    backend.mount_create_cart("cart_01").await;
    backend
        .mount_cart("cart_01", cart("cart_01", &[line_item("item_1", "variant_1", 2)]))
        .await;

    let first = backend.storefront();
    let mut session = first.carts().session().unwrap();
    first
        .carts()
        .add_line_item(&mut session, &VariantId::new("variant_1"), 2)
        .await
        .unwrap();

    let second = backend.storefront();
    let mut restored = second.carts().session().unwrap();
    assert_eq!(restored.cart_id(), Some(&CartId::new("cart_01")));

    let cart = second.carts().refresh(&mut restored).await.unwrap().unwrap();
    assert_eq!(cart.item_count(), 2);
    assert_eq!(compute_total(&cart).to_string(), "50.00");
    assert_eq!(restored.cart(), Some(&cart));
}

#[tokio::test]
async fn test_new_cart_uses_preferred_currency_region() {
    let backend = TestBackend::start().await;
    backend.mount_regions().await;
    backend.mount_create_cart("cart_01").await;

    let storefront = backend.storefront();
    let mut session = storefront.carts().session().unwrap();
    storefront
        .carts()
        .get_or_create_cart(&mut session)
        .await
        .unwrap();

    assert_eq!(
        backend.bodies("/store/carts").await,
        vec![json!({ "region_id": "reg_eu" })]
    );
}

#[tokio::test]
async fn test_stale_cart_id_is_replaced() {
    let backend = TestBackend::start().await;
    backend.mount_regions().await;
    backend.mount_create_cart("cart_01").await;
    backend.mount_cart("cart_01", cart("cart_01", &[])).await;
    Mock::given(method("GET"))
        .and(path("/store/carts/cart_gone"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({
            "type": "not_found",
            "message": "Cart with id cart_gone was not found"
        })))
        .mount(&backend.server)
        .await;
    backend.storage().store(StorageSlot::Cart, "cart_gone").unwrap();

    let storefront = backend.storefront();
    let mut session = storefront.carts().session().unwrap();
    let cart = storefront
        .carts()
        .get_or_create_cart(&mut session)
        .await
        .unwrap();

    assert_eq!(cart.id, CartId::new("cart_01"));
    assert_eq!(backend.stored(StorageSlot::Cart).as_deref(), Some("cart_01"));
}

#[tokio::test]
async fn test_corrupt_storage_file_starts_a_new_cart() {
    let backend = TestBackend::start().await;
    backend.mount_regions().await;
    backend.mount_create_cart("cart_01").await;
    let file = backend.storage().path().to_path_buf();
    std::fs::create_dir_all(file.parent().unwrap()).unwrap();
    std::fs::write(&file, "{\"dorsal_cart_id\": ").unwrap();

    let storefront = backend.storefront();
    let mut session = storefront.carts().session().unwrap();
    let cart = storefront
        .carts()
        .get_or_create_cart(&mut session)
        .await
        .unwrap();

    assert_eq!(cart.id, CartId::new("cart_01"));
    assert_eq!(backend.stored(StorageSlot::Cart).as_deref(), Some("cart_01"));
}

#[tokio::test]
async fn test_completed_cart_is_forgotten_on_refresh() {
    let backend = TestBackend::start().await;
    let mut completed = cart("cart_01", &[line_item("item_1", "variant_1", 1)]);
    completed["completed_at"] = json!("2026-01-05T10:00:00Z");
    backend.mount_cart("cart_01", completed).await;
    backend.storage().store(StorageSlot::Cart, "cart_01").unwrap();

    let storefront = backend.storefront();
    let mut events = storefront.events().subscribe();
    let mut session = storefront.carts().session().unwrap();

    let refreshed = storefront.carts().refresh(&mut session).await.unwrap();

    assert!(refreshed.is_none());
    assert_eq!(backend.stored(StorageSlot::Cart), None);
    assert_eq!(events.try_recv().unwrap(), CartEvent::Cleared);
}

#[tokio::test]
async fn test_outage_keeps_cart_id() {
    let backend = TestBackend::start().await;
    Mock::given(method("GET"))
        .and(path("/store/carts/cart_01"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&backend.server)
        .await;
    backend.storage().store(StorageSlot::Cart, "cart_01").unwrap();

    let storefront = backend.storefront();
    let carts = storefront.carts();
    let mut session = carts.session().unwrap();

    let err = carts.refresh(&mut session).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Network);
    assert_eq!(carts.badge_count(&mut session).await, 0);
    assert_eq!(backend.stored(StorageSlot::Cart).as_deref(), Some("cart_01"));
}

#[tokio::test]
async fn test_zero_quantity_update_removes_line() {
    let backend = TestBackend::start().await;
    backend
        .mount_cart("cart_01", cart("cart_01", &[line_item("item_1", "variant_1", 1)]))
        .await;
    Mock::given(method("DELETE"))
        .and(path("/store/carts/cart_01/line-items/item_1"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "cart": cart("cart_01", &[]) })),
        )
        .expect(1)
        .mount(&backend.server)
        .await;
    backend.storage().store(StorageSlot::Cart, "cart_01").unwrap();

    let storefront = backend.storefront();
    let carts = storefront.carts();
    let mut session = carts.session().unwrap();
    carts
        .update_line_item_quantity(&mut session, &LineItemId::new("item_1"), 0)
        .await
        .unwrap();
}

#[tokio::test]
async fn test_invalid_quantity_is_rejected_locally() {
    let backend = TestBackend::start().await;
    let storefront = backend.storefront();
    let carts = storefront.carts();
    let mut session = carts.session().unwrap();

    let err = carts
        .add_line_item(&mut session, &VariantId::new("variant_1"), 0)
        .await
        .unwrap_err();

    assert!(matches!(err, StorefrontError::Validation(_)));
    assert!(backend.requests().await.is_empty());
}
