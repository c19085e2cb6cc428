//! In-memory fakes of the ports for unit tests.

#![allow(clippy::unwrap_used)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use url::Url;

use dorsal_core::{
    CartId, CurrencyCode, Email, FulfillmentStatus, LineItemId, Money, OrderId,
    PaymentProviderId, PaymentSessionId, PaymentSessionStatus, PaymentStatus, RegionId,
    ShippingAddress, ShippingMethodId, ShippingOptionId, VariantId,
};

use crate::backend::{CommerceBackend, Completion};
use crate::delay::Sleeper;
use crate::medusa::{
    Cart, LineItem, MedusaError, Order, OrderItem, PaymentSession, Region, ShippingMethod,
    ShippingOption, Totals,
};
use crate::payment::ReconcilePolicy;
use crate::state::{Settings, Storefront};
use crate::storage::{CartStorage, MemoryStorage, StorageSlot};

const UNIT_PRICE: i64 = 2500;

/// A backend call, as recorded by [`FakeBackend`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    ListRegions,
    CreateCart,
    RetrieveCart(CartId),
    SetCartRegion(CartId),
    AddLineItem(CartId, VariantId),
    UpdateLineItem(CartId, LineItemId),
    RemoveLineItem(LineItemId),
    SetShippingAddress(CartId),
    ListShippingOptions(CartId),
    AddShippingMethod(ShippingOptionId),
    InitPaymentSessions(CartId),
    SelectPaymentSession(PaymentProviderId),
    CompleteCart(CartId),
    RetrieveOrder(OrderId),
    OrderForCart(CartId),
    InvalidateCatalog,
}

fn eur() -> CurrencyCode {
    CurrencyCode::parse("eur").unwrap()
}

fn currency(code: &str) -> CurrencyCode {
    CurrencyCode::parse(code).unwrap()
}

// =============================================================================
// FakeBackend
// =============================================================================

struct State {
    regions: Vec<Region>,
    carts: HashMap<CartId, Cart>,
    orders: HashMap<CartId, Order>,
    hidden_lookups: HashMap<CartId, u32>,
    shipping_options: Vec<(String, i64)>,
    providers: Vec<String>,
    failures: HashMap<&'static str, MedusaError>,
    redirect: Option<Url>,
    calls: Vec<Call>,
    next_id: u32,
    orders_placed: usize,
}

/// Commerce backend held in memory. Clones share state.
#[derive(Clone)]
pub struct FakeBackend {
    state: Arc<Mutex<State>>,
}

impl FakeBackend {
    pub fn new() -> Self {
        let regions = vec![
            region("reg_us", "usd"),
            region("reg_eu", "eur"),
        ];
        Self {
            state: Arc::new(Mutex::new(State {
                regions,
                carts: HashMap::new(),
                orders: HashMap::new(),
                hidden_lookups: HashMap::new(),
                shipping_options: vec![("so_standard".to_string(), 495)],
                providers: vec!["pp_system_default".to_string()],
                failures: HashMap::new(),
                redirect: None,
                calls: Vec::new(),
                next_id: 0,
                orders_placed: 0,
            })),
        }
    }

    // -------------------------------------------------------------------------
    // Scenario setup
    // -------------------------------------------------------------------------

    pub fn set_regions(&self, regions: &[(&str, &str)]) {
        self.state.lock().unwrap().regions =
            regions.iter().map(|(id, code)| region(id, code)).collect();
    }

    pub fn set_shipping_options(&self, options: &[(&str, i64)]) {
        self.state.lock().unwrap().shipping_options = options
            .iter()
            .map(|(id, amount)| ((*id).to_string(), *amount))
            .collect();
    }

    pub fn set_providers(&self, providers: &[&str]) {
        self.state.lock().unwrap().providers =
            providers.iter().map(|p| (*p).to_string()).collect();
    }

    /// Fail the next call of `operation` (the trait method name) with `error`.
    pub fn fail_next(&self, operation: &'static str, error: MedusaError) {
        self.state.lock().unwrap().failures.insert(operation, error);
    }

    /// Answer the next completion with a redirect instead of an order.
    pub fn complete_with_redirect(&self, url: Url) {
        self.state.lock().unwrap().redirect = Some(url);
    }

    pub fn seed_empty_cart(&self) -> CartId {
        let mut state = self.state.lock().unwrap();
        let id = CartId::new(state.next("cart"));
        let cart = blank_cart(&id, Some(RegionId::new("reg_eu")), eur());
        state.carts.insert(id.clone(), cart);
        id
    }

    pub fn seed_cart_with_item(&self) -> CartId {
        let id = self.seed_empty_cart();
        let mut state = self.state.lock().unwrap();
        let line_id = LineItemId::new(state.next("item"));
        let cart = state.carts.get_mut(&id).unwrap();
        cart.items.push(line_item(line_id, VariantId::new("variant_1"), 1, &cart.currency_code));
        recompute(cart);
        id
    }

    pub fn seed_cart_without_region(&self) -> CartId {
        let id = self.seed_cart_with_item();
        let mut state = self.state.lock().unwrap();
        state.carts.get_mut(&id).unwrap().region_id = None;
        id
    }

    pub fn mark_completed(&self, cart_id: &CartId) {
        let mut state = self.state.lock().unwrap();
        state.carts.get_mut(cart_id).unwrap().completed_at = Some(Utc::now());
    }

    /// Place an order for the cart now (as a webhook would) but keep it
    /// invisible to the next `lookups` order-by-cart calls.
    pub fn place_order_after_lookups(&self, cart_id: &CartId, lookups: u32) {
        let mut state = self.state.lock().unwrap();
        state.place_order(cart_id);
        state.hidden_lookups.insert(cart_id.clone(), lookups);
    }

    pub fn drop_payment_sessions(&self, cart_id: &CartId) {
        let mut state = self.state.lock().unwrap();
        state.carts.get_mut(cart_id).unwrap().payment_sessions.clear();
    }

    // -------------------------------------------------------------------------
    // Inspection
    // -------------------------------------------------------------------------

    pub fn calls(&self) -> Vec<Call> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn count(&self, predicate: impl Fn(&Call) -> bool) -> usize {
        self.state
            .lock()
            .unwrap()
            .calls
            .iter()
            .filter(|&call| predicate(call))
            .count()
    }

    pub fn orders_placed(&self) -> usize {
        self.state.lock().unwrap().orders_placed
    }

    /// Record `call` and apply any queued failure for `operation`.
    fn enter(&self, operation: &'static str, call: Call) -> Result<(), MedusaError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(call);
        state.failures.remove(operation).map_or(Ok(()), Err)
    }

    fn with_cart<T>(
        &self,
        cart_id: &CartId,
        f: impl FnOnce(&mut State, &mut Cart) -> Result<T, MedusaError>,
    ) -> Result<T, MedusaError> {
        let mut state = self.state.lock().unwrap();
        let mut cart = state
            .carts
            .remove(cart_id)
            .ok_or_else(|| MedusaError::NotFound(format!("Cart {cart_id}")))?;
        let result = f(&mut state, &mut cart);
        recompute(&mut cart);
        state.carts.insert(cart_id.clone(), cart);
        result
    }
}

impl State {
    fn next(&mut self, prefix: &str) -> String {
        self.next_id += 1;
        format!("{prefix}_{:02}", self.next_id)
    }

    fn place_order(&mut self, cart_id: &CartId) -> Order {
        let order_id = OrderId::new(self.next("order"));
        let cart = self.carts.get_mut(cart_id).unwrap();
        cart.completed_at = Some(Utc::now());
        let order = order_from(order_id, cart);
        self.orders.insert(cart_id.clone(), order.clone());
        self.orders_placed += 1;
        order
    }
}

#[async_trait]
impl CommerceBackend for FakeBackend {
    async fn list_regions(&self) -> Result<Vec<Region>, MedusaError> {
        self.enter("list_regions", Call::ListRegions)?;
        Ok(self.state.lock().unwrap().regions.clone())
    }

    async fn create_cart(&self, region_id: Option<&RegionId>) -> Result<Cart, MedusaError> {
        self.enter("create_cart", Call::CreateCart)?;
        let mut state = self.state.lock().unwrap();
        let currency_code = region_id
            .and_then(|id| state.regions.iter().find(|r| &r.id == id))
            .map_or_else(eur, |r| r.currency_code.clone());
        let id = CartId::new(state.next("cart"));
        let cart = blank_cart(&id, region_id.cloned(), currency_code);
        state.carts.insert(id, cart.clone());
        Ok(cart)
    }

    async fn retrieve_cart(&self, cart_id: &CartId) -> Result<Cart, MedusaError> {
        self.enter("retrieve_cart", Call::RetrieveCart(cart_id.clone()))?;
        self.with_cart(cart_id, |_, cart| Ok(cart.clone()))
    }

    async fn set_cart_region(
        &self,
        cart_id: &CartId,
        region_id: &RegionId,
    ) -> Result<Cart, MedusaError> {
        self.enter("set_cart_region", Call::SetCartRegion(cart_id.clone()))?;
        self.with_cart(cart_id, |state, cart| {
            let region = state
                .regions
                .iter()
                .find(|r| &r.id == region_id)
                .ok_or_else(|| MedusaError::NotFound(format!("Region {region_id}")))?;
            cart.region_id = Some(region.id.clone());
            cart.currency_code = region.currency_code.clone();
            Ok(cart.clone())
        })
    }

    async fn add_line_item(
        &self,
        cart_id: &CartId,
        variant_id: &VariantId,
        quantity: u32,
    ) -> Result<Cart, MedusaError> {
        self.enter(
            "add_line_item",
            Call::AddLineItem(cart_id.clone(), variant_id.clone()),
        )?;
        self.with_cart(cart_id, |state, cart| {
            let line_id = LineItemId::new(state.next("item"));
            cart.items.push(line_item(
                line_id,
                variant_id.clone(),
                quantity,
                &cart.currency_code,
            ));
            Ok(cart.clone())
        })
    }

    async fn update_line_item(
        &self,
        cart_id: &CartId,
        line_item_id: &LineItemId,
        quantity: u32,
    ) -> Result<Cart, MedusaError> {
        self.enter(
            "update_line_item",
            Call::UpdateLineItem(cart_id.clone(), line_item_id.clone()),
        )?;
        self.with_cart(cart_id, |_, cart| {
            let item = cart
                .items
                .iter_mut()
                .find(|item| &item.id == line_item_id)
                .ok_or_else(|| MedusaError::NotFound(format!("Line item {line_item_id}")))?;
            item.quantity = quantity;
            Ok(cart.clone())
        })
    }

    async fn remove_line_item(
        &self,
        cart_id: &CartId,
        line_item_id: &LineItemId,
    ) -> Result<Cart, MedusaError> {
        self.enter("remove_line_item", Call::RemoveLineItem(line_item_id.clone()))?;
        self.with_cart(cart_id, |_, cart| {
            let before = cart.items.len();
            cart.items.retain(|item| &item.id != line_item_id);
            if cart.items.len() == before {
                return Err(MedusaError::NotFound(format!("Line item {line_item_id}")));
            }
            Ok(cart.clone())
        })
    }

    async fn set_shipping_address(
        &self,
        cart_id: &CartId,
        address: &ShippingAddress,
        email: &str,
    ) -> Result<Cart, MedusaError> {
        self.enter(
            "set_shipping_address",
            Call::SetShippingAddress(cart_id.clone()),
        )?;
        self.with_cart(cart_id, |_, cart| {
            cart.shipping_address = Some(address.clone());
            cart.email = Email::parse(email).ok();
            Ok(cart.clone())
        })
    }

    async fn list_shipping_options(
        &self,
        cart_id: &CartId,
    ) -> Result<Vec<ShippingOption>, MedusaError> {
        self.enter(
            "list_shipping_options",
            Call::ListShippingOptions(cart_id.clone()),
        )?;
        self.with_cart(cart_id, |state, cart| {
            Ok(state
                .shipping_options
                .iter()
                .map(|(id, amount)| ShippingOption {
                    id: ShippingOptionId::new(id.clone()),
                    name: id.trim_start_matches("so_").to_string(),
                    amount: Money::new(*amount, cart.currency_code.clone()),
                })
                .collect())
        })
    }

    async fn add_shipping_method(
        &self,
        cart_id: &CartId,
        option_id: &ShippingOptionId,
    ) -> Result<Cart, MedusaError> {
        self.enter("add_shipping_method", Call::AddShippingMethod(option_id.clone()))?;
        self.with_cart(cart_id, |state, cart| {
            let amount = state
                .shipping_options
                .iter()
                .find(|(id, _)| id == option_id.as_str())
                .map(|(_, amount)| *amount)
                .ok_or_else(|| MedusaError::Api {
                    status: 400,
                    message: format!("Shipping option {option_id} is not available"),
                    code: None,
                })?;
            cart.shipping_methods = vec![ShippingMethod {
                id: ShippingMethodId::new(format!("sm_{option_id}")),
                shipping_option_id: Some(option_id.clone()),
                name: option_id.to_string(),
                amount: Money::new(amount, cart.currency_code.clone()),
            }];
            Ok(cart.clone())
        })
    }

    async fn init_payment_sessions(&self, cart_id: &CartId) -> Result<Cart, MedusaError> {
        self.enter(
            "init_payment_sessions",
            Call::InitPaymentSessions(cart_id.clone()),
        )?;
        self.with_cart(cart_id, |state, cart| {
            cart.payment_sessions = state
                .providers
                .iter()
                .map(|provider| PaymentSession {
                    id: PaymentSessionId::new(format!("ps_{provider}")),
                    provider_id: PaymentProviderId::new(provider.clone()),
                    status: PaymentSessionStatus::Pending,
                    is_selected: false,
                    data: serde_json::Value::Null,
                })
                .collect();
            Ok(cart.clone())
        })
    }

    async fn select_payment_session(
        &self,
        cart_id: &CartId,
        provider_id: &PaymentProviderId,
    ) -> Result<Cart, MedusaError> {
        self.enter(
            "select_payment_session",
            Call::SelectPaymentSession(provider_id.clone()),
        )?;
        self.with_cart(cart_id, |_, cart| {
            if cart.payment_session(provider_id).is_none() {
                return Err(MedusaError::Api {
                    status: 400,
                    message: format!("No payment session for {provider_id}"),
                    code: None,
                });
            }
            for session in &mut cart.payment_sessions {
                session.is_selected = &session.provider_id == provider_id;
            }
            Ok(cart.clone())
        })
    }

    async fn complete_cart(&self, cart_id: &CartId) -> Result<Completion, MedusaError> {
        self.enter("complete_cart", Call::CompleteCart(cart_id.clone()))?;
        let mut state = self.state.lock().unwrap();
        let cart = state
            .carts
            .get(cart_id)
            .ok_or_else(|| MedusaError::NotFound(format!("Cart {cart_id}")))?;
        if cart.is_completed() {
            return Err(MedusaError::Api {
                status: 409,
                message: "Cart has already been completed".to_string(),
                code: None,
            });
        }
        if let Some(url) = state.redirect.take() {
            return Ok(Completion::Redirect { url });
        }
        Ok(Completion::Order(Box::new(state.place_order(cart_id))))
    }

    async fn retrieve_order(&self, order_id: &OrderId) -> Result<Order, MedusaError> {
        self.enter("retrieve_order", Call::RetrieveOrder(order_id.clone()))?;
        self.state
            .lock()
            .unwrap()
            .orders
            .values()
            .find(|order| &order.id == order_id)
            .cloned()
            .ok_or_else(|| MedusaError::NotFound(format!("Order {order_id}")))
    }

    async fn order_for_cart(&self, cart_id: &CartId) -> Result<Option<Order>, MedusaError> {
        self.enter("order_for_cart", Call::OrderForCart(cart_id.clone()))?;
        let mut state = self.state.lock().unwrap();
        if let Some(remaining) = state.hidden_lookups.get_mut(cart_id)
            && *remaining > 0
        {
            *remaining -= 1;
            return Ok(None);
        }
        Ok(state.orders.get(cart_id).cloned())
    }

    fn invalidate_catalog(&self) {
        self.state.lock().unwrap().calls.push(Call::InvalidateCatalog);
    }
}

fn region(id: &str, code: &str) -> Region {
    Region {
        id: RegionId::new(id),
        name: id.trim_start_matches("reg_").to_uppercase(),
        currency_code: currency(code),
        countries: Vec::new(),
    }
}

fn blank_cart(id: &CartId, region_id: Option<RegionId>, currency_code: CurrencyCode) -> Cart {
    let zero = Money::zero(currency_code.clone());
    Cart {
        id: id.clone(),
        region_id,
        currency_code,
        email: None,
        items: Vec::new(),
        shipping_address: None,
        shipping_methods: Vec::new(),
        payment_sessions: Vec::new(),
        totals: Totals {
            subtotal: zero.clone(),
            shipping_total: zero.clone(),
            tax_total: zero.clone(),
            discount_total: zero.clone(),
            total: zero,
        },
        completed_at: None,
    }
}

fn line_item(
    id: LineItemId,
    variant_id: VariantId,
    quantity: u32,
    currency_code: &CurrencyCode,
) -> LineItem {
    LineItem {
        id,
        variant_id: Some(variant_id),
        title: "Home Jersey".to_string(),
        quantity,
        unit_price: Money::new(UNIT_PRICE, currency_code.clone()),
        total: Money::new(UNIT_PRICE * i64::from(quantity), currency_code.clone()),
        thumbnail: None,
    }
}

fn recompute(cart: &mut Cart) {
    let currency_code = cart.currency_code.clone();
    for item in &mut cart.items {
        item.unit_price.currency_code = currency_code.clone();
        item.total = Money::new(
            item.unit_price.amount * i64::from(item.quantity),
            currency_code.clone(),
        );
    }
    let subtotal: i64 = cart.items.iter().map(|item| item.total.amount).sum();
    let shipping: i64 = cart.shipping_methods.iter().map(|m| m.amount.amount).sum();
    cart.totals = Totals {
        subtotal: Money::new(subtotal, currency_code.clone()),
        shipping_total: Money::new(shipping, currency_code.clone()),
        tax_total: Money::zero(currency_code.clone()),
        discount_total: Money::zero(currency_code.clone()),
        total: Money::new(subtotal + shipping, currency_code),
    };
}

fn order_from(id: OrderId, cart: &Cart) -> Order {
    Order {
        id,
        display_id: Some(1001),
        cart_id: Some(cart.id.clone()),
        email: cart.email.as_ref().map(|e| e.as_str().to_string()),
        items: cart
            .items
            .iter()
            .map(|item| OrderItem {
                id: item.id.clone(),
                title: item.title.clone(),
                quantity: item.quantity,
                unit_price: item.unit_price.clone(),
                variant_id: item.variant_id.clone(),
                product_handle: None,
            })
            .collect(),
        shipping_address: cart.shipping_address.clone(),
        shipping_methods: cart.shipping_methods.clone(),
        payment_status: PaymentStatus::Awaiting,
        fulfillment_status: FulfillmentStatus::NotFulfilled,
        currency_code: cart.currency_code.clone(),
        totals: cart.totals.clone(),
        created_at: Some(Utc::now()),
    }
}

// =============================================================================
// RecordingSleeper
// =============================================================================

/// Records requested delays without waiting.
#[derive(Clone, Default)]
pub struct RecordingSleeper {
    sleeps: Arc<Mutex<Vec<Duration>>>,
}

impl RecordingSleeper {
    pub fn sleeps(&self) -> Vec<Duration> {
        self.sleeps.lock().unwrap().clone()
    }

    pub fn total(&self) -> Duration {
        self.sleeps.lock().unwrap().iter().sum()
    }
}

#[async_trait]
impl Sleeper for RecordingSleeper {
    async fn sleep(&self, duration: Duration) {
        self.sleeps.lock().unwrap().push(duration);
    }
}

// =============================================================================
// TestShop
// =============================================================================

/// A storefront wired to fakes, with handles on each of them.
pub struct TestShop {
    pub storefront: Storefront,
    pub backend: FakeBackend,
    pub sleeper: RecordingSleeper,
    pub storage: Arc<MemoryStorage>,
}

impl TestShop {
    pub fn new() -> Self {
        Self::with_policy(ReconcilePolicy::default())
    }

    pub fn with_policy(reconcile: ReconcilePolicy) -> Self {
        let backend = FakeBackend::new();
        let sleeper = RecordingSleeper::default();
        let storage = Arc::new(MemoryStorage::new());
        let storefront = Storefront::builder(Arc::new(backend.clone()), storage.clone())
            .sleeper(Arc::new(sleeper.clone()))
            .settings(Settings {
                preferred_currency: eur(),
                reconcile,
                ..Settings::default()
            })
            .build();
        Self {
            storefront,
            backend,
            sleeper,
            storage,
        }
    }

    pub fn store_cart(&self, cart_id: &CartId) {
        self.storage.store(StorageSlot::Cart, cart_id.as_str()).unwrap();
    }

    pub fn stash_pending(&self, cart_id: &CartId) {
        self.storage
            .store(StorageSlot::PendingPayment, cart_id.as_str())
            .unwrap();
    }

    pub fn stored(&self, slot: StorageSlot) -> Option<String> {
        self.storage.load(slot).unwrap()
    }
}
