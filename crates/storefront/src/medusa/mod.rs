//! Medusa Store API client.
//!
//! # Architecture
//!
//! - Plain JSON over `reqwest` 0.13 against `{backend_url}/store/...`
//! - Medusa is source of truth - NO local sync, direct API calls
//! - Catalog reads (regions, products, collections) cached via `moka`
//!   (5 minute TTL by default); cart, shipping, payment and order calls are
//!   never cached
//! - Idempotent reads retry transient failures with exponential backoff;
//!   mutations are sent exactly once. Order-by-cart lookups are single-shot
//!   as well, since their caller polls on its own schedule
//!
//! # Example
//!
//! ```rust,ignore
//! use dorsal_storefront::backend::CommerceBackend;
//! use dorsal_storefront::medusa::MedusaClient;
//!
//! let client = MedusaClient::new(&config.medusa)?;
//!
//! let product = client.get_product_by_handle("home-jersey").await?;
//! let cart = client.create_cart(None).await?;
//! let cart = client
//!     .add_line_item(&cart.id, &product.variants[0].id, 1)
//!     .await?;
//! ```

mod cache;
mod conversions;
mod error;
mod retry;
pub mod types;
mod wire;

pub use error::MedusaError;
pub use types::*;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use moka::future::Cache;
use reqwest::header::{HeaderMap, HeaderValue};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, instrument};
use url::Url;
use urlencoding::encode;

use dorsal_core::{
    CartId, CurrencyCode, LineItemId, OrderId, PaymentProviderId, RegionId, ShippingAddress,
    ShippingOptionId, VariantId,
};

use crate::backend::{CommerceBackend, Completion};
use crate::config::MedusaConfig;
use crate::delay::{Sleeper, TokioSleeper};

use cache::{CacheValue, REGIONS_KEY, collections_key, product_key, products_key};
use conversions::{
    convert_cart, convert_collection, convert_completion, convert_order, convert_product,
    convert_product_page, convert_region, convert_shipping_option,
};
use retry::retry_with_backoff;

const PUBLISHABLE_KEY_HEADER: &str = "x-publishable-api-key";
const HEALTH_TIMEOUT: Duration = Duration::from_secs(3);

// =============================================================================
// MedusaClient
// =============================================================================

/// Client for the Medusa Store API.
///
/// Cheap to clone; clones share the HTTP connection pool and the catalog cache.
#[derive(Clone)]
pub struct MedusaClient {
    inner: Arc<MedusaClientInner>,
}

struct MedusaClientInner {
    client: reqwest::Client,
    /// Server root with a trailing slash, e.g. `http://localhost:9000/`.
    base_url: Url,
    max_retries: u32,
    retry_base_delay: Duration,
    sleeper: Arc<dyn Sleeper>,
    cache: Cache<String, CacheValue>,
}

impl MedusaClient {
    /// Create a new Store API client.
    ///
    /// # Errors
    ///
    /// Returns an error if the publishable key is not a valid header value or
    /// the HTTP client cannot be built.
    pub fn new(config: &MedusaConfig) -> Result<Self, MedusaError> {
        Self::with_sleeper(config, Arc::new(TokioSleeper))
    }

    /// Create a client whose retry backoff waits on `sleeper`.
    ///
    /// # Errors
    ///
    /// Same as [`new`](Self::new).
    pub fn with_sleeper(
        config: &MedusaConfig,
        sleeper: Arc<dyn Sleeper>,
    ) -> Result<Self, MedusaError> {
        let mut headers = HeaderMap::new();
        if let Some(key) = &config.publishable_key {
            let value = HeaderValue::from_str(key)
                .map_err(|e| MedusaError::InvalidHeader(e.to_string()))?;
            headers.insert(PUBLISHABLE_KEY_HEADER, value);
        }

        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .default_headers(headers)
            .build()?;

        let cache = Cache::builder()
            .max_capacity(1000)
            .time_to_live(config.cache_ttl)
            .build();

        let mut base_url = config.backend_url.clone();
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        Ok(Self {
            inner: Arc::new(MedusaClientInner {
                client,
                base_url,
                max_retries: config.max_retries,
                retry_base_delay: config.retry_base_delay,
                sleeper,
                cache,
            }),
        })
    }

    /// Build a URL relative to the server root.
    fn url(&self, path: &str) -> Result<Url, MedusaError> {
        Ok(self.inner.base_url.join(path)?)
    }

    fn cart_url(&self, cart_id: &CartId, suffix: &str) -> Result<Url, MedusaError> {
        self.url(&format!("store/carts/{}{suffix}", encode(cart_id.as_str())))
    }

    /// Send a request and decode a JSON response body.
    async fn send<T: DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
    ) -> Result<T, MedusaError> {
        let response = request.send().await?;
        let status = response.status();

        // Check for rate limiting
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get("Retry-After")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse::<u64>().ok())
                .unwrap_or(1);
            return Err(MedusaError::RateLimited(retry_after));
        }

        // Get response body as text first for better error diagnostics
        let body = response.text().await?;

        if !status.is_success() {
            tracing::debug!(
                status = %status,
                body = %body.chars().take(500).collect::<String>(),
                "Medusa API returned non-success status"
            );
            return Err(error_from_status(status, &body));
        }

        serde_json::from_str(&body).map_err(|e| {
            tracing::error!(
                error = %e,
                body = %body.chars().take(500).collect::<String>(),
                "Failed to parse Medusa response"
            );
            MedusaError::Parse(e)
        })
    }

    /// GET with retries on transient failures.
    async fn get<T: DeserializeOwned>(&self, url: Url) -> Result<T, MedusaError> {
        retry_with_backoff(
            self.inner.max_retries,
            self.inner.retry_base_delay,
            self.inner.sleeper.as_ref(),
            || self.send(self.inner.client.get(url.clone())),
        )
        .await
    }

    /// POST a JSON body. Never retried.
    async fn post<T: DeserializeOwned, B: Serialize + Sync>(
        &self,
        url: Url,
        body: &B,
    ) -> Result<T, MedusaError> {
        self.send(self.inner.client.post(url).json(body)).await
    }

    /// DELETE. Never retried.
    async fn delete<T: DeserializeOwned>(&self, url: Url) -> Result<T, MedusaError> {
        self.send(self.inner.client.delete(url)).await
    }

    // =========================================================================
    // Health
    // =========================================================================

    /// Whether the backend answers its health endpoint within 3 seconds.
    #[instrument(skip(self))]
    pub async fn health(&self) -> bool {
        let Ok(url) = self.url("health") else {
            return false;
        };
        match self
            .inner
            .client
            .get(url)
            .timeout(HEALTH_TIMEOUT)
            .send()
            .await
        {
            Ok(response) => response.status().is_success(),
            Err(e) => {
                debug!(error = %e, "Health check failed");
                false
            }
        }
    }

    // =========================================================================
    // Catalog Methods
    // =========================================================================

    /// List products, optionally restricted to one collection.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self))]
    pub async fn get_products(
        &self,
        limit: u64,
        offset: u64,
        collection_id: Option<&str>,
    ) -> Result<ProductPage, MedusaError> {
        let cache_key = products_key(limit, offset, collection_id);

        if let Some(CacheValue::Products(page)) = self.inner.cache.get(&cache_key).await {
            debug!("Cache hit for products");
            return Ok(page);
        }

        let mut url = self.url("store/products")?;
        {
            let mut query = url.query_pairs_mut();
            query
                .append_pair("limit", &limit.to_string())
                .append_pair("offset", &offset.to_string());
            if let Some(collection_id) = collection_id {
                query.append_pair("collection_id[]", collection_id);
            }
        }

        let response: wire::ProductsResponse = self.get(url).await?;
        let page = convert_product_page(response, limit, offset);

        self.inner
            .cache
            .insert(cache_key, CacheValue::Products(page.clone()))
            .await;

        Ok(page)
    }

    /// Get a product by its handle.
    ///
    /// # Errors
    ///
    /// Returns an error if the product is not found or the API request fails.
    #[instrument(skip(self), fields(handle = %handle))]
    pub async fn get_product_by_handle(&self, handle: &str) -> Result<Product, MedusaError> {
        let cache_key = product_key(handle);

        if let Some(CacheValue::Product(product)) = self.inner.cache.get(&cache_key).await {
            debug!("Cache hit for product");
            return Ok(*product);
        }

        let mut url = self.url("store/products")?;
        url.query_pairs_mut().append_pair("handle", handle);

        let response: wire::ProductsResponse = self.get(url).await?;
        let product = response
            .products
            .into_iter()
            .map(convert_product)
            .find(|p| p.handle == handle)
            .ok_or_else(|| MedusaError::NotFound(format!("Product not found: {handle}")))?;

        self.inner
            .cache
            .insert(cache_key, CacheValue::Product(Box::new(product.clone())))
            .await;

        Ok(product)
    }

    /// List product collections.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self))]
    pub async fn get_collections(
        &self,
        limit: u64,
        offset: u64,
    ) -> Result<Vec<Collection>, MedusaError> {
        let cache_key = collections_key(limit, offset);

        if let Some(CacheValue::Collections(collections)) = self.inner.cache.get(&cache_key).await
        {
            debug!("Cache hit for collections");
            return Ok(collections);
        }

        let mut url = self.url("store/collections")?;
        url.query_pairs_mut()
            .append_pair("limit", &limit.to_string())
            .append_pair("offset", &offset.to_string());

        let response: wire::CollectionsResponse = self.get(url).await?;
        let collections: Vec<Collection> = response
            .collections
            .into_iter()
            .map(convert_collection)
            .collect();

        self.inner
            .cache
            .insert(cache_key, CacheValue::Collections(collections.clone()))
            .await;

        Ok(collections)
    }
}

/// Map a non-2xx response onto an error variant.
fn error_from_status(status: reqwest::StatusCode, body: &str) -> MedusaError {
    let parsed: wire::ErrorBody = serde_json::from_str(body).unwrap_or_default();
    let message = parsed
        .message
        .filter(|m| !m.is_empty())
        .unwrap_or_else(|| {
            status
                .canonical_reason()
                .unwrap_or("Unknown error")
                .to_string()
        });

    match status.as_u16() {
        404 => MedusaError::NotFound(message),
        code @ (502..=504) => MedusaError::Unavailable(code),
        code => MedusaError::Api {
            status: code,
            message,
            code: parsed.code.or(parsed.kind),
        },
    }
}

// =============================================================================
// CommerceBackend
// =============================================================================

#[async_trait]
impl CommerceBackend for MedusaClient {
    #[instrument(skip(self))]
    async fn list_regions(&self) -> Result<Vec<Region>, MedusaError> {
        if let Some(CacheValue::Regions(regions)) = self.inner.cache.get(REGIONS_KEY).await {
            debug!("Cache hit for regions");
            return Ok(regions);
        }

        let response: wire::RegionsResponse = self.get(self.url("store/regions")?).await?;
        let regions: Vec<Region> = response.regions.into_iter().map(convert_region).collect();

        self.inner
            .cache
            .insert(REGIONS_KEY.to_string(), CacheValue::Regions(regions.clone()))
            .await;

        Ok(regions)
    }

    #[instrument(skip(self))]
    async fn create_cart(&self, region_id: Option<&RegionId>) -> Result<Cart, MedusaError> {
        let body = wire::CreateCart {
            region_id: region_id.map(RegionId::as_str),
        };
        let response: wire::CartResponse = self.post(self.url("store/carts")?, &body).await?;
        Ok(convert_cart(response.cart))
    }

    #[instrument(skip(self), fields(cart_id = %cart_id))]
    async fn retrieve_cart(&self, cart_id: &CartId) -> Result<Cart, MedusaError> {
        let response: wire::CartResponse = self.get(self.cart_url(cart_id, "")?).await?;
        Ok(convert_cart(response.cart))
    }

    #[instrument(skip(self), fields(cart_id = %cart_id, region_id = %region_id))]
    async fn set_cart_region(
        &self,
        cart_id: &CartId,
        region_id: &RegionId,
    ) -> Result<Cart, MedusaError> {
        let body = wire::UpdateCartRegion {
            region_id: region_id.as_str(),
        };
        let response: wire::CartResponse = self.post(self.cart_url(cart_id, "")?, &body).await?;
        Ok(convert_cart(response.cart))
    }

    #[instrument(skip(self), fields(cart_id = %cart_id, variant_id = %variant_id))]
    async fn add_line_item(
        &self,
        cart_id: &CartId,
        variant_id: &VariantId,
        quantity: u32,
    ) -> Result<Cart, MedusaError> {
        let body = wire::AddLineItem {
            variant_id: variant_id.as_str(),
            quantity,
        };
        let response: wire::CartResponse = self
            .post(self.cart_url(cart_id, "/line-items")?, &body)
            .await?;
        Ok(convert_cart(response.cart))
    }

    #[instrument(skip(self), fields(cart_id = %cart_id, line_item_id = %line_item_id))]
    async fn update_line_item(
        &self,
        cart_id: &CartId,
        line_item_id: &LineItemId,
        quantity: u32,
    ) -> Result<Cart, MedusaError> {
        let url = self.cart_url(
            cart_id,
            &format!("/line-items/{}", encode(line_item_id.as_str())),
        )?;
        let response: wire::CartResponse =
            self.post(url, &wire::UpdateLineItem { quantity }).await?;
        Ok(convert_cart(response.cart))
    }

    #[instrument(skip(self), fields(cart_id = %cart_id, line_item_id = %line_item_id))]
    async fn remove_line_item(
        &self,
        cart_id: &CartId,
        line_item_id: &LineItemId,
    ) -> Result<Cart, MedusaError> {
        let url = self.cart_url(
            cart_id,
            &format!("/line-items/{}", encode(line_item_id.as_str())),
        )?;
        let response: wire::CartResponse = self.delete(url).await?;
        Ok(convert_cart(response.cart))
    }

    #[instrument(skip(self, address, email), fields(cart_id = %cart_id))]
    async fn set_shipping_address(
        &self,
        cart_id: &CartId,
        address: &ShippingAddress,
        email: &str,
    ) -> Result<Cart, MedusaError> {
        let body = wire::UpdateCartAddress {
            shipping_address: address,
            email,
        };
        let response: wire::CartResponse = self.post(self.cart_url(cart_id, "")?, &body).await?;
        Ok(convert_cart(response.cart))
    }

    #[instrument(skip(self), fields(cart_id = %cart_id))]
    async fn list_shipping_options(
        &self,
        cart_id: &CartId,
    ) -> Result<Vec<ShippingOption>, MedusaError> {
        let url = self.url(&format!(
            "store/shipping-options/{}",
            encode(cart_id.as_str())
        ))?;
        let response: wire::ShippingOptionsResponse = self.get(url).await?;
        let fallback = CurrencyCode::default();
        Ok(response
            .shipping_options
            .into_iter()
            .map(|option| convert_shipping_option(option, &fallback))
            .collect())
    }

    #[instrument(skip(self), fields(cart_id = %cart_id, option_id = %option_id))]
    async fn add_shipping_method(
        &self,
        cart_id: &CartId,
        option_id: &ShippingOptionId,
    ) -> Result<Cart, MedusaError> {
        let body = wire::AddShippingMethod {
            option_id: option_id.as_str(),
        };
        let response: wire::CartResponse = self
            .post(self.cart_url(cart_id, "/shipping-methods")?, &body)
            .await?;
        Ok(convert_cart(response.cart))
    }

    #[instrument(skip(self), fields(cart_id = %cart_id))]
    async fn init_payment_sessions(&self, cart_id: &CartId) -> Result<Cart, MedusaError> {
        let response: wire::CartResponse = self
            .post(
                self.cart_url(cart_id, "/payment-sessions")?,
                &serde_json::json!({}),
            )
            .await?;
        Ok(convert_cart(response.cart))
    }

    #[instrument(skip(self), fields(cart_id = %cart_id, provider_id = %provider_id))]
    async fn select_payment_session(
        &self,
        cart_id: &CartId,
        provider_id: &PaymentProviderId,
    ) -> Result<Cart, MedusaError> {
        let body = wire::SelectPaymentSession {
            provider_id: provider_id.as_str(),
        };
        let response: wire::CartResponse = self
            .post(self.cart_url(cart_id, "/payment-session")?, &body)
            .await?;
        Ok(convert_cart(response.cart))
    }

    #[instrument(skip(self), fields(cart_id = %cart_id))]
    async fn complete_cart(&self, cart_id: &CartId) -> Result<Completion, MedusaError> {
        let response: wire::CompleteResponse = self
            .post(self.cart_url(cart_id, "/complete")?, &serde_json::json!({}))
            .await?;
        convert_completion(response)
    }

    #[instrument(skip(self), fields(order_id = %order_id))]
    async fn retrieve_order(&self, order_id: &OrderId) -> Result<Order, MedusaError> {
        let url = self.url(&format!("store/orders/{}", encode(order_id.as_str())))?;
        let response: wire::OrderResponse = self.get(url).await?;
        Ok(convert_order(response.order))
    }

    #[instrument(skip(self), fields(cart_id = %cart_id))]
    async fn order_for_cart(&self, cart_id: &CartId) -> Result<Option<Order>, MedusaError> {
        let url = self.url(&format!(
            "store/orders/cart/{}",
            encode(cart_id.as_str())
        ))?;
        // Single attempt: the reconciler owns the polling schedule.
        match self
            .send::<wire::OrderResponse>(self.inner.client.get(url))
            .await
        {
            Ok(response) => Ok(Some(convert_order(response.order))),
            Err(MedusaError::NotFound(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }

    fn invalidate_catalog(&self) {
        debug!("Invalidating catalog cache");
        self.inner.cache.invalidate_all();
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn client(base: &str) -> MedusaClient {
        MedusaClient::new(&MedusaConfig::new(Url::parse(base).unwrap())).unwrap()
    }

    #[test]
    fn test_urls_keep_base_path_and_encode_ids() {
        let client = client("https://shop.example.com/api");
        let url = client
            .cart_url(&CartId::new("cart/01 x"), "/line-items")
            .unwrap();
        assert_eq!(
            url.as_str(),
            "https://shop.example.com/api/store/carts/cart%2F01%20x/line-items"
        );
        assert_eq!(
            client.url("health").unwrap().as_str(),
            "https://shop.example.com/api/health"
        );
    }

    #[test]
    fn test_error_from_status() {
        let err = error_from_status(
            reqwest::StatusCode::BAD_REQUEST,
            r#"{"type":"invalid_data","message":"Variant does not have the required inventory"}"#,
        );
        assert!(matches!(
            err,
            MedusaError::Api { status: 400, ref message, code: Some(ref code) }
                if message == "Variant does not have the required inventory" && code == "invalid_data"
        ));

        let err = error_from_status(reqwest::StatusCode::NOT_FOUND, "");
        assert!(matches!(err, MedusaError::NotFound(ref m) if m == "Not Found"));

        let err = error_from_status(reqwest::StatusCode::SERVICE_UNAVAILABLE, "<html>");
        assert!(matches!(err, MedusaError::Unavailable(503)));

        let err = error_from_status(reqwest::StatusCode::CONFLICT, "{}");
        assert!(err.is_already_completed());
    }

    #[test]
    fn test_invalid_publishable_key() {
        let mut config = MedusaConfig::new(Url::parse("http://localhost:9000").unwrap());
        config.publishable_key = Some("bad\nkey".to_string());
        assert!(matches!(
            MedusaClient::new(&config),
            Err(MedusaError::InvalidHeader(_))
        ));
    }
}
