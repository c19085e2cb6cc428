//! Cache types for catalog responses.

use crate::medusa::types::{Collection, Product, ProductPage, Region};

/// Cached value types.
#[derive(Debug, Clone)]
pub enum CacheValue {
    Regions(Vec<Region>),
    Product(Box<Product>),
    Products(ProductPage),
    Collections(Vec<Collection>),
}

/// Cache key for a page of products.
pub fn products_key(limit: u64, offset: u64, collection: Option<&str>) -> String {
    format!("products:{limit}:{offset}:{}", collection.unwrap_or("*"))
}

/// Cache key for a single product.
pub fn product_key(handle: &str) -> String {
    format!("product:{handle}")
}

/// Cache key for a page of collections.
pub fn collections_key(limit: u64, offset: u64) -> String {
    format!("collections:{limit}:{offset}")
}

pub const REGIONS_KEY: &str = "regions";
