//! Product and collection conversions.

use dorsal_core::{CollectionId, Money, ProductId, VariantId};
use tracing::warn;

use crate::medusa::types::{Collection, Product, ProductPage, ProductVariant};

use super::{currency_or_default, wire};

pub fn convert_product(product: wire::Product) -> Product {
    let handle = product.handle.unwrap_or_else(|| {
        warn!(product_id = %product.id, "Product has no handle");
        product.id.clone()
    });

    Product {
        id: ProductId::new(product.id),
        title: product.title,
        handle,
        description: product.description.filter(|d| !d.trim().is_empty()),
        thumbnail: product.thumbnail,
        collection_id: product
            .collection_id
            .and_then(|id| CollectionId::try_new(&id)),
        variants: product.variants.into_iter().map(convert_variant).collect(),
    }
}

fn convert_variant(variant: wire::Variant) -> ProductVariant {
    ProductVariant {
        title: variant.title.unwrap_or_else(|| "Default".to_string()),
        id: VariantId::new(variant.id),
        sku: variant.sku.filter(|s| !s.is_empty()),
        prices: variant
            .prices
            .into_iter()
            .map(|p| Money::new(p.amount, currency_or_default(Some(&p.currency_code))))
            .collect(),
        inventory_quantity: variant.inventory_quantity,
    }
}

/// Build a page, filling in pagination fields the backend left out.
pub fn convert_product_page(
    response: wire::ProductsResponse,
    requested_limit: u64,
    requested_offset: u64,
) -> ProductPage {
    let products: Vec<Product> = response.products.into_iter().map(convert_product).collect();
    let returned = u64::try_from(products.len()).unwrap_or(u64::MAX);
    ProductPage {
        count: response
            .count
            .unwrap_or_else(|| requested_offset.saturating_add(returned)),
        offset: response.offset.unwrap_or(requested_offset),
        limit: response.limit.unwrap_or(requested_limit),
        products,
    }
}

pub fn convert_collection(collection: wire::Collection) -> Collection {
    Collection {
        handle: collection
            .handle
            .unwrap_or_else(|| collection.id.clone()),
        id: CollectionId::new(collection.id),
        title: collection.title,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_convert_product_page() {
        let raw: wire::ProductsResponse = serde_json::from_value(json!({
            "products": [{
                "id": "prod_1",
                "title": "Home jersey 24/25",
                "handle": "home-jersey-24-25",
                "description": "  ",
                "collection_id": "pcol_liga",
                "variants": [{
                    "id": "variant_s",
                    "title": "S",
                    "sku": "",
                    "prices": [{"amount": 8999, "currency_code": "EUR"}],
                    "inventory_quantity": 4
                }]
            }],
            "count": 30,
            "offset": 12,
            "limit": 12
        }))
        .unwrap();

        let page = convert_product_page(raw, 12, 12);
        assert_eq!(page.count, 30);
        assert!(page.has_next_page());

        let product = &page.products[0];
        assert_eq!(product.handle, "home-jersey-24-25");
        assert!(product.description.is_none());
        assert_eq!(product.collection_id.as_ref().unwrap().as_str(), "pcol_liga");

        let variant = &product.variants[0];
        assert!(variant.sku.is_none());
        assert_eq!(variant.prices[0].display(), "€89.99");
    }

    #[test]
    fn test_page_defaults_when_backend_omits_pagination() {
        let raw: wire::ProductsResponse = serde_json::from_value(json!({
            "products": [{"id": "prod_1", "title": "Scarf"}]
        }))
        .unwrap();
        let page = convert_product_page(raw, 20, 40);
        assert_eq!(page.offset, 40);
        assert_eq!(page.limit, 20);
        assert_eq!(page.count, 41);
        assert_eq!(page.products[0].handle, "prod_1");
    }

    #[test]
    fn test_convert_collection_handle_fallback() {
        let collection = convert_collection(wire::Collection {
            id: "pcol_1".to_string(),
            title: "Retro".to_string(),
            handle: None,
        });
        assert_eq!(collection.handle, "pcol_1");
    }
}
