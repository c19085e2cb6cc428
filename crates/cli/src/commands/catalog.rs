//! Catalog browsing and backend health.

use dorsal_storefront::backend::CommerceBackend;

use super::{CliError, Context, render};

pub async fn regions(ctx: &Context) -> Result<(), CliError> {
    let regions = ctx.client.list_regions().await?;
    ctx.emit(&regions, |r| render::regions(r))
}

pub async fn products(
    ctx: &Context,
    limit: u64,
    offset: u64,
    collection: Option<&str>,
) -> Result<(), CliError> {
    let page = ctx.client.get_products(limit, offset, collection).await?;
    ctx.emit(&page, |page| {
        format!(
            "{}\n({} of {})",
            render::products(&page.products),
            page.products.len(),
            page.count
        )
    })
}

pub async fn product(ctx: &Context, handle: &str) -> Result<(), CliError> {
    let product = ctx.client.get_product_by_handle(handle).await?;
    ctx.emit(&product, render::product)
}

pub async fn collections(ctx: &Context, limit: u64, offset: u64) -> Result<(), CliError> {
    let collections = ctx.client.get_collections(limit, offset).await?;
    ctx.emit(&collections, |c| render::collections(c))
}

pub async fn health(ctx: &Context) -> Result<(), CliError> {
    if ctx.client.health().await {
        ctx.say("Backend is healthy.");
        Ok(())
    } else {
        Err(CliError::Unhealthy)
    }
}
