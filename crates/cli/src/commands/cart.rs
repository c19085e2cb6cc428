//! Cart commands.
//!
//! # Usage
//!
//! ```bash
//! dorsal cart show
//! dorsal cart add variant_01 --quantity 2
//! dorsal cart update item_01 3
//! dorsal cart remove item_01
//! dorsal cart clear
//! ```

use dorsal_core::{LineItemId, VariantId};
use dorsal_storefront::medusa::Cart;

use super::{CliError, Context, render};

pub async fn show(ctx: &Context) -> Result<(), CliError> {
    let carts = ctx.storefront.carts();
    let mut session = carts.session()?;

    match carts.refresh(&mut session).await? {
        Some(cart) => ctx.emit(&cart, render::cart),
        None => ctx.emit(&Option::<Cart>::None, |_| "Your cart is empty.".to_string()),
    }
}

pub async fn add(ctx: &Context, variant_id: &str, quantity: i64) -> Result<(), CliError> {
    let carts = ctx.storefront.carts();
    let mut session = carts.session()?;

    let cart = carts
        .add_line_item(&mut session, &VariantId::new(variant_id), quantity)
        .await?;
    tracing::info!(cart_id = %cart.id, variant_id, quantity, "Added to cart");
    ctx.emit(&cart, render::cart)
}

pub async fn update(ctx: &Context, line_item_id: &str, quantity: i64) -> Result<(), CliError> {
    let carts = ctx.storefront.carts();
    let mut session = carts.session()?;

    let cart = carts
        .update_line_item_quantity(&mut session, &LineItemId::new(line_item_id), quantity)
        .await?;
    ctx.emit(&cart, render::cart)
}

pub async fn remove(ctx: &Context, line_item_id: &str) -> Result<(), CliError> {
    let carts = ctx.storefront.carts();
    let mut session = carts.session()?;

    let cart = carts
        .remove_line_item(&mut session, &LineItemId::new(line_item_id))
        .await?;
    ctx.emit(&cart, render::cart)
}

pub fn clear(ctx: &Context) -> Result<(), CliError> {
    let carts = ctx.storefront.carts();
    let mut session = carts.session()?;

    carts.clear(&mut session)?;
    ctx.say("Cart cleared.");
    Ok(())
}
