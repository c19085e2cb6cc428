//! Payment return handling and order lookup.

use dorsal_core::OrderId;
use dorsal_storefront::payment::{CallbackParams, ReconcileOutcome};

use super::{CliError, Context, render};

/// Reconcile the URL the hosted payment page sent the customer back to.
pub async fn callback(ctx: &Context, return_url: &str) -> Result<(), CliError> {
    let params = CallbackParams::parse(return_url)
        .map_err(|e| CliError::Usage(format!("Invalid return URL: {e}")))?;

    let policy = &ctx.storefront.settings().reconcile;
    tracing::info!(
        max_wait_secs = policy.worst_case_wait().as_secs(),
        "Confirming payment"
    );

    let mut session = ctx.storefront.carts().session()?;
    let outcome = ctx.storefront.reconciler().reconcile(&mut session, &params).await?;

    match &outcome {
        ReconcileOutcome::Confirmed { order } => {
            ctx.emit(order.as_ref(), render::order)?;
        }
        ReconcileOutcome::RedirectRequired { url } => {
            ctx.emit(&url.as_str(), |url| {
                format!("The payment provider needs another step:\n  {url}")
            })?;
        }
    }
    ctx.say(&format!("Next: {}", outcome.navigation().location()));
    Ok(())
}

pub async fn order(ctx: &Context, id: &str) -> Result<(), CliError> {
    let order = ctx.storefront.order(&OrderId::new(id)).await?;
    ctx.emit(&order, render::order)
}
