//! Non-interactive checkout of the current cart.
//!
//! Runs address, shipping, payment and completion in one go. When the
//! backend offers more than one shipping option or payment provider, the
//! choice has to be passed with `--shipping-option` / `--provider`; without
//! it the command lists the choices and stops.

use clap::Args;

use dorsal_core::{AddressInput, PaymentProviderId, ShippingOptionId};
use dorsal_storefront::checkout::{CheckoutOutcome, Selection};

use super::{CliError, Context, render};

/// Contact and shipping details for the checkout.
#[derive(Args, Debug)]
pub struct CheckoutArgs {
    #[arg(long)]
    pub email: String,

    #[arg(long)]
    pub first_name: String,

    #[arg(long)]
    pub last_name: String,

    #[arg(long = "address-1")]
    pub address_1: String,

    #[arg(long = "address-2")]
    pub address_2: Option<String>,

    #[arg(long)]
    pub city: String,

    #[arg(long)]
    pub postal_code: String,

    #[arg(long)]
    pub province: Option<String>,

    /// Two-letter ISO country code
    #[arg(long)]
    pub country_code: String,

    #[arg(long)]
    pub phone: Option<String>,

    /// Shipping option id, when more than one is offered
    #[arg(long)]
    pub shipping_option: Option<String>,

    /// Payment provider id, when more than one is offered
    #[arg(long)]
    pub provider: Option<String>,
}

impl CheckoutArgs {
    fn address(&self) -> AddressInput {
        AddressInput {
            first_name: self.first_name.clone(),
            last_name: self.last_name.clone(),
            address_1: self.address_1.clone(),
            address_2: self.address_2.clone(),
            city: self.city.clone(),
            postal_code: self.postal_code.clone(),
            province: self.province.clone(),
            country_code: self.country_code.clone(),
            phone: self.phone.clone(),
        }
    }
}

pub async fn run(ctx: &Context, args: &CheckoutArgs) -> Result<(), CliError> {
    let mut session = ctx.storefront.carts().session()?;
    let mut checkout = ctx.storefront.checkout(&mut session).await?;

    if checkout.order().is_some() {
        tracing::info!("This cart was already turned into an order");
        let outcome = checkout.complete().await?;
        return report_outcome(ctx, &outcome);
    }

    checkout.submit_address(&args.address(), &args.email).await?;

    match checkout.load_shipping_options().await? {
        Selection::AutoSelected(option) => {
            tracing::info!(option_id = %option.id, "Using the only shipping option");
        }
        Selection::ChooseOne(options) => {
            let Some(chosen) = &args.shipping_option else {
                ctx.say(&render::shipping_options(&options));
                return Err(CliError::Usage(
                    "Pick a shipping option with --shipping-option".to_string(),
                ));
            };
            checkout
                .select_shipping_option(&ShippingOptionId::new(chosen.as_str()))
                .await?;
        }
    }

    match checkout.initialize_payment_sessions().await? {
        Selection::AutoSelected(payment) => {
            tracing::info!(provider_id = %payment.provider_id, "Using the only payment provider");
        }
        Selection::ChooseOne(sessions) => {
            let Some(chosen) = &args.provider else {
                ctx.say(&render::payment_sessions(&sessions));
                return Err(CliError::Usage(
                    "Pick a payment provider with --provider".to_string(),
                ));
            };
            checkout
                .select_payment_provider(&PaymentProviderId::new(chosen.as_str()))
                .await?;
        }
    }

    let outcome = checkout.complete().await?;
    report_outcome(ctx, &outcome)
}

fn report_outcome(ctx: &Context, outcome: &CheckoutOutcome) -> Result<(), CliError> {
    match outcome {
        CheckoutOutcome::OrderPlaced { order } => {
            ctx.emit(order.as_ref(), render::order)?;
            ctx.say(&format!("Next: {}", outcome.navigation().location()));
        }
        CheckoutOutcome::RedirectRequired { url } => {
            ctx.emit(&url.as_str(), |url| {
                format!(
                    "Complete the payment at:\n  {url}\nthen run `dorsal callback <return url>`."
                )
            })?;
        }
    }
    Ok(())
}
