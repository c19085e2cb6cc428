//! Dorsal CLI - drive a Medusa storefront from the terminal.
//!
//! # Usage
//!
//! ```bash
//! # Put something in the cart
//! dorsal catalog product home-jersey
//! dorsal cart add variant_01HX... --quantity 2
//!
//! # Check out
//! dorsal checkout --email ana@example.com --first-name Ana --last-name Ruiz \
//!     --address-1 "Calle Mayor 1" --city Madrid --postal-code 28013 --country-code es
//!
//! # After paying on a hosted payment page, hand the return URL back
//! dorsal callback "https://shop.example.com/checkout/callback?cart_id=cart_01..."
//! ```
//!
//! # Commands
//!
//! - `cart` - Show and edit the current cart
//! - `checkout` - Run the checkout for the current cart
//! - `callback` - Reconcile the return from a hosted payment page
//! - `order` - Show a placed order
//! - `catalog` - Browse regions, products and collections
//! - `health` - Check that the backend answers
//!
//! Configuration comes from the environment (see `dorsal_storefront::config`).
//! The cart id persists in `DORSAL_STATE_DIR` between invocations.

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};
use sentry::integrations::tracing as sentry_tracing;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use dorsal_storefront::config::StorefrontConfig;

mod commands;

use commands::checkout::CheckoutArgs;
use commands::{CliError, Context};

#[derive(Parser)]
#[command(name = "dorsal")]
#[command(author, version, about = "Dorsal storefront CLI")]
struct Cli {
    /// Print results as JSON
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show and edit the current cart
    Cart {
        #[command(subcommand)]
        action: CartAction,
    },
    /// Run the checkout for the current cart
    Checkout(CheckoutArgs),
    /// Reconcile the return from a hosted payment page
    Callback {
        /// Return URL (absolute, or a path with its query string)
        url: String,
    },
    /// Show a placed order
    Order {
        /// Order id
        id: String,
    },
    /// Browse the catalog
    Catalog {
        #[command(subcommand)]
        action: CatalogAction,
    },
    /// Check that the backend answers
    Health,
}

#[derive(Subcommand)]
enum CartAction {
    /// Show the cart
    Show,
    /// Add a product variant
    Add {
        /// Variant id
        variant_id: String,

        #[arg(short, long, default_value_t = 1, allow_negative_numbers = true)]
        quantity: i64,
    },
    /// Change a line item's quantity (0 removes it)
    Update {
        /// Line item id
        line_item_id: String,

        #[arg(allow_negative_numbers = true)]
        quantity: i64,
    },
    /// Remove a line item
    Remove {
        /// Line item id
        line_item_id: String,
    },
    /// Forget the current cart
    Clear,
}

#[derive(Subcommand)]
enum CatalogAction {
    /// List regions
    Regions,
    /// List products
    Products {
        #[arg(long, default_value_t = 20)]
        limit: u64,

        #[arg(long, default_value_t = 0)]
        offset: u64,

        /// Restrict to one collection
        #[arg(long)]
        collection: Option<String>,
    },
    /// Show a product by handle
    Product {
        handle: String,
    },
    /// List collections
    Collections {
        #[arg(long, default_value_t = 20)]
        limit: u64,

        #[arg(long, default_value_t = 0)]
        offset: u64,
    },
}

/// Initialize Sentry error tracking and return guard that must be kept alive.
fn init_sentry(config: &StorefrontConfig) -> Option<sentry::ClientInitGuard> {
    let dsn = config.sentry_dsn.as_ref()?;

    let guard = sentry::init((
        dsn.as_str(),
        sentry::ClientOptions {
            release: sentry::release_name!(),
            environment: config
                .sentry_environment
                .clone()
                .map(std::borrow::Cow::Owned),
            attach_stacktrace: true,
            ..Default::default()
        },
    ));

    tracing::info!("Sentry initialized");
    Some(guard)
}

/// Custom event filter for Sentry that captures WARN and ERROR as events.
fn sentry_event_filter(metadata: &tracing::Metadata<'_>) -> sentry_tracing::EventFilter {
    match *metadata.level() {
        tracing::Level::ERROR | tracing::Level::WARN => sentry_tracing::EventFilter::Event,
        tracing::Level::INFO | tracing::Level::DEBUG => sentry_tracing::EventFilter::Breadcrumb,
        _ => sentry_tracing::EventFilter::Ignore,
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Needed before tracing for the Sentry DSN
    let config = StorefrontConfig::from_env();
    let _sentry_guard = config.as_ref().ok().and_then(init_sentry);

    // Logs go to stderr so that --json output stays parseable
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "dorsal_storefront=info,dorsal_cli=info".into());

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(sentry_tracing::layer().event_filter(sentry_event_filter))
        .init();

    let result = match config {
        Ok(config) => run(cli, &config).await,
        Err(e) => Err(e.into()),
    };

    if let Err(e) = result {
        commands::fail(&e);
        std::process::exit(1);
    }
}

async fn run(cli: Cli, config: &StorefrontConfig) -> Result<(), CliError> {
    let ctx = Context::new(config, cli.json)?;

    match cli.command {
        Commands::Cart { action } => match action {
            CartAction::Show => commands::cart::show(&ctx).await,
            CartAction::Add {
                variant_id,
                quantity,
            } => commands::cart::add(&ctx, &variant_id, quantity).await,
            CartAction::Update {
                line_item_id,
                quantity,
            } => commands::cart::update(&ctx, &line_item_id, quantity).await,
            CartAction::Remove { line_item_id } => {
                commands::cart::remove(&ctx, &line_item_id).await
            }
            CartAction::Clear => commands::cart::clear(&ctx),
        },
        Commands::Checkout(args) => commands::checkout::run(&ctx, &args).await,
        Commands::Callback { url } => commands::payment::callback(&ctx, &url).await,
        Commands::Order { id } => commands::payment::order(&ctx, &id).await,
        Commands::Catalog { action } => match action {
            CatalogAction::Regions => commands::catalog::regions(&ctx).await,
            CatalogAction::Products {
                limit,
                offset,
                collection,
            } => commands::catalog::products(&ctx, limit, offset, collection.as_deref()).await,
            CatalogAction::Product { handle } => commands::catalog::product(&ctx, &handle).await,
            CatalogAction::Collections { limit, offset } => {
                commands::catalog::collections(&ctx, limit, offset).await
            }
        },
        Commands::Health => commands::catalog::health(&ctx).await,
    }
}
