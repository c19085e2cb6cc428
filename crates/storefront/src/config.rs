//! Storefront configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! All variables are optional.
//!
//! ## Commerce backend
//! - `MEDUSA_BACKEND_URL` - Medusa server URL (default: `http://localhost:9000`)
//! - `MEDUSA_PUBLISHABLE_KEY` - Publishable API key sent with every store request
//! - `MEDUSA_TIMEOUT_SECS` - Per-request timeout (default: 30)
//! - `MEDUSA_MAX_RETRIES` - Retries for idempotent reads (default: 3)
//! - `CATALOG_CACHE_TTL_SECS` - Catalog cache time-to-live (default: 300)
//!
//! ## Checkout
//! - `STOREFRONT_PREFERRED_CURRENCY` - Currency of the default region (default: eur)
//! - `ORDER_POLL_ATTEMPTS` - Order lookups after a payment redirect (default: 5)
//! - `ORDER_POLL_DELAY_MS` - Delay between those lookups (default: 2000)
//! - `ORDER_RETRY_ATTEMPTS` - Lookups after an "already completed" answer (default: 3)
//! - `ORDER_RETRY_DELAY_MS` - Delay between those lookups (default: 1000)
//! - `ADDRESS_DEBOUNCE_MS` - Quiet period before a typed address counts as settled (default: 400)
//!
//! ## Local state and error tracking
//! - `DORSAL_STATE_DIR` - Directory holding persisted cart ids (default: `.dorsal`)
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;
use url::Url;

use dorsal_core::CurrencyCode;

use crate::payment::ReconcilePolicy;

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Storefront configuration.
#[derive(Debug, Clone)]
pub struct StorefrontConfig {
    /// Commerce backend connection settings
    pub medusa: MedusaConfig,
    /// Currency used to pick the region of new carts
    pub preferred_currency: CurrencyCode,
    /// Bounded polling used to confirm redirect-based payments
    pub reconcile: ReconcilePolicy,
    /// Quiet period before a typed address triggers the shipping step
    pub address_debounce: Duration,
    /// Directory for the persisted cart ids
    pub state_dir: PathBuf,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment (e.g., "production")
    pub sentry_environment: Option<String>,
}

/// Medusa Store API configuration.
#[derive(Debug, Clone)]
pub struct MedusaConfig {
    /// Server URL, without the `/store` suffix
    pub backend_url: Url,
    /// Publishable API key (safe to expose; identifies the sales channel)
    pub publishable_key: Option<String>,
    /// Per-request timeout
    pub timeout: Duration,
    /// Retries for idempotent reads
    pub max_retries: u32,
    /// Base delay of the exponential retry backoff
    pub retry_base_delay: Duration,
    /// Catalog cache time-to-live
    pub cache_ttl: Duration,
}

impl MedusaConfig {
    /// Configuration for a backend at `backend_url` with default settings.
    #[must_use]
    pub const fn new(backend_url: Url) -> Self {
        Self {
            backend_url,
            publishable_key: None,
            timeout: Duration::from_secs(30),
            max_retries: 3,
            retry_base_delay: Duration::from_millis(500),
            cache_ttl: Duration::from_secs(300),
        }
    }
}

impl StorefrontConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a variable is set to an invalid value.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        Self::from_source(|key| std::env::var(key).ok())
    }

    /// Load configuration from an arbitrary key/value source.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a variable is set to an invalid value.
    pub fn from_source(env: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let backend_url = get_env_or_default(&env, "MEDUSA_BACKEND_URL", "http://localhost:9000");
        let backend_url = Url::parse(&backend_url).map_err(|e| {
            ConfigError::InvalidEnvVar("MEDUSA_BACKEND_URL".to_string(), e.to_string())
        })?;

        let publishable_key = get_optional_env(&env, "MEDUSA_PUBLISHABLE_KEY");
        if publishable_key.is_none() {
            tracing::warn!(
                "MEDUSA_PUBLISHABLE_KEY is not set; backends with sales channels will reject store requests"
            );
        }

        let medusa = MedusaConfig {
            backend_url,
            publishable_key,
            timeout: Duration::from_secs(parse_env(&env, "MEDUSA_TIMEOUT_SECS", 30)?),
            max_retries: parse_env(&env, "MEDUSA_MAX_RETRIES", 3)?,
            retry_base_delay: Duration::from_millis(500),
            cache_ttl: Duration::from_secs(parse_env(&env, "CATALOG_CACHE_TTL_SECS", 300)?),
        };

        let preferred_currency =
            CurrencyCode::parse(&get_env_or_default(&env, "STOREFRONT_PREFERRED_CURRENCY", "eur"))
                .map_err(|e| {
                    ConfigError::InvalidEnvVar(
                        "STOREFRONT_PREFERRED_CURRENCY".to_string(),
                        e.to_string(),
                    )
                })?;

        let reconcile = ReconcilePolicy {
            poll_attempts: parse_positive(&env, "ORDER_POLL_ATTEMPTS", 5)?,
            poll_delay: Duration::from_millis(parse_env(&env, "ORDER_POLL_DELAY_MS", 2000)?),
            retry_attempts: parse_positive(&env, "ORDER_RETRY_ATTEMPTS", 3)?,
            retry_delay: Duration::from_millis(parse_env(&env, "ORDER_RETRY_DELAY_MS", 1000)?),
        };

        Ok(Self {
            medusa,
            preferred_currency,
            reconcile,
            address_debounce: Duration::from_millis(parse_env(&env, "ADDRESS_DEBOUNCE_MS", 400)?),
            state_dir: PathBuf::from(get_env_or_default(&env, "DORSAL_STATE_DIR", ".dorsal")),
            sentry_dsn: get_optional_env(&env, "SENTRY_DSN"),
            sentry_environment: get_optional_env(&env, "SENTRY_ENVIRONMENT"),
        })
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get an optional variable, treating blank values as unset.
fn get_optional_env(env: &impl Fn(&str) -> Option<String>, key: &str) -> Option<String> {
    env(key).filter(|value| !value.trim().is_empty())
}

/// Get a variable with a default value.
fn get_env_or_default(env: &impl Fn(&str) -> Option<String>, key: &str, default: &str) -> String {
    get_optional_env(env, key).unwrap_or_else(|| default.to_string())
}

/// Parse a variable, falling back to `default` when unset.
fn parse_env<T>(env: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    get_optional_env(env, key).map_or(Ok(default), |value| {
        value
            .trim()
            .parse::<T>()
            .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
    })
}

/// Parse a count that must be at least one.
fn parse_positive(
    env: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: u32,
) -> Result<u32, ConfigError> {
    let value = parse_env(env, key, default)?;
    if value == 0 {
        return Err(ConfigError::InvalidEnvVar(
            key.to_string(),
            "must be at least 1".to_string(),
        ));
    }
    Ok(value)
}
