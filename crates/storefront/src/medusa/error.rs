//! Errors returned by the Medusa Store API client.

use thiserror::Error;

/// Errors that can occur when talking to the commerce backend.
#[derive(Debug, Error)]
pub enum MedusaError {
    /// Transport failure (connection refused, timeout, TLS, ...).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON parsing failed.
    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Rate limited by the backend.
    #[error("Rate limited, retry after {0} seconds")]
    RateLimited(u64),

    /// Backend or its gateway is temporarily unavailable (502/503/504).
    #[error("Backend unavailable (HTTP {0})")]
    Unavailable(u16),

    /// Backend answered with a structured failure.
    #[error("Backend error (HTTP {status}): {message}")]
    Api {
        status: u16,
        message: String,
        code: Option<String>,
    },

    /// Cart completion returned something other than an order or a redirect.
    #[error("Checkout rejected: {0}")]
    CheckoutRejected(String),

    /// Response parsed but did not have the expected shape.
    #[error("Unexpected response: {0}")]
    UnexpectedResponse(String),

    /// Backend URL could not be built.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// Configured header value is not valid for HTTP.
    #[error("Invalid header value: {0}")]
    InvalidHeader(String),
}

impl MedusaError {
    /// Transport-level failure: the backend could not be reached or did not
    /// answer in time.
    #[must_use]
    pub const fn is_network(&self) -> bool {
        matches!(self, Self::Http(_) | Self::Unavailable(_))
    }

    /// Worth repeating an idempotent request after a backoff.
    #[must_use]
    pub const fn is_retriable(&self) -> bool {
        matches!(
            self,
            Self::Http(_) | Self::Unavailable(_) | Self::RateLimited(_)
        )
    }

    /// The backend authoritatively refused the request.
    #[must_use]
    pub const fn is_rejection(&self) -> bool {
        match self {
            Self::NotFound(_) | Self::CheckoutRejected(_) => true,
            Self::Api { status, .. } => *status >= 400 && *status < 500,
            _ => false,
        }
    }

    /// The cart has already been turned into an order.
    #[must_use]
    pub fn is_already_completed(&self) -> bool {
        match self {
            Self::Api {
                status, message, ..
            } => *status == 409 || mentions_completion(message),
            Self::CheckoutRejected(message) => mentions_completion(message),
            _ => false,
        }
    }

    /// Backend-provided message, if there is one.
    #[must_use]
    pub fn backend_message(&self) -> Option<&str> {
        match self {
            Self::Api { message, .. } | Self::CheckoutRejected(message) => Some(message),
            _ => None,
        }
    }
}

fn mentions_completion(message: &str) -> bool {
    let lower = message.to_lowercase();
    lower.contains("already") && lower.contains("complet")
}
