use std::borrow::Cow;

use url::Url;

use dorsal_core::CartId;

/// Query parameters of a hosted payment page's return URL.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CallbackParams {
    /// `canceled=true`: the customer abandoned the payment page.
    pub canceled: bool,
    /// Provider error code.
    pub error: Option<String>,
    /// Human-readable provider error.
    pub error_description: Option<String>,
    /// Cart echoed back by the provider.
    pub cart_id: Option<CartId>,
}

impl CallbackParams {
    /// Collect the known parameters from decoded query pairs. Unknown keys are
    /// ignored, blank values count as absent.
    pub fn from_query<'a, I>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (Cow<'a, str>, Cow<'a, str>)>,
    {
        let mut params = Self::default();
        for (key, value) in pairs {
            let value = value.trim();
            match key.as_ref() {
                "canceled" => params.canceled = value.eq_ignore_ascii_case("true"),
                "error" if !value.is_empty() => params.error = Some(value.to_string()),
                "error_description" if !value.is_empty() => {
                    params.error_description = Some(value.to_string());
                }
                "cart_id" => params.cart_id = CartId::try_new(value),
                _ => {}
            }
        }
        params
    }

    /// Parameters of an absolute return URL.
    #[must_use]
    pub fn from_url(url: &Url) -> Self {
        Self::from_query(url.query_pairs())
    }

    /// Parameters of a return URL that may be absolute (`https://shop/checkout/callback?..`)
    /// or a bare path with a query (`/checkout/callback?..`).
    ///
    /// # Errors
    ///
    /// Returns an error if the input cannot be parsed as a URL.
    pub fn parse(return_url: &str) -> Result<Self, url::ParseError> {
        match Url::parse(return_url) {
            Ok(url) => Ok(Self::from_url(&url)),
            Err(url::ParseError::RelativeUrlWithoutBase) => {
                let base = Url::parse("http://localhost/")?;
                Ok(Self::from_url(&base.join(return_url)?))
            }
            Err(e) => Err(e),
        }
    }

    /// Provider error text, preferring the description.
    #[must_use]
    pub fn provider_error(&self) -> Option<&str> {
        self.error_description.as_deref().or(self.error.as_deref())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_absolute_url() {
        let params = CallbackParams::parse(
            "https://shop.example.com/checkout/callback?cart_id=cart_01&redirect_status=succeeded",
        )
        .unwrap();
        assert_eq!(params.cart_id, Some(CartId::new("cart_01")));
        assert!(!params.canceled);
        assert!(params.provider_error().is_none());
    }

    #[test]
    fn test_parse_relative_path() {
        let params = CallbackParams::parse("/checkout/callback?canceled=true").unwrap();
        assert!(params.canceled);
        assert!(params.cart_id.is_none());
    }

    #[test]
    fn test_provider_error_prefers_description() {
        let params = CallbackParams::parse(
            "/cb?error=card_declined&error_description=Your%20card%20was%20declined",
        )
        .unwrap();
        assert_eq!(params.provider_error(), Some("Your card was declined"));

        let params = CallbackParams::parse("/cb?error=card_declined").unwrap();
        assert_eq!(params.provider_error(), Some("card_declined"));
    }

    #[test]
    fn test_blank_values_are_absent() {
        let params = CallbackParams::parse("/cb?cart_id=&error=&canceled=false").unwrap();
        assert_eq!(params, CallbackParams::default());
    }
}
