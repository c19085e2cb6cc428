//! Shipping address as typed by the customer and as sent to the backend.

use serde::{Deserialize, Serialize};

/// Errors produced by [`AddressInput::validate`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum AddressError {
    /// A required field is blank.
    #[error("{0} is required")]
    MissingField(&'static str),
    /// The country is not a two-letter ISO 3166-1 code.
    #[error("country code must be two letters (got {0:?})")]
    InvalidCountryCode(String),
}

/// Raw address form input. Nothing is validated yet.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddressInput {
    pub first_name: String,
    pub last_name: String,
    pub address_1: String,
    #[serde(default)]
    pub address_2: Option<String>,
    pub city: String,
    pub postal_code: String,
    #[serde(default)]
    pub province: Option<String>,
    pub country_code: String,
    #[serde(default)]
    pub phone: Option<String>,
}

/// A validated shipping address.
///
/// All required fields are non-blank and trimmed, and `country_code` is a
/// lowercase two-letter code (`"es"`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShippingAddress {
    pub first_name: String,
    pub last_name: String,
    pub address_1: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address_2: Option<String>,
    pub city: String,
    pub postal_code: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub province: Option<String>,
    pub country_code: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
}

impl AddressInput {
    /// Validate the form into a [`ShippingAddress`].
    ///
    /// # Errors
    ///
    /// Returns the first missing required field, or
    /// [`AddressError::InvalidCountryCode`] for a malformed country.
    pub fn validate(&self) -> Result<ShippingAddress, AddressError> {
        let first_name = required(&self.first_name, "first name")?;
        let last_name = required(&self.last_name, "last name")?;
        let address_1 = required(&self.address_1, "address")?;
        let city = required(&self.city, "city")?;
        let postal_code = required(&self.postal_code, "postal code")?;
        let country = required(&self.country_code, "country")?;

        if country.len() != 2 || !country.chars().all(|c| c.is_ascii_alphabetic()) {
            return Err(AddressError::InvalidCountryCode(country));
        }

        Ok(ShippingAddress {
            first_name,
            last_name,
            address_1,
            address_2: optional(self.address_2.as_deref()),
            city,
            postal_code,
            province: optional(self.province.as_deref()),
            country_code: country.to_ascii_lowercase(),
            phone: optional(self.phone.as_deref()),
        })
    }
}

impl From<ShippingAddress> for AddressInput {
    fn from(address: ShippingAddress) -> Self {
        Self {
            first_name: address.first_name,
            last_name: address.last_name,
            address_1: address.address_1,
            address_2: address.address_2,
            city: address.city,
            postal_code: address.postal_code,
            province: address.province,
            country_code: address.country_code,
            phone: address.phone,
        }
    }
}

fn required(value: &str, field: &'static str) -> Result<String, AddressError> {
    let value = value.trim();
    if value.is_empty() {
        Err(AddressError::MissingField(field))
    } else {
        Ok(value.to_owned())
    }
}

fn optional(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_owned)
}
