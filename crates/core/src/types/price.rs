//! Money represented in the currency's minor unit.
//!
//! The commerce backend reports every amount as an integer count of minor
//! units (cents for EUR). Amounts stay integral while they travel through the
//! client and are only turned into a [`Decimal`] for display or totals.

use core::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Errors that can occur when parsing a [`CurrencyCode`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum CurrencyError {
    /// The code is not three ASCII letters.
    #[error("currency code must be three letters (got {0:?})")]
    Invalid(String),
}

/// ISO 4217 currency code, normalized to lowercase as the backend sends it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CurrencyCode(String);

impl CurrencyCode {
    /// Parse a currency code such as `"EUR"` or `"eur"`.
    ///
    /// # Errors
    ///
    /// Returns [`CurrencyError::Invalid`] unless the input is exactly three
    /// ASCII letters.
    pub fn parse(code: &str) -> Result<Self, CurrencyError> {
        let code = code.trim();
        if code.len() == 3 && code.chars().all(|c| c.is_ascii_alphabetic()) {
            Ok(Self(code.to_ascii_lowercase()))
        } else {
            Err(CurrencyError::Invalid(code.to_owned()))
        }
    }

    /// Lowercase code (`"eur"`).
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Number of decimal places between the minor and the major unit.
    #[must_use]
    pub fn minor_units(&self) -> u32 {
        match self.0.as_str() {
            "jpy" | "krw" | "clp" | "isk" | "vnd" => 0,
            "bhd" | "kwd" | "omr" | "jod" | "tnd" => 3,
            _ => 2,
        }
    }

    /// Display symbol, if the currency has a well-known one.
    #[must_use]
    pub fn symbol(&self) -> Option<&'static str> {
        match self.0.as_str() {
            "eur" => Some("€"),
            "usd" | "cad" | "aud" | "mxn" => Some("$"),
            "gbp" => Some("£"),
            "jpy" => Some("¥"),
            _ => None,
        }
    }
}

impl Default for CurrencyCode {
    fn default() -> Self {
        Self("eur".to_owned())
    }
}

impl fmt::Display for CurrencyCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.to_ascii_uppercase())
    }
}

impl TryFrom<String> for CurrencyCode {
    type Error = CurrencyError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<CurrencyCode> for String {
    fn from(code: CurrencyCode) -> Self {
        code.0
    }
}

impl std::str::FromStr for CurrencyCode {
    type Err = CurrencyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// An amount of money in a specific currency.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Money {
    /// Amount in the currency's minor unit (e.g., cents).
    pub amount: i64,
    /// ISO 4217 currency code.
    pub currency_code: CurrencyCode,
}

impl Money {
    /// Create a new amount from minor units.
    #[must_use]
    pub const fn new(amount: i64, currency_code: CurrencyCode) -> Self {
        Self {
            amount,
            currency_code,
        }
    }

    /// Zero in the given currency.
    #[must_use]
    pub const fn zero(currency_code: CurrencyCode) -> Self {
        Self::new(0, currency_code)
    }

    /// The amount in major units (e.g., `1999` cents becomes `19.99`).
    #[must_use]
    pub fn to_decimal(&self) -> Decimal {
        Decimal::new(self.amount, self.currency_code.minor_units())
    }

    /// Format for display (e.g., `"€19.99"` or `"19.99 CHF"`).
    #[must_use]
    pub fn display(&self) -> String {
        let places = self.currency_code.minor_units() as usize;
        let value = self.to_decimal();
        match self.currency_code.symbol() {
            Some(symbol) => format!("{symbol}{value:.places$}"),
            None => format!("{value:.places$} {}", self.currency_code),
        }
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.display())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn eur() -> CurrencyCode {
        CurrencyCode::parse("eur").unwrap()
    }

    #[test]
    fn test_currency_code_normalizes_case() {
        assert_eq!(CurrencyCode::parse("EUR").unwrap(), eur());
        assert_eq!(eur().to_string(), "EUR");
        assert_eq!(eur().as_str(), "eur");
    }

    #[test]
    fn test_currency_code_rejects_garbage() {
        assert!(CurrencyCode::parse("euro").is_err());
        assert!(CurrencyCode::parse("e1r").is_err());
        assert!(CurrencyCode::parse("").is_err());
    }

    #[test]
    fn test_to_decimal_uses_minor_units() {
        assert_eq!(Money::new(1999, eur()).to_decimal(), Decimal::new(1999, 2));
        let yen = CurrencyCode::parse("jpy").unwrap();
        assert_eq!(Money::new(500, yen).to_decimal(), Decimal::from(500));
    }

    #[test]
    fn test_display() {
        assert_eq!(Money::new(1999, eur()).display(), "€19.99");
        assert_eq!(Money::new(500, eur()).display(), "€5.00");
        let chf = CurrencyCode::parse("chf").unwrap();
        assert_eq!(Money::new(1250, chf).display(), "12.50 CHF");
    }

    #[test]
    fn test_serde_roundtrip_lowercases_currency() {
        let money: Money =
            serde_json::from_str(r#"{"amount":4500,"currency_code":"EUR"}"#).unwrap();
        assert_eq!(money, Money::new(4500, eur()));
        assert_eq!(
            serde_json::to_string(&money).unwrap(),
            r#"{"amount":4500,"currency_code":"eur"}"#
        );
    }
}
