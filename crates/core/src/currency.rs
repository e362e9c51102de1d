//! Currency - settlement asset codes for agent payments
//!
//! Agents mostly settle in stablecoins; fiat codes appear when the
//! payment provider reports the transfer amount in its reference currency.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CurrencyError {
    #[error("Empty currency code")]
    EmptyCode,

    #[error("Currency code too long (max 10 chars): {0}")]
    TooLong(String),

    #[error("Invalid currency code format: {0}")]
    InvalidFormat(String),
}

/// Currency/asset codes
///
/// ```
/// use guardian_core::Currency;
///
/// let usdc: Currency = "usdc".parse().unwrap();
/// assert_eq!(usdc, Currency::Usdc);
/// assert!(usdc.is_stablecoin());
///
/// let other: Currency = "PYUSD".parse().unwrap();
/// assert_eq!(other.to_string(), "PYUSD");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Currency {
    /// USD Coin
    Usdc,
    /// Euro Coin
    Eurc,
    /// Tether USD
    Usdt,
    /// US Dollar
    Usd,
    /// Euro
    Eur,
    /// Any other token
    Other(String),
}

impl Currency {
    pub fn code(&self) -> &str {
        match self {
            Currency::Usdc => "USDC",
            Currency::Eurc => "EURC",
            Currency::Usdt => "USDT",
            Currency::Usd => "USD",
            Currency::Eur => "EUR",
            Currency::Other(s) => s.as_str(),
        }
    }

    pub fn is_stablecoin(&self) -> bool {
        matches!(self, Currency::Usdc | Currency::Eurc | Currency::Usdt)
    }

    pub fn is_fiat(&self) -> bool {
        matches!(self, Currency::Usd | Currency::Eur)
    }
}

impl Default for Currency {
    fn default() -> Self {
        Currency::Usdc
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

impl FromStr for Currency {
    type Err = CurrencyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim().to_uppercase();

        if s.is_empty() {
            return Err(CurrencyError::EmptyCode);
        }
        if s.len() > 10 {
            return Err(CurrencyError::TooLong(s));
        }
        if !s.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(CurrencyError::InvalidFormat(s));
        }

        Ok(match s.as_str() {
            "USDC" => Currency::Usdc,
            "EURC" => Currency::Eurc,
            "USDT" => Currency::Usdt,
            "USD" => Currency::Usd,
            "EUR" => Currency::Eur,
            _ => Currency::Other(s),
        })
    }
}

impl TryFrom<String> for Currency {
    type Error = CurrencyError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<Currency> for String {
    fn from(c: Currency) -> Self {
        c.code().to_string()
    }
}
