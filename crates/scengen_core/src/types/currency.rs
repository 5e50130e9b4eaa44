//! Currency identifiers used in market keys and FX conversion.

use std::fmt;
use std::str::FromStr;

use super::error::ConfigurationError;

/// ISO 4217 currency codes covered by the hybrid model.
///
/// Used as the first level of market-context keys (each currency
/// carries a default discount curve) and as the legs of FX pairs.
///
/// # Examples
///
/// ```
/// use scengen_core::types::Currency;
///
/// assert_eq!(Currency::USD.code(), "USD");
/// let eur: Currency = "eur".parse().unwrap();
/// assert_eq!(eur, Currency::EUR);
/// ```
#[non_exhaustive]
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum Currency {
    /// United States Dollar
    USD,
    /// Euro
    EUR,
    /// British Pound Sterling
    GBP,
    /// Japanese Yen
    JPY,
    /// Swiss Franc
    CHF,
}

impl Currency {
    /// Returns the ISO 4217 three-letter currency code.
    #[inline]
    pub fn code(&self) -> &'static str {
        match self {
            Currency::USD => "USD",
            Currency::EUR => "EUR",
            Currency::GBP => "GBP",
            Currency::JPY => "JPY",
            Currency::CHF => "CHF",
        }
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

impl FromStr for Currency {
    type Err = ConfigurationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "USD" => Ok(Currency::USD),
            "EUR" => Ok(Currency::EUR),
            "GBP" => Ok(Currency::GBP),
            "JPY" => Ok(Currency::JPY),
            "CHF" => Ok(Currency::CHF),
            _ => Err(ConfigurationError::UnknownCurrency(s.to_string())),
        }
    }
}

/// An ordered FX pair: one unit of `base` expressed in `quote`.
///
/// Used as the FX key on cross-currency legs and for converting
/// scenario values into a common numeraire currency.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct CurrencyPair {
    /// The currency being priced.
    pub base: Currency,
    /// The currency the price is expressed in.
    pub quote: Currency,
}

impl CurrencyPair {
    /// Creates a new pair.
    #[inline]
    pub fn new(base: Currency, quote: Currency) -> Self {
        Self { base, quote }
    }

    /// The inverse pair (quote per base becomes base per quote).
    #[inline]
    pub fn inverse(&self) -> Self {
        Self {
            base: self.quote,
            quote: self.base,
        }
    }

    /// True when base and quote coincide (rate is identically 1).
    #[inline]
    pub fn is_identity(&self) -> bool {
        self.base == self.quote
    }
}

impl fmt::Display for CurrencyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.base, self.quote)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn code_round_trip() {
        for ccy in [
            Currency::USD,
            Currency::EUR,
            Currency::GBP,
            Currency::JPY,
            Currency::CHF,
        ] {
            let parsed: Currency = ccy.code().parse().unwrap();
            assert_eq!(parsed, ccy);
        }
    }

    #[test]
    fn parse_is_case_insensitive() {
        let c: Currency = "gbp".parse().unwrap();
        assert_eq!(c, Currency::GBP);
    }

    #[test]
    fn parse_unknown_fails() {
        let result: Result<Currency, _> = "XAU".parse();
        assert!(matches!(
            result,
            Err(ConfigurationError::UnknownCurrency(_))
        ));
    }

    #[test]
    fn pair_inverse_and_identity() {
        let pair = CurrencyPair::new(Currency::EUR, Currency::USD);
        assert_eq!(pair.inverse().base, Currency::USD);
        assert!(!pair.is_identity());
        assert!(CurrencyPair::new(Currency::USD, Currency::USD).is_identity());
        assert_eq!(format!("{}", pair), "EUR/USD");
    }
}
