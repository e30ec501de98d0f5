//! Currency codes, percentages and minor-unit rounding using decimal arithmetic.

use core::fmt;

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

/// Number of decimal places in every supported currency's minor unit.
pub const MINOR_UNIT_SCALE: u32 = 2;

/// Errors raised by currency and percentage constructors.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum MoneyError {
    /// Percentage outside 0-100.
    #[error("percentage must be between 0 and 100: {0}")]
    PercentageOutOfRange(Decimal),
    /// Unknown ISO code.
    #[error("unsupported currency: {0}")]
    UnsupportedCurrency(String),
}

/// ISO 4217 currency codes accepted by the brokerage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(feature = "postgres", sqlx(type_name = "currency_code"))]
pub enum CurrencyCode {
    /// Bolivian boliviano.
    #[default]
    BOB,
    USD,
    EUR,
}

impl CurrencyCode {
    /// Returns the ISO code.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::BOB => "BOB",
            Self::USD => "USD",
            Self::EUR => "EUR",
        }
    }
}

impl fmt::Display for CurrencyCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl std::str::FromStr for CurrencyCode {
    type Err = MoneyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "BOB" => Ok(Self::BOB),
            "USD" => Ok(Self::USD),
            "EUR" => Ok(Self::EUR),
            other => Err(MoneyError::UnsupportedCurrency(other.to_owned())),
        }
    }
}

/// A percentage in the closed range 0-100.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "Decimal", into = "Decimal")]
pub struct Percentage(Decimal);

impl Percentage {
    /// 100%.
    pub const FULL: Self = Self(Decimal::ONE_HUNDRED);

    /// Create a percentage.
    ///
    /// # Errors
    ///
    /// Returns `MoneyError::PercentageOutOfRange` outside 0-100.
    pub fn new(value: Decimal) -> Result<Self, MoneyError> {
        if value < Decimal::ZERO || value > Decimal::ONE_HUNDRED {
            return Err(MoneyError::PercentageOutOfRange(value));
        }
        Ok(Self(value))
    }

    /// The raw percentage value (e.g. `3` for 3%).
    #[must_use]
    pub const fn value(&self) -> Decimal {
        self.0
    }

    /// Apply the percentage to an amount without rounding.
    #[must_use]
    pub fn of(&self, amount: Decimal) -> Decimal {
        amount * self.0 / Decimal::ONE_HUNDRED
    }
}

impl TryFrom<Decimal> for Percentage {
    type Error = MoneyError;

    fn try_from(value: Decimal) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Percentage> for Decimal {
    fn from(p: Percentage) -> Self {
        p.0
    }
}

impl fmt::Display for Percentage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}%", self.0.normalize())
    }
}

/// Round half away from zero to the currency minor unit.
#[must_use]
pub fn round_minor(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(MINOR_UNIT_SCALE, RoundingStrategy::MidpointAwayFromZero)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::str::FromStr;

    use super::*;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn test_percentage_bounds() {
        assert!(Percentage::new(dec("0")).is_ok());
        assert!(Percentage::new(dec("100")).is_ok());
        assert!(Percentage::new(dec("100.01")).is_err());
        assert!(Percentage::new(dec("-1")).is_err());
    }

    #[test]
    fn test_percentage_of() {
        let p = Percentage::new(dec("3")).unwrap();
        assert_eq!(p.of(dec("100000")), dec("3000"));
        assert_eq!(p.to_string(), "3%");
    }

    #[test]
    fn test_rounding_helpers() {
        assert_eq!(round_minor(dec("2.345")), dec("2.35"));
        assert_eq!(round_minor(dec("2.344")), dec("2.34"));
    }

    #[test]
    fn test_currency_from_str() {
        assert_eq!(CurrencyCode::from_str("usd").unwrap(), CurrencyCode::USD);
        assert!(CurrencyCode::from_str("ARS").is_err());
    }
}
