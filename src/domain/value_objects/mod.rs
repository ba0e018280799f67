//! Value objects shared across the storefront domain.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Currency every deployment runs in today. Carried on each amount so a
/// second currency later is an additive change.
pub const DEFAULT_CURRENCY: &str = "RWF";

/// Monetary amount in integer minor units of a single currency.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Money {
    amount: i64,
    currency: String,
}

impl Money {
    pub fn new(amount: i64, currency: &str) -> Self {
        Self { amount, currency: currency.to_string() }
    }

    pub fn rwf(amount: i64) -> Self {
        Self::new(amount, DEFAULT_CURRENCY)
    }

    pub fn zero(currency: &str) -> Self {
        Self::new(0, currency)
    }

    pub fn amount(&self) -> i64 {
        self.amount
    }

    pub fn currency(&self) -> &str {
        &self.currency
    }

    pub fn is_negative(&self) -> bool {
        self.amount < 0
    }

    pub fn add(&self, other: &Money) -> Result<Money, MoneyError> {
        if self.currency != other.currency {
            return Err(MoneyError::CurrencyMismatch);
        }
        Ok(Money::new(self.amount + other.amount, &self.currency))
    }
}

impl Default for Money {
    fn default() -> Self {
        Self::zero(DEFAULT_CURRENCY)
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.amount, self.currency)
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum MoneyError {
    #[error("currency mismatch")]
    CurrencyMismatch,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_money_add() {
        let a = Money::rwf(100);
        let b = Money::rwf(50);
        assert_eq!(a.add(&b).unwrap().amount(), 150);
    }

    #[test]
    fn test_mixed_currency_rejected() {
        let a = Money::rwf(100);
        let b = Money::new(50, "USD");
        assert_eq!(a.add(&b), Err(MoneyError::CurrencyMismatch));
    }
}
