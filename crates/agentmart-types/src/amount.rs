//! Amount types with fixed-point arithmetic
//!
//! Agentmart prices and balances use fixed-point arithmetic with i128 minor
//! units so that wallet math is overflow-checked and never drifts the way
//! floating point does.

use crate::{MartError, Result};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

/// Currencies a listing can be priced in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Currency {
    /// US dollars (2 decimal places)
    Usd,
    /// Platform credits (no fractional units)
    Credit,
}

impl Currency {
    /// Number of decimal places for this currency
    pub fn decimals(&self) -> u8 {
        match self {
            Self::Usd => 2,
            Self::Credit => 0,
        }
    }

    /// Currency symbol for display
    pub fn symbol(&self) -> &'static str {
        match self {
            Self::Usd => "USD",
            Self::Credit => "CR",
        }
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.symbol())
    }
}

/// Fixed-point amount with currency
///
/// The value is stored in minor units (cents for USD, whole units for
/// credits). Arithmetic is currency-aware: mixing currencies is an error,
/// never a silent coercion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Amount {
    /// Raw value in minor units
    pub value: i128,
    /// The currency
    pub currency: Currency,
}

impl Amount {
    /// Create an amount from minor units
    pub fn new(value: i128, currency: Currency) -> Self {
        Self { value, currency }
    }

    /// Create a zero amount
    pub fn zero(currency: Currency) -> Self {
        Self { value: 0, currency }
    }

    /// Create an amount from a human-readable value (e.g. 100.50)
    pub fn from_human(human_value: f64, currency: Currency) -> Self {
        let multiplier = 10i128.pow(currency.decimals() as u32);
        let value = (human_value * multiplier as f64).round() as i128;
        Self { value, currency }
    }

    /// Get the human-readable value
    pub fn to_human(&self) -> f64 {
        let divisor = 10i128.pow(self.currency.decimals() as u32) as f64;
        self.value as f64 / divisor
    }

    /// Check if the amount is zero
    pub fn is_zero(&self) -> bool {
        self.value == 0
    }

    /// Check if the amount is strictly positive
    pub fn is_positive(&self) -> bool {
        self.value > 0
    }

    /// Checked addition (currencies must match)
    pub fn checked_add(self, other: Self) -> Result<Self> {
        self.require_same_currency(&other)?;
        let value = other
            .value
            .checked_add(self.value)
            .ok_or(MartError::AmountOverflow)?;
        Ok(Self { value, ..self })
    }

    /// Checked subtraction (currencies must match)
    pub fn checked_sub(self, other: Self) -> Result<Self> {
        self.require_same_currency(&other)?;
        let value = self
            .value
            .checked_sub(other.value)
            .ok_or(MartError::AmountUnderflow)?;
        Ok(Self { value, ..self })
    }

    fn require_same_currency(&self, other: &Self) -> Result<()> {
        if self.currency != other.currency {
            return Err(MartError::CurrencyMismatch {
                expected: self.currency.symbol().to_string(),
                actual: other.currency.symbol().to_string(),
            });
        }
        Ok(())
    }

    // Convenience constructors for USD

    /// Create a USD amount from a human value
    pub fn usd(value: f64) -> Self {
        Self::from_human(value, Currency::Usd)
    }

    /// Create a USD amount from cents
    pub fn usd_cents(value: i128) -> Self {
        Self::new(value, Currency::Usd)
    }

    /// Create a zero USD amount
    pub fn usd_zero() -> Self {
        Self::zero(Currency::Usd)
    }
}

impl Default for Amount {
    fn default() -> Self {
        Self::usd_zero()
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let precision = self.currency.decimals() as usize;
        write!(
            f,
            "{:.prec$} {}",
            self.to_human(),
            self.currency,
            prec = precision
        )
    }
}

impl PartialOrd for Amount {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        if self.currency != other.currency {
            return None;
        }
        self.value.partial_cmp(&other.value)
    }
}
