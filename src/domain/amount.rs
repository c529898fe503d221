//! Amount and balance types
//!
//! Domain primitives for monetary values. All money is counted in integer
//! minor currency units (paise for INR); invalid values cannot be
//! constructed, so arithmetic downstream never sees a bad input.

use rust_decimal::Decimal;
use std::fmt;

/// Decimal places between the minor unit and the display unit (paise -> rupees).
const MINOR_UNIT_SCALE: u32 = 2;

/// Amount represents a validated, positive monetary value in minor units.
///
/// # Invariants
/// - Value is always positive (> 0)
///
/// # Example
/// ```
/// use wallet_ledger::domain::Amount;
///
/// let amount = Amount::from_minor(10_000).unwrap();
/// assert_eq!(amount.value(), 10_000);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Amount(i64);

/// Errors that can occur when creating an Amount or Balance
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AmountError {
    #[error("Amount must be positive (got {0})")]
    NotPositive(i64),

    #[error("Balance must not be negative (got {0})")]
    Negative(i64),

    #[error("Balance arithmetic overflowed the 64-bit minor-unit range")]
    Overflow,
}

impl Amount {
    /// Create a new Amount from minor units with validation.
    ///
    /// # Errors
    /// - `AmountError::NotPositive` if value <= 0
    pub fn from_minor(value: i64) -> Result<Self, AmountError> {
        if value <= 0 {
            return Err(AmountError::NotPositive(value));
        }
        Ok(Self(value))
    }

    /// Get the value in minor units.
    pub fn value(&self) -> i64 {
        self.0
    }

    /// Convert to major units for display (e.g., 10050 paise -> 100.50).
    pub fn to_major(&self) -> Decimal {
        Decimal::new(self.0, MINOR_UNIT_SCALE)
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Balance represents a wallet balance in minor units.
/// Unlike Amount, Balance can be zero; it can never be negative.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Balance(i64);

impl Balance {
    /// Create a new balance (zero or positive)
    pub fn from_minor(value: i64) -> Result<Self, AmountError> {
        if value < 0 {
            return Err(AmountError::Negative(value));
        }
        Ok(Self(value))
    }

    /// Create a zero balance
    pub fn zero() -> Self {
        Self(0)
    }

    /// Get the value in minor units
    pub fn value(&self) -> i64 {
        self.0
    }

    /// Check if balance is sufficient to cover a debit
    pub fn is_sufficient_for(&self, amount: &Amount) -> bool {
        self.0 >= amount.value()
    }

    /// Add an amount to the balance
    pub fn credit(&self, amount: &Amount) -> Result<Balance, AmountError> {
        let new_value = self
            .0
            .checked_add(amount.value())
            .ok_or(AmountError::Overflow)?;
        Balance::from_minor(new_value)
    }

    /// Subtract an amount from the balance
    pub fn debit(&self, amount: &Amount) -> Result<Balance, AmountError> {
        Balance::from_minor(self.0 - amount.value())
    }

    /// Convert to major units for display
    pub fn to_major(&self) -> Decimal {
        Decimal::new(self.0, MINOR_UNIT_SCALE)
    }
}

impl fmt::Display for Balance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Default for Balance {
    fn default() -> Self {
        Self::zero()
    }
}
