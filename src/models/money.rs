//! Monetary values.
//!
//! [`Money`] pairs a decimal amount with a [`Currency`]. Arithmetic between
//! two values is checked for matching currencies, and every tax value in
//! the engine is rounded to the cent with [`round_money`].

use std::fmt;
use std::str::FromStr;

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

use crate::error::{EngineError, EngineResult};

/// The tolerance used by every consistency check: one cent.
pub fn cent() -> Decimal {
    Decimal::new(1, 2)
}

/// Rounds a monetary amount to two decimal places, midpoint away from zero.
///
/// # Examples
///
/// ```
/// use brtax_engine::models::round_money;
/// use rust_decimal::Decimal;
/// use std::str::FromStr;
///
/// assert_eq!(round_money(Decimal::from_str("10.125").unwrap()), Decimal::from_str("10.13").unwrap());
/// ```
pub fn round_money(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// Currencies accepted on calculation inputs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Currency {
    /// Brazilian real.
    #[default]
    Brl,
    /// US dollar.
    Usd,
    /// Euro.
    Eur,
}

impl Currency {
    /// Returns the ISO-4217 code.
    pub fn code(&self) -> &'static str {
        match self {
            Currency::Brl => "BRL",
            Currency::Usd => "USD",
            Currency::Eur => "EUR",
        }
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Currency {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "BRL" => Ok(Currency::Brl),
            "USD" => Ok(Currency::Usd),
            "EUR" => Ok(Currency::Eur),
            other => Err(EngineError::validation(
                "currency",
                format!("unsupported currency code '{}'", other),
            )),
        }
    }
}

/// An amount of money in a specific currency.
///
/// `Money` may be negative (net positions are); the value objects built on
/// top of it decide whether a negative amount is acceptable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Money {
    amount: Decimal,
    #[serde(default)]
    currency: Currency,
}

impl Money {
    /// Creates a new amount.
    pub fn new(amount: Decimal, currency: Currency) -> Self {
        Self { amount, currency }
    }

    /// Creates an amount in Brazilian reais.
    pub fn brl(amount: Decimal) -> Self {
        Self::new(amount, Currency::Brl)
    }

    /// A zero amount in the given currency.
    pub fn zero(currency: Currency) -> Self {
        Self::new(Decimal::ZERO, currency)
    }

    /// The decimal amount.
    pub fn amount(&self) -> Decimal {
        self.amount
    }

    /// The currency.
    pub fn currency(&self) -> Currency {
        self.currency
    }

    /// Returns true when the amount is exactly zero.
    pub fn is_zero(&self) -> bool {
        self.amount.is_zero()
    }

    /// Returns true when the amount is below zero.
    pub fn is_negative(&self) -> bool {
        self.amount < Decimal::ZERO
    }

    /// Returns the amount rounded to the cent.
    pub fn rounded(&self) -> Self {
        Self::new(round_money(self.amount), self.currency)
    }

    /// Multiplies the amount by a plain factor (no rounding).
    pub fn times(&self, factor: Decimal) -> Self {
        Self::new(self.amount * factor, self.currency)
    }

    /// Fails with [`EngineError::CurrencyMismatch`] unless both values share a currency.
    pub fn ensure_same_currency(&self, other: &Money) -> EngineResult<()> {
        if self.currency != other.currency {
            return Err(EngineError::CurrencyMismatch {
                expected: self.currency,
                found: other.currency,
            });
        }
        Ok(())
    }

    /// Adds two amounts of the same currency.
    pub fn checked_add(&self, other: &Money) -> EngineResult<Money> {
        self.ensure_same_currency(other)?;
        Ok(Self::new(self.amount + other.amount, self.currency))
    }

    /// Subtracts an amount of the same currency.
    pub fn checked_sub(&self, other: &Money) -> EngineResult<Money> {
        self.ensure_same_currency(other)?;
        Ok(Self::new(self.amount - other.amount, self.currency))
    }

    /// Returns the smaller of two amounts of the same currency.
    pub fn checked_min(&self, other: &Money) -> EngineResult<Money> {
        self.ensure_same_currency(other)?;
        Ok(Self::new(self.amount.min(other.amount), self.currency))
    }

    /// Returns true when both amounts differ by at most one cent.
    pub fn approx_eq(&self, other: &Money) -> bool {
        self.currency == other.currency && (self.amount - other.amount).abs() <= cent()
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.currency, round_money(self.amount))
    }
}

/// Sums a sequence of amounts, all of which must use `currency`.
pub fn sum_money<'a, I>(currency: Currency, amounts: I) -> EngineResult<Money>
where
    I: IntoIterator<Item = &'a Money>,
{
    amounts
        .into_iter()
        .try_fold(Money::zero(currency), |acc, m| acc.checked_add(m))
}
