//! Computed tax amounts.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::money::{Money, cent, round_money};
use super::rate::Rate;
use crate::error::{EngineError, EngineResult};

/// A computed tax: value, rate and the base it was applied to.
///
/// Every `TaxAmount` satisfies `|value - base x rate| <= 0.01`. Amounts
/// built with [`TaxAmount::compute`] satisfy it by construction; amounts
/// built from a pre-computed value go through [`TaxAmount::from_parts`],
/// which checks it.
///
/// # Examples
///
/// ```
/// use brtax_engine::models::{Money, Rate, TaxAmount};
/// use rust_decimal::Decimal;
/// use std::str::FromStr;
///
/// let base = Money::brl(Decimal::from(1000));
/// let rate = Rate::new(Decimal::from_str("1.65").unwrap()).unwrap();
/// let pis = TaxAmount::compute(base, rate);
/// assert_eq!(pis.value().amount(), Decimal::from_str("16.50").unwrap());
///
/// let wrong = TaxAmount::from_parts(Money::brl(Decimal::from(17)), base, rate);
/// assert!(wrong.is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "TaxAmountParts")]
pub struct TaxAmount {
    value: Money,
    rate: Rate,
    base: Money,
}

#[derive(Debug, Clone, Deserialize)]
struct TaxAmountParts {
    value: Money,
    rate: Rate,
    base: Money,
}

impl TryFrom<TaxAmountParts> for TaxAmount {
    type Error = EngineError;

    fn try_from(parts: TaxAmountParts) -> Result<Self, Self::Error> {
        TaxAmount::from_parts(parts.value, parts.base, parts.rate)
    }
}

impl TaxAmount {
    /// Computes `base x rate`, rounded to the cent.
    pub fn compute(base: Money, rate: Rate) -> Self {
        let value = Money::new(round_money(rate.apply(base.amount())), base.currency());
        Self { value, rate, base }
    }

    /// Wraps a pre-computed value after checking it against `base x rate`.
    pub fn from_parts(value: Money, base: Money, rate: Rate) -> EngineResult<Self> {
        base.ensure_same_currency(&value)?;
        let expected = rate.apply(base.amount());
        if (value.amount() - expected).abs() > cent() {
            return Err(EngineError::Consistency {
                field: "tax_value".to_string(),
                expected: round_money(expected),
                actual: value.amount(),
            });
        }
        Ok(Self { value, rate, base })
    }

    /// A zero tax over `base` (exemptions, suspensions, deferrals).
    pub fn zero(base: Money) -> Self {
        Self {
            value: Money::zero(base.currency()),
            rate: Rate::zero(),
            base,
        }
    }

    /// The tax value.
    pub fn value(&self) -> Money {
        self.value
    }

    /// The rate that produced the value.
    pub fn rate(&self) -> Rate {
        self.rate
    }

    /// The base the rate was applied to.
    pub fn base(&self) -> Money {
        self.base
    }

    /// Returns true when no tax is due.
    pub fn is_zero(&self) -> bool {
        self.value.is_zero()
    }

    /// Recomputes the amount with the rate multiplied by `factor`.
    pub fn scaled(&self, factor: Decimal) -> EngineResult<Self> {
        Ok(Self::compute(self.base, self.rate.scaled(factor)?))
    }

    /// The difference between the value and `base x rate`.
    pub fn deviation(&self) -> Decimal {
        (self.value.amount() - self.rate.apply(self.base.amount())).abs()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Currency;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn rate(s: &str) -> Rate {
        Rate::new(dec(s)).unwrap()
    }

    #[test]
    fn test_compute_rounds_to_cent() {
        let amount = TaxAmount::compute(Money::brl(dec("99.99")), rate("7.6"));
        // 99.99 x 0.076 = 7.59924
        assert_eq!(amount.value().amount(), dec("7.60"));
        assert!(amount.deviation() <= cent());
    }

    #[test]
    fn test_from_parts_accepts_one_cent_difference() {
        let amount = TaxAmount::from_parts(Money::brl(dec("180.01")), Money::brl(dec("1000")), rate("18"));
        assert!(amount.is_ok());
    }

    #[test]
    fn test_from_parts_rejects_larger_difference() {
        let result = TaxAmount::from_parts(Money::brl(dec("180.02")), Money::brl(dec("1000")), rate("18"));
        match result {
            Err(EngineError::Consistency { expected, actual, .. }) => {
                assert_eq!(expected, dec("180.00"));
                assert_eq!(actual, dec("180.02"));
            }
            other => panic!("Expected Consistency error, got {:?}", other),
        }
    }

    #[test]
    fn test_from_parts_rejects_currency_mismatch() {
        let result = TaxAmount::from_parts(
            Money::new(dec("18"), Currency::Usd),
            Money::brl(dec("100")),
            rate("18"),
        );
        assert!(matches!(result, Err(EngineError::CurrencyMismatch { .. })));
    }

    #[test]
    fn test_zero_amount_is_consistent() {
        let zero = TaxAmount::zero(Money::brl(dec("1000")));
        assert!(zero.is_zero());
        assert!(zero.rate().is_zero());
        assert_eq!(zero.deviation(), Decimal::ZERO);
    }

    #[test]
    fn test_scaled_keeps_invariant() {
        let icms = TaxAmount::compute(Money::brl(dec("1000")), rate("18"));
        let scaled = icms.scaled(dec("0.6")).unwrap();
        assert_eq!(scaled.value().amount(), dec("108.00"));
        assert_eq!(scaled.rate().percentage(), dec("10.8"));
    }

    #[test]
    fn test_deserialization_checks_consistency() {
        let bad = r#"{
            "value": {"amount": "50.00", "currency": "BRL"},
            "rate": "18",
            "base": {"amount": "100.00", "currency": "BRL"}
        }"#;
        assert!(serde_json::from_str::<TaxAmount>(bad).is_err());
    }
}
