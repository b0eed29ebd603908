//! The calculation base (base de cálculo) of a tax.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::money::{Currency, Money, round_money};
use super::rate::{Rate, proportion};
use crate::error::{EngineError, EngineResult};

/// An original monetary value plus an optional reduction percentage.
///
/// The effective value is `original x (1 - reduction)`, rounded to the
/// cent. Neither value is ever negative.
///
/// # Examples
///
/// ```
/// use brtax_engine::models::{CalculationBase, Money, Rate};
/// use rust_decimal::Decimal;
///
/// let base = CalculationBase::with_reduction(
///     Money::brl(Decimal::from(1000)),
///     Rate::new(Decimal::from(40)).unwrap(),
/// ).unwrap();
/// assert_eq!(base.effective_value().amount(), Decimal::from(600));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "CalculationBaseInput")]
pub struct CalculationBase {
    original: Money,
    #[serde(skip_serializing_if = "Option::is_none")]
    reduction: Option<Rate>,
}

/// Wire form of a calculation base.
#[derive(Debug, Clone, Deserialize)]
struct CalculationBaseInput {
    original: Money,
    #[serde(default)]
    reduction: Option<Decimal>,
}

impl TryFrom<CalculationBaseInput> for CalculationBase {
    type Error = EngineError;

    fn try_from(input: CalculationBaseInput) -> Result<Self, Self::Error> {
        match input.reduction {
            Some(reduction) => {
                CalculationBase::with_reduction(input.original, proportion(reduction, "reduction")?)
            }
            None => CalculationBase::new(input.original),
        }
    }
}

impl CalculationBase {
    /// Creates a base without reduction.
    pub fn new(original: Money) -> EngineResult<Self> {
        if original.is_negative() {
            return Err(EngineError::validation(
                "base",
                format!("{} must not be negative", original.amount()),
            ));
        }
        Ok(Self {
            original,
            reduction: None,
        })
    }

    /// Creates a base reduced by `reduction` percent (at most 100%).
    pub fn with_reduction(original: Money, reduction: Rate) -> EngineResult<Self> {
        let reduction = proportion(reduction.percentage(), "reduction")?;
        let base = Self::new(original)?;
        Ok(Self {
            reduction: Some(reduction),
            ..base
        })
    }

    /// Convenience constructor for an amount in reais.
    pub fn brl(amount: Decimal) -> EngineResult<Self> {
        Self::new(Money::brl(amount))
    }

    /// Returns a copy of this base carrying a different reduction.
    pub fn reduced_by(&self, reduction: Rate) -> EngineResult<Self> {
        Self::with_reduction(self.original, reduction)
    }

    /// The value before any reduction.
    pub fn original(&self) -> Money {
        self.original
    }

    /// The reduction percentage, if any.
    pub fn reduction(&self) -> Option<Rate> {
        self.reduction
    }

    /// The currency of the base.
    pub fn currency(&self) -> Currency {
        self.original.currency()
    }

    /// The value taxes are applied to.
    pub fn effective_value(&self) -> Money {
        match self.reduction {
            Some(reduction) => Money::new(
                round_money(self.original.amount() * reduction.complement()),
                self.original.currency(),
            ),
            None => self.original,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn test_negative_base_rejected() {
        let result = CalculationBase::brl(dec("-0.01"));
        assert!(matches!(result, Err(EngineError::Validation { ref field, .. }) if field == "base"));
    }

    #[test]
    fn test_zero_base_allowed() {
        let base = CalculationBase::brl(Decimal::ZERO).unwrap();
        assert!(base.effective_value().is_zero());
    }

    #[test]
    fn test_without_reduction_effective_equals_original() {
        let base = CalculationBase::brl(dec("1234.56")).unwrap();
        assert_eq!(base.effective_value(), base.original());
        assert_eq!(base.reduction(), None);
    }

    #[test]
    fn test_reduction_is_applied_and_rounded() {
        let base = CalculationBase::brl(dec("333.33"))
            .unwrap()
            .reduced_by(Rate::new(dec("33.33")).unwrap())
            .unwrap();
        // 333.33 x 0.6667 = 222.231111
        assert_eq!(base.effective_value().amount(), dec("222.23"));
    }

    #[test]
    fn test_reduction_above_100_rejected() {
        let result = CalculationBase::with_reduction(
            Money::brl(dec("100")),
            Rate::new(dec("120")).unwrap(),
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_full_reduction_yields_zero() {
        let base = CalculationBase::with_reduction(
            Money::brl(dec("100")),
            Rate::new(dec("100")).unwrap(),
        )
        .unwrap();
        assert!(base.effective_value().is_zero());
    }

    #[test]
    fn test_deserialization_validates() {
        let base: CalculationBase = serde_json::from_str(
            r#"{"original": {"amount": "500", "currency": "BRL"}, "reduction": "20"}"#,
        )
        .unwrap();
        assert_eq!(base.effective_value().amount(), dec("400"));

        let negative = serde_json::from_str::<CalculationBase>(
            r#"{"original": {"amount": "-1"}}"#,
        );
        assert!(negative.is_err());
    }
}
