//! Tax rates.
//!
//! A [`Rate`] is a percentage in `[0, 300]`. The new-system rates
//! [`IbsRate`] and [`CbsRate`] wrap a `Rate` and tighten the ceiling to
//! 100%. All of them are built only through validating constructors and
//! deserialize through the same checks.

use std::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::{EngineError, EngineResult};

/// Ceiling for a generic rate (percent).
pub const GENERIC_RATE_MAX: i64 = 300;

/// Ceiling for IBS and CBS rates (percent).
pub const NEW_SYSTEM_RATE_MAX: i64 = 100;

fn hundred() -> Decimal {
    Decimal::ONE_HUNDRED
}

/// A percentage rate such as 18% or 1.65%.
///
/// # Examples
///
/// ```
/// use brtax_engine::models::Rate;
/// use rust_decimal::Decimal;
/// use std::str::FromStr;
///
/// let rate = Rate::new(Decimal::from_str("7.6").unwrap()).unwrap();
/// assert_eq!(rate.as_decimal(), Decimal::from_str("0.076").unwrap());
/// assert_eq!(rate.apply(Decimal::from(1000)), Decimal::from_str("76.000").unwrap());
/// assert!(Rate::new(Decimal::from(-1)).is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "Decimal", into = "Decimal")]
pub struct Rate {
    percentage: Decimal,
}

impl Rate {
    /// Creates a rate from a percentage in `[0, 300]`.
    pub fn new(percentage: Decimal) -> EngineResult<Self> {
        Self::bounded(percentage, Decimal::from(GENERIC_RATE_MAX), "rate")
    }

    /// Creates a rate whose ceiling is `max` percent.
    pub(crate) fn bounded(percentage: Decimal, max: Decimal, field: &str) -> EngineResult<Self> {
        if percentage < Decimal::ZERO {
            return Err(EngineError::validation(
                field,
                format!("percentage {} must not be negative", percentage),
            ));
        }
        if percentage > max {
            return Err(EngineError::validation(
                field,
                format!("percentage {} exceeds the {}% ceiling", percentage, max),
            ));
        }
        Ok(Self {
            percentage: percentage.normalize(),
        })
    }

    /// The zero rate. Always valid.
    pub fn zero() -> Self {
        Self {
            percentage: Decimal::ZERO,
        }
    }

    /// A rate fixed by law and known to be in range.
    pub(crate) fn statutory(percentage: Decimal) -> Self {
        debug_assert!(percentage >= Decimal::ZERO && percentage <= Decimal::from(GENERIC_RATE_MAX));
        Self {
            percentage: percentage.normalize(),
        }
    }

    /// The percentage, e.g. `18` for 18%.
    pub fn percentage(&self) -> Decimal {
        self.percentage
    }

    /// The rate as a fraction, e.g. `0.18` for 18%.
    pub fn as_decimal(&self) -> Decimal {
        self.percentage / hundred()
    }

    /// Applies the rate to an amount without rounding.
    pub fn apply(&self, amount: Decimal) -> Decimal {
        amount * self.as_decimal()
    }

    /// Returns true for a 0% rate.
    pub fn is_zero(&self) -> bool {
        self.percentage.is_zero()
    }

    /// Returns this rate multiplied by `factor`.
    ///
    /// Used for the transition multipliers and proportional reductions,
    /// where `factor` lies in `[0, 1]`.
    pub fn scaled(&self, factor: Decimal) -> EngineResult<Self> {
        Self::new(self.percentage * factor)
    }

    /// Returns the complement `1 - rate` as a fraction; a 40% reduction keeps 0.6.
    pub fn complement(&self) -> Decimal {
        Decimal::ONE - self.as_decimal()
    }

    /// Sum of two rates, still bounded by the generic ceiling.
    pub fn checked_add(&self, other: &Rate) -> EngineResult<Self> {
        Self::new(self.percentage + other.percentage)
    }
}

impl TryFrom<Decimal> for Rate {
    type Error = EngineError;

    fn try_from(value: Decimal) -> Result<Self, Self::Error> {
        Rate::new(value)
    }
}

impl From<Rate> for Decimal {
    fn from(rate: Rate) -> Self {
        rate.percentage
    }
}

impl fmt::Display for Rate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}%", self.percentage)
    }
}

/// A rate valid only as a reduction or deferral share: `[0, 100]`.
pub(crate) fn proportion(percentage: Decimal, field: &str) -> EngineResult<Rate> {
    Rate::bounded(percentage, Decimal::from(NEW_SYSTEM_RATE_MAX), field)
}

macro_rules! new_system_rate {
    ($(#[$meta:meta])* $name:ident, $field:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(try_from = "Decimal", into = "Decimal")]
        pub struct $name(Rate);

        impl $name {
            /// Creates a rate from a percentage in `[0, 100]`.
            pub fn new(percentage: Decimal) -> EngineResult<Self> {
                Rate::bounded(percentage, Decimal::from(NEW_SYSTEM_RATE_MAX), $field).map(Self)
            }

            /// The zero rate. Always valid.
            pub fn zero() -> Self {
                Self(Rate::zero())
            }

            /// A rate fixed by law and known to be in range.
            pub(crate) fn statutory(percentage: Decimal) -> Self {
                debug_assert!(percentage <= Decimal::from(NEW_SYSTEM_RATE_MAX));
                Self(Rate::statutory(percentage))
            }

            /// The underlying generic rate.
            pub fn rate(&self) -> Rate {
                self.0
            }

            /// The percentage.
            pub fn percentage(&self) -> Decimal {
                self.0.percentage()
            }

            /// The rate as a fraction.
            pub fn as_decimal(&self) -> Decimal {
                self.0.as_decimal()
            }

            /// Applies the rate to an amount without rounding.
            pub fn apply(&self, amount: Decimal) -> Decimal {
                self.0.apply(amount)
            }

            /// Returns this rate multiplied by a factor in `[0, 1]`.
            pub fn scaled(&self, factor: Decimal) -> EngineResult<Self> {
                Self::new(self.0.percentage() * factor)
            }
        }

        impl TryFrom<Decimal> for $name {
            type Error = EngineError;

            fn try_from(value: Decimal) -> Result<Self, Self::Error> {
                $name::new(value)
            }
        }

        impl TryFrom<Rate> for $name {
            type Error = EngineError;

            fn try_from(value: Rate) -> Result<Self, Self::Error> {
                $name::new(value.percentage())
            }
        }

        impl From<$name> for Decimal {
            fn from(rate: $name) -> Self {
                rate.percentage()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                self.0.fmt(f)
            }
        }
    };
}

new_system_rate!(
    /// An IBS rate (state or municipal share), capped at 100%.
    IbsRate,
    "ibs_rate"
);

new_system_rate!(
    /// A CBS rate, capped at 100%.
    CbsRate,
    "cbs_rate"
);

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn test_generic_rate_bounds() {
        assert!(Rate::new(dec("0")).is_ok());
        assert!(Rate::new(dec("300")).is_ok());
        assert!(Rate::new(dec("300.01")).is_err());
        assert!(Rate::new(dec("-0.01")).is_err());
    }

    #[test]
    fn test_new_system_rates_cap_at_100() {
        assert!(IbsRate::new(dec("100")).is_ok());
        assert!(IbsRate::new(dec("100.5")).is_err());
        assert!(CbsRate::new(dec("8.8")).is_ok());
        assert!(CbsRate::new(dec("101")).is_err());
        assert!(CbsRate::new(dec("-1")).is_err());
    }

    #[test]
    fn test_zero_rate_is_valid_and_zero() {
        let zero = Rate::zero();
        assert!(zero.is_zero());
        assert_eq!(Rate::new(Decimal::ZERO).unwrap(), zero);
        assert_eq!(IbsRate::zero().percentage(), Decimal::ZERO);
        assert_eq!(CbsRate::zero().rate(), zero);
    }

    #[test]
    fn test_decimal_form_and_apply() {
        let rate = Rate::new(dec("1.65")).unwrap();
        assert_eq!(rate.as_decimal(), dec("0.0165"));
        assert_eq!(rate.apply(dec("1000")), dec("16.5"));
    }

    #[test]
    fn test_scaled_and_complement() {
        let rate = Rate::new(dec("18")).unwrap();
        assert_eq!(rate.scaled(dec("0.4")).unwrap().percentage(), dec("7.2"));
        assert_eq!(Rate::new(dec("40")).unwrap().complement(), dec("0.6"));
    }

    #[test]
    fn test_proportion_caps_at_100() {
        assert!(proportion(dec("100"), "reduction").is_ok());
        assert!(proportion(dec("150"), "reduction").is_err());
    }

    #[test]
    fn test_rate_deserialization_validates() {
        let ok: Rate = serde_json::from_str("\"18\"").unwrap();
        assert_eq!(ok.percentage(), dec("18"));
        assert!(serde_json::from_str::<Rate>("\"-5\"").is_err());
        assert!(serde_json::from_str::<IbsRate>("\"120\"").is_err());
    }

    #[test]
    fn test_statutory_matches_validated_constructor() {
        assert_eq!(Rate::statutory(dec("7.60")), Rate::new(dec("7.6")).unwrap());
        assert_eq!(IbsRate::statutory(dec("17.7")), IbsRate::new(dec("17.7")).unwrap());
    }

    #[test]
    fn test_display() {
        assert_eq!(Rate::new(dec("7.60")).unwrap().to_string(), "7.6%");
    }
}
