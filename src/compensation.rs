//! Compensation of legacy-system credits against new-system debits.
//!
//! During the transition a taxpayer accumulates credits and debits in both
//! systems. Within each system credits first offset debits of that system;
//! what is left may then cross systems, depending on the year and the
//! taxpayer's regime:
//!
//! | Years       | Regime             | Mode                  |
//! |-------------|--------------------|-----------------------|
//! | 2026 - 2032 | standard, presumed | [`CompensationMode::Bidirectional`] |
//! | 2033 - 2037 | standard, presumed | [`CompensationMode::LegacyCreditsOnly`] |
//! | otherwise   | any                | [`CompensationMode::None`] |
//!
//! Simplified-regime taxpayers never compensate across systems.
//!
//! # Legal Reference
//!
//! LC 214/2025, arts. 385 and 386.

use std::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::engine::TRANSITION_START_YEAR;
use crate::error::{EngineError, EngineResult};
use crate::models::{Money, UfCode, round_money};

/// Last year in which new-system credits may offset legacy debits.
pub const BIDIRECTIONAL_END_YEAR: i32 = 2032;

/// Last year in which legacy credits may be used at all.
pub const COMPENSATION_END_YEAR: i32 = 2037;

/// The taxpayer's income tax regime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaxpayerRegime {
    /// Actual profit (lucro real).
    Standard,
    /// Presumed profit (lucro presumido).
    PresumedProfit,
    /// Simples Nacional.
    Simplified,
}

/// Which cross-system offsets are allowed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompensationMode {
    /// Legacy credits offset new debits and new credits offset legacy debits.
    Bidirectional,
    /// Only legacy credits offset new debits.
    LegacyCreditsOnly,
    /// No cross-system offset.
    None,
}

impl fmt::Display for CompensationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CompensationMode::Bidirectional => "bidirectional",
            CompensationMode::LegacyCreditsOnly => "legacy_credits_only",
            CompensationMode::None => "none",
        };
        f.write_str(name)
    }
}

/// A taxpayer's position in both systems for one year.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompensationInput {
    /// Calendar year of the assessment.
    pub year: i32,
    /// Accumulated legacy-system credits.
    pub old_credits: Money,
    /// Legacy-system debits.
    pub old_debits: Money,
    /// Accumulated new-system credits.
    pub new_credits: Money,
    /// New-system debits.
    pub new_debits: Money,
    /// The taxpayer's state.
    pub uf: UfCode,
    /// The taxpayer's regime.
    pub regime: TaxpayerRegime,
}

/// The outcome of a compensation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompensationResult {
    /// The mode that applied.
    pub mode: CompensationMode,
    /// Amount offset across systems, in both directions.
    pub compensated: Money,
    /// Legacy credits carried forward.
    pub old_credit_remaining: Money,
    /// New-system credits carried forward.
    pub new_credit_remaining: Money,
    /// Legacy debit still payable.
    pub old_net_debit: Money,
    /// New-system debit still payable.
    pub new_net_debit: Money,
    /// `old_net_debit + new_net_debit`.
    pub total_due: Money,
}

/// The compensation mode for a year and regime.
pub fn compensation_mode(year: i32, regime: TaxpayerRegime) -> CompensationMode {
    if regime == TaxpayerRegime::Simplified {
        return CompensationMode::None;
    }
    if (TRANSITION_START_YEAR..=BIDIRECTIONAL_END_YEAR).contains(&year) {
        CompensationMode::Bidirectional
    } else if (BIDIRECTIONAL_END_YEAR + 1..=COMPENSATION_END_YEAR).contains(&year) {
        CompensationMode::LegacyCreditsOnly
    } else {
        CompensationMode::None
    }
}

/// Returns true when any cross-system offset is allowed.
///
/// ```
/// use brtax_engine::compensation::{TaxpayerRegime, is_eligible};
///
/// assert!(is_eligible(2030, TaxpayerRegime::Standard));
/// assert!(!is_eligible(2030, TaxpayerRegime::Simplified));
/// assert!(!is_eligible(2038, TaxpayerRegime::Standard));
/// ```
pub fn is_eligible(year: i32, regime: TaxpayerRegime) -> bool {
    compensation_mode(year, regime) != CompensationMode::None
}

/// Offsets `credit` against `debit`, returning `(used, credit left, debit left)`.
fn offset(credit: Money, debit: Money) -> EngineResult<(Money, Money, Money)> {
    let used = credit.checked_min(&debit)?;
    Ok((used, credit.checked_sub(&used)?, debit.checked_sub(&used)?))
}

fn ensure_non_negative(field: &str, value: &Money) -> EngineResult<()> {
    if value.is_negative() {
        return Err(EngineError::validation(field, "must not be negative"));
    }
    Ok(())
}

/// Nets credits and debits within and across the two systems.
///
/// # Errors
///
/// Fails with a validation error for a negative amount and with
/// [`EngineError::CurrencyMismatch`] when the four amounts do not share a
/// currency.
///
/// # Example
///
/// ```
/// use brtax_engine::compensation::{CompensationInput, TaxpayerRegime, compensate};
/// use brtax_engine::models::{Money, UfCode};
/// use rust_decimal::Decimal;
///
/// let result = compensate(&CompensationInput {
///     year: 2026,
///     old_credits: Money::brl(Decimal::from(1000)),
///     old_debits: Money::brl(Decimal::ZERO),
///     new_credits: Money::brl(Decimal::ZERO),
///     new_debits: Money::brl(Decimal::from(600)),
///     uf: "SP".parse::<UfCode>().unwrap(),
///     regime: TaxpayerRegime::Standard,
/// }).unwrap();
///
/// assert_eq!(result.compensated.amount(), Decimal::from(600));
/// assert_eq!(result.old_credit_remaining.amount(), Decimal::from(400));
/// assert!(result.new_net_debit.is_zero());
/// ```
pub fn compensate(input: &CompensationInput) -> EngineResult<CompensationResult> {
    ensure_non_negative("old_credits", &input.old_credits)?;
    ensure_non_negative("old_debits", &input.old_debits)?;
    ensure_non_negative("new_credits", &input.new_credits)?;
    ensure_non_negative("new_debits", &input.new_debits)?;

    let mode = compensation_mode(input.year, input.regime);

    // Within each system first.
    let (_, mut old_credit, mut old_debit) = offset(input.old_credits, input.old_debits)?;
    let (_, mut new_credit, mut new_debit) = offset(input.new_credits, input.new_debits)?;
    old_credit.ensure_same_currency(&new_credit)?;

    let mut compensated = Money::zero(old_credit.currency());

    if matches!(
        mode,
        CompensationMode::Bidirectional | CompensationMode::LegacyCreditsOnly
    ) {
        let (used, credit, debit) = offset(old_credit, new_debit)?;
        compensated = compensated.checked_add(&used)?;
        old_credit = credit;
        new_debit = debit;
    }

    if mode == CompensationMode::Bidirectional {
        let (used, credit, debit) = offset(new_credit, old_debit)?;
        compensated = compensated.checked_add(&used)?;
        new_credit = credit;
        old_debit = debit;
    }

    let total_due = old_debit.checked_add(&new_debit)?;

    info!(
        year = input.year,
        uf = %input.uf,
        mode = %mode,
        compensated = %compensated,
        total_due = %total_due,
        "compensation calculated"
    );

    Ok(CompensationResult {
        mode,
        compensated,
        old_credit_remaining: old_credit,
        new_credit_remaining: new_credit,
        old_net_debit: old_debit,
        new_net_debit: new_debit,
        total_due,
    })
}

/// Longest period a credit can be corrected over, in months.
pub const MAX_CORRECTION_MONTHS: i32 = 1200;

/// Corrects a carried credit by compounding `monthly_rate` (a percentage,
/// usually the SELIC benchmark) over `months`, rounded to the cent.
///
/// # Errors
///
/// Fails with a validation error for a negative amount or rate, a month count
/// outside `0..=MAX_CORRECTION_MONTHS`, or a corrected value too large to
/// represent.
///
/// ```
/// use brtax_engine::compensation::monetary_correction;
/// use brtax_engine::models::Money;
/// use rust_decimal::Decimal;
///
/// // 1000 at 1% a month for 2 months: 1000 x 1.01 x 1.01
/// let corrected = monetary_correction(Money::brl(Decimal::from(1000)), Decimal::ONE, 2).unwrap();
/// assert_eq!(corrected.amount(), Decimal::new(102010, 2));
/// ```
pub fn monetary_correction(amount: Money, monthly_rate: Decimal, months: i32) -> EngineResult<Money> {
    ensure_non_negative("amount", &amount)?;
    if monthly_rate < Decimal::ZERO {
        return Err(EngineError::validation("monthly_rate", "must not be negative"));
    }
    if !(0..=MAX_CORRECTION_MONTHS).contains(&months) {
        return Err(EngineError::validation(
            "months",
            format!("must be between 0 and {}", MAX_CORRECTION_MONTHS),
        ));
    }

    let factor = Decimal::ONE + monthly_rate / Decimal::ONE_HUNDRED;
    let mut value = amount.amount();
    for _ in 0..months {
        value = value
            .checked_mul(factor)
            .ok_or_else(|| EngineError::validation("months", "correction overflows"))?;
    }
    Ok(Money::new(round_money(value), amount.currency()))
}
