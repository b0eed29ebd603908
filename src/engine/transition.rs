//! The engine for the 2026-2032 transition.
//!
//! Legacy taxes are charged at a share of their full value given by the
//! year's multiplier, while IBS and CBS are charged at the year's rates.

use rust_decimal::Decimal;

use crate::calculation::{
    CbsParams, CbsResult, IbsParams, IbsResult, IcmsParams, IcmsResult, IpiParams, IssParams,
    PisCofinsParams, SelectiveParams, TaxCalculationResult, calculate_cbs, calculate_cofins,
    calculate_ibs, calculate_icms, calculate_ipi, calculate_iss, calculate_pis,
    calculate_selective_tax,
};
use crate::error::{EngineError, EngineResult};
use crate::models::{
    AuditStep, CalculationBase, LegacyBreakdown, Money, NewSystemBreakdown, TaxAmount,
    TaxBreakdown, TaxKind,
};

use super::{EngineType, PeriodRates, TaxInput, TransitionSchedule, finish_breakdown, next_step};

/// First year the selective tax is charged.
pub const SELECTIVE_TAX_START_YEAR: i32 = 2027;

/// Computes legacy and new taxes side by side.
#[derive(Debug, Clone, Default)]
pub struct TransitionEngine {
    schedule: TransitionSchedule,
}

impl TransitionEngine {
    /// An engine over a custom schedule.
    pub fn with_schedule(schedule: TransitionSchedule) -> Self {
        Self { schedule }
    }

    /// The schedule row for `year`. Years outside the schedule fall back to
    /// its first row (2026 for the statutory schedule).
    pub fn rates_for_year(&self, year: i32) -> PeriodRates {
        self.schedule.lookup(year)
    }

    /// The schedule this engine reads.
    pub fn schedule(&self) -> &TransitionSchedule {
        &self.schedule
    }

    /// ICMS scaled by the year's ICMS/ISS multiplier.
    pub fn icms(
        &self,
        base: &CalculationBase,
        params: &IcmsParams,
        rates: &PeriodRates,
        step_number: u32,
    ) -> EngineResult<IcmsResult> {
        let result = calculate_icms(base, params, step_number)?;
        let factor = rates.icms_iss_multiplier;
        if factor == Decimal::ONE {
            return Ok(result);
        }

        let icms = result.icms.scaled(factor)?;
        let substitution = result
            .substitution
            .map(|st| st.scaled(factor))
            .transpose()?;
        let total = match &substitution {
            Some(st) => icms.value().checked_add(&st.value())?,
            None => icms.value(),
        };
        Ok(IcmsResult {
            icms,
            substitution,
            total,
            audit_step: annotate(result.audit_step, factor, rates.year, total),
        })
    }

    /// IPI at its full rate.
    pub fn ipi(
        &self,
        base: &CalculationBase,
        params: &IpiParams,
        step_number: u32,
    ) -> EngineResult<TaxCalculationResult> {
        calculate_ipi(base, params, step_number)
    }

    /// PIS, charged only while the PIS/COFINS multiplier is not zero.
    pub fn pis(
        &self,
        base: &CalculationBase,
        params: &PisCofinsParams,
        rates: &PeriodRates,
        step_number: u32,
    ) -> EngineResult<TaxCalculationResult> {
        ensure_contributions_in_force(TaxKind::Pis, rates)?;
        scale(calculate_pis(base, params, step_number)?, rates.pis_cofins_multiplier, rates.year)
    }

    /// COFINS, charged only while the PIS/COFINS multiplier is not zero.
    pub fn cofins(
        &self,
        base: &CalculationBase,
        params: &PisCofinsParams,
        rates: &PeriodRates,
        step_number: u32,
    ) -> EngineResult<TaxCalculationResult> {
        ensure_contributions_in_force(TaxKind::Cofins, rates)?;
        scale(calculate_cofins(base, params, step_number)?, rates.pis_cofins_multiplier, rates.year)
    }

    /// ISS scaled by the year's ICMS/ISS multiplier.
    ///
    /// The municipal rate band applies to the full rate, before scaling.
    pub fn iss(
        &self,
        base: &CalculationBase,
        params: &IssParams,
        rates: &PeriodRates,
        step_number: u32,
    ) -> EngineResult<TaxCalculationResult> {
        scale(calculate_iss(base, params, step_number)?, rates.icms_iss_multiplier, rates.year)
    }

    /// IBS.
    pub fn ibs(
        &self,
        base: &CalculationBase,
        params: &IbsParams,
        step_number: u32,
    ) -> EngineResult<IbsResult> {
        calculate_ibs(base, params, step_number)
    }

    /// CBS.
    pub fn cbs(
        &self,
        base: &CalculationBase,
        params: &CbsParams,
        step_number: u32,
    ) -> EngineResult<CbsResult> {
        calculate_cbs(base, params, step_number)
    }

    /// Selective tax, from 2027.
    pub fn selective(
        &self,
        base: &CalculationBase,
        params: &SelectiveParams,
        rates: &PeriodRates,
        step_number: u32,
    ) -> EngineResult<TaxCalculationResult> {
        if rates.year < SELECTIVE_TAX_START_YEAR {
            return Err(EngineError::unsupported(
                TaxKind::Is,
                format!("IS is charged from {}", SELECTIVE_TAX_START_YEAR),
            ));
        }
        calculate_selective_tax(base, params, step_number)
    }

    /// Computes both systems for the year in `rates`.
    ///
    /// PIS/COFINS are skipped once their multiplier reaches zero and IS is
    /// skipped before 2027, rather than failing the whole item.
    pub fn calculate_all(&self, input: &TaxInput, rates: &PeriodRates) -> EngineResult<TaxBreakdown> {
        let base = &input.base;
        let currency = base.currency();
        let mut legacy = LegacyBreakdown::empty(currency);
        let mut new_system = NewSystemBreakdown::empty(currency);
        let mut steps = Vec::new();

        if let Some(params) = &input.icms {
            let result = self.icms(base, params, rates, next_step(&steps))?;
            legacy.icms = Some(result.icms);
            legacy.icms_st = result.substitution;
            steps.push(result.audit_step);
        }

        if let Some(params) = &input.ipi {
            let result = self.ipi(base, params, next_step(&steps))?;
            legacy.ipi = Some(result.amount);
            steps.push(result.audit_step);
        }

        if let Some(params) = &input.pis_cofins {
            if !rates.pis_cofins_multiplier.is_zero() {
                let pis = self.pis(base, params, rates, next_step(&steps))?;
                legacy.pis = Some(pis.amount);
                steps.push(pis.audit_step);

                let cofins = self.cofins(base, params, rates, next_step(&steps))?;
                legacy.cofins = Some(cofins.amount);
                steps.push(cofins.audit_step);
            }
        }

        if let Some(params) = &input.iss {
            let result = self.iss(base, params, rates, next_step(&steps))?;
            legacy.iss = Some(result.amount);
            steps.push(result.audit_step);
        }

        if let Some(params) = &input.new_system {
            let ibs = self.ibs(base, &params.ibs_params(rates), next_step(&steps))?;
            steps.push(ibs.audit_step);
            let cbs = self.cbs(base, &params.cbs_params(rates), next_step(&steps))?;
            steps.push(cbs.audit_step);

            new_system.ibs_state = Some(ibs.state);
            new_system.ibs_municipal = Some(ibs.municipal);
            new_system.cbs = Some(cbs.amount);
            new_system.deferred = ibs.deferred.checked_add(&cbs.deferred)?;
        }

        if let Some(params) = &input.selective {
            if rates.year >= SELECTIVE_TAX_START_YEAR {
                let result = self.selective(base, params, rates, next_step(&steps))?;
                new_system.selective = Some(result.amount);
                steps.push(result.audit_step);
            }
        }

        finish_breakdown(EngineType::Transition, rates.year, legacy, new_system, steps)
    }
}

fn ensure_contributions_in_force(tax: TaxKind, rates: &PeriodRates) -> EngineResult<()> {
    if rates.pis_cofins_multiplier.is_zero() {
        return Err(EngineError::unsupported(
            tax,
            format!("{} extinct since 2027, use CBS", tax),
        ));
    }
    Ok(())
}

fn scale(
    result: TaxCalculationResult,
    factor: Decimal,
    year: i32,
) -> EngineResult<TaxCalculationResult> {
    if factor == Decimal::ONE {
        return Ok(result);
    }
    let amount: TaxAmount = result.amount.scaled(factor)?;
    Ok(TaxCalculationResult {
        tax: result.tax,
        audit_step: annotate(result.audit_step, factor, year, amount.value()),
        amount,
    })
}

fn annotate(mut step: AuditStep, factor: Decimal, year: i32, scaled: Money) -> AuditStep {
    if let Some(output) = step.output.as_object_mut() {
        output.insert(
            "transition_multiplier".to_string(),
            serde_json::json!(factor.normalize().to_string()),
        );
        output.insert(
            "scaled_value".to_string(),
            serde_json::json!(scaled.amount().to_string()),
        );
    }
    step.reasoning = format!(
        "{}; {} transition multiplier {} gives {}",
        step.reasoning,
        year,
        factor.normalize(),
        scaled
    );
    step
}
