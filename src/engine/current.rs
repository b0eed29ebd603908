//! The engine for the legacy system.

use crate::calculation::{
    IcmsParams, IcmsResult, IpiParams, IssParams, PisCofinsParams, TaxCalculationResult,
    calculate_cofins, calculate_icms, calculate_ipi, calculate_iss, calculate_pis,
};
use crate::error::EngineResult;
use crate::models::{CalculationBase, LegacyBreakdown, NewSystemBreakdown, TaxBreakdown};

use super::{EngineType, TaxInput, finish_breakdown, next_step};

/// Computes ICMS, IPI, PIS, COFINS and ISS at their full rates.
#[derive(Debug, Clone, Copy, Default)]
pub struct CurrentEngine;

impl CurrentEngine {
    /// ICMS.
    pub fn icms(
        &self,
        base: &CalculationBase,
        params: &IcmsParams,
        step_number: u32,
    ) -> EngineResult<IcmsResult> {
        calculate_icms(base, params, step_number)
    }

    /// IPI.
    pub fn ipi(
        &self,
        base: &CalculationBase,
        params: &IpiParams,
        step_number: u32,
    ) -> EngineResult<TaxCalculationResult> {
        calculate_ipi(base, params, step_number)
    }

    /// PIS.
    pub fn pis(
        &self,
        base: &CalculationBase,
        params: &PisCofinsParams,
        step_number: u32,
    ) -> EngineResult<TaxCalculationResult> {
        calculate_pis(base, params, step_number)
    }

    /// COFINS.
    pub fn cofins(
        &self,
        base: &CalculationBase,
        params: &PisCofinsParams,
        step_number: u32,
    ) -> EngineResult<TaxCalculationResult> {
        calculate_cofins(base, params, step_number)
    }

    /// ISS.
    pub fn iss(
        &self,
        base: &CalculationBase,
        params: &IssParams,
        step_number: u32,
    ) -> EngineResult<TaxCalculationResult> {
        calculate_iss(base, params, step_number)
    }

    /// Sums whichever of the five legacy taxes the input carries.
    ///
    /// New-system parameters are ignored: IBS, CBS and IS are not in force.
    pub fn calculate_all(&self, input: &TaxInput, year: i32) -> EngineResult<TaxBreakdown> {
        let base = &input.base;
        let mut legacy = LegacyBreakdown::empty(base.currency());
        let mut steps = Vec::new();

        if let Some(params) = &input.icms {
            let result = self.icms(base, params, next_step(&steps))?;
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
            let pis = self.pis(base, params, next_step(&steps))?;
            legacy.pis = Some(pis.amount);
            steps.push(pis.audit_step);

            let cofins = self.cofins(base, params, next_step(&steps))?;
            legacy.cofins = Some(cofins.amount);
            steps.push(cofins.audit_step);
        }

        if let Some(params) = &input.iss {
            let result = self.iss(base, params, next_step(&steps))?;
            legacy.iss = Some(result.amount);
            steps.push(result.audit_step);
        }

        finish_breakdown(
            EngineType::Current,
            year,
            legacy,
            NewSystemBreakdown::empty(base.currency()),
            steps,
        )
    }
}
