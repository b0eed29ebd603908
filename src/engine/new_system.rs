//! The engine for the new system, in force from 2033.

use crate::calculation::{
    CbsParams, CbsResult, IbsParams, IbsResult, SelectiveParams, TaxCalculationResult,
    calculate_cbs, calculate_ibs, calculate_selective_tax,
};
use crate::error::{EngineError, EngineResult};
use crate::models::{
    CalculationBase, DeferralRecord, IbsRate, CbsRate, LegacyBreakdown, NewSystemBreakdown,
    NewSystemSituationCode, NewSystemTaxGroup, ReductionRecord, TaxBreakdown,
    TaxClassificationCode, TaxGroupComponents, TaxKind,
};

use super::{
    EngineType, NEW_SYSTEM_START_YEAR, NewSystemParams, PeriodRates, TaxInput, finish_breakdown,
    next_step,
};

/// Computes IBS, CBS and IS. Every legacy tax is rejected.
#[derive(Debug, Clone, Copy, Default)]
pub struct NewEngine;

impl NewEngine {
    /// Fails for a legacy tax, naming the tax that replaced it.
    pub fn reject_legacy<T>(&self, tax: TaxKind) -> EngineResult<T> {
        let message = match tax.successor() {
            Some(successor) => format!(
                "{} extinct since {}, use {}",
                tax, NEW_SYSTEM_START_YEAR, successor
            ),
            None => format!("{} is not a legacy tax", tax),
        };
        Err(EngineError::unsupported(tax, message))
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

    /// Selective tax.
    pub fn selective(
        &self,
        base: &CalculationBase,
        params: &SelectiveParams,
        step_number: u32,
    ) -> EngineResult<TaxCalculationResult> {
        calculate_selective_tax(base, params, step_number)
    }

    /// Computes IBS, CBS and IS for the year in `rates`.
    ///
    /// # Errors
    ///
    /// Fails with [`EngineError::UnsupportedOperation`] when the input asks
    /// for any legacy tax.
    pub fn calculate_all(&self, input: &TaxInput, rates: &PeriodRates) -> EngineResult<TaxBreakdown> {
        if let Some(tax) = input.requested_legacy_taxes().into_iter().next() {
            return self.reject_legacy(tax);
        }

        let base = &input.base;
        let currency = base.currency();
        let mut new_system = NewSystemBreakdown::empty(currency);
        let mut steps = Vec::new();

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
            let result = self.selective(base, params, next_step(&steps))?;
            new_system.selective = Some(result.amount);
            steps.push(result.audit_step);
        }

        finish_breakdown(
            EngineType::New,
            rates.year,
            LegacyBreakdown::empty(currency),
            new_system,
            steps,
        )
    }

    /// Assembles the IBS/CBS group of an electronic fiscal document from
    /// this engine's results.
    ///
    /// `params` must be the parameters the results were computed with; its
    /// reduction and deferral are recorded in the group.
    pub fn build_tax_group(
        &self,
        situation_code: NewSystemSituationCode,
        classification_code: TaxClassificationCode,
        params: &NewSystemParams,
        ibs: &IbsResult,
        cbs: &CbsResult,
    ) -> EngineResult<NewSystemTaxGroup> {
        let base = ibs.state.base();
        base.ensure_same_currency(&cbs.amount.base())?;
        if base != cbs.amount.base() {
            return Err(EngineError::Consistency {
                field: "cbs_base".to_string(),
                expected: base.amount(),
                actual: cbs.amount.base().amount(),
            });
        }

        let deferral = params.deferral.map(|rate| DeferralRecord {
            rate,
            ibs_value: ibs.deferred,
            cbs_value: cbs.deferred,
        });
        let reduction = params.reduction.map(|rate| ReductionRecord {
            ibs_reduction: rate,
            cbs_reduction: rate,
        });

        NewSystemTaxGroup::new(TaxGroupComponents {
            situation_code,
            classification_code,
            base,
            ibs_state_rate: IbsRate::try_from(ibs.state.rate())?,
            ibs_state_value: ibs.state.value(),
            ibs_municipal_rate: IbsRate::try_from(ibs.municipal.rate())?,
            ibs_municipal_value: ibs.municipal.value(),
            cbs_rate: CbsRate::try_from(cbs.amount.rate())?,
            cbs_value: cbs.amount.value(),
            deferral,
            refund: None,
            reduction,
            presumed_credit: None,
            government_purchase: None,
        })
    }
}
