//! Tax engines.
//!
//! Three engines cover the reform timeline:
//!
//! - [`CurrentEngine`] - the legacy taxes (up to 2025)
//! - [`TransitionEngine`] - legacy and new taxes side by side (2026 to 2032)
//! - [`NewEngine`] - IBS, CBS and IS only (from 2033)
//!
//! [`TaxEngine`] is the closed set of engines. Callers obtain one from the
//! [`factory`](engine_for_date) and use it through the common methods below;
//! a legacy-tax method on the new engine fails with
//! [`EngineError::UnsupportedOperation`].

mod current;
mod factory;
mod new_system;
mod schedule;
mod transition;

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::calculation::{
    CbsParams, CbsResult, IbsParams, IbsResult, IcmsParams, IcmsResult, IpiParams, IssParams,
    PisCofinsParams, SelectiveParams, TaxCalculationResult,
};
use crate::error::{EngineError, EngineResult};
use crate::models::{AuditStep, CalculationBase, MunicipalityCode, Rate, TaxBreakdown, TaxKind, UfCode};

pub use current::CurrentEngine;
pub use factory::{
    MAX_SUPPORTED_YEAR, MIN_SUPPORTED_YEAR, describe_period, engine_for_date, engine_for_type,
    engine_type_for, engine_type_for_year, live_taxes, validate_date,
};
pub use new_system::NewEngine;
pub use schedule::{
    NEW_SYSTEM_START_YEAR, PeriodRates, RateProvider, StatutoryRates, TRANSITION_START_YEAR,
    TransitionSchedule,
};
pub use transition::{SELECTIVE_TAX_START_YEAR, TransitionEngine};

/// The kind of engine, selected by the calendar year of the operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EngineType {
    /// Legacy system only.
    Current,
    /// Both systems during the transition.
    Transition,
    /// New system only.
    New,
}

impl EngineType {
    /// Stable lower-case name.
    pub fn as_str(&self) -> &'static str {
        match self {
            EngineType::Current => "current",
            EngineType::Transition => "transition",
            EngineType::New => "new",
        }
    }
}

impl fmt::Display for EngineType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Destination and benefits applied to IBS and CBS.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewSystemParams {
    /// Destination state.
    pub uf: UfCode,
    /// Destination municipality.
    #[serde(default)]
    pub municipality: Option<MunicipalityCode>,
    /// Rate reduction percentage applied to IBS and CBS.
    #[serde(default)]
    pub reduction: Option<Rate>,
    /// Deferred percentage of IBS and CBS.
    #[serde(default)]
    pub deferral: Option<Rate>,
}

impl NewSystemParams {
    /// Parameters for a destination without benefits.
    pub fn new(uf: UfCode, municipality: Option<MunicipalityCode>) -> Self {
        Self {
            uf,
            municipality,
            reduction: None,
            deferral: None,
        }
    }

    /// IBS parameters at the given period rates.
    pub fn ibs_params(&self, rates: &PeriodRates) -> IbsParams {
        IbsParams {
            uf: self.uf,
            municipality: self.municipality.clone(),
            state_rate: rates.ibs_state,
            municipal_rate: rates.ibs_municipal,
            reduction: self.reduction,
            deferral: self.deferral,
        }
    }

    /// CBS parameters at the given period rates.
    pub fn cbs_params(&self, rates: &PeriodRates) -> CbsParams {
        CbsParams {
            rate: rates.cbs,
            reduction: self.reduction,
            deferral: self.deferral,
        }
    }
}

/// Everything `calculate_all` may need for one item.
///
/// Each tax is computed only when its parameters are present and the
/// engine's regime charges it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaxInput {
    /// The item's calculation base.
    pub base: CalculationBase,
    /// ICMS parameters.
    #[serde(default)]
    pub icms: Option<IcmsParams>,
    /// IPI parameters.
    #[serde(default)]
    pub ipi: Option<IpiParams>,
    /// PIS/COFINS parameters.
    #[serde(default)]
    pub pis_cofins: Option<PisCofinsParams>,
    /// ISS parameters.
    #[serde(default)]
    pub iss: Option<IssParams>,
    /// IBS/CBS destination and benefits.
    #[serde(default)]
    pub new_system: Option<NewSystemParams>,
    /// Selective tax parameters.
    #[serde(default)]
    pub selective: Option<SelectiveParams>,
}

impl TaxInput {
    /// An input with only a base; taxes are added with struct update syntax.
    pub fn new(base: CalculationBase) -> Self {
        Self {
            base,
            icms: None,
            ipi: None,
            pis_cofins: None,
            iss: None,
            new_system: None,
            selective: None,
        }
    }

    /// The legacy taxes this input asks for.
    pub fn requested_legacy_taxes(&self) -> Vec<TaxKind> {
        let mut taxes = Vec::new();
        if self.icms.is_some() {
            taxes.push(TaxKind::Icms);
        }
        if self.ipi.is_some() {
            taxes.push(TaxKind::Ipi);
        }
        if self.pis_cofins.is_some() {
            taxes.push(TaxKind::Pis);
            taxes.push(TaxKind::Cofins);
        }
        if self.iss.is_some() {
            taxes.push(TaxKind::Iss);
        }
        taxes
    }
}

/// One of the three tax engines.
///
/// Engines are stateless; the factory hands out shared `'static` instances.
#[derive(Debug, Clone)]
pub enum TaxEngine {
    /// Legacy system.
    Current(CurrentEngine),
    /// Transition system.
    Transition(TransitionEngine),
    /// New system.
    New(NewEngine),
}

impl TaxEngine {
    /// Which engine this is.
    pub fn engine_type(&self) -> EngineType {
        match self {
            TaxEngine::Current(_) => EngineType::Current,
            TaxEngine::Transition(_) => EngineType::Transition,
            TaxEngine::New(_) => EngineType::New,
        }
    }

    /// Returns true when the engine can compute `tax` in at least one year
    /// of its period.
    pub fn supports(&self, tax: TaxKind) -> bool {
        match self {
            TaxEngine::Current(_) => tax.is_legacy(),
            TaxEngine::Transition(_) => true,
            TaxEngine::New(_) => !tax.is_legacy(),
        }
    }

    /// ICMS for the given period.
    pub fn icms(
        &self,
        base: &CalculationBase,
        params: &IcmsParams,
        rates: &PeriodRates,
        step_number: u32,
    ) -> EngineResult<IcmsResult> {
        match self {
            TaxEngine::Current(engine) => engine.icms(base, params, step_number),
            TaxEngine::Transition(engine) => engine.icms(base, params, rates, step_number),
            TaxEngine::New(engine) => engine.reject_legacy(TaxKind::Icms),
        }
    }

    /// IPI. Never scaled by the transition.
    pub fn ipi(
        &self,
        base: &CalculationBase,
        params: &IpiParams,
        step_number: u32,
    ) -> EngineResult<TaxCalculationResult> {
        match self {
            TaxEngine::Current(engine) => engine.ipi(base, params, step_number),
            TaxEngine::Transition(engine) => engine.ipi(base, params, step_number),
            TaxEngine::New(engine) => engine.reject_legacy(TaxKind::Ipi),
        }
    }

    /// PIS for the given period.
    pub fn pis(
        &self,
        base: &CalculationBase,
        params: &PisCofinsParams,
        rates: &PeriodRates,
        step_number: u32,
    ) -> EngineResult<TaxCalculationResult> {
        match self {
            TaxEngine::Current(engine) => engine.pis(base, params, step_number),
            TaxEngine::Transition(engine) => engine.pis(base, params, rates, step_number),
            TaxEngine::New(engine) => engine.reject_legacy(TaxKind::Pis),
        }
    }

    /// COFINS for the given period.
    pub fn cofins(
        &self,
        base: &CalculationBase,
        params: &PisCofinsParams,
        rates: &PeriodRates,
        step_number: u32,
    ) -> EngineResult<TaxCalculationResult> {
        match self {
            TaxEngine::Current(engine) => engine.cofins(base, params, step_number),
            TaxEngine::Transition(engine) => engine.cofins(base, params, rates, step_number),
            TaxEngine::New(engine) => engine.reject_legacy(TaxKind::Cofins),
        }
    }

    /// ISS for the given period.
    pub fn iss(
        &self,
        base: &CalculationBase,
        params: &IssParams,
        rates: &PeriodRates,
        step_number: u32,
    ) -> EngineResult<TaxCalculationResult> {
        match self {
            TaxEngine::Current(engine) => engine.iss(base, params, step_number),
            TaxEngine::Transition(engine) => engine.iss(base, params, rates, step_number),
            TaxEngine::New(engine) => engine.reject_legacy(TaxKind::Iss),
        }
    }

    /// IBS. Fails on the current engine.
    pub fn ibs(
        &self,
        base: &CalculationBase,
        params: &IbsParams,
        step_number: u32,
    ) -> EngineResult<IbsResult> {
        match self {
            TaxEngine::Current(_) => Err(not_yet_in_force(TaxKind::Ibs)),
            TaxEngine::Transition(engine) => engine.ibs(base, params, step_number),
            TaxEngine::New(engine) => engine.ibs(base, params, step_number),
        }
    }

    /// CBS. Fails on the current engine.
    pub fn cbs(
        &self,
        base: &CalculationBase,
        params: &CbsParams,
        step_number: u32,
    ) -> EngineResult<CbsResult> {
        match self {
            TaxEngine::Current(_) => Err(not_yet_in_force(TaxKind::Cbs)),
            TaxEngine::Transition(engine) => engine.cbs(base, params, step_number),
            TaxEngine::New(engine) => engine.cbs(base, params, step_number),
        }
    }

    /// Selective tax. Fails on the current engine and before 2027.
    pub fn selective(
        &self,
        base: &CalculationBase,
        params: &SelectiveParams,
        rates: &PeriodRates,
        step_number: u32,
    ) -> EngineResult<TaxCalculationResult> {
        match self {
            TaxEngine::Current(_) => Err(not_yet_in_force(TaxKind::Is)),
            TaxEngine::Transition(engine) => engine.selective(base, params, rates, step_number),
            TaxEngine::New(engine) => engine.selective(base, params, step_number),
        }
    }

    /// Computes every tax the input asks for and the engine charges in the
    /// period, returning the per-tax breakdown and totals.
    pub fn calculate_all(&self, input: &TaxInput, rates: &PeriodRates) -> EngineResult<TaxBreakdown> {
        match self {
            TaxEngine::Current(engine) => engine.calculate_all(input, rates.year),
            TaxEngine::Transition(engine) => engine.calculate_all(input, rates),
            TaxEngine::New(engine) => engine.calculate_all(input, rates),
        }
    }
}

fn not_yet_in_force(tax: TaxKind) -> EngineError {
    EngineError::unsupported(
        tax,
        format!("{} is not in force before {}", tax, TRANSITION_START_YEAR),
    )
}

/// Step number for the next audit step.
pub(crate) fn next_step(steps: &[AuditStep]) -> u32 {
    steps.len() as u32 + 1
}

/// Builds a breakdown from filled-in parts, refreshing every total.
pub(crate) fn finish_breakdown(
    engine: EngineType,
    year: i32,
    mut legacy: crate::models::LegacyBreakdown,
    mut new_system: crate::models::NewSystemBreakdown,
    audit_steps: Vec<AuditStep>,
) -> EngineResult<TaxBreakdown> {
    legacy.refresh_total()?;
    new_system.refresh_total()?;
    let total = legacy.total.checked_add(&new_system.total)?;
    Ok(TaxBreakdown {
        engine,
        year,
        legacy,
        new_system,
        total,
        audit_steps,
    })
}
