//! IBS calculation.
//!
//! IBS is split into a state share, due to the destination state, and a
//! municipal share, due to the destination municipality.

use serde::{Deserialize, Serialize};

use crate::error::EngineResult;
use crate::models::{
    AuditStep, CalculationBase, IbsRate, Money, MunicipalityCode, Rate, TaxAmount, UfCode,
    proportion, round_money,
};

/// Legal reference for IBS.
pub const IBS_LEGAL_REF: &str = "LC 214/2025, art. 4 and 14";

/// Parameters for an IBS calculation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IbsParams {
    /// Destination state.
    pub uf: UfCode,
    /// Destination municipality, when known.
    #[serde(default)]
    pub municipality: Option<MunicipalityCode>,
    /// State share rate.
    pub state_rate: IbsRate,
    /// Municipal share rate.
    pub municipal_rate: IbsRate,
    /// Rate reduction percentage for favoured regimes.
    #[serde(default)]
    pub reduction: Option<Rate>,
    /// Percentage of the tax whose payment is deferred.
    #[serde(default)]
    pub deferral: Option<Rate>,
}

/// The result of an IBS calculation.
#[derive(Debug, Clone)]
pub struct IbsResult {
    /// State share.
    pub state: TaxAmount,
    /// Municipal share.
    pub municipal: TaxAmount,
    /// State plus municipal share.
    pub total: Money,
    /// Portion of `total` whose payment is deferred.
    pub deferred: Money,
    /// `total` minus `deferred`.
    pub due: Money,
    /// The audit step recording this calculation.
    pub audit_step: AuditStep,
}

/// Calculates both IBS shares.
///
/// A reduction of `r` percent multiplies each rate by `1 - r`. A deferral of
/// `d` percent moves `total x d` out of the amount due now.
///
/// The reduction is carried entirely by the rate: each share reports the full
/// effective base with the reduced rate. `base x (1 - r) x rate` and
/// `base x (rate x (1 - r))` give the same value.
///
/// # Errors
///
/// Returns [`crate::error::EngineError::Validation`] when the reduction or
/// deferral exceeds 100%.
///
/// # Legal Reference
///
/// - LC 214/2025, art. 14: the rate is the sum of the state and municipal rates
/// - LC 214/2025, art. 128: reduced-rate regimes
pub fn calculate_ibs(
    base: &CalculationBase,
    params: &IbsParams,
    step_number: u32,
) -> EngineResult<IbsResult> {
    let taxable = base.effective_value();

    let keep = match params.reduction {
        Some(reduction) => proportion(reduction.percentage(), "ibs_reduction")?.complement(),
        None => rust_decimal::Decimal::ONE,
    };
    let state_rate = params.state_rate.scaled(keep)?;
    let municipal_rate = params.municipal_rate.scaled(keep)?;

    let state = TaxAmount::compute(taxable, state_rate.rate());
    let municipal = TaxAmount::compute(taxable, municipal_rate.rate());
    let total = state.value().checked_add(&municipal.value())?;

    let deferred = match params.deferral {
        Some(deferral) => {
            let share = proportion(deferral.percentage(), "ibs_deferral")?;
            Money::new(round_money(share.apply(total.amount())), total.currency())
        }
        None => Money::zero(total.currency()),
    };
    let due = total.checked_sub(&deferred)?;

    let audit_step = AuditStep {
        step_number,
        rule_id: "ibs".to_string(),
        rule_name: "IBS".to_string(),
        legal_ref: IBS_LEGAL_REF.to_string(),
        input: serde_json::json!({
            "base": taxable.amount().normalize().to_string(),
            "uf": params.uf.abbreviation(),
            "municipality": params.municipality.as_ref().map(|m| m.as_str().to_string()),
            "state_rate": params.state_rate.percentage().normalize().to_string(),
            "municipal_rate": params.municipal_rate.percentage().normalize().to_string(),
            "reduction": params.reduction.map(|r| r.percentage().normalize().to_string()),
            "deferral": params.deferral.map(|r| r.percentage().normalize().to_string()),
        }),
        output: serde_json::json!({
            "state": state.value().amount().to_string(),
            "municipal": municipal.value().amount().to_string(),
            "total": total.amount().to_string(),
            "deferred": deferred.amount().to_string(),
            "due": due.amount().to_string(),
        }),
        reasoning: format!(
            "IBS for {}: state {} x {} = {}, municipal {} x {} = {}, due {}",
            params.uf,
            taxable,
            state_rate,
            state.value(),
            taxable,
            municipal_rate,
            municipal.value(),
            due
        ),
    };

    Ok(IbsResult {
        state,
        municipal,
        total,
        deferred,
        due,
        audit_step,
    })
}
