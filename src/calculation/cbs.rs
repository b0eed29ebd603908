//! CBS calculation.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::EngineResult;
use crate::models::{AuditStep, CalculationBase, CbsRate, Money, Rate, TaxAmount, proportion, round_money};

/// Legal reference for CBS.
pub const CBS_LEGAL_REF: &str = "LC 214/2025, art. 4 and 15";

/// Parameters for a CBS calculation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CbsParams {
    /// CBS rate.
    pub rate: CbsRate,
    /// Rate reduction percentage for favoured regimes.
    #[serde(default)]
    pub reduction: Option<Rate>,
    /// Percentage of the tax whose payment is deferred.
    #[serde(default)]
    pub deferral: Option<Rate>,
}

/// The result of a CBS calculation.
#[derive(Debug, Clone)]
pub struct CbsResult {
    /// The CBS amount.
    pub amount: TaxAmount,
    /// Portion whose payment is deferred.
    pub deferred: Money,
    /// Amount due now.
    pub due: Money,
    /// The audit step recording this calculation.
    pub audit_step: AuditStep,
}

/// Calculates CBS, with the same reduction and deferral rules as IBS. The
/// reduction scales the rate and the reported base stays whole.
///
/// # Legal Reference
///
/// - LC 214/2025, art. 15: CBS rate
pub fn calculate_cbs(
    base: &CalculationBase,
    params: &CbsParams,
    step_number: u32,
) -> EngineResult<CbsResult> {
    let taxable = base.effective_value();

    let keep = match params.reduction {
        Some(reduction) => proportion(reduction.percentage(), "cbs_reduction")?.complement(),
        None => Decimal::ONE,
    };
    let rate = params.rate.scaled(keep)?;
    let amount = TaxAmount::compute(taxable, rate.rate());

    let deferred = match params.deferral {
        Some(deferral) => {
            let share = proportion(deferral.percentage(), "cbs_deferral")?;
            Money::new(
                round_money(share.apply(amount.value().amount())),
                amount.value().currency(),
            )
        }
        None => Money::zero(taxable.currency()),
    };
    let due = amount.value().checked_sub(&deferred)?;

    let audit_step = AuditStep {
        step_number,
        rule_id: "cbs".to_string(),
        rule_name: "CBS".to_string(),
        legal_ref: CBS_LEGAL_REF.to_string(),
        input: serde_json::json!({
            "base": taxable.amount().normalize().to_string(),
            "rate": params.rate.percentage().normalize().to_string(),
            "reduction": params.reduction.map(|r| r.percentage().normalize().to_string()),
            "deferral": params.deferral.map(|r| r.percentage().normalize().to_string()),
        }),
        output: serde_json::json!({
            "value": amount.value().amount().to_string(),
            "deferred": deferred.amount().to_string(),
            "due": due.amount().to_string(),
        }),
        reasoning: format!("CBS: {} x {} = {}", taxable, rate, amount.value()),
    };

    Ok(CbsResult {
        amount,
        deferred,
        due,
        audit_step,
    })
}
