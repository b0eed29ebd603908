//! IPI calculation.

use serde::{Deserialize, Serialize};

use crate::error::EngineResult;
use crate::models::{AuditStep, CalculationBase, Rate, TaxAmount, TaxKind};

use super::TaxCalculationResult;

/// Legal reference for IPI.
pub const IPI_LEGAL_REF: &str = "Decreto 7.212/2010 (RIPI), art. 189";

/// Parameters for an IPI calculation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IpiParams {
    /// TIPI rate for the product. An absent rate means the product is not taxed.
    #[serde(default)]
    pub rate: Option<Rate>,
    /// The product is exempt or immune.
    #[serde(default)]
    pub exempt: bool,
}

/// Calculates IPI as `base x rate`, or zero for exempt products and products
/// without a rate (or with a zero rate).
///
/// # Legal Reference
///
/// - RIPI, art. 189: IPI is the base multiplied by the TIPI rate
pub fn calculate_ipi(
    base: &CalculationBase,
    params: &IpiParams,
    step_number: u32,
) -> EngineResult<TaxCalculationResult> {
    let taxable = base.effective_value();

    let (amount, reasoning) = match params.rate {
        _ if params.exempt => (TaxAmount::zero(taxable), "Product exempt from IPI".to_string()),
        None => (TaxAmount::zero(taxable), "No IPI rate for product".to_string()),
        Some(rate) if rate.is_zero() => (
            TaxAmount::zero(taxable),
            "IPI rate is zero for product".to_string(),
        ),
        Some(rate) => {
            let amount = TaxAmount::compute(taxable, rate);
            let reasoning = format!("IPI: {} x {} = {}", taxable, rate, amount.value());
            (amount, reasoning)
        }
    };

    let audit_step = AuditStep {
        step_number,
        rule_id: "ipi".to_string(),
        rule_name: "IPI".to_string(),
        legal_ref: IPI_LEGAL_REF.to_string(),
        input: serde_json::json!({
            "base": taxable.amount().normalize().to_string(),
            "rate": params.rate.map(|r| r.percentage().normalize().to_string()),
            "exempt": params.exempt,
        }),
        output: serde_json::json!({
            "value": amount.value().amount().to_string(),
        }),
        reasoning,
    };

    Ok(TaxCalculationResult {
        tax: TaxKind::Ipi,
        amount,
        audit_step,
    })
}
