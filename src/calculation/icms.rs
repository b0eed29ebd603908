//! ICMS calculation.
//!
//! Covers the normal regime (CST ICMS), the simplified regime (CSOSN),
//! base reduction and tax substitution (ICMS-ST).

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::{EngineError, EngineResult};
use crate::models::{
    AuditStep, CalculationBase, LegacySituationCode, Money, Rate, SimplifiedSituationCode,
    TaxAmount, round_money,
};

/// Legal reference for ICMS on own operations.
pub const ICMS_LEGAL_REF: &str = "LC 87/1996, art. 13";

/// Legal reference for ICMS collected by substitution.
pub const ICMS_ST_LEGAL_REF: &str = "LC 87/1996, art. 8";

/// Legal reference for ICMS under the simplified regime.
pub const ICMS_SIMPLIFIED_LEGAL_REF: &str = "LC 123/2006, art. 23";

/// The situation code that drives the ICMS treatment of an operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "regime", content = "code", rename_all = "snake_case")]
pub enum IcmsSituation {
    /// Normal regime, identified by a CST ICMS.
    Normal(LegacySituationCode),
    /// Simples Nacional, identified by a CSOSN.
    Simplified(SimplifiedSituationCode),
}

impl IcmsSituation {
    fn has_substitution(&self) -> bool {
        match self {
            IcmsSituation::Normal(cst) => cst.has_substitution(),
            IcmsSituation::Simplified(csosn) => csosn.has_substitution(),
        }
    }
}

/// Parameters for an ICMS calculation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IcmsParams {
    /// CST or CSOSN of the operation.
    pub situation: IcmsSituation,
    /// Internal or interstate rate. Required when the operation is taxed.
    #[serde(default)]
    pub rate: Option<Rate>,
    /// Base reduction percentage (CST 20 and 70).
    #[serde(default)]
    pub base_reduction: Option<Rate>,
    /// Added value margin (MVA) used to build the substitution base.
    #[serde(default)]
    pub mva: Option<Rate>,
    /// Rate applied to the substitution base.
    #[serde(default)]
    pub st_rate: Option<Rate>,
    /// Credit rate allowed to the buyer of a Simples Nacional supplier.
    #[serde(default)]
    pub credit_rate: Option<Rate>,
}

impl IcmsParams {
    /// Parameters for a normal-regime operation taxed at `rate`.
    pub fn normal(cst: LegacySituationCode, rate: Rate) -> Self {
        Self {
            situation: IcmsSituation::Normal(cst),
            rate: Some(rate),
            base_reduction: None,
            mva: None,
            st_rate: None,
            credit_rate: None,
        }
    }

    /// Parameters for a simplified-regime operation.
    pub fn simplified(csosn: SimplifiedSituationCode) -> Self {
        Self {
            situation: IcmsSituation::Simplified(csosn),
            rate: None,
            base_reduction: None,
            mva: None,
            st_rate: None,
            credit_rate: None,
        }
    }
}

/// The result of an ICMS calculation.
#[derive(Debug, Clone)]
pub struct IcmsResult {
    /// ICMS on the operation itself.
    pub icms: TaxAmount,
    /// ICMS collected in advance by substitution, when applicable.
    pub substitution: Option<TaxAmount>,
    /// Own ICMS plus substitution.
    pub total: Money,
    /// The audit step recording this calculation.
    pub audit_step: AuditStep,
}

/// Calculates ICMS for a calculation base.
///
/// The treatment follows the situation code:
/// - Exempt, not taxed, suspended and deferred codes yield zero.
/// - Codes with a reduced base (20, 70) require `base_reduction`.
/// - Codes with substitution (10, 30, 70 and CSOSN 201-203) add ICMS-ST
///   when both `mva` and `st_rate` are given:
///   `st_base = base x (1 + mva)`, `st_value = st_base x st_rate`.
/// - CSOSN codes that permit credit require `credit_rate`; other CSOSN codes
///   carry no own ICMS.
///
/// # Arguments
///
/// * `base` - The calculation base of the item
/// * `params` - Situation code and rates
/// * `step_number` - The step number for audit trail sequencing
///
/// # Errors
///
/// Returns [`EngineError::MissingParameter`] when a rate the situation code
/// requires is absent.
///
/// # Legal Reference
///
/// - LC 87/1996, art. 13: calculation base
/// - LC 87/1996, art. 8: substitution base with added value margin
/// - LC 123/2006, art. 23: credit transferred by Simples Nacional suppliers
///
/// # Examples
///
/// ```
/// use brtax_engine::calculation::{IcmsParams, calculate_icms};
/// use brtax_engine::models::{CalculationBase, LegacySituationCode, Rate};
/// use rust_decimal::Decimal;
/// use std::str::FromStr;
///
/// let base = CalculationBase::brl(Decimal::from(1000)).unwrap();
/// let params = IcmsParams::normal(
///     LegacySituationCode::from_str("000").unwrap(),
///     Rate::new(Decimal::from(18)).unwrap(),
/// );
/// let result = calculate_icms(&base, &params, 1).unwrap();
/// assert_eq!(result.total.amount(), Decimal::from_str("180.00").unwrap());
/// ```
pub fn calculate_icms(
    base: &CalculationBase,
    params: &IcmsParams,
    step_number: u32,
) -> EngineResult<IcmsResult> {
    let base = match params.base_reduction {
        Some(reduction) => base.reduced_by(reduction)?,
        None => *base,
    };
    let taxable = base.effective_value();

    let (icms, legal_ref, treatment) = match params.situation {
        IcmsSituation::Normal(cst) => normal_regime(&base, cst, params)?,
        IcmsSituation::Simplified(csosn) => simplified_regime(taxable, csosn, params)?,
    };

    let substitution = if params.situation.has_substitution() {
        substitution(taxable, params)
    } else {
        None
    };

    let total = match &substitution {
        Some(st) => icms.value().checked_add(&st.value())?,
        None => icms.value(),
    };

    let situation_code = match params.situation {
        IcmsSituation::Normal(cst) => cst.to_string(),
        IcmsSituation::Simplified(csosn) => csosn.to_string(),
    };

    let audit_step = AuditStep {
        step_number,
        rule_id: "icms".to_string(),
        rule_name: "ICMS".to_string(),
        legal_ref: legal_ref.to_string(),
        input: serde_json::json!({
            "base": base.original().amount().normalize().to_string(),
            "situation_code": situation_code,
            "rate": params.rate.map(|r| r.percentage().normalize().to_string()),
            "base_reduction": params.base_reduction.map(|r| r.percentage().normalize().to_string()),
            "mva": params.mva.map(|r| r.percentage().normalize().to_string()),
            "st_rate": params.st_rate.map(|r| r.percentage().normalize().to_string()),
        }),
        output: serde_json::json!({
            "taxable_base": taxable.amount().normalize().to_string(),
            "icms": icms.value().amount().to_string(),
            "icms_st": substitution.as_ref().map(|st| st.value().amount().to_string()),
            "total": total.amount().to_string(),
        }),
        reasoning: match &substitution {
            Some(st) => format!(
                "{}: own ICMS {} plus ICMS-ST {} on {} = {}",
                treatment,
                icms.value(),
                st.value(),
                st.base(),
                total
            ),
            None => format!("{}: ICMS = {}", treatment, total),
        },
    };

    Ok(IcmsResult {
        icms,
        substitution,
        total,
        audit_step,
    })
}

fn normal_regime(
    base: &CalculationBase,
    cst: LegacySituationCode,
    params: &IcmsParams,
) -> EngineResult<(TaxAmount, &'static str, String)> {
    let taxable = base.effective_value();

    if cst.is_exempt() || cst.is_deferred() {
        return Ok((
            TaxAmount::zero(taxable),
            ICMS_LEGAL_REF,
            format!("CST {} carries no ICMS", cst),
        ));
    }

    if cst.has_reduction() && base.reduction().is_none() {
        return Err(EngineError::missing(
            "base_reduction",
            format!("CST {} requires a base reduction", cst),
        ));
    }

    if !cst.taxes_own_operation() {
        return Ok((
            TaxAmount::zero(taxable),
            ICMS_ST_LEGAL_REF,
            format!("CST {} taxes only by substitution", cst),
        ));
    }

    let rate = params.rate.ok_or_else(|| {
        EngineError::missing("icms_rate", format!("CST {} is taxed and needs a rate", cst))
    })?;
    let icms = TaxAmount::compute(taxable, rate);
    let treatment = match base.reduction() {
        Some(reduction) => format!(
            "CST {}: {} reduced by {} x {}",
            cst,
            base.original(),
            reduction,
            rate
        ),
        None => format!("CST {}: {} x {}", cst, taxable, rate),
    };
    Ok((icms, ICMS_LEGAL_REF, treatment))
}

fn simplified_regime(
    taxable: Money,
    csosn: SimplifiedSituationCode,
    params: &IcmsParams,
) -> EngineResult<(TaxAmount, &'static str, String)> {
    if csosn.is_exempt() {
        return Ok((
            TaxAmount::zero(taxable),
            ICMS_SIMPLIFIED_LEGAL_REF,
            format!("CSOSN {} carries no ICMS", csosn),
        ));
    }

    if csosn.permits_credit() {
        let credit_rate = params.credit_rate.ok_or_else(|| {
            EngineError::missing(
                "credit_rate",
                format!("CSOSN {} permits credit and needs a credit rate", csosn),
            )
        })?;
        return Ok((
            TaxAmount::compute(taxable, credit_rate),
            ICMS_SIMPLIFIED_LEGAL_REF,
            format!("CSOSN {}: credit of {} x {}", csosn, taxable, credit_rate),
        ));
    }

    Ok((
        TaxAmount::zero(taxable),
        ICMS_SIMPLIFIED_LEGAL_REF,
        format!("CSOSN {}: ICMS collected within the unified payment", csosn),
    ))
}

fn substitution(taxable: Money, params: &IcmsParams) -> Option<TaxAmount> {
    let (mva, st_rate) = (params.mva?, params.st_rate?);
    let st_base = Money::new(
        round_money(taxable.amount() * (Decimal::ONE + mva.as_decimal())),
        taxable.currency(),
    );
    Some(TaxAmount::compute(st_base, st_rate))
}
