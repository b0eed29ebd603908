//! PIS and COFINS calculation.
//!
//! Both contributions share the situation code and the regime. Under the
//! cumulative regime (presumed profit) the rates are 0.65% and 3%; under the
//! non-cumulative regime (real profit) they are 1.65% and 7.6%. Codes 04 to
//! 09 carry no contribution.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::EngineResult;
use crate::models::{AuditStep, CalculationBase, PisCofinsSituationCode, Rate, TaxAmount, TaxKind};

use super::TaxCalculationResult;

/// Legal reference for the cumulative regime.
pub const CUMULATIVE_LEGAL_REF: &str = "Lei 9.718/1998";

/// Legal reference for non-cumulative PIS.
pub const NON_CUMULATIVE_PIS_LEGAL_REF: &str = "Lei 10.637/2002";

/// Legal reference for non-cumulative COFINS.
pub const NON_CUMULATIVE_COFINS_LEGAL_REF: &str = "Lei 10.833/2003";

/// The PIS/COFINS incidence regime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContributionRegime {
    /// Cumulative regime, no credits.
    Cumulative,
    /// Non-cumulative regime, with credits on inputs.
    NonCumulative,
}

impl ContributionRegime {
    /// The statutory PIS rate for the regime.
    pub fn default_pis_rate(&self) -> Rate {
        match self {
            ContributionRegime::Cumulative => Rate::statutory(Decimal::new(65, 2)),
            ContributionRegime::NonCumulative => Rate::statutory(Decimal::new(165, 2)),
        }
    }

    /// The statutory COFINS rate for the regime.
    pub fn default_cofins_rate(&self) -> Rate {
        match self {
            ContributionRegime::Cumulative => Rate::statutory(Decimal::from(3)),
            ContributionRegime::NonCumulative => Rate::statutory(Decimal::new(76, 1)),
        }
    }

    fn legal_ref(&self, tax: TaxKind) -> &'static str {
        match (self, tax) {
            (ContributionRegime::Cumulative, _) => CUMULATIVE_LEGAL_REF,
            (ContributionRegime::NonCumulative, TaxKind::Pis) => NON_CUMULATIVE_PIS_LEGAL_REF,
            (ContributionRegime::NonCumulative, _) => NON_CUMULATIVE_COFINS_LEGAL_REF,
        }
    }

    fn as_str(&self) -> &'static str {
        match self {
            ContributionRegime::Cumulative => "cumulative",
            ContributionRegime::NonCumulative => "non_cumulative",
        }
    }
}

/// Parameters shared by the PIS and COFINS calculations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PisCofinsParams {
    /// CST PIS/COFINS.
    pub situation_code: PisCofinsSituationCode,
    /// Incidence regime.
    pub regime: ContributionRegime,
    /// Overrides the statutory PIS rate.
    #[serde(default)]
    pub pis_rate: Option<Rate>,
    /// Overrides the statutory COFINS rate.
    #[serde(default)]
    pub cofins_rate: Option<Rate>,
}

impl PisCofinsParams {
    /// Parameters using the statutory rates of `regime`.
    pub fn new(situation_code: PisCofinsSituationCode, regime: ContributionRegime) -> Self {
        Self {
            situation_code,
            regime,
            pis_rate: None,
            cofins_rate: None,
        }
    }
}

/// Calculates PIS.
///
/// # Legal Reference
///
/// - Lei 9.718/1998: cumulative regime, 0.65%
/// - Lei 10.637/2002: non-cumulative regime, 1.65%
pub fn calculate_pis(
    base: &CalculationBase,
    params: &PisCofinsParams,
    step_number: u32,
) -> EngineResult<TaxCalculationResult> {
    let rate = params
        .pis_rate
        .unwrap_or_else(|| params.regime.default_pis_rate());
    Ok(contribution(TaxKind::Pis, base, params, rate, step_number))
}

/// Calculates COFINS.
///
/// # Legal Reference
///
/// - Lei 9.718/1998: cumulative regime, 3%
/// - Lei 10.833/2003: non-cumulative regime, 7.6%
pub fn calculate_cofins(
    base: &CalculationBase,
    params: &PisCofinsParams,
    step_number: u32,
) -> EngineResult<TaxCalculationResult> {
    let rate = params
        .cofins_rate
        .unwrap_or_else(|| params.regime.default_cofins_rate());
    Ok(contribution(TaxKind::Cofins, base, params, rate, step_number))
}

fn contribution(
    tax: TaxKind,
    base: &CalculationBase,
    params: &PisCofinsParams,
    rate: Rate,
    step_number: u32,
) -> TaxCalculationResult {
    let taxable = base.effective_value();
    let exempt = params.situation_code.is_exempt();

    let amount = if exempt {
        TaxAmount::zero(taxable)
    } else {
        TaxAmount::compute(taxable, rate)
    };

    let reasoning = if exempt {
        format!("CST {} carries no {}", params.situation_code, tax)
    } else {
        format!(
            "{} ({}): {} x {} = {}",
            tax,
            params.regime.as_str(),
            taxable,
            rate,
            amount.value()
        )
    };

    let audit_step = AuditStep {
        step_number,
        rule_id: tax.name().to_lowercase(),
        rule_name: tax.name().to_string(),
        legal_ref: params.regime.legal_ref(tax).to_string(),
        input: serde_json::json!({
            "base": taxable.amount().normalize().to_string(),
            "situation_code": params.situation_code.to_string(),
            "regime": params.regime.as_str(),
            "rate": rate.percentage().normalize().to_string(),
        }),
        output: serde_json::json!({
            "value": amount.value().amount().to_string(),
            "exempt": exempt,
        }),
        reasoning,
    };

    TaxCalculationResult {
        tax,
        amount,
        audit_step,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn params(code: &str, regime: ContributionRegime) -> PisCofinsParams {
        PisCofinsParams::new(PisCofinsSituationCode::from_str(code).unwrap(), regime)
    }

    fn base() -> CalculationBase {
        CalculationBase::brl(dec("1000")).unwrap()
    }

    #[test]
    fn test_non_cumulative_rates() {
        let p = params("01", ContributionRegime::NonCumulative);

        let pis = calculate_pis(&base(), &p, 1).unwrap();
        let cofins = calculate_cofins(&base(), &p, 2).unwrap();

        // 1000 * 1.65% = 16.50; 1000 * 7.6% = 76.00
        assert_eq!(pis.amount.value().amount(), dec("16.50"));
        assert_eq!(cofins.amount.value().amount(), dec("76.00"));
        assert_eq!(pis.audit_step.legal_ref, NON_CUMULATIVE_PIS_LEGAL_REF);
        assert_eq!(cofins.audit_step.legal_ref, NON_CUMULATIVE_COFINS_LEGAL_REF);
    }

    #[test]
    fn test_cumulative_rates() {
        let p = params("01", ContributionRegime::Cumulative);

        assert_eq!(
            calculate_pis(&base(), &p, 1).unwrap().amount.value().amount(),
            dec("6.50")
        );
        assert_eq!(
            calculate_cofins(&base(), &p, 1).unwrap().amount.value().amount(),
            dec("30.00")
        );
    }

    #[test]
    fn test_exemption_codes_yield_zero() {
        for code in ["04", "05", "06", "07", "08", "09"] {
            let p = params(code, ContributionRegime::NonCumulative);
            assert!(calculate_pis(&base(), &p, 1).unwrap().amount.is_zero());
            assert!(calculate_cofins(&base(), &p, 1).unwrap().amount.is_zero());
        }
    }

    #[test]
    fn test_rate_override() {
        let p = PisCofinsParams {
            pis_rate: Some(Rate::new(dec("2")).unwrap()),
            ..params("01", ContributionRegime::NonCumulative)
        };
        assert_eq!(
            calculate_pis(&base(), &p, 1).unwrap().amount.value().amount(),
            dec("20.00")
        );
    }

    #[test]
    fn test_statutory_rates() {
        assert_eq!(
            ContributionRegime::NonCumulative.default_pis_rate(),
            Rate::new(dec("1.65")).unwrap()
        );
        assert_eq!(
            ContributionRegime::Cumulative.default_cofins_rate(),
            Rate::new(dec("3")).unwrap()
        );
    }
}
