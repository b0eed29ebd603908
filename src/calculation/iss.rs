//! ISS calculation.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::{EngineError, EngineResult};
use crate::models::{AuditStep, CalculationBase, MunicipalityCode, Rate, ServiceCode, TaxAmount, TaxKind};

use super::TaxCalculationResult;

/// Legal reference for the ISS rate band.
pub const ISS_LEGAL_REF: &str = "LC 116/2003, art. 8 and 8-A";

/// Lowest ISS rate a municipality may charge (percent).
pub const ISS_MIN_RATE: i64 = 2;

/// Highest ISS rate a municipality may charge (percent).
pub const ISS_MAX_RATE: i64 = 5;

/// Parameters for an ISS calculation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IssParams {
    /// Municipal rate, between 2% and 5%.
    pub rate: Rate,
    /// Municipality where the tax is due.
    pub municipality_code: MunicipalityCode,
    /// Item of the service list.
    pub service_code: ServiceCode,
}

impl IssParams {
    /// Builds parameters from textual codes.
    pub fn new(rate: Rate, municipality_code: &str, service_code: &str) -> EngineResult<Self> {
        Ok(Self {
            rate,
            municipality_code: municipality_code.parse()?,
            service_code: service_code.parse()?,
        })
    }
}

/// Calculates ISS as `base x rate`.
///
/// # Errors
///
/// Returns [`EngineError::Validation`] when the rate lies outside `[2%, 5%]`.
///
/// # Legal Reference
///
/// - LC 116/2003, art. 8, II: maximum rate of 5%
/// - LC 116/2003, art. 8-A: minimum rate of 2%
pub fn calculate_iss(
    base: &CalculationBase,
    params: &IssParams,
    step_number: u32,
) -> EngineResult<TaxCalculationResult> {
    let percentage = params.rate.percentage();
    if percentage < Decimal::from(ISS_MIN_RATE) || percentage > Decimal::from(ISS_MAX_RATE) {
        return Err(EngineError::validation(
            "iss_rate",
            format!(
                "{} is outside the {}% to {}% band",
                params.rate, ISS_MIN_RATE, ISS_MAX_RATE
            ),
        ));
    }

    let taxable = base.effective_value();
    let amount = TaxAmount::compute(taxable, params.rate);

    let audit_step = AuditStep {
        step_number,
        rule_id: "iss".to_string(),
        rule_name: "ISS".to_string(),
        legal_ref: ISS_LEGAL_REF.to_string(),
        input: serde_json::json!({
            "base": taxable.amount().normalize().to_string(),
            "rate": percentage.normalize().to_string(),
            "municipality_code": params.municipality_code.as_str(),
            "service_code": params.service_code.as_str(),
        }),
        output: serde_json::json!({
            "value": amount.value().amount().to_string(),
        }),
        reasoning: format!(
            "ISS for service {} in {}: {} x {} = {}",
            params.service_code,
            params.municipality_code,
            taxable,
            params.rate,
            amount.value()
        ),
    };

    Ok(TaxCalculationResult {
        tax: TaxKind::Iss,
        amount,
        audit_step,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn params(rate: &str) -> IssParams {
        IssParams::new(Rate::new(dec(rate)).unwrap(), "3550308", "01.07").unwrap()
    }

    #[test]
    fn test_iss_within_band() {
        let base = CalculationBase::brl(dec("1000")).unwrap();
        let result = calculate_iss(&base, &params("5"), 1).unwrap();
        assert_eq!(result.amount.value().amount(), dec("50.00"));
        assert_eq!(result.tax, TaxKind::Iss);
    }

    #[test]
    fn test_band_edges() {
        let base = CalculationBase::brl(dec("1000")).unwrap();
        assert!(calculate_iss(&base, &params("2"), 1).is_ok());
        assert!(calculate_iss(&base, &params("1.99"), 1).is_err());
        assert!(calculate_iss(&base, &params("5.01"), 1).is_err());
    }

    #[test]
    fn test_codes_are_validated() {
        let rate = Rate::new(dec("3")).unwrap();
        assert!(IssParams::new(rate, "355030", "01.07").is_err());
        assert!(IssParams::new(rate, "3550308", "0107").is_err());
        assert!(IssParams::new(rate, "3550308", "1.07").is_err());
    }
}
