//! Selective tax (IS) calculation.
//!
//! IS falls on goods harmful to health or the environment. Whether a product
//! is in scope is decided by its NCM heading.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{EngineError, EngineResult};
use crate::models::{AuditStep, CalculationBase, NcmCode, Rate, TaxAmount, TaxKind};

use super::TaxCalculationResult;

/// Legal reference for the selective tax.
pub const IS_LEGAL_REF: &str = "LC 214/2025, art. 409";

/// Product groups subject to the selective tax.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectiveCategory {
    /// Sugar-sweetened beverages (heading 2202).
    SugaryDrinks,
    /// Beer, wine and spirits (headings 2203 to 2208).
    AlcoholicBeverages,
    /// Tobacco and its products (headings 2401 to 2403).
    Tobacco,
    /// Passenger cars (heading 8703).
    Vehicles,
    /// Motorcycles (heading 8711).
    Motorcycles,
    /// Aircraft (heading 8802).
    Aircraft,
    /// Pleasure boats (heading 8903).
    Vessels,
    /// Metal ores (headings 2601 to 2617).
    Minerals,
    /// Crude oil and natural gas (headings 2709 to 2711).
    Petroleum,
}

impl SelectiveCategory {
    /// The category of an NCM heading, if it is in scope.
    pub fn for_heading(heading: u16) -> Option<Self> {
        match heading {
            2202 => Some(SelectiveCategory::SugaryDrinks),
            2203..=2208 => Some(SelectiveCategory::AlcoholicBeverages),
            2401..=2403 => Some(SelectiveCategory::Tobacco),
            8703 => Some(SelectiveCategory::Vehicles),
            8711 => Some(SelectiveCategory::Motorcycles),
            8802 => Some(SelectiveCategory::Aircraft),
            8903 => Some(SelectiveCategory::Vessels),
            2601..=2617 => Some(SelectiveCategory::Minerals),
            2709..=2711 => Some(SelectiveCategory::Petroleum),
            _ => None,
        }
    }
}

impl fmt::Display for SelectiveCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SelectiveCategory::SugaryDrinks => "sugary drinks",
            SelectiveCategory::AlcoholicBeverages => "alcoholic beverages",
            SelectiveCategory::Tobacco => "tobacco",
            SelectiveCategory::Vehicles => "vehicles",
            SelectiveCategory::Motorcycles => "motorcycles",
            SelectiveCategory::Aircraft => "aircraft",
            SelectiveCategory::Vessels => "vessels",
            SelectiveCategory::Minerals => "minerals",
            SelectiveCategory::Petroleum => "petroleum and natural gas",
        };
        f.write_str(name)
    }
}

/// Returns true when the NCM code falls in a selective-tax heading.
///
/// ```
/// use brtax_engine::calculation::is_subject_to_selective_tax;
/// use brtax_engine::models::NcmCode;
///
/// assert!(is_subject_to_selective_tax(&"22030000".parse::<NcmCode>().unwrap()));
/// assert!(!is_subject_to_selective_tax(&"10063021".parse::<NcmCode>().unwrap()));
/// ```
pub fn is_subject_to_selective_tax(ncm: &NcmCode) -> bool {
    SelectiveCategory::for_heading(ncm.heading()).is_some()
}

/// Parameters for a selective tax calculation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectiveParams {
    /// NCM code of the product.
    pub ncm: NcmCode,
    /// Free-text product category, e.g. "beer".
    pub product_category: String,
    /// Rate for the product.
    pub rate: Rate,
}

/// Calculates the selective tax as `base x rate`.
///
/// # Errors
///
/// Returns [`EngineError::Validation`] when the product category is blank.
pub fn calculate_selective_tax(
    base: &CalculationBase,
    params: &SelectiveParams,
    step_number: u32,
) -> EngineResult<TaxCalculationResult> {
    if params.product_category.trim().is_empty() {
        return Err(EngineError::validation(
            "product_category",
            "must not be empty",
        ));
    }

    let taxable = base.effective_value();
    let amount = TaxAmount::compute(taxable, params.rate);
    let category = SelectiveCategory::for_heading(params.ncm.heading());

    let audit_step = AuditStep {
        step_number,
        rule_id: "is".to_string(),
        rule_name: "Selective Tax".to_string(),
        legal_ref: IS_LEGAL_REF.to_string(),
        input: serde_json::json!({
            "base": taxable.amount().normalize().to_string(),
            "ncm": params.ncm.as_str(),
            "product_category": params.product_category,
            "rate": params.rate.percentage().normalize().to_string(),
        }),
        output: serde_json::json!({
            "value": amount.value().amount().to_string(),
            "category": category.map(|c| c.to_string()),
        }),
        reasoning: format!(
            "IS on {} (NCM {}): {} x {} = {}",
            params.product_category,
            params.ncm,
            taxable,
            params.rate,
            amount.value()
        ),
    };

    Ok(TaxCalculationResult {
        tax: TaxKind::Is,
        amount,
        audit_step,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn ncm(s: &str) -> NcmCode {
        NcmCode::from_str(s).unwrap()
    }

    #[test]
    fn test_selective_tax_value() {
        let base = CalculationBase::brl(dec("1000")).unwrap();
        let params = SelectiveParams {
            ncm: ncm("22030000"),
            product_category: "beer".to_string(),
            rate: Rate::new(dec("10")).unwrap(),
        };
        let result = calculate_selective_tax(&base, &params, 1).unwrap();

        assert_eq!(result.amount.value().amount(), dec("100.00"));
        assert_eq!(result.tax, TaxKind::Is);
        assert_eq!(result.audit_step.output["category"], "alcoholic beverages");
    }

    #[test]
    fn test_blank_category_is_rejected() {
        let base = CalculationBase::brl(dec("1000")).unwrap();
        let params = SelectiveParams {
            ncm: ncm("22030000"),
            product_category: "  ".to_string(),
            rate: Rate::new(dec("10")).unwrap(),
        };
        assert!(matches!(
            calculate_selective_tax(&base, &params, 1),
            Err(EngineError::Validation { .. })
        ));
    }

    #[test]
    fn test_subject_headings() {
        assert!(is_subject_to_selective_tax(&ncm("24022000")));
        assert!(is_subject_to_selective_tax(&ncm("87032310")));
        assert!(is_subject_to_selective_tax(&ncm("27090010")));
        assert!(is_subject_to_selective_tax(&ncm("22021000")));
        assert!(!is_subject_to_selective_tax(&ncm("84713012")));
        assert!(!is_subject_to_selective_tax(&ncm("22011000")));
    }

    #[test]
    fn test_category_lookup() {
        assert_eq!(
            SelectiveCategory::for_heading(2208),
            Some(SelectiveCategory::AlcoholicBeverages)
        );
        assert_eq!(
            SelectiveCategory::for_heading(2610),
            Some(SelectiveCategory::Minerals)
        );
        assert_eq!(SelectiveCategory::for_heading(2618), None);
    }
}
