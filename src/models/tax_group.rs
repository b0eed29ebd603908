//! The IBS/CBS tax group consumed by electronic fiscal document builders.

use serde::{Deserialize, Serialize};

use super::identifiers::TaxClassificationCode;
use super::money::{Money, cent, round_money};
use super::rate::{CbsRate, IbsRate, Rate};
use super::situation_codes::NewSystemSituationCode;
use crate::error::{EngineError, EngineResult};

/// Deferred share of IBS and CBS.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeferralRecord {
    /// Deferred percentage of the tax.
    pub rate: Rate,
    /// Deferred IBS (state + municipal).
    pub ibs_value: Money,
    /// Deferred CBS.
    pub cbs_value: Money,
}

/// Tax returned to the buyer (cashback-style refunds).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefundRecord {
    /// IBS refunded.
    pub ibs_value: Money,
    /// CBS refunded.
    pub cbs_value: Money,
}

/// Rate reductions granted to the operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReductionRecord {
    /// Reduction applied to IBS rates.
    pub ibs_reduction: Rate,
    /// Reduction applied to the CBS rate.
    pub cbs_reduction: Rate,
}

/// Presumed credit granted on the operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PresumedCreditRecord {
    /// Presumed IBS credit rate.
    pub ibs_rate: Rate,
    /// Presumed IBS credit.
    pub ibs_value: Money,
    /// Presumed CBS credit rate.
    pub cbs_rate: Rate,
    /// Presumed CBS credit.
    pub cbs_value: Money,
}

/// The government sphere purchasing the goods or services.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GovernmentEntity {
    /// Federal government.
    Union,
    /// A state or the Federal District.
    State,
    /// A municipality.
    Municipality,
}

/// Purchase by a public administration body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GovernmentPurchaseRecord {
    /// The purchasing entity.
    pub entity: GovernmentEntity,
    /// Rate reduction applied to the purchase.
    pub rate_reduction: Rate,
}

/// Raw parts of a tax group, validated by [`NewSystemTaxGroup::new`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaxGroupComponents {
    /// CST IBS/CBS.
    pub situation_code: NewSystemSituationCode,
    /// cClassTrib.
    pub classification_code: TaxClassificationCode,
    /// Calculation base shared by every tax in the group.
    pub base: Money,
    /// IBS state rate.
    pub ibs_state_rate: IbsRate,
    /// IBS state value.
    pub ibs_state_value: Money,
    /// IBS municipal rate.
    pub ibs_municipal_rate: IbsRate,
    /// IBS municipal value.
    pub ibs_municipal_value: Money,
    /// CBS rate.
    pub cbs_rate: CbsRate,
    /// CBS value.
    pub cbs_value: Money,
    /// Optional deferral.
    #[serde(default)]
    pub deferral: Option<DeferralRecord>,
    /// Optional refund.
    #[serde(default)]
    pub refund: Option<RefundRecord>,
    /// Optional rate reduction.
    #[serde(default)]
    pub reduction: Option<ReductionRecord>,
    /// Optional presumed credit.
    #[serde(default)]
    pub presumed_credit: Option<PresumedCreditRecord>,
    /// Optional government purchase.
    #[serde(default)]
    pub government_purchase: Option<GovernmentPurchaseRecord>,
}

/// A validated IBS/CBS tax group.
///
/// Construction enforces that every monetary field shares the base's
/// currency, that each value is within one cent of `base x rate`, and that
/// exempt, immune and non-incidence groups carry no tax.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "TaxGroupComponents", into = "TaxGroupComponents")]
pub struct NewSystemTaxGroup {
    components: TaxGroupComponents,
}

fn check_value(field: &str, base: &Money, rate: Rate, value: &Money) -> EngineResult<()> {
    base.ensure_same_currency(value)?;
    let expected = rate.apply(base.amount());
    if (value.amount() - expected).abs() > cent() {
        return Err(EngineError::Consistency {
            field: field.to_string(),
            expected: round_money(expected),
            actual: value.amount(),
        });
    }
    Ok(())
}

impl NewSystemTaxGroup {
    /// Validates the components and builds the group.
    pub fn new(components: TaxGroupComponents) -> EngineResult<Self> {
        let c = &components;
        if c.base.is_negative() {
            return Err(EngineError::validation("base", "must not be negative"));
        }

        check_value("ibs_state_value", &c.base, c.ibs_state_rate.rate(), &c.ibs_state_value)?;
        check_value(
            "ibs_municipal_value",
            &c.base,
            c.ibs_municipal_rate.rate(),
            &c.ibs_municipal_value,
        )?;
        check_value("cbs_value", &c.base, c.cbs_rate.rate(), &c.cbs_value)?;

        if c.situation_code.is_exempt()
            && !(c.ibs_state_value.is_zero() && c.ibs_municipal_value.is_zero() && c.cbs_value.is_zero())
        {
            return Err(EngineError::validation(
                "situation_code",
                format!(
                    "CST {} does not allow IBS/CBS values other than zero",
                    c.situation_code
                ),
            ));
        }

        let ibs_total = c.ibs_state_value.checked_add(&c.ibs_municipal_value)?;

        if let Some(deferral) = &c.deferral {
            check_value("deferral.ibs_value", &ibs_total, deferral.rate, &deferral.ibs_value)?;
            check_value("deferral.cbs_value", &c.cbs_value, deferral.rate, &deferral.cbs_value)?;
        }

        if let Some(refund) = &c.refund {
            c.base.ensure_same_currency(&refund.ibs_value)?;
            c.base.ensure_same_currency(&refund.cbs_value)?;
            if refund.ibs_value.is_negative() || refund.cbs_value.is_negative() {
                return Err(EngineError::validation("refund", "values must not be negative"));
            }
        }

        if let Some(credit) = &c.presumed_credit {
            check_value("presumed_credit.ibs_value", &c.base, credit.ibs_rate, &credit.ibs_value)?;
            check_value("presumed_credit.cbs_value", &c.base, credit.cbs_rate, &credit.cbs_value)?;
        }

        Ok(Self { components })
    }

    /// The CST IBS/CBS.
    pub fn situation_code(&self) -> NewSystemSituationCode {
        self.components.situation_code
    }

    /// The classification code.
    pub fn classification_code(&self) -> &TaxClassificationCode {
        &self.components.classification_code
    }

    /// The calculation base.
    pub fn base(&self) -> Money {
        self.components.base
    }

    /// IBS state rate and value.
    pub fn ibs_state(&self) -> (IbsRate, Money) {
        (self.components.ibs_state_rate, self.components.ibs_state_value)
    }

    /// IBS municipal rate and value.
    pub fn ibs_municipal(&self) -> (IbsRate, Money) {
        (
            self.components.ibs_municipal_rate,
            self.components.ibs_municipal_value,
        )
    }

    /// CBS rate and value.
    pub fn cbs(&self) -> (CbsRate, Money) {
        (self.components.cbs_rate, self.components.cbs_value)
    }

    /// Deferral, if any.
    pub fn deferral(&self) -> Option<&DeferralRecord> {
        self.components.deferral.as_ref()
    }

    /// Refund, if any.
    pub fn refund(&self) -> Option<&RefundRecord> {
        self.components.refund.as_ref()
    }

    /// Reduction, if any.
    pub fn reduction(&self) -> Option<&ReductionRecord> {
        self.components.reduction.as_ref()
    }

    /// Presumed credit, if any.
    pub fn presumed_credit(&self) -> Option<&PresumedCreditRecord> {
        self.components.presumed_credit.as_ref()
    }

    /// Government purchase, if any.
    pub fn government_purchase(&self) -> Option<&GovernmentPurchaseRecord> {
        self.components.government_purchase.as_ref()
    }

    /// IBS state + municipal.
    pub fn ibs_total(&self) -> Money {
        Money::new(
            self.components.ibs_state_value.amount() + self.components.ibs_municipal_value.amount(),
            self.components.base.currency(),
        )
    }

    /// IBS + CBS.
    pub fn total(&self) -> Money {
        Money::new(
            self.ibs_total().amount() + self.components.cbs_value.amount(),
            self.components.base.currency(),
        )
    }

    /// Total minus deferred values.
    pub fn net_due(&self) -> Money {
        let total = self.total();
        match &self.components.deferral {
            Some(d) => Money::new(
                total.amount() - d.ibs_value.amount() - d.cbs_value.amount(),
                total.currency(),
            ),
            None => total,
        }
    }
}

impl TryFrom<TaxGroupComponents> for NewSystemTaxGroup {
    type Error = EngineError;

    fn try_from(components: TaxGroupComponents) -> Result<Self, Self::Error> {
        NewSystemTaxGroup::new(components)
    }
}

impl From<NewSystemTaxGroup> for TaxGroupComponents {
    fn from(group: NewSystemTaxGroup) -> Self {
        group.components
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Currency;
    use rust_decimal::Decimal;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn brl(s: &str) -> Money {
        Money::brl(dec(s))
    }

    fn components() -> TaxGroupComponents {
        TaxGroupComponents {
            situation_code: NewSystemSituationCode::Normal,
            classification_code: TaxClassificationCode::from_str("10001").unwrap(),
            base: brl("1000.00"),
            ibs_state_rate: IbsRate::new(dec("8.85")).unwrap(),
            ibs_state_value: brl("88.50"),
            ibs_municipal_rate: IbsRate::new(dec("8.85")).unwrap(),
            ibs_municipal_value: brl("88.50"),
            cbs_rate: CbsRate::new(dec("8.8")).unwrap(),
            cbs_value: brl("88.00"),
            deferral: None,
            refund: None,
            reduction: None,
            presumed_credit: None,
            government_purchase: None,
        }
    }

    #[test]
    fn test_valid_group_totals() {
        let group = NewSystemTaxGroup::new(components()).unwrap();
        assert_eq!(group.ibs_total().amount(), dec("177.00"));
        assert_eq!(group.total().amount(), dec("265.00"));
        assert_eq!(group.net_due(), group.total());
    }

    #[test]
    fn test_ibs_state_deviation_rejected() {
        let mut c = components();
        c.ibs_state_value = brl("88.52");
        let err = NewSystemTaxGroup::new(c).unwrap_err();
        assert!(matches!(err, EngineError::Consistency { ref field, .. } if field == "ibs_state_value"));
    }

    #[test]
    fn test_ibs_municipal_deviation_rejected() {
        let mut c = components();
        c.ibs_municipal_value = brl("80.00");
        let err = NewSystemTaxGroup::new(c).unwrap_err();
        assert!(matches!(err, EngineError::Consistency { ref field, .. } if field == "ibs_municipal_value"));
    }

    #[test]
    fn test_cbs_deviation_rejected() {
        let mut c = components();
        c.cbs_value = brl("88.02");
        let err = NewSystemTaxGroup::new(c).unwrap_err();
        assert!(matches!(err, EngineError::Consistency { ref field, .. } if field == "cbs_value"));
    }

    #[test]
    fn test_one_cent_tolerance_accepted() {
        let mut c = components();
        c.cbs_value = brl("88.01");
        assert!(NewSystemTaxGroup::new(c).is_ok());
    }

    #[test]
    fn test_currency_mismatch_rejected() {
        let mut c = components();
        c.cbs_value = Money::new(dec("88.00"), Currency::Usd);
        assert!(matches!(
            NewSystemTaxGroup::new(c),
            Err(EngineError::CurrencyMismatch { .. })
        ));
    }

    #[test]
    fn test_exempt_code_requires_zero_values() {
        let mut c = components();
        c.situation_code = NewSystemSituationCode::Exempt;
        assert!(NewSystemTaxGroup::new(c).is_err());

        let mut zero = components();
        zero.situation_code = NewSystemSituationCode::Immune;
        zero.ibs_state_rate = IbsRate::zero();
        zero.ibs_state_value = brl("0");
        zero.ibs_municipal_rate = IbsRate::zero();
        zero.ibs_municipal_value = brl("0");
        zero.cbs_rate = CbsRate::zero();
        zero.cbs_value = brl("0");
        assert!(NewSystemTaxGroup::new(zero).is_ok());
    }

    #[test]
    fn test_deferral_is_checked_and_reduces_net_due() {
        let mut c = components();
        c.situation_code = NewSystemSituationCode::Deferred;
        c.deferral = Some(DeferralRecord {
            rate: Rate::new(dec("50")).unwrap(),
            ibs_value: brl("88.50"),
            cbs_value: brl("44.00"),
        });
        let group = NewSystemTaxGroup::new(c.clone()).unwrap();
        assert_eq!(group.net_due().amount(), dec("132.50"));

        c.deferral = Some(DeferralRecord {
            rate: Rate::new(dec("50")).unwrap(),
            ibs_value: brl("80.00"),
            cbs_value: brl("44.00"),
        });
        assert!(NewSystemTaxGroup::new(c).is_err());
    }

    #[test]
    fn test_presumed_credit_is_checked() {
        let mut c = components();
        c.situation_code = NewSystemSituationCode::PresumedCredit;
        c.presumed_credit = Some(PresumedCreditRecord {
            ibs_rate: Rate::new(dec("1")).unwrap(),
            ibs_value: brl("10.00"),
            cbs_rate: Rate::new(dec("0.5")).unwrap(),
            cbs_value: brl("6.00"),
        });
        assert!(NewSystemTaxGroup::new(c).is_err());
    }

    #[test]
    fn test_negative_refund_rejected() {
        let mut c = components();
        c.refund = Some(RefundRecord {
            ibs_value: brl("-1"),
            cbs_value: brl("0"),
        });
        assert!(NewSystemTaxGroup::new(c).is_err());
    }

    #[test]
    fn test_serde_validates_on_deserialize() {
        let group = NewSystemTaxGroup::new(components()).unwrap();
        let json = serde_json::to_value(&group).unwrap();
        let back: NewSystemTaxGroup = serde_json::from_value(json.clone()).unwrap();
        assert_eq!(back, group);

        let mut tampered = json;
        tampered["cbs_value"]["amount"] = serde_json::json!("99.00");
        assert!(serde_json::from_value::<NewSystemTaxGroup>(tampered).is_err());
    }
}
