//! Core data models for the tax engine.
//!
//! This module contains the immutable, self-validating value objects used
//! throughout the engine (money, rates, calculation bases, tax amounts,
//! situation and classification codes, the IBS/CBS tax group) and the
//! result types the engines and orchestrator produce.

mod calculation_base;
mod calculation_result;
mod identifiers;
mod money;
mod rate;
mod situation_codes;
mod tax_amount;
mod tax_group;
mod tax_kind;

pub use calculation_base::CalculationBase;
pub use calculation_result::{
    AuditStep, AuditTrace, AuditWarning, BatchResult, BatchTotals, ItemTaxResult,
    LegacyBreakdown, NewSystemBreakdown, TaxBreakdown,
};
pub use identifiers::{
    CfopCode, ClassificationCategory, MunicipalityCode, NcmCode, ServiceCode,
    TaxClassificationCode, UfCode,
};
pub use money::{Currency, Money, cent, round_money, sum_money};
pub use rate::{CbsRate, GENERIC_RATE_MAX, IbsRate, NEW_SYSTEM_RATE_MAX, Rate};
pub(crate) use rate::proportion;
pub use situation_codes::{
    IcmsTaxation, LegacySituationCode, NewSystemSituationCode, PisCofinsSituationCode,
    SimplifiedSituationCode,
};
pub use tax_amount::TaxAmount;
pub use tax_group::{
    DeferralRecord, GovernmentEntity, GovernmentPurchaseRecord, NewSystemTaxGroup,
    PresumedCreditRecord, ReductionRecord, RefundRecord, TaxGroupComponents,
};
pub use tax_kind::TaxKind;
