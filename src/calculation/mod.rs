//! Per-tax calculators.
//!
//! Each calculator is a pure function taking a calculation base, its own
//! parameters and a step number, and returning the computed amount together
//! with the audit step that explains it. The engines decide which
//! calculators run for a given period and with which rates.

mod cbs;
mod ibs;
mod icms;
mod ipi;
mod iss;
mod pis_cofins;
mod selective;

use serde::Serialize;

use crate::models::{AuditStep, TaxAmount, TaxKind};

pub use cbs::{CBS_LEGAL_REF, CbsParams, CbsResult, calculate_cbs};
pub use ibs::{IBS_LEGAL_REF, IbsParams, IbsResult, calculate_ibs};
pub use icms::{
    ICMS_LEGAL_REF, ICMS_SIMPLIFIED_LEGAL_REF, ICMS_ST_LEGAL_REF, IcmsParams, IcmsResult,
    IcmsSituation, calculate_icms,
};
pub use ipi::{IPI_LEGAL_REF, IpiParams, calculate_ipi};
pub use iss::{ISS_LEGAL_REF, ISS_MAX_RATE, ISS_MIN_RATE, IssParams, calculate_iss};
pub use pis_cofins::{ContributionRegime, PisCofinsParams, calculate_cofins, calculate_pis};
pub use selective::{
    IS_LEGAL_REF, SelectiveCategory, SelectiveParams, calculate_selective_tax,
    is_subject_to_selective_tax,
};

/// The result of a single-amount calculator (IPI, PIS, COFINS, ISS, IS).
#[derive(Debug, Clone, Serialize)]
pub struct TaxCalculationResult {
    /// The tax that was calculated.
    pub tax: TaxKind,
    /// The computed amount.
    pub amount: TaxAmount,
    /// The audit step recording this calculation.
    pub audit_step: AuditStep,
}
