//! Calculation result models for the tax engine.
//!
//! This module contains the per-tax breakdown produced by the engines, the
//! per-item and batch results assembled by the orchestrator, and the audit
//! trace recording every calculation decision.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::money::{Currency, Money};
use super::tax_amount::TaxAmount;
use crate::engine::EngineType;
use crate::error::EngineResult;

/// A single step in the audit trace recording a calculation decision.
///
/// Each step captures the input, output, and reasoning for a rule application.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditStep {
    /// The sequential step number.
    pub step_number: u32,
    /// The unique identifier of the rule that was applied.
    pub rule_id: String,
    /// The human-readable name of the rule.
    pub rule_name: String,
    /// Reference to the legal provision for this rule.
    pub legal_ref: String,
    /// The input data for this step.
    pub input: serde_json::Value,
    /// The output data from this step.
    pub output: serde_json::Value,
    /// Human-readable explanation of the decision.
    pub reasoning: String,
}

/// A warning generated during calculation.
///
/// Warnings indicate potential issues that don't prevent calculation
/// but may require attention.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditWarning {
    /// A code identifying the type of warning.
    pub code: String,
    /// A human-readable description of the warning.
    pub message: String,
    /// The severity level (e.g., "low", "medium", "high").
    pub severity: String,
}

/// The complete audit trace for a calculation.
///
/// # Example
///
/// ```
/// use brtax_engine::models::AuditTrace;
///
/// let trace = AuditTrace {
///     steps: vec![],
///     warnings: vec![],
///     duration_us: 1234,
/// };
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditTrace {
    /// The sequence of calculation steps.
    pub steps: Vec<AuditStep>,
    /// Any warnings generated during calculation.
    pub warnings: Vec<AuditWarning>,
    /// The total calculation duration in microseconds.
    pub duration_us: u64,
}

/// Legacy taxes computed for an item. Absent taxes were not requested.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LegacyBreakdown {
    /// Own ICMS.
    pub icms: Option<TaxAmount>,
    /// ICMS collected by substitution.
    pub icms_st: Option<TaxAmount>,
    /// IPI.
    pub ipi: Option<TaxAmount>,
    /// PIS.
    pub pis: Option<TaxAmount>,
    /// COFINS.
    pub cofins: Option<TaxAmount>,
    /// ISS.
    pub iss: Option<TaxAmount>,
    /// Sum of the values above.
    pub total: Money,
}

impl LegacyBreakdown {
    /// An empty breakdown in `currency`.
    pub fn empty(currency: Currency) -> Self {
        Self {
            icms: None,
            icms_st: None,
            ipi: None,
            pis: None,
            cofins: None,
            iss: None,
            total: Money::zero(currency),
        }
    }

    /// Recomputes `total` from the individual taxes.
    pub fn refresh_total(&mut self) -> EngineResult<()> {
        let currency = self.total.currency();
        let values: Vec<Money> = [
            &self.icms,
            &self.icms_st,
            &self.ipi,
            &self.pis,
            &self.cofins,
            &self.iss,
        ]
        .into_iter()
        .flatten()
        .map(|t| t.value())
        .collect();
        self.total = super::money::sum_money(currency, &values)?;
        Ok(())
    }
}

/// New-system taxes computed for an item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewSystemBreakdown {
    /// IBS state share.
    pub ibs_state: Option<TaxAmount>,
    /// IBS municipal share.
    pub ibs_municipal: Option<TaxAmount>,
    /// CBS.
    pub cbs: Option<TaxAmount>,
    /// Selective tax.
    pub selective: Option<TaxAmount>,
    /// Portion of IBS/CBS whose payment is deferred.
    pub deferred: Money,
    /// Sum of the values above, before deferral.
    pub total: Money,
}

impl NewSystemBreakdown {
    /// An empty breakdown in `currency`.
    pub fn empty(currency: Currency) -> Self {
        Self {
            ibs_state: None,
            ibs_municipal: None,
            cbs: None,
            selective: None,
            deferred: Money::zero(currency),
            total: Money::zero(currency),
        }
    }

    /// Recomputes `total` from the individual taxes.
    pub fn refresh_total(&mut self) -> EngineResult<()> {
        let currency = self.total.currency();
        let values: Vec<Money> = [
            &self.ibs_state,
            &self.ibs_municipal,
            &self.cbs,
            &self.selective,
        ]
        .into_iter()
        .flatten()
        .map(|t| t.value())
        .collect();
        self.total = super::money::sum_money(currency, &values)?;
        Ok(())
    }
}

/// The per-tax output of an engine's `calculate_all`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaxBreakdown {
    /// The engine that produced the breakdown.
    pub engine: EngineType,
    /// The calendar year of the operation.
    pub year: i32,
    /// Legacy taxes.
    pub legacy: LegacyBreakdown,
    /// New-system taxes.
    pub new_system: NewSystemBreakdown,
    /// Legacy total plus new-system total.
    pub total: Money,
    /// Steps recorded by the calculators.
    pub audit_steps: Vec<AuditStep>,
}

/// The complete tax result for one line item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemTaxResult {
    /// Unique identifier for this calculation.
    pub calculation_id: Uuid,
    /// When the calculation was performed.
    pub timestamp: DateTime<Utc>,
    /// The version of the engine that performed the calculation.
    pub engine_version: String,
    /// The caller's item identifier.
    pub item_id: String,
    /// The operation (emission) date.
    pub operation_date: NaiveDate,
    /// The engine selected for the date.
    pub engine: EngineType,
    /// Human-readable description of the tax period.
    pub period: String,
    /// The item's calculation base.
    pub base: Money,
    /// IBS state share.
    pub ibs_state: TaxAmount,
    /// IBS municipal share.
    pub ibs_municipal: TaxAmount,
    /// CBS.
    pub cbs: TaxAmount,
    /// Every tax computed for the item.
    pub breakdown: TaxBreakdown,
    /// Total tax for the item.
    pub total: Money,
    /// Complete audit trace of calculation decisions.
    pub audit_trace: AuditTrace,
}

/// Aggregated totals over a batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchTotals {
    /// Number of items processed.
    pub item_count: usize,
    /// Sum of legacy taxes.
    pub legacy_total: Money,
    /// Sum of new-system taxes.
    pub new_system_total: Money,
    /// Sum of all taxes.
    pub grand_total: Money,
}

/// The result of a batch where every item succeeded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchResult {
    /// Per-item results, in input order.
    pub items: Vec<ItemTaxResult>,
    /// Batch totals.
    pub totals: BatchTotals,
}
