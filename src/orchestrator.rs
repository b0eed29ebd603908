//! Calculation orchestrator.
//!
//! [`TaxCalculationService`] turns a fiscal line item into an
//! [`ItemTaxResult`]: it validates the item, selects the engine for the
//! operation date, resolves the period rates for the destination through a
//! [`RateProvider`], runs the engine and assembles the audit trace.
//!
//! Batches are processed in input order and abort on the first failing item;
//! the error names the item and no partial totals are returned.

use std::time::Instant;

use chrono::{Datelike, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::calculation::{
    IcmsParams, IpiParams, IssParams, PisCofinsParams, SelectiveParams,
    is_subject_to_selective_tax,
};
use crate::engine::{
    EngineType, NewSystemParams, PeriodRates, RateProvider, SELECTIVE_TAX_START_YEAR,
    StatutoryRates, TaxInput, describe_period, engine_for_date, validate_date,
};
use crate::error::{EngineError, EngineResult};
use crate::models::{
    AuditTrace, AuditWarning, BatchResult, BatchTotals, CalculationBase, CfopCode, Currency,
    ItemTaxResult, Money, MunicipalityCode, NcmCode, Rate, TaxAmount, UfCode, sum_money,
};

/// Optional per-tax parameters of an item.
///
/// IBS and CBS need no parameters of their own: their rates come from the
/// rate provider for the destination, and only the benefits below vary per
/// item.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ItemTaxes {
    /// ICMS parameters.
    #[serde(default)]
    pub icms: Option<IcmsParams>,
    /// IPI parameters.
    #[serde(default)]
    pub ipi: Option<IpiParams>,
    /// PIS/COFINS parameters.
    #[serde(default)]
    pub pis_cofins: Option<PisCofinsParams>,
    /// ISS parameters.
    #[serde(default)]
    pub iss: Option<IssParams>,
    /// Selective tax parameters.
    #[serde(default)]
    pub selective: Option<SelectiveParams>,
    /// IBS/CBS rate reduction percentage.
    #[serde(default)]
    pub reduction: Option<Rate>,
    /// Deferred percentage of IBS/CBS.
    #[serde(default)]
    pub deferral: Option<Rate>,
}

/// A fiscal line item to be taxed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemInput {
    /// Caller-supplied identifier, echoed in the result and in batch errors.
    pub item_id: String,
    /// The item's calculation base.
    pub base: CalculationBase,
    /// Operation (emission) date; selects the engine and the rates.
    pub operation_date: NaiveDate,
    /// Fiscal operation code.
    pub cfop: CfopCode,
    /// Product classification.
    pub ncm: NcmCode,
    /// State the goods leave from.
    pub origin_uf: UfCode,
    /// State of destination; IBS is due here.
    pub destination_uf: UfCode,
    /// Municipality of destination.
    #[serde(default)]
    pub destination_municipality: Option<MunicipalityCode>,
    /// Per-tax parameters.
    #[serde(default)]
    pub taxes: ItemTaxes,
}

impl ItemInput {
    /// An item with no per-tax parameters and no destination municipality.
    pub fn new(
        item_id: impl Into<String>,
        base: CalculationBase,
        operation_date: NaiveDate,
        cfop: CfopCode,
        ncm: NcmCode,
        origin_uf: UfCode,
        destination_uf: UfCode,
    ) -> Self {
        Self {
            item_id: item_id.into(),
            base,
            operation_date,
            cfop,
            ncm,
            origin_uf,
            destination_uf,
            destination_municipality: None,
            taxes: ItemTaxes::default(),
        }
    }

    /// Checks the fields the value objects cannot check on their own.
    pub fn validate(&self) -> EngineResult<()> {
        if self.item_id.trim().is_empty() {
            return Err(EngineError::validation("item_id", "must not be blank"));
        }
        validate_date(self.operation_date)?;

        if let Some(municipality) = &self.destination_municipality {
            if municipality.state_code() != self.destination_uf.code() {
                return Err(EngineError::validation(
                    "destination_municipality",
                    format!(
                        "{} does not belong to {}",
                        municipality, self.destination_uf
                    ),
                ));
            }
        }

        if let Some(selective) = &self.taxes.selective {
            if selective.ncm != self.ncm {
                return Err(EngineError::validation(
                    "selective.ncm",
                    format!(
                        "{} differs from the item NCM {}",
                        selective.ncm, self.ncm
                    ),
                ));
            }
        }
        Ok(())
    }

    /// The engine input for this item.
    ///
    /// The current engine receives no IBS/CBS parameters.
    pub fn tax_input(&self, engine: EngineType) -> TaxInput {
        let new_system = match engine {
            EngineType::Current => None,
            EngineType::Transition | EngineType::New => Some(NewSystemParams {
                uf: self.destination_uf,
                municipality: self.destination_municipality.clone(),
                reduction: self.taxes.reduction,
                deferral: self.taxes.deferral,
            }),
        };
        TaxInput {
            base: self.base,
            icms: self.taxes.icms.clone(),
            ipi: self.taxes.ipi.clone(),
            pis_cofins: self.taxes.pis_cofins.clone(),
            iss: self.taxes.iss.clone(),
            new_system,
            selective: self.taxes.selective.clone(),
        }
    }
}

/// Computes item and batch results against a rate provider.
///
/// The service holds no per-call state and may be shared across threads.
///
/// # Example
///
/// ```
/// use brtax_engine::models::{CalculationBase, UfCode};
/// use brtax_engine::orchestrator::{ItemInput, TaxCalculationService};
/// use chrono::NaiveDate;
/// use rust_decimal::Decimal;
///
/// let service = TaxCalculationService::statutory();
/// let item = ItemInput::new(
///     "item-1",
///     CalculationBase::brl(Decimal::from(1000)).unwrap(),
///     NaiveDate::from_ymd_opt(2033, 3, 1).unwrap(),
///     "5102".parse().unwrap(),
///     "84713012".parse().unwrap(),
///     "SP".parse::<UfCode>().unwrap(),
///     "SP".parse::<UfCode>().unwrap(),
/// );
/// let result = service.calculate_item(&item).unwrap();
/// assert_eq!(result.cbs.value().amount(), Decimal::from(88));
/// ```
#[derive(Debug, Clone)]
pub struct TaxCalculationService<R = StatutoryRates> {
    rates: R,
}

impl TaxCalculationService<StatutoryRates> {
    /// A service backed by the built-in statutory schedule.
    pub fn statutory() -> Self {
        Self::new(StatutoryRates::new())
    }
}

impl Default for TaxCalculationService<StatutoryRates> {
    fn default() -> Self {
        Self::statutory()
    }
}

impl<R: RateProvider> TaxCalculationService<R> {
    /// A service backed by `rates`.
    pub fn new(rates: R) -> Self {
        Self { rates }
    }

    /// The rate provider.
    pub fn rates(&self) -> &R {
        &self.rates
    }

    /// Period rates for the item's destination and date.
    pub fn rates_for_item(&self, item: &ItemInput) -> EngineResult<PeriodRates> {
        self.rates.rates_for(
            item.destination_uf,
            item.destination_municipality.as_ref(),
            item.operation_date,
        )
    }

    /// Computes every tax of one item.
    ///
    /// # Errors
    ///
    /// Returns the first validation, rate lookup or calculation failure.
    pub fn calculate_item(&self, item: &ItemInput) -> EngineResult<ItemTaxResult> {
        let start_time = Instant::now();
        item.validate()?;

        let engine = engine_for_date(item.operation_date);
        let engine_type = engine.engine_type();
        let rates = self.rates_for_item(item)?;
        debug!(
            item_id = %item.item_id,
            engine = %engine_type,
            ibs = %rates.ibs_total(),
            cbs = %rates.cbs,
            "resolved period rates"
        );

        let breakdown = engine.calculate_all(&item.tax_input(engine_type), &rates)?;
        let warnings = collect_warnings(item, engine_type, &rates);
        for warning in &warnings {
            warn!(item_id = %item.item_id, code = %warning.code, "{}", warning.message);
        }

        let base = item.base.effective_value();
        let ibs_state = breakdown
            .new_system
            .ibs_state
            .unwrap_or_else(|| TaxAmount::zero(base));
        let ibs_municipal = breakdown
            .new_system
            .ibs_municipal
            .unwrap_or_else(|| TaxAmount::zero(base));
        let cbs = breakdown
            .new_system
            .cbs
            .unwrap_or_else(|| TaxAmount::zero(base));

        let total = breakdown.total;
        let steps = breakdown.audit_steps.clone();
        let duration_us = start_time.elapsed().as_micros() as u64;

        Ok(ItemTaxResult {
            calculation_id: Uuid::new_v4(),
            timestamp: Utc::now(),
            engine_version: env!("CARGO_PKG_VERSION").to_string(),
            item_id: item.item_id.clone(),
            operation_date: item.operation_date,
            engine: engine_type,
            period: describe_period(self.rates.schedule(), item.operation_date),
            base,
            ibs_state,
            ibs_municipal,
            cbs,
            breakdown,
            total,
            audit_trace: AuditTrace {
                steps,
                warnings,
                duration_us,
            },
        })
    }

    /// Computes every item of a batch, in order.
    ///
    /// # Errors
    ///
    /// Stops at the first failing item and returns
    /// [`EngineError::ItemFailed`] carrying its index, id and cause.
    pub fn calculate_batch(&self, items: &[ItemInput]) -> EngineResult<BatchResult> {
        let start_time = Instant::now();
        let mut results = Vec::with_capacity(items.len());

        for (index, item) in items.iter().enumerate() {
            match self.calculate_item(item) {
                Ok(result) => results.push(result),
                Err(err) => {
                    warn!(
                        index,
                        item_id = %item.item_id,
                        error = %err,
                        "batch aborted"
                    );
                    return Err(EngineError::ItemFailed {
                        index,
                        item_id: item.item_id.clone(),
                        source: Box::new(err),
                    });
                }
            }
        }

        let totals = batch_totals(&results)?;
        info!(
            items = totals.item_count,
            grand_total = %totals.grand_total,
            duration_us = start_time.elapsed().as_micros() as u64,
            "batch calculated"
        );
        Ok(BatchResult {
            items: results,
            totals,
        })
    }
}

fn batch_totals(results: &[ItemTaxResult]) -> EngineResult<BatchTotals> {
    let currency = results
        .first()
        .map(|r| r.total.currency())
        .unwrap_or(Currency::Brl);

    let legacy: Vec<Money> = results.iter().map(|r| r.breakdown.legacy.total).collect();
    let new_system: Vec<Money> = results
        .iter()
        .map(|r| r.breakdown.new_system.total)
        .collect();

    let legacy_total = sum_money(currency, &legacy)?;
    let new_system_total = sum_money(currency, &new_system)?;
    Ok(BatchTotals {
        item_count: results.len(),
        legacy_total,
        new_system_total,
        grand_total: legacy_total.checked_add(&new_system_total)?,
    })
}

fn warning(code: &str, message: String, severity: &str) -> AuditWarning {
    AuditWarning {
        code: code.to_string(),
        message,
        severity: severity.to_string(),
    }
}

/// Parameters the engine accepted but did not use, and inconsistent
/// classification fields that do not block the calculation.
fn collect_warnings(item: &ItemInput, engine: EngineType, rates: &PeriodRates) -> Vec<AuditWarning> {
    let mut warnings = Vec::new();
    let year = item.operation_date.year();

    let intrastate = !item.cfop.is_interstate() && !item.cfop.is_foreign();
    let same_state = item.origin_uf == item.destination_uf;
    if intrastate != same_state && !item.cfop.is_foreign() {
        warnings.push(warning(
            "CFOP_SCOPE_MISMATCH",
            format!(
                "CFOP {} does not match an operation from {} to {}",
                item.cfop, item.origin_uf, item.destination_uf
            ),
            "medium",
        ));
    }

    if let Some(selective) = &item.taxes.selective {
        if !is_subject_to_selective_tax(&selective.ncm) {
            warnings.push(warning(
                "SELECTIVE_TAX_NOT_APPLICABLE",
                format!("NCM {} is not in a selective tax category", selective.ncm),
                "medium",
            ));
        }
        if engine != EngineType::New && year < SELECTIVE_TAX_START_YEAR {
            warnings.push(warning(
                "SELECTIVE_TAX_NOT_IN_FORCE",
                format!(
                    "selective tax is charged from {}; parameters ignored",
                    SELECTIVE_TAX_START_YEAR
                ),
                "low",
            ));
        }
    }

    if engine == EngineType::Transition
        && item.taxes.pis_cofins.is_some()
        && rates.pis_cofins_multiplier.is_zero()
    {
        warnings.push(warning(
            "CONTRIBUTIONS_EXTINCT",
            format!("PIS and COFINS are not charged in {}; CBS replaces them", year),
            "low",
        ));
    }

    if engine == EngineType::Current
        && (item.taxes.reduction.is_some() || item.taxes.deferral.is_some())
    {
        warnings.push(warning(
            "NEW_SYSTEM_NOT_IN_FORCE",
            format!("IBS and CBS are not charged in {}; benefits ignored", year),
            "low",
        ));
    }

    warnings
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calculation::{ContributionRegime, IcmsParams, PisCofinsParams};
    use crate::engine::TransitionSchedule;
    use crate::models::{LegacySituationCode, PisCofinsSituationCode};
    use rust_decimal::Decimal;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn uf(s: &str) -> UfCode {
        UfCode::from_str(s).unwrap()
    }

    fn item(id: &str, on: NaiveDate) -> ItemInput {
        ItemInput::new(
            id,
            CalculationBase::brl(dec("1000")).unwrap(),
            on,
            CfopCode::from_str("5102").unwrap(),
            NcmCode::from_str("84713012").unwrap(),
            uf("RJ"),
            uf("RJ"),
        )
    }

    fn with_legacy(mut item: ItemInput) -> ItemInput {
        item.taxes.icms = Some(IcmsParams::normal(
            LegacySituationCode::from_str("000").unwrap(),
            Rate::new(dec("18")).unwrap(),
        ));
        item.taxes.pis_cofins = Some(PisCofinsParams::new(
            PisCofinsSituationCode::from_str("01").unwrap(),
            ContributionRegime::NonCumulative,
        ));
        item
    }

    #[test]
    fn test_legacy_year_has_zero_new_taxes() {
        let service = TaxCalculationService::statutory();
        let result = service
            .calculate_item(&with_legacy(item("a", date(2025, 6, 1))))
            .unwrap();

        assert_eq!(result.engine, EngineType::Current);
        // 180 + 16.50 + 76
        assert_eq!(result.total.amount(), dec("272.50"));
        assert!(result.ibs_state.is_zero());
        assert!(result.cbs.is_zero());
        assert_eq!(result.audit_trace.steps.len(), 3);
        assert!(result.period.starts_with("Legacy system"));
    }

    struct FixedSchedule(TransitionSchedule);

    impl RateProvider for FixedSchedule {
        fn rates_for(
            &self,
            _uf: UfCode,
            _municipality: Option<&MunicipalityCode>,
            date: NaiveDate,
        ) -> EngineResult<PeriodRates> {
            Ok(self.0.for_period(date.year()))
        }

        fn schedule(&self) -> &TransitionSchedule {
            &self.0
        }
    }

    #[test]
    fn test_period_text_matches_the_applied_schedule() {
        let mut rows: Vec<_> = TransitionSchedule::statutory().rows().copied().collect();
        for row in rows.iter_mut().filter(|r| r.year == 2029) {
            row.icms_iss_multiplier = dec("0.5");
        }
        let service =
            TaxCalculationService::new(FixedSchedule(TransitionSchedule::from_rows(rows).unwrap()));
        let result = service
            .calculate_item(&with_legacy(item("custom", date(2029, 4, 2))))
            .unwrap();

        let icms = result.breakdown.legacy.icms.as_ref().unwrap();
        assert_eq!(icms.value().amount(), dec("90.00"));
        assert!(result.period.contains("ICMS/ISS at 50%"));
    }

    #[test]
    fn test_transition_year_combines_both_systems() {
        let service = TaxCalculationService::statutory();
        let result = service
            .calculate_item(&with_legacy(item("b", date(2026, 3, 15))))
            .unwrap();

        assert_eq!(result.engine, EngineType::Transition);
        assert_eq!(result.ibs_state.value().amount(), dec("0.50"));
        assert_eq!(result.ibs_municipal.value().amount(), dec("0.50"));
        assert_eq!(result.cbs.value().amount(), dec("9.00"));
        assert_eq!(result.breakdown.legacy.total.amount(), dec("272.50"));
        assert_eq!(result.total.amount(), dec("282.50"));
        assert_eq!(result.engine_version, env!("CARGO_PKG_VERSION"));
    }

    #[test]
    fn test_contributions_extinct_warning() {
        let service = TaxCalculationService::statutory();
        let result = service
            .calculate_item(&with_legacy(item("c", date(2028, 1, 10))))
            .unwrap();

        assert!(result.breakdown.legacy.pis.is_none());
        assert!(
            result
                .audit_trace
                .warnings
                .iter()
                .any(|w| w.code == "CONTRIBUTIONS_EXTINCT")
        );
    }

    #[test]
    fn test_new_system_year() {
        let service = TaxCalculationService::statutory();
        let result = service.calculate_item(&item("d", date(2033, 1, 1))).unwrap();

        assert_eq!(result.engine, EngineType::New);
        assert_eq!(result.ibs_state.value().amount(), dec("88.50"));
        assert_eq!(result.cbs.value().amount(), dec("88.00"));
        assert_eq!(result.total.amount(), dec("265.00"));
    }

    #[test]
    fn test_new_system_rejects_legacy_params() {
        let service = TaxCalculationService::statutory();
        let err = service
            .calculate_item(&with_legacy(item("e", date(2034, 1, 1))))
            .unwrap_err();
        assert!(matches!(err, EngineError::UnsupportedOperation { .. }));
    }

    #[test]
    fn test_date_outside_window() {
        let service = TaxCalculationService::statutory();
        assert!(matches!(
            service.calculate_item(&item("f", date(2019, 12, 31))),
            Err(EngineError::DateOutOfRange { .. })
        ));
    }

    #[test]
    fn test_municipality_must_belong_to_destination() {
        let service = TaxCalculationService::statutory();
        let mut input = item("g", date(2030, 1, 1));
        input.destination_municipality = Some(MunicipalityCode::from_str("3550308").unwrap());

        match service.calculate_item(&input) {
            Err(EngineError::Validation { field, .. }) => {
                assert_eq!(field, "destination_municipality")
            }
            other => panic!("Expected validation error, got {:?}", other),
        }
    }

    #[test]
    fn test_cfop_scope_mismatch_is_a_warning() {
        let service = TaxCalculationService::statutory();
        let mut input = item("h", date(2033, 5, 1));
        input.destination_uf = uf("SP");

        let result = service.calculate_item(&input).unwrap();
        assert_eq!(result.audit_trace.warnings.len(), 1);
        assert_eq!(result.audit_trace.warnings[0].code, "CFOP_SCOPE_MISMATCH");
    }

    #[test]
    fn test_batch_totals() {
        let service = TaxCalculationService::statutory();
        let items = vec![
            with_legacy(item("1", date(2026, 3, 15))),
            item("2", date(2033, 1, 1)),
        ];
        let batch = service.calculate_batch(&items).unwrap();

        assert_eq!(batch.totals.item_count, 2);
        assert_eq!(batch.totals.legacy_total.amount(), dec("272.50"));
        // 10.00 + 265.00
        assert_eq!(batch.totals.new_system_total.amount(), dec("275.00"));
        assert_eq!(batch.totals.grand_total.amount(), dec("547.50"));
        assert_eq!(batch.items[1].item_id, "2");
    }

    #[test]
    fn test_batch_aborts_on_first_failure() {
        let service = TaxCalculationService::statutory();
        let items = vec![
            item("ok", date(2030, 1, 1)),
            item("too-early", date(2010, 1, 1)),
            item("never-reached", date(2060, 1, 1)),
        ];

        match service.calculate_batch(&items) {
            Err(EngineError::ItemFailed {
                index,
                item_id,
                source,
            }) => {
                assert_eq!(index, 1);
                assert_eq!(item_id, "too-early");
                assert!(matches!(*source, EngineError::DateOutOfRange { .. }));
            }
            other => panic!("Expected ItemFailed, got {:?}", other),
        }
    }

    #[test]
    fn test_empty_batch() {
        let batch = TaxCalculationService::statutory()
            .calculate_batch(&[])
            .unwrap();
        assert_eq!(batch.totals.item_count, 0);
        assert!(batch.totals.grand_total.is_zero());
    }
}
