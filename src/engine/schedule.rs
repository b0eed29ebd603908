//! The transition rate schedule.
//!
//! One table drives both the Transition engine and the per-item IBS/CBS
//! rates used by the orchestrator. Each row gives, for a calendar year, the
//! multiplier applied to ICMS/ISS, the multiplier applied to PIS/COFINS, and
//! the IBS (state and municipal) and CBS rates.

use std::collections::BTreeMap;

use chrono::{Datelike, NaiveDate};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::{EngineError, EngineResult};
use crate::models::{CbsRate, IbsRate, MunicipalityCode, UfCode};

/// First year of the transition.
pub const TRANSITION_START_YEAR: i32 = 2026;

/// First year of the new system in full.
pub const NEW_SYSTEM_START_YEAR: i32 = 2033;

/// Rates in force for one calendar year.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeriodRates {
    /// The calendar year.
    pub year: i32,
    /// Share of ICMS and ISS still charged, in `[0, 1]`.
    pub icms_iss_multiplier: Decimal,
    /// Share of PIS and COFINS still charged, in `[0, 1]`.
    pub pis_cofins_multiplier: Decimal,
    /// IBS state rate.
    pub ibs_state: IbsRate,
    /// IBS municipal rate.
    pub ibs_municipal: IbsRate,
    /// CBS rate.
    pub cbs: CbsRate,
}

impl PeriodRates {
    /// Rates before the reform: legacy taxes in full, no IBS or CBS.
    pub fn pre_reform(year: i32) -> Self {
        Self {
            year,
            icms_iss_multiplier: Decimal::ONE,
            pis_cofins_multiplier: Decimal::ONE,
            ibs_state: IbsRate::zero(),
            ibs_municipal: IbsRate::zero(),
            cbs: CbsRate::zero(),
        }
    }

    /// Combined IBS percentage (state plus municipal).
    pub fn ibs_total(&self) -> Decimal {
        self.ibs_state.percentage() + self.ibs_municipal.percentage()
    }

    /// Returns a copy with the same year and different IBS shares.
    pub fn with_ibs(&self, state: IbsRate, municipal: IbsRate) -> Self {
        Self {
            ibs_state: state,
            ibs_municipal: municipal,
            ..*self
        }
    }

    fn validate(&self) -> EngineResult<()> {
        for (field, value) in [
            ("icms_iss_multiplier", self.icms_iss_multiplier),
            ("pis_cofins_multiplier", self.pis_cofins_multiplier),
        ] {
            if value < Decimal::ZERO || value > Decimal::ONE {
                return Err(EngineError::validation(
                    field,
                    format!("{} for {} must be between 0 and 1", value, self.year),
                ));
            }
        }
        Ok(())
    }
}

fn statutory_row(
    year: i32,
    icms_iss: Decimal,
    pis_cofins: Decimal,
    ibs_total: Decimal,
    cbs: Decimal,
) -> PeriodRates {
    let half = ibs_total / Decimal::TWO;
    PeriodRates {
        year,
        icms_iss_multiplier: icms_iss,
        pis_cofins_multiplier: pis_cofins,
        ibs_state: IbsRate::statutory(half),
        ibs_municipal: IbsRate::statutory(half),
        cbs: CbsRate::statutory(cbs),
    }
}

/// A year-indexed schedule of [`PeriodRates`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransitionSchedule {
    rows: BTreeMap<i32, PeriodRates>,
}

impl TransitionSchedule {
    /// The schedule set by LC 214/2025 for 2026 to 2033.
    ///
    /// IBS is split evenly between the state and municipal shares.
    pub fn statutory() -> Self {
        let d = |units: i64, scale: u32| Decimal::new(units, scale);
        let rows = [
            statutory_row(2026, Decimal::ONE, Decimal::ONE, d(1, 1), d(9, 1)),
            statutory_row(2027, Decimal::ONE, Decimal::ZERO, d(1, 1), d(88, 1)),
            statutory_row(2028, Decimal::ONE, Decimal::ZERO, d(1, 1), d(88, 1)),
            statutory_row(2029, d(9, 1), Decimal::ZERO, d(177, 2), d(88, 1)),
            statutory_row(2030, d(8, 1), Decimal::ZERO, d(354, 2), d(88, 1)),
            statutory_row(2031, d(6, 1), Decimal::ZERO, d(708, 2), d(88, 1)),
            statutory_row(2032, d(4, 1), Decimal::ZERO, d(1062, 2), d(88, 1)),
            statutory_row(2033, Decimal::ZERO, Decimal::ZERO, d(177, 1), d(88, 1)),
        ];
        Self {
            rows: rows.into_iter().map(|r| (r.year, r)).collect(),
        }
    }

    /// Builds a schedule from rows, rejecting empty input, duplicate years
    /// and multipliers outside `[0, 1]`.
    pub fn from_rows(rows: Vec<PeriodRates>) -> EngineResult<Self> {
        if rows.is_empty() {
            return Err(EngineError::validation("schedule", "must contain at least one year"));
        }
        let mut map = BTreeMap::new();
        for row in rows {
            row.validate()?;
            if map.insert(row.year, row).is_some() {
                return Err(EngineError::validation(
                    "schedule",
                    format!("year {} appears more than once", row.year),
                ));
            }
        }
        Ok(Self { rows: map })
    }

    /// The row for exactly `year`.
    pub fn row(&self, year: i32) -> Option<&PeriodRates> {
        self.rows.get(&year)
    }

    /// Every row, in year order.
    pub fn rows(&self) -> impl Iterator<Item = &PeriodRates> {
        self.rows.values()
    }

    /// First and last year covered.
    pub fn span(&self) -> (i32, i32) {
        let first = self.rows.keys().next().copied().unwrap_or(TRANSITION_START_YEAR);
        let last = self.rows.keys().next_back().copied().unwrap_or(NEW_SYSTEM_START_YEAR);
        (first, last)
    }

    fn first_row(&self) -> PeriodRates {
        self.rows
            .values()
            .next()
            .copied()
            .unwrap_or_else(|| PeriodRates::pre_reform(TRANSITION_START_YEAR))
    }

    /// The row for `year`; years without a row fall back to the first row.
    ///
    /// This is the lookup the Transition engine uses.
    pub fn lookup(&self, year: i32) -> PeriodRates {
        match self.rows.get(&year) {
            Some(row) => *row,
            None => PeriodRates {
                year,
                ..self.first_row()
            },
        }
    }

    /// The rates in force in `year` across the whole timeline.
    ///
    /// Years before the schedule get the pre-reform rates, years after it
    /// keep the last row, and gaps fall back like [`lookup`](Self::lookup).
    pub fn for_period(&self, year: i32) -> PeriodRates {
        let (first, last) = self.span();
        if year < first {
            return PeriodRates::pre_reform(year);
        }
        if year > last {
            if let Some(row) = self.rows.get(&last) {
                return PeriodRates { year, ..*row };
            }
        }
        self.lookup(year)
    }
}

impl Default for TransitionSchedule {
    fn default() -> Self {
        Self::statutory()
    }
}

/// Source of IBS/CBS rates and transition multipliers for an operation.
///
/// In production the rates depend on the destination state and
/// municipality as well as on the date; implementations decide how much of
/// that key they honour.
pub trait RateProvider: Send + Sync {
    /// The rates in force for an operation.
    fn rates_for(
        &self,
        uf: UfCode,
        municipality: Option<&MunicipalityCode>,
        date: NaiveDate,
    ) -> EngineResult<PeriodRates>;

    /// The year schedule the provider's rates start from, before regional
    /// overrides.
    fn schedule(&self) -> &TransitionSchedule;
}

/// The statutory schedule, identical for every state and municipality.
#[derive(Debug, Clone, Default)]
pub struct StatutoryRates {
    schedule: TransitionSchedule,
}

impl StatutoryRates {
    /// Creates a provider backed by [`TransitionSchedule::statutory`].
    pub fn new() -> Self {
        Self::default()
    }
}

impl RateProvider for StatutoryRates {
    fn rates_for(
        &self,
        _uf: UfCode,
        _municipality: Option<&MunicipalityCode>,
        date: NaiveDate,
    ) -> EngineResult<PeriodRates> {
        Ok(self.schedule.for_period(date.year()))
    }

    fn schedule(&self) -> &TransitionSchedule {
        &self.schedule
    }
}

impl<P: RateProvider + ?Sized> RateProvider for std::sync::Arc<P> {
    fn rates_for(
        &self,
        uf: UfCode,
        municipality: Option<&MunicipalityCode>,
        date: NaiveDate,
    ) -> EngineResult<PeriodRates> {
        (**self).rates_for(uf, municipality, date)
    }

    fn schedule(&self) -> &TransitionSchedule {
        (**self).schedule()
    }
}
