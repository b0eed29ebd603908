//! Engine selection by operation date.
//!
//! The engine is a step function of the calendar year: up to 2025 the
//! current engine, 2026 to 2032 the transition engine, from 2033 the new
//! engine. Engines are stateless, so one instance per type is built on first
//! use and shared for the life of the process.

use std::sync::LazyLock;

use chrono::{Datelike, NaiveDate};
use rust_decimal::Decimal;
use tracing::debug;

use crate::error::{EngineError, EngineResult};
use crate::models::TaxKind;

use super::transition::SELECTIVE_TAX_START_YEAR;
use super::{
    CurrentEngine, EngineType, NEW_SYSTEM_START_YEAR, NewEngine, TRANSITION_START_YEAR, TaxEngine,
    TransitionEngine, TransitionSchedule,
};

/// First year accepted by [`validate_date`].
pub const MIN_SUPPORTED_YEAR: i32 = 2020;

/// Last year accepted by [`validate_date`].
pub const MAX_SUPPORTED_YEAR: i32 = 2050;

static CURRENT: LazyLock<TaxEngine> = LazyLock::new(|| {
    debug!(engine = "current", "constructing tax engine");
    TaxEngine::Current(CurrentEngine)
});

static TRANSITION: LazyLock<TaxEngine> = LazyLock::new(|| {
    debug!(engine = "transition", "constructing tax engine");
    TaxEngine::Transition(TransitionEngine::default())
});

static NEW: LazyLock<TaxEngine> = LazyLock::new(|| {
    debug!(engine = "new", "constructing tax engine");
    TaxEngine::New(NewEngine)
});

/// The engine type for a calendar year.
pub fn engine_type_for_year(year: i32) -> EngineType {
    if year < TRANSITION_START_YEAR {
        EngineType::Current
    } else if year < NEW_SYSTEM_START_YEAR {
        EngineType::Transition
    } else {
        EngineType::New
    }
}

/// The engine type for an operation date.
///
/// ```
/// use brtax_engine::engine::{EngineType, engine_type_for};
/// use chrono::NaiveDate;
///
/// let last_legacy_day = NaiveDate::from_ymd_opt(2025, 12, 31).unwrap();
/// let first_new_day = NaiveDate::from_ymd_opt(2033, 1, 1).unwrap();
/// assert_eq!(engine_type_for(last_legacy_day), EngineType::Current);
/// assert_eq!(engine_type_for(first_new_day), EngineType::New);
/// ```
pub fn engine_type_for(date: NaiveDate) -> EngineType {
    engine_type_for_year(date.year())
}

/// The shared engine instance of a type.
pub fn engine_for_type(engine_type: EngineType) -> &'static TaxEngine {
    match engine_type {
        EngineType::Current => &*CURRENT,
        EngineType::Transition => &*TRANSITION,
        EngineType::New => &*NEW,
    }
}

/// The shared engine for an operation date.
pub fn engine_for_date(date: NaiveDate) -> &'static TaxEngine {
    let engine_type = engine_type_for(date);
    debug!(%date, engine = %engine_type, "selected tax engine");
    engine_for_type(engine_type)
}

/// Fails with [`EngineError::DateOutOfRange`] outside 2020 to 2050.
pub fn validate_date(date: NaiveDate) -> EngineResult<()> {
    let year = date.year();
    if !(MIN_SUPPORTED_YEAR..=MAX_SUPPORTED_YEAR).contains(&year) {
        return Err(EngineError::DateOutOfRange {
            date,
            min_year: MIN_SUPPORTED_YEAR,
            max_year: MAX_SUPPORTED_YEAR,
        });
    }
    Ok(())
}

/// The taxes charged in a calendar year under `schedule`.
pub fn live_taxes(schedule: &TransitionSchedule, year: i32) -> Vec<TaxKind> {
    match engine_type_for_year(year) {
        EngineType::Current => TaxKind::LEGACY.to_vec(),
        EngineType::New => TaxKind::NEW_SYSTEM.to_vec(),
        EngineType::Transition => {
            let rates = schedule.for_period(year);
            let mut taxes = Vec::new();
            if !rates.icms_iss_multiplier.is_zero() {
                taxes.push(TaxKind::Icms);
            }
            taxes.push(TaxKind::Ipi);
            if !rates.pis_cofins_multiplier.is_zero() {
                taxes.push(TaxKind::Pis);
                taxes.push(TaxKind::Cofins);
            }
            if !rates.icms_iss_multiplier.is_zero() {
                taxes.push(TaxKind::Iss);
            }
            taxes.push(TaxKind::Ibs);
            taxes.push(TaxKind::Cbs);
            if year >= SELECTIVE_TAX_START_YEAR {
                taxes.push(TaxKind::Is);
            }
            taxes
        }
    }
}

fn names(taxes: &[TaxKind]) -> String {
    taxes
        .iter()
        .map(|t| t.name())
        .collect::<Vec<_>>()
        .join(", ")
}

/// A human-readable description of the tax period of a date, with the
/// transition rates taken from `schedule`.
///
/// ```
/// use brtax_engine::engine::{TransitionSchedule, describe_period};
/// use chrono::NaiveDate;
///
/// let schedule = TransitionSchedule::statutory();
/// let text = describe_period(&schedule, NaiveDate::from_ymd_opt(2029, 3, 10).unwrap());
/// assert!(text.starts_with("Transition 2029"));
/// assert!(text.contains("ICMS/ISS at 90%"));
/// ```
pub fn describe_period(schedule: &TransitionSchedule, date: NaiveDate) -> String {
    let year = date.year();
    let taxes = live_taxes(schedule, year);
    match engine_type_for_year(year) {
        EngineType::Current => format!(
            "Legacy system (until {}): {}",
            TRANSITION_START_YEAR - 1,
            names(&taxes)
        ),
        EngineType::New => format!(
            "New system (from {}): {}",
            NEW_SYSTEM_START_YEAR,
            names(&taxes)
        ),
        EngineType::Transition => {
            let rates = schedule.for_period(year);
            format!(
                "Transition {}: {} (ICMS/ISS at {}%, IBS {}%, CBS {}%)",
                year,
                names(&taxes),
                (rates.icms_iss_multiplier * Decimal::ONE_HUNDRED).normalize(),
                rates.ibs_total().normalize(),
                rates.cbs.percentage().normalize()
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn statutory() -> TransitionSchedule {
        TransitionSchedule::statutory()
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_year_boundaries() {
        assert_eq!(engine_type_for(date(2025, 12, 31)), EngineType::Current);
        assert_eq!(engine_type_for(date(2026, 1, 1)), EngineType::Transition);
        assert_eq!(engine_type_for(date(2032, 12, 31)), EngineType::Transition);
        assert_eq!(engine_type_for(date(2033, 1, 1)), EngineType::New);
    }

    #[test]
    fn test_engines_are_shared() {
        let a = engine_for_date(date(2027, 5, 1));
        let b = engine_for_date(date(2031, 8, 20));
        assert!(std::ptr::eq(a, b));
        assert_eq!(a.engine_type(), EngineType::Transition);
        assert!(!std::ptr::eq(a, engine_for_date(date(2034, 1, 1))));
    }

    #[test]
    fn test_validate_date_window() {
        assert!(validate_date(date(2020, 1, 1)).is_ok());
        assert!(validate_date(date(2050, 12, 31)).is_ok());
        assert!(matches!(
            validate_date(date(2019, 12, 31)),
            Err(EngineError::DateOutOfRange { min_year: 2020, max_year: 2050, .. })
        ));
        assert!(validate_date(date(2051, 1, 1)).is_err());
    }

    #[test]
    fn test_live_taxes() {
        assert_eq!(live_taxes(&statutory(), 2025), TaxKind::LEGACY.to_vec());
        assert_eq!(
            live_taxes(&statutory(), 2026),
            vec![
                TaxKind::Icms,
                TaxKind::Ipi,
                TaxKind::Pis,
                TaxKind::Cofins,
                TaxKind::Iss,
                TaxKind::Ibs,
                TaxKind::Cbs
            ]
        );
        assert!(!live_taxes(&statutory(), 2027).contains(&TaxKind::Pis));
        assert!(live_taxes(&statutory(), 2027).contains(&TaxKind::Is));
        assert_eq!(live_taxes(&statutory(), 2040), TaxKind::NEW_SYSTEM.to_vec());
    }

    #[test]
    fn test_describe_period() {
        assert!(describe_period(&statutory(), date(2024, 1, 1)).starts_with("Legacy system"));
        assert!(describe_period(&statutory(), date(2035, 1, 1)).starts_with("New system"));
        let transition = describe_period(&statutory(), date(2026, 6, 1));
        assert!(transition.contains("IBS 0.1%"));
        assert!(transition.contains("CBS 0.9%"));
    }

    #[test]
    fn test_period_follows_the_given_schedule() {
        let mut rows: Vec<_> = statutory().rows().copied().collect();
        for row in rows.iter_mut().filter(|r| r.year == 2029) {
            row.icms_iss_multiplier = Decimal::ZERO;
        }
        let custom = TransitionSchedule::from_rows(rows).unwrap();

        let taxes = live_taxes(&custom, 2029);
        assert!(!taxes.contains(&TaxKind::Icms));
        assert!(!taxes.contains(&TaxKind::Iss));
        assert!(live_taxes(&statutory(), 2029).contains(&TaxKind::Icms));
        assert!(describe_period(&custom, date(2029, 3, 10)).contains("ICMS/ISS at 0%"));
    }
}
