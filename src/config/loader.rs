//! Configuration loading functionality.
//!
//! This module provides the [`ConfigLoader`] type for loading the rate
//! schedule and regional overrides from YAML files.

use std::fs;
use std::path::Path;

use chrono::{Datelike, NaiveDate};
use tracing::debug;

use crate::engine::{
    MAX_SUPPORTED_YEAR, MIN_SUPPORTED_YEAR, PeriodRates, RateProvider, TransitionSchedule,
};
use crate::error::{EngineError, EngineResult};
use crate::models::{MunicipalityCode, UfCode};

use super::types::{OverrideFile, RegionalOverride, ScheduleFile, ScheduleMetadata};

/// Loads and provides access to the rate schedule.
///
/// # Directory Structure
///
/// ```text
/// config/statutory/
/// ├── schedule.yaml        # Year-by-year transition schedule
/// └── overrides/           # Optional regional IBS rates
///     └── sp.yaml
/// ```
///
/// # Example
///
/// ```no_run
/// use brtax_engine::config::ConfigLoader;
/// use brtax_engine::engine::RateProvider;
/// use brtax_engine::models::UfCode;
/// use chrono::NaiveDate;
///
/// let loader = ConfigLoader::load("./config/statutory").unwrap();
/// let date = NaiveDate::from_ymd_opt(2030, 1, 15).unwrap();
/// let rates = loader.rates_for("SP".parse::<UfCode>().unwrap(), None, date).unwrap();
/// println!("IBS in 2030: {}%", rates.ibs_total());
/// ```
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    metadata: ScheduleMetadata,
    schedule: TransitionSchedule,
    overrides: Vec<RegionalOverride>,
}

impl ConfigLoader {
    /// Loads configuration from the specified directory.
    ///
    /// # Returns
    ///
    /// Returns a `ConfigLoader` instance on success, or an error if:
    /// - `schedule.yaml` is missing
    /// - Any file contains invalid YAML or an out-of-range rate
    /// - The schedule repeats a year or has a multiplier outside `[0, 1]`
    pub fn load<P: AsRef<Path>>(path: P) -> EngineResult<Self> {
        let path = path.as_ref();

        let schedule_path = path.join("schedule.yaml");
        let file = Self::load_yaml::<ScheduleFile>(&schedule_path)?;
        let schedule = TransitionSchedule::from_rows(file.years)?;

        let overrides = Self::load_overrides(&path.join("overrides"))?;
        let (first_year, _) = schedule.span();
        if let Some(early) = overrides.iter().find(|o| o.year < first_year) {
            return Err(EngineError::validation(
                "overrides",
                format!(
                    "override for {} starts in {}, before the schedule begins in {}",
                    early.uf, early.year, first_year
                ),
            ));
        }

        debug!(
            path = %path.display(),
            years = schedule.rows().count(),
            overrides = overrides.len(),
            "loaded rate configuration"
        );

        Ok(Self {
            metadata: file.metadata,
            schedule,
            overrides,
        })
    }

    /// Loads and parses a YAML file.
    fn load_yaml<T: serde::de::DeserializeOwned>(path: &Path) -> EngineResult<T> {
        let path_str = path.display().to_string();

        let content = fs::read_to_string(path).map_err(|_| EngineError::ConfigNotFound {
            path: path_str.clone(),
        })?;

        serde_yaml::from_str(&content).map_err(|e| EngineError::ConfigParseError {
            path: path_str,
            message: e.to_string(),
        })
    }

    /// Loads every override file; a missing directory means no overrides.
    fn load_overrides(dir: &Path) -> EngineResult<Vec<RegionalOverride>> {
        if !dir.exists() {
            return Ok(Vec::new());
        }
        let dir_str = dir.display().to_string();

        let entries = fs::read_dir(dir).map_err(|_| EngineError::ConfigNotFound {
            path: dir_str.clone(),
        })?;

        let mut paths = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|_| EngineError::ConfigNotFound {
                path: dir_str.clone(),
            })?;
            let path = entry.path();
            if path.extension().is_some_and(|ext| ext == "yaml") {
                paths.push(path);
            }
        }
        paths.sort();

        let mut overrides = Vec::new();
        for path in paths {
            let file = Self::load_yaml::<OverrideFile>(&path)?;
            overrides.extend(RegionalOverride::from_file(file));
        }
        overrides.sort_by_key(|o| o.year);
        Ok(overrides)
    }

    /// Returns the schedule metadata.
    pub fn metadata(&self) -> &ScheduleMetadata {
        &self.metadata
    }

    /// Returns the regional overrides, ordered by year.
    pub fn overrides(&self) -> &[RegionalOverride] {
        &self.overrides
    }

    /// The most specific override in force for a location and year.
    ///
    /// A municipal entry wins over a state-wide one; among entries of the
    /// same kind the latest year wins.
    fn find_override(
        &self,
        uf: UfCode,
        municipality: Option<&MunicipalityCode>,
        year: i32,
    ) -> Option<&RegionalOverride> {
        let applicable = || {
            self.overrides
                .iter()
                .rev()
                .filter(move |o| o.applies_to(uf, municipality, year))
        };
        applicable()
            .find(|o| o.municipality.is_some())
            .or_else(|| applicable().next())
    }
}

impl RateProvider for ConfigLoader {
    fn rates_for(
        &self,
        uf: UfCode,
        municipality: Option<&MunicipalityCode>,
        date: NaiveDate,
    ) -> EngineResult<PeriodRates> {
        let year = date.year();
        if !(MIN_SUPPORTED_YEAR..=MAX_SUPPORTED_YEAR).contains(&year) {
            return Err(EngineError::RateNotFound {
                uf: uf.to_string(),
                date,
            });
        }

        let rates = self.schedule.for_period(year);
        Ok(match self.find_override(uf, municipality, year) {
            Some(o) => rates.with_ibs(o.ibs_state, o.ibs_municipal),
            None => rates,
        })
    }

    fn schedule(&self) -> &TransitionSchedule {
        &self.schedule
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;
    use std::str::FromStr;

    fn config_path() -> &'static str {
        "./config/statutory"
    }

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn uf(s: &str) -> UfCode {
        UfCode::from_str(s).unwrap()
    }

    #[test]
    fn test_load_valid_configuration() {
        let result = ConfigLoader::load(config_path());
        assert!(result.is_ok(), "Failed to load config: {:?}", result.err());

        let loader = result.unwrap();
        assert_eq!(loader.metadata().legal_basis, "LC 214/2025");
    }

    #[test]
    fn test_shipped_schedule_matches_statutory_table() {
        let loader = ConfigLoader::load(config_path()).unwrap();
        assert_eq!(loader.schedule(), &TransitionSchedule::statutory());
    }

    #[test]
    fn test_rates_without_override_follow_schedule() {
        let loader = ConfigLoader::load(config_path()).unwrap();

        let rates = loader.rates_for(uf("RJ"), None, date(2029, 5, 1)).unwrap();
        assert_eq!(rates.ibs_total(), dec("1.77"));
        assert_eq!(rates.icms_iss_multiplier, dec("0.9"));
    }

    #[test]
    fn test_state_override_applies_from_its_year() {
        let loader = ConfigLoader::load(config_path()).unwrap();

        let before = loader.rates_for(uf("SP"), None, date(2032, 12, 31)).unwrap();
        assert_eq!(before.ibs_total(), dec("10.62"));

        let after = loader.rates_for(uf("SP"), None, date(2035, 1, 1)).unwrap();
        assert_eq!(after.ibs_state.percentage(), dec("9.5"));
        assert_eq!(after.ibs_municipal.percentage(), dec("8.5"));
        assert_eq!(after.cbs.percentage(), dec("8.8"));
    }

    #[test]
    fn test_municipal_override_wins_over_state() {
        let loader = ConfigLoader::load(config_path()).unwrap();
        let capital = MunicipalityCode::from_str("3550308").unwrap();

        let rates = loader
            .rates_for(uf("SP"), Some(&capital), date(2034, 3, 1))
            .unwrap();
        assert_eq!(rates.ibs_municipal.percentage(), dec("9"));
    }

    #[test]
    fn test_rates_outside_window_not_found() {
        let loader = ConfigLoader::load(config_path()).unwrap();
        let result = loader.rates_for(uf("SP"), None, date(2060, 1, 1));

        match result {
            Err(EngineError::RateNotFound { uf, date: d }) => {
                assert_eq!(uf, "SP");
                assert_eq!(d, date(2060, 1, 1));
            }
            _ => panic!("Expected RateNotFound error"),
        }
    }

    #[test]
    fn test_load_missing_directory_returns_error() {
        let result = ConfigLoader::load("/nonexistent/path");

        match result {
            Err(EngineError::ConfigNotFound { path }) => {
                assert!(path.contains("schedule.yaml"));
            }
            _ => panic!("Expected ConfigNotFound error"),
        }
    }
}
