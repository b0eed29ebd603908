//! Configuration types for the rate schedule.
//!
//! These structures are deserialized from the YAML files of a configuration
//! directory. Rates deserialize through their validating constructors, so an
//! out-of-range percentage fails at load time.

use serde::Deserialize;

use crate::engine::PeriodRates;
use crate::models::{IbsRate, MunicipalityCode, UfCode};

/// Metadata about the schedule.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ScheduleMetadata {
    /// Human-readable name.
    pub name: String,
    /// The law that sets the schedule.
    pub legal_basis: String,
    /// Version or publication date of the schedule.
    pub version: String,
}

/// Structure of `schedule.yaml`.
#[derive(Debug, Clone, Deserialize)]
pub struct ScheduleFile {
    /// Schedule metadata.
    pub metadata: ScheduleMetadata,
    /// One row per calendar year.
    pub years: Vec<PeriodRates>,
}

/// One regional IBS rate entry inside an override file.
#[derive(Debug, Clone, Deserialize)]
pub struct OverrideEntry {
    /// First year the entry applies to; it stays in force until a later entry.
    pub year: i32,
    /// Restricts the entry to one municipality of the state.
    #[serde(default)]
    pub municipality: Option<MunicipalityCode>,
    /// IBS state rate.
    pub ibs_state: IbsRate,
    /// IBS municipal rate.
    pub ibs_municipal: IbsRate,
}

/// Structure of a file under `overrides/`.
#[derive(Debug, Clone, Deserialize)]
pub struct OverrideFile {
    /// The state the file applies to.
    pub uf: UfCode,
    /// Rate entries.
    pub rates: Vec<OverrideEntry>,
}

/// A regional IBS rate, flattened from an override file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegionalOverride {
    /// State.
    pub uf: UfCode,
    /// Municipality, or `None` for the whole state.
    pub municipality: Option<MunicipalityCode>,
    /// First year in force.
    pub year: i32,
    /// IBS state rate.
    pub ibs_state: IbsRate,
    /// IBS municipal rate.
    pub ibs_municipal: IbsRate,
}

impl RegionalOverride {
    /// Flattens every entry of a file.
    pub fn from_file(file: OverrideFile) -> Vec<Self> {
        let uf = file.uf;
        file.rates
            .into_iter()
            .map(|entry| Self {
                uf,
                municipality: entry.municipality,
                year: entry.year,
                ibs_state: entry.ibs_state,
                ibs_municipal: entry.ibs_municipal,
            })
            .collect()
    }

    /// Returns true when the entry covers the location in `year`.
    ///
    /// State-wide entries cover every municipality of the state.
    pub fn applies_to(&self, uf: UfCode, municipality: Option<&MunicipalityCode>, year: i32) -> bool {
        if self.uf != uf || self.year > year {
            return false;
        }
        match &self.municipality {
            None => true,
            Some(own) => municipality == Some(own),
        }
    }
}
