//! Error types for the tax engine.
//!
//! This module provides strongly-typed errors using the `thiserror` crate
//! for every failure a calculation can produce. Calculators, engines, the
//! orchestrator and the compensation engine all return [`EngineError`]
//! instead of panicking.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use thiserror::Error;

use crate::models::{Currency, TaxKind};

/// The main error type for the tax engine.
///
/// # Example
///
/// ```
/// use brtax_engine::error::EngineError;
///
/// let error = EngineError::Validation {
///     field: "base".to_string(),
///     message: "must not be negative".to_string(),
/// };
/// assert_eq!(error.to_string(), "Invalid base: must not be negative");
/// ```
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EngineError {
    /// A value was malformed or outside its legal range.
    #[error("Invalid {field}: {message}")]
    Validation {
        /// The field that failed validation.
        field: String,
        /// A description of what made the value invalid.
        message: String,
    },

    /// A regime-specific parameter was required but not supplied.
    #[error("Missing parameter '{parameter}': {context}")]
    MissingParameter {
        /// The name of the missing parameter.
        parameter: String,
        /// Why the parameter is required in this situation.
        context: String,
    },

    /// A computed tax value disagrees with base x rate by more than one cent.
    #[error("Inconsistent {field}: expected {expected}, got {actual}")]
    Consistency {
        /// The value that failed the check.
        field: String,
        /// The value derived from base x rate.
        expected: Decimal,
        /// The value that was supplied.
        actual: Decimal,
    },

    /// The selected engine does not compute this tax.
    #[error("{tax} is not supported: {message}")]
    UnsupportedOperation {
        /// The tax that was requested.
        tax: TaxKind,
        /// An explanation, usually naming the superseding tax.
        message: String,
    },

    /// Two monetary values in the same computation use different currencies.
    #[error("Currency mismatch: expected {expected}, found {found}")]
    CurrencyMismatch {
        /// The currency of the reference value.
        expected: Currency,
        /// The offending currency.
        found: Currency,
    },

    /// The operation date is outside the supported window.
    #[error("Date {date} is outside the supported range {min_year}-{max_year}")]
    DateOutOfRange {
        /// The rejected date.
        date: NaiveDate,
        /// The first supported year.
        min_year: i32,
        /// The last supported year.
        max_year: i32,
    },

    /// No rate row could be resolved for a location and date.
    #[error("No rates found for UF '{uf}' on date {date}")]
    RateNotFound {
        /// The state code used for the lookup.
        uf: String,
        /// The reference date used for the lookup.
        date: NaiveDate,
    },

    /// An item in a batch failed; the batch was aborted.
    #[error("Item '{item_id}' (index {index}) failed: {source}")]
    ItemFailed {
        /// Zero-based position of the item in the batch.
        index: usize,
        /// The caller-supplied item identifier.
        item_id: String,
        /// The underlying failure.
        #[source]
        source: Box<EngineError>,
    },

    /// Configuration file was not found at the specified path.
    #[error("Configuration file not found: {path}")]
    ConfigNotFound {
        /// The path that was not found.
        path: String,
    },

    /// Configuration file could not be parsed.
    #[error("Failed to parse configuration file '{path}': {message}")]
    ConfigParseError {
        /// The path to the file that failed to parse.
        path: String,
        /// A description of the parse error.
        message: String,
    },
}

impl EngineError {
    /// Shorthand for a [`EngineError::Validation`] error.
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Shorthand for a [`EngineError::MissingParameter`] error.
    pub fn missing(parameter: impl Into<String>, context: impl Into<String>) -> Self {
        Self::MissingParameter {
            parameter: parameter.into(),
            context: context.into(),
        }
    }

    /// Shorthand for a [`EngineError::UnsupportedOperation`] error.
    pub fn unsupported(tax: TaxKind, message: impl Into<String>) -> Self {
        Self::UnsupportedOperation {
            tax,
            message: message.into(),
        }
    }

    /// Returns the innermost error, unwrapping batch item failures.
    pub fn root_cause(&self) -> &EngineError {
        match self {
            EngineError::ItemFailed { source, .. } => source.root_cause(),
            other => other,
        }
    }
}

/// A type alias for Results that return EngineError.
pub type EngineResult<T> = Result<T, EngineError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_validation_displays_field_and_message() {
        let error = EngineError::validation("uf", "must be 2 digits");
        assert_eq!(error.to_string(), "Invalid uf: must be 2 digits");
    }

    #[test]
    fn test_missing_parameter_displays_parameter_and_context() {
        let error = EngineError::missing("credit_rate", "CSOSN 101 permits credit");
        assert_eq!(
            error.to_string(),
            "Missing parameter 'credit_rate': CSOSN 101 permits credit"
        );
    }

    #[test]
    fn test_consistency_displays_expected_and_actual() {
        let error = EngineError::Consistency {
            field: "cbs_value".to_string(),
            expected: Decimal::from_str("88.00").unwrap(),
            actual: Decimal::from_str("88.50").unwrap(),
        };
        assert_eq!(
            error.to_string(),
            "Inconsistent cbs_value: expected 88.00, got 88.50"
        );
    }

    #[test]
    fn test_unsupported_displays_tax_name() {
        let error = EngineError::unsupported(TaxKind::Icms, "ICMS extinct since 2033, use IBS");
        assert_eq!(
            error.to_string(),
            "ICMS is not supported: ICMS extinct since 2033, use IBS"
        );
    }

    #[test]
    fn test_date_out_of_range_displays_window() {
        let error = EngineError::DateOutOfRange {
            date: NaiveDate::from_ymd_opt(2019, 12, 31).unwrap(),
            min_year: 2020,
            max_year: 2050,
        };
        assert_eq!(
            error.to_string(),
            "Date 2019-12-31 is outside the supported range 2020-2050"
        );
    }

    #[test]
    fn test_item_failed_names_item_and_keeps_source() {
        let error = EngineError::ItemFailed {
            index: 2,
            item_id: "item-3".to_string(),
            source: Box::new(EngineError::validation("ncm", "must have 8 digits")),
        };
        assert_eq!(
            error.to_string(),
            "Item 'item-3' (index 2) failed: Invalid ncm: must have 8 digits"
        );
        assert_eq!(
            error.root_cause(),
            &EngineError::validation("ncm", "must have 8 digits")
        );
    }

    #[test]
    fn test_config_not_found_displays_path() {
        let error = EngineError::ConfigNotFound {
            path: "/missing/schedule.yaml".to_string(),
        };
        assert_eq!(
            error.to_string(),
            "Configuration file not found: /missing/schedule.yaml"
        );
    }

    #[test]
    fn test_errors_implement_std_error() {
        fn assert_error<T: std::error::Error>() {}
        assert_error::<EngineError>();
    }

    #[test]
    fn test_error_propagation_with_question_mark() {
        fn fails() -> EngineResult<()> {
            Err(EngineError::validation("rate", "negative"))
        }

        fn propagates() -> EngineResult<()> {
            fails()?;
            Ok(())
        }

        assert!(propagates().is_err());
    }
}
