//! Response types for the tax engine API.
//!
//! This module defines the error body, the mapping from [`EngineError`] to
//! HTTP status codes, and the engine description returned by
//! `GET /engines/:date`.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::engine::{EngineType, PeriodRates};
use crate::error::EngineError;
use crate::models::TaxKind;

/// API error response structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiError {
    /// Error code for programmatic handling.
    pub code: String,
    /// Human-readable error message.
    pub message: String,
    /// Optional details about the error.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ApiError {
    /// Creates a new API error.
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            details: None,
        }
    }

    /// Creates a new API error with details.
    pub fn with_details(
        code: impl Into<String>,
        message: impl Into<String>,
        details: impl Into<String>,
    ) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            details: Some(details.into()),
        }
    }

    /// Creates a validation error response.
    pub fn validation_error(message: impl Into<String>) -> Self {
        Self::new("VALIDATION_ERROR", message)
    }

    /// Creates a malformed JSON error response.
    pub fn malformed_json(message: impl Into<String>) -> Self {
        Self::new("MALFORMED_JSON", message)
    }
}

/// API error with HTTP status code.
pub struct ApiErrorResponse {
    /// The HTTP status code.
    pub status: StatusCode,
    /// The error body.
    pub error: ApiError,
}

impl ApiErrorResponse {
    fn new(status: StatusCode, error: ApiError) -> Self {
        Self { status, error }
    }
}

impl IntoResponse for ApiErrorResponse {
    fn into_response(self) -> Response {
        (self.status, Json(self.error)).into_response()
    }
}

/// Input problems map to 400, well-formed requests the engine cannot honour
/// to 422, configuration failures to 500.
impl From<EngineError> for ApiErrorResponse {
    fn from(error: EngineError) -> Self {
        let message = error.to_string();
        match error {
            EngineError::Validation { field, .. } => ApiErrorResponse::new(
                StatusCode::BAD_REQUEST,
                ApiError::with_details("VALIDATION_ERROR", message, field),
            ),
            EngineError::MissingParameter { parameter, .. } => ApiErrorResponse::new(
                StatusCode::BAD_REQUEST,
                ApiError::with_details("MISSING_PARAMETER", message, parameter),
            ),
            EngineError::CurrencyMismatch { .. } => ApiErrorResponse::new(
                StatusCode::BAD_REQUEST,
                ApiError::new("CURRENCY_MISMATCH", message),
            ),
            EngineError::DateOutOfRange { .. } => ApiErrorResponse::new(
                StatusCode::BAD_REQUEST,
                ApiError::new("DATE_OUT_OF_RANGE", message),
            ),
            EngineError::RateNotFound { .. } => ApiErrorResponse::new(
                StatusCode::BAD_REQUEST,
                ApiError::with_details(
                    "RATE_NOT_FOUND",
                    message,
                    "No rate schedule covers the requested location and date",
                ),
            ),
            EngineError::Consistency { .. } => ApiErrorResponse::new(
                StatusCode::UNPROCESSABLE_ENTITY,
                ApiError::new("CONSISTENCY_ERROR", message),
            ),
            EngineError::UnsupportedOperation { tax, .. } => ApiErrorResponse::new(
                StatusCode::UNPROCESSABLE_ENTITY,
                ApiError::with_details("UNSUPPORTED_OPERATION", message, tax.name()),
            ),
            EngineError::ItemFailed {
                index,
                item_id,
                source,
            } => {
                let inner = ApiErrorResponse::from(*source);
                ApiErrorResponse::new(
                    inner.status,
                    ApiError::with_details(
                        "ITEM_FAILED",
                        format!("Item '{}' (index {}) failed", item_id, index),
                        format!("{}: {}", inner.error.code, inner.error.message),
                    ),
                )
            }
            EngineError::ConfigNotFound { .. } | EngineError::ConfigParseError { .. } => {
                ApiErrorResponse::new(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ApiError::with_details("CONFIG_ERROR", "Configuration error", message),
                )
            }
        }
    }
}

/// Response body for `GET /engines/:date`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineInfo {
    /// The date asked about.
    pub date: NaiveDate,
    /// The engine selected for the date.
    pub engine: EngineType,
    /// Human-readable period description.
    pub period: String,
    /// Taxes charged in the year.
    pub live_taxes: Vec<TaxKind>,
    /// Schedule rates for the year, before regional overrides.
    pub rates: PeriodRates,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_error_serialization() {
        let error = ApiError::new("TEST_ERROR", "Test message");
        let json = serde_json::to_string(&error).unwrap();
        assert!(json.contains("\"code\":\"TEST_ERROR\""));
        assert!(json.contains("\"message\":\"Test message\""));
        assert!(!json.contains("details")); // Should be skipped when None
    }

    #[test]
    fn test_validation_maps_to_bad_request() {
        let response: ApiErrorResponse = EngineError::validation("ncm", "bad").into();
        assert_eq!(response.status, StatusCode::BAD_REQUEST);
        assert_eq!(response.error.code, "VALIDATION_ERROR");
        assert_eq!(response.error.details.as_deref(), Some("ncm"));
    }

    #[test]
    fn test_unsupported_maps_to_unprocessable() {
        let error = EngineError::unsupported(TaxKind::Iss, "ISS extinct since 2033, use IBS");
        let response: ApiErrorResponse = error.into();
        assert_eq!(response.status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(response.error.code, "UNSUPPORTED_OPERATION");
    }

    #[test]
    fn test_item_failed_keeps_inner_status() {
        let error = EngineError::ItemFailed {
            index: 3,
            item_id: "nf-42".to_string(),
            source: Box::new(EngineError::unsupported(TaxKind::Icms, "gone")),
        };
        let response: ApiErrorResponse = error.into();

        assert_eq!(response.status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(response.error.code, "ITEM_FAILED");
        assert!(response.error.message.contains("nf-42"));
        assert!(
            response
                .error
                .details
                .unwrap()
                .starts_with("UNSUPPORTED_OPERATION")
        );
    }

    #[test]
    fn test_config_error_is_internal() {
        let response: ApiErrorResponse = EngineError::ConfigNotFound {
            path: "x".to_string(),
        }
        .into();
        assert_eq!(response.status, StatusCode::INTERNAL_SERVER_ERROR);
    }
}
