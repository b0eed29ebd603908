//! HTTP request handlers for the tax engine API.
//!
//! This module contains the handler functions for all API endpoints.

use std::time::Instant;

use axum::{
    Json, Router,
    extract::{Path, State, rejection::JsonRejection},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use chrono::{Datelike, NaiveDate};
use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;

use crate::compensation::{CompensationInput, compensate};
use crate::engine::{
    RateProvider, describe_period, engine_type_for, live_taxes, validate_date,
};
use crate::error::EngineError;
use crate::orchestrator::ItemInput;

use super::request::{BatchRequest, CompensationRequest};
use super::response::{ApiError, ApiErrorResponse, EngineInfo};
use super::state::AppState;

/// Creates the API router with all endpoints.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/calculate", post(calculate_handler))
        .route("/calculate/batch", post(batch_handler))
        .route("/compensation", post(compensation_handler))
        .route("/engines/:date", get(engine_handler))
        .with_state(state)
}

fn json_response<T: Serialize>(status: StatusCode, body: T) -> Response {
    (
        status,
        [(header::CONTENT_TYPE, "application/json")],
        Json(body),
    )
        .into_response()
}

fn error_response(error: EngineError) -> Response {
    let api_error: ApiErrorResponse = error.into();
    json_response(api_error.status, api_error.error)
}

/// Turns a body extraction failure into a 400 response.
fn rejection_response(correlation_id: Uuid, rejection: JsonRejection) -> Response {
    let error = match rejection {
        JsonRejection::JsonDataError(err) => {
            // serde's message is in the body text
            let body_text = err.body_text();
            warn!(
                correlation_id = %correlation_id,
                error = %body_text,
                "JSON data error"
            );
            if body_text.contains("missing field") || body_text.contains("Invalid ") {
                ApiError::validation_error(body_text)
            } else {
                ApiError::malformed_json(body_text)
            }
        }
        JsonRejection::JsonSyntaxError(err) => {
            warn!(
                correlation_id = %correlation_id,
                error = %err,
                "JSON syntax error"
            );
            ApiError::malformed_json(format!("Invalid JSON syntax: {}", err))
        }
        JsonRejection::MissingJsonContentType(_) => {
            ApiError::new("MISSING_CONTENT_TYPE", "Content-Type must be application/json")
        }
        _ => ApiError::malformed_json("Failed to parse request body"),
    };
    json_response(StatusCode::BAD_REQUEST, error)
}

/// Handler for POST /calculate.
async fn calculate_handler(
    State(state): State<AppState>,
    payload: Result<Json<ItemInput>, JsonRejection>,
) -> Response {
    let correlation_id = Uuid::new_v4();
    info!(correlation_id = %correlation_id, "Processing calculation request");

    let item = match payload {
        Ok(Json(item)) => item,
        Err(rejection) => return rejection_response(correlation_id, rejection),
    };

    let start_time = Instant::now();
    match state.service().calculate_item(&item) {
        Ok(result) => {
            info!(
                correlation_id = %correlation_id,
                item_id = %item.item_id,
                engine = %result.engine,
                total = %result.total,
                duration_us = start_time.elapsed().as_micros() as u64,
                "Calculation completed successfully"
            );
            json_response(StatusCode::OK, result)
        }
        Err(err) => {
            warn!(
                correlation_id = %correlation_id,
                item_id = %item.item_id,
                error = %err,
                "Calculation failed"
            );
            error_response(err)
        }
    }
}

/// Handler for POST /calculate/batch.
async fn batch_handler(
    State(state): State<AppState>,
    payload: Result<Json<BatchRequest>, JsonRejection>,
) -> Response {
    let correlation_id = Uuid::new_v4();
    info!(correlation_id = %correlation_id, "Processing batch request");

    let request = match payload {
        Ok(Json(request)) => request,
        Err(rejection) => return rejection_response(correlation_id, rejection),
    };

    let start_time = Instant::now();
    match state.service().calculate_batch(&request.items) {
        Ok(batch) => {
            info!(
                correlation_id = %correlation_id,
                items = batch.totals.item_count,
                grand_total = %batch.totals.grand_total,
                duration_us = start_time.elapsed().as_micros() as u64,
                "Batch completed successfully"
            );
            json_response(StatusCode::OK, batch)
        }
        Err(err) => {
            warn!(
                correlation_id = %correlation_id,
                error = %err,
                "Batch failed"
            );
            error_response(err)
        }
    }
}

/// Handler for POST /compensation.
async fn compensation_handler(
    payload: Result<Json<CompensationRequest>, JsonRejection>,
) -> Response {
    let correlation_id = Uuid::new_v4();
    info!(correlation_id = %correlation_id, "Processing compensation request");

    let input: CompensationInput = match payload {
        Ok(Json(request)) => request.into(),
        Err(rejection) => return rejection_response(correlation_id, rejection),
    };

    match compensate(&input) {
        Ok(result) => json_response(StatusCode::OK, result),
        Err(err) => {
            warn!(
                correlation_id = %correlation_id,
                error = %err,
                "Compensation failed"
            );
            error_response(err)
        }
    }
}

/// Handler for GET /engines/:date.
async fn engine_handler(State(state): State<AppState>, Path(date): Path<String>) -> Response {
    let date = match NaiveDate::parse_from_str(&date, "%Y-%m-%d") {
        Ok(date) => date,
        Err(err) => {
            return json_response(
                StatusCode::BAD_REQUEST,
                ApiError::with_details(
                    "INVALID_DATE",
                    format!("'{}' is not a date", date),
                    format!("Expected YYYY-MM-DD: {}", err),
                ),
            );
        }
    };
    if let Err(err) = validate_date(date) {
        return error_response(err);
    }

    let year = date.year();
    let schedule = state.config().schedule();
    json_response(
        StatusCode::OK,
        EngineInfo {
            date,
            engine: engine_type_for(date),
            period: describe_period(schedule, date),
            live_taxes: live_taxes(schedule, year),
            rates: schedule.for_period(year),
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calculation::{ContributionRegime, PisCofinsParams};
    use crate::compensation::CompensationResult;
    use crate::config::ConfigLoader;
    use crate::engine::EngineType;
    use crate::models::{
        BatchResult, CalculationBase, CfopCode, ItemTaxResult, NcmCode, PisCofinsSituationCode,
        UfCode,
    };
    use axum::body::Body;
    use axum::http::Request;
    use rust_decimal::Decimal;
    use std::str::FromStr;
    use tower::ServiceExt;

    fn create_test_state() -> AppState {
        let config = ConfigLoader::load("./config/statutory").expect("Failed to load config");
        AppState::new(config)
    }

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn make_item(id: &str, date: &str) -> ItemInput {
        let uf = UfCode::from_str("SP").unwrap();
        ItemInput::new(
            id,
            CalculationBase::brl(dec("1000")).unwrap(),
            NaiveDate::parse_from_str(date, "%Y-%m-%d").unwrap(),
            CfopCode::from_str("5102").unwrap(),
            NcmCode::from_str("84713012").unwrap(),
            uf,
            uf,
        )
    }

    fn post(uri: &str, body: String) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("Content-Type", "application/json")
            .body(Body::from(body))
            .unwrap()
    }

    async fn body_bytes(response: Response) -> Vec<u8> {
        axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap()
            .to_vec()
    }

    #[tokio::test]
    async fn test_calculate_returns_200() {
        let router = create_router(create_test_state());
        let mut item = make_item("nf-1", "2026-02-10");
        item.taxes.pis_cofins = Some(PisCofinsParams::new(
            PisCofinsSituationCode::from_str("01").unwrap(),
            ContributionRegime::NonCumulative,
        ));

        let response = router
            .oneshot(post("/calculate", serde_json::to_string(&item).unwrap()))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let content_type = response.headers().get("content-type").unwrap();
        assert_eq!(content_type, "application/json");

        let result: ItemTaxResult = serde_json::from_slice(&body_bytes(response).await).unwrap();
        assert_eq!(result.item_id, "nf-1");
        assert_eq!(result.engine, EngineType::Transition);
        assert_eq!(
            result.breakdown.legacy.pis.unwrap().value().amount(),
            dec("16.50")
        );
        assert_eq!(result.cbs.value().amount(), dec("9.00"));
    }

    #[tokio::test]
    async fn test_calculate_uses_regional_override() {
        let router = create_router(create_test_state());
        let item = make_item("nf-2", "2034-01-05");

        let response = router
            .oneshot(post("/calculate", serde_json::to_string(&item).unwrap()))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let result: ItemTaxResult = serde_json::from_slice(&body_bytes(response).await).unwrap();
        // SP state-wide override 9.5% / 8.5%
        assert_eq!(result.ibs_state.value().amount(), dec("95.00"));
        assert_eq!(result.ibs_municipal.value().amount(), dec("85.00"));
    }

    #[tokio::test]
    async fn test_malformed_json_returns_400() {
        let router = create_router(create_test_state());

        let response = router
            .oneshot(post("/calculate", "{invalid json".to_string()))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let error: ApiError = serde_json::from_slice(&body_bytes(response).await).unwrap();
        assert_eq!(error.code, "MALFORMED_JSON");
    }

    #[tokio::test]
    async fn test_missing_field_returns_validation_error() {
        let router = create_router(create_test_state());
        let body = r#"{
            "item_id": "nf-3",
            "base": {"original": {"amount": "100", "currency": "BRL"}},
            "cfop": "5102",
            "ncm": "84713012",
            "origin_uf": "SP",
            "destination_uf": "SP"
        }"#;

        let response = router
            .oneshot(post("/calculate", body.to_string()))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let error: ApiError = serde_json::from_slice(&body_bytes(response).await).unwrap();
        assert_eq!(error.code, "VALIDATION_ERROR");
        assert!(error.message.contains("operation_date"));
    }

    #[tokio::test]
    async fn test_missing_content_type_returns_400() {
        let router = create_router(create_test_state());
        let response = router
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/calculate")
                    .body(Body::from("{}"))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let error: ApiError = serde_json::from_slice(&body_bytes(response).await).unwrap();
        assert_eq!(error.code, "MISSING_CONTENT_TYPE");
    }

    #[tokio::test]
    async fn test_legacy_params_after_2033_return_422() {
        let router = create_router(create_test_state());
        let mut item = make_item("nf-4", "2033-06-01");
        item.taxes.pis_cofins = Some(PisCofinsParams::new(
            PisCofinsSituationCode::from_str("01").unwrap(),
            ContributionRegime::Cumulative,
        ));

        let response = router
            .oneshot(post("/calculate", serde_json::to_string(&item).unwrap()))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        let error: ApiError = serde_json::from_slice(&body_bytes(response).await).unwrap();
        assert_eq!(error.code, "UNSUPPORTED_OPERATION");
    }

    #[tokio::test]
    async fn test_batch_returns_totals() {
        let router = create_router(create_test_state());
        let request = BatchRequest {
            items: vec![make_item("a", "2027-01-01"), make_item("b", "2033-01-01")],
        };

        let response = router
            .oneshot(post("/calculate/batch", serde_json::to_string(&request).unwrap()))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let batch: BatchResult = serde_json::from_slice(&body_bytes(response).await).unwrap();
        assert_eq!(batch.totals.item_count, 2);
        assert_eq!(batch.items[0].item_id, "a");
    }

    #[tokio::test]
    async fn test_batch_names_failing_item() {
        let router = create_router(create_test_state());
        let request = BatchRequest {
            items: vec![make_item("a", "2027-01-01"), make_item("b", "2055-01-01")],
        };

        let response = router
            .oneshot(post("/calculate/batch", serde_json::to_string(&request).unwrap()))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let error: ApiError = serde_json::from_slice(&body_bytes(response).await).unwrap();
        assert_eq!(error.code, "ITEM_FAILED");
        assert!(error.message.contains("'b' (index 1)"));
    }

    #[tokio::test]
    async fn test_compensation() {
        let router = create_router(create_test_state());
        let body = r#"{
            "year": 2026,
            "old_credits": "1000",
            "old_debits": "0",
            "new_credits": "0",
            "new_debits": "600",
            "uf": "SP",
            "regime": "standard"
        }"#;

        let response = router
            .oneshot(post("/compensation", body.to_string()))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let result: CompensationResult =
            serde_json::from_slice(&body_bytes(response).await).unwrap();
        assert_eq!(result.compensated.amount(), dec("600"));
        assert_eq!(result.old_credit_remaining.amount(), dec("400"));
    }

    #[tokio::test]
    async fn test_engine_info() {
        let router = create_router(create_test_state());
        let response = router
            .oneshot(
                Request::builder()
                    .uri("/engines/2029-07-01")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let info: EngineInfo = serde_json::from_slice(&body_bytes(response).await).unwrap();
        assert_eq!(info.engine, EngineType::Transition);
        assert!(info.period.starts_with("Transition 2029"));
        assert_eq!(info.rates.ibs_total(), dec("1.77"));
    }

    #[tokio::test]
    async fn test_engine_info_rejects_bad_dates() {
        let router = create_router(create_test_state());
        let response = router
            .clone()
            .oneshot(
                Request::builder()
                    .uri("/engines/not-a-date")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let response = router
            .oneshot(
                Request::builder()
                    .uri("/engines/2070-01-01")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let error: ApiError = serde_json::from_slice(&body_bytes(response).await).unwrap();
        assert_eq!(error.code, "DATE_OUT_OF_RANGE");
    }
}
