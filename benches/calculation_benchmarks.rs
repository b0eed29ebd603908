//! Performance benchmarks for the tax engine.
//!
//! This benchmark suite measures:
//! - A single item through the orchestrator, per engine
//! - A single item through the HTTP API
//! - Batches of 100 and 1000 items
//!
//! Run with: `cargo bench`
//! HTML reports are generated in `target/criterion/`

use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};

use brtax_engine::api::{AppState, create_router};
use brtax_engine::config::ConfigLoader;
use brtax_engine::orchestrator::{ItemInput, TaxCalculationService};

use axum::{body::Body, http::Request};
use tower::ServiceExt;

/// Creates a test state with loaded configuration.
fn create_test_state() -> AppState {
    let config = ConfigLoader::load("./config/statutory").expect("Failed to load config");
    AppState::new(config)
}

/// Creates an item with ICMS, PIS/COFINS and IPI parameters for a date.
fn create_item(id: usize, date: &str) -> ItemInput {
    let legacy = date < "2033-01-01";
    let taxes = if legacy {
        serde_json::json!({
            "icms": { "situation": { "regime": "normal", "code": "000" }, "rate": "18" },
            "ipi": { "rate": "10" },
            "pis_cofins": { "situation_code": "01", "regime": "non_cumulative" }
        })
    } else {
        serde_json::json!({ "reduction": "30", "deferral": "10" })
    };

    serde_json::from_value(serde_json::json!({
        "item_id": format!("item_{:04}", id),
        "base": { "original": { "amount": "1234.56", "currency": "BRL" } },
        "operation_date": date,
        "cfop": "6102",
        "ncm": "84713012",
        "origin_uf": "SP",
        "destination_uf": "RJ",
        "taxes": taxes
    }))
    .expect("Failed to create item")
}

/// Creates `count` items spread over the timeline.
fn create_items(count: usize) -> Vec<ItemInput> {
    let dates = ["2025-06-01", "2026-06-01", "2029-06-01", "2032-06-01", "2034-06-01"];
    (0..count)
        .map(|i| create_item(i, dates[i % dates.len()]))
        .collect()
}

/// Benchmark: one item per engine, straight through the orchestrator.
fn bench_single_item(c: &mut Criterion) {
    let service = TaxCalculationService::statutory();
    let mut group = c.benchmark_group("single_item");

    for (engine, date) in [
        ("current", "2025-06-01"),
        ("transition", "2029-06-01"),
        ("new", "2034-06-01"),
    ] {
        let item = create_item(0, date);
        group.bench_with_input(BenchmarkId::new("engine", engine), &item, |b, item| {
            b.iter(|| black_box(service.calculate_item(black_box(item))))
        });
    }

    group.finish();
}

/// Benchmark: one item through the HTTP API.
fn bench_api_single_item(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let router = create_router(create_test_state());
    let body = serde_json::to_string(&create_item(0, "2029-06-01")).unwrap();

    c.bench_function("api_single_item", |b| {
        b.to_async(&rt).iter(|| async {
            let router = router.clone();
            let response = router
                .oneshot(
                    Request::builder()
                        .method("POST")
                        .uri("/calculate")
                        .header("Content-Type", "application/json")
                        .body(Body::from(body.clone()))
                        .unwrap(),
                )
                .await
                .unwrap();
            black_box(response)
        })
    });
}

/// Benchmark: batches of 100 and 1000 items.
fn bench_batches(c: &mut Criterion) {
    let service = TaxCalculationService::statutory();
    let mut group = c.benchmark_group("batch_processing");

    for count in [100usize, 1000] {
        let items = create_items(count);
        group.throughput(Throughput::Elements(count as u64));
        if count >= 1000 {
            // keep large batches quick
            group.sample_size(10);
        }
        group.bench_with_input(BenchmarkId::new("items", count), &items, |b, items| {
            b.iter(|| black_box(service.calculate_batch(black_box(items))))
        });
    }

    group.finish();
}

criterion_group!(benches, bench_single_item, bench_api_single_item, bench_batches);
criterion_main!(benches);
