//! Prometheus metrics for the Database API
//!
//! # Exported metrics
//! The `/metrics` endpoint (when built with `--features metrics`) exports:
//! - `database_api_requests_total` (counter): lifecycle requests labeled by operation and outcome.
//! - `database_api_store_call_duration_seconds` (histogram): store round trips labeled by operation
//!   (`ping` for readiness probes).

use std::sync::atomic::AtomicU64;

use once_cell::sync::Lazy;
use prometheus_client::encoding::EncodeLabelSet;
use prometheus_client::metrics::counter::Counter;
use prometheus_client::metrics::family::Family;
use prometheus_client::metrics::histogram::{exponential_buckets, Histogram};
use prometheus_client::registry::Registry;

use crate::coordinator::Operation;

/// Labels for the request counter
#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
pub struct RequestLabels {
    /// "list", "get", "create" or "delete"
    pub operation: String,
    /// "ok" or an error kind such as "Conflict"
    pub outcome: String,
}

#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
pub struct OperationLabels {
    pub operation: String,
}

pub static REQUESTS_TOTAL: Lazy<Family<RequestLabels, Counter<u64, AtomicU64>>> =
    Lazy::new(Family::default);

/// Histogram tracking store call duration (seconds)
pub static STORE_CALL_DURATION_SECONDS: Lazy<Family<OperationLabels, Histogram>> =
    Lazy::new(|| {
        fn store_histogram() -> Histogram {
            // 1ms .. ~32s across 16 buckets.
            Histogram::new(exponential_buckets(0.001, 2.0, 16))
        }

        Family::new_with_constructor(store_histogram)
    });

/// Global metrics registry
pub static REGISTRY: Lazy<Registry> = Lazy::new(|| {
    let mut registry = Registry::default();

    registry.register(
        "database_api_requests",
        "Lifecycle requests handled, by operation and outcome",
        REQUESTS_TOTAL.clone(),
    );
    registry.register(
        "database_api_store_call_duration_seconds",
        "Duration of calls to the Kubernetes API server in seconds",
        STORE_CALL_DURATION_SECONDS.clone(),
    );
    registry
});

pub fn record_request(operation: Operation, outcome: &str) {
    let labels = RequestLabels {
        operation: operation.as_str().to_string(),
        outcome: outcome.to_string(),
    };
    REQUESTS_TOTAL.get_or_create(&labels).inc();
}

pub fn observe_store_call(operation: Operation, seconds: f64) {
    let labels = OperationLabels {
        operation: operation.as_str().to_string(),
    };
    STORE_CALL_DURATION_SECONDS
        .get_or_create(&labels)
        .observe(seconds);
}

/// Render the registry in the Prometheus text format.
pub fn encode() -> Result<String, std::fmt::Error> {
    let mut buffer = String::new();
    prometheus_client::encoding::text::encode(&mut buffer, &REGISTRY)?;
    Ok(buffer)
}
