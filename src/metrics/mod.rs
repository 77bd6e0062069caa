//! Prometheus metrics for monitoring
//!
//! Exposes metrics for:
//! - Fee estimation outcomes
//! - Stale async completions dropped by the composer
//! - Balance fetch failures
//! - Finalized drafts

use lazy_static::lazy_static;
use prometheus::{register_counter_vec, CounterVec, Encoder, TextEncoder};

lazy_static! {
    pub static ref FEE_ESTIMATES_STARTED: CounterVec = register_counter_vec!(
        "bridge_fee_estimates_started_total",
        "Fee estimations dispatched",
        &["from_chain", "to_chain"]
    ).unwrap();

    pub static ref FEE_ESTIMATES_SUCCEEDED: CounterVec = register_counter_vec!(
        "bridge_fee_estimates_succeeded_total",
        "Fee estimations that produced a fee",
        &["from_chain"]
    ).unwrap();

    pub static ref FEE_ESTIMATES_FAILED: CounterVec = register_counter_vec!(
        "bridge_fee_estimates_failed_total",
        "Fee estimations that failed, by kind",
        &["from_chain", "kind"]
    ).unwrap();

    pub static ref STALE_COMPLETIONS: CounterVec = register_counter_vec!(
        "bridge_stale_completions_dropped_total",
        "Async completions discarded because newer inputs superseded them",
        &["column"]
    ).unwrap();

    pub static ref BALANCE_FAILURES: CounterVec = register_counter_vec!(
        "bridge_balance_fetch_failures_total",
        "Balance fetches that left the balance unresolved",
        &["chain"]
    ).unwrap();

    pub static ref DRAFTS_FINALIZED: CounterVec = register_counter_vec!(
        "bridge_drafts_finalized_total",
        "Drafts handed to the submission callback",
        &["from_chain", "to_chain"]
    ).unwrap();
}

pub fn record_fee_started(from_chain: &str, to_chain: &str) {
    FEE_ESTIMATES_STARTED
        .with_label_values(&[from_chain, to_chain])
        .inc();
}

pub fn record_fee_succeeded(from_chain: &str) {
    FEE_ESTIMATES_SUCCEEDED.with_label_values(&[from_chain]).inc();
}

pub fn record_fee_failed(from_chain: &str, kind: &str) {
    FEE_ESTIMATES_FAILED
        .with_label_values(&[from_chain, kind])
        .inc();
}

pub fn record_stale_completion(column: &str) {
    STALE_COMPLETIONS.with_label_values(&[column]).inc();
}

pub fn record_balance_failure(chain: &str) {
    BALANCE_FAILURES.with_label_values(&[chain]).inc();
}

pub fn record_finalized(from_chain: &str, to_chain: &str) {
    DRAFTS_FINALIZED
        .with_label_values(&[from_chain, to_chain])
        .inc();
}

/// Text exposition of all registered metrics
pub fn render() -> String {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    if encoder.encode(&metric_families, &mut buffer).is_err() {
        return String::new();
    }
    String::from_utf8(buffer).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_includes_recorded_counter() {
        record_stale_completion("metrics_test");
        let text = render();
        assert!(text.contains("bridge_stale_completions_dropped_total"));
        assert!(text.contains("metrics_test"));
    }
}
