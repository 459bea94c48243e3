//! Prometheus metrics for bridge operations
//!
//! Every [`DocumentBridge`](crate::bridge::DocumentBridge) call is counted
//! per backend, operation and outcome, and timed per backend and operation.

use crate::bridge::BridgeKind;
use crate::error::{Error, Result};
use prometheus::{Encoder, HistogramOpts, HistogramVec, IntCounterVec, Opts, Registry, TextEncoder};
use std::sync::Once;
use std::time::Instant;
use tracing::{error, info};

lazy_static::lazy_static! {
    /// Global metrics registry
    pub static ref METRICS_REGISTRY: Registry = Registry::new();

    pub static ref BRIDGE_OPERATIONS: IntCounterVec = IntCounterVec::new(
        Opts::new("tinabridge_operations_total", "Total bridge operations"),
        &["backend", "operation", "status"]
    ).unwrap();

    pub static ref BRIDGE_DURATION: HistogramVec = HistogramVec::new(
        HistogramOpts::new(
            "tinabridge_operation_duration_seconds",
            "Bridge operation duration in seconds"
        ).buckets(vec![0.001, 0.005, 0.01, 0.05, 0.1, 0.5, 1.0, 5.0, 10.0]),
        &["backend", "operation"]
    ).unwrap();
}

static INIT: Once = Once::new();

/// Register all metrics. Safe to call more than once.
pub fn init_metrics() {
    INIT.call_once(|| {
        info!("Initializing Prometheus metrics");
        METRICS_REGISTRY.register(Box::new(BRIDGE_OPERATIONS.clone())).ok();
        METRICS_REGISTRY.register(Box::new(BRIDGE_DURATION.clone())).ok();
    });
}

/// Outcome label for a bridge call
pub fn status_label<T>(result: &Result<T>) -> &'static str {
    match result {
        Ok(_) => "success",
        Err(Error::Auth(_)) => "auth_error",
        Err(Error::Transport(_)) => "transport_error",
        Err(Error::InvalidArgument(_)) => "invalid_argument",
        Err(_) => "error",
    }
}

/// Times one bridge call and records its outcome
#[derive(Debug)]
pub struct OperationTimer {
    backend: BridgeKind,
    operation: &'static str,
    started: Instant,
}

impl OperationTimer {
    pub fn start(backend: BridgeKind, operation: &'static str) -> Self {
        init_metrics();
        Self {
            backend,
            operation,
            started: Instant::now(),
        }
    }

    pub fn observe<T>(self, result: &Result<T>) {
        let backend = self.backend.as_str();
        BRIDGE_OPERATIONS
            .with_label_values(&[backend, self.operation, status_label(result)])
            .inc();
        BRIDGE_DURATION
            .with_label_values(&[backend, self.operation])
            .observe(self.started.elapsed().as_secs_f64());
    }
}

/// Export all metrics in Prometheus text format
pub fn export_metrics() -> String {
    init_metrics();
    let encoder = TextEncoder::new();
    let metric_families = METRICS_REGISTRY.gather();
    let mut buffer = vec![];

    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        error!(error = %e, "Failed to encode metrics");
        return String::new();
    }

    String::from_utf8(buffer).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_labels() {
        assert_eq!(status_label(&Ok::<(), Error>(())), "success");
        assert_eq!(status_label::<()>(&Err(Error::Auth("x".into()))), "auth_error");
        assert_eq!(status_label::<()>(&Err(Error::Transport("x".into()))), "transport_error");
        assert_eq!(status_label::<()>(&Err(Error::Storage("x".into()))), "error");
    }

    #[test]
    fn test_observed_operation_is_exported() {
        let timer = OperationTimer::start(BridgeKind::Memory, "glob");
        timer.observe(&Ok::<(), Error>(()));

        let text = export_metrics();
        assert!(text.contains("tinabridge_operations_total"));
        assert!(text.contains("operation=\"glob\""));
    }
}
