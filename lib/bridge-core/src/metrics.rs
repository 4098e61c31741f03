//! Prometheus metrics for reconciliation passes

use crate::error::Operation;
use crate::reconciler::SyncSummary;
use prometheus::{
    Encoder, Histogram, HistogramOpts, IntCounter, IntCounterVec, Opts, Registry, TextEncoder,
};
use std::sync::Arc;

/// Metrics recorded by the controller loop
#[derive(Clone)]
pub struct ControllerMetrics {
    /// Passes run, by result
    pub passes_total: IntCounterVec,
    /// Store writes applied, by kind and operation
    pub operations_total: IntCounterVec,
    /// Default-backend conflicts found during translation
    pub conflicts_total: IntCounter,
    /// Wall time of a full pass in seconds
    pub pass_duration_seconds: Histogram,
    /// Prometheus registry for metrics
    pub registry: Arc<Registry>,
}

impl ControllerMetrics {
    pub fn new() -> prometheus::Result<Self> {
        let registry = Arc::new(Registry::new());

        let passes_total = IntCounterVec::new(
            Opts::new("ingress_bridge_passes_total", "Reconciliation passes by result"),
            &["result"],
        )?;

        let operations_total = IntCounterVec::new(
            Opts::new(
                "ingress_bridge_operations_total",
                "Store writes applied by kind and operation",
            ),
            &["kind", "op"],
        )?;

        let conflicts_total = IntCounter::new(
            "ingress_bridge_conflicts_total",
            "Ingress configuration conflicts found during translation",
        )?;

        let pass_duration_seconds = Histogram::with_opts(HistogramOpts::new(
            "ingress_bridge_pass_duration_seconds",
            "Reconciliation pass latency in seconds",
        ))?;

        registry.register(Box::new(passes_total.clone()))?;
        registry.register(Box::new(operations_total.clone()))?;
        registry.register(Box::new(conflicts_total.clone()))?;
        registry.register(Box::new(pass_duration_seconds.clone()))?;

        Ok(Self {
            passes_total,
            operations_total,
            conflicts_total,
            pass_duration_seconds,
            registry,
        })
    }

    pub fn record_pass(&self, ok: bool) {
        let result = if ok { "success" } else { "failure" };
        self.passes_total.with_label_values(&[result]).inc();
    }

    pub fn record_sync(&self, kind: &str, summary: &SyncSummary) {
        for (op, count) in [
            (Operation::Create, summary.created),
            (Operation::Update, summary.updated),
            (Operation::Delete, summary.deleted),
        ] {
            if count > 0 {
                self.operations_total
                    .with_label_values(&[kind, op.as_str()])
                    .inc_by(count as u64);
            }
        }
    }

    /// Gather all metrics in Prometheus text format
    pub fn gather(&self) -> Result<String, Box<dyn std::error::Error + Send + Sync>> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = vec![];
        encoder.encode(&metric_families, &mut buffer)?;
        Ok(String::from_utf8(buffer)?)
    }
}
