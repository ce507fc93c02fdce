//! Diagnostics adapters

use super::super::domain::{PrecisionLoss, PrecisionLossKind};
use super::super::ports::DiagnosticsSink;
use parking_lot::Mutex;
use tracing::warn;

/// Emits every report as a `tracing` warning
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingDiagnostics;

impl DiagnosticsSink for TracingDiagnostics {
    fn precision_loss(&self, report: &PrecisionLoss) {
        warn!(
            heap = report.heap_id,
            kind = ?report.kind,
            "precision loss: {}",
            report.detail
        );
    }

    fn name(&self) -> &'static str {
        "tracing"
    }
}

/// Keeps every report in memory
#[derive(Debug, Default)]
pub struct CollectingDiagnostics {
    reports: Mutex<Vec<PrecisionLoss>>,
}

impl CollectingDiagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reports received so far
    pub fn reports(&self) -> Vec<PrecisionLoss> {
        self.reports.lock().clone()
    }

    pub fn count_of(&self, kind: PrecisionLossKind) -> usize {
        self.reports.lock().iter().filter(|r| r.kind == kind).count()
    }

    pub fn clear(&self) {
        self.reports.lock().clear();
    }
}

impl DiagnosticsSink for CollectingDiagnostics {
    fn precision_loss(&self, report: &PrecisionLoss) {
        self.reports.lock().push(report.clone());
    }

    fn name(&self) -> &'static str {
        "collecting"
    }
}
