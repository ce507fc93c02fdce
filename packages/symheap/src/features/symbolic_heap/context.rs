//! Analysis session shared by every heap state
//!
//! Holds what the heap needs from the outside world plus the counter that
//! names heap states in logs. One context per analysis; independent analyses
//! use independent contexts and never share ids.

use super::domain::{PrecisionLoss, PrecisionLossKind};
use super::infrastructure::TracingDiagnostics;
use super::ports::{CodeStorage, DiagnosticsSink};
use crate::config::HeapConfig;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

pub struct HeapContext {
    config: HeapConfig,
    storage: Arc<dyn CodeStorage>,
    diagnostics: Arc<dyn DiagnosticsSink>,
    next_heap_id: AtomicU64,
}

impl HeapContext {
    /// Context reporting precision loss through `tracing`
    pub fn new(config: HeapConfig, storage: Arc<dyn CodeStorage>) -> Self {
        Self {
            config,
            storage,
            diagnostics: Arc::new(TracingDiagnostics),
            next_heap_id: AtomicU64::new(1),
        }
    }

    pub fn with_diagnostics(mut self, diagnostics: Arc<dyn DiagnosticsSink>) -> Self {
        self.diagnostics = diagnostics;
        self
    }

    /// Wrap for sharing between heap states
    pub fn shared(self) -> Arc<Self> {
        Arc::new(self)
    }

    #[inline]
    pub fn config(&self) -> &HeapConfig {
        &self.config
    }

    #[inline]
    pub fn storage(&self) -> &dyn CodeStorage {
        self.storage.as_ref()
    }

    /// Fresh id for a new heap state or fork
    pub fn next_heap_id(&self) -> u64 {
        self.next_heap_id.fetch_add(1, Ordering::Relaxed)
    }

    /// Forward a precision-loss report unless reporting is disabled
    pub fn report(&self, heap_id: u64, kind: PrecisionLossKind, detail: impl Into<String>) {
        if !self.config.report_precision_loss {
            return;
        }
        self.diagnostics.precision_loss(&PrecisionLoss {
            heap_id,
            kind,
            detail: detail.into(),
        });
    }
}

impl fmt::Debug for HeapContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HeapContext")
            .field("config", &self.config)
            .field("diagnostics", &self.diagnostics.name())
            .field("next_heap_id", &self.next_heap_id.load(Ordering::Relaxed))
            .finish()
    }
}
