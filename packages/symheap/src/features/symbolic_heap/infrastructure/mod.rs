//! Symbolic Heap Infrastructure - port adapters
//!
//! ```text
//! infrastructure/
//! ├── code_storage.rs   # CodeStorage backed by a variable table
//! └── diagnostics.rs    # DiagnosticsSink: tracing warnings, in-memory log
//! ```

mod code_storage;
mod diagnostics;

pub use code_storage::StaticCodeStorage;
pub use diagnostics::{CollectingDiagnostics, TracingDiagnostics};
