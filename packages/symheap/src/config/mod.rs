//! Configuration system
//!
//! Two tiers, mirroring how the engine is embedded:
//! - Level 1: Preset - `HeapConfig::from_preset(Preset::Balanced)`
//! - Level 2: Overrides - builder setters or a YAML document
//!
//! # Examples
//!
//! ```rust
//! use symheap::config::{HeapConfig, Preset};
//!
//! let config = HeapConfig::from_preset(Preset::Thorough).max_prove_neq_steps(256);
//! assert!(config.validate().is_ok());
//!
//! let config = HeapConfig::from_yaml_str("preset: fast\nreport_precision_loss: true\n").unwrap();
//! assert!(config.report_precision_loss);
//! ```

pub mod error;
pub mod heap_config;
pub mod preset;
pub mod validation;

// Re-exports
pub use error::{ConfigError, ConfigResult};
pub use heap_config::HeapConfig;
pub use preset::Preset;
pub use validation::Validatable;
