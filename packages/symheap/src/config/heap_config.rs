//! Heap engine configuration

use super::error::{ConfigError, ConfigResult};
use super::preset::Preset;
use super::validation::Validatable;
use serde::{Deserialize, Serialize};

/// Configuration of the abstract-heap engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HeapConfig {
    /// Check arena/live-object consistency after every write, also in release
    /// builds (debug builds always check)
    pub check_arena_invariants: bool,

    /// Forward precision-loss events to the diagnostics sink
    pub report_precision_loss: bool,

    /// Log a warning once the entity store grows beyond this many ids
    /// (1..=100000000)
    pub entity_soft_limit: usize,

    /// Maximum number of abstract segments `prove_neq` walks through
    /// (1..=10000)
    pub max_prove_neq_steps: usize,
}

const VALID_FIELDS: [&str; 4] = [
    "check_arena_invariants",
    "report_precision_loss",
    "entity_soft_limit",
    "max_prove_neq_steps",
];

impl HeapConfig {
    /// Complete configuration for a preset
    pub fn from_preset(preset: Preset) -> Self {
        match preset {
            Preset::Fast => Self {
                check_arena_invariants: false,
                report_precision_loss: false,
                entity_soft_limit: 10_000_000,
                max_prove_neq_steps: 16,
            },
            Preset::Balanced => Self {
                check_arena_invariants: false,
                report_precision_loss: true,
                entity_soft_limit: 1_000_000,
                max_prove_neq_steps: 64,
            },
            Preset::Thorough => Self {
                check_arena_invariants: true,
                report_precision_loss: true,
                entity_soft_limit: 1_000_000,
                max_prove_neq_steps: 1024,
            },
            Preset::Custom => Self {
                check_arena_invariants: false,
                report_precision_loss: false,
                entity_soft_limit: 100_000_000,
                max_prove_neq_steps: 1,
            },
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> ConfigResult<()> {
        if self.entity_soft_limit == 0 || self.entity_soft_limit > 100_000_000 {
            return Err(ConfigError::range_with_hint(
                "entity_soft_limit",
                self.entity_soft_limit,
                1,
                100_000_000,
                "Entity limit must be positive and reasonable",
            ));
        }

        if self.max_prove_neq_steps == 0 || self.max_prove_neq_steps > 10_000 {
            return Err(ConfigError::range_with_hint(
                "max_prove_neq_steps",
                self.max_prove_neq_steps,
                1,
                10_000,
                "Segment walks must take at least one step",
            ));
        }

        Ok(())
    }

    /// Parse a YAML document on top of the `Balanced` preset
    ///
    /// Unknown keys are rejected with a spelling suggestion.
    pub fn from_yaml_str(yaml: &str) -> ConfigResult<Self> {
        let doc: serde_yaml::Value = serde_yaml::from_str(yaml)?;
        if let serde_yaml::Value::Mapping(map) = &doc {
            for key in map.keys() {
                let key = key.as_str().unwrap_or_default();
                if key != "preset" && !VALID_FIELDS.contains(&key) {
                    return Err(ConfigError::unknown_field_with_suggestion(
                        key,
                        "heap",
                        VALID_FIELDS.iter().map(|f| f.to_string()).collect(),
                    ));
                }
            }
        }

        let preset = match doc.get("preset").and_then(|p| p.as_str()) {
            Some(name) => Preset::from_str(name)?,
            None => Preset::Balanced,
        };

        let mut config = Self::from_preset(preset);
        let overrides: HeapConfigPatch = serde_yaml::from_value(doc)?;
        overrides.apply(&mut config);
        config.validate()?;
        Ok(config)
    }

    /// Serialize to YAML
    pub fn to_yaml(&self) -> ConfigResult<String> {
        Ok(serde_yaml::to_string(self)?)
    }

    /// Builder: Set check_arena_invariants
    pub fn check_arena_invariants(mut self, v: bool) -> Self {
        self.check_arena_invariants = v;
        self
    }

    /// Builder: Set report_precision_loss
    pub fn report_precision_loss(mut self, v: bool) -> Self {
        self.report_precision_loss = v;
        self
    }

    /// Builder: Set entity_soft_limit
    pub fn entity_soft_limit(mut self, v: usize) -> Self {
        self.entity_soft_limit = v;
        self
    }

    /// Builder: Set max_prove_neq_steps
    pub fn max_prove_neq_steps(mut self, v: usize) -> Self {
        self.max_prove_neq_steps = v;
        self
    }
}

impl Default for HeapConfig {
    fn default() -> Self {
        Self::from_preset(Preset::Balanced)
    }
}

impl Validatable for HeapConfig {
    fn validate(&self) -> ConfigResult<()> {
        HeapConfig::validate(self)
    }

    fn config_name(&self) -> &'static str {
        "HeapConfig"
    }
}

/// Partial override of a [`HeapConfig`]
#[derive(Debug, Clone, Default, Deserialize)]
struct HeapConfigPatch {
    #[serde(default)]
    check_arena_invariants: Option<bool>,
    #[serde(default)]
    report_precision_loss: Option<bool>,
    #[serde(default)]
    entity_soft_limit: Option<usize>,
    #[serde(default)]
    max_prove_neq_steps: Option<usize>,
}

impl HeapConfigPatch {
    fn apply(self, config: &mut HeapConfig) {
        if let Some(v) = self.check_arena_invariants {
            config.check_arena_invariants = v;
        }
        if let Some(v) = self.report_precision_loss {
            config.report_precision_loss = v;
        }
        if let Some(v) = self.entity_soft_limit {
            config.entity_soft_limit = v;
        }
        if let Some(v) = self.max_prove_neq_steps {
            config.max_prove_neq_steps = v;
        }
    }
}
