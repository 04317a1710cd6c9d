//! Session configuration.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{GateResult, ValidationError};
use crate::generator::GeneratorConfig;
use crate::schema::AttributeSchema;
use crate::verdict::NoMatchPolicy;

/// Initialization parameters of a [`super::RuleSession`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Difficulty of the seed rule. Must be at least 1.
    pub starting_difficulty: u32,
    /// Rule count at which generation stops.
    pub max_rules: usize,
    /// Judged entities needed before the first new rule.
    pub entities_per_rule: u32,
    /// Added to `entities_per_rule` after every new rule.
    pub cadence_step: u32,
    /// Whether a failed generation still restarts the milestone count.
    ///
    /// When false, every following decision retries generation until a rule
    /// is found.
    pub reset_counter_on_failure: bool,
    /// How an entity that matches no rule is judged.
    pub no_match_policy: NoMatchPolicy,
    /// Per-subscriber event buffer.
    pub event_buffer: usize,
    /// Rule generator tuning.
    pub generator: GeneratorConfig,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            starting_difficulty: 1,
            max_rules: 10,
            entities_per_rule: 5,
            cadence_step: 1,
            reset_counter_on_failure: true,
            no_match_policy: NoMatchPolicy::DefaultAllow,
            event_buffer: 256,
            generator: GeneratorConfig::default(),
        }
    }
}

impl SessionConfig {
    /// Validate the configuration. Sessions refuse to build without this.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.starting_difficulty == 0 {
            return Err(ValidationError::InvalidConfig {
                reason: "starting_difficulty must be >= 1".to_string(),
            });
        }
        if self.max_rules == 0 {
            return Err(ValidationError::InvalidConfig {
                reason: "max_rules must be > 0".to_string(),
            });
        }
        if self.entities_per_rule == 0 {
            return Err(ValidationError::InvalidConfig {
                reason: "entities_per_rule must be > 0".to_string(),
            });
        }
        if self.event_buffer == 0 {
            return Err(ValidationError::InvalidConfig {
                reason: "event_buffer must be > 0".to_string(),
            });
        }
        self.generator.validate()
    }

    /// Parses and validates a config from JSON. Missing fields take defaults.
    pub fn from_json_str(json: &str) -> Result<Self, ValidationError> {
        let config: Self = serde_json::from_str(json).map_err(|e| ValidationError::Parse {
            message: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }
}

/// A schema and session config loaded together.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameDefinition {
    /// Attribute domains of judged entities.
    pub schema: AttributeSchema,
    /// Session parameters.
    #[serde(default)]
    pub session: SessionConfig,
}

impl GameDefinition {
    /// Parses and validates a definition from JSON.
    pub fn from_json_str(json: &str) -> Result<Self, ValidationError> {
        let def: Self = serde_json::from_str(json).map_err(|e| ValidationError::Parse {
            message: e.to_string(),
        })?;
        def.session.validate()?;
        Ok(def)
    }

    /// Reads a definition from a JSON file.
    pub fn from_json_file(path: impl AsRef<Path>) -> GateResult<Self> {
        let text = std::fs::read_to_string(path)?;
        Ok(Self::from_json_str(&text)?)
    }
}

impl Default for GameDefinition {
    fn default() -> Self {
        Self {
            schema: AttributeSchema::mask_checkpoint(),
            session: SessionConfig::default(),
        }
    }
}
