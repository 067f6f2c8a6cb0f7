use crate::error::{EngineError, EngineResult};
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const DEFAULT_PROGRAM_LENGTH_WEEKS: u32 = 12;
pub const DEFAULT_BATCH_DELAY_MS: u64 = 300;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Number of weekly cycles in the program. Weeks beyond this are never generated.
    #[serde(default = "default_program_length")]
    pub program_length_weeks: u32,
    /// Pause between consecutive store writes during batch runs.
    /// The backing store rate-limits; parallel or unpaced writes get throttled.
    #[serde(default = "default_batch_delay")]
    pub batch_delay_ms: u64,
    /// Name recorded on every write made through the engine's store context.
    #[serde(default = "default_actor")]
    pub actor: String,
}

fn default_program_length() -> u32 { DEFAULT_PROGRAM_LENGTH_WEEKS }
fn default_batch_delay() -> u64 { DEFAULT_BATCH_DELAY_MS }
fn default_actor() -> String { "cohort-engine".into() }

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            program_length_weeks: DEFAULT_PROGRAM_LENGTH_WEEKS,
            batch_delay_ms:       DEFAULT_BATCH_DELAY_MS,
            actor:                default_actor(),
        }
    }
}

impl EngineConfig {
    /// Load from the data/ directory.
    /// In tests, use EngineConfig::default_test().
    pub fn load(data_dir: &str) -> anyhow::Result<Self> {
        let path = format!("{data_dir}/engine_config.json");
        let content = std::fs::read_to_string(&path)
            .map_err(|e| anyhow::anyhow!("Cannot read {path}: {e}"))?;
        let config: EngineConfig = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Config with hardcoded defaults for use in tests: no pacing delay.
    pub fn default_test() -> Self {
        Self {
            program_length_weeks: DEFAULT_PROGRAM_LENGTH_WEEKS,
            batch_delay_ms:       0,
            actor:                "test-runner".into(),
        }
    }

    pub fn validate(&self) -> EngineResult<()> {
        if self.program_length_weeks == 0 {
            return Err(EngineError::validation("program_length_weeks must be at least 1"));
        }
        if self.actor.trim().is_empty() {
            return Err(EngineError::validation("actor must not be empty"));
        }
        Ok(())
    }

    pub fn batch_delay(&self) -> Duration {
        Duration::from_millis(self.batch_delay_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_fields_fall_back_to_defaults() {
        let config: EngineConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config.program_length_weeks, 12);
        assert_eq!(config.batch_delay_ms, 300);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn zero_length_program_is_rejected() {
        let config = EngineConfig { program_length_weeks: 0, ..EngineConfig::default_test() };
        assert!(matches!(config.validate(), Err(EngineError::Validation(_))));
    }
}
