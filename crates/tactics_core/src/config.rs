//! Tunable engine parameters.
//!
//! Pure data, deserialized from RON by the consumer. The core never reads files.

use serde::{Deserialize, Serialize};

use crate::error::{GameError, Result};

/// Distance thresholds and limits used by the decision engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Distance at which flanking units stop approaching and commit to a dive.
    pub flank_distance: u32,
    /// Distance cautious units try to keep from their target.
    pub cautious_distance: u32,
    /// How many recent positions the oscillation guard remembers.
    pub history_len: usize,
    /// Endurance spent on a two-cell jump.
    pub jump_cost: u32,
    /// Perpendicular offsets tried for flank cells, in order.
    pub flank_offsets: Vec<i32>,
    /// Delay between AI actions when a consumer drives the AI phase in real time.
    pub ai_step_interval_ms: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            flank_distance: 3,
            cautious_distance: 2,
            history_len: 4,
            jump_cost: 2,
            flank_offsets: vec![2, 1],
            ai_step_interval_ms: 300,
        }
    }
}

impl EngineConfig {
    /// Parse a configuration from RON text and validate it.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::InvalidConfig`] if the text does not parse or a value is
    /// out of range.
    pub fn from_ron_str(text: &str) -> Result<Self> {
        let config: Self =
            ron::from_str(text).map_err(|e| GameError::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Check value ranges.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::InvalidConfig`] naming the first bad value.
    pub fn validate(&self) -> Result<()> {
        if self.history_len == 0 {
            return Err(GameError::InvalidConfig(
                "history_len must be at least 1".to_string(),
            ));
        }
        if self.flank_distance == 0 {
            return Err(GameError::InvalidConfig(
                "flank_distance must be at least 1".to_string(),
            ));
        }
        if self.flank_offsets.is_empty() {
            return Err(GameError::InvalidConfig(
                "flank_offsets must not be empty".to_string(),
            ));
        }
        if let Some(bad) = self.flank_offsets.iter().find(|&&k| k <= 0) {
            return Err(GameError::InvalidConfig(format!(
                "flank offset {bad} must be positive"
            )));
        }
        if self.jump_cost == 0 {
            return Err(GameError::InvalidConfig(
                "jump_cost must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}
