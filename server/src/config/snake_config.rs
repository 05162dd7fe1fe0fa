use std::time::Duration;

use serde::{Deserialize, Serialize};
use snake_common::config::Validate;
use snake_common::games::snake::{
    DEFAULT_FIELD_HEIGHT, DEFAULT_FIELD_WIDTH, DEFAULT_MAX_CELLS, MarkerSet, SnakeSessionSettings,
    TimingProfile,
};

/// Anything larger no longer fits into one chat message.
const MAX_CELLS_LIMIT: usize = 400;

#[derive(Debug, PartialEq, Serialize, Deserialize, Clone)]
pub struct SnakeConfig {
    pub default_width: usize,
    pub default_height: usize,
    pub max_cells: usize,
    pub timing: TimingProfile,
    pub start_cooldown_secs: u64,
    pub markers: MarkerSet,
    #[serde(default)]
    pub perf_timing: bool,
}

impl SnakeConfig {
    pub fn to_session_settings(&self) -> SnakeSessionSettings {
        SnakeSessionSettings {
            max_cells: self.max_cells,
            timing: self.timing.into(),
            start_cooldown: Duration::from_secs(self.start_cooldown_secs),
            assets: self.markers.into(),
            perf_timing: self.perf_timing,
        }
    }
}

impl Validate for SnakeConfig {
    fn validate(&self) -> Result<(), String> {
        if self.max_cells > MAX_CELLS_LIMIT {
            return Err(format!("max_cells must not exceed {}", MAX_CELLS_LIMIT));
        }
        self.to_session_settings()
            .field_size(self.default_width, self.default_height)
            .map_err(|e| format!("default field size is not playable: {}", e))?;
        if self.start_cooldown_secs > 3600 {
            return Err("start_cooldown_secs must not exceed 3600".to_string());
        }
        Ok(())
    }
}

impl Default for SnakeConfig {
    fn default() -> Self {
        Self {
            default_width: DEFAULT_FIELD_WIDTH,
            default_height: DEFAULT_FIELD_HEIGHT,
            max_cells: DEFAULT_MAX_CELLS,
            timing: TimingProfile::Primary,
            start_cooldown_secs: 10,
            markers: MarkerSet::Emoji,
            perf_timing: false,
        }
    }
}
