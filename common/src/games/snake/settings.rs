use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::games::SessionError;
use super::render::{MarkerSet, RenderAssets};
use super::entity::INITIAL_SNAKE_LENGTH;
use super::types::FieldSize;

pub const DEFAULT_FIELD_WIDTH: usize = 10;
pub const DEFAULT_FIELD_HEIGHT: usize = 10;
/// Keeps the rendered board under the chat platform's message size limit.
pub const DEFAULT_MAX_CELLS: usize = 200;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimingProfile {
    /// 15 seconds per move.
    Primary,
    /// 60 seconds per move, with the remaining time re-displayed.
    Countdown,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TurnTiming {
    pub turn_timeout: Duration,
    pub countdown_refresh: Option<Duration>,
}

impl From<TimingProfile> for TurnTiming {
    fn from(profile: TimingProfile) -> Self {
        match profile {
            TimingProfile::Primary => Self {
                turn_timeout: Duration::from_secs(15),
                countdown_refresh: None,
            },
            TimingProfile::Countdown => Self {
                turn_timeout: Duration::from_secs(60),
                countdown_refresh: Some(Duration::from_secs(10)),
            },
        }
    }
}

#[derive(Clone, Debug)]
pub struct SnakeSessionSettings {
    pub max_cells: usize,
    pub timing: TurnTiming,
    pub start_cooldown: Duration,
    pub assets: RenderAssets,
    pub perf_timing: bool,
}

impl Default for SnakeSessionSettings {
    fn default() -> Self {
        Self {
            max_cells: DEFAULT_MAX_CELLS,
            timing: TimingProfile::Primary.into(),
            start_cooldown: Duration::from_secs(10),
            assets: MarkerSet::Emoji.into(),
            perf_timing: false,
        }
    }
}

impl SnakeSessionSettings {
    /// Checks requested board dimensions before any session exists.
    pub fn field_size(&self, width: usize, height: usize) -> Result<FieldSize, SessionError> {
        let cells = width.saturating_mul(height);
        if cells >= self.max_cells {
            return Err(SessionError::FieldTooBig {
                width,
                height,
                max_cells: self.max_cells,
            });
        }
        if width < INITIAL_SNAKE_LENGTH || height == 0 || cells <= INITIAL_SNAKE_LENGTH {
            return Err(SessionError::FieldTooSmall { width, height });
        }
        Ok(FieldSize::new(width, height))
    }
}
