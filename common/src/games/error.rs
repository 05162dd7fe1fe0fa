use std::fmt;
use std::time::Duration;

use crate::SessionId;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SessionError {
    FieldTooBig {
        width: usize,
        height: usize,
        max_cells: usize,
    },
    FieldTooSmall {
        width: usize,
        height: usize,
    },
    AlreadyActive(SessionId),
    OnCooldown {
        remaining: Duration,
    },
}

impl fmt::Display for SessionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionError::FieldTooBig { width, height, max_cells } => write!(
                f,
                "Game size is too big! {}x{} must be under {} cells",
                width, height, max_cells
            ),
            SessionError::FieldTooSmall { width, height } => write!(
                f,
                "Game size is too small! {}x{} leaves no room to play",
                width, height
            ),
            SessionError::AlreadyActive(session_id) => {
                write!(f, "A game is already running on {}", session_id)
            }
            SessionError::OnCooldown { remaining } => write!(
                f,
                "You are starting games too fast, try again in {:.1}s",
                remaining.as_secs_f32()
            ),
        }
    }
}

impl std::error::Error for SessionError {}

impl From<SessionError> for String {
    fn from(err: SessionError) -> Self {
        err.to_string()
    }
}
