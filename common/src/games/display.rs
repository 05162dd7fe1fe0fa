use std::future::Future;

use crate::{SessionId, UserId};
use crate::games::snake::Direction;

/// One board frame plus the controls the player may use next.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Frame {
    pub board: String,
    pub status: Option<String>,
    /// Shown as a disabled control; pressing it would reverse into the neck.
    pub locked_direction: Option<Direction>,
}

/// Last content of a finished game. Interactive controls are removed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FinalFrame {
    pub board: String,
    pub message: String,
}

/// The chat-side message a game is shown in.
pub trait GameDisplay: Send + Sync + Clone + 'static {
    fn show_frame(
        &self,
        session_id: &SessionId,
        frame: Frame,
    ) -> impl Future<Output = Result<(), String>> + Send;

    /// Transient notice only the given user sees.
    fn notify(
        &self,
        session_id: &SessionId,
        user_id: &UserId,
        notice: &str,
    ) -> impl Future<Output = ()> + Send;

    fn finish(
        &self,
        session_id: &SessionId,
        frame: FinalFrame,
    ) -> impl Future<Output = Result<(), String>> + Send;
}
