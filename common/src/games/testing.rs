use std::sync::{Arc, Mutex};

use crate::{SessionId, UserId};
use super::{FinalFrame, Frame, GameDisplay};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DisplayEvent {
    Frame(Frame),
    Notice { user_id: UserId, text: String },
    Finished(FinalFrame),
}

/// Display double that records everything shown, optionally failing or
/// panicking once a number of frames went through.
#[derive(Clone, Default)]
pub struct RecordingDisplay {
    events: Arc<Mutex<Vec<DisplayEvent>>>,
    fail_after: Option<usize>,
    panic_after: Option<usize>,
    panic_on_finish: bool,
}

impl RecordingDisplay {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_after(frames: usize) -> Self {
        Self {
            fail_after: Some(frames),
            ..Self::default()
        }
    }

    pub fn panicking_after(frames: usize) -> Self {
        Self {
            panic_after: Some(frames),
            ..Self::default()
        }
    }

    pub fn panicking_on_finish() -> Self {
        Self {
            panic_on_finish: true,
            ..Self::default()
        }
    }

    pub fn events(&self) -> Vec<DisplayEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn frames(&self) -> Vec<Frame> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                DisplayEvent::Frame(frame) => Some(frame),
                _ => None,
            })
            .collect()
    }

    pub fn notices(&self) -> Vec<(UserId, String)> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                DisplayEvent::Notice { user_id, text } => Some((user_id, text)),
                _ => None,
            })
            .collect()
    }

    pub fn final_frame(&self) -> Option<FinalFrame> {
        self.events().into_iter().find_map(|e| match e {
            DisplayEvent::Finished(frame) => Some(frame),
            _ => None,
        })
    }
}

impl GameDisplay for RecordingDisplay {
    async fn show_frame(&self, _session_id: &SessionId, frame: Frame) -> Result<(), String> {
        let shown = self.frames().len();

        if self.panic_after.is_some_and(|n| shown >= n) {
            panic!("display exploded");
        }
        if self.fail_after.is_some_and(|n| shown >= n) {
            return Err("message was deleted".to_string());
        }

        self.events.lock().unwrap().push(DisplayEvent::Frame(frame));
        Ok(())
    }

    async fn notify(&self, _session_id: &SessionId, user_id: &UserId, notice: &str) {
        self.events.lock().unwrap().push(DisplayEvent::Notice {
            user_id: user_id.clone(),
            text: notice.to_string(),
        });
    }

    async fn finish(&self, _session_id: &SessionId, frame: FinalFrame) -> Result<(), String> {
        if self.panic_on_finish {
            panic!("final message exploded");
        }
        self.events.lock().unwrap().push(DisplayEvent::Finished(frame));
        Ok(())
    }
}
