mod display;
mod error;
mod session_manager;
mod session_rng;

pub mod snake;

#[cfg(test)]
pub(crate) mod testing;

pub use display::{FinalFrame, Frame, GameDisplay};
pub use error::SessionError;
pub use session_manager::{DispatchOutcome, SessionManager};
pub use session_rng::SessionRng;
