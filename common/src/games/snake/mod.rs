mod entity;
mod game_state;
mod perf;
mod render;
mod session;
mod settings;
mod types;

pub use entity::{INITIAL_SNAKE_LENGTH, Snake};
pub use game_state::GameState;
pub use perf::{PERF_SAMPLE_CAPACITY, PerfLog, TurnInstrumentation, TurnTimings};
pub use render::{MarkerSet, RenderAssets};
pub use session::{
    EndReason, NOT_YOUR_GAME_NOTICE, REVERSE_NOTICE, SessionReport, SnakeSession, TurnCommand,
    TurnInput,
};
pub use settings::{
    DEFAULT_FIELD_HEIGHT, DEFAULT_FIELD_WIDTH, DEFAULT_MAX_CELLS, SnakeSessionSettings,
    TimingProfile, TurnTiming,
};
pub use types::{DeathReason, Direction, FieldSize, GameStatus, Point};
