use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::{Instant, Interval, MissedTickBehavior, interval_at, sleep_until};

use crate::games::{Frame, FinalFrame, GameDisplay, SessionRng};
use crate::{SessionId, UserId, log};
use super::game_state::GameState;
use super::perf::{TurnInstrumentation, TurnTimings};
use super::render::RenderAssets;
use super::settings::TurnTiming;
use super::types::{DeathReason, Direction, GameStatus};

pub const NOT_YOUR_GAME_NOTICE: &str = "This game button is not for you.";
pub const REVERSE_NOTICE: &str = "The snake can't turn back into itself.";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TurnCommand {
    Move(Direction),
    Quit,
}

impl TurnCommand {
    /// Accepts button names and the keyboard shorthands `w/a/s/d/q`.
    pub fn parse(input: &str) -> Result<Self, String> {
        match input.trim().to_ascii_lowercase().as_str() {
            "up" | "w" => Ok(TurnCommand::Move(Direction::Up)),
            "down" | "s" => Ok(TurnCommand::Move(Direction::Down)),
            "left" | "a" => Ok(TurnCommand::Move(Direction::Left)),
            "right" | "d" => Ok(TurnCommand::Move(Direction::Right)),
            "quit" | "q" => Ok(TurnCommand::Quit),
            other => Err(format!("Unknown command '{}'", other)),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TurnInput {
    pub user_id: UserId,
    pub command: TurnCommand,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EndReason {
    Died(DeathReason),
    Won,
    Quit,
    TimedOut,
    Failed,
}

impl EndReason {
    pub fn message(&self) -> &'static str {
        match self {
            EndReason::Died(_) => "You died!",
            EndReason::Won => "You won!",
            EndReason::Quit => "You quit!",
            EndReason::TimedOut => "Took too long to move!",
            EndReason::Failed => "An unknown error occurred!",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SessionReport {
    pub session_id: SessionId,
    pub owner: UserId,
    pub reason: EndReason,
    pub score: u32,
    pub turns: u32,
    pub seed: u64,
    pub final_board: String,
}

#[derive(Debug, PartialEq, Eq)]
enum TurnOutcome {
    Accepted,
    Ignored,
    Ended(EndReason),
}

/// Turn loop for one game bound to one displayed message. Owns the game
/// state; inputs arrive one at a time over the channel, so turns never
/// overlap.
pub struct SnakeSession<D: GameDisplay> {
    session_id: SessionId,
    owner: UserId,
    game_state: GameState,
    rng: SessionRng,
    locked_direction: Option<Direction>,
    timing: TurnTiming,
    assets: RenderAssets,
    display: D,
    instrumentation: Option<Arc<dyn TurnInstrumentation>>,
    turns: u32,
}

impl<D: GameDisplay> SnakeSession<D> {
    pub fn new(
        session_id: SessionId,
        owner: UserId,
        game_state: GameState,
        rng: SessionRng,
        timing: TurnTiming,
        assets: RenderAssets,
        display: D,
        instrumentation: Option<Arc<dyn TurnInstrumentation>>,
    ) -> Self {
        let locked_direction = Some(game_state.heading().opposite());
        Self {
            session_id,
            owner,
            game_state,
            rng,
            locked_direction,
            timing,
            assets,
            display,
            instrumentation,
            turns: 0,
        }
    }

    pub async fn run(mut self, mut inputs: mpsc::Receiver<TurnInput>) -> SessionReport {
        log!(
            "[session:{}] Game started for {} on {}x{} (seed {})",
            self.session_id,
            self.owner,
            self.game_state.field_size().width,
            self.game_state.field_size().height,
            self.rng.seed()
        );

        let first_frame = self.frame(self.initial_remaining());
        if let Err(e) = self.display.show_frame(&self.session_id, first_frame).await {
            log!("[session:{}] Failed to show first frame: {}", self.session_id, e);
            return self.finish(EndReason::Failed).await;
        }

        let mut deadline = Instant::now() + self.timing.turn_timeout;
        let mut refresh = self.countdown_interval();

        loop {
            tokio::select! {
                input = inputs.recv() => {
                    let Some(input) = input else {
                        return self.finish(EndReason::Quit).await;
                    };
                    match self.handle_input(input).await {
                        TurnOutcome::Accepted => {
                            deadline = Instant::now() + self.timing.turn_timeout;
                            refresh = self.countdown_interval();
                        }
                        TurnOutcome::Ignored => {}
                        TurnOutcome::Ended(reason) => return self.finish(reason).await,
                    }
                }
                _ = sleep_until(deadline) => {
                    return self.finish(EndReason::TimedOut).await;
                }
                _ = next_refresh(&mut refresh) => {
                    let remaining = deadline.saturating_duration_since(Instant::now());
                    let frame = self.frame(Some(remaining));
                    if let Err(e) = self.display.show_frame(&self.session_id, frame).await {
                        log!("[session:{}] Failed to refresh countdown: {}", self.session_id, e);
                        return self.finish(EndReason::Failed).await;
                    }
                }
            }
        }
    }

    async fn handle_input(&mut self, input: TurnInput) -> TurnOutcome {
        if input.user_id != self.owner {
            log!(
                "[session:{}] Rejected input from {}, game belongs to {}",
                self.session_id,
                input.user_id,
                self.owner
            );
            self.display
                .notify(&self.session_id, &input.user_id, NOT_YOUR_GAME_NOTICE)
                .await;
            return TurnOutcome::Ignored;
        }

        match input.command {
            TurnCommand::Quit => TurnOutcome::Ended(EndReason::Quit),
            TurnCommand::Move(direction) if self.locked_direction == Some(direction) => {
                self.display
                    .notify(&self.session_id, &input.user_id, REVERSE_NOTICE)
                    .await;
                TurnOutcome::Ignored
            }
            TurnCommand::Move(direction) => self.play_turn(direction).await,
        }
    }

    async fn play_turn(&mut self, direction: Direction) -> TurnOutcome {
        let turn_start = std::time::Instant::now();

        let step = std::panic::catch_unwind(AssertUnwindSafe(|| {
            let engine_start = std::time::Instant::now();
            let status = self.game_state.advance(direction, &mut self.rng);
            let engine = engine_start.elapsed();

            let render_start = std::time::Instant::now();
            let board = self.game_state.render(&self.assets);
            (status, board, engine, render_start.elapsed())
        }));
        let Ok((status, board, engine, render)) = step else {
            log!("[session:{}] Engine panicked while moving {:?}", self.session_id, direction);
            return TurnOutcome::Ended(EndReason::Failed);
        };

        self.turns += 1;
        self.locked_direction = Some(direction.opposite());

        match status {
            GameStatus::Won => return TurnOutcome::Ended(EndReason::Won),
            GameStatus::Lost(reason) => return TurnOutcome::Ended(EndReason::Died(reason)),
            GameStatus::Alive => {}
        }

        let frame = Frame {
            board,
            status: Some(self.status_line(self.initial_remaining())),
            locked_direction: self.locked_direction,
        };
        let display_start = std::time::Instant::now();
        if let Err(e) = self.display.show_frame(&self.session_id, frame).await {
            log!("[session:{}] Failed to show frame: {}", self.session_id, e);
            return TurnOutcome::Ended(EndReason::Failed);
        }

        if let Some(ref instrumentation) = self.instrumentation {
            instrumentation.record(
                &self.session_id,
                TurnTimings {
                    engine,
                    render,
                    display: display_start.elapsed(),
                    total: turn_start.elapsed(),
                },
            );
        }

        TurnOutcome::Accepted
    }

    async fn finish(self, reason: EndReason) -> SessionReport {
        let board = std::panic::catch_unwind(AssertUnwindSafe(|| {
            self.game_state.render(&self.assets)
        }))
        .unwrap_or_default();
        let score = self.game_state.score();
        let message = format!("{} Final score: {}", reason.message(), score);

        let final_frame = FinalFrame {
            board: board.clone(),
            message,
        };
        if let Err(e) = self.display.finish(&self.session_id, final_frame).await {
            log!("[session:{}] Failed to close game message: {}", self.session_id, e);
        }

        log!(
            "[session:{}] Game over for {}: {:?} after {} turns, score {}",
            self.session_id,
            self.owner,
            reason,
            self.turns,
            score
        );

        SessionReport {
            session_id: self.session_id,
            owner: self.owner,
            reason,
            score,
            turns: self.turns,
            seed: self.rng.seed(),
            final_board: board,
        }
    }

    fn frame(&self, remaining: Option<Duration>) -> Frame {
        Frame {
            board: self.game_state.render(&self.assets),
            status: Some(self.status_line(remaining)),
            locked_direction: self.locked_direction,
        }
    }

    fn status_line(&self, remaining: Option<Duration>) -> String {
        match remaining {
            Some(remaining) => format!(
                "Score: {} | Time left: {}s",
                self.game_state.score(),
                remaining.as_secs()
            ),
            None => format!("Score: {}", self.game_state.score()),
        }
    }

    /// Remaining time shown on a fresh turn; only the countdown profile
    /// displays it.
    fn initial_remaining(&self) -> Option<Duration> {
        self.timing.countdown_refresh.map(|_| self.timing.turn_timeout)
    }

    fn countdown_interval(&self) -> Option<Interval> {
        self.timing.countdown_refresh.map(|period| {
            let mut refresh = interval_at(Instant::now() + period, period);
            refresh.set_missed_tick_behavior(MissedTickBehavior::Skip);
            refresh
        })
    }
}

async fn next_refresh(refresh: &mut Option<Interval>) {
    match refresh {
        Some(interval) => {
            interval.tick().await;
        }
        None => std::future::pending::<()>().await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::games::snake::FieldSize;
    use crate::games::snake::TimingProfile;
    use crate::games::testing::{DisplayEvent, RecordingDisplay};

    fn create_session(display: RecordingDisplay) -> SnakeSession<RecordingDisplay> {
        let mut rng = SessionRng::new(42);
        let game_state = GameState::new(FieldSize::new(10, 10), &mut rng).unwrap();
        SnakeSession::new(
            SessionId::new("msg-1"),
            UserId::new("alice"),
            game_state,
            rng,
            TimingProfile::Primary.into(),
            RenderAssets::ascii(),
            display,
            None,
        )
    }

    fn input(user: &str, command: TurnCommand) -> TurnInput {
        TurnInput {
            user_id: UserId::new(user),
            command,
        }
    }

    #[test]
    fn test_parse_commands() {
        assert_eq!(TurnCommand::parse("UP"), Ok(TurnCommand::Move(Direction::Up)));
        assert_eq!(TurnCommand::parse(" a "), Ok(TurnCommand::Move(Direction::Left)));
        assert_eq!(TurnCommand::parse("q"), Ok(TurnCommand::Quit));
        assert!(TurnCommand::parse("jump").is_err());
    }

    #[tokio::test]
    async fn test_foreign_input_leaves_session_untouched() {
        let display = RecordingDisplay::new();
        let mut session = create_session(display.clone());
        let state_before = serde_yaml_ng::to_string(&session.game_state).unwrap();
        let lock_before = session.locked_direction;

        let outcome = session
            .handle_input(input("mallory", TurnCommand::Move(Direction::Up)))
            .await;
        let quit_outcome = session.handle_input(input("mallory", TurnCommand::Quit)).await;

        assert_eq!(outcome, TurnOutcome::Ignored);
        assert_eq!(quit_outcome, TurnOutcome::Ignored);
        assert_eq!(serde_yaml_ng::to_string(&session.game_state).unwrap(), state_before);
        assert_eq!(session.locked_direction, lock_before);
        assert_eq!(session.turns, 0);
        assert_eq!(
            display.events(),
            vec![
                DisplayEvent::Notice {
                    user_id: UserId::new("mallory"),
                    text: NOT_YOUR_GAME_NOTICE.to_string(),
                },
                DisplayEvent::Notice {
                    user_id: UserId::new("mallory"),
                    text: NOT_YOUR_GAME_NOTICE.to_string(),
                },
            ]
        );
    }

    #[tokio::test]
    async fn test_initial_lock_blocks_reversing_into_neck() {
        let display = RecordingDisplay::new();
        let mut session = create_session(display.clone());
        assert_eq!(session.locked_direction, Some(Direction::Right));

        let outcome = session
            .handle_input(input("alice", TurnCommand::Move(Direction::Right)))
            .await;

        assert_eq!(outcome, TurnOutcome::Ignored);
        assert!(session.game_state.alive());
        assert_eq!(display.frames().len(), 0);
    }

    #[tokio::test]
    async fn test_lock_follows_last_move() {
        let display = RecordingDisplay::new();
        let mut session = create_session(display.clone());

        let sequence = [Direction::Up, Direction::Left, Direction::Down, Direction::Left];
        for direction in sequence {
            assert_eq!(
                session.handle_input(input("alice", TurnCommand::Move(direction))).await,
                TurnOutcome::Accepted
            );
            assert_eq!(session.locked_direction, Some(direction.opposite()));

            let reverse = session
                .handle_input(input("alice", TurnCommand::Move(direction.opposite())))
                .await;
            assert_eq!(reverse, TurnOutcome::Ignored);
        }

        let frames = display.frames();
        assert_eq!(frames.len(), sequence.len());
        assert_eq!(frames[0].locked_direction, Some(Direction::Down));
        assert_eq!(session.turns, 4);
    }

    #[tokio::test]
    async fn test_owner_quit_ends_without_touching_engine() {
        let display = RecordingDisplay::new();
        let mut session = create_session(display.clone());

        let outcome = session.handle_input(input("alice", TurnCommand::Quit)).await;

        assert_eq!(outcome, TurnOutcome::Ended(EndReason::Quit));
        assert!(session.game_state.alive());
        assert_eq!(session.turns, 0);
    }

    #[tokio::test]
    async fn test_display_failure_ends_turn() {
        let display = RecordingDisplay::failing_after(0);
        let mut session = create_session(display.clone());

        let outcome = session
            .handle_input(input("alice", TurnCommand::Move(Direction::Up)))
            .await;

        assert_eq!(outcome, TurnOutcome::Ended(EndReason::Failed));
    }

    #[tokio::test]
    async fn test_finish_reports_final_board_and_message() {
        let display = RecordingDisplay::new();
        let session = create_session(display.clone());
        let board = session.game_state.render(&session.assets);

        let report = session.finish(EndReason::TimedOut).await;

        assert_eq!(report.reason, EndReason::TimedOut);
        assert_eq!(report.final_board, board);
        assert_eq!(report.seed, 42);
        assert_eq!(
            display.final_frame(),
            Some(FinalFrame {
                board,
                message: "Took too long to move! Final score: 0".to_string(),
            })
        );
    }
}
