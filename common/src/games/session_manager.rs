use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{Mutex, mpsc};
use tokio::task::JoinHandle;
use tokio::time::Instant;

use crate::games::snake::{
    EndReason, GameState, PerfLog, SessionReport, SnakeSession, SnakeSessionSettings,
    TurnCommand, TurnInput, TurnInstrumentation,
};
use crate::games::{FinalFrame, GameDisplay, SessionError, SessionRng};
use crate::{SessionId, UserId, log};

const INPUT_QUEUE_CAPACITY: usize = 16;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DispatchOutcome {
    Delivered,
    /// No live game on that message; the input is dropped.
    Unroutable,
}

#[derive(Clone)]
struct SessionHandle {
    owner: UserId,
    inputs: mpsc::Sender<TurnInput>,
}

/// Registry of running games keyed by the message they are shown in. Owned
/// by whoever dispatches chat commands and cloned into each game's task so
/// the entry is removed when the game ends.
#[derive(Clone)]
pub struct SessionManager<D: GameDisplay> {
    sessions: Arc<Mutex<HashMap<SessionId, SessionHandle>>>,
    last_start: Arc<Mutex<HashMap<UserId, Instant>>>,
    settings: SnakeSessionSettings,
    display: D,
    instrumentation: Option<Arc<dyn TurnInstrumentation>>,
}

impl<D: GameDisplay> SessionManager<D> {
    pub fn new(settings: SnakeSessionSettings, display: D) -> Self {
        let instrumentation = settings
            .perf_timing
            .then(|| Arc::new(PerfLog::default()) as Arc<dyn TurnInstrumentation>);
        Self {
            sessions: Arc::new(Mutex::new(HashMap::new())),
            last_start: Arc::new(Mutex::new(HashMap::new())),
            settings,
            display,
            instrumentation,
        }
    }

    pub fn with_instrumentation(mut self, instrumentation: Arc<dyn TurnInstrumentation>) -> Self {
        self.instrumentation = Some(instrumentation);
        self
    }

    pub fn settings(&self) -> &SnakeSessionSettings {
        &self.settings
    }

    pub async fn start_session(
        &self,
        session_id: SessionId,
        owner: UserId,
        width: usize,
        height: usize,
    ) -> Result<JoinHandle<SessionReport>, SessionError> {
        self.start_with_rng(session_id, owner, width, height, SessionRng::from_random())
            .await
    }

    pub async fn start_seeded_session(
        &self,
        session_id: SessionId,
        owner: UserId,
        width: usize,
        height: usize,
        seed: u64,
    ) -> Result<JoinHandle<SessionReport>, SessionError> {
        self.start_with_rng(session_id, owner, width, height, SessionRng::new(seed))
            .await
    }

    async fn start_with_rng(
        &self,
        session_id: SessionId,
        owner: UserId,
        width: usize,
        height: usize,
        mut rng: SessionRng,
    ) -> Result<JoinHandle<SessionReport>, SessionError> {
        let field_size = self.settings.field_size(width, height)?;

        let mut last_start = self.last_start.lock().await;
        let now = Instant::now();
        let cooldown = self.settings.start_cooldown;
        last_start.retain(|_, started| now.duration_since(*started) < cooldown);
        if let Some(started) = last_start.get(&owner) {
            return Err(SessionError::OnCooldown {
                remaining: cooldown.saturating_sub(now.duration_since(*started)),
            });
        }

        let mut sessions = self.sessions.lock().await;
        if sessions.contains_key(&session_id) {
            return Err(SessionError::AlreadyActive(session_id));
        }

        let game_state = GameState::new(field_size, &mut rng)
            .map_err(|_| SessionError::FieldTooSmall { width, height })?;

        let (inputs, receiver) = mpsc::channel(INPUT_QUEUE_CAPACITY);
        sessions.insert(
            session_id.clone(),
            SessionHandle {
                owner: owner.clone(),
                inputs,
            },
        );
        last_start.insert(owner.clone(), now);
        drop(sessions);
        drop(last_start);

        let seed = rng.seed();
        let session = SnakeSession::new(
            session_id.clone(),
            owner.clone(),
            game_state,
            rng,
            self.settings.timing,
            self.settings.assets.clone(),
            self.display.clone(),
            self.instrumentation.clone(),
        );

        let manager = self.clone();
        Ok(tokio::spawn(async move {
            let report = match tokio::spawn(session.run(receiver)).await {
                Ok(report) => report,
                Err(e) => manager.recover_crashed(&session_id, owner, seed, e).await,
            };
            manager.remove_session(&session_id).await;
            report
        }))
    }

    /// Closes the message of a game whose task died so it is not left with
    /// live controls. The display runs in its own task: a panicking display
    /// must not keep the game registered.
    async fn recover_crashed(
        &self,
        session_id: &SessionId,
        owner: UserId,
        seed: u64,
        error: tokio::task::JoinError,
    ) -> SessionReport {
        log!("[session:{}] Game task crashed (seed {}): {}", session_id, seed, error);
        let reason = EndReason::Failed;
        let frame = FinalFrame {
            board: String::new(),
            message: reason.message().to_string(),
        };

        let display = self.display.clone();
        let closing_id = session_id.clone();
        let closing = tokio::spawn(async move { display.finish(&closing_id, frame).await });
        match closing.await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => log!("[session:{}] Failed to close crashed game: {}", session_id, e),
            Err(e) => log!("[session:{}] Closing crashed game panicked: {}", session_id, e),
        }

        SessionReport {
            session_id: session_id.clone(),
            owner,
            reason,
            score: 0,
            turns: 0,
            seed,
            final_board: String::new(),
        }
    }

    /// Routes one chat input to its game. Authorization is left to the game
    /// itself so the sender can be told why nothing happened.
    pub async fn dispatch(
        &self,
        session_id: &SessionId,
        user_id: UserId,
        command: TurnCommand,
    ) -> DispatchOutcome {
        let handle = {
            let sessions = self.sessions.lock().await;
            sessions.get(session_id).cloned()
        };
        let Some(handle) = handle else {
            log!("[session:{}] Dropping input from {}: no such game", session_id, user_id);
            return DispatchOutcome::Unroutable;
        };

        match handle.inputs.send(TurnInput { user_id, command }).await {
            Ok(()) => DispatchOutcome::Delivered,
            Err(_) => DispatchOutcome::Unroutable,
        }
    }

    pub async fn is_active(&self, session_id: &SessionId) -> bool {
        self.sessions.lock().await.contains_key(session_id)
    }

    pub async fn active_sessions(&self) -> Vec<(SessionId, UserId)> {
        let sessions = self.sessions.lock().await;
        let mut active: Vec<(SessionId, UserId)> = sessions
            .iter()
            .map(|(id, handle)| (id.clone(), handle.owner.clone()))
            .collect();
        active.sort();
        active
    }

    /// Asks every running game to quit on behalf of its owner.
    pub async fn close_all(&self) {
        let handles: Vec<(SessionId, SessionHandle)> = {
            let sessions = self.sessions.lock().await;
            sessions
                .iter()
                .map(|(id, handle)| (id.clone(), handle.clone()))
                .collect()
        };

        for (session_id, handle) in handles {
            let quit = TurnInput {
                user_id: handle.owner.clone(),
                command: TurnCommand::Quit,
            };
            if handle.inputs.send(quit).await.is_err() {
                log!("[session:{}] Already finished while closing", session_id);
            }
        }
    }

    async fn remove_session(&self, session_id: &SessionId) {
        let mut sessions = self.sessions.lock().await;
        sessions.remove(session_id);
        log!("Game session removed: {}", session_id);
    }
}
