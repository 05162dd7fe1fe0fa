use std::sync::Arc;

use snake_common::games::snake::{Direction, SessionReport, TurnCommand};
use snake_common::games::{DispatchOutcome, FinalFrame, Frame, GameDisplay, SessionManager};
use snake_common::{SessionId, UserId, log};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_stream::StreamExt;
use tokio_stream::wrappers::LinesStream;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ConsoleCommand {
    Start {
        user_id: UserId,
        width: Option<usize>,
        height: Option<usize>,
    },
    Input {
        session_id: SessionId,
        user_id: UserId,
        command: TurnCommand,
    },
    List,
    Exit,
}

/// Blank lines parse to `None`.
pub fn parse_line(line: &str) -> Result<Option<ConsoleCommand>, String> {
    let words: Vec<&str> = line.split_whitespace().collect();
    let command = match words.as_slice() {
        [] => return Ok(None),
        ["list"] => ConsoleCommand::List,
        ["exit"] => ConsoleCommand::Exit,
        ["start", user, rest @ ..] if rest.len() <= 2 => {
            let dimension = |value: Option<&&str>| -> Result<Option<usize>, String> {
                value
                    .map(|v| v.parse::<usize>().map_err(|_| format!("'{}' is not a board size", v)))
                    .transpose()
            };
            ConsoleCommand::Start {
                user_id: UserId::new(*user),
                width: dimension(rest.first())?,
                height: dimension(rest.get(1))?,
            }
        }
        [session, user, command] => ConsoleCommand::Input {
            session_id: SessionId::new(*session),
            user_id: UserId::new(*user),
            command: TurnCommand::parse(command)?,
        },
        _ => {
            return Err(
                "Usage: start <user> [width] [height] | <game> <user> <up|down|left|right|quit> | list | exit"
                    .to_string(),
            );
        }
    };
    Ok(Some(command))
}

/// Prints frames and notices as plain text blocks tagged with the game name.
pub struct ConsoleDisplay<W> {
    writer: Arc<Mutex<W>>,
}

impl<W> Clone for ConsoleDisplay<W> {
    fn clone(&self) -> Self {
        Self {
            writer: self.writer.clone(),
        }
    }
}

impl<W: AsyncWrite + Send + Unpin + 'static> ConsoleDisplay<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer: Arc::new(Mutex::new(writer)),
        }
    }

    pub fn writer(&self) -> Arc<Mutex<W>> {
        self.writer.clone()
    }

    pub async fn print(&self, text: &str) -> Result<(), String> {
        let mut writer = self.writer.lock().await;
        writer
            .write_all(text.as_bytes())
            .await
            .map_err(|e| format!("Failed to write to console: {}", e))?;
        writer
            .flush()
            .await
            .map_err(|e| format!("Failed to flush console: {}", e))
    }
}

fn lock_label(direction: Option<Direction>) -> String {
    match direction {
        Some(direction) => format!(" [{} disabled]", direction.label()),
        None => String::new(),
    }
}

impl<W: AsyncWrite + Send + Unpin + 'static> GameDisplay for ConsoleDisplay<W> {
    async fn show_frame(&self, session_id: &SessionId, frame: Frame) -> Result<(), String> {
        let status = frame.status.unwrap_or_default();
        self.print(&format!(
            "[{}] {}{}\n{}\n",
            session_id,
            status,
            lock_label(frame.locked_direction),
            frame.board
        ))
        .await
    }

    async fn notify(&self, session_id: &SessionId, user_id: &UserId, notice: &str) {
        if let Err(e) = self.print(&format!("[{}] @{}: {}\n", session_id, user_id, notice)).await {
            log!("[session:{}] Failed to notify {}: {}", session_id, user_id, e);
        }
    }

    async fn finish(&self, session_id: &SessionId, frame: FinalFrame) -> Result<(), String> {
        self.print(&format!("[{}] {}\n{}\n", session_id, frame.message, frame.board))
            .await
    }
}

/// Reads commands line by line and plays the role of the chat platform:
/// every started game gets its own message name.
pub struct ConsoleHost<W: AsyncWrite + Send + Unpin + 'static> {
    manager: SessionManager<ConsoleDisplay<W>>,
    display: ConsoleDisplay<W>,
    default_width: usize,
    default_height: usize,
    next_message: u64,
    games: Vec<JoinHandle<SessionReport>>,
    finished: Vec<SessionReport>,
}

impl<W: AsyncWrite + Send + Unpin + 'static> ConsoleHost<W> {
    pub fn new(
        manager: SessionManager<ConsoleDisplay<W>>,
        display: ConsoleDisplay<W>,
        default_width: usize,
        default_height: usize,
    ) -> Self {
        Self {
            manager,
            display,
            default_width,
            default_height,
            next_message: 1,
            games: Vec::new(),
            finished: Vec::new(),
        }
    }

    /// Runs until `exit` or end of input, then quits every running game and
    /// returns how each of them ended.
    pub async fn run<R: AsyncBufRead + Unpin>(
        mut self,
        reader: R,
    ) -> Result<Vec<SessionReport>, String> {
        let mut lines = LinesStream::new(reader.lines());

        while let Some(line) = lines.next().await {
            let line = line.map_err(|e| format!("Failed to read input: {}", e))?;
            match parse_line(&line) {
                Ok(None) => {}
                Ok(Some(ConsoleCommand::Exit)) => break,
                Ok(Some(command)) => self.execute(command).await?,
                Err(e) => self.display.print(&format!("{}\n", e)).await?,
            }
        }

        self.shutdown().await
    }

    async fn execute(&mut self, command: ConsoleCommand) -> Result<(), String> {
        match command {
            ConsoleCommand::Start {
                user_id,
                width,
                height,
            } => self.start(user_id, width, height).await,
            ConsoleCommand::Input {
                session_id,
                user_id,
                command,
            } => {
                let outcome = self.manager.dispatch(&session_id, user_id, command).await;
                if outcome == DispatchOutcome::Unroutable {
                    self.display
                        .print(&format!("No game is running on {}\n", session_id))
                        .await?;
                }
                Ok(())
            }
            ConsoleCommand::List => {
                let active = self.manager.active_sessions().await;
                if active.is_empty() {
                    return self.display.print("No games running\n").await;
                }
                let listing: String = active
                    .iter()
                    .map(|(session_id, owner)| format!("{} played by {}\n", session_id, owner))
                    .collect();
                self.display.print(&listing).await
            }
            ConsoleCommand::Exit => Ok(()),
        }
    }

    async fn start(
        &mut self,
        user_id: UserId,
        width: Option<usize>,
        height: Option<usize>,
    ) -> Result<(), String> {
        let session_id = SessionId::new(format!("msg-{}", self.next_message));
        let width = width.unwrap_or(self.default_width);
        let height = height.unwrap_or(self.default_height);

        match self
            .manager
            .start_session(session_id.clone(), user_id.clone(), width, height)
            .await
        {
            Ok(game) => {
                self.next_message += 1;
                self.collect_finished().await;
                self.games.push(game);
                log!("{} started a {}x{} game on {}", user_id, width, height, session_id);
                Ok(())
            }
            Err(e) => self.display.print(&format!("@{}: {}\n", user_id, e)).await,
        }
    }

    /// Drops handles of games that already ended, keeping their reports.
    async fn collect_finished(&mut self) {
        let (ended, running): (Vec<_>, Vec<_>) =
            self.games.drain(..).partition(|game| game.is_finished());
        self.games = running;

        for game in ended {
            match game.await {
                Ok(report) => self.finished.push(report),
                Err(e) => log!("Game task failed: {}", e),
            }
        }
    }

    async fn shutdown(self) -> Result<Vec<SessionReport>, String> {
        self.manager.close_all().await;

        let mut reports = self.finished;
        for game in self.games {
            match game.await {
                Ok(report) => reports.push(report),
                Err(e) => log!("Game task failed during shutdown: {}", e),
            }
        }
        Ok(reports)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use snake_common::games::snake::{EndReason, RenderAssets, SnakeSessionSettings};

    fn create_host() -> (ConsoleHost<Vec<u8>>, ConsoleDisplay<Vec<u8>>) {
        let display = ConsoleDisplay::new(Vec::new());
        let settings = SnakeSessionSettings {
            assets: RenderAssets::ascii(),
            ..SnakeSessionSettings::default()
        };
        let manager = SessionManager::new(settings, display.clone());
        (ConsoleHost::new(manager, display.clone(), 10, 10), display)
    }

    async fn output(display: &ConsoleDisplay<Vec<u8>>) -> String {
        let writer = display.writer();
        let bytes = writer.lock().await.clone();
        String::from_utf8(bytes).unwrap()
    }

    #[test]
    fn test_parse_start() {
        assert_eq!(
            parse_line("start alice 4 1"),
            Ok(Some(ConsoleCommand::Start {
                user_id: UserId::new("alice"),
                width: Some(4),
                height: Some(1),
            }))
        );
        assert_eq!(
            parse_line("  start bob "),
            Ok(Some(ConsoleCommand::Start {
                user_id: UserId::new("bob"),
                width: None,
                height: None,
            }))
        );
        assert!(parse_line("start bob wide").is_err());
    }

    #[test]
    fn test_parse_input_and_misc() {
        assert_eq!(
            parse_line("msg-3 alice w"),
            Ok(Some(ConsoleCommand::Input {
                session_id: SessionId::new("msg-3"),
                user_id: UserId::new("alice"),
                command: TurnCommand::Move(Direction::Up),
            }))
        );
        assert_eq!(parse_line(""), Ok(None));
        assert_eq!(parse_line("list"), Ok(Some(ConsoleCommand::List)));
        assert_eq!(parse_line("exit"), Ok(Some(ConsoleCommand::Exit)));
        assert!(parse_line("msg-3 alice fly").is_err());
        assert!(parse_line("what").is_err());
    }

    #[tokio::test]
    async fn test_host_plays_game_to_win() {
        let (host, display) = create_host();

        let reports = host.run(&b"start alice 4 1\nmsg-1 alice a\n"[..]).await.unwrap();

        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].reason, EndReason::Won);
        let printed = output(&display).await;
        assert!(printed.contains("[msg-1] Score: 0 [Right disabled]\n*@oo\n"), "{}", printed);
        assert!(printed.contains("[msg-1] You won! Final score: 1\n@ooo\n"), "{}", printed);
    }

    #[tokio::test(start_paused = true)]
    async fn test_host_drops_handles_of_ended_games() {
        let (mut host, _display) = create_host();

        host.start(UserId::new("alice"), Some(4), Some(1)).await.unwrap();
        host.execute(ConsoleCommand::Input {
            session_id: SessionId::new("msg-1"),
            user_id: UserId::new("alice"),
            command: TurnCommand::Move(Direction::Left),
        })
        .await
        .unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;

        host.start(UserId::new("bob"), None, None).await.unwrap();
        assert_eq!(host.games.len(), 1);
        assert_eq!(host.finished.len(), 1);
        assert_eq!(host.finished[0].reason, EndReason::Won);

        let reports = host.shutdown().await.unwrap();
        let reasons: Vec<EndReason> = reports.iter().map(|r| r.reason).collect();
        assert_eq!(reasons, vec![EndReason::Won, EndReason::Quit]);
    }

    #[tokio::test]
    async fn test_host_reports_rejections() {
        let (host, display) = create_host();

        let input = b"start alice 30 30\nstart alice\nstart alice\nmsg-1 bob up\nmsg-7 alice up\nlist\nexit\nmsg-1 alice up\n";
        let reports = host.run(&input[..]).await.unwrap();

        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].reason, EndReason::Quit);
        assert_eq!(reports[0].turns, 0);

        let printed = output(&display).await;
        assert!(printed.contains("@alice: Game size is too big!"), "{}", printed);
        assert!(printed.contains("@alice: You are starting games too fast"), "{}", printed);
        assert!(printed.contains("No game is running on msg-7"), "{}", printed);
        assert!(printed.contains("msg-1 played by alice"), "{}", printed);
        assert!(printed.contains("[msg-1] You quit! Final score: 0"), "{}", printed);
    }
}
