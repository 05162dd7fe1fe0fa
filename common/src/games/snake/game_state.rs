use serde::Serialize;

use crate::games::SessionRng;
use crate::log;
use super::render::RenderAssets;
use super::entity::{INITIAL_SNAKE_LENGTH, Snake};
use super::types::{DeathReason, Direction, FieldSize, GameStatus, Point};

const APPLE_START_OFFSET: usize = 3;
const APPLE_SPAWN_ATTEMPTS: usize = 100;
const INITIAL_HEADING: Direction = Direction::Left;

/// Single-player snake. All mutation goes through [`GameState::advance`].
#[derive(Clone, Debug, Serialize)]
pub struct GameState {
    field_size: FieldSize,
    snake: Snake,
    apple: Option<Point>,
    score: u32,
    heading: Direction,
    status: GameStatus,
}

impl GameState {
    pub fn new(field_size: FieldSize, rng: &mut SessionRng) -> Result<Self, String> {
        if field_size.width < INITIAL_SNAKE_LENGTH || field_size.height == 0 {
            return Err(format!(
                "Field must be at least {}x1, got {}x{}",
                INITIAL_SNAKE_LENGTH, field_size.width, field_size.height
            ));
        }
        if field_size.cell_count() <= INITIAL_SNAKE_LENGTH {
            return Err("Field has no room for an apple".to_string());
        }

        let head = Point::new(
            (field_size.width / 2).min(field_size.width - INITIAL_SNAKE_LENGTH),
            field_size.height / 2,
        );
        let snake = Snake::new(head, INITIAL_HEADING, INITIAL_SNAKE_LENGTH);

        let mut state = Self {
            field_size,
            snake,
            apple: None,
            score: 0,
            heading: INITIAL_HEADING,
            status: GameStatus::Alive,
        };

        state.apple = match head.x.checked_sub(APPLE_START_OFFSET) {
            Some(x) => Some(Point::new(x, head.y)),
            None => state.spawn_apple(rng),
        };

        Ok(state)
    }

    pub fn field_size(&self) -> FieldSize {
        self.field_size
    }

    pub fn snake(&self) -> &Snake {
        &self.snake
    }

    pub fn apple(&self) -> Option<Point> {
        self.apple
    }

    pub fn score(&self) -> u32 {
        self.score
    }

    pub fn heading(&self) -> Direction {
        self.heading
    }

    pub fn status(&self) -> GameStatus {
        self.status
    }

    pub fn alive(&self) -> bool {
        self.status == GameStatus::Alive
    }

    /// Runs one tick. A finished game ignores further calls. A losing move is
    /// not applied, so the board stays as it was at the moment of death.
    pub fn advance(&mut self, direction: Direction, rng: &mut SessionRng) -> GameStatus {
        if self.status.is_finished() {
            return self.status;
        }

        let Some(next_head) = direction.step(self.snake.head(), &self.field_size) else {
            return self.game_over(DeathReason::WallCollision);
        };

        let ate_apple = self.apple == Some(next_head);
        if self.snake.collides_on_move(next_head, ate_apple) {
            return self.game_over(DeathReason::SelfCollision);
        }

        self.snake.advance_to(next_head, ate_apple);
        self.heading = direction;

        if ate_apple {
            self.score += 1;
            log!("Apple eaten at ({}, {}). Score: {}", next_head.x, next_head.y, self.score);

            if self.snake.len() == self.field_size.cell_count() {
                self.apple = None;
                return self.game_win();
            }

            self.apple = self.spawn_apple(rng);
        }

        self.status
    }

    pub fn render(&self, assets: &RenderAssets) -> String {
        assets.render(self)
    }

    fn game_over(&mut self, reason: DeathReason) -> GameStatus {
        log!("Snake died: {:?}. Score: {}", reason, self.score);
        self.status = GameStatus::Lost(reason);
        self.status
    }

    fn game_win(&mut self) -> GameStatus {
        log!("Board filled. Score: {}", self.score);
        self.status = GameStatus::Won;
        self.status
    }

    /// Rejection sampling first; when that keeps missing on a crowded board,
    /// pick uniformly among the cells that are still free.
    fn spawn_apple(&self, rng: &mut SessionRng) -> Option<Point> {
        for _ in 0..APPLE_SPAWN_ATTEMPTS {
            let candidate = Point::new(
                rng.random_range(0..self.field_size.width),
                rng.random_range(0..self.field_size.height),
            );
            if !self.snake.contains(candidate) {
                return Some(candidate);
            }
        }

        let free: Vec<Point> = (0..self.field_size.height)
            .flat_map(|y| (0..self.field_size.width).map(move |x| Point::new(x, y)))
            .filter(|p| !self.snake.contains(*p))
            .collect();

        if free.is_empty() {
            return None;
        }
        Some(free[rng.random_range(0..free.len())])
    }

    #[cfg(test)]
    pub(crate) fn with_layout(
        field_size: FieldSize,
        segments: &[Point],
        apple: Option<Point>,
        heading: Direction,
    ) -> Self {
        Self {
            field_size,
            snake: Snake::from_segments(segments.iter().copied().collect()),
            apple,
            score: 0,
            heading,
            status: GameStatus::Alive,
        }
    }

    #[cfg(test)]
    pub(crate) fn set_apple(&mut self, apple: Point) {
        self.apple = Some(apple);
    }
}
