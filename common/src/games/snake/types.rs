use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub struct Point {
    pub x: usize,
    pub y: usize,
}

impl Point {
    pub fn new(x: usize, y: usize) -> Self {
        Self { x, y }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
}

impl Direction {
    pub const ALL: [Direction; 4] = [Direction::Up, Direction::Down, Direction::Left, Direction::Right];

    pub fn opposite(self) -> Direction {
        match self {
            Direction::Up => Direction::Down,
            Direction::Down => Direction::Up,
            Direction::Left => Direction::Right,
            Direction::Right => Direction::Left,
        }
    }

    pub fn is_opposite(&self, other: &Direction) -> bool {
        self.opposite() == *other
    }

    /// Unit step as `(dx, dy)`; `y` grows downwards, matching row-major output.
    pub fn offset(self) -> (i32, i32) {
        match self {
            Direction::Up => (0, -1),
            Direction::Down => (0, 1),
            Direction::Left => (-1, 0),
            Direction::Right => (1, 0),
        }
    }

    pub fn from_offset(dx: i32, dy: i32) -> Result<Direction, String> {
        match (dx, dy) {
            (0, 0) => Err("Direction vector cannot be zero".to_string()),
            (0, -1) => Ok(Direction::Up),
            (0, 1) => Ok(Direction::Down),
            (-1, 0) => Ok(Direction::Left),
            (1, 0) => Ok(Direction::Right),
            _ => Err(format!("Cannot move more than 1 tile at once: ({}, {})", dx, dy)),
        }
    }

    /// The neighbouring cell in this direction, or `None` past the edge.
    pub fn step(self, from: Point, field_size: &FieldSize) -> Option<Point> {
        let next = match self {
            Direction::Up => Point::new(from.x, from.y.checked_sub(1)?),
            Direction::Down => Point::new(from.x, from.y + 1),
            Direction::Left => Point::new(from.x.checked_sub(1)?, from.y),
            Direction::Right => Point::new(from.x + 1, from.y),
        };
        field_size.contains(next).then_some(next)
    }

    pub fn label(self) -> &'static str {
        match self {
            Direction::Up => "Up",
            Direction::Down => "Down",
            Direction::Left => "Left",
            Direction::Right => "Right",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct FieldSize {
    pub width: usize,
    pub height: usize,
}

impl FieldSize {
    pub fn new(width: usize, height: usize) -> Self {
        Self { width, height }
    }

    pub fn cell_count(&self) -> usize {
        self.width * self.height
    }

    pub fn contains(&self, point: Point) -> bool {
        point.x < self.width && point.y < self.height
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum DeathReason {
    WallCollision,
    SelfCollision,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum GameStatus {
    Alive,
    Won,
    Lost(DeathReason),
}

impl GameStatus {
    pub fn is_finished(&self) -> bool {
        !matches!(self, GameStatus::Alive)
    }
}
