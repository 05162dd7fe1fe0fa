use std::collections::{HashSet, VecDeque};

use serde::Serialize;

use super::types::{Direction, Point};

pub const INITIAL_SNAKE_LENGTH: usize = 3;

/// Snake segments, head first. `body_set` mirrors `body` for O(1) lookups.
#[derive(Clone, Debug, Serialize)]
pub struct Snake {
    body: VecDeque<Point>,
    #[serde(skip)]
    body_set: HashSet<Point>,
}

impl Snake {
    /// Builds a snake at `head` with its body trailing behind it, i.e. on the
    /// side opposite to `heading`. Callers make sure the trail fits.
    pub fn new(head: Point, heading: Direction, length: usize) -> Self {
        let (dx, dy) = heading.opposite().offset();
        let body: VecDeque<Point> = (0..length as i32)
            .map(|i| {
                Point::new(
                    (head.x as i32 + dx * i) as usize,
                    (head.y as i32 + dy * i) as usize,
                )
            })
            .collect();
        Self::from_segments(body)
    }

    pub fn from_segments(body: VecDeque<Point>) -> Self {
        let body_set = body.iter().copied().collect();
        Self { body, body_set }
    }

    pub fn head(&self) -> Point {
        *self.body.front().expect("Snake body should never be empty")
    }

    pub fn tail(&self) -> Point {
        *self.body.back().expect("Snake body should never be empty")
    }

    pub fn len(&self) -> usize {
        self.body.len()
    }

    pub fn is_empty(&self) -> bool {
        self.body.is_empty()
    }

    pub fn contains(&self, point: Point) -> bool {
        self.body_set.contains(&point)
    }

    /// Whether moving the head onto `point` this tick hits the body. The
    /// tail cell is free unless the snake is growing, since it moves away in
    /// the same tick.
    pub fn collides_on_move(&self, point: Point, growing: bool) -> bool {
        self.contains(point) && (growing || point != self.tail())
    }

    pub fn advance_to(&mut self, next_head: Point, grow: bool) {
        if !grow {
            let tail = self
                .body
                .pop_back()
                .expect("Snake body should never be empty");
            self.body_set.remove(&tail);
        }
        self.body.push_front(next_head);
        self.body_set.insert(next_head);
    }

    pub fn segments(&self) -> impl Iterator<Item = Point> + '_ {
        self.body.iter().copied()
    }
}
