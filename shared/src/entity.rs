//! Grid geometry and the snake entity model.
//!
//! A [`Snake`] only knows about itself and the grid bounds. Interactions between
//! snakes and consumables are resolved by the server's simulation engine, which
//! drives the two-phase move ([`Snake::next_head`] then [`Snake::move_to`]).

use crate::GameConfig;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use thiserror::Error;

/// Integer cell coordinate. Also used as the `{x, y}` wire vector for directions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    pub fn in_bounds(&self, grid_size: i32) -> bool {
        (0..grid_size).contains(&self.x) && (0..grid_size).contains(&self.y)
    }

    /// The neighbouring cell one step in `direction`.
    pub fn step(self, direction: Direction) -> Self {
        let delta = direction.delta();
        Self::new(self.x + delta.x, self.y + delta.y)
    }
}

/// One of the four unit movement vectors. Screen coordinates: `Up` is `y - 1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "Point", into = "Point")]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
}

/// A wire vector that is not one of the four unit directions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("invalid direction vector ({x}, {y})")]
pub struct InvalidDirection {
    pub x: i32,
    pub y: i32,
}

impl Direction {
    pub const ALL: [Direction; 4] = [
        Direction::Up,
        Direction::Down,
        Direction::Left,
        Direction::Right,
    ];

    pub fn delta(self) -> Point {
        match self {
            Direction::Up => Point::new(0, -1),
            Direction::Down => Point::new(0, 1),
            Direction::Left => Point::new(-1, 0),
            Direction::Right => Point::new(1, 0),
        }
    }

    pub fn opposite(self) -> Self {
        match self {
            Direction::Up => Direction::Down,
            Direction::Down => Direction::Up,
            Direction::Left => Direction::Right,
            Direction::Right => Direction::Left,
        }
    }

    /// Directions a snake heading this way may be steered to.
    pub fn allowed_turns(self) -> impl Iterator<Item = Direction> {
        Self::ALL
            .into_iter()
            .filter(move |direction| *direction != self.opposite())
    }
}

impl TryFrom<Point> for Direction {
    type Error = InvalidDirection;

    fn try_from(vector: Point) -> Result<Self, Self::Error> {
        match (vector.x, vector.y) {
            (0, -1) => Ok(Direction::Up),
            (0, 1) => Ok(Direction::Down),
            (-1, 0) => Ok(Direction::Left),
            (1, 0) => Ok(Direction::Right),
            (x, y) => Err(InvalidDirection { x, y }),
        }
    }
}

impl From<Direction> for Point {
    fn from(direction: Direction) -> Self {
        direction.delta()
    }
}

/// Why a snake died.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollisionKind {
    /// The head would leave the grid.
    Wall,
    /// The head would enter the snake's own body.
    SelfCollision,
    /// The head would enter another live snake's body.
    Other,
    /// Two or more heads would enter the same cell on the same tick.
    HeadOn,
}

impl CollisionKind {
    pub fn as_str(self) -> &'static str {
        match self {
            CollisionKind::Wall => "wall",
            CollisionKind::SelfCollision => "self",
            CollisionKind::Other => "other",
            CollisionKind::HeadOn => "head-on",
        }
    }
}

/// A player-controlled agent. The head is always `body[0]`.
#[derive(Debug, Clone, PartialEq)]
pub struct Snake {
    body: VecDeque<Point>,
    direction: Direction,
    pending_direction: Direction,
    alive: bool,
    score: u32,
    color: String,
}

impl Snake {
    /// Creates a one-cell snake at `head` heading in `direction`.
    pub fn new(head: Point, direction: Direction, color: impl Into<String>) -> Self {
        Self::with_body([head], direction, color)
    }

    /// Creates a snake from an explicit body, head first.
    ///
    /// Panics if `body` is empty.
    pub fn with_body(
        body: impl IntoIterator<Item = Point>,
        direction: Direction,
        color: impl Into<String>,
    ) -> Self {
        let body: VecDeque<Point> = body.into_iter().collect();
        assert!(!body.is_empty(), "a snake needs at least one segment");

        Self {
            body,
            direction,
            pending_direction: direction,
            alive: true,
            score: 0,
            color: color.into(),
        }
    }

    /// Spawns a fresh snake at a random cell away from the walls, heading right.
    pub fn spawn<R: Rng + ?Sized>(
        config: &GameConfig,
        color: impl Into<String>,
        rng: &mut R,
    ) -> Self {
        let (low, high) = if config.grid_size > 2 * config.spawn_margin {
            (config.spawn_margin, config.grid_size - config.spawn_margin)
        } else {
            (0, config.grid_size)
        };
        let head = Point::new(rng.gen_range(low..high), rng.gen_range(low..high));

        Self::new(head, Direction::Right, color)
    }

    pub fn head(&self) -> Point {
        self.body[0]
    }

    pub fn body(&self) -> &VecDeque<Point> {
        &self.body
    }

    pub fn len(&self) -> usize {
        self.body.len()
    }

    pub fn is_empty(&self) -> bool {
        self.body.is_empty()
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn pending_direction(&self) -> Direction {
        self.pending_direction
    }

    pub fn is_alive(&self) -> bool {
        self.alive
    }

    pub fn score(&self) -> u32 {
        self.score
    }

    pub fn color(&self) -> &str {
        &self.color
    }

    pub fn occupies(&self, cell: Point) -> bool {
        self.body.contains(&cell)
    }

    /// Queues `direction` for the next tick.
    ///
    /// Returns false, leaving the queued direction untouched, when `direction`
    /// reverses the direction applied on the last tick.
    pub fn set_pending_direction(&mut self, direction: Direction) -> bool {
        if direction == self.direction.opposite() {
            return false;
        }
        self.pending_direction = direction;
        true
    }

    /// Commits the queued direction and computes where the head would go.
    ///
    /// The body is not touched. Every current segment, tail included, counts as
    /// an obstacle.
    pub fn next_head(&mut self, grid_size: i32) -> Result<Point, CollisionKind> {
        self.direction = self.pending_direction;
        let candidate = self.head().step(self.direction);

        if !candidate.in_bounds(grid_size) {
            return Err(CollisionKind::Wall);
        }
        if self.occupies(candidate) {
            return Err(CollisionKind::SelfCollision);
        }
        Ok(candidate)
    }

    /// Moves the head to `head`, keeping the tail when `grow` is set.
    pub fn move_to(&mut self, head: Point, grow: bool) {
        self.body.push_front(head);
        if !grow {
            self.body.pop_back();
        }
    }

    /// Single-snake advance: [`next_head`](Self::next_head) followed by either
    /// [`move_to`](Self::move_to) or death. Dead snakes do not move.
    pub fn advance(&mut self, grid_size: i32, grow: bool) -> Option<CollisionKind> {
        if !self.alive {
            return None;
        }
        match self.next_head(grid_size) {
            Ok(head) => {
                self.move_to(head, grow);
                None
            }
            Err(kind) => {
                self.alive = false;
                Some(kind)
            }
        }
    }

    /// True if `candidate` lands on a segment of any other live snake.
    pub fn collides_with_other<'a, I>(&self, candidate: Point, others: I) -> bool
    where
        I: IntoIterator<Item = &'a Snake>,
    {
        others
            .into_iter()
            .filter(|other| !std::ptr::eq(*other, self) && other.alive)
            .any(|other| other.occupies(candidate))
    }

    pub fn kill(&mut self) {
        self.alive = false;
    }

    pub fn award(&mut self, points: u32) {
        self.score = self.score.saturating_add(points);
    }
}
