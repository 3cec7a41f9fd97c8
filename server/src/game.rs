use log::{debug, info};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use shared::{
    CollisionKind, Direction, GameConfig, PlayerId, PlayerView, Point, ServerMessage, Snake,
    FOOD_SPAWN_ATTEMPTS,
};
use std::collections::{BTreeMap, HashMap};

/// What happened during one call to [`GameState::step`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TickOutcome {
    pub tick: u64,
    pub deaths: Vec<(PlayerId, CollisionKind)>,
    pub pickups: Vec<(PlayerId, Point)>,
}

/// Authoritative world: every snake keyed by its owner, plus the food on the board.
#[derive(Debug, Clone)]
pub struct GameState {
    pub tick: u64,
    config: GameConfig,
    snakes: BTreeMap<PlayerId, Snake>,
    food: Vec<Point>,
    rng: StdRng,
}

impl GameState {
    pub fn new(config: GameConfig) -> Self {
        Self::with_rng(config, StdRng::from_entropy())
    }

    /// Deterministic world for tests and replays.
    pub fn with_seed(config: GameConfig, seed: u64) -> Self {
        Self::with_rng(config, StdRng::seed_from_u64(seed))
    }

    fn with_rng(config: GameConfig, rng: StdRng) -> Self {
        Self {
            tick: 0,
            config,
            snakes: BTreeMap::new(),
            food: Vec::new(),
            rng,
        }
    }

    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    pub fn add_player(&mut self, id: PlayerId, color: &str) {
        let snake = self.spawn_snake(id, color);

        info!("Added player {} at ({}, {})", id, snake.head().x, snake.head().y);
        self.snakes.insert(id, snake);
        self.replenish_food();
    }

    /// Places a prebuilt snake, replacing any existing one for `id`.
    pub fn insert_snake(&mut self, id: PlayerId, snake: Snake) {
        self.snakes.insert(id, snake);
    }

    pub fn remove_player(&mut self, id: PlayerId) -> bool {
        let removed = self.snakes.remove(&id).is_some();
        if removed {
            info!("Removed player {}", id);
        }
        removed
    }

    /// Replaces the player's snake with a fresh one: new body, score 0, alive.
    pub fn reset_player(&mut self, id: PlayerId) -> bool {
        let Some(color) = self.snakes.get(&id).map(|snake| snake.color().to_string()) else {
            return false;
        };
        let snake = self.spawn_snake(id, color);

        info!("Reset player {} at ({}, {})", id, snake.head().x, snake.head().y);
        self.snakes.insert(id, snake);
        true
    }

    /// Queues a direction change for the next tick. False if rejected or unknown.
    pub fn set_direction(&mut self, id: PlayerId, direction: Direction) -> bool {
        match self.snakes.get_mut(&id) {
            Some(snake) => snake.set_pending_direction(direction),
            None => false,
        }
    }

    pub fn snake(&self, id: PlayerId) -> Option<&Snake> {
        self.snakes.get(&id)
    }

    pub fn player_count(&self) -> usize {
        self.snakes.len()
    }

    pub fn food(&self) -> &[Point] {
        &self.food
    }

    pub fn set_food(&mut self, food: Vec<Point>) {
        self.food = food;
    }

    pub fn clear_food(&mut self) {
        self.food.clear();
    }

    /// Advances the world by one tick.
    ///
    /// Snakes are processed in join order. Every move is judged against the
    /// bodies as they were when the tick started, so the outcome does not
    /// depend on the order in which heads are computed.
    pub fn step(&mut self) -> TickOutcome {
        self.tick += 1;
        let mut outcome = TickOutcome {
            tick: self.tick,
            ..TickOutcome::default()
        };
        let grid_size = self.config.grid_size;

        // Commit directions and check walls and own bodies.
        let mut plans: Vec<(PlayerId, Result<Point, CollisionKind>)> = self
            .snakes
            .iter_mut()
            .filter(|(_, snake)| snake.is_alive())
            .map(|(id, snake)| (*id, snake.next_head(grid_size)))
            .collect();

        // Other snakes' bodies. Nobody has moved or died yet.
        for (id, plan) in plans.iter_mut() {
            if let Ok(head) = *plan {
                let snake = &self.snakes[&*id];
                if snake.collides_with_other(head, self.snakes.values()) {
                    *plan = Err(CollisionKind::Other);
                }
            }
        }

        // Heads meeting in the same empty cell.
        let mut head_counts: HashMap<Point, usize> = HashMap::new();
        for (_, plan) in &plans {
            if let Ok(head) = plan {
                *head_counts.entry(*head).or_insert(0) += 1;
            }
        }
        for (_, plan) in plans.iter_mut() {
            if let Ok(head) = *plan {
                if head_counts[&head] > 1 {
                    *plan = Err(CollisionKind::HeadOn);
                }
            }
        }

        for (id, plan) in plans {
            let Some(snake) = self.snakes.get_mut(&id) else {
                continue;
            };
            match plan {
                Ok(head) => {
                    let eaten = self.food.iter().position(|food| *food == head);
                    if let Some(index) = eaten {
                        self.food.remove(index);
                        snake.award(self.config.food_reward);
                        outcome.pickups.push((id, head));
                    }
                    snake.move_to(head, eaten.is_some());
                    debug_assert!(
                        snake.head().in_bounds(grid_size),
                        "player {} left the grid at {:?}",
                        id,
                        snake.head()
                    );
                }
                Err(kind) => {
                    snake.kill();
                    info!("Player {} died ({})", id, kind.as_str());
                    outcome.deaths.push((id, kind));
                }
            }
        }

        if !outcome.pickups.is_empty() || self.food.len() < self.config.min_food {
            self.replenish_food();
        }

        outcome
    }

    /// Tops the food up to the configured minimum, best effort.
    pub fn replenish_food(&mut self) {
        while self.food.len() < self.config.min_food {
            match self.random_free_cell() {
                Some(cell) => self.food.push(cell),
                None => {
                    debug!(
                        "No free cell found for food after {} attempts",
                        FOOD_SPAWN_ATTEMPTS
                    );
                    break;
                }
            }
        }
    }

    /// Spawns a snake for `id` on a cell clear of food and other snakes.
    ///
    /// The old body of `id` is ignored since it is about to be replaced. Falls
    /// back to the last draw when the interior is too crowded.
    fn spawn_snake(&mut self, id: PlayerId, color: impl Into<String>) -> Snake {
        let color = color.into();
        let mut snake = Snake::spawn(&self.config, color.as_str(), &mut self.rng);
        for _ in 1..FOOD_SPAWN_ATTEMPTS {
            let head = snake.head();
            let taken = self.food.contains(&head)
                || self
                    .snakes
                    .iter()
                    .any(|(owner, other)| *owner != id && other.occupies(head));
            if !taken {
                return snake;
            }
            snake = Snake::spawn(&self.config, color.as_str(), &mut self.rng);
        }
        debug!(
            "No free spawn cell found for player {} after {} attempts",
            id, FOOD_SPAWN_ATTEMPTS
        );
        snake
    }

    fn random_free_cell(&mut self) -> Option<Point> {
        let grid_size = self.config.grid_size;
        for _ in 0..FOOD_SPAWN_ATTEMPTS {
            let cell = Point::new(
                self.rng.gen_range(0..grid_size),
                self.rng.gen_range(0..grid_size),
            );
            let taken = self.food.contains(&cell)
                || self.snakes.values().any(|snake| snake.occupies(cell));
            if !taken {
                return Some(cell);
            }
        }
        None
    }

    /// The `update` message describing the current world, players in join order.
    pub fn snapshot(&self) -> ServerMessage {
        ServerMessage::Update {
            players: self
                .snakes
                .iter()
                .map(|(id, snake)| PlayerView::new(*id, snake))
                .collect(),
            food: self.food.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state() -> GameState {
        GameState::with_seed(GameConfig::default(), 42)
    }

    /// Food parked in a corner, away from every test snake.
    fn park_food(game: &mut GameState) {
        game.set_food(vec![Point::new(0, 29), Point::new(1, 29), Point::new(2, 29)]);
    }

    #[test]
    fn test_add_player_spawns_food() {
        let mut game = state();
        game.add_player(1, "red");

        assert_eq!(game.player_count(), 1);
        assert_eq!(game.food().len(), game.config().min_food);
        assert_eq!(game.snake(1).unwrap().color(), "red");
    }

    #[test]
    fn test_spawn_avoids_occupied_cells() {
        let wall: Vec<Point> = (5..25).map(|x| Point::new(x, 12)).collect();
        for seed in 0..500 {
            let mut game = GameState::with_seed(GameConfig::default(), seed);
            game.insert_snake(1, Snake::with_body(wall.clone(), Direction::Left, "red"));
            game.set_food(vec![Point::new(10, 10), Point::new(15, 15), Point::new(20, 20)]);
            let food = game.food().to_vec();

            game.add_player(2, "blue");
            let head = game.snake(2).unwrap().head();
            assert!(!game.snake(1).unwrap().occupies(head), "seed {}", seed);
            assert!(!food.contains(&head), "seed {}", seed);

            game.reset_player(2);
            let head = game.snake(2).unwrap().head();
            assert!(!game.snake(1).unwrap().occupies(head), "seed {}", seed);
        }
    }

    #[test]
    fn test_step_moves_head_and_keeps_length() {
        let mut game = state();
        game.insert_snake(1, Snake::new(Point::new(10, 10), Direction::Right, "red"));
        park_food(&mut game);

        let outcome = game.step();

        let snake = game.snake(1).unwrap();
        assert_eq!(snake.head(), Point::new(11, 10));
        assert_eq!(snake.len(), 1);
        assert_eq!(outcome.tick, 1);
        assert!(outcome.deaths.is_empty());
    }

    #[test]
    fn test_wall_death_keeps_body() {
        let mut game = state();
        game.insert_snake(1, Snake::new(Point::new(0, 5), Direction::Left, "red"));
        park_food(&mut game);

        let outcome = game.step();

        let snake = game.snake(1).unwrap();
        assert!(!snake.is_alive());
        assert_eq!(snake.head(), Point::new(0, 5));
        assert_eq!(outcome.deaths, vec![(1, CollisionKind::Wall)]);
    }

    #[test]
    fn test_pickup_grows_scores_and_replaces_food() {
        let mut game = state();
        game.insert_snake(1, Snake::new(Point::new(6, 5), Direction::Right, "red"));
        game.set_food(vec![Point::new(7, 5), Point::new(0, 29), Point::new(1, 29)]);

        let outcome = game.step();

        let snake = game.snake(1).unwrap();
        assert_eq!(snake.head(), Point::new(7, 5));
        assert_eq!(snake.len(), 2);
        assert_eq!(snake.score(), 10);
        assert_eq!(outcome.pickups, vec![(1, Point::new(7, 5))]);
        assert_eq!(game.food().len(), 3);
        assert!(!game.food().contains(&Point::new(7, 5)));
        for food in game.food() {
            assert!(!snake.occupies(*food));
        }
    }

    #[test]
    fn test_pending_direction_applies_on_next_tick_only() {
        let mut game = state();
        game.insert_snake(1, Snake::new(Point::new(10, 10), Direction::Right, "red"));
        park_food(&mut game);

        assert!(game.set_direction(1, Direction::Up));
        assert!(game.set_direction(1, Direction::Down));
        assert_eq!(game.snake(1).unwrap().head(), Point::new(10, 10));

        game.step();
        assert_eq!(game.snake(1).unwrap().head(), Point::new(10, 11));
    }

    #[test]
    fn test_reversal_rejected_through_engine() {
        let mut game = state();
        game.insert_snake(1, Snake::new(Point::new(10, 10), Direction::Right, "red"));

        assert!(!game.set_direction(1, Direction::Left));
        assert_eq!(game.snake(1).unwrap().pending_direction(), Direction::Right);
        assert!(!game.set_direction(99, Direction::Up));
    }

    #[test]
    fn test_collision_with_other_body() {
        let mut game = state();
        // Player 2's body runs vertically through (11, 10).
        game.insert_snake(1, Snake::new(Point::new(10, 10), Direction::Right, "red"));
        game.insert_snake(
            2,
            Snake::with_body(
                [Point::new(11, 9), Point::new(11, 10), Point::new(11, 11)],
                Direction::Up,
                "blue",
            ),
        );
        park_food(&mut game);

        let outcome = game.step();

        assert_eq!(outcome.deaths, vec![(1, CollisionKind::Other)]);
        assert!(!game.snake(1).unwrap().is_alive());
        assert!(game.snake(2).unwrap().is_alive());
        assert_eq!(game.snake(2).unwrap().head(), Point::new(11, 8));
    }

    #[test]
    fn test_collision_uses_pre_tick_bodies() {
        let mut game = state();
        // Player 2's tail at (12, 10) moves away this tick, yet still counts.
        game.insert_snake(1, Snake::new(Point::new(11, 10), Direction::Right, "red"));
        game.insert_snake(
            2,
            Snake::with_body(
                [Point::new(13, 9), Point::new(13, 10), Point::new(12, 10)],
                Direction::Up,
                "blue",
            ),
        );
        park_food(&mut game);

        let outcome = game.step();

        assert_eq!(outcome.deaths, vec![(1, CollisionKind::Other)]);
    }

    #[test]
    fn test_head_on_kills_both() {
        let mut game = state();
        game.insert_snake(1, Snake::new(Point::new(10, 10), Direction::Right, "red"));
        game.insert_snake(2, Snake::new(Point::new(12, 10), Direction::Left, "blue"));
        park_food(&mut game);

        let outcome = game.step();

        assert_eq!(
            outcome.deaths,
            vec![(1, CollisionKind::HeadOn), (2, CollisionKind::HeadOn)]
        );
        assert_eq!(game.snake(1).unwrap().head(), Point::new(10, 10));
        assert_eq!(game.snake(2).unwrap().head(), Point::new(12, 10));
    }

    #[test]
    fn test_dead_snakes_are_not_obstacles() {
        let mut game = state();
        let mut corpse = Snake::new(Point::new(11, 10), Direction::Up, "blue");
        corpse.kill();
        game.insert_snake(1, Snake::new(Point::new(10, 10), Direction::Right, "red"));
        game.insert_snake(2, corpse);
        park_food(&mut game);

        let outcome = game.step();

        assert!(outcome.deaths.is_empty());
        assert_eq!(game.snake(1).unwrap().head(), Point::new(11, 10));
    }

    #[test]
    fn test_death_is_terminal_until_reset() {
        let mut game = state();
        game.insert_snake(1, Snake::new(Point::new(0, 5), Direction::Left, "red"));
        park_food(&mut game);

        game.step();
        let frozen = game.snake(1).unwrap().body().clone();
        for _ in 0..5 {
            let outcome = game.step();
            assert!(outcome.deaths.is_empty());
            assert_eq!(game.snake(1).unwrap().body(), &frozen);
        }

        assert!(game.reset_player(1));
        let snake = game.snake(1).unwrap();
        assert!(snake.is_alive());
        assert_eq!(snake.score(), 0);
        assert_eq!(snake.color(), "red");
        assert!(!game.reset_player(99));
    }

    #[test]
    fn test_food_floor_after_every_tick() {
        let mut game = state();
        for id in 1..=4 {
            game.add_player(id, "red");
        }
        game.clear_food();

        for _ in 0..200 {
            game.step();
            assert!(game.food().len() >= game.config().min_food);
        }
    }

    #[test]
    fn test_bounds_and_length_invariants_under_random_play() {
        let mut game = state();
        for id in 1..=6 {
            game.add_player(id, "red");
        }
        let mut rng = StdRng::seed_from_u64(9);

        for _ in 0..500 {
            for id in 1..=6 {
                let direction = Direction::ALL[rng.gen_range(0..4)];
                game.set_direction(id, direction);
            }
            let before: Vec<(usize, bool)> = (1..=6)
                .map(|id| {
                    let snake = game.snake(id).unwrap();
                    (snake.len(), snake.is_alive())
                })
                .collect();

            let outcome = game.step();

            for id in 1..=6u32 {
                let snake = game.snake(id).unwrap();
                let (len_before, alive_before) = before[(id - 1) as usize];
                if snake.is_alive() {
                    for cell in snake.body() {
                        assert!(cell.in_bounds(game.config().grid_size));
                    }
                    let grew = outcome.pickups.iter().any(|(eater, _)| *eater == id);
                    assert_eq!(snake.len(), len_before + usize::from(grew));
                } else if !alive_before {
                    assert_eq!(snake.len(), len_before);
                }
            }

            if rng.gen_bool(0.05) {
                game.reset_player(rng.gen_range(1..=6));
            }
        }
    }

    #[test]
    fn test_snapshot_lists_players_in_join_order() {
        let mut game = state();
        game.add_player(3, "green");
        game.add_player(1, "red");
        game.add_player(2, "blue");

        match game.snapshot() {
            ServerMessage::Update { players, food } => {
                let ids: Vec<PlayerId> = players.iter().map(|player| player.id).collect();
                assert_eq!(ids, vec![1, 2, 3]);
                assert_eq!(food.len(), 3);
            }
            other => panic!("Unexpected message {:?}", other),
        }
    }

    #[test]
    fn test_remove_player() {
        let mut game = state();
        game.add_player(1, "red");
        assert!(game.remove_player(1));
        assert!(!game.remove_player(1));
        assert_eq!(game.player_count(), 0);
    }
}
