//! # Amplitude Parcours Game
//!
//! A side-scroller steered by loudness. The player floats at a fixed x and
//! rises as the live amplitude grows; obstacles with a gap scroll in from the
//! right and the player has to pass through each gap.
//!
//! Coordinates follow the canvas convention: y grows downwards, so an
//! amplitude of 0 pulls the player to the bottom edge.

use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::ParcoursConfig;

/// A wall with a single gap, scrolling left.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Obstacle {
    /// Left edge
    pub x: f32,
    pub width: f32,
    /// Top of the gap
    pub gap_top: f32,
    pub gap_height: f32,
    /// Set once the obstacle has scored
    pub passed: bool,
}

impl Obstacle {
    pub fn right(&self) -> f32 {
        self.x + self.width
    }

    pub fn gap_bottom(&self) -> f32 {
        self.gap_top + self.gap_height
    }

    pub fn gap_center(&self) -> f32 {
        self.gap_top + self.gap_height / 2.0
    }
}

/// The ball the player steers.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Player {
    pub x: f32,
    pub y: f32,
    pub radius: f32,
}

impl Player {
    pub fn top(&self) -> f32 {
        self.y - self.radius
    }

    pub fn bottom(&self) -> f32 {
        self.y + self.radius
    }

    pub fn left(&self) -> f32 {
        self.x - self.radius
    }

    pub fn right(&self) -> f32 {
        self.x + self.radius
    }

    /// True when the player overlaps the obstacle's wall outside its gap.
    pub fn collides_with(&self, obstacle: &Obstacle) -> bool {
        let overlaps_x = self.right() > obstacle.x && self.left() < obstacle.right();
        let outside_gap = self.top() < obstacle.gap_top || self.bottom() > obstacle.gap_bottom();
        overlaps_x && outside_gap
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunState {
    AwaitingStart,
    Running,
    GameOver,
}

/// Notable things that happened during a tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ParcoursEvent {
    Spawned(Obstacle),
    Scored { score: u32 },
    GameOver { score: u32 },
}

/// Immutable copy of the game for the presentation layer.
#[derive(Debug, Clone, PartialEq)]
pub struct ParcoursView {
    pub state: RunState,
    pub score: u32,
    pub player: Player,
    pub obstacles: Vec<Obstacle>,
    pub playfield_width: f32,
    pub playfield_height: f32,
}

#[derive(Debug, Clone)]
pub struct ParcoursGame {
    config: ParcoursConfig,
    state: RunState,
    score: u32,
    obstacles: Vec<Obstacle>,
    frame_count: u64,
    player: Player,
}

impl ParcoursGame {
    /// Creates a game in the `AwaitingStart` state.
    pub fn new(config: ParcoursConfig) -> Self {
        let player = Player {
            x: config.player_x,
            y: config.playfield_height / 2.0,
            radius: config.player_radius,
        };
        Self {
            config,
            state: RunState::AwaitingStart,
            score: 0,
            obstacles: Vec::new(),
            frame_count: 0,
            player,
        }
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    pub fn score(&self) -> u32 {
        self.score
    }

    pub fn player(&self) -> Player {
        self.player
    }

    pub fn obstacles(&self) -> &[Obstacle] {
        &self.obstacles
    }

    pub fn playfield(&self) -> (f32, f32) {
        (self.config.playfield_width, self.config.playfield_height)
    }

    /// Clears the run and waits for `start`. Calling it twice is the same as once.
    pub fn reset(&mut self) {
        self.state = RunState::AwaitingStart;
        self.score = 0;
        self.obstacles.clear();
        self.frame_count = 0;
        self.player.y = self.config.playfield_height / 2.0;
    }

    /// Begins a run; ignored unless the game is awaiting start.
    pub fn start(&mut self) {
        if self.state == RunState::AwaitingStart {
            info!("Parcours run started");
            self.state = RunState::Running;
        }
    }

    /// The restart button: reset and start, unless a run is in progress.
    pub fn restart(&mut self) {
        if self.state != RunState::Running {
            self.reset();
            self.start();
        }
    }

    /// Adopts a new playfield size. Existing obstacles keep their positions.
    pub fn resize(&mut self, width: f32, height: f32) {
        if width > 0.0 && height > 0.0 {
            self.config.playfield_width = width;
            self.config.playfield_height = height;
        }
    }

    /// Advances one tick with the current live amplitude.
    pub fn tick<R: Rng + ?Sized>(&mut self, amplitude: f32, rng: &mut R) -> Vec<ParcoursEvent> {
        let mut events = Vec::new();
        if self.state != RunState::Running {
            return events;
        }

        let width = self.config.playfield_width;
        let height = self.config.playfield_height;

        // First-order smoothing towards the amplitude-derived height.
        let target_y = height - amplitude * height * self.config.amplitude_gain;
        self.player.y += (target_y - self.player.y) * self.config.smoothing;

        self.frame_count += 1;
        if self.frame_count % u64::from(self.config.spawn_interval) == 0 {
            let obstacle = self.spawn_obstacle(width, height, rng);
            events.push(ParcoursEvent::Spawned(obstacle));
        }

        for obstacle in &mut self.obstacles {
            obstacle.x -= self.config.speed;
        }

        if self.obstacles.iter().any(|o| self.player.collides_with(o)) {
            info!("Parcours over with score {}", self.score);
            self.state = RunState::GameOver;
            events.push(ParcoursEvent::GameOver { score: self.score });
            return events;
        }

        let player_x = self.player.x;
        for obstacle in self.obstacles.iter_mut().filter(|o| !o.passed) {
            if obstacle.right() < player_x {
                obstacle.passed = true;
                self.score += 1;
                events.push(ParcoursEvent::Scored { score: self.score });
            }
        }

        // Order-preserving removal of everything off the left edge.
        self.obstacles.retain(|o| o.right() >= 0.0);

        events
    }

    pub fn view(&self) -> ParcoursView {
        ParcoursView {
            state: self.state,
            score: self.score,
            player: self.player,
            obstacles: self.obstacles.clone(),
            playfield_width: self.config.playfield_width,
            playfield_height: self.config.playfield_height,
        }
    }

    fn spawn_obstacle<R: Rng + ?Sized>(&mut self, width: f32, height: f32, rng: &mut R) -> Obstacle {
        let gap_height = self.config.gap_height;
        let lo = self.config.gap_margin;
        let hi = height - gap_height - self.config.gap_margin;
        let gap_top = if hi > lo { rng.random_range(lo..hi) } else { lo };

        let obstacle = Obstacle {
            x: width,
            width: self.config.obstacle_width,
            gap_top,
            gap_height,
            passed: false,
        };
        debug!("Spawned obstacle with gap at {:.0}..{:.0}", gap_top, obstacle.gap_bottom());
        self.obstacles.push(obstacle);
        obstacle
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn running_game() -> ParcoursGame {
        let mut game = ParcoursGame::new(ParcoursConfig::default());
        game.start();
        assert_eq!(game.state(), RunState::Running);
        game
    }

    /// Amplitude that makes the player settle on the next gap's center.
    fn steering_amplitude(game: &ParcoursGame) -> f32 {
        let (_, height) = game.playfield();
        let player = game.player();
        let target_y = game
            .obstacles()
            .iter()
            .find(|o| o.right() >= player.left())
            .map(|o| o.gap_center())
            .unwrap_or(height / 2.0);
        (height - target_y) / (height * 1.5)
    }

    #[test]
    fn reset_gives_a_fresh_centered_game() {
        let mut game = running_game();
        let mut rng = StdRng::seed_from_u64(1);
        for _ in 0..300 {
            game.tick(0.3, &mut rng);
        }
        game.reset();
        let once = game.view();
        game.reset();
        let twice = game.view();

        assert_eq!(once, twice);
        assert_eq!(once.state, RunState::AwaitingStart);
        assert_eq!(once.score, 0);
        assert!(once.obstacles.is_empty());
        assert_eq!(once.player.y, 200.0);
    }

    #[test]
    fn awaiting_start_ignores_ticks() {
        let mut game = ParcoursGame::new(ParcoursConfig::default());
        let mut rng = StdRng::seed_from_u64(1);
        assert!(game.tick(1.0, &mut rng).is_empty());
        assert_eq!(game.player().y, 200.0);
    }

    #[test]
    fn obstacles_spawn_every_interval_at_right_edge() {
        let mut game = running_game();
        let mut rng = StdRng::seed_from_u64(3);
        for _ in 0..119 {
            game.tick(0.33, &mut rng);
        }
        assert!(game.obstacles().is_empty());

        let events = game.tick(0.33, &mut rng);
        assert!(matches!(events[0], ParcoursEvent::Spawned(_)));
        let obstacle = game.obstacles()[0];
        assert_eq!(obstacle.x, 800.0 - 2.5);
        assert_eq!(obstacle.gap_height, 120.0);
        assert!(obstacle.gap_top >= 20.0 && obstacle.gap_top < 400.0 - 120.0 - 20.0);
    }

    #[test]
    fn player_eases_towards_amplitude_target() {
        let mut game = running_game();
        let mut rng = StdRng::seed_from_u64(1);
        game.tick(0.5, &mut rng);
        // target = 400 - 0.5 * 400 * 1.5 = 100; y = 200 + (100 - 200) * 0.1
        assert!((game.player().y - 190.0).abs() < 1e-4);
    }

    #[test]
    fn following_the_gaps_scores_ten() {
        let mut game = running_game();
        let mut rng = StdRng::seed_from_u64(11);
        let mut scored_events = 0;

        for _ in 0..5000 {
            let amplitude = steering_amplitude(&game);
            for event in game.tick(amplitude, &mut rng) {
                if let ParcoursEvent::Scored { .. } = event {
                    scored_events += 1;
                }
            }
            if game.score() == 10 {
                break;
            }
        }

        assert_eq!(game.score(), 10);
        assert_eq!(scored_events, 10);
        assert_eq!(game.state(), RunState::Running);
    }

    #[test]
    fn collision_ends_the_run_and_freezes_the_score() {
        let mut game = running_game();
        let mut rng = StdRng::seed_from_u64(5);

        while game.score() < 3 {
            let amplitude = steering_amplitude(&game);
            game.tick(amplitude, &mut rng);
            assert_eq!(game.state(), RunState::Running);
        }

        // Shout: the player flies to the top and hits the next wall.
        let mut game_over = false;
        for _ in 0..1000 {
            if game
                .tick(1.0, &mut rng)
                .iter()
                .any(|e| matches!(e, ParcoursEvent::GameOver { .. }))
            {
                game_over = true;
                break;
            }
        }
        assert!(game_over);
        assert_eq!(game.state(), RunState::GameOver);
        assert_eq!(game.score(), 3);

        let frozen = game.view();
        for _ in 0..200 {
            assert!(game.tick(0.4, &mut rng).is_empty());
        }
        assert_eq!(game.view(), frozen);

        game.restart();
        assert_eq!(game.state(), RunState::Running);
        assert_eq!(game.score(), 0);
    }

    #[test]
    fn each_obstacle_scores_once_and_leaves_the_screen() {
        let mut game = running_game();
        let mut rng = StdRng::seed_from_u64(9);
        for _ in 0..120 {
            let amplitude = steering_amplitude(&game);
            game.tick(amplitude, &mut rng);
        }
        assert_eq!(game.obstacles().len(), 1);

        let mut passes = 0;
        let mut was_passed = false;
        for _ in 0..400 {
            let amplitude = steering_amplitude(&game);
            game.tick(amplitude, &mut rng);
            let first_passed = game.obstacles().first().is_some_and(|o| o.passed);
            if first_passed && !was_passed {
                passes += 1;
            }
            was_passed = first_passed;
        }

        assert_eq!(passes, 1);
        assert_eq!(game.score(), 1);
        // 520 ticks in: the first obstacle is off-screen, later ones remain in order.
        assert!(game.obstacles().iter().all(|o| !o.passed));
        assert!(game.obstacles().windows(2).all(|w| w[0].x < w[1].x));
    }

    #[test]
    fn restart_is_ignored_mid_run() {
        let mut game = running_game();
        let mut rng = StdRng::seed_from_u64(2);
        for _ in 0..130 {
            game.tick(0.33, &mut rng);
        }
        game.restart();
        assert_eq!(game.obstacles().len(), 1);
    }
}
