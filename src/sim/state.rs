//! Game state and core simulation types
//!
//! Everything the tick mutates lives here. The physics world is held by the
//! caller and passed in, so the state never owns a solver.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::drop::DropSession;
use super::fruit::{Board, FruitId, FruitLevel, IdAllocator};
use super::game_over::GameOverMonitor;
use super::merge::MergeCoordinator;
use super::physics::PhysicsWorld;
use super::spawn::SpawnController;
use super::timer::SessionTimer;
use super::trajectory::TrajectoryPredictor;
use crate::score::ScoreState;
use crate::tuning::Tuning;

/// Current phase of gameplay
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GamePhase {
    /// Active gameplay
    Playing,
    /// Game is paused
    Paused,
    /// Run ended, waiting for a reset
    GameOver,
}

/// Why a run ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GameOverReason {
    /// Fruit stayed above the boundary through the grace period
    Overflow,
    /// Timed mode ran out
    TimeUp,
}

/// Things that happened during a tick, drained by the session
#[derive(Debug, Clone, PartialEq)]
pub enum GameEvent {
    /// A held fruit was let go
    Dropped { id: FruitId, level: FruitLevel, x: f32 },
    /// A new held fruit appeared
    Respawned { level: FruitLevel, next: FruitLevel },
    /// Two fruits combined
    Merged {
        consumed: [FruitId; 2],
        created: FruitId,
        level: FruitLevel,
        pos: Vec2,
        points: u64,
    },
    ScoreChanged { score: u64 },
    NewHighScore { high: u64 },
    GameOver { final_score: u64, reason: GameOverReason },
    /// Session was reset
    Restarted,
}

/// Complete game state (deterministic for a given seed and input stream)
#[derive(Debug, Clone)]
pub struct GameState {
    /// Balance constants
    pub tuning: Tuning,
    /// Current phase
    pub phase: GamePhase,
    /// Simulation tick counter
    pub time_ticks: u64,
    /// Simulated seconds since the session started
    pub clock: f64,
    /// Live fruit
    pub board: Board,
    /// Held fruit and drop cycle
    pub session: DropSession,
    pub spawner: SpawnController,
    pub merges: MergeCoordinator,
    pub score: ScoreState,
    pub game_over: GameOverMonitor,
    /// Countdown, only in timed mode
    pub timer: Option<SessionTimer>,
    /// Aim assist, optional
    pub predictor: Option<TrajectoryPredictor>,
    /// Events produced since the last drain
    pub events: Vec<GameEvent>,
    pub ids: IdAllocator,
}

impl GameState {
    /// Create a new game state with the given seed and spawn the first held fruit
    pub fn new<W: PhysicsWorld + ?Sized>(tuning: Tuning, seed: u64, world: &mut W) -> Self {
        let mut state = Self {
            phase: GamePhase::Playing,
            time_ticks: 0,
            clock: 0.0,
            board: Board::default(),
            session: DropSession::new(),
            spawner: SpawnController::new(seed, tuning.spawn_table()),
            merges: MergeCoordinator::new(),
            score: ScoreState::default(),
            game_over: GameOverMonitor::new(&tuning),
            timer: None,
            predictor: Some(TrajectoryPredictor::new(&tuning)),
            events: Vec::new(),
            ids: IdAllocator::default(),
            tuning,
        };
        state.spawn_held(world);
        state
    }

    /// Enable timed mode with the given duration
    pub fn with_timer(mut self, seconds: f32) -> Self {
        self.timer = Some(SessionTimer::new(seconds));
        self
    }

    /// Run without aim assist
    pub fn without_predictor(mut self) -> Self {
        self.predictor = None;
        self
    }

    pub fn drain_events(&mut self) -> Vec<GameEvent> {
        std::mem::take(&mut self.events)
    }

    pub fn is_game_over(&self) -> bool {
        self.phase == GamePhase::GameOver
    }

    /// Create the next held fruit from the spawn queue
    pub fn spawn_held<W: PhysicsWorld + ?Sized>(&mut self, world: &mut W) {
        let level = self
            .session
            .spawn_held(world, &mut self.spawner, &mut self.ids, &self.tuning);
        self.events.push(GameEvent::Respawned {
            level,
            next: self.spawner.preview(),
        });
    }

    /// Award points and report score changes
    pub fn add_score(&mut self, points: u64) {
        let change = self.score.add(points);
        self.events.push(GameEvent::ScoreChanged { score: change.score });
        if let Some(high) = change.new_high {
            self.events.push(GameEvent::NewHighScore { high });
        }
    }

    /// End the run. Further calls are ignored.
    pub fn end_game<W: PhysicsWorld + ?Sized>(&mut self, world: &mut W, reason: GameOverReason) {
        if self.phase == GamePhase::GameOver {
            return;
        }
        self.phase = GamePhase::GameOver;
        if let Some(predictor) = &mut self.predictor {
            predictor.hide();
        }
        self.session.halt(world);
        log::info!("Game over ({:?}), final score {}", reason, self.score.current);
        self.events.push(GameEvent::GameOver {
            final_score: self.score.current,
            reason,
        });
    }

    /// Clear the board and start a fresh session, keeping the high score
    pub fn reset<W: PhysicsWorld + ?Sized>(&mut self, world: &mut W) {
        self.board.clear(world);
        self.merges.clear();
        self.session.halt(world);
        if let Some(predictor) = &mut self.predictor {
            predictor.hide();
        }
        self.score.reset_current();
        self.game_over.reset();
        if let Some(timer) = &mut self.timer {
            timer.reset();
        }
        self.spawner.reset();
        self.phase = GamePhase::Playing;

        self.events.push(GameEvent::Restarted);
        self.events.push(GameEvent::ScoreChanged { score: 0 });
        self.spawn_held(world);
        log::info!("Session reset (high score {})", self.score.high);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::drop::DropState;
    use crate::sim::world::CircleWorld;

    #[test]
    fn test_new_state_holds_a_fruit() {
        let tuning = Tuning::default();
        let mut world = CircleWorld::from_tuning(&tuning);
        let state = GameState::new(tuning, 1, &mut world);
        assert_eq!(state.phase, GamePhase::Playing);
        assert_eq!(state.session.state, DropState::Holding);
        assert!(state.session.held_level().is_some_and(|l| l.index() < 4));
        assert_eq!(world.body_count(), 1);
    }

    #[test]
    fn test_end_game_is_idempotent() {
        let tuning = Tuning::default();
        let mut world = CircleWorld::from_tuning(&tuning);
        let mut state = GameState::new(tuning, 1, &mut world);
        state.drain_events();

        state.end_game(&mut world, GameOverReason::Overflow);
        state.end_game(&mut world, GameOverReason::TimeUp);
        let overs = state
            .drain_events()
            .into_iter()
            .filter(|e| matches!(e, GameEvent::GameOver { .. }))
            .count();
        assert_eq!(overs, 1);
        assert!(state.session.held.is_none());
        assert_eq!(world.body_count(), 0);
    }

    #[test]
    fn test_add_score_tracks_high() {
        let tuning = Tuning::default();
        let mut world = CircleWorld::from_tuning(&tuning);
        let mut state = GameState::new(tuning, 1, &mut world);
        state.score.high = 150;
        state.drain_events();

        state.add_score(100);
        state.add_score(100);
        assert_eq!(
            state.drain_events(),
            vec![
                GameEvent::ScoreChanged { score: 100 },
                GameEvent::ScoreChanged { score: 200 },
                GameEvent::NewHighScore { high: 200 },
            ]
        );
    }
}
