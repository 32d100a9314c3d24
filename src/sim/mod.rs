//! Deterministic simulation module
//!
//! All gameplay logic lives here. This module must be pure and deterministic:
//! - Fixed timestep only
//! - Seeded RNG only
//! - Stable iteration order (by fruit ID / body handle)
//! - Physics behind the [`PhysicsWorld`] trait, no engine types leak out

pub mod collision;
pub mod drop;
pub mod fruit;
pub mod game_over;
pub mod merge;
pub mod physics;
pub mod spawn;
pub mod state;
pub mod tick;
pub mod timer;
pub mod trajectory;
pub mod world;

pub use collision::CollisionResult;
pub use drop::{DropSession, DropState, HeldFruit};
pub use fruit::{Board, FRUIT_NAMES, Fruit, FruitId, FruitLevel, IdAllocator, find_merge_partner};
pub use game_over::GameOverMonitor;
pub use merge::{MergeCoordinator, MergeOutcome, MergeRequest};
pub use physics::{BodyDesc, BodyHandle, ManualStepScope, PhysicsWorld, SimulationMode};
pub use spawn::SpawnController;
pub use state::{GameEvent, GameOverReason, GamePhase, GameState};
pub use tick::{TickInput, tick};
pub use timer::SessionTimer;
pub use trajectory::{Trajectory, TrajectoryPredictor, TrajectorySample};
pub use world::CircleWorld;
