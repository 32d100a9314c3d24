//! Drop session state machine
//!
//! `Holding → Aiming → Released → WaitingRespawn → Holding`. The held fruit
//! hangs frozen and non-colliding at the drop height until it is released.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::fruit::{Fruit, FruitId, FruitLevel, IdAllocator};
use super::physics::{BodyDesc, BodyHandle, PhysicsWorld};
use super::spawn::SpawnController;
use crate::tuning::Tuning;

/// Where the drop cycle currently is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DropState {
    /// Fruit follows the pointer, waiting for a press
    Holding,
    /// Press held, aim assist active
    Aiming,
    /// Fruit let go this tick
    Released,
    /// Respawn delay running, no held fruit
    WaitingRespawn,
}

/// The fruit hanging above the container
#[derive(Debug, Clone)]
pub struct HeldFruit {
    pub id: FruitId,
    pub body: BodyHandle,
    pub level: FruitLevel,
    pub radius: f32,
}

#[derive(Debug, Clone)]
pub struct DropSession {
    pub state: DropState,
    pub held: Option<HeldFruit>,
    /// Current horizontal drop position (already clamped)
    pub drop_x: f32,
    respawn_at: Option<f64>,
}

impl Default for DropSession {
    fn default() -> Self {
        Self::new()
    }
}

impl DropSession {
    /// A session with no held fruit, respawning immediately
    pub fn new() -> Self {
        Self {
            state: DropState::WaitingRespawn,
            held: None,
            drop_x: 0.0,
            respawn_at: Some(0.0),
        }
    }

    pub fn drop_position(&self, tuning: &Tuning) -> Vec2 {
        Vec2::new(self.drop_x, tuning.drop_height)
    }

    /// Level of the held fruit, if any
    pub fn held_level(&self) -> Option<FruitLevel> {
        self.held.as_ref().map(|h| h.level)
    }

    pub fn is_aiming(&self) -> bool {
        self.state == DropState::Aiming
    }

    /// Create a new held fruit from the spawn queue and return to `Holding`
    pub fn spawn_held<W: PhysicsWorld + ?Sized>(
        &mut self,
        world: &mut W,
        spawner: &mut SpawnController,
        ids: &mut IdAllocator,
        tuning: &Tuning,
    ) -> FruitLevel {
        // Never two held fruits at once
        self.discard_held(world);

        let level = spawner.advance_queue();
        let radius = tuning.radius_for(level);
        let body = world.create_body(BodyDesc::phantom(self.drop_position(tuning), radius));
        self.held = Some(HeldFruit {
            id: ids.next_id(),
            body,
            level,
            radius,
        });
        self.respawn_at = None;
        self.state = DropState::Holding;
        level
    }

    /// Follow the pointer horizontally, clamped to the drop zone
    pub fn track<W: PhysicsWorld + ?Sized>(&mut self, world: &mut W, x: f32, tuning: &Tuning) {
        let (min_x, max_x) = tuning.drop_range();
        self.drop_x = x.clamp(min_x, max_x);
        if let Some(held) = &self.held {
            world.set_position(held.body, self.drop_position(tuning));
        }
    }

    /// Begin aiming. Only valid while holding a fruit.
    pub fn press(&mut self) -> bool {
        if self.state == DropState::Holding && self.held.is_some() {
            self.state = DropState::Aiming;
            true
        } else {
            false
        }
    }

    /// Let the held fruit go
    ///
    /// Unfreezes the body, enables collisions, starts the respawn delay and
    /// returns the fruit for the board. Only valid while aiming.
    pub fn release<W: PhysicsWorld + ?Sized>(
        &mut self,
        world: &mut W,
        clock: f64,
        tuning: &Tuning,
    ) -> Option<Fruit> {
        if self.state != DropState::Aiming {
            return None;
        }
        let held = self.held.take()?;

        let pos = self.drop_position(tuning);
        world.set_position(held.body, pos);
        world.set_velocity(held.body, Vec2::ZERO);
        world.set_collidable(held.body, true);
        world.set_frozen(held.body, false);

        self.state = DropState::Released;
        self.respawn_at = Some(clock + tuning.respawn_delay as f64);
        Some(Fruit::new(held.id, held.body, held.level, pos, tuning))
    }

    /// Advance timers. Returns the new held level when a respawn happened.
    pub fn update<W: PhysicsWorld + ?Sized>(
        &mut self,
        world: &mut W,
        spawner: &mut SpawnController,
        ids: &mut IdAllocator,
        clock: f64,
        tuning: &Tuning,
    ) -> Option<FruitLevel> {
        match self.state {
            DropState::Released => {
                self.state = DropState::WaitingRespawn;
                None
            }
            DropState::WaitingRespawn if self.respawn_at.is_some_and(|at| clock >= at) => {
                Some(self.spawn_held(world, spawner, ids, tuning))
            }
            _ => None,
        }
    }

    /// Destroy the held fruit without dropping it
    pub fn discard_held<W: PhysicsWorld + ?Sized>(&mut self, world: &mut W) {
        if let Some(held) = self.held.take() {
            world.remove_body(held.body);
        }
    }

    /// Stop the cycle entirely (game over). No respawn is scheduled.
    pub fn halt<W: PhysicsWorld + ?Sized>(&mut self, world: &mut W) {
        self.discard_held(world);
        self.state = DropState::WaitingRespawn;
        self.respawn_at = None;
    }
}
