//! Physics substrate seam
//!
//! The simulation never owns a rigid-body solver. Everything it needs from
//! one goes through [`PhysicsWorld`], so the solver can be swapped for an
//! engine binding or the reference [`CircleWorld`](super::world::CircleWorld).

use std::ops::{Deref, DerefMut};

use glam::Vec2;
use serde::{Deserialize, Serialize};

/// Opaque handle to a body owned by the physics world
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct BodyHandle(pub u32);

/// Whether the owner steps the world every tick or only on demand
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SimulationMode {
    /// Stepped once per simulation tick
    #[default]
    Auto,
    /// Only advanced by explicit calls (prediction passes)
    Manual,
}

/// Parameters for a new circular body
#[derive(Debug, Clone, Copy)]
pub struct BodyDesc {
    pub pos: Vec2,
    pub radius: f32,
    /// Kinematic: ignores gravity and is never pushed
    pub frozen: bool,
    /// Takes part in contacts and overlap queries
    pub collidable: bool,
}

impl BodyDesc {
    /// A free, colliding body
    pub fn dynamic(pos: Vec2, radius: f32) -> Self {
        Self {
            pos,
            radius,
            frozen: false,
            collidable: true,
        }
    }

    /// A frozen body that nothing can touch (held fruit, ghost)
    pub fn phantom(pos: Vec2, radius: f32) -> Self {
        Self {
            pos,
            radius,
            frozen: true,
            collidable: false,
        }
    }
}

/// The operations the simulation needs from a 2D physics engine
///
/// Calls with a handle that is no longer alive are ignored (setters) or
/// return `None` (getters).
pub trait PhysicsWorld {
    fn create_body(&mut self, desc: BodyDesc) -> BodyHandle;
    fn remove_body(&mut self, body: BodyHandle);
    fn contains(&self, body: BodyHandle) -> bool;

    fn position(&self, body: BodyHandle) -> Option<Vec2>;
    fn set_position(&mut self, body: BodyHandle, pos: Vec2);
    fn velocity(&self, body: BodyHandle) -> Option<Vec2>;
    fn set_velocity(&mut self, body: BodyHandle, vel: Vec2);
    fn set_frozen(&mut self, body: BodyHandle, frozen: bool);
    fn set_collidable(&mut self, body: BodyHandle, collidable: bool);

    /// Collidable bodies whose circle overlaps the query circle, in handle order
    fn overlap_circle(&self, center: Vec2, radius: f32) -> Vec<BodyHandle>;
    /// Whether the query circle touches the static container
    fn overlaps_container(&self, center: Vec2, radius: f32) -> bool;

    /// Advance the world by `dt` seconds
    fn step(&mut self, dt: f32);
    fn simulation_mode(&self) -> SimulationMode;
    fn set_simulation_mode(&mut self, mode: SimulationMode);

    /// Pairs that started touching during the last step
    fn drain_contacts(&mut self) -> Vec<(BodyHandle, BodyHandle)>;
}

/// Scoped manual-step access to a world
///
/// Switches the world to [`SimulationMode::Manual`] for the lifetime of the
/// scope. On drop the previous mode comes back and a tracked body (the
/// prediction ghost) is put back where it was, whichever way the scope ends.
pub struct ManualStepScope<'w, W: PhysicsWorld + ?Sized> {
    world: &'w mut W,
    previous: SimulationMode,
    restore: Option<(BodyHandle, Vec2)>,
}

impl<'w, W: PhysicsWorld + ?Sized> ManualStepScope<'w, W> {
    pub fn enter(world: &'w mut W) -> Self {
        let previous = world.simulation_mode();
        world.set_simulation_mode(SimulationMode::Manual);
        Self {
            world,
            previous,
            restore: None,
        }
    }

    /// Remember `body`'s current position so it is restored on exit
    pub fn track(&mut self, body: BodyHandle) {
        if self.restore.is_some() {
            return;
        }
        if let Some(pos) = self.world.position(body) {
            self.restore = Some((body, pos));
        }
    }

    /// Mode that will be restored on exit
    pub fn previous_mode(&self) -> SimulationMode {
        self.previous
    }
}

impl<W: PhysicsWorld + ?Sized> Deref for ManualStepScope<'_, W> {
    type Target = W;

    fn deref(&self) -> &W {
        self.world
    }
}

impl<W: PhysicsWorld + ?Sized> DerefMut for ManualStepScope<'_, W> {
    fn deref_mut(&mut self) -> &mut W {
        self.world
    }
}

impl<W: PhysicsWorld + ?Sized> Drop for ManualStepScope<'_, W> {
    fn drop(&mut self) {
        if let Some((body, pos)) = self.restore.take() {
            self.world.set_position(body, pos);
        }
        self.world.set_simulation_mode(self.previous);
    }
}
