//! Reference circle world
//!
//! A small deterministic solver for circles in an open-topped box. It is
//! enough to drive the game headless and in tests; a real engine binding can
//! replace it through [`PhysicsWorld`].

use std::collections::BTreeSet;

use glam::Vec2;

use super::collision::{bounce_velocity, circle_circle_collision, circle_container_collision, circles_touch};
use super::physics::{BodyDesc, BodyHandle, PhysicsWorld, SimulationMode};
use crate::tuning::Tuning;

/// Position-correction passes per step
const SOLVER_ITERATIONS: usize = 4;
/// Fraction of velocity lost per second to air drag
const LINEAR_DAMPING: f32 = 0.4;
/// Horizontal velocity kept per floor contact
const FLOOR_FRICTION: f32 = 0.98;

#[derive(Debug, Clone)]
struct Body {
    handle: BodyHandle,
    pos: Vec2,
    vel: Vec2,
    radius: f32,
    frozen: bool,
    collidable: bool,
}

impl Body {
    /// Inverse mass, zero for frozen bodies (area-proportional mass)
    fn inv_mass(&self) -> f32 {
        if self.frozen {
            0.0
        } else {
            1.0 / (self.radius * self.radius).max(1e-4)
        }
    }
}

/// Circles under gravity inside a box
#[derive(Debug, Clone)]
pub struct CircleWorld {
    /// Sorted by handle for deterministic iteration
    bodies: Vec<Body>,
    half_width: f32,
    gravity: f32,
    restitution: f32,
    mode: SimulationMode,
    next_handle: u32,
    touching: BTreeSet<(BodyHandle, BodyHandle)>,
    contacts: Vec<(BodyHandle, BodyHandle)>,
}

impl CircleWorld {
    pub fn new(play_width: f32, gravity: f32) -> Self {
        Self {
            bodies: Vec::new(),
            half_width: play_width / 2.0,
            gravity,
            restitution: 0.2,
            mode: SimulationMode::Auto,
            next_handle: 1,
            touching: BTreeSet::new(),
            contacts: Vec::new(),
        }
    }

    pub fn from_tuning(tuning: &Tuning) -> Self {
        let mut world = Self::new(tuning.play_width, tuning.gravity);
        world.restitution = tuning.restitution.clamp(0.0, 1.0);
        world
    }

    /// Number of live bodies
    pub fn body_count(&self) -> usize {
        self.bodies.len()
    }

    fn body(&self, handle: BodyHandle) -> Option<&Body> {
        self.bodies
            .binary_search_by_key(&handle, |b| b.handle)
            .ok()
            .map(|i| &self.bodies[i])
    }

    fn body_mut(&mut self, handle: BodyHandle) -> Option<&mut Body> {
        self.bodies
            .binary_search_by_key(&handle, |b| b.handle)
            .ok()
            .map(|i| &mut self.bodies[i])
    }

    fn integrate(&mut self, dt: f32) {
        let damping = (1.0 - LINEAR_DAMPING * dt).clamp(0.0, 1.0);
        for body in self.bodies.iter_mut().filter(|b| !b.frozen) {
            body.vel.y -= self.gravity * dt;
            body.vel *= damping;
            body.pos += body.vel * dt;
        }
    }

    fn solve_pairs(&mut self) {
        let count = self.bodies.len();
        for i in 0..count {
            for j in (i + 1)..count {
                let (head, tail) = self.bodies.split_at_mut(j);
                let a = &mut head[i];
                let b = &mut tail[0];
                if !a.collidable || !b.collidable {
                    continue;
                }

                let wa = a.inv_mass();
                let wb = b.inv_mass();
                let total = wa + wb;
                if total <= 0.0 {
                    continue;
                }

                let result = circle_circle_collision(a.pos, a.radius, b.pos, b.radius);
                if !result.hit {
                    continue;
                }

                let n = result.normal;
                a.pos += n * result.penetration * (wa / total);
                b.pos -= n * result.penetration * (wb / total);

                let vn = (a.vel - b.vel).dot(n);
                if vn < 0.0 {
                    let impulse = -(1.0 + self.restitution) * vn / total;
                    a.vel += n * impulse * wa;
                    b.vel -= n * impulse * wb;
                }
            }
        }
    }

    fn solve_container(&mut self) {
        for body in self.bodies.iter_mut().filter(|b| !b.frozen && b.collidable) {
            for hit in circle_container_collision(body.pos, body.radius, self.half_width) {
                body.pos += hit.normal * hit.penetration;
                body.vel = bounce_velocity(body.vel, hit.normal, self.restitution);
                if hit.normal == Vec2::Y {
                    body.vel.x *= FLOOR_FRICTION;
                }
            }
        }
    }

    fn collect_contacts(&mut self) {
        let mut now = BTreeSet::new();
        for (i, a) in self.bodies.iter().enumerate() {
            if !a.collidable {
                continue;
            }
            for b in self.bodies[i + 1..].iter().filter(|b| b.collidable) {
                if circles_touch(a.pos, a.radius, b.pos, b.radius) {
                    now.insert((a.handle, b.handle));
                }
            }
        }

        self.contacts
            .extend(now.iter().filter(|pair| !self.touching.contains(*pair)).copied());
        self.touching = now;
    }
}

impl PhysicsWorld for CircleWorld {
    fn create_body(&mut self, desc: BodyDesc) -> BodyHandle {
        let handle = BodyHandle(self.next_handle);
        self.next_handle += 1;
        self.bodies.push(Body {
            handle,
            pos: desc.pos,
            vel: Vec2::ZERO,
            radius: desc.radius,
            frozen: desc.frozen,
            collidable: desc.collidable,
        });
        handle
    }

    fn remove_body(&mut self, body: BodyHandle) {
        self.bodies.retain(|b| b.handle != body);
        self.touching.retain(|(a, b)| *a != body && *b != body);
        self.contacts.retain(|(a, b)| *a != body && *b != body);
    }

    fn contains(&self, body: BodyHandle) -> bool {
        self.body(body).is_some()
    }

    fn position(&self, body: BodyHandle) -> Option<Vec2> {
        self.body(body).map(|b| b.pos)
    }

    fn set_position(&mut self, body: BodyHandle, pos: Vec2) {
        if let Some(b) = self.body_mut(body) {
            b.pos = pos;
        }
    }

    fn velocity(&self, body: BodyHandle) -> Option<Vec2> {
        self.body(body).map(|b| b.vel)
    }

    fn set_velocity(&mut self, body: BodyHandle, vel: Vec2) {
        if let Some(b) = self.body_mut(body) {
            b.vel = vel;
        }
    }

    fn set_frozen(&mut self, body: BodyHandle, frozen: bool) {
        if let Some(b) = self.body_mut(body) {
            b.frozen = frozen;
            if frozen {
                b.vel = Vec2::ZERO;
            }
        }
    }

    fn set_collidable(&mut self, body: BodyHandle, collidable: bool) {
        if let Some(b) = self.body_mut(body) {
            b.collidable = collidable;
        }
    }

    fn overlap_circle(&self, center: Vec2, radius: f32) -> Vec<BodyHandle> {
        self.bodies
            .iter()
            .filter(|b| b.collidable && b.pos.distance(center) < b.radius + radius)
            .map(|b| b.handle)
            .collect()
    }

    fn overlaps_container(&self, center: Vec2, radius: f32) -> bool {
        !circle_container_collision(center, radius, self.half_width).is_empty()
    }

    fn step(&mut self, dt: f32) {
        self.integrate(dt);
        for _ in 0..SOLVER_ITERATIONS {
            self.solve_pairs();
            self.solve_container();
        }
        self.collect_contacts();
    }

    fn simulation_mode(&self) -> SimulationMode {
        self.mode
    }

    fn set_simulation_mode(&mut self, mode: SimulationMode) {
        self.mode = mode;
    }

    fn drain_contacts(&mut self) -> Vec<(BodyHandle, BodyHandle)> {
        std::mem::take(&mut self.contacts)
    }
}
