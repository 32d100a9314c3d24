//! Collision detection and response for circles
//!
//! Fruits are circles; the container is an open-topped box with its floor at
//! y = 0 and side walls at x = ±half_width.

use glam::Vec2;

use crate::consts::CONTACT_SLOP;

/// Result of a collision check
#[derive(Debug, Clone)]
pub struct CollisionResult {
    /// Whether a collision occurred
    pub hit: bool,
    /// Collision point (if hit)
    pub point: Vec2,
    /// Surface normal at collision (pointing toward the first circle's center)
    pub normal: Vec2,
    /// Penetration depth (for position correction)
    pub penetration: f32,
}

impl CollisionResult {
    pub fn miss() -> Self {
        Self {
            hit: false,
            point: Vec2::ZERO,
            normal: Vec2::ZERO,
            penetration: 0.0,
        }
    }
}

/// Check collision between two circles
///
/// The normal points from `b` toward `a`. Coincident centers resolve along +Y
/// so stacked spawns separate vertically.
pub fn circle_circle_collision(a_pos: Vec2, a_radius: f32, b_pos: Vec2, b_radius: f32) -> CollisionResult {
    let delta = a_pos - b_pos;
    let dist = delta.length();
    let reach = a_radius + b_radius;

    if dist >= reach {
        return CollisionResult::miss();
    }

    let normal = if dist > 1e-6 { delta / dist } else { Vec2::Y };
    CollisionResult {
        hit: true,
        point: b_pos + normal * b_radius,
        normal,
        penetration: reach - dist,
    }
}

/// Whether two circles are touching (overlapping or within contact slop)
#[inline]
pub fn circles_touch(a_pos: Vec2, a_radius: f32, b_pos: Vec2, b_radius: f32) -> bool {
    a_pos.distance(b_pos) <= a_radius + b_radius + CONTACT_SLOP
}

/// Check collision with the container walls and floor
///
/// Returns every surface the circle penetrates (at most a wall and the floor).
pub fn circle_container_collision(pos: Vec2, radius: f32, half_width: f32) -> Vec<CollisionResult> {
    let mut hits = Vec::new();

    let floor_pen = radius - pos.y;
    if floor_pen > 0.0 {
        hits.push(CollisionResult {
            hit: true,
            point: Vec2::new(pos.x, 0.0),
            normal: Vec2::Y,
            penetration: floor_pen,
        });
    }

    let left_pen = radius - (pos.x + half_width);
    if left_pen > 0.0 {
        hits.push(CollisionResult {
            hit: true,
            point: Vec2::new(-half_width, pos.y),
            normal: Vec2::X,
            penetration: left_pen,
        });
    }

    let right_pen = pos.x + radius - half_width;
    if right_pen > 0.0 {
        hits.push(CollisionResult {
            hit: true,
            point: Vec2::new(half_width, pos.y),
            normal: Vec2::NEG_X,
            penetration: right_pen,
        });
    }

    hits
}

/// Bounce velocity off a surface, keeping `restitution` of the normal component
///
/// Only applies when moving into the surface.
pub fn bounce_velocity(velocity: Vec2, normal: Vec2, restitution: f32) -> Vec2 {
    let vn = velocity.dot(normal);
    if vn >= 0.0 {
        return velocity;
    }
    velocity - (1.0 + restitution) * vn * normal
}
