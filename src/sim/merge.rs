//! Merge arbitration
//!
//! Fruits propose merges independently during a tick. The coordinator takes a
//! lock on both fruits at request time, so a fruit can be claimed by at most
//! one request, and consumes all accepted requests together at the end of the
//! tick.
//!
//! A contact refused only because a fruit is still cooling down is kept and
//! retried every tick while the two fruits stay in touch.

use glam::Vec2;

use super::collision::circles_touch;
use super::fruit::{Board, Fruit, FruitId, FruitLevel, IdAllocator};
use super::physics::{BodyDesc, PhysicsWorld};
use crate::tuning::Tuning;

/// An accepted pairing waiting to be consumed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MergeRequest {
    pub a: FruitId,
    pub b: FruitId,
}

/// What a consumed merge produced
#[derive(Debug, Clone, PartialEq)]
pub struct MergeOutcome {
    pub consumed: [FruitId; 2],
    pub created: FruitId,
    /// Level of the new fruit
    pub level: FruitLevel,
    pub pos: Vec2,
    pub points: u64,
}

/// Accepts merge requests and applies them
#[derive(Debug, Clone, Default)]
pub struct MergeCoordinator {
    pending: Vec<MergeRequest>,
    /// Touching pairs waiting for a cooldown to run out
    deferred: Vec<MergeRequest>,
}

impl MergeCoordinator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pending(&self) -> &[MergeRequest] {
        &self.pending
    }

    pub fn deferred(&self) -> &[MergeRequest] {
        &self.deferred
    }

    /// Propose merging `a` and `b`
    ///
    /// Rejected without side effects when either fruit is missing, the pair is
    /// degenerate, the levels differ, the level is already the top tier, or
    /// either fruit is locked or still cooling down. On acceptance both
    /// fruits are locked.
    pub fn request_merge(&mut self, board: &mut Board, a: FruitId, b: FruitId, clock: f64, tuning: &Tuning) -> bool {
        if a == b {
            return false;
        }
        let (Some(fa), Some(fb)) = (board.get(a), board.get(b)) else {
            return false;
        };
        if fa.level != fb.level || fa.level.is_max() {
            return false;
        }
        if !fa.can_merge(clock, tuning.merge_cooldown) || !fb.can_merge(clock, tuning.merge_cooldown) {
            return false;
        }

        for id in [a, b] {
            if let Some(fruit) = board.get_mut(id) {
                fruit.merge_locked = true;
            }
        }
        self.pending.push(MergeRequest { a, b });
        true
    }

    /// Propose a merge for two fruits that just came into contact
    ///
    /// Same as [`request_merge`](Self::request_merge), except a pair refused
    /// only because of the post-promotion cooldown is remembered and retried
    /// by [`retry_deferred`](Self::retry_deferred).
    pub fn request_contact(&mut self, board: &mut Board, a: FruitId, b: FruitId, clock: f64, tuning: &Tuning) -> bool {
        if self.request_merge(board, a, b, clock, tuning) {
            return true;
        }
        if cooling_pair(board, a, b, clock, tuning) && !self.is_deferred(a, b) {
            self.deferred.push(MergeRequest { a, b });
        }
        false
    }

    fn is_deferred(&self, a: FruitId, b: FruitId) -> bool {
        self.deferred
            .iter()
            .any(|r| (r.a == a && r.b == b) || (r.a == b && r.b == a))
    }

    /// Re-request deferred contacts
    ///
    /// A pair is dropped once it merges, separates, or fails for any reason
    /// other than the cooldown. Positions come from the board, so call this
    /// after syncing with the world.
    pub fn retry_deferred(&mut self, board: &mut Board, clock: f64, tuning: &Tuning) {
        let deferred = std::mem::take(&mut self.deferred);
        for request in deferred {
            let (a, b) = (request.a, request.b);
            let touching = match (board.get(a), board.get(b)) {
                (Some(fa), Some(fb)) => circles_touch(fa.pos, fa.radius, fb.pos, fb.radius),
                _ => false,
            };
            if !touching || self.request_merge(board, a, b, clock, tuning) {
                continue;
            }
            if cooling_pair(board, a, b, clock, tuning) {
                self.deferred.push(request);
            }
        }
    }

    /// Consume every accepted request
    ///
    /// Each request removes its two fruits (and bodies) and spawns one fruit
    /// of the next level at their midpoint.
    pub fn resolve<W: PhysicsWorld + ?Sized>(
        &mut self,
        board: &mut Board,
        world: &mut W,
        ids: &mut IdAllocator,
        clock: f64,
        tuning: &Tuning,
    ) -> Vec<MergeOutcome> {
        let mut outcomes = Vec::with_capacity(self.pending.len());

        for request in self.pending.drain(..) {
            let (fa, fb) = match (board.remove(request.a), board.remove(request.b)) {
                (Some(fa), Some(fb)) if fa.level == fb.level && !fa.level.is_max() => (fa, fb),
                (fa, fb) => {
                    log::warn!("Merge {:?} lost a participant before resolving", request);
                    // Survivors go back on the board, free to merge again
                    for mut fruit in [fa, fb].into_iter().flatten() {
                        fruit.merge_locked = false;
                        board.insert(fruit);
                    }
                    continue;
                }
            };
            let Some(level) = fa.level.next() else {
                continue;
            };

            world.remove_body(fa.body);
            world.remove_body(fb.body);

            let pos = (fa.pos + fb.pos) / 2.0;
            let radius = tuning.radius_for(level);
            let body = world.create_body(BodyDesc::dynamic(pos, radius));
            let mut fruit = Fruit::new(ids.next_id(), body, level, pos, tuning);
            fruit.last_merge_time = Some(clock);

            let outcome = MergeOutcome {
                consumed: [fa.id, fb.id],
                created: fruit.id,
                level,
                pos,
                points: tuning.merge_points(fa.level),
            };
            log::debug!(
                "Merged {} #{} + #{} -> {} #{}",
                fa.level.name(),
                fa.id.0,
                fb.id.0,
                level.name(),
                fruit.id.0
            );
            board.insert(fruit);
            outcomes.push(outcome);
        }

        outcomes
    }

    /// Forget queued requests (session reset)
    pub fn clear(&mut self) {
        self.pending.clear();
        self.deferred.clear();
    }
}

/// Both fruits present, same mergeable level, unlocked, and at least one still
/// cooling down
fn cooling_pair(board: &Board, a: FruitId, b: FruitId, clock: f64, tuning: &Tuning) -> bool {
    let (Some(fa), Some(fb)) = (board.get(a), board.get(b)) else {
        return false;
    };
    a != b
        && fa.level == fb.level
        && !fa.level.is_max()
        && !fa.merge_locked
        && !fb.merge_locked
        && (!fa.cooled_down(clock, tuning.merge_cooldown) || !fb.cooled_down(clock, tuning.merge_cooldown))
}
