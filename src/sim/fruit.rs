//! Fruit entities and the board that owns them
//!
//! A fruit is a circle with a level. Slow fruits periodically look for a
//! same-level neighbour and ask the merge coordinator to combine them.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::physics::{BodyHandle, PhysicsWorld};
use crate::consts::MAX_LEVEL;
use crate::tuning::Tuning;

/// Display names, Cherry first
pub const FRUIT_NAMES: [&str; MAX_LEVEL as usize + 1] = [
    "Cherry",
    "Strawberry",
    "Grape",
    "Dekopon",
    "Persimmon",
    "Apple",
    "Pear",
    "Peach",
    "Pineapple",
    "Melon",
    "Watermelon",
];

/// Fruit tier, always within `0..=MAX_LEVEL`
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct FruitLevel(u8);

impl FruitLevel {
    pub const MIN: FruitLevel = FruitLevel(0);
    pub const MAX: FruitLevel = FruitLevel(MAX_LEVEL);

    /// Build a level, clamping out-of-range values
    pub fn new(raw: i32) -> Self {
        let clamped = raw.clamp(0, MAX_LEVEL as i32);
        if clamped != raw {
            log::warn!("Fruit level {} out of range, clamped to {}", raw, clamped);
        }
        FruitLevel(clamped as u8)
    }

    #[inline]
    pub fn get(self) -> u8 {
        self.0
    }

    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }

    pub fn is_max(self) -> bool {
        self.0 >= MAX_LEVEL
    }

    /// The level a merge of two `self` fruits produces
    pub fn next(self) -> Option<FruitLevel> {
        (!self.is_max()).then(|| FruitLevel(self.0 + 1))
    }

    /// The level that merges into `self`, none for the smallest fruit
    pub fn prev(self) -> Option<FruitLevel> {
        self.0.checked_sub(1).map(FruitLevel)
    }

    pub fn name(self) -> &'static str {
        FRUIT_NAMES[self.index()]
    }
}

/// Stable fruit identifier, never reused within a session
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct FruitId(pub u32);

/// Monotonic fruit id source
#[derive(Debug, Clone)]
pub struct IdAllocator {
    next: u32,
}

impl Default for IdAllocator {
    fn default() -> Self {
        Self { next: 1 }
    }
}

impl IdAllocator {
    pub fn next_id(&mut self) -> FruitId {
        let id = FruitId(self.next);
        self.next += 1;
        id
    }
}

/// A live fruit on the board
#[derive(Debug, Clone)]
pub struct Fruit {
    pub id: FruitId,
    pub body: BodyHandle,
    pub level: FruitLevel,
    /// Mirrored from the physics world each tick
    pub pos: Vec2,
    pub vel: Vec2,
    pub radius: f32,
    /// Claimed by a pending merge
    pub merge_locked: bool,
    /// When this fruit was created by a merge (None for dropped fruit)
    pub last_merge_time: Option<f64>,
    /// Pending settle check deadline
    merge_check_at: Option<f64>,
}

impl Fruit {
    pub fn new(id: FruitId, body: BodyHandle, level: FruitLevel, pos: Vec2, tuning: &Tuning) -> Self {
        Self {
            id,
            body,
            level,
            pos,
            vel: Vec2::ZERO,
            radius: tuning.radius_for(level),
            merge_locked: false,
            last_merge_time: None,
            merge_check_at: None,
        }
    }

    /// Whether the post-promotion cooldown has run out
    pub fn cooled_down(&self, clock: f64, cooldown: f32) -> bool {
        self.last_merge_time
            .is_none_or(|t| clock >= t + cooldown as f64)
    }

    /// Free to take part in a merge right now
    pub fn can_merge(&self, clock: f64, cooldown: f32) -> bool {
        !self.merge_locked && self.cooled_down(clock, cooldown)
    }

    pub fn is_settled(&self, speed_threshold: f32) -> bool {
        self.vel.length() < speed_threshold
    }

    pub fn merge_check_pending(&self) -> bool {
        self.merge_check_at.is_some()
    }
}

/// All live (released) fruit, sorted by id
#[derive(Debug, Clone, Default)]
pub struct Board {
    pub fruits: Vec<Fruit>,
}

impl Board {
    pub fn len(&self) -> usize {
        self.fruits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fruits.is_empty()
    }

    pub fn insert(&mut self, fruit: Fruit) {
        let at = self.fruits.partition_point(|f| f.id < fruit.id);
        self.fruits.insert(at, fruit);
    }

    pub fn get(&self, id: FruitId) -> Option<&Fruit> {
        self.fruits
            .binary_search_by_key(&id, |f| f.id)
            .ok()
            .map(|i| &self.fruits[i])
    }

    pub fn get_mut(&mut self, id: FruitId) -> Option<&mut Fruit> {
        self.fruits
            .binary_search_by_key(&id, |f| f.id)
            .ok()
            .map(|i| &mut self.fruits[i])
    }

    pub fn remove(&mut self, id: FruitId) -> Option<Fruit> {
        self.fruits
            .binary_search_by_key(&id, |f| f.id)
            .ok()
            .map(|i| self.fruits.remove(i))
    }

    pub fn by_body(&self, body: BodyHandle) -> Option<&Fruit> {
        self.fruits.iter().find(|f| f.body == body)
    }

    /// Copy positions and velocities back from the physics world
    ///
    /// Fruit whose body disappeared underneath us are dropped.
    pub fn sync_from_world<W: PhysicsWorld + ?Sized>(&mut self, world: &W) {
        self.fruits.retain_mut(|fruit| {
            match (world.position(fruit.body), world.velocity(fruit.body)) {
                (Some(pos), Some(vel)) => {
                    fruit.pos = pos;
                    fruit.vel = vel;
                    true
                }
                _ => {
                    log::warn!("Fruit {:?} lost its physics body, removing", fruit.id);
                    false
                }
            }
        });
    }

    /// Arm a settle check on every slow, unlocked fruit without one pending
    pub fn schedule_merge_checks(&mut self, clock: f64, tuning: &Tuning) {
        let delay = tuning.merge_check_delay as f64;
        for fruit in &mut self.fruits {
            if fruit.merge_locked || fruit.merge_check_at.is_some() {
                continue;
            }
            if fruit.is_settled(tuning.merge_speed_threshold) {
                fruit.merge_check_at = Some(clock + delay);
            }
        }
    }

    /// Fruit whose settle check is due, clearing their deadlines
    pub fn take_due_checks(&mut self, clock: f64) -> Vec<FruitId> {
        let mut due = Vec::new();
        for fruit in &mut self.fruits {
            if fruit.merge_check_at.is_some_and(|at| clock >= at) {
                fruit.merge_check_at = None;
                due.push(fruit.id);
            }
        }
        due
    }

    /// Destroy every fruit and its body
    pub fn clear<W: PhysicsWorld + ?Sized>(&mut self, world: &mut W) {
        for fruit in self.fruits.drain(..) {
            world.remove_body(fruit.body);
        }
    }
}

/// Look for a same-level partner close enough to merge with `id`
///
/// Broad pass: bodies overlapping `radius * merge_scan_factor`. Confirm pass:
/// center distance under `radius * merge_confirm_factor`.
pub fn find_merge_partner<W: PhysicsWorld + ?Sized>(
    board: &Board,
    world: &W,
    id: FruitId,
    clock: f64,
    tuning: &Tuning,
) -> Option<FruitId> {
    let fruit = board.get(id)?;
    if !fruit.can_merge(clock, tuning.merge_cooldown) {
        return None;
    }

    let scan = fruit.radius * tuning.merge_scan_factor;
    let confirm = fruit.radius * tuning.merge_confirm_factor;

    world
        .overlap_circle(fruit.pos, scan)
        .into_iter()
        .filter_map(|body| board.by_body(body))
        .filter(|other| other.id != fruit.id && other.level == fruit.level)
        .filter(|other| other.can_merge(clock, tuning.merge_cooldown))
        .find(|other| fruit.pos.distance(other.pos) < confirm)
        .map(|other| other.id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::physics::BodyDesc;
    use crate::sim::world::CircleWorld;

    fn place(board: &mut Board, world: &mut CircleWorld, ids: &mut IdAllocator, level: i32, pos: Vec2) -> FruitId {
        let tuning = Tuning::default();
        let level = FruitLevel::new(level);
        let body = world.create_body(BodyDesc::dynamic(pos, tuning.radius_for(level)));
        let fruit = Fruit::new(ids.next_id(), body, level, pos, &tuning);
        let id = fruit.id;
        board.insert(fruit);
        id
    }

    #[test]
    fn test_level_clamps() {
        assert_eq!(FruitLevel::new(-3), FruitLevel::MIN);
        assert_eq!(FruitLevel::new(42), FruitLevel::MAX);
        assert_eq!(FruitLevel::new(3).name(), "Dekopon");
        assert_eq!(FruitLevel::MAX.next(), None);
        assert_eq!(FruitLevel::new(2).next(), Some(FruitLevel::new(3)));
        assert_eq!(FruitLevel::MIN.prev(), None);
        assert_eq!(FruitLevel::new(4).prev(), Some(FruitLevel::new(3)));
    }

    #[test]
    fn test_cooldown_blocks_fresh_promotions() {
        let tuning = Tuning::default();
        let mut fruit = Fruit::new(FruitId(1), BodyHandle(1), FruitLevel::new(1), Vec2::ZERO, &tuning);
        fruit.last_merge_time = Some(2.0);
        assert!(!fruit.can_merge(2.2, 0.5));
        assert!(fruit.can_merge(2.5, 0.5));
        fruit.merge_locked = true;
        assert!(!fruit.can_merge(10.0, 0.5));
    }

    #[test]
    fn test_merge_check_is_debounced() {
        let tuning = Tuning::default();
        let mut board = Board::default();
        let mut world = CircleWorld::new(10.0, 0.0);
        let mut ids = IdAllocator::default();
        let id = place(&mut board, &mut world, &mut ids, 0, Vec2::new(0.0, 1.0));

        board.schedule_merge_checks(0.0, &tuning);
        board.schedule_merge_checks(0.05, &tuning);
        assert!(board.take_due_checks(0.05).is_empty());
        assert_eq!(board.take_due_checks(0.1), vec![id]);
        assert!(!board.get(id).expect("fruit").merge_check_pending());
    }

    #[test]
    fn test_fast_fruit_not_scheduled() {
        let tuning = Tuning::default();
        let mut board = Board::default();
        let mut world = CircleWorld::new(10.0, 0.0);
        let mut ids = IdAllocator::default();
        let id = place(&mut board, &mut world, &mut ids, 0, Vec2::new(0.0, 1.0));
        board.get_mut(id).expect("fruit").vel = Vec2::new(0.0, -3.0);

        board.schedule_merge_checks(0.0, &tuning);
        assert!(!board.get(id).expect("fruit").merge_check_pending());
    }

    #[test]
    fn test_partner_requires_same_level_and_confirm_distance() {
        let tuning = Tuning::default();
        let mut board = Board::default();
        let mut world = CircleWorld::new(10.0, 0.0);
        let mut ids = IdAllocator::default();
        let r = tuning.fruit_radii[0];

        let a = place(&mut board, &mut world, &mut ids, 0, Vec2::new(0.0, 1.0));
        // Same level but between confirm (1.8r) and scan (2.1r) distance
        let _far = place(&mut board, &mut world, &mut ids, 0, Vec2::new(1.95 * r, 1.0));
        // Different level, very close
        let _other = place(&mut board, &mut world, &mut ids, 1, Vec2::new(-0.5 * r, 1.0));
        assert_eq!(find_merge_partner(&board, &world, a, 0.0, &tuning), None);

        let near = place(&mut board, &mut world, &mut ids, 0, Vec2::new(0.0, 1.0 + 1.5 * r));
        assert_eq!(find_merge_partner(&board, &world, a, 0.0, &tuning), Some(near));
    }

    #[test]
    fn test_locked_partner_is_skipped() {
        let tuning = Tuning::default();
        let mut board = Board::default();
        let mut world = CircleWorld::new(10.0, 0.0);
        let mut ids = IdAllocator::default();
        let a = place(&mut board, &mut world, &mut ids, 2, Vec2::new(0.0, 1.0));
        let b = place(&mut board, &mut world, &mut ids, 2, Vec2::new(0.5, 1.0));
        board.get_mut(b).expect("fruit").merge_locked = true;
        assert_eq!(find_merge_partner(&board, &world, a, 0.0, &tuning), None);
    }

    #[test]
    fn test_sync_drops_orphans() {
        let mut board = Board::default();
        let mut world = CircleWorld::new(10.0, 0.0);
        let mut ids = IdAllocator::default();
        let a = place(&mut board, &mut world, &mut ids, 0, Vec2::new(0.0, 1.0));
        let body = board.get(a).expect("fruit").body;
        world.remove_body(body);
        board.sync_from_world(&world);
        assert!(board.is_empty());
    }
}
