//! Aim-assist trajectory prediction
//!
//! The predictor drops an invisible ghost from the held fruit's position and
//! marches it under gravity until it overlaps board fruit or the container.
//! Work is split into batches of steps so a long prediction can span several
//! ticks. Every batch runs inside a [`ManualStepScope`], so between batches
//! the live world is exactly as it was and the job can be dropped at any
//! point.

use glam::Vec2;

use super::physics::{BodyDesc, BodyHandle, ManualStepScope, PhysicsWorld};
use crate::tuning::Tuning;

/// One point on a predicted path
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrajectorySample {
    pub pos: Vec2,
    pub tick: u32,
}

/// A finished prediction
#[derive(Debug, Clone, PartialEq)]
pub struct Trajectory {
    pub points: Vec<TrajectorySample>,
    pub landing: Vec2,
    /// Whether the path ended on a collision rather than the step budget
    pub hit: bool,
}

#[derive(Debug, Clone)]
struct PredictionJob {
    start: Vec2,
    radius: f32,
    pos: Vec2,
    vel: Vec2,
    step: u32,
    points: Vec<TrajectorySample>,
}

impl PredictionJob {
    fn new(start: Vec2, radius: f32) -> Self {
        Self {
            start,
            radius,
            pos: start,
            vel: Vec2::ZERO,
            step: 0,
            points: Vec::new(),
        }
    }

    fn same_inputs(&self, start: Vec2, radius: f32) -> bool {
        self.start == start && self.radius == radius
    }
}

#[derive(Debug, Clone)]
pub struct TrajectoryPredictor {
    steps: u32,
    time_step: f32,
    gravity: f32,
    steps_per_tick: u32,
    ghost: Option<BodyHandle>,
    job: Option<PredictionJob>,
    latest: Option<Trajectory>,
}

impl TrajectoryPredictor {
    pub fn new(tuning: &Tuning) -> Self {
        Self {
            steps: tuning.prediction_steps.max(1),
            time_step: tuning.prediction_time_step,
            gravity: tuning.gravity,
            steps_per_tick: tuning.prediction_steps_per_tick.max(1),
            ghost: None,
            job: None,
            latest: None,
        }
    }

    /// Most recent finished prediction (what the aim line shows)
    pub fn latest(&self) -> Option<&Trajectory> {
        self.latest.as_ref()
    }

    /// Whether a prediction is in flight
    pub fn is_busy(&self) -> bool {
        self.job.is_some()
    }

    pub fn ghost(&self) -> Option<BodyHandle> {
        self.ghost
    }

    /// Ask for a prediction from `start`
    ///
    /// An in-flight job with the same inputs keeps running; anything else
    /// replaces it and starts over from scratch.
    pub fn request(&mut self, start: Vec2, radius: f32) {
        if self.job.as_ref().is_some_and(|job| job.same_inputs(start, radius)) {
            return;
        }
        self.job = Some(PredictionJob::new(start, radius));
    }

    /// Run one batch of the current job
    ///
    /// Returns the finished trajectory when this batch completed it.
    pub fn advance<W: PhysicsWorld + ?Sized>(&mut self, world: &mut W) -> Option<&Trajectory> {
        self.run(world, self.steps_per_tick)
    }

    /// Predict synchronously, ignoring the batch size
    pub fn predict<W: PhysicsWorld + ?Sized>(&mut self, world: &mut W, start: Vec2, radius: f32) -> Option<Trajectory> {
        self.job = Some(PredictionJob::new(start, radius));
        self.run(world, self.steps).cloned()
    }

    /// Hide the aim line and cancel pending work
    pub fn hide(&mut self) {
        self.job = None;
        self.latest = None;
    }

    /// Hide and destroy the ghost body
    pub fn shutdown<W: PhysicsWorld + ?Sized>(&mut self, world: &mut W) {
        self.hide();
        if let Some(ghost) = self.ghost.take() {
            world.remove_body(ghost);
        }
    }

    fn ensure_ghost<W: PhysicsWorld + ?Sized>(&mut self, world: &mut W, at: Vec2, radius: f32) -> BodyHandle {
        match self.ghost {
            Some(ghost) if world.contains(ghost) => ghost,
            _ => {
                let ghost = world.create_body(BodyDesc::phantom(at, radius));
                self.ghost = Some(ghost);
                ghost
            }
        }
    }

    fn run<W: PhysicsWorld + ?Sized>(&mut self, world: &mut W, budget: u32) -> Option<&Trajectory> {
        let (start, radius) = {
            let job = self.job.as_ref()?;
            (job.start, job.radius)
        };
        let ghost = self.ensure_ghost(world, start, radius);
        let (steps, dt, gravity) = (self.steps, self.time_step, self.gravity);
        let job = self.job.as_mut()?;

        let mut scope = ManualStepScope::enter(world);
        scope.track(ghost);

        let mut finished = None;
        for _ in 0..budget {
            scope.set_position(ghost, job.pos);
            job.points.push(TrajectorySample {
                pos: job.pos,
                tick: job.step,
            });

            job.vel += Vec2::NEG_Y * gravity * dt;
            job.pos += job.vel * dt;
            job.step += 1;

            let blocked = scope
                .overlap_circle(job.pos, job.radius)
                .into_iter()
                .any(|body| body != ghost)
                || scope.overlaps_container(job.pos, job.radius);

            if blocked {
                job.points.push(TrajectorySample {
                    pos: job.pos,
                    tick: job.step,
                });
                finished = Some((job.pos, true));
                break;
            }
            if job.step >= steps {
                let last = job.points.last().map_or(job.pos, |s| s.pos);
                finished = Some((last, false));
                break;
            }
        }
        drop(scope);

        let (landing, hit) = finished?;
        let job = self.job.take()?;
        self.latest = Some(Trajectory {
            points: job.points,
            landing,
            hit,
        });
        self.latest.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::physics::SimulationMode;
    use crate::sim::world::CircleWorld;

    fn setup() -> (TrajectoryPredictor, CircleWorld, Tuning) {
        let tuning = Tuning::default();
        (TrajectoryPredictor::new(&tuning), CircleWorld::from_tuning(&tuning), tuning)
    }

    /// Predictor that needs several batches per path
    fn batched() -> (TrajectoryPredictor, CircleWorld) {
        let tuning = Tuning {
            prediction_steps_per_tick: 10,
            ..Tuning::default()
        };
        (TrajectoryPredictor::new(&tuning), CircleWorld::from_tuning(&tuning))
    }

    #[test]
    fn test_lands_on_floor() {
        let (mut predictor, mut world, _tuning) = setup();
        let trajectory = predictor
            .predict(&mut world, Vec2::new(0.0, 5.0), 0.5)
            .expect("finished");
        assert!(trajectory.hit);
        assert!(trajectory.landing.y < 0.5);
        assert!(trajectory.landing.y > -1.0);
        assert!(trajectory.points.windows(2).all(|w| w[1].pos.y < w[0].pos.y));
        assert_eq!(trajectory.points[0].pos, Vec2::new(0.0, 5.0));
    }

    #[test]
    fn test_lands_on_fruit() {
        let (mut predictor, mut world, _tuning) = setup();
        world.create_body(BodyDesc::dynamic(Vec2::new(0.0, 3.0), 1.0));
        let trajectory = predictor
            .predict(&mut world, Vec2::new(0.0, 10.0), 0.5)
            .expect("finished");
        assert!(trajectory.hit);
        assert!(trajectory.landing.y < 4.5 && trajectory.landing.y > 3.0);
    }

    #[test]
    fn test_step_budget_truncates_at_last_sample() {
        let mut tuning = Tuning::default();
        tuning.prediction_steps = 5;
        let mut predictor = TrajectoryPredictor::new(&tuning);
        let mut world = CircleWorld::from_tuning(&tuning);

        let trajectory = predictor
            .predict(&mut world, Vec2::new(0.0, 100.0), 0.5)
            .expect("finished");
        assert!(!trajectory.hit);
        assert_eq!(trajectory.points.len(), 5);
        assert_eq!(trajectory.landing, trajectory.points[4].pos);
    }

    #[test]
    fn test_prediction_is_idempotent_and_leaves_world_untouched() {
        let (mut predictor, mut world, _tuning) = setup();
        let obstacle = world.create_body(BodyDesc::dynamic(Vec2::new(0.5, 2.0), 0.8));

        let first = predictor.predict(&mut world, Vec2::new(0.0, 12.0), 0.35).expect("finished");
        let second = predictor.predict(&mut world, Vec2::new(0.0, 12.0), 0.35).expect("finished");
        assert_eq!(first.landing, second.landing);
        assert_eq!(first, second);

        assert_eq!(world.simulation_mode(), SimulationMode::Auto);
        assert_eq!(world.position(obstacle), Some(Vec2::new(0.5, 2.0)));
        let ghost = predictor.ghost().expect("ghost");
        assert_eq!(world.position(ghost), Some(Vec2::new(0.0, 12.0)));
    }

    #[test]
    fn test_batched_prediction_spans_ticks() {
        let (mut predictor, mut world) = batched();
        predictor.request(Vec2::new(0.0, 14.0), 0.25);

        let mut batches = 0;
        while predictor.advance(&mut world).is_none() {
            batches += 1;
            // Live world is back in auto mode between batches
            assert_eq!(world.simulation_mode(), SimulationMode::Auto);
            assert!(batches < 10, "prediction never finished");
        }
        assert!(batches >= 1);
        assert!(!predictor.is_busy());
        assert!(predictor.latest().is_some_and(|t| t.hit));
    }

    #[test]
    fn test_new_request_supersedes_and_same_request_continues() {
        let (mut predictor, mut world) = batched();
        predictor.request(Vec2::new(0.0, 14.0), 0.25);
        predictor.advance(&mut world);
        let progressed = predictor.job.as_ref().map(|j| j.step);
        assert_eq!(progressed, Some(10));

        predictor.request(Vec2::new(0.0, 14.0), 0.25);
        assert_eq!(predictor.job.as_ref().map(|j| j.step), Some(10));

        predictor.request(Vec2::new(1.0, 14.0), 0.25);
        assert_eq!(predictor.job.as_ref().map(|j| j.step), Some(0));
    }

    #[test]
    fn test_default_batch_finishes_in_one_advance() {
        let (mut predictor, mut world, _tuning) = setup();
        predictor.request(Vec2::new(0.0, 14.0), 0.25);
        assert!(predictor.advance(&mut world).is_some_and(|t| t.hit));
    }

    #[test]
    fn test_hide_cancels_pending_work() {
        let (mut predictor, mut world) = batched();
        predictor.request(Vec2::new(0.0, 14.0), 0.25);
        predictor.advance(&mut world);
        predictor.hide();
        assert!(!predictor.is_busy());
        assert!(predictor.latest().is_none());
        assert!(predictor.advance(&mut world).is_none());
        assert_eq!(world.simulation_mode(), SimulationMode::Auto);
    }

    #[test]
    fn test_shutdown_removes_ghost() {
        let (mut predictor, mut world, _tuning) = setup();
        predictor.predict(&mut world, Vec2::new(0.0, 5.0), 0.5);
        assert_eq!(world.body_count(), 1);
        predictor.shutdown(&mut world);
        assert_eq!(world.body_count(), 0);
    }
}
