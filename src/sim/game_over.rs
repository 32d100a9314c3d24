//! Overflow detection
//!
//! A fruit poking above the boundary arms a check. The run only ends if some
//! fruit is still above the line once the grace period has passed.

use super::fruit::Fruit;
use crate::tuning::Tuning;

#[derive(Debug, Clone)]
pub struct GameOverMonitor {
    boundary_y: f32,
    grace: f64,
    check_at: Option<f64>,
    triggered: bool,
}

impl GameOverMonitor {
    pub fn new(tuning: &Tuning) -> Self {
        Self {
            boundary_y: tuning.boundary_y,
            grace: tuning.game_over_grace as f64,
            check_at: None,
            triggered: false,
        }
    }

    /// Whether a deferred check is armed
    pub fn is_pending(&self) -> bool {
        self.check_at.is_some()
    }

    pub fn is_triggered(&self) -> bool {
        self.triggered
    }

    fn any_over<'a>(&self, mut fruits: impl Iterator<Item = &'a Fruit>) -> bool {
        fruits.any(|f| f.pos.y > self.boundary_y)
    }

    /// Look at the live (released) fruit for this tick
    ///
    /// Returns `true` exactly once, on the tick the overflow is confirmed.
    pub fn observe(&mut self, fruits: &[Fruit], clock: f64) -> bool {
        if self.triggered {
            return false;
        }

        match self.check_at {
            Some(at) if clock >= at => {
                self.check_at = None;
                if self.any_over(fruits.iter()) {
                    self.triggered = true;
                    return true;
                }
            }
            Some(_) => {}
            None => {
                if self.any_over(fruits.iter()) {
                    self.check_at = Some(clock + self.grace);
                }
            }
        }
        false
    }

    pub fn reset(&mut self) {
        self.check_at = None;
        self.triggered = false;
    }
}
