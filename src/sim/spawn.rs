//! Next-fruit selection
//!
//! Only the lowest tiers are ever spawned, so difficulty grows through
//! merging rather than through the spawn table.

use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;

use super::fruit::FruitLevel;

/// Weighted next-level source plus the queued preview level
#[derive(Debug, Clone)]
pub struct SpawnController {
    rng: Pcg32,
    weights: Vec<f32>,
    preview: FruitLevel,
}

impl SpawnController {
    pub fn new(seed: u64, weights: &[f32]) -> Self {
        let mut weights: Vec<f32> = weights.iter().map(|w| w.max(0.0)).collect();
        if weights.iter().sum::<f32>() <= 0.0 {
            log::warn!("Spawn table has no positive weight, spawning only the lowest level");
            weights = vec![1.0];
        }

        let mut controller = Self {
            rng: Pcg32::seed_from_u64(seed),
            weights,
            preview: FruitLevel::MIN,
        };
        controller.preview = controller.choose_next_level();
        controller
    }

    /// Sample a level from the spawn table
    pub fn choose_next_level(&mut self) -> FruitLevel {
        let total: f32 = self.weights.iter().sum();
        let roll = self.rng.random::<f32>() * total;

        let mut cumulative = 0.0;
        for (level, weight) in self.weights.iter().enumerate() {
            cumulative += weight;
            if roll < cumulative {
                return FruitLevel::new(level as i32);
            }
        }

        // Float round-off at the top end
        let last = self.weights.iter().rposition(|w| *w > 0.0).unwrap_or(0);
        FruitLevel::new(last as i32)
    }

    /// The level shown in the "next" slot
    pub fn preview(&self) -> FruitLevel {
        self.preview
    }

    /// Hand out the preview level and draw a fresh one
    pub fn advance_queue(&mut self) -> FruitLevel {
        let level = self.preview;
        self.preview = self.choose_next_level();
        level
    }

    /// Redraw the preview for a new session (the RNG stream continues)
    pub fn reset(&mut self) {
        self.preview = self.choose_next_level();
    }
}
