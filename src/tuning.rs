//! Data-driven game balance
//!
//! Every number that shapes how the game plays lives here so it can be
//! overridden from a JSON file without recompiling. Missing fields fall back
//! to the defaults below.

use serde::{Deserialize, Serialize};

use crate::consts::{FRUIT_TIERS, MAX_LEVEL};
use crate::sim::FruitLevel;

/// Balance constants for a session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Tuning {
    // === Play field ===
    /// Container width (centered on x = 0)
    pub play_width: f32,
    /// Container height, floor at y = 0
    pub play_height: f32,
    /// Height the held fruit hangs at
    pub drop_height: f32,
    /// Inset from the side walls for the drop zone
    pub drop_margin: f32,
    /// Fruit centers above this line count as overflowing
    pub boundary_y: f32,

    // === Physics ===
    /// Downward acceleration (units/s²)
    pub gravity: f32,
    /// Bounce factor for fruit/fruit and fruit/wall contacts
    pub restitution: f32,
    /// Radius per level, Cherry first
    pub fruit_radii: [f32; FRUIT_TIERS],

    // === Scoring & spawning ===
    pub score_per_merge: u64,
    /// Relative weights for the lowest levels, index = level
    pub spawn_weights: Vec<f32>,

    // === Merging ===
    /// Settle delay before a slow fruit scans for partners (seconds)
    pub merge_check_delay: f32,
    /// Fruits faster than this are not considered settled
    pub merge_speed_threshold: f32,
    /// Broad scan radius as a multiple of the fruit radius
    pub merge_scan_factor: f32,
    /// Confirm distance as a multiple of the fruit radius
    pub merge_confirm_factor: f32,
    /// Lockout after a fruit is created by promotion (seconds)
    pub merge_cooldown: f32,

    // === Session timing ===
    /// Gap between a drop and the next held fruit (seconds)
    pub respawn_delay: f32,
    /// How long an overflow must persist to end the run (seconds)
    pub game_over_grace: f32,

    // === Trajectory prediction ===
    pub prediction_steps: u32,
    pub prediction_time_step: f32,
    /// Prediction steps run per tick before yielding
    ///
    /// Below `prediction_steps` a path can take several ticks, and a pointer
    /// that moves every tick keeps restarting it.
    pub prediction_steps_per_tick: u32,
}

impl Default for Tuning {
    fn default() -> Self {
        Self {
            play_width: 10.0,
            play_height: 15.0,
            drop_height: 14.0,
            drop_margin: 1.0,
            boundary_y: 14.0,

            gravity: 9.8,
            restitution: 0.2,
            fruit_radii: [
                0.25, 0.35, 0.45, 0.55, 0.68, 0.82, 0.96, 1.1, 1.25, 1.42, 1.6,
            ],

            score_per_merge: 100,
            spawn_weights: vec![0.5, 0.3, 0.15, 0.05],

            merge_check_delay: 0.1,
            merge_speed_threshold: 0.5,
            merge_scan_factor: 2.1,
            merge_confirm_factor: 1.8,
            merge_cooldown: 0.5,

            respawn_delay: 0.5,
            game_over_grace: 1.5,

            prediction_steps: 60,
            prediction_time_step: 0.05,
            prediction_steps_per_tick: 60,
        }
    }
}

impl Tuning {
    /// Parse tuning overrides from JSON
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Parse tuning overrides, falling back to defaults on bad input
    pub fn load_or_default(json: Option<&str>) -> Self {
        let Some(json) = json else {
            return Self::default();
        };
        match Self::from_json(json) {
            Ok(tuning) => {
                log::info!("Loaded tuning overrides");
                tuning
            }
            Err(err) => {
                log::warn!("Invalid tuning JSON ({}), using defaults", err);
                Self::default()
            }
        }
    }

    /// Radius for a fruit level
    pub fn radius_for(&self, level: FruitLevel) -> f32 {
        self.fruit_radii[level.index()]
    }

    /// Half of the container width
    #[inline]
    pub fn half_width(&self) -> f32 {
        self.play_width / 2.0
    }

    /// Horizontal range the held fruit may occupy
    pub fn drop_range(&self) -> (f32, f32) {
        let half = (self.half_width() - self.drop_margin).max(0.0);
        (-half, half)
    }

    /// Score awarded for merging two fruits of `level`
    pub fn merge_points(&self, level: FruitLevel) -> u64 {
        self.score_per_merge * (level.get() as u64 + 1)
    }

    /// Spawn weights limited to valid levels
    pub fn spawn_table(&self) -> &[f32] {
        let len = self.spawn_weights.len().min(MAX_LEVEL as usize + 1);
        &self.spawn_weights[..len]
    }
}
