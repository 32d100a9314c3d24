//! Fruit Drop - a fruit-merging drop puzzle
//!
//! Core modules:
//! - `sim`: Deterministic simulation (fruit, merging, dropping, prediction)
//! - `game`: Session manager wiring the simulation to its collaborators
//! - `persistence`: Key-value storage for high score and settings
//! - `tuning`: Data-driven game balance
//! - `audio` / `ui`: Presentation collaborators

pub mod audio;
pub mod game;
pub mod persistence;
pub mod score;
pub mod settings;
pub mod sim;
pub mod tuning;
pub mod ui;

pub use game::{Game, SessionAction};
pub use score::ScoreState;
pub use settings::Settings;
pub use tuning::Tuning;

/// Game configuration constants
pub mod consts {
    /// Fixed simulation timestep (120 Hz for smooth physics)
    pub const SIM_DT: f32 = 1.0 / 120.0;
    /// Maximum substeps per frame to prevent spiral of death
    pub const MAX_SUBSTEPS: u32 = 8;
    /// Longest frame the accumulator will accept
    pub const MAX_FRAME_DT: f32 = 0.1;

    /// Highest fruit level (Watermelon). Eleven tiers, zero-indexed.
    pub const MAX_LEVEL: u8 = 10;
    /// Number of fruit tiers
    pub const FRUIT_TIERS: usize = MAX_LEVEL as usize + 1;

    /// Distance below which two circles count as touching
    pub const CONTACT_SLOP: f32 = 0.01;
}

/// Format whole seconds as `MM:SS`
pub fn format_clock(seconds: f32) -> String {
    let total = seconds.max(0.0).floor() as u32;
    format!("{:02}:{:02}", total / 60, total % 60)
}
