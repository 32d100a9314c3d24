//! HUD and menu collaborators
//!
//! The session pushes score, timer and game-over changes through [`GameUi`];
//! buttons come back as [`UiEvent`]s.

use glam::Vec2;

use crate::sim::FruitLevel;

/// Size of the burst shown when two fruits merge
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeEffect {
    Small,
    Medium,
    Big,
}

impl MergeEffect {
    /// Effect for merging two fruits of `level`
    pub fn for_level(level: FruitLevel) -> Self {
        match level.get() {
            0..4 => MergeEffect::Small,
            4..8 => MergeEffect::Medium,
            _ => MergeEffect::Big,
        }
    }
}

/// Player input from the HUD
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UiEvent {
    Restart,
    ReturnToMenu,
}

/// What the HUD can display
pub trait GameUi {
    fn update_score(&mut self, score: u64);
    fn update_high_score(&mut self, high: u64);
    fn show_game_over(&mut self, final_score: u64);
    fn hide_game_over(&mut self);
    /// Remaining time as `MM:SS`; `urgent` near the end
    fn update_timer(&mut self, text: &str, urgent: bool);
    fn show_merge_effect(&mut self, pos: Vec2, effect: MergeEffect);
}

/// HUD that writes to the log, for headless runs
#[derive(Debug, Default)]
pub struct LogUi {
    last_timer: String,
}

impl GameUi for LogUi {
    fn update_score(&mut self, score: u64) {
        log::debug!("Score: {}", score);
    }

    fn update_high_score(&mut self, high: u64) {
        log::info!("High score: {}", high);
    }

    fn show_game_over(&mut self, final_score: u64) {
        log::info!("GAME OVER - final score {}", final_score);
    }

    fn hide_game_over(&mut self) {}

    fn update_timer(&mut self, text: &str, urgent: bool) {
        // Only log when the displayed second changes
        if text != self.last_timer {
            if urgent {
                log::info!("Time: {} !", text);
            } else {
                log::debug!("Time: {}", text);
            }
            self.last_timer = text.to_string();
        }
    }

    fn show_merge_effect(&mut self, pos: Vec2, effect: MergeEffect) {
        log::debug!("{:?} merge burst at ({:.2}, {:.2})", effect, pos.x, pos.y);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_merge_effect_tiers() {
        assert_eq!(MergeEffect::for_level(FruitLevel::new(0)), MergeEffect::Small);
        assert_eq!(MergeEffect::for_level(FruitLevel::new(3)), MergeEffect::Small);
        assert_eq!(MergeEffect::for_level(FruitLevel::new(4)), MergeEffect::Medium);
        assert_eq!(MergeEffect::for_level(FruitLevel::new(7)), MergeEffect::Medium);
        assert_eq!(MergeEffect::for_level(FruitLevel::new(8)), MergeEffect::Big);
        assert_eq!(MergeEffect::for_level(FruitLevel::MAX), MergeEffect::Big);
    }
}
