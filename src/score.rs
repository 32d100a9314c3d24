//! Score and high score bookkeeping
//!
//! The high score is persisted by the session when it is exceeded; this type
//! only tracks the numbers.

use serde::{Deserialize, Serialize};

/// Result of adding points
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScoreChange {
    pub score: u64,
    /// Set when this addition raised the high score
    pub new_high: Option<u64>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreState {
    pub current: u64,
    pub high: u64,
}

impl ScoreState {
    /// Start a session with a previously saved high score
    pub fn with_high(high: u64) -> Self {
        Self { current: 0, high }
    }

    /// Add points; the high score follows when exceeded
    pub fn add(&mut self, points: u64) -> ScoreChange {
        self.current = self.current.saturating_add(points);
        let new_high = if self.current > self.high {
            self.high = self.current;
            Some(self.high)
        } else {
            None
        };
        ScoreChange {
            score: self.current,
            new_high,
        }
    }

    /// Zero the session score, keeping the high score
    pub fn reset_current(&mut self) {
        self.current = 0;
    }
}
