//! Timed-mode countdown

use crate::format_clock;

/// Remaining time at or below which the clock turns urgent
pub const URGENT_SECONDS: f32 = 30.0;

#[derive(Debug, Clone)]
pub struct SessionTimer {
    duration: f32,
    remaining: f32,
    /// Set once the expiry has been reported
    fired: bool,
}

impl SessionTimer {
    pub fn new(duration: f32) -> Self {
        let duration = duration.max(0.0);
        Self {
            duration,
            remaining: duration,
            fired: false,
        }
    }

    pub fn remaining(&self) -> f32 {
        self.remaining
    }

    pub fn is_expired(&self) -> bool {
        self.remaining <= 0.0
    }

    /// Count down. Returns `true` on the tick the timer runs out.
    ///
    /// A zero-length timer reports on its first tick.
    pub fn advance(&mut self, dt: f32) -> bool {
        if self.fired {
            return false;
        }
        self.remaining = (self.remaining - dt).max(0.0);
        self.fired = self.is_expired();
        self.fired
    }

    /// `MM:SS` text for the HUD
    pub fn text(&self) -> String {
        format_clock(self.remaining)
    }

    pub fn is_urgent(&self) -> bool {
        self.remaining <= URGENT_SECONDS
    }

    pub fn reset(&mut self) {
        self.remaining = self.duration;
        self.fired = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_countdown_expires_once() {
        let mut timer = SessionTimer::new(1.0);
        assert!(!timer.advance(0.6));
        assert!(timer.advance(0.6));
        assert!(!timer.advance(0.6));
        assert_eq!(timer.remaining(), 0.0);
    }

    #[test]
    fn test_zero_duration_fires_on_first_tick() {
        let mut timer = SessionTimer::new(0.0);
        assert!(timer.advance(1.0 / 120.0));
        assert!(!timer.advance(1.0 / 120.0));

        timer.reset();
        assert!(timer.advance(1.0 / 120.0));
    }

    #[test]
    fn test_text_and_urgency() {
        let mut timer = SessionTimer::new(120.0);
        assert_eq!(timer.text(), "02:00");
        assert!(!timer.is_urgent());
        timer.advance(90.0);
        assert_eq!(timer.text(), "00:30");
        assert!(timer.is_urgent());
        timer.reset();
        assert_eq!(timer.remaining(), 120.0);
    }
}
