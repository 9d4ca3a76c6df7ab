//! Max speed high-water mark

use serde::{Deserialize, Serialize};

/// Highest speed observed since the last reset
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct MaxSpeedTracker {
    max: f64,
}

impl MaxSpeedTracker {
    /// Create a tracker at zero
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold a speed into the mark, returning true if it rose
    pub fn observe(&mut self, speed: f64) -> bool {
        // NaN compares false, so it never raises the mark
        if speed > self.max {
            self.max = speed;
            true
        } else {
            false
        }
    }

    /// Current maximum
    pub fn value(&self) -> f64 {
        self.max
    }

    /// Back to zero
    pub fn reset(&mut self) {
        self.max = 0.0;
    }
}
