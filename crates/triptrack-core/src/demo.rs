//! Demo Mode - Simulated wheel-sensor data
//!
//! Produces speed/distance reports for the in-memory backend so the dashboard
//! can be exercised without a vehicle. The simulated rider cruises around a
//! target speed with a slow wobble and stops now and then at a "traffic light".

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::telemetry::SensorReport;

/// Cruise speed the rider settles at (km/h)
const CRUISE_KMH: f64 = 28.0;
/// Acceleration/braking limit (km/h per second)
const SPEED_RATE: f64 = 6.0;

#[derive(Debug, Clone, Copy, PartialEq)]
enum RideState {
    Cruising,
    Stopping { until_ms: u64 },
}

/// Wheel-sensor simulator
#[derive(Debug)]
pub struct SensorSimulator {
    last_update_ms: Option<u64>,
    next_stop_at_ms: u64,
    state: RideState,
    speed: f64,
    distance_km: f64,
    rng: StdRng,
}

impl Default for SensorSimulator {
    fn default() -> Self {
        Self::new()
    }
}

impl SensorSimulator {
    /// Create a simulator with a random seed
    pub fn new() -> Self {
        Self::with_rng(StdRng::from_entropy())
    }

    /// Create a reproducible simulator
    pub fn seeded(seed: u64) -> Self {
        Self::with_rng(StdRng::seed_from_u64(seed))
    }

    fn with_rng(mut rng: StdRng) -> Self {
        let first_stop = rng.gen_range(30_000..60_000);
        Self {
            last_update_ms: None,
            next_stop_at_ms: first_stop,
            state: RideState::Cruising,
            speed: 0.0,
            distance_km: 0.0,
            rng,
        }
    }

    /// Advance to `elapsed_ms` since the start and return the sensor reading
    pub fn update(&mut self, elapsed_ms: u64) -> SensorReport {
        let delta_ms = match self.last_update_ms {
            Some(last) => elapsed_ms.saturating_sub(last),
            None => 0,
        };
        self.last_update_ms = Some(elapsed_ms);
        let dt = delta_ms as f64 / 1000.0;

        self.update_state(elapsed_ms);

        let t = elapsed_ms as f64 / 1000.0;
        let target = match self.state {
            RideState::Cruising => CRUISE_KMH + 4.0 * (t * 0.2).sin() + 1.5 * (t * 1.3).sin(),
            RideState::Stopping { .. } => 0.0,
        };

        let max_change = SPEED_RATE * dt;
        self.speed = (self.speed + (target - self.speed).clamp(-max_change, max_change)).max(0.0);
        self.distance_km += self.speed * dt / 3600.0;

        SensorReport {
            speed: Some(self.speed),
            distance: Some(self.distance_km),
        }
    }

    fn update_state(&mut self, now_ms: u64) {
        match self.state {
            RideState::Cruising if now_ms >= self.next_stop_at_ms => {
                let wait = self.rng.gen_range(8_000..20_000);
                self.state = RideState::Stopping {
                    until_ms: now_ms + wait,
                };
                tracing::debug!("Demo rider stopping for {} ms", wait);
            }
            RideState::Stopping { until_ms } if now_ms >= until_ms => {
                self.state = RideState::Cruising;
                self.next_stop_at_ms = now_ms + self.rng.gen_range(45_000..120_000);
            }
            _ => {}
        }
    }

    /// Current speed (km/h)
    pub fn speed(&self) -> f64 {
        self.speed
    }

    /// Distance covered so far (km)
    pub fn distance_km(&self) -> f64 {
        self.distance_km
    }
}
