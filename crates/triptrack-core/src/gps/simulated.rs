//! Simulated geolocation
//!
//! Drives a vehicle around a circular route for demos and tests without a
//! real GPS receiver. Errors can be queued to exercise failure handling.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::Instant;

use super::{Geolocation, Position, PositionError, PositionOptions, WatchSubscription};
use crate::telemetry::Coordinates;

/// Metres per degree of latitude (spherical approximation)
const METRES_PER_DEGREE: f64 = 111_320.0;

/// Shape of the simulated drive
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulatedRoute {
    /// Centre of the loop
    pub center: Coordinates,
    /// Loop radius in metres
    pub radius_m: f64,
    /// Constant ground speed in km/h
    pub speed_kmh: f64,
    /// Random noise added to each fix, in metres
    pub jitter_m: f64,
    /// Interval between watch callbacks
    pub update_interval_ms: u64,
    /// Fixed RNG seed for reproducible runs
    pub seed: Option<u64>,
}

impl Default for SimulatedRoute {
    fn default() -> Self {
        Self {
            // Tempelhofer Feld, Berlin
            center: Coordinates {
                latitude: 52.4731,
                longitude: 13.4015,
            },
            radius_m: 800.0,
            speed_kmh: 36.0,
            jitter_m: 3.0,
            update_interval_ms: 1000,
            seed: None,
        }
    }
}

impl SimulatedRoute {
    /// Noise-free position after `elapsed` of driving
    pub fn position_at(&self, elapsed: Duration) -> Coordinates {
        let travelled_m = self.speed_kmh / 3.6 * elapsed.as_secs_f64();
        let theta = if self.radius_m > 0.0 {
            travelled_m / self.radius_m
        } else {
            0.0
        };

        let north_m = self.radius_m * theta.cos();
        let east_m = self.radius_m * theta.sin();
        offset(self.center, north_m, east_m)
    }
}

fn offset(origin: Coordinates, north_m: f64, east_m: f64) -> Coordinates {
    let lat = origin.latitude + north_m / METRES_PER_DEGREE;
    let lng_scale = METRES_PER_DEGREE * origin.latitude.to_radians().cos().max(1e-6);
    Coordinates {
        latitude: lat,
        longitude: origin.longitude + east_m / lng_scale,
    }
}

struct Inner {
    route: SimulatedRoute,
    started: Instant,
    rng: Mutex<StdRng>,
    pending_errors: Mutex<VecDeque<PositionError>>,
}

/// Geolocation provider that follows a [`SimulatedRoute`]
#[derive(Clone)]
pub struct SimulatedGeolocation {
    inner: Arc<Inner>,
}

impl SimulatedGeolocation {
    /// Start driving the route now
    pub fn new(route: SimulatedRoute) -> Self {
        let rng = match route.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            inner: Arc::new(Inner {
                route,
                started: Instant::now(),
                rng: Mutex::new(rng),
                pending_errors: Mutex::new(VecDeque::new()),
            }),
        }
    }

    /// Route being driven
    pub fn route(&self) -> &SimulatedRoute {
        &self.inner.route
    }

    /// Make the next request or watch callback fail with `error`
    ///
    /// Queued errors are delivered in order before fixes resume.
    pub fn queue_error(&self, error: PositionError) {
        if let Ok(mut queue) = self.inner.pending_errors.lock() {
            queue.push_back(error);
        }
    }

    fn next_reading(&self) -> Result<Position, PositionError> {
        if let Some(err) = self
            .inner
            .pending_errors
            .lock()
            .ok()
            .and_then(|mut q| q.pop_front())
        {
            return Err(err);
        }

        let route = &self.inner.route;
        let exact = route.position_at(self.inner.started.elapsed());

        let (north, east) = if route.jitter_m > 0.0 {
            match self.inner.rng.lock() {
                Ok(mut rng) => (
                    rng.gen_range(-route.jitter_m..=route.jitter_m),
                    rng.gen_range(-route.jitter_m..=route.jitter_m),
                ),
                Err(_) => (0.0, 0.0),
            }
        } else {
            (0.0, 0.0)
        };
        let fix = offset(exact, north, east);

        Ok(Position {
            latitude: fix.latitude,
            longitude: fix.longitude,
            accuracy: Some(route.jitter_m.max(1.0)),
            timestamp: chrono::Utc::now(),
        })
    }
}

impl Geolocation for SimulatedGeolocation {
    async fn current_position(&self, _options: PositionOptions) -> Result<Position, PositionError> {
        self.next_reading()
    }

    fn watch_position(&self, options: PositionOptions) -> WatchSubscription {
        let (subscription, tx, cancel) = WatchSubscription::channel(16);
        let provider = self.clone();
        let period = Duration::from_millis(provider.inner.route.update_interval_ms.max(1));

        tracing::debug!(
            "Simulated watch opened (every {:?}, max age {:?})",
            period,
            options.maximum_age()
        );

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = ticker.tick() => {
                        if tx.send(provider.next_reading()).await.is_err() {
                            break;
                        }
                    }
                }
            }
            tracing::debug!("Simulated watch closed");
        });

        subscription
    }
}
