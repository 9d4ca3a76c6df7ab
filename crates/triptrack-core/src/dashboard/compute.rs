//! Dashboard state computer
//!
//! Pure derivation from a status response to a [`DashboardState`]. The only
//! state it touches is the caller's [`MaxSpeedTracker`].

use chrono::{DateTime, Utc};

use super::{
    CameraFocus, ConnectionStatus, DashboardState, MaxSpeedTracker, MISSING_TIMESTAMP_AGE_SECS,
};
use crate::config::DashboardConfig;
use crate::telemetry::{Coordinates, StatusResponse, TelemetrySnapshot};

/// Saturating gauge fill for a speed
///
/// `min(speed / max_gauge, 1)`, with negative, NaN or degenerate inputs
/// mapped to an empty gauge.
pub fn gauge_fraction(speed: f64, max_gauge: f64) -> f64 {
    if !(max_gauge > 0.0) || speed.is_nan() {
        return 0.0;
    }
    (speed / max_gauge).clamp(0.0, 1.0)
}

/// Stroke offset for a ring of `arc_length` filled to `fraction`
pub fn dash_offset(fraction: f64, arc_length: f64) -> f64 {
    arc_length * (1.0 - fraction.clamp(0.0, 1.0))
}

/// Format whole seconds as `HH:MM:SS`; hours are not wrapped at 24.
pub fn format_elapsed(total_secs: u64) -> String {
    let h = total_secs / 3600;
    let m = (total_secs % 3600) / 60;
    let s = total_secs % 60;
    format!("{:02}:{:02}:{:02}", h, m, s)
}

/// Derives dashboard state from backend snapshots
#[derive(Debug, Clone, Default)]
pub struct DashboardComputer {
    config: DashboardConfig,
}

impl DashboardComputer {
    /// Create a computer with the given settings
    pub fn new(config: DashboardConfig) -> Self {
        Self { config }
    }

    /// Settings in use
    pub fn config(&self) -> &DashboardConfig {
        &self.config
    }

    /// Derive the display state for one status response
    ///
    /// Folds the snapshot speed into `max_speed` before reading it back, so
    /// the returned `max_speed` already includes this snapshot.
    pub fn compute(
        &self,
        status: &StatusResponse,
        now: DateTime<Utc>,
        max_speed: &mut MaxSpeedTracker,
    ) -> DashboardState {
        let current = &status.current;
        let speed = current.speed;

        max_speed.observe(speed);

        let connection = self.connection_status(current, now);

        let path = if status.path.is_empty() {
            None
        } else {
            Some(status.path.clone())
        };

        let camera = match (connection, status.path.last()) {
            (ConnectionStatus::Online, Some(last)) => Some(CameraFocus {
                center: Coordinates::from(*last),
                zoom: self.config.follow_zoom,
            }),
            _ => None,
        };

        DashboardState {
            speed,
            gauge_fraction: gauge_fraction(speed, self.config.max_speed_gauge),
            distance: current.distance,
            max_speed: max_speed.value(),
            elapsed: elapsed_since(current.trip_start_time, now),
            connection,
            position: position_of(current),
            path,
            camera,
        }
    }

    /// Seconds since the snapshot's server timestamp, or the missing sentinel
    pub fn snapshot_age(&self, snapshot: &TelemetrySnapshot, now: DateTime<Utc>) -> f64 {
        match snapshot.timestamp {
            Some(ts) => (now - ts).num_milliseconds() as f64 / 1000.0,
            None => MISSING_TIMESTAMP_AGE_SECS,
        }
    }

    /// `Online` iff the snapshot has a timestamp younger than the threshold
    pub fn connection_status(
        &self,
        snapshot: &TelemetrySnapshot,
        now: DateTime<Utc>,
    ) -> ConnectionStatus {
        let age = self.snapshot_age(snapshot, now);
        if snapshot.timestamp.is_some() && age < self.config.stale_threshold_secs {
            ConnectionStatus::Online
        } else {
            ConnectionStatus::Offline
        }
    }
}

fn elapsed_since(start: Option<DateTime<Utc>>, now: DateTime<Utc>) -> String {
    let Some(start) = start else {
        return format_elapsed(0);
    };
    // Clock skew can put the start in the future
    let millis = (now - start).num_milliseconds().max(0);
    format_elapsed((millis / 1000) as u64)
}

/// The stock backend reports 0.0/0.0 until the first fix arrives
fn position_of(snapshot: &TelemetrySnapshot) -> Option<Coordinates> {
    match (snapshot.latitude, snapshot.longitude) {
        (Some(lat), Some(lng)) if lat != 0.0 && lng != 0.0 => Some(Coordinates {
            latitude: lat,
            longitude: lng,
        }),
        _ => None,
    }
}
