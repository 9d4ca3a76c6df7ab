//! Dashboard State
//!
//! Turns raw telemetry snapshots into display-ready values.

mod compute;
mod tracker;

pub use compute::{dash_offset, format_elapsed, gauge_fraction, DashboardComputer};
pub use tracker::MaxSpeedTracker;

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::telemetry::{Coordinates, PathPoint};

/// Age reported when a snapshot carries no timestamp
pub const MISSING_TIMESTAMP_AGE_SECS: f64 = 999.0;

/// Backend liveness as seen by the dashboard
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ConnectionStatus {
    /// Snapshot is fresh
    Online,
    /// Snapshot is stale or carries no timestamp
    Offline,
    /// The status could not be fetched or decoded
    Error,
}

impl ConnectionStatus {
    /// Label shown in the status field
    pub fn as_str(&self) -> &'static str {
        match self {
            ConnectionStatus::Online => "ONLINE",
            ConnectionStatus::Offline => "OFFLINE",
            ConnectionStatus::Error => "ERROR",
        }
    }

    /// Whether the "online" visual class applies
    pub fn is_online(&self) -> bool {
        matches!(self, ConnectionStatus::Online)
    }
}

impl fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where the map camera should look
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CameraFocus {
    /// Focus point
    pub center: Coordinates,
    /// Map zoom level
    pub zoom: u8,
}

/// Display-ready values derived from one snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DashboardState {
    /// Current speed in km/h
    pub speed: f64,
    /// Gauge fill, 0..=1
    pub gauge_fraction: f64,
    /// Trip distance in km
    pub distance: f64,
    /// Highest speed seen since the last reset
    pub max_speed: f64,
    /// Elapsed trip time as `HH:MM:SS`
    pub elapsed: String,
    /// Backend liveness
    pub connection: ConnectionStatus,
    /// Current position, when the backend has a fix
    pub position: Option<Coordinates>,
    /// Replacement path; `None` keeps whatever is drawn
    pub path: Option<Vec<PathPoint>>,
    /// Auto-follow hint
    pub camera: Option<CameraFocus>,
}
