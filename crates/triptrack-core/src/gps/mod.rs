//! GPS Reporting
//!
//! Acquires the device's own position and reports it to the backend.
//!
//! The lifecycle lives in [`GpsReporter`], a pure state machine fed with
//! provider events. Providers implement [`Geolocation`], which mirrors the
//! browser API: a one-shot current-position request plus a continuous watch.

mod machine;
mod provider;
mod simulated;

pub use machine::{GpsAction, GpsEnvironment, GpsEvent, GpsReporter};
pub use provider::{Geolocation, PositionOptions, WatchSubscription};
pub use simulated::{SimulatedGeolocation, SimulatedRoute};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use crate::telemetry::{Coordinates, LocationReport};

/// W3C code for a refused permission
pub const PERMISSION_DENIED: u16 = 1;
/// W3C code for an indeterminate position
pub const POSITION_UNAVAILABLE: u16 = 2;
/// W3C code for an expired request
pub const TIMEOUT: u16 = 3;

/// Lifecycle of the local geolocation subscription
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GpsStatus {
    /// Not started yet
    Idle,
    /// Waiting for the first fix
    Acquiring,
    /// Receiving fixes
    Locked,
    /// Permission refused; terminal
    Denied,
    /// Position could not be determined; the watch stays open
    Unavailable,
    /// A request expired; the watch stays open
    Timeout,
    /// No geolocation capability; terminal
    Unsupported,
    /// Not a secure context (advisory)
    Insecure,
    /// Unclassified provider failure
    Error,
}

impl GpsStatus {
    /// Label shown in the GPS status field
    pub fn as_str(&self) -> &'static str {
        match self {
            GpsStatus::Idle => "WAITING",
            GpsStatus::Acquiring => "ACQUIRING",
            GpsStatus::Locked => "LOCKED",
            GpsStatus::Denied => "DENIED",
            GpsStatus::Unavailable => "UNAVAILABLE",
            GpsStatus::Timeout => "TIMEOUT",
            GpsStatus::Unsupported => "NOT SUPPORTED",
            GpsStatus::Insecure => "INSECURE",
            GpsStatus::Error => "ERROR",
        }
    }

    /// States after which no further fixes are expected
    pub fn is_terminal(&self) -> bool {
        matches!(self, GpsStatus::Denied | GpsStatus::Unsupported)
    }
}

impl fmt::Display for GpsStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classification of a provider failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PositionErrorKind {
    /// The user or platform refused access
    PermissionDenied,
    /// No position could be determined
    PositionUnavailable,
    /// The request did not complete in time
    Timeout,
    /// Any other provider code
    Unknown(u16),
}

impl PositionErrorKind {
    /// Map a W3C-style numeric code
    pub fn from_code(code: u16) -> Self {
        match code {
            PERMISSION_DENIED => PositionErrorKind::PermissionDenied,
            POSITION_UNAVAILABLE => PositionErrorKind::PositionUnavailable,
            TIMEOUT => PositionErrorKind::Timeout,
            other => PositionErrorKind::Unknown(other),
        }
    }

    /// Status this failure puts the reporter in
    pub fn status(&self) -> GpsStatus {
        match self {
            PositionErrorKind::PermissionDenied => GpsStatus::Denied,
            PositionErrorKind::PositionUnavailable => GpsStatus::Unavailable,
            PositionErrorKind::Timeout => GpsStatus::Timeout,
            PositionErrorKind::Unknown(_) => GpsStatus::Error,
        }
    }
}

/// A failed position request
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("geolocation error {code}: {message}")]
pub struct PositionError {
    /// Provider code
    pub code: u16,
    /// Provider message
    pub message: String,
}

impl PositionError {
    /// Create an error from a raw provider code
    pub fn new(code: u16, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    /// Permission refused
    pub fn permission_denied() -> Self {
        Self::new(PERMISSION_DENIED, "User denied Geolocation")
    }

    /// Position indeterminate
    pub fn position_unavailable() -> Self {
        Self::new(POSITION_UNAVAILABLE, "Position unavailable")
    }

    /// Request expired
    pub fn timeout() -> Self {
        Self::new(TIMEOUT, "Timeout expired")
    }

    /// Classify the code
    pub fn kind(&self) -> PositionErrorKind {
        PositionErrorKind::from_code(self.code)
    }
}

/// A successful fix
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Position {
    /// Latitude in degrees
    pub latitude: f64,
    /// Longitude in degrees
    pub longitude: f64,
    /// Accuracy radius in metres, if known
    pub accuracy: Option<f64>,
    /// When the fix was taken
    pub timestamp: DateTime<Utc>,
}

impl Position {
    /// Create a fix taken now
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
            accuracy: None,
            timestamp: Utc::now(),
        }
    }

    /// Coordinate pair of the fix
    pub fn coordinates(&self) -> Coordinates {
        Coordinates {
            latitude: self.latitude,
            longitude: self.longitude,
        }
    }

    /// Backend payload for the fix
    pub fn report(&self) -> LocationReport {
        LocationReport {
            latitude: self.latitude,
            longitude: self.longitude,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code_mapping() {
        assert_eq!(PositionError::new(1, "").kind().status(), GpsStatus::Denied);
        assert_eq!(PositionError::new(2, "").kind().status(), GpsStatus::Unavailable);
        assert_eq!(PositionError::new(3, "").kind().status(), GpsStatus::Timeout);
        assert_eq!(PositionError::new(0, "").kind().status(), GpsStatus::Error);
        assert_eq!(PositionError::new(42, "").kind(), PositionErrorKind::Unknown(42));
    }

    #[test]
    fn test_terminal_states() {
        assert!(GpsStatus::Denied.is_terminal());
        assert!(GpsStatus::Unsupported.is_terminal());
        assert!(!GpsStatus::Unavailable.is_terminal());
        assert!(!GpsStatus::Timeout.is_terminal());
        assert!(!GpsStatus::Insecure.is_terminal());
    }

    #[test]
    fn test_report_carries_exact_coordinates() {
        let pos = Position::new(51.507_351_2, -0.127_758_3);
        let report = pos.report();
        assert_eq!(report.latitude, 51.507_351_2);
        assert_eq!(report.longitude, -0.127_758_3);
    }
}
