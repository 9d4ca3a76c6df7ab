//! Telemetry wire types
//!
//! Shapes of the JSON exchanged with the trip backend. Timestamps accept both
//! RFC 3339 strings and the offset-less ISO strings the stock backend emits.

use chrono::{DateTime, Local, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// One server-reported telemetry reading
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TelemetrySnapshot {
    /// Current speed in km/h
    #[serde(default, deserialize_with = "lenient_f64")]
    pub speed: f64,

    /// Cumulative trip distance in km
    #[serde(default, deserialize_with = "lenient_f64")]
    pub distance: f64,

    /// When the current trip started
    #[serde(default, deserialize_with = "timestamp::deserialize")]
    pub trip_start_time: Option<DateTime<Utc>>,

    /// Last reported latitude in degrees
    #[serde(default)]
    pub latitude: Option<f64>,

    /// Last reported longitude in degrees
    #[serde(default)]
    pub longitude: Option<f64>,

    /// Time of the last server-side update
    #[serde(default, deserialize_with = "timestamp::deserialize")]
    pub timestamp: Option<DateTime<Utc>>,

    /// Whether the backend considers the vehicle moving
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_moving: Option<bool>,
}

/// A point on the trip path
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PathPoint {
    /// Latitude in degrees
    pub lat: f64,

    /// Longitude in degrees
    pub lng: f64,

    /// Speed when the point was recorded, if the backend kept it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub speed: Option<f64>,

    /// When the point was recorded
    #[serde(
        default,
        deserialize_with = "timestamp::deserialize",
        skip_serializing_if = "Option::is_none"
    )]
    pub time: Option<DateTime<Utc>>,
}

impl PathPoint {
    /// Create a bare coordinate point
    pub fn new(lat: f64, lng: f64) -> Self {
        Self {
            lat,
            lng,
            speed: None,
            time: None,
        }
    }
}

/// Body of `GET /api/status`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StatusResponse {
    /// Latest snapshot
    #[serde(default)]
    pub current: TelemetrySnapshot,

    /// Full trip path, oldest first
    #[serde(default, deserialize_with = "null_as_empty")]
    pub path: Vec<PathPoint>,
}

/// Body of `POST /api/location`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LocationReport {
    /// Latitude in degrees
    pub latitude: f64,
    /// Longitude in degrees
    pub longitude: f64,
}

/// Body of `POST /api/data` (speed/distance producer)
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SensorReport {
    /// Speed in km/h
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub speed: Option<f64>,
    /// Cumulative distance in km
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub distance: Option<f64>,
}

/// A geographic coordinate pair
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    /// Latitude in degrees
    pub latitude: f64,
    /// Longitude in degrees
    pub longitude: f64,
}

impl From<PathPoint> for Coordinates {
    fn from(p: PathPoint) -> Self {
        Self {
            latitude: p.lat,
            longitude: p.lng,
        }
    }
}

impl From<Coordinates> for LocationReport {
    fn from(c: Coordinates) -> Self {
        Self {
            latitude: c.latitude,
            longitude: c.longitude,
        }
    }
}

/// Numbers may arrive as `null`; treat that as zero.
fn lenient_f64<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<f64>::deserialize(deserializer)?;
    Ok(value.filter(|v| v.is_finite()).unwrap_or(0.0))
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<Vec<PathPoint>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Vec<PathPoint>>::deserialize(deserializer)?.unwrap_or_default())
}

/// Timestamp parsing shared by the wire types
pub mod timestamp {
    use super::*;

    /// Deserialize an optional timestamp; anything unparseable becomes `None`.
    ///
    /// Strings go through [`parse`]. Numbers are epoch milliseconds, the way a
    /// JavaScript `Date` reads them.
    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = serde_json::Value::deserialize(deserializer)?;
        Ok(match raw {
            serde_json::Value::String(s) => parse(&s),
            serde_json::Value::Number(n) => n.as_f64().and_then(from_epoch_millis),
            serde_json::Value::Null => None,
            other => {
                tracing::debug!("Ignoring non-timestamp value {}", other);
                None
            }
        })
    }

    /// Epoch milliseconds to a UTC instant; out-of-range values are `None`
    pub fn from_epoch_millis(millis: f64) -> Option<DateTime<Utc>> {
        if !millis.is_finite() || millis.abs() > i64::MAX as f64 {
            return None;
        }
        DateTime::from_timestamp_millis(millis.round() as i64)
    }

    /// Parse an RFC 3339 timestamp, or an offset-less ISO timestamp in local time
    pub fn parse(raw: &str) -> Option<DateTime<Utc>> {
        let raw = raw.trim();
        if raw.is_empty() {
            return None;
        }

        if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
            return Some(dt.with_timezone(&Utc));
        }

        for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
            if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
                return Local
                    .from_local_datetime(&naive)
                    .earliest()
                    .map(|dt| dt.with_timezone(&Utc));
            }
        }

        tracing::debug!("Ignoring unparseable timestamp '{}'", raw);
        None
    }
}
