//! In-process trip backend
//!
//! Holds trip state in memory with the same semantics as the stock server.
//! Used by tests and by the app's offline demo mode.

use chrono::{DateTime, Utc};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use super::TelemetryBackend;
use crate::error::ClientError;
use crate::telemetry::{LocationReport, PathPoint, SensorReport, StatusResponse, TelemetrySnapshot};

/// Trip state as the server keeps it
#[derive(Debug, Clone, PartialEq)]
pub struct TripStore {
    current: TelemetrySnapshot,
    path: Vec<PathPoint>,
}

impl Default for TripStore {
    fn default() -> Self {
        Self::new()
    }
}

impl TripStore {
    /// Empty trip: no fix, no timestamp, not started
    pub fn new() -> Self {
        Self {
            current: TelemetrySnapshot {
                speed: 0.0,
                distance: 0.0,
                trip_start_time: None,
                latitude: Some(0.0),
                longitude: Some(0.0),
                timestamp: None,
                is_moving: Some(false),
            },
            path: Vec::new(),
        }
    }

    /// Record wheel-sensor data
    ///
    /// The first report starts the trip clock; every report refreshes the
    /// liveness timestamp.
    pub fn ingest_sensor(&mut self, report: SensorReport, now: DateTime<Utc>) {
        if self.current.trip_start_time.is_none() {
            self.current.trip_start_time = Some(now);
        }
        if let Some(speed) = report.speed {
            self.current.speed = speed;
        }
        if let Some(distance) = report.distance {
            self.current.distance = distance;
        }
        self.current.timestamp = Some(now);
        self.current.is_moving = Some(self.current.speed > 0.0);
    }

    /// Record a device position and append it to the path
    pub fn record_location(&mut self, report: LocationReport, now: DateTime<Utc>) {
        self.current.latitude = Some(report.latitude);
        self.current.longitude = Some(report.longitude);
        self.path.push(PathPoint {
            lat: report.latitude,
            lng: report.longitude,
            speed: Some(self.current.speed),
            time: Some(now),
        });
    }

    /// Clear distance and path and restart the trip clock
    pub fn reset(&mut self, now: DateTime<Utc>) {
        self.current.distance = 0.0;
        self.current.trip_start_time = Some(now);
        self.path.clear();
    }

    /// Snapshot served by `GET /api/status`
    pub fn status(&self) -> StatusResponse {
        StatusResponse {
            current: self.current.clone(),
            path: self.path.clone(),
        }
    }

    /// Recorded path
    pub fn path(&self) -> &[PathPoint] {
        &self.path
    }
}

/// [`TelemetryBackend`] backed by a shared [`TripStore`]
#[derive(Debug, Clone, Default)]
pub struct InMemoryBackend {
    store: Arc<Mutex<TripStore>>,
    offline: Arc<AtomicBool>,
    resets: Arc<AtomicU64>,
}

impl InMemoryBackend {
    /// Create a backend with an empty trip
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every request fail as if the server were unreachable
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Number of reset requests received
    pub fn reset_count(&self) -> u64 {
        self.resets.load(Ordering::SeqCst)
    }

    /// Run `f` against the store
    pub fn with_store<R>(&self, f: impl FnOnce(&mut TripStore) -> R) -> Result<R, ClientError> {
        let mut store = self
            .store
            .lock()
            .map_err(|_| ClientError::Unavailable("trip store lock poisoned".into()))?;
        Ok(f(&mut store))
    }

    fn check_online(&self) -> Result<(), ClientError> {
        if self.offline.load(Ordering::SeqCst) {
            Err(ClientError::Unavailable("backend offline".into()))
        } else {
            Ok(())
        }
    }
}

impl TelemetryBackend for InMemoryBackend {
    async fn fetch_status(&self) -> Result<StatusResponse, ClientError> {
        self.check_online()?;
        self.with_store(|s| s.status())
    }

    async fn push_location(&self, report: LocationReport) -> Result<(), ClientError> {
        self.check_online()?;
        self.with_store(|s| s.record_location(report, Utc::now()))
    }

    async fn reset_trip(&self) -> Result<(), ClientError> {
        self.check_online()?;
        self.resets.fetch_add(1, Ordering::SeqCst);
        self.with_store(|s| s.reset(Utc::now()))
    }

    async fn push_sensor_data(&self, report: SensorReport) -> Result<(), ClientError> {
        self.check_online()?;
        self.with_store(|s| s.ingest_sensor(report, Utc::now()))
    }
}
