//! Trip Backend
//!
//! The server the dashboard polls and reports to.
//!
//! ## Endpoints
//!
//! - `GET /api/status` returns the latest snapshot and the trip path
//! - `POST /api/location` records a device position
//! - `POST /api/reset` clears the trip
//! - `POST /api/data` records speed/distance from the wheel sensor

mod http;
mod memory;

pub use http::HttpBackend;
pub use memory::{InMemoryBackend, TripStore};

use std::future::Future;

use crate::error::ClientError;
use crate::telemetry::{LocationReport, SensorReport, StatusResponse};

/// Operations the client needs from the trip backend
///
/// Implementations are cheap to clone; requests run on spawned tasks.
pub trait TelemetryBackend: Clone + Send + Sync + 'static {
    /// Fetch the latest snapshot and path
    fn fetch_status(&self) -> impl Future<Output = Result<StatusResponse, ClientError>> + Send;

    /// Report a device position; any non-2xx answer is an error
    fn push_location(
        &self,
        report: LocationReport,
    ) -> impl Future<Output = Result<(), ClientError>> + Send;

    /// Ask the backend to clear the trip
    fn reset_trip(&self) -> impl Future<Output = Result<(), ClientError>> + Send;

    /// Report wheel-sensor speed/distance
    fn push_sensor_data(
        &self,
        report: SensorReport,
    ) -> impl Future<Output = Result<(), ClientError>> + Send;
}
