//! # TripTrack Core Library
//!
//! Core functionality for the TripTrack live trip dashboard.

#![warn(missing_docs)]
#![cfg_attr(docsrs, feature(doc_cfg))]

//!
//! This library provides:
//! - Polling of the trip backend and derivation of dashboard state
//! - Connection liveness (ONLINE / OFFLINE / ERROR) from snapshot age
//! - The GPS reporting state machine and position providers
//! - HTTP and in-memory trip backends, plus a wheel-sensor simulator for demos
//! - The client event loop tying these together
//!
//! ## Example
//!
//! ```rust,ignore
//! use triptrack_core::prelude::*;
//!
//! let config = ClientConfig::default();
//! let backend = HttpBackend::from_config(&config)?;
//! let (client, handle) = TripClient::new(config, backend, None::<SimulatedGeolocation>, display, host);
//! let client = tokio::spawn(client.run());
//! handle.reset();
//! ```

pub mod backend;
pub mod client;
pub mod config;
pub mod dashboard;
pub mod demo;
pub mod error;
pub mod gps;
pub mod render;
pub mod telemetry;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::backend::{HttpBackend, InMemoryBackend, TelemetryBackend, TripStore};
    pub use crate::client::{ClientCommand, ClientHandle, ClientState, TripClient};
    pub use crate::config::{ClientConfig, DashboardConfig, GeolocationConfig};
    pub use crate::dashboard::{ConnectionStatus, DashboardComputer, DashboardState};
    pub use crate::demo::SensorSimulator;
    pub use crate::error::{ClientError, ConfigError};
    pub use crate::gps::{
        Geolocation, GpsReporter, GpsStatus, Position, PositionError, SimulatedGeolocation,
        SimulatedRoute,
    };
    pub use crate::render::{HeadlessDisplay, Host, Renderer, TextField};
    pub use crate::telemetry::{LocationReport, PathPoint, SensorReport, StatusResponse};
}

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
