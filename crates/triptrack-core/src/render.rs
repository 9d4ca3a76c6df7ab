//! Renderer and host collaborators
//!
//! The core never draws anything itself. It hands [`DashboardState`] values
//! to a [`Renderer`] and asks the [`Host`] for confirmation, alerts and the
//! secure-context check.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::dashboard::{CameraFocus, ConnectionStatus, DashboardState};
use crate::gps::GpsStatus;
use crate::telemetry::{Coordinates, PathPoint};

/// Text fields on the dashboard
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum TextField {
    /// Current speed
    Speed,
    /// Trip distance
    Distance,
    /// Elapsed trip time
    Elapsed,
    /// Max speed since reset
    MaxSpeed,
    /// Latitude readout
    Latitude,
    /// Longitude readout
    Longitude,
    /// Backend connection status
    Connection,
    /// Local GPS status
    Gps,
}

/// Display surface for the dashboard
pub trait Renderer {
    /// Set a text field
    fn set_text(&mut self, field: TextField, text: &str);

    /// Fill the speed gauge, `fraction` in 0..=1
    fn set_gauge(&mut self, fraction: f64);

    /// Replace the whole path overlay
    fn replace_path(&mut self, path: &[PathPoint]);

    /// Move the current-position marker
    fn move_marker(&mut self, position: Coordinates);

    /// Point the map camera
    fn set_camera(&mut self, focus: CameraFocus);

    /// Toggle the "online" visual class on the connection indicator
    fn set_online(&mut self, online: bool);
}

/// Host environment services
pub trait Host {
    /// Whether the client runs in a trusted/secure context
    fn is_secure_context(&self) -> bool;

    /// Blocking yes/no question to the operator
    fn confirm(&mut self, prompt: &str) -> bool;

    /// Tell the operator something went wrong
    fn alert(&mut self, message: &str);
}

/// Push a full dashboard state to the renderer
pub fn render_dashboard<R: Renderer + ?Sized>(renderer: &mut R, state: &DashboardState) {
    renderer.set_text(TextField::Speed, &format_whole(state.speed));
    renderer.set_gauge(state.gauge_fraction);
    renderer.set_text(TextField::Distance, &format!("{:.2}", state.distance));
    renderer.set_text(TextField::MaxSpeed, &format_whole(state.max_speed));
    renderer.set_text(TextField::Elapsed, &state.elapsed);

    if let Some(position) = state.position {
        renderer.set_text(TextField::Latitude, &format!("{:.6}", position.latitude));
        renderer.set_text(TextField::Longitude, &format!("{:.6}", position.longitude));
        renderer.move_marker(position);
    }

    if let Some(path) = &state.path {
        renderer.replace_path(path);
    }
    if let Some(focus) = state.camera {
        renderer.set_camera(focus);
    }

    // Last, so renderers can treat the connection update as end of frame
    render_connection(renderer, state.connection);
}

/// Update only the connection indicator
pub fn render_connection<R: Renderer + ?Sized>(renderer: &mut R, status: ConnectionStatus) {
    renderer.set_text(TextField::Connection, status.as_str());
    renderer.set_online(status.is_online());
}

/// Update the GPS status field
pub fn render_gps_status<R: Renderer + ?Sized>(renderer: &mut R, status: GpsStatus) {
    renderer.set_text(TextField::Gps, status.as_str());
}

/// Show the local effects of a trip reset
pub fn render_reset<R: Renderer + ?Sized>(renderer: &mut R) {
    renderer.set_text(TextField::MaxSpeed, "0");
    renderer.replace_path(&[]);
}

fn format_whole(value: f64) -> String {
    format!("{}", value.round() as i64)
}

/// Renderer that keeps the current display contents in memory
///
/// Used by the headless app, which logs from it, and by tests.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HeadlessDisplay {
    /// Current text of each field
    pub texts: BTreeMap<TextField, String>,
    /// Gauge fill
    pub gauge: f64,
    /// Drawn path
    pub path: Vec<PathPoint>,
    /// Marker position
    pub marker: Option<Coordinates>,
    /// Camera focus
    pub camera: Option<CameraFocus>,
    /// Online class applied
    pub online: bool,
    /// Number of renderer calls so far
    pub updates: u64,
}

impl HeadlessDisplay {
    /// Blank display
    pub fn new() -> Self {
        Self::default()
    }

    /// Current text of a field
    pub fn text(&self, field: TextField) -> Option<&str> {
        self.texts.get(&field).map(String::as_str)
    }

    fn text_or_dash(&self, field: TextField) -> &str {
        self.text(field).unwrap_or("-")
    }

    /// One-line summary for logs
    pub fn summary(&self) -> String {
        format!(
            "{} km/h (max {}) | {} km | {} | net {} | gps {} | {} pts",
            self.text_or_dash(TextField::Speed),
            self.text_or_dash(TextField::MaxSpeed),
            self.text_or_dash(TextField::Distance),
            self.text_or_dash(TextField::Elapsed),
            self.text_or_dash(TextField::Connection),
            self.text_or_dash(TextField::Gps),
            self.path.len()
        )
    }
}

impl Renderer for HeadlessDisplay {
    fn set_text(&mut self, field: TextField, text: &str) {
        self.updates += 1;
        self.texts.insert(field, text.to_string());
    }

    fn set_gauge(&mut self, fraction: f64) {
        self.updates += 1;
        self.gauge = fraction;
    }

    fn replace_path(&mut self, path: &[PathPoint]) {
        self.updates += 1;
        self.path = path.to_vec();
    }

    fn move_marker(&mut self, position: Coordinates) {
        self.updates += 1;
        self.marker = Some(position);
    }

    fn set_camera(&mut self, focus: CameraFocus) {
        self.updates += 1;
        self.camera = Some(focus);
    }

    fn set_online(&mut self, online: bool) {
        self.updates += 1;
        self.online = online;
    }
}
