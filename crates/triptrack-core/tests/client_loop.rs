//! End-to-end tests of the client event loop against the in-memory backend
//!
//! Time is paused, so the poll interval, GPS start delay and simulated watch
//! all advance deterministically.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use triptrack_core::backend::{InMemoryBackend, TelemetryBackend};
use triptrack_core::client::TripClient;
use triptrack_core::config::ClientConfig;
use triptrack_core::gps::{
    Geolocation, GpsStatus, Position, PositionError, PositionOptions, SimulatedGeolocation,
    SimulatedRoute, WatchSubscription,
};
use triptrack_core::render::{HeadlessDisplay, Host, TextField};
use triptrack_core::telemetry::SensorReport;

/// Host with scripted answers that records what it was asked
#[derive(Debug, Default)]
struct ScriptedHost {
    secure: bool,
    confirm_answer: bool,
    prompts: Vec<String>,
    alerts: Vec<String>,
}

impl ScriptedHost {
    fn secure(confirm_answer: bool) -> Self {
        Self {
            secure: true,
            confirm_answer,
            ..Default::default()
        }
    }
}

impl Host for ScriptedHost {
    fn is_secure_context(&self) -> bool {
        self.secure
    }

    fn confirm(&mut self, prompt: &str) -> bool {
        self.prompts.push(prompt.to_string());
        self.confirm_answer
    }

    fn alert(&mut self, message: &str) {
        self.alerts.push(message.to_string());
    }
}

type SimClient = TripClient<InMemoryBackend, SimulatedGeolocation, HeadlessDisplay, ScriptedHost>;

fn quiet_gps() -> SimulatedGeolocation {
    SimulatedGeolocation::new(SimulatedRoute {
        jitter_m: 0.0,
        seed: Some(42),
        ..Default::default()
    })
}

async fn backend_with_speed(speed: f64) -> InMemoryBackend {
    let backend = InMemoryBackend::new();
    backend
        .push_sensor_data(SensorReport {
            speed: Some(speed),
            distance: Some(3.5),
        })
        .await
        .unwrap();
    backend
}

fn sleep_ms(ms: u64) -> tokio::time::Sleep {
    tokio::time::sleep(Duration::from_millis(ms))
}

#[tokio::test(start_paused = true)]
async fn test_polls_render_live_dashboard() {
    let backend = backend_with_speed(42.0).await;
    let (client, handle) = SimClient::new(
        ClientConfig::default(),
        backend.clone(),
        Some(quiet_gps()),
        HeadlessDisplay::new(),
        ScriptedHost::secure(true),
    );
    let task = tokio::spawn(client.run());

    sleep_ms(3500).await;
    handle.shutdown();
    let client = task.await.unwrap();

    let display = client.renderer();
    assert_eq!(display.text(TextField::Speed), Some("42"));
    assert_eq!(display.text(TextField::Distance), Some("3.50"));
    assert_eq!(display.text(TextField::MaxSpeed), Some("42"));
    assert_eq!(display.text(TextField::Connection), Some("ONLINE"));
    assert_eq!(display.text(TextField::Gps), Some("LOCKED"));
    assert!(display.online);
    assert!((display.gauge - 0.42).abs() < 1e-9);
    assert_eq!(client.state().gps_status(), GpsStatus::Locked);
    assert!(client.host().alerts.is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_gps_fixes_reach_backend_path() {
    let backend = backend_with_speed(20.0).await;
    let gps = quiet_gps();
    let route = gps.route().clone();
    let (client, handle) = SimClient::new(
        ClientConfig::default(),
        backend.clone(),
        Some(gps),
        HeadlessDisplay::new(),
        ScriptedHost::secure(true),
    );
    let task = tokio::spawn(client.run());

    sleep_ms(4500).await;
    handle.shutdown();
    let client = task.await.unwrap();

    let path = backend.with_store(|s| s.path().to_vec()).unwrap();
    assert!(path.len() >= 3, "expected several fixes, got {}", path.len());
    for point in &path {
        assert!((point.lat - route.center.latitude).abs() < 0.02);
        assert!((point.lng - route.center.longitude).abs() < 0.02);
        assert_eq!(point.speed, Some(20.0));
    }

    // The display follows the server path wholesale, one poll behind at most
    let drawn = &client.renderer().path;
    assert!(!drawn.is_empty());
    assert_eq!(drawn[..], path[..drawn.len()]);
    assert!(client.renderer().camera.is_some());
}

#[tokio::test(start_paused = true)]
async fn test_backend_outage_shows_error_and_keeps_values() {
    let backend = backend_with_speed(64.0).await;
    let (client, handle) = SimClient::new(
        ClientConfig::default(),
        backend.clone(),
        Some(quiet_gps()),
        HeadlessDisplay::new(),
        ScriptedHost::secure(true),
    );
    let task = tokio::spawn(client.run());

    sleep_ms(1500).await;
    backend.set_offline(true);
    sleep_ms(1000).await;
    handle.shutdown();
    let client = task.await.unwrap();

    let display = client.renderer();
    assert_eq!(display.text(TextField::Connection), Some("ERROR"));
    assert!(!display.online);
    assert_eq!(display.text(TextField::Speed), Some("64"));
    assert_eq!(display.text(TextField::MaxSpeed), Some("64"));
}

#[tokio::test(start_paused = true)]
async fn test_snapshot_without_timestamp_is_offline() {
    let (client, handle) = SimClient::new(
        ClientConfig::default(),
        InMemoryBackend::new(),
        Some(quiet_gps()),
        HeadlessDisplay::new(),
        ScriptedHost::secure(true),
    );
    let task = tokio::spawn(client.run());

    sleep_ms(500).await;
    handle.shutdown();
    let client = task.await.unwrap();

    assert_eq!(client.renderer().text(TextField::Connection), Some("OFFLINE"));
    assert_eq!(client.renderer().text(TextField::Elapsed), Some("00:00:00"));
}

#[tokio::test(start_paused = true)]
async fn test_confirmed_reset_clears_max_and_path() {
    let backend = backend_with_speed(55.0).await;
    let (client, handle) = SimClient::new(
        ClientConfig::default(),
        backend.clone(),
        Some(quiet_gps()),
        HeadlessDisplay::new(),
        ScriptedHost::secure(true),
    );
    let task = tokio::spawn(client.run());

    sleep_ms(3500).await;
    assert!(handle.reset());
    sleep_ms(10).await;
    handle.shutdown();
    let client = task.await.unwrap();

    assert_eq!(backend.reset_count(), 1);
    assert_eq!(
        client.host().prompts,
        vec!["Are you sure you want to reset the trip?".to_string()]
    );
    assert_eq!(client.state().max_speed.value(), 0.0);
    assert!(client.state().rendered_path.is_empty());
    assert!(client.renderer().path.is_empty());
    assert_eq!(client.renderer().text(TextField::MaxSpeed), Some("0"));
    // GPS reporting is not part of the trip
    assert_eq!(client.state().gps_status(), GpsStatus::Locked);
    assert_eq!(client.renderer().text(TextField::Gps), Some("LOCKED"));
}

#[tokio::test(start_paused = true)]
async fn test_declined_reset_sends_nothing() {
    let backend = backend_with_speed(55.0).await;
    let (client, handle) = SimClient::new(
        ClientConfig::default(),
        backend.clone(),
        Some(quiet_gps()),
        HeadlessDisplay::new(),
        ScriptedHost::secure(false),
    );
    let task = tokio::spawn(client.run());

    sleep_ms(1500).await;
    handle.reset();
    sleep_ms(10).await;
    handle.shutdown();
    let client = task.await.unwrap();

    assert_eq!(backend.reset_count(), 0);
    assert_eq!(client.host().prompts.len(), 1);
    assert_eq!(client.state().max_speed.value(), 55.0);
}

#[tokio::test(start_paused = true)]
async fn test_reset_during_outage_keeps_local_state() {
    let backend = backend_with_speed(55.0).await;
    let (client, handle) = SimClient::new(
        ClientConfig::default(),
        backend.clone(),
        Some(quiet_gps()),
        HeadlessDisplay::new(),
        ScriptedHost::secure(true),
    );
    let task = tokio::spawn(client.run());

    sleep_ms(2500).await;
    backend.set_offline(true);
    handle.reset();
    sleep_ms(10).await;
    handle.shutdown();
    let client = task.await.unwrap();

    assert_eq!(client.state().max_speed.value(), 55.0);
    assert_eq!(client.renderer().text(TextField::MaxSpeed), Some("55"));
}

#[tokio::test(start_paused = true)]
async fn test_permission_denied_alerts_and_stops() {
    let backend = backend_with_speed(10.0).await;
    let gps = quiet_gps();
    gps.queue_error(PositionError::permission_denied());
    let (client, handle) = SimClient::new(
        ClientConfig::default(),
        backend.clone(),
        Some(gps),
        HeadlessDisplay::new(),
        ScriptedHost::secure(true),
    );
    let task = tokio::spawn(client.run());

    sleep_ms(4000).await;
    handle.shutdown();
    let client = task.await.unwrap();

    assert_eq!(client.state().gps_status(), GpsStatus::Denied);
    assert_eq!(client.renderer().text(TextField::Gps), Some("DENIED"));
    assert_eq!(client.host().alerts.len(), 1);
    assert!(!client.state().gps.is_watching());
    assert!(backend.with_store(|s| s.path().is_empty()).unwrap());
}

#[tokio::test(start_paused = true)]
async fn test_missing_geolocation_reports_unsupported() {
    let backend = backend_with_speed(10.0).await;
    let (client, handle) = SimClient::new(
        ClientConfig::default(),
        backend,
        None,
        HeadlessDisplay::new(),
        ScriptedHost::secure(true),
    );
    let task = tokio::spawn(client.run());

    sleep_ms(2000).await;
    handle.shutdown();
    let client = task.await.unwrap();

    assert_eq!(client.state().gps_status(), GpsStatus::Unsupported);
    assert_eq!(client.renderer().text(TextField::Gps), Some("NOT SUPPORTED"));
    assert_eq!(client.host().alerts.len(), 1);
    // Polling is independent of GPS
    assert_eq!(client.renderer().text(TextField::Connection), Some("ONLINE"));
}

#[tokio::test(start_paused = true)]
async fn test_gps_waits_for_start_delay() {
    let backend = backend_with_speed(10.0).await;
    let (client, handle) = SimClient::new(
        ClientConfig::default(),
        backend.clone(),
        Some(quiet_gps()),
        HeadlessDisplay::new(),
        ScriptedHost::secure(true),
    );
    let task = tokio::spawn(client.run());

    sleep_ms(900).await;
    handle.shutdown();
    let client = task.await.unwrap();

    assert_eq!(client.state().gps_status(), GpsStatus::Idle);
    assert_eq!(client.renderer().text(TextField::Gps), Some("WAITING"));
    assert!(backend.with_store(|s| s.path().is_empty()).unwrap());
}

/// Provider whose one-shot request never answers
#[derive(Debug, Default)]
struct SilentGeolocation {
    watches: Arc<AtomicUsize>,
}

impl Geolocation for SilentGeolocation {
    async fn current_position(&self, _options: PositionOptions) -> Result<Position, PositionError> {
        std::future::pending().await
    }

    fn watch_position(&self, _options: PositionOptions) -> WatchSubscription {
        self.watches.fetch_add(1, Ordering::SeqCst);
        let (subscription, _updates, _cancel) = WatchSubscription::channel(1);
        subscription
    }
}

type SilentClient = TripClient<InMemoryBackend, SilentGeolocation, HeadlessDisplay, ScriptedHost>;

async fn run_silent_gps_for(ms: u64) -> (SilentClient, InMemoryBackend, usize) {
    let backend = backend_with_speed(10.0).await;
    let gps = SilentGeolocation::default();
    let watches = gps.watches.clone();
    let (client, handle) = SilentClient::new(
        ClientConfig::default(),
        backend.clone(),
        Some(gps),
        HeadlessDisplay::new(),
        ScriptedHost::secure(true),
    );
    let task = tokio::spawn(client.run());

    sleep_ms(ms).await;
    handle.shutdown();
    let client = task.await.unwrap();
    let opened = watches.load(Ordering::SeqCst);
    (client, backend, opened)
}

#[tokio::test(start_paused = true)]
async fn test_unanswered_initial_fix_still_acquiring_before_deadline() {
    // GPS starts at 1 s, so the 10 s bound expires at 11 s
    let (client, _backend, watches) = run_silent_gps_for(10_500).await;

    assert_eq!(client.state().gps_status(), GpsStatus::Acquiring);
    assert_eq!(client.renderer().text(TextField::Gps), Some("ACQUIRING"));
    assert_eq!(watches, 0);
}

#[tokio::test(start_paused = true)]
async fn test_unanswered_initial_fix_times_out() {
    let (client, backend, watches) = run_silent_gps_for(11_500).await;

    assert_eq!(client.state().gps_status(), GpsStatus::Timeout);
    assert_eq!(client.renderer().text(TextField::Gps), Some("TIMEOUT"));
    assert!(!client.state().gps.is_watching());
    assert_eq!(watches, 0);
    assert!(backend.with_store(|s| s.path().is_empty()).unwrap());
    // Timeouts are not operator alerts
    assert!(client.host().alerts.is_empty());
}
