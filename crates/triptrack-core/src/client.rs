//! Trip client event loop
//!
//! One task owns all client state. Timers, poll completions, geolocation
//! callbacks and operator commands arrive as events and are applied one at a
//! time, so no state is shared across threads and nothing needs a lock.
//!
//! Network requests and the one-shot position request run on spawned tasks
//! and report back through the event channel. Poll results carry a sequence
//! number; a result older than the last applied one is dropped.

use chrono::{DateTime, Utc};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use crate::backend::TelemetryBackend;
use crate::config::ClientConfig;
use crate::dashboard::{ConnectionStatus, DashboardComputer, DashboardState, MaxSpeedTracker};
use crate::error::ClientError;
use crate::gps::{
    Geolocation, GpsAction, GpsEnvironment, GpsEvent, GpsReporter, GpsStatus, PositionError,
    WatchSubscription,
};
use crate::render::{
    render_connection, render_dashboard, render_gps_status, render_reset, Host, Renderer,
};
use crate::telemetry::{PathPoint, StatusResponse};

/// Prompt shown before a trip reset
pub const RESET_PROMPT: &str = "Are you sure you want to reset the trip?";

/// Operator requests
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientCommand {
    /// Clear the trip (after confirmation)
    Reset,
    /// Stop the event loop
    Shutdown,
}

/// Completions delivered back to the loop
#[derive(Debug)]
enum ClientEvent {
    Poll {
        seq: u64,
        result: Result<StatusResponse, ClientError>,
    },
    Gps(GpsEvent),
    ResetFinished(Result<(), ClientError>),
}

/// Orders poll results by issue time
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PollSequencer {
    issued: u64,
    applied: u64,
}

impl PollSequencer {
    /// Number for the next poll (starts at 1)
    pub fn issue(&mut self) -> u64 {
        self.issued += 1;
        self.issued
    }

    /// Accept a result if it is newer than anything applied so far
    ///
    /// Numbers that were never issued are rejected.
    pub fn accept(&mut self, seq: u64) -> bool {
        if seq > self.applied && seq <= self.issued {
            self.applied = seq;
            true
        } else {
            false
        }
    }

    /// Last applied sequence number (0 = none)
    pub fn last_applied(&self) -> u64 {
        self.applied
    }

    /// Polls issued but not yet answered or superseded
    pub fn in_flight(&self) -> u64 {
        self.issued.saturating_sub(self.applied)
    }
}

/// State owned by the client loop
#[derive(Debug, Clone)]
pub struct ClientState {
    /// Highest speed since the last reset
    pub max_speed: MaxSpeedTracker,
    /// Path currently drawn
    pub rendered_path: Vec<PathPoint>,
    /// Last connection status shown
    pub connection: Option<ConnectionStatus>,
    /// Last successfully derived dashboard
    pub last_good: Option<DashboardState>,
    /// GPS reporting lifecycle
    pub gps: GpsReporter,
    /// Poll ordering
    pub polls: PollSequencer,
}

impl ClientState {
    /// Fresh state for a new session
    pub fn new(config: &ClientConfig) -> Self {
        Self {
            max_speed: MaxSpeedTracker::new(),
            rendered_path: Vec::new(),
            connection: None,
            last_good: None,
            gps: GpsReporter::new(config.geolocation.clone()),
            polls: PollSequencer::default(),
        }
    }

    /// Current GPS status
    pub fn gps_status(&self) -> GpsStatus {
        self.gps.status()
    }
}

/// Sends commands to a running [`TripClient`]
#[derive(Debug, Clone)]
pub struct ClientHandle {
    commands: mpsc::UnboundedSender<ClientCommand>,
    cancel: CancellationToken,
}

impl ClientHandle {
    /// Request a trip reset; false if the client has stopped
    pub fn reset(&self) -> bool {
        self.commands.send(ClientCommand::Reset).is_ok()
    }

    /// Stop the client loop
    pub fn shutdown(&self) {
        let _ = self.commands.send(ClientCommand::Shutdown);
        self.cancel.cancel();
    }

    /// Token cancelled when the client is told to stop
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }
}

/// Dashboard client: poll loop plus GPS reporting
pub struct TripClient<B, G, R, H> {
    config: ClientConfig,
    backend: B,
    geolocation: Option<Arc<G>>,
    renderer: R,
    host: H,
    computer: DashboardComputer,
    state: ClientState,
    watch: Option<WatchSubscription>,
    events_tx: mpsc::UnboundedSender<ClientEvent>,
    events_rx: mpsc::UnboundedReceiver<ClientEvent>,
    commands_rx: mpsc::UnboundedReceiver<ClientCommand>,
    cancel: CancellationToken,
}

impl<B, G, R, H> TripClient<B, G, R, H>
where
    B: TelemetryBackend,
    G: Geolocation,
    R: Renderer,
    H: Host,
{
    /// Create a client; `geolocation` is `None` when the host has no GPS
    pub fn new(
        config: ClientConfig,
        backend: B,
        geolocation: Option<G>,
        renderer: R,
        host: H,
    ) -> (Self, ClientHandle) {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let (commands_tx, commands_rx) = mpsc::unbounded_channel();
        let cancel = CancellationToken::new();

        let client = Self {
            computer: DashboardComputer::new(config.dashboard.clone()),
            state: ClientState::new(&config),
            config,
            backend,
            geolocation: geolocation.map(Arc::new),
            renderer,
            host,
            watch: None,
            events_tx,
            events_rx,
            commands_rx,
            cancel: cancel.clone(),
        };

        let handle = ClientHandle {
            commands: commands_tx,
            cancel,
        };

        (client, handle)
    }

    /// Client state
    pub fn state(&self) -> &ClientState {
        &self.state
    }

    /// Renderer
    pub fn renderer(&self) -> &R {
        &self.renderer
    }

    /// Host
    pub fn host(&self) -> &H {
        &self.host
    }

    /// Give back the renderer and host
    pub fn into_parts(self) -> (ClientState, R, H) {
        (self.state, self.renderer, self.host)
    }

    /// Run until shut down; returns the client for inspection
    pub async fn run(mut self) -> Self {
        tracing::info!(
            "Trip client started (poll every {} ms)",
            self.config.poll_interval_ms
        );
        render_gps_status(&mut self.renderer, self.state.gps.status());

        let mut poll = tokio::time::interval(self.config.poll_interval());
        poll.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let gps_start = tokio::time::sleep(self.config.gps_start_delay());
        tokio::pin!(gps_start);
        let mut gps_pending = true;

        loop {
            tokio::select! {
                _ = self.cancel.cancelled() => break,

                _ = poll.tick() => self.spawn_poll(),

                _ = &mut gps_start, if gps_pending => {
                    gps_pending = false;
                    self.start_gps();
                }

                Some(event) = self.events_rx.recv() => self.handle_event(event, Utc::now()),

                Some(command) = self.commands_rx.recv() => {
                    if command == ClientCommand::Shutdown {
                        break;
                    }
                    self.handle_command(command);
                }

                update = next_watch_update(&mut self.watch), if self.watch.is_some() => {
                    match update {
                        Some(result) => self.handle_gps(GpsEvent::Watch(result)),
                        None => {
                            tracing::warn!("Geolocation watch closed by provider");
                            self.watch = None;
                        }
                    }
                }
            }
        }

        self.watch = None;
        tracing::info!("Trip client stopped");
        self
    }

    fn spawn_poll(&mut self) {
        let seq = self.state.polls.issue();
        let backend = self.backend.clone();
        let events = self.events_tx.clone();

        tokio::spawn(async move {
            let result = backend.fetch_status().await;
            let _ = events.send(ClientEvent::Poll { seq, result });
        });
    }

    fn handle_event(&mut self, event: ClientEvent, now: DateTime<Utc>) {
        match event {
            ClientEvent::Poll { seq, result } => {
                self.apply_poll(seq, result, now);
            }
            ClientEvent::Gps(event) => self.handle_gps(event),
            ClientEvent::ResetFinished(result) => self.finish_reset(result),
        }
    }

    /// Apply one poll result; returns false if it was stale
    fn apply_poll(
        &mut self,
        seq: u64,
        result: Result<StatusResponse, ClientError>,
        now: DateTime<Utc>,
    ) -> bool {
        if !self.state.polls.accept(seq) {
            tracing::debug!(
                "Discarding out-of-order poll #{} (last applied #{})",
                seq,
                self.state.polls.last_applied()
            );
            return false;
        }

        match result {
            Ok(status) => {
                let dashboard = self
                    .computer
                    .compute(&status, now, &mut self.state.max_speed);

                if let Some(path) = &dashboard.path {
                    self.state.rendered_path = path.clone();
                }
                render_dashboard(&mut self.renderer, &dashboard);

                tracing::debug!(
                    "Poll #{}: {:.1} km/h, {}, {} path points",
                    seq,
                    dashboard.speed,
                    dashboard.connection,
                    self.state.rendered_path.len()
                );

                self.state.connection = Some(dashboard.connection);
                self.state.last_good = Some(dashboard);
            }
            Err(err) => {
                tracing::warn!("Error fetching data: {}", err);
                self.state.connection = Some(ConnectionStatus::Error);
                render_connection(&mut self.renderer, ConnectionStatus::Error);
            }
        }
        true
    }

    fn start_gps(&mut self) {
        tracing::info!("Attempting to start GPS tracking");
        let env = GpsEnvironment {
            supported: self.geolocation.is_some(),
            secure: self.host.is_secure_context(),
        };
        let actions = self.state.gps.start(env);
        self.perform_gps_actions(actions);
    }

    fn handle_gps(&mut self, event: GpsEvent) {
        let actions = self.state.gps.handle(event);
        self.perform_gps_actions(actions);
    }

    fn perform_gps_actions(&mut self, actions: Vec<GpsAction>) {
        for action in actions {
            match action {
                GpsAction::Status(status) => render_gps_status(&mut self.renderer, status),
                GpsAction::RequestCurrentPosition(options) => {
                    let Some(geo) = self.geolocation.clone() else {
                        continue;
                    };
                    let events = self.events_tx.clone();
                    tokio::spawn(async move {
                        let request = geo.current_position(options);
                        let result = tokio::time::timeout(options.timeout(), request)
                            .await
                            .unwrap_or_else(|_| Err(PositionError::timeout()));
                        let _ = events.send(ClientEvent::Gps(GpsEvent::Initial(result)));
                    });
                }
                GpsAction::StartWatch(options) => {
                    if let Some(geo) = &self.geolocation {
                        self.watch = Some(geo.watch_position(options));
                    }
                }
                GpsAction::ClearWatch => {
                    if self.watch.take().is_some() {
                        tracing::info!("Geolocation watch cleared");
                    }
                }
                GpsAction::PushLocation(report) => {
                    let backend = self.backend.clone();
                    tokio::spawn(async move {
                        match backend.push_location(report).await {
                            Ok(()) => tracing::debug!(
                                "Location sent: {:.6}, {:.6}",
                                report.latitude,
                                report.longitude
                            ),
                            Err(err) => tracing::error!("Failed to send location: {}", err),
                        }
                    });
                }
                GpsAction::Alert(message) => self.host.alert(&message),
            }
        }
    }

    fn handle_command(&mut self, command: ClientCommand) {
        match command {
            ClientCommand::Reset => {
                if !self.host.confirm(RESET_PROMPT) {
                    tracing::info!("Trip reset cancelled");
                    return;
                }
                tracing::info!("Resetting trip");
                let backend = self.backend.clone();
                let events = self.events_tx.clone();
                tokio::spawn(async move {
                    let result = backend.reset_trip().await;
                    let _ = events.send(ClientEvent::ResetFinished(result));
                });
            }
            ClientCommand::Shutdown => self.cancel.cancel(),
        }
    }

    fn finish_reset(&mut self, result: Result<(), ClientError>) {
        match result {
            Ok(()) => tracing::info!("Trip reset acknowledged"),
            Err(err) if err.is_transport() => {
                tracing::error!("Trip reset failed: {}", err);
                return;
            }
            Err(err) => tracing::warn!("Backend answered reset with an error: {}", err),
        }

        self.state.max_speed.reset();
        self.state.rendered_path.clear();
        if let Some(last) = self.state.last_good.as_mut() {
            last.max_speed = 0.0;
        }
        render_reset(&mut self.renderer);
    }
}

async fn next_watch_update(
    watch: &mut Option<WatchSubscription>,
) -> Option<Result<crate::gps::Position, PositionError>> {
    match watch {
        Some(subscription) => subscription.next().await,
        None => std::future::pending().await,
    }
}
