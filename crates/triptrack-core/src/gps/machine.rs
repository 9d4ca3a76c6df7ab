//! GPS reporting state machine
//!
//! `Idle -> Acquiring -> Locked`, with failures classified into
//! `Denied`/`Unavailable`/`Timeout`/`Error`. Only `Denied` and `Unsupported`
//! end the activity; other failures leave the watch open so a later fix can
//! bring the reporter back to `Locked`.
//!
//! The machine does no I/O. Each transition returns the [`GpsAction`]s the
//! driver must perform, in order.

use super::{GpsStatus, Position, PositionError, PositionErrorKind, PositionOptions};
use crate::config::GeolocationConfig;
use crate::telemetry::LocationReport;

/// What the host offers at start-up
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GpsEnvironment {
    /// A geolocation capability exists
    pub supported: bool,
    /// Running in a trusted/secure context
    pub secure: bool,
}

/// Provider callbacks fed into the machine
#[derive(Debug, Clone, PartialEq)]
pub enum GpsEvent {
    /// Result of the one-shot initial request
    Initial(Result<Position, PositionError>),
    /// A callback from the continuous watch
    Watch(Result<Position, PositionError>),
}

/// Side effects requested by a transition
#[derive(Debug, Clone, PartialEq)]
pub enum GpsAction {
    /// Show a new status
    Status(GpsStatus),
    /// Issue the one-shot position request
    RequestCurrentPosition(PositionOptions),
    /// Open the continuous subscription
    StartWatch(PositionOptions),
    /// Tear the subscription down
    ClearWatch,
    /// Fire-and-forget push to `/api/location`
    PushLocation(LocationReport),
    /// Tell the operator
    Alert(String),
}

/// GPS reporting lifecycle
#[derive(Debug, Clone)]
pub struct GpsReporter {
    config: GeolocationConfig,
    status: GpsStatus,
    started: bool,
    watching: bool,
    finished: bool,
    insecure: bool,
    fixes: u64,
}

impl GpsReporter {
    /// Create an idle reporter
    pub fn new(config: GeolocationConfig) -> Self {
        Self {
            config,
            status: GpsStatus::Idle,
            started: false,
            watching: false,
            finished: false,
            insecure: false,
            fixes: 0,
        }
    }

    /// Current status
    pub fn status(&self) -> GpsStatus {
        self.status
    }

    /// Whether the continuous watch is open
    pub fn is_watching(&self) -> bool {
        self.watching
    }

    /// Whether the activity has ended (`Denied` or `Unsupported`)
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Whether start-up flagged an insecure context
    pub fn is_insecure(&self) -> bool {
        self.insecure
    }

    /// Number of successful fixes handled
    pub fn fix_count(&self) -> u64 {
        self.fixes
    }

    /// Options for the one-shot request: no cached fixes
    pub fn initial_options(&self) -> PositionOptions {
        PositionOptions {
            high_accuracy: self.config.high_accuracy,
            maximum_age_ms: 0,
            timeout_ms: self.config.initial_timeout_ms,
        }
    }

    /// Options for the continuous watch
    pub fn watch_options(&self) -> PositionOptions {
        PositionOptions {
            high_accuracy: self.config.high_accuracy,
            maximum_age_ms: self.config.watch_max_age_ms,
            timeout_ms: self.config.watch_timeout_ms,
        }
    }

    /// Begin acquisition. Calling it again is a no-op.
    pub fn start(&mut self, env: GpsEnvironment) -> Vec<GpsAction> {
        if self.started {
            return Vec::new();
        }
        self.started = true;

        let mut actions = Vec::new();

        if !env.supported {
            tracing::error!("Geolocation is not supported on this host");
            self.finished = true;
            self.set_status(GpsStatus::Unsupported, &mut actions);
            actions.push(GpsAction::Alert(
                "Geolocation is not supported by this host.".to_string(),
            ));
            return actions;
        }

        if !env.secure {
            tracing::warn!("Not running in a secure context; geolocation may not work");
            self.insecure = true;
            self.set_status(GpsStatus::Insecure, &mut actions);
        }

        self.set_status(GpsStatus::Acquiring, &mut actions);
        actions.push(GpsAction::RequestCurrentPosition(self.initial_options()));
        actions
    }

    /// Feed one provider callback
    pub fn handle(&mut self, event: GpsEvent) -> Vec<GpsAction> {
        let mut actions = Vec::new();
        if self.finished || !self.started {
            tracing::debug!("Ignoring GPS event while inactive: {:?}", event);
            return actions;
        }

        match event {
            GpsEvent::Initial(Ok(position)) => {
                tracing::info!(
                    "Initial GPS position acquired: {:.6}, {:.6}",
                    position.latitude,
                    position.longitude
                );
                self.on_fix(&position, &mut actions);
                if !self.watching {
                    self.watching = true;
                    actions.push(GpsAction::StartWatch(self.watch_options()));
                }
            }
            GpsEvent::Watch(Ok(position)) => {
                tracing::debug!(
                    "GPS update: {:.6}, {:.6}",
                    position.latitude,
                    position.longitude
                );
                self.on_fix(&position, &mut actions);
            }
            GpsEvent::Initial(Err(err)) | GpsEvent::Watch(Err(err)) => {
                self.on_error(&err, &mut actions);
            }
        }

        actions
    }

    fn on_fix(&mut self, position: &Position, actions: &mut Vec<GpsAction>) {
        self.fixes += 1;
        self.set_status(GpsStatus::Locked, actions);
        actions.push(GpsAction::PushLocation(position.report()));
    }

    fn on_error(&mut self, err: &PositionError, actions: &mut Vec<GpsAction>) {
        let kind = err.kind();
        match kind {
            PositionErrorKind::PermissionDenied => {
                tracing::error!("User denied location permission");
            }
            PositionErrorKind::PositionUnavailable => {
                tracing::warn!("Location information unavailable");
            }
            PositionErrorKind::Timeout => tracing::warn!("Location request timed out"),
            PositionErrorKind::Unknown(code) => {
                tracing::error!("Unknown geolocation error (code {}): {}", code, err.message);
            }
        }

        self.set_status(kind.status(), actions);

        if kind == PositionErrorKind::PermissionDenied {
            self.finished = true;
            if self.watching {
                self.watching = false;
                actions.push(GpsAction::ClearWatch);
            }
            actions.push(GpsAction::Alert(
                "Location permission denied. Please enable location access.".to_string(),
            ));
        }
    }

    fn set_status(&mut self, status: GpsStatus, actions: &mut Vec<GpsAction>) {
        self.status = status;
        actions.push(GpsAction::Status(status));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const READY: GpsEnvironment = GpsEnvironment {
        supported: true,
        secure: true,
    };

    fn reporter() -> GpsReporter {
        GpsReporter::new(GeolocationConfig::default())
    }

    fn locked() -> GpsReporter {
        let mut r = reporter();
        r.start(READY);
        r.handle(GpsEvent::Initial(Ok(Position::new(1.0, 2.0))));
        r
    }

    #[test]
    fn test_start_requests_initial_fix() {
        let mut r = reporter();
        let actions = r.start(READY);
        assert_eq!(
            actions,
            vec![
                GpsAction::Status(GpsStatus::Acquiring),
                GpsAction::RequestCurrentPosition(PositionOptions {
                    high_accuracy: true,
                    maximum_age_ms: 0,
                    timeout_ms: 10_000,
                }),
            ]
        );
        assert_eq!(r.status(), GpsStatus::Acquiring);
    }

    #[test]
    fn test_start_is_idempotent() {
        let mut r = reporter();
        r.start(READY);
        assert!(r.start(READY).is_empty());
    }

    #[test]
    fn test_unsupported_is_terminal() {
        let mut r = reporter();
        let actions = r.start(GpsEnvironment {
            supported: false,
            secure: true,
        });
        assert_eq!(actions[0], GpsAction::Status(GpsStatus::Unsupported));
        assert!(matches!(actions[1], GpsAction::Alert(_)));
        assert_eq!(actions.len(), 2);
        assert!(r.is_finished());

        let later = r.handle(GpsEvent::Initial(Ok(Position::new(1.0, 1.0))));
        assert!(later.is_empty());
        assert_eq!(r.status(), GpsStatus::Unsupported);
    }

    #[test]
    fn test_insecure_is_advisory() {
        let mut r = reporter();
        let actions = r.start(GpsEnvironment {
            supported: true,
            secure: false,
        });
        assert_eq!(actions[0], GpsAction::Status(GpsStatus::Insecure));
        assert_eq!(actions[1], GpsAction::Status(GpsStatus::Acquiring));
        assert!(matches!(actions[2], GpsAction::RequestCurrentPosition(_)));
        assert!(r.is_insecure());
        assert!(!r.is_finished());
    }

    #[test]
    fn test_initial_fix_locks_pushes_and_watches() {
        let mut r = reporter();
        r.start(READY);
        let actions = r.handle(GpsEvent::Initial(Ok(Position::new(48.137, 11.575))));
        assert_eq!(
            actions,
            vec![
                GpsAction::Status(GpsStatus::Locked),
                GpsAction::PushLocation(LocationReport {
                    latitude: 48.137,
                    longitude: 11.575,
                }),
                GpsAction::StartWatch(PositionOptions {
                    high_accuracy: true,
                    maximum_age_ms: 1000,
                    timeout_ms: 10_000,
                }),
            ]
        );
        assert!(r.is_watching());
    }

    #[test]
    fn test_watch_fix_relocks_and_pushes_exact_coordinates() {
        let mut r = locked();
        let actions = r.handle(GpsEvent::Watch(Ok(Position::new(-33.868_82, 151.209_29))));
        assert_eq!(
            actions,
            vec![
                GpsAction::Status(GpsStatus::Locked),
                GpsAction::PushLocation(LocationReport {
                    latitude: -33.868_82,
                    longitude: 151.209_29,
                }),
            ]
        );
        assert_eq!(r.fix_count(), 2);
    }

    #[test]
    fn test_transient_watch_errors_keep_subscription() {
        let mut r = locked();

        let actions = r.handle(GpsEvent::Watch(Err(PositionError::position_unavailable())));
        assert_eq!(actions, vec![GpsAction::Status(GpsStatus::Unavailable)]);
        assert!(r.is_watching());

        let actions = r.handle(GpsEvent::Watch(Err(PositionError::timeout())));
        assert_eq!(actions, vec![GpsAction::Status(GpsStatus::Timeout)]);
        assert!(r.is_watching());

        let actions = r.handle(GpsEvent::Watch(Err(PositionError::new(9, "weird"))));
        assert_eq!(actions, vec![GpsAction::Status(GpsStatus::Error)]);
        assert!(r.is_watching());

        r.handle(GpsEvent::Watch(Ok(Position::new(3.0, 4.0))));
        assert_eq!(r.status(), GpsStatus::Locked);
    }

    #[test]
    fn test_watch_denied_clears_subscription() {
        let mut r = locked();
        let actions = r.handle(GpsEvent::Watch(Err(PositionError::permission_denied())));
        assert_eq!(actions[0], GpsAction::Status(GpsStatus::Denied));
        assert_eq!(actions[1], GpsAction::ClearWatch);
        assert!(matches!(actions[2], GpsAction::Alert(_)));
        assert!(r.is_finished());
        assert!(!r.is_watching());

        assert!(r
            .handle(GpsEvent::Watch(Ok(Position::new(1.0, 1.0))))
            .is_empty());
        assert_eq!(r.status(), GpsStatus::Denied);
    }

    #[test]
    fn test_initial_denied_never_watches() {
        let mut r = reporter();
        r.start(READY);
        let actions = r.handle(GpsEvent::Initial(Err(PositionError::permission_denied())));
        assert_eq!(actions[0], GpsAction::Status(GpsStatus::Denied));
        assert!(matches!(actions[1], GpsAction::Alert(_)));
        assert_eq!(actions.len(), 2);
        assert!(r.is_finished());
    }

    #[test]
    fn test_initial_timeout_is_not_terminal() {
        let mut r = reporter();
        r.start(READY);
        let actions = r.handle(GpsEvent::Initial(Err(PositionError::timeout())));
        assert_eq!(actions, vec![GpsAction::Status(GpsStatus::Timeout)]);
        assert!(!r.is_finished());
        assert!(!r.is_watching());
    }

    #[test]
    fn test_events_before_start_are_ignored() {
        let mut r = reporter();
        assert!(r
            .handle(GpsEvent::Watch(Ok(Position::new(1.0, 1.0))))
            .is_empty());
        assert_eq!(r.status(), GpsStatus::Idle);
    }
}
