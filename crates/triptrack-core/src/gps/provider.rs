//! Geolocation provider interface

use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use super::{Position, PositionError};

/// Options for a position request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PositionOptions {
    /// Prefer the most accurate source available
    pub high_accuracy: bool,
    /// Oldest cached fix the provider may return (0 = always fresh)
    pub maximum_age_ms: u64,
    /// How long a request may take before failing with a timeout
    pub timeout_ms: u64,
}

impl PositionOptions {
    /// Request timeout as a [`Duration`]
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Cache tolerance as a [`Duration`]
    pub fn maximum_age(&self) -> Duration {
        Duration::from_millis(self.maximum_age_ms)
    }
}

/// A source of device positions
///
/// Absence of the capability is expressed by not having a provider at all.
pub trait Geolocation: Send + Sync + 'static {
    /// One-shot request for the current position
    fn current_position(
        &self,
        options: PositionOptions,
    ) -> impl Future<Output = Result<Position, PositionError>> + Send;

    /// Open a continuous subscription
    ///
    /// Failures are delivered through the subscription and do not close it;
    /// the provider keeps trying until the subscription is dropped.
    fn watch_position(&self, options: PositionOptions) -> WatchSubscription;
}

/// Handle to an open watch; dropping it clears the watch
#[derive(Debug)]
pub struct WatchSubscription {
    updates: mpsc::Receiver<Result<Position, PositionError>>,
    cancel: CancellationToken,
}

impl WatchSubscription {
    /// Wrap a provider channel; the provider should stop once `cancel` fires
    pub fn new(
        updates: mpsc::Receiver<Result<Position, PositionError>>,
        cancel: CancellationToken,
    ) -> Self {
        Self { updates, cancel }
    }

    /// Create a subscription plus the sender/token pair a provider drives
    pub fn channel(
        capacity: usize,
    ) -> (
        Self,
        mpsc::Sender<Result<Position, PositionError>>,
        CancellationToken,
    ) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        let cancel = CancellationToken::new();
        (Self::new(rx, cancel.clone()), tx, cancel)
    }

    /// Next callback; `None` once the provider has gone away
    pub async fn next(&mut self) -> Option<Result<Position, PositionError>> {
        self.updates.recv().await
    }

    /// Stop the provider
    pub fn clear(&self) {
        self.cancel.cancel();
    }
}

impl Drop for WatchSubscription {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}
