//! Interval polling of the backend's health route.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use afrikunle_core::clock::Clock;
use afrikunle_core::timed_request::TimedRequest;
use afrikunle_core::transport::{HttpRequest, HttpTransport};
use chrono::{DateTime, Utc};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Default poll interval.
pub const DEFAULT_INTERVAL: Duration = Duration::from_millis(8000);

/// Default per-poll deadline.
pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_millis(3000);

/// Backend reachability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HealthStatus {
    /// No poll has completed yet.
    #[default]
    Unknown,
    /// The last poll got a 2xx.
    Online,
    /// The last poll failed.
    Offline,
}

impl fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unknown => f.write_str("unknown"),
            Self::Online => f.write_str("online"),
            Self::Offline => f.write_str("offline"),
        }
    }
}

/// The status plus when it was last confirmed.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct HealthSnapshot {
    /// Current status.
    pub status: HealthStatus,
    /// When the last poll completed.
    pub checked_at: Option<DateTime<Utc>>,
    /// Failed polls since the last success.
    pub consecutive_failures: u32,
}

/// Starts health polls.
#[derive(Clone)]
pub struct HealthMonitor {
    timed: TimedRequest,
    clock: Arc<dyn Clock>,
    interval: Duration,
    probe_timeout: Duration,
}

impl fmt::Debug for HealthMonitor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HealthMonitor")
            .field("interval", &self.interval)
            .field("probe_timeout", &self.probe_timeout)
            .finish_non_exhaustive()
    }
}

impl HealthMonitor {
    /// Creates a monitor with the default interval and probe deadline.
    #[must_use]
    pub fn new(transport: Arc<dyn HttpTransport>, clock: Arc<dyn Clock>) -> Self {
        Self {
            timed: TimedRequest::new(transport),
            clock,
            interval: DEFAULT_INTERVAL,
            probe_timeout: DEFAULT_PROBE_TIMEOUT,
        }
    }

    /// Overrides the poll interval.
    #[must_use]
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Overrides the per-poll deadline.
    #[must_use]
    pub fn with_probe_timeout(mut self, probe_timeout: Duration) -> Self {
        self.probe_timeout = probe_timeout;
        self
    }

    /// Starts polling `{base_url}/health`. The first poll runs immediately.
    #[must_use]
    pub fn start(&self, base_url: &str) -> HealthHandle {
        let url = format!("{}/health", base_url.trim_end_matches('/'));
        let (tx, rx) = watch::channel(HealthSnapshot::default());
        let token = CancellationToken::new();

        let task = tokio::spawn(poll(self.clone(), url, tx, token.clone()));

        HealthHandle {
            snapshot: rx,
            token,
            task: Some(task),
        }
    }
}

async fn poll(
    monitor: HealthMonitor,
    url: String,
    tx: watch::Sender<HealthSnapshot>,
    token: CancellationToken,
) {
    let mut ticker = tokio::time::interval(monitor.interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;
            () = token.cancelled() => break,
            _ = ticker.tick() => {}
        }

        let outcome = tokio::select! {
            biased;
            () = token.cancelled() => break,
            outcome = monitor.timed.send(HttpRequest::get(&url), monitor.probe_timeout) => outcome,
        };
        let checked_at = monitor.clock.now();

        tx.send_modify(|snapshot| {
            let previous = snapshot.status;
            match &outcome {
                Ok(_) => {
                    snapshot.status = HealthStatus::Online;
                    snapshot.consecutive_failures = 0;
                }
                Err(e) => {
                    snapshot.status = HealthStatus::Offline;
                    snapshot.consecutive_failures = snapshot.consecutive_failures.saturating_add(1);
                    let failures = snapshot.consecutive_failures;
                    debug!(%url, error = %e, failures, "health poll failed");
                }
            }
            snapshot.checked_at = Some(checked_at);
            if previous != snapshot.status {
                info!(%url, from = %previous, to = %snapshot.status, "backend health changed");
            }
        });
    }
    debug!(%url, "health polling stopped");
}

/// A running monitor. Stopping or dropping it ends polling.
#[derive(Debug)]
pub struct HealthHandle {
    snapshot: watch::Receiver<HealthSnapshot>,
    token: CancellationToken,
    task: Option<JoinHandle<()>>,
}

impl HealthHandle {
    /// Latest status.
    #[must_use]
    pub fn status(&self) -> HealthStatus {
        self.snapshot.borrow().status
    }

    /// Latest snapshot.
    #[must_use]
    pub fn snapshot(&self) -> HealthSnapshot {
        self.snapshot.borrow().clone()
    }

    /// Subscribes to snapshot changes; one notification per completed poll.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<HealthSnapshot> {
        self.snapshot.clone()
    }

    /// Stops polling. No poll starts after this returns; one in flight is
    /// abandoned.
    pub async fn stop(mut self) {
        self.token.cancel();
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                warn!(error = %e, "health task ended abnormally");
            }
        }
    }
}

impl Drop for HealthHandle {
    fn drop(&mut self) {
        self.token.cancel();
    }
}
