use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use snafu::OptionExt;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::error::{PollerTransitionSnafu, RefreshFailedSnafu, SyncResult};
use crate::resolver::BoxFuture;

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(2_000);

/// SDK capability that re-fetches the thread and writes the result into shared state.
pub trait ThreadClient: Send + Sync {
    fn refresh_thread<'a>(&'a self) -> BoxFuture<'a, SyncResult<()>>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollerState {
    Idle,
    Running,
    /// Terminal; a remounted view builds a new poller.
    Stopped,
}

/// Fixed-interval thread refresh owned by the chat screen's lifetime.
pub struct ThreadPoller {
    client: Arc<dyn ThreadClient>,
    interval: Duration,
    refresh_timeout: Duration,
    state: PollerState,
    cancel: CancellationToken,
    task: Option<JoinHandle<()>>,
}

impl ThreadPoller {
    pub fn new(client: Arc<dyn ThreadClient>) -> Self {
        Self::with_interval(client, DEFAULT_POLL_INTERVAL)
    }

    /// The refresh timeout defaults to one interval.
    pub fn with_interval(client: Arc<dyn ThreadClient>, interval: Duration) -> Self {
        Self {
            client,
            interval,
            refresh_timeout: interval,
            state: PollerState::Idle,
            cancel: CancellationToken::new(),
            task: None,
        }
    }

    pub fn state(&self) -> PollerState {
        self.state
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Bounds each refresh; an expired refresh is abandoned and logged as a failure.
    pub fn with_refresh_timeout(mut self, refresh_timeout: Duration) -> Self {
        self.refresh_timeout = refresh_timeout;
        self
    }

    pub fn refresh_timeout(&self) -> Duration {
        self.refresh_timeout
    }

    /// Spawns the ticking task; the first refresh fires one full interval from now.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(&mut self) -> SyncResult<()> {
        if self.state != PollerState::Idle {
            return PollerTransitionSnafu {
                stage: "poller-start",
                from: self.state,
            }
            .fail();
        }

        let task = tokio::spawn(run_poll_loop(
            self.client.clone(),
            self.interval,
            self.refresh_timeout,
            self.cancel.clone(),
        ));
        self.task = Some(task);
        self.state = PollerState::Running;
        tracing::debug!(
            interval_ms = self.interval.as_millis() as u64,
            "thread poller started"
        );
        Ok(())
    }

    /// Cancels the timer and any in-flight refresh. Safe to call repeatedly or before `start`.
    pub fn stop(&mut self) {
        if self.state == PollerState::Stopped {
            return;
        }

        self.cancel.cancel();
        if let Some(task) = self.task.take() {
            task.abort();
        }
        tracing::debug!(from = ?self.state, "thread poller stopped");
        self.state = PollerState::Stopped;
    }
}

impl Drop for ThreadPoller {
    fn drop(&mut self) {
        self.stop();
    }
}

async fn run_poll_loop(
    client: Arc<dyn ThreadClient>,
    interval: Duration,
    refresh_timeout: Duration,
    cancel: CancellationToken,
) {
    let mut ticker = tokio::time::interval_at(Instant::now() + interval, interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            _ = ticker.tick() => {}
        }

        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            result = bounded_refresh(client.as_ref(), refresh_timeout) => {
                // Failures belong to the SDK's error surface; keep ticking regardless.
                if let Err(error) = result {
                    tracing::warn!(error = %error, "thread refresh failed");
                }
            }
        }
    }
}

async fn bounded_refresh(client: &dyn ThreadClient, refresh_timeout: Duration) -> SyncResult<()> {
    tokio::time::timeout(refresh_timeout, client.refresh_thread())
        .await
        .ok()
        .context(RefreshFailedSnafu {
            stage: "refresh-thread-timeout",
            details: format!("no response within {}ms", refresh_timeout.as_millis()),
        })?
}
