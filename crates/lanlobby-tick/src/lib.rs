//! Fixed-rate poll driver for LAN lobbies.
//!
//! A beacon has no threads of its own: somebody has to call its tick
//! periodically so it drains datagrams and counts down search timeouts.
//! This crate is that somebody.
//!
//! - [`PollScheduler`]: waits for the next poll at a fixed rate and reports
//!   the *measured* elapsed time since the previous one.
//! - [`Pollable`]: anything with a `poll_tick(dt)`.
//! - [`spawn_poll_loop`]: runs a scheduler against a shared [`Pollable`] on
//!   a tokio task until the returned [`PollHandle`] is shut down or dropped.
//!
//! # Why measured `dt`
//!
//! Search timeouts are wall-clock deadlines. If a poll fires late, the
//! countdown must see the real gap, not the nominal period, or a slow
//! machine would stretch every search.
//!
//! ```ignore
//! let lobby = Arc::new(LanSessionInterface::new(factory, config, caps));
//! let handle = spawn_poll_loop(Arc::clone(&lobby), PollConfig::default());
//! // ... use the lobby from other tasks ...
//! handle.shutdown().await;
//! ```

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant};
use tracing::{debug, trace, warn};

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Poll rate configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollConfig {
    /// Polls per second. Clamped to `1..=MAX_RATE_HZ`.
    pub rate_hz: u32,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self { rate_hz: 20 }
    }
}

impl PollConfig {
    /// Maximum supported poll rate.
    pub const MAX_RATE_HZ: u32 = 128;

    pub fn with_rate(rate_hz: u32) -> Self {
        Self { rate_hz }
    }

    /// Clamp the rate into the supported range.
    ///
    /// Called automatically by [`PollScheduler::new`]. A rate of 0 would
    /// never poll, which would leave searches hanging forever, so it becomes 1.
    pub fn validated(mut self) -> Self {
        let clamped = self.rate_hz.clamp(1, Self::MAX_RATE_HZ);
        if clamped != self.rate_hz {
            warn!(rate = self.rate_hz, clamped, "poll rate out of range, clamping");
            self.rate_hz = clamped;
        }
        self
    }

    /// Nominal interval between polls.
    pub fn period(&self) -> Duration {
        Duration::from_secs_f64(1.0 / self.rate_hz.max(1) as f64)
    }
}

// ---------------------------------------------------------------------------
// Scheduler
// ---------------------------------------------------------------------------

/// Information about one poll, returned by [`PollScheduler::wait_for_poll`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollInfo {
    /// Monotonically increasing poll number (starts at 1).
    pub poll: u64,
    /// Time actually elapsed since the previous poll (or since the scheduler
    /// was created, for the first one).
    pub dt: Duration,
    /// `true` if this poll fired more than a tenth of a period late.
    pub overrun: bool,
}

/// Fixed-rate poll scheduler.
///
/// On overrun, the next poll is scheduled from *now*, never from the missed
/// deadline, so a stall doesn't turn into a burst of back-to-back polls.
#[derive(Debug)]
pub struct PollScheduler {
    period: Duration,
    poll_count: u64,
    next_poll: Instant,
    last_poll: Instant,
}

impl PollScheduler {
    pub fn new(config: PollConfig) -> Self {
        let config = config.validated();
        let period = config.period();
        let now = Instant::now();
        debug!(rate_hz = config.rate_hz, period_ms = period.as_secs_f64() * 1000.0, "poll scheduler created");
        Self {
            period,
            poll_count: 0,
            next_poll: now + period,
            last_poll: now,
        }
    }

    /// Wait until the next poll is due.
    pub async fn wait_for_poll(&mut self) -> PollInfo {
        time::sleep_until(self.next_poll).await;

        let now = Instant::now();
        let late_by = now.saturating_duration_since(self.next_poll);
        let overrun = late_by > self.period / 10;
        if overrun {
            warn!(
                poll = self.poll_count + 1,
                late_ms = late_by.as_secs_f64() * 1000.0,
                "poll overrun, rescheduling from now"
            );
            self.next_poll = now + self.period;
        } else {
            self.next_poll += self.period;
        }

        let dt = now.saturating_duration_since(self.last_poll);
        self.last_poll = now;
        self.poll_count += 1;
        trace!(poll = self.poll_count, dt_ms = dt.as_secs_f64() * 1000.0, "poll fired");

        PollInfo {
            poll: self.poll_count,
            dt,
            overrun,
        }
    }

    pub fn poll_count(&self) -> u64 {
        self.poll_count
    }

    pub fn period(&self) -> Duration {
        self.period
    }
}

// ---------------------------------------------------------------------------
// Poll loop
// ---------------------------------------------------------------------------

/// Something driven by the poll loop.
///
/// Takes `&self`: implementors are shared between the loop task and the
/// application, so they synchronize internally.
pub trait Pollable: Send + Sync + 'static {
    fn poll_tick(&self, dt: Duration);
}

/// Owns a running poll loop. Dropping it stops the loop.
#[derive(Debug)]
pub struct PollHandle {
    shutdown_tx: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<u64>>,
}

impl PollHandle {
    /// Stop the loop and wait for it to exit. Returns the number of polls run.
    pub async fn shutdown(mut self) -> u64 {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        match self.task.take() {
            Some(task) => task.await.unwrap_or(0),
            None => 0,
        }
    }

    /// Whether the loop task has exited.
    pub fn is_finished(&self) -> bool {
        self.task.as_ref().is_none_or(|t| t.is_finished())
    }
}

impl Drop for PollHandle {
    fn drop(&mut self) {
        // Closing the channel is enough: the loop treats a dropped sender as
        // a shutdown request.
        self.shutdown_tx.take();
    }
}

/// Spawn a tokio task that calls `target.poll_tick(dt)` at `config.rate_hz`.
///
/// Must be called from within a tokio runtime.
pub fn spawn_poll_loop<P: Pollable>(target: Arc<P>, config: PollConfig) -> PollHandle {
    let (shutdown_tx, mut shutdown_rx) = oneshot::channel::<()>();
    let mut scheduler = PollScheduler::new(config);

    let task = tokio::spawn(async move {
        loop {
            tokio::select! {
                _ = &mut shutdown_rx => break,
                info = scheduler.wait_for_poll() => target.poll_tick(info.dt),
            }
        }
        debug!(polls = scheduler.poll_count(), "poll loop stopped");
        scheduler.poll_count()
    });

    PollHandle {
        shutdown_tx: Some(shutdown_tx),
        task: Some(task),
    }
}
