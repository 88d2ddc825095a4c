//! Timed replay of a recorded session
//!
//! Events are sent strictly one at a time in file order. Each one is due
//! at `(time - first_time) / speed` after replay start; the scheduler
//! sleeps until then, or sends immediately if it is already late. Late
//! events are never dropped and the file is not re-sorted.
//!
//! Timing uses `tokio::time`, so tests can drive it on a paused clock.

use std::sync::Arc;
use std::time::Duration;

use rosc::OscMessage;
use tokio::sync::watch;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::session::RecordedEvent;
use crate::transport::MessageSink;

/// Longest wait the scheduler will schedule (about 30 years). Offsets past
/// this, from huge recorded times or tiny speed factors, are clamped to it.
pub const MAX_OFFSET: Duration = Duration::from_secs(86400 * 365 * 30);

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ReplayError {
    #[error("speed factor must be a positive finite number, got {0}")]
    InvalidSpeed(f64),
}

/// Playback rate: 2.0 is twice as fast, 0.5 half as fast.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpeedFactor(f64);

impl SpeedFactor {
    pub fn new(factor: f64) -> Result<Self, ReplayError> {
        if factor.is_finite() && factor > 0.0 {
            Ok(Self(factor))
        } else {
            Err(ReplayError::InvalidSpeed(factor))
        }
    }

    pub fn get(&self) -> f64 {
        self.0
    }

    /// Wall-clock offset for a recorded offset in seconds, clamped to
    /// `[0, MAX_OFFSET]`.
    pub fn scale(&self, recorded_seconds: f64) -> Duration {
        let seconds = (recorded_seconds / self.0).max(0.0);
        Duration::try_from_secs_f64(seconds)
            .unwrap_or(MAX_OFFSET)
            .min(MAX_OFFSET)
    }
}

impl Default for SpeedFactor {
    fn default() -> Self {
        Self(1.0)
    }
}

/// Where the scheduler is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplayState {
    Loaded,
    /// Waiting for event `i` to come due.
    Scheduling(usize),
    /// Event `i` was handed to the sink (successfully or not).
    Sent(usize),
    Completed,
    Cancelled,
}

/// Outcome of a replay run.
#[derive(Debug, Clone, PartialEq)]
pub struct ReplayReport {
    pub sent: usize,
    pub failed: usize,
    pub elapsed: Duration,
    pub cancelled: bool,
}

pub struct ReplayScheduler {
    sink: Arc<dyn MessageSink>,
    speed: SpeedFactor,
    cancel: CancellationToken,
    state: watch::Sender<ReplayState>,
}

impl ReplayScheduler {
    pub fn new(sink: Arc<dyn MessageSink>, speed: SpeedFactor) -> Self {
        let (state, _) = watch::channel(ReplayState::Loaded);
        Self {
            sink,
            speed,
            cancel: CancellationToken::new(),
            state,
        }
    }

    /// Stop replay early when `token` is cancelled.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn speed(&self) -> SpeedFactor {
        self.speed
    }

    pub fn subscribe(&self) -> watch::Receiver<ReplayState> {
        self.state.subscribe()
    }

    pub fn state(&self) -> ReplayState {
        *self.state.borrow()
    }

    /// Replay `events` to the sink, returning once every event has been
    /// sent or the cancellation token fires.
    pub async fn run(&self, events: &[RecordedEvent]) -> ReplayReport {
        self.state.send_replace(ReplayState::Loaded);

        let start = Instant::now();
        let mut report = ReplayReport {
            sent: 0,
            failed: 0,
            elapsed: Duration::ZERO,
            cancelled: false,
        };

        let Some(first) = events.first() else {
            info!("No messages to replay");
            self.state.send_replace(ReplayState::Completed);
            return report;
        };
        let first_time = first.time;

        for (i, event) in events.iter().enumerate() {
            if self.cancel.is_cancelled() {
                report.cancelled = true;
                break;
            }
            self.state.send_replace(ReplayState::Scheduling(i));

            match start.checked_add(self.speed.scale(event.time - first_time)) {
                Some(due) if due > Instant::now() => {
                    tokio::select! {
                        _ = tokio::time::sleep_until(due) => {}
                        _ = self.cancel.cancelled() => {
                            report.cancelled = true;
                            break;
                        }
                    }
                }
                Some(_) => {}
                // Past the end of the clock: never due, only cancellation ends it
                None => {
                    self.cancel.cancelled().await;
                    report.cancelled = true;
                    break;
                }
            }

            let msg = OscMessage {
                addr: event.address.clone(),
                args: event.data.to_wire_args(),
            };
            match self.sink.send(msg).await {
                Ok(()) => {
                    report.sent += 1;
                    info!("[{:.4}] Sent -> {} {}", event.time, event.address, event.data);
                }
                Err(e) => {
                    report.failed += 1;
                    warn!("Failed to send {} (event {}): {}", event.address, i, e);
                }
            }
            self.state.send_replace(ReplayState::Sent(i));
        }

        report.elapsed = start.elapsed();
        if report.cancelled {
            info!(
                "Replay cancelled after {} of {} messages",
                report.sent + report.failed,
                events.len()
            );
            self.state.send_replace(ReplayState::Cancelled);
        } else {
            info!(
                "Replay completed: {} sent, {} failed in {:.3}s",
                report.sent,
                report.failed,
                report.elapsed.as_secs_f64()
            );
            self.state.send_replace(ReplayState::Completed);
        }
        report
    }
}
