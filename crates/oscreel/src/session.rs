//! Recording session state
//!
//! A [`Session`] owns the start instant, the quantization flag and the
//! append-only event log. All mutation happens under one mutex so the
//! quantized "first event resets the clock" step cannot race with a
//! concurrent append, and the shutdown snapshot never sees a torn log.

use std::sync::{Mutex, MutexGuard};
use std::time::Instant;

use serde::{Deserialize, Serialize};

use crate::argument::Argument;

/// One recorded message, as persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordedEvent {
    /// Seconds since session start.
    pub time: f64,
    pub address: String,
    pub data: Argument,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    #[error("session is closed; no further events are accepted")]
    Closed,
}

#[derive(Debug)]
struct SessionLog {
    start: Instant,
    events: Vec<RecordedEvent>,
    closed: bool,
}

/// A single recording session.
#[derive(Debug)]
pub struct Session {
    quantized: bool,
    log: Mutex<SessionLog>,
}

impl Session {
    /// Start a session now.
    pub fn new(quantized: bool) -> Self {
        Self::starting_at(Instant::now(), quantized)
    }

    fn starting_at(start: Instant, quantized: bool) -> Self {
        Self {
            quantized,
            log: Mutex::new(SessionLog {
                start,
                events: Vec::new(),
                closed: false,
            }),
        }
    }

    pub fn is_quantized(&self) -> bool {
        self.quantized
    }

    /// Record an event timestamped relative to the session start.
    ///
    /// When quantized, the first event moves the start to its own arrival,
    /// so it is always recorded at `0.0`.
    pub fn append(
        &self,
        address: impl Into<String>,
        data: Argument,
    ) -> Result<RecordedEvent, SessionError> {
        let mut log = self.lock();
        // Read the clock under the lock so times are monotonic in log order
        let now = Instant::now();
        Self::append_locked(&mut log, self.quantized, now, address.into(), data)
    }

    fn append_locked(
        log: &mut SessionLog,
        quantized: bool,
        now: Instant,
        address: String,
        data: Argument,
    ) -> Result<RecordedEvent, SessionError> {
        if log.closed {
            return Err(SessionError::Closed);
        }

        if quantized && log.events.is_empty() {
            log.start = now;
        }
        let time = now.saturating_duration_since(log.start).as_secs_f64();

        let event = RecordedEvent {
            time,
            address,
            data,
        };
        log.events.push(event.clone());
        Ok(event)
    }

    pub fn len(&self) -> usize {
        self.lock().events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().events.is_empty()
    }

    /// Copy of the log as it stands.
    pub fn snapshot(&self) -> Vec<RecordedEvent> {
        self.lock().events.clone()
    }

    /// Seal the session and hand out its log.
    ///
    /// Only the first call returns the events; any later call (a second
    /// shutdown signal, say) gets `None`.
    pub fn close(&self) -> Option<Vec<RecordedEvent>> {
        let mut log = self.lock();
        if log.closed {
            return None;
        }
        log.closed = true;
        Some(log.events.clone())
    }

    fn lock(&self) -> MutexGuard<'_, SessionLog> {
        // Append-only: a panic mid-append cannot leave the log half-written
        self.log.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;
    use std::time::Duration;

    fn append_at(session: &Session, now: Instant, address: &str) -> RecordedEvent {
        let mut log = session.lock();
        Session::append_locked(&mut log, session.quantized, now, address.to_string(), Argument::Null)
            .unwrap()
    }

    #[test]
    fn test_quantized_first_event_is_zero() {
        let start = Instant::now();
        let session = Session::starting_at(start, true);

        let first = append_at(&session, start + Duration::from_secs(3), "/a");
        assert_eq!(first.time, 0.0);
    }

    #[test]
    fn test_quantized_gap_is_relative_to_first_event() {
        let start = Instant::now();
        let session = Session::starting_at(start, true);

        append_at(&session, start + Duration::from_secs(2), "/a");
        let second = append_at(&session, start + Duration::from_millis(2500), "/b");

        assert!((second.time - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_unquantized_keeps_startup_offset() {
        let start = Instant::now();
        let session = Session::starting_at(start, false);

        let first = append_at(&session, start + Duration::from_millis(1250), "/a");
        assert!((first.time - 1.25).abs() < 1e-9);
    }

    #[test]
    fn test_unquantized_wall_clock_delay() {
        let session = Session::new(false);
        thread::sleep(Duration::from_millis(100));
        let first = session.append("/a", Argument::Null).unwrap();

        assert!(first.time >= 0.1);
        assert!(first.time < 0.15, "recorded {}", first.time);
    }

    #[test]
    fn test_quantized_wall_clock() {
        let session = Session::new(true);
        thread::sleep(Duration::from_millis(100));
        let first = session.append("/a", 1.into()).unwrap();
        thread::sleep(Duration::from_millis(500));
        let second = session.append("/b", 2.into()).unwrap();

        assert_eq!(first.time, 0.0);
        assert!((second.time - 0.5).abs() < 0.05, "recorded {}", second.time);
    }

    #[test]
    fn test_events_keep_arrival_order() {
        let session = Session::new(false);
        for i in 0..10 {
            session.append(format!("/n/{}", i), Argument::Int(i)).unwrap();
        }

        let events = session.snapshot();
        assert_eq!(events.len(), 10);
        for (i, event) in events.iter().enumerate() {
            assert_eq!(event.address, format!("/n/{}", i));
        }
        assert!(events.windows(2).all(|w| w[0].time <= w[1].time));
    }

    #[test]
    fn test_concurrent_appends_single_zero() {
        let session = Arc::new(Session::new(true));
        thread::sleep(Duration::from_millis(20));

        let handles: Vec<_> = (0..8)
            .map(|t| {
                let session = Arc::clone(&session);
                thread::spawn(move || {
                    for i in 0..50 {
                        session
                            .append(format!("/t{}/{}", t, i), Argument::Null)
                            .unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let events = session.snapshot();
        assert_eq!(events.len(), 400);
        assert_eq!(events[0].time, 0.0);
        // Times are taken under the lock, so the log is already sorted
        assert!(events.windows(2).all(|w| w[0].time <= w[1].time));
        assert!(events.iter().all(|e| e.time < 5.0));
    }

    #[test]
    fn test_close_is_one_shot() {
        let session = Session::new(false);
        session.append("/a", Argument::Null).unwrap();

        let events = session.close().unwrap();
        assert_eq!(events.len(), 1);
        assert!(session.close().is_none());
    }

    #[test]
    fn test_append_after_close_fails() {
        let session = Session::new(false);
        session.close();
        assert_eq!(
            session.append("/late", Argument::Null),
            Err(SessionError::Closed)
        );
        assert!(session.is_empty());
    }
}
