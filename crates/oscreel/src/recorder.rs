//! The live recording service
//!
//! Per inbound message: convert the arguments, apply the scheme, append to
//! the session, then hand the untouched message to the repeaters. The
//! session lock covers only the append; forwarding happens outside it.

use std::sync::Arc;

use rosc::OscMessage;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::argument::Argument;
use crate::persist::{PersistError, PersistenceSink};
use crate::repeater::RepeaterFanout;
use crate::scheme::Scheme;
use crate::session::{RecordedEvent, Session};
use crate::transport::{OscListener, TransportError};

/// Result of [`Recorder::finalize`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FinalizeOutcome {
    /// The log was written; this many events.
    Flushed(usize),
    /// An earlier call already took the log.
    AlreadyFinalized,
}

#[derive(Debug)]
pub struct Recorder {
    scheme: Scheme,
    session: Arc<Session>,
    fanout: RepeaterFanout,
}

impl Recorder {
    pub fn new(scheme: Scheme, session: Arc<Session>, fanout: RepeaterFanout) -> Self {
        Self {
            scheme,
            session,
            fanout,
        }
    }

    pub fn scheme(&self) -> Scheme {
        self.scheme
    }

    pub fn session(&self) -> &Arc<Session> {
        &self.session
    }

    /// Record one inbound message and forward it.
    ///
    /// Returns `None` once the session is closed; the message is still
    /// forwarded.
    pub fn handle(&self, msg: OscMessage) -> Option<RecordedEvent> {
        let args = Argument::from_wire_args(&msg.args);
        let transformed = self.scheme.transform(&msg.addr, &args);

        let recorded = match self.session.append(transformed.address, transformed.data) {
            Ok(event) => {
                info!("[{:.4}] {} => {}", event.time, event.address, event.data);
                Some(event)
            }
            Err(e) => {
                warn!("Dropped {}: {}", msg.addr, e);
                None
            }
        };

        self.fanout.forward(&msg);
        recorded
    }

    /// Receive and record until `shutdown` is cancelled.
    ///
    /// Undecodable datagrams are logged and skipped; socket errors end the
    /// loop.
    pub async fn serve(
        &self,
        mut listener: OscListener,
        shutdown: CancellationToken,
    ) -> Result<(), TransportError> {
        loop {
            let received = tokio::select! {
                _ = shutdown.cancelled() => {
                    debug!("Recorder loop stopping");
                    return Ok(());
                }
                received = listener.recv() => received,
            };

            match received {
                Ok(messages) => {
                    for msg in messages {
                        self.handle(msg);
                    }
                }
                Err(e @ TransportError::Decode { .. }) => warn!("{}", e),
                Err(e) => return Err(e),
            }
        }
    }

    /// Close the session and write it out.
    ///
    /// Only the first call writes; later calls report
    /// [`FinalizeOutcome::AlreadyFinalized`].
    pub fn finalize(&self, sink: &PersistenceSink) -> Result<FinalizeOutcome, PersistError> {
        match self.session.close() {
            Some(events) => sink.flush(&events).map(FinalizeOutcome::Flushed),
            None => Ok(FinalizeOutcome::AlreadyFinalized),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repeater::RepeaterTarget;
    use crate::testing::MemorySink;
    use crate::transport::MessageSink;
    use rosc::OscType;
    use std::time::Duration;
    use tempfile::TempDir;

    fn dirt_play(args: Vec<OscType>) -> OscMessage {
        OscMessage {
            addr: "/dirt/play".to_string(),
            args,
        }
    }

    #[tokio::test]
    async fn test_handle_records_transformed_and_forwards_original() {
        let repeater = Arc::new(MemorySink::default());
        let fanout = RepeaterFanout::new(vec![(
            RepeaterTarget {
                host: "127.0.0.1".to_string(),
                port: 9,
            },
            repeater.clone() as Arc<dyn MessageSink>,
        )]);
        let recorder = Recorder::new(Scheme::DirtStrip, Arc::new(Session::new(true)), fanout);

        let msg = dirt_play(vec![
            OscType::String("a".into()),
            OscType::Int(1),
            OscType::String("b".into()),
            OscType::Int(2),
            OscType::String("c".into()),
            OscType::Int(3),
        ]);
        let event = recorder.handle(msg.clone()).unwrap();

        assert_eq!(event.time, 0.0);
        assert_eq!(
            event.data,
            Argument::List(vec![1.into(), 2.into(), 3.into()])
        );
        assert_eq!(repeater.wait_for(1, Duration::from_secs(1)).await, vec![msg]);
    }

    #[tokio::test]
    async fn test_finalize_is_one_shot() {
        let dir = TempDir::new().unwrap();
        let sink = PersistenceSink::new(dir.path().join("out.json"));
        let recorder = Recorder::new(
            Scheme::Basic,
            Arc::new(Session::new(false)),
            RepeaterFanout::default(),
        );

        recorder.handle(dirt_play(vec![OscType::Int(1)]));
        recorder.handle(dirt_play(vec![OscType::Int(2)]));

        assert_eq!(recorder.finalize(&sink).unwrap(), FinalizeOutcome::Flushed(2));
        assert_eq!(
            recorder.finalize(&sink).unwrap(),
            FinalizeOutcome::AlreadyFinalized
        );
        // Late arrivals are not recorded after the flush
        assert!(recorder.handle(dirt_play(vec![])).is_none());
        assert_eq!(crate::persist::load(sink.path()).unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_finalize_reports_write_failure() {
        let dir = TempDir::new().unwrap();
        let sink = PersistenceSink::new(dir.path().join("missing/out.json"));
        let recorder = Recorder::new(
            Scheme::Basic,
            Arc::new(Session::new(false)),
            RepeaterFanout::default(),
        );

        assert!(recorder.finalize(&sink).is_err());
    }

    #[tokio::test]
    async fn test_serve_stops_on_shutdown() {
        let listener = OscListener::bind("127.0.0.1", 0).await.unwrap();
        let recorder = Recorder::new(
            Scheme::Basic,
            Arc::new(Session::new(false)),
            RepeaterFanout::default(),
        );
        let token = CancellationToken::new();
        token.cancel();

        recorder.serve(listener, token).await.unwrap();
    }
}
