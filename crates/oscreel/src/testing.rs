//! In-memory sinks for driving send paths in tests.

use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use rosc::OscMessage;
use tokio::sync::Notify;
use tokio::time::Instant;

use crate::transport::{MessageSink, TransportError};

/// Collects every message with the (tokio) instant it arrived.
#[derive(Default)]
pub struct MemorySink {
    sent: Mutex<Vec<(Instant, OscMessage)>>,
    notify: Notify,
}

impl MemorySink {
    pub fn messages(&self) -> Vec<OscMessage> {
        self.sent.lock().unwrap().iter().map(|(_, m)| m.clone()).collect()
    }

    pub fn instants(&self) -> Vec<Instant> {
        self.sent.lock().unwrap().iter().map(|(t, _)| *t).collect()
    }

    /// Wait until at least `count` messages arrived or `timeout` passes.
    pub async fn wait_for(&self, count: usize, timeout: Duration) -> Vec<OscMessage> {
        let deadline = Instant::now() + timeout;
        loop {
            let notified = self.notify.notified();
            if self.sent.lock().unwrap().len() >= count {
                return self.messages();
            }
            if tokio::time::timeout_at(deadline, notified).await.is_err() {
                return self.messages();
            }
        }
    }
}

#[async_trait]
impl MessageSink for MemorySink {
    async fn send(&self, msg: OscMessage) -> Result<(), TransportError> {
        self.sent.lock().unwrap().push((Instant::now(), msg));
        self.notify.notify_one();
        Ok(())
    }
}

/// Fails every send.
pub struct FailingSink;

#[async_trait]
impl MessageSink for FailingSink {
    async fn send(&self, _msg: OscMessage) -> Result<(), TransportError> {
        Err(TransportError::Io(std::io::Error::new(
            std::io::ErrorKind::ConnectionRefused,
            "refused",
        )))
    }
}

/// Fails the sends whose address is in `fail_addrs`, records the rest.
pub struct FlakySink {
    pub inner: MemorySink,
    pub fail_addrs: Vec<String>,
}

#[async_trait]
impl MessageSink for FlakySink {
    async fn send(&self, msg: OscMessage) -> Result<(), TransportError> {
        if self.fail_addrs.contains(&msg.addr) {
            return FailingSink.send(msg).await;
        }
        self.inner.send(msg).await
    }
}
