//! Live fan-out of inbound traffic to secondary destinations
//!
//! Contract: best-effort, fire-and-forget. Every (message, target) pair is
//! its own spawned task carrying a verbatim copy of the inbound message.
//! There is no retry and no ordering between targets, or between a forward
//! and the corresponding recorded event. A failed send is logged against
//! its target and affects nothing else.

use std::fmt;
use std::sync::Arc;

use rosc::OscMessage;
use tracing::{debug, warn};

use crate::transport::{MessageSink, TransportError, UdpSender};

/// One forwarding endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepeaterTarget {
    pub host: String,
    pub port: u16,
}

impl fmt::Display for RepeaterTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

/// Parse a comma-separated port list.
///
/// Invalid entries are warned about and skipped individually.
pub fn parse_repeater_ports(list: &str) -> Vec<u16> {
    if list.trim().is_empty() {
        return Vec::new();
    }

    list.split(',')
        .map(str::trim)
        .filter_map(|entry| match entry.parse::<u16>() {
            Ok(0) | Err(_) => {
                warn!("Invalid repeater port: {:?}", entry);
                None
            }
            Ok(port) => Some(port),
        })
        .collect()
}

/// Forwards inbound messages to every configured target.
#[derive(Clone, Default)]
pub struct RepeaterFanout {
    targets: Vec<(RepeaterTarget, Arc<dyn MessageSink>)>,
}

impl RepeaterFanout {
    pub fn new(targets: Vec<(RepeaterTarget, Arc<dyn MessageSink>)>) -> Self {
        Self { targets }
    }

    /// Open one UDP sender per port on `host`.
    pub async fn connect(host: &str, ports: &[u16]) -> Result<Self, TransportError> {
        let mut targets: Vec<(RepeaterTarget, Arc<dyn MessageSink>)> =
            Vec::with_capacity(ports.len());
        for &port in ports {
            let sender = UdpSender::connect(host, port).await?;
            targets.push((
                RepeaterTarget {
                    host: host.to_string(),
                    port,
                },
                Arc::new(sender),
            ));
        }
        Ok(Self { targets })
    }

    pub fn targets(&self) -> impl Iterator<Item = &RepeaterTarget> {
        self.targets.iter().map(|(target, _)| target)
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }

    /// Spawn one send per target and return immediately.
    ///
    /// Must be called from within a tokio runtime.
    pub fn forward(&self, msg: &OscMessage) {
        for (target, sink) in &self.targets {
            let target = target.clone();
            let sink = Arc::clone(sink);
            let msg = msg.clone();
            tokio::spawn(async move {
                let addr = msg.addr.clone();
                match sink.send(msg).await {
                    Ok(()) => debug!(%target, %addr, "forwarded"),
                    Err(e) => warn!(%target, %addr, "repeater send failed: {}", e),
                }
            });
        }
    }
}

impl fmt::Debug for RepeaterFanout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.targets()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FailingSink, MemorySink};
    use rosc::OscType;
    use std::time::Duration;

    fn target(port: u16) -> RepeaterTarget {
        RepeaterTarget {
            host: "127.0.0.1".to_string(),
            port,
        }
    }

    #[test]
    fn test_parse_ports() {
        assert_eq!(parse_repeater_ports("9001, 9002,9003"), vec![9001, 9002, 9003]);
    }

    #[test]
    fn test_parse_skips_invalid_entries() {
        assert_eq!(parse_repeater_ports("9001,abc,,70000,0, 9002"), vec![9001, 9002]);
    }

    #[test]
    fn test_parse_empty() {
        assert!(parse_repeater_ports("").is_empty());
        assert!(parse_repeater_ports("  ").is_empty());
    }

    #[tokio::test]
    async fn test_forward_sends_verbatim_copy_to_each_target() {
        let a = Arc::new(MemorySink::default());
        let b = Arc::new(MemorySink::default());
        let fanout = RepeaterFanout::new(vec![
            (target(1), a.clone() as Arc<dyn MessageSink>),
            (target(2), b.clone() as Arc<dyn MessageSink>),
        ]);

        let msg = OscMessage {
            addr: "/dirt/play".to_string(),
            args: vec![OscType::String("s".into()), OscType::Float(1.0)],
        };
        fanout.forward(&msg);

        let got_a = a.wait_for(1, Duration::from_secs(1)).await;
        let got_b = b.wait_for(1, Duration::from_secs(1)).await;
        assert_eq!(got_a, vec![msg.clone()]);
        assert_eq!(got_b, vec![msg]);
    }

    #[tokio::test]
    async fn test_failing_target_does_not_affect_others() {
        let good = Arc::new(MemorySink::default());
        let fanout = RepeaterFanout::new(vec![
            (target(1), Arc::new(FailingSink) as Arc<dyn MessageSink>),
            (target(2), good.clone() as Arc<dyn MessageSink>),
        ]);

        for i in 0..3 {
            fanout.forward(&OscMessage {
                addr: format!("/n/{}", i),
                args: vec![],
            });
        }

        let got = good.wait_for(3, Duration::from_secs(1)).await;
        assert_eq!(got.len(), 3);
    }

    #[tokio::test]
    async fn test_empty_fanout_is_noop() {
        let fanout = RepeaterFanout::default();
        assert!(fanout.is_empty());
        fanout.forward(&OscMessage {
            addr: "/x".to_string(),
            args: vec![],
        });
    }
}
