//! oscreel: record live OSC traffic and replay it with its original timing
//!
//! Recording: every inbound message is passed through a [`Scheme`], appended
//! to a [`Session`] with its offset from session start, and copied verbatim
//! to any repeater ports. On shutdown the session is written once as JSON.
//!
//! Replay: a [`ReplayScheduler`] loads that JSON and re-sends each message
//! to a destination at its recorded offset, scaled by a [`SpeedFactor`].

pub mod argument;
pub mod persist;
pub mod recorder;
pub mod repeater;
pub mod replay;
pub mod scheme;
pub mod session;
pub mod settings;
pub mod shutdown;
pub mod telemetry;
pub mod transport;

#[cfg(test)]
mod testing;

pub use argument::Argument;
pub use persist::{load, PersistError, PersistenceSink};
pub use recorder::{FinalizeOutcome, Recorder};
pub use repeater::{parse_repeater_ports, RepeaterFanout, RepeaterTarget};
pub use replay::{ReplayError, ReplayReport, ReplayScheduler, ReplayState, SpeedFactor};
pub use scheme::{Scheme, Transformed, UnknownScheme};
pub use session::{RecordedEvent, Session, SessionError};
pub use settings::{RecordSettings, ReplaySettings, SettingsError};
pub use transport::{MessageSink, OscListener, TransportError, UdpSender};
