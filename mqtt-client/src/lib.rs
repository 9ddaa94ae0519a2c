//! MQTT 3.1.1 device client core.
//!
//! Builds a long-lived, authenticated, keep-alive-driven session with a
//! broker on top of [`mqtt_core`]'s wire codec: the connect/keep-alive/
//! reconnect state machine, concurrent ACK bookkeeping against a single
//! serialized write path, timeout and duplicate-delivery handling, and
//! subscription re-registration across reconnects. See [`Client`] for the
//! entry point.

mod client;
mod dedup;
mod error;
mod event;
mod idgen;
mod options;
mod pending;
mod session;
mod subscription;
mod timer;
mod transport;

pub use client::Client;
pub use error::{Error, YieldStatus};
pub use event::{Event, Message};
pub use options::{
    ClientOptions, PublishOptions, DEFAULT_COMMAND_TIMEOUT, DEFAULT_KEEP_ALIVE,
    MAX_COMMAND_TIMEOUT_MS, MAX_DUPLICATE_RING, MAX_PENDING_ACKS, MAX_RECONNECT_WAIT,
    MAX_SUBSCRIPTIONS, MIN_COMMAND_TIMEOUT_MS, MIN_RECONNECT_WAIT, PING_RETRY_TIMES,
};
pub use subscription::topic_matches;
pub use transport::{ReadOutcome, TcpTransport, Transport};

pub use mqtt_core::QoS;
