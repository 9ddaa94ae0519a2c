use thiserror::Error;

use mqtt_core::CodecError;

/// Failure modes reported by the device client core (§7 of the design).
#[derive(Debug, Error)]
pub enum Error {
    /// A constructor or call argument was out of its documented range.
    #[error("invalid argument: {0}")]
    InvalidArgument(&'static str),

    /// A fixed-capacity table (subscriptions, pending-ACK list) is full.
    #[error("resource exhausted: {0}")]
    ResourceExhausted(&'static str),

    /// The write buffer cannot hold the serialized packet.
    #[error("buffer too short")]
    BufferTooShort(#[source] CodecError),

    /// A packet from the broker failed to decode.
    #[error("malformed packet")]
    MalformedPacket(#[source] CodecError),

    /// A packet decoded but held a value the protocol forbids.
    #[error("protocol violation")]
    ProtocolViolation(#[source] CodecError),

    /// A fatal I/O failure on the current session. Triggers reconnect.
    #[error("transport failure")]
    TransportFailure(#[source] std::io::Error),

    /// The operation requires an active session.
    #[error("not connected")]
    NotConnected,

    /// A pending ACK expired without a matching response.
    #[error("ack timeout for packet id {0}")]
    AckTimeout(u16),
}

impl From<CodecError> for Error {
    fn from(err: CodecError) -> Self {
        match err {
            CodecError::BufferTooShort { .. } => Error::BufferTooShort(err),
            CodecError::ProtocolViolation(_) => Error::ProtocolViolation(err),
            _ => Error::MalformedPacket(err),
        }
    }
}

/// Non-error control-flow outcomes of a single [`crate::Client::yield_once`] call.
///
/// `AttemptingReconnect` and `Reconnected` are informational per §7: the
/// caller's main loop should `continue` on either, not treat them as failure.
#[derive(Debug, Eq, PartialEq, Clone, Copy)]
pub enum YieldStatus {
    /// Nothing to report; the loop read no packet and no timer fired.
    Idle,
    /// At least one packet was read and dispatched, or a timer action ran.
    Progressed,
    /// The session is down and a reconnect attempt is in flight or was just made.
    AttemptingReconnect,
    /// A new session was just established after a prior disconnect.
    Reconnected,
}
