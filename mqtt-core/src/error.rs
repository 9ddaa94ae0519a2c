use thiserror::Error;

/// Failure modes of the packet codec (§4.A / §7 of the design).
///
/// The codec never allocates or performs I/O; every variant here is
/// reported synchronously from `encode`/`decode`.
#[derive(Debug, Error, Eq, PartialEq, Clone)]
pub enum CodecError {
    /// The caller-provided buffer cannot hold the serialized packet.
    #[error("buffer too short: need {needed} bytes, have {available}")]
    BufferTooShort { needed: usize, available: usize },

    /// The fixed header or a field within the packet could not be parsed.
    #[error("malformed packet: {0}")]
    MalformedPacket(&'static str),

    /// A remaining-length varint used more than 4 bytes.
    #[error("remaining length varint exceeds 4 bytes")]
    InvalidRemainingLength,

    /// A length-prefixed string or binary field exceeded the 16-bit prefix's
    /// range; encoding it would silently truncate the length and corrupt the
    /// wire frame.
    #[error("string or binary field of {0} bytes exceeds the 16-bit length prefix")]
    StringTooLong(usize),

    /// The fixed header named a packet type this codec does not know.
    #[error("unsupported packet type {0}")]
    UnsupportedPacketType(u8),

    /// A field held a value that is well-formed but forbidden by the protocol,
    /// e.g. an unacceptable CONNACK return code.
    #[error("protocol violation: {0}")]
    ProtocolViolation(&'static str),
}
