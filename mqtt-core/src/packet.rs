use derive_more::Display;
use num_enum::TryFromPrimitive;

/// MQTT Control Packets supported by this device-client core (3.1.1, QoS 0/1 only).
#[derive(Debug, PartialEq, Clone)]
pub enum Packet<'a> {
    /// Client request to connect to the server.
    Connect(Connect<'a>),
    /// Connect acknowledgment.
    ConnectAck(ConnectAck),
    /// Publish message.
    Publish(Publish<'a>),
    /// Publish acknowledgment (QoS 1).
    PublishAck(PublishAck),
    /// Client subscribe request.
    Subscribe(Subscribe<'a>),
    /// Subscribe acknowledgment.
    SubscribeAck(SubscribeAck),
    /// Unsubscribe request.
    Unsubscribe(Unsubscribe<'a>),
    /// Unsubscribe acknowledgment.
    UnsubscribeAck(UnsubscribeAck),
    /// PING request.
    PingRequest,
    /// PING response.
    PingResponse,
    /// Client is disconnecting.
    Disconnect,
}

/// Fixed header shared by every MQTT control packet.
#[derive(Debug, PartialEq, Clone, Copy)]
pub struct FixedHeader {
    pub packet_type: Type,
    pub packet_flags: u8,
    pub remaining_length: usize,
}

/// MQTT control packet type, carried in the top nibble of the first fixed-header byte.
#[repr(u8)]
#[derive(Debug, Eq, PartialEq, Copy, Clone, TryFromPrimitive)]
pub enum Type {
    CONNECT = 1,
    CONNACK = 2,
    PUBLISH = 3,
    PUBACK = 4,
    SUBSCRIBE = 8,
    SUBACK = 9,
    UNSUBSCRIBE = 10,
    UNSUBACK = 11,
    PINGREQ = 12,
    PINGRESP = 13,
    DISCONNECT = 14,
}

pub const PROTOCOL_NAME: &[u8] = b"MQTT";
pub const PROTOCOL_LEVEL: u8 = 4;

/// Delivery guarantee requested for a PUBLISH, or granted by a SUBACK.
#[repr(u8)]
#[derive(Debug, Clone, Copy, Eq, PartialEq, PartialOrd, Ord, Hash, TryFromPrimitive)]
pub enum QoS {
    /// At most once: fire-and-forget, no packet id, no acknowledgment.
    AtMostOnce = 0,
    /// At least once: carries a packet id and is acknowledged with PUBACK.
    AtLeastOnce = 1,
}

bitflags::bitflags! {
    /// Bits of the CONNECT variable header's connect-flags byte.
    #[derive(Default)]
    pub struct ConnectFlags: u8 {
        const USERNAME      = 0b1000_0000;
        const PASSWORD      = 0b0100_0000;
        const CLEAN_SESSION = 0b0000_0010;
    }
}

/// Client request to connect to the server.
#[derive(Debug, PartialEq, Clone)]
pub struct Connect<'a> {
    pub clean_session: bool,
    pub keep_alive: u16,
    pub client_id: &'a str,
    pub username: Option<&'a str>,
    pub password: Option<&'a [u8]>,
}

/// Connect acknowledgment.
#[derive(Debug, PartialEq, Clone, Copy)]
pub struct ConnectAck {
    pub session_present: bool,
    pub return_code: ConnectReturnCode,
}

/// Connect return code, as reported in CONNACK.
#[repr(u8)]
#[derive(Debug, Eq, PartialEq, Copy, Clone, TryFromPrimitive, Display)]
pub enum ConnectReturnCode {
    #[display(fmt = "connection accepted")]
    Accepted = 0,
    #[display(fmt = "unacceptable protocol version")]
    UnacceptableProtocolVersion = 1,
    #[display(fmt = "identifier rejected")]
    IdentifierRejected = 2,
    #[display(fmt = "server unavailable")]
    ServerUnavailable = 3,
    #[display(fmt = "bad user name or password")]
    BadUsernameOrPassword = 4,
    #[display(fmt = "not authorized")]
    NotAuthorized = 5,
}

/// Publish message.
#[derive(Debug, PartialEq, Clone)]
pub struct Publish<'a> {
    pub dup: bool,
    pub qos: QoS,
    pub retain: bool,
    pub topic_name: &'a str,
    /// Present iff `qos != AtMostOnce`.
    pub packet_id: Option<u16>,
    pub payload: &'a [u8],
}

/// Publish acknowledgment (QoS 1 only).
#[derive(Debug, PartialEq, Clone, Copy)]
pub struct PublishAck {
    pub packet_id: u16,
}

/// Client subscribe request: one or more (filter, requested QoS) pairs.
#[derive(Debug, PartialEq, Clone)]
pub struct Subscribe<'a> {
    pub packet_id: u16,
    pub topic_filters: Vec<(&'a str, QoS)>,
}

/// Per-filter outcome reported by SUBACK.
#[derive(Debug, Eq, PartialEq, Copy, Clone)]
pub enum SubscribeReturnCode {
    Success(QoS),
    Failure,
}

impl SubscribeReturnCode {
    pub const FAILURE_BYTE: u8 = 0x80;

    pub fn from_byte(b: u8) -> Result<Self, crate::CodecError> {
        match b {
            Self::FAILURE_BYTE => Ok(SubscribeReturnCode::Failure),
            0x00 => Ok(SubscribeReturnCode::Success(QoS::AtMostOnce)),
            0x01 => Ok(SubscribeReturnCode::Success(QoS::AtLeastOnce)),
            _ => Err(crate::CodecError::ProtocolViolation(
                "invalid granted-QoS byte in SUBACK",
            )),
        }
    }

    pub fn to_byte(self) -> u8 {
        match self {
            SubscribeReturnCode::Failure => Self::FAILURE_BYTE,
            SubscribeReturnCode::Success(qos) => qos as u8,
        }
    }
}

/// Subscribe acknowledgment: one return code per requested filter, in request order.
#[derive(Debug, PartialEq, Clone)]
pub struct SubscribeAck {
    pub packet_id: u16,
    pub return_codes: Vec<SubscribeReturnCode>,
}

/// Unsubscribe request: one or more topic filters.
#[derive(Debug, PartialEq, Clone)]
pub struct Unsubscribe<'a> {
    pub packet_id: u16,
    pub topic_filters: Vec<&'a str>,
}

/// Unsubscribe acknowledgment.
#[derive(Debug, PartialEq, Clone, Copy)]
pub struct UnsubscribeAck {
    pub packet_id: u16,
}

impl Packet<'_> {
    pub fn packet_type(&self) -> Type {
        match self {
            Packet::Connect(_) => Type::CONNECT,
            Packet::ConnectAck(_) => Type::CONNACK,
            Packet::Publish(_) => Type::PUBLISH,
            Packet::PublishAck(_) => Type::PUBACK,
            Packet::Subscribe(_) => Type::SUBSCRIBE,
            Packet::SubscribeAck(_) => Type::SUBACK,
            Packet::Unsubscribe(_) => Type::UNSUBSCRIBE,
            Packet::UnsubscribeAck(_) => Type::UNSUBACK,
            Packet::PingRequest => Type::PINGREQ,
            Packet::PingResponse => Type::PINGRESP,
            Packet::Disconnect => Type::DISCONNECT,
        }
    }

    pub(crate) fn packet_flags(&self) -> u8 {
        match self {
            Packet::Publish(publish) => {
                (publish.dup as u8) << 3 | (publish.qos as u8) << 1 | (publish.retain as u8)
            }
            Packet::Subscribe(_) | Packet::Unsubscribe(_) => 0b0010,
            _ => 0,
        }
    }
}
