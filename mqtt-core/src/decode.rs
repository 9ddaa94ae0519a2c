use core::convert::TryFrom;
use core::str;

use nom::{
    bytes::complete::tag,
    combinator::{map, map_res},
    error::ErrorKind,
    multi::{length_data, many1},
    number::complete::{be_u16, be_u8},
    sequence::{pair, tuple},
    IResult,
};

use crate::error::CodecError;
use crate::packet::*;

type NomError<'a> = (&'a [u8], ErrorKind);
type Parsed<'a, O> = IResult<&'a [u8], O, NomError<'a>>;

const CONTINUATION_BIT: u8 = 0x80;

fn to_malformed<E>(_: E) -> CodecError {
    CodecError::MalformedPacket("failed to parse packet")
}

/// Decode a remaining-length varint, returning the value and bytes consumed.
pub fn decode_remaining_length(input: &[u8]) -> Result<(usize, usize), CodecError> {
    let mut value = 0usize;
    for (i, &b) in input.iter().enumerate() {
        if i == 4 {
            return Err(CodecError::InvalidRemainingLength);
        }
        value += usize::from(b & !CONTINUATION_BIT) << (7 * i);
        if b & CONTINUATION_BIT == 0 {
            return Ok((value, i + 1));
        }
    }
    Err(CodecError::MalformedPacket("truncated remaining length"))
}

fn varint(input: &[u8]) -> Parsed<'_, usize> {
    decode_remaining_length(input)
        .map(|(value, consumed)| (&input[consumed..], value))
        .map_err(|err| match err {
            CodecError::InvalidRemainingLength => nom::Err::Failure((input, ErrorKind::TooLarge)),
            _ => nom::Err::Incomplete(nom::Needed::Unknown),
        })
}

fn utf8_str(input: &[u8]) -> Parsed<'_, &str> {
    map_res(length_data(be_u16), str::from_utf8)(input)
}

fn binary_data(input: &[u8]) -> Parsed<'_, &[u8]> {
    length_data(be_u16)(input)
}

impl FixedHeader {
    fn parse(input: &[u8]) -> Parsed<'_, FixedHeader> {
        map(
            tuple((
                map_res(be_u8, |b| {
                    Type::try_from((b >> 4) & 0x0F).map(|packet_type| (packet_type, b & 0x0F))
                }),
                varint,
            )),
            |((packet_type, packet_flags), remaining_length)| FixedHeader {
                packet_type,
                packet_flags,
                remaining_length,
            },
        )(input)
    }
}

/// Parse just the fixed header, returning it plus the number of bytes it occupied.
///
/// The yield loop (§4.G) uses this to learn `remaining_length` before
/// deciding how many more bytes to read for the body.
pub fn decode_fixed_header(input: &[u8]) -> Result<(FixedHeader, usize), CodecError> {
    let (rest, header) = FixedHeader::parse(input).map_err(to_malformed)?;
    Ok((header, input.len() - rest.len()))
}

fn connect_ack(input: &[u8]) -> Parsed<'_, Packet<'_>> {
    map(
        pair(
            map(be_u8, |b| b & 0x01 != 0),
            map_res(be_u8, ConnectReturnCode::try_from),
        ),
        |(session_present, return_code)| {
            Packet::ConnectAck(ConnectAck {
                session_present,
                return_code,
            })
        },
    )(input)
}

fn connect(input: &[u8]) -> Parsed<'_, Packet<'_>> {
    let (input, _) = tag(PROTOCOL_NAME_PREFIXED)(input)?;
    let (input, _level) = be_u8(input)?;
    let (input, flags) = be_u8(input)?;
    let (input, keep_alive) = be_u16(input)?;
    let (input, client_id) = utf8_str(input)?;

    let has_username = flags & 0b1000_0000 != 0;
    let has_password = flags & 0b0100_0000 != 0;
    let clean_session = flags & 0b0000_0010 != 0;

    let (input, username) = if has_username {
        let (input, s) = utf8_str(input)?;
        (input, Some(s))
    } else {
        (input, None)
    };
    let (input, password) = if has_password {
        let (input, s) = binary_data(input)?;
        (input, Some(s))
    } else {
        (input, None)
    };

    Ok((
        input,
        Packet::Connect(Connect {
            clean_session,
            keep_alive,
            client_id,
            username,
            password,
        }),
    ))
}

const PROTOCOL_NAME_PREFIXED: &[u8] = b"\x00\x04MQTT";

fn publish<'a>(flags: u8, input: &'a [u8]) -> Parsed<'a, Packet<'a>> {
    let dup = flags & 0b1000 != 0;
    let retain = flags & 0b0001 != 0;
    let qos = QoS::try_from((flags >> 1) & 0b11).map_err(|_| {
        nom::Err::Failure((input, ErrorKind::Alt))
    })?;

    let (input, topic_name) = utf8_str(input)?;
    let (input, packet_id) = if qos != QoS::AtMostOnce {
        let (input, id) = be_u16(input)?;
        (input, Some(id))
    } else {
        (input, None)
    };

    Ok((
        &[],
        Packet::Publish(Publish {
            dup,
            qos,
            retain,
            topic_name,
            packet_id,
            payload: input,
        }),
    ))
}

fn packet_id_ack(input: &[u8]) -> Parsed<'_, u16> {
    be_u16(input)
}

fn subscribe(input: &[u8]) -> Parsed<'_, Packet<'_>> {
    map(
        pair(
            be_u16,
            many1(pair(utf8_str, map_res(be_u8, QoS::try_from))),
        ),
        |(packet_id, topic_filters)| {
            Packet::Subscribe(Subscribe {
                packet_id,
                topic_filters,
            })
        },
    )(input)
}

fn subscribe_ack(input: &[u8]) -> Parsed<'_, Packet<'_>> {
    let (input, packet_id) = be_u16(input)?;
    let (input, codes) = many1(be_u8)(input)?;
    let return_codes = codes
        .into_iter()
        .map(SubscribeReturnCode::from_byte)
        .collect::<Result<Vec<_>, _>>()
        .map_err(|_| nom::Err::Failure((input, ErrorKind::Alt)))?;
    Ok((
        input,
        Packet::SubscribeAck(SubscribeAck {
            packet_id,
            return_codes,
        }),
    ))
}

fn unsubscribe(input: &[u8]) -> Parsed<'_, Packet<'_>> {
    map(pair(be_u16, many1(utf8_str)), |(packet_id, topic_filters)| {
        Packet::Unsubscribe(Unsubscribe {
            packet_id,
            topic_filters,
        })
    })(input)
}

fn unsubscribe_ack(input: &[u8]) -> Parsed<'_, Packet<'_>> {
    map(packet_id_ack, |packet_id| {
        Packet::UnsubscribeAck(UnsubscribeAck { packet_id })
    })(input)
}

fn publish_ack(input: &[u8]) -> Parsed<'_, Packet<'_>> {
    map(packet_id_ack, |packet_id| {
        Packet::PublishAck(PublishAck { packet_id })
    })(input)
}

/// Parse the variable header and payload of a packet whose fixed header has
/// already been consumed, given exactly `header.remaining_length` bytes.
pub fn decode_packet<'a>(header: &FixedHeader, body: &'a [u8]) -> Result<Packet<'a>, CodecError> {
    if body.len() != header.remaining_length {
        return Err(CodecError::MalformedPacket(
            "body length does not match remaining length",
        ));
    }

    // PUBLISH legitimately consumes the body down to an empty `&[]` (the
    // payload is "whatever remains"), every other packet type must consume
    // the body exactly: leftover bytes mean the remaining-length lied.
    let result = match header.packet_type {
        Type::CONNECT => connect(body),
        Type::CONNACK => connect_ack(body),
        Type::PUBLISH => {
            return publish(header.packet_flags, body)
                .map(|(_, p)| p)
                .map_err(|_| CodecError::MalformedPacket("failed to parse publish"))
        }
        Type::PUBACK => publish_ack(body),
        Type::SUBSCRIBE => subscribe(body),
        Type::SUBACK => subscribe_ack(body),
        Type::UNSUBSCRIBE => unsubscribe(body),
        Type::UNSUBACK => unsubscribe_ack(body),
        Type::PINGREQ => return Ok(Packet::PingRequest),
        Type::PINGRESP => return Ok(Packet::PingResponse),
        Type::DISCONNECT => return Ok(Packet::Disconnect),
    };

    match result {
        Ok(([], packet)) => Ok(packet),
        Ok(_) => Err(CodecError::MalformedPacket("trailing bytes after packet body")),
        Err(_) => Err(CodecError::MalformedPacket("failed to parse packet body")),
    }
}

/// Decode a single packet from a buffer known to hold a complete frame,
/// returning the packet and the total number of bytes it occupied.
pub fn decode(input: &[u8]) -> Result<(Packet<'_>, usize), CodecError> {
    let (header, header_len) = decode_fixed_header(input)?;
    let body_end = header_len + header.remaining_length;
    let body = input
        .get(header_len..body_end)
        .ok_or(CodecError::MalformedPacket("truncated packet body"))?;
    let packet = decode_packet(&header, body)?;
    Ok((packet, body_end))
}
