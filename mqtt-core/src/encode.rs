use crate::error::CodecError;
use crate::packet::*;

const CONTINUATION_BIT: u8 = 0x80;

/// Maximum value representable by a 4-byte remaining-length varint.
pub const MAX_REMAINING_LENGTH: usize = 268_435_455;

/// A small bounds-checked cursor over a caller-provided fixed-size buffer.
///
/// Unlike `bytes::BufMut` over a `Vec`, this never grows the buffer: every
/// write that would overrun it returns `CodecError::BufferTooShort`, which is
/// how the original C core reports `MQTT_ERR_SHORT_BUFFER` from
/// `mqtt_*_packet_serialize`.
struct Writer<'a> {
    buf: &'a mut [u8],
    pos: usize,
}

impl<'a> Writer<'a> {
    fn new(buf: &'a mut [u8]) -> Self {
        Writer { buf, pos: 0 }
    }

    fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    fn require(&self, n: usize) -> Result<(), CodecError> {
        if self.remaining() < n {
            Err(CodecError::BufferTooShort {
                needed: self.pos + n,
                available: self.buf.len(),
            })
        } else {
            Ok(())
        }
    }

    fn put_u8(&mut self, b: u8) -> Result<(), CodecError> {
        self.require(1)?;
        self.buf[self.pos] = b;
        self.pos += 1;
        Ok(())
    }

    fn put_u16(&mut self, v: u16) -> Result<(), CodecError> {
        self.require(2)?;
        self.buf[self.pos..self.pos + 2].copy_from_slice(&v.to_be_bytes());
        self.pos += 2;
        Ok(())
    }

    fn put_slice(&mut self, s: &[u8]) -> Result<(), CodecError> {
        self.require(s.len())?;
        self.buf[self.pos..self.pos + s.len()].copy_from_slice(s);
        self.pos += s.len();
        Ok(())
    }

    fn put_str(&mut self, s: &str) -> Result<(), CodecError> {
        if s.len() > u16::MAX as usize {
            return Err(CodecError::StringTooLong(s.len()));
        }
        self.put_u16(s.len() as u16)?;
        self.put_slice(s.as_bytes())
    }

    fn put_binary(&mut self, s: &[u8]) -> Result<(), CodecError> {
        if s.len() > u16::MAX as usize {
            return Err(CodecError::StringTooLong(s.len()));
        }
        self.put_u16(s.len() as u16)?;
        self.put_slice(s)
    }

    fn put_varint(&mut self, mut n: usize) -> Result<(), CodecError> {
        if n > MAX_REMAINING_LENGTH {
            return Err(CodecError::InvalidRemainingLength);
        }
        loop {
            let mut b = (n % 0x80) as u8;
            n >>= 7;
            if n > 0 {
                b |= CONTINUATION_BIT;
            }
            self.put_u8(b)?;
            if n == 0 {
                break;
            }
        }
        Ok(())
    }
}

/// Encode a remaining-length value as 1-4 bytes, returning the bytes written.
pub fn encode_remaining_length(len: usize, buf: &mut [u8]) -> Result<usize, CodecError> {
    if len > MAX_REMAINING_LENGTH {
        return Err(CodecError::InvalidRemainingLength);
    }
    let mut w = Writer::new(buf);
    w.put_varint(len)?;
    Ok(w.pos)
}

fn body_size(packet: &Packet) -> usize {
    match packet {
        Packet::Connect(c) => connect_size(c),
        Packet::ConnectAck(_) => 2,
        Packet::Publish(p) => publish_size(p),
        Packet::PublishAck(_) => 2,
        Packet::Subscribe(s) => subscribe_size(s),
        Packet::SubscribeAck(s) => 2 + s.return_codes.len(),
        Packet::Unsubscribe(u) => unsubscribe_size(u),
        Packet::UnsubscribeAck(_) => 2,
        Packet::PingRequest | Packet::PingResponse | Packet::Disconnect => 0,
    }
}

fn connect_size(c: &Connect) -> usize {
    let mut n = 2 + PROTOCOL_NAME.len() + 1 + 1 + 2 + 2 + c.client_id.len();
    if let Some(username) = c.username {
        n += 2 + username.len();
    }
    if let Some(password) = c.password {
        n += 2 + password.len();
    }
    n
}

fn publish_size(p: &Publish) -> usize {
    let mut n = 2 + p.topic_name.len();
    if p.packet_id.is_some() {
        n += 2;
    }
    n + p.payload.len()
}

fn subscribe_size(s: &Subscribe) -> usize {
    2 + s
        .topic_filters
        .iter()
        .map(|(filter, _)| 2 + filter.len() + 1)
        .sum::<usize>()
}

fn unsubscribe_size(u: &Unsubscribe) -> usize {
    2 + u
        .topic_filters
        .iter()
        .map(|filter| 2 + filter.len())
        .sum::<usize>()
}

/// Serialize `packet` into `buf`, returning the number of bytes written.
///
/// `buf` must hold the fixed header, the remaining-length varint, and the
/// whole body; `CodecError::BufferTooShort` is returned (never a panic) if
/// it does not.
pub fn encode(packet: &Packet, buf: &mut [u8]) -> Result<usize, CodecError> {
    let remaining_length = body_size(packet);
    let mut w = Writer::new(buf);

    let first_byte = ((packet.packet_type() as u8) << 4) | packet.packet_flags();
    w.put_u8(first_byte)?;
    w.put_varint(remaining_length)?;

    match packet {
        Packet::Connect(c) => encode_connect(&mut w, c)?,
        Packet::ConnectAck(ack) => encode_connect_ack(&mut w, ack)?,
        Packet::Publish(p) => encode_publish(&mut w, p)?,
        Packet::PublishAck(ack) => w.put_u16(ack.packet_id)?,
        Packet::Subscribe(s) => encode_subscribe(&mut w, s)?,
        Packet::SubscribeAck(ack) => encode_subscribe_ack(&mut w, ack)?,
        Packet::Unsubscribe(u) => encode_unsubscribe(&mut w, u)?,
        Packet::UnsubscribeAck(ack) => w.put_u16(ack.packet_id)?,
        Packet::PingRequest | Packet::PingResponse | Packet::Disconnect => {}
    }

    Ok(w.pos)
}

fn encode_connect(w: &mut Writer, c: &Connect) -> Result<(), CodecError> {
    w.put_u16(PROTOCOL_NAME.len() as u16)?;
    w.put_slice(PROTOCOL_NAME)?;
    w.put_u8(PROTOCOL_LEVEL)?;

    let mut flags = ConnectFlags::empty();
    if c.clean_session {
        flags |= ConnectFlags::CLEAN_SESSION;
    }
    if c.username.is_some() {
        flags |= ConnectFlags::USERNAME;
    }
    if c.password.is_some() {
        flags |= ConnectFlags::PASSWORD;
    }
    w.put_u8(flags.bits())?;
    w.put_u16(c.keep_alive)?;
    w.put_str(c.client_id)?;
    if let Some(username) = c.username {
        w.put_str(username)?;
    }
    if let Some(password) = c.password {
        w.put_binary(password)?;
    }
    Ok(())
}

fn encode_connect_ack(w: &mut Writer, ack: &ConnectAck) -> Result<(), CodecError> {
    w.put_u8(ack.session_present as u8)?;
    w.put_u8(ack.return_code as u8)
}

fn encode_publish(w: &mut Writer, p: &Publish) -> Result<(), CodecError> {
    w.put_str(p.topic_name)?;
    if let Some(packet_id) = p.packet_id {
        w.put_u16(packet_id)?;
    }
    w.put_slice(p.payload)
}

fn encode_subscribe(w: &mut Writer, s: &Subscribe) -> Result<(), CodecError> {
    w.put_u16(s.packet_id)?;
    for (filter, qos) in &s.topic_filters {
        w.put_str(filter)?;
        w.put_u8(*qos as u8)?;
    }
    Ok(())
}

fn encode_subscribe_ack(w: &mut Writer, ack: &SubscribeAck) -> Result<(), CodecError> {
    w.put_u16(ack.packet_id)?;
    for code in &ack.return_codes {
        w.put_u8(code.to_byte())?;
    }
    Ok(())
}

fn encode_unsubscribe(w: &mut Writer, u: &Unsubscribe) -> Result<(), CodecError> {
    w.put_u16(u.packet_id)?;
    for filter in &u.topic_filters {
        w.put_str(filter)?;
    }
    Ok(())
}

/// Size in bytes the serialized packet will occupy, fixed header included.
pub fn encoded_len(packet: &Packet) -> usize {
    let remaining_length = body_size(packet);
    let mut len_bytes = [0u8; 4];
    let len_size = encode_remaining_length(remaining_length, &mut len_bytes).unwrap_or(4);
    1 + len_size + remaining_length
}
