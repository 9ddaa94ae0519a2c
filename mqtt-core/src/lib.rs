//! MQTT 3.1.1 control packet codec.
//!
//! This crate only knows the wire format: it encodes and decodes packets
//! into caller-provided buffers and performs no I/O and no allocation beyond
//! what a packet's variable-length fields need (e.g. a `Vec` of requested
//! topic filters). The device client core in `mqtt-client` owns the
//! transport, timers, and session state built on top of this codec.

mod decode;
mod encode;
mod error;
mod packet;

pub use decode::{decode, decode_fixed_header, decode_packet, decode_remaining_length};
pub use encode::{encode, encode_remaining_length, encoded_len, MAX_REMAINING_LENGTH};
pub use error::CodecError;
pub use packet::{
    Connect, ConnectAck, ConnectFlags, ConnectReturnCode, FixedHeader, Packet, Publish,
    PublishAck, QoS, Subscribe, SubscribeAck, SubscribeReturnCode, Type, Unsubscribe,
    UnsubscribeAck, PROTOCOL_LEVEL, PROTOCOL_NAME,
};

#[cfg(test)]
mod tests {
    use super::*;

    fn roundtrip(packet: Packet) {
        let mut buf = [0u8; 512];
        let len = encode(&packet, &mut buf).expect("encode");
        assert_eq!(len, encoded_len(&packet));
        let (decoded, consumed) = decode(&buf[..len]).expect("decode");
        assert_eq!(consumed, len);
        assert_eq!(decoded, packet);
    }

    #[test]
    fn roundtrip_connect() {
        roundtrip(Packet::Connect(Connect {
            clean_session: true,
            keep_alive: 240,
            client_id: "device-001",
            username: Some("device-001"),
            password: Some(b"s3cr3t"),
        }));
        roundtrip(Packet::Connect(Connect {
            clean_session: false,
            keep_alive: 60,
            client_id: "no-auth",
            username: None,
            password: None,
        }));
    }

    #[test]
    fn roundtrip_connect_ack() {
        roundtrip(Packet::ConnectAck(ConnectAck {
            session_present: true,
            return_code: ConnectReturnCode::Accepted,
        }));
        roundtrip(Packet::ConnectAck(ConnectAck {
            session_present: false,
            return_code: ConnectReturnCode::NotAuthorized,
        }));
    }

    #[test]
    fn roundtrip_publish_qos0_qos1() {
        roundtrip(Packet::Publish(Publish {
            dup: false,
            qos: QoS::AtMostOnce,
            retain: false,
            topic_name: "dev/data",
            packet_id: None,
            payload: b"hello",
        }));
        roundtrip(Packet::Publish(Publish {
            dup: true,
            qos: QoS::AtLeastOnce,
            retain: true,
            topic_name: "dev/data",
            packet_id: Some(42),
            payload: b"world",
        }));
        roundtrip(Packet::Publish(Publish {
            dup: false,
            qos: QoS::AtLeastOnce,
            retain: false,
            topic_name: "dev/empty",
            packet_id: Some(1),
            payload: b"",
        }));
    }

    #[test]
    fn roundtrip_ack_packets() {
        roundtrip(Packet::PublishAck(PublishAck { packet_id: 7 }));
        roundtrip(Packet::UnsubscribeAck(UnsubscribeAck { packet_id: 99 }));
    }

    #[test]
    fn roundtrip_subscribe() {
        roundtrip(Packet::Subscribe(Subscribe {
            packet_id: 10,
            topic_filters: vec![("sport/tennis/+", QoS::AtLeastOnce), ("sport/#", QoS::AtMostOnce)],
        }));
    }

    #[test]
    fn roundtrip_subscribe_ack() {
        roundtrip(Packet::SubscribeAck(SubscribeAck {
            packet_id: 10,
            return_codes: vec![
                SubscribeReturnCode::Success(QoS::AtLeastOnce),
                SubscribeReturnCode::Failure,
            ],
        }));
    }

    #[test]
    fn roundtrip_unsubscribe() {
        roundtrip(Packet::Unsubscribe(Unsubscribe {
            packet_id: 11,
            topic_filters: vec!["sport/tennis/+", "sport/#"],
        }));
    }

    #[test]
    fn roundtrip_header_only_packets() {
        roundtrip(Packet::PingRequest);
        roundtrip(Packet::PingResponse);
        roundtrip(Packet::Disconnect);
    }

    #[test]
    fn encode_rejects_oversize_payload() {
        let packet = Packet::Publish(Publish {
            dup: false,
            qos: QoS::AtMostOnce,
            retain: false,
            topic_name: "t",
            packet_id: None,
            payload: b"abcdefg",
        });
        let mut buf = [0u8; 4];
        let err = encode(&packet, &mut buf).unwrap_err();
        assert!(matches!(err, CodecError::BufferTooShort { .. }));
    }

    #[test]
    fn decode_rejects_every_truncation() {
        let packet = Packet::Publish(Publish {
            dup: false,
            qos: QoS::AtLeastOnce,
            retain: false,
            topic_name: "dev/data",
            packet_id: Some(5),
            payload: b"hello",
        });
        let mut buf = [0u8; 64];
        let len = encode(&packet, &mut buf).unwrap();
        for n in 0..len {
            assert!(decode(&buf[..n]).is_err(), "expected truncation at {} to fail", n);
        }
    }

    #[test]
    fn remaining_length_bijection() {
        for &len in &[0usize, 1, 127, 128, 16383, 16384, 2097151, 2097152, MAX_REMAINING_LENGTH] {
            let mut buf = [0u8; 4];
            let n = encode_remaining_length(len, &mut buf).unwrap();
            let (decoded, consumed) = decode_remaining_length(&buf[..n]).unwrap();
            assert_eq!(decoded, len);
            assert_eq!(consumed, n);
        }
        assert!(encode_remaining_length(MAX_REMAINING_LENGTH + 1, &mut [0u8; 4]).is_err());
    }

    #[test]
    fn remaining_length_rejects_five_byte_varint() {
        let buf = [0xFF, 0xFF, 0xFF, 0xFF, 0x01];
        assert!(decode_remaining_length(&buf).is_err());
    }

    #[test]
    fn packet_id_rotation_never_yields_zero() {
        // The codec itself is stateless; this exercises the wraparound rule
        // packet ids must obey wherever a generator lives (see mqtt-client).
        let mut id: u16 = 65535;
        id = if id == 65535 { 1 } else { id + 1 };
        assert_eq!(id, 1);
    }
}
