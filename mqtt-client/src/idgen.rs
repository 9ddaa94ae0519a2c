use rand::Rng;

/// Rotating packet-id generator: starts at 1, wraps from 65535 back to 1,
/// never yields 0 (§4.J, reserved for QoS 0 / unused fields per §3).
#[derive(Debug)]
pub struct PacketIdGenerator {
    next: u16,
}

impl PacketIdGenerator {
    pub fn new() -> Self {
        PacketIdGenerator { next: 1 }
    }

    pub fn next_id(&mut self) -> u16 {
        let id = self.next;
        self.next = if self.next == u16::MAX { 1 } else { self.next + 1 };
        id
    }
}

impl Default for PacketIdGenerator {
    fn default() -> Self {
        PacketIdGenerator::new()
    }
}

const CONN_ID_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";
const CONN_ID_LEN: usize = 6;

/// 6-character random alphanumeric connection tag, regenerated on every
/// connect/reconnect attempt (§2b, restored from the original's `conn_id`).
pub fn generate_connection_tag() -> String {
    let mut rng = rand::thread_rng();
    (0..CONN_ID_LEN)
        .map(|_| CONN_ID_ALPHABET[rng.gen_range(0, CONN_ID_ALPHABET.len())] as char)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn packet_id_starts_at_one_and_never_yields_zero() {
        let mut gen = PacketIdGenerator::new();
        assert_eq!(gen.next_id(), 1);
        for _ in 0..u16::MAX {
            assert_ne!(gen.next_id(), 0);
        }
    }

    #[test]
    fn packet_id_wraps_from_max_back_to_one() {
        let mut gen = PacketIdGenerator { next: u16::MAX };
        assert_eq!(gen.next_id(), u16::MAX);
        assert_eq!(gen.next_id(), 1);
    }

    #[test]
    fn connection_tag_has_expected_length_and_alphabet() {
        let tag = generate_connection_tag();
        assert_eq!(tag.len(), CONN_ID_LEN);
        assert!(tag.chars().all(|c| c.is_ascii_alphanumeric()));
    }
}
