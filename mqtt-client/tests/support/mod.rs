//! Shared plumbing for the integration tests below: a loopback `TcpListener`
//! standing in for a real broker, following the pattern the reference
//! corpus's own client tests use a local mock broker rather than mocking the
//! transport trait directly.

use std::io::{Read, Write};
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::time::{Duration, Instant};

use mqtt_client::{Client, Event};

/// Binds an ephemeral loopback listener and returns it with its address.
pub fn bind_broker() -> (TcpListener, SocketAddr) {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind loopback listener");
    let addr = listener.local_addr().expect("local_addr");
    (listener, addr)
}

/// Blocks until one full MQTT packet has arrived on `stream`, returning the
/// raw bytes of that packet (header included) so the caller can decode it
/// with a lifetime tied to a buffer it owns.
pub fn read_packet(stream: &mut TcpStream) -> Vec<u8> {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 256];
    loop {
        if let Ok((_, consumed)) = mqtt_core::decode(&buf) {
            buf.truncate(consumed);
            return buf;
        }
        let n = stream.read(&mut chunk).expect("read from client");
        assert_ne!(n, 0, "client closed the connection while a packet was expected");
        buf.extend_from_slice(&chunk[..n]);
    }
}

/// Encodes and writes `packet` to `stream` whole.
pub fn write_packet(stream: &mut TcpStream, packet: &mqtt_core::Packet) {
    let mut buf = [0u8; 512];
    let len = mqtt_core::encode(packet, &mut buf).expect("encode packet");
    stream.write_all(&buf[..len]).expect("write to client");
}

/// Repeatedly drives `client.yield_once()` until `cond` holds or `timeout`
/// elapses, polling at a short fixed interval between calls.
pub fn wait_for<T: mqtt_client::Transport>(
    client: &Client<T>,
    timeout: Duration,
    mut cond: impl FnMut() -> bool,
) {
    let deadline = Instant::now() + timeout;
    loop {
        let _ = client.yield_once();
        if cond() {
            return;
        }
        assert!(Instant::now() < deadline, "condition not met within {:?}", timeout);
        std::thread::sleep(Duration::from_millis(5));
    }
}

/// Reads one CONNECT off `stream` and replies with an accepting CONNACK.
pub fn accept_handshake(stream: &mut TcpStream) {
    let raw = read_packet(stream);
    let (packet, _) = mqtt_core::decode(&raw).expect("decode CONNECT");
    assert!(matches!(packet, mqtt_core::Packet::Connect(_)));
    write_packet(
        stream,
        &mqtt_core::Packet::ConnectAck(mqtt_core::ConnectAck {
            session_present: false,
            return_code: mqtt_core::ConnectReturnCode::Accepted,
        }),
    );
}

/// Snapshot of every [`Event`] a test client emitted, for assertions.
#[derive(Default)]
pub struct EventLog(std::sync::Mutex<Vec<String>>);

impl EventLog {
    pub fn sink(self: &std::sync::Arc<Self>) -> Box<dyn FnMut(Event) + Send> {
        let log = self.clone();
        Box::new(move |event| log.0.lock().unwrap().push(format!("{:?}", event)))
    }

    pub fn contains(&self, needle: &str) -> bool {
        self.0.lock().unwrap().iter().any(|e| e.contains(needle))
    }

    pub fn count(&self, needle: &str) -> usize {
        self.0.lock().unwrap().iter().filter(|e| e.contains(needle)).count()
    }
}
