use std::time::Duration;

use mqtt_core::QoS;

/// Minimum `command_timeout` accepted by [`crate::Client::new`], in milliseconds.
pub const MIN_COMMAND_TIMEOUT_MS: u64 = 500;
/// Maximum `command_timeout` accepted by [`crate::Client::new`], in milliseconds.
pub const MAX_COMMAND_TIMEOUT_MS: u64 = 20_000;

/// Default broker keep-alive interval.
pub const DEFAULT_KEEP_ALIVE: Duration = Duration::from_secs(240);
/// Default per-request command timeout.
pub const DEFAULT_COMMAND_TIMEOUT: Duration = Duration::from_secs(5);

/// Starting reconnect delay; doubles on each consecutive failed attempt.
pub const MIN_RECONNECT_WAIT: Duration = Duration::from_millis(1000);
/// Ceiling the reconnect backoff never exceeds.
pub const MAX_RECONNECT_WAIT: Duration = Duration::from_secs(60);

/// Times a PINGREQ write is retried on transient failure before the
/// connection is declared dead (restored from the original's `try_times`,
/// see §2b).
pub const PING_RETRY_TIMES: u32 = 2;

/// Capacity of each pending-ACK list (publish, subscribe/unsubscribe).
pub const MAX_PENDING_ACKS: usize = 20;
/// Capacity of the subscription table.
pub const MAX_SUBSCRIPTIONS: usize = 10;
/// Capacity of the inbound QoS 1 duplicate-id ring.
pub const MAX_DUPLICATE_RING: usize = 10;

/// Identity and connection-lifecycle options for a [`crate::Client`].
///
/// Mirrors the original's `MQTTInitParams`: caller-supplied struct literal,
/// no file or environment loading.
#[derive(Debug, Clone)]
pub struct ClientOptions {
    pub product_id: String,
    pub device_name: String,
    pub credential: String,
    pub host: String,
    pub port: u16,
    pub clean_session: bool,
    pub keep_alive: Duration,
    pub command_timeout: Duration,
    pub auto_connect_enable: bool,
}

impl ClientOptions {
    /// Client id derived from device identity, as the original composes
    /// `product_id + device_name` for the CONNECT packet.
    pub fn client_id(&self) -> String {
        format!("{}{}", self.product_id, self.device_name)
    }
}

impl Default for ClientOptions {
    fn default() -> Self {
        ClientOptions {
            product_id: String::new(),
            device_name: String::new(),
            credential: String::new(),
            host: "iotcloud.tencentdevices.com".to_owned(),
            port: 1883,
            clean_session: true,
            keep_alive: DEFAULT_KEEP_ALIVE,
            command_timeout: DEFAULT_COMMAND_TIMEOUT,
            auto_connect_enable: true,
        }
    }
}

/// Per-call options for [`crate::Client::publish`].
#[derive(Debug, Clone, Copy)]
pub struct PublishOptions {
    pub qos: QoS,
    pub retain: bool,
    pub dup: bool,
}

impl Default for PublishOptions {
    fn default() -> Self {
        PublishOptions {
            qos: QoS::AtMostOnce,
            retain: false,
            dup: false,
        }
    }
}
