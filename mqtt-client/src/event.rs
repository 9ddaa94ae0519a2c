/// An inbound message delivered to a subscription handler.
#[derive(Debug, Clone)]
pub struct Message {
    pub topic: String,
    pub payload: Vec<u8>,
    pub qos: mqtt_core::QoS,
    pub dup: bool,
    pub retain: bool,
}

/// Typed replacement for the original's untyped `(event_type, *mut void)`
/// pair (§4.I, §9 Design Note "Event callback with untyped context").
#[derive(Debug, Clone)]
pub enum Event {
    Disconnect,
    Reconnect,
    SubscribeSuccess { packet_id: u16 },
    SubscribeTimeout { packet_id: u16 },
    SubscribeNack { packet_id: u16 },
    UnsubscribeSuccess { packet_id: u16 },
    UnsubscribeTimeout { packet_id: u16 },
    UnsubscribeNack { packet_id: u16 },
    PublishSuccess { packet_id: u16 },
    PublishTimeout { packet_id: u16 },
    PublishNack { packet_id: u16 },
    PublishReceivedWithoutHandler { message: Message },
    ClientDestroy,
}

/// Event callback surface installed at construction (§4.I).
pub type EventHandler = Box<dyn FnMut(Event) + Send>;
