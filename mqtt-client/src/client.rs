use std::io;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use log::{debug, trace, warn};

use mqtt_core::{
    Connect, ConnectReturnCode, Publish, PublishAck, QoS, Subscribe, SubscribeReturnCode,
    Unsubscribe,
};

use crate::dedup::DuplicateFilter;
use crate::event::{Event, EventHandler, Message};
use crate::idgen::{generate_connection_tag, PacketIdGenerator};
use crate::options::{ClientOptions, PublishOptions, MAX_COMMAND_TIMEOUT_MS, MAX_PENDING_ACKS, MIN_COMMAND_TIMEOUT_MS};
use crate::pending::PendingAckList;
use crate::session::{ConnectionState, Session};
use crate::subscription::{MessageHandler, SubscriptionRegistry};
use crate::transport::{ReadOutcome, TcpTransport, Transport};
use crate::Error;
use crate::YieldStatus;

const READ_BUF_SIZE: usize = 2048;
const WRITE_BUF_SIZE: usize = 2048;

/// Topic names and filters are length-prefixed with a 16-bit field on the
/// wire (§4.A); anything longer cannot be encoded at all.
const MAX_TOPIC_LEN: usize = u16::MAX as usize;

fn validate_topic(topic: &str, empty_msg: &'static str) -> Result<(), Error> {
    if topic.is_empty() {
        return Err(Error::InvalidArgument(empty_msg));
    }
    if topic.len() > MAX_TOPIC_LEN {
        return Err(Error::InvalidArgument("topic too long"));
    }
    Ok(())
}

/// Per-poll read timeout: short enough that `yield_once` never blocks the
/// caller for long when nothing has arrived (§4.G "a bounded read").
const POLL_READ_TIMEOUT: Duration = Duration::from_millis(50);

/// A still-outstanding SUBSCRIBE or UNSUBSCRIBE, keyed by packet id in
/// `sub_wait_ack` (§3 `PendingSubscribe` / `PendingUnsubscribe`).
enum PendingSub {
    Subscribe {
        filter: String,
        qos: QoS,
        handler: MessageHandler,
    },
    Unsubscribe {
        filter: String,
    },
}

/// An inbound packet, detached from the read buffer it was decoded from so
/// dispatch can run without holding the buffer's lock.
enum Frame {
    ConnectAck {
        return_code: ConnectReturnCode,
    },
    Publish {
        dup: bool,
        qos: QoS,
        retain: bool,
        topic: String,
        packet_id: Option<u16>,
        payload: Vec<u8>,
    },
    PublishAck {
        packet_id: u16,
    },
    SubscribeAck {
        packet_id: u16,
        return_codes: Vec<SubscribeReturnCode>,
    },
    UnsubscribeAck {
        packet_id: u16,
    },
    PingResponse,
    Other,
}

impl Frame {
    fn from_packet(packet: &mqtt_core::Packet) -> Frame {
        match packet {
            mqtt_core::Packet::ConnectAck(ack) => Frame::ConnectAck {
                return_code: ack.return_code,
            },
            mqtt_core::Packet::Publish(p) => Frame::Publish {
                dup: p.dup,
                qos: p.qos,
                retain: p.retain,
                topic: p.topic_name.to_owned(),
                packet_id: p.packet_id,
                payload: p.payload.to_vec(),
            },
            mqtt_core::Packet::PublishAck(ack) => Frame::PublishAck {
                packet_id: ack.packet_id,
            },
            mqtt_core::Packet::SubscribeAck(ack) => Frame::SubscribeAck {
                packet_id: ack.packet_id,
                return_codes: ack.return_codes.clone(),
            },
            mqtt_core::Packet::UnsubscribeAck(ack) => Frame::UnsubscribeAck {
                packet_id: ack.packet_id,
            },
            mqtt_core::Packet::PingResponse => Frame::PingResponse,
            _ => Frame::Other,
        }
    }
}

struct Outbound<T> {
    transport: T,
    write_buf: [u8; WRITE_BUF_SIZE],
}

struct Inbound {
    buf: [u8; READ_BUF_SIZE],
    filled: usize,
}

/// State touched only under the "generic mutex" (§5): session bookkeeping,
/// the subscription table, the dedup ring, and the packet-id generator.
/// Never held across a transport read or write.
struct GenericState {
    session: Session,
    subscriptions: SubscriptionRegistry,
    dedup: DuplicateFilter,
    packet_ids: PacketIdGenerator,
}

/// Device client core: connection state machine, keep-alive, reconnect, and
/// QoS 0/1 publish/subscribe delivery, serviced by repeated calls to
/// [`Client::yield_once`] (§4.F, §4.G, §4.H).
///
/// Every method takes `&self`: `publish`/`subscribe`/`unsubscribe` may be
/// called from other threads concurrently with a thread driving the yield
/// loop (§5), so all mutable state lives behind its own `Mutex` rather than
/// requiring exclusive `&mut self` access the way the reference corpus's
/// single-threaded-caller `Client<T, P>` does.
pub struct Client<T: Transport = TcpTransport> {
    options: ClientOptions,
    outbound: Mutex<Outbound<T>>,
    inbound: Mutex<Inbound>,
    state: Mutex<GenericState>,
    pub_wait_ack: Mutex<PendingAckList<()>>,
    sub_wait_ack: Mutex<PendingAckList<PendingSub>>,
    event_handler: Mutex<EventHandler>,
}

impl<T: Transport> Client<T> {
    /// Connects and performs the initial CONNECT/CONNACK handshake.
    ///
    /// Returns `Error::InvalidArgument` if `options.command_timeout` falls
    /// outside `[MIN_COMMAND_TIMEOUT_MS, MAX_COMMAND_TIMEOUT_MS]` (§4.H).
    pub fn new(options: ClientOptions, event_handler: EventHandler) -> Result<Self, Error> {
        let timeout_ms = options.command_timeout.as_millis() as u64;
        if !(MIN_COMMAND_TIMEOUT_MS..=MAX_COMMAND_TIMEOUT_MS).contains(&timeout_ms) {
            return Err(Error::InvalidArgument(
                "command_timeout must fall within [500ms, 20000ms]",
            ));
        }

        let transport = T::connect(&options.host, options.port, options.command_timeout)
            .map_err(Error::TransportFailure)?;

        let client = Client {
            options,
            outbound: Mutex::new(Outbound {
                transport,
                write_buf: [0u8; WRITE_BUF_SIZE],
            }),
            inbound: Mutex::new(Inbound {
                buf: [0u8; READ_BUF_SIZE],
                filled: 0,
            }),
            state: Mutex::new(GenericState {
                session: Session::new(),
                subscriptions: SubscriptionRegistry::new(),
                dedup: DuplicateFilter::new(),
                packet_ids: PacketIdGenerator::new(),
            }),
            pub_wait_ack: Mutex::new(PendingAckList::new(MAX_PENDING_ACKS)),
            sub_wait_ack: Mutex::new(PendingAckList::new(MAX_PENDING_ACKS)),
            event_handler: Mutex::new(event_handler),
        };

        client.handshake()?;
        Ok(client)
    }

    /// Publishes `payload` to `topic`. At QoS 0 the call returns once the
    /// bytes are written; at QoS 1 it returns once they are queued, and the
    /// outcome arrives later as `Event::PublishSuccess`/`PublishTimeout`.
    pub fn publish(&self, topic: &str, payload: &[u8], opts: PublishOptions) -> Result<u16, Error> {
        validate_topic(topic, "topic must not be empty")?;
        if !self.is_connected() {
            return Err(Error::NotConnected);
        }

        if opts.qos == QoS::AtMostOnce {
            let packet = mqtt_core::Packet::Publish(Publish {
                dup: opts.dup,
                qos: opts.qos,
                retain: opts.retain,
                topic_name: topic,
                packet_id: None,
                payload,
            });
            self.send_packet(&packet)?;
            return Ok(0);
        }

        let packet_id = { self.state.lock().unwrap().packet_ids.next_id() };
        self.pub_wait_ack
            .lock()
            .unwrap()
            .push(packet_id, self.options.command_timeout, ())?;

        let packet = mqtt_core::Packet::Publish(Publish {
            dup: opts.dup,
            qos: opts.qos,
            retain: opts.retain,
            topic_name: topic,
            packet_id: Some(packet_id),
            payload,
        });
        if let Err(err) = self.send_packet(&packet) {
            self.pub_wait_ack.lock().unwrap().remove(packet_id);
            return Err(err);
        }
        Ok(packet_id)
    }

    /// Requests a subscription on `filter` at `qos`. `handler` is called for
    /// every delivered message matching the filter once the broker grants
    /// it; the outcome arrives later as `Event::SubscribeSuccess`/
    /// `SubscribeNack`/`SubscribeTimeout`.
    pub fn subscribe(
        &self,
        filter: &str,
        qos: QoS,
        handler: impl FnMut(&Message) + Send + 'static,
    ) -> Result<u16, Error> {
        validate_topic(filter, "subscription filter must not be empty")?;
        if !self.is_connected() {
            return Err(Error::NotConnected);
        }

        let packet_id = { self.state.lock().unwrap().packet_ids.next_id() };
        self.sub_wait_ack.lock().unwrap().push(
            packet_id,
            self.options.command_timeout,
            PendingSub::Subscribe {
                filter: filter.to_owned(),
                qos,
                handler: Box::new(handler),
            },
        )?;

        let packet = mqtt_core::Packet::Subscribe(Subscribe {
            packet_id,
            topic_filters: vec![(filter, qos)],
        });
        if let Err(err) = self.send_packet(&packet) {
            self.sub_wait_ack.lock().unwrap().remove(packet_id);
            return Err(err);
        }
        Ok(packet_id)
    }

    /// Requests removal of a local subscription on `filter`. The outcome
    /// arrives later as `Event::UnsubscribeSuccess`/`Timeout`.
    pub fn unsubscribe(&self, filter: &str) -> Result<u16, Error> {
        validate_topic(filter, "unsubscribe filter must not be empty")?;
        if !self.is_connected() {
            return Err(Error::NotConnected);
        }
        {
            let mut state = self.state.lock().unwrap();
            if state.subscriptions.remove(filter).is_none() {
                return Err(Error::InvalidArgument("no local subscription for filter"));
            }
        }

        let packet_id = { self.state.lock().unwrap().packet_ids.next_id() };
        self.sub_wait_ack.lock().unwrap().push(
            packet_id,
            self.options.command_timeout,
            PendingSub::Unsubscribe {
                filter: filter.to_owned(),
            },
        )?;

        let packet = mqtt_core::Packet::Unsubscribe(Unsubscribe {
            packet_id,
            topic_filters: vec![filter],
        });
        if let Err(err) = self.send_packet(&packet) {
            self.sub_wait_ack.lock().unwrap().remove(packet_id);
            return Err(err);
        }
        Ok(packet_id)
    }

    /// True iff the subscription table holds an entry whose filter equals
    /// `filter`, or `filter` names a wildcard level (`/+` or `/#`) (§6
    /// `IsSubReady`).
    pub fn is_sub_ready(&self, filter: &str) -> bool {
        if filter.contains("/+") || filter.contains("/#") {
            return true;
        }
        self.state.lock().unwrap().subscriptions.contains(filter)
    }

    pub fn is_connected(&self) -> bool {
        self.state.lock().unwrap().session.state == ConnectionState::Connected
    }

    pub fn disconnect_count(&self) -> u64 {
        self.state.lock().unwrap().session.disconnect_count
    }

    pub fn connection_tag(&self) -> String {
        self.state.lock().unwrap().session.connection_tag.clone()
    }

    /// Sends DISCONNECT and closes the transport. No further reconnect is
    /// attempted until a new `Client` is constructed.
    ///
    /// Frees every pending-ACK entry and, if the subscription table still
    /// held any filters, logs how many (§4.H "free all subscription entries
    /// and pending-ACK entries").
    pub fn disconnect(&self) -> Result<(), Error> {
        {
            self.state.lock().unwrap().session.was_manually_disconnected = true;
        }
        let send_result = self.send_packet(&mqtt_core::Packet::Disconnect);
        {
            let mut outbound = self.outbound.lock().unwrap();
            let _ = outbound.transport.disconnect();
        }
        {
            let mut pub_wait_ack = self.pub_wait_ack.lock().unwrap();
            if !pub_wait_ack.is_empty() {
                debug!("abandoning {} pending publish ack(s) on disconnect", pub_wait_ack.len());
            }
            pub_wait_ack.clear();
        }
        self.sub_wait_ack.lock().unwrap().clear();
        let state = self.state.lock().unwrap();
        if !state.subscriptions.is_empty() {
            debug!("dropping {} live subscription(s) on disconnect", state.subscriptions.len());
        }
        send_result
    }

    /// Services the connection once: reads and dispatches at most one
    /// packet, expires overdue pending acks, ticks the keep-alive timer,
    /// and drives reconnect when disconnected (§4.G).
    ///
    /// The caller is expected to call this repeatedly from a single thread;
    /// `publish`/`subscribe`/`unsubscribe` may run concurrently from others.
    pub fn yield_once(&self) -> Result<YieldStatus, Error> {
        let disconnected = { self.state.lock().unwrap().session.state == ConnectionState::Disconnected };
        if disconnected {
            let (manual, auto_connect) = {
                let state = self.state.lock().unwrap();
                (state.session.was_manually_disconnected, self.options.auto_connect_enable)
            };
            if manual || !auto_connect {
                return Ok(YieldStatus::Idle);
            }
            return self.attempt_reconnect();
        }

        let mut progressed = false;

        match self.poll_one_packet() {
            Ok(Some(frame)) => {
                self.dispatch(frame);
                progressed = true;
            }
            Ok(None) => {}
            Err(err) => {
                warn!("yield: transport failure, entering reconnect: {}", err);
                self.enter_disconnected();
                return Ok(YieldStatus::AttemptingReconnect);
            }
        }

        for (packet_id, ()) in self.pub_wait_ack.lock().unwrap().drain_expired() {
            progressed = true;
            self.emit(Event::PublishTimeout { packet_id });
        }
        for (packet_id, pending) in self.sub_wait_ack.lock().unwrap().drain_expired() {
            progressed = true;
            match pending {
                PendingSub::Subscribe { .. } => self.emit(Event::SubscribeTimeout { packet_id }),
                PendingSub::Unsubscribe { .. } => self.emit(Event::UnsubscribeTimeout { packet_id }),
            }
        }

        match self.service_keep_alive() {
            Ok(did_something) => progressed |= did_something,
            Err(_) => {
                warn!("yield: keep-alive failed, entering reconnect");
                self.enter_disconnected();
                return Ok(YieldStatus::AttemptingReconnect);
            }
        }

        Ok(if progressed { YieldStatus::Progressed } else { YieldStatus::Idle })
    }

    fn attempt_reconnect(&self) -> Result<YieldStatus, Error> {
        let due = { self.state.lock().unwrap().session.reconnect_due() };
        if !due {
            return Ok(YieldStatus::AttemptingReconnect);
        }
        match self.reconnect_once() {
            Ok(()) => {
                self.emit(Event::Reconnect);
                Ok(YieldStatus::Reconnected)
            }
            Err(err) => {
                debug!("reconnect attempt failed: {}", err);
                self.state.lock().unwrap().session.schedule_reconnect();
                Ok(YieldStatus::AttemptingReconnect)
            }
        }
    }

    fn reconnect_once(&self) -> Result<(), Error> {
        let transport = T::connect(&self.options.host, self.options.port, self.options.command_timeout)
            .map_err(Error::TransportFailure)?;
        {
            let mut outbound = self.outbound.lock().unwrap();
            outbound.transport = transport;
        }
        {
            let mut inbound = self.inbound.lock().unwrap();
            inbound.filled = 0;
        }
        self.handshake()?;

        if self.options.clean_session {
            let (filters, count): (Vec<(String, QoS)>, usize) = {
                let state = self.state.lock().unwrap();
                (
                    state.subscriptions.iter().map(|e| (e.filter.clone(), e.qos)).collect(),
                    state.subscriptions.len(),
                )
            };
            if !filters.is_empty() {
                debug!("resubscribing {} filter(s) after reconnect", count);
            }
            for (filter, qos) in filters {
                let packet_id = { self.state.lock().unwrap().packet_ids.next_id() };
                let packet = mqtt_core::Packet::Subscribe(Subscribe {
                    packet_id,
                    topic_filters: vec![(filter.as_str(), qos)],
                });
                // Best-effort replay: a stray SUBACK for these is tolerated
                // by dispatch (§9 "resubscribe after clean-session reconnect").
                if let Err(err) = self.send_packet(&packet) {
                    debug!("resubscribe to {:?} failed: {}", filter, err);
                }
            }
        }
        Ok(())
    }

    fn handshake(&self) -> Result<(), Error> {
        let tag = generate_connection_tag();
        let client_id = format!("{}_{}", self.options.client_id(), tag);

        {
            let mut state = self.state.lock().unwrap();
            state.session.state = ConnectionState::WaitingConnack;
            state.session.connection_tag = tag;
        }

        let connect = mqtt_core::Packet::Connect(Connect {
            clean_session: self.options.clean_session,
            keep_alive: self.options.keep_alive.as_secs() as u16,
            client_id: &client_id,
            username: if self.options.product_id.is_empty() {
                None
            } else {
                Some(self.options.product_id.as_str())
            },
            password: if self.options.credential.is_empty() {
                None
            } else {
                Some(self.options.credential.as_bytes())
            },
        });
        self.send_packet(&connect)?;

        let deadline = Instant::now() + self.options.command_timeout;
        loop {
            if Instant::now() >= deadline {
                return Err(Error::AckTimeout(0));
            }
            match self.poll_one_packet()? {
                Some(Frame::ConnectAck { return_code }) => {
                    if return_code != ConnectReturnCode::Accepted {
                        return Err(Error::ProtocolViolation(mqtt_core::CodecError::ProtocolViolation(
                            "broker rejected CONNECT",
                        )));
                    }
                    let mut state = self.state.lock().unwrap();
                    state.session.state = ConnectionState::Connected;
                    state.session.reset_reconnect_backoff();
                    state.session.cancel_reconnect_timer();
                    state.session.start_keep_alive(self.options.keep_alive);
                    debug!("connected as {:?}", client_id);
                    return Ok(());
                }
                Some(_) | None => continue,
            }
        }
    }

    fn enter_disconnected(&self) {
        {
            self.state.lock().unwrap().session.mark_disconnected();
        }
        self.emit(Event::Disconnect);
    }

    fn service_keep_alive(&self) -> Result<bool, Error> {
        let (expired, ping_outstanding) = {
            let state = self.state.lock().unwrap();
            (state.session.keep_alive_expired(), state.session.is_ping_outstanding)
        };
        if !expired {
            if let Some(remaining) = self.state.lock().unwrap().session.keep_alive_remaining() {
                trace!("keep-alive: {:?} until next PINGREQ", remaining);
            }
            return Ok(false);
        }
        if ping_outstanding {
            return Err(Error::TransportFailure(io::Error::new(
                io::ErrorKind::TimedOut,
                "no PINGRESP before the next keep-alive tick",
            )));
        }

        let mut last_err = None;
        let mut sent = false;
        for attempt in 0..=crate::options::PING_RETRY_TIMES {
            match self.send_packet(&mqtt_core::Packet::PingRequest) {
                Ok(()) => {
                    sent = true;
                    break;
                }
                Err(err) => {
                    trace!("pingreq attempt {} failed: {}", attempt, err);
                    last_err = Some(err);
                }
            }
        }
        if !sent {
            return Err(last_err.expect("loop ran at least once"));
        }

        let mut state = self.state.lock().unwrap();
        state.session.is_ping_outstanding = true;
        state.session.start_keep_alive(self.options.keep_alive);
        Ok(true)
    }

    fn dispatch(&self, frame: Frame) {
        match frame {
            Frame::ConnectAck { .. } => debug!("ignoring stray CONNACK"),
            Frame::Publish {
                qos,
                dup,
                retain,
                topic,
                packet_id,
                payload,
            } => {
                match qos {
                    QoS::AtMostOnce => self.deliver(Message {
                        topic,
                        payload,
                        qos,
                        dup,
                        retain,
                    }),
                    QoS::AtLeastOnce => {
                        let packet_id = packet_id.expect("QoS 1 PUBLISH always carries a packet id");
                        let is_duplicate = { self.state.lock().unwrap().dedup.check_and_record(packet_id) };
                        if !is_duplicate {
                            self.deliver(Message {
                                topic,
                                payload,
                                qos,
                                dup,
                                retain,
                            });
                        }
                        if let Err(err) = self.send_packet(&mqtt_core::Packet::PublishAck(PublishAck { packet_id })) {
                            debug!("failed to ack packet id {}: {}", packet_id, err);
                        }
                    }
                }
            }
            Frame::PublishAck { packet_id } => {
                if self.pub_wait_ack.lock().unwrap().remove(packet_id).is_some() {
                    self.emit(Event::PublishSuccess { packet_id });
                } else {
                    debug!("ignoring stray PUBACK for packet id {}", packet_id);
                }
            }
            Frame::SubscribeAck { packet_id, return_codes } => {
                match self.sub_wait_ack.lock().unwrap().remove(packet_id) {
                    Some(PendingSub::Subscribe { filter, qos: requested_qos, handler }) => {
                        match return_codes.into_iter().next() {
                            Some(SubscribeReturnCode::Success(granted_qos)) => {
                                if granted_qos != requested_qos {
                                    debug!(
                                        "broker granted {:?} for {:?}, requested {:?}",
                                        granted_qos, filter, requested_qos
                                    );
                                }
                                let mut state = self.state.lock().unwrap();
                                let inserted = state.subscriptions.insert(filter, granted_qos, handler);
                                drop(state);
                                match inserted {
                                    Ok(()) => self.emit(Event::SubscribeSuccess { packet_id }),
                                    Err(_) => self.emit(Event::SubscribeNack { packet_id }),
                                }
                            }
                            _ => self.emit(Event::SubscribeNack { packet_id }),
                        }
                    }
                    Some(PendingSub::Unsubscribe { .. }) | None => {
                        debug!("ignoring stray or mismatched SUBACK for packet id {}", packet_id);
                    }
                }
            }
            Frame::UnsubscribeAck { packet_id } => {
                match self.sub_wait_ack.lock().unwrap().remove(packet_id) {
                    Some(PendingSub::Unsubscribe { filter }) => {
                        debug!("unsubscribed from {:?}", filter);
                        self.emit(Event::UnsubscribeSuccess { packet_id });
                    }
                    Some(PendingSub::Subscribe { .. }) | None => {
                        debug!("ignoring stray or mismatched UNSUBACK for packet id {}", packet_id);
                    }
                }
            }
            Frame::PingResponse => {
                self.state.lock().unwrap().session.is_ping_outstanding = false;
            }
            Frame::Other => debug!("ignoring packet type not expected in this direction"),
        }
    }

    fn deliver(&self, message: Message) {
        let mut state = self.state.lock().unwrap();
        let topic = message.topic.clone();
        let mut matched = false;
        for entry in state.subscriptions.matching_mut(&topic) {
            matched = true;
            (entry.handler)(&message);
        }
        drop(state);
        if !matched {
            self.emit(Event::PublishReceivedWithoutHandler { message });
        }
    }

    fn emit(&self, event: Event) {
        (self.event_handler.lock().unwrap())(event);
    }

    /// Serializes `packet` into the write-buffer and writes it whole before
    /// returning: the write-buffer mutex is held across the entire
    /// serialize-then-send sequence (§5).
    fn send_packet(&self, packet: &mqtt_core::Packet) -> Result<(), Error> {
        let mut outbound = self.outbound.lock().unwrap();
        let Outbound { transport, write_buf } = &mut *outbound;
        let len = mqtt_core::encode(packet, write_buf)?;

        let mut written = 0;
        while written < len {
            let n = transport
                .write(&write_buf[written..len], self.options.command_timeout)
                .map_err(Error::TransportFailure)?;
            if n == 0 {
                return Err(Error::TransportFailure(io::Error::new(
                    io::ErrorKind::WriteZero,
                    "transport accepted zero bytes",
                )));
            }
            written += n;
        }
        trace!("wrote {} byte {:?} packet", len, packet.packet_type());
        Ok(())
    }

    /// Reads at most one complete packet off the wire without blocking
    /// beyond `POLL_READ_TIMEOUT`, accumulating partial frames across calls.
    fn poll_one_packet(&self) -> Result<Option<Frame>, Error> {
        let mut inbound = self.inbound.lock().unwrap();

        if let Some(frame) = Self::try_decode(&mut inbound)? {
            return Ok(Some(frame));
        }

        let n = {
            let Inbound { buf, filled } = &mut *inbound;
            if *filled >= buf.len() {
                return Err(Error::MalformedPacket(mqtt_core::CodecError::MalformedPacket(
                    "read buffer exhausted before a complete packet arrived",
                )));
            }
            let mut outbound = self.outbound.lock().unwrap();
            match outbound.transport.read(&mut buf[*filled..], POLL_READ_TIMEOUT) {
                Ok(ReadOutcome::Read(n)) => n,
                Ok(ReadOutcome::NothingToRead) => return Ok(None),
                Err(err) => return Err(Error::TransportFailure(err)),
            }
        };
        inbound.filled += n;

        Self::try_decode(&mut inbound)
    }

    /// Attempts to decode one packet from the bytes already buffered,
    /// consuming them on success and leaving anything left over for the
    /// next call. Any fixed-header decode failure is treated as "not enough
    /// bytes yet" rather than corruption, since the codec does not
    /// distinguish the two (§4.A only promises a synchronous decode over a
    /// complete frame).
    fn try_decode(inbound: &mut Inbound) -> Result<Option<Frame>, Error> {
        let available = &inbound.buf[..inbound.filled];
        if available.is_empty() {
            return Ok(None);
        }
        let (header, header_len) = match mqtt_core::decode_fixed_header(available) {
            Ok(parsed) => parsed,
            Err(_) => return Ok(None),
        };
        let body_end = header_len + header.remaining_length;
        if available.len() < body_end {
            return Ok(None);
        }
        let packet = mqtt_core::decode_packet(&header, &available[header_len..body_end])?;
        let frame = Frame::from_packet(&packet);
        inbound.buf.copy_within(body_end..inbound.filled, 0);
        inbound.filled -= body_end;
        Ok(Some(frame))
    }
}

impl<T: Transport> Drop for Client<T> {
    fn drop(&mut self) {
        let _ = self.disconnect();
        self.emit(Event::ClientDestroy);
    }
}
