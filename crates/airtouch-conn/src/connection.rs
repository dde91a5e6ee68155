use std::fmt;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Arc, Mutex as StdMutex, PoisonError};
use std::time::{Duration, Instant};

use airtouch_frame::{FrameCodec, FrameError, Generation};
use airtouch_message::{Message, Registry};
use futures_util::{SinkExt, StreamExt};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, watch, Mutex, Notify};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::codec::{FramedRead, FramedWrite};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

use crate::config::ConnectionConfig;
use crate::connector::open_stream;
use crate::dispatch::{dispatch_loop, ConnectionEvent, Subscribers, Subscription, SubscriptionId};
use crate::error::{ConnectionError, Result};

type Reader = FramedRead<OwnedReadHalf, FrameCodec>;
type Writer = FramedWrite<OwnedWriteHalf, FrameCodec>;

/// Lifecycle of a [`Connection`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
    Reconnecting,
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ConnectionState::Disconnected => "disconnected",
            ConnectionState::Connecting => "connecting",
            ConnectionState::Connected => "connected",
            ConnectionState::Reconnecting => "reconnecting",
        };
        f.write_str(name)
    }
}

/// Why a session's read side stopped.
#[derive(Debug)]
enum Interruption {
    Closed,
    Failed(FrameError),
    Stale,
}

/// Tasks belonging to one successful `connect`.
struct Session {
    cancel: CancellationToken,
    tasks: Vec<JoinHandle<()>>,
}

impl Session {
    async fn stop(self) {
        self.cancel.cancel();
        for task in self.tasks {
            let _ = task.await;
        }
    }
}

struct Inner {
    addr: SocketAddr,
    generation: Generation,
    codec: FrameCodec,
    config: ConnectionConfig,
    registry: Arc<Registry>,
    state: watch::Sender<ConnectionState>,
    writer: Mutex<Option<Writer>>,
    sequence: AtomicU8,
    last_traffic: StdMutex<Instant>,
    /// Woken on every inbound frame.
    inbound: Notify,
    /// Signalled when the session is stale or a write failed.
    broken: Notify,
    subscribers: Arc<Subscribers>,
    events: mpsc::Sender<ConnectionEvent>,
    pending_events: StdMutex<Option<mpsc::Receiver<ConnectionEvent>>>,
    dispatcher: StdMutex<Option<JoinHandle<()>>>,
    session: Mutex<Option<Session>>,
    cancel: CancellationToken,
}

/// A managed connection to one console.
///
/// Received messages are decoded on a read task and handed, in arrival
/// order, to a single dispatcher task that calls the subscribed handlers.
/// A heartbeat task keeps the session alive and a lost session is reopened
/// with exponential backoff.
///
/// Dropping the connection stops its background tasks.
pub struct Connection {
    inner: Arc<Inner>,
}

impl Connection {
    /// Create a disconnected connection using the built-in codecs for
    /// `generation`.
    pub fn new(addr: SocketAddr, generation: Generation, config: ConnectionConfig) -> Self {
        Self::with_registry(addr, generation, config, Registry::shared(generation))
    }

    /// Create a disconnected connection with a custom codec registry.
    pub fn with_registry(
        addr: SocketAddr,
        generation: Generation,
        config: ConnectionConfig,
        registry: Arc<Registry>,
    ) -> Self {
        let format = generation
            .format()
            .with_max_payload_size(config.max_payload_size);
        let (events, pending) = mpsc::channel(config.dispatch_capacity.max(1));
        let (state, _) = watch::channel(ConnectionState::Disconnected);
        Self {
            inner: Arc::new(Inner {
                addr,
                generation,
                codec: FrameCodec::new(format),
                config,
                registry,
                state,
                writer: Mutex::new(None),
                sequence: AtomicU8::new(0),
                last_traffic: StdMutex::new(Instant::now()),
                inbound: Notify::new(),
                broken: Notify::new(),
                subscribers: Arc::new(Subscribers::default()),
                events,
                pending_events: StdMutex::new(Some(pending)),
                dispatcher: StdMutex::new(None),
                session: Mutex::new(None),
                cancel: CancellationToken::new(),
            }),
        }
    }

    pub fn addr(&self) -> SocketAddr {
        self.inner.addr
    }

    pub fn generation(&self) -> Generation {
        self.inner.generation
    }

    pub fn registry(&self) -> &Arc<Registry> {
        &self.inner.registry
    }

    pub fn state(&self) -> ConnectionState {
        self.inner.state()
    }

    /// Watch state transitions.
    pub fn state_changes(&self) -> watch::Receiver<ConnectionState> {
        self.inner.state.subscribe()
    }

    /// Register `handler` for events matching `subscription`.
    ///
    /// Handlers run on the dispatcher task and should not block.
    pub fn subscribe<F>(&self, subscription: Subscription, handler: F) -> SubscriptionId
    where
        F: Fn(&ConnectionEvent) + Send + Sync + 'static,
    {
        self.inner.subscribers.add(subscription, Arc::new(handler))
    }

    /// Remove a handler. Returns `false` if it was not registered.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.inner.subscribers.remove(id)
    }

    /// Encode and write one message.
    ///
    /// Messages without a registered codec fail before anything is written.
    pub async fn send(&self, message: &Message) -> Result<()> {
        self.inner.send(message).await
    }

    /// Open the socket, start the background tasks and send the first
    /// heartbeat.
    ///
    /// With `require_initial_response` set, succeeds only once the console
    /// has sent a frame back. Calling this while connected is a no-op.
    pub async fn connect(&self) -> Result<()> {
        let inner = &self.inner;
        if inner.cancel.is_cancelled() {
            return Err(ConnectionError::Shutdown);
        }
        let mut session = inner.session.lock().await;
        if matches!(
            inner.state(),
            ConnectionState::Connected | ConnectionState::Reconnecting
        ) {
            return Ok(());
        }
        if let Some(previous) = session.take() {
            previous.stop().await;
        }

        inner.start_dispatcher();
        inner.set_state(ConnectionState::Connecting);
        let stream = match open_stream(inner.addr, inner.config.connect_timeout).await {
            Ok(stream) => stream,
            Err(err) => {
                inner.set_state(ConnectionState::Disconnected);
                return Err(err);
            }
        };

        // Created before the read task starts so the first frame cannot be missed.
        let first_frame = inner.inbound.notified();
        let reader = inner.install(stream).await;
        let cancel = inner.cancel.child_token();
        let started = Session {
            tasks: vec![
                tokio::spawn(supervise(Arc::clone(inner), reader, cancel.clone())),
                tokio::spawn(heartbeat(Arc::clone(inner), cancel.clone())),
            ],
            cancel,
        };

        let outcome = match inner.send(&Message::heartbeat()).await {
            Err(err) => Err(err),
            Ok(()) if !inner.config.require_initial_response => Ok(()),
            Ok(()) => tokio::time::timeout(inner.config.response_timeout, first_frame)
                .await
                .map_err(|_| ConnectionError::NoResponse(inner.config.response_timeout)),
        };

        match outcome {
            Ok(()) => {
                inner.transition(ConnectionState::Connecting, ConnectionState::Connected);
                info!(addr = %inner.addr, generation = %inner.generation, "connected to console");
                *session = Some(started);
                Ok(())
            }
            Err(err) => {
                started.stop().await;
                inner.close_writer().await;
                inner.set_state(ConnectionState::Disconnected);
                Err(err)
            }
        }
    }

    /// Stop all background tasks and close the socket.
    ///
    /// Safe to call more than once. The connection cannot be reopened.
    pub async fn shutdown(&self) {
        let inner = &self.inner;
        inner.cancel.cancel();
        let session = inner.session.lock().await.take();
        if let Some(session) = session {
            session.stop().await;
        }
        let dispatcher = inner
            .dispatcher
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(task) = dispatcher {
            let _ = task.await;
        }
        inner.close_writer().await;
        if inner.set_state(ConnectionState::Disconnected) {
            info!(addr = %inner.addr, "connection shut down");
        }
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        self.inner.cancel.cancel();
    }
}

impl fmt::Debug for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connection")
            .field("addr", &self.inner.addr)
            .field("generation", &self.inner.generation)
            .field("state", &self.inner.state())
            .finish_non_exhaustive()
    }
}

impl Inner {
    fn state(&self) -> ConnectionState {
        *self.state.borrow()
    }

    /// Returns whether the state changed.
    fn set_state(&self, next: ConnectionState) -> bool {
        let previous = self.state.send_replace(next);
        if previous != next {
            debug!(addr = %self.addr, from = %previous, to = %next, "connection state changed");
        }
        previous != next
    }

    fn transition(&self, from: ConnectionState, to: ConnectionState) {
        self.state.send_if_modified(|state| {
            if *state != from {
                return false;
            }
            *state = to;
            true
        });
    }

    fn touch(&self) {
        *self
            .last_traffic
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Instant::now();
    }

    fn idle_for(&self) -> Duration {
        self.last_traffic
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .elapsed()
    }

    fn start_dispatcher(&self) {
        let mut dispatcher = self
            .dispatcher
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if dispatcher.is_some() {
            return;
        }
        let pending = self
            .pending_events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(events) = pending {
            *dispatcher = Some(tokio::spawn(dispatch_loop(
                Arc::clone(&self.subscribers),
                events,
                self.cancel.clone(),
            )));
        }
    }

    /// Split a fresh stream, publish its write half and return the read half.
    async fn install(&self, stream: TcpStream) -> Reader {
        let (read_half, write_half) = stream.into_split();
        *self.writer.lock().await = Some(FramedWrite::new(write_half, self.codec));
        self.touch();
        FramedRead::new(read_half, self.codec)
    }

    async fn close_writer(&self) {
        let writer = self.writer.lock().await.take();
        if let Some(mut writer) = writer {
            let _ = writer.close().await;
        }
    }

    async fn send(&self, message: &Message) -> Result<()> {
        let encoded = self.registry.encode(message)?;
        let max = self.codec.format().max_payload_size.min(u16::MAX as usize);
        if encoded.payload.len() > max {
            return Err(FrameError::PayloadTooLarge {
                size: encoded.payload.len(),
                max,
            }
            .into());
        }

        let mut writer = self.writer.lock().await;
        let sink = writer.as_mut().ok_or(ConnectionError::NotConnected)?;
        let frame = encoded.into_frame(self.sequence.fetch_add(1, Ordering::Relaxed));
        trace!(kind = %message.kind(), sequence = frame.sequence, "sending message");

        match sink.send(frame).await {
            Ok(()) => Ok(()),
            // Only a failed socket write ends the session.
            Err(err @ FrameError::Io(_)) => {
                *writer = None;
                if self.state() == ConnectionState::Connected {
                    self.broken.notify_one();
                }
                Err(err.into())
            }
            Err(err) => Err(err.into()),
        }
    }

    /// Decode frames until the stream ends or fails.
    async fn read_frames(&self, reader: &mut Reader) -> Interruption {
        while let Some(item) = reader.next().await {
            let frame = match item {
                Ok(frame) => frame,
                Err(err) => return Interruption::Failed(err),
            };
            self.touch();
            self.inbound.notify_waiters();

            match self.registry.decode_frame(&frame) {
                Ok(Some(message)) => {
                    trace!(kind = %message.kind(), sequence = frame.sequence, "received message");
                    if self
                        .events
                        .send(ConnectionEvent::Message(message))
                        .await
                        .is_err()
                    {
                        debug!("dispatcher stopped, dropping message");
                    }
                }
                Ok(None) => {}
                Err(err) => warn!(
                    category = frame.category,
                    payload = ?frame.payload,
                    error = %err,
                    "dropping undecodable message"
                ),
            }
        }
        Interruption::Closed
    }

    /// Try to reopen the socket. `None` once attempts run out or on cancel.
    async fn reconnect(&self, cancel: &CancellationToken) -> Option<Reader> {
        let attempts = self.config.max_reconnect_attempts;
        for attempt in 1..=attempts {
            let delay = self.config.backoff_for(attempt);
            tokio::select! {
                _ = cancel.cancelled() => return None,
                _ = tokio::time::sleep(delay) => {}
            }

            match open_stream(self.addr, self.config.connect_timeout).await {
                Ok(stream) => {
                    let reader = self.install(stream).await;
                    self.set_state(ConnectionState::Connected);
                    info!(addr = %self.addr, attempt, "reconnected to console");
                    if let Err(err) = self.send(&Message::heartbeat()).await {
                        debug!(error = %err, "heartbeat after reconnect failed");
                    }
                    return Some(reader);
                }
                Err(err) => {
                    warn!(addr = %self.addr, attempt, attempts, error = %err, "reconnect attempt failed");
                }
            }
        }
        None
    }
}

/// Owns the read half for a session, reconnecting when it is interrupted.
async fn supervise(inner: Arc<Inner>, mut reader: Reader, cancel: CancellationToken) {
    loop {
        let interruption = tokio::select! {
            _ = cancel.cancelled() => return,
            interruption = inner.read_frames(&mut reader) => interruption,
            _ = inner.broken.notified() => Interruption::Stale,
        };
        if cancel.is_cancelled() {
            return;
        }

        warn!(addr = %inner.addr, ?interruption, "console connection interrupted, reconnecting");
        inner.set_state(ConnectionState::Reconnecting);
        inner.close_writer().await;
        drop(reader);

        reader = match inner.reconnect(&cancel).await {
            Some(reader) => reader,
            None => break,
        };
    }

    if cancel.is_cancelled() {
        return;
    }
    warn!(
        addr = %inner.addr,
        attempts = inner.config.max_reconnect_attempts,
        "giving up on console"
    );
    inner.set_state(ConnectionState::Disconnected);
    let _ = inner.events.send(ConnectionEvent::ConnectionLost).await;
    cancel.cancel();
}

/// Periodically request the console version and flag silent sessions.
async fn heartbeat(inner: Arc<Inner>, cancel: CancellationToken) {
    let period = inner.config.heartbeat_interval.max(Duration::from_millis(1));
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // The first tick fires immediately and `connect` already sent one.
    ticker.tick().await;

    loop {
        tokio::select! {
            _ = cancel.cancelled() => return,
            _ = ticker.tick() => {}
        }
        if inner.state() != ConnectionState::Connected {
            continue;
        }

        let idle = inner.idle_for();
        if idle >= inner.config.heartbeat_timeout {
            warn!(addr = %inner.addr, ?idle, "no traffic from console, session is stale");
            inner.broken.notify_one();
            continue;
        }

        let request = Message::heartbeat();
        tokio::select! {
            _ = cancel.cancelled() => return,
            sent = inner.send(&request) => {
                if let Err(err) = sent {
                    debug!(error = %err, "heartbeat failed");
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex as TestMutex;

    use airtouch_frame::{Frame, ADDRESS_EXTENDED_RESPONSE, ADDRESS_RESPONSE, EXTENDED};
    use airtouch_message::{
        AcErrorInformation, ConsoleVersion, EncodeError, GroupNames, GroupSelector, MessageKind,
        SensorBatteryStatus, ZoneControlMethod, ZonePowerState, ZoneStatus, ZoneStatusData,
    };
    use airtouch_frame::decode_frame;
    use bytes::BytesMut;
    use tokio::io::AsyncReadExt;
    use tokio::net::TcpListener;

    use super::*;

    const WAIT: Duration = Duration::from_secs(3);

    struct FakeConsole {
        reader: FramedRead<OwnedReadHalf, FrameCodec>,
        writer: FramedWrite<OwnedWriteHalf, FrameCodec>,
        registry: Arc<Registry>,
    }

    impl FakeConsole {
        async fn accept(listener: &TcpListener) -> Self {
            let (stream, _) = tokio::time::timeout(WAIT, listener.accept())
                .await
                .expect("client should connect")
                .unwrap();
            let codec = FrameCodec::new(Generation::AirTouch5.format());
            let (read_half, write_half) = stream.into_split();
            Self {
                reader: FramedRead::new(read_half, codec),
                writer: FramedWrite::new(write_half, codec),
                registry: Registry::shared(Generation::AirTouch5),
            }
        }

        async fn recv(&mut self) -> (Frame, Message) {
            let frame = tokio::time::timeout(WAIT, self.reader.next())
                .await
                .expect("client should send a frame")
                .expect("stream open")
                .unwrap();
            let message = self.registry.decode_frame(&frame).unwrap().unwrap();
            (frame, message)
        }

        async fn reply(&mut self, message: Message) {
            let encoded = self.registry.encode(&message).unwrap();
            let address = if encoded.category == EXTENDED {
                ADDRESS_EXTENDED_RESPONSE
            } else {
                ADDRESS_RESPONSE
            };
            self.writer
                .send(Frame::new(address, 0, encoded.category, encoded.payload))
                .await
                .unwrap();
        }

        /// Accept the heartbeat sent by `connect` and answer it.
        async fn handshake(listener: &TcpListener) -> Self {
            let mut console = Self::accept(listener).await;
            let (_, message) = console.recv().await;
            assert_eq!(message, Message::heartbeat());
            console.reply(version_report()).await;
            console
        }
    }

    fn version_report() -> Message {
        ConsoleVersion::Report {
            update_available: false,
            versions: vec!["1.0.0".into()],
        }
        .into()
    }

    fn zone(zone_number: u8) -> ZoneStatusData {
        ZoneStatusData {
            zone_number,
            zone_power_state: ZonePowerState::On,
            control_method: ZoneControlMethod::Temperature,
            damper_percentage: 50,
            set_point: Some(21.0),
            has_sensor: true,
            temperature: Some(20.5),
            spill_active: false,
            sensor_battery_status: SensorBatteryStatus::Normal,
        }
    }

    fn zone_report(zone_number: u8) -> Message {
        ZoneStatus::Report(vec![zone(zone_number)]).into()
    }

    fn test_config() -> ConnectionConfig {
        ConnectionConfig {
            connect_timeout: Duration::from_secs(1),
            response_timeout: Duration::from_secs(1),
            reconnect_backoff: Duration::from_millis(10),
            max_reconnect_backoff: Duration::from_millis(50),
            ..ConnectionConfig::default()
        }
    }

    fn recorder(connection: &Connection, subscription: Subscription) -> Arc<TestMutex<Vec<ConnectionEvent>>> {
        let seen = Arc::new(TestMutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        connection.subscribe(subscription, move |event| {
            sink.lock().unwrap().push(event.clone());
        });
        seen
    }

    async fn wait_until(mut condition: impl FnMut() -> bool) {
        tokio::time::timeout(WAIT, async {
            while !condition() {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .expect("condition should hold in time");
    }

    async fn listener() -> (TcpListener, SocketAddr) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        (listener, addr)
    }

    #[tokio::test]
    async fn connect_sends_heartbeat_and_waits_for_reply() {
        let (listener, addr) = listener().await;
        let connection = Connection::new(addr, Generation::AirTouch5, test_config());

        let server = async {
            let mut console = FakeConsole::accept(&listener).await;
            let (frame, message) = console.recv().await;
            assert_eq!(frame.category, EXTENDED);
            assert_eq!(frame.address, airtouch_frame::ADDRESS_EXTENDED_REQUEST);
            assert_eq!(message, Message::heartbeat());
            console.reply(version_report()).await;
            console
        };
        let (connected, _console) = tokio::join!(connection.connect(), server);
        connected.unwrap();
        assert_eq!(connection.state(), ConnectionState::Connected);

        connection.shutdown().await;
    }

    #[tokio::test]
    async fn connect_fails_without_initial_response() {
        let (listener, addr) = listener().await;
        let config = ConnectionConfig {
            response_timeout: Duration::from_millis(100),
            ..test_config()
        };
        let connection = Connection::new(addr, Generation::AirTouch5, config);

        let server = async {
            let mut console = FakeConsole::accept(&listener).await;
            console.recv().await;
            console
        };
        let (connected, _console) = tokio::join!(connection.connect(), server);
        assert!(matches!(connected, Err(ConnectionError::NoResponse(_))));
        assert_eq!(connection.state(), ConnectionState::Disconnected);
    }

    #[tokio::test]
    async fn connect_to_closed_port_fails() {
        let (listener, addr) = listener().await;
        drop(listener);
        let connection = Connection::new(addr, Generation::AirTouch5, test_config());
        assert!(matches!(
            connection.connect().await,
            Err(ConnectionError::Connect { .. })
        ));
        assert_eq!(connection.state(), ConnectionState::Disconnected);
    }

    #[tokio::test]
    async fn messages_dispatch_in_arrival_order() {
        let (listener, addr) = listener().await;
        let connection = Connection::new(addr, Generation::AirTouch5, test_config());
        let zones = recorder(&connection, Subscription::Kind(MessageKind::ZoneStatus));
        let all = recorder(&connection, Subscription::All);

        let (connected, mut console) =
            tokio::join!(connection.connect(), FakeConsole::handshake(&listener));
        connected.unwrap();

        for zone in 0..3 {
            console.reply(zone_report(zone)).await;
        }
        let ac_error: Message = AcErrorInformation::Report {
            ac_number: 0,
            error_info: Some("E1".into()),
        }
        .into();
        console.reply(ac_error.clone()).await;

        wait_until(|| all.lock().unwrap().len() == 5).await;

        let expected_zones: Vec<ConnectionEvent> =
            (0..3).map(|z| ConnectionEvent::Message(zone_report(z))).collect();
        assert_eq!(*zones.lock().unwrap(), expected_zones);

        let all = all.lock().unwrap();
        assert_eq!(all[0], ConnectionEvent::Message(version_report()));
        assert_eq!(&all[1..4], &expected_zones[..]);
        assert_eq!(all[4], ConnectionEvent::Message(ac_error));
        drop(all);

        connection.shutdown().await;
    }

    #[tokio::test]
    async fn sends_use_increasing_sequence_numbers() {
        let (listener, addr) = listener().await;
        let connection = Connection::new(addr, Generation::AirTouch5, test_config());
        let (connected, mut console) =
            tokio::join!(connection.connect(), FakeConsole::handshake(&listener));
        connected.unwrap();

        connection
            .send(&ZoneStatus::Request.into())
            .await
            .unwrap();
        connection
            .send(&AcErrorInformation::Request { ac_number: 1 }.into())
            .await
            .unwrap();

        let (first, message) = console.recv().await;
        assert_eq!(message, ZoneStatus::Request.into());
        assert_eq!(first.sequence, 1);
        let (second, _) = console.recv().await;
        assert_eq!(second.sequence, 2);

        connection.shutdown().await;
    }

    #[tokio::test]
    async fn concurrent_sends_arrive_as_whole_frames() {
        const SENDERS: u8 = 32;
        let (listener, addr) = listener().await;
        let connection = Arc::new(Connection::new(addr, Generation::AirTouch5, test_config()));
        let (connected, console) =
            tokio::join!(connection.connect(), FakeConsole::handshake(&listener));
        connected.unwrap();

        let sends: Vec<_> = (0..SENDERS)
            .map(|ac_number| {
                let connection = Arc::clone(&connection);
                tokio::spawn(async move {
                    let message: Message = AcErrorInformation::Report {
                        ac_number,
                        error_info: Some("E".repeat(200)),
                    }
                    .into();
                    connection.send(&message).await
                })
            })
            .collect();
        for send in sends {
            send.await.unwrap().unwrap();
        }

        // Read raw bytes so a corrupt frame surfaces as an error instead of
        // being skipped by the codec.
        let registry = Registry::shared(Generation::AirTouch5);
        let format = Generation::AirTouch5.format();
        let mut buf = BytesMut::from(&console.reader.read_buffer()[..]);
        let mut stream = console.reader.into_inner();
        let mut seen = Vec::new();
        while seen.len() < usize::from(SENDERS) {
            match decode_frame(&mut buf, &format).expect("frame should be intact") {
                Some(frame) => match registry.decode_frame(&frame).unwrap() {
                    Some(Message::AcErrorInformation(info)) => seen.push(info.ac_number()),
                    other => panic!("unexpected message: {other:?}"),
                },
                None => {
                    let read = tokio::time::timeout(WAIT, stream.read_buf(&mut buf))
                        .await
                        .expect("more frames should arrive")
                        .unwrap();
                    assert!(read > 0, "console stream closed early");
                }
            }
        }
        assert!(buf.is_empty());
        seen.sort_unstable();
        assert_eq!(seen, (0..SENDERS).collect::<Vec<_>>());

        connection.shutdown().await;
    }

    #[tokio::test]
    async fn oversized_send_keeps_session() {
        let (listener, addr) = listener().await;
        let connection = Connection::new(addr, Generation::AirTouch5, test_config());
        let (connected, mut console) =
            tokio::join!(connection.connect(), FakeConsole::handshake(&listener));
        connected.unwrap();

        let zones = (0..600u16).map(|n| zone((n % 256) as u8)).collect();
        let err = connection
            .send(&ZoneStatus::Report(zones).into())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ConnectionError::Frame(FrameError::PayloadTooLarge { size: 4808, max: 4096 })
        ));
        assert_eq!(connection.state(), ConnectionState::Connected);

        connection.send(&Message::heartbeat()).await.unwrap();
        let (_, message) = console.recv().await;
        assert_eq!(message, Message::heartbeat());
        assert_eq!(connection.state(), ConnectionState::Connected);

        connection.shutdown().await;
    }

    #[tokio::test]
    async fn silent_console_triggers_reconnect() {
        let (listener, addr) = listener().await;
        let config = ConnectionConfig {
            heartbeat_interval: Duration::from_millis(50),
            heartbeat_timeout: Duration::from_millis(200),
            reconnect_backoff: Duration::from_millis(100),
            ..test_config()
        };
        let connection = Connection::new(addr, Generation::AirTouch5, config);
        let (connected, _silent) =
            tokio::join!(connection.connect(), FakeConsole::handshake(&listener));
        connected.unwrap();

        let mut changes = connection.state_changes();
        tokio::time::timeout(
            WAIT,
            changes.wait_for(|state| *state == ConnectionState::Reconnecting),
        )
        .await
        .expect("stale session should be detected")
        .unwrap();

        // The new session opens with a heartbeat.
        let mut console = FakeConsole::accept(&listener).await;
        let (_, message) = console.recv().await;
        assert_eq!(message, Message::heartbeat());
        wait_until(|| connection.state() == ConnectionState::Connected).await;

        connection.shutdown().await;
    }

    #[tokio::test]
    async fn exhausted_reconnects_report_connection_lost() {
        let (listener, addr) = listener().await;
        let config = ConnectionConfig {
            max_reconnect_attempts: 2,
            ..test_config()
        };
        let connection = Connection::new(addr, Generation::AirTouch5, config);
        let zones = recorder(&connection, Subscription::Kind(MessageKind::ZoneStatus));

        let (connected, console) =
            tokio::join!(connection.connect(), FakeConsole::handshake(&listener));
        connected.unwrap();

        drop(listener);
        drop(console);

        wait_until(|| {
            zones
                .lock()
                .unwrap()
                .contains(&ConnectionEvent::ConnectionLost)
        })
        .await;
        assert_eq!(connection.state(), ConnectionState::Disconnected);
        assert!(matches!(
            connection.send(&Message::heartbeat()).await,
            Err(ConnectionError::NotConnected)
        ));

        connection.shutdown().await;
    }

    #[tokio::test]
    async fn unregistered_message_fails_before_writing() {
        let (_listener, addr) = listener().await;
        let connection = Connection::new(addr, Generation::AirTouch5, test_config());

        let err = connection
            .send(&GroupNames::Request(GroupSelector::All).into())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ConnectionError::Encode(EncodeError::Unregistered(MessageKind::GroupNames))
        ));

        let err = connection.send(&Message::heartbeat()).await.unwrap_err();
        assert!(matches!(err, ConnectionError::NotConnected));
    }

    #[tokio::test]
    async fn shutdown_is_idempotent() {
        let (listener, addr) = listener().await;
        let connection = Connection::new(addr, Generation::AirTouch5, test_config());
        let (connected, _console) =
            tokio::join!(connection.connect(), FakeConsole::handshake(&listener));
        connected.unwrap();

        connection.shutdown().await;
        connection.shutdown().await;
        assert_eq!(connection.state(), ConnectionState::Disconnected);
        assert!(matches!(
            connection.connect().await,
            Err(ConnectionError::Shutdown)
        ));
    }
}
