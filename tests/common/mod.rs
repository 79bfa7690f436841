#![allow(dead_code)]

use async_trait::async_trait;
use serde_json::Value;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use subscription_relay::domain::model::{ConnectionState, DisconnectReason};
use subscription_relay::domain::ports::{
    ConnectRequest, Transport, TransportFrame, TransportSession,
};
use subscription_relay::{
    NotificationRelay, ReconnectPolicy, RelayError, RelayOptions, Result, SessionCredentials,
};
use tokio::sync::mpsc;

pub const WAIT: Duration = Duration::from_secs(2);
pub const USER_ID: &str = "64f1c0ffee";
pub const TOKEN: &str = "header.payload.signature";

#[derive(Default)]
pub struct MockStats {
    pub connects: AtomicUsize,
    pub refuse: AtomicBool,
    pub last_token: Mutex<Option<String>>,
}

/// In-memory transport; every accepted connection hands a `ServerSide`
/// to the test through `MockServer::accept`.
pub struct MockTransport {
    stats: Arc<MockStats>,
    sessions: mpsc::UnboundedSender<ServerSide>,
}

pub struct MockServer {
    pub stats: Arc<MockStats>,
    sessions: mpsc::UnboundedReceiver<ServerSide>,
}

pub fn mock_transport() -> (MockTransport, MockServer) {
    let stats = Arc::new(MockStats::default());
    let (tx, rx) = mpsc::unbounded_channel();
    (
        MockTransport {
            stats: Arc::clone(&stats),
            sessions: tx,
        },
        MockServer {
            stats,
            sessions: rx,
        },
    )
}

impl MockServer {
    pub async fn accept(&mut self) -> ServerSide {
        tokio::time::timeout(WAIT, self.sessions.recv())
            .await
            .expect("timed out waiting for a connection")
            .expect("transport dropped")
    }

    pub fn connects(&self) -> usize {
        self.stats.connects.load(Ordering::SeqCst)
    }

    pub fn refuse_all(&self) {
        self.stats.refuse.store(true, Ordering::SeqCst);
    }
}

pub struct ServerSide {
    frames: mpsc::UnboundedSender<Result<TransportFrame>>,
    emitted: mpsc::UnboundedReceiver<(String, Value)>,
    closed: Arc<AtomicBool>,
}

impl ServerSide {
    pub fn push_event(&self, name: &str, payload: Value) {
        let _ = self.frames.send(Ok(TransportFrame::Event {
            name: name.to_string(),
            payload,
        }));
    }

    pub fn disconnect(&self, reason: DisconnectReason) {
        let _ = self.frames.send(Ok(TransportFrame::Disconnect(reason)));
    }

    pub async fn expect_emit(&mut self) -> (String, Value) {
        tokio::time::timeout(WAIT, self.emitted.recv())
            .await
            .expect("timed out waiting for an emitted event")
            .expect("session dropped")
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

pub struct MockSession {
    frames: mpsc::UnboundedReceiver<Result<TransportFrame>>,
    emitted: mpsc::UnboundedSender<(String, Value)>,
    closed: Arc<AtomicBool>,
}

#[async_trait]
impl TransportSession for MockSession {
    async fn emit(&mut self, event: &str, payload: Value) -> Result<()> {
        self.emitted
            .send((event.to_string(), payload))
            .map_err(|_| RelayError::ProtocolError {
                message: "server side gone".to_string(),
            })
    }

    async fn next_frame(&mut self) -> Option<Result<TransportFrame>> {
        self.frames.recv().await
    }

    async fn close(&mut self) -> Result<()> {
        self.closed.store(true, Ordering::SeqCst);
        Ok(())
    }
}

#[async_trait]
impl Transport for MockTransport {
    type Session = MockSession;

    async fn connect(&self, request: &ConnectRequest) -> Result<MockSession> {
        self.stats.connects.fetch_add(1, Ordering::SeqCst);
        *self.stats.last_token.lock().unwrap() = Some(request.token.clone());

        if self.stats.refuse.load(Ordering::SeqCst) {
            return Err(RelayError::ConnectRefused {
                message: "Authentication error".to_string(),
            });
        }

        let (frames_tx, frames_rx) = mpsc::unbounded_channel();
        let (emitted_tx, emitted_rx) = mpsc::unbounded_channel();
        let closed = Arc::new(AtomicBool::new(false));

        let _ = self.sessions.send(ServerSide {
            frames: frames_tx,
            emitted: emitted_rx,
            closed: Arc::clone(&closed),
        });

        Ok(MockSession {
            frames: frames_rx,
            emitted: emitted_tx,
            closed,
        })
    }
}

pub fn relay_options(policy: ReconnectPolicy) -> RelayOptions {
    RelayOptions {
        base_url: "http://localhost:5000".to_string(),
        socket_path: "/socket.io/".to_string(),
        reconnect: policy,
    }
}

pub fn fast_reconnect(max_attempts: u32) -> ReconnectPolicy {
    ReconnectPolicy {
        enabled: true,
        max_attempts,
        delay: Duration::from_millis(10),
    }
}

pub fn credentials() -> SessionCredentials {
    SessionCredentials {
        user_id: USER_ID.to_string(),
        token: TOKEN.to_string(),
    }
}

pub async fn wait_for_state<T: Transport>(relay: &NotificationRelay<T>, state: ConnectionState) {
    let mut changes = relay.state_changes();
    tokio::time::timeout(WAIT, changes.wait_for(|current| *current == state))
        .await
        .unwrap_or_else(|_| panic!("timed out waiting for state {}", state))
        .expect("relay state channel closed");
}

/// Starts a relay, accepts its connection and consumes the join event.
pub async fn connected_relay(
    policy: ReconnectPolicy,
) -> (NotificationRelay<MockTransport>, MockServer, ServerSide) {
    let (transport, mut server) = mock_transport();
    let relay = NotificationRelay::new(transport, relay_options(policy));
    assert!(relay.start(credentials()).await);

    let mut side = server.accept().await;
    let (event, _) = side.expect_emit().await;
    assert_eq!(event, "join");
    wait_for_state(&relay, ConnectionState::Connected).await;

    (relay, server, side)
}

/// Registers a listener on `test:done` and returns a receiver that fires
/// once every earlier frame has been dispatched.
pub fn sentinel<T: Transport>(
    relay: &NotificationRelay<T>,
) -> (subscription_relay::Subscription, mpsc::UnboundedReceiver<()>) {
    let (tx, rx) = mpsc::unbounded_channel();
    let subscription = relay.subscribe("test:done", move |_| {
        let _ = tx.send(());
    });
    (subscription, rx)
}

pub async fn flush(side: &ServerSide, done: &mut mpsc::UnboundedReceiver<()>) {
    side.push_event("test:done", Value::Null);
    tokio::time::timeout(WAIT, done.recv())
        .await
        .expect("timed out waiting for sentinel")
        .expect("sentinel listener dropped");
}
