use crate::domain::model::{ConnectionState, DisconnectReason};
use crate::domain::ports::{ConnectRequest, Transport, TransportFrame, TransportSession};
use crate::utils::validation::validate_token_shape;
use serde_json::Value;
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Mutex, PoisonError, Weak};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// 連線後送出的加入事件，伺服器依此把使用者放進自己的 room
pub const JOIN_EVENT: &str = "join";

const TEARDOWN_GRACE: Duration = Duration::from_secs(2);

pub type EventCallback = Arc<dyn Fn(&Value) + Send + Sync>;

#[derive(Clone)]
pub struct SessionCredentials {
    pub user_id: String,
    pub token: String,
}

impl std::fmt::Debug for SessionCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionCredentials")
            .field("user_id", &self.user_id)
            .field("token", &"<redacted>")
            .finish()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconnectPolicy {
    pub enabled: bool,
    pub max_attempts: u32,
    pub delay: Duration,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            enabled: true,
            max_attempts: 5,
            delay: Duration::from_millis(1000),
        }
    }
}

#[derive(Debug, Clone)]
pub struct RelayOptions {
    pub base_url: String,
    pub socket_path: String,
    pub reconnect: ReconnectPolicy,
}

/// 事件名稱比對；`*` 只匹配一個以 `:` 分隔的區段
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventPattern {
    raw: String,
    wildcard: bool,
}

impl EventPattern {
    pub fn new(name: &str) -> Self {
        Self {
            raw: name.to_string(),
            wildcard: name.split(':').any(|segment| segment == "*"),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn matches(&self, event: &str) -> bool {
        if !self.wildcard {
            return self.raw == event;
        }

        let mut pattern = self.raw.split(':');
        let mut name = event.split(':');
        loop {
            match (pattern.next(), name.next()) {
                (None, None) => return true,
                (Some("*"), Some(_)) => continue,
                (Some(expected), Some(actual)) if expected == actual => continue,
                _ => return false,
            }
        }
    }
}

struct ListenerEntry {
    id: u64,
    pattern: EventPattern,
    callback: EventCallback,
}

#[derive(Default)]
struct ListenerRegistry {
    next_id: u64,
    entries: Vec<ListenerEntry>,
}

impl ListenerRegistry {
    fn register(&mut self, pattern: EventPattern, callback: EventCallback) -> u64 {
        self.next_id += 1;
        let id = self.next_id;
        self.entries.push(ListenerEntry {
            id,
            pattern,
            callback,
        });
        id
    }

    fn remove(&mut self, id: u64) -> bool {
        let before = self.entries.len();
        self.entries.retain(|entry| entry.id != id);
        self.entries.len() != before
    }

    /// 依註冊順序回傳符合的 callback
    fn matching(&self, event: &str) -> Vec<EventCallback> {
        self.entries
            .iter()
            .filter(|entry| entry.pattern.matches(event))
            .map(|entry| Arc::clone(&entry.callback))
            .collect()
    }

    fn len(&self) -> usize {
        self.entries.len()
    }
}

struct RelayShared {
    listeners: Mutex<ListenerRegistry>,
    state: watch::Sender<ConnectionState>,
}

impl RelayShared {
    fn new() -> Self {
        let (state, _) = watch::channel(ConnectionState::Disconnected);
        Self {
            listeners: Mutex::new(ListenerRegistry::default()),
            state,
        }
    }

    fn registry(&self) -> std::sync::MutexGuard<'_, ListenerRegistry> {
        self.listeners.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn dispatch(&self, event: &str, payload: &Value) {
        // 先複製再呼叫，callback 內可以安全地取消訂閱
        let callbacks = self.registry().matching(event);
        if callbacks.is_empty() {
            tracing::trace!("No listeners for '{}'", event);
            return;
        }

        tracing::debug!("📨 Dispatching '{}' to {} listener(s)", event, callbacks.len());
        for callback in callbacks {
            let outcome = std::panic::catch_unwind(AssertUnwindSafe(|| callback(payload)));
            if outcome.is_err() {
                tracing::error!("❌ Listener for '{}' panicked; continuing fan-out", event);
            }
        }
    }

    fn set_state(&self, next: ConnectionState) {
        let changed = self.state.send_if_modified(|current| {
            if *current == next {
                false
            } else {
                *current = next;
                true
            }
        });
        if changed {
            tracing::debug!("🔌 Relay state -> {}", next);
        }
    }

    fn state(&self) -> ConnectionState {
        *self.state.borrow()
    }
}

/// 取消訂閱的權杖；呼叫 `unsubscribe` 或 drop 時移除 listener
#[must_use = "dropping a Subscription removes the listener immediately"]
pub struct Subscription {
    shared: Weak<RelayShared>,
    id: Option<u64>,
    event: String,
}

impl Subscription {
    fn inert(event: &str) -> Self {
        Self {
            shared: Weak::new(),
            id: None,
            event: event.to_string(),
        }
    }

    pub fn event_name(&self) -> &str {
        &self.event
    }

    pub fn is_active(&self) -> bool {
        self.id.is_some() && self.shared.strong_count() > 0
    }

    pub fn unsubscribe(mut self) {
        self.release();
    }

    fn release(&mut self) {
        if let (Some(id), Some(shared)) = (self.id.take(), self.shared.upgrade()) {
            if shared.registry().remove(id) {
                tracing::trace!("Listener for '{}' removed", self.event);
            }
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.release();
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("event", &self.event)
            .field("active", &self.is_active())
            .finish()
    }
}

/// 借給各個消費端的弱參考，不延長 relay 的生命週期
#[derive(Clone)]
pub struct RelayHandle {
    shared: Weak<RelayShared>,
}

impl RelayHandle {
    pub fn subscribe<F>(&self, event: &str, callback: F) -> Subscription
    where
        F: Fn(&Value) + Send + Sync + 'static,
    {
        match self.shared.upgrade() {
            Some(shared) => {
                let id = shared
                    .registry()
                    .register(EventPattern::new(event), Arc::new(callback));
                Subscription {
                    shared: Arc::downgrade(&shared),
                    id: Some(id),
                    event: event.to_string(),
                }
            }
            None => {
                tracing::debug!("Relay already dropped, '{}' subscription is inert", event);
                Subscription::inert(event)
            }
        }
    }

    /// `false` 表示不保證送達，不是錯誤
    pub fn current_ready_state(&self) -> bool {
        self.state().is_ready()
    }

    pub fn state(&self) -> ConnectionState {
        self.shared
            .upgrade()
            .map(|shared| shared.state())
            .unwrap_or(ConnectionState::Disconnected)
    }
}

struct ActiveSession {
    shutdown: watch::Sender<bool>,
    task: JoinHandle<()>,
}

/// 每個登入使用者一條即時通道，將伺服器事件分送給所有訂閱者
pub struct NotificationRelay<T: Transport> {
    transport: Arc<T>,
    options: RelayOptions,
    shared: Arc<RelayShared>,
    session: Mutex<Option<ActiveSession>>,
}

impl<T: Transport> NotificationRelay<T> {
    pub fn new(transport: T, options: RelayOptions) -> Self {
        Self {
            transport: Arc::new(transport),
            options,
            shared: Arc::new(RelayShared::new()),
            session: Mutex::new(None),
        }
    }

    pub fn handle(&self) -> RelayHandle {
        RelayHandle {
            shared: Arc::downgrade(&self.shared),
        }
    }

    pub fn subscribe<F>(&self, event: &str, callback: F) -> Subscription
    where
        F: Fn(&Value) + Send + Sync + 'static,
    {
        self.handle().subscribe(event, callback)
    }

    pub fn current_ready_state(&self) -> bool {
        self.shared.state().is_ready()
    }

    pub fn state(&self) -> ConnectionState {
        self.shared.state()
    }

    pub fn state_changes(&self) -> watch::Receiver<ConnectionState> {
        self.shared.state.subscribe()
    }

    pub fn listener_count(&self) -> usize {
        self.shared.registry().len()
    }

    /// 開始連線。token 外形不正確時不會嘗試連線並回傳 `false`。
    /// 已有連線時會先拆除舊連線。
    pub async fn start(&self, credentials: SessionCredentials) -> bool {
        self.teardown().await;

        if let Err(e) = validate_token_shape("session.token", &credentials.token) {
            tracing::warn!("🔒 Not connecting real-time channel: {}", e);
            return false;
        }
        if credentials.user_id.trim().is_empty() {
            tracing::warn!("🔒 Not connecting real-time channel: missing user id");
            return false;
        }

        let request = ConnectRequest {
            base_url: self.options.base_url.clone(),
            socket_path: self.options.socket_path.clone(),
            token: credentials.token,
        };
        let (shutdown, shutdown_rx) = watch::channel(false);

        self.shared.set_state(ConnectionState::Connecting);
        let task = tokio::spawn(drive(
            Arc::clone(&self.transport),
            request,
            credentials.user_id,
            self.options.reconnect,
            Arc::clone(&self.shared),
            shutdown_rx,
        ));

        let previous = self
            .session
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .replace(ActiveSession { shutdown, task });
        if let Some(previous) = previous {
            // 併發呼叫 start 時留下的舊 driver
            previous.task.abort();
        }
        true
    }

    /// 關閉連線並釋放 handle；close 失敗或 driver panic 時也一定回到 disconnected
    pub async fn teardown(&self) {
        let active = self
            .session
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();

        if let Some(ActiveSession { shutdown, mut task }) = active {
            let _ = shutdown.send(true);
            match tokio::time::timeout(TEARDOWN_GRACE, &mut task).await {
                Ok(Ok(())) => tracing::debug!("Relay driver stopped"),
                Ok(Err(e)) => tracing::warn!("⚠️ Relay driver ended abnormally: {}", e),
                Err(_) => {
                    tracing::warn!("⚠️ Relay driver did not stop in time, aborting");
                    task.abort();
                }
            }
            tracing::info!("🔌 Real-time channel torn down");
        }

        self.shared.set_state(ConnectionState::Disconnected);
    }
}

impl<T: Transport> Drop for NotificationRelay<T> {
    fn drop(&mut self) {
        let active = self
            .session
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(active) = active {
            active.task.abort();
        }
    }
}

enum SessionEnd {
    Shutdown,
    Disconnected(DisconnectReason),
}

async fn drive<T: Transport>(
    transport: Arc<T>,
    request: ConnectRequest,
    user_id: String,
    policy: ReconnectPolicy,
    shared: Arc<RelayShared>,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut attempts: u32 = 0;

    loop {
        shared.set_state(if attempts == 0 {
            ConnectionState::Connecting
        } else {
            ConnectionState::Reconnecting
        });

        let connected = tokio::select! {
            _ = shutdown.changed() => break,
            result = transport.connect(&request) => result,
        };

        match connected {
            Ok(mut session) => {
                attempts = 0;
                match run_session(&mut session, &user_id, &shared, &mut shutdown).await {
                    SessionEnd::Shutdown => {
                        if let Err(e) = session.close().await {
                            tracing::warn!("⚠️ Error while closing real-time channel: {}", e);
                        }
                        break;
                    }
                    SessionEnd::Disconnected(reason) => {
                        shared.set_state(ConnectionState::Disconnected);
                        if reason.is_intentional() {
                            tracing::info!("🔌 Real-time channel closed ({})", reason);
                            break;
                        }
                        tracing::warn!("⚠️ Real-time channel lost ({})", reason);
                    }
                }
            }
            Err(e) => {
                tracing::warn!("❌ Real-time connection attempt failed: {}", e);
            }
        }

        if !policy.enabled {
            tracing::info!("Reconnection disabled, staying disconnected");
            break;
        }

        attempts += 1;
        if attempts > policy.max_attempts {
            tracing::error!(
                "❌ Giving up on real-time channel after {} reconnection attempts",
                policy.max_attempts
            );
            break;
        }

        shared.set_state(ConnectionState::Reconnecting);
        tracing::debug!(
            "Reconnecting in {:?} (attempt {}/{})",
            policy.delay,
            attempts,
            policy.max_attempts
        );
        tokio::select! {
            _ = shutdown.changed() => break,
            _ = tokio::time::sleep(policy.delay) => {}
        }
    }

    shared.set_state(ConnectionState::Disconnected);
}

async fn run_session<S: TransportSession>(
    session: &mut S,
    user_id: &str,
    shared: &RelayShared,
    shutdown: &mut watch::Receiver<bool>,
) -> SessionEnd {
    if let Err(e) = session
        .emit(JOIN_EVENT, Value::String(user_id.to_string()))
        .await
    {
        return SessionEnd::Disconnected(DisconnectReason::TransportError(e.to_string()));
    }

    shared.set_state(ConnectionState::Connected);
    tracing::info!("✅ Real-time channel connected");

    loop {
        let frame = tokio::select! {
            _ = shutdown.changed() => return SessionEnd::Shutdown,
            frame = session.next_frame() => frame,
        };

        match frame {
            Some(Ok(TransportFrame::Event { name, payload })) => shared.dispatch(&name, &payload),
            Some(Ok(TransportFrame::Disconnect(reason))) => {
                return SessionEnd::Disconnected(reason)
            }
            Some(Err(e)) => {
                return SessionEnd::Disconnected(DisconnectReason::TransportError(e.to_string()))
            }
            None => return SessionEnd::Disconnected(DisconnectReason::TransportClose),
        }
    }
}
