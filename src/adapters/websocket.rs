use crate::adapters::codec::{self, OpenInfo, Packet};
use crate::domain::model::DisconnectReason;
use crate::domain::ports::{ConnectRequest, Transport, TransportFrame, TransportSession};
use crate::utils::error::{RelayError, Result};
use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use serde_json::{json, Value};
use std::time::Duration;
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use url::Url;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(20);

/// 以 WebSocket 直連 Socket.IO 伺服器（不走 long-polling）
#[derive(Debug, Clone)]
pub struct WebSocketTransport {
    connect_timeout: Duration,
}

impl Default for WebSocketTransport {
    fn default() -> Self {
        Self::new(DEFAULT_CONNECT_TIMEOUT)
    }
}

impl WebSocketTransport {
    pub fn new(connect_timeout: Duration) -> Self {
        Self { connect_timeout }
    }

    /// `http(s)://host` + `/socket.io/` -> `ws(s)://host/socket.io/?EIO=4&transport=websocket`
    pub fn handshake_url(request: &ConnectRequest) -> Result<Url> {
        let mut url = Url::parse(&request.base_url).map_err(|e| {
            RelayError::InvalidConfigValueError {
                field: "server.base_url".to_string(),
                value: request.base_url.clone(),
                reason: format!("Invalid URL format: {}", e),
            }
        })?;

        let scheme = match url.scheme() {
            "http" | "ws" => "ws",
            "https" | "wss" => "wss",
            other => {
                return Err(RelayError::InvalidConfigValueError {
                    field: "server.base_url".to_string(),
                    value: request.base_url.clone(),
                    reason: format!("Unsupported URL scheme: {}", other),
                })
            }
        };
        url.set_scheme(scheme)
            .map_err(|_| RelayError::ConfigError {
                message: format!("Cannot use scheme '{}' for {}", scheme, request.base_url),
            })?;

        let mut path = request.socket_path.trim().to_string();
        if !path.starts_with('/') {
            path.insert(0, '/');
        }
        if !path.ends_with('/') {
            path.push('/');
        }
        url.set_path(&path);
        url.set_query(Some("EIO=4&transport=websocket"));

        Ok(url)
    }
}

#[async_trait]
impl Transport for WebSocketTransport {
    type Session = WebSocketSession;

    async fn connect(&self, request: &ConnectRequest) -> Result<Self::Session> {
        let url = Self::handshake_url(request)?;
        tracing::debug!("🔌 Opening WebSocket to {}", url);

        tokio::time::timeout(self.connect_timeout, handshake(url, &request.token))
            .await
            .map_err(|_| RelayError::ProtocolError {
                message: format!("handshake timed out after {:?}", self.connect_timeout),
            })?
    }
}

async fn handshake(url: Url, token: &str) -> Result<WebSocketSession> {
    let (mut stream, _response) = connect_async(url.as_str()).await?;

    let open = match read_packet(&mut stream).await? {
        Packet::Open(info) => info,
        other => {
            return Err(RelayError::ProtocolError {
                message: format!("expected open packet, got {:?}", other),
            })
        }
    };

    let auth = json!({ "token": token });
    stream
        .send(Message::Text(codec::encode_connect(Some(&auth))?))
        .await?;

    loop {
        match read_packet(&mut stream).await? {
            Packet::Connect(_) => break,
            Packet::ConnectError(data) => {
                let message = data
                    .get("message")
                    .and_then(Value::as_str)
                    .unwrap_or("connection rejected")
                    .to_string();
                return Err(RelayError::ConnectRefused { message });
            }
            Packet::Ping => {
                stream
                    .send(Message::Text(codec::encode_pong().to_string()))
                    .await?
            }
            Packet::Noop => continue,
            other => {
                return Err(RelayError::ProtocolError {
                    message: format!("unexpected packet during handshake: {:?}", other),
                })
            }
        }
    }

    tracing::debug!("Socket.IO session {} established", open.sid);
    Ok(WebSocketSession { stream, open })
}

async fn read_packet(stream: &mut WsStream) -> Result<Packet> {
    loop {
        match stream.next().await {
            Some(Ok(Message::Text(text))) => return codec::decode(&text),
            Some(Ok(Message::Close(_))) | None => {
                return Err(RelayError::ProtocolError {
                    message: "connection closed during handshake".to_string(),
                })
            }
            Some(Ok(_)) => continue,
            Some(Err(e)) => return Err(e.into()),
        }
    }
}

pub struct WebSocketSession {
    stream: WsStream,
    open: OpenInfo,
}

impl WebSocketSession {
    pub fn session_id(&self) -> &str {
        &self.open.sid
    }

    /// 超過 ping 間隔加逾時仍無任何訊息即視為斷線
    fn liveness_window(&self) -> Duration {
        Duration::from_millis(self.open.ping_interval + self.open.ping_timeout)
    }
}

#[async_trait]
impl TransportSession for WebSocketSession {
    async fn emit(&mut self, event: &str, payload: Value) -> Result<()> {
        let frame = codec::encode_event(event, &payload)?;
        self.stream.send(Message::Text(frame)).await?;
        Ok(())
    }

    async fn next_frame(&mut self) -> Option<Result<TransportFrame>> {
        let window = self.liveness_window();

        loop {
            let message = match tokio::time::timeout(window, self.stream.next()).await {
                Err(_) => return Some(Ok(TransportFrame::Disconnect(DisconnectReason::PingTimeout))),
                Ok(None) => return None,
                Ok(Some(Err(e))) => return Some(Err(e.into())),
                Ok(Some(Ok(message))) => message,
            };

            let text = match message {
                Message::Text(text) => text,
                Message::Close(_) => {
                    return Some(Ok(TransportFrame::Disconnect(
                        DisconnectReason::TransportClose,
                    )))
                }
                Message::Binary(_) => {
                    tracing::warn!("⚠️ Ignoring binary frame, binary events are not supported");
                    continue;
                }
                _ => continue,
            };

            match codec::decode(&text) {
                Ok(Packet::Event { name, payload }) => {
                    return Some(Ok(TransportFrame::Event { name, payload }))
                }
                Ok(Packet::Ping) => {
                    if let Err(e) = self
                        .stream
                        .send(Message::Text(codec::encode_pong().to_string()))
                        .await
                    {
                        return Some(Err(e.into()));
                    }
                }
                Ok(Packet::Disconnect) => {
                    return Some(Ok(TransportFrame::Disconnect(
                        DisconnectReason::ServerDisconnect,
                    )))
                }
                Ok(Packet::Close) => {
                    return Some(Ok(TransportFrame::Disconnect(
                        DisconnectReason::TransportClose,
                    )))
                }
                Ok(Packet::ConnectError(data)) => {
                    return Some(Err(RelayError::ConnectRefused {
                        message: data.to_string(),
                    }))
                }
                Ok(other) => tracing::trace!("Ignoring packet {:?}", other),
                Err(e) => tracing::warn!("⚠️ Skipping undecodable frame: {}", e),
            }
        }
    }

    async fn close(&mut self) -> Result<()> {
        self.stream
            .send(Message::Text(codec::encode_disconnect().to_string()))
            .await?;
        self.stream.close(None).await?;
        Ok(())
    }
}
