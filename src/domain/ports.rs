use crate::domain::model::{DisconnectReason, SubscriptionSnapshot};
use crate::utils::error::Result;
use async_trait::async_trait;
use serde_json::Value;

/// 建立即時連線所需的資訊
#[derive(Clone)]
pub struct ConnectRequest {
    pub base_url: String,
    pub socket_path: String,
    pub token: String,
}

impl std::fmt::Debug for ConnectRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectRequest")
            .field("base_url", &self.base_url)
            .field("socket_path", &self.socket_path)
            .field("token", &"<redacted>")
            .finish()
    }
}

/// 傳輸層交給 relay 的事件
#[derive(Debug, Clone, PartialEq)]
pub enum TransportFrame {
    Event { name: String, payload: Value },
    Disconnect(DisconnectReason),
}

#[async_trait]
pub trait TransportSession: Send {
    async fn emit(&mut self, event: &str, payload: Value) -> Result<()>;

    /// `None` 表示底層連線已結束
    async fn next_frame(&mut self) -> Option<Result<TransportFrame>>;

    async fn close(&mut self) -> Result<()>;
}

#[async_trait]
pub trait Transport: Send + Sync + 'static {
    type Session: TransportSession + 'static;

    async fn connect(&self, request: &ConnectRequest) -> Result<Self::Session>;
}

pub trait SubscriptionSource: Send + Sync {
    fn fetch(&self) -> impl std::future::Future<Output = Result<SubscriptionSnapshot>> + Send;
}
