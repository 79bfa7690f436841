// Adapters layer: concrete implementations of the domain ports (http, websocket) and the wire codec.

pub mod codec;
pub mod http;
pub mod websocket;

pub use http::HttpSubscriptionSource;
pub use websocket::WebSocketTransport;
