//! Socket.IO v5 over Engine.IO v4 text framing.
//!
//! Only what the relay needs is supported: the default namespace, text
//! events and the connect/disconnect handshake. Binary attachments are
//! rejected.

use crate::utils::error::{RelayError, Result};
use serde::Deserialize;
use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpenInfo {
    pub sid: String,
    #[serde(default)]
    pub upgrades: Vec<String>,
    /// 毫秒
    pub ping_interval: u64,
    /// 毫秒
    pub ping_timeout: u64,
    #[serde(default)]
    pub max_payload: Option<u64>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Packet {
    Open(OpenInfo),
    Close,
    Ping,
    Pong,
    Noop,
    Connect(Option<Value>),
    Disconnect,
    Event { name: String, payload: Value },
    Ack { id: u64 },
    ConnectError(Value),
}

fn protocol_error(message: impl Into<String>) -> RelayError {
    RelayError::ProtocolError {
        message: message.into(),
    }
}

pub fn decode(frame: &str) -> Result<Packet> {
    let mut chars = frame.chars();
    let engine_type = chars
        .next()
        .ok_or_else(|| protocol_error("empty frame"))?;
    let rest = chars.as_str();

    match engine_type {
        '0' => {
            let info: OpenInfo = serde_json::from_str(rest)?;
            Ok(Packet::Open(info))
        }
        '1' => Ok(Packet::Close),
        '2' => Ok(Packet::Ping),
        '3' => Ok(Packet::Pong),
        '4' => decode_socket_packet(rest),
        '6' => Ok(Packet::Noop),
        other => Err(protocol_error(format!(
            "unsupported engine packet type '{}'",
            other
        ))),
    }
}

fn decode_socket_packet(body: &str) -> Result<Packet> {
    let mut chars = body.chars();
    let socket_type = chars
        .next()
        .ok_or_else(|| protocol_error("empty socket packet"))?;
    let rest = skip_namespace(chars.as_str())?;

    match socket_type {
        '0' => {
            if rest.is_empty() {
                Ok(Packet::Connect(None))
            } else {
                Ok(Packet::Connect(Some(serde_json::from_str(rest)?)))
            }
        }
        '1' => Ok(Packet::Disconnect),
        '2' => {
            let (_, data) = split_ack_id(rest);
            decode_event(data)
        }
        '3' => {
            let (id, _) = split_ack_id(rest);
            let id = id.ok_or_else(|| protocol_error("ack packet without id"))?;
            Ok(Packet::Ack { id })
        }
        '4' => {
            let data = if rest.is_empty() {
                Value::Null
            } else {
                serde_json::from_str(rest)?
            };
            Ok(Packet::ConnectError(data))
        }
        '5' | '6' => Err(protocol_error("binary packets are not supported")),
        other => Err(protocol_error(format!(
            "unsupported socket packet type '{}'",
            other
        ))),
    }
}

/// 只支援預設 namespace `/`
fn skip_namespace(rest: &str) -> Result<&str> {
    if !rest.starts_with('/') {
        return Ok(rest);
    }

    let (namespace, remainder) = match rest.find(',') {
        Some(idx) => (&rest[..idx], &rest[idx + 1..]),
        None => (rest, ""),
    };
    if namespace != "/" {
        return Err(protocol_error(format!(
            "namespace '{}' is not supported",
            namespace
        )));
    }
    Ok(remainder)
}

fn split_ack_id(rest: &str) -> (Option<u64>, &str) {
    let digits = rest.chars().take_while(|c| c.is_ascii_digit()).count();
    if digits == 0 {
        return (None, rest);
    }
    (rest[..digits].parse().ok(), &rest[digits..])
}

fn decode_event(data: &str) -> Result<Packet> {
    let value: Value = serde_json::from_str(data)?;
    let Value::Array(mut items) = value else {
        return Err(protocol_error("event payload must be an array"));
    };
    if items.is_empty() {
        return Err(protocol_error("event without a name"));
    }

    let name = match items.remove(0) {
        Value::String(name) => name,
        _ => return Err(protocol_error("event name must be a string")),
    };

    // 多個參數時整包交給訂閱者
    let payload = match items.len() {
        0 => Value::Null,
        1 => items.remove(0),
        _ => Value::Array(items),
    };

    Ok(Packet::Event { name, payload })
}

pub fn encode_connect(auth: Option<&Value>) -> Result<String> {
    match auth {
        Some(auth) => Ok(format!("40{}", serde_json::to_string(auth)?)),
        None => Ok("40".to_string()),
    }
}

pub fn encode_event(name: &str, payload: &Value) -> Result<String> {
    let array = Value::Array(vec![Value::String(name.to_string()), payload.clone()]);
    Ok(format!("42{}", serde_json::to_string(&array)?))
}

pub fn encode_disconnect() -> &'static str {
    "41"
}

pub fn encode_pong() -> &'static str {
    "3"
}
