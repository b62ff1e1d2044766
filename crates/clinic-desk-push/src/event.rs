//! Push events and Socket.IO frame parsing.

use serde::Deserialize;
use thiserror::Error;

/// Event name emitted whenever any visit changes state.
pub const VISIT_UPDATE: &str = "visit_update";

/// Event name emitted when an invoice is created or updated.
pub const BILLING_UPDATE: &str = "billing_update";

/// Push errors.
#[derive(Error, Debug)]
pub enum PushError {
    #[error("JSON parse error: {0}")]
    JsonParse(#[from] serde_json::Error),

    #[error("Invalid frame: {0}")]
    InvalidFrame(String),

    #[error("Transport error: {0}")]
    Transport(String),
}

pub type PushResult<T> = Result<T, PushError>;

/// A named push event.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PushEvent {
    /// Some visit somewhere in the system changed
    VisitUpdated,
    /// Some invoice was created or changed
    BillingUpdated,
    /// Any other named event
    Other(String),
}

impl PushEvent {
    /// Map a wire event name to an event.
    pub fn from_name(name: &str) -> Self {
        match name {
            VISIT_UPDATE => PushEvent::VisitUpdated,
            BILLING_UPDATE => PushEvent::BillingUpdated,
            other => PushEvent::Other(other.to_string()),
        }
    }

    /// Wire name of the event.
    pub fn name(&self) -> &str {
        match self {
            PushEvent::VisitUpdated => VISIT_UPDATE,
            PushEvent::BillingUpdated => BILLING_UPDATE,
            PushEvent::Other(name) => name,
        }
    }
}

/// A decoded Engine.IO v4 / Socket.IO v5 text frame.
#[derive(Debug, Clone, PartialEq)]
pub enum Frame {
    /// Engine.IO handshake
    Open {
        sid: String,
        ping_interval_ms: u64,
        ping_timeout_ms: u64,
    },
    /// Server heartbeat, must be answered with [`PONG_FRAME`]
    Ping,
    Pong,
    Close,
    Noop,
    /// Namespace connection acknowledged
    Connected,
    /// Namespace disconnected by the server
    Disconnected,
    /// Namespace connection refused
    ConnectError(String),
    /// A named event with its optional first argument
    Event {
        event: PushEvent,
        payload: Option<serde_json::Value>,
    },
}

/// Heartbeat reply.
pub const PONG_FRAME: &str = "3";

/// Connect to the default namespace.
pub const CONNECT_FRAME: &str = "40";

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct OpenPacket {
    sid: String,
    #[serde(default)]
    ping_interval: u64,
    #[serde(default)]
    ping_timeout: u64,
}

#[derive(Deserialize)]
struct ErrorPacket {
    message: String,
}

/// Parse one websocket text message into a frame.
pub fn parse_frame(text: &str) -> PushResult<Frame> {
    let mut chars = text.chars();
    let engine_type = chars
        .next()
        .ok_or_else(|| PushError::InvalidFrame("empty frame".into()))?;
    let rest = chars.as_str();

    match engine_type {
        '0' => {
            let open: OpenPacket = serde_json::from_str(rest)?;
            Ok(Frame::Open {
                sid: open.sid,
                ping_interval_ms: open.ping_interval,
                ping_timeout_ms: open.ping_timeout,
            })
        }
        '1' => Ok(Frame::Close),
        '2' => Ok(Frame::Ping),
        '3' => Ok(Frame::Pong),
        '4' => parse_socket_packet(rest),
        '6' => Ok(Frame::Noop),
        other => Err(PushError::InvalidFrame(format!(
            "unknown engine packet type '{}'",
            other
        ))),
    }
}

/// Parse the Socket.IO packet carried inside an Engine.IO message.
fn parse_socket_packet(packet: &str) -> PushResult<Frame> {
    let mut chars = packet.chars();
    let socket_type = chars
        .next()
        .ok_or_else(|| PushError::InvalidFrame("empty socket packet".into()))?;
    let rest = chars.as_str();

    match socket_type {
        '0' => Ok(Frame::Connected),
        '1' => Ok(Frame::Disconnected),
        '2' => parse_event(rest),
        '4' => {
            // Body may be prefixed by a namespace ("/admin,{...}")
            let body = rest.find('{').map(|i| &rest[i..]).unwrap_or("");
            let message = serde_json::from_str::<ErrorPacket>(body)
                .map(|e| e.message)
                .unwrap_or_else(|_| rest.to_string());
            Ok(Frame::ConnectError(message))
        }
        other => Err(PushError::InvalidFrame(format!(
            "unsupported socket packet type '{}'",
            other
        ))),
    }
}

/// Parse `[/namespace,][ack-id]["name", payload?]`.
fn parse_event(body: &str) -> PushResult<Frame> {
    let start = body
        .find('[')
        .ok_or_else(|| PushError::InvalidFrame("event without argument array".into()))?;
    let args: Vec<serde_json::Value> = serde_json::from_str(&body[start..])?;

    let mut args = args.into_iter();
    let name = match args.next() {
        Some(serde_json::Value::String(name)) => name,
        _ => return Err(PushError::InvalidFrame("event name must be a string".into())),
    };

    Ok(Frame::Event {
        event: PushEvent::from_name(&name),
        payload: args.next(),
    })
}
