//! Push-channel framing.
//!
//! The board backend announces changes over Socket.IO (protocol v5) on top
//! of Engine.IO v4, using the WebSocket transport. Every WebSocket text frame
//! carries one Engine.IO packet: a single digit packet type followed by an
//! optional payload. Engine.IO `message` packets (`4`) wrap a Socket.IO
//! packet, again introduced by a type digit:
//!
//! ```text
//! 0{"sid":"..","pingInterval":25000,"pingTimeout":20000}   open
//! 2                                                        ping
//! 3                                                        pong
//! 40                                                       connect "/"
//! 40{"sid":".."}                                           connect ack
//! 42["tasksUpdated"]                                       event on "/"
//! 42/admin,17["name",{"k":1}]                              event with namespace and ack id
//! ```
//!
//! Only the text packets the board needs are modelled; binary attachments
//! are rejected as unsupported.

use serde::{Deserialize, Serialize};

/// Event name the backend emits after any task mutation.
pub const TASKS_UPDATED_EVENT: &str = "tasksUpdated";

/// HTTP path of the Socket.IO endpoint.
pub const SOCKET_IO_PATH: &str = "/socket.io/";

/// Query string selecting Engine.IO v4 over the WebSocket transport.
pub const SOCKET_IO_QUERY: &str = "EIO=4&transport=websocket";

/// The default Socket.IO namespace.
pub const DEFAULT_NAMESPACE: &str = "/";

/// Errors produced when a text frame is not a packet this codec understands.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PushFrameError {
    /// The frame was empty.
    #[error("empty frame")]
    Empty,
    /// The leading Engine.IO packet type is unknown.
    #[error("unknown engine.io packet type {0:?}")]
    UnknownPacketType(char),
    /// The Socket.IO packet type inside a message is unknown or missing.
    #[error("unknown socket.io packet type {0:?}")]
    UnknownSocketPacket(Option<char>),
    /// Binary events and acks need attachments and are not supported.
    #[error("binary socket.io packets are not supported")]
    BinaryUnsupported,
    /// A JSON payload could not be parsed.
    #[error("malformed payload: {0}")]
    Payload(String),
    /// An event payload was not a non-empty array starting with a string.
    #[error("event payload must be an array starting with the event name")]
    EventShape,
}

/// Handshake parameters sent by the server in the Engine.IO `open` packet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpenParams {
    /// Engine.IO session id.
    pub sid: String,
    /// Interval between server pings, in milliseconds.
    #[serde(default)]
    pub ping_interval: u64,
    /// How long the server waits for a pong, in milliseconds.
    #[serde(default)]
    pub ping_timeout: u64,
}

/// One decoded push-channel frame.
#[derive(Debug, Clone, PartialEq)]
pub enum PushFrame {
    /// Engine.IO handshake.
    Open(OpenParams),
    /// Engine.IO close.
    Close,
    /// Engine.IO heartbeat from the server; must be answered with [`PushFrame::Pong`].
    Ping,
    /// Engine.IO heartbeat answer.
    Pong,
    /// Engine.IO no-op.
    Noop,
    /// Socket.IO namespace connect (client → server) or its acknowledgment.
    Connect {
        /// Namespace being joined.
        namespace: String,
    },
    /// Socket.IO namespace disconnect.
    Disconnect {
        /// Namespace being left.
        namespace: String,
    },
    /// Socket.IO connect refusal.
    ConnectError {
        /// Namespace that refused the connection.
        namespace: String,
        /// Server-provided reason, raw JSON rendered as text.
        message: String,
    },
    /// Socket.IO event.
    Event {
        /// Namespace the event was emitted on.
        namespace: String,
        /// Event name.
        name: String,
        /// Remaining event arguments.
        args: Vec<serde_json::Value>,
        /// Acknowledgment id, when the sender expects an ack.
        ack_id: Option<u64>,
    },
}

impl PushFrame {
    /// Whether this frame is the board's change notification on the
    /// default namespace, the only one the client joins.
    #[must_use]
    pub fn is_tasks_updated(&self) -> bool {
        matches!(
            self,
            Self::Event { namespace, name, .. }
                if namespace == DEFAULT_NAMESPACE && name == TASKS_UPDATED_EVENT
        )
    }
}

/// Decodes one WebSocket text frame.
///
/// # Errors
///
/// Returns [`PushFrameError`] when the frame is empty, uses an unknown packet
/// type, or carries a payload that does not parse.
pub fn decode_frame(text: &str) -> Result<PushFrame, PushFrameError> {
    let mut chars = text.chars();
    let kind = chars.next().ok_or(PushFrameError::Empty)?;
    let rest = chars.as_str();
    match kind {
        '0' => serde_json::from_str(rest)
            .map(PushFrame::Open)
            .map_err(|e| PushFrameError::Payload(e.to_string())),
        '1' => Ok(PushFrame::Close),
        // Ping/pong may carry a probe payload during transport upgrades.
        '2' => Ok(PushFrame::Ping),
        '3' => Ok(PushFrame::Pong),
        '4' => decode_socket_packet(rest),
        '6' => Ok(PushFrame::Noop),
        other => Err(PushFrameError::UnknownPacketType(other)),
    }
}

/// Encodes a frame as WebSocket text.
///
/// Only frames a client sends are meaningful here, but every variant
/// encodes so tests and test servers can speak the protocol too.
#[must_use]
pub fn encode_frame(frame: &PushFrame) -> String {
    match frame {
        PushFrame::Open(params) => {
            format!("0{}", serde_json::to_string(params).unwrap_or_default())
        }
        PushFrame::Close => "1".to_string(),
        PushFrame::Ping => "2".to_string(),
        PushFrame::Pong => "3".to_string(),
        PushFrame::Noop => "6".to_string(),
        PushFrame::Connect { namespace } => format!("40{}", namespace_prefix(namespace)),
        PushFrame::Disconnect { namespace } => format!("41{}", namespace_prefix(namespace)),
        PushFrame::ConnectError { namespace, message } => {
            let payload = serde_json::json!({ "message": message });
            format!("44{}{payload}", namespace_prefix(namespace))
        }
        PushFrame::Event {
            namespace,
            name,
            args,
            ack_id,
        } => {
            let mut array = Vec::with_capacity(args.len() + 1);
            array.push(serde_json::Value::String(name.clone()));
            array.extend(args.iter().cloned());
            let ack = ack_id.map(|id| id.to_string()).unwrap_or_default();
            format!(
                "42{}{ack}{}",
                namespace_prefix(namespace),
                serde_json::Value::Array(array)
            )
        }
    }
}

/// The `tasksUpdated` event on the default namespace.
#[must_use]
pub fn tasks_updated() -> PushFrame {
    PushFrame::Event {
        namespace: DEFAULT_NAMESPACE.to_string(),
        name: TASKS_UPDATED_EVENT.to_string(),
        args: Vec::new(),
        ack_id: None,
    }
}

/// Non-default namespaces are written as `/nsp,`; the default is implicit.
fn namespace_prefix(namespace: &str) -> String {
    if namespace == DEFAULT_NAMESPACE || namespace.is_empty() {
        String::new()
    } else {
        format!("{namespace},")
    }
}

/// Splits an optional `/nsp,` prefix off a Socket.IO packet body.
fn split_namespace(body: &str) -> (String, &str) {
    if body.starts_with('/') {
        match body.find(',') {
            Some(idx) => (body[..idx].to_string(), &body[idx + 1..]),
            None => (body.to_string(), ""),
        }
    } else {
        (DEFAULT_NAMESPACE.to_string(), body)
    }
}

fn decode_socket_packet(body: &str) -> Result<PushFrame, PushFrameError> {
    let mut chars = body.chars();
    let kind = chars.next();
    let (namespace, rest) = split_namespace(chars.as_str());
    match kind {
        Some('0') => Ok(PushFrame::Connect { namespace }),
        Some('1') => Ok(PushFrame::Disconnect { namespace }),
        Some('2') => decode_event(namespace, rest),
        Some('4') => Ok(PushFrame::ConnectError {
            namespace,
            message: connect_error_message(rest),
        }),
        Some('5' | '6') => Err(PushFrameError::BinaryUnsupported),
        other => Err(PushFrameError::UnknownSocketPacket(other)),
    }
}

fn decode_event(namespace: String, rest: &str) -> Result<PushFrame, PushFrameError> {
    let digits = rest.chars().take_while(char::is_ascii_digit).count();
    let (ack, payload) = rest.split_at(digits);
    let ack_id = if ack.is_empty() {
        None
    } else {
        Some(
            ack.parse::<u64>()
                .map_err(|e| PushFrameError::Payload(e.to_string()))?,
        )
    };

    let value: serde_json::Value =
        serde_json::from_str(payload).map_err(|e| PushFrameError::Payload(e.to_string()))?;
    let serde_json::Value::Array(mut items) = value else {
        return Err(PushFrameError::EventShape);
    };
    if items.is_empty() {
        return Err(PushFrameError::EventShape);
    }
    let serde_json::Value::String(name) = items.remove(0) else {
        return Err(PushFrameError::EventShape);
    };

    Ok(PushFrame::Event {
        namespace,
        name,
        args: items,
        ack_id,
    })
}

fn connect_error_message(rest: &str) -> String {
    match serde_json::from_str::<serde_json::Value>(rest) {
        Ok(serde_json::Value::Object(map)) => map
            .get("message")
            .and_then(serde_json::Value::as_str)
            .map_or_else(|| rest.to_string(), str::to_string),
        Ok(serde_json::Value::String(s)) => s,
        _ => rest.to_string(),
    }
}
