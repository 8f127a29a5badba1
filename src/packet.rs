//! Decoded server packet model

use crate::constants::*;
use crate::error::EslResult;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::collections::HashMap;
use std::fmt;

/// Packet classification derived from the `Content-Type` header
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PacketType {
    /// Server asks the client to authenticate
    AuthRequest,
    /// Reply to a command sent over the socket
    CommandReply,
    /// Response body of an `api` command
    ApiResponse,
    /// Event in the plain two-part format; fields are decoded
    EventPlain,
    /// Event in JSON format; the body is passed through undecoded
    EventJson,
    /// Server announces it is about to close the session
    DisconnectNotice,
    /// Anything else; emitted but ignored by dispatch
    Unknown(String),
}

impl PacketType {
    pub fn from_content_type(content_type: &str) -> Self {
        match content_type {
            CONTENT_TYPE_AUTH_REQUEST => PacketType::AuthRequest,
            CONTENT_TYPE_COMMAND_REPLY => PacketType::CommandReply,
            CONTENT_TYPE_API_RESPONSE => PacketType::ApiResponse,
            CONTENT_TYPE_EVENT_PLAIN => PacketType::EventPlain,
            CONTENT_TYPE_EVENT_JSON => PacketType::EventJson,
            CONTENT_TYPE_DISCONNECT_NOTICE => PacketType::DisconnectNotice,
            other => PacketType::Unknown(other.to_string()),
        }
    }

    /// `true` for the two reply types that resolve a synchronous command
    pub fn is_reply(&self) -> bool {
        matches!(self, PacketType::CommandReply | PacketType::ApiResponse)
    }
}

impl fmt::Display for PacketType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PacketType::AuthRequest => CONTENT_TYPE_AUTH_REQUEST,
            PacketType::CommandReply => CONTENT_TYPE_COMMAND_REPLY,
            PacketType::ApiResponse => CONTENT_TYPE_API_RESPONSE,
            PacketType::EventPlain => CONTENT_TYPE_EVENT_PLAIN,
            PacketType::EventJson => CONTENT_TYPE_EVENT_JSON,
            PacketType::DisconnectNotice => CONTENT_TYPE_DISCONNECT_NOTICE,
            PacketType::Unknown(other) => other,
        };
        write!(f, "{}", name)
    }
}

/// One framed server message.
///
/// Outer header names are lowercased; decoded event field names keep their
/// wire spelling (`Event-Name`, `Job-UUID`, ...).
#[derive(Debug, Clone)]
pub struct Packet {
    pub packet_type: PacketType,
    /// Outer headers, names lowercased
    pub headers: HashMap<String, String>,
    /// Raw content payload; empty when no Content-Length was given
    pub body: Bytes,
    /// URL-decoded event fields; empty for non-event packets
    pub fields: HashMap<String, String>,
    /// Free-form payload after the nested event headers; usually empty
    pub event_body: Bytes,
}

impl Packet {
    pub(crate) fn new(headers: HashMap<String, String>, body: Bytes) -> Self {
        let packet_type = headers
            .get(HEADER_CONTENT_TYPE)
            .map(|ct| PacketType::from_content_type(ct))
            .unwrap_or_else(|| PacketType::Unknown(String::new()));
        Self {
            packet_type,
            headers,
            body,
            fields: HashMap::new(),
            event_body: Bytes::new(),
        }
    }

    /// Outer header lookup; the name is lowercased before the lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }

    /// Decoded event field lookup, exact wire spelling.
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }

    /// Whether the server reported success.
    ///
    /// `command/reply` succeeds when `Reply-Text` begins with `+OK`;
    /// `api/response` succeeds when the body begins with `+OK`.
    pub fn success(&self) -> bool {
        match self.packet_type {
            PacketType::CommandReply => self
                .header(HEADER_REPLY_TEXT)
                .is_some_and(|text| text.starts_with("+OK")),
            PacketType::ApiResponse => self.body.starts_with(b"+OK"),
            _ => false,
        }
    }

    /// `Job-UUID` carried by this packet, from the outer headers or the
    /// decoded event fields.
    pub fn job_uuid(&self) -> Option<&str> {
        self.header(HEADER_JOB_UUID)
            .or_else(|| self.field(FIELD_JOB_UUID))
    }

    /// For command replies, the text after the `+OK `/`-ERR ` marker.
    pub fn reply_rest(&self) -> Option<&str> {
        let text = self.header(HEADER_REPLY_TEXT)?;
        let rest = text
            .strip_prefix("+OK")
            .or_else(|| text.strip_prefix("-ERR"))?;
        Some(rest.strip_prefix(' ').unwrap_or(rest))
    }

    /// Decoded `Event-Name` field.
    pub fn event_name(&self) -> Option<&str> {
        self.field(FIELD_EVENT_NAME)
    }

    /// Body as text, lossy on invalid UTF-8.
    pub fn body_text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.body)
    }

    /// Decode a `text/event-json` body into a field map on demand.
    ///
    /// Non-string JSON values are rendered with their JSON representation.
    pub fn json_fields(&self) -> EslResult<HashMap<String, String>> {
        let value: serde_json::Value = serde_json::from_slice(&self.body)?;
        let mut fields = HashMap::new();
        if let Some(object) = value.as_object() {
            for (name, value) in object {
                let rendered = match value {
                    serde_json::Value::String(s) => s.clone(),
                    other => other.to_string(),
                };
                fields.insert(name.clone(), rendered);
            }
        }
        Ok(fields)
    }
}
