//! Outbound command formatting
//!
//! Every outbound request is one line of text (plus, for `sendevent` and
//! `sendmsg`, a header block and optional body) terminated by a blank line.
//! The encoder only formats; it knows nothing about what the server will do
//! with the command.

use crate::constants::{LINE_TERMINATOR, PACKET_TERMINATOR};
use indexmap::IndexMap;
use std::fmt;

/// Event serialization format requested from the server
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventFormat {
    /// Two-part plain text format, decoded by the parser
    Plain,
    /// JSON format, passed through to subscribers undecoded
    Json,
}

impl fmt::Display for EventFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EventFormat::Plain => write!(f, "plain"),
            EventFormat::Json => write!(f, "json"),
        }
    }
}

/// Outbound command vocabulary
#[derive(Debug, Clone)]
pub enum Command {
    /// Authenticate with the configured password
    Auth { password: String },
    /// Execute an API command synchronously
    Api { command: String, args: String },
    /// Execute an API command in the background; the engine injects the
    /// client-generated job identifier
    Bgapi {
        command: String,
        args: String,
        job_uuid: String,
    },
    /// Subscribe to a space-separated event list
    Event { format: EventFormat, events: String },
    /// Receive only events related to one channel
    Myevents { format: EventFormat, uuid: String },
    /// Toggle diversion of events to this socket
    DivertEvents { enabled: bool },
    /// Add a server-side event filter
    Filter { header: String, value: String },
    /// Remove a server-side event filter
    FilterDelete { header: String, value: String },
    /// Inject an event into the server's event system
    SendEvent {
        name: String,
        headers: IndexMap<String, String>,
        body: Option<String>,
    },
    /// Send a message to a channel
    SendMsg {
        uuid: Option<String>,
        headers: IndexMap<String, String>,
        body: Option<String>,
    },
    /// Keep the socket open briefly after hangup
    Linger,
    /// Cancel a previous `linger`
    Nolinger,
    /// Request log lines at the given level
    Log { level: String },
    /// Stop log lines
    Nolog,
    /// Unsubscribe from specific events
    Nixevent { events: String },
    /// Unsubscribe from all events
    Noevents,
    /// Ask the server to close the session
    Exit,
}

impl Command {
    /// Render the command into its wire form.
    pub fn to_wire_format(&self) -> String {
        match self {
            Command::Auth { password } => simple(&format!("auth {}", password)),
            Command::Api { command, args } => simple(&format!("api {} {}", command, args)),
            Command::Bgapi {
                command,
                args,
                job_uuid,
            } => format!(
                "bgapi {} {}{}Job-UUID: {}{}",
                command, args, LINE_TERMINATOR, job_uuid, PACKET_TERMINATOR
            ),
            Command::Event { format, events } => simple(&format!("event {} {}", format, events)),
            Command::Myevents { format, uuid } => {
                simple(&format!("myevents {} {}", format, uuid))
            }
            Command::DivertEvents { enabled } => {
                let state = if *enabled { "on" } else { "off" };
                simple(&format!("divert_events {}", state))
            }
            Command::Filter { header, value } => simple(&format!("filter {} {}", header, value)),
            Command::FilterDelete { header, value } => {
                simple(&format!("filter delete {} {}", header, value))
            }
            Command::SendEvent {
                name,
                headers,
                body,
            } => payload(&format!("sendevent {}", name), headers, body.as_deref(), None),
            Command::SendMsg {
                uuid,
                headers,
                body,
            } => {
                let verb = match uuid {
                    Some(uuid) => format!("sendmsg {}", uuid),
                    None => "sendmsg".to_string(),
                };
                payload(&verb, headers, body.as_deref(), Some("text/plain"))
            }
            Command::Linger => simple("linger"),
            Command::Nolinger => simple("nolinger"),
            Command::Log { level } => simple(&format!("log {}", level)),
            Command::Nolog => simple("nolog"),
            Command::Nixevent { events } => simple(&format!("nixevent {}", events)),
            Command::Noevents => simple("noevents"),
            Command::Exit => simple("exit"),
        }
    }
}

fn simple(line: &str) -> String {
    format!("{}{}", line, PACKET_TERMINATOR)
}

/// Multi-header payload: verb line, caller headers in insertion order,
/// injected `Content-Type`/`Content-Length` when a body is present, blank
/// line, body.
fn payload(
    verb: &str,
    headers: &IndexMap<String, String>,
    body: Option<&str>,
    body_content_type: Option<&str>,
) -> String {
    let mut wire = String::with_capacity(verb.len() + 64);
    wire.push_str(verb);
    wire.push_str(LINE_TERMINATOR);
    for (name, value) in headers {
        wire.push_str(name);
        wire.push_str(": ");
        wire.push_str(value);
        wire.push_str(LINE_TERMINATOR);
    }
    match body {
        Some(body) => {
            if let Some(content_type) = body_content_type {
                wire.push_str(&format!("Content-Type: {}{}", content_type, LINE_TERMINATOR));
            }
            wire.push_str(&format!("Content-Length: {}{}", body.len(), LINE_TERMINATOR));
            wire.push_str(LINE_TERMINATOR);
            wire.push_str(body);
        }
        None => wire.push_str(LINE_TERMINATOR),
    }
    wire
}
