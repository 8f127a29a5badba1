//! Incremental framing parser for the Event Socket wire format
//!
//! A packet is header lines terminated by `\n`, a blank line, then — when a
//! `Content-Length` header is present — exactly that many bytes of body.
//! `text/event-plain` bodies nest a second header block of URL-encoded event
//! fields, optionally followed by a payload sized by an inner
//! `Content-Length`. Framing problems degrade gracefully where the stream
//! stays parseable: bad header lines are skipped and an unparseable length
//! is treated as 0. A declared length beyond [`MAX_MESSAGE_SIZE`] is
//! different — the body bytes that follow cannot be framed as anything, so
//! it surfaces as an error the same way a receive-buffer overflow does.

use crate::{
    buffer::RecvBuffer,
    constants::*,
    error::{EslError, EslResult},
    packet::{Packet, PacketType},
};
use bytes::Bytes;
use percent_encoding::percent_decode_str;
use std::collections::HashMap;
use tracing::{debug, warn};

#[derive(Debug)]
enum ParseState {
    AwaitingHeaders,
    AwaitingBody {
        headers: HashMap<String, String>,
        body_len: usize,
    },
}

/// Stateful packet decoder. Feed bytes in as they arrive, drain complete
/// packets out; partial input stays buffered until the rest shows up.
#[derive(Debug)]
pub struct PacketParser {
    buffer: RecvBuffer,
    state: ParseState,
}

impl PacketParser {
    pub fn new() -> Self {
        Self {
            buffer: RecvBuffer::new(),
            state: ParseState::AwaitingHeaders,
        }
    }

    /// Append freshly read bytes.
    pub fn feed(&mut self, chunk: &[u8]) -> EslResult<()> {
        self.buffer.extend(chunk)
    }

    /// Next complete packet, or `Ok(None)` until more bytes arrive.
    ///
    /// Fails when a declared body length is beyond [`MAX_MESSAGE_SIZE`];
    /// the stream cannot be reframed past that point and the session must
    /// be dropped.
    pub fn next_packet(&mut self) -> EslResult<Option<Packet>> {
        loop {
            match &mut self.state {
                ParseState::AwaitingHeaders => {
                    let Some(region) = self.buffer.split_until(PACKET_TERMINATOR.as_bytes())
                    else {
                        return Ok(None);
                    };
                    let headers = parse_header_block(&region);
                    let body_len = declared_content_length(&headers)?;
                    if body_len > 0 {
                        self.state = ParseState::AwaitingBody { headers, body_len };
                        continue;
                    }
                    return Ok(Some(build_packet(headers, Bytes::new())));
                }
                ParseState::AwaitingBody { headers, body_len } => {
                    let len = *body_len;
                    let Some(body) = self.buffer.split_exact(len) else {
                        return Ok(None);
                    };
                    let headers = std::mem::take(headers);
                    self.state = ParseState::AwaitingHeaders;
                    return Ok(Some(build_packet(headers, body)));
                }
            }
        }
    }

    /// Bytes buffered but not yet decoded.
    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    /// Discard buffered bytes and parse state, e.g. for a fresh session.
    pub fn reset(&mut self) {
        self.buffer.clear();
        self.state = ParseState::AwaitingHeaders;
    }
}

impl Default for PacketParser {
    fn default() -> Self {
        Self::new()
    }
}

/// Decode an outer header region. Names are lowercased; values keep
/// everything after the first `:` minus one leading space. Lines without a
/// colon are skipped, best-effort.
fn parse_header_block(region: &[u8]) -> HashMap<String, String> {
    let text = String::from_utf8_lossy(region);
    let mut headers = HashMap::new();
    for line in text.split('\n') {
        let line = line.strip_suffix('\r').unwrap_or(line);
        if line.is_empty() {
            continue;
        }
        match line.split_once(':') {
            Some((name, value)) => {
                let value = value.strip_prefix(' ').unwrap_or(value);
                headers.insert(name.trim().to_ascii_lowercase(), value.to_string());
            }
            None => debug!(line, "skipping malformed header line"),
        }
    }
    headers
}

/// Body length declared by the outer headers. An unparseable value never
/// framed any bytes, so it degrades to 0; a parseable value past the
/// message limit did, and treating it as 0 would misroute the body bytes
/// into the next header block — that one is an error.
fn declared_content_length(headers: &HashMap<String, String>) -> EslResult<usize> {
    let Some(raw) = headers.get(HEADER_CONTENT_LENGTH) else {
        return Ok(0);
    };
    match raw.trim().parse::<usize>() {
        Ok(len) if len <= MAX_MESSAGE_SIZE => Ok(len),
        Ok(len) => {
            tracing::error!(
                len,
                limit = MAX_MESSAGE_SIZE,
                "content-length exceeds message limit, stream desynced"
            );
            Err(EslError::protocol(format!(
                "content-length {} exceeds limit {}",
                len, MAX_MESSAGE_SIZE
            )))
        }
        Err(_) => {
            warn!(raw = raw.as_str(), "malformed content-length, treating as 0");
            Ok(0)
        }
    }
}

fn build_packet(headers: HashMap<String, String>, body: Bytes) -> Packet {
    let mut packet = Packet::new(headers, body);
    if packet.packet_type == PacketType::EventPlain {
        decode_event_body(&mut packet);
    }
    packet
}

/// Decode the nested header block of a `text/event-plain` body and slice
/// off the trailing payload. The outer length already framed `body`; the
/// inner `Content-Length`, when present, only sizes the payload.
fn decode_event_body(packet: &mut Packet) {
    let body = packet.body.clone();
    let (field_region, payload_start) = match body.windows(2).position(|w| w == b"\n\n") {
        Some(pos) => (&body[..pos], pos + 2),
        None => (&body[..], body.len()),
    };

    let text = String::from_utf8_lossy(field_region);
    for line in text.split('\n') {
        let line = line.strip_suffix('\r').unwrap_or(line);
        if line.is_empty() {
            continue;
        }
        match line.split_once(':') {
            Some((name, value)) => {
                let value = value.strip_prefix(' ').unwrap_or(value);
                packet.fields.insert(url_decode(name.trim()), url_decode(value));
            }
            None => debug!(line, "skipping malformed event field line"),
        }
    }

    let payload = &body[payload_start..];
    let payload_len = match packet.fields.get(FIELD_CONTENT_LENGTH) {
        Some(raw) => match raw.trim().parse::<usize>() {
            // outer framing is authoritative; clamp the inner claim
            Ok(len) => len.min(payload.len()),
            Err(_) => {
                warn!(raw = raw.as_str(), "malformed inner content-length");
                payload.len()
            }
        },
        None => payload.len(),
    };
    packet.event_body = body.slice(payload_start..payload_start + payload_len);
}

/// Percent-decode one event field name or value. `+` stays literal; the
/// protocol encodes spaces as `%20`.
fn url_decode(input: &str) -> String {
    percent_decode_str(input).decode_utf8_lossy().into_owned()
}
