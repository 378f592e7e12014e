//! JSON hub protocol framing.
//!
//! Every record is a JSON object terminated by the ASCII record separator
//! (0x1E). One WebSocket text frame may carry several records. The client
//! opens with a handshake record and the server answers `{}` or
//! `{"error": "..."}` before any other traffic.

use serde::Deserialize;
use serde_json::Value;

use crate::error::ProtocolError;

pub const RECORD_SEPARATOR: char = '\u{1e}';

const INVOCATION: u8 = 1;
const PING: u8 = 6;
const CLOSE: u8 = 7;

/// One decoded record from the server.
#[derive(Debug, Clone, PartialEq)]
pub enum HubMessage {
    Invocation {
        target: String,
        arguments: Vec<Value>,
    },
    Ping,
    Close {
        error: Option<String>,
        allow_reconnect: bool,
    },
    /// Stream items, completions and anything newer than this client.
    Other(u8),
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawRecord {
    #[serde(rename = "type")]
    kind: u8,
    target: Option<String>,
    #[serde(default)]
    arguments: Vec<Value>,
    error: Option<String>,
    #[serde(default)]
    allow_reconnect: bool,
}

#[derive(Deserialize)]
struct HandshakeResponse {
    error: Option<String>,
}

pub fn handshake_request() -> String {
    format!(r#"{{"protocol":"json","version":1}}{RECORD_SEPARATOR}"#)
}

pub fn ping_record() -> String {
    format!(r#"{{"type":{PING}}}{RECORD_SEPARATOR}"#)
}

/// Splits a frame into its non-empty records.
pub fn split_records(frame: &str) -> impl Iterator<Item = &str> {
    frame
        .split(RECORD_SEPARATOR)
        .map(str::trim)
        .filter(|r| !r.is_empty())
}

/// Checks the first record the server sends after the handshake request.
pub fn parse_handshake_response(record: &str) -> Result<(), ProtocolError> {
    let response: HandshakeResponse =
        serde_json::from_str(record).map_err(ProtocolError::Record)?;
    match response.error {
        Some(error) => Err(ProtocolError::HandshakeRejected(error)),
        None => Ok(()),
    }
}

pub fn decode_record(record: &str) -> Result<HubMessage, ProtocolError> {
    let raw: RawRecord = serde_json::from_str(record).map_err(ProtocolError::Record)?;
    match raw.kind {
        INVOCATION => Ok(HubMessage::Invocation {
            target: raw.target.ok_or(ProtocolError::MissingTarget)?,
            arguments: raw.arguments,
        }),
        PING => Ok(HubMessage::Ping),
        CLOSE => Ok(HubMessage::Close {
            error: raw.error,
            allow_reconnect: raw.allow_reconnect,
        }),
        other => Ok(HubMessage::Other(other)),
    }
}

pub fn decode_frame(frame: &str) -> Vec<Result<HubMessage, ProtocolError>> {
    split_records(frame).map(decode_record).collect()
}

/// Builds an invocation record, as the server would send it.
pub fn invocation_record(target: &str, arguments: &[Value]) -> String {
    let record = serde_json::json!({
        "type": INVOCATION,
        "target": target,
        "arguments": arguments,
    });
    format!("{record}{RECORD_SEPARATOR}")
}
