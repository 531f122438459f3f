//! Shared frame model and protobuf codec for the realtime session relay.
//!
//! This crate owns the wire representation used by both `relay` and `client`.
//! Frame payloads stay flexible (`serde_json::Value`) on the envelope and are
//! narrowed into typed structs from [`model`] at the edges, while the
//! envelope itself is encoded over protobuf for compact binary transport.

pub mod events;
pub mod model;

use std::time::{SystemTime, UNIX_EPOCH};

use prost::Message;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

pub use events::EventKind;

/// Frame data key for error messages.
pub const FRAME_MESSAGE: &str = "message";

/// Frame data key for grepable error codes.
pub const FRAME_CODE: &str = "code";

/// Frame data key for the retryable flag on error frames.
pub const FRAME_RETRYABLE: &str = "retryable";

/// Error returned by [`decode_frame`] and typed payload access.
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    /// The raw bytes could not be decoded as a protobuf `WireFrame`.
    #[error("failed to decode protobuf frame: {0}")]
    Decode(#[from] prost::DecodeError),
    /// The frame was valid but its JSON payload does not match the expected shape.
    #[error("invalid payload for {event}: {source}")]
    Payload {
        event: String,
        #[source]
        source: serde_json::Error,
    },
    /// The frame text could not be parsed as a JSON envelope.
    #[error("invalid json frame: {0}")]
    Json(#[from] serde_json::Error),
}

/// Grepable error code and retryable flag for structured error frames.
pub trait ErrorCode: std::fmt::Display {
    fn error_code(&self) -> &'static str;

    fn retryable(&self) -> bool {
        false
    }
}

/// A single message on the realtime wire protocol.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Frame {
    /// Unique identifier for this frame (UUID string).
    pub id: String,
    /// Milliseconds since the Unix epoch when the frame was created.
    pub ts: i64,
    /// Room context for this frame, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub room_id: Option<String>,
    /// Sender socket id, stamped by the relay.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<String>,
    /// Wire event name, e.g. `"file-created"`.
    pub event: String,
    /// Event payload.
    pub data: Value,
}

/// Current time as milliseconds since Unix epoch.
fn now_ms() -> i64 {
    let Ok(dur) = SystemTime::now().duration_since(UNIX_EPOCH) else {
        return 0;
    };
    i64::try_from(dur.as_millis()).unwrap_or(0)
}

impl Frame {
    /// Create a frame for `event` carrying a raw JSON payload.
    #[must_use]
    pub fn new(event: EventKind, data: Value) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            ts: now_ms(),
            room_id: None,
            from: None,
            event: event.as_str().to_owned(),
            data,
        }
    }

    /// Create a frame with an empty object payload.
    #[must_use]
    pub fn empty(event: EventKind) -> Self {
        Self::new(event, Value::Object(Map::new()))
    }

    /// Create a frame whose payload is the JSON form of `payload`.
    #[must_use]
    pub fn with_payload<T: Serialize>(event: EventKind, payload: &T) -> Self {
        Self::new(event, serde_json::to_value(payload).unwrap_or_default())
    }

    /// Create an `error` frame from a typed error.
    #[must_use]
    pub fn error_from(err: &(impl ErrorCode + ?Sized)) -> Self {
        let mut data = Map::new();
        data.insert(FRAME_CODE.into(), Value::String(err.error_code().to_owned()));
        data.insert(FRAME_MESSAGE.into(), Value::String(err.to_string()));
        data.insert(FRAME_RETRYABLE.into(), Value::Bool(err.retryable()));
        Self::new(EventKind::Error, Value::Object(data))
    }

    #[must_use]
    pub fn with_room(mut self, room_id: impl Into<String>) -> Self {
        self.room_id = Some(room_id.into());
        self
    }

    #[must_use]
    pub fn with_from(mut self, from: impl Into<String>) -> Self {
        self.from = Some(from.into());
        self
    }

    /// Known event kind, or `None` for names this build does not understand.
    #[must_use]
    pub fn kind(&self) -> Option<EventKind> {
        EventKind::parse(&self.event)
    }

    /// Deserialize the payload into a typed struct.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::Payload`] when the payload does not match `T`.
    pub fn payload<T: DeserializeOwned>(&self) -> Result<T, CodecError> {
        T::deserialize(&self.data).map_err(|source| CodecError::Payload { event: self.event.clone(), source })
    }

    /// Same frame re-labelled as another event, keeping id, sender and payload.
    #[must_use]
    pub fn relabel(&self, event: EventKind) -> Self {
        Self { event: event.as_str().to_owned(), ..self.clone() }
    }
}

/// Encode a frame into protobuf bytes.
#[must_use]
pub fn encode_frame(frame: &Frame) -> Vec<u8> {
    let wire = frame_to_wire(frame);

    let mut out = Vec::with_capacity(wire.encoded_len());
    // Encoding into a growable Vec cannot hit `BufferTooSmall`.
    wire.encode(&mut out).unwrap_or_default();
    out
}

/// Decode protobuf bytes into a frame.
///
/// # Errors
///
/// Returns [`CodecError::Decode`] for malformed bytes.
pub fn decode_frame(bytes: &[u8]) -> Result<Frame, CodecError> {
    let wire = WireFrame::decode(bytes)?;
    Ok(wire_to_frame(wire))
}

/// Decode a JSON text frame, accepted from debugging tools and browsers.
///
/// # Errors
///
/// Returns [`CodecError::Json`] when the text is not a valid envelope.
pub fn decode_text_frame(text: &str) -> Result<Frame, CodecError> {
    Ok(serde_json::from_str(text)?)
}

fn frame_to_wire(frame: &Frame) -> WireFrame {
    WireFrame {
        id: frame.id.clone(),
        ts: frame.ts,
        room_id: frame.room_id.clone(),
        from: frame.from.clone(),
        event: frame.event.clone(),
        data: Some(json_to_proto_value(&frame.data)),
    }
}

fn wire_to_frame(wire: WireFrame) -> Frame {
    Frame {
        id: wire.id,
        ts: wire.ts,
        room_id: wire.room_id,
        from: wire.from,
        event: wire.event,
        data: wire
            .data
            .map_or(Value::Object(Map::new()), |v| proto_to_json_value(&v)),
    }
}

fn json_to_proto_value(value: &Value) -> prost_types::Value {
    let kind = match value {
        Value::Null => {
            prost_types::value::Kind::NullValue(prost_types::NullValue::NullValue as i32)
        }
        Value::Bool(v) => prost_types::value::Kind::BoolValue(*v),
        Value::Number(v) => prost_types::value::Kind::NumberValue(v.as_f64().unwrap_or(0.0)),
        Value::String(v) => prost_types::value::Kind::StringValue(v.clone()),
        Value::Array(v) => prost_types::value::Kind::ListValue(prost_types::ListValue {
            values: v.iter().map(json_to_proto_value).collect(),
        }),
        Value::Object(v) => prost_types::value::Kind::StructValue(prost_types::Struct {
            fields: v
                .iter()
                .map(|(k, v)| (k.clone(), json_to_proto_value(v)))
                .collect(),
        }),
    };

    prost_types::Value { kind: Some(kind) }
}

fn proto_to_json_value(value: &prost_types::Value) -> Value {
    let Some(kind) = &value.kind else {
        return Value::Null;
    };

    match kind {
        prost_types::value::Kind::NullValue(_) => Value::Null,
        prost_types::value::Kind::NumberValue(v) => number_value(*v),
        prost_types::value::Kind::StringValue(v) => Value::String(v.clone()),
        prost_types::value::Kind::BoolValue(v) => Value::Bool(*v),
        prost_types::value::Kind::StructValue(v) => Value::Object(
            v.fields
                .iter()
                .map(|(k, v)| (k.clone(), proto_to_json_value(v)))
                .collect(),
        ),
        prost_types::value::Kind::ListValue(v) => {
            Value::Array(v.values.iter().map(proto_to_json_value).collect())
        }
    }
}

/// Protobuf carries every number as `f64`; integral values come back as
/// integers so `usize` payload fields (cursor positions) still deserialize.
#[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
fn number_value(v: f64) -> Value {
    if v.fract() == 0.0 && v.abs() < 9_007_199_254_740_992.0 {
        let int = v as i64;
        if int >= 0 {
            return Value::Number(serde_json::Number::from(int as u64));
        }
        return Value::Number(serde_json::Number::from(int));
    }
    serde_json::Number::from_f64(v).map_or(Value::Null, Value::Number)
}

#[derive(Clone, PartialEq, Message)]
struct WireFrame {
    #[prost(string, tag = "1")]
    id: String,
    #[prost(int64, tag = "2")]
    ts: i64,
    #[prost(string, optional, tag = "3")]
    room_id: Option<String>,
    #[prost(string, optional, tag = "4")]
    from: Option<String>,
    #[prost(string, tag = "5")]
    event: String,
    #[prost(message, optional, tag = "6")]
    data: Option<prost_types::Value>,
}

#[cfg(test)]
#[path = "lib_test.rs"]
mod tests;
