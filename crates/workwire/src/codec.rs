//! # JSON Codec
//!
//! Envelopes are moved as UTF-8 JSON bytes. The transport never looks inside.

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::Error;
use crate::error::Result;
use crate::id::CorrelationId;

/// Encodes an envelope into bytes.
pub fn encode<T: Serialize>(message: &T) -> Result<Vec<u8>> {
    serde_json::to_vec(message).map_err(Error::from)
}

/// Decodes an envelope from bytes.
pub fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T> {
    serde_json::from_slice(bytes).map_err(Error::from)
}

/// Recovers the correlation id from a frame that failed to decode as a full envelope.
///
/// Returns `None` unless the bytes are a JSON object with a string `id`.
pub fn peek_id(bytes: &[u8]) -> Option<CorrelationId> {
    let value: Value = serde_json::from_slice(bytes).ok()?;
    let id = value.get("id")?.as_str()?;
    Some(CorrelationId::from(id))
}
