//! # Envelopes
//!
//! The two shapes that cross the channel.
//!
//! ## Invariants
//!
//! - A `Response` carries the id of the `Request` it answers.
//! - A `Response` serializes either `result` or `error`, never both.
//! - An absent or `null` result is a successful `null`, not a failure.

use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;

use crate::id::CorrelationId;

/// A call travelling from the caller to the worker.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Request {
    pub id: CorrelationId,
    pub name: String,
    #[serde(default)]
    pub args: Vec<Value>,
}

impl Request {
    pub fn new(id: CorrelationId, name: impl Into<String>, args: Vec<Value>) -> Self {
        Self { id, name: name.into(), args }
    }
}

/// The only two facts about an error that survive the boundary.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorPayload {
    pub message: String,
    #[serde(default)]
    pub stack: String,
}

/// The terminal outcome of a call, travelling from the worker to the caller.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Response {
    pub id: CorrelationId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorPayload>,
}

impl Response {
    pub fn success(id: CorrelationId, result: Value) -> Self {
        Self { id, result: Some(result), error: None }
    }

    pub fn failure(id: CorrelationId, error: ErrorPayload) -> Self {
        Self { id, result: None, error: Some(error) }
    }

    pub fn is_failure(&self) -> bool {
        self.error.is_some()
    }

    /// Collapses the envelope into the outcome it carries.
    pub fn into_outcome(self) -> std::result::Result<Value, ErrorPayload> {
        match self.error {
            Some(error) => Err(error),
            None => Ok(self.result.unwrap_or(Value::Null)),
        }
    }
}
