//! # Correlation Ids
//!
//! Opaque tokens linking a request to its eventual response. Ids are drawn from
//! the operating system RNG, so they are unguessable as well as unique in practice.
//! Uniqueness among in-flight calls is enforced by the caller's pending table,
//! not here.

use std::fmt;

use rand::Rng;
use rand::rngs::OsRng;
use serde::Deserialize;
use serde::Serialize;

/// Length of a freshly generated id. 16 letters is roughly 75 bits.
pub const DEFAULT_ID_LENGTH: usize = 16;

#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CorrelationId(String);

impl CorrelationId {
    /// Generates an id of `length` lowercase ASCII letters.
    pub fn generate(length: usize) -> Self {
        let mut rng = OsRng;
        let id = (0..length)
            .map(|_| char::from(rng.gen_range(b'a'..=b'z')))
            .collect();
        Self(id)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for CorrelationId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl From<&str> for CorrelationId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl fmt::Display for CorrelationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
