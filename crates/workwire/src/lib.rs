//! # Workwire
//!
//! The envelope protocol spoken between a caller and its worker.
//!
//! ## Architecture
//!
//! Every call is a `Request` tagged with a `CorrelationId`, and every `Request`
//! is answered by exactly one `Response` carrying the same id. Envelopes are
//! JSON, so both ends must be produced by the same build of this crate; there
//! is no version field and no negotiation.

mod codec;
mod error;
mod id;
mod message;


pub use crate::error::Error;
pub use crate::error::Result;

pub use crate::id::CorrelationId;
pub use crate::id::DEFAULT_ID_LENGTH;

pub use crate::message::ErrorPayload;
pub use crate::message::Request;
pub use crate::message::Response;

pub use crate::codec::decode;
pub use crate::codec::encode;
pub use crate::codec::peek_id;
