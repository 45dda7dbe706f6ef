//! # Transport Abstraction
//!
//! A minimal, async interface for moving bytes between a caller and its worker.
//!
//! ## Philosophy
//!
//! - **Byte-Oriented**: The Transport knows nothing about envelopes or ids.
//!   It moves opaque buffers.
//! - **Message-Passing**: Sends and receives are independent. Correlating a
//!   reply with its request is the router's job, not the transport's.

/// Errors that occur at the channel layer.
#[derive(Debug, Clone)]
pub enum Error {
    /// The other side of the channel is gone.
    ConnectionLost(String),
    /// Generic I/O error or internal transport failure.
    Io(String),
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ConnectionLost(msg) => write!(f, "Connection lost: {}", msg),
            Self::Io(msg) => write!(f, "I/O error: {}", msg),
        }
    }
}

impl std::error::Error for Error {}

pub type Result<T> = std::result::Result<T, Error>;

/// One end of a bidirectional, asynchronous message channel.
///
/// This trait is designed to be object-safe (`Arc<dyn Transport>`).
#[async_trait::async_trait]
pub trait Transport: Send + Sync + 'static {
    /// Queues a payload for the other side.
    ///
    /// Returns once the payload is handed off, not once it is processed.
    async fn send(&self, payload: &[u8]) -> Result<()>;

    /// Waits for the next payload from the other side.
    ///
    /// Returns `Ok(None)` once the other side has closed the channel.
    async fn recv(&self) -> Result<Option<Vec<u8>>>;
}
