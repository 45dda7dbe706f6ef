//! # Worker Methods
//!
//! A `Method` is a self-contained unit of code plus nothing else: a plain `fn`
//! pointer. Only non-capturing closures coerce to `fn`, so a method can never
//! close over the caller's state. That is the whole capability contract of the
//! boundary: code and a name go across, references do not.
//!
//! Bodies see their arguments as [`Args`] and report failure as a [`MethodError`],
//! the only error shape that survives the trip back.

use std::any::Any;
use std::backtrace::Backtrace;
use std::backtrace::BacktraceStatus;
use std::panic::AssertUnwindSafe;

use futures::FutureExt;
use futures::future;
use futures::future::BoxFuture;
use serde_json::Value;

use workwire::ErrorPayload;

use crate::args::Args;

pub type MethodResult = Result<Value, MethodError>;

/// Body of a method that completes before returning.
pub type SyncBody = fn(Args) -> MethodResult;

/// Body of a method that yields a future.
pub type AsyncBody = fn(Args) -> BoxFuture<'static, MethodResult>;

/// A callable that can be shipped to a worker.
#[derive(Clone, Copy, Debug)]
pub enum Method {
    Sync(SyncBody),
    Async(AsyncBody),
}

impl Method {
    pub fn sync(body: SyncBody) -> Self {
        Self::Sync(body)
    }

    pub fn asynchronous(body: AsyncBody) -> Self {
        Self::Async(body)
    }

    /// Runs the body to completion.
    ///
    /// Sync and async bodies are awaited the same way. A panic at any point,
    /// including while the body builds its future, is reported as a
    /// `MethodError` rather than unwinding into the worker loop.
    pub(crate) async fn invoke(self, args: Args) -> MethodResult {
        let started = std::panic::catch_unwind(AssertUnwindSafe(|| match self {
            Method::Sync(body) => future::ready(body(args)).boxed(),
            Method::Async(body) => body(args),
        }));

        let call = match started {
            Ok(call) => call,
            Err(panic) => return Err(MethodError::from_panic(panic)),
        };

        AssertUnwindSafe(call)
            .catch_unwind()
            .await
            .unwrap_or_else(|panic| Err(MethodError::from_panic(panic)))
    }
}

/// An error raised by a method body.
///
/// Only the message and the stack text cross the boundary; a caller receives a
/// `MethodError` rebuilt from those two strings and nothing else.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MethodError {
    message: String,
    stack: String,
}

impl MethodError {
    /// Creates an error, capturing the current backtrace as its stack.
    ///
    /// The stack is empty unless backtraces are enabled (`RUST_BACKTRACE`).
    pub fn new(message: impl Into<String>) -> Self {
        let backtrace = Backtrace::capture();
        let stack = match backtrace.status() {
            BacktraceStatus::Captured => backtrace.to_string(),
            _ => String::new(),
        };

        Self {
            message: message.into(),
            stack,
        }
    }

    pub fn with_stack(message: impl Into<String>, stack: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            stack: stack.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn stack(&self) -> &str {
        &self.stack
    }

    pub(crate) fn from_panic(panic: Box<dyn Any + Send>) -> Self {
        let message = match panic.downcast::<String>() {
            Ok(msg) => *msg,
            Err(panic) => match panic.downcast::<&'static str>() {
                Ok(msg) => msg.to_string(),
                Err(_) => "method panicked".to_string(),
            },
        };
        Self::new(message)
    }

    pub(crate) fn into_payload(self) -> ErrorPayload {
        ErrorPayload {
            message: self.message,
            stack: self.stack,
        }
    }
}

impl std::fmt::Display for MethodError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for MethodError {}

impl From<ErrorPayload> for MethodError {
    fn from(payload: ErrorPayload) -> Self {
        Self::with_stack(payload.message, payload.stack)
    }
}

impl From<serde_json::Error> for MethodError {
    fn from(e: serde_json::Error) -> Self {
        Self::new(e.to_string())
    }
}

impl From<anyhow::Error> for MethodError {
    fn from(e: anyhow::Error) -> Self {
        Self::with_stack(e.to_string(), format!("{:?}", e))
    }
}

impl From<&str> for MethodError {
    fn from(message: &str) -> Self {
        Self::new(message)
    }
}

impl From<String> for MethodError {
    fn from(message: String) -> Self {
        Self::new(message)
    }
}
