//! # Autoworker
//!
//! Run plain functions in an isolated worker and call them like local async
//! functions.
//!
//! ```ignore
//! use autoworker::{Args, AutoWorker, Method, MethodResult};
//! use serde_json::json;
//!
//! fn double(args: Args) -> MethodResult {
//!     let x: i64 = args.get(0)?;
//!     Ok(json!(x * 2))
//! }
//!
//! let worker = AutoWorker::new(Method::sync(double))?;
//! let answer: i64 = worker.run((21,)).await?;
//! ```
//!
//! ## Architecture
//!
//! - **Boundary**: freezes a `MethodRegistry` into a `Program` that a `Host`
//!   runs in its own context.
//! - **Router**: the caller side. Sends correlated requests over a `Transport`
//!   and settles one future per response.
//! - **Worker**: `AutoWorker` ties the two together over an in-memory channel.

pub mod args;
pub mod boundary;
pub mod builder;
pub mod channel;
pub mod config;
pub mod host;
pub mod method;
pub mod registry;
pub mod router;
pub mod transport;
pub mod worker;


pub use crate::args::Args;
pub use crate::args::IntoArgs;
pub use crate::boundary::Boundary;
pub use crate::boundary::Program;
pub use crate::builder::Error as BuildError;
pub use crate::builder::WorkerBuilder;
pub use crate::channel::ChannelTransport;
pub use crate::config::Config;
pub use crate::host::Host;
pub use crate::host::TaskHost;
pub use crate::host::ThreadHost;
pub use crate::method::Method;
pub use crate::method::MethodError;
pub use crate::method::MethodResult;
pub use crate::registry::MethodRegistry;
pub use crate::router::Error as CallError;
pub use crate::router::Router;
pub use crate::transport::Transport;
pub use crate::worker::AutoWorker;
pub use crate::worker::MethodHandle;
