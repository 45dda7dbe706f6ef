//! # Hosts
//!
//! A host turns a `Program` and one end of a channel into a running worker.
//! How the isolated context is created is the host's business; the protocol
//! only needs the program to be served on the transport it was given.

use std::sync::Arc;

use tracing::debug;
use tracing::warn;

use crate::boundary::Program;
use crate::transport::Transport;

#[derive(Debug)]
pub enum Error {
    /// The worker's event loop could not be created.
    Runtime(std::io::Error),
    /// The worker thread could not be spawned.
    Spawn(std::io::Error),
    /// The host needs an ambient tokio runtime and there is none.
    NoRuntime,
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Runtime(e) => write!(f, "Failed to build worker runtime: {}", e),
            Self::Spawn(e) => write!(f, "Failed to spawn worker thread: {}", e),
            Self::NoRuntime => write!(f, "No tokio runtime is running"),
        }
    }
}

impl std::error::Error for Error {}

pub type Result<T> = std::result::Result<T, Error>;

/// Something that can run a program in its own execution context.
pub trait Host: Send + Sync + 'static {
    /// Starts serving `program` on `transport`.
    ///
    /// Returns once the worker is started; the worker runs until the other end
    /// of the transport is closed.
    fn launch(&self, program: Program, transport: Box<dyn Transport>) -> Result<()>;
}

/// Runs each worker on a dedicated OS thread with its own single-threaded
/// event loop. Nothing is shared with the caller except the channel.
#[derive(Clone, Debug)]
pub struct ThreadHost {
    thread_name: String,
}

impl ThreadHost {
    pub fn new(thread_name: impl Into<String>) -> Self {
        Self {
            thread_name: thread_name.into(),
        }
    }
}

impl Host for ThreadHost {
    fn launch(&self, program: Program, transport: Box<dyn Transport>) -> Result<()> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(Error::Runtime)?;

        let transport: Arc<dyn Transport> = Arc::from(transport);
        let name = self.thread_name.clone();

        std::thread::Builder::new()
            .name(self.thread_name.clone())
            .spawn(move || {
                debug!(worker = %name, "worker thread started");
                if let Err(e) = runtime.block_on(program.serve(transport)) {
                    warn!(worker = %name, error = %e, "worker stopped on transport error");
                }
                debug!(worker = %name, "worker thread exiting");
            })
            .map_err(Error::Spawn)?;

        Ok(())
    }
}

/// Runs the worker as a task on the caller's own tokio runtime.
///
/// The program still only talks over the channel, but it shares the caller's
/// scheduler. Handy for embedding and tests.
#[derive(Clone, Copy, Debug, Default)]
pub struct TaskHost;

impl Host for TaskHost {
    fn launch(&self, program: Program, transport: Box<dyn Transport>) -> Result<()> {
        let handle = tokio::runtime::Handle::try_current().map_err(|_| Error::NoRuntime)?;
        let transport: Arc<dyn Transport> = Arc::from(transport);

        handle.spawn(async move {
            if let Err(e) = program.serve(transport).await {
                warn!(error = %e, "worker task stopped on transport error");
            }
        });

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use workwire::Request;
    use workwire::Response;

    use super::*;
    use crate::args::Args;
    use crate::boundary::Boundary;
    use crate::channel::ChannelTransport;
    use crate::method::Method;
    use crate::method::MethodResult;
    use crate::registry::MethodRegistry;

    fn thread_name(_: Args) -> MethodResult {
        Ok(json!(std::thread::current().name()))
    }

    async fn ask_thread_name(host: &dyn Host) -> serde_json::Value {
        let program = Boundary::build(&MethodRegistry::from(Method::sync(thread_name)));
        let (caller, worker) = ChannelTransport::pair();
        host.launch(program, Box::new(worker)).unwrap();

        let req = Request::new("a".into(), "run", vec![]);
        caller.send(&workwire::encode(&req).unwrap()).await.unwrap();
        let frame = caller.recv().await.unwrap().unwrap();
        let resp: Response = workwire::decode(&frame).unwrap();
        resp.into_outcome().unwrap()
    }

    #[tokio::test]
    async fn test_thread_host_runs_on_named_thread() {
        let name = ask_thread_name(&ThreadHost::new("worker-under-test")).await;
        assert_eq!(name, json!("worker-under-test"));
    }

    #[tokio::test]
    async fn test_task_host_runs_on_caller_runtime() {
        let name = ask_thread_name(&TaskHost).await;
        assert_eq!(name, json!(std::thread::current().name()));
    }

    #[test]
    fn test_task_host_needs_runtime() {
        let program = Boundary::build(&MethodRegistry::new());
        let (_caller, worker) = ChannelTransport::pair();
        let err = TaskHost.launch(program, Box::new(worker)).unwrap_err();
        assert!(matches!(err, Error::NoRuntime));
    }
}
