//! # Worker Builder
//!
//! Provides a fluent API for configuring and starting an `AutoWorker`.

use tracing::debug;

use crate::boundary::Boundary;
use crate::channel::ChannelTransport;
use crate::config;
use crate::config::Config;
use crate::host;
use crate::host::Host;
use crate::host::ThreadHost;
use crate::registry::MethodRegistry;
use crate::router::Router;
use crate::worker::AutoWorker;

#[derive(Debug)]
pub enum Error {
    Config(config::Error),
    Host(host::Error),
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Config(e) => write!(f, "Configuration error: {}", e),
            Self::Host(e) => write!(f, "Host error: {}", e),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Config(e) => Some(e),
            Self::Host(e) => Some(e),
        }
    }
}

impl From<config::Error> for Error {
    fn from(e: config::Error) -> Self {
        Self::Config(e)
    }
}

impl From<host::Error> for Error {
    fn from(e: host::Error) -> Self {
        Self::Host(e)
    }
}

pub type Result<T> = std::result::Result<T, Error>;

/// Fluent builder for starting a worker.
pub struct WorkerBuilder {
    registry: MethodRegistry,
    config: Config,
    host: Option<Box<dyn Host>>,
}

impl WorkerBuilder {
    pub fn new(registry: MethodRegistry) -> Self {
        Self {
            registry,
            config: Config::default(),
            host: None,
        }
    }

    pub fn config(mut self, config: Config) -> Self {
        self.config = config;
        self
    }

    pub fn id_length(mut self, id_length: usize) -> Self {
        self.config.id_length = id_length;
        self
    }

    pub fn thread_name(mut self, thread_name: impl Into<String>) -> Self {
        self.config.thread_name = thread_name.into();
        self
    }

    /// Runs the worker on `host` instead of a dedicated thread.
    pub fn host(mut self, host: impl Host) -> Self {
        self.host = Some(Box::new(host));
        self
    }

    /// Builds the program, launches it, and connects a router to it.
    ///
    /// Must be called from within a tokio runtime.
    pub fn build(self) -> Result<AutoWorker> {
        self.config.validate()?;
        tokio::runtime::Handle::try_current().map_err(|_| host::Error::NoRuntime)?;

        let program = Boundary::build(&self.registry);
        let (caller_end, worker_end) = ChannelTransport::pair();

        let host: Box<dyn Host> = match self.host {
            Some(host) => host,
            None => Box::new(ThreadHost::new(self.config.thread_name.clone())),
        };
        host.launch(program, Box::new(worker_end))?;

        debug!(methods = self.registry.len(), id_length = self.config.id_length, "worker started");

        let router = Router::new(Box::new(caller_end), self.config.id_length)?;
        let names = self.registry.names().map(str::to_string).collect();
        Ok(AutoWorker::from_parts(router, names))
    }
}
