//! # Worker Instance
//!
//! `AutoWorker` is what a caller holds: a set of methods that run somewhere
//! else and answer through futures. Each call is routed through one shared
//! `Router`, so any number of calls can be in flight at once.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::args::IntoArgs;
use crate::builder::WorkerBuilder;
use crate::registry::DEFAULT_METHOD;
use crate::registry::MethodRegistry;
use crate::router;
use crate::router::Router;

/// Names of `AutoWorker`'s own API. A registered method with one of these
/// names gets no accessor, but stays reachable through `call` and `invoke`.
pub const RESERVED_NAMES: &[&str] = &[
    "builder",
    "call",
    "invoke",
    "method",
    "names",
    "new",
    "pending_calls",
];

/// A handle to a set of methods running in an isolated worker.
pub struct AutoWorker {
    router: Arc<Router>,
    names: Vec<String>,
    accessors: BTreeMap<String, MethodHandle>,
}

impl AutoWorker {
    /// Starts a worker on its own thread with default configuration.
    ///
    /// `methods` is either a single `Method`, bound to `run`, or a full
    /// `MethodRegistry`. Must be called from within a tokio runtime.
    pub fn new(methods: impl Into<MethodRegistry>) -> crate::builder::Result<Self> {
        Self::builder(methods).build()
    }

    pub fn builder(methods: impl Into<MethodRegistry>) -> WorkerBuilder {
        WorkerBuilder::new(methods.into())
    }

    pub(crate) fn from_parts(router: Router, names: Vec<String>) -> Self {
        let router = Arc::new(router);

        let accessors = names
            .iter()
            .filter(|name| !RESERVED_NAMES.contains(&name.as_str()))
            .map(|name| {
                let handle = MethodHandle {
                    name: name.clone(),
                    router: router.clone(),
                };
                (name.clone(), handle)
            })
            .collect();

        Self {
            router,
            names,
            accessors,
        }
    }

    /// Calls `name` with `args` and decodes the result as `R`.
    pub async fn call<A, R>(&self, name: &str, args: A) -> router::Result<R>
    where
        A: IntoArgs,
        R: DeserializeOwned,
    {
        call_typed(&self.router, name, args).await
    }

    /// Calls `name` with raw arguments and returns the raw result.
    pub async fn invoke(&self, name: &str, args: Vec<Value>) -> router::Result<Value> {
        self.router.invoke(name, args).await
    }

    /// Calls the method bound to `run`.
    pub async fn run<A, R>(&self, args: A) -> router::Result<R>
    where
        A: IntoArgs,
        R: DeserializeOwned,
    {
        self.call(DEFAULT_METHOD, args).await
    }

    /// The accessor for a registered method, if it has one.
    pub fn method(&self, name: &str) -> Option<&MethodHandle> {
        self.accessors.get(name)
    }

    /// All registered method names, in sorted order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(String::as_str)
    }

    /// Calls sent and not yet answered.
    pub fn pending_calls(&self) -> usize {
        self.router.pending_count()
    }
}

/// A callable bound to one method of a worker.
///
/// Handles share the worker's router and can outlive the borrow they were
/// obtained from by cloning.
#[derive(Clone)]
pub struct MethodHandle {
    name: String,
    router: Arc<Router>,
}

impl MethodHandle {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub async fn call<A, R>(&self, args: A) -> router::Result<R>
    where
        A: IntoArgs,
        R: DeserializeOwned,
    {
        call_typed(&self.router, &self.name, args).await
    }

    pub async fn invoke(&self, args: Vec<Value>) -> router::Result<Value> {
        self.router.invoke(&self.name, args).await
    }
}

async fn call_typed<A, R>(router: &Router, name: &str, args: A) -> router::Result<R>
where
    A: IntoArgs,
    R: DeserializeOwned,
{
    let args = args.into_args()?;
    let result = router.invoke(name, args).await?;
    Ok(serde_json::from_value(result)?)
}
