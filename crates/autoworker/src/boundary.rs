//! # Boundary Builder
//!
//! Turns a `MethodRegistry` into a `Program`: a self-contained value that a
//! host can move into an isolated context and run there. The program owns a
//! frozen copy of the method table and implements the worker side of the
//! protocol; it needs nothing from the context that built it.
//!
//! ## Architecture
//!
//! - **Builder**: `Boundary::build` copies the registry by value.
//! - **Dispatch**: one `Request` in, exactly one `Response` out. Lookup failures,
//!   errors and panics all become failure responses.
//! - **Listener**: `Program::serve` reads frames until the channel closes and
//!   handles each request on its own task, so calls complete in whatever order
//!   their bodies finish.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use tracing::debug;
use tracing::warn;

use workwire::Request;
use workwire::Response;

use crate::args::Args;
use crate::method::Method;
use crate::method::MethodError;
use crate::registry::MethodRegistry;
use crate::transport;
use crate::transport::Transport;

/// Stateless entry point for building programs.
pub struct Boundary;

impl Boundary {
    /// Freezes `registry` into a program.
    pub fn build(registry: &MethodRegistry) -> Program {
        let methods: BTreeMap<String, Method> = registry
            .iter()
            .map(|(name, method)| (name.to_string(), method))
            .collect();

        Program {
            methods: Arc::new(methods),
        }
    }
}

/// The worker side of the protocol, ready to be launched by a host.
#[derive(Clone)]
pub struct Program {
    methods: Arc<BTreeMap<String, Method>>,
}

impl Program {
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.methods.keys().map(String::as_str)
    }

    /// Answers a single request.
    pub async fn dispatch(&self, request: Request) -> Response {
        let Request { id, name, args } = request;

        let outcome = match self.methods.get(&name) {
            Some(method) => method.invoke(Args::from(args)).await,
            None => Err(MethodError::new(format!("method '{}' is not registered", name))),
        };

        match outcome {
            Ok(result) => {
                debug!(%id, method = %name, "call fulfilled");
                Response::success(id, result)
            }
            Err(error) => {
                debug!(%id, method = %name, error = %error, "call rejected");
                Response::failure(id, error.into_payload())
            }
        }
    }

    /// Decodes and answers one raw frame.
    ///
    /// A frame that is not a valid request is still answered when its id can be
    /// recovered. Otherwise there is no one to answer and it is dropped.
    pub async fn handle_frame(&self, frame: &[u8]) -> Option<Response> {
        match workwire::decode::<Request>(frame) {
            Ok(request) => Some(self.dispatch(request).await),
            Err(e) => match workwire::peek_id(frame) {
                Some(id) => {
                    warn!(%id, error = %e, "malformed request");
                    let error = MethodError::new(format!("malformed request: {}", e));
                    Some(Response::failure(id, error.into_payload()))
                }
                None => {
                    warn!(error = %e, "dropping frame without a correlation id");
                    None
                }
            },
        }
    }

    /// Serves requests from `transport` until the other side closes it.
    pub async fn serve(self, transport: Arc<dyn Transport>) -> transport::Result<()> {
        debug!(program = %self, "worker listening");

        while let Some(frame) = transport.recv().await? {
            let program = self.clone();
            let transport = transport.clone();

            tokio::spawn(async move {
                let Some(response) = program.handle_frame(&frame).await else { return };

                let payload = match workwire::encode(&response) {
                    Ok(payload) => payload,
                    Err(e) => {
                        warn!(id = %response.id, error = %e, "failed to encode response");
                        return;
                    }
                };

                if let Err(e) = transport.send(&payload).await {
                    warn!(id = %response.id, error = %e, "caller went away before the response was sent");
                }
            });
        }

        debug!("worker channel closed");
        Ok(())
    }
}

impl fmt::Display for Program {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "program {{")?;
        for (i, (name, method)) in self.methods.iter().enumerate() {
            let kind = match method {
                Method::Sync(_) => "sync",
                Method::Async(_) => "async",
            };
            let sep = if i == 0 { " " } else { ", " };
            write!(f, "{}{}: {}", sep, name, kind)?;
        }
        write!(f, " }}")
    }
}

impl fmt::Debug for Program {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}
