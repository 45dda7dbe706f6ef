//! # Call Router
//!
//! The caller side of the protocol. A `Router` owns one end of the channel and a
//! table of pending calls keyed by correlation id. A single background pump
//! reads every response and settles the call it belongs to; there are no
//! per-call listeners.
//!
//! ## Invariants
//!
//! - At most one pending call per id. Ids are regenerated on collision with a
//!   call still in flight.
//! - A pending call is removed exactly once: when its response arrives, or when
//!   its request could not be sent.
//! - A response whose id matches no pending call is dropped.
//! - A response that does not decode but carries a pending id rejects that call.
//! - There is no timeout. A call whose response never arrives stays pending.

use std::sync::Arc;

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use serde_json::Value;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::debug;
use tracing::error;
use tracing::warn;

use workwire::CorrelationId;
use workwire::ErrorPayload;
use workwire::Request;
use workwire::Response;

use crate::config;
use crate::config::MAX_ID_LENGTH;
use crate::config::MIN_ID_LENGTH;
use crate::method::MethodError;
use crate::transport;
use crate::transport::Transport;

#[derive(Debug)]
pub enum Error {
    /// The request could not be handed to the channel.
    Transport(transport::Error),
    /// An envelope or value could not be encoded or decoded.
    Wire(workwire::Error),
    /// The method failed inside the worker.
    Method(MethodError),
    /// The pending call was discarded without an outcome.
    ChannelClosed,
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Transport(e) => write!(f, "Transport error: {}", e),
            Self::Wire(e) => write!(f, "Wire error: {}", e),
            Self::Method(e) => write!(f, "{}", e),
            Self::ChannelClosed => write!(f, "Response channel closed"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Transport(e) => Some(e),
            Self::Wire(e) => Some(e),
            Self::Method(e) => Some(e),
            Self::ChannelClosed => None,
        }
    }
}

impl From<transport::Error> for Error {
    fn from(e: transport::Error) -> Self {
        Self::Transport(e)
    }
}

impl From<workwire::Error> for Error {
    fn from(e: workwire::Error) -> Self {
        Self::Wire(e)
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Self::Wire(workwire::Error::Json(e))
    }
}

impl From<MethodError> for Error {
    fn from(e: MethodError) -> Self {
        Self::Method(e)
    }
}

impl Error {
    /// The worker-side error, if the call was rejected by the method.
    pub fn as_method_error(&self) -> Option<&MethodError> {
        match self {
            Self::Method(e) => Some(e),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

type Outcome = std::result::Result<Value, ErrorPayload>;

/// A call that has been sent and not yet settled.
struct PendingCall {
    method: String,
    tx: oneshot::Sender<Outcome>,
}

/// Demultiplexes responses from one worker channel onto concurrent callers.
///
/// Must be created inside a tokio runtime; the pump is spawned onto it.
/// Dropping the router stops the pump and releases the channel, which lets
/// the worker side observe the close and exit.
pub struct Router {
    transport: Arc<dyn Transport>,
    pending: Arc<DashMap<CorrelationId, PendingCall>>,
    id_length: usize,
    generate: fn(usize) -> CorrelationId,
    pump: JoinHandle<()>,
}

impl Router {
    /// Creates a router over `transport` and spawns its pump.
    ///
    /// `id_length` must lie in `MIN_ID_LENGTH..=MAX_ID_LENGTH`; shorter ids
    /// leave too few candidates to regenerate into on collision.
    pub fn new(transport: Box<dyn Transport>, id_length: usize) -> config::Result<Self> {
        if !(MIN_ID_LENGTH..=MAX_ID_LENGTH).contains(&id_length) {
            return Err(config::Error::IdLengthOutOfRange(id_length));
        }
        Ok(Self::with_generator(transport, id_length, CorrelationId::generate))
    }

    fn with_generator(
        transport: Box<dyn Transport>,
        id_length: usize,
        generate: fn(usize) -> CorrelationId,
    ) -> Self {
        let transport: Arc<dyn Transport> = Arc::from(transport);
        let pending = Arc::new(DashMap::new());

        let pump_transport = transport.clone();
        let pump_pending = pending.clone();

        let pump = tokio::spawn(async move {
            loop {
                match pump_transport.recv().await {
                    Ok(Some(msg)) => Self::handle_message(&msg, &pump_pending),
                    Ok(None) => {
                        debug!("worker closed the channel");
                        break;
                    }
                    Err(e) => {
                        error!(error = %e, "transport error in pump");
                        break;
                    }
                }
            }

            if !pump_pending.is_empty() {
                warn!(pending = pump_pending.len(), "pump stopped with calls in flight; they will not settle");
            }
        });

        Self {
            transport,
            pending,
            id_length,
            generate,
            pump,
        }
    }

    /// Number of calls sent and not yet settled.
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Settles the pending call a response belongs to.
    fn handle_message(msg: &[u8], pending: &DashMap<CorrelationId, PendingCall>) {
        let response: Response = match workwire::decode(msg) {
            Ok(response) => response,
            Err(e) => {
                let Some((id, call)) = workwire::peek_id(msg).and_then(|id| pending.remove(&id)) else {
                    warn!(error = %e, "dropping malformed response");
                    return;
                };

                warn!(%id, method = %call.method, error = %e, "rejecting call with malformed response");
                let _ = call.tx.send(Err(ErrorPayload {
                    message: format!("malformed response: {}", e),
                    stack: String::new(),
                }));
                return;
            }
        };

        let Some((id, call)) = pending.remove(&response.id) else {
            debug!(id = %response.id, "ignoring response with no pending call");
            return;
        };

        debug!(%id, method = %call.method, failed = response.is_failure(), "settling call");

        // The caller may have stopped waiting; that is not our problem.
        let _ = call.tx.send(response.into_outcome());
    }

    /// Reserves a fresh id and registers the pending call under it.
    fn prepare_call(&self, method: &str) -> (CorrelationId, oneshot::Receiver<Outcome>) {
        loop {
            let candidate = (self.generate)(self.id_length);

            match self.pending.entry(candidate) {
                Entry::Occupied(slot) => {
                    debug!(id = %slot.key(), "id collision; regenerating");
                    continue;
                }
                Entry::Vacant(slot) => {
                    let id = slot.key().clone();
                    let (tx, rx) = oneshot::channel();
                    slot.insert(PendingCall {
                        method: method.to_string(),
                        tx,
                    });
                    return (id, rx);
                }
            }
        }
    }

    /// Sends a call to the worker and waits for its outcome.
    pub async fn invoke(&self, method: &str, args: Vec<Value>) -> Result<Value> {
        let (id, rx) = self.prepare_call(method);

        let request = Request::new(id.clone(), method, args);
        let payload = match workwire::encode(&request) {
            Ok(payload) => payload,
            Err(e) => {
                self.pending.remove(&id);
                return Err(e.into());
            }
        };

        debug!(%id, method, "sending call");
        if let Err(e) = self.transport.send(&payload).await {
            self.pending.remove(&id);
            return Err(e.into());
        }

        match rx.await {
            Ok(Ok(result)) => Ok(result),
            Ok(Err(payload)) => Err(Error::Method(MethodError::from(payload))),
            Err(_) => Err(Error::ChannelClosed),
        }
    }
}

impl Drop for Router {
    fn drop(&mut self) {
        self.pump.abort();
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use serde_json::json;

    use super::*;
    use crate::channel::ChannelTransport;

    /// Reads the next request off the worker end of the channel.
    async fn next_request(worker: &ChannelTransport) -> Request {
        let frame = worker.recv().await.unwrap().expect("channel closed");
        workwire::decode(&frame).unwrap()
    }

    async fn reply(worker: &ChannelTransport, response: &Response) {
        worker.send(&workwire::encode(response).unwrap()).await.unwrap();
    }

    /// A transport whose sends always fail.
    struct BrokenTransport;

    #[async_trait::async_trait]
    impl Transport for BrokenTransport {
        async fn send(&self, _payload: &[u8]) -> transport::Result<()> {
            Err(transport::Error::Io("wire cut".into()))
        }

        async fn recv(&self) -> transport::Result<Option<Vec<u8>>> {
            std::future::pending().await
        }
    }

    #[tokio::test]
    async fn test_invoke_settles_with_result() {
        let (caller, worker) = ChannelTransport::pair();
        let router = Arc::new(Router::new(Box::new(caller), 16).unwrap());

        let call = tokio::spawn({
            let router = router.clone();
            async move { router.invoke("double", vec![json!(21)]).await }
        });

        let req = next_request(&worker).await;
        assert_eq!(req.name, "double");
        assert_eq!(req.args, vec![json!(21)]);
        assert_eq!(router.pending_count(), 1);

        reply(&worker, &Response::success(req.id, json!(42))).await;

        assert_eq!(call.await.unwrap().unwrap(), json!(42));
        assert_eq!(router.pending_count(), 0);
    }

    #[tokio::test]
    async fn test_invoke_rejects_with_remote_message() {
        let (caller, worker) = ChannelTransport::pair();
        let router = Arc::new(Router::new(Box::new(caller), 16).unwrap());

        let call = tokio::spawn({
            let router = router.clone();
            async move { router.invoke("fail", vec![]).await }
        });

        let req = next_request(&worker).await;
        let payload = ErrorPayload { message: "boom".into(), stack: "at fail".into() };
        reply(&worker, &Response::failure(req.id, payload)).await;

        let err = call.await.unwrap().unwrap_err();
        let method_err = err.as_method_error().expect("method error");
        assert_eq!(method_err.message(), "boom");
        assert_eq!(method_err.stack(), "at fail");
    }

    #[tokio::test]
    async fn test_out_of_order_responses_reach_their_own_callers() {
        let (caller, worker) = ChannelTransport::pair();
        let router = Arc::new(Router::new(Box::new(caller), 16).unwrap());

        let first = tokio::spawn({
            let router = router.clone();
            async move { router.invoke("echo", vec![json!("first")]).await }
        });
        let first_req = next_request(&worker).await;

        let second = tokio::spawn({
            let router = router.clone();
            async move { router.invoke("echo", vec![json!("second")]).await }
        });
        let second_req = next_request(&worker).await;

        assert_ne!(first_req.id, second_req.id);

        reply(&worker, &Response::success(second_req.id, json!("second"))).await;
        assert_eq!(second.await.unwrap().unwrap(), json!("second"));
        assert!(!first.is_finished());

        reply(&worker, &Response::success(first_req.id, json!("first"))).await;
        assert_eq!(first.await.unwrap().unwrap(), json!("first"));
    }

    #[tokio::test]
    async fn test_stale_and_malformed_responses_are_ignored() {
        let (caller, worker) = ChannelTransport::pair();
        let router = Arc::new(Router::new(Box::new(caller), 16).unwrap());

        let call = tokio::spawn({
            let router = router.clone();
            async move { router.invoke("echo", vec![json!(1)]).await }
        });
        let req = next_request(&worker).await;

        reply(&worker, &Response::success("nobody".into(), json!("wrong"))).await;
        worker.send(b"not json at all").await.unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!call.is_finished());

        reply(&worker, &Response::success(req.id.clone(), json!(1))).await;
        assert_eq!(call.await.unwrap().unwrap(), json!(1));

        // A duplicate for an already settled id is stale too.
        reply(&worker, &Response::success(req.id, json!(2))).await;
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(router.pending_count(), 0);
    }

    #[tokio::test]
    async fn test_send_failure_rejects_and_forgets_call() {
        let router = Router::new(Box::new(BrokenTransport), 16).unwrap();

        let err = router.invoke("double", vec![json!(1)]).await.unwrap_err();
        assert!(matches!(err, Error::Transport(transport::Error::Io(_))));
        assert_eq!(router.pending_count(), 0);
    }

    #[tokio::test]
    async fn test_unanswered_call_stays_pending() {
        let (caller, worker) = ChannelTransport::pair();
        let router = Router::new(Box::new(caller), 16).unwrap();

        let outcome = tokio::time::timeout(
            Duration::from_millis(50),
            router.invoke("never", vec![]),
        ).await;

        assert!(outcome.is_err(), "call settled without a response");
        assert_eq!(router.pending_count(), 1);
        drop(worker);
    }

    #[tokio::test]
    async fn test_ids_use_configured_length() {
        let (caller, worker) = ChannelTransport::pair();
        let router = Arc::new(Router::new(Box::new(caller), 24).unwrap());

        let _call = tokio::spawn({
            let router = router.clone();
            async move { router.invoke("echo", vec![]).await }
        });

        let req = next_request(&worker).await;
        assert_eq!(req.id.as_str().len(), 24);
    }

    #[tokio::test]
    async fn test_malformed_response_with_pending_id_rejects_call() {
        let (caller, worker) = ChannelTransport::pair();
        let router = Arc::new(Router::new(Box::new(caller), 16).unwrap());

        let call = tokio::spawn({
            let router = router.clone();
            async move { router.invoke("echo", vec![json!(1)]).await }
        });
        let req = next_request(&worker).await;

        // The error object is missing its message, so the envelope does not decode.
        let frame = json!({ "id": req.id.as_str(), "error": { "stack": "s" } });
        worker.send(frame.to_string().as_bytes()).await.unwrap();

        let err = tokio::time::timeout(Duration::from_secs(1), call)
            .await
            .expect("call never settled")
            .unwrap()
            .unwrap_err();
        let method_err = err.as_method_error().expect("method error");
        assert!(method_err.message().starts_with("malformed response:"), "got {}", method_err.message());
        assert_eq!(router.pending_count(), 0);
    }

    #[tokio::test]
    async fn test_new_rejects_id_length_out_of_range() {
        for len in [0, 1, MIN_ID_LENGTH - 1, MAX_ID_LENGTH + 1] {
            let (caller, _worker) = ChannelTransport::pair();
            let err = Router::new(Box::new(caller), len).err();
            assert_eq!(err, Some(config::Error::IdLengthOutOfRange(len)));
        }

        let (caller, _worker) = ChannelTransport::pair();
        assert!(Router::new(Box::new(caller), MIN_ID_LENGTH).is_ok());
    }

    /// Hands out each id twice in a row, so every other draw collides.
    fn stuttering_ids(length: usize) -> CorrelationId {
        use std::sync::atomic::AtomicUsize;
        use std::sync::atomic::Ordering;

        static DRAWS: AtomicUsize = AtomicUsize::new(0);
        let n = DRAWS.fetch_add(1, Ordering::Relaxed) / 2;
        CorrelationId::from(format!("{:0>width$}", n, width = length))
    }

    #[tokio::test]
    async fn test_colliding_ids_are_regenerated() {
        let (caller, worker) = ChannelTransport::pair();
        let router = Arc::new(Router::with_generator(Box::new(caller), 8, stuttering_ids));

        let calls: Vec<_> = (0..20)
            .map(|i| {
                let router = router.clone();
                tokio::spawn(async move { router.invoke("echo", vec![json!(i)]).await })
            })
            .collect();

        let mut requests = Vec::new();
        for _ in 0..20 {
            requests.push(next_request(&worker).await);
        }

        let ids: std::collections::HashSet<_> = requests.iter().map(|r| r.id.clone()).collect();
        assert_eq!(ids.len(), 20);
        assert_eq!(router.pending_count(), 20);

        for req in requests {
            let arg = req.args[0].clone();
            reply(&worker, &Response::success(req.id, arg)).await;
        }
        for (i, call) in calls.into_iter().enumerate() {
            assert_eq!(call.await.unwrap().unwrap(), json!(i));
        }
    }
}
