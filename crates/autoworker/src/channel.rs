//! # In-Memory Channel
//!
//! The default link between a caller and its worker: two unbounded tokio mpsc
//! queues, one per direction. Payloads are copied, so the two ends share nothing
//! but the queues themselves.

use tokio::sync::Mutex;
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::sync::mpsc::UnboundedSender;
use tokio::sync::mpsc::unbounded_channel;

use crate::transport;
use crate::transport::Transport;

/// One end of a duplex in-memory channel.
///
/// Frames sent on one end arrive on the other end's `recv()`. Dropping an end
/// closes the direction it sends on. `recv` takes `&self`, so the inbound
/// queue sits behind an async lock; only the pump ever holds it.
pub struct ChannelTransport {
    outbound: UnboundedSender<Vec<u8>>,
    inbound: Mutex<UnboundedReceiver<Vec<u8>>>,
}

impl ChannelTransport {
    /// Creates two ends wired to each other: caller and worker.
    pub fn pair() -> (Self, Self) {
        let (to_worker, from_caller) = unbounded_channel();
        let (to_caller, from_worker) = unbounded_channel();

        let caller = Self::new(to_worker, from_worker);
        let worker = Self::new(to_caller, from_caller);
        (caller, worker)
    }

    fn new(outbound: UnboundedSender<Vec<u8>>, inbound: UnboundedReceiver<Vec<u8>>) -> Self {
        Self {
            outbound,
            inbound: Mutex::new(inbound),
        }
    }
}

#[async_trait::async_trait]
impl Transport for ChannelTransport {
    async fn send(&self, payload: &[u8]) -> transport::Result<()> {
        self.outbound
            .send(payload.to_vec())
            .map_err(|_| transport::Error::ConnectionLost("peer end dropped".into()))
    }

    async fn recv(&self) -> transport::Result<Option<Vec<u8>>> {
        Ok(self.inbound.lock().await.recv().await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_pair_is_duplex() {
        let (a, b) = ChannelTransport::pair();

        a.send(b"ping").await.unwrap();
        assert_eq!(b.recv().await.unwrap().as_deref(), Some(&b"ping"[..]));

        b.send(b"pong").await.unwrap();
        assert_eq!(a.recv().await.unwrap().as_deref(), Some(&b"pong"[..]));
    }

    #[tokio::test]
    async fn test_dropping_one_end_closes_the_other() {
        let (a, b) = ChannelTransport::pair();
        drop(a);

        assert_eq!(b.recv().await.unwrap(), None);
        let err = b.send(b"late").await.unwrap_err();
        assert!(matches!(err, transport::Error::ConnectionLost(_)));
    }
}
