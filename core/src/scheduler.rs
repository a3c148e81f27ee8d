//! Re-render request queue.
//!
//! State setters never render directly. They push a [`RerenderRequest`] onto an
//! unbounded channel; the runtime's scheduler loop ([`Runtime::run`](crate::Runtime::run))
//! consumes it and re-invokes the subscribed render for that target.

use async_channel::{Receiver, Sender, TryRecvError};

use crate::store::TargetId;

/// A request to run a full composition pass for one target.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RerenderRequest {
    target: TargetId,
}

impl RerenderRequest {
    /// Creates a request for `target`.
    #[must_use]
    pub const fn new(target: TargetId) -> Self {
        Self { target }
    }

    /// The target to re-render.
    #[must_use]
    pub const fn target(&self) -> &TargetId {
        &self.target
    }
}

#[derive(Debug)]
pub(crate) struct Scheduler {
    sender: Sender<RerenderRequest>,
    receiver: Receiver<RerenderRequest>,
    coalesce: bool,
}

impl Scheduler {
    pub(crate) fn new(coalesce: bool) -> Self {
        let (sender, receiver) = async_channel::unbounded();
        Self {
            sender,
            receiver,
            coalesce,
        }
    }

    pub(crate) fn sender(&self) -> Sender<RerenderRequest> {
        self.sender.clone()
    }

    pub(crate) fn close(&self) -> bool {
        self.receiver.close()
    }

    pub(crate) fn is_closed(&self) -> bool {
        self.receiver.is_closed()
    }

    /// Waits for the next batch of requests. `None` once the channel is closed.
    pub(crate) async fn next_batch(&self) -> Option<Vec<RerenderRequest>> {
        let first = self.receiver.recv().await.ok()?;
        Some(self.batch(first))
    }

    /// Takes the requests that are already queued, without waiting.
    pub(crate) fn ready_batch(&self) -> Option<Vec<RerenderRequest>> {
        match self.receiver.try_recv() {
            Ok(first) => Some(self.batch(first)),
            Err(TryRecvError::Empty | TryRecvError::Closed) => None,
        }
    }

    fn batch(&self, first: RerenderRequest) -> Vec<RerenderRequest> {
        if !self.coalesce {
            return vec![first];
        }
        let mut batch = vec![first];
        while let Ok(next) = self.receiver.try_recv() {
            if !batch.contains(&next) {
                batch.push(next);
            }
        }
        batch
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::executor::block_on;

    fn request(target: &str) -> RerenderRequest {
        RerenderRequest::new(target.into())
    }

    #[test]
    fn delivers_every_request_without_coalescing() {
        let scheduler = Scheduler::new(false);
        let sender = scheduler.sender();
        for target in ["a", "a", "b"] {
            sender.try_send(request(target)).unwrap();
        }

        let mut seen = Vec::new();
        while let Some(batch) = scheduler.ready_batch() {
            seen.extend(batch);
        }
        assert_eq!(seen, vec![request("a"), request("a"), request("b")]);
    }

    #[test]
    fn coalesces_duplicates_in_arrival_order() {
        let scheduler = Scheduler::new(true);
        let sender = scheduler.sender();
        for target in ["b", "a", "b", "a", "c"] {
            sender.try_send(request(target)).unwrap();
        }

        let batch = block_on(scheduler.next_batch()).unwrap();
        assert_eq!(batch, vec![request("b"), request("a"), request("c")]);
        assert!(scheduler.ready_batch().is_none());
    }

    #[test]
    fn closing_ends_the_stream() {
        let scheduler = Scheduler::new(false);
        assert!(scheduler.close());
        assert!(scheduler.is_closed());
        assert!(block_on(scheduler.next_batch()).is_none());
        assert!(scheduler.sender().try_send(request("a")).is_err());
    }
}
