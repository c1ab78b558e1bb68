use tokio::sync::{
    Mutex,
    mpsc::{self, error::TryRecvError, error::TrySendError},
};
use tokio_util::sync::CancellationToken;

use crate::{EnqueueError, TakeError};

/// A single bounded FIFO buffer of a [`ShardedQueue`](crate::ShardedQueue).
///
/// Many producers push through the shared sender. The receiver sits behind an async mutex so the
/// lane can be drained through `&self`; with one consumer per lane the mutex is never contended.
pub(crate) struct Lane<T> {
    sender: mpsc::Sender<T>,
    receiver: Mutex<mpsc::Receiver<T>>,
}

impl<T> Lane<T> {
    pub(crate) fn new(capacity: usize) -> Self {
        let (sender, receiver) = mpsc::channel(capacity);
        Self {
            sender,
            receiver: Mutex::new(receiver),
        }
    }

    /// Appends `item` to the lane, waiting for a free slot if the lane is full.
    ///
    /// A slot is reserved before the item is handed over, so if `closed` fires while waiting the
    /// item is returned instead of being lost.
    pub(crate) async fn push(&self, item: T, closed: &CancellationToken) -> Result<(), EnqueueError<T>> {
        if closed.is_cancelled() {
            return Err(EnqueueError::Closed(item));
        }

        let permit = tokio::select! {
            biased;
            _ = closed.cancelled() => return Err(EnqueueError::Closed(item)),
            permit = self.sender.reserve() => permit,
        };

        match permit {
            Ok(permit) => {
                permit.send(item);
                Ok(())
            }
            Err(_) => Err(EnqueueError::Closed(item)),
        }
    }

    pub(crate) fn try_push(&self, item: T, closed: &CancellationToken) -> Result<(), EnqueueError<T>> {
        if closed.is_cancelled() {
            return Err(EnqueueError::Closed(item));
        }

        self.sender.try_send(item).map_err(|err| match err {
            TrySendError::Full(item) => EnqueueError::Full(item),
            TrySendError::Closed(item) => EnqueueError::Closed(item),
        })
    }

    /// Removes the oldest item, waiting until one is available.
    ///
    /// Once `closed` fires, whatever is still buffered keeps being returned until the lane is
    /// empty, after which [`TakeError::Closed`] is returned.
    pub(crate) async fn pop(&self, closed: &CancellationToken) -> Result<T, TakeError> {
        let mut receiver = self.receiver.lock().await;

        tokio::select! {
            biased;
            item = receiver.recv() => item.ok_or(TakeError::Closed),
            _ = closed.cancelled() => receiver.try_recv().map_err(|_| TakeError::Closed),
        }
    }

    pub(crate) fn try_pop(&self, closed: &CancellationToken) -> Result<T, TakeError> {
        // Another caller holding the receiver is treated as "nothing available right now".
        let Ok(mut receiver) = self.receiver.try_lock() else {
            return Err(TakeError::Empty);
        };

        receiver.try_recv().map_err(|err| match err {
            TryRecvError::Empty if closed.is_cancelled() => TakeError::Closed,
            TryRecvError::Empty => TakeError::Empty,
            TryRecvError::Disconnected => TakeError::Closed,
        })
    }

    /// Number of occupied slots, including slots reserved by producers that are about to send.
    pub(crate) fn len(&self) -> usize {
        self.sender.max_capacity() - self.sender.capacity()
    }
}
