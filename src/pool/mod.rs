mod worker;

pub use self::worker::Worker;

use std::{
    any::Any,
    hash::{BuildHasher, RandomState},
    panic::AssertUnwindSafe,
    sync::Arc,
};

use futures::FutureExt;
use tokio::{runtime::Handle, task::JoinHandle};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, warn};

use crate::{EnqueueError, Identity, KeyFactory, PoolError, ShardedQueue, TakeError};

/// Runs one consumer task per lane of a [`ShardedQueue`], handing every item to a shared
/// [`Worker`].
///
/// Items that map to the same lane are processed one at a time in submission order: if `submit(a)`
/// completes before `submit(b)` is called and both land on the same lane, processing of `a`
/// finishes before processing of `b` starts. Lanes are processed concurrently.
///
/// A worker error or panic only affects the item being processed. It is logged and the lane carries
/// on with its next item.
///
/// Consumers stop when the pool is [shut down](Self::shutdown) or dropped. The pool should be the
/// only consumer of its queue.
pub struct ShardedWorkerPool<T, K = Identity, S = RandomState> {
    queue: Arc<ShardedQueue<T, K, S>>,
    consumers: Vec<JoinHandle<()>>,
    shutdown: CancellationToken,
}

impl<T, K, S> ShardedWorkerPool<T, K, S>
where
    T: Send + 'static,
    K: KeyFactory<T> + Send + Sync + 'static,
    S: BuildHasher + Send + Sync + 'static,
{
    /// Creates the queue with `queue_factory` and spawns one consumer per lane on the current Tokio
    /// runtime.
    ///
    /// Returns [`PoolError::NoRuntime`] if called outside a Tokio runtime.
    pub fn new<F, W>(queue_factory: F, worker: W) -> Result<Self, PoolError>
    where
        F: FnOnce() -> ShardedQueue<T, K, S>,
        W: Worker<T>,
    {
        let runtime = Handle::try_current()?;

        let queue = Arc::new(queue_factory());
        let worker = Arc::new(worker);
        let shutdown = CancellationToken::new();

        let consumers = (0..queue.shard_count())
            .map(|lane| {
                runtime.spawn(consume_lane(
                    lane,
                    queue.clone(),
                    worker.clone(),
                    shutdown.clone(),
                ))
            })
            .collect();

        debug!(
            shard_count = queue.shard_count(),
            buffer_size = queue.buffer_size(),
            "started sharded worker pool"
        );

        Ok(Self {
            queue,
            consumers,
            shutdown,
        })
    }

    /// Submits `item` for processing, waiting if its lane is full.
    ///
    /// See [`ShardedQueue::enqueue`] for the error cases.
    pub async fn submit(&self, item: T) -> Result<(), EnqueueError<T>> {
        self.queue.enqueue(item).await
    }

    /// Attempts to submit `item` without waiting.
    ///
    /// See [`ShardedQueue::try_enqueue`] for the error cases.
    pub fn try_submit(&self, item: T) -> Result<(), EnqueueError<T>> {
        self.queue.try_enqueue(item)
    }
}

impl<T, K, S> ShardedWorkerPool<T, K, S> {
    /// Number of lanes, and therefore of consumer tasks.
    pub fn shard_count(&self) -> usize {
        self.queue.shard_count()
    }

    /// Returns `true` once [`close`](Self::close), [`shutdown`](Self::shutdown) or drop has begun
    /// tearing the pool down.
    pub fn is_shut_down(&self) -> bool {
        self.shutdown.is_cancelled()
    }

    /// Stops the pool without waiting for its consumers.
    ///
    /// Producers waiting in [`submit`](Self::submit) are released with [`EnqueueError::Closed`] and
    /// later submissions fail the same way. Each consumer stops before taking its next item; an item
    /// that a worker is already processing is finished. Call [`shutdown`](Self::shutdown) afterwards
    /// to wait for the consumers to exit.
    pub fn close(&self) {
        self.begin_shutdown();
    }

    /// Stops every lane consumer and waits for them to exit.
    ///
    /// An item that a worker is already processing is finished; items still buffered are dropped.
    /// Every consumer is joined even if one of them fails; the first failure is returned.
    pub async fn shutdown(mut self) -> Result<(), PoolError> {
        self.begin_shutdown();

        let result = join_consumers(std::mem::take(&mut self.consumers)).await;

        let abandoned: usize = (0..self.queue.shard_count())
            .filter_map(|lane| self.queue.lane_len(lane))
            .sum();
        if abandoned > 0 {
            warn!(abandoned, "sharded worker pool shut down with unprocessed items");
        }

        debug!("sharded worker pool shut down");
        result
    }

    fn begin_shutdown(&self) {
        self.shutdown.cancel();
        self.queue.close();
    }
}

impl<T, K, S> Drop for ShardedWorkerPool<T, K, S> {
    fn drop(&mut self) {
        self.begin_shutdown();
    }
}

impl<T, K, S> std::fmt::Debug for ShardedWorkerPool<T, K, S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShardedWorkerPool")
            .field("queue", &self.queue)
            .field("shut_down", &self.shutdown.is_cancelled())
            .finish()
    }
}

/// Drains a single lane until `shutdown` fires or the queue is closed and empty.
async fn consume_lane<T, K, S, W>(
    lane: usize,
    queue: Arc<ShardedQueue<T, K, S>>,
    worker: Arc<W>,
    shutdown: CancellationToken,
) where
    W: Worker<T>,
{
    debug!(lane, "lane consumer started");

    loop {
        let item = tokio::select! {
            biased;
            _ = shutdown.cancelled() => break,
            item = queue.take_from_lane(lane) => match item {
                Ok(item) => item,
                Err(TakeError::Closed) => break,
                Err(err) => {
                    error!(lane, error = %err, "lane consumer cannot take items");
                    break;
                }
            },
        };

        // The call itself sits inside the guarded future so a worker that panics before returning
        // its future is caught as well.
        match AssertUnwindSafe(async { worker.process(item).await })
            .catch_unwind()
            .await
        {
            Ok(Ok(())) => {}
            Ok(Err(err)) => error!(lane, error = %err, "worker failed to process item"),
            Err(panic) => error!(lane, panic = panic_message(&*panic), "worker panicked while processing item"),
        }
    }

    debug!(lane, "lane consumer stopped");
}

/// Awaits every consumer, logging each failure, and returns the first one.
pub(crate) async fn join_consumers(consumers: Vec<JoinHandle<()>>) -> Result<(), PoolError> {
    let mut result = Ok(());
    for (lane, consumer) in consumers.into_iter().enumerate() {
        if let Err(source) = consumer.await {
            error!(lane, error = %source, "lane consumer failed");
            if result.is_ok() {
                result = Err(PoolError::Join { lane, source });
            }
        }
    }
    result
}

fn panic_message(panic: &(dyn Any + Send)) -> &str {
    if let Some(message) = panic.downcast_ref::<&str>() {
        message
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message
    } else {
        "unknown panic payload"
    }
}
