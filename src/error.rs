/// Boxed error returned by fallible key factories and workers.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Error type for invalid [`ShardedQueue`](crate::ShardedQueue) construction arguments.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    /// The shard count must be at least one.
    #[error("shard count must be positive")]
    ZeroShardCount,

    /// The per-lane buffer size must be at least one.
    #[error("buffer size must be positive")]
    ZeroBufferSize,

    /// The per-lane buffer size exceeds what a lane can hold.
    #[error("buffer size {buffer_size} exceeds the maximum of {max}")]
    BufferSizeTooLarge { buffer_size: usize, max: usize },
}

/// Error returned when a [`KeyFactory`](crate::KeyFactory) fails to derive a key for an item.
#[derive(Debug, thiserror::Error)]
#[error("failed to derive key: {source}")]
pub struct KeyError {
    #[source]
    source: BoxError,
}

impl KeyError {
    /// Wraps the error returned by a key factory.
    pub fn new(source: impl Into<BoxError>) -> Self {
        Self {
            source: source.into(),
        }
    }
}

/// Error type for [`ShardedQueue::enqueue`](crate::ShardedQueue::enqueue) and
/// [`ShardedWorkerPool::submit`](crate::ShardedWorkerPool::submit) and their non-blocking variants.
///
/// Every variant hands the rejected item back.
#[derive(Debug, thiserror::Error)]
pub enum EnqueueError<T> {
    /// The key factory failed. The item was not enqueued into any lane.
    #[error("failed to compute lane for item")]
    KeyDerivation {
        item: T,
        #[source]
        source: KeyError,
    },

    /// The target lane is at capacity (non-blocking variants only).
    #[error("lane is full")]
    Full(T),

    /// The queue was closed before the item could be enqueued.
    #[error("queue closed")]
    Closed(T),
}

impl<T> EnqueueError<T> {
    /// Returns the item that could not be enqueued.
    pub fn into_inner(self) -> T {
        match self {
            EnqueueError::KeyDerivation { item, .. } => item,
            EnqueueError::Full(item) | EnqueueError::Closed(item) => item,
        }
    }
}

/// Error type for [`ShardedQueue::take_from_lane`](crate::ShardedQueue::take_from_lane) and
/// [`ShardedQueue::try_take_from_lane`](crate::ShardedQueue::try_take_from_lane).
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum TakeError {
    /// The lane index is not in `0..shard_count`.
    #[error("lane {lane} is out of range for {shard_count} shards")]
    LaneOutOfRange { lane: usize, shard_count: usize },

    /// The lane is empty (non-blocking variant only).
    #[error("lane is empty")]
    Empty,

    /// The queue is closed and the lane has been drained.
    #[error("queue closed")]
    Closed,
}

/// Error type for [`ShardedWorkerPool`](crate::ShardedWorkerPool) construction and shutdown.
#[derive(Debug, thiserror::Error)]
pub enum PoolError {
    /// The pool was constructed outside of a Tokio runtime.
    #[error("no tokio runtime available to spawn lane consumers")]
    NoRuntime(#[from] tokio::runtime::TryCurrentError),

    /// A lane consumer task could not be joined.
    #[error("consumer for lane {lane} failed")]
    Join {
        lane: usize,
        #[source]
        source: tokio::task::JoinError,
    },
}
