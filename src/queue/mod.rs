mod lane;

use std::hash::{BuildHasher, Hash, RandomState};

use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use self::lane::Lane;
use crate::{ConfigError, EnqueueError, Identity, KeyError, KeyFactory, TakeError, util::compute_lane};

/// A bounded queue split into a fixed number of independent FIFO lanes.
///
/// Every item is routed to the lane `hash(key) % shard_count`, where the key is derived by the
/// queue's [`KeyFactory`]. Items whose keys map to the same lane are delivered in the order they
/// were enqueued; items on different lanes are unordered relative to each other. Distinct keys that
/// collide on a lane simply share that lane's ordering.
///
/// Each lane holds at most `buffer_size` items. A producer targeting a full lane waits for that
/// lane only; producers targeting other lanes are unaffected.
///
/// Each lane is meant to be drained by exactly one consumer, typically a
/// [`ShardedWorkerPool`](crate::ShardedWorkerPool).
pub struct ShardedQueue<T, K = Identity, S = RandomState> {
    lanes: Vec<Lane<T>>,
    buffer_size: usize,
    key_factory: K,
    build_hasher: S,
    closed: CancellationToken,
}

impl<T> ShardedQueue<T>
where
    T: Hash,
{
    /// Creates a queue where every item is its own key, hashed with the default hasher
    /// ([`RandomState`]).
    pub fn new(shard_count: usize, buffer_size: usize) -> Result<Self, ConfigError> {
        Self::with_hasher(shard_count, buffer_size, Identity, RandomState::new())
    }
}

impl<T, K> ShardedQueue<T, K>
where
    K: KeyFactory<T>,
{
    /// Creates a queue that routes items by the key produced by `key_factory`, hashed with the
    /// default hasher ([`RandomState`]).
    pub fn with_key_factory(shard_count: usize, buffer_size: usize, key_factory: K) -> Result<Self, ConfigError> {
        Self::with_hasher(shard_count, buffer_size, key_factory, RandomState::new())
    }
}

impl<T, K, S> ShardedQueue<T, K, S>
where
    K: KeyFactory<T>,
    S: BuildHasher,
{
    /// Creates a queue that routes items by the key produced by `key_factory`, hashed with a
    /// [`BuildHasher`].
    ///
    /// Returns an error if `shard_count` or `buffer_size` is zero, or if `buffer_size` is larger than
    /// a lane can hold.
    pub fn with_hasher(
        shard_count: usize,
        buffer_size: usize,
        key_factory: K,
        build_hasher: S,
    ) -> Result<Self, ConfigError> {
        if shard_count == 0 {
            return Err(ConfigError::ZeroShardCount);
        }
        if buffer_size == 0 {
            return Err(ConfigError::ZeroBufferSize);
        }
        if buffer_size > Semaphore::MAX_PERMITS {
            return Err(ConfigError::BufferSizeTooLarge {
                buffer_size,
                max: Semaphore::MAX_PERMITS,
            });
        }

        let lanes = (0..shard_count).map(|_| Lane::new(buffer_size)).collect();

        Ok(Self {
            lanes,
            buffer_size,
            key_factory,
            build_hasher,
            closed: CancellationToken::new(),
        })
    }

    /// Returns the lane `item` is routed to.
    ///
    /// Fails only if the key factory fails.
    pub fn lane_index(&self, item: &T) -> Result<usize, KeyError> {
        compute_lane(item, self.lanes.len(), &self.key_factory, &self.build_hasher)
    }

    /// Appends `item` to the tail of its lane.
    ///
    /// If the lane is at capacity, this waits until the lane's consumer removes an item. If the key
    /// factory fails, or the queue is (or becomes) closed, the item is returned inside the error and
    /// nothing is enqueued.
    ///
    /// # Cancel safety
    ///
    /// This method is cancel safe. If it is dropped before completing, the item was not enqueued.
    pub async fn enqueue(&self, item: T) -> Result<(), EnqueueError<T>> {
        let lane = match self.lane_index(&item) {
            Ok(lane) => lane,
            Err(source) => return Err(EnqueueError::KeyDerivation { item, source }),
        };

        self.lanes[lane].push(item, &self.closed).await
    }

    /// Attempts to append `item` to its lane without waiting.
    ///
    /// Returns [`EnqueueError::Full`] if the lane is at capacity.
    pub fn try_enqueue(&self, item: T) -> Result<(), EnqueueError<T>> {
        let lane = match self.lane_index(&item) {
            Ok(lane) => lane,
            Err(source) => return Err(EnqueueError::KeyDerivation { item, source }),
        };

        self.lanes[lane].try_push(item, &self.closed)
    }
}

impl<T, K, S> ShardedQueue<T, K, S> {
    /// Number of lanes.
    pub fn shard_count(&self) -> usize {
        self.lanes.len()
    }

    /// Capacity of each lane.
    pub fn buffer_size(&self) -> usize {
        self.buffer_size
    }

    /// Removes and returns the oldest item of `lane`, waiting until one is available.
    ///
    /// Each lane should have a single consumer; ordering is only guaranteed to that consumer.
    ///
    /// Returns [`TakeError::LaneOutOfRange`] if `lane` is not below [`shard_count`](Self::shard_count).
    /// After [`close`](Self::close), buffered items are still returned; once the lane is empty this
    /// returns [`TakeError::Closed`].
    ///
    /// # Cancel safety
    ///
    /// This method is cancel safe. If it is dropped before completing, no item was removed.
    pub async fn take_from_lane(&self, lane: usize) -> Result<T, TakeError> {
        self.lane(lane)?.pop(&self.closed).await
    }

    /// Attempts to remove the oldest item of `lane` without waiting.
    ///
    /// Returns [`TakeError::Empty`] if nothing is available.
    pub fn try_take_from_lane(&self, lane: usize) -> Result<T, TakeError> {
        self.lane(lane)?.try_pop(&self.closed)
    }

    /// Number of items currently buffered in `lane`, or `None` if the lane does not exist.
    pub fn lane_len(&self, lane: usize) -> Option<usize> {
        self.lanes.get(lane).map(Lane::len)
    }

    /// Closes the queue.
    ///
    /// Pending and future enqueues fail with [`EnqueueError::Closed`]. Consumers can still drain
    /// what is already buffered.
    pub fn close(&self) {
        if !self.closed.is_cancelled() {
            debug!(shard_count = self.lanes.len(), "closing sharded queue");
            self.closed.cancel();
        }
    }

    /// Returns `true` once [`close`](Self::close) has been called.
    pub fn is_closed(&self) -> bool {
        self.closed.is_cancelled()
    }

    fn lane(&self, lane: usize) -> Result<&Lane<T>, TakeError> {
        self.lanes.get(lane).ok_or(TakeError::LaneOutOfRange {
            lane,
            shard_count: self.lanes.len(),
        })
    }
}

impl<T, K, S> std::fmt::Debug for ShardedQueue<T, K, S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShardedQueue")
            .field("shard_count", &self.lanes.len())
            .field("buffer_size", &self.buffer_size)
            .field("closed", &self.closed.is_cancelled())
            .finish()
    }
}
