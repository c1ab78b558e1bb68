//! A sharded queue and worker pool for Tokio that processes items with the same key in strict submission order.
//!
//! Items are routed to one of a fixed number of bounded FIFO lanes based on the hash of a key derived from each
//! item. Every lane is drained by exactly one consumer, so items sharing a key are processed one after another in the
//! order they were submitted, while items on different lanes are processed in parallel. This is useful for
//! per-entity event processing where global serialization is too slow but per-entity ordering must be preserved.
//!
//! # Key Features
//!
//! - **Deterministic routing**: Items with the same key always go to the same lane
//! - **Happens-before per key**: Processing of an item finishes before the next item on its lane starts
//! - **Backpressure**: Lanes are bounded; producers wait only when their own lane is full
//! - **Failure isolation**: A failing or panicking worker call affects only that item
//! - **Explicit teardown**: Consumers stop on [`ShardedWorkerPool::shutdown`] or when the pool is dropped
//!
//! # Worker Pool
//!
//! ```rust
//! use sharded_executor::{ShardedQueue, ShardedWorkerPool};
//!
//! #[derive(Debug)]
//! struct Event {
//!     account: u64,
//!     amount: i64,
//! }
//!
//! #[tokio::main]
//! async fn main() {
//!     // 8 lanes holding up to 64 events each, keyed by account
//!     let pool = ShardedWorkerPool::new(
//!         || ShardedQueue::with_key_factory(8, 64, |event: &Event| event.account).unwrap(),
//!         |event: Event| async move {
//!             // Events of one account are processed one at a time, in submission order
//!             println!("account {}: {}", event.account, event.amount);
//!             Ok::<_, std::io::Error>(())
//!         },
//!     )
//!     .unwrap();
//!
//!     for i in 0..100 {
//!         pool.submit(Event { account: i % 10, amount: i as i64 }).await.unwrap();
//!     }
//!
//!     pool.shutdown().await.unwrap();
//! }
//! ```
//!
//! # Sharded Queue
//!
//! The queue can also be drained directly, one consumer per lane:
//!
//! ```rust
//! use sharded_executor::ShardedQueue;
//!
//! #[tokio::main]
//! async fn main() {
//!     // Items are their own keys
//!     let queue = ShardedQueue::<u32>::new(4, 16).unwrap();
//!
//!     queue.enqueue(7).await.unwrap();
//!     queue.enqueue(7).await.unwrap();
//!
//!     let lane = queue.lane_index(&7).unwrap();
//!     assert_eq!(queue.take_from_lane(lane).await.unwrap(), 7);
//!     assert_eq!(queue.take_from_lane(lane).await.unwrap(), 7);
//! }
//! ```
//!
//! # Architecture
//!
//! 1. **Routing**: The queue computes `hash(key) % shard_count` with its [`KeyFactory`] and
//!    [`BuildHasher`](std::hash::BuildHasher)
//! 2. **Lanes**: Each lane is a bounded Tokio MPSC channel, independently synchronized
//! 3. **Consumers**: The pool spawns one task per lane that takes items and awaits the [`Worker`]
//!
//! # Performance Considerations
//!
//! - **Collisions**: Distinct keys sharing a lane are serialized with each other
//! - **Hot keys**: A busy key only slows down its own lane
//! - **Load distribution**: Hash distribution may not be perfectly even across lanes

mod error;
mod key;
mod pool;
mod queue;
mod util;


pub use self::{
    error::{BoxError, ConfigError, EnqueueError, KeyError, PoolError, TakeError},
    key::{Fallible, Identity, KeyFactory},
    pool::{ShardedWorkerPool, Worker},
    queue::ShardedQueue,
};
