use std::future::Future;

use crate::BoxError;

/// Callback invoked by a [`ShardedWorkerPool`](crate::ShardedWorkerPool) for every submitted item.
///
/// A single worker is shared by all lane consumers, so `process` may run concurrently for items on
/// different lanes. Calls for items on the same lane never overlap.
///
/// Any `Fn(T) -> Fut` where `Fut` resolves to `Result<(), E>` and `E: Into<BoxError>` is a worker.
pub trait Worker<T>: Send + Sync + 'static {
    /// Processes a single item.
    ///
    /// An `Err` is logged by the pool and the lane moves on to its next item.
    fn process(&self, item: T) -> impl Future<Output = Result<(), BoxError>> + Send;
}

impl<T, F, Fut, E> Worker<T> for F
where
    T: Send,
    F: Fn(T) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), E>> + Send,
    E: Into<BoxError>,
{
    fn process(&self, item: T) -> impl Future<Output = Result<(), BoxError>> + Send {
        async move { self(item).await.map_err(Into::into) }
    }
}
