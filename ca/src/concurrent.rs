//! Concurrent aggregator - mutex-guarded collection plus a completion barrier
//!
//! Producers running on other threads or tasks call [`begin_producer`] before
//! starting work the consumer should wait for, and keep the returned
//! [`ProducerGuard`] alive until they are done. [`aggregate`] blocks (or
//! [`aggregate_async`] awaits) until every guard has been released, then
//! returns the collected values. Values from different producers arrive in no
//! particular order.
//!
//! ```ignore
//! let ctx = concurrent::register::<u32>(&Context::background(), ["req"]);
//! for i in 0..4u32 {
//!     let guard = concurrent::begin_producer::<u32>(&ctx, ["req"])?;
//!     std::thread::spawn(move || concurrent::collect(guard.context(), i, ["req"]));
//! }
//! let values = concurrent::aggregate::<u32>(&ctx, ["req"])?;
//! ```

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::oneshot;
use tracing::debug;

use crate::barrier::{CompletionBarrier, ProducerGuard};
use crate::context::Context;
use crate::error::{AggregatorError, AggregatorResult};
use crate::key::{ScopeKey, build_key};

/// Thread-safe collection bound to one scope key, with a completion barrier
#[derive(Debug)]
pub struct ConcurrentAggregator<T> {
    key: ScopeKey,
    items: Mutex<Vec<T>>,
    barrier: Arc<CompletionBarrier>,
}

impl<T> ConcurrentAggregator<T> {
    fn new(key: ScopeKey) -> Self {
        Self {
            key,
            items: Mutex::new(Vec::new()),
            barrier: Arc::new(CompletionBarrier::new()),
        }
    }

    pub fn key(&self) -> &ScopeKey {
        &self.key
    }

    /// Append a value; safe from any number of threads
    pub fn collect(&self, value: T) {
        self.items.lock().push(value);
    }

    /// Copy of everything collected so far, without waiting on the barrier
    pub fn snapshot(&self) -> Vec<T>
    where
        T: Clone,
    {
        self.items.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.items.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of producers that have begun and not yet ended
    pub fn pending(&self) -> usize {
        self.barrier.pending()
    }
}

fn lookup<T: Send + 'static>(ctx: &Context, key: &ScopeKey) -> AggregatorResult<Arc<ConcurrentAggregator<T>>> {
    ctx.get::<ConcurrentAggregator<T>>(key)
}

/// Register an empty concurrent aggregator for `T` and return the child context carrying it
pub fn register<T>(ctx: &Context, segments: impl IntoIterator<Item = impl AsRef<str>>) -> Context
where
    T: Send + 'static,
{
    let key = build_key(segments);
    debug!(%key, "concurrent::register: called");
    ctx.with_value(key.clone(), ConcurrentAggregator::<T>::new(key))
}

/// Append `value` to the aggregator registered under `segments`
///
/// Does not touch the completion barrier.
pub fn collect<T>(ctx: &Context, value: T, segments: impl IntoIterator<Item = impl AsRef<str>>) -> AggregatorResult<()>
where
    T: Send + 'static,
{
    let key = build_key(segments);
    debug!(%key, "concurrent::collect: called");
    lookup::<T>(ctx, &key)?.collect(value);
    Ok(())
}

/// Start a producer the consumer should wait for
///
/// The returned guard ends the producer when dropped. It carries a clone of
/// `ctx`, so it can be moved into the producer's thread or task on its own.
pub fn begin_producer<T>(
    ctx: &Context,
    segments: impl IntoIterator<Item = impl AsRef<str>>,
) -> AggregatorResult<ProducerGuard>
where
    T: Send + 'static,
{
    let key = build_key(segments);
    debug!(%key, "concurrent::begin_producer: called");
    let aggregator = lookup::<T>(ctx, &key)?;
    Ok(aggregator.barrier.enter(key, ctx.clone()))
}

/// Block the calling thread until every producer has ended, then return the values
///
/// Returns immediately when no producer is pending. Must not be called from
/// inside an async runtime worker; use [`aggregate_async`] there.
pub fn aggregate<T>(ctx: &Context, segments: impl IntoIterator<Item = impl AsRef<str>>) -> AggregatorResult<Vec<T>>
where
    T: Clone + Send + 'static,
{
    let key = build_key(segments);
    let aggregator = lookup::<T>(ctx, &key)?;
    debug!(%key, pending = aggregator.pending(), "concurrent::aggregate: called");
    aggregator.barrier.wait();
    Ok(aggregator.snapshot())
}

/// Await until every producer has ended, then return the values
pub async fn aggregate_async<T>(
    ctx: &Context,
    segments: impl IntoIterator<Item = impl AsRef<str>>,
) -> AggregatorResult<Vec<T>>
where
    T: Clone + Send + 'static,
{
    let key = build_key(segments);
    let aggregator = lookup::<T>(ctx, &key)?;
    debug!(%key, pending = aggregator.pending(), "concurrent::aggregate_async: called");
    aggregator.barrier.wait_async().await;
    Ok(aggregator.snapshot())
}

/// Number of producers pending under `segments`
pub fn pending<T>(ctx: &Context, segments: impl IntoIterator<Item = impl AsRef<str>>) -> AggregatorResult<usize>
where
    T: Send + 'static,
{
    let key = build_key(segments);
    Ok(lookup::<T>(ctx, &key)?.pending())
}

/// Future returned by [`collect_from`]
pub type CollectFrom = Pin<Box<dyn Future<Output = AggregatorResult<()>> + Send>>;

/// Act as a producer fed by a channel
///
/// The producer is counted as soon as this returns, before the future is
/// first polled, so a consumer that starts waiting right after spawning it
/// still waits for the value. The future holds the producer guard while
/// waiting for one value from `rx`, then collects it. If the sender is
/// dropped without sending, the guard is still released and
/// [`AggregatorError::ProducerDropped`] is returned.
pub fn collect_from<T>(
    ctx: &Context,
    rx: oneshot::Receiver<T>,
    segments: impl IntoIterator<Item = impl AsRef<str>>,
) -> AggregatorResult<CollectFrom>
where
    T: Send + 'static,
{
    let key = build_key(segments);
    debug!(%key, "concurrent::collect_from: called");
    let aggregator = lookup::<T>(ctx, &key)?;
    let guard = aggregator.barrier.enter(key, ctx.clone());

    Ok(Box::pin(async move {
        let value = rx.await.map_err(|_| AggregatorError::ProducerDropped {
            key: guard.key().clone(),
        })?;
        aggregator.collect(value);
        drop(guard);
        Ok(())
    }))
}
