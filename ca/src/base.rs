//! Unsynchronized aggregator
//!
//! [`BaseAggregator`] is the single-writer variant: collects are expected to
//! come from one logical thread of control at a time. It never waits for a
//! lock. A call that overlaps another call on the same aggregator fails with
//! [`AggregatorError::Contended`] rather than blocking, so a missing external
//! synchronization shows up as an error instead of a silent race. Use
//! [`crate::concurrent`] when producers run in parallel.
//!
//! ```ignore
//! let ctx = base::register::<i32>(&Context::background(), ["req1"]);
//! base::collect(&ctx, 3, ["req1"])?;
//! base::collect(&ctx, 5, ["req1"])?;
//! assert_eq!(base::aggregate::<i32>(&ctx, ["req1"])?, vec![3, 5]);
//! ```

use parking_lot::Mutex;
use tracing::debug;

use crate::context::Context;
use crate::error::{AggregatorError, AggregatorResult};
use crate::key::{ScopeKey, build_key};

/// Ordered, append-only collection bound to one scope key
#[derive(Debug)]
pub struct BaseAggregator<T> {
    key: ScopeKey,
    items: Mutex<Vec<T>>,
}

impl<T> BaseAggregator<T> {
    fn new(key: ScopeKey) -> Self {
        Self {
            key,
            items: Mutex::new(Vec::new()),
        }
    }

    pub fn key(&self) -> &ScopeKey {
        &self.key
    }

    /// Append a value
    pub fn collect(&self, value: T) -> AggregatorResult<()> {
        let mut items = self.items.try_lock().ok_or_else(|| self.contended())?;
        items.push(value);
        Ok(())
    }

    /// Ordered copy of everything collected so far
    pub fn snapshot(&self) -> AggregatorResult<Vec<T>>
    where
        T: Clone,
    {
        let items = self.items.try_lock().ok_or_else(|| self.contended())?;
        Ok(items.clone())
    }

    pub fn len(&self) -> AggregatorResult<usize> {
        let items = self.items.try_lock().ok_or_else(|| self.contended())?;
        Ok(items.len())
    }

    pub fn is_empty(&self) -> AggregatorResult<bool> {
        Ok(self.len()? == 0)
    }

    fn contended(&self) -> AggregatorError {
        debug!(key = %self.key, "BaseAggregator: overlapping access rejected");
        AggregatorError::Contended { key: self.key.clone() }
    }
}

/// Register an empty aggregator for `T` and return the child context carrying it
pub fn register<T>(ctx: &Context, segments: impl IntoIterator<Item = impl AsRef<str>>) -> Context
where
    T: Send + 'static,
{
    let key = build_key(segments);
    debug!(%key, "base::register: called");
    ctx.with_value(key.clone(), BaseAggregator::<T>::new(key))
}

/// Append `value` to the aggregator registered under `segments`
pub fn collect<T>(ctx: &Context, value: T, segments: impl IntoIterator<Item = impl AsRef<str>>) -> AggregatorResult<()>
where
    T: Send + 'static,
{
    let key = build_key(segments);
    debug!(%key, "base::collect: called");
    ctx.get::<BaseAggregator<T>>(&key)?.collect(value)
}

/// Everything collected under `segments`, in call order
///
/// Non-destructive: later collects stay legal and show up in the next call.
pub fn aggregate<T>(ctx: &Context, segments: impl IntoIterator<Item = impl AsRef<str>>) -> AggregatorResult<Vec<T>>
where
    T: Clone + Send + 'static,
{
    let key = build_key(segments);
    debug!(%key, "base::aggregate: called");
    ctx.get::<BaseAggregator<T>>(&key)?.snapshot()
}

/// Number of values collected under `segments`
pub fn len<T>(ctx: &Context, segments: impl IntoIterator<Item = impl AsRef<str>>) -> AggregatorResult<usize>
where
    T: Send + 'static,
{
    let key = build_key(segments);
    ctx.get::<BaseAggregator<T>>(&key)?.len()
}
