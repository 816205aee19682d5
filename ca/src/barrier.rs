//! Completion barrier - counts outstanding producers
//!
//! Producers enter the barrier with [`CompletionBarrier::enter`] and leave it
//! when the returned [`ProducerGuard`] is dropped or ended. The only way to
//! decrement is through a guard, so every increment is paired with exactly one
//! decrement, including on early return and unwinding.
//!
//! Consumers wait for the count to reach zero either by blocking a thread
//! ([`CompletionBarrier::wait`]) or by awaiting ([`CompletionBarrier::wait_async`]).

use std::sync::Arc;

use parking_lot::{Condvar, Mutex};
use tokio::sync::Notify;
use tracing::{debug, warn};

use crate::context::Context;
use crate::key::ScopeKey;

/// Pending-producer counter with blocking and async waiters
#[derive(Debug, Default)]
pub struct CompletionBarrier {
    pending: Mutex<usize>,
    cleared: Condvar,
    cleared_async: Notify,
}

impl CompletionBarrier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of producers that have entered and not yet left
    pub fn pending(&self) -> usize {
        *self.pending.lock()
    }

    /// Register one producer and return the guard that will release it
    pub fn enter(self: &Arc<Self>, key: ScopeKey, ctx: Context) -> ProducerGuard {
        let mut pending = self.pending.lock();
        *pending += 1;
        debug!(%key, pending = *pending, "CompletionBarrier::enter: called");
        ProducerGuard {
            barrier: Arc::clone(self),
            key,
            ctx,
        }
    }

    fn leave(&self, key: &ScopeKey) {
        let mut pending = self.pending.lock();
        if *pending == 0 {
            warn!(%key, "CompletionBarrier::leave: no producer pending, ignoring");
            return;
        }
        *pending -= 1;
        debug!(%key, pending = *pending, "CompletionBarrier::leave: called");
        if *pending == 0 {
            drop(pending);
            self.cleared.notify_all();
            self.cleared_async.notify_waiters();
        }
    }

    /// Block the calling thread until no producer is pending
    pub fn wait(&self) {
        let mut pending = self.pending.lock();
        while *pending > 0 {
            self.cleared.wait(&mut pending);
        }
    }

    /// Await until no producer is pending
    pub async fn wait_async(&self) {
        loop {
            let notified = self.cleared_async.notified();
            tokio::pin!(notified);
            // Register interest before checking so a release in between is not missed
            notified.as_mut().enable();
            if self.pending() == 0 {
                return;
            }
            notified.await;
        }
    }
}

/// Handle held by a running producer
///
/// Dropping the guard, or calling [`ProducerGuard::end`], leaves the barrier
/// exactly once. The guard also carries the context the producer was started
/// with, so it can be moved into a task as the producer's only handle.
#[must_use = "dropping the guard ends the producer immediately"]
#[derive(Debug)]
pub struct ProducerGuard {
    barrier: Arc<CompletionBarrier>,
    key: ScopeKey,
    ctx: Context,
}

impl ProducerGuard {
    /// Context carrying the aggregator this producer feeds
    pub fn context(&self) -> &Context {
        &self.ctx
    }

    pub fn key(&self) -> &ScopeKey {
        &self.key
    }

    /// End this producer now
    pub fn end(self) {}
}

impl Drop for ProducerGuard {
    fn drop(&mut self) {
        self.barrier.leave(&self.key);
    }
}
