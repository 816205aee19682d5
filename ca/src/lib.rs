//! ctxagg - fan-out/fan-in aggregation over a request-scoped context
//!
//! Several producers contribute values; one consumer later retrieves all of
//! them. Aggregators live inside a [`Context`], an immutable layered
//! key/value store passed down the call chain, under a [`ScopeKey`] derived
//! from caller-supplied segments.
//!
//! # Modules
//!
//! - [`key`] - scope key derivation
//! - [`context`] - the layered context store
//! - [`base`] - unsynchronized, single-writer aggregator
//! - [`concurrent`] - thread-safe aggregator with a completion barrier
//! - [`barrier`] - pending-producer counter and [`ProducerGuard`]
//! - [`fanout`] - runner used by the `ca` binary
//! - [`config`] - configuration types and loading
//! - [`cli`] - command-line interface
//!
//! # Example
//!
//! ```ignore
//! use ctxagg::{Context, concurrent};
//!
//! let ctx = concurrent::register::<u64>(&Context::background(), ["req1"]);
//! let guard = concurrent::begin_producer::<u64>(&ctx, ["req1"])?;
//! tokio::spawn(async move {
//!     concurrent::collect(guard.context(), 3u64, ["req1"])
//! });
//! let values = concurrent::aggregate_async::<u64>(&ctx, ["req1"]).await?;
//! ```

pub mod barrier;
pub mod base;
pub mod cli;
pub mod concurrent;
pub mod config;
pub mod context;
pub mod error;
pub mod fanout;
pub mod key;

pub use barrier::{CompletionBarrier, ProducerGuard};
pub use base::BaseAggregator;
pub use concurrent::ConcurrentAggregator;
pub use config::Config;
pub use context::{Context, Entry};
pub use error::{AggregatorError, AggregatorResult};
pub use fanout::{FanoutOptions, FanoutReport, Mode};
pub use key::{DEFAULT_SCOPE_KEY, SCOPE_SEPARATOR, ScopeKey, build_key};

/// Default number of producers started by the runner
pub const DEFAULT_PRODUCERS: usize = 4;

/// Default scope segment used by the runner
pub const DEFAULT_SEGMENT: &str = "run";
