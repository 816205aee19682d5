//! Fan-out/fan-in runner
//!
//! Registers an aggregator on a fresh context, starts a set of producers that
//! each collect a fixed number of values, and gathers the results. The three
//! [`Mode`]s exercise the unsynchronized aggregator, the concurrent aggregator
//! with OS threads and a blocking wait, and the concurrent aggregator with
//! tokio tasks and an async wait.

use std::time::Instant;

use eyre::{Context as _, Result, eyre};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::context::Context;
use crate::key::{ScopeKey, build_key};
use crate::{base, concurrent};

/// How producers are scheduled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// One producer after another into an unsynchronized aggregator
    Sequential,
    /// One OS thread per producer; the consumer blocks on the barrier
    Threads,
    /// One tokio task per producer; the consumer awaits the barrier
    #[default]
    Tasks,
}

impl std::fmt::Display for Mode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sequential => write!(f, "sequential"),
            Self::Threads => write!(f, "threads"),
            Self::Tasks => write!(f, "tasks"),
        }
    }
}

/// Parameters for one run
#[derive(Debug, Clone)]
pub struct FanoutOptions {
    pub producers: usize,
    pub values_per_producer: usize,
    pub segments: Vec<String>,
    pub mode: Mode,
}

impl Default for FanoutOptions {
    fn default() -> Self {
        Self {
            producers: crate::DEFAULT_PRODUCERS,
            values_per_producer: 1,
            segments: vec![crate::DEFAULT_SEGMENT.to_string()],
            mode: Mode::default(),
        }
    }
}

/// Outcome of a run
#[derive(Debug, Clone, Serialize)]
pub struct FanoutReport {
    pub key: ScopeKey,
    pub mode: Mode,
    pub producers: usize,
    pub values_per_producer: usize,
    /// Collected values, sorted
    pub values: Vec<u64>,
    pub elapsed_ms: u64,
}

impl FanoutReport {
    /// True when every producer delivered every value
    pub fn is_complete(&self) -> bool {
        self.values.len() == self.producers * self.values_per_producer
    }
}

/// Value produced by producer `producer` on step `step`
fn value_for(producer: usize, step: usize, per_producer: usize) -> u64 {
    (producer * per_producer + step) as u64
}

/// Run one fan-out/fan-in round
pub async fn run(options: &FanoutOptions) -> Result<FanoutReport> {
    debug!(?options, "fanout::run: called");
    let key = build_key(&options.segments);
    let started = Instant::now();

    let mut values = match options.mode {
        Mode::Sequential => run_sequential(options)?,
        Mode::Threads => run_threads(options).await?,
        Mode::Tasks => run_tasks(options).await?,
    };
    values.sort_unstable();

    let report = FanoutReport {
        key,
        mode: options.mode,
        producers: options.producers,
        values_per_producer: options.values_per_producer,
        values,
        elapsed_ms: u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
    };
    info!(
        key = %report.key,
        mode = %report.mode,
        collected = report.values.len(),
        elapsed_ms = report.elapsed_ms,
        "Fan-out complete"
    );
    Ok(report)
}

fn run_sequential(options: &FanoutOptions) -> Result<Vec<u64>> {
    let segments = &options.segments;
    let ctx = base::register::<u64>(&Context::background(), segments);

    for producer in 0..options.producers {
        for step in 0..options.values_per_producer {
            base::collect(&ctx, value_for(producer, step, options.values_per_producer), segments)?;
        }
    }

    Ok(base::aggregate::<u64>(&ctx, segments)?)
}

async fn run_threads(options: &FanoutOptions) -> Result<Vec<u64>> {
    let segments = options.segments.clone();
    let ctx = concurrent::register::<u64>(&Context::background(), &segments);
    let per_producer = options.values_per_producer;

    let mut handles = Vec::with_capacity(options.producers);
    for producer in 0..options.producers {
        let guard = concurrent::begin_producer::<u64>(&ctx, &segments)?;
        let segments = segments.clone();
        let handle = std::thread::Builder::new()
            .name(format!("producer-{producer}"))
            .spawn(move || -> Result<()> {
                for step in 0..per_producer {
                    concurrent::collect(guard.context(), value_for(producer, step, per_producer), &segments)?;
                }
                Ok(())
            })
            .context("Failed to spawn producer thread")?;
        handles.push(handle);
    }

    let values = tokio::task::spawn_blocking(move || concurrent::aggregate::<u64>(&ctx, &segments))
        .await
        .context("Consumer thread failed")??;

    for handle in handles {
        handle.join().map_err(|_| eyre!("Producer thread panicked"))??;
    }

    Ok(values)
}

async fn run_tasks(options: &FanoutOptions) -> Result<Vec<u64>> {
    let segments = &options.segments;
    let ctx = concurrent::register::<u64>(&Context::background(), segments);
    let per_producer = options.values_per_producer;

    let mut handles = Vec::with_capacity(options.producers);
    for producer in 0..options.producers {
        let guard = concurrent::begin_producer::<u64>(&ctx, segments)?;
        let segments = segments.clone();
        handles.push(tokio::spawn(async move {
            for step in 0..per_producer {
                concurrent::collect(guard.context(), value_for(producer, step, per_producer), &segments)?;
                tokio::task::yield_now().await;
            }
            Ok::<_, crate::AggregatorError>(())
        }));
    }

    let values = concurrent::aggregate_async::<u64>(&ctx, segments).await?;

    for handle in handles {
        handle.await.context("Producer task failed")??;
    }

    Ok(values)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn options(mode: Mode) -> FanoutOptions {
        FanoutOptions {
            producers: 6,
            values_per_producer: 3,
            segments: vec!["test".to_string(), mode.to_string()],
            mode,
        }
    }

    #[tokio::test]
    async fn test_every_mode_collects_every_value() {
        for mode in [Mode::Sequential, Mode::Threads, Mode::Tasks] {
            let report = run(&options(mode)).await.unwrap();
            assert!(report.is_complete(), "{mode} lost values");
            assert_eq!(report.values, (0..18).collect::<Vec<u64>>());
            assert_eq!(report.key, build_key(["test".to_string(), mode.to_string()]));
        }
    }

    #[tokio::test]
    async fn test_zero_producers_returns_empty() {
        let report = run(&FanoutOptions {
            producers: 0,
            ..FanoutOptions::default()
        })
        .await
        .unwrap();
        assert!(report.values.is_empty());
        assert!(report.is_complete());
    }

    #[test]
    fn test_value_for_is_unique_per_producer_step() {
        assert_eq!(value_for(0, 0, 3), 0);
        assert_eq!(value_for(1, 0, 3), 3);
        assert_eq!(value_for(2, 2, 3), 8);
    }
}
