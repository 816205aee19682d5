//! CLI argument parsing for ca

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::fanout::Mode;

#[derive(Parser, Debug)]
#[command(name = "ca")]
#[command(author, version, about = "Fan-out/fan-in aggregation over a request-scoped context", long_about = None)]
pub struct Cli {
    /// Path to config file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error); overrides the config file
    #[arg(long)]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Print the scope key built from the given segments
    Key {
        /// Scope segments, in order
        segments: Vec<String>,
    },

    /// Start producers, collect their values and print the aggregate
    Run {
        /// Scope segments (default from config)
        segments: Vec<String>,

        /// Number of producers
        #[arg(short, long)]
        producers: Option<usize>,

        /// Values collected by each producer
        #[arg(short = 'n', long)]
        values_per_producer: Option<usize>,

        /// Producer scheduling
        #[arg(short, long, value_enum)]
        mode: Option<Mode>,

        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },
}
