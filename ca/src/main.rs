use clap::Parser;
use colored::*;
use eyre::{Context, Result};
use tracing::{debug, info};

use ctxagg::cli::{Cli, Command};
use ctxagg::config::Config;
use ctxagg::{FanoutReport, build_key, fanout};

fn setup_logging(cli_log_level: Option<&str>, config_log_level: Option<&str>) -> Result<()> {
    // Priority: CLI --log-level > config file > default (INFO)
    let level = match cli_log_level.or(config_log_level).map(|s| s.to_uppercase()) {
        None => tracing::Level::INFO,
        Some(s) => match s.as_str() {
            "TRACE" => tracing::Level::TRACE,
            "DEBUG" => tracing::Level::DEBUG,
            "INFO" => tracing::Level::INFO,
            "WARN" | "WARNING" => tracing::Level::WARN,
            "ERROR" => tracing::Level::ERROR,
            _ => {
                eprintln!("Warning: Unknown log-level '{}', defaulting to INFO", s);
                tracing::Level::INFO
            }
        },
    };

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()))
        .try_init()
        .map_err(|e| eyre::eyre!("Failed to install subscriber: {}", e))?;

    debug!(?level, "Logging initialized");
    Ok(())
}

fn print_report(report: &FanoutReport) {
    let status = if report.is_complete() { "✓".green() } else { "✗".red() };
    println!(
        "{} {} {} producers × {} values ({}, {}ms)",
        status,
        report.key.to_string().cyan(),
        report.producers,
        report.values_per_producer,
        report.mode.to_string().yellow(),
        report.elapsed_ms.to_string().dimmed()
    );
    let values: Vec<String> = report.values.iter().map(|v| v.to_string()).collect();
    println!("[{}]", values.join(", "));
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = Config::load(cli.config.as_ref()).context("Failed to load configuration")?;

    setup_logging(cli.log_level.as_deref(), config.log_level.as_deref()).context("Failed to setup logging")?;
    info!("ca starting");

    match cli.command {
        Command::Key { segments } => {
            println!("{}", build_key(&segments));
        }
        Command::Run {
            segments,
            producers,
            values_per_producer,
            mode,
            json,
        } => {
            let mut options = config.fanout_options();
            if !segments.is_empty() {
                options.segments = segments;
            }
            if let Some(producers) = producers {
                options.producers = producers;
            }
            if let Some(values_per_producer) = values_per_producer {
                options.values_per_producer = values_per_producer;
            }
            if let Some(mode) = mode {
                options.mode = mode;
            }

            let report = fanout::run(&options).await.context("Fan-out run failed")?;
            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                print_report(&report);
            }
            if !report.is_complete() {
                eyre::bail!(
                    "Collected {} of {} values",
                    report.values.len(),
                    report.producers * report.values_per_producer
                );
            }
        }
    }

    Ok(())
}
