//! `orderflow`: drive the fulfillment pipeline from a JSON fixture and print
//! what happened as JSON.

mod fixture;
mod harness;

use std::io::Write;
use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};

use orderflow_infra::PipelineConfig;
use orderflow_infra::intake::IntakeShape;
use orderflow_observability::tracing::LogFormat;
use orderflow_sales::CompensationPolicy;

use crate::fixture::Fixture;
use crate::harness::ManifestFormat;

#[derive(Parser)]
#[command(name = "orderflow")]
#[command(about = "Run orders through the fulfillment pipeline")]
#[command(version = env!("CARGO_PKG_VERSION"))]
struct Cli {
    /// Human-readable logs instead of JSON (logs go to stderr)
    #[arg(long, global = true)]
    compact_logs: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Seed stores, submit the fixture's orders, drain, print a JSON report
    Run(RunArgs),

    /// Print the built-in demo fixture (a starting point for your own)
    Demo,
}

#[derive(clap::Args, Default)]
struct RunArgs {
    /// Fixture file with `products`, `inventory` and `orders`; the built-in demo if omitted
    #[arg(short, long)]
    fixture: Option<PathBuf>,

    /// Intake executor shape. `ring` keeps one core busy-spinning for the whole run, even when idle
    #[arg(long, value_enum)]
    shape: Option<Shape>,

    /// Channel bound, or ring size (power of two)
    #[arg(long)]
    capacity: Option<usize>,

    /// Fan-out worker threads
    #[arg(long)]
    fanout_workers: Option<usize>,

    /// What to do with partial work when an order fails midway
    #[arg(long, value_enum)]
    compensation: Option<Compensation>,

    /// Terminal order states kept for the report before the oldest are evicted
    #[arg(long)]
    lifecycle_retention: Option<usize>,

    /// Concurrent caller threads submitting orders
    #[arg(short, long, default_value_t = 1)]
    callers: usize,

    /// Manifest document format
    #[arg(long, value_enum, default_value_t = ManifestFormat::Json)]
    manifest_format: ManifestFormat,
}

#[derive(Debug, Clone, Copy, clap::ValueEnum)]
enum Shape {
    /// Bounded channel; the worker sleeps while idle
    Channel,
    /// Disruptor ring; lowest hand-off latency, busy-spins a core while idle
    Ring,
}

#[derive(Debug, Clone, Copy, clap::ValueEnum)]
enum Compensation {
    Rollback,
    None,
}

impl RunArgs {
    /// `ORDERFLOW_*` environment settings, overridden by explicit flags.
    fn config(&self) -> anyhow::Result<PipelineConfig> {
        let mut config = PipelineConfig::from_env().context("reading ORDERFLOW_* environment")?;
        if let Some(shape) = self.shape {
            config = config.with_intake_shape(match shape {
                Shape::Channel => IntakeShape::Channel,
                Shape::Ring => IntakeShape::Ring,
            });
        }
        if let Some(capacity) = self.capacity {
            config = config.with_intake_capacity(capacity);
        }
        if let Some(workers) = self.fanout_workers {
            config = config.with_fanout_workers(workers);
        }
        if let Some(policy) = self.compensation {
            config = config.with_compensation(match policy {
                Compensation::Rollback => CompensationPolicy::Rollback,
                Compensation::None => CompensationPolicy::None,
            });
        }
        if let Some(retention) = self.lifecycle_retention {
            config = config.with_lifecycle_retention(retention);
        }
        config.validate().context("invalid pipeline configuration")?;
        Ok(config)
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    orderflow_observability::tracing::init(if cli.compact_logs {
        LogFormat::Compact
    } else {
        LogFormat::Json
    });

    match cli.command.unwrap_or(Commands::Run(RunArgs::default())) {
        Commands::Run(args) => {
            let config = args.config()?;
            let fixture = match &args.fixture {
                Some(path) => Fixture::load(path)?,
                None => Fixture::demo(),
            };
            let report = harness::run(fixture, config, args.callers, args.manifest_format)?;
            print_json(&report)
        }
        Commands::Demo => print_json(&Fixture::demo()),
    }
}

fn print_json(value: &impl serde::Serialize) -> anyhow::Result<()> {
    let mut out = std::io::stdout().lock();
    serde_json::to_writer_pretty(&mut out, value).context("writing JSON to stdout")?;
    writeln!(out)?;
    Ok(())
}
