mod config;
mod output;

use anyhow::{anyhow, bail, Context, Result};
use clap::Parser;
use rankfuse_core::constants::{DEFAULT_MAX_RANK, DRAIN_TIMEOUT};
use rankfuse_core::{
    read_runs, AlgorithmKind, FusionScheduler, Normalisation, SchedulerConfig, WorkerPool,
};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::output::FuseReport;

#[derive(Parser)]
#[command(name = "rankfuse", version, about = "Fuse every combination of recommender runs per fold")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Subcommand)]
enum Commands {
    /// Fuse all combinations of the runs in a directory
    Fuse(FuseArgs),
    /// Create a default config file at ~/.config/rankfuse/config.toml
    Init,
}

#[derive(Parser)]
struct FuseArgs {
    /// Fusion algorithm (repeatable or comma separated):
    /// borda, condorcet, copeland, combSum, combANZ, combMNZ
    #[arg(long = "algorithm", value_delimiter = ',')]
    algorithms: Vec<String>,

    /// Directory with run-<name>-fold<N>.txt files
    #[arg(long)]
    runs: Option<PathBuf>,

    /// Directory the fused rankings are written to
    #[arg(long)]
    output: Option<PathBuf>,

    /// Score normalisation (repeatable or comma separated):
    /// none, standard, sum, zmuv, zmuv1, zmuv2
    #[arg(long = "normalisation", value_delimiter = ',')]
    normalisations: Vec<String>,

    /// Items kept per user when reading runs and in the output. Default: 100.
    #[arg(long, alias = "max_rank")]
    max_rank: Option<usize>,

    /// Worker threads. Default: one per core.
    #[arg(long)]
    threads: Option<usize>,

    /// Reclaim in-progress markers older than this many seconds.
    /// Default: never reclaim.
    #[arg(long)]
    stale_marker_secs: Option<u64>,

    /// Path to config file (default: ~/.config/rankfuse/config.toml)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Output JSON instead of table
    #[arg(long)]
    json: bool,

    /// Debug-level logging (RUST_LOG overrides)
    #[arg(short, long)]
    verbose: bool,
}

/// Everything `fuse` needs, after merging CLI args over the config file.
#[derive(Debug)]
struct FusePlan {
    runs_dir: PathBuf,
    output_dir: PathBuf,
    algorithms: Vec<AlgorithmKind>,
    normalisations: Vec<Normalisation>,
    max_rank: usize,
    threads: Option<usize>,
    stale_marker_age: Option<Duration>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Fuse(args) => run_fuse(args),
        Commands::Init => {
            let path = config::config_path()?;
            config::create_default_config(&path)?;
            println!("Created config at {}", path.display());
            println!("Edit it to set your default runs, output and algorithms.");
            Ok(())
        }
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

/// Parse names in order, dropping repeats.
fn parse_unique<T>(names: &[String]) -> Result<Vec<T>>
where
    T: std::str::FromStr + PartialEq,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    let mut parsed: Vec<T> = Vec::with_capacity(names.len());
    for name in names {
        let value: T = name.trim().parse()?;
        if !parsed.contains(&value) {
            parsed.push(value);
        }
    }
    Ok(parsed)
}

fn build_plan(args: &FuseArgs, cfg: config::RankfuseConfig, config_path: &Path) -> Result<FusePlan> {
    let missing = |what: &str, flag: &str| {
        anyhow!("No {what} specified. Pass {flag} or set it in {}", config_path.display())
    };

    let runs_dir = args.runs.clone().or(cfg.runs).ok_or_else(|| missing("runs directory", "--runs"))?;
    let output_dir = args.output.clone().or(cfg.output).ok_or_else(|| missing("output directory", "--output"))?;

    let algorithm_names = if args.algorithms.is_empty() { cfg.algorithms.unwrap_or_default() } else { args.algorithms.clone() };
    let normalisation_names = if args.normalisations.is_empty() { cfg.normalisations.unwrap_or_default() } else { args.normalisations.clone() };
    if algorithm_names.is_empty() {
        return Err(missing("algorithm", "--algorithm"));
    }
    if normalisation_names.is_empty() {
        return Err(missing("normalisation", "--normalisation"));
    }

    let max_rank = args.max_rank.or(cfg.max_rank).unwrap_or(DEFAULT_MAX_RANK);
    if max_rank == 0 {
        bail!("--max-rank must be at least 1");
    }

    Ok(FusePlan {
        runs_dir,
        output_dir,
        algorithms: parse_unique(&algorithm_names)?,
        normalisations: parse_unique(&normalisation_names)?,
        max_rank,
        threads: args.threads.or(cfg.threads),
        stale_marker_age: args.stale_marker_secs.or(cfg.stale_marker_secs).map(Duration::from_secs),
    })
}

fn run_fuse(args: FuseArgs) -> Result<()> {
    init_tracing(args.verbose);

    // Load config file, merge with CLI args (CLI wins)
    let config_path = match args.config.clone() {
        Some(path) => path,
        None => config::config_path()?,
    };
    let cfg = config::load_config(&config_path)?;
    let plan = build_plan(&args, cfg, &config_path)?;

    let pool = Arc::new(WorkerPool::new(plan.threads).context("Failed to start worker pool")?);
    let scheduler = FusionScheduler::new(
        Arc::clone(&pool),
        SchedulerConfig { max_rank: plan.max_rank, stale_marker_age: plan.stale_marker_age },
    );
    let summary = scheduler.summary();
    let start = Instant::now();

    info!(
        "Fusing runs from {} into {} with {} worker threads",
        plan.runs_dir.display(),
        plan.output_dir.display(),
        pool.threads(),
    );

    let mut folds_seen = BTreeSet::new();
    let mut runs_read = 0usize;
    let scheduled = (|| -> Result<()> {
        for &normalisation in &plan.normalisations {
            let folds = read_runs(&plan.runs_dir, plan.max_rank, normalisation)
                .with_context(|| format!("Failed to read runs from {}", plan.runs_dir.display()))?;
            if folds.is_empty() {
                warn!("No run files found in {}", plan.runs_dir.display());
            }
            runs_read += folds.values().map(Vec::len).sum::<usize>();
            folds_seen.extend(folds.keys().copied());

            for &algorithm in &plan.algorithms {
                for (&fold, runs) in &folds {
                    scheduler.schedule_fold(algorithm, fold, runs, &plan.output_dir)
                        .with_context(|| format!("Failed to schedule {algorithm} for fold {fold}"))?;
                }
            }
        }
        Ok(())
    })();

    // Jobs already queued finish even if scheduling stopped early, so no
    // marker is left half-written.
    drop(scheduler);
    let pool = Arc::try_unwrap(pool).map_err(|_| anyhow!("Worker pool is still shared"))?;
    let drained = pool.shutdown(DRAIN_TIMEOUT);
    scheduled?;
    if !drained {
        bail!("Timed out waiting for fusion jobs to finish");
    }

    let report = FuseReport {
        algorithms: plan.algorithms.iter().map(|a| a.name().to_string()).collect(),
        normalisations: plan.normalisations.iter().map(|n| n.name().to_string()).collect(),
        folds: folds_seen.len(),
        runs: runs_read,
        jobs: summary.snapshot(),
        elapsed_secs: start.elapsed().as_secs_f64(),
    };
    info!("Completed: {} computed, {} failed", report.jobs.computed, report.jobs.failed);

    if args.json {
        output::print_json(&report)?;
    } else {
        output::print_table(&report);
    }
    Ok(())
}
