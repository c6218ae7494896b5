/// Fusion job scheduling and execution.
///
/// One job fuses one combination of a fold's runs with one algorithm and
/// writes one output file. The output directory is the only coordination
/// between jobs and between processes:
///
/// - a finished combination is a `<key>.txt` file, so finished work is skipped;
/// - a claimed combination is a `<key>.tmp` marker created exclusively, so
///   concurrent workers never compute the same combination twice;
/// - output is written to the marker and renamed into place, so a reader never
///   sees a partial file.
///
/// A process that dies mid-job leaves its marker behind. Markers older than
/// `SchedulerConfig::stale_marker_age` are reclaimed; without an age they
/// block the combination until removed by hand.
use std::collections::{BTreeSet, HashSet};
use std::fs::{self, File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use tracing::{debug, error, info, warn};

use crate::accumulator::RankingAccumulator;
use crate::algorithms::{candidate_items, AlgorithmKind, FusionAlgorithm};
use crate::combination::{all_combinations, binomial};
use crate::constants::{DEFAULT_MAX_RANK, MARKER_EXTENSION, NAME_SEPARATOR, OUTPUT_EXTENSION};
use crate::error::{RankFuseError, Result};
use crate::normalisation::Normalisation;
use crate::pool::WorkerPool;
use crate::run::Run;
use crate::types::{JobOutcome, JobSummary, UserId};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchedulerConfig {
    /// Entries kept per fused user ranking.
    pub max_rank: usize,
    /// Markers whose mtime is at least this old are treated as abandoned.
    pub stale_marker_age: Option<Duration>,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        SchedulerConfig {
            max_rank: DEFAULT_MAX_RANK,
            stale_marker_age: None,
        }
    }
}

/// `<algorithm>-<normalisation>-n<k>-<run1>-...-<runk>-fold<fold>.txt`,
/// run names in lexicographic order.
pub fn output_filename(algorithm: &str, normalisation: Normalisation, runs: &[Arc<Run>], fold: u32) -> String {
    let mut names: Vec<&str> = runs.iter().map(|run| run.name()).collect();
    names.sort_unstable();

    format!(
        "{algorithm}{sep}{norm}{sep}n{k}{sep}{names}{sep}fold{fold}.{OUTPUT_EXTENSION}",
        sep = NAME_SEPARATOR,
        norm = normalisation.name(),
        k = runs.len(),
        names = names.join(NAME_SEPARATOR),
    )
}

/// Create `dir` (and parents) unless it already is a directory.
fn ensure_output_dir(dir: &Path) -> Result<()> {
    if dir.exists() {
        if !dir.is_dir() {
            return Err(RankFuseError::NotADirectory(dir.to_path_buf()));
        }
        return Ok(());
    }
    fs::create_dir_all(dir).map_err(|e| RankFuseError::io(dir, e))
}

/// Unique name to move a stale marker aside before deleting it.
fn side_path(marker: &Path) -> PathBuf {
    static COUNTER: AtomicU64 = AtomicU64::new(0);
    let n = COUNTER.fetch_add(1, Ordering::Relaxed);
    marker.with_extension(format!("{MARKER_EXTENSION}.stale-{}-{n}", std::process::id()))
}

/// One combination of runs to fuse with one algorithm.
pub struct FusionJob {
    algorithm: Arc<dyn FusionAlgorithm>,
    runs: Vec<Arc<Run>>,
    file_name: String,
    output_path: PathBuf,
    marker_path: PathBuf,
    stale_marker_age: Option<Duration>,
}

impl FusionJob {
    /// `runs` must be non-empty and share one fold and normalisation.
    pub fn new(
        algorithm: Arc<dyn FusionAlgorithm>,
        fold: u32,
        runs: Vec<Arc<Run>>,
        output_dir: &Path,
        stale_marker_age: Option<Duration>,
    ) -> Self {
        let normalisation = runs.first().map_or(Normalisation::None, |run| run.normalisation());
        let file_name = output_filename(algorithm.name(), normalisation, &runs, fold);
        let output_path = output_dir.join(&file_name);
        let marker_path = output_path.with_extension(MARKER_EXTENSION);

        FusionJob {
            algorithm,
            runs,
            file_name,
            output_path,
            marker_path,
            stale_marker_age,
        }
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    pub fn output_path(&self) -> &Path {
        &self.output_path
    }

    pub fn marker_path(&self) -> &Path {
        &self.marker_path
    }

    pub fn runs(&self) -> &[Arc<Run>] {
        &self.runs
    }

    /// Claim, compute and publish this combination unless it is done or
    /// claimed elsewhere.
    pub fn execute(&self) -> Result<JobOutcome> {
        if self.output_path.exists() {
            debug!("Skipping {}: already computed", self.file_name);
            return Ok(JobOutcome::AlreadyDone);
        }
        if self.marker_path.exists() && !self.reclaim_stale_marker()? {
            debug!("Skipping {}: in progress elsewhere", self.file_name);
            return Ok(JobOutcome::InProgress);
        }
        self.claim_and_compute()
    }

    /// Create the marker exclusively, then compute. Losing the create race
    /// means another worker owns the combination.
    fn claim_and_compute(&self) -> Result<JobOutcome> {
        let file = match OpenOptions::new().write(true).create_new(true).open(&self.marker_path) {
            Ok(file) => file,
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                debug!("Skipping {}: claimed by another worker", self.file_name);
                return Ok(JobOutcome::InProgress);
            }
            Err(e) => return Err(RankFuseError::io(&self.marker_path, e)),
        };

        // Published between our existence check and the claim.
        if self.output_path.exists() {
            drop(file);
            self.remove_marker();
            return Ok(JobOutcome::AlreadyDone);
        }

        info!("Computing {}", self.file_name);
        if let Err(e) = self.write_and_publish(file) {
            self.remove_marker();
            return Err(e);
        }
        Ok(JobOutcome::Computed)
    }

    fn write_and_publish(&self, file: File) -> Result<()> {
        let marker_err = |e: io::Error| RankFuseError::io(&self.marker_path, e);

        let mut writer = BufWriter::new(file);
        let users: BTreeSet<UserId> = self.runs.iter().flat_map(|run| run.users()).collect();
        let mut lines = 0usize;

        for user in users {
            let candidates = candidate_items(&self.runs, user);
            let mut acc = RankingAccumulator::new();
            self.algorithm.compute_user_ranking(&self.runs, user, &candidates, &mut acc);
            lines += acc
                .emit(&mut writer, user, self.algorithm.max_rank(), self.algorithm.name())
                .map_err(marker_err)?;
        }

        writer.flush().map_err(marker_err)?;
        let file = writer.into_inner().map_err(|e| marker_err(e.into_error()))?;
        file.sync_all().map_err(marker_err)?;
        drop(file);

        fs::rename(&self.marker_path, &self.output_path).map_err(marker_err)?;
        debug!("Published {} ({lines} lines)", self.file_name);
        Ok(())
    }

    /// True if the marker is gone or was stale and has been removed.
    /// False if someone else still owns it.
    fn reclaim_stale_marker(&self) -> Result<bool> {
        let Some(max_age) = self.stale_marker_age else {
            return Ok(false);
        };

        let modified = match fs::metadata(&self.marker_path).and_then(|m| m.modified()) {
            Ok(modified) => modified,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(true),
            Err(e) => return Err(RankFuseError::io(&self.marker_path, e)),
        };
        let age = SystemTime::now().duration_since(modified).unwrap_or_default();
        if age < max_age {
            return Ok(false);
        }

        // Only one reclaimer can win the rename.
        let side = side_path(&self.marker_path);
        match fs::rename(&self.marker_path, &side) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(false),
            Err(e) => return Err(RankFuseError::io(&self.marker_path, e)),
        }
        warn!("Reclaimed stale marker {} ({}s old)", self.marker_path.display(), age.as_secs());
        if let Err(e) = fs::remove_file(&side) {
            warn!("Could not remove {}: {e}", side.display());
        }
        Ok(true)
    }

    fn remove_marker(&self) {
        if let Err(e) = fs::remove_file(&self.marker_path) {
            if e.kind() != io::ErrorKind::NotFound {
                warn!("Could not remove marker {}: {e}", self.marker_path.display());
            }
        }
    }
}

impl std::fmt::Debug for FusionJob {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FusionJob")
            .field("file_name", &self.file_name)
            .field("algorithm", &self.algorithm)
            .finish()
    }
}

/// Turns folds of runs into fusion jobs on a worker pool.
#[derive(Debug)]
pub struct FusionScheduler {
    pool: Arc<WorkerPool>,
    config: SchedulerConfig,
    summary: Arc<JobSummary>,
}

impl FusionScheduler {
    pub fn new(pool: Arc<WorkerPool>, config: SchedulerConfig) -> Self {
        FusionScheduler {
            pool,
            config,
            summary: Arc::new(JobSummary::new()),
        }
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    /// Outcome counters of every job dispatched so far. Jobs keep updating
    /// them after this returns, until the pool drains.
    pub fn summary(&self) -> Arc<JobSummary> {
        Arc::clone(&self.summary)
    }

    /// Build one job per combination of `runs` of size 2..=n, without running
    /// any of them.
    ///
    /// The output directory is created first. All runs must belong to `fold`
    /// and share a normalisation, and no two combinations may map to the same
    /// output file.
    pub fn plan_fold(
        &self,
        algorithm: AlgorithmKind,
        fold: u32,
        runs: &[Arc<Run>],
        output_dir: &Path,
    ) -> Result<Vec<FusionJob>> {
        ensure_output_dir(output_dir)?;

        if let Some(run) = runs.iter().find(|run| run.fold() != fold) {
            return Err(RankFuseError::FoldMismatch {
                run: run.name().to_string(),
                expected: fold,
                actual: run.fold(),
            });
        }
        if let Some(first) = runs.first() {
            if let Some(other) = runs.iter().find(|run| run.normalisation() != first.normalisation()) {
                return Err(RankFuseError::MixedNormalisation {
                    fold,
                    first: first.normalisation().to_string(),
                    second: other.normalisation().to_string(),
                });
            }
        }

        let algorithm = algorithm.build(self.config.max_rank);
        let mut seen = HashSet::new();
        let mut jobs = Vec::new();
        for combination in all_combinations(runs) {
            let job = FusionJob::new(
                Arc::clone(&algorithm),
                fold,
                combination,
                output_dir,
                self.config.stale_marker_age,
            );
            if !seen.insert(job.file_name().to_string()) {
                return Err(RankFuseError::KeyCollision(job.file_name().to_string()));
            }
            jobs.push(job);
        }
        Ok(jobs)
    }

    /// Plan `fold` and hand every job to the pool. Returns the number of jobs
    /// dispatched; their outcomes land in `summary()` as they finish.
    pub fn schedule_fold(
        &self,
        algorithm: AlgorithmKind,
        fold: u32,
        runs: &[Arc<Run>],
        output_dir: &Path,
    ) -> Result<usize> {
        let jobs = self.plan_fold(algorithm, fold, runs, output_dir)?;
        let total = jobs.len();

        if total == 0 {
            debug!("Fold {fold} has {} runs, nothing to fuse with {algorithm}", runs.len());
            return Ok(0);
        }
        info!(
            "Scheduling {total} {algorithm} jobs for fold {fold} ({} runs, largest level {} combinations)",
            runs.len(),
            binomial(runs.len(), runs.len() / 2),
        );

        for job in jobs {
            self.summary.record_scheduled();
            let summary = Arc::clone(&self.summary);
            self.pool.execute(move || match job.execute() {
                Ok(outcome) => summary.record_outcome(outcome),
                Err(e) => {
                    error!("Failed to compute {}: {e}", job.file_name());
                    summary.record_failure();
                }
            });
        }
        Ok(total)
    }
}
