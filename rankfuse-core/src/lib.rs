/// rankfuse-core: rank fusion over every combination of recommender runs.
///
/// Runs (per-user TREC rankings, one file per method and fold) are read,
/// normalised, and fused for every subset of two or more runs of a fold. Each
/// (algorithm, normalisation, subset, fold) becomes one output file. Jobs are
/// claimed through marker files in the output directory, so an interrupted
/// invocation can simply be restarted: finished files are skipped and
/// claimed-but-unfinished ones are left to their owner.
///
/// # Quick start
///
/// ```rust
/// use std::collections::HashMap;
/// use std::sync::Arc;
/// use rankfuse_core::{
///     candidate_items, AlgorithmKind, FusionAlgorithm, Normalisation, RankScore, RankingAccumulator, Run,
/// };
///
/// let run = |name: &str, items: &[(i64, f64)]| {
///     let ranking = items.iter().enumerate()
///         .map(|(rank, &(item, score))| (item, RankScore::new(rank, score)))
///         .collect();
///     Arc::new(Run::new(name, 1, Normalisation::None, HashMap::from([(7, ranking)])))
/// };
/// let runs = vec![
///     run("knn", &[(3, 5.0), (1, 3.0), (2, 1.0)]),
///     run("svd", &[(1, 2.0), (2, 1.5), (3, 1.0)]),
/// ];
///
/// let borda = AlgorithmKind::Borda.build(10);
/// let mut acc = RankingAccumulator::new();
/// borda.compute_user_ranking(&runs, 7, &candidate_items(&runs, 7), &mut acc);
///
/// let mut out = Vec::new();
/// acc.emit(&mut out, 7, borda.max_rank(), borda.name()).unwrap();
/// assert!(String::from_utf8(out).unwrap().starts_with("7\tQ0\t1\t0\t17.000000\tborda"));
/// ```

pub mod accumulator;
pub mod algorithms;
pub mod combination;
pub mod constants;
pub mod error;
pub mod normalisation;
pub mod pool;
pub mod run;
pub mod run_file;
pub mod scheduler;
pub mod types;

// Re-export primary public API at crate root.
pub use accumulator::RankingAccumulator;
pub use algorithms::{candidate_items, AlgorithmKind, FusionAlgorithm};
pub use combination::{all_combinations, binomial, combinations};
pub use error::{RankFuseError, Result};
pub use normalisation::Normalisation;
pub use pool::WorkerPool;
pub use run::Run;
pub use run_file::{parse_run_filename, read_run, read_runs};
pub use scheduler::{output_filename, FusionJob, FusionScheduler, SchedulerConfig};
pub use types::{ItemId, JobOutcome, JobSummary, RankScore, SummarySnapshot, UserId, UserRanking};
