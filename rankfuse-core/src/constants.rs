use std::time::Duration;

/// Default number of items kept per user, both when reading runs and when
/// emitting fused rankings.
pub const DEFAULT_MAX_RANK: usize = 100;

/// Extension of completed output files.
pub const OUTPUT_EXTENSION: &str = "txt";

/// Extension of in-progress marker files. A marker has the same stem as the
/// output it will become.
pub const MARKER_EXTENSION: &str = "tmp";

/// Label written in place of the algorithm name after the first line of each
/// user's ranking.
pub const LABEL_PLACEHOLDER: &str = "-";

/// Literal second column of TREC run lines.
pub const TREC_Q0: &str = "Q0";

/// Separator between components of an output filename.
pub const NAME_SEPARATOR: &str = "-";

/// Filename prefix of input run files: `run-<name>-fold<N>.txt`.
pub const RUN_FILE_PREFIX: &str = "run-";

/// Extension of input run files. Independent of `OUTPUT_EXTENSION`.
pub const RUN_FILE_EXTENSION: &str = "txt";

/// Marker between the run name and the fold number in input filenames.
pub const FOLD_MARKER: &str = "-fold";

/// How long `WorkerPool::shutdown` waits for queued jobs by default.
/// Five days is long enough to be treated as unbounded.
pub const DRAIN_TIMEOUT: Duration = Duration::from_secs(5 * 24 * 60 * 60);

/// Below this many elements the Condorcet merge sort switches to insertion sort.
pub const INSERTION_SORT_CUTOFF: usize = 7;

/// Tolerance used by `RankScore` equality on the score component.
pub const SCORE_EPSILON: f64 = 1e-7;
