use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::constants::SCORE_EPSILON;

/// Users and items are identified by the integer IDs found in run files.
pub type UserId = i64;
pub type ItemId = i64;

/// One user's sparse ranking: item → (rank, score).
pub type UserRanking = HashMap<ItemId, RankScore>;

/// Position and score of an item in one run's ranking for one user.
///
/// Equality is exact on `rank` and approximate on `score`. It exists for
/// tests; fusion code never compares `RankScore`s.
#[derive(Debug, Clone, Copy)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RankScore {
    /// 0-based position, always below the run's max rank.
    pub rank: usize,
    pub score: f64,
}

impl RankScore {
    pub fn new(rank: usize, score: f64) -> Self {
        RankScore { rank, score }
    }
}

impl PartialEq for RankScore {
    fn eq(&self, other: &Self) -> bool {
        self.rank == other.rank && (self.score - other.score).abs() < SCORE_EPSILON
    }
}

/// What happened when a fusion job ran.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum JobOutcome {
    /// This job claimed the combination and published its output.
    Computed,
    /// The output file already existed.
    AlreadyDone,
    /// Another worker (or process) holds the marker.
    InProgress,
}

/// Outcome counters shared by every job a scheduler dispatches.
///
/// Updated concurrently from worker threads; read with `snapshot()` once the
/// pool has drained.
#[derive(Debug, Default)]
pub struct JobSummary {
    scheduled: AtomicUsize,
    computed: AtomicUsize,
    already_done: AtomicUsize,
    in_progress: AtomicUsize,
    failed: AtomicUsize,
}

impl JobSummary {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn record_scheduled(&self) {
        self.scheduled.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_outcome(&self, outcome: JobOutcome) {
        let counter = match outcome {
            JobOutcome::Computed => &self.computed,
            JobOutcome::AlreadyDone => &self.already_done,
            JobOutcome::InProgress => &self.in_progress,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_failure(&self) {
        self.failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> SummarySnapshot {
        SummarySnapshot {
            scheduled: self.scheduled.load(Ordering::Relaxed),
            computed: self.computed.load(Ordering::Relaxed),
            already_done: self.already_done.load(Ordering::Relaxed),
            in_progress: self.in_progress.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time copy of a `JobSummary`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SummarySnapshot {
    pub scheduled: usize,
    pub computed: usize,
    pub already_done: usize,
    pub in_progress: usize,
    pub failed: usize,
}

impl SummarySnapshot {
    /// Jobs that reached any terminal state.
    pub fn finished(&self) -> usize {
        self.computed + self.already_done + self.in_progress + self.failed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rank_score_equality_is_approximate_on_score() {
        assert_eq!(RankScore::new(2, 1.0 / 3.0), RankScore::new(2, 0.333_333_333_3));
        assert_ne!(RankScore::new(2, 1.0), RankScore::new(3, 1.0));
        assert_ne!(RankScore::new(0, 1.0), RankScore::new(0, 1.001));
    }

    #[test]
    fn test_summary_counts_outcomes() {
        let summary = JobSummary::new();
        summary.record_scheduled();
        summary.record_scheduled();
        summary.record_scheduled();
        summary.record_outcome(JobOutcome::Computed);
        summary.record_outcome(JobOutcome::AlreadyDone);
        summary.record_failure();

        let snap = summary.snapshot();
        assert_eq!(snap.scheduled, 3);
        assert_eq!(snap.computed, 1);
        assert_eq!(snap.already_done, 1);
        assert_eq!(snap.in_progress, 0);
        assert_eq!(snap.failed, 1);
        assert_eq!(snap.finished(), 3);
    }
}
