/// CombSUM, CombANZ and CombMNZ.
///
/// Fox & Shaw (1994), "Combination of Multiple Searches". All three sum the
/// scores an item received from the runs that ranked it; they differ in how
/// that sum is adjusted by the number of runs that ranked it.
use std::collections::BTreeSet;
use std::sync::Arc;

use super::FusionAlgorithm;
use crate::accumulator::RankingAccumulator;
use crate::run::Run;
use crate::types::{ItemId, UserId};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CombKind {
    /// Plain sum.
    Sum,
    /// Average over the runs that scored the item.
    Anz,
    /// Sum multiplied by the number of runs that scored the item.
    Mnz,
}

impl CombKind {
    /// Combine `sum` over `hits` runs into the final score.
    pub fn combine(&self, hits: usize, sum: f64) -> f64 {
        match self {
            CombKind::Sum => sum,
            CombKind::Anz => sum / hits as f64,
            CombKind::Mnz => sum * hits as f64,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Comb {
    kind: CombKind,
    max_rank: usize,
}

impl Comb {
    pub fn new(kind: CombKind, max_rank: usize) -> Self {
        Comb { kind, max_rank }
    }

    pub fn kind(&self) -> CombKind {
        self.kind
    }
}

impl FusionAlgorithm for Comb {
    fn name(&self) -> &'static str {
        match self.kind {
            CombKind::Sum => "combSum",
            CombKind::Anz => "combANZ",
            CombKind::Mnz => "combMNZ",
        }
    }

    fn max_rank(&self) -> usize {
        self.max_rank
    }

    fn compute_user_ranking(
        &self,
        runs: &[Arc<Run>],
        user: UserId,
        candidates: &BTreeSet<ItemId>,
        acc: &mut RankingAccumulator,
    ) {
        for &item in candidates {
            let mut hits = 0usize;
            let mut sum = 0.0;
            for score in runs.iter().filter_map(|run| run.score_of(user, item)) {
                hits += 1;
                sum += score;
            }

            if hits > 0 {
                acc.record(self.kind.combine(hits, sum), item);
            }
        }
    }
}
