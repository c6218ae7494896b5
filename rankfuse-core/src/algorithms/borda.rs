/// Borda count.
///
/// Aslam & Montague (2001), "Models for metasearch". Each run awards
/// `(max_rank - 1) - rank` points to an item; an item a run did not rank gets
/// the worst position and therefore no points from that run.
use std::collections::BTreeSet;
use std::sync::Arc;

use super::FusionAlgorithm;
use crate::accumulator::RankingAccumulator;
use crate::run::Run;
use crate::types::{ItemId, UserId};

#[derive(Debug, Clone)]
pub struct BordaCount {
    max_rank: usize,
}

impl BordaCount {
    pub fn new(max_rank: usize) -> Self {
        BordaCount { max_rank }
    }
}

impl FusionAlgorithm for BordaCount {
    fn name(&self) -> &'static str {
        "borda"
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
        let worst = self.max_rank.saturating_sub(1) as f64;

        for &item in candidates {
            let score: f64 = runs.iter()
                .map(|run| {
                    let rank = run.rank_of(user, item).map_or(worst, |r| r as f64);
                    worst - rank
                })
                .sum();
            acc.record(score, item);
        }
    }
}
