/// Copeland's method.
///
/// Every unordered pair of candidates is decided by the Condorcet comparator;
/// the winner gains a point and the loser drops one. Ties move nothing.
use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use super::{condorcet_compare, FusionAlgorithm};
use crate::accumulator::RankingAccumulator;
use crate::run::Run;
use crate::types::{ItemId, UserId};

#[derive(Debug, Clone)]
pub struct Copeland {
    max_rank: usize,
}

impl Copeland {
    pub fn new(max_rank: usize) -> Self {
        Copeland { max_rank }
    }
}

impl FusionAlgorithm for Copeland {
    fn name(&self) -> &'static str {
        "copeland"
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
        let mut scores: BTreeMap<ItemId, i64> = candidates.iter().map(|&item| (item, 0)).collect();
        let items: Vec<ItemId> = candidates.iter().copied().collect();

        for (i, &x) in items.iter().enumerate() {
            for &y in &items[i + 1..] {
                let delta = match condorcet_compare(runs, user, x, y) {
                    Ordering::Less => 1,
                    Ordering::Greater => -1,
                    Ordering::Equal => continue,
                };
                *scores.entry(x).or_default() += delta;
                *scores.entry(y).or_default() -= delta;
            }
        }

        for (item, score) in scores {
            acc.record(score as f64, item);
        }
    }
}
