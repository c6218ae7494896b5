/// Condorcet fusion.
///
/// Montague & Aslam (2002), "Condorcet fusion for improved retrieval".
/// Items are ordered by pairwise majority over the runs' rankings, then
/// scored `max_rank, max_rank - 1, ...` by position.
///
/// The pairwise relation is not transitive once three or more runs disagree,
/// so the order comes from `condorcet_sort`, an explicit stable merge sort that
/// tolerates cycles. `slice::sort_by` may panic on such a comparator.
use std::cmp::Ordering;
use std::collections::BTreeSet;
use std::sync::Arc;

use super::FusionAlgorithm;
use crate::accumulator::RankingAccumulator;
use crate::constants::INSERTION_SORT_CUTOFF;
use crate::run::Run;
use crate::types::{ItemId, UserId};

/// Pairwise majority between `x` and `y` for `user`.
///
/// Each run votes with the sign of `rank(x) - rank(y)`, an unranked item
/// counting as infinitely far down. `Less` means `x` wins, `Equal` a tie.
pub fn condorcet_compare(runs: &[Arc<Run>], user: UserId, x: ItemId, y: ItemId) -> Ordering {
    let votes: i64 = runs.iter()
        .map(|run| {
            let rank_x = run.rank_of(user, x).unwrap_or(usize::MAX);
            let rank_y = run.rank_of(user, y).unwrap_or(usize::MAX);
            rank_x.cmp(&rank_y) as i64
        })
        .sum();
    votes.cmp(&0)
}

/// Stable sort that only asks "does the right element strictly beat the
/// left one?".
///
/// Terminates and returns a permutation of the input for any comparator,
/// transitive or not. For a strict weak order it is an ordinary stable sort.
pub fn condorcet_sort<T, F>(items: &mut [T], mut cmp: F)
where
    T: Copy,
    F: FnMut(&T, &T) -> Ordering,
{
    let mut buf = Vec::with_capacity(items.len());
    merge_sort(items, &mut buf, &mut cmp);
}

fn merge_sort<T, F>(v: &mut [T], buf: &mut Vec<T>, cmp: &mut F)
where
    T: Copy,
    F: FnMut(&T, &T) -> Ordering,
{
    let len = v.len();
    if len <= INSERTION_SORT_CUTOFF {
        insertion_sort(v, cmp);
        return;
    }

    let mid = len / 2;
    merge_sort(&mut v[..mid], buf, cmp);
    merge_sort(&mut v[mid..], buf, cmp);

    // Halves already in order.
    if cmp(&v[mid], &v[mid - 1]) != Ordering::Less {
        return;
    }

    buf.clear();
    buf.extend_from_slice(v);
    let (mut i, mut j) = (0, mid);
    for slot in v.iter_mut() {
        let take_left = j >= len || (i < mid && cmp(&buf[j], &buf[i]) != Ordering::Less);
        if take_left {
            *slot = buf[i];
            i += 1;
        } else {
            *slot = buf[j];
            j += 1;
        }
    }
}

fn insertion_sort<T, F>(v: &mut [T], cmp: &mut F)
where
    T: Copy,
    F: FnMut(&T, &T) -> Ordering,
{
    for i in 1..v.len() {
        let mut j = i;
        while j > 0 && cmp(&v[j], &v[j - 1]) == Ordering::Less {
            v.swap(j, j - 1);
            j -= 1;
        }
    }
}

#[derive(Debug, Clone)]
pub struct Condorcet {
    max_rank: usize,
}

impl Condorcet {
    pub fn new(max_rank: usize) -> Self {
        Condorcet { max_rank }
    }
}

impl FusionAlgorithm for Condorcet {
    fn name(&self) -> &'static str {
        "condorcet"
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
        let mut order: Vec<ItemId> = candidates.iter().copied().collect();
        condorcet_sort(&mut order, |&x, &y| condorcet_compare(runs, user, x, y));

        let mut score = self.max_rank as f64;
        for item in order {
            acc.record(score, item);
            score -= 1.0;
        }
    }
}
