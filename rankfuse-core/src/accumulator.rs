/// Per-user score → items accumulator.
///
/// Fusion algorithms record one score per candidate item; the accumulator
/// groups items sharing an identical score and emits them in descending score
/// order, truncated to the max rank.
use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};
use std::io::{self, Write};

use crate::constants::{LABEL_PLACEHOLDER, TREC_Q0};
use crate::types::{ItemId, UserId};

/// Score key ordered with `f64::total_cmp`, so every bit pattern (including
/// `-0.0` and NaN) is its own group.
#[derive(Debug, Clone, Copy)]
struct ScoreKey(f64);

impl PartialEq for ScoreKey {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for ScoreKey {}

impl PartialOrd for ScoreKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ScoreKey {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.total_cmp(&other.0)
    }
}

#[derive(Debug, Default, Clone)]
pub struct RankingAccumulator {
    /// Ascending by score; items inside a group ascend by ID.
    groups: BTreeMap<ScoreKey, BTreeSet<ItemId>>,
}

impl RankingAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `item` to the group of items scored exactly `score`.
    pub fn record(&mut self, score: f64, item: ItemId) {
        self.groups.entry(ScoreKey(score)).or_default().insert(item);
    }

    /// Number of recorded items.
    pub fn len(&self) -> usize {
        self.groups.values().map(BTreeSet::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Score groups from highest to lowest score.
    pub fn groups(&self) -> impl Iterator<Item = (f64, &BTreeSet<ItemId>)> + '_ {
        self.groups.iter().rev().map(|(key, items)| (key.0, items))
    }

    /// Items in emission order, each with its score, without truncation.
    pub fn ranked_items(&self) -> Vec<(ItemId, f64)> {
        self.groups()
            .flat_map(|(score, items)| items.iter().map(move |&item| (item, score)))
            .collect()
    }

    /// Write this user's fused ranking as TREC lines.
    ///
    /// At most `max_rank` lines are written, even if that cuts a score group
    /// in half. Only the first line carries `label`. Returns the number of
    /// lines written.
    pub fn emit<W: Write>(
        &self,
        writer: &mut W,
        user: UserId,
        max_rank: usize,
        label: &str,
    ) -> io::Result<usize> {
        let mut rank = 0usize;
        if max_rank == 0 {
            return Ok(rank);
        }

        for (item, score) in self.groups().flat_map(|(score, items)| items.iter().map(move |&item| (item, score))) {
            let tag = if rank == 0 { label } else { LABEL_PLACEHOLDER };
            writeln!(writer, "{user}\t{TREC_Q0}\t{item}\t{rank}\t{score:.6}\t{tag}")?;
            rank += 1;
            if rank == max_rank {
                break;
            }
        }

        Ok(rank)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn emit_to_string(acc: &RankingAccumulator, user: UserId, max_rank: usize, label: &str) -> String {
        let mut out = Vec::new();
        acc.emit(&mut out, user, max_rank, label).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn test_groups_descending_with_ties() {
        let mut acc = RankingAccumulator::new();
        acc.record(1.0, 10);
        acc.record(3.0, 30);
        acc.record(1.0, 5);
        acc.record(2.0, 20);

        let groups: Vec<(f64, Vec<ItemId>)> = acc.groups()
            .map(|(s, items)| (s, items.iter().copied().collect()))
            .collect();
        assert_eq!(groups, vec![(3.0, vec![30]), (2.0, vec![20]), (1.0, vec![5, 10])]);
        assert_eq!(acc.len(), 4);
    }

    #[test]
    fn test_emit_format_and_label_only_on_first_line() {
        let mut acc = RankingAccumulator::new();
        acc.record(5.0, 1);
        acc.record(4.0, 3);
        acc.record(0.5, 4);

        let out = emit_to_string(&acc, 7, 10, "borda");
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines, vec![
            "7\tQ0\t1\t0\t5.000000\tborda",
            "7\tQ0\t3\t1\t4.000000\t-",
            "7\tQ0\t4\t2\t0.500000\t-",
        ]);
    }

    #[test]
    fn test_emit_truncates_inside_a_group() {
        let mut acc = RankingAccumulator::new();
        acc.record(2.0, 1);
        acc.record(1.0, 2);
        acc.record(1.0, 3);
        acc.record(1.0, 4);

        let mut out = Vec::new();
        let written = acc.emit(&mut out, 1, 3, "combSum").unwrap();
        assert_eq!(written, 3);

        let text = String::from_utf8(out).unwrap();
        let items: Vec<&str> = text.lines().map(|l| l.split('\t').nth(2).unwrap()).collect();
        assert_eq!(items, vec!["1", "2", "3"]);
    }

    #[test]
    fn test_emit_empty_and_zero_max_rank() {
        let acc = RankingAccumulator::new();
        assert_eq!(emit_to_string(&acc, 1, 10, "borda"), "");

        let mut acc = RankingAccumulator::new();
        acc.record(1.0, 1);
        assert_eq!(emit_to_string(&acc, 1, 0, "borda"), "");
    }

    #[test]
    fn test_negative_zero_is_its_own_group() {
        let mut acc = RankingAccumulator::new();
        acc.record(0.0, 1);
        acc.record(-0.0, 2);
        assert_eq!(acc.groups().count(), 2);
        assert_eq!(acc.ranked_items(), vec![(1, 0.0), (2, -0.0)]);
    }
}
