/// Rank aggregation algorithms.
///
/// Every algorithm scores the candidate items of one user from the rankings
/// of several runs and records those scores in a `RankingAccumulator`. They
/// differ only in how a score is derived; truncation, tie grouping and output
/// formatting are shared.
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use crate::accumulator::RankingAccumulator;
use crate::error::RankFuseError;
use crate::run::Run;
use crate::types::{ItemId, UserId};

mod borda;
mod comb;
mod condorcet;
mod copeland;

pub use borda::BordaCount;
pub use comb::{Comb, CombKind};
pub use condorcet::{condorcet_compare, condorcet_sort, Condorcet};
pub use copeland::Copeland;

pub trait FusionAlgorithm: Send + Sync {
    /// Registry name, used as the output label and in output filenames.
    fn name(&self) -> &'static str;

    /// Number of entries kept per fused user ranking.
    fn max_rank(&self) -> usize;

    /// Score `candidates` for `user` and record them in `acc`.
    ///
    /// `candidates` is the union of the items each run ranked for `user`.
    /// Runs that do not cover `user` count as ranking none of them.
    fn compute_user_ranking(
        &self,
        runs: &[Arc<Run>],
        user: UserId,
        candidates: &BTreeSet<ItemId>,
        acc: &mut RankingAccumulator,
    );
}

impl fmt::Debug for dyn FusionAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}(max_rank={})", self.name(), self.max_rank())
    }
}

/// Union of the items the given runs ranked for `user`, ascending.
pub fn candidate_items(runs: &[Arc<Run>], user: UserId) -> BTreeSet<ItemId> {
    runs.iter()
        .filter_map(|run| run.ranking_for(user))
        .flat_map(|ranking| ranking.keys().copied())
        .collect()
}

/// Algorithm registry, selected by name at configuration time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum AlgorithmKind {
    Borda,
    Condorcet,
    Copeland,
    CombSum,
    CombAnz,
    CombMnz,
}

impl AlgorithmKind {
    pub const ALL: [AlgorithmKind; 6] = [
        AlgorithmKind::Borda,
        AlgorithmKind::Condorcet,
        AlgorithmKind::Copeland,
        AlgorithmKind::CombSum,
        AlgorithmKind::CombAnz,
        AlgorithmKind::CombMnz,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            AlgorithmKind::Borda => "borda",
            AlgorithmKind::Condorcet => "condorcet",
            AlgorithmKind::Copeland => "copeland",
            AlgorithmKind::CombSum => "combSum",
            AlgorithmKind::CombAnz => "combANZ",
            AlgorithmKind::CombMnz => "combMNZ",
        }
    }

    pub fn build(&self, max_rank: usize) -> Arc<dyn FusionAlgorithm> {
        match self {
            AlgorithmKind::Borda => Arc::new(BordaCount::new(max_rank)),
            AlgorithmKind::Condorcet => Arc::new(Condorcet::new(max_rank)),
            AlgorithmKind::Copeland => Arc::new(Copeland::new(max_rank)),
            AlgorithmKind::CombSum => Arc::new(Comb::new(CombKind::Sum, max_rank)),
            AlgorithmKind::CombAnz => Arc::new(Comb::new(CombKind::Anz, max_rank)),
            AlgorithmKind::CombMnz => Arc::new(Comb::new(CombKind::Mnz, max_rank)),
        }
    }
}

impl FromStr for AlgorithmKind {
    type Err = RankFuseError;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        AlgorithmKind::ALL
            .into_iter()
            .find(|kind| kind.name() == name)
            .ok_or_else(|| RankFuseError::UnknownAlgorithm(name.to_string()))
    }
}

impl fmt::Display for AlgorithmKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Shared fixtures for the algorithm tests.
#[cfg(test)]
pub(crate) mod test_support {
    use std::collections::HashMap;
    use std::sync::Arc;

    use crate::accumulator::RankingAccumulator;
    use crate::normalisation::Normalisation;
    use crate::run::Run;
    use crate::types::{ItemId, RankScore, UserId, UserRanking};

    use super::{candidate_items, FusionAlgorithm};

    pub const USER: UserId = 1;
    pub const MAX_RANK: usize = 4;

    /// A run ranking `items` for `USER`, best first: (item, score).
    pub fn run_from(name: &str, items: &[(ItemId, f64)]) -> Arc<Run> {
        let ranking: UserRanking = items.iter().enumerate()
            .map(|(rank, &(item, score))| (item, RankScore::new(rank, score)))
            .collect();
        Arc::new(Run::new(name, 1, Normalisation::None, HashMap::from([(USER, ranking)])))
    }

    /// The two runs of the reference scenario.
    ///
    /// Run A: item3 (5.0), item1 (3.0), item2 (1.0), item4 (0.5).
    /// Run B: item1 (2.0), item2 (1.5), item3 (1.0), item4 (0.5).
    pub fn scenario_runs() -> Vec<Arc<Run>> {
        vec![
            run_from("meta1", &[(3, 5.0), (1, 3.0), (2, 1.0), (4, 0.5)]),
            run_from("meta2", &[(1, 2.0), (2, 1.5), (3, 1.0), (4, 0.5)]),
        ]
    }

    pub fn fuse(alg: &dyn FusionAlgorithm, runs: &[Arc<Run>]) -> RankingAccumulator {
        let mut acc = RankingAccumulator::new();
        let candidates = candidate_items(runs, USER);
        alg.compute_user_ranking(runs, USER, &candidates, &mut acc);
        acc
    }

    /// (score, items) groups, highest score first.
    pub fn groups(acc: &RankingAccumulator) -> Vec<(f64, Vec<ItemId>)> {
        acc.groups().map(|(s, items)| (s, items.iter().copied().collect())).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::*;
    use super::*;

    #[test]
    fn test_registry_round_trip() {
        for kind in AlgorithmKind::ALL {
            assert_eq!(kind.name().parse::<AlgorithmKind>().unwrap(), kind);
            assert_eq!(kind.build(10).name(), kind.name());
            assert_eq!(kind.build(10).max_rank(), 10);
        }
    }

    #[test]
    fn test_unknown_algorithm_name() {
        let err = "rrf".parse::<AlgorithmKind>().unwrap_err();
        assert!(matches!(err, RankFuseError::UnknownAlgorithm(name) if name == "rrf"));
        // Names are case-sensitive, as in the output filenames.
        assert!("combsum".parse::<AlgorithmKind>().is_err());
    }

    #[test]
    fn test_candidate_items_union() {
        let runs = vec![
            run_from("a", &[(5, 1.0), (2, 0.5)]),
            run_from("b", &[(2, 1.0), (9, 0.1)]),
        ];
        let items: Vec<ItemId> = candidate_items(&runs, USER).into_iter().collect();
        assert_eq!(items, vec![2, 5, 9]);
        assert!(candidate_items(&runs, 42).is_empty());
    }

    #[test]
    fn test_emitted_lines_never_exceed_max_rank() {
        let runs = vec![
            run_from("a", &[(1, 9.0), (2, 8.0), (3, 7.0), (4, 6.0)]),
            run_from("b", &[(5, 9.0), (6, 8.0), (7, 7.0), (8, 6.0)]),
            run_from("c", &[(2, 9.0), (9, 8.0), (5, 7.0), (1, 6.0)]),
        ];

        for kind in AlgorithmKind::ALL {
            let alg = kind.build(MAX_RANK);
            let acc = fuse(alg.as_ref(), &runs);
            let mut out = Vec::new();
            let written = acc.emit(&mut out, USER, alg.max_rank(), alg.name()).unwrap();
            let lines = String::from_utf8(out).unwrap().lines().count();
            assert_eq!(written, lines);
            assert!(lines <= MAX_RANK, "{kind} wrote {lines} lines");
        }
    }
}
