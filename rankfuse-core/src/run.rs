/// In-memory run: one method's per-user rankings for one fold.
///
/// Runs are immutable once built and are shared read-only (behind `Arc`)
/// by every fusion job that includes them.
use std::collections::{HashMap, HashSet};
use std::fmt;

use crate::normalisation::Normalisation;
use crate::types::{ItemId, UserId, UserRanking};

#[derive(Debug, Clone)]
pub struct Run {
    name: String,
    fold: u32,
    normalisation: Normalisation,
    rankings: HashMap<UserId, UserRanking>,
    /// Every item this run ranked for any user.
    items: HashSet<ItemId>,
}

impl Run {
    /// Build a run from rankings that are already truncated and normalised.
    pub fn new(
        name: impl Into<String>,
        fold: u32,
        normalisation: Normalisation,
        rankings: HashMap<UserId, UserRanking>,
    ) -> Self {
        let items = rankings
            .values()
            .flat_map(|ranking| ranking.keys().copied())
            .collect();

        Run {
            name: name.into(),
            fold,
            normalisation,
            rankings,
            items,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn fold(&self) -> u32 {
        self.fold
    }

    pub fn normalisation(&self) -> Normalisation {
        self.normalisation
    }

    pub fn users(&self) -> impl Iterator<Item = UserId> + '_ {
        self.rankings.keys().copied()
    }

    pub fn user_count(&self) -> usize {
        self.rankings.len()
    }

    pub fn items(&self) -> &HashSet<ItemId> {
        &self.items
    }

    /// `None` when this run has no ranking for `user`.
    pub fn ranking_for(&self, user: UserId) -> Option<&UserRanking> {
        self.rankings.get(&user)
    }

    pub fn score_of(&self, user: UserId, item: ItemId) -> Option<f64> {
        self.ranking_for(user)?.get(&item).map(|rs| rs.score)
    }

    pub fn rank_of(&self, user: UserId, item: ItemId) -> Option<usize> {
        self.ranking_for(user)?.get(&item).map(|rs| rs.rank)
    }
}

impl fmt::Display for Run {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Run[{},fold={},users={},{}]",
            self.name,
            self.fold,
            self.rankings.len(),
            self.normalisation
        )
    }
}
