/// Per-user score normalisation applied to runs before fusion.
///
/// Montague & Aslam (2001), "Relevance Score Normalization for Metasearch".
/// Every scheme rescales scores in place and leaves ranks untouched.
use std::fmt;
use std::str::FromStr;

use crate::error::RankFuseError;
use crate::types::UserRanking;

#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Normalisation {
    /// Scores are left as read.
    None,
    /// Min-max: shift the minimum to 0.0, scale the maximum to 1.0.
    Standard,
    /// Shift the minimum to 0.0, then scale so scores sum to 1.0.
    Sum,
    /// Zero mean, unit variance, plus a constant offset (0, 1 or 2).
    Zmuv { offset: f64 },
}

impl Normalisation {
    /// Every registered normalisation, in the order they are documented.
    pub const ALL: [Normalisation; 6] = [
        Normalisation::None,
        Normalisation::Standard,
        Normalisation::Sum,
        Normalisation::Zmuv { offset: 0.0 },
        Normalisation::Zmuv { offset: 1.0 },
        Normalisation::Zmuv { offset: 2.0 },
    ];

    /// Registry name; also used in output filenames.
    pub fn name(&self) -> &'static str {
        match self {
            Normalisation::None => "none",
            Normalisation::Standard => "standard",
            Normalisation::Sum => "sum",
            Normalisation::Zmuv { offset } if *offset == 1.0 => "zmuv1",
            Normalisation::Zmuv { offset } if *offset == 2.0 => "zmuv2",
            Normalisation::Zmuv { .. } => "zmuv",
        }
    }

    /// Rescale one user's scores in place.
    ///
    /// Degenerate inputs stay finite: an empty ranking is untouched, a
    /// ranking whose scores are all equal maps to 1.0 (standard), 1/n (sum)
    /// or the offset (zmuv).
    pub fn apply(&self, ranking: &mut UserRanking) {
        if ranking.is_empty() {
            return;
        }

        match *self {
            Normalisation::None => {}
            Normalisation::Standard => {
                let (min, max) = min_max(ranking);
                let den = max - min;
                for rs in ranking.values_mut() {
                    rs.score = if den > 0.0 { (rs.score - min) / den } else { 1.0 };
                }
            }
            Normalisation::Sum => {
                let (min, _) = min_max(ranking);
                let den: f64 = ranking.values().map(|rs| rs.score - min).sum();
                let uniform = 1.0 / ranking.len() as f64;
                for rs in ranking.values_mut() {
                    rs.score = if den > 0.0 { (rs.score - min) / den } else { uniform };
                }
            }
            Normalisation::Zmuv { offset } => {
                let n = ranking.len() as f64;
                let mean = ranking.values().map(|rs| rs.score).sum::<f64>() / n;
                // Sample standard deviation (n - 1 denominator).
                let std = if ranking.len() > 1 {
                    let squares: f64 = ranking.values().map(|rs| (rs.score - mean).powi(2)).sum();
                    (squares / (n - 1.0)).sqrt()
                } else {
                    0.0
                };
                for rs in ranking.values_mut() {
                    rs.score = if std > 0.0 { offset + (rs.score - mean) / std } else { offset };
                }
            }
        }
    }
}

fn min_max(ranking: &UserRanking) -> (f64, f64) {
    ranking.values().fold((f64::INFINITY, f64::NEG_INFINITY), |(min, max), rs| {
        (min.min(rs.score), max.max(rs.score))
    })
}

impl FromStr for Normalisation {
    type Err = RankFuseError;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        Normalisation::ALL
            .into_iter()
            .find(|norm| norm.name() == name)
            .ok_or_else(|| RankFuseError::UnknownNormalisation(name.to_string()))
    }
}

impl fmt::Display for Normalisation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
