/// Reading TREC run files from disk.
///
/// A run file is named `run-<name>-fold<N>.txt` and holds one line per
/// recommended item: `user Q0 item rank score [label]`. Users may be spread
/// over several non-contiguous blocks.
use std::collections::{BTreeMap, HashMap};
use std::fs::{self, File};
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;

use rayon::prelude::*;
use tracing::{debug, info, warn};

use crate::constants::{FOLD_MARKER, RUN_FILE_EXTENSION, RUN_FILE_PREFIX};
use crate::error::{RankFuseError, Result};
use crate::normalisation::Normalisation;
use crate::run::Run;
use crate::types::{RankScore, UserId, UserRanking};

/// Split a run filename into its run name and fold.
///
/// `run-<name>-fold<N>.txt` with a non-empty name and a decimal fold. The
/// name is everything between the prefix and the last `-fold`, so it may
/// itself contain hyphens.
pub fn parse_run_filename(file_name: &str) -> Option<(String, u32)> {
    let stem = file_name
        .strip_prefix(RUN_FILE_PREFIX)?
        .strip_suffix(RUN_FILE_EXTENSION)?
        .strip_suffix('.')?;
    let split = stem.rfind(FOLD_MARKER)?;
    let (name, fold) = (&stem[..split], &stem[split + FOLD_MARKER.len()..]);

    if name.is_empty() || fold.is_empty() || !fold.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    Some((name.to_string(), fold.parse().ok()?))
}

fn field<T: FromStr>(fields: &[&str], idx: usize, what: &str) -> std::result::Result<T, String> {
    fields[idx]
        .parse()
        .map_err(|_| format!("invalid {what} '{}'", fields[idx]))
}

/// Read one run file, keep entries with `rank < max_rank`, and normalise
/// each user's scores.
pub fn read_run(path: &Path, max_rank: usize, normalisation: Normalisation) -> Result<Run> {
    let file_name = path.file_name().and_then(|n| n.to_str()).unwrap_or_default();
    let (name, fold) = parse_run_filename(file_name)
        .ok_or_else(|| RankFuseError::InvalidRunFilename(path.to_path_buf()))?;

    info!("Reading {file_name} (norm {normalisation})");

    let file = File::open(path).map_err(|e| RankFuseError::io(path, e))?;
    let mut rankings: HashMap<UserId, UserRanking> = HashMap::new();

    for (idx, line) in BufReader::new(file).lines().enumerate() {
        let line_no = idx + 1;
        let line = line.map_err(|e| RankFuseError::io(path, e))?;
        let fields: Vec<&str> = line.split_whitespace().collect();
        if fields.is_empty() {
            continue;
        }

        let parse_error = |message: String| RankFuseError::Parse {
            path: path.to_path_buf(),
            line: line_no,
            message,
        };
        if fields.len() < 5 {
            return Err(parse_error(format!("expected at least 5 fields, found {}", fields.len())));
        }

        let user: UserId = field(&fields, 0, "user").map_err(parse_error)?;
        let item = field(&fields, 2, "item").map_err(parse_error)?;
        let rank: usize = field(&fields, 3, "rank").map_err(parse_error)?;
        let score: f64 = field(&fields, 4, "score").map_err(parse_error)?;
        if !score.is_finite() {
            return Err(parse_error(format!("score '{}' is not finite", fields[4])));
        }

        if rank >= max_rank {
            continue;
        }

        let previous = rankings
            .entry(user)
            .or_default()
            .insert(item, RankScore::new(rank, score));
        if previous.is_some() {
            warn!("{file_name}:{line_no}: item {item} repeated for user {user}, keeping the later entry");
        }
    }

    for ranking in rankings.values_mut() {
        normalisation.apply(ranking);
    }

    let run = Run::new(name, fold, normalisation, rankings);
    debug!("Read {run}");
    Ok(run)
}

/// Read every run file in `dir`, grouped by fold.
///
/// Files are parsed in parallel. Within a fold, runs are sorted by name.
/// Files that do not match the run filename pattern are ignored; any parse
/// error aborts the whole read.
pub fn read_runs(
    dir: &Path,
    max_rank: usize,
    normalisation: Normalisation,
) -> Result<BTreeMap<u32, Vec<Arc<Run>>>> {
    if dir.exists() && !dir.is_dir() {
        return Err(RankFuseError::NotADirectory(dir.to_path_buf()));
    }

    let mut paths: Vec<PathBuf> = Vec::new();
    for entry in fs::read_dir(dir).map_err(|e| RankFuseError::io(dir, e))? {
        let path = entry.map_err(|e| RankFuseError::io(dir, e))?.path();
        let matches = path.is_file()
            && path.file_name()
                .and_then(|n| n.to_str())
                .and_then(parse_run_filename)
                .is_some();
        if matches {
            paths.push(path);
        } else {
            debug!("Ignoring {}", path.display());
        }
    }

    let runs: Vec<Run> = paths
        .par_iter()
        .map(|path| read_run(path, max_rank, normalisation))
        .collect::<Result<_>>()?;

    let mut by_fold: BTreeMap<u32, Vec<Arc<Run>>> = BTreeMap::new();
    for run in runs {
        by_fold.entry(run.fold()).or_default().push(Arc::new(run));
    }
    for fold_runs in by_fold.values_mut() {
        fold_runs.sort_by(|a, b| a.name().cmp(b.name()));
    }

    info!(
        "Read {} runs in {} folds from {}",
        by_fold.values().map(Vec::len).sum::<usize>(),
        by_fold.len(),
        dir.display()
    );
    Ok(by_fold)
}
