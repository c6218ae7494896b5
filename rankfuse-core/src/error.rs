//! Error types for rankfuse-core.
//!
//! Configuration and parse errors abort a whole invocation. Job-level errors
//! are returned from `FusionJob::execute` and, when the job runs on the worker
//! pool, logged and counted instead of propagated.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RankFuseError {
    /// Algorithm name not present in the registry
    #[error("{0} is not a valid fusion algorithm (expected one of: borda, condorcet, copeland, combSum, combANZ, combMNZ)")]
    UnknownAlgorithm(String),

    /// Normalisation name not present in the registry
    #[error("{0} is not a valid normalisation (expected one of: none, standard, sum, zmuv, zmuv1, zmuv2)")]
    UnknownNormalisation(String),

    #[error("Path {} exists and it is not a directory", .0.display())]
    NotADirectory(PathBuf),

    #[error("Cannot choose {k} elements out of {n}")]
    InvalidCombination { n: usize, k: usize },

    /// A run handed to the scheduler belongs to another fold
    #[error("Run {run} belongs to fold {actual}, expected fold {expected}")]
    FoldMismatch {
        run: String,
        expected: u32,
        actual: u32,
    },

    /// Runs of one combination were normalised differently
    #[error("Runs of fold {fold} mix normalisations {first} and {second}")]
    MixedNormalisation {
        fold: u32,
        first: String,
        second: String,
    },

    /// Two combinations of the same fold map to one output file
    #[error("Combinations collide on output file {0}; run names must be unique and unambiguous")]
    KeyCollision(String),

    #[error("Invalid run filename {}: expected run-<name>-fold<N>.txt", .0.display())]
    InvalidRunFilename(PathBuf),

    #[error("Error in line number {line} in file {}: {message}", .path.display())]
    Parse {
        path: PathBuf,
        line: usize,
        message: String,
    },

    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Worker pool error: {0}")]
    Pool(String),
}

impl RankFuseError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        RankFuseError::Io {
            path: path.into(),
            source,
        }
    }

    /// True for errors that must stop the process before any job is scheduled.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            RankFuseError::UnknownAlgorithm(_)
                | RankFuseError::UnknownNormalisation(_)
                | RankFuseError::NotADirectory(_)
                | RankFuseError::InvalidCombination { .. }
                | RankFuseError::FoldMismatch { .. }
                | RankFuseError::MixedNormalisation { .. }
                | RankFuseError::KeyCollision(_)
                | RankFuseError::Pool(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, RankFuseError>;
