/// Config file loading and creation for the rankfuse CLI.
///
/// Config lives at ~/.config/rankfuse/config.toml.
/// All fields are optional; CLI args override config values.
use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Default, PartialEq)]
pub struct RankfuseConfig {
    pub runs: Option<PathBuf>,
    pub output: Option<PathBuf>,
    pub algorithms: Option<Vec<String>>,
    pub normalisations: Option<Vec<String>>,
    pub max_rank: Option<usize>,
    pub threads: Option<usize>,
    pub stale_marker_secs: Option<u64>,
}

const DEFAULT_CONFIG_TEMPLATE: &str = "\
# rankfuse configuration
# All values here can be overridden by CLI flags.

# Directory holding run-<name>-fold<N>.txt files
# runs = \"/data/runs\"

# Directory the fused rankings are written to (created if missing)
# output = \"/data/fused\"

# Fusion algorithms: borda, condorcet, copeland, combSum, combANZ, combMNZ
# algorithms = [\"borda\", \"combMNZ\"]

# Score normalisations: none, standard, sum, zmuv, zmuv1, zmuv2
# normalisations = [\"none\", \"zmuv\"]

# Items kept per user, both when reading runs and in the fused output
# max_rank = 100

# Worker threads (default: one per core)
# threads = 8

# Reclaim in-progress markers older than this many seconds.
# Leave unset if several machines share the output directory and a job can
# legitimately run longer than any value you would pick.
# stale_marker_secs = 86400
";

/// Returns the default config path: ~/.config/rankfuse/config.toml
pub fn config_path() -> Result<PathBuf> {
    let home = std::env::var("HOME").context("HOME environment variable not set")?;
    Ok(PathBuf::from(home).join(".config").join("rankfuse").join("config.toml"))
}

/// Load config from a file path. Returns default (all None) if file doesn't exist.
pub fn load_config(path: &Path) -> Result<RankfuseConfig> {
    match std::fs::read_to_string(path) {
        Ok(content) => toml::from_str(&content)
            .with_context(|| format!("Failed to parse config at {}", path.display())),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(RankfuseConfig::default()),
        Err(e) => Err(e).with_context(|| format!("Failed to read config at {}", path.display())),
    }
}

/// Create the default config file at `path`. Errors if it already exists.
pub fn create_default_config(path: &Path) -> Result<()> {
    if path.exists() {
        bail!("Config file already exists at {}", path.display());
    }

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory {}", parent.display()))?;
    }

    std::fs::write(path, DEFAULT_CONFIG_TEMPLATE)
        .with_context(|| format!("Failed to write config to {}", path.display()))
}
