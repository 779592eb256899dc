//! Worktree configuration
//!
//! `.hvrt/config.toml` carries the closed option set the core consumes.
//! Configuration is loaded once per invocation and treated as immutable;
//! re-reading mid-operation is forbidden.

use crate::compress::CompressionAlgorithm;
use crate::error::{Error, Result};
use crate::hash::HashAlgorithm;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;

/// Name of the metadata directory under the working tree root
pub const METADATA_DIR: &str = ".hvrt";
/// Staging database file name inside the metadata directory
pub const WORKTREE_DB_NAME: &str = "work_tree_state.sqlite";
/// Repository database file name when stored inside the metadata directory
pub const REPO_DB_NAME: &str = "repo.hvrt";
/// Configuration file name inside the metadata directory
pub const CONFIG_FILE_NAME: &str = "config.toml";

/// Variable recognized in `worktree.repo.uri`
pub const WORK_TREE_VAR: &str = "${HVRT_WORK_TREE}";

/// Supported repository database engines
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RepoEngine {
    #[serde(rename = "sqlite")]
    Sqlite,
    #[serde(rename = "postgres")]
    Postgres,
}

impl RepoEngine {
    pub fn as_str(&self) -> &'static str {
        match self {
            RepoEngine::Sqlite => "sqlite",
            RepoEngine::Postgres => "postgres",
        }
    }
}

impl FromStr for RepoEngine {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "sqlite" => Ok(RepoEngine::Sqlite),
            "postgres" => Ok(RepoEngine::Postgres),
            other => Err(Error::Argument(format!("unknown repo engine '{other}'"))),
        }
    }
}

impl fmt::Display for RepoEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkConfig {
    #[serde(default = "default_chunk_size")]
    pub size_bytes: usize,
    #[serde(default)]
    pub hash_algo: HashAlgorithm,
    #[serde(default)]
    pub compression: CompressionAlgorithm,
}

impl Default for ChunkConfig {
    fn default() -> Self {
        Self {
            size_bytes: default_chunk_size(),
            hash_algo: HashAlgorithm::default(),
            compression: CompressionAlgorithm::default(),
        }
    }
}

fn default_chunk_size() -> usize {
    crate::chunk::DEFAULT_CHUNK_SIZE
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RepoConfig {
    #[serde(rename = "type")]
    pub engine: RepoEngine,
    pub uri: String,
}

impl Default for RepoConfig {
    fn default() -> Self {
        Self {
            engine: RepoEngine::Sqlite,
            uri: format!("{WORK_TREE_VAR}/{METADATA_DIR}/{REPO_DB_NAME}"),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WorktreeConfig {
    #[serde(default)]
    pub repo: RepoConfig,
}

/// The full configuration value for one invocation
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub chunk: ChunkConfig,
    #[serde(default)]
    pub worktree: WorktreeConfig,
}

impl Config {
    /// Load from a `config.toml` file
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                Error::NotFound(format!("config file {}", path.display()))
            } else {
                Error::Io(e)
            }
        })?;
        toml::from_str(&text).map_err(|e| Error::Argument(format!("invalid config: {e}")))
    }

    /// Write to a `config.toml` file
    pub fn save(&self, path: &Path) -> Result<()> {
        let text = toml::to_string_pretty(self)
            .map_err(|e| Error::InvariantViolation(format!("config serialization: {e}")))?;
        std::fs::write(path, text)?;
        Ok(())
    }

    /// The repo URI with `${HVRT_WORK_TREE}` expanded against the given root
    pub fn repo_uri(&self, work_tree: &Path) -> String {
        self.worktree
            .repo
            .uri
            .replace(WORK_TREE_VAR, &work_tree.to_string_lossy())
    }
}
