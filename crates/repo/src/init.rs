//! Repository and worktree initialization

use crate::DEFAULT_BRANCH;
use hvrt_core::config::{Config, CONFIG_FILE_NAME, METADATA_DIR, REPO_DB_NAME};
use hvrt_core::error::{Error, Result};
use hvrt_store::{init_repo, StagingStore};
use std::path::Path;
use tracing::info;

#[derive(Debug, Clone)]
pub struct InitOptions {
    /// Only create the repository database, no worktree state
    pub bare: bool,
    pub default_branch: String,
}

impl Default for InitOptions {
    fn default() -> Self {
        Self {
            bare: false,
            default_branch: DEFAULT_BRANCH.to_string(),
        }
    }
}

/// Initialize a repository at `target`
///
/// The default layout puts everything under `target/.hvrt/`: the repository
/// database, the staging database, and `config.toml`. With `bare` only the
/// repository database is created, directly inside `target`.
pub fn init(target: &Path, options: &InitOptions) -> Result<()> {
    std::fs::create_dir_all(target)?;
    let config = Config::default();

    if options.bare {
        let repo_path = target.join(REPO_DB_NAME);
        init_repo(
            config.worktree.repo.engine,
            &repo_path.to_string_lossy(),
            &options.default_branch,
        )?;
        info!("initialized bare repository at {}", repo_path.display());
        return Ok(());
    }

    let metadata_dir = target.join(METADATA_DIR);
    if metadata_dir.exists() {
        return Err(Error::Conflict(format!(
            "repository already initialized at {}",
            target.display()
        )));
    }
    std::fs::create_dir(&metadata_dir)?;

    let repo_uri = config.repo_uri(target);
    init_repo(
        config.worktree.repo.engine,
        &repo_uri,
        &options.default_branch,
    )?;
    StagingStore::create(target, &options.default_branch)?;
    config.save(&metadata_dir.join(CONFIG_FILE_NAME))?;

    info!(
        "initialized repository at {} on branch '{}'",
        target.display(),
        options.default_branch
    );
    Ok(())
}
