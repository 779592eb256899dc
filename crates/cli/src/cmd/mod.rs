//! CLI command implementations

pub mod add;
pub mod commit;
pub mod init;
pub mod rm;
pub mod status;
pub mod unstage;

use anyhow::{Context, Result};
use hvrt_repo::Worktree;

/// Open the worktree containing the current directory
pub fn current_worktree() -> Result<Worktree> {
    let cwd = std::env::current_dir().context("failed to get current directory")?;
    Ok(Worktree::discover(&cwd)?)
}
