//! Dropping staged entries and marking tracked paths for removal
//!
//! `unstage` takes a change back out of the staging area and leaves the
//! working tree alone; it is the same operation as `rm --staged --keep`.
//! A full `rm` additionally records a removal marker so the next commit
//! drops the path from the tree, and deletes the file from disk unless
//! asked to keep it.

use crate::worktree::Worktree;
use hvrt_core::error::Result;
use hvrt_ignore::walker::rel_to_slash;
use std::path::PathBuf;
use tracing::debug;

#[derive(Debug, Clone, Default)]
pub struct RemoveOptions {
    /// Only remove from the staging area, not from the tree
    pub staged_only: bool,
    /// Leave the on-disk file in place
    pub keep: bool,
}

/// Remove staged entries by path. Returns the paths that were actually
/// staged, in the order given.
pub fn unstage(worktree: &Worktree, paths: &[PathBuf]) -> Result<Vec<String>> {
    remove(
        worktree,
        paths,
        &RemoveOptions {
            staged_only: true,
            keep: true,
        },
    )
}

/// Remove paths from staging and, unless `staged_only`, from the tracked
/// tree at the next commit
pub fn remove(
    worktree: &Worktree,
    paths: &[PathBuf],
    options: &RemoveOptions,
) -> Result<Vec<String>> {
    let mut staging = worktree.open_staging()?;
    let tx = staging.transaction()?;

    let mut affected = Vec::new();
    for given in paths {
        let rel = worktree.rel_path(given)?;
        let slash_path = rel_to_slash(&rel);

        let was_staged = tx.unstage_file(&slash_path)?;
        if options.staged_only {
            if was_staged {
                affected.push(slash_path);
            }
            continue;
        }

        tx.mark_removed(&slash_path)?;
        affected.push(slash_path.clone());

        if !options.keep {
            let absolute = worktree.root().join(&rel);
            match std::fs::remove_file(&absolute) {
                Ok(()) => debug!("deleted {slash_path} from disk"),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => return Err(e.into()),
            }
        }
    }

    tx.commit()?;
    Ok(affected)
}
