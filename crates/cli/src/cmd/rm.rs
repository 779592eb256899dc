//! Remove files from tracking

use anyhow::Result;
use hvrt_repo::{remove, RemoveOptions};
use owo_colors::OwoColorize;
use std::path::PathBuf;

pub fn run(staged: bool, keep: bool, paths: &[PathBuf]) -> Result<()> {
    let worktree = super::current_worktree()?;

    let affected = remove(
        &worktree,
        paths,
        &RemoveOptions {
            staged_only: staged,
            keep: keep || staged,
        },
    )?;

    for path in &affected {
        println!("{} {}", "removed".green(), path);
    }
    if affected.is_empty() {
        println!("{}", "nothing to remove".dimmed());
    }
    Ok(())
}
