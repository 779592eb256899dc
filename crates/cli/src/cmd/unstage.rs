//! Take changes back out of the staging area

use anyhow::Result;
use hvrt_repo::unstage;
use owo_colors::OwoColorize;
use std::path::PathBuf;

pub fn run(paths: &[PathBuf]) -> Result<()> {
    let worktree = super::current_worktree()?;

    let removed = unstage(&worktree, paths)?;
    for path in &removed {
        println!("{} {}", "unstaged".green(), path);
    }
    if removed.is_empty() {
        println!("{}", "nothing was staged".dimmed());
    }
    Ok(())
}
