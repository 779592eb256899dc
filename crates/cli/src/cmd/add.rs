//! Stage files for the next commit

use anyhow::Result;
use hvrt_repo::{add, AddOptions};
use owo_colors::OwoColorize;
use std::path::PathBuf;

pub fn run(force: bool, paths: &[PathBuf]) -> Result<()> {
    let worktree = super::current_worktree()?;

    let outcome = add(
        &worktree,
        paths,
        &AddOptions {
            force,
            ..AddOptions::default()
        },
    )?;

    for path in &outcome.staged {
        println!("{} {}", "staged".green(), path);
    }
    for path in &outcome.skipped_ignored {
        println!(
            "{} {} {}",
            "ignored".yellow(),
            path,
            "(use --force to stage)".dimmed()
        );
    }

    if outcome.staged.is_empty() && outcome.skipped_ignored.is_empty() {
        println!("{}", "nothing to add".dimmed());
    }
    Ok(())
}
