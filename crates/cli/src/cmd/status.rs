//! Show working tree status

use anyhow::Result;
use hvrt_core::cancel::CancelToken;
use hvrt_repo::status;
use owo_colors::OwoColorize;

pub fn run() -> Result<()> {
    let worktree = super::current_worktree()?;
    let report = status(&worktree, &CancelToken::new())?;

    if report.is_clean() {
        println!("{}", "working tree clean".green());
        return Ok(());
    }

    if !report.modified.is_empty() {
        println!("{}", "Modified:".bold());
        for path in &report.modified {
            println!("  {} {}", "M".yellow(), path);
        }
        println!();
    }
    if !report.deleted.is_empty() {
        println!("{}", "Deleted:".bold());
        for path in &report.deleted {
            println!("  {} {}", "D".red(), path);
        }
        println!();
    }
    if !report.new.is_empty() {
        println!("{}", "Staged (new):".bold());
        for path in &report.new {
            println!("  {} {}", "A".green(), path);
        }
        println!();
    }
    if !report.unknown.is_empty() {
        println!("{}", "Untracked:".bold());
        for path in &report.unknown {
            println!("  {} {}", "?".dimmed(), path);
        }
    }
    Ok(())
}
