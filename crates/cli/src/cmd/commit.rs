//! Commit staged changes to the repository

use anyhow::Result;
use hvrt_core::cancel::CancelToken;
use hvrt_repo::{commit, CommitOptions};
use owo_colors::OwoColorize;

pub fn run(message: &str, author: &str, committer: Option<&str>, staged_only: bool) -> Result<()> {
    // Only staged-only semantics exist today; the flag is accepted so
    // workflows written for it keep working when auto-staging arrives.
    let _ = staged_only;

    let worktree = super::current_worktree()?;

    let outcome = commit(
        &worktree,
        &CommitOptions {
            message: message.to_string(),
            author: author.to_string(),
            committer: committer.map(str::to_string),
            cancel: CancelToken::new(),
        },
    )?;

    match outcome {
        Some(outcome) => {
            let id_short = &outcome.commit.hex_digest[..12];
            println!(
                "{} [{} {}] {}",
                "✓".green(),
                outcome.branch.cyan(),
                id_short.yellow(),
                message
            );
            println!("  {} tracked paths", outcome.tracked_paths);
        }
        None => println!("{}", "nothing to commit".dimmed()),
    }
    Ok(())
}
