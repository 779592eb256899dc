//! Initialize a repository and worktree

use anyhow::Result;
use hvrt_repo::{init, InitOptions};
use owo_colors::OwoColorize;
use std::path::Path;

pub fn run(bare: bool, default_branch: &str, path: Option<&Path>) -> Result<()> {
    let target = match path {
        Some(path) => path.to_path_buf(),
        None => std::env::current_dir()?,
    };

    init(
        &target,
        &InitOptions {
            bare,
            default_branch: default_branch.to_string(),
        },
    )?;

    if bare {
        println!(
            "{} Initialized bare Havarti repository in {}",
            "✓".green(),
            target.display()
        );
    } else {
        println!(
            "{} Initialized Havarti repository in {}",
            "✓".green(),
            target.join(".hvrt").display()
        );
        println!("  Default branch: {}", default_branch.cyan());
    }
    Ok(())
}
