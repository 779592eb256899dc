//! Status engine: compare the working tree against the head tree and the
//! staging area
//!
//! Produces four disjoint path sets, each sorted:
//! - `deleted`: in the head tree, gone from disk
//! - `modified`: in the head tree and on disk with a different blob hash
//! - `new`: on disk and staged, but not yet in the head tree
//! - `unknown`: on disk, not ignored, and neither tracked nor staged
//!
//! Hashing is fanned out across a worker pool sized to the CPU count.

use crate::worktree::Worktree;
use hvrt_core::cancel::CancelToken;
use hvrt_core::chunk::hash_reader;
use hvrt_core::error::{Error, Result};
use hvrt_ignore::{WalkFlow, Walker};
use rayon::prelude::*;
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use tracing::debug;

/// The four disjoint path sets, each sorted by path
#[derive(Debug, Default, PartialEq, Eq)]
pub struct StatusReport {
    pub deleted: Vec<String>,
    pub modified: Vec<String>,
    pub new: Vec<String>,
    pub unknown: Vec<String>,
}

impl StatusReport {
    pub fn is_clean(&self) -> bool {
        self.deleted.is_empty()
            && self.modified.is_empty()
            && self.new.is_empty()
            && self.unknown.is_empty()
    }
}

/// Compute the status of a working tree
pub fn status(worktree: &Worktree, cancel: &CancelToken) -> Result<StatusReport> {
    // Enumerate on-disk candidates through the ignore engine
    let mut walker = Walker::with_cancel(worktree.root(), cancel.clone());
    let mut on_disk: BTreeSet<String> = BTreeSet::new();
    walker.walk(
        Path::new(""),
        &mut |entry| {
            if let Some(err) = &entry.error {
                debug!("unreadable entry {}: {err}", entry.path.display());
                return Ok(WalkFlow::Continue);
            }
            if !entry.is_dir && !entry.is_symlink {
                on_disk.insert(entry.rel_slash());
            }
            Ok(WalkFlow::Continue)
        },
        &mut |_entry| Ok(WalkFlow::Continue),
    )?;

    // Staged entries, keyed by path
    let mut staging = worktree.open_staging()?;
    let staging_tx = staging.read_transaction()?;
    let staged: BTreeMap<String, String> = staging_tx
        .list_staged()?
        .into_iter()
        .map(|f| (f.path, f.blob.hex_digest))
        .collect();
    let head_state = staging_tx.head()?;

    // Head tree members, keyed by path
    let mut head_tree: BTreeMap<String, String> = BTreeMap::new();
    if let Some(head_commit) = head_state.head.as_commit() {
        let mut repo = worktree.open_repo()?;
        let mut repo_tx = repo.transaction()?;
        let record = repo_tx.get_commit(head_commit)?.ok_or_else(|| {
            Error::InvariantViolation(format!(
                "head commit {head_commit} missing from repository"
            ))
        })?;
        for member in repo_tx.get_tree_members(&record.tree)? {
            head_tree.insert(member.path, member.blob.hex_digest);
        }
        repo_tx.rollback()?;
    }

    // Tracked files that were ignored out of the walk still need a look on
    // disk before they count as deleted
    let mut to_hash: BTreeSet<String> = on_disk.clone();
    let mut deleted = Vec::new();
    for path in head_tree.keys() {
        if !on_disk.contains(path) {
            if worktree.root().join(path).is_file() {
                to_hash.insert(path.clone());
            } else {
                deleted.push(path.clone());
            }
        }
    }

    // Fan the hashing out across the worker pool
    let algorithm = worktree.config().chunk.hash_algo;
    let root = worktree.root().to_path_buf();
    let hashes: BTreeMap<String, String> = to_hash
        .par_iter()
        .map(|path| -> Result<(String, String)> {
            cancel.check()?;
            let mut file = std::fs::File::open(root.join(path))?;
            let summary = hash_reader(&mut file, algorithm)?;
            Ok((path.clone(), summary.hash.hex_digest))
        })
        .collect::<Result<_>>()?;

    let mut report = StatusReport {
        deleted,
        ..StatusReport::default()
    };

    for (path, disk_hash) in &hashes {
        match head_tree.get(path) {
            Some(tracked_hash) => {
                if tracked_hash != disk_hash {
                    report.modified.push(path.clone());
                }
            }
            None => {
                if staged.contains_key(path) {
                    report.new.push(path.clone());
                } else {
                    report.unknown.push(path.clone());
                }
            }
        }
    }

    // BTree iteration keeps every set sorted
    Ok(report)
}
