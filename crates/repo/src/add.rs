//! Staging files: the `add` pipeline
//!
//! Walks the requested paths, runs each file through the two-pass
//! hash-and-chunk pipeline, compresses every chunk, and records the
//! results in the staging store. The whole batch shares one immediate
//! transaction; any failure rolls the entire batch back.

use crate::worktree::{now_epoch, Worktree};
use hvrt_core::cancel::CancelToken;
use hvrt_core::chunk::chunk_file;
use hvrt_core::error::Result;
use hvrt_ignore::{WalkFlow, Walker};
use hvrt_store::StagingTransaction;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::debug;

#[derive(Debug, Clone, Default)]
pub struct AddOptions {
    /// Stage explicitly named paths even when ignore rules match them.
    /// Does not apply to files found by directory expansion.
    pub force: bool,
    pub cancel: CancelToken,
}

/// What an `add` invocation did
#[derive(Debug, Default)]
pub struct AddOutcome {
    /// Paths staged, in walk order
    pub staged: Vec<String>,
    /// Paths skipped because ignore rules matched and `force` was not set
    pub skipped_ignored: Vec<String>,
}

/// Stage the given files and directory trees
pub fn add(worktree: &Worktree, paths: &[PathBuf], options: &AddOptions) -> Result<AddOutcome> {
    let mut outcome = AddOutcome::default();
    let candidates = expand_paths(worktree, paths, options, &mut outcome)?;

    let mut staging = worktree.open_staging()?;
    let tx = staging.transaction()?;

    for rel_path in &candidates {
        options.cancel.check()?;
        stage_one(worktree, &tx, rel_path, &options.cancel)?;
        outcome
            .staged
            .push(hvrt_ignore::walker::rel_to_slash(rel_path));
    }

    tx.commit()?;
    Ok(outcome)
}

/// Resolve arguments into worktree-relative file paths, in deterministic
/// walk order. Directories expand through the ignore-aware walker; files
/// named directly are checked against ignore rules unless forced.
fn expand_paths(
    worktree: &Worktree,
    paths: &[PathBuf],
    options: &AddOptions,
    outcome: &mut AddOutcome,
) -> Result<Vec<PathBuf>> {
    let mut walker = Walker::with_cancel(worktree.root(), options.cancel.clone());
    let mut candidates: Vec<PathBuf> = Vec::new();

    for given in paths {
        let rel = worktree.rel_path(given)?;
        let absolute = worktree.root().join(&rel);
        let metadata = std::fs::symlink_metadata(&absolute)?;

        if !metadata.is_dir() {
            if walker.is_ignored(&rel, false) && !options.force {
                outcome
                    .skipped_ignored
                    .push(hvrt_ignore::walker::rel_to_slash(&rel));
                continue;
            }
            candidates.push(rel);
            continue;
        }

        walker.walk(
            &rel,
            &mut |entry| {
                if let Some(err) = &entry.error {
                    debug!("skipping unreadable entry {}: {err}", entry.path.display());
                    return Ok(WalkFlow::Continue);
                }
                if !entry.is_dir && !entry.is_symlink {
                    candidates.push(entry.rel_path.clone());
                }
                Ok(WalkFlow::Continue)
            },
            &mut |_entry| Ok(WalkFlow::Continue),
        )?;
    }

    // Overlapping arguments (a directory given twice, or a file named both
    // directly and through its directory) produce non-adjacent duplicates;
    // keep the first occurrence so each file is staged once, in walk order.
    let mut seen = HashSet::new();
    candidates.retain(|path| seen.insert(path.clone()));
    Ok(candidates)
}

/// Hash, chunk, compress, and stage a single file
fn stage_one(
    worktree: &Worktree,
    tx: &StagingTransaction<'_>,
    rel_path: &Path,
    cancel: &CancelToken,
) -> Result<()> {
    let config = worktree.config();
    let absolute = worktree.root().join(rel_path);
    let slash_path = hvrt_ignore::walker::rel_to_slash(rel_path);

    let (summary, chunker) = chunk_file(
        &absolute,
        config.chunk.hash_algo,
        config.chunk.size_bytes,
        cancel.clone(),
    )?;

    tx.stage_blob(&summary.hash, summary.length)?;
    tx.stage_file(&slash_path, &summary.hash, summary.length, now_epoch())?;

    for record in chunker {
        let record = record?;
        let compressed = config.chunk.compression.compress(&record.data)?;
        tx.stage_chunk(&record.hash, config.chunk.compression, &compressed)?;
        tx.stage_blob_chunk(
            &summary.hash,
            &record.hash,
            record.start_byte,
            record.end_byte,
        )?;
    }

    debug!("staged {slash_path} as {}", summary.hash);
    Ok(())
}
