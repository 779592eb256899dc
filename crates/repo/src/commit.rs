//! The commit coordinator: promote staged state into the object store
//!
//! Two databases take part and they cannot share a transaction, so the
//! ordering carries the crash-consistency guarantee: every object write is
//! idempotent on its content address, the object-store transaction commits
//! first, and only then does the staging transaction commit. A crash
//! between the two leaves staged rows behind, and the next commit replays
//! them into the same identities.

use crate::worktree::{now_rfc3339, Worktree};
use hvrt_core::cancel::CancelToken;
use hvrt_core::commit::{
    Commit, CommitHeaders, HEADER_AUTHOR, HEADER_COMMITTER, HEADER_MESSAGE, HEADER_PARENT,
    HEADER_TIMESTAMP,
};
use hvrt_core::error::{Error, Result};
use hvrt_core::hash::HashValue;
use hvrt_core::tree::{Tree, TreeMember};
use hvrt_store::{RefTarget, RepoTransaction, StagingTransaction};
use std::collections::BTreeMap;
use tracing::{debug, warn};

#[derive(Debug, Clone, Default)]
pub struct CommitOptions {
    pub message: String,
    pub author: String,
    /// Defaults to the author when empty
    pub committer: Option<String>,
    pub cancel: CancelToken,
}

/// A successful commit
#[derive(Debug, Clone)]
pub struct CommitOutcome {
    pub commit: HashValue,
    pub tree: HashValue,
    pub branch: String,
    /// Number of tracked paths in the new tree
    pub tracked_paths: usize,
}

/// Promote the staging area into a new commit on the current branch
///
/// Returns `Ok(None)` when nothing is staged; no commit object is created
/// and neither database is touched.
pub fn commit(worktree: &Worktree, options: &CommitOptions) -> Result<Option<CommitOutcome>> {
    if options.author.is_empty() {
        return Err(Error::Argument("commit author must not be empty".into()));
    }
    if options.message.is_empty() {
        return Err(Error::Argument("commit message must not be empty".into()));
    }

    let mut staging = worktree.open_staging()?;
    let staging_tx = staging.transaction()?;

    let staged_files = staging_tx.list_staged()?;
    let removals = staging_tx.list_removals()?;
    if staged_files.is_empty() && removals.is_empty() {
        return Ok(None);
    }

    let mut repo = worktree.open_repo()?;
    let mut repo_tx = repo.transaction()?;

    let outcome = match build_commit(
        worktree,
        &staging_tx,
        &mut *repo_tx,
        &staged_files,
        &removals,
        options,
    ) {
        Ok(outcome) => outcome,
        Err(err) => {
            // Roll both sides back; neither store keeps partial state
            if let Err(rb) = repo_tx.rollback() {
                warn!("object store rollback failed: {rb}");
            }
            if let Err(rb) = staging_tx.rollback() {
                warn!("staging rollback failed: {rb}");
            }
            return Err(err);
        }
    };

    // Object store first. Once it lands, the commit exists; the staging
    // commit below only drains local state.
    repo_tx.commit()?;
    if let Err(err) = staging_tx.commit() {
        // Not fatal: the staged rows replay idempotently into the same
        // identities on the next invocation.
        warn!("staging cleanup failed after object store commit (will replay safely): {err}");
    }

    Ok(Some(outcome))
}

fn build_commit(
    worktree: &Worktree,
    staging_tx: &StagingTransaction<'_>,
    repo_tx: &mut dyn RepoTransaction,
    staged_files: &[hvrt_store::StagedFile],
    removals: &[String],
    options: &CommitOptions,
) -> Result<CommitOutcome> {
    let cancel = &options.cancel;
    let algorithm = worktree.config().chunk.hash_algo;

    // Chunks, then blobs, then edges; each transfer is an idempotent no-op
    // for rows the repository already holds.
    for chunk in staging_tx.read_chunks()? {
        cancel.check()?;
        if repo_tx.exists_chunk(&chunk.hash)? {
            continue;
        }
        repo_tx.put_chunk(&chunk.hash, chunk.compression.as_str(), &chunk.data)?;
    }
    for blob in staging_tx.read_blobs()? {
        cancel.check()?;
        if repo_tx.exists_blob(&blob.hash)? {
            continue;
        }
        repo_tx.put_blob(&blob.hash, blob.byte_length)?;
    }
    for edge in staging_tx.read_blob_chunks()? {
        cancel.check()?;
        repo_tx.put_blob_chunk(&edge.blob, &edge.chunk, edge.start_byte, edge.end_byte)?;
    }

    // Layer the staged diff over the head commit's tree
    let head_state = staging_tx.head()?;
    let mut members: BTreeMap<String, TreeMember> = BTreeMap::new();
    if let Some(head_commit) = head_state.head.as_commit() {
        let record = repo_tx.get_commit(head_commit)?.ok_or_else(|| {
            Error::InvariantViolation(format!(
                "head commit {head_commit} missing from repository"
            ))
        })?;
        for member in repo_tx.get_tree_members(&record.tree)? {
            members.insert(member.path.clone(), member);
        }
    }
    for staged in staged_files {
        members.insert(
            staged.path.clone(),
            TreeMember {
                path: staged.path.clone(),
                file_id: staged.blob.clone(),
                blob: staged.blob.clone(),
            },
        );
    }
    for removed in removals {
        members.remove(removed);
    }

    // BTreeMap iteration already yields members in sorted path order
    let tree = Tree::from_members(members.into_values().collect());
    let tree_id = tree.hash(algorithm);
    cancel.check()?;
    repo_tx.put_tree(&tree_id, tree.members())?;

    // Commit headers: author, committer, timestamp, message, one parent
    // per non-sentinel head
    let committer = options
        .committer
        .as_deref()
        .filter(|c| !c.is_empty())
        .unwrap_or(&options.author);
    let timestamp = now_rfc3339();

    let mut headers = CommitHeaders::new();
    headers.insert(HEADER_AUTHOR, &options.author);
    headers.insert(HEADER_COMMITTER, committer);
    headers.insert(HEADER_TIMESTAMP, &timestamp);
    headers.insert(HEADER_MESSAGE, &options.message);

    let mut parents = Vec::new();
    if let Some(head_commit) = head_state.head.as_commit() {
        headers.insert(HEADER_PARENT, head_commit.to_string());
        parents.push(head_commit.clone());
    }

    let commit_value = Commit::new(headers, tree);
    let commit_id = commit_value.hash(algorithm);
    cancel.check()?;
    repo_tx.put_commit(
        &commit_id,
        &tree_id,
        &options.author,
        committer,
        &options.message,
        &timestamp,
        &parents,
    )?;

    // Compare-and-swap the branch head; a concurrent commit that got
    // there first surfaces as Conflict and unwinds both transactions
    let new_target = RefTarget::Commit(commit_id.clone());
    repo_tx.update_ref(&head_state.branch, &head_state.head, &new_target)?;

    // Drain staging and advance the worktree's view of the branch
    staging_tx.clear_all_staging()?;
    staging_tx.set_head(&head_state.branch, &new_target)?;

    debug!(
        "commit {} on '{}' ({} paths)",
        commit_id, head_state.branch, commit_value.tree.len()
    );

    Ok(CommitOutcome {
        tracked_paths: commit_value.tree.len(),
        commit: commit_id,
        tree: tree_id,
        branch: head_state.branch,
    })
}
