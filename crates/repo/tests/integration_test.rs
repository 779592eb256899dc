//! End-to-end workflows over real temp-dir repositories

use hvrt_core::cancel::CancelToken;
use hvrt_core::compress::CompressionAlgorithm;
use hvrt_core::error::Error;
use hvrt_core::hash::{hash_bytes, HashAlgorithm, HashValue, ObjectKind};
use hvrt_repo::{
    add, commit, init, remove, status, unstage, AddOptions, CommitOptions, InitOptions,
    RemoveOptions, Worktree,
};
use hvrt_store::{RefTarget, RepoStore, StagingStore};
use std::path::{Path, PathBuf};

fn init_worktree() -> (tempfile::TempDir, Worktree) {
    let temp_dir = tempfile::tempdir().unwrap();
    init(temp_dir.path(), &InitOptions::default()).unwrap();
    let worktree = Worktree::open(temp_dir.path()).unwrap();
    (temp_dir, worktree)
}

fn write_file(worktree: &Worktree, rel: &str, contents: &[u8]) -> PathBuf {
    let path = worktree.root().join(rel);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(&path, contents).unwrap();
    path
}

fn add_paths(worktree: &Worktree, paths: &[PathBuf]) -> hvrt_repo::AddOutcome {
    add(worktree, paths, &AddOptions::default()).unwrap()
}

fn commit_msg(worktree: &Worktree, message: &str) -> Option<hvrt_repo::CommitOutcome> {
    commit(
        worktree,
        &CommitOptions {
            message: message.into(),
            author: "tester@example.com".into(),
            committer: None,
            cancel: CancelToken::new(),
        },
    )
    .unwrap()
}

fn open_repo_db(worktree: &Worktree) -> hvrt_store::sqlite::SqliteRepoStore {
    hvrt_store::sqlite::SqliteRepoStore::open(
        Path::new(&worktree.config().repo_uri(worktree.root())),
    )
    .unwrap()
}

#[test]
fn test_fresh_repo_status_is_empty() {
    let (_temp_dir, worktree) = init_worktree();

    let report = status(&worktree, &CancelToken::new()).unwrap();
    assert!(report.is_clean());
    assert!(report.deleted.is_empty());
    assert!(report.modified.is_empty());
    assert!(report.new.is_empty());
    assert!(report.unknown.is_empty());
}

#[test]
fn test_add_single_file_stages_one_entry() {
    let (_temp_dir, worktree) = init_worktree();
    let contents = b"blah blah blah";
    let path = write_file(&worktree, "dummy.txt", contents);

    let outcome = add_paths(&worktree, &[path]);
    assert_eq!(outcome.staged, vec!["dummy.txt"]);

    let mut staging = StagingStore::open(worktree.root()).unwrap();
    let tx = staging.read_transaction().unwrap();

    let staged = tx.list_staged().unwrap();
    assert_eq!(staged.len(), 1);
    assert_eq!(staged[0].path, "dummy.txt");
    assert_eq!(staged[0].byte_length, 14);
    assert_eq!(
        staged[0].blob.hex_digest,
        hash_bytes(HashAlgorithm::Sha3_256, contents)
    );

    // a 14-byte file fits one 8 KiB chunk
    let chunks = tx.read_chunks().unwrap();
    assert_eq!(chunks.len(), 1);
    let edges = tx.read_blob_chunks().unwrap();
    assert_eq!(edges.len(), 1);
    assert_eq!((edges[0].start_byte, edges[0].end_byte), (0, 13));
}

#[test]
fn test_add_20kib_file_makes_three_chunks() {
    let (_temp_dir, worktree) = init_worktree();
    let contents: Vec<u8> = (0..20 * 1024u32).map(|i| (i % 251) as u8).collect();
    let path = write_file(&worktree, "big.bin", &contents);

    add_paths(&worktree, &[path]);

    let mut staging = StagingStore::open(worktree.root()).unwrap();
    let tx = staging.read_transaction().unwrap();

    let edges = tx.read_blob_chunks().unwrap();
    let ranges: Vec<(u64, u64)> = edges.iter().map(|e| (e.start_byte, e.end_byte)).collect();
    assert_eq!(ranges, vec![(0, 8191), (8192, 16383), (16384, 20479)]);

    // decompress and reassemble by start_byte order
    let chunks = tx.read_chunks().unwrap();
    let mut reassembled = Vec::new();
    for edge in &edges {
        let chunk = chunks
            .iter()
            .find(|c| c.hash == edge.chunk)
            .expect("edge references staged chunk");
        reassembled.extend(CompressionAlgorithm::Zstd.decompress(&chunk.data).unwrap());
    }
    assert_eq!(reassembled, contents);

    // recomputed blob hash matches the stored one
    let staged = tx.list_staged().unwrap();
    assert_eq!(
        staged[0].blob.hex_digest,
        hash_bytes(HashAlgorithm::Sha3_256, &contents)
    );
}

#[test]
fn test_re_add_same_path_replaces_entry() {
    let (_temp_dir, worktree) = init_worktree();
    let path = write_file(&worktree, "file.txt", b"first");
    add_paths(&worktree, &[path.clone()]);

    std::fs::write(&path, b"second version").unwrap();
    add_paths(&worktree, &[path]);

    let mut staging = StagingStore::open(worktree.root()).unwrap();
    let tx = staging.read_transaction().unwrap();
    let staged = tx.list_staged().unwrap();
    assert_eq!(staged.len(), 1);
    assert_eq!(
        staged[0].blob.hex_digest,
        hash_bytes(HashAlgorithm::Sha3_256, b"second version")
    );
}

#[test]
fn test_add_directory_expands_recursively_sorted() {
    let (_temp_dir, worktree) = init_worktree();
    write_file(&worktree, "src/b.rs", b"b");
    write_file(&worktree, "src/a/deep.rs", b"d");
    write_file(&worktree, "src/z.rs", b"z");

    let outcome = add_paths(&worktree, &[worktree.root().join("src")]);
    assert_eq!(outcome.staged, vec!["src/a/deep.rs", "src/b.rs", "src/z.rs"]);
}

#[test]
fn test_overlapping_add_arguments_stage_each_file_once() {
    let (_temp_dir, worktree) = init_worktree();
    let direct = write_file(&worktree, "src/a.rs", b"a");
    write_file(&worktree, "src/b.rs", b"b");

    // the same directory twice, plus a file inside it named directly
    let outcome = add_paths(
        &worktree,
        &[
            worktree.root().join("src"),
            direct,
            worktree.root().join("src"),
        ],
    );
    assert_eq!(outcome.staged, vec!["src/a.rs", "src/b.rs"]);

    let mut staging = StagingStore::open(worktree.root()).unwrap();
    let tx = staging.read_transaction().unwrap();
    assert_eq!(tx.list_staged().unwrap().len(), 2);
}

#[test]
fn test_commit_promotes_staging_into_repository() {
    let (_temp_dir, worktree) = init_worktree();
    let contents = b"blah blah blah";
    let path = write_file(&worktree, "dummy.txt", contents);
    add_paths(&worktree, &[path]);

    let outcome = commit_msg(&worktree, "m").expect("commit created");
    assert_eq!(outcome.branch, "trunk");
    assert_eq!(outcome.tracked_paths, 1);

    // trunk points at the new commit
    let mut repo = open_repo_db(&worktree);
    let mut tx = repo.transaction().unwrap();
    assert_eq!(
        tx.get_ref("trunk").unwrap(),
        Some(RefTarget::Commit(outcome.commit.clone()))
    );

    // the commit's tree has exactly one member
    let record = tx.get_commit(&outcome.commit).unwrap().unwrap();
    assert_eq!(record.author, "tester@example.com");
    assert_eq!(record.committer, "tester@example.com");
    assert_eq!(record.message, "m");
    assert!(record.parents.is_empty());

    let members = tx.get_tree_members(&record.tree).unwrap();
    assert_eq!(members.len(), 1);
    assert_eq!(members[0].path, "dummy.txt");
    assert_eq!(
        members[0].blob.hex_digest,
        hash_bytes(HashAlgorithm::Sha3_256, contents)
    );
    drop(tx);

    // staging drained
    let mut staging = StagingStore::open(worktree.root()).unwrap();
    let stx = staging.read_transaction().unwrap();
    assert!(stx.list_staged().unwrap().is_empty());
    assert!(stx.read_chunks().unwrap().is_empty());

    // working tree reads clean
    let report = status(&worktree, &CancelToken::new()).unwrap();
    assert!(report.is_clean());
}

#[test]
fn test_commit_with_nothing_staged_is_a_noop() {
    let (_temp_dir, worktree) = init_worktree();
    let path = write_file(&worktree, "dummy.txt", b"contents");
    add_paths(&worktree, &[path]);
    let first = commit_msg(&worktree, "first").expect("commit created");

    // re-running with an empty staging area does nothing
    assert!(commit_msg(&worktree, "again").is_none());

    let mut repo = open_repo_db(&worktree);
    let mut tx = repo.transaction().unwrap();
    assert_eq!(
        tx.get_ref("trunk").unwrap(),
        Some(RefTarget::Commit(first.commit))
    );
}

#[test]
fn test_second_commit_has_first_as_parent() {
    let (_temp_dir, worktree) = init_worktree();
    let path = write_file(&worktree, "a.txt", b"one");
    add_paths(&worktree, &[path]);
    let first = commit_msg(&worktree, "first").unwrap();

    let path = write_file(&worktree, "b.txt", b"two");
    add_paths(&worktree, &[path]);
    let second = commit_msg(&worktree, "second").unwrap();

    let mut repo = open_repo_db(&worktree);
    let mut tx = repo.transaction().unwrap();
    let record = tx.get_commit(&second.commit).unwrap().unwrap();
    assert_eq!(record.parents, vec![first.commit]);

    // the second tree layers over the first
    let members = tx.get_tree_members(&record.tree).unwrap();
    let paths: Vec<&str> = members.iter().map(|m| m.path.as_str()).collect();
    assert_eq!(paths, vec!["a.txt", "b.txt"]);
}

#[test]
fn test_ignored_file_skipped_unless_forced() {
    let (_temp_dir, worktree) = init_worktree();
    write_file(&worktree, ".hvrtignore", b"*.tmp\n");
    let path = write_file(&worktree, "x.tmp", b"scratch");

    let outcome = add_paths(&worktree, &[path.clone()]);
    assert!(outcome.staged.is_empty());
    assert_eq!(outcome.skipped_ignored, vec!["x.tmp"]);

    let forced = add(
        &worktree,
        &[path],
        &AddOptions {
            force: true,
            ..AddOptions::default()
        },
    )
    .unwrap();
    assert_eq!(forced.staged, vec!["x.tmp"]);
}

#[test]
fn test_directory_expansion_honors_ignores_even_with_force() {
    let (_temp_dir, worktree) = init_worktree();
    write_file(&worktree, ".hvrtignore", b"*.tmp\n");
    write_file(&worktree, "src/keep.rs", b"k");
    write_file(&worktree, "src/drop.tmp", b"d");

    let outcome = add(
        &worktree,
        &[worktree.root().join("src")],
        &AddOptions {
            force: true,
            ..AddOptions::default()
        },
    )
    .unwrap();
    assert_eq!(outcome.staged, vec!["src/keep.rs"]);
}

#[test]
fn test_unstage_drops_entry_and_keeps_file() {
    let (_temp_dir, worktree) = init_worktree();
    let path = write_file(&worktree, "file.txt", b"data");
    add_paths(&worktree, &[path.clone()]);

    let removed = unstage(&worktree, &[path.clone()]).unwrap();
    assert_eq!(removed, vec!["file.txt"]);
    assert!(path.exists());

    let mut staging = StagingStore::open(worktree.root()).unwrap();
    let tx = staging.read_transaction().unwrap();
    assert!(tx.list_staged().unwrap().is_empty());
}

#[test]
fn test_rm_marks_removal_and_next_commit_drops_path() {
    let (_temp_dir, worktree) = init_worktree();
    let keep = write_file(&worktree, "keep.txt", b"keep");
    let gone = write_file(&worktree, "gone.txt", b"gone");
    add_paths(&worktree, &[keep, gone.clone()]);
    commit_msg(&worktree, "both").unwrap();

    remove(
        &worktree,
        &[gone.clone()],
        &RemoveOptions {
            staged_only: false,
            keep: false,
        },
    )
    .unwrap();
    assert!(!gone.exists());

    let outcome = commit_msg(&worktree, "drop one").expect("removal commits");
    assert_eq!(outcome.tracked_paths, 1);

    let mut repo = open_repo_db(&worktree);
    let mut tx = repo.transaction().unwrap();
    let record = tx.get_commit(&outcome.commit).unwrap().unwrap();
    let members = tx.get_tree_members(&record.tree).unwrap();
    assert_eq!(members.len(), 1);
    assert_eq!(members[0].path, "keep.txt");
}

#[test]
fn test_status_classifies_all_four_sets() {
    let (_temp_dir, worktree) = init_worktree();
    let tracked = write_file(&worktree, "tracked.txt", b"original");
    let doomed = write_file(&worktree, "doomed.txt", b"doomed");
    add_paths(&worktree, &[tracked.clone(), doomed.clone()]);
    commit_msg(&worktree, "base").unwrap();

    // modified on disk
    std::fs::write(&tracked, b"changed").unwrap();
    // deleted from disk
    std::fs::remove_file(&doomed).unwrap();
    // staged but not yet tracked
    let fresh = write_file(&worktree, "fresh.txt", b"fresh");
    add_paths(&worktree, &[fresh]);
    // untracked, unstaged
    write_file(&worktree, "stray.txt", b"stray");
    // ignored files stay out entirely
    write_file(&worktree, ".hvrtignore", b"*.log\n");
    write_file(&worktree, "noise.log", b"noise");

    let report = status(&worktree, &CancelToken::new()).unwrap();
    assert_eq!(report.modified, vec!["tracked.txt"]);
    assert_eq!(report.deleted, vec!["doomed.txt"]);
    assert_eq!(report.new, vec!["fresh.txt"]);
    // .hvrtignore itself is an untracked file on disk
    assert_eq!(report.unknown, vec![".hvrtignore", "stray.txt"]);
}

#[test]
fn test_lost_ref_race_rolls_back_both_stores() {
    let (_temp_dir, worktree) = init_worktree();
    let path = write_file(&worktree, "mine.txt", b"mine");
    add_paths(&worktree, &[path]);

    // Another worktree won the race: move trunk to a different commit
    // behind this worktree's back.
    let rival_commit = {
        let mut repo = open_repo_db(&worktree);
        let mut tx = repo.transaction().unwrap();
        let tree = HashValue::new(
            ObjectKind::Tree,
            HashAlgorithm::Sha3_256,
            hash_bytes(HashAlgorithm::Sha3_256, b"rival tree"),
        );
        tx.put_tree(&tree, &[]).unwrap();
        let rival = HashValue::new(
            ObjectKind::Commit,
            HashAlgorithm::Sha3_256,
            hash_bytes(HashAlgorithm::Sha3_256, b"rival commit"),
        );
        tx.put_commit(&rival, &tree, "rival", "rival", "won", "2026-01-01T00:00:00+00:00", &[])
            .unwrap();
        tx.update_ref("trunk", &RefTarget::Sentinel, &RefTarget::Commit(rival.clone()))
            .unwrap();
        tx.commit().unwrap();
        rival
    };

    // This worktree still believes trunk is at the sentinel; its commit
    // must lose the compare-and-swap.
    let result = commit(
        &worktree,
        &CommitOptions {
            message: "late".into(),
            author: "late@example.com".into(),
            committer: None,
            cancel: CancelToken::new(),
        },
    );
    assert!(matches!(result, Err(Error::Conflict(_))));

    // staging kept its rows for a retry
    let mut staging = StagingStore::open(worktree.root()).unwrap();
    let stx = staging.read_transaction().unwrap();
    assert_eq!(stx.list_staged().unwrap().len(), 1);
    let staged_blob = stx.list_staged().unwrap()[0].blob.clone();
    drop(stx);

    // the object store kept the rival's head and none of the loser's data
    let mut repo = open_repo_db(&worktree);
    let mut tx = repo.transaction().unwrap();
    assert_eq!(
        tx.get_ref("trunk").unwrap(),
        Some(RefTarget::Commit(rival_commit))
    );
    assert!(!tx.exists_blob(&staged_blob).unwrap());
}

#[test]
fn test_empty_file_stages_and_commits() {
    let (_temp_dir, worktree) = init_worktree();
    let path = write_file(&worktree, "empty.txt", b"");
    add_paths(&worktree, &[path]);

    let mut staging = StagingStore::open(worktree.root()).unwrap();
    {
        let tx = staging.read_transaction().unwrap();
        let staged = tx.list_staged().unwrap();
        assert_eq!(staged[0].byte_length, 0);
        assert_eq!(
            staged[0].blob.hex_digest,
            hash_bytes(HashAlgorithm::Sha3_256, b"")
        );
        // empty files produce zero chunks
        assert!(tx.read_chunks().unwrap().is_empty());
        assert!(tx.read_blob_chunks().unwrap().is_empty());
    }
    drop(staging);

    let outcome = commit_msg(&worktree, "empty").expect("commit created");
    assert_eq!(outcome.tracked_paths, 1);
}

#[test]
fn test_committer_defaults_to_author() {
    let (_temp_dir, worktree) = init_worktree();
    let path = write_file(&worktree, "f.txt", b"f");
    add_paths(&worktree, &[path]);

    let outcome = commit(
        &worktree,
        &CommitOptions {
            message: "msg".into(),
            author: "author@example.com".into(),
            committer: Some(String::new()),
            cancel: CancelToken::new(),
        },
    )
    .unwrap()
    .unwrap();

    let mut repo = open_repo_db(&worktree);
    let mut tx = repo.transaction().unwrap();
    let record = tx.get_commit(&outcome.commit).unwrap().unwrap();
    assert_eq!(record.committer, "author@example.com");
}

#[test]
fn test_deduplicated_content_stored_once() {
    let (_temp_dir, worktree) = init_worktree();
    let a = write_file(&worktree, "a.txt", b"identical bytes");
    let b = write_file(&worktree, "b.txt", b"identical bytes");
    add_paths(&worktree, &[a, b]);

    let mut staging = StagingStore::open(worktree.root()).unwrap();
    let tx = staging.read_transaction().unwrap();
    // two file entries share one blob and one chunk
    assert_eq!(tx.list_staged().unwrap().len(), 2);
    assert_eq!(tx.read_blobs().unwrap().len(), 1);
    assert_eq!(tx.read_chunks().unwrap().len(), 1);
}
