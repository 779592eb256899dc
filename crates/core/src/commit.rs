//! Commit canonicalization and identity
//!
//! A commit hashes over its headers and its tree. Headers serialize as
//! `key=value` lines sorted by key; multiple `parent` headers are legal and
//! keep their declared order (the first parent is the mainline). The
//! canonical form is the header block, a blank line, then the tree's
//! canonical serialization.

use crate::hash::{HashAlgorithm, HashValue, Hasher, ObjectKind};
use crate::tree::Tree;

pub const HEADER_AUTHOR: &str = "author";
pub const HEADER_COMMITTER: &str = "committer";
pub const HEADER_MESSAGE: &str = "message";
pub const HEADER_PARENT: &str = "parent";
pub const HEADER_TIMESTAMP: &str = "timestamp";

/// Commit header map that tolerates repeated keys (`parent`)
#[derive(Debug, Clone, Default)]
pub struct CommitHeaders {
    entries: Vec<(String, String)>,
}

impl CommitHeaders {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.entries.push((key.into(), value.into()));
    }

    /// First value for a key, if any
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// All values for a key, in declared order
    pub fn get_all(&self, key: &str) -> Vec<&str> {
        self.entries
            .iter()
            .filter(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
            .collect()
    }

    pub fn entries(&self) -> &[(String, String)] {
        &self.entries
    }

    /// Canonical header block: `key=value` lines sorted by key. The sort is
    /// stable so repeated keys keep their declared order.
    pub fn canonical_bytes(&self) -> Vec<u8> {
        let mut sorted: Vec<&(String, String)> = self.entries.iter().collect();
        sorted.sort_by(|a, b| a.0.cmp(&b.0));

        let lines: Vec<String> = sorted.iter().map(|(k, v)| format!("{k}={v}")).collect();
        lines.join("\n").into_bytes()
    }
}

/// A commit: headers plus the tree it snapshots
#[derive(Debug, Clone)]
pub struct Commit {
    pub headers: CommitHeaders,
    pub tree: Tree,
}

impl Commit {
    pub fn new(headers: CommitHeaders, tree: Tree) -> Self {
        Self { headers, tree }
    }

    /// Canonical form: header block, blank line, tree canonical form
    pub fn canonical_bytes(&self) -> Vec<u8> {
        let mut bytes = self.headers.canonical_bytes();
        bytes.extend_from_slice(b"\n\n");
        bytes.extend_from_slice(&self.tree.canonical_bytes());
        bytes
    }

    /// The commit's identity: hash of the canonical serialization
    pub fn hash(&self, algorithm: HashAlgorithm) -> HashValue {
        let mut hasher = Hasher::new(algorithm);
        hasher.update(&self.canonical_bytes());
        hasher.finalize_value(ObjectKind::Commit)
    }

    /// Declared parent identities, mainline first
    pub fn parents(&self) -> Vec<&str> {
        self.headers.get_all(HEADER_PARENT)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hash::hash_value;
    use crate::tree::TreeMember;

    fn sample_tree() -> Tree {
        let blob = hash_value(ObjectKind::Blob, HashAlgorithm::Sha3_256, b"contents");
        Tree::from_members(vec![TreeMember {
            path: "file.txt".into(),
            file_id: blob.clone(),
            blob,
        }])
    }

    fn sample_headers() -> CommitHeaders {
        let mut headers = CommitHeaders::new();
        headers.insert(HEADER_AUTHOR, "a@example.com");
        headers.insert(HEADER_COMMITTER, "a@example.com");
        headers.insert(HEADER_TIMESTAMP, "2026-01-01T00:00:00+00:00");
        headers.insert(HEADER_MESSAGE, "initial");
        headers
    }

    #[test]
    fn test_identity_is_deterministic() {
        let a = Commit::new(sample_headers(), sample_tree()).hash(HashAlgorithm::Sha3_256);
        let b = Commit::new(sample_headers(), sample_tree()).hash(HashAlgorithm::Sha3_256);
        assert_eq!(a, b);
        assert_eq!(a.kind, ObjectKind::Commit);
    }

    #[test]
    fn test_header_insertion_order_does_not_matter() {
        let mut reordered = CommitHeaders::new();
        reordered.insert(HEADER_MESSAGE, "initial");
        reordered.insert(HEADER_TIMESTAMP, "2026-01-01T00:00:00+00:00");
        reordered.insert(HEADER_COMMITTER, "a@example.com");
        reordered.insert(HEADER_AUTHOR, "a@example.com");

        let a = Commit::new(sample_headers(), sample_tree()).hash(HashAlgorithm::Sha3_256);
        let b = Commit::new(reordered, sample_tree()).hash(HashAlgorithm::Sha3_256);
        assert_eq!(a, b);
    }

    #[test]
    fn test_any_header_change_changes_identity() {
        let base = Commit::new(sample_headers(), sample_tree()).hash(HashAlgorithm::Sha3_256);

        let mut changed = sample_headers();
        changed.entries.iter_mut().for_each(|(k, v)| {
            if k == HEADER_MESSAGE {
                *v = "amended".into();
            }
        });
        let amended = Commit::new(changed, sample_tree()).hash(HashAlgorithm::Sha3_256);
        assert_ne!(base, amended);
    }

    #[test]
    fn test_parent_order_is_preserved() {
        let p1 = hash_value(ObjectKind::Commit, HashAlgorithm::Sha3_256, b"p1").to_string();
        let p2 = hash_value(ObjectKind::Commit, HashAlgorithm::Sha3_256, b"p2").to_string();

        let mut headers = sample_headers();
        headers.insert(HEADER_PARENT, p1.clone());
        headers.insert(HEADER_PARENT, p2.clone());

        let commit = Commit::new(headers, sample_tree());
        assert_eq!(commit.parents(), vec![p1.as_str(), p2.as_str()]);

        // swapping parents produces a different identity
        let mut swapped = sample_headers();
        swapped.insert(HEADER_PARENT, p2);
        swapped.insert(HEADER_PARENT, p1);
        assert_ne!(
            commit.hash(HashAlgorithm::Sha3_256),
            Commit::new(swapped, sample_tree()).hash(HashAlgorithm::Sha3_256)
        );
    }

    #[test]
    fn test_canonical_form_layout() {
        let commit = Commit::new(sample_headers(), sample_tree());
        let canonical = String::from_utf8(commit.canonical_bytes()).unwrap();

        let (header_block, tree_block) = canonical.split_once("\n\n").unwrap();
        let keys: Vec<&str> = header_block
            .lines()
            .map(|l| l.split_once('=').unwrap().0)
            .collect();
        assert_eq!(keys, vec!["author", "committer", "message", "timestamp"]);
        assert!(tree_block.starts_with("file.txt\t"));
    }

    #[test]
    fn test_tree_change_changes_identity() {
        let base = Commit::new(sample_headers(), sample_tree()).hash(HashAlgorithm::Sha3_256);
        let empty = Commit::new(sample_headers(), Tree::new()).hash(HashAlgorithm::Sha3_256);
        assert_ne!(base, empty);
    }
}
