//! Tree canonicalization and identity
//!
//! A tree is the set of tracked paths at a commit. Its identity is the hash
//! of a canonical serialization: one line per member, fields tab-separated,
//! lines sorted lexicographically by path and joined with newlines. Two
//! trees with the same members always hash identically regardless of
//! insertion order.

use crate::hash::{HashAlgorithm, HashValue, Hasher, ObjectKind};

/// One tracked path in a tree
///
/// `file_id` is a stable per-path identity intended to survive renames. The
/// current system populates it with the blob identity; the slot exists so
/// rename tracking can be added without changing the canonical form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeMember {
    pub path: String,
    pub file_id: HashValue,
    pub blob: HashValue,
}

impl TreeMember {
    /// The member's line in the canonical serialization
    pub fn canonical_line(&self) -> String {
        format!("{}\t{}\t{}", self.path, self.file_id, self.blob)
    }
}

/// An ordered set of tree members
#[derive(Debug, Clone, Default)]
pub struct Tree {
    members: Vec<TreeMember>,
}

impl Tree {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_members(members: Vec<TreeMember>) -> Self {
        Self { members }
    }

    pub fn push(&mut self, member: TreeMember) {
        self.members.push(member);
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn members(&self) -> &[TreeMember] {
        &self.members
    }

    /// Members sorted by path, the order used for serialization and storage
    pub fn sorted_members(&self) -> Vec<&TreeMember> {
        let mut sorted: Vec<_> = self.members.iter().collect();
        sorted.sort_by(|a, b| a.path.cmp(&b.path));
        sorted
    }

    /// Canonical serialization: sorted member lines joined by newlines
    pub fn canonical_bytes(&self) -> Vec<u8> {
        let lines: Vec<String> = self
            .sorted_members()
            .iter()
            .map(|m| m.canonical_line())
            .collect();
        lines.join("\n").into_bytes()
    }

    /// The tree's identity: hash of the canonical serialization
    pub fn hash(&self, algorithm: HashAlgorithm) -> HashValue {
        let mut hasher = Hasher::new(algorithm);
        hasher.update(&self.canonical_bytes());
        hasher.finalize_value(ObjectKind::Tree)
    }
}
