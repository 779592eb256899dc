//! Havarti Core - Content-addressed storage primitives for the Havarti VCS
//!
//! This crate provides the foundational layer shared by the staging and
//! repository stores:
//! - Hash identities (`kind:algorithm:hex` triples, sha3-256)
//! - The two-pass blob hasher and fixed-size chunker
//! - Per-chunk compression
//! - Tree and commit canonicalization
//! - Worktree configuration

pub mod cancel;
pub mod chunk;
pub mod commit;
pub mod compress;
pub mod config;
pub mod error;
pub mod hash;
pub mod tree;

// Re-export main types for convenience
pub use cancel::CancelToken;
pub use chunk::{BlobSummary, ChunkRecord, Chunker};
pub use commit::{Commit, CommitHeaders};
pub use compress::CompressionAlgorithm;
pub use config::Config;
pub use error::{Error, Result};
pub use hash::{HashAlgorithm, HashValue, Hasher, ObjectKind};
pub use tree::{Tree, TreeMember};
