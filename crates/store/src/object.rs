//! The object store: immutable, content-addressed repository objects
//!
//! The repository database is polymorphic over backing engines that can
//! provide transactional SQL, idempotent upsert by primary key, and a
//! compare-and-swap ref update. Dialect-specific SQL text is selected by
//! engine name; the logic driving it is identical. SQLite is always
//! available; PostgreSQL is compiled in with the `postgres` cargo feature.

use hvrt_core::config::RepoEngine;
use hvrt_core::error::{Error, Result};
use hvrt_core::hash::{HashValue, ObjectKind};
use hvrt_core::tree::TreeMember;
use std::str::FromStr;

/// Ref value stored for a fresh branch with no commits yet
pub const SENTINEL_HASH: &str = "0";
pub const SENTINEL_ALGO: &str = "nil";

/// What a ref (or the worktree head) points at
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefTarget {
    /// Fresh branch, no commit yet
    Sentinel,
    Commit(HashValue),
}

impl RefTarget {
    /// The `(hash, algorithm)` column pair stored in the database
    pub fn encode(&self) -> (&str, &str) {
        match self {
            RefTarget::Sentinel => (SENTINEL_HASH, SENTINEL_ALGO),
            RefTarget::Commit(value) => (value.hex_digest.as_str(), value.algorithm.as_str()),
        }
    }

    pub fn decode(hash: &str, algo: &str) -> Result<RefTarget> {
        if hash == SENTINEL_HASH && algo == SENTINEL_ALGO {
            return Ok(RefTarget::Sentinel);
        }
        let algorithm = hvrt_core::hash::HashAlgorithm::from_str(algo)
            .map_err(|_| Error::Db(format!("unknown hash algorithm '{algo}' in ref")))?;
        Ok(RefTarget::Commit(HashValue::new(
            ObjectKind::Commit,
            algorithm,
            hash.to_string(),
        )))
    }

    pub fn as_commit(&self) -> Option<&HashValue> {
        match self {
            RefTarget::Sentinel => None,
            RefTarget::Commit(value) => Some(value),
        }
    }
}

/// A commit row plus its parent edges, as read back from the store
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitRecord {
    pub hash: HashValue,
    pub tree: HashValue,
    pub author: String,
    pub committer: String,
    pub message: String,
    pub created_at: String,
    pub parents: Vec<HashValue>,
}

/// An open repository database
pub trait RepoStore {
    fn engine(&self) -> RepoEngine;

    /// Begin a write transaction; writers are serialized by the backend
    fn transaction(&mut self) -> Result<Box<dyn RepoTransaction + '_>>;
}

/// One transaction against the repository database
///
/// All `put_*` operations are idempotent on their content-addressed key;
/// writing an object that already exists succeeds silently. The backing
/// schema's foreign keys enforce bottom-up insertion order: chunks before
/// blob edges, blobs before tree members, trees before commits.
pub trait RepoTransaction {
    fn put_chunk(
        &mut self,
        chunk: &HashValue,
        compression_algo: &str,
        data: &[u8],
    ) -> Result<()>;

    fn put_blob(&mut self, blob: &HashValue, byte_length: u64) -> Result<()>;

    fn put_blob_chunk(
        &mut self,
        blob: &HashValue,
        chunk: &HashValue,
        start_byte: u64,
        end_byte: u64,
    ) -> Result<()>;

    fn put_tree(&mut self, tree: &HashValue, members: &[TreeMember]) -> Result<()>;

    #[allow(clippy::too_many_arguments)]
    fn put_commit(
        &mut self,
        commit: &HashValue,
        tree: &HashValue,
        author: &str,
        committer: &str,
        message: &str,
        created_at: &str,
        parents: &[HashValue],
    ) -> Result<()>;

    fn get_tree_members(&mut self, tree: &HashValue) -> Result<Vec<TreeMember>>;

    fn get_commit(&mut self, commit: &HashValue) -> Result<Option<CommitRecord>>;

    fn get_ref(&mut self, name: &str) -> Result<Option<RefTarget>>;

    /// Create a ref that must not already exist
    fn create_ref(&mut self, name: &str, target: &RefTarget) -> Result<()>;

    /// Compare-and-swap: move `name` from `expected` to `new`. Fails with
    /// `Conflict` when the ref moved underneath the caller and `NotFound`
    /// when the ref does not exist.
    fn update_ref(&mut self, name: &str, expected: &RefTarget, new: &RefTarget) -> Result<()>;

    fn exists_chunk(&mut self, chunk: &HashValue) -> Result<bool>;

    fn exists_blob(&mut self, blob: &HashValue) -> Result<bool>;

    fn commit(self: Box<Self>) -> Result<()>;

    fn rollback(self: Box<Self>) -> Result<()>;
}

/// Open an existing repository database
pub fn open_repo(engine: RepoEngine, uri: &str) -> Result<Box<dyn RepoStore>> {
    match engine {
        RepoEngine::Sqlite => Ok(Box::new(crate::sqlite::SqliteRepoStore::open(
            std::path::Path::new(uri),
        )?)),
        #[cfg(feature = "postgres")]
        RepoEngine::Postgres => Ok(Box::new(crate::postgres::PostgresRepoStore::connect(uri)?)),
        #[cfg(not(feature = "postgres"))]
        RepoEngine::Postgres => Err(Error::Argument(
            "postgres support is not compiled in; rebuild with the 'postgres' feature".into(),
        )),
    }
}

/// Create and seed a new repository database, with the default branch
/// pointing at the sentinel
pub fn init_repo(engine: RepoEngine, uri: &str, default_branch: &str) -> Result<()> {
    match engine {
        RepoEngine::Sqlite => {
            crate::sqlite::SqliteRepoStore::init(std::path::Path::new(uri), default_branch)?;
            Ok(())
        }
        #[cfg(feature = "postgres")]
        RepoEngine::Postgres => {
            crate::postgres::PostgresRepoStore::init(uri, default_branch)?;
            Ok(())
        }
        #[cfg(not(feature = "postgres"))]
        RepoEngine::Postgres => Err(Error::Argument(
            "postgres support is not compiled in; rebuild with the 'postgres' feature".into(),
        )),
    }
}
