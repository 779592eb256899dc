//! Havarti storage layer
//!
//! Two databases back a working tree. The staging store is an embedded
//! SQLite file inside `.hvrt/` holding everything queued for the next
//! commit. The object store is the repository database of immutable,
//! content-addressed objects; it may live in the same metadata directory
//! or on a remote SQL server, selected by `worktree.repo` configuration.

pub mod object;
pub mod scripts;
pub mod staging;
pub mod sqlite;

#[cfg(feature = "postgres")]
pub mod postgres;

pub use object::{
    init_repo, open_repo, CommitRecord, RefTarget, RepoStore, RepoTransaction,
};
pub use staging::{
    HeadState, StagedBlob, StagedBlobChunk, StagedChunk, StagedFile, StagingStore,
    StagingTransaction,
};

use hvrt_core::error::Error;

/// Map a rusqlite error into the shared taxonomy. Unique-key violations on
/// keys that should have been idempotent become `Conflict`; foreign-key
/// violations mean the write-order contract was broken and become
/// `InvariantViolation`; a missing row becomes `NotFound`.
pub(crate) fn sqlite_err(e: rusqlite::Error) -> Error {
    const SQLITE_CONSTRAINT_FOREIGNKEY: i32 = 787;

    match &e {
        rusqlite::Error::QueryReturnedNoRows => Error::NotFound("no matching row".into()),
        rusqlite::Error::SqliteFailure(failure, _)
            if failure.code == rusqlite::ErrorCode::ConstraintViolation =>
        {
            if failure.extended_code == SQLITE_CONSTRAINT_FOREIGNKEY {
                Error::InvariantViolation(e.to_string())
            } else {
                Error::Conflict(e.to_string())
            }
        }
        _ => Error::Db(e.to_string()),
    }
}
