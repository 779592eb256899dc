//! Embedded SQL scripts, one set per backing-engine dialect
//!
//! Every statement the stores execute lives in a declarative `.sql` file
//! under `crates/store/sql/<dialect>/`, keyed by purpose. The worktree
//! staging database is always SQLite; the repository database has one
//! script set per supported engine, identical in logical content.

use hvrt_core::config::RepoEngine;

/// Staging (worktree) database scripts. Always the SQLite dialect.
pub mod work_tree {
    pub const INIT: &str = include_str!("../sql/sqlite/work_tree/init.sql");
    pub const ADD_FILE: &str = include_str!("../sql/sqlite/work_tree/add/file.sql");
    pub const ADD_BLOB: &str = include_str!("../sql/sqlite/work_tree/add/blob.sql");
    pub const ADD_CHUNK: &str = include_str!("../sql/sqlite/work_tree/add/chunk.sql");
    pub const ADD_BLOB_CHUNK: &str = include_str!("../sql/sqlite/work_tree/add/blob_chunk.sql");
    pub const READ_CHUNKS: &str = include_str!("../sql/sqlite/work_tree/read_chunks.sql");
    pub const READ_BLOBS: &str = include_str!("../sql/sqlite/work_tree/read_blobs.sql");
    pub const READ_BLOB_CHUNKS: &str =
        include_str!("../sql/sqlite/work_tree/read_blob_chunks.sql");
    pub const READ_HEAD_COMMIT: &str =
        include_str!("../sql/sqlite/work_tree/read_head_commit.sql");
    pub const CLEAR: &str = include_str!("../sql/sqlite/work_tree/clear.sql");
}

/// One repository-database dialect's script set
pub struct RepoScripts {
    pub init: &'static str,
    pub commit_chunk: &'static str,
    pub commit_blob: &'static str,
    pub commit_blob_chunk: &'static str,
    pub commit_tree: &'static str,
    pub commit_tree_member: &'static str,
    pub commit_commit: &'static str,
    pub commit_commit_parent: &'static str,
    pub read_tree_members: &'static str,
    pub read_commit: &'static str,
    pub read_commit_parents: &'static str,
    pub exists_chunk: &'static str,
    pub exists_blob: &'static str,
    pub ref_get: &'static str,
    pub ref_create: &'static str,
    pub ref_update: &'static str,
}

const SQLITE_REPO: RepoScripts = RepoScripts {
    init: include_str!("../sql/sqlite/repo/init.sql"),
    commit_chunk: include_str!("../sql/sqlite/repo/commit/chunk.sql"),
    commit_blob: include_str!("../sql/sqlite/repo/commit/blob.sql"),
    commit_blob_chunk: include_str!("../sql/sqlite/repo/commit/blob_chunk.sql"),
    commit_tree: include_str!("../sql/sqlite/repo/commit/tree.sql"),
    commit_tree_member: include_str!("../sql/sqlite/repo/commit/tree_member.sql"),
    commit_commit: include_str!("../sql/sqlite/repo/commit/commit.sql"),
    commit_commit_parent: include_str!("../sql/sqlite/repo/commit/commit_parent.sql"),
    read_tree_members: include_str!("../sql/sqlite/repo/read/tree_members.sql"),
    read_commit: include_str!("../sql/sqlite/repo/read/commit.sql"),
    read_commit_parents: include_str!("../sql/sqlite/repo/read/commit_parents.sql"),
    exists_chunk: include_str!("../sql/sqlite/repo/read/exists_chunk.sql"),
    exists_blob: include_str!("../sql/sqlite/repo/read/exists_blob.sql"),
    ref_get: include_str!("../sql/sqlite/repo/refs/get.sql"),
    ref_create: include_str!("../sql/sqlite/repo/refs/create.sql"),
    ref_update: include_str!("../sql/sqlite/repo/refs/update.sql"),
};

const POSTGRES_REPO: RepoScripts = RepoScripts {
    init: include_str!("../sql/postgres/repo/init.sql"),
    commit_chunk: include_str!("../sql/postgres/repo/commit/chunk.sql"),
    commit_blob: include_str!("../sql/postgres/repo/commit/blob.sql"),
    commit_blob_chunk: include_str!("../sql/postgres/repo/commit/blob_chunk.sql"),
    commit_tree: include_str!("../sql/postgres/repo/commit/tree.sql"),
    commit_tree_member: include_str!("../sql/postgres/repo/commit/tree_member.sql"),
    commit_commit: include_str!("../sql/postgres/repo/commit/commit.sql"),
    commit_commit_parent: include_str!("../sql/postgres/repo/commit/commit_parent.sql"),
    read_tree_members: include_str!("../sql/postgres/repo/read/tree_members.sql"),
    read_commit: include_str!("../sql/postgres/repo/read/commit.sql"),
    read_commit_parents: include_str!("../sql/postgres/repo/read/commit_parents.sql"),
    exists_chunk: include_str!("../sql/postgres/repo/read/exists_chunk.sql"),
    exists_blob: include_str!("../sql/postgres/repo/read/exists_blob.sql"),
    ref_get: include_str!("../sql/postgres/repo/refs/get.sql"),
    ref_create: include_str!("../sql/postgres/repo/refs/create.sql"),
    ref_update: include_str!("../sql/postgres/repo/refs/update.sql"),
};

/// Select the repository script set for an engine
pub fn repo_scripts(engine: RepoEngine) -> &'static RepoScripts {
    match engine {
        RepoEngine::Sqlite => &SQLITE_REPO,
        RepoEngine::Postgres => &POSTGRES_REPO,
    }
}
