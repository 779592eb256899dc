//! The staging store: a transactional SQLite database of everything queued
//! for the next commit
//!
//! One `work_tree_state.sqlite` per working tree, inside `.hvrt/`. All
//! mutations for a CLI invocation happen inside a single `BEGIN IMMEDIATE`
//! transaction so concurrent invocations conflict up front instead of
//! mid-operation. Dropping a transaction without committing rolls it back.

use crate::object::RefTarget;
use crate::scripts::work_tree;
use crate::sqlite_err;
use hvrt_core::compress::CompressionAlgorithm;
use hvrt_core::config::{METADATA_DIR, WORKTREE_DB_NAME};
use hvrt_core::error::{Error, Result};
use hvrt_core::hash::{HashAlgorithm, HashValue, ObjectKind};
use rusqlite::{params, Connection, TransactionBehavior};
use std::path::{Path, PathBuf};
use tracing::debug;

/// A staged file entry, keyed by worktree-relative slash-normalized path
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagedFile {
    pub path: String,
    pub blob: HashValue,
    pub byte_length: u64,
    pub added_at: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagedBlob {
    pub hash: HashValue,
    pub byte_length: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagedChunk {
    pub hash: HashValue,
    pub compression: CompressionAlgorithm,
    pub data: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagedBlobChunk {
    pub blob: HashValue,
    pub chunk: HashValue,
    pub start_byte: u64,
    pub end_byte: u64,
}

/// The branch the worktree has checked out and the commit it last saw
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeadState {
    pub branch: String,
    pub head: RefTarget,
}

/// Handle on a worktree's staging database
pub struct StagingStore {
    conn: Connection,
    path: PathBuf,
}

fn staging_db_path(work_tree: &Path) -> PathBuf {
    work_tree.join(METADATA_DIR).join(WORKTREE_DB_NAME)
}

fn configure(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "PRAGMA journal_mode = WAL;
         PRAGMA synchronous = NORMAL;
         PRAGMA foreign_keys = ON;
         PRAGMA case_sensitive_like = ON;
         PRAGMA busy_timeout = 5000;",
    )
    .map_err(sqlite_err)
}

impl StagingStore {
    /// Create the staging database for a fresh worktree
    pub fn create(work_tree: &Path, branch: &str) -> Result<Self> {
        let path = staging_db_path(work_tree);
        if path.exists() {
            return Err(Error::Conflict(format!(
                "staging database already exists at {}",
                path.display()
            )));
        }
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(&path).map_err(sqlite_err)?;
        configure(&conn)?;
        conn.execute_batch(work_tree::INIT).map_err(sqlite_err)?;
        conn.execute(
            "INSERT INTO vcs_version (version) VALUES (?1)",
            params![env!("CARGO_PKG_VERSION")],
        )
        .map_err(sqlite_err)?;
        let sentinel = RefTarget::Sentinel;
        let (hash, algo) = sentinel.encode();
        conn.execute(
            "INSERT INTO worktree_state (id, branch, head_hash, head_hash_algo)
             VALUES (1, ?1, ?2, ?3)",
            params![branch, hash, algo],
        )
        .map_err(sqlite_err)?;

        debug!("created staging database at {} on '{branch}'", path.display());
        Ok(Self { conn, path })
    }

    /// Open an existing staging database. The file must already exist; a
    /// worktree without one was never initialized.
    pub fn open(work_tree: &Path) -> Result<Self> {
        let path = staging_db_path(work_tree);
        if !path.exists() {
            return Err(Error::NotFound(format!(
                "staging database {}",
                path.display()
            )));
        }
        let conn = Connection::open(&path).map_err(sqlite_err)?;
        configure(&conn)?;
        Ok(Self { conn, path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Begin the invocation's staging transaction with an immediate write
    /// lock, so a concurrent invocation fails here rather than halfway
    /// through its batch.
    pub fn transaction(&mut self) -> Result<StagingTransaction<'_>> {
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(sqlite_err)?;
        Ok(StagingTransaction { tx })
    }

    /// Begin a read-only snapshot transaction. Readers do not block a
    /// concurrent writer's lock acquisition.
    pub fn read_transaction(&mut self) -> Result<StagingTransaction<'_>> {
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Deferred)
            .map_err(sqlite_err)?;
        Ok(StagingTransaction { tx })
    }
}

/// One invocation's staging transaction. Rolls back on drop.
pub struct StagingTransaction<'conn> {
    tx: rusqlite::Transaction<'conn>,
}

impl<'conn> StagingTransaction<'conn> {
    /// Upsert a file entry by path
    pub fn stage_file(
        &self,
        path: &str,
        blob: &HashValue,
        byte_length: u64,
        added_at: i64,
    ) -> Result<()> {
        self.tx
            .execute(
                work_tree::ADD_FILE,
                params![
                    path,
                    blob.hex_digest,
                    blob.algorithm.as_str(),
                    byte_length as i64,
                    added_at
                ],
            )
            .map_err(sqlite_err)?;
        Ok(())
    }

    /// Idempotent insert by blob identity
    pub fn stage_blob(&self, blob: &HashValue, byte_length: u64) -> Result<()> {
        self.tx
            .execute(
                work_tree::ADD_BLOB,
                params![blob.hex_digest, blob.algorithm.as_str(), byte_length as i64],
            )
            .map_err(sqlite_err)?;
        Ok(())
    }

    /// Idempotent insert by chunk identity; `data` is the compressed payload
    pub fn stage_chunk(
        &self,
        chunk: &HashValue,
        compression: CompressionAlgorithm,
        data: &[u8],
    ) -> Result<()> {
        self.tx
            .execute(
                work_tree::ADD_CHUNK,
                params![
                    chunk.hex_digest,
                    chunk.algorithm.as_str(),
                    compression.as_str(),
                    data
                ],
            )
            .map_err(sqlite_err)?;
        Ok(())
    }

    /// Idempotent insert of one blob-to-chunk edge
    pub fn stage_blob_chunk(
        &self,
        blob: &HashValue,
        chunk: &HashValue,
        start_byte: u64,
        end_byte: u64,
    ) -> Result<()> {
        self.tx
            .execute(
                work_tree::ADD_BLOB_CHUNK,
                params![
                    blob.hex_digest,
                    blob.algorithm.as_str(),
                    chunk.hex_digest,
                    chunk.algorithm.as_str(),
                    start_byte as i64,
                    end_byte as i64
                ],
            )
            .map_err(sqlite_err)?;
        Ok(())
    }

    /// Drop a staged file entry. Returns whether anything was removed.
    pub fn unstage_file(&self, path: &str) -> Result<bool> {
        let changed = self
            .tx
            .execute("DELETE FROM staged_files WHERE path = ?1", params![path])
            .map_err(sqlite_err)?;
        Ok(changed > 0)
    }

    /// Mark a tracked path for deletion from the tree at the next commit
    pub fn mark_removed(&self, path: &str) -> Result<()> {
        self.tx
            .execute(
                "INSERT INTO staged_removals (path) VALUES (?1)
                 ON CONFLICT (path) DO NOTHING",
                params![path],
            )
            .map_err(sqlite_err)?;
        Ok(())
    }

    pub fn list_staged(&self) -> Result<Vec<StagedFile>> {
        let mut stmt = self
            .tx
            .prepare(
                "SELECT path, blob_hash, blob_hash_algo, byte_length, added_at
                 FROM staged_files ORDER BY path",
            )
            .map_err(sqlite_err)?;
        let rows = stmt
            .query_map([], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, i64>(3)?,
                    row.get::<_, i64>(4)?,
                ))
            })
            .map_err(sqlite_err)?;

        let mut staged = Vec::new();
        for row in rows {
            let (path, hex, algo, byte_length, added_at) = row.map_err(sqlite_err)?;
            staged.push(StagedFile {
                path,
                blob: HashValue::new(ObjectKind::Blob, parse_algo(&algo)?, hex),
                byte_length: byte_length as u64,
                added_at,
            });
        }
        Ok(staged)
    }

    pub fn list_removals(&self) -> Result<Vec<String>> {
        let mut stmt = self
            .tx
            .prepare("SELECT path FROM staged_removals ORDER BY path")
            .map_err(sqlite_err)?;
        let rows = stmt
            .query_map([], |row| row.get::<_, String>(0))
            .map_err(sqlite_err)?;
        let mut paths = Vec::new();
        for row in rows {
            paths.push(row.map_err(sqlite_err)?);
        }
        Ok(paths)
    }

    pub fn read_chunks(&self) -> Result<Vec<StagedChunk>> {
        let mut stmt = self.tx.prepare(work_tree::READ_CHUNKS).map_err(sqlite_err)?;
        let rows = stmt
            .query_map([], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, Vec<u8>>(3)?,
                ))
            })
            .map_err(sqlite_err)?;

        let mut chunks = Vec::new();
        for row in rows {
            let (hex, algo, compression, data) = row.map_err(sqlite_err)?;
            chunks.push(StagedChunk {
                hash: HashValue::new(ObjectKind::Chunk, parse_algo(&algo)?, hex),
                compression: compression
                    .parse()
                    .map_err(|_| Error::Db(format!("unknown compression '{compression}'")))?,
                data,
            });
        }
        Ok(chunks)
    }

    pub fn read_blobs(&self) -> Result<Vec<StagedBlob>> {
        let mut stmt = self.tx.prepare(work_tree::READ_BLOBS).map_err(sqlite_err)?;
        let rows = stmt
            .query_map([], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, i64>(2)?,
                ))
            })
            .map_err(sqlite_err)?;

        let mut blobs = Vec::new();
        for row in rows {
            let (hex, algo, byte_length) = row.map_err(sqlite_err)?;
            blobs.push(StagedBlob {
                hash: HashValue::new(ObjectKind::Blob, parse_algo(&algo)?, hex),
                byte_length: byte_length as u64,
            });
        }
        Ok(blobs)
    }

    pub fn read_blob_chunks(&self) -> Result<Vec<StagedBlobChunk>> {
        let mut stmt = self
            .tx
            .prepare(work_tree::READ_BLOB_CHUNKS)
            .map_err(sqlite_err)?;
        let rows = stmt
            .query_map([], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, String>(3)?,
                    row.get::<_, i64>(4)?,
                    row.get::<_, i64>(5)?,
                ))
            })
            .map_err(sqlite_err)?;

        let mut edges = Vec::new();
        for row in rows {
            let (blob_hex, blob_algo, chunk_hex, chunk_algo, start, end) =
                row.map_err(sqlite_err)?;
            edges.push(StagedBlobChunk {
                blob: HashValue::new(ObjectKind::Blob, parse_algo(&blob_algo)?, blob_hex),
                chunk: HashValue::new(ObjectKind::Chunk, parse_algo(&chunk_algo)?, chunk_hex),
                start_byte: start as u64,
                end_byte: end as u64,
            });
        }
        Ok(edges)
    }

    /// The checked-out branch and its last-seen head commit
    pub fn head(&self) -> Result<HeadState> {
        let (branch, hash, algo) = self
            .tx
            .query_row(work_tree::READ_HEAD_COMMIT, [], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                ))
            })
            .map_err(sqlite_err)?;
        Ok(HeadState {
            branch,
            head: RefTarget::decode(&hash, &algo)?,
        })
    }

    /// Advance the worktree's view of its branch head
    pub fn set_head(&self, branch: &str, head: &RefTarget) -> Result<()> {
        let (hash, algo) = head.encode();
        self.tx
            .execute(
                "UPDATE worktree_state
                 SET branch = ?1, head_hash = ?2, head_hash_algo = ?3
                 WHERE id = 1",
                params![branch, hash, algo],
            )
            .map_err(sqlite_err)?;
        Ok(())
    }

    /// Drain every staged table; runs after a successful commit
    pub fn clear_all_staging(&self) -> Result<()> {
        self.tx.execute_batch(work_tree::CLEAR).map_err(sqlite_err)
    }

    pub fn commit(self) -> Result<()> {
        self.tx.commit().map_err(sqlite_err)
    }

    pub fn rollback(self) -> Result<()> {
        self.tx.rollback().map_err(sqlite_err)
    }
}

fn parse_algo(algo: &str) -> Result<HashAlgorithm> {
    algo.parse()
        .map_err(|_| Error::Db(format!("unknown hash algorithm '{algo}' in staging store")))
}
