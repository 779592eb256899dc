//! SQLite backend for the repository object store

use crate::object::{CommitRecord, RefTarget, RepoStore, RepoTransaction};
use crate::scripts::{repo_scripts, RepoScripts};
use crate::sqlite_err;
use hvrt_core::config::RepoEngine;
use hvrt_core::error::{Error, Result};
use hvrt_core::hash::{HashAlgorithm, HashValue, ObjectKind};
use hvrt_core::tree::TreeMember;
use rusqlite::{params, Connection, OptionalExtension, TransactionBehavior};
use std::path::Path;
use std::str::FromStr;

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

/// Repository database in a single SQLite file
pub struct SqliteRepoStore {
    conn: Connection,
}

impl SqliteRepoStore {
    /// Create and seed a new repository database file
    pub fn init(path: &Path, default_branch: &str) -> Result<Self> {
        if path.exists() {
            return Err(Error::Conflict(format!(
                "repository already initialized at {}",
                path.display()
            )));
        }
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let mut conn = Connection::open(path).map_err(sqlite_err)?;
        configure(&conn)?;

        let scripts = repo_scripts(RepoEngine::Sqlite);
        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(sqlite_err)?;
        tx.execute_batch(scripts.init).map_err(sqlite_err)?;
        tx.execute(
            "INSERT INTO vcs_version (version) VALUES (?1)",
            params![env!("CARGO_PKG_VERSION")],
        )
        .map_err(sqlite_err)?;
        let sentinel = RefTarget::Sentinel;
        let (hash, algo) = sentinel.encode();
        tx.execute(scripts.ref_create, params![default_branch, hash, algo])
            .map_err(sqlite_err)?;
        tx.commit().map_err(sqlite_err)?;

        tracing::debug!(
            "created repository database at {} with branch '{default_branch}'",
            path.display()
        );
        Ok(Self { conn })
    }

    /// Open an existing repository database file. The file must exist; a
    /// missing repository is reported loudly instead of silently created.
    pub fn open(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(Error::NotFound(format!(
                "repository database {}",
                path.display()
            )));
        }
        let conn = Connection::open(path).map_err(sqlite_err)?;
        configure(&conn)?;
        Ok(Self { conn })
    }
}

impl RepoStore for SqliteRepoStore {
    fn engine(&self) -> RepoEngine {
        RepoEngine::Sqlite
    }

    fn transaction(&mut self) -> Result<Box<dyn RepoTransaction + '_>> {
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(sqlite_err)?;
        Ok(Box::new(SqliteRepoTransaction {
            tx,
            scripts: repo_scripts(RepoEngine::Sqlite),
        }))
    }
}

struct SqliteRepoTransaction<'conn> {
    tx: rusqlite::Transaction<'conn>,
    scripts: &'static RepoScripts,
}

impl RepoTransaction for SqliteRepoTransaction<'_> {
    fn put_chunk(
        &mut self,
        chunk: &HashValue,
        compression_algo: &str,
        data: &[u8],
    ) -> Result<()> {
        self.tx
            .execute(
                self.scripts.commit_chunk,
                params![
                    chunk.hex_digest,
                    chunk.algorithm.as_str(),
                    compression_algo,
                    data
                ],
            )
            .map_err(sqlite_err)?;
        Ok(())
    }

    fn put_blob(&mut self, blob: &HashValue, byte_length: u64) -> Result<()> {
        self.tx
            .execute(
                self.scripts.commit_blob,
                params![blob.hex_digest, blob.algorithm.as_str(), byte_length as i64],
            )
            .map_err(sqlite_err)?;
        Ok(())
    }

    fn put_blob_chunk(
        &mut self,
        blob: &HashValue,
        chunk: &HashValue,
        start_byte: u64,
        end_byte: u64,
    ) -> Result<()> {
        self.tx
            .execute(
                self.scripts.commit_blob_chunk,
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

    fn put_tree(&mut self, tree: &HashValue, members: &[TreeMember]) -> Result<()> {
        self.tx
            .execute(
                self.scripts.commit_tree,
                params![tree.hex_digest, tree.algorithm.as_str()],
            )
            .map_err(sqlite_err)?;

        let mut stmt = self
            .tx
            .prepare_cached(self.scripts.commit_tree_member)
            .map_err(sqlite_err)?;
        for member in members {
            stmt.execute(params![
                tree.hex_digest,
                tree.algorithm.as_str(),
                member.path,
                member.file_id.hex_digest,
                member.file_id.algorithm.as_str(),
                member.blob.hex_digest,
                member.blob.algorithm.as_str()
            ])
            .map_err(sqlite_err)?;
        }
        Ok(())
    }

    fn put_commit(
        &mut self,
        commit: &HashValue,
        tree: &HashValue,
        author: &str,
        committer: &str,
        message: &str,
        created_at: &str,
        parents: &[HashValue],
    ) -> Result<()> {
        self.tx
            .execute(
                self.scripts.commit_commit,
                params![
                    commit.hex_digest,
                    commit.algorithm.as_str(),
                    tree.hex_digest,
                    tree.algorithm.as_str(),
                    author,
                    committer,
                    message,
                    created_at
                ],
            )
            .map_err(sqlite_err)?;

        let mut stmt = self
            .tx
            .prepare_cached(self.scripts.commit_commit_parent)
            .map_err(sqlite_err)?;
        for (position, parent) in parents.iter().enumerate() {
            stmt.execute(params![
                commit.hex_digest,
                commit.algorithm.as_str(),
                parent.hex_digest,
                parent.algorithm.as_str(),
                position as i64
            ])
            .map_err(sqlite_err)?;
        }
        Ok(())
    }

    fn get_tree_members(&mut self, tree: &HashValue) -> Result<Vec<TreeMember>> {
        let mut stmt = self
            .tx
            .prepare(self.scripts.read_tree_members)
            .map_err(sqlite_err)?;
        let rows = stmt
            .query_map(
                params![tree.hex_digest, tree.algorithm.as_str()],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, String>(3)?,
                        row.get::<_, String>(4)?,
                    ))
                },
            )
            .map_err(sqlite_err)?;

        let mut members = Vec::new();
        for row in rows {
            let (path, file_id_hex, file_id_algo, blob_hex, blob_algo) =
                row.map_err(sqlite_err)?;
            members.push(TreeMember {
                path,
                file_id: HashValue::new(ObjectKind::Blob, parse_algo(&file_id_algo)?, file_id_hex),
                blob: HashValue::new(ObjectKind::Blob, parse_algo(&blob_algo)?, blob_hex),
            });
        }
        Ok(members)
    }

    fn get_commit(&mut self, commit: &HashValue) -> Result<Option<CommitRecord>> {
        let row = self
            .tx
            .query_row(
                self.scripts.read_commit,
                params![commit.hex_digest, commit.algorithm.as_str()],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, String>(3)?,
                        row.get::<_, String>(4)?,
                        row.get::<_, String>(5)?,
                    ))
                },
            )
            .optional()
            .map_err(sqlite_err)?;

        let Some((tree_hex, tree_algo, author, committer, message, created_at)) = row else {
            return Ok(None);
        };

        let mut stmt = self
            .tx
            .prepare(self.scripts.read_commit_parents)
            .map_err(sqlite_err)?;
        let parent_rows = stmt
            .query_map(
                params![commit.hex_digest, commit.algorithm.as_str()],
                |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)),
            )
            .map_err(sqlite_err)?;

        let mut parents = Vec::new();
        for row in parent_rows {
            let (hex, algo) = row.map_err(sqlite_err)?;
            parents.push(HashValue::new(ObjectKind::Commit, parse_algo(&algo)?, hex));
        }

        Ok(Some(CommitRecord {
            hash: commit.clone(),
            tree: HashValue::new(ObjectKind::Tree, parse_algo(&tree_algo)?, tree_hex),
            author,
            committer,
            message,
            created_at,
            parents,
        }))
    }

    fn get_ref(&mut self, name: &str) -> Result<Option<RefTarget>> {
        let row = self
            .tx
            .query_row(self.scripts.ref_get, params![name], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
            })
            .optional()
            .map_err(sqlite_err)?;
        match row {
            Some((hash, algo)) => Ok(Some(RefTarget::decode(&hash, &algo)?)),
            None => Ok(None),
        }
    }

    fn create_ref(&mut self, name: &str, target: &RefTarget) -> Result<()> {
        let (hash, algo) = target.encode();
        self.tx
            .execute(self.scripts.ref_create, params![name, hash, algo])
            .map_err(sqlite_err)?;
        Ok(())
    }

    fn update_ref(&mut self, name: &str, expected: &RefTarget, new: &RefTarget) -> Result<()> {
        let (new_hash, new_algo) = new.encode();
        let (expected_hash, expected_algo) = expected.encode();
        let changed = self
            .tx
            .execute(
                self.scripts.ref_update,
                params![new_hash, new_algo, name, expected_hash, expected_algo],
            )
            .map_err(sqlite_err)?;

        if changed == 0 {
            return match self.get_ref(name)? {
                None => Err(Error::NotFound(format!("ref '{name}'"))),
                Some(_) => Err(Error::Conflict(format!(
                    "ref '{name}' moved; expected {expected_hash}"
                ))),
            };
        }
        Ok(())
    }

    fn exists_chunk(&mut self, chunk: &HashValue) -> Result<bool> {
        let row = self
            .tx
            .query_row(
                self.scripts.exists_chunk,
                params![chunk.hex_digest, chunk.algorithm.as_str()],
                |_| Ok(()),
            )
            .optional()
            .map_err(sqlite_err)?;
        Ok(row.is_some())
    }

    fn exists_blob(&mut self, blob: &HashValue) -> Result<bool> {
        let row = self
            .tx
            .query_row(
                self.scripts.exists_blob,
                params![blob.hex_digest, blob.algorithm.as_str()],
                |_| Ok(()),
            )
            .optional()
            .map_err(sqlite_err)?;
        Ok(row.is_some())
    }

    fn commit(self: Box<Self>) -> Result<()> {
        self.tx.commit().map_err(sqlite_err)
    }

    fn rollback(self: Box<Self>) -> Result<()> {
        self.tx.rollback().map_err(sqlite_err)
    }
}

fn parse_algo(algo: &str) -> Result<HashAlgorithm> {
    HashAlgorithm::from_str(algo)
        .map_err(|_| Error::Db(format!("unknown hash algorithm '{algo}' in object store")))
}
