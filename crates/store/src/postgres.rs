//! PostgreSQL backend for the repository object store
//!
//! Compiled in with the `postgres` cargo feature. Drives the same trait
//! surface as the SQLite backend from the postgres dialect's script set.

use crate::object::{CommitRecord, RefTarget, RepoStore, RepoTransaction};
use crate::scripts::{repo_scripts, RepoScripts};
use hvrt_core::config::RepoEngine;
use hvrt_core::error::{Error, Result};
use hvrt_core::hash::{HashAlgorithm, HashValue, ObjectKind};
use hvrt_core::tree::TreeMember;
use postgres::error::SqlState;
use postgres::{Client, NoTls};
use std::str::FromStr;

fn pg_err(e: postgres::Error) -> Error {
    if let Some(db) = e.as_db_error() {
        let code = db.code();
        return if *code == SqlState::UNIQUE_VIOLATION {
            Error::Conflict(db.message().to_string())
        } else if *code == SqlState::FOREIGN_KEY_VIOLATION {
            Error::InvariantViolation(db.message().to_string())
        } else {
            Error::Db(db.message().to_string())
        };
    }
    Error::Db(e.to_string())
}

/// Repository database on a PostgreSQL server
pub struct PostgresRepoStore {
    client: Client,
}

impl PostgresRepoStore {
    /// Create and seed the repository schema on the server behind `uri`
    pub fn init(uri: &str, default_branch: &str) -> Result<Self> {
        let mut client = Client::connect(uri, NoTls).map_err(pg_err)?;
        let scripts = repo_scripts(RepoEngine::Postgres);

        let mut tx = client.transaction().map_err(pg_err)?;
        if let Err(e) = tx.batch_execute(scripts.init) {
            let already = e
                .as_db_error()
                .is_some_and(|db| *db.code() == SqlState::DUPLICATE_TABLE);
            return Err(if already {
                Error::Conflict("repository already initialized".into())
            } else {
                pg_err(e)
            });
        }
        tx.execute(
            "INSERT INTO vcs_version (version) VALUES ($1)",
            &[&env!("CARGO_PKG_VERSION")],
        )
        .map_err(pg_err)?;
        let sentinel = RefTarget::Sentinel;
        let (hash, algo) = sentinel.encode();
        tx.execute(scripts.ref_create, &[&default_branch, &hash, &algo])
            .map_err(pg_err)?;
        tx.commit().map_err(pg_err)?;

        Ok(Self { client })
    }

    /// Connect to an existing repository database
    pub fn connect(uri: &str) -> Result<Self> {
        let mut client = Client::connect(uri, NoTls).map_err(pg_err)?;

        // Fail loudly when the schema was never initialized
        let initialized: bool = client
            .query_one("SELECT to_regclass('vcs_version') IS NOT NULL", &[])
            .map_err(pg_err)?
            .get(0);
        if !initialized {
            return Err(Error::NotFound(format!("repository schema at '{uri}'")));
        }

        Ok(Self { client })
    }
}

impl RepoStore for PostgresRepoStore {
    fn engine(&self) -> RepoEngine {
        RepoEngine::Postgres
    }

    fn transaction(&mut self) -> Result<Box<dyn RepoTransaction + '_>> {
        let tx = self.client.transaction().map_err(pg_err)?;
        Ok(Box::new(PostgresRepoTransaction {
            tx,
            scripts: repo_scripts(RepoEngine::Postgres),
        }))
    }
}

struct PostgresRepoTransaction<'client> {
    tx: postgres::Transaction<'client>,
    scripts: &'static RepoScripts,
}

impl RepoTransaction for PostgresRepoTransaction<'_> {
    fn put_chunk(
        &mut self,
        chunk: &HashValue,
        compression_algo: &str,
        data: &[u8],
    ) -> Result<()> {
        self.tx
            .execute(
                self.scripts.commit_chunk,
                &[
                    &chunk.hex_digest,
                    &chunk.algorithm.as_str(),
                    &compression_algo,
                    &data,
                ],
            )
            .map_err(pg_err)?;
        Ok(())
    }

    fn put_blob(&mut self, blob: &HashValue, byte_length: u64) -> Result<()> {
        self.tx
            .execute(
                self.scripts.commit_blob,
                &[
                    &blob.hex_digest,
                    &blob.algorithm.as_str(),
                    &(byte_length as i64),
                ],
            )
            .map_err(pg_err)?;
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
                &[
                    &blob.hex_digest,
                    &blob.algorithm.as_str(),
                    &chunk.hex_digest,
                    &chunk.algorithm.as_str(),
                    &(start_byte as i64),
                    &(end_byte as i64),
                ],
            )
            .map_err(pg_err)?;
        Ok(())
    }

    fn put_tree(&mut self, tree: &HashValue, members: &[TreeMember]) -> Result<()> {
        self.tx
            .execute(
                self.scripts.commit_tree,
                &[&tree.hex_digest, &tree.algorithm.as_str()],
            )
            .map_err(pg_err)?;

        let stmt = self
            .tx
            .prepare(self.scripts.commit_tree_member)
            .map_err(pg_err)?;
        for member in members {
            self.tx
                .execute(
                    &stmt,
                    &[
                        &tree.hex_digest,
                        &tree.algorithm.as_str(),
                        &member.path,
                        &member.file_id.hex_digest,
                        &member.file_id.algorithm.as_str(),
                        &member.blob.hex_digest,
                        &member.blob.algorithm.as_str(),
                    ],
                )
                .map_err(pg_err)?;
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
                &[
                    &commit.hex_digest,
                    &commit.algorithm.as_str(),
                    &tree.hex_digest,
                    &tree.algorithm.as_str(),
                    &author,
                    &committer,
                    &message,
                    &created_at,
                ],
            )
            .map_err(pg_err)?;

        let stmt = self
            .tx
            .prepare(self.scripts.commit_commit_parent)
            .map_err(pg_err)?;
        for (position, parent) in parents.iter().enumerate() {
            self.tx
                .execute(
                    &stmt,
                    &[
                        &commit.hex_digest,
                        &commit.algorithm.as_str(),
                        &parent.hex_digest,
                        &parent.algorithm.as_str(),
                        &(position as i64),
                    ],
                )
                .map_err(pg_err)?;
        }
        Ok(())
    }

    fn get_tree_members(&mut self, tree: &HashValue) -> Result<Vec<TreeMember>> {
        let rows = self
            .tx
            .query(
                self.scripts.read_tree_members,
                &[&tree.hex_digest, &tree.algorithm.as_str()],
            )
            .map_err(pg_err)?;

        let mut members = Vec::new();
        for row in rows {
            let path: String = row.get(0);
            let file_id_hex: String = row.get(1);
            let file_id_algo: String = row.get(2);
            let blob_hex: String = row.get(3);
            let blob_algo: String = row.get(4);
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
            .query_opt(
                self.scripts.read_commit,
                &[&commit.hex_digest, &commit.algorithm.as_str()],
            )
            .map_err(pg_err)?;

        let Some(row) = row else {
            return Ok(None);
        };
        let tree_hex: String = row.get(0);
        let tree_algo: String = row.get(1);

        let parent_rows = self
            .tx
            .query(
                self.scripts.read_commit_parents,
                &[&commit.hex_digest, &commit.algorithm.as_str()],
            )
            .map_err(pg_err)?;
        let mut parents = Vec::new();
        for parent_row in parent_rows {
            let hex: String = parent_row.get(0);
            let algo: String = parent_row.get(1);
            parents.push(HashValue::new(ObjectKind::Commit, parse_algo(&algo)?, hex));
        }

        Ok(Some(CommitRecord {
            hash: commit.clone(),
            tree: HashValue::new(ObjectKind::Tree, parse_algo(&tree_algo)?, tree_hex),
            author: row.get(2),
            committer: row.get(3),
            message: row.get(4),
            created_at: row.get(5),
            parents,
        }))
    }

    fn get_ref(&mut self, name: &str) -> Result<Option<RefTarget>> {
        let row = self
            .tx
            .query_opt(self.scripts.ref_get, &[&name])
            .map_err(pg_err)?;
        match row {
            Some(row) => {
                let hash: String = row.get(0);
                let algo: String = row.get(1);
                Ok(Some(RefTarget::decode(&hash, &algo)?))
            }
            None => Ok(None),
        }
    }

    fn create_ref(&mut self, name: &str, target: &RefTarget) -> Result<()> {
        let (hash, algo) = target.encode();
        self.tx
            .execute(self.scripts.ref_create, &[&name, &hash, &algo])
            .map_err(pg_err)?;
        Ok(())
    }

    fn update_ref(&mut self, name: &str, expected: &RefTarget, new: &RefTarget) -> Result<()> {
        let (new_hash, new_algo) = new.encode();
        let (expected_hash, expected_algo) = expected.encode();
        let changed = self
            .tx
            .execute(
                self.scripts.ref_update,
                &[&new_hash, &new_algo, &name, &expected_hash, &expected_algo],
            )
            .map_err(pg_err)?;

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
            .query_opt(
                self.scripts.exists_chunk,
                &[&chunk.hex_digest, &chunk.algorithm.as_str()],
            )
            .map_err(pg_err)?;
        Ok(row.is_some())
    }

    fn exists_blob(&mut self, blob: &HashValue) -> Result<bool> {
        let row = self
            .tx
            .query_opt(
                self.scripts.exists_blob,
                &[&blob.hex_digest, &blob.algorithm.as_str()],
            )
            .map_err(pg_err)?;
        Ok(row.is_some())
    }

    fn commit(self: Box<Self>) -> Result<()> {
        self.tx.commit().map_err(pg_err)
    }

    fn rollback(self: Box<Self>) -> Result<()> {
        self.tx.rollback().map_err(pg_err)
    }
}

fn parse_algo(algo: &str) -> Result<HashAlgorithm> {
    HashAlgorithm::from_str(algo)
        .map_err(|_| Error::Db(format!("unknown hash algorithm '{algo}' in object store")))
}
