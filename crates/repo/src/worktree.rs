//! Worktree discovery and path handling

use hvrt_core::config::{Config, CONFIG_FILE_NAME, METADATA_DIR};
use hvrt_core::error::{Error, Result};
use hvrt_store::{open_repo, RepoStore, StagingStore};
use std::path::{Component, Path, PathBuf};

/// An opened working tree: its root directory plus the configuration
/// loaded once for the invocation
pub struct Worktree {
    root: PathBuf,
    config: Config,
}

impl Worktree {
    /// Find the worktree root by walking up from `start` to the first
    /// directory containing `.hvrt/`
    pub fn discover(start: &Path) -> Result<Worktree> {
        let mut current = if start.is_absolute() {
            start.to_path_buf()
        } else {
            std::env::current_dir()?.join(start)
        };

        loop {
            let metadata_dir = current.join(METADATA_DIR);
            if metadata_dir.is_dir() {
                return Worktree::open(&current);
            }
            if !current.pop() {
                return Err(Error::NotFound(format!(
                    "no {METADATA_DIR} work tree in '{}' or any parent directory",
                    start.display()
                )));
            }
        }
    }

    /// Open a known worktree root
    pub fn open(root: &Path) -> Result<Worktree> {
        let root = std::fs::canonicalize(root)?;
        if !root.join(METADATA_DIR).is_dir() {
            return Err(Error::NotFound(format!(
                "no {METADATA_DIR} directory under '{}'",
                root.display()
            )));
        }
        let config = Config::load(&root.join(METADATA_DIR).join(CONFIG_FILE_NAME))?;
        Ok(Worktree { root, config })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn metadata_dir(&self) -> PathBuf {
        self.root.join(METADATA_DIR)
    }

    /// Open the staging database of this worktree
    pub fn open_staging(&self) -> Result<StagingStore> {
        StagingStore::open(&self.root)
    }

    /// Open the repository database named by configuration
    pub fn open_repo(&self) -> Result<Box<dyn RepoStore>> {
        let uri = self.config.repo_uri(&self.root);
        open_repo(self.config.worktree.repo.engine, &uri)
    }

    /// Resolve a user-supplied path to a worktree-relative path. Rejects
    /// anything that escapes the root.
    pub fn rel_path(&self, given: &Path) -> Result<PathBuf> {
        let absolute = if given.is_absolute() {
            given.to_path_buf()
        } else {
            std::env::current_dir()?.join(given)
        };

        // Resolve through the filesystem when possible so symlinked roots
        // compare equal; fall back to lexical normalization for paths that
        // do not exist yet (removals).
        let normalized = match std::fs::canonicalize(&absolute) {
            Ok(path) => path,
            Err(_) => lexical_normalize(&absolute),
        };

        normalized
            .strip_prefix(&self.root)
            .map(|p| p.to_path_buf())
            .map_err(|_| {
                Error::Argument(format!(
                    "path '{}' is outside the work tree '{}'",
                    given.display(),
                    self.root.display()
                ))
            })
    }
}

/// Collapse `.` and `..` components without consulting the filesystem
fn lexical_normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

/// Current time as seconds since the Unix epoch, for `added_at` stamps
pub(crate) fn now_epoch() -> i64 {
    chrono::Utc::now().timestamp()
}

/// Current time as an ISO-8601 UTC string, for commit headers
pub(crate) fn now_rfc3339() -> String {
    chrono::Utc::now().to_rfc3339()
}
