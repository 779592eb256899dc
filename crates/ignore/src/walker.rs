//! Depth-first worktree traversal with ignore evaluation
//!
//! The walker enumerates sorted directory entries, consults the ignore
//! chain for each, and dispatches to one of two callback slots: `visit`
//! for live entries, `visit_ignored` for ignored ones. Ignored directories
//! are never descended into. Symbolic links are reported but never
//! followed. The repository metadata directory is skipped outright, and
//! the working tree root is never tested against patterns.

use crate::pattern::IgnoreFile;
use hvrt_core::cancel::CancelToken;
use hvrt_core::config::METADATA_DIR;
use hvrt_core::error::Result;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// What the walker should do after a callback returns
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WalkFlow {
    /// Keep walking
    Continue,
    /// Do not descend into this directory (no effect on files)
    SkipDir,
    /// Stop the walk cleanly
    Stop,
}

/// One enumerated entry
///
/// When `error` is set the entry could not be fully read (a failed
/// `read_dir` or metadata call); the callback decides whether the walk
/// continues or aborts by returning `Ok` or `Err`.
#[derive(Debug)]
pub struct WalkEntry {
    /// Absolute path
    pub path: PathBuf,
    /// Path relative to the working tree root
    pub rel_path: PathBuf,
    pub is_dir: bool,
    pub is_symlink: bool,
    pub error: Option<std::io::Error>,
}

impl WalkEntry {
    /// Relative path with forward slashes, the form patterns match against
    pub fn rel_slash(&self) -> String {
        rel_to_slash(&self.rel_path)
    }
}

/// Convert a relative path to its slash-normalized string form
pub fn rel_to_slash(rel_path: &Path) -> String {
    let text = rel_path.to_string_lossy();
    if std::path::MAIN_SEPARATOR == '/' {
        text.into_owned()
    } else {
        text.replace(std::path::MAIN_SEPARATOR, "/")
    }
}

type WalkCallback<'a> = dyn FnMut(&WalkEntry) -> Result<WalkFlow> + 'a;

/// Ignore-aware depth-first walker rooted at a working tree
pub struct Walker {
    root: PathBuf,
    cancel: CancelToken,
    // Parsed ignore files memoized by directory for the duration of one
    // walker; absence is cached as None.
    cache: HashMap<PathBuf, Option<IgnoreFile>>,
}

impl Walker {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self::with_cancel(root, CancelToken::new())
    }

    pub fn with_cancel(root: impl Into<PathBuf>, cancel: CancelToken) -> Self {
        Self {
            root: root.into(),
            cancel,
            cache: HashMap::new(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Walk from a path relative to the root. A file start path emits a
    /// single callback; a directory start path is traversed depth-first.
    pub fn walk(
        &mut self,
        start_rel: &Path,
        visit: &mut WalkCallback<'_>,
        visit_ignored: &mut WalkCallback<'_>,
    ) -> Result<()> {
        let start_abs = self.root.join(start_rel);

        if start_rel.as_os_str().is_empty() || start_abs == self.root {
            self.walk_dir(&self.root.clone(), Path::new(""), visit, visit_ignored)?;
            return Ok(());
        }

        let metadata = std::fs::symlink_metadata(&start_abs)?;
        let entry = WalkEntry {
            path: start_abs.clone(),
            rel_path: start_rel.to_path_buf(),
            is_dir: metadata.is_dir(),
            is_symlink: metadata.file_type().is_symlink(),
            error: None,
        };

        if self.is_ignored(start_rel, entry.is_dir) {
            visit_ignored(&entry)?;
            return Ok(());
        }

        let flow = visit(&entry)?;
        if entry.is_dir && !entry.is_symlink && flow == WalkFlow::Continue {
            self.walk_dir(&start_abs, start_rel, visit, visit_ignored)?;
        }
        Ok(())
    }

    /// Evaluate the ignore chain for a path relative to the root
    ///
    /// Ancestor directories are consulted from the root down to the path's
    /// parent; within each ignore file, patterns apply in file order and
    /// the last match wins. The root itself is never ignored.
    pub fn is_ignored(&mut self, rel_path: &Path, is_dir: bool) -> bool {
        if rel_path.as_os_str().is_empty() {
            return false;
        }

        let slash = rel_to_slash(rel_path);
        let components: Vec<&str> = slash.split('/').collect();

        let mut ignored = false;
        let mut ancestor = self.root.clone();

        // components[..len-1] are the ancestor directories beneath the root
        for depth in 0..components.len() {
            if let Some(file) = self.ignore_file_for(&ancestor) {
                let remainder = components[depth..].join("/");
                ignored = file.apply(&remainder, is_dir, ignored);
            }
            if depth < components.len() - 1 {
                ancestor = ancestor.join(components[depth]);
            }
        }

        ignored
    }

    fn ignore_file_for(&mut self, dir: &Path) -> Option<IgnoreFile> {
        if let Some(cached) = self.cache.get(dir) {
            return cached.clone();
        }
        let loaded = match IgnoreFile::load(dir) {
            Ok(file) => file,
            Err(err) => {
                tracing::warn!("failed to read ignore file in {}: {err}", dir.display());
                None
            }
        };
        self.cache.insert(dir.to_path_buf(), loaded.clone());
        loaded
    }

    fn walk_dir(
        &mut self,
        dir_abs: &Path,
        dir_rel: &Path,
        visit: &mut WalkCallback<'_>,
        visit_ignored: &mut WalkCallback<'_>,
    ) -> Result<WalkFlow> {
        self.cancel.check()?;

        let mut entries = match std::fs::read_dir(dir_abs) {
            Ok(iter) => {
                let mut collected = Vec::new();
                for item in iter {
                    match item {
                        Ok(entry) => collected.push(entry),
                        Err(err) => {
                            let flow = visit(&WalkEntry {
                                path: dir_abs.to_path_buf(),
                                rel_path: dir_rel.to_path_buf(),
                                is_dir: true,
                                is_symlink: false,
                                error: Some(err),
                            })?;
                            if flow == WalkFlow::Stop {
                                return Ok(WalkFlow::Stop);
                            }
                        }
                    }
                }
                collected
            }
            Err(err) => {
                // Surface the failed directory through the visit callback;
                // Continue means skip it and move on.
                let flow = visit(&WalkEntry {
                    path: dir_abs.to_path_buf(),
                    rel_path: dir_rel.to_path_buf(),
                    is_dir: true,
                    is_symlink: false,
                    error: Some(err),
                })?;
                return Ok(flow);
            }
        };

        // Deterministic order: sorted directory entries, depth-first
        entries.sort_by_key(|e| e.file_name());

        for dir_entry in entries {
            self.cancel.check()?;

            let name = dir_entry.file_name();
            let rel_path = dir_rel.join(&name);

            // The metadata directory is not part of the working tree's
            // file set.
            if dir_rel.as_os_str().is_empty() && name == METADATA_DIR {
                continue;
            }

            let entry = match dir_entry.file_type() {
                Ok(file_type) => WalkEntry {
                    path: dir_entry.path(),
                    rel_path: rel_path.clone(),
                    is_dir: file_type.is_dir(),
                    is_symlink: file_type.is_symlink(),
                    error: None,
                },
                Err(err) => WalkEntry {
                    path: dir_entry.path(),
                    rel_path: rel_path.clone(),
                    is_dir: false,
                    is_symlink: false,
                    error: Some(err),
                },
            };

            if self.is_ignored(&rel_path, entry.is_dir) {
                match visit_ignored(&entry)? {
                    WalkFlow::Stop => return Ok(WalkFlow::Stop),
                    // Ignored directories are never descended into
                    WalkFlow::Continue | WalkFlow::SkipDir => {}
                }
                continue;
            }

            let flow = visit(&entry)?;
            match flow {
                WalkFlow::Stop => return Ok(WalkFlow::Stop),
                WalkFlow::SkipDir => continue,
                WalkFlow::Continue => {}
            }

            // Never follow symbolic links
            if entry.is_dir && !entry.is_symlink && entry.error.is_none() {
                if self.walk_dir(&entry.path, &rel_path, visit, visit_ignored)?
                    == WalkFlow::Stop
                {
                    return Ok(WalkFlow::Stop);
                }
            }
        }

        Ok(WalkFlow::Continue)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn write(root: &Path, rel: &str, contents: &str) {
        let path = root.join(rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, contents).unwrap();
    }

    fn collect_walk(root: &Path) -> (Vec<String>, Vec<String>) {
        let mut walker = Walker::new(root);
        let mut visited = Vec::new();
        let mut ignored = Vec::new();
        walker
            .walk(
                Path::new(""),
                &mut |entry| {
                    if !entry.is_dir {
                        visited.push(entry.rel_slash());
                    }
                    Ok(WalkFlow::Continue)
                },
                &mut |entry| {
                    ignored.push(entry.rel_slash());
                    Ok(WalkFlow::Continue)
                },
            )
            .unwrap();
        (visited, ignored)
    }

    #[test]
    fn test_walk_is_sorted_depth_first() {
        let temp_dir = tempfile::tempdir().unwrap();
        let root = temp_dir.path();
        write(root, "b.txt", "b");
        write(root, "a/nested.txt", "n");
        write(root, "a/zz.txt", "z");
        write(root, "c.txt", "c");

        let (visited, _) = collect_walk(root);
        assert_eq!(visited, vec!["a/nested.txt", "a/zz.txt", "b.txt", "c.txt"]);
    }

    #[test]
    fn test_metadata_dir_is_skipped() {
        let temp_dir = tempfile::tempdir().unwrap();
        let root = temp_dir.path();
        write(root, ".hvrt/work_tree_state.sqlite", "db");
        write(root, "tracked.txt", "t");

        let (visited, ignored) = collect_walk(root);
        assert_eq!(visited, vec!["tracked.txt"]);
        assert!(ignored.is_empty());
    }

    #[test]
    fn test_ignored_file_goes_to_second_callback() {
        let temp_dir = tempfile::tempdir().unwrap();
        let root = temp_dir.path();
        write(root, ".hvrtignore", "*.tmp\n");
        write(root, "keep.rs", "k");
        write(root, "drop.tmp", "d");

        let (visited, ignored) = collect_walk(root);
        assert_eq!(visited, vec![".hvrtignore", "keep.rs"]);
        assert_eq!(ignored, vec!["drop.tmp"]);
    }

    #[test]
    fn test_ignored_directory_not_descended() {
        let temp_dir = tempfile::tempdir().unwrap();
        let root = temp_dir.path();
        write(root, ".hvrtignore", "target/\n");
        write(root, "target/deep/artifact.bin", "a");
        write(root, "src/lib.rs", "l");

        let (visited, ignored) = collect_walk(root);
        assert_eq!(visited, vec![".hvrtignore", "src/lib.rs"]);
        assert_eq!(ignored, vec!["target"]);
    }

    #[test]
    fn test_nested_ignore_file_scopes_to_subtree() {
        let temp_dir = tempfile::tempdir().unwrap();
        let root = temp_dir.path();
        write(root, "sub/.hvrtignore", "*.gen\n");
        write(root, "sub/x.gen", "x");
        write(root, "top.gen", "t");

        let (visited, ignored) = collect_walk(root);
        assert_eq!(visited, vec!["sub/.hvrtignore", "top.gen"]);
        assert_eq!(ignored, vec!["sub/x.gen"]);
    }

    #[test]
    fn test_negation_in_deeper_file_unignores() {
        let temp_dir = tempfile::tempdir().unwrap();
        let root = temp_dir.path();
        write(root, ".hvrtignore", "*.log\n");
        write(root, "sub/.hvrtignore", "!keep.log\n");
        write(root, "sub/keep.log", "k");
        write(root, "sub/other.log", "o");

        let (visited, ignored) = collect_walk(root);
        assert_eq!(
            visited,
            vec![".hvrtignore", "sub/.hvrtignore", "sub/keep.log"]
        );
        assert_eq!(ignored, vec!["sub/other.log"]);
    }

    #[test]
    fn test_anchored_pattern_applies_from_its_directory() {
        let temp_dir = tempfile::tempdir().unwrap();
        let root = temp_dir.path();
        write(root, ".hvrtignore", "build/out.bin\n");
        write(root, "build/out.bin", "b");
        write(root, "sub/build/out.bin", "s");

        let (visited, ignored) = collect_walk(root);
        assert_eq!(visited, vec![".hvrtignore", "sub/build/out.bin"]);
        assert_eq!(ignored, vec!["build/out.bin"]);
    }

    #[test]
    fn test_walk_single_file_start() {
        let temp_dir = tempfile::tempdir().unwrap();
        let root = temp_dir.path();
        write(root, "only.txt", "o");

        let mut walker = Walker::new(root);
        let mut seen = Vec::new();
        walker
            .walk(
                Path::new("only.txt"),
                &mut |entry| {
                    seen.push(entry.rel_slash());
                    Ok(WalkFlow::Continue)
                },
                &mut |_| Ok(WalkFlow::Continue),
            )
            .unwrap();
        assert_eq!(seen, vec!["only.txt"]);
    }

    #[test]
    fn test_stop_halts_walk() {
        let temp_dir = tempfile::tempdir().unwrap();
        let root = temp_dir.path();
        write(root, "a.txt", "a");
        write(root, "b.txt", "b");
        write(root, "c.txt", "c");

        let mut walker = Walker::new(root);
        let mut seen = Vec::new();
        walker
            .walk(
                Path::new(""),
                &mut |entry| {
                    seen.push(entry.rel_slash());
                    if entry.rel_slash() == "b.txt" {
                        Ok(WalkFlow::Stop)
                    } else {
                        Ok(WalkFlow::Continue)
                    }
                },
                &mut |_| Ok(WalkFlow::Continue),
            )
            .unwrap();
        assert_eq!(seen, vec!["a.txt", "b.txt"]);
    }

    #[test]
    fn test_cancellation_aborts_walk() {
        let temp_dir = tempfile::tempdir().unwrap();
        let root = temp_dir.path();
        write(root, "a.txt", "a");
        write(root, "b.txt", "b");

        let cancel = CancelToken::new();
        let mut walker = Walker::with_cancel(root, cancel.clone());
        let cancel_inner = cancel.clone();
        let result = walker.walk(
            Path::new(""),
            &mut |_| {
                cancel_inner.cancel();
                Ok(WalkFlow::Continue)
            },
            &mut |_| Ok(WalkFlow::Continue),
        );
        assert!(matches!(
            result,
            Err(hvrt_core::Error::Cancelled)
        ));
    }

    #[test]
    fn test_symlinked_dir_not_followed() {
        let temp_dir = tempfile::tempdir().unwrap();
        let root = temp_dir.path();
        write(root, "real/file.txt", "f");
        #[cfg(unix)]
        std::os::unix::fs::symlink(root.join("real"), root.join("link")).unwrap();

        let (visited, _) = collect_walk(root);
        // the link itself shows up, its contents do not
        assert!(visited.contains(&"real/file.txt".to_string()));
        assert!(!visited.iter().any(|p| p.starts_with("link/")));
    }

    #[test]
    fn test_is_ignored_root_never() {
        let temp_dir = tempfile::tempdir().unwrap();
        write(temp_dir.path(), ".hvrtignore", "*\n");
        let mut walker = Walker::new(temp_dir.path());
        assert!(!walker.is_ignored(Path::new(""), true));
    }
}
