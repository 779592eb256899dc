//! `.hvrtignore` pattern parsing and matching
//!
//! Line semantics, evaluated relative to the directory containing the
//! ignore file:
//! - `#` starts a comment; blank lines are skipped
//! - a leading `!` negates the pattern
//! - a trailing `/` restricts the pattern to directories
//! - a `/` anywhere else anchors the pattern to the ignore file's directory;
//!   without one the pattern matches basenames at any depth
//! - trailing whitespace is trimmed unless escaped with `\`
//! - globbing is shell style, including `**`; matching is case-insensitive
//!   on Windows to follow the filesystem convention

use glob::MatchOptions;
use hvrt_core::error::{Error, Result};
use std::path::Path;
use tracing::warn;

/// Name of the per-directory ignore file
pub const IGNORE_FILE_NAME: &str = ".hvrtignore";

/// One parsed ignore pattern
#[derive(Debug, Clone)]
pub struct Pattern {
    glob: glob::Pattern,
    negated: bool,
    dir_only: bool,
    anchored: bool,
}

impl Pattern {
    /// Parse a single line. Returns `Ok(None)` for blanks and comments,
    /// `Err(MalformedPattern)` for glob syntax errors.
    pub fn parse(line: &str) -> Result<Option<Pattern>> {
        let mut text = trim_trailing_whitespace(line);

        if text.is_empty() || text.starts_with('#') {
            return Ok(None);
        }

        let negated = text.starts_with('!');
        if negated {
            text.remove(0);
        }

        let dir_only = text.ends_with('/');
        if dir_only {
            text.pop();
        }

        if text.is_empty() {
            return Ok(None);
        }

        let anchored = text.contains('/');
        let glob = glob::Pattern::new(&text)
            .map_err(|e| Error::MalformedPattern(format!("'{line}': {e}")))?;

        Ok(Some(Pattern {
            glob,
            negated,
            dir_only,
            anchored,
        }))
    }

    pub fn is_negated(&self) -> bool {
        self.negated
    }

    /// Test a path given relative to the ignore file's directory,
    /// slash-normalized.
    pub fn matches(&self, rel_path: &str, is_dir: bool) -> bool {
        if self.dir_only && !is_dir {
            return false;
        }

        let options = MatchOptions {
            case_sensitive: cfg!(not(windows)),
            require_literal_separator: self.anchored,
            require_literal_leading_dot: false,
        };

        if self.anchored {
            self.glob.matches_with(rel_path, options)
        } else {
            // Unanchored patterns match the basename at any depth
            let basename = rel_path.rsplit('/').next().unwrap_or(rel_path);
            self.glob.matches_with(basename, options)
        }
    }
}

/// Trailing whitespace is dropped; a `\`-escaped whitespace character is
/// kept (with the backslash removed) and ends the trimming.
fn trim_trailing_whitespace(line: &str) -> String {
    let mut chars: Vec<char> = line.chars().collect();
    while let Some(&last) = chars.last() {
        if last != ' ' && last != '\t' {
            break;
        }
        if chars.len() >= 2 && chars[chars.len() - 2] == '\\' {
            chars.remove(chars.len() - 2);
            break;
        }
        chars.pop();
    }
    chars.into_iter().collect()
}

/// All patterns from one `.hvrtignore` file, in file order
#[derive(Debug, Clone, Default)]
pub struct IgnoreFile {
    patterns: Vec<Pattern>,
}

impl IgnoreFile {
    /// Parse ignore file text. Malformed patterns are logged and skipped,
    /// never fatal.
    pub fn parse(text: &str) -> IgnoreFile {
        let mut patterns = Vec::new();
        for line in text.lines() {
            match Pattern::parse(line) {
                Ok(Some(pattern)) => patterns.push(pattern),
                Ok(None) => {}
                Err(err) => warn!("skipping malformed ignore pattern: {err}"),
            }
        }
        IgnoreFile { patterns }
    }

    /// Load the ignore file of a directory. `Ok(None)` when absent.
    pub fn load(dir: &Path) -> Result<Option<IgnoreFile>> {
        let path = dir.join(IGNORE_FILE_NAME);
        match std::fs::read_to_string(&path) {
            Ok(text) => Ok(Some(IgnoreFile::parse(&text))),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    /// Fold this file's patterns, in order, over the ignored flag. A match
    /// on a plain pattern sets the flag; a match on a negated pattern
    /// clears it.
    pub fn apply(&self, rel_path: &str, is_dir: bool, mut ignored: bool) -> bool {
        for pattern in &self.patterns {
            if pattern.matches(rel_path, is_dir) {
                ignored = !pattern.negated;
            }
        }
        ignored
    }
}
