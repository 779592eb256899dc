//! Error taxonomy shared across the Havarti crates.

use thiserror::Error;

/// Error kinds surfaced by the core, ignore, store, and repo layers.
///
/// The CLI maps these onto process exit codes: `Argument` exits 2, every
/// other kind exits 1.
#[derive(Error, Debug)]
pub enum Error {
    /// Filesystem or stream failure
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Internal contract broken; indicates a bug, not bad input
    #[error("invariant violation: {0}")]
    InvariantViolation(String),

    /// Compressor-internal failure
    #[error("compression error: {0}")]
    Compression(String),

    /// Unknown algorithm or malformed hash identity
    #[error("hash error: {0}")]
    Hash(String),

    /// Backing store failure
    #[error("database error: {0}")]
    Db(String),

    /// Ref compare-and-swap lost, or a unique-key violation that should
    /// have been idempotent
    #[error("conflict: {0}")]
    Conflict(String),

    /// Missing worktree root, repository database, or object
    #[error("not found: {0}")]
    NotFound(String),

    /// Unparseable ignore pattern; always recovered, never fatal
    #[error("malformed pattern: {0}")]
    MalformedPattern(String),

    /// Bad user input below the CLI parsing layer
    #[error("argument error: {0}")]
    Argument(String),

    /// Operation aborted through a `CancelToken`
    #[error("operation cancelled")]
    Cancelled,
}

impl Error {
    /// Whether retrying the same operation could succeed (CAS losses and
    /// cancellations; everything else is deterministic).
    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::Conflict(_) | Error::Cancelled)
    }
}

/// Common result type used throughout the Havarti crates
pub type Result<T> = std::result::Result<T, Error>;
