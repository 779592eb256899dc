//! Havarti ignore engine and worktree walker
//!
//! `.hvrtignore` files may appear at any directory level of a working tree.
//! Each file's patterns apply to paths beneath its directory, in the order
//! they are written; the walker consults the accumulated pattern chain for
//! every entry it enumerates.

pub mod pattern;
pub mod walker;

pub use pattern::{IgnoreFile, Pattern, IGNORE_FILE_NAME};
pub use walker::{WalkEntry, WalkFlow, Walker};
