//! Core diff and patch engines for spandiff-rs.
//!
//! The [`diff`] module builds a minimal byte-level edit script between two
//! buffers (Myers bisect with prefix/suffix trimming and a half-match
//! divide-and-conquer heuristic) and canonicalizes it with a merge/shift
//! cleanup pass. The [`patch`] module turns a diff into context-carrying
//! patch fragments, serializes them in a unified-diff-like text format, and
//! fuzzily re-applies them to drifted buffers via the bitap matcher.

pub mod diff;
pub mod operation;
pub mod patch;

pub use diff::{Diff, DiffBuilder, DiffFragment};
pub use operation::Operation;
pub use patch::{ApplyResult, Patch, PatchError, PatchFragment, Span};

/// Returns the crate version at compile time.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
