//! Byte-level diff and fuzzy patch toolkit.
//!
//! Re-exports the [`spanbuf`] buffer primitive and the diff/patch engines of
//! [`spandiff_core`]. The `span-diff` and `span-patch` binaries wrap
//! [`Diff`] construction and [`Patch`] application for files.

pub use spanbuf::bitap::{Bitap, BitapConfig, WORD_BITS};
pub use spanbuf::SpanBuf;
pub use spandiff_core::{
    ApplyResult, Diff, DiffBuilder, DiffFragment, Operation, Patch, PatchError, PatchFragment,
    Span,
};

/// Returns the crate version at compile time.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
