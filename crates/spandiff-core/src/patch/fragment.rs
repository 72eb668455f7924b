//! One patch operation: a run of diff fragments plus the byte spans it
//! covers in the left and right documents.

use std::fmt;

use spanbuf::bitap::WORD_BITS;
use spanbuf::SpanBuf;

use crate::diff::{Diff, DiffFragment};
use crate::operation::Operation;

use super::text::encode_payload;

/// Byte footprint within one document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    /// Offset of the first byte.
    pub offset: usize,
    /// Number of bytes covered.
    pub length: usize,
}

impl Span {
    /// Creates a span from an offset and a length.
    pub fn new(offset: usize, length: usize) -> Self {
        Self { offset, length }
    }

    /// Offset one past the last byte.
    pub fn end(&self) -> usize {
        self.offset + self.length
    }
}

/// A single patch fragment.
///
/// The diff fragments include the edits and the surrounding EQUAL context.
/// The sum of the non-INSERT fragment lengths equals the left span length;
/// the sum of the non-DELETE fragment lengths equals the right span length.
#[derive(Debug, Clone)]
pub struct PatchFragment {
    left: Span,
    right: Span,
    fragments: Vec<DiffFragment>,
}

impl PatchFragment {
    /// Creates an empty fragment anchored at the given left and right
    /// positions.
    pub fn new(left_pos: usize, right_pos: usize) -> Self {
        Self::from_spans(Span::new(left_pos, 0), Span::new(right_pos, 0))
    }

    /// Creates an empty fragment from two spans.
    pub fn from_spans(left: Span, right: Span) -> Self {
        Self {
            left,
            right,
            fragments: Vec::new(),
        }
    }

    /// The span this fragment covers in the left document.
    pub fn left_span(&self) -> Span {
        self.left
    }

    /// The span this fragment covers in the right document.
    pub fn right_span(&self) -> Span {
        self.right
    }

    /// Replaces the left span.
    pub fn set_left_span(&mut self, span: Span) {
        self.left = span;
    }

    /// Replaces the right span.
    pub fn set_right_span(&mut self, span: Span) {
        self.right = span;
    }

    /// The diff fragments in order.
    pub fn fragments(&self) -> &[DiffFragment] {
        &self.fragments
    }

    /// Returns `true` when the fragment holds no diff fragments.
    pub fn is_empty(&self) -> bool {
        self.fragments.is_empty()
    }

    /// The first diff fragment.
    pub fn first(&self) -> Option<&DiffFragment> {
        self.fragments.first()
    }

    /// The last diff fragment.
    pub fn last(&self) -> Option<&DiffFragment> {
        self.fragments.last()
    }

    /// Appends a diff fragment.
    pub fn push(&mut self, fragment: DiffFragment) {
        self.fragments.push(fragment);
    }

    /// Prepends a diff fragment.
    pub fn push_front(&mut self, fragment: DiffFragment) {
        self.fragments.insert(0, fragment);
    }

    /// Removes and returns the first diff fragment.
    pub fn remove_first(&mut self) -> DiffFragment {
        self.fragments.remove(0)
    }

    /// Replaces the first diff fragment.
    pub fn replace_first(&mut self, fragment: DiffFragment) {
        self.fragments[0] = fragment;
    }

    /// Replaces the last diff fragment.
    pub fn replace_last(&mut self, fragment: DiffFragment) {
        let last = self.fragments.len() - 1;
        self.fragments[last] = fragment;
    }

    /// The diff formed by this fragment's diff fragments.
    pub fn diff(&self) -> Diff {
        Diff::from_fragments(self.fragments.clone())
    }

    /// The left-document bytes this fragment covers (edits plus context).
    pub fn left_buffer(&self) -> SpanBuf {
        self.diff().extract(Operation::Insert)
    }

    /// The right-document bytes this fragment covers (edits plus context).
    pub fn right_buffer(&self) -> SpanBuf {
        self.diff().extract(Operation::Delete)
    }

    /// Appends a diff fragment during patch construction, maintaining the
    /// spans and the running post-patch buffer.
    ///
    /// `patch_loc` is the position within `post_patch` where the change
    /// lands. Small equalities (at most twice the margin) are kept inside
    /// the patch; longer ones are left for the caller to finalize on.
    pub fn add(
        &mut self,
        fragment: DiffFragment,
        margin: usize,
        post_patch: SpanBuf,
        patch_loc: usize,
    ) -> SpanBuf {
        match fragment.op() {
            Operation::Insert => {
                // The right side grows.
                self.right = Span::new(self.right.offset, self.right.length + fragment.len());
                let patched = SpanBuf::merge([
                    &post_patch.head(patch_loc),
                    fragment.buf(),
                    &post_patch.cut(patch_loc),
                ]);
                self.fragments.push(fragment);
                patched
            }
            Operation::Delete => {
                // The left side grows.
                self.left = Span::new(self.left.offset, self.left.length + fragment.len());
                let patched = SpanBuf::merge([
                    &post_patch.head(patch_loc),
                    &post_patch.cut(patch_loc + fragment.len()),
                ]);
                self.fragments.push(fragment);
                patched
            }
            Operation::Equal => {
                if fragment.len() <= 2 * margin && !self.is_empty() {
                    // Small equality inside a patch.
                    self.left = Span::new(self.left.offset, self.left.length + fragment.len());
                    self.right = Span::new(self.right.offset, self.right.length + fragment.len());
                    self.fragments.push(fragment);
                }
                post_patch
            }
        }
    }

    /// Surrounds the patch payload with enough equal context from the
    /// pre-patch buffer `text` that the pattern is unique, then one extra
    /// margin for luck.
    pub fn add_context(&mut self, text: &SpanBuf, margin: usize) {
        if text.is_empty() {
            return;
        }

        let mut pattern = text.cut(self.right.offset).head(self.left.length);
        let mut padding = 0usize;

        // Grow the pattern until it pins down a single position in the text,
        // within the window the bitap matcher can handle.
        while text.find(&pattern) != text.rfind(&pattern)
            && pattern.len() < WORD_BITS.saturating_sub(2 * margin)
        {
            padding += margin;
            let start = self.right.offset.saturating_sub(padding);
            let end = text.len().min(self.right.offset + self.left.length + padding);
            pattern = text.slice(start..end);
        }
        // One more chunk for good luck.
        padding += margin;

        let prefix_start = self.right.offset.saturating_sub(padding);
        let prefix = text.slice(prefix_start..self.right.offset);
        if !prefix.is_empty() {
            self.fragments
                .insert(0, DiffFragment::new(Operation::Equal, prefix.clone()));
        }

        let rest = text.cut(self.right.offset + self.left.length);
        let suffix = rest.head(rest.len().min(padding));
        if !suffix.is_empty() {
            self.fragments
                .push(DiffFragment::new(Operation::Equal, suffix.clone()));
        }

        // Roll the start points back and extend the lengths.
        self.left = Span::new(
            self.left.offset - prefix.len(),
            self.left.length + prefix.len() + suffix.len(),
        );
        self.right = Span::new(
            self.right.offset - prefix.len(),
            self.right.length + prefix.len() + suffix.len(),
        );
    }

    /// Header coordinates, printed 1-based like GNU diff. A zero-length span
    /// keeps its raw offset with an explicit `,0`; a one-byte span prints the
    /// position alone.
    fn coords(span: Span) -> String {
        if span.length == 0 {
            format!("{},0", span.offset)
        } else if span.length == 1 {
            format!("{}", span.offset + 1)
        } else {
            format!("{},{}", span.offset + 1, span.length)
        }
    }
}

impl fmt::Display for PatchFragment {
    /// Emulates GNU diff's block format, e.g. `@@ -382,8 +481,9 @@`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "@@ -{} +{} @@",
            Self::coords(self.left),
            Self::coords(self.right)
        )?;
        for fragment in &self.fragments {
            writeln!(
                f,
                "{}{}",
                fragment.op().glyph(),
                encode_payload(fragment.buf().as_bytes())
            )?;
        }
        Ok(())
    }
}
