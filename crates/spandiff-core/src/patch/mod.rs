//! Patch construction, serialization and fuzzy application.
//!
//! A [`Patch`] is an ordered list of [`PatchFragment`]s built from a diff.
//! Applying a patch locates each fragment in the (possibly drifted) target
//! buffer with the bitap matcher, falls back to an internal diff when the
//! located bytes disagree with the expected ones, and reports per-fragment
//! success bits alongside the patched buffer.

mod fragment;
mod text;

use std::fmt;

use spanbuf::bitap::{Bitap, BitapConfig, WORD_BITS};
use spanbuf::SpanBuf;
use thiserror::Error;
use tracing::{debug, warn};

use crate::diff::{Diff, DiffFragment};
use crate::operation::Operation;

pub use fragment::{PatchFragment, Span};

/// Default margin of context bytes placed around a patch payload, and the
/// default length of the synthetic edge padding during apply.
pub const DEFAULT_PADDING_LENGTH: usize = 4;

/// Default maximum levenshtein/length ratio accepted when applying a large
/// delete over drifted content.
pub const DEFAULT_DELETE_THRESHOLD: f64 = 0.5;

/// Errors surfaced by patch parsing and application.
#[derive(Debug, Error)]
pub enum PatchError {
    /// A header line did not match `@@ -A[,B] +C[,D] @@`.
    #[error("invalid patch header: {0}")]
    MalformedHeader(String),
    /// A body line carried a malformed percent escape.
    #[error("illegal escape in patch body: {0}")]
    MalformedEscape(String),
    /// A body line started with an unknown operation glyph.
    #[error("unknown operation glyph {0:?}")]
    UnknownGlyph(char),
    /// The padding length must stay below the bitap word width.
    #[error("padding length {0} must be less than {WORD_BITS}")]
    PaddingTooLong(usize),
    /// The buffer cannot hold a fragment's expected location.
    #[error("input too short: no byte at expected location {0}")]
    InputTooShort(i64),
}

/// An ordered list of patch fragments plus the matcher configuration used to
/// apply them.
#[derive(Debug, Clone)]
pub struct Patch {
    fragments: Vec<PatchFragment>,
    config: BitapConfig,
    delete_threshold: f64,
}

impl Default for Patch {
    fn default() -> Self {
        Self {
            fragments: Vec::new(),
            config: BitapConfig::default(),
            delete_threshold: DEFAULT_DELETE_THRESHOLD,
        }
    }
}

impl Patch {
    /// Creates an empty patch.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a patch from a diff, reconstructing the left buffer from the
    /// diff itself.
    pub fn from_diff(diff: &Diff) -> Self {
        Self::from_buffer_diff(&diff.extract(Operation::Insert), diff)
    }

    /// Builds a patch from the left buffer and a diff over it, using the
    /// default context margin.
    pub fn from_buffer_diff(buffer: &SpanBuf, diff: &Diff) -> Self {
        Self::with_margin(buffer, diff, DEFAULT_PADDING_LENGTH)
    }

    /// Builds a patch from the left buffer and a diff over it.
    ///
    /// The diff is replayed over the buffer; a fragment opens at the first
    /// edit and closes at the next equality of at least twice the margin,
    /// picking up `margin`-sized unique context from the pre-patch text.
    pub fn with_margin(buffer: &SpanBuf, diff: &Diff, margin: usize) -> Self {
        let mut patch = Patch::new();
        if diff.is_empty() {
            // Get rid of the null case.
            return patch;
        }

        let mut bytes_left = 0usize;
        let mut bytes_right = 0usize;
        // Start with the pre-patch text and apply the diff until we arrive at
        // the post-patch text, recreating the patches one by one to pick up
        // context information.
        let mut prepatch = buffer.clone();
        let mut postpatch = buffer.clone();
        let mut current: Option<PatchFragment> = None;
        let last_index = diff.fragments().len() - 1;

        for (index, fragment) in diff.fragments().iter().enumerate() {
            if current.is_none() && fragment.op() != Operation::Equal {
                // A new patch starts here.
                current = Some(PatchFragment::new(bytes_left, bytes_right));
            }

            let mut close = false;
            if let Some(open) = current.as_mut() {
                // The terminal equality of the whole diff carries no payload.
                let terminal_equal = fragment.op() == Operation::Equal && index == last_index;
                if !terminal_equal {
                    postpatch = open.add(fragment.clone(), margin, postpatch, bytes_right);
                }
                // Time for a new patch.
                close = fragment.op() == Operation::Equal
                    && fragment.len() >= 2 * margin
                    && !open.is_empty();
            }
            if close {
                let mut open = current.take().expect("fragment is open");
                open.add_context(&prepatch, margin);
                patch.fragments.push(open);
                prepatch = postpatch.clone();
                bytes_left = bytes_right;
            }

            if fragment.op() != Operation::Insert {
                bytes_left += fragment.len();
            }
            if fragment.op() != Operation::Delete {
                bytes_right += fragment.len();
            }
        }
        // Pick up the leftover patch if not empty.
        if let Some(mut open) = current {
            if !open.is_empty() {
                open.add_context(&prepatch, margin);
                patch.fragments.push(open);
            }
        }
        patch
    }

    /// Parses the textual patch format.
    pub fn parse(text: &str) -> Result<Self, PatchError> {
        let mut patch = Patch::new();
        patch.fragments = text::parse_fragments(text)?;
        Ok(patch)
    }

    /// Returns `true` when the patch holds no fragments.
    pub fn is_empty(&self) -> bool {
        self.fragments.is_empty()
    }

    /// Number of fragments in the patch.
    pub fn len(&self) -> usize {
        self.fragments.len()
    }

    /// The fragments in order.
    pub fn fragments(&self) -> &[PatchFragment] {
        &self.fragments
    }

    /// Appends a fragment.
    pub fn push(&mut self, fragment: PatchFragment) {
        self.fragments.push(fragment);
    }

    /// The left-document spans of all fragments.
    pub fn left_spans(&self) -> impl Iterator<Item = Span> + '_ {
        self.fragments.iter().map(|f| f.left_span())
    }

    /// The right-document spans of all fragments.
    pub fn right_spans(&self) -> impl Iterator<Item = Span> + '_ {
        self.fragments.iter().map(|f| f.right_span())
    }

    /// Sets how close the contents of a large delete have to be to the
    /// expected contents (0.0 = perfection, 1.0 = very loose). The match
    /// threshold separately controls how closely the end points must match.
    pub fn set_delete_threshold(&mut self, delete_threshold: f64) {
        self.delete_threshold = delete_threshold;
    }

    /// Replaces the matcher configuration.
    pub fn set_match_config(&mut self, config: BitapConfig) {
        self.config = config;
    }

    /// Sets the matcher score threshold.
    pub fn set_match_threshold(&mut self, threshold: f64) {
        self.config.threshold = threshold;
    }

    /// Sets the matcher distance.
    pub fn set_match_distance(&mut self, distance: usize) {
        self.config.distance = distance;
    }

    /// Creates a copy of this patch with the left and right sides swapped:
    /// applying the result to the right document yields the left document.
    pub fn reverse(&self) -> Self {
        let mut reversed = Patch::new();
        // Cumulative net length change of the fragments walked so far.
        let mut offset = 0i64;
        for fragment in &self.fragments {
            let left = fragment.left_span();
            let right = fragment.right_span();
            let mut out = PatchFragment::from_spans(
                Span::new((right.offset as i64 + offset) as usize, right.length),
                Span::new((left.offset as i64 + offset) as usize, left.length),
            );
            for df in fragment.fragments() {
                match df.op() {
                    Operation::Delete => {
                        out.push(DiffFragment::new(Operation::Insert, df.buf().clone()));
                        offset += df.len() as i64;
                    }
                    Operation::Insert => {
                        out.push(DiffFragment::new(Operation::Delete, df.buf().clone()));
                        offset -= df.len() as i64;
                    }
                    Operation::Equal => out.push(df.clone()),
                }
            }
            reversed.fragments.push(out);
        }
        reversed
    }

    /// Applies the patch to a buffer with the default edge padding.
    pub fn apply(&self, buffer: &SpanBuf) -> Result<ApplyResult, PatchError> {
        self.apply_with_padding(buffer, DEFAULT_PADDING_LENGTH)
    }

    /// Applies the patch to a buffer.
    ///
    /// The buffer is framed with `padding_length` synthetic bytes so edge
    /// fragments have context to match against; fragments are split to the
    /// bitap window, located fuzzily, and applied. The result carries one
    /// bit per fragment recording which ones took.
    pub fn apply_with_padding(
        &self,
        buffer: &SpanBuf,
        padding_length: usize,
    ) -> Result<ApplyResult, PatchError> {
        if padding_length >= WORD_BITS {
            return Err(PatchError::PaddingTooLong(padding_length));
        }
        if self.fragments.is_empty() {
            return Ok(ApplyResult {
                used: Vec::new(),
                result: buffer.clone(),
            });
        }

        let null_padding = SpanBuf::from((1..=padding_length as u8).collect::<Vec<u8>>());
        let mut fragments = self.apply_padding(&null_padding);
        let mut patched = SpanBuf::merge([&null_padding, buffer, &null_padding]);
        Self::split_max(&mut fragments, padding_length);

        let bitap = Bitap::new(self.config);
        let mut used = vec![false; fragments.len()];
        // Offset between the expected and actual location of the previous
        // fragment: with fragments expected at 10 and 20 but the first found
        // at 12, the second's effective expected position is 22.
        let mut delta = 0i64;

        for (index, fragment) in fragments.iter().enumerate() {
            let expected = fragment.right_span().offset as i64 + delta;
            if expected < 0 || expected >= patched.len() as i64 {
                return Err(PatchError::InputTooShort(expected));
            }
            let expected = expected as usize;
            let left = fragment.left_buffer();

            let located = if left.len() > WORD_BITS {
                // split_max only leaves an oversized pattern for a monster
                // delete; anchor its head and tail separately.
                let start = bitap
                    .execute(
                        &patched,
                        &left.head(WORD_BITS),
                        patched.make_absolute(expected),
                    )
                    .map(|abs| patched.make_relative(abs));
                let end = bitap
                    .execute(
                        &patched,
                        &left.tail(WORD_BITS),
                        patched.make_absolute(expected + left.len() - WORD_BITS),
                    )
                    .map(|abs| patched.make_relative(abs));
                match (start, end) {
                    // Without valid trailing context the fragment is dropped.
                    (Some(start), Some(end)) if start < end => Some((start, Some(end))),
                    _ => None,
                }
            } else {
                bitap
                    .execute(&patched, &left, patched.make_absolute(expected))
                    .map(|abs| (patched.make_relative(abs), None))
            };

            let Some((start_loc, end_loc)) = located else {
                warn!(fragment = index, "no match found, dropping patch fragment");
                // Subtract the delta of this failed fragment from subsequent
                // expected positions.
                delta -=
                    fragment.right_span().length as i64 - fragment.left_span().length as i64;
                continue;
            };

            delta = start_loc as i64 - expected as i64;
            let patched_text = match end_loc {
                None => patched
                    .cut(start_loc)
                    .head(left.len().min(patched.len() - start_loc)),
                Some(end) => patched.slice(start_loc..(end + WORD_BITS).min(patched.len())),
            };

            if left == patched_text {
                // Perfect match: shove the replacement text in.
                patched = SpanBuf::merge([
                    &patched.head(start_loc),
                    &fragment.diff().extract(Operation::Delete),
                    &patched.cut(start_loc + left.len()),
                ]);
                used[index] = true;
            } else {
                debug!(fragment = index, "imperfect match, diffing the region");
                match self.imperfect_match(&left, &patched_text, &patched, fragment, start_loc) {
                    Some(next) => {
                        patched = next;
                        used[index] = true;
                    }
                    None => {
                        warn!(fragment = index, "no acceptable close match, dropping");
                    }
                }
            }
        }

        // Strip the padding off.
        let patched = patched.cut(null_padding.len());
        let patched = patched.head(patched.len() - null_padding.len());
        Ok(ApplyResult {
            used,
            result: patched,
        })
    }

    /// Applies the patch fragment to a region whose bytes disagree with the
    /// expected left text, by diffing the two and mapping edit positions
    /// through the result. Returns `None` when the region is too far gone.
    fn imperfect_match(
        &self,
        left: &SpanBuf,
        patched_text: &SpanBuf,
        patched: &SpanBuf,
        fragment: &PatchFragment,
        start_loc: usize,
    ) -> Option<SpanBuf> {
        const ONE_MB: usize = 1024 * 1024;
        // Run a diff to get a framework of equivalent indices.
        let mut builder = Diff::builder();
        if left.len().min(patched_text.len()) >= ONE_MB {
            builder = builder.process_seconds(1.0);
        }
        let diffs = builder.build(left, patched_text);
        if left.len() > WORD_BITS
            && diffs.levenshtein() as f64 / left.len() as f64 > self.delete_threshold
        {
            // The end points match, but the content is unacceptably bad.
            return None;
        }

        let mut patched = patched.clone();
        let mut index1 = 0usize;
        for df in fragment.fragments() {
            if df.op() != Operation::Equal {
                let index2 = diffs.map_index(index1);
                if df.op() == Operation::Insert {
                    patched = SpanBuf::merge([
                        &patched.head(start_loc + index2),
                        df.buf(),
                        &patched.cut(start_loc + index2),
                    ]);
                } else {
                    let delete_end = diffs.map_index(index1 + df.len());
                    patched = SpanBuf::merge([
                        &patched.head(start_loc + index2),
                        &patched.cut(start_loc + delete_end),
                    ]);
                }
            }
            if df.op() != Operation::Delete {
                index1 += df.len();
            }
        }
        Some(patched)
    }

    /// Returns a deep copy of the fragments with synthetic padding applied:
    /// all spans shift forward by the padding length, and the first and last
    /// fragments grow edge equalities covering the full padding so bitap has
    /// context to match at the document edges.
    fn apply_padding(&self, null_padding: &SpanBuf) -> Vec<PatchFragment> {
        let pad = null_padding.len();
        let mut fragments: Vec<PatchFragment> = self
            .fragments
            .iter()
            .map(|fragment| {
                let mut copy = fragment.clone();
                let left = copy.left_span();
                copy.set_left_span(Span::new(left.offset + pad, left.length));
                let right = copy.right_span();
                copy.set_right_span(Span::new(right.offset + pad, right.length));
                copy
            })
            .collect();

        // Pad the start of the first fragment.
        let first = fragments.first_mut().expect("patch has fragments");
        if first.first().map(|f| f.op()) != Some(Operation::Equal) {
            // Add a padding equality.
            first.push_front(DiffFragment::new(Operation::Equal, null_padding.clone()));
            let left = first.left_span();
            first.set_left_span(Span::new(left.offset - pad, left.length + pad));
            let right = first.right_span();
            first.set_right_span(Span::new(right.offset - pad, right.length + pad));
        } else if pad > first.first().map(|f| f.len()).unwrap_or(0) {
            // Grow the first equality backwards over the missing padding.
            let head = first.first().expect("checked above").clone();
            let extra = pad - head.len();
            first.replace_first(DiffFragment::new(
                head.op(),
                null_padding.cut(head.len()).concat(head.buf()),
            ));
            let left = first.left_span();
            first.set_left_span(Span::new(left.offset - extra, left.length + extra));
            let right = first.right_span();
            first.set_right_span(Span::new(right.offset - extra, right.length + extra));
        }

        // Pad the end of the last fragment.
        let last = fragments.last_mut().expect("patch has fragments");
        if last.last().map(|f| f.op()) != Some(Operation::Equal) {
            // Add a padding equality.
            last.push(DiffFragment::new(Operation::Equal, null_padding.clone()));
            let left = last.left_span();
            last.set_left_span(Span::new(left.offset, left.length + pad));
            let right = last.right_span();
            last.set_right_span(Span::new(right.offset, right.length + pad));
        } else if pad > last.last().map(|f| f.len()).unwrap_or(0) {
            // Grow the last equality forward over the missing padding.
            let tail = last.last().expect("checked above").clone();
            let extra = pad - tail.len();
            last.replace_last(tail.concat(&null_padding.head(extra)));
            let left = last.left_span();
            last.set_left_span(Span::new(left.offset, left.length + extra));
            let right = last.right_span();
            last.set_right_span(Span::new(right.offset, right.length + extra));
        }

        fragments
    }

    /// Breaks up fragments whose left span exceeds the bitap word width, so
    /// every pattern presented to the matcher fits in one machine word.
    fn split_max(fragments: &mut Vec<PatchFragment>, mut margin: usize) {
        if margin >= WORD_BITS {
            warn!(margin, "margin must be less than {WORD_BITS}, clamping");
            margin = WORD_BITS - 1;
        }
        let extra_space = WORD_BITS - margin;

        let mut index = 0;
        while index < fragments.len() {
            if fragments[index].left_span().length <= WORD_BITS {
                index += 1;
                continue;
            }
            // Remove the big old patch and peel smaller patches off it.
            let mut bigpatch = fragments.remove(index);
            let mut left_start = bigpatch.left_span().offset;
            let mut right_start = bigpatch.right_span().offset;
            let mut pre_context = SpanBuf::empty();

            while !bigpatch.is_empty() {
                let mut small = PatchFragment::from_spans(
                    Span::new(left_start - pre_context.len(), pre_context.len()),
                    Span::new(right_start - pre_context.len(), pre_context.len()),
                );
                // A fragment holding only bookkeeping equalities is consumed
                // for its offsets but not emitted.
                let mut empty = true;
                if !pre_context.is_empty() {
                    small.push(DiffFragment::new(Operation::Equal, pre_context.clone()));
                }

                while !bigpatch.is_empty() && small.left_span().length < extra_space {
                    let first = bigpatch.first().expect("bigpatch not empty").clone();
                    if first.op() == Operation::Insert {
                        // Insertions are harmless: copy the whole fragment.
                        let right = small.right_span();
                        small.set_right_span(Span::new(
                            right.offset,
                            right.length + first.len(),
                        ));
                        right_start += first.len();
                        small.push(bigpatch.remove_first());
                        empty = false;
                    } else if first.op() == Operation::Delete
                        && small.fragments().len() == 1
                        && small.first().map(|f| f.op()) == Some(Operation::Equal)
                        && first.len() > 2 * WORD_BITS
                    {
                        // A monster delete: let it pass in one chunk.
                        let left = small.left_span();
                        small.set_left_span(Span::new(left.offset, left.length + first.len()));
                        left_start += first.len();
                        empty = false;
                        small.push(first);
                        bigpatch.remove_first();
                    } else {
                        // Deletion or equality: only take as much as fits.
                        let slice_len = first
                            .len()
                            .min(extra_space - small.left_span().length);
                        let taken = first.head(slice_len);
                        let left = small.left_span();
                        small.set_left_span(Span::new(left.offset, left.length + slice_len));
                        left_start += slice_len;
                        if first.op() == Operation::Equal {
                            let right = small.right_span();
                            small.set_right_span(Span::new(
                                right.offset,
                                right.length + slice_len,
                            ));
                            right_start += slice_len;
                        } else {
                            empty = false;
                        }
                        small.push(taken);
                        if slice_len == first.len() {
                            bigpatch.remove_first();
                        } else {
                            // Peel only the consumed head off the source.
                            bigpatch.replace_first(first.cut(slice_len));
                        }
                    }
                }

                // Compute the head context for the next patch.
                let right_text = small.right_buffer();
                pre_context = right_text.tail(right_text.len().min(margin));

                // Append the tail context for this patch.
                let left_text = bigpatch.left_buffer();
                let post_context = left_text.head(left_text.len().min(margin));
                if !post_context.is_empty() {
                    let left = small.left_span();
                    small.set_left_span(Span::new(
                        left.offset,
                        left.length + post_context.len(),
                    ));
                    let right = small.right_span();
                    small.set_right_span(Span::new(
                        right.offset,
                        right.length + post_context.len(),
                    ));
                    if small.last().map(|f| f.op()) == Some(Operation::Equal) {
                        let grown = small.last().expect("checked above").concat(&post_context);
                        small.replace_last(grown);
                    } else {
                        small.push(DiffFragment::new(Operation::Equal, post_context));
                    }
                }

                if !empty {
                    fragments.insert(index, small);
                    index += 1;
                }
            }
        }
    }
}

impl fmt::Display for Patch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for fragment in &self.fragments {
            write!(f, "{fragment}")?;
        }
        Ok(())
    }
}

/// The outcome of applying a patch.
#[derive(Debug, Clone)]
pub struct ApplyResult {
    used: Vec<bool>,
    result: SpanBuf,
}

impl ApplyResult {
    /// One bit per fragment, set when the fragment applied.
    pub fn used(&self) -> &[bool] {
        &self.used
    }

    /// The patched buffer.
    pub fn result(&self) -> &SpanBuf {
        &self.result
    }

    /// Returns `true` when every fragment applied.
    pub fn all_used(&self) -> bool {
        self.used.iter().all(|&b| b)
    }
}
