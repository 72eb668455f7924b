//! Diff construction and canonicalization.
//!
//! [`DiffBuilder::build`] produces a canonical diff between two buffers:
//! equal inputs short-circuit, common prefix/suffix are trimmed, the middle is
//! computed by containment/single-byte shortcuts, the half-match heuristic
//! (only under a deadline, since it may yield non-minimal output) or the Myers
//! middle-snake bisect, and the result is canonicalized by
//! [`Diff::cleanup_merge`].

mod bisect;
mod fragment;
mod half_match;

use std::time::{Duration, Instant};

use spanbuf::SpanBuf;
use tracing::debug;

use crate::operation::Operation;

use bisect::Bisect;
pub use fragment::DiffFragment;
use half_match::half_match;

/// An ordered sequence of diff fragments.
///
/// Concatenating the non-INSERT fragments reproduces the left buffer;
/// concatenating the non-DELETE fragments reproduces the right buffer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Diff {
    fragments: Vec<DiffFragment>,
}

impl Diff {
    /// Creates an empty diff.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a diff from a fragment list.
    pub fn from_fragments(fragments: Vec<DiffFragment>) -> Self {
        Self { fragments }
    }

    /// Starts configuring a diff computation.
    pub fn builder() -> DiffBuilder {
        DiffBuilder::default()
    }

    /// Returns `true` when the diff holds no fragments.
    pub fn is_empty(&self) -> bool {
        self.fragments.is_empty()
    }

    /// The fragments in order.
    pub fn fragments(&self) -> &[DiffFragment] {
        &self.fragments
    }

    /// The first fragment.
    pub fn first(&self) -> Option<&DiffFragment> {
        self.fragments.first()
    }

    /// The last fragment.
    pub fn last(&self) -> Option<&DiffFragment> {
        self.fragments.last()
    }

    /// Appends a fragment.
    pub fn push(&mut self, fragment: DiffFragment) {
        self.fragments.push(fragment);
    }

    /// Prepends a fragment.
    pub fn push_front(&mut self, fragment: DiffFragment) {
        self.fragments.insert(0, fragment);
    }

    /// Appends all fragments of another diff.
    pub fn extend(&mut self, other: Diff) {
        self.fragments.extend(other.fragments);
    }

    /// Concatenates the bytes of all fragments whose operation is not
    /// `ignore`.
    ///
    /// Ignoring INSERT reconstructs the left buffer, ignoring DELETE the
    /// right one.
    pub fn extract(&self, ignore: Operation) -> SpanBuf {
        SpanBuf::merge(
            self.fragments
                .iter()
                .filter(|f| f.op() != ignore)
                .map(|f| f.buf()),
        )
    }

    /// The Levenshtein distance implied by the diff: per maximal edit run,
    /// a deletion paired with an insertion counts as one substitution.
    pub fn levenshtein(&self) -> usize {
        let mut levenshtein = 0;
        let mut insertions = 0;
        let mut deletions = 0;
        for fragment in &self.fragments {
            match fragment.op() {
                Operation::Insert => insertions += fragment.len(),
                Operation::Delete => deletions += fragment.len(),
                Operation::Equal => {
                    levenshtein += insertions.max(deletions);
                    insertions = 0;
                    deletions = 0;
                }
            }
        }
        levenshtein + insertions.max(deletions)
    }

    /// Translates a byte position in the left buffer into the equivalent
    /// position in the right buffer, clamping positions that fall inside a
    /// deletion.
    pub fn map_index(&self, loc: usize) -> usize {
        let mut chars1 = 0;
        let mut chars2 = 0;
        let mut last_chars1 = 0;
        let mut last_chars2 = 0;
        let mut overshot: Option<Operation> = None;
        for fragment in &self.fragments {
            if fragment.op() != Operation::Insert {
                chars1 += fragment.len();
            }
            if fragment.op() != Operation::Delete {
                chars2 += fragment.len();
            }
            if chars1 > loc {
                overshot = Some(fragment.op());
                break;
            }
            last_chars1 = chars1;
            last_chars2 = chars2;
        }
        if overshot == Some(Operation::Delete) {
            // The location was deleted.
            return last_chars2;
        }
        last_chars2 + (loc - last_chars1)
    }

    /// Reorders and merges like edit runs, factors shared affixes out of
    /// insert/delete pairs, merges adjacent equalities, and slides single
    /// edits across equalities until the diff is canonical.
    pub fn cleanup_merge(&mut self) {
        loop {
            self.merge_pass();
            if !self.shift_pass() {
                break;
            }
        }
    }

    /// Single left-to-right walk merging edit runs, with a sentinel equality
    /// at the tail.
    fn merge_pass(&mut self) {
        let frags = &mut self.fragments;
        frags.push(DiffFragment::new(Operation::Equal, SpanBuf::empty()));
        let mut pointer = 0usize;
        let mut ins_count = 0usize;
        let mut del_count = 0usize;
        let mut ins_buf = SpanBuf::empty();
        let mut del_buf = SpanBuf::empty();
        while pointer < frags.len() {
            if pointer < frags.len() - 1 && frags[pointer].is_empty() {
                frags.remove(pointer);
                continue;
            }
            match frags[pointer].op() {
                Operation::Insert => {
                    ins_count += 1;
                    ins_buf = ins_buf.concat(frags[pointer].buf());
                    pointer += 1;
                }
                Operation::Delete => {
                    del_count += 1;
                    del_buf = del_buf.concat(frags[pointer].buf());
                    pointer += 1;
                }
                Operation::Equal => {
                    if !ins_buf.is_empty() || !del_buf.is_empty() {
                        if !ins_buf.is_empty() && !del_buf.is_empty() {
                            // Factor out any common prefix.
                            let common = ins_buf.common_prefix(&del_buf);
                            if common > 0 {
                                let run_start = pointer - ins_count - del_count;
                                if run_start > 0 {
                                    debug_assert_eq!(
                                        frags[run_start - 1].op(),
                                        Operation::Equal,
                                        "fragment before an edit run must be an equality"
                                    );
                                    let grown = frags[run_start - 1].concat(&ins_buf.head(common));
                                    frags[run_start - 1] = grown;
                                } else {
                                    frags.insert(
                                        0,
                                        DiffFragment::new(Operation::Equal, ins_buf.head(common)),
                                    );
                                    pointer += 1;
                                }
                                ins_buf = ins_buf.cut(common);
                                del_buf = del_buf.cut(common);
                            }
                            // Factor out any common suffix.
                            let common = ins_buf.common_suffix(&del_buf);
                            if common > 0 {
                                let grown = DiffFragment::new(
                                    Operation::Equal,
                                    ins_buf.tail(common).concat(frags[pointer].buf()),
                                );
                                frags[pointer] = grown;
                                ins_buf = ins_buf.head(ins_buf.len() - common);
                                del_buf = del_buf.head(del_buf.len() - common);
                            }
                        }
                        // Replace the run with the merged records, deletes
                        // before inserts.
                        let start = pointer - ins_count - del_count;
                        let mut replacement = Vec::with_capacity(2);
                        if !del_buf.is_empty() {
                            replacement.push(DiffFragment::new(Operation::Delete, del_buf.clone()));
                        }
                        if !ins_buf.is_empty() {
                            replacement.push(DiffFragment::new(Operation::Insert, ins_buf.clone()));
                        }
                        let n = replacement.len();
                        frags.splice(start..pointer, replacement);
                        pointer = start + n;
                    }
                    // Merge with a preceding equality.
                    if pointer != 0 && frags[pointer - 1].op() == Operation::Equal {
                        let merged = frags[pointer - 1].concat(frags[pointer].buf());
                        frags[pointer - 1] = merged;
                        frags.remove(pointer);
                    } else {
                        pointer += 1;
                    }
                    ins_count = 0;
                    del_count = 0;
                    ins_buf = SpanBuf::empty();
                    del_buf = SpanBuf::empty();
                }
            }
        }
        if frags.last().is_some_and(|f| f.is_empty()) {
            frags.pop();
        }
    }

    /// Slides single edits surrounded by equalities sideways to eliminate an
    /// equality, e.g. `A<ins>BA</ins>C` becomes `<ins>AB</ins>AC`.
    ///
    /// Returns `true` when any shift was performed; the caller must then run
    /// the merge pass again.
    fn shift_pass(&mut self) -> bool {
        let frags = &mut self.fragments;
        let mut changes = false;
        let mut pointer = 1usize;
        // The first and last fragments need no checking.
        while pointer + 1 < frags.len() {
            if frags[pointer - 1].op() == Operation::Equal
                && frags[pointer + 1].op() == Operation::Equal
            {
                let prev = frags[pointer - 1].clone();
                let this = frags[pointer].clone();
                let next = frags[pointer + 1].clone();
                if this.ends_with(&prev) {
                    // Shift the edit over the previous equality.
                    frags[pointer] = DiffFragment::new(
                        this.op(),
                        prev.buf().concat(&this.buf().head(this.len() - prev.len())),
                    );
                    frags[pointer + 1] =
                        DiffFragment::new(next.op(), prev.buf().concat(next.buf()));
                    frags.remove(pointer - 1);
                    changes = true;
                } else if this.starts_with(&next) {
                    // Shift the edit over the next equality.
                    frags[pointer - 1] = prev.concat(next.buf());
                    frags[pointer] =
                        DiffFragment::new(this.op(), this.buf().cut(next.len()).concat(next.buf()));
                    frags.remove(pointer + 1);
                    changes = true;
                }
            }
            pointer += 1;
        }
        changes
    }

    /// Full diff pipeline with an explicit deadline, used by the builder and
    /// by the recursive callers inside bisect and half-match.
    pub(crate) fn build_with_deadline(
        old: &SpanBuf,
        new: &SpanBuf,
        deadline: Option<Instant>,
    ) -> Diff {
        let mut diff = Diff::new();

        // Equality shortcut.
        if old == new {
            if !old.is_empty() {
                diff.push(DiffFragment::new(Operation::Equal, old.clone()));
            }
            return diff;
        }

        // Trim off common prefix.
        let mut old_mid = old.clone();
        let mut new_mid = new.clone();
        let prefix_len = old_mid.common_prefix(&new_mid);
        if prefix_len > 0 {
            let prefix = old_mid.head(prefix_len);
            old_mid = old_mid.cut(prefix_len);
            new_mid = new_mid.cut(prefix_len);
            diff.push(DiffFragment::new(Operation::Equal, prefix));
        }

        // Trim off common suffix.
        let suffix_len = old_mid.common_suffix(&new_mid);
        let suffix = (suffix_len > 0).then(|| {
            let suffix = old_mid.tail(suffix_len);
            old_mid = old_mid.head(old_mid.len() - suffix_len);
            new_mid = new_mid.head(new_mid.len() - suffix_len);
            suffix
        });

        diff.extend(Self::compute(&old_mid, &new_mid, deadline));

        if let Some(suffix) = suffix {
            diff.push(DiffFragment::new(Operation::Equal, suffix));
        }

        diff.cleanup_merge();
        diff
    }

    /// Diffs two middles known to share no common prefix or suffix.
    fn compute(buffer1: &SpanBuf, buffer2: &SpanBuf, deadline: Option<Instant>) -> Diff {
        let mut diff = Diff::new();
        if buffer1.is_empty() {
            // Just add some text.
            diff.push(DiffFragment::new(Operation::Insert, buffer2.clone()));
            return diff;
        }
        if buffer2.is_empty() {
            // Just delete some text.
            diff.push(DiffFragment::new(Operation::Delete, buffer1.clone()));
            return diff;
        }

        let (haystack, needle) = if buffer1.len() > buffer2.len() {
            (buffer1, buffer2)
        } else {
            (buffer2, buffer1)
        };
        if let Some(position) = haystack.find(needle) {
            // Shorter text is inside the longer text.
            let op = if buffer1.len() > buffer2.len() {
                Operation::Delete
            } else {
                Operation::Insert
            };
            diff.push(DiffFragment::new(op, haystack.head(position)));
            diff.push(DiffFragment::new(Operation::Equal, needle.clone()));
            diff.push(DiffFragment::new(op, haystack.cut(position + needle.len())));
            return diff;
        }

        if needle.len() == 1 {
            // Single byte; after the containment shortcut it cannot be an
            // equality.
            diff.push(DiffFragment::new(Operation::Delete, buffer1.clone()));
            diff.push(DiffFragment::new(Operation::Insert, buffer2.clone()));
            return diff;
        }

        // Don't risk returning a non-optimal diff when unlimited time was
        // requested.
        if deadline.is_some() {
            if let Some(hm) = half_match(buffer1, buffer2) {
                debug!(
                    common_mid_len = hm.common_mid.len(),
                    "half-match split found"
                );
                let mut diff = Self::build_with_deadline(&hm.text1_a, &hm.text2_a, deadline);
                diff.push(DiffFragment::new(Operation::Equal, hm.common_mid));
                diff.extend(Self::build_with_deadline(&hm.text1_b, &hm.text2_b, deadline));
                return diff;
            }
        }

        Bisect::new(deadline).bisect(buffer1, buffer2)
    }
}

/// Configures and runs diff construction.
///
/// The default builder uses unlimited time and therefore produces a minimal
/// diff; a bounded process time enables the half-match speedup and lets the
/// bisect give up with a degenerate delete/insert pair at the deadline.
#[derive(Debug, Clone, Copy, Default)]
pub struct DiffBuilder {
    max_process_time: Option<Duration>,
}

impl DiffBuilder {
    /// Unlimited processing time.
    pub fn new() -> Self {
        Self::default()
    }

    /// Caps processing at the given duration.
    pub fn process_time(mut self, limit: Duration) -> Self {
        self.max_process_time = Some(limit);
        self
    }

    /// Caps processing at a number of seconds.
    pub fn process_seconds(self, seconds: f32) -> Self {
        self.process_time(Duration::from_secs_f32(seconds))
    }

    /// Caps processing at a number of minutes.
    pub fn process_minutes(self, minutes: f32) -> Self {
        self.process_time(Duration::from_secs_f32(minutes * 60.0))
    }

    /// Removes any processing cap.
    pub fn unlimited(mut self) -> Self {
        self.max_process_time = None;
        self
    }

    /// Fastest possible diff; may skip the detail work that minimizes the
    /// result.
    pub fn skip_detail(self) -> Self {
        self.process_time(Duration::ZERO)
    }

    /// Diffs `old` against `new`.
    pub fn build(&self, old: &SpanBuf, new: &SpanBuf) -> Diff {
        let deadline = self.max_process_time.map(|limit| Instant::now() + limit);
        Diff::build_with_deadline(old, new, deadline)
    }
}
