//! Myers middle-snake bisection.
//!
//! Advances diagonals from both ends of the edit graph until they meet, then
//! splits the problem at the meeting point and recurses. See Myers 1986, "An
//! O(ND) Difference Algorithm and Its Variations".

use std::time::Instant;

use spanbuf::SpanBuf;
use tracing::debug;

use crate::operation::Operation;

use super::{Diff, DiffFragment};

pub(crate) struct Bisect {
    deadline: Option<Instant>,
}

impl Bisect {
    pub(crate) fn new(deadline: Option<Instant>) -> Self {
        Self { deadline }
    }

    /// Finds the middle snake of the edit graph between the two buffers and
    /// recursively diffs the two halves.
    ///
    /// When the deadline expires, or when the buffers share nothing at all,
    /// the result degenerates to a full delete plus a full insert.
    pub(crate) fn bisect(&self, buffer1: &SpanBuf, buffer2: &SpanBuf) -> Diff {
        let len1 = buffer1.len() as isize;
        let len2 = buffer2.len() as isize;
        let max_d = (len1 + len2 + 1) / 2;
        let v_offset = max_d;
        let v_length = (2 * max_d) as usize;
        let mut v1 = vec![-1isize; v_length];
        let mut v2 = vec![-1isize; v_length];
        v1[(v_offset + 1) as usize] = 0;
        v2[(v_offset + 1) as usize] = 0;
        let delta = len1 - len2;
        // With an odd byte total the forward path collides with the reverse
        // path; with an even total the reverse path detects the overlap.
        let front = delta % 2 != 0;
        // Trim k ranges that have run off an edge of the grid.
        let mut k1start = 0isize;
        let mut k1end = 0isize;
        let mut k2start = 0isize;
        let mut k2end = 0isize;
        for d in 0..max_d {
            // Bail out if the deadline is reached.
            if self.deadline.is_some_and(|deadline| Instant::now() > deadline) {
                break;
            }

            // Walk the front path one step.
            let mut k1 = -d + k1start;
            while k1 <= d - k1end {
                let k1_offset = v_offset + k1;
                let mut x1 = if k1 == -d
                    || (k1 != d && v1[(k1_offset - 1) as usize] < v1[(k1_offset + 1) as usize])
                {
                    v1[(k1_offset + 1) as usize]
                } else {
                    v1[(k1_offset - 1) as usize] + 1
                };
                let mut y1 = x1 - k1;
                while x1 < len1
                    && y1 < len2
                    && buffer1.byte_at(x1 as usize) == buffer2.byte_at(y1 as usize)
                {
                    x1 += 1;
                    y1 += 1;
                }
                v1[k1_offset as usize] = x1;
                if x1 > len1 {
                    // Ran off the right of the graph.
                    k1end += 2;
                } else if y1 > len2 {
                    // Ran off the bottom of the graph.
                    k1start += 2;
                } else if front {
                    let k2_offset = v_offset + delta - k1;
                    if k2_offset >= 0
                        && (k2_offset as usize) < v_length
                        && v2[k2_offset as usize] != -1
                    {
                        // Mirror x2 onto the top-left coordinate system.
                        let x2 = len1 - v2[k2_offset as usize];
                        if x1 >= x2 {
                            // Overlap detected.
                            return self.split(buffer1, buffer2, x1 as usize, y1 as usize);
                        }
                    }
                }
                k1 += 2;
            }

            // Walk the reverse path one step.
            let mut k2 = -d + k2start;
            while k2 <= d - k2end {
                let k2_offset = v_offset + k2;
                let mut x2 = if k2 == -d
                    || (k2 != d && v2[(k2_offset - 1) as usize] < v2[(k2_offset + 1) as usize])
                {
                    v2[(k2_offset + 1) as usize]
                } else {
                    v2[(k2_offset - 1) as usize] + 1
                };
                let mut y2 = x2 - k2;
                while x2 < len1
                    && y2 < len2
                    && buffer1.byte_at((len1 - x2 - 1) as usize)
                        == buffer2.byte_at((len2 - y2 - 1) as usize)
                {
                    x2 += 1;
                    y2 += 1;
                }
                v2[k2_offset as usize] = x2;
                if x2 > len1 {
                    // Ran off the left of the graph.
                    k2end += 2;
                } else if y2 > len2 {
                    // Ran off the top of the graph.
                    k2start += 2;
                } else if !front {
                    let k1_offset = v_offset + delta - k2;
                    if k1_offset >= 0
                        && (k1_offset as usize) < v_length
                        && v1[k1_offset as usize] != -1
                    {
                        let x1 = v1[k1_offset as usize];
                        let y1 = v_offset + x1 - k1_offset;
                        // Mirror x2 onto the top-left coordinate system.
                        let x2 = len1 - x2;
                        if x1 >= x2 {
                            // Overlap detected.
                            return self.split(buffer1, buffer2, x1 as usize, y1 as usize);
                        }
                    }
                }
                k2 += 2;
            }
        }
        // The diff hit the deadline, or the number of edits equals the number
        // of bytes: no commonality at all.
        let mut diff = Diff::new();
        diff.push(DiffFragment::new(Operation::Delete, buffer1.clone()));
        diff.push(DiffFragment::new(Operation::Insert, buffer2.clone()));
        diff
    }

    /// Splits the problem at the middle snake and diffs both halves serially.
    fn split(&self, buffer1: &SpanBuf, buffer2: &SpanBuf, split1: usize, split2: usize) -> Diff {
        debug!(split1, split2, "bisect split");
        let mut diff = Diff::build_with_deadline(
            &buffer1.head(split1),
            &buffer2.head(split2),
            self.deadline,
        );
        diff.extend(Diff::build_with_deadline(
            &buffer1.cut(split1),
            &buffer2.cut(split2),
            self.deadline,
        ));
        diff
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frag(op: Operation, text: &str) -> DiffFragment {
        DiffFragment::new(op, SpanBuf::from(text))
    }

    #[test]
    fn test_bisect_normal() {
        let diff = Bisect::new(None).bisect(&SpanBuf::from("cat"), &SpanBuf::from("map"));
        assert_eq!(
            diff.fragments(),
            &[
                frag(Operation::Delete, "c"),
                frag(Operation::Insert, "m"),
                frag(Operation::Equal, "a"),
                frag(Operation::Delete, "t"),
                frag(Operation::Insert, "p"),
            ]
        );
    }

    #[test]
    fn test_bisect_timeout() {
        let expired = Instant::now();
        let diff = Bisect::new(Some(expired)).bisect(&SpanBuf::from("cat"), &SpanBuf::from("map"));
        assert_eq!(
            diff.fragments(),
            &[frag(Operation::Delete, "cat"), frag(Operation::Insert, "map")]
        );
    }
}
