//! Half-match: do the two buffers share a substring at least half the length
//! of the longer buffer?
//!
//! When they do, the diff can be split around that substring and the halves
//! diffed independently. This speedup can produce non-minimal diffs, so it is
//! only used when a deadline bounds the computation.

use spanbuf::SpanBuf;
use tracing::trace;

/// A successful half-match split.
///
/// `text1_*` belong to the first input and `text2_*` to the second;
/// `text1_a ++ common_mid ++ text1_b` reconstructs the first input.
#[derive(Debug, Clone)]
pub(crate) struct HalfMatch {
    pub text1_a: SpanBuf,
    pub text1_b: SpanBuf,
    pub text2_a: SpanBuf,
    pub text2_b: SpanBuf,
    pub common_mid: SpanBuf,
}

impl HalfMatch {
    fn empty() -> Self {
        Self {
            text1_a: SpanBuf::empty(),
            text1_b: SpanBuf::empty(),
            text2_a: SpanBuf::empty(),
            text2_b: SpanBuf::empty(),
            common_mid: SpanBuf::empty(),
        }
    }

    /// Reorients the result for swapped inputs.
    fn swapped(self) -> Self {
        Self {
            text1_a: self.text2_a,
            text1_b: self.text2_b,
            text2_a: self.text1_a,
            text2_b: self.text1_b,
            common_mid: self.common_mid,
        }
    }
}

/// Searches for a common substring at least half the length of the longer
/// buffer, seeding from its second and third quarters.
pub(crate) fn half_match(buffer1: &SpanBuf, buffer2: &SpanBuf) -> Option<HalfMatch> {
    let (long_buf, short_buf) = if buffer1.len() > buffer2.len() {
        (buffer1, buffer2)
    } else {
        (buffer2, buffer1)
    };
    if long_buf.len() < 4 || short_buf.len() * 2 < long_buf.len() {
        // Pointless.
        return None;
    }

    // Check whether the second quarter seeds a half-match, then the third.
    let hm1 = half_match_at(long_buf, short_buf, (long_buf.len() + 3) / 4);
    let hm2 = half_match_at(long_buf, short_buf, (long_buf.len() + 1) / 2);
    let hm = match (hm1, hm2) {
        (None, None) => return None,
        (Some(hm1), None) => hm1,
        (None, Some(hm2)) => hm2,
        (Some(hm1), Some(hm2)) => {
            // Both matched; select the longest.
            if hm1.common_mid.len() > hm2.common_mid.len() {
                hm1
            } else {
                hm2
            }
        }
    };

    Some(if buffer1.len() > buffer2.len() {
        hm
    } else {
        hm.swapped()
    })
}

/// Scans for occurrences of the quarter-length seed at `seed_start` within
/// the shorter buffer, extending each occurrence in both directions and
/// keeping the longest combined extension.
fn half_match_at(long_buf: &SpanBuf, short_buf: &SpanBuf, seed_start: usize) -> Option<HalfMatch> {
    let seed = long_buf.cut(seed_start).head(long_buf.len() / 4);
    trace!(seed = ?seed, "half-match seed");

    let mut best = HalfMatch::empty();
    let mut from = 0usize;
    while let Some(pos) = short_buf.find_from(&seed, from) {
        from = pos + 1;
        let prefix_len = long_buf
            .cut(seed_start)
            .common_prefix(&short_buf.cut(pos));
        let suffix_len = long_buf
            .head(seed_start)
            .common_suffix(&short_buf.head(pos));
        if best.common_mid.len() < suffix_len + prefix_len {
            best = HalfMatch {
                common_mid: short_buf.slice(pos - suffix_len..pos + prefix_len),
                text1_a: long_buf.head(seed_start - suffix_len),
                text1_b: long_buf.cut(seed_start + prefix_len),
                text2_a: short_buf.head(pos - suffix_len),
                text2_b: short_buf.cut(pos + prefix_len),
            };
        }
    }

    (best.common_mid.len() * 2 >= long_buf.len()).then_some(best)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn check(b1: &str, b2: &str, expected: Option<[&str; 5]>) {
        let result = half_match(&SpanBuf::from(b1), &SpanBuf::from(b2));
        match (result, expected) {
            (None, None) => {}
            (Some(hm), Some([t1a, t1b, t2a, t2b, mid])) => {
                assert_eq!(hm.text1_a.as_bytes(), t1a.as_bytes(), "text1_a");
                assert_eq!(hm.text1_b.as_bytes(), t1b.as_bytes(), "text1_b");
                assert_eq!(hm.text2_a.as_bytes(), t2a.as_bytes(), "text2_a");
                assert_eq!(hm.text2_b.as_bytes(), t2b.as_bytes(), "text2_b");
                assert_eq!(hm.common_mid.as_bytes(), mid.as_bytes(), "common_mid");
            }
            (got, _) => panic!("half_match({b1:?}, {b2:?}) = {got:?}"),
        }
    }

    #[test]
    fn test_no_match() {
        check("1234567890", "abcdef", None);
        check("12345", "23", None);
    }

    #[test]
    fn test_single_match() {
        check(
            "1234567890",
            "a345678z",
            Some(["12", "90", "a", "z", "345678"]),
        );
        check(
            "a345678z",
            "1234567890",
            Some(["a", "z", "12", "90", "345678"]),
        );
        check(
            "abc56789z",
            "1234567890",
            Some(["abc", "z", "1234", "0", "56789"]),
        );
        check(
            "a23456xyz",
            "1234567890",
            Some(["a", "xyz", "1", "7890", "23456"]),
        );
    }

    #[test]
    fn test_multiple_matches() {
        check(
            "121231234123451234123121",
            "a1234123451234z",
            Some(["12123", "123121", "a", "z", "1234123451234"]),
        );
        check(
            "x-=-=-=-=-=-=-=-=-=-=-=-=",
            "xx-=-=-=-=-=-=-=",
            Some(["", "-=-=-=-=-=", "x", "", "x-=-=-=-=-=-=-="]),
        );
        check(
            "-=-=-=-=-=-=-=-=-=-=-=-=y",
            "-=-=-=-=-=-=-=yy",
            Some(["-=-=-=-=-=", "", "", "y", "-=-=-=-=-=-=-=y"]),
        );
    }

    #[test]
    fn test_non_optimal_half_match() {
        // The optimal diff would split differently; the heuristic settles for
        // the longest seeded extension.
        check(
            "qHilloHelloHew",
            "xHelloHeHulloy",
            Some(["qHillo", "w", "x", "Hulloy", "HelloHe"]),
        );
    }
}
