//! The textual patch format.
//!
//! Per-fragment blocks with a GNU-diff-style header and one line per diff
//! fragment, the payload percent-encoded like URL form encoding but leaving
//! a fixed set of human-friendly punctuation unescaped. The format is
//! byte-transparent: bytes 0x80..=0xFF travel as `%HH` escapes.

use std::sync::OnceLock;

use regex::Regex;
use spanbuf::SpanBuf;

use crate::diff::DiffFragment;
use crate::operation::Operation;

use super::fragment::{PatchFragment, Span};
use super::PatchError;

/// Punctuation that travels unescaped, in addition to ASCII alphanumerics.
/// Chosen for interoperability with the existing patch file format.
const UNESCAPED: &[u8] = b" !~'();/?:@&=+$,#*-._";

/// Percent-encodes a payload for one patch body line.
pub(crate) fn encode_payload(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len());
    for &b in bytes {
        if b.is_ascii_alphanumeric() || UNESCAPED.contains(&b) {
            out.push(b as char);
        } else {
            out.push_str(&format!("%{b:02X}"));
        }
    }
    out
}

/// Decodes one patch body line back into raw bytes.
pub(crate) fn decode_payload(line: &str) -> Result<Vec<u8>, PatchError> {
    let bytes = line.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            let escape = bytes
                .get(i + 1..i + 3)
                .and_then(|hex| u8::from_str_radix(std::str::from_utf8(hex).ok()?, 16).ok())
                .ok_or_else(|| PatchError::MalformedEscape(line.to_string()))?;
            out.push(escape);
            i += 3;
        } else {
            out.push(bytes[i]);
            i += 1;
        }
    }
    Ok(out)
}

fn header_regex() -> &'static Regex {
    static HEADER: OnceLock<Regex> = OnceLock::new();
    HEADER.get_or_init(|| {
        Regex::new(r"^@@ -(\d+),?(\d*) \+(\d+),?(\d*) @@$").expect("header pattern is valid")
    })
}

/// Decodes header coordinates back into a span, undoing the 1-based
/// presentation and the 0-length/1-length special cases.
fn parse_span(start: &str, length: &str, line: &str) -> Result<Span, PatchError> {
    let malformed = || PatchError::MalformedHeader(line.to_string());
    let start: usize = start.parse().map_err(|_| malformed())?;
    if length.is_empty() {
        Ok(Span::new(start.checked_sub(1).ok_or_else(malformed)?, 1))
    } else if length == "0" {
        Ok(Span::new(start, 0))
    } else {
        let length: usize = length.parse().map_err(|_| malformed())?;
        Ok(Span::new(start.checked_sub(1).ok_or_else(malformed)?, length))
    }
}

/// Parses the textual patch format into fragments.
///
/// Blank lines between fragments are tolerated; anything else that is not a
/// header or a glyph-prefixed body line is an error.
pub(crate) fn parse_fragments(text: &str) -> Result<Vec<PatchFragment>, PatchError> {
    let mut fragments = Vec::new();
    let mut lines = text.lines().peekable();
    while let Some(line) = lines.next() {
        if line.is_empty() {
            continue;
        }
        let caps = header_regex()
            .captures(line)
            .ok_or_else(|| PatchError::MalformedHeader(line.to_string()))?;
        let left = parse_span(&caps[1], &caps[2], line)?;
        let right = parse_span(&caps[3], &caps[4], line)?;
        let mut fragment = PatchFragment::from_spans(left, right);

        while let Some(&body) = lines.peek() {
            if body.starts_with('@') {
                break;
            }
            lines.next();
            if body.is_empty() {
                // Blank lines inside a fragment body are ignored.
                continue;
            }
            let sign = body.chars().next().expect("non-empty line");
            let op = Operation::from_glyph(sign).ok_or(PatchError::UnknownGlyph(sign))?;
            let payload = decode_payload(&body[sign.len_utf8()..])?;
            fragment.push(DiffFragment::new(op, SpanBuf::from(payload)));
        }
        fragments.push(fragment);
    }
    Ok(fragments)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_keeps_friendly_punctuation() {
        assert_eq!(
            encode_payload(b"`1234567890-=[]\\;',./"),
            "%601234567890-=%5B%5D%5C;',./"
        );
        assert_eq!(
            encode_payload(b"~!@#$%^&*()_+{}|:\"<>?"),
            "~!@#$%25%5E&*()_+%7B%7D%7C:%22%3C%3E?"
        );
        assert_eq!(encode_payload(b"a b\nc"), "a b%0Ac");
        assert_eq!(encode_payload(&[0x00, 0x7f, 0x80, 0xff]), "%00%7F%80%FF");
    }

    #[test]
    fn test_decode_round_trip() {
        let cases: &[&[u8]] = &[
            b"plain text",
            b"`1234567890-=[]\\;',./",
            b"~!@#$%^&*()_+{}|:\"<>?",
            b"line\nbreaks\tand\x00nulls",
            &[0x80, 0x90, 0xff],
        ];
        for &case in cases {
            assert_eq!(decode_payload(&encode_payload(case)).unwrap(), case);
        }
    }

    #[test]
    fn test_decode_plus_stays_plus() {
        assert_eq!(decode_payload("a+b c").unwrap(), b"a+b c");
    }

    #[test]
    fn test_decode_bad_escape() {
        assert!(matches!(
            decode_payload("abc%G1"),
            Err(PatchError::MalformedEscape(_))
        ));
        assert!(matches!(
            decode_payload("abc%2"),
            Err(PatchError::MalformedEscape(_))
        ));
    }

    #[test]
    fn test_parse_span_cases() {
        let line = "unused";
        assert_eq!(parse_span("22", "16", line).unwrap(), Span::new(21, 16));
        assert_eq!(parse_span("5", "", line).unwrap(), Span::new(4, 1));
        assert_eq!(parse_span("3", "0", line).unwrap(), Span::new(3, 0));
    }
}
