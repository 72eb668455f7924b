//! Zero-copy byte spans.
//!
//! A [`SpanBuf`] is an immutable view of a byte range backed by a shared
//! [`bytes::Bytes`] allocation. Slicing operations (`head`, `tail`, `cut`,
//! `slice`) are O(1) and never copy; `concat` and [`SpanBuf::merge`] allocate
//! a fresh backing buffer.
//!
//! Every span carries a logical absolute `offset`. The offset does not affect
//! slicing, comparison or search — all of those are expressed in coordinates
//! relative to the span start — it only feeds the coordinate translation used
//! by the [`bitap`] matcher (`make_absolute` / `make_relative`).

use std::fmt;
use std::hash::{Hash, Hasher};
use std::io::Cursor;
use std::ops::Range;

use bytes::Bytes;

pub mod bitap;

/// An immutable, cheaply cloneable view of a byte range.
#[derive(Clone, Default)]
pub struct SpanBuf {
    data: Bytes,
    offset: usize,
}

impl SpanBuf {
    /// The empty span at offset zero.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Returns a copy of this span relocated to the given absolute offset.
    pub fn with_offset(&self, offset: usize) -> Self {
        Self {
            data: self.data.clone(),
            offset,
        }
    }

    /// Number of bytes in the span.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Returns `true` when the span holds no bytes.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Absolute offset of the first byte.
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Absolute offset one past the last byte.
    pub fn end(&self) -> usize {
        self.offset + self.data.len()
    }

    /// Translates a relative position into an absolute one.
    pub fn make_absolute(&self, relative: usize) -> usize {
        self.offset + relative
    }

    /// Translates an absolute position into a relative one.
    ///
    /// Positions before the span start clamp to zero.
    pub fn make_relative(&self, absolute: usize) -> usize {
        absolute.saturating_sub(self.offset)
    }

    /// The bytes of the span.
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// Reads the byte at relative position `i`.
    pub fn byte_at(&self, i: usize) -> u8 {
        self.data[i]
    }

    /// Keeps the first `n` bytes.
    ///
    /// # Example
    ///
    /// ```
    /// use spanbuf::SpanBuf;
    ///
    /// let buf = SpanBuf::from("0123456789");
    /// assert_eq!(buf.head(4).as_bytes(), b"0123");
    /// ```
    pub fn head(&self, n: usize) -> Self {
        Self {
            data: self.data.slice(..n),
            offset: self.offset,
        }
    }

    /// Keeps the last `n` bytes.
    ///
    /// # Example
    ///
    /// ```
    /// use spanbuf::SpanBuf;
    ///
    /// let buf = SpanBuf::from("0123456789");
    /// assert_eq!(buf.tail(3).as_bytes(), b"789");
    /// ```
    pub fn tail(&self, n: usize) -> Self {
        let start = self.data.len() - n;
        Self {
            data: self.data.slice(start..),
            offset: self.offset + start,
        }
    }

    /// Drops the first `n` bytes.
    ///
    /// # Example
    ///
    /// ```
    /// use spanbuf::SpanBuf;
    ///
    /// let buf = SpanBuf::from("0123456789");
    /// assert_eq!(buf.cut(6).as_bytes(), b"6789");
    /// assert_eq!(buf.cut(6).offset(), 6);
    /// ```
    pub fn cut(&self, n: usize) -> Self {
        Self {
            data: self.data.slice(n..),
            offset: self.offset + n,
        }
    }

    /// Keeps the byte range `range` (relative coordinates).
    ///
    /// # Example
    ///
    /// ```
    /// use spanbuf::SpanBuf;
    ///
    /// let buf = SpanBuf::from("0123456789");
    /// assert_eq!(buf.slice(2..5).as_bytes(), b"234");
    /// ```
    pub fn slice(&self, range: Range<usize>) -> Self {
        let start = range.start;
        Self {
            data: self.data.slice(range),
            offset: self.offset + start,
        }
    }

    /// Length of the longest prefix shared with `other`.
    ///
    /// # Example
    ///
    /// ```
    /// use spanbuf::SpanBuf;
    ///
    /// let a = SpanBuf::from("1234abcdef");
    /// let b = SpanBuf::from("1234xyz");
    /// assert_eq!(a.common_prefix(&b), 4);
    /// ```
    pub fn common_prefix(&self, other: &SpanBuf) -> usize {
        self.data
            .iter()
            .zip(other.data.iter())
            .take_while(|(a, b)| a == b)
            .count()
    }

    /// Length of the longest suffix shared with `other`.
    ///
    /// # Example
    ///
    /// ```
    /// use spanbuf::SpanBuf;
    ///
    /// let a = SpanBuf::from("abcdef1234");
    /// let b = SpanBuf::from("xyz1234");
    /// assert_eq!(a.common_suffix(&b), 4);
    /// ```
    pub fn common_suffix(&self, other: &SpanBuf) -> usize {
        self.data
            .iter()
            .rev()
            .zip(other.data.iter().rev())
            .take_while(|(a, b)| a == b)
            .count()
    }

    /// Relative position of the first occurrence of `pattern`.
    ///
    /// An empty pattern matches at position zero.
    ///
    /// # Example
    ///
    /// ```
    /// use spanbuf::SpanBuf;
    ///
    /// let buf = SpanBuf::from("abcabcabc");
    /// assert_eq!(buf.find(&SpanBuf::from("cab")), Some(2));
    /// assert_eq!(buf.find(&SpanBuf::from("xyz")), None);
    /// ```
    pub fn find(&self, pattern: &SpanBuf) -> Option<usize> {
        self.find_from(pattern, 0)
    }

    /// Relative position of the first occurrence of `pattern` at or after
    /// `from`.
    ///
    /// # Example
    ///
    /// ```
    /// use spanbuf::SpanBuf;
    ///
    /// let buf = SpanBuf::from("abcabcabc");
    /// assert_eq!(buf.find_from(&SpanBuf::from("abc"), 1), Some(3));
    /// ```
    pub fn find_from(&self, pattern: &SpanBuf, from: usize) -> Option<usize> {
        find_bytes(&self.data, &pattern.data, from)
    }

    /// Relative position of the last occurrence of `pattern`.
    ///
    /// An empty pattern matches at the span length.
    ///
    /// # Example
    ///
    /// ```
    /// use spanbuf::SpanBuf;
    ///
    /// let buf = SpanBuf::from("abcabcabc");
    /// assert_eq!(buf.rfind(&SpanBuf::from("abc")), Some(6));
    /// ```
    pub fn rfind(&self, pattern: &SpanBuf) -> Option<usize> {
        rfind_bytes(&self.data, &pattern.data, self.data.len())
    }

    /// Concatenates `other` after this span into a freshly allocated span.
    ///
    /// The result keeps this span's offset.
    ///
    /// # Example
    ///
    /// ```
    /// use spanbuf::SpanBuf;
    ///
    /// let a = SpanBuf::from("abc");
    /// let b = SpanBuf::from("def");
    /// assert_eq!(a.concat(&b).as_bytes(), b"abcdef");
    /// ```
    pub fn concat(&self, other: &SpanBuf) -> Self {
        if other.is_empty() {
            return self.clone();
        }
        if self.is_empty() {
            return other.with_offset(self.offset);
        }
        let mut out = Vec::with_capacity(self.len() + other.len());
        out.extend_from_slice(&self.data);
        out.extend_from_slice(&other.data);
        Self {
            data: Bytes::from(out),
            offset: self.offset,
        }
    }

    /// Concatenates a list of spans into one freshly allocated span at
    /// offset zero.
    ///
    /// # Example
    ///
    /// ```
    /// use spanbuf::SpanBuf;
    ///
    /// let a = SpanBuf::from("ab");
    /// let b = SpanBuf::from("cd");
    /// let merged = SpanBuf::merge([&a, &b, &a]);
    /// assert_eq!(merged.as_bytes(), b"abcdab");
    /// ```
    pub fn merge<'a, I>(parts: I) -> Self
    where
        I: IntoIterator<Item = &'a SpanBuf>,
    {
        let parts: Vec<&SpanBuf> = parts.into_iter().collect();
        let total: usize = parts.iter().map(|p| p.len()).sum();
        let mut out = Vec::with_capacity(total);
        for part in parts {
            out.extend_from_slice(&part.data);
        }
        Self {
            data: Bytes::from(out),
            offset: 0,
        }
    }

    /// A reader over the span's bytes.
    pub fn reader(&self) -> Cursor<Bytes> {
        Cursor::new(self.data.clone())
    }
}

/// First occurrence of `pattern` in `text` at or after `from`.
pub(crate) fn find_bytes(text: &[u8], pattern: &[u8], from: usize) -> Option<usize> {
    if pattern.is_empty() {
        return if from <= text.len() { Some(from) } else { None };
    }
    if pattern.len() > text.len() || from + pattern.len() > text.len() {
        return None;
    }
    text[from..]
        .windows(pattern.len())
        .position(|w| w == pattern)
        .map(|p| p + from)
}

/// Last occurrence of `pattern` in `text` starting at or before `from`.
pub(crate) fn rfind_bytes(text: &[u8], pattern: &[u8], from: usize) -> Option<usize> {
    if pattern.is_empty() {
        return Some(from.min(text.len()));
    }
    if pattern.len() > text.len() {
        return None;
    }
    let last_start = from.min(text.len() - pattern.len());
    (0..=last_start)
        .rev()
        .find(|&i| &text[i..i + pattern.len()] == pattern)
}

impl PartialEq for SpanBuf {
    fn eq(&self, other: &Self) -> bool {
        self.data == other.data
    }
}

impl Eq for SpanBuf {}

impl Hash for SpanBuf {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.data.hash(state);
    }
}

impl fmt::Debug for SpanBuf {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "SpanBuf(offset={}, len={}, {:?})",
            self.offset,
            self.len(),
            String::from_utf8_lossy(&self.data)
        )
    }
}

impl From<Bytes> for SpanBuf {
    fn from(data: Bytes) -> Self {
        Self { data, offset: 0 }
    }
}

impl From<Vec<u8>> for SpanBuf {
    fn from(data: Vec<u8>) -> Self {
        Bytes::from(data).into()
    }
}

impl From<&[u8]> for SpanBuf {
    fn from(data: &[u8]) -> Self {
        Bytes::copy_from_slice(data).into()
    }
}

impl From<&str> for SpanBuf {
    fn from(data: &str) -> Self {
        data.as_bytes().into()
    }
}

impl AsRef<[u8]> for SpanBuf {
    fn as_ref(&self) -> &[u8] {
        &self.data
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn buf(s: &str) -> SpanBuf {
        SpanBuf::from(s)
    }

    #[test]
    fn test_slicing() {
        let b = buf("0123456789");
        assert_eq!(b.head(4).as_bytes(), b"0123");
        assert_eq!(b.tail(3).as_bytes(), b"789");
        assert_eq!(b.cut(6).as_bytes(), b"6789");
        assert_eq!(b.slice(2..5).as_bytes(), b"234");
        assert_eq!(b.head(0).as_bytes(), b"");
        assert_eq!(b.cut(10).as_bytes(), b"");
    }

    #[test]
    fn test_offsets_track_slices() {
        let b = buf("0123456789").with_offset(100);
        assert_eq!(b.offset(), 100);
        assert_eq!(b.end(), 110);
        assert_eq!(b.head(4).offset(), 100);
        assert_eq!(b.cut(6).offset(), 106);
        assert_eq!(b.tail(3).offset(), 107);
        assert_eq!(b.slice(2..5).offset(), 102);
        assert_eq!(b.make_absolute(5), 105);
        assert_eq!(b.make_relative(105), 5);
        assert_eq!(b.make_relative(50), 0);
    }

    #[test]
    fn test_equality_ignores_offset() {
        let a = buf("abc");
        let b = buf("abc").with_offset(42);
        assert_eq!(a, b);
        assert_ne!(a, buf("abd"));
    }

    #[test]
    fn test_common_prefix_suffix() {
        assert_eq!(buf("1234abcdef").common_prefix(&buf("1234xyz")), 4);
        assert_eq!(buf("1234").common_prefix(&buf("1234xyz")), 4);
        assert_eq!(buf("abc").common_prefix(&buf("xyz")), 0);
        assert_eq!(buf("abcdef1234").common_suffix(&buf("xyz1234")), 4);
        assert_eq!(buf("1234").common_suffix(&buf("xyz1234")), 4);
        assert_eq!(buf("abc").common_suffix(&buf("xyz")), 0);
        assert_eq!(buf("").common_prefix(&buf("a")), 0);
        assert_eq!(buf("").common_suffix(&buf("a")), 0);
    }

    #[test]
    fn test_find() {
        let b = buf("abcabcabc");
        assert_eq!(b.find(&buf("abc")), Some(0));
        assert_eq!(b.find_from(&buf("abc"), 1), Some(3));
        assert_eq!(b.find_from(&buf("abc"), 7), None);
        assert_eq!(b.rfind(&buf("abc")), Some(6));
        assert_eq!(b.find(&buf("xyz")), None);
        assert_eq!(b.find(&buf("")), Some(0));
        assert_eq!(b.rfind(&buf("")), Some(9));
    }

    #[test]
    fn test_concat_merge() {
        let a = buf("abc");
        let b = buf("def");
        assert_eq!(a.concat(&b).as_bytes(), b"abcdef");
        assert_eq!(a.concat(&SpanBuf::empty()).as_bytes(), b"abc");
        assert_eq!(SpanBuf::empty().concat(&b).as_bytes(), b"def");
        let merged = SpanBuf::merge([&a, &b, &a]);
        assert_eq!(merged.as_bytes(), b"abcdefabc");
        assert_eq!(merged.offset(), 0);
    }
}
