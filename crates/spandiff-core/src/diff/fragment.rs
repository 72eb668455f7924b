//! A single diff entry: an operation plus the bytes it covers.

use std::fmt;

use spanbuf::SpanBuf;

use crate::operation::Operation;

/// One diff operation over a span of bytes.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct DiffFragment {
    op: Operation,
    buf: SpanBuf,
}

impl DiffFragment {
    /// Creates a fragment from an operation and its bytes.
    pub fn new(op: Operation, buf: SpanBuf) -> Self {
        Self { op, buf }
    }

    /// The fragment's operation.
    pub fn op(&self) -> Operation {
        self.op
    }

    /// The fragment's bytes.
    pub fn buf(&self) -> &SpanBuf {
        &self.buf
    }

    /// Number of bytes the fragment covers.
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    /// Returns `true` when the fragment covers no bytes.
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Keeps the first `n` bytes, same operation.
    pub fn head(&self, n: usize) -> Self {
        Self::new(self.op, self.buf.head(n))
    }

    /// Keeps the last `n` bytes, same operation.
    pub fn tail(&self, n: usize) -> Self {
        Self::new(self.op, self.buf.tail(n))
    }

    /// Drops the first `n` bytes, same operation.
    pub fn cut(&self, n: usize) -> Self {
        Self::new(self.op, self.buf.cut(n))
    }

    /// Appends `other`'s bytes, same operation.
    pub fn concat(&self, other: &SpanBuf) -> Self {
        Self::new(self.op, self.buf.concat(other))
    }

    /// Returns `true` when this fragment's bytes end with `other`'s bytes.
    pub fn ends_with(&self, other: &DiffFragment) -> bool {
        self.buf.as_bytes().ends_with(other.buf.as_bytes())
    }

    /// Returns `true` when this fragment's bytes start with `other`'s bytes.
    pub fn starts_with(&self, other: &DiffFragment) -> bool {
        self.buf.as_bytes().starts_with(other.buf.as_bytes())
    }
}

impl fmt::Debug for DiffFragment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Diff({:?}, [{}])",
            self.op,
            String::from_utf8_lossy(self.buf.as_bytes())
        )
    }
}
