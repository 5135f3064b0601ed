//! Bounded buffer of unmatched child output.
//!
//! Output accumulates here between matches. A match consumes everything up
//! to the end of the matched text; anything after it stays for the next
//! cycle. When the child produces more unmatched output than the buffer can
//! hold, the oldest bytes are discarded.

use std::collections::VecDeque;
use std::fmt;

/// A ring buffer for accumulating terminal output.
#[derive(Clone)]
pub struct OutputBuffer {
    /// The underlying storage.
    data: VecDeque<u8>,
    /// Maximum capacity.
    max_size: usize,
    /// Bytes discarded due to overflow.
    bytes_discarded: usize,
}

impl OutputBuffer {
    /// Create a new buffer with the specified maximum size.
    #[must_use]
    pub fn new(max_size: usize) -> Self {
        Self {
            data: VecDeque::with_capacity(max_size.min(64 * 1024)),
            max_size: max_size.max(1),
            bytes_discarded: 0,
        }
    }

    /// Append data, discarding the oldest bytes past the maximum size.
    pub fn append(&mut self, data: &[u8]) {
        if data.len() >= self.max_size {
            self.bytes_discarded += self.data.len() + data.len() - self.max_size;
            self.data.clear();
            self.data.extend(&data[data.len() - self.max_size..]);
            return;
        }

        let overflow = (self.data.len() + data.len()).saturating_sub(self.max_size);
        if overflow > 0 {
            self.bytes_discarded += overflow;
            self.data.drain(..overflow);
        }
        self.data.extend(data);
    }

    /// Get the current contents as a contiguous slice.
    #[must_use]
    pub fn as_slice(&mut self) -> &[u8] {
        self.data.make_contiguous()
    }

    /// Get the current contents as a string (lossy UTF-8 conversion).
    #[must_use]
    pub fn as_str_lossy(&mut self) -> String {
        String::from_utf8_lossy(self.as_slice()).into_owned()
    }

    /// Drop the first `end` bytes.
    pub fn consume(&mut self, end: usize) {
        let end = end.min(self.data.len());
        self.data.drain(..end);
    }

    /// Discard everything in the buffer.
    pub fn clear(&mut self) {
        self.data.clear();
    }

    /// Get the current length of the buffer.
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Check if the buffer is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Get the maximum size of the buffer.
    #[must_use]
    pub const fn max_size(&self) -> usize {
        self.max_size
    }

    /// Get the number of bytes that have been discarded due to overflow.
    #[must_use]
    pub const fn bytes_discarded(&self) -> usize {
        self.bytes_discarded
    }
}

impl fmt::Debug for OutputBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OutputBuffer")
            .field("len", &self.len())
            .field("max_size", &self.max_size)
            .field("bytes_discarded", &self.bytes_discarded)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn basic_append() {
        let mut buf = OutputBuffer::new(100);
        buf.append(b"hello");
        assert_eq!(buf.len(), 5);
        assert_eq!(buf.as_slice(), b"hello");
    }

    #[test]
    fn overflow_discards_oldest() {
        let mut buf = OutputBuffer::new(10);
        buf.append(b"12345");
        buf.append(b"67890");
        buf.append(b"abc");

        assert_eq!(buf.len(), 10);
        assert_eq!(buf.as_str_lossy(), "4567890abc");
        assert_eq!(buf.bytes_discarded(), 3);
    }

    #[test]
    fn oversized_append_keeps_tail() {
        let mut buf = OutputBuffer::new(4);
        buf.append(b"ab");
        buf.append(b"0123456789");
        assert_eq!(buf.as_str_lossy(), "6789");
        assert_eq!(buf.bytes_discarded(), 8);
    }

    #[test]
    fn consume_keeps_remainder() {
        let mut buf = OutputBuffer::new(100);
        buf.append(b"ready\nlogin: ");
        buf.consume(5);
        assert_eq!(buf.as_str_lossy(), "\nlogin: ");
        buf.consume(1000);
        assert!(buf.is_empty());
    }

    #[test]
    fn clear_keeps_discard_count() {
        let mut buf = OutputBuffer::new(2);
        buf.append(b"tail");
        buf.clear();
        assert!(buf.is_empty());
        assert_eq!(buf.bytes_discarded(), 2);
    }
}
