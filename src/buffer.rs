//! Receive buffer for incremental packet framing

use crate::{
    constants::{MAX_BUFFER_SIZE, SOCKET_BUF_SIZE},
    error::{EslError, EslResult},
};
use bytes::{Bytes, BytesMut};

/// Append-only byte accumulator the parser slices complete regions from.
///
/// Bytes that have not been consumed stay in place until more data arrives;
/// the parser never discards anything it has not decoded.
#[derive(Debug, Default)]
pub struct RecvBuffer {
    data: BytesMut,
}

impl RecvBuffer {
    pub fn new() -> Self {
        Self {
            data: BytesMut::with_capacity(SOCKET_BUF_SIZE),
        }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Append freshly read bytes, rejecting growth past the desync ceiling.
    pub fn extend(&mut self, chunk: &[u8]) -> EslResult<()> {
        if self.data.len() + chunk.len() > MAX_BUFFER_SIZE {
            tracing::error!(
                buffered = self.data.len(),
                incoming = chunk.len(),
                limit = MAX_BUFFER_SIZE,
                "receive buffer overflow, stream desynced"
            );
            return Err(EslError::protocol(format!(
                "receive buffer exceeded {} bytes",
                MAX_BUFFER_SIZE
            )));
        }
        self.data.extend_from_slice(chunk);
        Ok(())
    }

    /// Position of `pattern` in the unconsumed data, if present.
    pub fn find(&self, pattern: &[u8]) -> Option<usize> {
        if pattern.is_empty() || self.data.len() < pattern.len() {
            return None;
        }
        self.data
            .windows(pattern.len())
            .position(|window| window == pattern)
    }

    /// Split off everything before `pattern`, consuming the pattern as well.
    pub fn split_until(&mut self, pattern: &[u8]) -> Option<Bytes> {
        let pos = self.find(pattern)?;
        let region = self.data.split_to(pos).freeze();
        let _ = self.data.split_to(pattern.len());
        Some(region)
    }

    /// Split off exactly `count` bytes, or `None` until they have arrived.
    pub fn split_exact(&mut self, count: usize) -> Option<Bytes> {
        if self.data.len() < count {
            return None;
        }
        Some(self.data.split_to(count).freeze())
    }

    /// Drop everything, e.g. when a new session starts.
    pub fn clear(&mut self) {
        self.data.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extend_and_len() {
        let mut buf = RecvBuffer::new();
        assert!(buf.is_empty());
        buf.extend(b"Hello World").unwrap();
        assert_eq!(buf.len(), 11);
    }

    #[test]
    fn find_pattern() {
        let mut buf = RecvBuffer::new();
        buf.extend(b"Header: Value\n\nBody").unwrap();
        assert_eq!(buf.find(b"\n\n"), Some(13));
        assert_eq!(buf.find(b"\r\n"), None);
    }

    #[test]
    fn split_until_consumes_pattern() {
        let mut buf = RecvBuffer::new();
        buf.extend(b"Header: Value\n\nBody").unwrap();
        let region = buf.split_until(b"\n\n").unwrap();
        assert_eq!(&region[..], b"Header: Value");
        assert_eq!(buf.len(), 4);
        assert_eq!(buf.split_exact(4).unwrap(), Bytes::from_static(b"Body"));
    }

    #[test]
    fn split_until_absent() {
        let mut buf = RecvBuffer::new();
        buf.extend(b"partial header").unwrap();
        assert!(buf.split_until(b"\n\n").is_none());
        assert_eq!(buf.len(), 14);
    }

    #[test]
    fn split_exact_waits_for_bytes() {
        let mut buf = RecvBuffer::new();
        buf.extend(b"abc").unwrap();
        assert!(buf.split_exact(5).is_none());
        buf.extend(b"de").unwrap();
        assert_eq!(buf.split_exact(5).unwrap(), Bytes::from_static(b"abcde"));
        assert!(buf.is_empty());
    }

    #[test]
    fn overflow_rejected() {
        let mut buf = RecvBuffer::new();
        let chunk = vec![0u8; MAX_BUFFER_SIZE + 1];
        assert!(buf.extend(&chunk).is_err());
    }
}
