//! Closable load streams

use crate::{Error, Result};
use std::fmt;
use std::io::{self, Read};

/// Stream returned by [`Backend::load`](super::Backend::load)
///
/// Yields exactly the bytes of the requested window. If the underlying
/// source ends early the read fails with `UnexpectedEof` instead of
/// returning a short result. The source is released by [`close`](Self::close)
/// or when the reader is dropped.
pub struct BlobReader {
    inner: Box<dyn Read + Send>,
    len: usize,
    consumed: usize,
}

impl BlobReader {
    /// Wrap a source that promises `len` bytes
    pub fn new(inner: impl Read + Send + 'static, len: usize) -> Self {
        BlobReader {
            inner: Box::new(inner),
            len,
            consumed: 0,
        }
    }

    /// Number of bytes in the window
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Bytes not yet read
    pub fn remaining(&self) -> usize {
        self.len - self.consumed
    }

    /// Read the whole window into a buffer and close the stream
    pub fn read_all(mut self) -> Result<Vec<u8>> {
        let mut buf = vec![0u8; self.remaining()];
        read_full(&mut self, &mut buf)?;
        self.close()?;
        Ok(buf)
    }

    /// Release the underlying source
    pub fn close(self) -> Result<()> {
        if self.consumed < self.len {
            tracing::trace!(unread = self.len - self.consumed, "closing partially read blob");
        }
        Ok(())
    }
}

impl Read for BlobReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let remaining = self.remaining();
        if remaining == 0 || buf.is_empty() {
            return Ok(0);
        }

        let want = remaining.min(buf.len());
        let n = self.inner.read(&mut buf[..want])?;
        if n == 0 {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                format!("blob ended after {} of {} bytes", self.consumed, self.len),
            ));
        }
        self.consumed += n;
        Ok(n)
    }
}

impl fmt::Debug for BlobReader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BlobReader")
            .field("len", &self.len)
            .field("consumed", &self.consumed)
            .finish()
    }
}

/// Fill `buf` completely from `rd`
///
/// Running out of data first is a `ShortRead`, never a partial success.
pub fn read_full(rd: &mut impl Read, buf: &mut [u8]) -> Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match rd.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => break,
            Err(e) => return Err(e.into()),
        }
    }

    if filled < buf.len() {
        return Err(Error::ShortRead {
            expected: buf.len(),
            actual: filled,
        });
    }
    Ok(filled)
}
