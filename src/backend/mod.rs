//! The backend contract
//!
//! Every storage provider implements [`Backend`]: save a blob under a
//! handle, load all or part of it back as a stream, remove it. The
//! conformance harness in [`crate::harness`] checks implementations
//! against this contract.
//!
//! Concurrent saves of different content to the same handle resolve as
//! last writer wins. Readers opened before such a save keep seeing the
//! content they were opened on.

mod local;
mod memory;
mod reader;

pub use local::LocalBackend;
pub use memory::MemoryBackend;
pub use reader::{read_full, BlobReader};

use crate::model::{FileType, Handle};
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::io::Read;

/// A byte window requested from a stored blob
///
/// A `length` of zero means "from `offset` to the end of the blob".
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Range {
    pub length: usize,
    pub offset: u64,
}

impl Range {
    /// The whole blob
    pub fn full() -> Self {
        Range::default()
    }

    pub fn new(length: usize, offset: u64) -> Self {
        Range { length, offset }
    }

    /// Resolve against a blob size, returning the start and byte count
    pub fn resolve(&self, size: u64) -> Result<(u64, usize)> {
        let err = || Error::Range {
            offset: self.offset,
            length: self.length,
            size,
        };

        if self.offset > size {
            return Err(err());
        }

        if self.length == 0 {
            let rest = usize::try_from(size - self.offset).map_err(|_| err())?;
            return Ok((self.offset, rest));
        }

        let end = self.offset.checked_add(self.length as u64).ok_or_else(err)?;
        if end > size {
            return Err(err());
        }
        Ok((self.offset, self.length))
    }
}

/// Metadata about a stored object
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileInfo {
    pub size: u64,
}

/// A storage provider holding blobs addressed by [`Handle`]
///
/// All operations touch durable storage and may block. None of them retry;
/// a caller may retry after a transient error.
pub trait Backend: Send + Sync {
    /// Human readable location, e.g. a directory path
    fn location(&self) -> String;

    /// Store everything `rd` yields under `handle`, replacing prior content
    ///
    /// A failed save never leaves a truncated object behind.
    fn save(&self, handle: &Handle, rd: &mut dyn Read) -> Result<()>;

    /// Open a stream over `length` bytes starting at `offset`
    ///
    /// `length == 0` reads to the end of the blob.
    fn load(&self, handle: &Handle, length: usize, offset: u64) -> Result<BlobReader>;

    /// Load using a [`Range`]
    fn load_range(&self, handle: &Handle, range: Range) -> Result<BlobReader> {
        self.load(handle, range.length, range.offset)
    }

    /// Size and other metadata of a stored object
    fn stat(&self, handle: &Handle) -> Result<FileInfo>;

    /// Whether an object exists under `handle`
    fn test(&self, handle: &Handle) -> Result<bool>;

    /// Delete an object; fails with `NotFound` if there is none
    fn remove(&self, handle: &Handle) -> Result<()>;

    /// Names stored under a category, sorted
    fn list(&self, file_type: FileType) -> Result<Vec<String>>;

    /// Remove every object in the backend
    fn delete(&self) -> Result<()> {
        for file_type in FileType::ALL {
            for name in self.list(file_type)? {
                self.remove(&Handle::new(file_type, name))?;
            }
        }
        Ok(())
    }

    /// Release provider resources; later calls fail with `Closed`
    fn close(&self) -> Result<()>;
}

impl<B: Backend + ?Sized> Backend for Box<B> {
    fn location(&self) -> String {
        (**self).location()
    }

    fn save(&self, handle: &Handle, rd: &mut dyn Read) -> Result<()> {
        (**self).save(handle, rd)
    }

    fn load(&self, handle: &Handle, length: usize, offset: u64) -> Result<BlobReader> {
        (**self).load(handle, length, offset)
    }

    fn stat(&self, handle: &Handle) -> Result<FileInfo> {
        (**self).stat(handle)
    }

    fn test(&self, handle: &Handle) -> Result<bool> {
        (**self).test(handle)
    }

    fn remove(&self, handle: &Handle) -> Result<()> {
        (**self).remove(handle)
    }

    fn list(&self, file_type: FileType) -> Result<Vec<String>> {
        (**self).list(file_type)
    }

    fn delete(&self) -> Result<()> {
        (**self).delete()
    }

    fn close(&self) -> Result<()> {
        (**self).close()
    }
}

/// Name reported by `list` for the config object
pub(crate) const CONFIG_NAME: &str = "config";
