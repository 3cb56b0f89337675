//! In-memory backend

use super::{Backend, BlobReader, FileInfo, Range, CONFIG_NAME};
use crate::model::{FileType, Handle};
use crate::{Error, Result};
use bytes::{Buf, Bytes};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::io::Read;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::debug;

/// A backend that keeps every object in a map
///
/// Loads hand out cheap slices of the stored buffer, so a reader keeps
/// seeing the content it was opened on even if the object is replaced.
pub struct MemoryBackend {
    objects: RwLock<HashMap<Handle, Bytes>>,
    closed: AtomicBool,
}

impl MemoryBackend {
    pub fn new() -> Self {
        MemoryBackend {
            objects: RwLock::new(HashMap::new()),
            closed: AtomicBool::new(false),
        }
    }

    /// Number of stored objects
    pub fn len(&self) -> usize {
        self.objects.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.read().is_empty()
    }

    fn ensure_open(&self) -> Result<()> {
        if self.closed.load(Ordering::Acquire) {
            return Err(Error::Closed);
        }
        Ok(())
    }

    fn key(handle: &Handle) -> Result<Handle> {
        handle.validate()?;
        if handle.file_type == FileType::Config {
            return Ok(Handle::config());
        }
        Ok(handle.clone())
    }

    fn get(&self, handle: &Handle) -> Result<Bytes> {
        self.ensure_open()?;
        let key = Self::key(handle)?;
        self.objects
            .read()
            .get(&key)
            .cloned()
            .ok_or_else(|| Error::NotFound(handle.to_string()))
    }
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl Backend for MemoryBackend {
    fn location(&self) -> String {
        "memory".to_string()
    }

    fn save(&self, handle: &Handle, rd: &mut dyn Read) -> Result<()> {
        self.ensure_open()?;
        let key = Self::key(handle)?;

        // Buffer first so a failing reader leaves the old object in place
        let mut data = Vec::new();
        rd.read_to_end(&mut data)?;

        debug!(handle = %handle, size = data.len(), "saved blob");
        self.objects.write().insert(key, Bytes::from(data));
        Ok(())
    }

    fn load(&self, handle: &Handle, length: usize, offset: u64) -> Result<BlobReader> {
        let data = self.get(handle)?;
        let (start, len) = Range::new(length, offset).resolve(data.len() as u64)?;
        let start = start as usize;
        let window = data.slice(start..start + len);
        Ok(BlobReader::new(window.reader(), len))
    }

    fn stat(&self, handle: &Handle) -> Result<FileInfo> {
        let data = self.get(handle)?;
        Ok(FileInfo {
            size: data.len() as u64,
        })
    }

    fn test(&self, handle: &Handle) -> Result<bool> {
        self.ensure_open()?;
        let key = Self::key(handle)?;
        Ok(self.objects.read().contains_key(&key))
    }

    fn remove(&self, handle: &Handle) -> Result<()> {
        self.ensure_open()?;
        let key = Self::key(handle)?;
        if self.objects.write().remove(&key).is_none() {
            return Err(Error::NotFound(handle.to_string()));
        }
        debug!(handle = %handle, "removed blob");
        Ok(())
    }

    fn list(&self, file_type: FileType) -> Result<Vec<String>> {
        self.ensure_open()?;
        let objects = self.objects.read();
        let mut names: Vec<String> = objects
            .keys()
            .filter(|h| h.file_type == file_type)
            .map(|h| match file_type {
                FileType::Config => CONFIG_NAME.to_string(),
                _ => h.name.clone(),
            })
            .collect();
        names.sort();
        Ok(names)
    }

    fn delete(&self) -> Result<()> {
        self.ensure_open()?;
        self.objects.write().clear();
        Ok(())
    }

    fn close(&self) -> Result<()> {
        self.closed.store(true, Ordering::Release);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn save(be: &MemoryBackend, handle: &Handle, data: &[u8]) {
        be.save(handle, &mut &data[..]).unwrap();
    }

    #[test]
    fn test_save_and_load() {
        let be = MemoryBackend::new();
        let h = Handle::for_content(FileType::Data, b"hello world");
        save(&be, &h, b"hello world");

        assert_eq!(be.load(&h, 0, 0).unwrap().read_all().unwrap(), b"hello world");
        assert_eq!(be.load(&h, 5, 6).unwrap().read_all().unwrap(), b"world");
        assert_eq!(be.stat(&h).unwrap().size, 11);
    }

    #[test]
    fn test_reader_survives_overwrite() {
        let be = MemoryBackend::new();
        let h = Handle::new(FileType::Key, "k");
        save(&be, &h, b"first");
        let rd = be.load(&h, 0, 0).unwrap();
        save(&be, &h, b"second");

        assert_eq!(rd.read_all().unwrap(), b"first");
        assert_eq!(be.load(&h, 0, 0).unwrap().read_all().unwrap(), b"second");
    }

    #[test]
    fn test_config_name_is_ignored() {
        let be = MemoryBackend::new();
        save(&be, &Handle::new(FileType::Config, "whatever"), b"cfg");

        assert!(be.test(&Handle::config()).unwrap());
        assert_eq!(be.list(FileType::Config).unwrap(), vec!["config"]);
        assert_eq!(be.len(), 1);
    }

    #[test]
    fn test_closed_backend_rejects_calls() {
        let be = MemoryBackend::new();
        be.close().unwrap();
        let h = Handle::new(FileType::Data, "x");
        assert!(matches!(be.save(&h, &mut &b""[..]), Err(Error::Closed)));
        assert!(matches!(be.load(&h, 0, 0), Err(Error::Closed)));
        assert!(matches!(be.list(FileType::Data), Err(Error::Closed)));
    }

    #[test]
    fn test_invalid_handle() {
        let be = MemoryBackend::new();
        let h = Handle::new(FileType::Data, "../escape");
        assert!(matches!(
            be.save(&h, &mut &b"x"[..]),
            Err(Error::InvalidHandle(_))
        ));
    }
}
