//! Directory-backed backend
//!
//! Layout:
//! ```text
//! <root>/
//!   config
//!   data/<first two chars of name>/<name>
//!   keys/<name>
//!   locks/<name>
//!   snapshots/<name>
//!   index/<name>
//! ```
//!
//! Saves go to a temporary file in the destination directory which is
//! synced and then renamed over the target, so readers only ever see
//! complete objects.

use super::{Backend, BlobReader, FileInfo, Range, CONFIG_NAME};
use crate::model::{FileType, Handle};
use crate::{Error, Result};
use std::fs::{self, File};
use std::io::{self, ErrorKind, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use tempfile::NamedTempFile;
use tracing::{debug, instrument};

/// Length of the data subdirectory prefix
const SHARD_LEN: usize = 2;

/// Prefix of in-flight temporary files, skipped when listing
const TEMP_PREFIX: &str = ".tmp";

/// A backend storing each object as a file below a root directory
pub struct LocalBackend {
    root: PathBuf,
    closed: AtomicBool,
}

impl LocalBackend {
    /// Create the directory layout (idempotent) and open it
    pub fn create(root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        for file_type in FileType::ALL {
            if let Some(dir) = type_dir(file_type) {
                fs::create_dir_all(root.join(dir))?;
            }
        }
        debug!(root = %root.display(), "created local backend");
        Ok(Self::at(root))
    }

    /// Open an existing layout
    pub fn open(root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        if !root.join("data").is_dir() {
            return Err(Error::NotFound(format!(
                "no repository at {}",
                root.display()
            )));
        }
        Ok(Self::at(root))
    }

    /// Open an existing layout or create a new one
    pub fn open_or_create(root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref();
        if root.join("data").is_dir() {
            Self::open(root)
        } else {
            Self::create(root)
        }
    }

    fn at(root: PathBuf) -> Self {
        LocalBackend {
            root,
            closed: AtomicBool::new(false),
        }
    }

    /// The root directory
    pub fn path(&self) -> &Path {
        &self.root
    }

    fn ensure_open(&self) -> Result<()> {
        if self.closed.load(Ordering::Acquire) {
            return Err(Error::Closed);
        }
        Ok(())
    }

    /// File path for a handle
    fn filename(&self, handle: &Handle) -> Result<PathBuf> {
        self.ensure_open()?;
        handle.validate()?;

        let Some(dir) = type_dir(handle.file_type) else {
            return Ok(self.root.join(CONFIG_NAME));
        };

        let mut path = self.root.join(dir);
        if handle.file_type == FileType::Data {
            path.push(shard(&handle.name));
        }
        path.push(&handle.name);
        Ok(path)
    }

    fn names_in(dir: &Path, names: &mut Vec<String>) -> Result<()> {
        let entries = match fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(()),
            Err(e) => return Err(e.into()),
        };

        for entry in entries {
            let entry = entry?;
            if !entry.file_type()?.is_file() {
                continue;
            }
            if let Some(name) = entry.file_name().to_str() {
                if !name.starts_with(TEMP_PREFIX) {
                    names.push(name.to_string());
                }
            }
        }
        Ok(())
    }
}

impl Backend for LocalBackend {
    fn location(&self) -> String {
        self.root.display().to_string()
    }

    #[instrument(skip(self, rd), fields(handle = %handle))]
    fn save(&self, handle: &Handle, rd: &mut dyn Read) -> Result<()> {
        let path = self.filename(handle)?;
        let dir = path
            .parent()
            .ok_or_else(|| Error::InvalidHandle(handle.to_string()))?;
        fs::create_dir_all(dir)?;

        // Dropping the temp file on any error below deletes it
        let mut tmp = tempfile::Builder::new()
            .prefix(TEMP_PREFIX)
            .tempfile_in(dir)?;
        let size = io::copy(rd, &mut tmp)?;
        tmp.as_file().sync_all()?;
        persist(tmp, &path)?;

        debug!(size, "saved blob");
        Ok(())
    }

    fn load(&self, handle: &Handle, length: usize, offset: u64) -> Result<BlobReader> {
        let path = self.filename(handle)?;
        let mut file = File::open(&path).map_err(|e| not_found(e, handle))?;
        let size = file.metadata()?.len();

        let (start, len) = Range::new(length, offset).resolve(size)?;
        if start > 0 {
            file.seek(SeekFrom::Start(start))?;
        }
        Ok(BlobReader::new(file.take(len as u64), len))
    }

    fn stat(&self, handle: &Handle) -> Result<FileInfo> {
        let path = self.filename(handle)?;
        let meta = fs::metadata(&path).map_err(|e| not_found(e, handle))?;
        Ok(FileInfo { size: meta.len() })
    }

    fn test(&self, handle: &Handle) -> Result<bool> {
        let path = self.filename(handle)?;
        Ok(path.try_exists()?)
    }

    #[instrument(skip(self), fields(handle = %handle))]
    fn remove(&self, handle: &Handle) -> Result<()> {
        let path = self.filename(handle)?;
        fs::remove_file(&path).map_err(|e| not_found(e, handle))?;
        debug!("removed blob");
        Ok(())
    }

    fn list(&self, file_type: FileType) -> Result<Vec<String>> {
        self.ensure_open()?;
        let mut names = Vec::new();

        match type_dir(file_type) {
            None => {
                if self.root.join(CONFIG_NAME).is_file() {
                    names.push(CONFIG_NAME.to_string());
                }
            }
            Some(dir) if file_type == FileType::Data => {
                let base = self.root.join(dir);
                let shards = match fs::read_dir(&base) {
                    Ok(shards) => shards,
                    Err(e) if e.kind() == ErrorKind::NotFound => return Ok(names),
                    Err(e) => return Err(e.into()),
                };
                for shard in shards {
                    let shard = shard?;
                    if shard.file_type()?.is_dir() {
                        Self::names_in(&shard.path(), &mut names)?;
                    }
                }
            }
            Some(dir) => Self::names_in(&self.root.join(dir), &mut names)?,
        }

        names.sort();
        Ok(names)
    }

    fn close(&self) -> Result<()> {
        self.closed.store(true, Ordering::Release);
        Ok(())
    }
}

/// Directory holding a category, `None` for the root-level config file
fn type_dir(file_type: FileType) -> Option<&'static str> {
    match file_type {
        FileType::Data => Some("data"),
        FileType::Key => Some("keys"),
        FileType::Lock => Some("locks"),
        FileType::Snapshot => Some("snapshots"),
        FileType::Index => Some("index"),
        FileType::Config => None,
    }
}

fn shard(name: &str) -> &str {
    match name.char_indices().nth(SHARD_LEN) {
        Some((i, _)) => &name[..i],
        None => name,
    }
}

fn persist(tmp: NamedTempFile, path: &Path) -> Result<()> {
    tmp.persist(path).map_err(|e| Error::Io(e.error))?;
    Ok(())
}

fn not_found(e: io::Error, handle: &Handle) -> Error {
    if e.kind() == ErrorKind::NotFound {
        Error::NotFound(handle.to_string())
    } else {
        Error::Io(e)
    }
}
