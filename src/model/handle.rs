//! Handle type - the unit of addressing for every backend operation

use super::Id;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Category of a stored object
///
/// Categories partition the namespace: the same name under two
/// categories refers to two different objects.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileType {
    /// Content blobs
    Data,
    /// Key material
    Key,
    /// Lock files
    Lock,
    /// Snapshot descriptions
    Snapshot,
    /// Index files
    Index,
    /// The single repository config object
    Config,
}

impl FileType {
    pub const ALL: [FileType; 6] = [
        FileType::Data,
        FileType::Key,
        FileType::Lock,
        FileType::Snapshot,
        FileType::Index,
        FileType::Config,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            FileType::Data => "data",
            FileType::Key => "key",
            FileType::Lock => "lock",
            FileType::Snapshot => "snapshot",
            FileType::Index => "index",
            FileType::Config => "config",
        }
    }
}

impl fmt::Display for FileType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FileType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        FileType::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| Error::InvalidHandle(format!("unknown file type: {s}")))
    }
}

/// A (category, name) pair identifying a stored object
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Handle {
    pub file_type: FileType,
    pub name: String,
}

impl Handle {
    /// Create a handle
    pub fn new(file_type: FileType, name: impl Into<String>) -> Self {
        Handle {
            file_type,
            name: name.into(),
        }
    }

    /// Handle for the repository config object
    pub fn config() -> Self {
        Handle::new(FileType::Config, "")
    }

    /// Content-addressed handle for a blob
    pub fn for_content(file_type: FileType, content: &[u8]) -> Self {
        Handle::new(file_type, Id::hash(content).to_hex())
    }

    /// Check the name is usable as a file or object name
    pub fn validate(&self) -> Result<()> {
        if self.file_type == FileType::Config {
            return Ok(());
        }
        if self.name.is_empty() {
            return Err(Error::InvalidHandle(format!("empty name for {}", self.file_type)));
        }
        // Dot names are reserved for in-flight temporary files
        if self.name.starts_with('.') {
            return Err(Error::InvalidHandle(self.to_string()));
        }
        let unsafe_char = |c: char| c == '/' || c == '\\' || c.is_control();
        if self.name.chars().any(unsafe_char) {
            return Err(Error::InvalidHandle(self.to_string()));
        }
        Ok(())
    }
}

impl fmt::Display for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.file_type == FileType::Config {
            return write!(f, "<{}>", self.file_type);
        }
        write!(f, "<{}/{}>", self.file_type, self.name)
    }
}

impl fmt::Debug for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Handle({}, {:?})", self.file_type, self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_handle_uses_digest() {
        let h = Handle::for_content(FileType::Data, b"data");
        assert_eq!(h.name, Id::hash(b"data").to_hex());
        assert!(h.validate().is_ok());
    }

    #[test]
    fn test_categories_do_not_collide() {
        let data = Handle::for_content(FileType::Data, b"same");
        let index = Handle::for_content(FileType::Index, b"same");
        assert_eq!(data.name, index.name);
        assert_ne!(data, index);
    }

    #[test]
    fn test_validate_rejects_unsafe_names() {
        for name in ["", ".", "..", ".tmpkey", ".hidden", "a/b", "a\\b", "a\nb"] {
            assert!(
                Handle::new(FileType::Data, name).validate().is_err(),
                "{name:?} should be rejected"
            );
        }
        assert!(Handle::config().validate().is_ok());
        assert!(Handle::new(FileType::Key, "a.tmp").validate().is_ok());
    }

    #[test]
    fn test_file_type_parse() {
        for t in FileType::ALL {
            assert_eq!(t.as_str().parse::<FileType>().unwrap(), t);
        }
        assert!("blob".parse::<FileType>().is_err());
    }

    #[test]
    fn test_display_keeps_full_name() {
        let h = Handle::new(FileType::Data, "0123456789abcdef");
        assert_eq!(h.to_string(), "<data/0123456789abcdef>");
        assert_eq!(Handle::config().to_string(), "<config>");
    }
}
