//! Harness and backend configuration
//!
//! Stored as JSON in `~/.config/blobkit/config.json` (or wherever
//! `--config` points). Missing fields take their defaults.

use crate::backend::{Backend, LocalBackend, MemoryBackend};
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Size of the benchmark fixture: 16 MiB plus a ragged tail
pub const DEFAULT_BLOB_LENGTH: usize = (1 << 24) + 2123;

/// Seed for fixture generation
pub const DEFAULT_SEED: u64 = 23;

/// Offset used by the offset-window scenario
pub const DEFAULT_WINDOW_OFFSET: u64 = 8273;

/// Directory used when no repository path is configured
pub const DEFAULT_REPO: &str = ".blobkit";

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub backend: BackendConfig,
    pub bench: BenchConfig,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    Memory,
    #[default]
    Local,
}

/// Which backend to open and where
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    pub kind: BackendKind,
    /// Repository root for the local backend
    pub path: Option<PathBuf>,
}

impl BackendConfig {
    /// Open a backend instance, creating a local repository if needed
    pub fn open(&self) -> Result<Box<dyn Backend>> {
        match self.kind {
            BackendKind::Memory => Ok(Box::new(MemoryBackend::new())),
            BackendKind::Local => Ok(Box::new(LocalBackend::open_or_create(self.repo())?)),
        }
    }

    /// The local repository root
    pub fn repo(&self) -> PathBuf {
        self.path
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_REPO))
    }
}

/// Parameters of the fixture and the timed loops
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BenchConfig {
    pub seed: u64,
    pub blob_length: usize,
    pub window_length: usize,
    pub window_offset: u64,
    pub iterations: usize,
}

impl Default for BenchConfig {
    fn default() -> Self {
        BenchConfig {
            seed: DEFAULT_SEED,
            blob_length: DEFAULT_BLOB_LENGTH,
            window_length: DEFAULT_BLOB_LENGTH / 4 + 555,
            window_offset: DEFAULT_WINDOW_OFFSET,
            iterations: 10,
        }
    }
}

impl BenchConfig {
    /// Check the windows fit inside the fixture and every loop runs
    pub fn validate(&self) -> Result<()> {
        if self.blob_length == 0 {
            return Err(Error::Config("blob_length must be positive".into()));
        }
        if self.window_length == 0 {
            return Err(Error::Config("window_length must be positive".into()));
        }
        if self.window_offset == 0 {
            return Err(Error::Config(
                "window_offset must be positive; a zero offset repeats the prefix scenario".into(),
            ));
        }
        if self.iterations == 0 {
            return Err(Error::Config("iterations must be positive".into()));
        }
        let end = self.window_offset.saturating_add(self.window_length as u64);
        if end > self.blob_length as u64 {
            return Err(Error::Config(format!(
                "window {}+{} does not fit in a {} byte blob",
                self.window_offset, self.window_length, self.blob_length
            )));
        }
        Ok(())
    }
}

impl Config {
    /// Default config file location
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("blobkit").join("config.json"))
    }

    /// Load from a file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("Failed to read {}: {}", path.display(), e)))?;
        let config: Config = serde_json::from_str(&content)?;
        config.bench.validate()?;
        Ok(config)
    }

    /// Load `explicit` if given, else the default file if it exists, else defaults
    pub fn load_or_default(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::load(path);
        }
        match Self::default_path() {
            Some(path) if path.is_file() => Self::load(path),
            _ => Ok(Config::default()),
        }
    }

    /// Write as pretty JSON
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if let Some(dir) = path.parent() {
            std::fs::create_dir_all(dir)?;
        }
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}
