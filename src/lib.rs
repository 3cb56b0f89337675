//! # blobkit
//!
//! A content-addressed blob backend contract and the harness that checks
//! and benchmarks implementations of it.
//!
//! ## Core Concepts
//!
//! - **Handles**: a category plus a name; data blobs are named by the
//!   BLAKE3 digest of their content
//! - **Backends**: storage providers implementing [`Backend`]: save,
//!   ranged load, remove
//! - **Suites**: open a backend per scenario, verify byte-exact round
//!   trips and measure throughput
//!
//! ## Example
//!
//! ```ignore
//! use blobkit::{Backend, FileType, Handle, LocalBackend};
//!
//! let backend = LocalBackend::open_or_create(".blobkit")?;
//! let data = b"hello world";
//! let handle = Handle::for_content(FileType::Data, data);
//! backend.save(&handle, &mut &data[..])?;
//! let window = backend.load(&handle, 5, 6)?.read_all()?;
//! assert_eq!(window, b"world");
//! ```

pub mod backend;
pub mod config;
pub mod harness;
pub mod model;

mod error;

pub use backend::{read_full, Backend, BlobReader, FileInfo, LocalBackend, MemoryBackend, Range};
pub use config::{BackendConfig, BackendKind, BenchConfig, Config};
pub use error::{Error, Phase, Result};
pub use harness::{ConformanceReport, Scenario, ScenarioReport, Suite};
pub use model::{FileType, Handle, Id};
