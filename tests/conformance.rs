//! Contract tests run against every backend
//!
//! Run with:
//! ```bash
//! cargo test --test conformance
//! ```

use blobkit::harness::{random_bytes, Scenario, Suite};
use blobkit::{
    read_full, Backend, BenchConfig, Error, FileType, Handle, LocalBackend, MemoryBackend,
};
use std::sync::Arc;
use std::thread;
use tempfile::{tempdir, TempDir};

const DATA_LENGTH: usize = (1 << 24) + 2123;
const WINDOW_LENGTH: usize = DATA_LENGTH / 4 + 555;
const WINDOW_OFFSET: usize = 8273;

fn small_config() -> BenchConfig {
    BenchConfig {
        blob_length: 64 * 1024 + 17,
        window_length: 16 * 1024 + 555,
        window_offset: 8273,
        ..BenchConfig::default()
    }
}

fn local(dir: &TempDir) -> LocalBackend {
    LocalBackend::create(dir.path().join("repo")).unwrap()
}

/// The fixed 16 MiB scenario: full load, prefix, offset window, remove
fn check_large_blob(be: &dyn Backend) {
    let data = random_bytes(23, DATA_LENGTH);
    let handle = Handle::for_content(FileType::Data, &data);
    be.save(&handle, &mut &data[..]).unwrap();

    let mut buf = vec![0u8; DATA_LENGTH];
    let mut rd = be.load(&handle, 0, 0).unwrap();
    assert_eq!(read_full(&mut rd, &mut buf).unwrap(), DATA_LENGTH);
    rd.close().unwrap();
    assert!(buf == data, "full load differs");

    let mut window = vec![0u8; WINDOW_LENGTH];
    let mut rd = be.load(&handle, WINDOW_LENGTH, 0).unwrap();
    read_full(&mut rd, &mut window).unwrap();
    rd.close().unwrap();
    assert!(window[..] == data[..WINDOW_LENGTH], "prefix differs");

    let mut rd = be.load(&handle, WINDOW_LENGTH, WINDOW_OFFSET as u64).unwrap();
    read_full(&mut rd, &mut window).unwrap();
    rd.close().unwrap();
    assert!(
        window[..] == data[WINDOW_OFFSET..WINDOW_OFFSET + WINDOW_LENGTH],
        "offset window differs"
    );

    be.remove(&handle).unwrap();
    assert!(matches!(be.load(&handle, 0, 0), Err(Error::NotFound(_))));
}

/// Save and immediately remove the same blob, never loading it
fn check_save_remove_churn(be: &dyn Backend, rounds: usize) {
    let data = random_bytes(23, DATA_LENGTH);
    let handle = Handle::for_content(FileType::Data, &data);
    for _ in 0..rounds {
        be.save(&handle, &mut &data[..]).unwrap();
        be.remove(&handle).unwrap();
    }
    assert!(!be.test(&handle).unwrap());
}

// ============================================================================
// Memory backend
// ============================================================================

#[test]
fn test_memory_large_blob() {
    check_large_blob(&MemoryBackend::new());
}

#[test]
fn test_memory_churn() {
    check_save_remove_churn(&MemoryBackend::new(), 5);
}

#[test]
fn test_memory_conformance() {
    let suite = Suite::new(|| Ok(MemoryBackend::new())).with_config(small_config());
    let report = suite.run_conformance().unwrap();
    assert_eq!(report.backend, "memory");
    assert!(report.passed.contains(&"range-rejection"));
}

// ============================================================================
// Local backend
// ============================================================================

#[test]
fn test_local_large_blob() {
    let dir = tempdir().unwrap();
    check_large_blob(&local(&dir));
}

#[test]
fn test_local_churn() {
    let dir = tempdir().unwrap();
    check_save_remove_churn(&local(&dir), 3);
}

#[test]
fn test_local_conformance() {
    let dir = tempdir().unwrap();
    let root = dir.path().join("repo");
    let suite = Suite::new(move || LocalBackend::open_or_create(&root)).with_config(small_config());

    let report = suite.run_conformance().unwrap();
    assert_eq!(report.passed.len(), 10);

    // Nothing left behind after the checks
    let be = LocalBackend::open(dir.path().join("repo")).unwrap();
    for file_type in FileType::ALL {
        assert!(be.list(file_type).unwrap().is_empty(), "{file_type} not empty");
    }
}

#[test]
fn test_local_scenarios() {
    let dir = tempdir().unwrap();
    let root = dir.path().join("repo");
    let suite = Suite::new(move || LocalBackend::open_or_create(&root)).with_config(small_config());

    let reports = suite.run_all(3).unwrap();
    let scenarios: Vec<_> = reports.iter().map(|r| r.scenario).collect();
    assert_eq!(scenarios, Scenario::ALL.to_vec());
    assert_eq!(reports[1].bytes_per_iteration, 16 * 1024 + 555);
}

#[test]
fn test_local_data_survives_reopen() {
    let dir = tempdir().unwrap();
    let data = random_bytes(5, 10_000);
    let handle = Handle::for_content(FileType::Data, &data);

    {
        let be = local(&dir);
        be.save(&handle, &mut &data[..]).unwrap();
        be.close().unwrap();
        assert!(matches!(be.stat(&handle), Err(Error::Closed)));
    }

    let be = LocalBackend::open(dir.path().join("repo")).unwrap();
    assert_eq!(be.load(&handle, 0, 0).unwrap().read_all().unwrap(), data);
}

// ============================================================================
// Shared behaviour
// ============================================================================

#[test]
fn test_concurrent_loads_see_same_content() {
    let dir = tempdir().unwrap();
    let backends: [Arc<dyn Backend>; 2] = [Arc::new(MemoryBackend::new()), Arc::new(local(&dir))];

    for be in backends {
        let data = Arc::new(random_bytes(9, 200_000));
        let handle = Handle::for_content(FileType::Data, &data);
        be.save(&handle, &mut &data[..]).unwrap();

        let readers: Vec<_> = (0..4u64)
            .map(|i| {
                let be = Arc::clone(&be);
                let data = Arc::clone(&data);
                let handle = handle.clone();
                thread::spawn(move || {
                    let offset = i * 1000;
                    let got = be.load(&handle, 5000, offset).unwrap().read_all().unwrap();
                    assert_eq!(got, data[offset as usize..offset as usize + 5000]);
                })
            })
            .collect();
        for reader in readers {
            reader.join().unwrap();
        }

        be.remove(&handle).unwrap();
    }
}

#[test]
fn test_remove_missing_is_not_found() {
    let dir = tempdir().unwrap();
    let handle = Handle::new(FileType::Snapshot, "missing");
    for be in [&MemoryBackend::new() as &dyn Backend, &local(&dir)] {
        assert!(be.remove(&handle).unwrap_err().is_not_found());
        assert!(!be.test(&handle).unwrap());
    }
}

#[test]
fn test_delete_clears_everything() {
    let dir = tempdir().unwrap();
    for be in [&MemoryBackend::new() as &dyn Backend, &local(&dir)] {
        be.save(&Handle::for_content(FileType::Data, b"a"), &mut &b"a"[..])
            .unwrap();
        be.save(&Handle::new(FileType::Lock, "l"), &mut &b"lock"[..])
            .unwrap();
        be.save(&Handle::config(), &mut &b"{}"[..]).unwrap();

        be.delete().unwrap();
        for file_type in FileType::ALL {
            assert!(be.list(file_type).unwrap().is_empty());
        }
    }
}
