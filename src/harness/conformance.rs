//! Contract checks run against any backend

use super::fixture::Fixture;
use super::{context, random_bytes, verify};
use crate::backend::{Backend, Range};
use crate::config::BenchConfig;
use crate::model::{FileType, Handle};
use crate::{Error, Phase, Result};
use serde::Serialize;
use std::io::{self, Read};
use tracing::debug;

/// Checks that passed against one backend
#[derive(Clone, Debug, Serialize)]
pub struct ConformanceReport {
    pub backend: String,
    pub passed: Vec<&'static str>,
}

type Check<B> = fn(&B, &[u8], &BenchConfig) -> Result<()>;

/// Run every check in order, stopping at the first violation
pub fn run_conformance<B: Backend + ?Sized>(
    backend: &B,
    config: &BenchConfig,
) -> Result<ConformanceReport> {
    config.validate()?;
    let data = random_bytes(config.seed, config.blob_length);

    let checks: [(&'static str, Check<B>); 10] = [
        ("round-trip", round_trip),
        ("prefix", prefix),
        ("window", window),
        ("range-rejection", range_rejection),
        ("idempotent-save", idempotent_save),
        ("overwrite", overwrite),
        ("atomic-save", atomic_save),
        ("category-isolation", category_isolation),
        ("stat-and-list", stat_and_list),
        ("remove", remove),
    ];

    let mut passed = Vec::with_capacity(checks.len());
    for (name, check) in checks {
        check(backend, &data, config)?;
        debug!(check = name, "conformance check passed");
        passed.push(name);
    }

    Ok(ConformanceReport {
        backend: backend.location(),
        passed,
    })
}

fn data_handle(data: &[u8]) -> Handle {
    Handle::for_content(FileType::Data, data)
}

fn load<B: Backend + ?Sized>(backend: &B, handle: &Handle, range: Range) -> Result<Vec<u8>> {
    backend
        .load_range(handle, range)
        .map_err(context(Phase::Load, handle))?
        .read_all()
        .map_err(context(Phase::Read, handle))
}

fn expect_window<B: Backend + ?Sized>(
    backend: &B,
    handle: &Handle,
    range: Range,
    expected: &[u8],
) -> Result<()> {
    let got = load(backend, handle, range)?;
    verify(expected, &got).map_err(context(Phase::Verify, handle))
}

fn expect_error<T>(
    phase: Phase,
    handle: &Handle,
    result: Result<T>,
    wanted: &str,
    matches: impl Fn(&Error) -> bool,
) -> Result<()> {
    match result {
        Err(e) if matches(&e) => Ok(()),
        Err(e) => Err(context(phase, handle)(e)),
        Ok(_) => Err(context(phase, handle)(Error::Contract(format!(
            "expected {wanted}, operation succeeded"
        )))),
    }
}

fn round_trip<B: Backend + ?Sized>(backend: &B, data: &[u8], _: &BenchConfig) -> Result<()> {
    let handle = data_handle(data);
    let fixture = Fixture::save(backend, &handle, data)?;
    expect_window(backend, &handle, Range::full(), data)?;
    fixture.release()
}

fn prefix<B: Backend + ?Sized>(backend: &B, data: &[u8], config: &BenchConfig) -> Result<()> {
    let handle = data_handle(data);
    let fixture = Fixture::save(backend, &handle, data)?;

    // length 0 means "to the end", so the smallest prefix is one byte
    let len = data.len();
    for k in [1, config.window_length, len / 2, len.saturating_sub(1), len] {
        if k == 0 || k > len {
            continue;
        }
        expect_window(backend, &handle, Range::new(k, 0), &data[..k])?;
    }
    fixture.release()
}

fn window<B: Backend + ?Sized>(backend: &B, data: &[u8], config: &BenchConfig) -> Result<()> {
    let handle = data_handle(data);
    let fixture = Fixture::save(backend, &handle, data)?;

    let len = data.len();
    let offset = config.window_offset as usize;
    let windows = [
        (config.window_length, offset),
        (1, len.saturating_sub(1)),
        (len / 3, len / 3),
    ];
    for (length, offset) in windows {
        if length == 0 || offset + length > len {
            continue;
        }
        expect_window(
            backend,
            &handle,
            Range::new(length, offset as u64),
            &data[offset..offset + length],
        )?;
    }

    // Offset with no length reads the tail, including the empty tail
    for offset in [offset, len] {
        expect_window(backend, &handle, Range::new(0, offset as u64), &data[offset..])?;
    }
    fixture.release()
}

fn range_rejection<B: Backend + ?Sized>(
    backend: &B,
    data: &[u8],
    _: &BenchConfig,
) -> Result<()> {
    let handle = data_handle(data);
    let fixture = Fixture::save(backend, &handle, data)?;

    let len = data.len();
    let invalid = [
        Range::new(0, len as u64 + 1),
        Range::new(len + 1, 0),
        Range::new(1, len as u64),
        Range::new(len.max(2) - 1, 2),
    ];
    for range in invalid {
        let result = backend.load_range(&handle, range);
        expect_error(Phase::Load, &handle, result, "range error", |e| {
            matches!(e, Error::Range { .. })
        })?;
    }
    fixture.release()
}

fn idempotent_save<B: Backend + ?Sized>(
    backend: &B,
    data: &[u8],
    _: &BenchConfig,
) -> Result<()> {
    let handle = data_handle(data);
    let fixture = Fixture::save(backend, &handle, data)?;
    backend
        .save(&handle, &mut &data[..])
        .map_err(context(Phase::Save, &handle))?;
    expect_window(backend, &handle, Range::full(), data)?;
    fixture.release()
}

fn overwrite<B: Backend + ?Sized>(backend: &B, data: &[u8], _: &BenchConfig) -> Result<()> {
    let handle = Handle::new(FileType::Key, "conformance-overwrite");
    let first = &data[..data.len() / 2];
    let fixture = Fixture::save(backend, &handle, first)?;
    backend
        .save(&handle, &mut &data[..])
        .map_err(context(Phase::Save, &handle))?;
    expect_window(backend, &handle, Range::full(), data)?;
    fixture.release()
}

/// Yields some bytes, then fails
struct FailingReader<'a> {
    data: &'a [u8],
}

impl Read for FailingReader<'_> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.data.is_empty() {
            return Err(io::Error::new(io::ErrorKind::ConnectionReset, "source failed"));
        }
        self.data.read(buf)
    }
}

fn atomic_save<B: Backend + ?Sized>(backend: &B, data: &[u8], _: &BenchConfig) -> Result<()> {
    let handle = Handle::new(FileType::Key, "conformance-atomic");
    let original = &data[..data.len().min(1024)];
    let fixture = Fixture::save(backend, &handle, original)?;

    let mut failing = FailingReader {
        data: &data[..data.len() / 2],
    };
    let result = backend.save(&handle, &mut failing);
    expect_error(Phase::Save, &handle, result, "save error", |_| true)?;

    expect_window(backend, &handle, Range::full(), original)?;
    fixture.release()
}

fn category_isolation<B: Backend + ?Sized>(
    backend: &B,
    data: &[u8],
    _: &BenchConfig,
) -> Result<()> {
    let handle = data_handle(data);
    let twin = Handle::new(FileType::Index, handle.name.clone());
    let other = b"same name, other category";

    let fixture = Fixture::save(backend, &handle, data)?;
    let twin_fixture = Fixture::save(backend, &twin, other)?;
    expect_window(backend, &handle, Range::full(), data)?;
    expect_window(backend, &twin, Range::full(), other)?;

    twin_fixture.release()?;
    expect_window(backend, &handle, Range::full(), data)?;
    fixture.release()
}

fn stat_and_list<B: Backend + ?Sized>(
    backend: &B,
    data: &[u8],
    _: &BenchConfig,
) -> Result<()> {
    let handle = data_handle(data);
    let fixture = Fixture::save(backend, &handle, data)?;

    let info = backend.stat(&handle).map_err(context(Phase::Stat, &handle))?;
    if info.size != data.len() as u64 {
        return Err(context(Phase::Stat, &handle)(Error::Verification {
            expected_len: data.len(),
            actual_len: info.size as usize,
            first_mismatch: None,
        }));
    }

    let exists = backend.test(&handle).map_err(context(Phase::Stat, &handle))?;
    let listed = backend
        .list(FileType::Data)
        .map_err(context(Phase::List, &handle))?;
    if !exists || !listed.contains(&handle.name) {
        return Err(context(Phase::List, &handle)(Error::Contract(format!(
            "saved object not visible (test: {exists}, listed: {})",
            listed.len()
        ))));
    }
    fixture.release()
}

fn remove<B: Backend + ?Sized>(backend: &B, data: &[u8], _: &BenchConfig) -> Result<()> {
    let handle = data_handle(data);
    Fixture::save(backend, &handle, data)?.release()?;

    let not_found = |e: &Error| e.is_not_found();
    expect_error(
        Phase::Load,
        &handle,
        backend.load(&handle, 0, 0),
        "not found",
        not_found,
    )?;
    expect_error(
        Phase::Load,
        &handle,
        backend.load(&handle, 1, 0),
        "not found",
        not_found,
    )?;
    expect_error(
        Phase::Stat,
        &handle,
        backend.stat(&handle),
        "not found",
        not_found,
    )?;
    expect_error(
        Phase::Remove,
        &handle,
        backend.remove(&handle),
        "not found",
        not_found,
    )?;

    let exists = backend.test(&handle).map_err(context(Phase::Stat, &handle))?;
    let listed = backend
        .list(FileType::Data)
        .map_err(context(Phase::List, &handle))?;
    if exists || listed.contains(&handle.name) {
        return Err(context(Phase::List, &handle)(Error::Contract(
            "removed object is still visible".into(),
        )));
    }
    Ok(())
}
