//! Benchmark scenarios
//!
//! Each scenario saves a fixture, then runs a timed loop of loads or
//! save/remove cycles. Only the loop is timed. Any failure aborts the run
//! and no report is produced.

use super::fixture::Fixture;
use super::{context, random_bytes, verify};
use crate::backend::{read_full, Backend, Range};
use crate::config::BenchConfig;
use crate::model::{FileType, Handle};
use crate::{Error, Phase, Result};
use serde::{Deserialize, Serialize, Serializer};
use std::fmt;
use std::io::Cursor;
use std::str::FromStr;
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// The access pattern a benchmark run exercises
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Scenario {
    /// Load the whole blob
    LoadFile,
    /// Load a prefix of the blob
    LoadPartialFile,
    /// Load a window at a non-zero offset
    LoadPartialFileOffset,
    /// Save then remove the blob, no loads
    Save,
}

impl Scenario {
    pub const ALL: [Scenario; 4] = [
        Scenario::LoadFile,
        Scenario::LoadPartialFile,
        Scenario::LoadPartialFileOffset,
        Scenario::Save,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Scenario::LoadFile => "load-file",
            Scenario::LoadPartialFile => "load-partial-file",
            Scenario::LoadPartialFileOffset => "load-partial-file-offset",
            Scenario::Save => "save",
        }
    }

    /// The window loaded on each iteration; `None` for the save scenario
    pub fn window(&self, config: &BenchConfig) -> Option<Range> {
        match self {
            Scenario::LoadFile => Some(Range::full()),
            Scenario::LoadPartialFile => Some(Range::new(config.window_length, 0)),
            Scenario::LoadPartialFileOffset => {
                Some(Range::new(config.window_length, config.window_offset))
            }
            Scenario::Save => None,
        }
    }

    /// Bytes moved by one iteration
    pub fn bytes_per_iteration(&self, config: &BenchConfig) -> u64 {
        match self.window(config) {
            Some(range) if range.length > 0 => range.length as u64,
            _ => config.blob_length as u64,
        }
    }
}

impl fmt::Display for Scenario {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Scenario {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Scenario::ALL
            .into_iter()
            .find(|sc| sc.name() == s)
            .ok_or_else(|| Error::Config(format!("unknown scenario: {s}")))
    }
}

/// Timing of a completed scenario
#[derive(Clone, Debug, Serialize)]
pub struct ScenarioReport {
    pub scenario: Scenario,
    pub backend: String,
    pub iterations: usize,
    pub bytes_per_iteration: u64,
    #[serde(rename = "elapsed_secs", serialize_with = "as_secs")]
    pub elapsed: Duration,
    #[serde(rename = "throughput_mib_s")]
    pub throughput: f64,
}

impl ScenarioReport {
    fn new(
        scenario: Scenario,
        backend: String,
        iterations: usize,
        bytes_per_iteration: u64,
        elapsed: Duration,
    ) -> Self {
        let total = bytes_per_iteration as f64 * iterations as f64;
        let secs = elapsed.as_secs_f64();
        let throughput = if secs > 0.0 {
            total / secs / (1024.0 * 1024.0)
        } else {
            0.0
        };
        ScenarioReport {
            scenario,
            backend,
            iterations,
            bytes_per_iteration,
            elapsed,
            throughput,
        }
    }

    /// Total bytes moved by the timed loop
    pub fn total_bytes(&self) -> u64 {
        self.bytes_per_iteration * self.iterations as u64
    }
}

fn as_secs<S: Serializer>(d: &Duration, s: S) -> std::result::Result<S::Ok, S::Error> {
    s.serialize_f64(d.as_secs_f64())
}

/// Run `scenario` for `iterations` rounds against an open backend
pub fn run_scenario<B: Backend + ?Sized>(
    backend: &B,
    config: &BenchConfig,
    scenario: Scenario,
    iterations: usize,
) -> Result<ScenarioReport> {
    config.validate()?;
    if iterations == 0 {
        return Err(Error::Config(format!("{scenario} needs at least one iteration")));
    }

    let data = random_bytes(config.seed, config.blob_length);
    let handle = Handle::for_content(FileType::Data, &data);
    debug!(%scenario, handle = %handle, size = data.len(), "generated fixture");

    let (bytes, elapsed) = match scenario.window(config) {
        Some(window) => load_loop(backend, &handle, &data, window, iterations)?,
        None => churn_loop(backend, &handle, &data, iterations)?,
    };

    let report = ScenarioReport::new(scenario, backend.location(), iterations, bytes, elapsed);
    info!(
        %scenario,
        iterations,
        elapsed_ms = elapsed.as_millis() as u64,
        throughput_mib_s = report.throughput,
        "scenario finished"
    );
    Ok(report)
}

fn load_loop<B: Backend + ?Sized>(
    backend: &B,
    handle: &Handle,
    data: &[u8],
    window: Range,
    iterations: usize,
) -> Result<(u64, Duration)> {
    let fixture = Fixture::save(backend, handle, data)?;

    let (start, len) = window
        .resolve(data.len() as u64)
        .map_err(context(Phase::Setup, handle))?;
    let start = start as usize;
    let expected = &data[start..start + len];
    let mut buf = vec![0u8; len];

    let started = Instant::now();
    for _ in 0..iterations {
        let mut rd = backend
            .load_range(handle, window)
            .map_err(context(Phase::Load, handle))?;

        if rd.len() != len {
            return Err(context(Phase::Verify, handle)(Error::Verification {
                expected_len: len,
                actual_len: rd.len(),
                first_mismatch: None,
            }));
        }

        read_full(&mut rd, &mut buf).map_err(context(Phase::Read, handle))?;
        rd.close().map_err(context(Phase::Close, handle))?;
        verify(expected, &buf).map_err(context(Phase::Verify, handle))?;
    }
    let elapsed = started.elapsed();

    fixture.release()?;
    Ok((len as u64, elapsed))
}

fn churn_loop<B: Backend + ?Sized>(
    backend: &B,
    handle: &Handle,
    data: &[u8],
    iterations: usize,
) -> Result<(u64, Duration)> {
    let mut rd = Cursor::new(data);

    let started = Instant::now();
    for _ in 0..iterations {
        rd.set_position(0);
        backend
            .save(handle, &mut rd)
            .map_err(context(Phase::Save, handle))?;

        let saved = Fixture::guard(backend, handle);
        backend
            .remove(handle)
            .map_err(context(Phase::Remove, handle))?;
        saved.disarm();
    }
    Ok((data.len() as u64, started.elapsed()))
}
