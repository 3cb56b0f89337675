//! Conformance and benchmark harness
//!
//! A [`Suite`] knows how to open and close one kind of backend. Every
//! scenario gets a freshly opened instance, which is closed again however
//! the scenario ends:
//!
//! ```ignore
//! use blobkit::backend::{Backend, MemoryBackend};
//! use blobkit::harness::{Scenario, Suite};
//!
//! let suite = Suite::new(|| Ok(MemoryBackend::new()));
//! suite.run_conformance()?;
//! let report = suite.run(Scenario::LoadFile, 10)?;
//! println!("{:.1} MiB/s", report.throughput);
//! ```

mod conformance;
mod fixture;
mod random;
mod scenario;

pub use conformance::{run_conformance, ConformanceReport};
pub use fixture::{Fixture, Session};
pub use random::random_bytes;
pub use scenario::{run_scenario, Scenario, ScenarioReport};

use crate::backend::Backend;
use crate::config::BenchConfig;
use crate::model::Handle;
use crate::{Error, Phase, Result};
use fixture::CloseHook;
use tracing::info_span;

type OpenHook<B> = dyn Fn() -> Result<B>;

/// Opens backends for scenarios and runs them
pub struct Suite<B> {
    open: Box<OpenHook<B>>,
    close: Box<CloseHook<B>>,
    config: BenchConfig,
}

impl<B: Backend + 'static> Suite<B> {
    /// A suite whose instances are released with [`Backend::close`]
    pub fn new(open: impl Fn() -> Result<B> + 'static) -> Self {
        Suite {
            open: Box::new(open),
            close: Box::new(|backend: B| backend.close()),
            config: BenchConfig::default(),
        }
    }

    /// Replace the close hook
    pub fn with_close(mut self, close: impl Fn(B) -> Result<()> + 'static) -> Self {
        self.close = Box::new(close);
        self
    }

    pub fn with_config(mut self, config: BenchConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &BenchConfig {
        &self.config
    }

    /// Open a backend instance scoped to the returned session
    pub fn open(&self) -> Result<Session<'_, B>> {
        let backend = (self.open)().map_err(|source| Error::Scenario {
            phase: Phase::Setup,
            handle: "backend".into(),
            source: Box::new(source),
        })?;
        Ok(Session::new(backend, &*self.close))
    }

    /// Run one scenario on a fresh backend
    pub fn run(&self, scenario: Scenario, iterations: usize) -> Result<ScenarioReport> {
        let _span = info_span!("scenario", %scenario, iterations).entered();
        let session = self.open()?;
        let report = run_scenario(&*session, &self.config, scenario, iterations)?;
        session.finish()?;
        Ok(report)
    }

    /// Run every scenario in turn, stopping at the first failure
    pub fn run_all(&self, iterations: usize) -> Result<Vec<ScenarioReport>> {
        Scenario::ALL
            .into_iter()
            .map(|scenario| self.run(scenario, iterations))
            .collect()
    }

    /// Check the contract on a fresh backend
    pub fn run_conformance(&self) -> Result<ConformanceReport> {
        let _span = info_span!("conformance").entered();
        let session = self.open()?;
        let report = run_conformance(&*session, &self.config)?;
        session.finish()?;
        Ok(report)
    }
}

/// Wrap an error with the phase and handle it happened at
pub(crate) fn context(phase: Phase, handle: &Handle) -> impl FnOnce(Error) -> Error + '_ {
    move |source| Error::Scenario {
        phase,
        handle: handle.to_string(),
        source: Box::new(source),
    }
}

/// Compare loaded bytes against the fixture
pub fn verify(expected: &[u8], actual: &[u8]) -> Result<()> {
    if expected == actual {
        return Ok(());
    }
    let first_mismatch = expected
        .iter()
        .zip(actual)
        .position(|(a, b)| a != b)
        .or(Some(expected.len().min(actual.len())));
    Err(Error::Verification {
        expected_len: expected.len(),
        actual_len: actual.len(),
        first_mismatch,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::MemoryBackend;
    use std::cell::Cell;
    use std::rc::Rc;

    fn small() -> BenchConfig {
        BenchConfig {
            blob_length: 4_096,
            window_length: 1_000,
            window_offset: 77,
            ..BenchConfig::default()
        }
    }

    #[test]
    fn test_verify_reports_position() {
        assert!(verify(b"abc", b"abc").is_ok());
        assert!(matches!(
            verify(b"abc", b"abd"),
            Err(Error::Verification {
                first_mismatch: Some(2),
                ..
            })
        ));
        assert!(matches!(
            verify(b"abc", b"ab"),
            Err(Error::Verification {
                expected_len: 3,
                actual_len: 2,
                first_mismatch: Some(2),
            })
        ));
    }

    #[test]
    fn test_suite_closes_every_instance() {
        let opened = Rc::new(Cell::new(0));
        let closed = Rc::new(Cell::new(0));

        let o = opened.clone();
        let c = closed.clone();
        let suite = Suite::new(move || {
            o.set(o.get() + 1);
            Ok(MemoryBackend::new())
        })
        .with_close(move |be| {
            c.set(c.get() + 1);
            be.close()
        })
        .with_config(small());

        let reports = suite.run_all(2).unwrap();
        assert_eq!(reports.len(), 4);
        suite.run_conformance().unwrap();

        assert_eq!(opened.get(), 5);
        assert_eq!(closed.get(), 5);
    }

    #[test]
    fn test_failed_open_is_a_setup_error() {
        let suite: Suite<MemoryBackend> =
            Suite::new(|| Err(Error::Config("no backend".into()))).with_config(small());
        let err = suite.run(Scenario::LoadFile, 1).unwrap_err();
        assert_eq!(err.phase(), Some(Phase::Setup));
    }

    #[test]
    fn test_backend_closed_after_failed_scenario() {
        let closed = Rc::new(Cell::new(false));
        let c = closed.clone();
        let suite = Suite::new(|| {
            let be = MemoryBackend::new();
            // Closing up front makes the first save fail
            be.close()?;
            Ok(be)
        })
        .with_close(move |_| {
            c.set(true);
            Ok(())
        })
        .with_config(small());

        let err = suite.run(Scenario::Save, 1).unwrap_err();
        assert_eq!(err.phase(), Some(Phase::Save));
        assert!(closed.get());
    }
}
