//! Scoped resources used by scenarios
//!
//! [`Session`] owns a backend for the length of one scenario and runs the
//! close hook however the scenario ends. [`Fixture`] removes a saved
//! object when it goes out of scope.

use super::context;
use crate::backend::Backend;
use crate::model::Handle;
use crate::{Error, Phase, Result};
use std::ops::Deref;
use tracing::warn;

pub(crate) type CloseHook<B> = dyn Fn(B) -> Result<()>;

/// An open backend that is handed back to the close hook on drop
pub struct Session<'a, B> {
    backend: Option<B>,
    close: &'a CloseHook<B>,
}

impl<'a, B: Backend> Session<'a, B> {
    pub(crate) fn new(backend: B, close: &'a CloseHook<B>) -> Self {
        Session {
            backend: Some(backend),
            close,
        }
    }

    /// Close the backend and report the outcome
    pub fn finish(mut self) -> Result<()> {
        match self.backend.take() {
            Some(backend) => (self.close)(backend).map_err(|source| Error::Scenario {
                phase: Phase::Cleanup,
                handle: "backend".into(),
                source: Box::new(source),
            }),
            None => Ok(()),
        }
    }
}

impl<B> Deref for Session<'_, B> {
    type Target = B;

    fn deref(&self) -> &B {
        self.backend
            .as_ref()
            .unwrap_or_else(|| unreachable!("session used after finish"))
    }
}

impl<B> Drop for Session<'_, B> {
    fn drop(&mut self) {
        if let Some(backend) = self.backend.take() {
            if let Err(e) = (self.close)(backend) {
                warn!(error = %e, "closing backend failed");
            }
        }
    }
}

/// A stored object that is removed when the guard is dropped
pub struct Fixture<'a, B: Backend + ?Sized> {
    backend: &'a B,
    handle: &'a Handle,
    armed: bool,
}

impl<'a, B: Backend + ?Sized> Fixture<'a, B> {
    /// Save `data` under `handle` and guard it
    pub fn save(backend: &'a B, handle: &'a Handle, data: &[u8]) -> Result<Self> {
        backend
            .save(handle, &mut &data[..])
            .map_err(context(Phase::Save, handle))?;
        Ok(Self::guard(backend, handle))
    }

    /// Guard an object that has already been saved
    pub fn guard(backend: &'a B, handle: &'a Handle) -> Self {
        Fixture {
            backend,
            handle,
            armed: true,
        }
    }

    pub fn handle(&self) -> &Handle {
        self.handle
    }

    /// The object is already gone; skip cleanup
    pub fn disarm(mut self) {
        self.armed = false;
    }

    /// Remove the object now, reporting failure
    pub fn release(mut self) -> Result<()> {
        self.armed = false;
        self.backend
            .remove(self.handle)
            .map_err(context(Phase::Cleanup, self.handle))
    }
}

impl<B: Backend + ?Sized> Drop for Fixture<'_, B> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        match self.backend.remove(self.handle) {
            Ok(()) => {}
            Err(e) if e.is_not_found() => {}
            Err(e) => warn!(handle = %self.handle, error = %e, "fixture cleanup failed"),
        }
    }
}
