// SPDX-License-Identifier: MIT
//
// Backend discovery.
//
// Providers are constructors registered under a name. Selection is either
// explicit (the options name a backend: that provider or nothing) or
// automatic: providers are tried in registration order and the first one
// that constructs wins. A failing provider doesn't end the search, but
// after `MAX_CONSECUTIVE_FAILURES` failures in a row we give up rather
// than keep probing an environment that clearly can't host a terminal.

use super::{Backend, TermiosBackend, TestBackend};
use crate::config::TerminalOptions;
use crate::error::{BackendError, Result};

/// Consecutive provider failures tolerated during automatic selection.
pub const MAX_CONSECUTIVE_FAILURES: usize = 3;

/// Builds a backend from session options.
pub type Provider = fn(&TerminalOptions) -> Result<Box<dyn Backend>>;

/// Size of the in-memory screen when the test backend is selected.
const TEST_BACKEND_SIZE: (u16, u16) = (80, 24);

/// Named backend constructors, in priority order.
#[derive(Debug, Clone, Default)]
pub struct BackendRegistry {
    providers: Vec<(&'static str, Provider)>,
}

impl BackendRegistry {
    /// An empty registry.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            providers: Vec::new(),
        }
    }

    /// The built-in providers: `termios`, then `test`.
    #[must_use]
    pub fn with_defaults() -> Self {
        let mut reg = Self::new();
        reg.register("termios", termios_provider);
        reg.register("test", test_provider);
        reg
    }

    /// Add a provider at the end of the list. Registering a name again
    /// replaces the earlier provider in place.
    pub fn register(&mut self, name: &'static str, provider: Provider) {
        if let Some(slot) = self.providers.iter_mut().find(|(n, _)| *n == name) {
            slot.1 = provider;
        } else {
            self.providers.push((name, provider));
        }
    }

    /// Registered names in priority order.
    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.providers.iter().map(|(n, _)| *n)
    }

    /// Build a backend for `options`.
    ///
    /// # Errors
    ///
    /// With an explicit backend name: `UnknownBackend` if nobody
    /// registered it, otherwise that provider's own error. Without one:
    /// `NoProvider` once every provider failed or too many failed in a row.
    pub fn create(&self, options: &TerminalOptions) -> Result<Box<dyn Backend>> {
        if let Some(wanted) = options.backend.as_deref() {
            let (name, provider) = self
                .providers
                .iter()
                .find(|(n, _)| n.eq_ignore_ascii_case(wanted))
                .ok_or_else(|| BackendError::UnknownBackend(wanted.to_string()))?;
            log::debug!("using backend `{name}` (explicit)");
            return provider(options);
        }

        // A success ends the search, so every failure counted is part of
        // one unbroken run.
        let mut failures = 0;
        for (name, provider) in &self.providers {
            match provider(options) {
                Ok(backend) => {
                    log::debug!("using backend `{name}`");
                    return Ok(backend);
                }
                Err(e) => {
                    log::warn!("backend `{name}` unavailable: {e}");
                    failures += 1;
                    if failures >= MAX_CONSECUTIVE_FAILURES {
                        break;
                    }
                }
            }
        }
        Err(BackendError::NoProvider { attempted: failures }.into())
    }
}

fn termios_provider(options: &TerminalOptions) -> Result<Box<dyn Backend>> {
    Ok(Box::new(TermiosBackend::open(options)?))
}

fn test_provider(_options: &TerminalOptions) -> Result<Box<dyn Backend>> {
    let (cols, rows) = TEST_BACKEND_SIZE;
    Ok(Box::new(TestBackend::new(cols, rows)))
}

// ─── Tests ───────────────────────────────────────────────────────────────────
