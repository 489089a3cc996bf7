//! Reporting of assertion failures.
//!
//! Assertions never abort: they report a failure and return `false`, so one test can surface
//! every mismatch at once. [`Tester`] collects the failures and fails the surrounding test when it
//! goes out of scope.

use parking_lot::Mutex;
use std::fmt;
use tracing::error;

/// A failed assertion, with an optional detail block (usually a diff).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssertionFailure {
    pub message: String,
    pub detail: Option<String>,
}

impl AssertionFailure {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            detail: None,
        }
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }
}

impl fmt::Display for AssertionFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)?;
        if let Some(ref detail) = self.detail {
            write!(f, "\n{detail}")?;
        }
        Ok(())
    }
}

/// Receives assertion failures.
pub trait Reporter {
    fn fail(&self, failure: AssertionFailure);
}

/// Collecting reporter.
///
/// ```should_panic
/// use aduket::{AssertionFailure, Reporter, Tester};
///
/// let t = Tester::new();
/// t.fail(AssertionFailure::new("status mismatch"));
/// // dropping `t` fails the test
/// ```
#[derive(Debug)]
pub struct Tester {
    failures: Mutex<Vec<AssertionFailure>>,
    panic_on_drop: bool,
}

impl Tester {
    /// Reporter that panics on drop if any assertion failed.
    pub fn new() -> Self {
        Self {
            failures: Mutex::new(Vec::new()),
            panic_on_drop: true,
        }
    }

    /// Reporter that only collects; used to check that an assertion fails.
    pub fn lenient() -> Self {
        Self {
            failures: Mutex::new(Vec::new()),
            panic_on_drop: false,
        }
    }

    pub fn failed(&self) -> bool {
        !self.failures.lock().is_empty()
    }

    pub fn failures(&self) -> Vec<AssertionFailure> {
        self.failures.lock().clone()
    }
}

impl Default for Tester {
    fn default() -> Self {
        Self::new()
    }
}

impl Reporter for Tester {
    fn fail(&self, failure: AssertionFailure) {
        error!("{}", failure);
        self.failures.lock().push(failure);
    }
}

impl Drop for Tester {
    fn drop(&mut self) {
        if !self.panic_on_drop || std::thread::panicking() {
            return;
        }
        let failures = self.failures.get_mut();
        if failures.is_empty() {
            return;
        }
        let report = failures
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join("\n\n");
        panic!("{} assertion(s) failed:\n\n{report}", failures.len());
    }
}
