//! Run statistics accumulator
//!
//! Every test owns a local `Reporter`; the executor merges the partial
//! reporters it gets back from workers into one final reporter.

use serde::{Deserialize, Serialize};
use std::io::Write;
use std::ops::AddAssign;

use super::Failure;
use crate::output::{Color, ColorName};

/// Counters plus the failure records of a (partial) run
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Reporter {
    test_count: usize,
    expectation_count: usize,
    success_count: usize,
    failure_count: usize,
    failures: Vec<Failure>,

    /// Where progress glyphs go; `None` keeps the reporter silent
    #[serde(skip)]
    progress: Option<Color>,
}

impl Reporter {
    /// Create a silent reporter
    pub fn new() -> Self {
        Self::default()
    }

    /// Emit one glyph per finished test on stdout
    pub fn with_progress(mut self, color: Color) -> Self {
        self.progress = Some(color);
        self
    }

    pub fn increment_test_count(&mut self) -> usize {
        self.test_count += 1;
        self.test_count
    }

    pub fn increment_expectation_count(&mut self) -> usize {
        self.expectation_count += 1;
        self.expectation_count
    }

    pub fn increment_success_count(&mut self) -> usize {
        self.glyph(".", ColorName::Green);
        self.success_count += 1;
        self.success_count
    }

    pub fn increment_failure_count(&mut self, failure: Failure) -> usize {
        self.glyph("F", ColorName::Red);
        self.failures.push(failure);
        self.failure_count += 1;
        self.failure_count
    }

    /// Fold a partial reporter into this one.
    ///
    /// Counters are summed and failures appended, so merging in any order
    /// yields the same totals. `other` is consumed: a partial result can
    /// only be transferred once.
    pub fn merge(&mut self, other: Reporter) {
        self.test_count += other.test_count;
        self.expectation_count += other.expectation_count;
        self.success_count += other.success_count;
        self.failure_count += other.failure_count;
        self.failures.extend(other.failures);
    }

    /// 0 when nothing failed, 1 otherwise
    pub fn exit_status(&self) -> i32 {
        if self.failure_count == 0 {
            0
        } else {
            1
        }
    }

    pub fn test_count(&self) -> usize {
        self.test_count
    }

    pub fn expectation_count(&self) -> usize {
        self.expectation_count
    }

    pub fn success_count(&self) -> usize {
        self.success_count
    }

    pub fn failure_count(&self) -> usize {
        self.failure_count
    }

    pub fn failures(&self) -> &[Failure] {
        &self.failures
    }

    /// Drop the failure at `index` and count that test as a success
    pub fn mark_fixed(&mut self, index: usize) -> Option<Failure> {
        if index >= self.failures.len() {
            return None;
        }

        let failure = self.failures.remove(index);
        self.failure_count = self.failure_count.saturating_sub(1);
        self.success_count += 1;
        Some(failure)
    }

    /// Swap the failure at `index` for a fresh one from a rerun
    pub fn replace_failure(&mut self, index: usize, failure: Failure) {
        if let Some(slot) = self.failures.get_mut(index) {
            *slot = failure;
        }
    }

    fn glyph(&self, glyph: &str, color: ColorName) {
        if let Some(painter) = self.progress {
            let mut stdout = std::io::stdout().lock();
            let _ = write!(stdout, "{}", painter.paint(glyph, color));
            let _ = stdout.flush();
        }
    }
}

impl AddAssign for Reporter {
    fn add_assign(&mut self, other: Reporter) {
        self.merge(other);
    }
}
