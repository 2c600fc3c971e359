//! Suites group the tests of one session (usually one state file) and
//! aggregate their outcomes. The suite itself holds no execution state;
//! status and summary both derive from the steps of the member tests.

use crate::run::Status;
use crate::test::Test;

/// A named collection of tests.
#[derive(Debug, Clone, Default)]
pub struct Suite {
    name: String,
    tests: Vec<Test>,
}

impl Suite {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            tests: Vec::new(),
        }
    }

    pub fn from_tests(name: impl Into<String>, tests: Vec<Test>) -> Self {
        Self {
            name: name.into(),
            tests,
        }
    }

    pub fn push(&mut self, test: Test) {
        self.tests.push(test);
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn tests(&self) -> &[Test] {
        &self.tests
    }

    pub fn len(&self) -> usize {
        self.tests.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tests.is_empty()
    }

    /// Worst status across every step of every member test.
    pub fn status(&self) -> Status {
        self.tests
            .iter()
            .map(Test::status)
            .max()
            .unwrap_or(Status::Unknown)
    }

    /// Test names with their statuses, in insertion order.
    pub fn overview(&self) -> Vec<(String, Status)> {
        self.tests
            .iter()
            .map(|test| (test.name().to_string(), test.status()))
            .collect()
    }

    /// Per-status step counts across the whole suite.
    pub fn summary(&self) -> Summary {
        let mut summary = Summary::default();
        for test in &self.tests {
            for step in test.steps() {
                summary.record(step.status());
            }
        }
        summary
    }
}

/// Step counts by status, for end-of-run reporting.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Summary {
    pub unknown: usize,
    pub success: usize,
    pub ignored: usize,
    pub pending: usize,
    pub failed: usize,
}

impl Summary {
    pub fn record(&mut self, status: Status) {
        match status {
            Status::Unknown => self.unknown += 1,
            Status::Success => self.success += 1,
            Status::Ignored => self.ignored += 1,
            Status::Pending => self.pending += 1,
            Status::Failed => self.failed += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.unknown + self.success + self.ignored + self.pending + self.failed
    }

    /// True when some step still needs attention.
    pub fn has_failures(&self) -> bool {
        self.pending + self.failed > 0
    }
}
