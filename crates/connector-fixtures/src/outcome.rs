//! Test outcomes and the per-suite report.

use std::fmt;

/// Why a test was skipped rather than run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SkipReason {
    /// The document database did not answer the health probe.
    DatabaseUnavailable,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DatabaseUnavailable => f.write_str("MongoDB is not available"),
        }
    }
}

/// Tri-state result of one test.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TestOutcome {
    /// The body completed without error.
    Passed,
    /// The body returned an error or panicked.
    Failed {
        /// Rendered error or panic message.
        message: String,
    },
    /// The test did not run against its backing service.
    Skipped {
        /// Why the test was skipped.
        reason: SkipReason,
    },
}

impl TestOutcome {
    /// Build a failure from anything printable.
    #[must_use]
    pub fn failed(message: impl Into<String>) -> Self {
        Self::Failed {
            message: message.into(),
        }
    }

    /// True for [`TestOutcome::Passed`].
    #[must_use]
    pub const fn is_passed(&self) -> bool {
        matches!(self, Self::Passed)
    }

    /// True for [`TestOutcome::Failed`].
    #[must_use]
    pub const fn is_failed(&self) -> bool {
        matches!(self, Self::Failed { .. })
    }

    /// True for [`TestOutcome::Skipped`].
    #[must_use]
    pub const fn is_skipped(&self) -> bool {
        matches!(self, Self::Skipped { .. })
    }
}

impl fmt::Display for TestOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Passed => f.write_str("passed"),
            Self::Failed { message } => write!(f, "failed: {message}"),
            Self::Skipped { reason } => write!(f, "skipped: {reason}"),
        }
    }
}

/// Outcome of one named test.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestRecord {
    name: String,
    outcome: TestOutcome,
}

impl TestRecord {
    /// Test name as passed to the runner.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Recorded outcome.
    #[must_use]
    pub const fn outcome(&self) -> &TestOutcome {
        &self.outcome
    }
}

/// Outcomes of every test run by one suite, in execution order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SuiteReport {
    records: Vec<TestRecord>,
}

impl SuiteReport {
    /// Append an outcome.
    pub fn record(&mut self, name: impl Into<String>, outcome: TestOutcome) {
        self.records.push(TestRecord {
            name: name.into(),
            outcome,
        });
    }

    /// All records in execution order.
    #[must_use]
    pub fn records(&self) -> &[TestRecord] {
        &self.records
    }

    /// Most recent outcome recorded under `name`.
    #[must_use]
    pub fn outcome_of(&self, name: &str) -> Option<&TestOutcome> {
        self.records
            .iter()
            .rev()
            .find(|record| record.name == name)
            .map(TestRecord::outcome)
    }

    /// Number of passed tests.
    #[must_use]
    pub fn passed(&self) -> usize {
        self.count(TestOutcome::is_passed)
    }

    /// Number of failed tests.
    #[must_use]
    pub fn failed(&self) -> usize {
        self.count(TestOutcome::is_failed)
    }

    /// Number of skipped tests.
    #[must_use]
    pub fn skipped(&self) -> usize {
        self.count(TestOutcome::is_skipped)
    }

    fn count(&self, predicate: fn(&TestOutcome) -> bool) -> usize {
        self.records
            .iter()
            .filter(|record| predicate(&record.outcome))
            .count()
    }
}
