use serde::Serialize;
use std::fmt;

/// Outcome of a single conformance procedure
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "detail", rename_all = "snake_case")]
pub enum TestOutcome {
    Passed,
    /// One or more assertions did not hold
    Failed(Vec<String>),
    /// Network state carried no information; neither pass nor fail
    Inconclusive(String),
}

impl TestOutcome {
    pub fn is_passed(&self) -> bool {
        matches!(self, TestOutcome::Passed)
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, TestOutcome::Failed(_))
    }

    pub fn is_inconclusive(&self) -> bool {
        matches!(self, TestOutcome::Inconclusive(_))
    }
}

impl fmt::Display for TestOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TestOutcome::Passed => write!(f, "PASS"),
            TestOutcome::Failed(errors) => write!(f, "FAIL ({})", errors.join("; ")),
            TestOutcome::Inconclusive(reason) => write!(f, "SKIP ({})", reason),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct TestResult {
    pub name: String,
    pub outcome: TestOutcome,
}

/// Results of one run against one coin, in declaration order
#[derive(Debug, Clone, Serialize)]
pub struct ConformanceReport {
    pub coin: String,
    pub results: Vec<TestResult>,
}

impl ConformanceReport {
    pub fn new(coin: &str) -> Self {
        Self {
            coin: coin.to_string(),
            results: Vec::new(),
        }
    }

    pub fn push(&mut self, name: &str, outcome: TestOutcome) {
        self.results.push(TestResult {
            name: name.to_string(),
            outcome,
        });
    }

    pub fn outcome(&self, name: &str) -> Option<&TestOutcome> {
        self.results
            .iter()
            .find(|r| r.name == name)
            .map(|r| &r.outcome)
    }

    pub fn passed(&self) -> usize {
        self.results.iter().filter(|r| r.outcome.is_passed()).count()
    }

    pub fn failed(&self) -> usize {
        self.results.iter().filter(|r| r.outcome.is_failed()).count()
    }

    pub fn inconclusive(&self) -> usize {
        self.results
            .iter()
            .filter(|r| r.outcome.is_inconclusive())
            .count()
    }

    /// A run succeeds when nothing failed; inconclusive tests do not count against it
    pub fn is_success(&self) -> bool {
        self.failed() == 0
    }
}

impl fmt::Display for ConformanceReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Conformance report: {}", self.coin)?;
        for result in &self.results {
            writeln!(f, "  {:<26} {}", result.name, result.outcome)?;
        }
        write!(
            f,
            "{} passed, {} failed, {} inconclusive",
            self.passed(),
            self.failed(),
            self.inconclusive()
        )
    }
}
