//! Check outcomes and suite reports

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::time::Instant;

use crate::diagnosis::Diagnosis;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Verdict {
    Passed,
    Failed,
    Skipped,
}

/// Outcome of one probe step
#[derive(Debug, Clone, Serialize)]
pub struct CheckResult {
    pub name: String,
    pub verdict: Verdict,
    pub notes: Vec<String>,
    pub errors: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub diagnosis: Option<Diagnosis>,
}

impl CheckResult {
    /// A check that has not passed yet
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            verdict: Verdict::Failed,
            notes: Vec::new(),
            errors: Vec::new(),
            diagnosis: None,
        }
    }

    /// A check that could not run
    pub fn skipped(name: impl Into<String>, reason: impl Into<String>) -> Self {
        let mut check = Self::new(name);
        check.verdict = Verdict::Skipped;
        check.notes.push(reason.into());
        check
    }

    pub fn pass(&mut self) {
        self.verdict = Verdict::Passed;
    }

    pub fn fail(&mut self, error: impl Into<String>) {
        self.verdict = Verdict::Failed;
        self.errors.push(error.into());
    }

    pub fn note(&mut self, note: impl Into<String>) {
        self.notes.push(note.into());
    }

    pub fn diagnose(&mut self, diagnosis: Diagnosis) {
        self.diagnosis = Some(diagnosis);
    }

    pub fn passed(&self) -> bool {
        self.verdict == Verdict::Passed
    }
}

/// How a suite turns its checks into a process exit code
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "policy", content = "checks", rename_all = "snake_case")]
pub enum ExitPolicy {
    /// Every check must pass
    AllMustPass,
    /// At least one check must pass
    AnyPass,
    /// The named checks must pass, others are advisory
    Required(Vec<String>),
    /// Report only, always exits 0
    Informational,
}

/// Everything one suite observed
#[derive(Debug, Clone, Serialize)]
pub struct SuiteReport {
    pub suite: String,
    pub title: String,
    pub checks: Vec<CheckResult>,
    pub findings: Vec<String>,
    pub exit_policy: ExitPolicy,
    pub started_at: DateTime<Utc>,
    pub elapsed_ms: u64,
    #[serde(skip)]
    clock: Option<Instant>,
}

impl SuiteReport {
    pub fn new(suite: impl Into<String>, title: impl Into<String>, exit_policy: ExitPolicy) -> Self {
        Self {
            suite: suite.into(),
            title: title.into(),
            checks: Vec::new(),
            findings: Vec::new(),
            exit_policy,
            started_at: Utc::now(),
            elapsed_ms: 0,
            clock: Some(Instant::now()),
        }
    }

    pub fn push(&mut self, check: CheckResult) {
        self.checks.push(check);
    }

    pub fn finding(&mut self, text: impl Into<String>) {
        self.findings.push(text.into());
    }

    /// Stop the clock
    pub fn finish(mut self) -> Self {
        if let Some(clock) = self.clock.take() {
            self.elapsed_ms = clock.elapsed().as_millis() as u64;
        }
        self
    }

    pub fn check(&self, name: &str) -> Option<&CheckResult> {
        self.checks.iter().find(|c| c.name == name)
    }

    pub fn is_passed(&self, name: &str) -> bool {
        self.check(name).is_some_and(CheckResult::passed)
    }

    pub fn total(&self) -> usize {
        self.checks.len()
    }

    pub fn passed(&self) -> usize {
        self.checks.iter().filter(|c| c.passed()).count()
    }

    /// Checks that did not pass, skipped ones included
    pub fn failed(&self) -> usize {
        self.total() - self.passed()
    }

    pub fn skipped(&self) -> usize {
        self.checks
            .iter()
            .filter(|c| c.verdict == Verdict::Skipped)
            .count()
    }

    /// Percentage of passed checks, `None` for an empty suite
    pub fn success_rate(&self) -> Option<f64> {
        if self.checks.is_empty() {
            None
        } else {
            Some(self.passed() as f64 / self.total() as f64 * 100.0)
        }
    }

    pub fn errors(&self) -> Vec<&str> {
        self.checks
            .iter()
            .flat_map(|c| c.errors.iter().map(String::as_str))
            .collect()
    }

    pub fn exit_code(&self) -> i32 {
        let ok = match &self.exit_policy {
            ExitPolicy::AllMustPass => self.failed() == 0,
            ExitPolicy::AnyPass => self.passed() > 0,
            ExitPolicy::Required(names) => names.iter().all(|name| self.is_passed(name)),
            ExitPolicy::Informational => true,
        };
        if ok {
            0
        } else {
            1
        }
    }
}

/// Reports of every suite in one invocation
#[derive(Debug, Clone, Default, Serialize)]
pub struct RunSummary {
    pub reports: Vec<SuiteReport>,
}

impl RunSummary {
    pub fn push(&mut self, report: SuiteReport) {
        self.reports.push(report);
    }

    pub fn total(&self) -> usize {
        self.reports.iter().map(SuiteReport::total).sum()
    }

    pub fn passed(&self) -> usize {
        self.reports.iter().map(SuiteReport::passed).sum()
    }

    pub fn failed(&self) -> usize {
        self.reports.iter().map(SuiteReport::failed).sum()
    }

    pub fn success_rate(&self) -> Option<f64> {
        let total = self.total();
        (total > 0).then(|| self.passed() as f64 / total as f64 * 100.0)
    }

    pub fn errors(&self) -> Vec<&str> {
        self.reports.iter().flat_map(SuiteReport::errors).collect()
    }

    pub fn exit_code(&self) -> i32 {
        self.reports
            .iter()
            .map(SuiteReport::exit_code)
            .max()
            .unwrap_or(0)
    }
}
