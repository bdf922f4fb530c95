//! Page and run reports

use std::fmt;

use crate::config::StatusThresholds;
use crate::outcome::{Category, Outcome};

/// Derived page status
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageStatus {
    /// No failed outcomes
    Clean,
    /// Some failures, at most the broken threshold
    Degraded,
    /// More failures than the broken threshold
    Broken,
}

impl PageStatus {
    pub fn label(&self) -> &'static str {
        match self {
            PageStatus::Clean => "PASS",
            PageStatus::Degraded => "REVIEW",
            PageStatus::Broken => "FAIL",
        }
    }
}

impl fmt::Display for PageStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Outcomes of one page, split by category in emission order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageReport {
    page: String,
    passed: Vec<Outcome>,
    failed: Vec<Outcome>,
    warnings: Vec<Outcome>,
    info: Vec<Outcome>,
}

impl PageReport {
    pub fn new(page: impl Into<String>) -> Self {
        Self {
            page: page.into(),
            passed: Vec::new(),
            failed: Vec::new(),
            warnings: Vec::new(),
            info: Vec::new(),
        }
    }

    pub fn from_outcomes(page: impl Into<String>, outcomes: impl IntoIterator<Item = Outcome>) -> Self {
        outcomes.into_iter().fold(Self::new(page), |mut report, outcome| {
            report.record(outcome);
            report
        })
    }

    /// File an outcome under its category
    pub fn record(&mut self, outcome: Outcome) {
        match outcome.category() {
            Category::Passed => self.passed.push(outcome),
            Category::Failed => self.failed.push(outcome),
            Category::Warning => self.warnings.push(outcome),
            Category::Info => self.info.push(outcome),
        }
    }

    pub fn page(&self) -> &str {
        &self.page
    }

    pub fn passed(&self) -> &[Outcome] {
        &self.passed
    }

    pub fn failed(&self) -> &[Outcome] {
        &self.failed
    }

    pub fn warnings(&self) -> &[Outcome] {
        &self.warnings
    }

    pub fn info(&self) -> &[Outcome] {
        &self.info
    }

    pub fn of(&self, category: Category) -> &[Outcome] {
        match category {
            Category::Passed => &self.passed,
            Category::Failed => &self.failed,
            Category::Warning => &self.warnings,
            Category::Info => &self.info,
        }
    }

    pub fn total(&self) -> usize {
        self.passed.len() + self.failed.len() + self.warnings.len() + self.info.len()
    }

    /// Derived on every call from the failed count
    pub fn status(&self, thresholds: &StatusThresholds) -> PageStatus {
        match self.failed.len() {
            0 => PageStatus::Clean,
            n if n > thresholds.broken_above => PageStatus::Broken,
            _ => PageStatus::Degraded,
        }
    }
}

/// Run-wide totals, computed once when the run is sealed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Summary {
    pub pages: usize,
    pub passed: usize,
    pub failed: usize,
    pub warnings: usize,
    pub info: usize,
}

impl Summary {
    fn tally(pages: &[PageReport]) -> Self {
        pages.iter().fold(
            Summary { pages: pages.len(), ..Default::default() },
            |mut s, page| {
                s.passed += page.passed().len();
                s.failed += page.failed().len();
                s.warnings += page.warnings().len();
                s.info += page.info().len();
                s
            },
        )
    }

    /// Number of outcomes the pass rate is computed over
    pub fn decided(&self) -> usize {
        self.passed + self.failed
    }

    /// Passed share of passed + failed, in percent. Zero when nothing was decided.
    pub fn pass_rate(&self) -> f64 {
        match self.decided() {
            0 => 0.0,
            decided => 100.0 * self.passed as f64 / decided as f64,
        }
    }

    pub fn exit_code(&self) -> i32 {
        if self.failed == 0 {
            0
        } else {
            1
        }
    }
}

/// Collects page reports while a run is in progress
#[derive(Debug, Default)]
pub struct RunReportBuilder {
    pages: Vec<PageReport>,
}

impl RunReportBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, page: PageReport) {
        self.pages.push(page);
    }

    pub fn len(&self) -> usize {
        self.pages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }

    /// Finish the run and compute its summary
    pub fn seal(self, thresholds: StatusThresholds) -> RunReport {
        let summary = Summary::tally(&self.pages);
        RunReport {
            pages: self.pages,
            summary,
            thresholds,
        }
    }
}

/// A finished run. Read-only.
#[derive(Debug, Clone, PartialEq)]
pub struct RunReport {
    pages: Vec<PageReport>,
    summary: Summary,
    thresholds: StatusThresholds,
}

impl RunReport {
    pub fn pages(&self) -> &[PageReport] {
        &self.pages
    }

    pub fn summary(&self) -> &Summary {
        &self.summary
    }

    pub fn thresholds(&self) -> &StatusThresholds {
        &self.thresholds
    }

    pub fn pass_rate(&self) -> f64 {
        self.summary.pass_rate()
    }

    pub fn exit_code(&self) -> i32 {
        self.summary.exit_code()
    }

    /// Status of a page under this run's thresholds
    pub fn status_of(&self, page: &PageReport) -> PageStatus {
        page.status(&self.thresholds)
    }
}
