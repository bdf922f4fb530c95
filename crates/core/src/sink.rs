//! Rendering and persistence of a finished run

use std::fmt::Write as _;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::config::StatusThresholds;
use crate::error::HarnessResult;
use crate::outcome::{Category, Detail, Outcome};
use crate::report::{PageReport, RunReport, RunReportBuilder};

/// Warnings shown for a page without failures
const SHOWN_WARNINGS: usize = 3;
const RULE_WIDTH: usize = 70;

/// Final line of the rendered report
pub fn summary_line(run: &RunReport) -> String {
    let summary = run.summary();
    format!(
        "OVERALL: {}/{} checks passed ({:.1}%), exit status {}",
        summary.passed,
        summary.decided(),
        run.pass_rate(),
        run.exit_code()
    )
}

/// Human-readable report. Failures are always listed; warnings only for
/// pages that have none, so they do not bury the failures.
pub fn render(run: &RunReport) -> String {
    let mut text = String::new();
    for page in run.pages() {
        let _ = writeln!(text, "{}:", page.page());
        let _ = writeln!(text, "  Status: [{}]", run.status_of(page));
        let _ = writeln!(
            text,
            "  Passed: {} | Failed: {} | Warnings: {}",
            page.passed().len(),
            page.failed().len(),
            page.warnings().len()
        );
        if !page.failed().is_empty() {
            let _ = writeln!(text, "  Failed checks:");
            for outcome in page.failed() {
                let _ = writeln!(text, "    ✗ {}", outcome);
            }
        } else if !page.warnings().is_empty() {
            let _ = writeln!(text, "  Warnings:");
            for outcome in page.warnings().iter().take(SHOWN_WARNINGS) {
                let _ = writeln!(text, "    ⚠ {}", outcome);
            }
        }
        text.push('\n');
    }

    let rule = "-".repeat(RULE_WIDTH);
    let _ = writeln!(text, "{}", rule);
    let _ = writeln!(text, "{}", summary_line(run));
    let _ = writeln!(text, "Warnings: {}", run.summary().warnings);
    let _ = writeln!(text, "{}", rule);
    text
}

/// Persisted form of one outcome
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutcomeEntry {
    pub code: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<Detail>,
}

impl From<&Outcome> for OutcomeEntry {
    fn from(outcome: &Outcome) -> Self {
        Self {
            code: outcome.code().to_string(),
            message: outcome.message().to_string(),
            detail: outcome.detail().cloned(),
        }
    }
}

impl OutcomeEntry {
    fn into_outcome(self, category: Category) -> Outcome {
        let outcome = Outcome::new(category, self.code, self.message);
        match self.detail {
            Some(detail) => outcome.with_detail(detail),
            None => outcome,
        }
    }
}

/// Persisted form of one page report
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageDocument {
    pub page: String,
    pub passed: Vec<OutcomeEntry>,
    pub failed: Vec<OutcomeEntry>,
    pub warnings: Vec<OutcomeEntry>,
    pub info: Vec<OutcomeEntry>,
}

impl From<&PageReport> for PageDocument {
    fn from(page: &PageReport) -> Self {
        let entries = |outcomes: &[Outcome]| outcomes.iter().map(OutcomeEntry::from).collect();
        Self {
            page: page.page().to_string(),
            passed: entries(page.passed()),
            failed: entries(page.failed()),
            warnings: entries(page.warnings()),
            info: entries(page.info()),
        }
    }
}

impl PageDocument {
    fn into_report(self) -> PageReport {
        let mut report = PageReport::new(self.page);
        let categories = [
            (Category::Passed, self.passed),
            (Category::Failed, self.failed),
            (Category::Warning, self.warnings),
            (Category::Info, self.info),
        ];
        for (category, entries) in categories {
            for entry in entries {
                report.record(entry.into_outcome(category));
            }
        }
        report
    }
}

/// One document per page, in run order
pub fn to_document(run: &RunReport) -> Vec<PageDocument> {
    run.pages().iter().map(PageDocument::from).collect()
}

/// Rebuild and re-seal a run from its persisted form
pub fn from_document(document: Vec<PageDocument>, thresholds: StatusThresholds) -> RunReport {
    let mut builder = RunReportBuilder::new();
    for page in document {
        builder.push(page.into_report());
    }
    builder.seal(thresholds)
}

/// Destination for a finished run
pub trait ReportSink {
    fn emit(&mut self, run: &RunReport) -> HarnessResult<()>;
}

/// Writes the rendered report to a stream, stdout by default
pub struct ConsoleSink<W: Write = io::Stdout> {
    out: W,
}

impl ConsoleSink<io::Stdout> {
    pub fn stdout() -> Self {
        Self { out: io::stdout() }
    }
}

impl<W: Write> ConsoleSink<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> ReportSink for ConsoleSink<W> {
    fn emit(&mut self, run: &RunReport) -> HarnessResult<()> {
        self.out.write_all(render(run).as_bytes())?;
        self.out.flush()?;
        Ok(())
    }
}

/// Writes the structured document as pretty-printed JSON
pub struct JsonFileSink {
    path: PathBuf,
}

impl JsonFileSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read a persisted run back
    pub fn load(path: &Path, thresholds: StatusThresholds) -> HarnessResult<RunReport> {
        let content = std::fs::read_to_string(path)?;
        let document: Vec<PageDocument> = serde_json::from_str(&content)?;
        Ok(from_document(document, thresholds))
    }
}

impl ReportSink for JsonFileSink {
    fn emit(&mut self, run: &RunReport) -> HarnessResult<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let json = serde_json::to_string_pretty(&to_document(run))?;
        std::fs::write(&self.path, json)?;
        info!("Detailed results saved to: {}", self.path.display());
        Ok(())
    }
}
