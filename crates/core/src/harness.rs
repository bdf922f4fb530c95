//! Drives the page runner over a catalog

use tracing::{error, info};

use crate::catalog::PageConfig;
use crate::config::{HarnessConfig, StatusThresholds};
use crate::error::{HarnessError, HarnessResult};
use crate::handle::PageHandle;
use crate::page::PageRunner;
use crate::report::{RunReport, RunReportBuilder};

/// Runs pages strictly one after another against a single page handle
pub struct Harness {
    runner: PageRunner,
    thresholds: StatusThresholds,
}

impl Harness {
    pub fn new(config: &HarnessConfig) -> Self {
        Self {
            runner: PageRunner::new(config),
            thresholds: config.thresholds,
        }
    }

    pub fn with_runner(runner: PageRunner, thresholds: StatusThresholds) -> Self {
        Self { runner, thresholds }
    }

    pub fn runner(&self) -> &PageRunner {
        &self.runner
    }

    /// Run every page and seal the report.
    ///
    /// Page-level problems never stop the run. A session that can no longer
    /// take commands does, since every later page would fail the same way.
    pub async fn run(&self, page: &mut dyn PageHandle, pages: &[PageConfig]) -> HarnessResult<RunReport> {
        info!("Running {} page(s) against {}", pages.len(), self.runner.base_url());
        let mut builder = RunReportBuilder::new();

        for config in pages {
            if !page.is_usable().await {
                error!("Browser session lost before {}", config.locator);
                return Err(HarnessError::SessionLost {
                    page: config.locator.clone(),
                    reason: "page handle no longer accepts commands".to_string(),
                });
            }

            let report = self.runner.run(page, config).await;
            info!(
                "{}: {} passed, {} failed, {} warnings [{}]",
                report.page(),
                report.passed().len(),
                report.failed().len(),
                report.warnings().len(),
                report.status(&self.thresholds)
            );
            builder.push(report);
        }

        let run = builder.seal(self.thresholds);
        let summary = run.summary();
        info!(
            "Test Results: {} passed, {} failed, {} warnings, {} info across {} page(s)",
            summary.passed, summary.failed, summary.warnings, summary.info, summary.pages
        );
        Ok(run)
    }
}
