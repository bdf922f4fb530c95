//! Runs the probe battery against one page

use std::panic::AssertUnwindSafe;

use futures::FutureExt;
use tracing::{debug, error, info, warn};

use crate::battery;
use crate::catalog::PageConfig;
use crate::config::{HarnessConfig, ProbeSettings};
use crate::handle::{PageHandle, WaitPolicy};
use crate::outcome::{Category, Outcome};
use crate::probe::{panic_message, truncate_message, ProbeContext, ProbeError, ProbeGroup};
use crate::report::PageReport;

pub struct PageRunner {
    base_url: String,
    groups: Vec<ProbeGroup>,
    settings: ProbeSettings,
    fault_limit: usize,
}

impl PageRunner {
    /// Runner with the standard battery
    pub fn new(config: &HarnessConfig) -> Self {
        Self::with_groups(config, battery::standard())
    }

    pub fn with_groups(config: &HarnessConfig, groups: Vec<ProbeGroup>) -> Self {
        Self {
            base_url: config.base_url.clone(),
            groups,
            settings: config.probe_settings(),
            fault_limit: config.fault_message_limit,
        }
    }

    pub fn with_settings(mut self, settings: ProbeSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn groups(&self) -> &[ProbeGroup] {
        &self.groups
    }

    /// Navigate to the page and run every group. Never fails; faults end up
    /// as outcomes in the report.
    pub async fn run(&self, page: &mut dyn PageHandle, config: &PageConfig) -> PageReport {
        let url = config.url(&self.base_url);
        info!("Testing {}", config.locator);
        let mut report = PageReport::new(config.locator.clone());

        let navigation = AssertUnwindSafe(page.navigate(
            &url,
            WaitPolicy::NetworkIdle,
            self.settings.timing.navigation_timeout(),
        ))
        .catch_unwind()
        .await
        .map_err(|payload| ProbeError::Panicked(panic_message(payload)).to_string())
        .and_then(|result| result.map_err(|e| e.to_string()));
        let gate = match navigation {
            Err(reason) => Err(Outcome::failed(
                "1.0",
                format!("Page load failed: {}", truncate_message(&reason, self.fault_limit)),
            )),
            Ok(nav) if !nav.is_success() => Err(Outcome::failed("1.1", format!("HTTP {}", nav.status))),
            Ok(nav) => Ok(Outcome::passed("1.1", format!("HTTP {} response", nav.status))),
        };
        match gate {
            Err(outcome) => {
                log_outcome(&outcome);
                report.record(outcome);
                return report;
            }
            Ok(outcome) => {
                log_outcome(&outcome);
                report.record(outcome);
            }
        }

        page.pause(self.settings.timing.load_settle()).await;

        let mut cx = ProbeContext {
            page,
            config,
            settings: &self.settings,
        };
        for group in &self.groups {
            debug!("group {} {}", group.prefix(), group.name());
            for outcome in group.run(&mut cx, self.fault_limit).await {
                log_outcome(&outcome);
                report.record(outcome);
            }
        }

        report
    }
}

fn log_outcome(outcome: &Outcome) {
    match outcome.category() {
        Category::Passed => info!("  ✓ {}", outcome),
        Category::Failed => error!("  ✗ {}", outcome),
        Category::Warning => warn!("  ⚠ {}", outcome),
        Category::Info => info!("  ℹ {}", outcome),
    }
    if let Some(detail) = outcome.detail() {
        debug!("    {:?}", detail);
    }
}
