//! Probes, probe groups and the fault boundary between them

use std::any::Any;
use std::panic::AssertUnwindSafe;

use async_trait::async_trait;
use futures::FutureExt;
use thiserror::Error;
use tracing::{debug, warn};

use crate::catalog::PageConfig;
use crate::config::ProbeSettings;
use crate::handle::{Condition, HandleError, PageHandle};
use crate::outcome::{Category, Detail, Outcome};

#[derive(Error, Debug)]
pub enum ProbeError {
    #[error(transparent)]
    Handle(#[from] HandleError),

    #[error("{0}")]
    Unexpected(String),

    #[error("panicked: {0}")]
    Panicked(String),
}

pub type ProbeResult<T> = Result<T, ProbeError>;

/// What a probe or setup action gets to work with
pub struct ProbeContext<'a> {
    pub page: &'a mut dyn PageHandle,
    pub config: &'a PageConfig,
    pub settings: &'a ProbeSettings,
}

/// Collects outcomes for one group, numbering them `prefix.n`
#[derive(Debug)]
pub struct Emitter {
    prefix: u32,
    outcomes: Vec<Outcome>,
}

impl Emitter {
    pub fn new(prefix: u32) -> Self {
        Self { prefix, outcomes: Vec::new() }
    }

    pub fn prefix(&self) -> u32 {
        self.prefix
    }

    pub fn code(&self, n: u32) -> String {
        format!("{}.{}", self.prefix, n)
    }

    pub fn emit(&mut self, category: Category, n: u32, message: impl Into<String>, detail: Option<Detail>) {
        let mut outcome = Outcome::new(category, self.code(n), message);
        if let Some(detail) = detail {
            outcome = outcome.with_detail(detail);
        }
        self.outcomes.push(outcome);
    }

    pub fn passed(&mut self, n: u32, message: impl Into<String>) {
        self.emit(Category::Passed, n, message, None);
    }

    pub fn failed(&mut self, n: u32, message: impl Into<String>) {
        self.emit(Category::Failed, n, message, None);
    }

    pub fn warning(&mut self, n: u32, message: impl Into<String>) {
        self.emit(Category::Warning, n, message, None);
    }

    pub fn info(&mut self, n: u32, message: impl Into<String>) {
        self.emit(Category::Info, n, message, None);
    }

    pub fn passed_with(&mut self, n: u32, message: impl Into<String>, detail: Detail) {
        self.emit(Category::Passed, n, message, Some(detail));
    }

    pub fn warning_with(&mut self, n: u32, message: impl Into<String>, detail: Detail) {
        self.emit(Category::Warning, n, message, Some(detail));
    }

    pub fn failed_with(&mut self, n: u32, message: impl Into<String>, detail: Detail) {
        self.emit(Category::Failed, n, message, Some(detail));
    }

    pub fn info_with(&mut self, n: u32, message: impl Into<String>, detail: Detail) {
        self.emit(Category::Info, n, message, Some(detail));
    }

    pub fn outcomes(&self) -> &[Outcome] {
        &self.outcomes
    }

    pub fn into_outcomes(self) -> Vec<Outcome> {
        self.outcomes
    }
}

/// A single named check
#[async_trait]
pub trait Probe: Send + Sync {
    fn name(&self) -> &str;

    async fn run(&self, cx: &mut ProbeContext<'_>, out: &mut Emitter) -> ProbeResult<()>;
}

/// Precondition run once before a group's probes
#[async_trait]
pub trait Setup: Send + Sync {
    fn describe(&self) -> String;

    async fn prepare(&self, cx: &mut ProbeContext<'_>) -> ProbeResult<()>;
}

/// Click the first `button` whose text contains one of `labels` and wait for
/// it to turn active. A page without such a button is left as is.
pub struct ActivateTab {
    labels: Vec<&'static str>,
}

impl ActivateTab {
    pub fn new(labels: &[&'static str]) -> Self {
        Self { labels: labels.to_vec() }
    }
}

#[async_trait]
impl Setup for ActivateTab {
    fn describe(&self) -> String {
        format!("activate tab {}", self.labels.join("/"))
    }

    async fn prepare(&self, cx: &mut ProbeContext<'_>) -> ProbeResult<()> {
        activate_tab(cx, &self.labels).await?;
        Ok(())
    }
}

/// Shared by [`ActivateTab`] and probes that switch tabs on their own.
/// Returns whether a matching button was found.
pub async fn activate_tab(cx: &mut ProbeContext<'_>, labels: &[&str]) -> ProbeResult<bool> {
    for label in labels {
        if let Some(index) = cx.page.find_by_text("button", label).await? {
            cx.page.click("button", index).await?;
            let settle = cx.settings.timing.transition();
            cx.page
                .wait_for(&Condition::class_present("button", index, "active"), settle)
                .await?;
            return Ok(true);
        }
    }
    debug!("no tab button labelled {:?}", labels);
    Ok(false)
}

/// Cut a fault message to at most `limit` characters
pub fn truncate_message(message: &str, limit: usize) -> String {
    message.chars().take(limit).collect()
}

pub(crate) fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

/// Ordered probes sharing an optional setup, isolated from other groups
pub struct ProbeGroup {
    prefix: u32,
    name: String,
    setup: Option<Box<dyn Setup>>,
    probes: Vec<Box<dyn Probe>>,
}

impl ProbeGroup {
    pub fn new(prefix: u32, name: impl Into<String>) -> Self {
        Self {
            prefix,
            name: name.into(),
            setup: None,
            probes: Vec::new(),
        }
    }

    pub fn with_setup(mut self, setup: impl Setup + 'static) -> Self {
        self.setup = Some(Box::new(setup));
        self
    }

    pub fn probe(mut self, probe: impl Probe + 'static) -> Self {
        self.probes.push(Box::new(probe));
        self
    }

    pub fn prefix(&self) -> u32 {
        self.prefix
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn probe_names(&self) -> Vec<&str> {
        self.probes.iter().map(|p| p.name()).collect()
    }

    /// Run setup then every probe. Never fails: setup faults short-circuit
    /// the group, probe faults are recorded and the next probe runs.
    pub async fn run(&self, cx: &mut ProbeContext<'_>, fault_limit: usize) -> Vec<Outcome> {
        let mut out = Emitter::new(self.prefix);

        if let Some(setup) = &self.setup {
            let prepared = AssertUnwindSafe(setup.prepare(cx)).catch_unwind().await;
            let fault = match prepared {
                Ok(Ok(())) => None,
                Ok(Err(e)) => Some(e.to_string()),
                Err(payload) => Some(ProbeError::Panicked(panic_message(payload)).to_string()),
            };
            if let Some(reason) = fault {
                warn!("{} ({}) setup failed: {}", self.name, setup.describe(), reason);
                out.failed(
                    0,
                    format!("{} setup failed: {}", self.name, truncate_message(&reason, fault_limit)),
                );
                return out.into_outcomes();
            }
        }

        for probe in &self.probes {
            debug!("probe {}: {}", self.prefix, probe.name());
            let ran = AssertUnwindSafe(probe.run(cx, &mut out)).catch_unwind().await;
            let fault = match ran {
                Ok(Ok(())) => None,
                Ok(Err(e)) => Some(e.to_string()),
                Err(payload) => Some(ProbeError::Panicked(panic_message(payload)).to_string()),
            };
            if let Some(reason) = fault {
                warn!("{} / {} faulted: {}", self.name, probe.name(), reason);
                out.failed(
                    0,
                    format!("{} error: {}", self.name, truncate_message(&reason, fault_limit)),
                );
            }
        }

        out.into_outcomes()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakePage;

    struct Emits(&'static str, Category);

    #[async_trait]
    impl Probe for Emits {
        fn name(&self) -> &str {
            self.0
        }

        async fn run(&self, _cx: &mut ProbeContext<'_>, out: &mut Emitter) -> ProbeResult<()> {
            out.emit(self.1, 1, self.0, None);
            Ok(())
        }
    }

    struct Faults;

    #[async_trait]
    impl Probe for Faults {
        fn name(&self) -> &str {
            "faults"
        }

        async fn run(&self, cx: &mut ProbeContext<'_>, out: &mut Emitter) -> ProbeResult<()> {
            out.passed(5, "before the fault");
            cx.page.click(".missing", 0).await?;
            out.passed(6, "never reached");
            Ok(())
        }
    }

    struct Panics;

    #[async_trait]
    impl Probe for Panics {
        fn name(&self) -> &str {
            "panics"
        }

        async fn run(&self, _cx: &mut ProbeContext<'_>, _out: &mut Emitter) -> ProbeResult<()> {
            panic!("boom");
        }
    }

    struct BrokenSetup;

    #[async_trait]
    impl Setup for BrokenSetup {
        fn describe(&self) -> String {
            "broken".into()
        }

        async fn prepare(&self, _cx: &mut ProbeContext<'_>) -> ProbeResult<()> {
            Err(ProbeError::Unexpected("tab bar missing".into()))
        }
    }

    async fn run_group(group: &ProbeGroup, page: &mut FakePage) -> Vec<Outcome> {
        let config = PageConfig::new("a.html", "A");
        let settings = ProbeSettings::immediate();
        let mut cx = ProbeContext { page, config: &config, settings: &settings };
        group.run(&mut cx, 100).await
    }

    #[tokio::test]
    async fn test_probe_fault_becomes_single_failed_outcome() {
        let group = ProbeGroup::new(4, "Math Rendering")
            .probe(Emits("first", Category::Passed))
            .probe(Faults)
            .probe(Emits("last", Category::Info));

        let outcomes = run_group(&group, &mut FakePage::new()).await;
        let codes: Vec<_> = outcomes.iter().map(|o| (o.code(), o.category())).collect();
        assert_eq!(
            codes,
            [
                ("4.1", Category::Passed),
                ("4.5", Category::Passed),
                ("4.0", Category::Failed),
                ("4.1", Category::Info),
            ]
        );
        assert!(outcomes[2].message().starts_with("Math Rendering error: No element matches .missing[0]"));
    }

    #[tokio::test]
    async fn test_panicking_probe_is_contained() {
        let group = ProbeGroup::new(7, "Animation Controls")
            .probe(Panics)
            .probe(Emits("after", Category::Passed));

        let outcomes = run_group(&group, &mut FakePage::new()).await;
        assert_eq!(outcomes.len(), 2);
        assert_eq!(outcomes[0].code(), "7.0");
        assert!(outcomes[0].message().contains("panicked: boom"));
        assert_eq!(outcomes[1].category(), Category::Passed);
    }

    #[tokio::test]
    async fn test_setup_failure_skips_probes() {
        let group = ProbeGroup::new(6, "Accordions")
            .with_setup(BrokenSetup)
            .probe(Emits("skipped", Category::Passed));

        let outcomes = run_group(&group, &mut FakePage::new()).await;
        assert_eq!(outcomes.len(), 1);
        assert_eq!(outcomes[0].category(), Category::Failed);
        assert_eq!(outcomes[0].code(), "6.0");
        assert_eq!(outcomes[0].message(), "Accordions setup failed: tab bar missing");
    }

    #[test]
    fn test_truncation_is_char_based() {
        assert_eq!(truncate_message("ééééé", 3), "ééé");
        assert_eq!(truncate_message("short", 100), "short");
    }

    #[tokio::test]
    async fn test_activate_tab_without_button_is_noop() {
        let group = ProbeGroup::new(12, "Connections")
            .with_setup(ActivateTab::new(&["Connection"]))
            .probe(Emits("runs", Category::Passed));

        let outcomes = run_group(&group, &mut FakePage::new()).await;
        assert_eq!(outcomes.len(), 1);
        assert_eq!(outcomes[0].category(), Category::Passed);
    }
}
