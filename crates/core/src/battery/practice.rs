//! Practice problems and prediction widgets

use async_trait::async_trait;
use tracing::debug;

use crate::handle::Condition;
use crate::outcome::Detail;
use crate::probe::{Emitter, Probe, ProbeContext, ProbeGroup, ProbeResult};

pub const PROBLEM: &str = ".practice-problem";
pub const OPTION: &str = ".practice-option, .prediction-option";
pub const CHECK: &str = ".check-answer-btn, button:has-text('Check')";
pub const SOLUTION: &str = ".show-solution-btn, button:has-text('Solution')";

pub fn group() -> ProbeGroup {
    ProbeGroup::new(8, "Practice Problems")
        .probe(Options)
        .probe(Buttons)
        .probe(ProblemCount)
}

struct Options;

#[async_trait]
impl Probe for Options {
    fn name(&self) -> &str {
        "options"
    }

    async fn run(&self, cx: &mut ProbeContext<'_>, out: &mut Emitter) -> ProbeResult<()> {
        let problems = cx.page.count(PROBLEM).await?;
        let options = cx.page.count(OPTION).await?;
        out.info_with(
            1,
            format!("Practice problems: {}, Options: {}", problems, options),
            Detail::counts([("problems", problems), ("options", options)]),
        );
        if options == 0 {
            return Ok(());
        }

        let settle = cx.settings.timing.toggle();
        for i in 0..options {
            if !cx.page.is_visible(OPTION, i).await? {
                continue;
            }
            if let Err(e) = cx.page.click(OPTION, i).await {
                debug!("practice option {} not clickable: {}", i, e);
                continue;
            }
            cx.page
                .wait_for(&Condition::class_present(OPTION, i, "selected"), settle)
                .await?;
            if cx.page.has_class(OPTION, i, "selected").await?
                || cx.page.has_class(OPTION, i, "active").await?
            {
                out.passed(2, "Practice option selectable");
                return Ok(());
            }
        }
        out.warning(2, "Practice options not responding");
        Ok(())
    }
}

struct Buttons;

#[async_trait]
impl Probe for Buttons {
    fn name(&self) -> &str {
        "check and solution buttons"
    }

    async fn run(&self, cx: &mut ProbeContext<'_>, out: &mut Emitter) -> ProbeResult<()> {
        let check = cx.page.count(CHECK).await?;
        let solution = cx.page.count(SOLUTION).await?;
        out.info_with(
            3,
            format!("Check buttons: {}, Solution buttons: {}", check, solution),
            Detail::counts([("check", check), ("solution", solution)]),
        );
        if check > 0 || solution > 0 {
            out.passed(4, "Practice interaction buttons exist");
        }
        Ok(())
    }
}

/// Compare against the interactive item count the catalog expects
struct ProblemCount;

#[async_trait]
impl Probe for ProblemCount {
    fn name(&self) -> &str {
        "problem count"
    }

    async fn run(&self, cx: &mut ProbeContext<'_>, out: &mut Emitter) -> ProbeResult<()> {
        let expected = cx.config.interactive_count;
        if expected == 0 {
            return Ok(());
        }
        let found = cx.page.count(PROBLEM).await?;
        if found < expected {
            out.warning_with(
                5,
                format!("Only {} practice problems (expected {})", found, expected),
                Detail::counts([("found", found), ("expected", expected)]),
            );
        }
        Ok(())
    }
}
