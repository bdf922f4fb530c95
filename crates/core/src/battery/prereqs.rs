//! Prerequisite cards and their practice options

use async_trait::async_trait;

use crate::handle::Condition;
use crate::outcome::Detail;
use crate::probe::{ActivateTab, Emitter, Probe, ProbeContext, ProbeGroup, ProbeResult};

pub const CARD: &str = ".prereq-card";
pub const EXPAND: &str = ".expand-btn";
pub const EXPANDED: &str = ".prereq-lesson.expanded, .prereq-content.active";
pub const OPTION: &str = ".prereq-opt";

pub fn group() -> ProbeGroup {
    ProbeGroup::new(5, "Prerequisites")
        .with_setup(ActivateTab::new(&["Prerequisite"]))
        .probe(Cards)
        .probe(Options)
}

struct Cards;

#[async_trait]
impl Probe for Cards {
    fn name(&self) -> &str {
        "cards"
    }

    async fn run(&self, cx: &mut ProbeContext<'_>, out: &mut Emitter) -> ProbeResult<()> {
        let cards = cx.page.count(CARD).await?;
        out.info_with(1, format!("Found {} prereq cards", cards), Detail::count(cards));

        if cx.page.count(EXPAND).await? == 0 {
            out.info(2, "No expand buttons found");
            return Ok(());
        }
        if !cx.page.is_visible(EXPAND, 0).await? {
            return Ok(());
        }

        cx.page.click(EXPAND, 0).await?;
        cx.page
            .wait_for(&Condition::present(EXPANDED), cx.settings.timing.transition())
            .await?;
        if cx.page.count(EXPANDED).await? > 0 {
            out.passed(2, "Prereq expand works");
        } else {
            out.warning(2, "Prereq expand may not work");
        }
        Ok(())
    }
}

struct Options;

#[async_trait]
impl Probe for Options {
    fn name(&self) -> &str {
        "practice options"
    }

    async fn run(&self, cx: &mut ProbeContext<'_>, out: &mut Emitter) -> ProbeResult<()> {
        let options = cx.page.count(OPTION).await?;
        if options == 0 {
            out.info(3, "No prereq practice options");
            return Ok(());
        }
        out.passed_with(3, format!("Prereq practice options: {}", options), Detail::count(options));

        if cx.page.is_visible(OPTION, 0).await? {
            cx.page.click(OPTION, 0).await?;
            let selected = cx
                .page
                .wait_for(
                    &Condition::class_present(OPTION, 0, "selected"),
                    cx.settings.timing.toggle(),
                )
                .await?;
            if selected {
                out.passed(4, "Prereq option clickable");
            }
        }
        Ok(())
    }
}
