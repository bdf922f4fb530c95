//! Step-through animation controls

use async_trait::async_trait;

use crate::handle::Condition;
use crate::outcome::Detail;
use crate::probe::{Emitter, Probe, ProbeContext, ProbeGroup, ProbeResult};

pub const CONTROL: &str = ".control-btn";
pub const COUNTER: &str = ".step-counter";
pub const PROGRESS: &str = ".progress-fill";

/// Control order in the lesson widgets: reset, next, play
const NEXT_INDEX: usize = 1;

pub fn group() -> ProbeGroup {
    ProbeGroup::new(7, "Animation Controls").probe(Controls)
}

fn text_changed(from: Option<String>) -> Condition {
    Condition::TextDiffers {
        selector: COUNTER.to_string(),
        index: 0,
        from,
    }
}

struct Controls;

#[async_trait]
impl Probe for Controls {
    fn name(&self) -> &str {
        "animation controls"
    }

    async fn run(&self, cx: &mut ProbeContext<'_>, out: &mut Emitter) -> ProbeResult<()> {
        let buttons = cx.page.count(CONTROL).await?;
        let counters = cx.page.count(COUNTER).await?;
        let progress = cx.page.count(PROGRESS).await?;
        out.info_with(
            1,
            format!(
                "Controls: {} btns, {} counters, {} progress bars",
                buttons, counters, progress
            ),
            Detail::counts([("buttons", buttons), ("counters", counters), ("progress", progress)]),
        );

        if buttons == 0 {
            out.warning(2, "No animation controls found");
            return Ok(());
        }
        out.passed(2, "Animation control buttons exist");

        if counters == 0 {
            out.info(3, "Animation state: no counters");
            return Ok(());
        }

        let settle = cx.settings.timing.transition();
        let initial = cx.page.text(COUNTER, 0).await?;
        if buttons > NEXT_INDEX {
            cx.page.click(CONTROL, NEXT_INDEX).await?;
            cx.page.wait_for(&text_changed(initial.clone()), settle).await?;
        }
        let stepped = cx.page.text(COUNTER, 0).await?;
        let initial_text = initial.unwrap_or_default();
        let stepped_text = stepped.clone().unwrap_or_default();
        if stepped_text != initial_text {
            out.passed(3, format!("Animation stepping: {} -> {}", initial_text, stepped_text));
        } else {
            out.info(3, format!("Animation state: {}", stepped_text));
        }

        let reset = match cx.page.find_by_text(CONTROL, "↺").await? {
            Some(i) => i,
            None => cx.page.find_by_text(CONTROL, "reset").await?.unwrap_or(0),
        };
        cx.page.click(CONTROL, reset).await?;
        cx.page.wait_for(&text_changed(stepped), settle).await?;
        let after = cx.page.text(COUNTER, 0).await?.unwrap_or_default();
        out.info_with(4, format!("After reset attempt: {}", after), Detail::Text(after));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::battery::fixture::{codes, run_on};
    use crate::catalog::PageConfig;
    use crate::outcome::Category;
    use crate::testing::{FakeElement, FakePage, FakeSite};

    fn stepper() -> FakeSite {
        FakeSite::new()
            .element(CONTROL, FakeElement::new().text("↺"))
            .element(CONTROL, FakeElement::new().text("▶"))
            .element(COUNTER, FakeElement::new().text("Step 1 of 4"))
            .element(PROGRESS, FakeElement::new())
            .on_click(CONTROL, 1, |dom| dom.set_text(COUNTER, 0, "Step 2 of 4"))
            .on_click(CONTROL, 0, |dom| dom.set_text(COUNTER, 0, "Step 1 of 4"))
    }

    #[tokio::test]
    async fn test_step_and_reset() {
        let mut page = FakePage::serving(stepper());
        let outcomes = run_on(&group(), &mut page, &PageConfig::new("a.html", "A")).await;

        assert_eq!(
            codes(&outcomes),
            [
                ("7.1", Category::Info),
                ("7.2", Category::Passed),
                ("7.3", Category::Passed),
                ("7.4", Category::Info),
            ]
        );
        assert_eq!(outcomes[2].message(), "Animation stepping: Step 1 of 4 -> Step 2 of 4");
        assert_eq!(outcomes[3].detail(), Some(&Detail::Text("Step 1 of 4".into())));
    }

    #[tokio::test]
    async fn test_no_controls_warns() {
        let mut page = FakePage::new();
        let outcomes = run_on(&group(), &mut page, &PageConfig::new("a.html", "A")).await;
        assert_eq!(codes(&outcomes), [("7.1", Category::Info), ("7.2", Category::Warning)]);
    }
}
