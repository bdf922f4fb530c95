//! Exam tips and common mistakes

use async_trait::async_trait;

use crate::outcome::Detail;
use crate::probe::{activate_tab, ActivateTab, Emitter, Probe, ProbeContext, ProbeGroup, ProbeResult};

pub const TIP: &str = ".exam-tip, .tips-summary";
pub const MISTAKE: &str = ".mistake-card";

pub fn group() -> ProbeGroup {
    ProbeGroup::new(11, "Exam Tips & Mistakes")
        .with_setup(ActivateTab::new(&["Tip", "Exam"]))
        .probe(Tips)
        .probe(Mistakes)
}

struct Tips;

#[async_trait]
impl Probe for Tips {
    fn name(&self) -> &str {
        "exam tips"
    }

    async fn run(&self, cx: &mut ProbeContext<'_>, out: &mut Emitter) -> ProbeResult<()> {
        let tips = cx.page.count(TIP).await?;
        let mistakes = cx.page.count(MISTAKE).await?;
        out.info_with(
            1,
            format!("Exam tips: {}, Mistake cards: {}", tips, mistakes),
            Detail::counts([("tips", tips), ("mistakes", mistakes)]),
        );
        if tips > 0 {
            out.passed(2, "Exam tips present");
        }
        Ok(())
    }
}

/// Mistakes live on their own tab on most pages
struct Mistakes;

#[async_trait]
impl Probe for Mistakes {
    fn name(&self) -> &str {
        "mistake cards"
    }

    async fn run(&self, cx: &mut ProbeContext<'_>, out: &mut Emitter) -> ProbeResult<()> {
        activate_tab(cx, &["Mistake"]).await?;
        let cards = cx.page.count(MISTAKE).await?;
        if cards > 0 {
            out.passed(3, format!("Mistake cards: {}", cards));
        }
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

    #[tokio::test]
    async fn test_mistakes_found_after_switching_tab() {
        let site = FakeSite::new()
            .element("button", FakeElement::new().text("Exam Tips"))
            .element("button", FakeElement::new().text("Common Mistakes"))
            .on_click("button", 0, |dom| dom.activate_exclusive("button", 0, "active"))
            .on_click("button", 1, |dom| {
                dom.activate_exclusive("button", 1, "active");
                dom.insert(MISTAKE, FakeElement::new());
                dom.insert(MISTAKE, FakeElement::new());
            })
            .elements(TIP, 4, FakeElement::new());
        let mut page = FakePage::serving(site);

        let outcomes = run_on(&group(), &mut page, &PageConfig::new("a.html", "A")).await;
        assert_eq!(
            codes(&outcomes),
            [("11.1", Category::Info), ("11.2", Category::Passed), ("11.3", Category::Passed)]
        );
        assert_eq!(outcomes[0].message(), "Exam tips: 4, Mistake cards: 0");
        assert_eq!(outcomes[2].message(), "Mistake cards: 2");
    }

    #[tokio::test]
    async fn test_faulty_tab_bar_fails_setup() {
        let site = FakeSite::new().fail_on("button");
        let mut page = FakePage::serving(site);
        let outcomes = run_on(&group(), &mut page, &PageConfig::new("a.html", "A")).await;
        assert_eq!(codes(&outcomes), [("11.0", Category::Failed)]);
        assert!(outcomes[0].message().starts_with("Exam Tips & Mistakes setup failed: Driver error"));
    }
}
