//! Section tab navigation

use async_trait::async_trait;

use crate::handle::Condition;
use crate::outcome::Detail;
use crate::probe::{Emitter, Probe, ProbeContext, ProbeGroup, ProbeResult};

pub const NAV_TAB: &str = ".nav-tab";

const LABEL_CHARS: usize = 20;

/// Tabs exercised when the page lists fewer expected sections
const MIN_CHECKED_TABS: usize = 7;

pub fn group() -> ProbeGroup {
    ProbeGroup::new(3, "Tab Navigation").probe(TabNavigation)
}

/// Every tab up to the expected count (at least the first seven) must turn
/// active and reveal an active panel. Where a section id is configured for
/// that position, the panel id is compared against it.
struct TabNavigation;

#[async_trait]
impl Probe for TabNavigation {
    fn name(&self) -> &str {
        "tab navigation"
    }

    async fn run(&self, cx: &mut ProbeContext<'_>, out: &mut Emitter) -> ProbeResult<()> {
        let tabs = cx.page.count(NAV_TAB).await?;
        let expected = cx.config.sections.len();
        if tabs >= expected {
            out.passed_with(1, format!("Has {} tabs (expected {})", tabs, expected), Detail::count(tabs));
        } else {
            out.failed_with(1, format!("Only {} tabs (expected {})", tabs, expected), Detail::count(tabs));
        }

        let panels_selector = cx.config.active_panel_selector();
        let settle = cx.settings.timing.transition();

        let checked = tabs.min(expected.max(MIN_CHECKED_TABS));
        for i in 0..checked {
            let n = i as u32 + 2;
            let section = cx.config.sections.get(i);
            let label: String = cx
                .page
                .text(NAV_TAB, i)
                .await?
                .unwrap_or_default()
                .trim()
                .chars()
                .take(LABEL_CHARS)
                .collect();

            cx.page.click(NAV_TAB, i).await?;
            cx.page
                .wait_for(&Condition::class_present(NAV_TAB, i, "active"), settle)
                .await?;
            cx.page.wait_for(&Condition::present(&panels_selector), settle).await?;

            let active = cx.page.has_class(NAV_TAB, i, "active").await?;
            let panels = cx.page.ids(&panels_selector).await?;

            if !active || panels.is_empty() {
                out.failed_with(
                    n,
                    format!("Tab '{}' failed", label),
                    Detail::counts([("active", active as usize), ("panels", panels.len())]),
                );
            } else {
                match section {
                    Some(section) if !panels.iter().any(|id| id == section) => out.warning_with(
                        n,
                        format!("Tab '{}' shows [{}], expected '{}'", label, panels.join(", "), section),
                        Detail::items(panels),
                    ),
                    _ => out.passed(n, format!("Tab '{}' works", label)),
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::battery::fixture::run_on;
    use crate::catalog::PageConfig;
    use crate::outcome::Category;
    use crate::testing::{FakeElement, FakePage, FakeSite};

    const SECTIONS: [&str; 7] = [
        "keypoints",
        "prerequisites",
        "concepts",
        "problemtypes",
        "examtips",
        "mistakes",
        "connections",
    ];

    fn config() -> PageConfig {
        let mut config = PageConfig::new("U1.2.html", "Calculating Limits");
        config.sections = SECTIONS.iter().map(|s| s.to_string()).collect();
        config
    }

    /// `ids` lists the panels under `.section.active`; a click moves the
    /// single active panel to the tab's section
    fn site(tabs: usize, panel_ids: &'static [&'static str]) -> FakeSite {
        let mut site = FakeSite::new().elements(
            NAV_TAB,
            tabs,
            FakeElement::new().class("nav-tab").text("  Section tab with a long label  "),
        );
        for i in 0..tabs {
            site = site.on_click(NAV_TAB, i, move |dom| {
                dom.activate_exclusive(NAV_TAB, i, "active");
                dom.set_attr(".section.active", 0, "id", panel_ids[i]);
            });
        }
        site.element(".section.active", FakeElement::new().id(panel_ids[0]))
    }

    #[tokio::test]
    async fn test_seven_working_tabs_yield_no_failures() {
        let mut page = FakePage::serving(site(7, &SECTIONS));
        let outcomes = run_on(&group(), &mut page, &config()).await;

        assert_eq!(outcomes.len(), 8);
        assert!(outcomes.iter().all(|o| o.category() == Category::Passed));
        assert_eq!(outcomes[0].detail(), Some(&Detail::Count(7)));
        assert_eq!(outcomes[1].message(), "Tab 'Section tab with a l' works");
        assert_eq!(outcomes[7].code(), "3.8");
    }

    #[tokio::test]
    async fn test_mismatched_panel_id_is_a_warning() {
        const SHIFTED: [&str; 7] = ["a", "prerequisites", "concepts", "problemtypes", "examtips", "mistakes", "connections"];
        let mut page = FakePage::serving(site(7, &SHIFTED));
        let outcomes = run_on(&group(), &mut page, &config()).await;

        assert_eq!(outcomes[1].category(), Category::Warning);
        assert_eq!(outcomes[1].detail(), Some(&Detail::items(["a"])));
        assert!(outcomes[2..].iter().all(|o| o.category() == Category::Passed));
    }

    #[tokio::test]
    async fn test_missing_tabs_and_dead_tab() {
        let site = FakeSite::new()
            .elements(NAV_TAB, 2, FakeElement::new().class("nav-tab").text("Tab"))
            .on_click(NAV_TAB, 0, |dom| dom.activate_exclusive(NAV_TAB, 0, "active"))
            .element(".section.active", FakeElement::new().id("keypoints"));
        let mut page = FakePage::serving(site);
        let outcomes = run_on(&group(), &mut page, &config()).await;

        let summary: Vec<_> = outcomes.iter().map(|o| (o.code(), o.category())).collect();
        assert_eq!(
            summary,
            [("3.1", Category::Failed), ("3.2", Category::Passed), ("3.3", Category::Failed)]
        );
        assert_eq!(outcomes[0].message(), "Only 2 tabs (expected 7)");
    }

    #[tokio::test]
    async fn test_tabs_exercised_without_configured_sections() {
        let site = FakeSite::new().elements(NAV_TAB, 9, FakeElement::new().class("nav-tab").text("Tab"));
        let mut page = FakePage::serving(site);
        let outcomes = run_on(&group(), &mut page, &PageConfig::new("a.html", "A")).await;

        assert_eq!(outcomes[0].message(), "Has 9 tabs (expected 0)");
        assert_eq!(page.clicks().len(), 7);
        let failed = outcomes.iter().filter(|o| o.category() == Category::Failed).count();
        assert_eq!(failed, 7);
    }

    #[tokio::test]
    async fn test_working_tabs_pass_without_configured_sections() {
        let mut page = FakePage::serving(site(7, &SECTIONS));
        let outcomes = run_on(&group(), &mut page, &PageConfig::new("a.html", "A")).await;

        assert_eq!(outcomes.len(), 8);
        assert!(outcomes.iter().all(|o| o.category() == Category::Passed));
    }
}
