//! Theme toggle

use async_trait::async_trait;

use crate::handle::{Condition, HandleResult, PageHandle};
use crate::outcome::Detail;
use crate::probe::{Emitter, Probe, ProbeContext, ProbeGroup, ProbeResult};

pub const TOGGLE: &str = ".theme-toggle";
pub const STORAGE_KEY: &str = "theme";

const THEME_ATTR: &str = "data-theme";
const DEFAULT_THEME: &str = "light";

pub fn group() -> ProbeGroup {
    ProbeGroup::new(2, "Theme Toggle").probe(ThemeToggle)
}

async fn theme_attr(page: &mut dyn PageHandle) -> HandleResult<Option<String>> {
    page.attribute("body", 0, THEME_ATTR).await
}

fn theme_name(attr: &Option<String>) -> String {
    attr.clone().unwrap_or_else(|| DEFAULT_THEME.to_string())
}

fn changed_from(from: Option<String>) -> Condition {
    Condition::AttributeDiffers {
        selector: "body".to_string(),
        index: 0,
        name: THEME_ATTR.to_string(),
        from,
    }
}

struct ThemeToggle;

#[async_trait]
impl Probe for ThemeToggle {
    fn name(&self) -> &str {
        "theme toggle"
    }

    async fn run(&self, cx: &mut ProbeContext<'_>, out: &mut Emitter) -> ProbeResult<()> {
        if cx.page.count(TOGGLE).await? == 0 {
            out.failed(1, "Theme toggle not found");
            return Ok(());
        }
        out.passed(1, "Theme toggle button exists");

        let before = theme_attr(cx.page).await?;
        let initial = theme_name(&before);
        out.info_with(2, format!("Initial theme: {}", initial), Detail::Text(initial.clone()));

        let settle = cx.settings.timing.toggle();
        cx.page.click(TOGGLE, 0).await?;
        cx.page.wait_for(&changed_from(before), settle).await?;

        let after = theme_attr(cx.page).await?;
        let current = theme_name(&after);
        if current != initial {
            out.passed(3, format!("Theme changed: {} -> {}", initial, current));
        } else {
            out.failed(3, "Theme did not change on click");
        }

        let stored = cx.page.storage_item(STORAGE_KEY).await?;
        if stored.as_deref() == Some(current.as_str()) {
            out.passed(4, "Theme persisted to localStorage");
        } else {
            out.warning(
                4,
                format!("localStorage mismatch: {}", stored.as_deref().unwrap_or("null")),
            );
        }

        // leave the page in its original theme for the groups that follow
        cx.page.click(TOGGLE, 0).await?;
        cx.page.wait_for(&changed_from(after), settle).await?;
        Ok(())
    }
}
