//! Problem-type accordions

use async_trait::async_trait;
use tracing::debug;

use crate::handle::{Condition, HandleResult};
use crate::outcome::Detail;
use crate::probe::{ActivateTab, Emitter, Probe, ProbeContext, ProbeGroup, ProbeResult};

pub const HEADER: &str = ".problem-type-header";
pub const ITEM: &str = ".problem-type";

const COLLAPSED: &str = "collapsed";
const SAMPLED: usize = 5;

pub fn group() -> ProbeGroup {
    ProbeGroup::new(6, "Accordions")
        .with_setup(ActivateTab::new(&["Problem"]))
        .probe(Accordions)
}

fn is_collapsed(class: Option<String>) -> bool {
    class
        .map(|c| c.split_whitespace().any(|c| c == COLLAPSED))
        .unwrap_or(false)
}

/// Click header `i` and report whether its accordion flipped state
async fn toggles(cx: &mut ProbeContext<'_>, i: usize) -> HandleResult<bool> {
    let before = is_collapsed(cx.page.closest_attribute(HEADER, i, ITEM, "class").await?);
    cx.page.click(HEADER, i).await?;

    let flipped = Condition::AncestorClass {
        selector: HEADER.to_string(),
        index: i,
        ancestor: ITEM.to_string(),
        class: COLLAPSED.to_string(),
        present: !before,
    };
    cx.page.wait_for(&flipped, cx.settings.timing.transition()).await?;

    let after = is_collapsed(cx.page.closest_attribute(HEADER, i, ITEM, "class").await?);
    Ok(before != after)
}

/// At least one of the first five accordions must respond to a click
struct Accordions;

#[async_trait]
impl Probe for Accordions {
    fn name(&self) -> &str {
        "accordion toggles"
    }

    async fn run(&self, cx: &mut ProbeContext<'_>, out: &mut Emitter) -> ProbeResult<()> {
        let headers = cx.page.count(HEADER).await?;
        out.info_with(1, format!("Found {} accordion headers", headers), Detail::count(headers));
        if headers == 0 {
            out.warning(1, "No accordion headers found");
            return Ok(());
        }

        let sampled = headers.min(SAMPLED);
        let mut working = 0;
        for i in 0..sampled {
            // a single stubborn accordion does not stop the others from being tried
            match toggles(cx, i).await {
                Ok(true) => working += 1,
                Ok(false) => {}
                Err(e) => debug!("accordion {} not exercised: {}", i, e),
            }
        }

        if working > 0 {
            out.passed_with(
                2,
                format!("{}/{} accordions toggle", working, sampled),
                Detail::counts([("working", working), ("sampled", sampled)]),
            );
        } else {
            out.failed(2, "No accordions respond to click");
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

    fn accordion_site(items: usize, working: &'static [usize]) -> FakeSite {
        let mut site = FakeSite::new();
        for i in 0..items {
            site = site
                .element(ITEM, FakeElement::new().class("problem-type collapsed"))
                .element(HEADER, FakeElement::new().child_of(ITEM, i));
            if working.contains(&i) {
                site = site.on_click(HEADER, i, move |dom| dom.toggle_class(ITEM, i, COLLAPSED));
            }
        }
        site
    }

    #[tokio::test]
    async fn test_counts_only_the_first_five() {
        let mut page = FakePage::serving(accordion_site(8, &[1, 3, 6]));
        let outcomes = run_on(&group(), &mut page, &PageConfig::new("a.html", "A")).await;

        assert_eq!(codes(&outcomes), [("6.1", Category::Info), ("6.2", Category::Passed)]);
        assert_eq!(outcomes[1].message(), "2/5 accordions toggle");
        assert_eq!(page.clicks().len(), 5);
    }

    #[tokio::test]
    async fn test_dead_accordions_fail() {
        let mut page = FakePage::serving(accordion_site(3, &[]));
        let outcomes = run_on(&group(), &mut page, &PageConfig::new("a.html", "A")).await;
        assert_eq!(codes(&outcomes), [("6.1", Category::Info), ("6.2", Category::Failed)]);
    }

    #[tokio::test]
    async fn test_hidden_header_is_skipped_not_fatal() {
        let site = FakeSite::new()
            .element(ITEM, FakeElement::new().class("problem-type collapsed"))
            .element(ITEM, FakeElement::new().class("problem-type collapsed"))
            .element(HEADER, FakeElement::new().child_of(ITEM, 0).hidden())
            .element(HEADER, FakeElement::new().child_of(ITEM, 1))
            .on_click(HEADER, 1, |dom| dom.toggle_class(ITEM, 1, COLLAPSED));
        let mut page = FakePage::serving(site);

        let outcomes = run_on(&group(), &mut page, &PageConfig::new("a.html", "A")).await;
        assert_eq!(outcomes[1].message(), "1/2 accordions toggle");
    }

    #[tokio::test]
    async fn test_no_headers_warns() {
        let mut page = FakePage::new();
        let outcomes = run_on(&group(), &mut page, &PageConfig::new("a.html", "A")).await;
        assert_eq!(codes(&outcomes), [("6.1", Category::Info), ("6.1", Category::Warning)]);
    }
}
