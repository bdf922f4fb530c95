use async_trait::async_trait;

use crate::outcome::Detail;
use crate::probe::{Emitter, Probe, ProbeContext, ProbeGroup, ProbeResult};

pub const FLOWCHART: &str = ".decision-flowchart, .flowchart-container";
pub const NODE: &str = ".flowchart-node";

pub fn group() -> ProbeGroup {
    ProbeGroup::new(10, "Decision Flowcharts").probe(Flowcharts)
}

struct Flowcharts;

#[async_trait]
impl Probe for Flowcharts {
    fn name(&self) -> &str {
        "flowcharts"
    }

    async fn run(&self, cx: &mut ProbeContext<'_>, out: &mut Emitter) -> ProbeResult<()> {
        let charts = cx.page.count(FLOWCHART).await?;
        let nodes = cx.page.count(NODE).await?;
        out.info_with(
            1,
            format!("Flowcharts: {}, Nodes: {}", charts, nodes),
            Detail::counts([("flowcharts", charts), ("nodes", nodes)]),
        );
        if charts > 0 {
            out.passed(2, format!("Decision flowcharts present: {}", charts));
        } else {
            out.info(2, "No flowcharts on this page");
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
    async fn test_flowchart_present() {
        let site = FakeSite::new()
            .element(FLOWCHART, FakeElement::new())
            .elements(NODE, 6, FakeElement::new());
        let mut page = FakePage::serving(site);
        let outcomes = run_on(&group(), &mut page, &PageConfig::new("a.html", "A")).await;
        assert_eq!(codes(&outcomes), [("10.1", Category::Info), ("10.2", Category::Passed)]);
        assert_eq!(outcomes[0].message(), "Flowcharts: 1, Nodes: 6");
    }
}
