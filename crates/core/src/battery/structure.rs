//! Page load and basic structure. `1.1` is recorded by the page runner's
//! navigation gate; this group continues at `1.2`.

use async_trait::async_trait;

use crate::outcome::Detail;
use crate::probe::{Emitter, Probe, ProbeContext, ProbeGroup, ProbeResult};

pub const HEADER: &str = ".header, header";
pub const META_BADGE: &str = ".meta-badge";

pub fn group() -> ProbeGroup {
    ProbeGroup::new(1, "Page Load & Structure")
        .probe(Title)
        .probe(Header)
        .probe(Topics)
}

struct Title;

#[async_trait]
impl Probe for Title {
    fn name(&self) -> &str {
        "title"
    }

    async fn run(&self, cx: &mut ProbeContext<'_>, out: &mut Emitter) -> ProbeResult<()> {
        let title = cx.page.title().await?;
        let expected = &cx.config.title;
        if title.to_lowercase().contains(&expected.to_lowercase()) {
            out.passed(2, format!("Title contains '{}'", expected));
        } else {
            out.failed(2, format!("Title mismatch: {}", title));
        }
        Ok(())
    }
}

struct Header;

#[async_trait]
impl Probe for Header {
    fn name(&self) -> &str {
        "header"
    }

    async fn run(&self, cx: &mut ProbeContext<'_>, out: &mut Emitter) -> ProbeResult<()> {
        if cx.page.count(HEADER).await? > 0 {
            out.passed(3, "Header element exists");
        } else {
            out.failed(3, "No header found");
        }
        Ok(())
    }
}

/// At least half the expected topic codes must show up in the header badges
struct Topics;

#[async_trait]
impl Probe for Topics {
    fn name(&self) -> &str {
        "topic badges"
    }

    async fn run(&self, cx: &mut ProbeContext<'_>, out: &mut Emitter) -> ProbeResult<()> {
        let badges = cx.page.count(META_BADGE).await?;
        let mut texts = Vec::with_capacity(badges);
        for i in 0..badges {
            texts.push(cx.page.text(META_BADGE, i).await?.unwrap_or_default());
        }

        let expected = &cx.config.topics;
        let found: Vec<&str> = expected
            .iter()
            .filter(|topic| texts.iter().any(|t| t.contains(topic.as_str())))
            .map(String::as_str)
            .collect();

        if found.len() >= expected.len() / 2 {
            out.passed_with(
                4,
                format!("Topic codes found: {}/{}", found.len(), expected.len()),
                Detail::items(found),
            );
        } else {
            out.warning_with(
                4,
                format!("Only found topics: [{}]", found.join(", ")),
                Detail::items(found),
            );
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

    fn config(topics: &[&str]) -> PageConfig {
        let mut config = PageConfig::new("U1.5.html", "Asymptotes");
        config.topics = topics.iter().map(|t| t.to_string()).collect();
        config
    }

    #[tokio::test]
    async fn test_well_formed_page() {
        let site = FakeSite::new()
            .title("AP Calc: Asymptotes and End Behavior")
            .element(HEADER, FakeElement::new())
            .element(META_BADGE, FakeElement::new().text("CED 1.14, 1.15"));
        let mut page = FakePage::serving(site);

        let outcomes = run_on(&group(), &mut page, &config(&["1.14", "1.15"])).await;
        assert_eq!(
            codes(&outcomes),
            [("1.2", Category::Passed), ("1.3", Category::Passed), ("1.4", Category::Passed)]
        );
        assert_eq!(outcomes[2].detail(), Some(&Detail::items(["1.14", "1.15"])));
    }

    #[tokio::test]
    async fn test_missing_header_and_topics() {
        let site = FakeSite::new()
            .title("Something else")
            .element(META_BADGE, FakeElement::new().text("1.9"));
        let mut page = FakePage::serving(site);

        let outcomes = run_on(&group(), &mut page, &config(&["1.9", "1.10", "1.11", "1.12", "1.13"])).await;
        assert_eq!(
            codes(&outcomes),
            [("1.2", Category::Failed), ("1.3", Category::Failed), ("1.4", Category::Warning)]
        );
        assert_eq!(outcomes[0].message(), "Title mismatch: Something else");
        assert_eq!(outcomes[2].message(), "Only found topics: [1.9]");
    }
}
