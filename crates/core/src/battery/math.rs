//! KaTeX math rendering

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;

use crate::outcome::Detail;
use crate::probe::{Emitter, Probe, ProbeContext, ProbeGroup, ProbeResult};

pub const KATEX: &str = ".katex";
pub const KATEX_ERROR: &str = ".katex-error";

/// Inline or display delimiters left behind by a renderer that never ran
static RAW_DELIMITER: Lazy<Regex> = Lazy::new(|| Regex::new(r"\\[\(\[]").expect("valid regex"));

pub fn group() -> ProbeGroup {
    ProbeGroup::new(4, "Math Rendering")
        .probe(Rendered)
        .probe(NoRawLatex)
        .probe(NoErrors)
}

struct Rendered;

#[async_trait]
impl Probe for Rendered {
    fn name(&self) -> &str {
        "katex present"
    }

    async fn run(&self, cx: &mut ProbeContext<'_>, out: &mut Emitter) -> ProbeResult<()> {
        let n = cx.page.count(KATEX).await?;
        if n > 0 {
            out.passed_with(1, format!("KaTeX rendered: {} elements", n), Detail::count(n));
        } else {
            out.failed(1, "No KaTeX elements found");
        }
        Ok(())
    }
}

struct NoRawLatex;

#[async_trait]
impl Probe for NoRawLatex {
    fn name(&self) -> &str {
        "unrendered latex"
    }

    async fn run(&self, cx: &mut ProbeContext<'_>, out: &mut Emitter) -> ProbeResult<()> {
        let body = cx.page.inner_text("body").await?;
        let raw = RAW_DELIMITER.find_iter(&body).count();
        if raw == 0 {
            out.passed(2, "No unrendered LaTeX found");
        } else {
            out.warning_with(
                2,
                format!("Found {} potential unrendered LaTeX", raw),
                Detail::count(raw),
            );
        }
        Ok(())
    }
}

struct NoErrors;

#[async_trait]
impl Probe for NoErrors {
    fn name(&self) -> &str {
        "katex errors"
    }

    async fn run(&self, cx: &mut ProbeContext<'_>, out: &mut Emitter) -> ProbeResult<()> {
        let errors = cx.page.count(KATEX_ERROR).await?;
        if errors == 0 {
            out.passed(3, "No KaTeX rendering errors");
        } else {
            out.failed_with(3, format!("Found {} KaTeX errors", errors), Detail::count(errors));
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

    #[test]
    fn test_raw_delimiter_pattern() {
        assert_eq!(RAW_DELIMITER.find_iter(r"a \(x\) and \[y\]").count(), 2);
        assert_eq!(RAW_DELIMITER.find_iter("lim x→0 (f(x))").count(), 0);
    }

    #[tokio::test]
    async fn test_rendered_page() {
        let site = FakeSite::new()
            .elements(KATEX, 12, FakeElement::new())
            .element("body", FakeElement::new().text("The limit of f(x) as x approaches 0"));
        let mut page = FakePage::serving(site);
        let outcomes = run_on(&group(), &mut page, &PageConfig::new("a.html", "A")).await;
        assert_eq!(
            codes(&outcomes),
            [("4.1", Category::Passed), ("4.2", Category::Passed), ("4.3", Category::Passed)]
        );
        assert_eq!(outcomes[0].message(), "KaTeX rendered: 12 elements");
    }

    #[tokio::test]
    async fn test_unrendered_page() {
        let site = FakeSite::new()
            .element("body", FakeElement::new().text(r"\(\lim_{x \to 0} f(x)\)"))
            .elements(KATEX_ERROR, 2, FakeElement::new());
        let mut page = FakePage::serving(site);
        let outcomes = run_on(&group(), &mut page, &PageConfig::new("a.html", "A")).await;
        assert_eq!(
            codes(&outcomes),
            [("4.1", Category::Failed), ("4.2", Category::Warning), ("4.3", Category::Failed)]
        );
    }
}
