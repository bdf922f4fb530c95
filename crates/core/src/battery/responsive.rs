//! Layout at a phone-sized viewport

use async_trait::async_trait;

use crate::config::Viewport;
use crate::handle::Condition;
use crate::outcome::Detail;
use crate::probe::{Emitter, Probe, ProbeContext, ProbeGroup, ProbeResult};

pub const NAV: &str = ".nav-tabs";
pub const HEADER: &str = ".header";

pub fn group() -> ProbeGroup {
    ProbeGroup::new(15, "Responsive Layout").probe(MobileLayout)
}

/// Checks at [`Viewport::MOBILE`], then restores the configured viewport
/// whether or not the checks faulted
struct MobileLayout;

impl MobileLayout {
    async fn inspect(&self, cx: &mut ProbeContext<'_>, out: &mut Emitter) -> ProbeResult<()> {
        cx.page
            .wait_for(&Condition::visible(HEADER, 0), cx.settings.timing.toggle())
            .await?;

        let nav = match cx.page.metrics(NAV, 0).await? {
            None => "no nav",
            Some(m) if m.overflows_horizontally() => "overflow",
            Some(_) => "fits",
        };
        out.info_with(1, format!("Nav at mobile: {}", nav), Detail::Text(nav.to_string()));

        if cx.page.is_visible(HEADER, 0).await? {
            out.passed(2, "Header visible at mobile width");
        } else {
            out.warning(2, "Header may have issues on mobile");
        }
        Ok(())
    }
}

#[async_trait]
impl Probe for MobileLayout {
    fn name(&self) -> &str {
        "mobile layout"
    }

    async fn run(&self, cx: &mut ProbeContext<'_>, out: &mut Emitter) -> ProbeResult<()> {
        cx.page.set_viewport(Viewport::MOBILE).await?;
        let inspected = self.inspect(cx, out).await;
        cx.page.set_viewport(cx.settings.viewport).await?;
        inspected
    }
}
