//! Key points and definitions

use async_trait::async_trait;

use crate::outcome::Detail;
use crate::probe::{ActivateTab, Emitter, Probe, ProbeContext, ProbeGroup, ProbeResult};

pub const KEY_POINT: &str = ".objectives-list li";
pub const DEFINITION: &str = ".definition-box";

const MIN_KEY_POINTS: usize = 3;

pub fn group() -> ProbeGroup {
    ProbeGroup::new(13, "Key Points")
        .with_setup(ActivateTab::new(&["Key"]))
        .probe(KeyPoints)
        .probe(Definition)
}

struct KeyPoints;

#[async_trait]
impl Probe for KeyPoints {
    fn name(&self) -> &str {
        "key points"
    }

    async fn run(&self, cx: &mut ProbeContext<'_>, out: &mut Emitter) -> ProbeResult<()> {
        let points = cx.page.count(KEY_POINT).await?;
        out.info_with(1, format!("Key points: {}", points), Detail::count(points));
        if points >= MIN_KEY_POINTS {
            out.passed(2, format!("Key points present: {}", points));
        } else {
            out.warning(2, format!("Few key points: {}", points));
        }
        Ok(())
    }
}

struct Definition;

#[async_trait]
impl Probe for Definition {
    fn name(&self) -> &str {
        "definition box"
    }

    async fn run(&self, cx: &mut ProbeContext<'_>, out: &mut Emitter) -> ProbeResult<()> {
        if cx.page.count(DEFINITION).await? > 0 {
            out.passed(3, "Definition box present");
        }
        Ok(())
    }
}
