use async_trait::async_trait;

use crate::outcome::Detail;
use crate::probe::{ActivateTab, Emitter, Probe, ProbeContext, ProbeGroup, ProbeResult};

pub const CARD: &str = ".connection-card";

pub fn group() -> ProbeGroup {
    ProbeGroup::new(12, "Connections")
        .with_setup(ActivateTab::new(&["Connection"]))
        .probe(Connections)
}

struct Connections;

#[async_trait]
impl Probe for Connections {
    fn name(&self) -> &str {
        "connection cards"
    }

    async fn run(&self, cx: &mut ProbeContext<'_>, out: &mut Emitter) -> ProbeResult<()> {
        let cards = cx.page.count(CARD).await?;
        out.info_with(1, format!("Connection cards: {}", cards), Detail::count(cards));
        if cards > 0 {
            out.passed(2, format!("Connection section populated: {}", cards));
        }
        Ok(())
    }
}
