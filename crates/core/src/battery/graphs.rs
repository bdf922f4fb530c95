//! Plotly graph rendering

use async_trait::async_trait;

use crate::outcome::Detail;
use crate::probe::{Emitter, Probe, ProbeContext, ProbeGroup, ProbeResult};

pub const CONTAINER: &str = ".graph-plot, .graph-container, [id*='graph']";
pub const PLOTLY_ANY: &str = ".js-plotly-plot, .plotly";
pub const PLOTLY: &str = ".js-plotly-plot";

pub fn group() -> ProbeGroup {
    ProbeGroup::new(9, "Graph Rendering").probe(Graphs)
}

struct Graphs;

#[async_trait]
impl Probe for Graphs {
    fn name(&self) -> &str {
        "plotly graphs"
    }

    async fn run(&self, cx: &mut ProbeContext<'_>, out: &mut Emitter) -> ProbeResult<()> {
        let containers = cx.page.count(CONTAINER).await?;
        let plotly = cx.page.count(PLOTLY_ANY).await?;
        out.info_with(
            1,
            format!("Graph containers: {}, Plotly plots: {}", containers, plotly),
            Detail::counts([("containers", containers), ("plotly", plotly)]),
        );

        let plots = cx.page.count(PLOTLY).await?;
        if plots == 0 {
            out.info(2, "No Plotly plots (may initialize on demand)");
            return Ok(());
        }
        // Plotly attaches the traces as `data` on the plot element once drawn
        let has_data = cx.page.has_property(PLOTLY, 0, "data").await?;
        out.passed_with(
            2,
            format!("Plotly plots found: {}", plots),
            Detail::counts([("plots", plots), ("with_data", has_data as usize)]),
        );
        Ok(())
    }
}
