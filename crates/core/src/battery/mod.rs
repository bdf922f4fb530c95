//! The built-in probe battery for interactive lesson pages
//!
//! Groups run in a fixed order: structure and load checks, then stateful UI
//! (theme, tabs), then content widgets, then cross-cutting checks (console,
//! responsive layout). A later group may rely on navigation and tab
//! switching having been exercised, never on an earlier group having passed.

pub mod accordions;
pub mod animation;
pub mod connections;
pub mod console;
pub mod flowcharts;
pub mod graphs;
pub mod key_points;
pub mod math;
pub mod practice;
pub mod prereqs;
pub mod responsive;
pub mod structure;
pub mod tabs;
pub mod theme;
pub mod tips;

use crate::probe::ProbeGroup;

/// All fifteen groups in execution order
pub fn standard() -> Vec<ProbeGroup> {
    vec![
        structure::group(),
        theme::group(),
        tabs::group(),
        math::group(),
        prereqs::group(),
        accordions::group(),
        animation::group(),
        practice::group(),
        graphs::group(),
        flowcharts::group(),
        tips::group(),
        connections::group(),
        key_points::group(),
        console::group(),
        responsive::group(),
    ]
}

#[cfg(test)]
pub(crate) mod fixture {
    use crate::catalog::PageConfig;
    use crate::config::ProbeSettings;
    use crate::outcome::{Category, Outcome};
    use crate::probe::{ProbeContext, ProbeGroup};
    use crate::testing::FakePage;

    pub async fn run_on(group: &ProbeGroup, page: &mut FakePage, config: &PageConfig) -> Vec<Outcome> {
        run_with(group, page, config, &ProbeSettings::immediate()).await
    }

    pub async fn run_with(
        group: &ProbeGroup,
        page: &mut FakePage,
        config: &PageConfig,
        settings: &ProbeSettings,
    ) -> Vec<Outcome> {
        let mut cx = ProbeContext { page, config, settings };
        group.run(&mut cx, 100).await
    }

    pub fn codes(outcomes: &[Outcome]) -> Vec<(&str, Category)> {
        outcomes.iter().map(|o| (o.code(), o.category())).collect()
    }
}
