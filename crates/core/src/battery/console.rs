//! Console errors emitted by the page's own scripts during a reload

use async_trait::async_trait;
use tracing::debug;

use crate::handle::{ConsoleLevel, WaitPolicy};
use crate::outcome::Detail;
use crate::probe::{Emitter, Probe, ProbeContext, ProbeGroup, ProbeResult};

/// Errors quoted in the failure detail
const QUOTED_ERRORS: usize = 3;

pub fn group() -> ProbeGroup {
    ProbeGroup::new(14, "Console Errors").probe(ReloadConsole)
}

/// Subscribes for the duration of one reload. The subscription is dropped on
/// return, so capture never outlives this probe.
struct ReloadConsole;

#[async_trait]
impl Probe for ReloadConsole {
    fn name(&self) -> &str {
        "console on reload"
    }

    async fn run(&self, cx: &mut ProbeContext<'_>, out: &mut Emitter) -> ProbeResult<()> {
        let timing = &cx.settings.timing;
        let mut console = cx.page.subscribe_console(cx.settings.console_capacity).await?;
        cx.page
            .reload(WaitPolicy::NetworkIdle, timing.navigation_timeout())
            .await?;
        cx.page.pause(timing.reload_settle()).await;

        let messages = console.drain();
        let dropped = console.dropped();
        let dropped_errors = console.dropped_errors();
        if dropped > 0 {
            debug!(
                "console buffer overflowed, {} messages dropped ({} errors)",
                dropped, dropped_errors
            );
        }

        let errors: Vec<&str> = messages
            .iter()
            .filter(|m| m.level == ConsoleLevel::Error)
            .map(|m| m.text.as_str())
            .collect();
        let warnings = messages
            .iter()
            .filter(|m| m.level == ConsoleLevel::Warning)
            .count();

        // errors lost to a full buffer still count, their text is gone
        let error_count = errors.len() + dropped_errors;
        if error_count > 0 {
            out.failed_with(
                1,
                format!("{} JavaScript errors on reload", error_count),
                Detail::items(errors.iter().take(QUOTED_ERRORS).copied()),
            );
        } else if dropped > 0 {
            out.warning_with(
                1,
                format!("No JavaScript errors kept, {} console messages dropped", dropped),
                Detail::count(dropped),
            );
        } else {
            out.passed(1, "No JavaScript errors on reload");
        }
        if warnings > 0 {
            out.info_with(2, format!("JS warnings: {}", warnings), Detail::count(warnings));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::battery::fixture::{codes, run_on, run_with};
    use crate::catalog::PageConfig;
    use crate::config::ProbeSettings;
    use crate::handle::ConsoleMessage;
    use crate::outcome::Category;
    use crate::testing::{FakePage, FakeSite};

    #[tokio::test]
    async fn test_errors_fail_and_are_quoted() {
        let site = FakeSite::new().console_on_reload(vec![
            ConsoleMessage::error("Uncaught ReferenceError: katex is not defined"),
            ConsoleMessage::warning("deprecated API"),
            ConsoleMessage::error("e2"),
            ConsoleMessage::error("e3"),
            ConsoleMessage::error("e4"),
        ]);
        let mut page = FakePage::serving(site);
        let outcomes = run_on(&group(), &mut page, &PageConfig::new("a.html", "A")).await;

        assert_eq!(codes(&outcomes), [("14.1", Category::Failed), ("14.2", Category::Info)]);
        assert_eq!(outcomes[0].message(), "4 JavaScript errors on reload");
        assert_eq!(
            outcomes[0].detail(),
            Some(&Detail::items([
                "Uncaught ReferenceError: katex is not defined",
                "e2",
                "e3"
            ]))
        );
    }

    #[tokio::test]
    async fn test_quiet_console_passes() {
        let mut page = FakePage::new();
        let outcomes = run_on(&group(), &mut page, &PageConfig::new("a.html", "A")).await;
        assert_eq!(codes(&outcomes), [("14.1", Category::Passed)]);
    }

    fn tight_buffer(capacity: usize) -> ProbeSettings {
        ProbeSettings {
            console_capacity: capacity,
            ..ProbeSettings::immediate()
        }
    }

    #[tokio::test]
    async fn test_error_behind_full_buffer_still_fails() {
        let mut messages: Vec<_> = (0..4).map(|i| ConsoleMessage::warning(format!("w{}", i))).collect();
        messages.push(ConsoleMessage::error("Uncaught TypeError: x is undefined"));
        let mut page = FakePage::serving(FakeSite::new().console_on_reload(messages));

        let outcomes = run_with(&group(), &mut page, &PageConfig::new("a.html", "A"), &tight_buffer(4)).await;

        assert_eq!(codes(&outcomes), [("14.1", Category::Failed), ("14.2", Category::Info)]);
        assert_eq!(outcomes[0].message(), "1 JavaScript errors on reload");
    }

    #[tokio::test]
    async fn test_overflow_without_errors_is_not_a_pass() {
        let messages: Vec<_> = (0..6).map(|i| ConsoleMessage::warning(format!("w{}", i))).collect();
        let mut page = FakePage::serving(FakeSite::new().console_on_reload(messages));

        let outcomes = run_with(&group(), &mut page, &PageConfig::new("a.html", "A"), &tight_buffer(4)).await;

        assert_eq!(codes(&outcomes), [("14.1", Category::Warning), ("14.2", Category::Info)]);
        assert_eq!(outcomes[0].detail(), Some(&Detail::Count(2)));
    }
}
