//! The page-handle capability probes run against
//!
//! Everything a probe may ask of the browser is a typed query on
//! [`PageHandle`]. Implementations live outside this crate (a Playwright
//! driver in `uiprobe-browser`, `testing::FakePage` for tests).

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::time::Instant;
use tracing::debug;

use crate::config::{Settle, Viewport};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HandleError {
    #[error("Navigation to {url} failed: {reason}")]
    Navigation { url: String, reason: String },

    #[error("Timeout after {timeout_ms} ms waiting for: {what}")]
    Timeout { what: String, timeout_ms: u64 },

    #[error("No element matches {selector}[{index}]")]
    ElementNotFound { selector: String, index: usize },

    #[error("Driver error: {0}")]
    Driver(String),

    #[error("Protocol error: {0}")]
    Protocol(String),

    #[error("Browser session closed")]
    SessionClosed,
}

pub type HandleResult<T> = Result<T, HandleError>;

/// When a navigation counts as finished
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WaitPolicy {
    Load,
    DomContentLoaded,
    #[default]
    NetworkIdle,
}

impl WaitPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            WaitPolicy::Load => "load",
            WaitPolicy::DomContentLoaded => "domcontentloaded",
            WaitPolicy::NetworkIdle => "networkidle",
        }
    }
}

/// Response to a navigation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Navigation {
    pub status: u16,
    pub url: String,
}

impl Navigation {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Scroll and client extents of an element
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoxMetrics {
    pub scroll_width: u32,
    pub client_width: u32,
    pub scroll_height: u32,
    pub client_height: u32,
}

impl BoxMetrics {
    pub fn overflows_horizontally(&self) -> bool {
        self.scroll_width > self.client_width
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConsoleLevel {
    Error,
    Warning,
    Info,
    Log,
    Debug,
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsoleMessage {
    pub level: ConsoleLevel,
    pub text: String,
}

impl ConsoleMessage {
    pub fn error(text: impl Into<String>) -> Self {
        Self { level: ConsoleLevel::Error, text: text.into() }
    }

    pub fn warning(text: impl Into<String>) -> Self {
        Self { level: ConsoleLevel::Warning, text: text.into() }
    }
}

/// Publishing side of a console subscription, held by the page handle
#[derive(Debug, Clone)]
pub struct ConsoleFeed {
    tx: mpsc::Sender<ConsoleMessage>,
    dropped: Arc<DropCounts>,
}

/// Messages lost to a full buffer. Errors are counted apart so an
/// overflow can never hide one.
#[derive(Debug, Default)]
struct DropCounts {
    total: AtomicUsize,
    errors: AtomicUsize,
}

impl ConsoleFeed {
    /// Forward one message. Returns false once the subscriber is gone, so the
    /// handle can forget the feed. A full buffer drops the message.
    pub fn publish(&self, message: ConsoleMessage) -> bool {
        match self.tx.try_send(message) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(message)) => {
                self.dropped.total.fetch_add(1, Ordering::Relaxed);
                if message.level == ConsoleLevel::Error {
                    self.dropped.errors.fetch_add(1, Ordering::Relaxed);
                }
                true
            }
            Err(mpsc::error::TrySendError::Closed(_)) => false,
        }
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// Receiving side of a console subscription. Capture stops when it is dropped.
#[derive(Debug)]
pub struct ConsoleSubscription {
    rx: mpsc::Receiver<ConsoleMessage>,
    dropped: Arc<DropCounts>,
}

impl ConsoleSubscription {
    /// Create a bounded subscription and the feed the handle publishes into
    pub fn bounded(capacity: usize) -> (ConsoleFeed, ConsoleSubscription) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        let dropped = Arc::new(DropCounts::default());
        (
            ConsoleFeed { tx, dropped: dropped.clone() },
            ConsoleSubscription { rx, dropped },
        )
    }

    /// Take everything buffered so far
    pub fn drain(&mut self) -> Vec<ConsoleMessage> {
        let mut messages = Vec::new();
        while let Ok(message) = self.rx.try_recv() {
            messages.push(message);
        }
        messages
    }

    /// Messages lost because the buffer was full
    pub fn dropped(&self) -> usize {
        self.dropped.total.load(Ordering::Relaxed)
    }

    /// Error-level messages among the dropped ones
    pub fn dropped_errors(&self) -> usize {
        self.dropped.errors.load(Ordering::Relaxed)
    }
}

/// A page state a probe can wait for
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Condition {
    /// At least one element matches
    Present { selector: String },
    /// The element exists and is visible
    Visible { selector: String, index: usize },
    /// The element carries the class
    ClassPresent { selector: String, index: usize, class: String },
    /// The attribute no longer equals `from` (`None` = absent)
    AttributeDiffers { selector: String, index: usize, name: String, from: Option<String> },
    /// The text content no longer equals `from`
    TextDiffers { selector: String, index: usize, from: Option<String> },
    /// The closest `ancestor` of the element has (or lacks) the class
    AncestorClass { selector: String, index: usize, ancestor: String, class: String, present: bool },
}

impl Condition {
    pub fn present(selector: &str) -> Self {
        Condition::Present { selector: selector.to_string() }
    }

    pub fn visible(selector: &str, index: usize) -> Self {
        Condition::Visible { selector: selector.to_string(), index }
    }

    pub fn class_present(selector: &str, index: usize, class: &str) -> Self {
        Condition::ClassPresent {
            selector: selector.to_string(),
            index,
            class: class.to_string(),
        }
    }
}

fn class_list_contains(class_attr: Option<&str>, class: &str) -> bool {
    class_attr
        .map(|c| c.split_whitespace().any(|c| c == class))
        .unwrap_or(false)
}

#[async_trait]
pub trait PageHandle: Send {
    /// Navigate and wait according to `wait`
    async fn navigate(&mut self, url: &str, wait: WaitPolicy, timeout: Duration) -> HandleResult<Navigation>;

    /// Reload the current page
    async fn reload(&mut self, wait: WaitPolicy, timeout: Duration) -> HandleResult<Navigation>;

    async fn title(&mut self) -> HandleResult<String>;

    /// Number of elements matching the selector
    async fn count(&mut self, selector: &str) -> HandleResult<usize>;

    /// Text content of the nth match, `None` if there is no such element
    async fn text(&mut self, selector: &str, index: usize) -> HandleResult<Option<String>>;

    /// Rendered text of the first match (empty if none)
    async fn inner_text(&mut self, selector: &str) -> HandleResult<String>;

    async fn attribute(&mut self, selector: &str, index: usize, name: &str) -> HandleResult<Option<String>>;

    /// Attribute of the closest ancestor (or self) matching `ancestor`
    async fn closest_attribute(
        &mut self,
        selector: &str,
        index: usize,
        ancestor: &str,
        name: &str,
    ) -> HandleResult<Option<String>>;

    /// False when the element does not exist
    async fn is_visible(&mut self, selector: &str, index: usize) -> HandleResult<bool>;

    /// Whether a script-side property is defined on the element
    async fn has_property(&mut self, selector: &str, index: usize, property: &str) -> HandleResult<bool>;

    async fn metrics(&mut self, selector: &str, index: usize) -> HandleResult<Option<BoxMetrics>>;

    async fn click(&mut self, selector: &str, index: usize) -> HandleResult<()>;

    /// Index of the first match whose text contains `text`
    async fn find_by_text(&mut self, selector: &str, text: &str) -> HandleResult<Option<usize>>;

    /// `id` of every match, in document order
    async fn ids(&mut self, selector: &str) -> HandleResult<Vec<String>>;

    /// Value stored under `key` in the page's local storage
    async fn storage_item(&mut self, key: &str) -> HandleResult<Option<String>>;

    async fn set_viewport(&mut self, viewport: Viewport) -> HandleResult<()>;

    /// Start capturing console output into a bounded buffer.
    /// A new subscription replaces any previous one.
    async fn subscribe_console(&mut self, capacity: usize) -> HandleResult<ConsoleSubscription>;

    /// Whether the underlying session can still take commands
    async fn is_usable(&mut self) -> bool {
        true
    }

    async fn has_class(&mut self, selector: &str, index: usize, class: &str) -> HandleResult<bool> {
        let attr = self.attribute(selector, index, "class").await?;
        Ok(class_list_contains(attr.as_deref(), class))
    }

    /// Evaluate a condition once
    async fn check(&mut self, condition: &Condition) -> HandleResult<bool> {
        match condition {
            Condition::Present { selector } => Ok(self.count(selector).await? > 0),
            Condition::Visible { selector, index } => self.is_visible(selector, *index).await,
            Condition::ClassPresent { selector, index, class } => {
                self.has_class(selector, *index, class).await
            }
            Condition::AttributeDiffers { selector, index, name, from } => {
                Ok(self.attribute(selector, *index, name).await? != *from)
            }
            Condition::TextDiffers { selector, index, from } => {
                Ok(self.text(selector, *index).await? != *from)
            }
            Condition::AncestorClass { selector, index, ancestor, class, present } => {
                let attr = self.closest_attribute(selector, *index, ancestor, "class").await?;
                Ok(class_list_contains(attr.as_deref(), class) == *present)
            }
        }
    }

    /// Poll `condition` every `settle.interval` until it holds or
    /// `settle.timeout` elapses. Running out of time is not an error; the
    /// caller reads the resulting state and judges it.
    async fn wait_for(&mut self, condition: &Condition, settle: Settle) -> HandleResult<bool> {
        let deadline = Instant::now() + settle.timeout;
        loop {
            if self.check(condition).await? {
                return Ok(true);
            }
            let now = Instant::now();
            if now >= deadline {
                debug!("settle budget of {:?} exhausted for {:?}", settle.timeout, condition);
                return Ok(false);
            }
            let step = settle.interval.min(deadline - now);
            tokio::time::sleep(step).await;
        }
    }

    /// Fixed pause
    async fn pause(&mut self, duration: Duration) {
        if !duration.is_zero() {
            tokio::time::sleep(duration).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_navigation_success_range() {
        let nav = |status| Navigation { status, url: String::new() };
        assert!(nav(200).is_success());
        assert!(nav(204).is_success());
        assert!(!nav(304).is_success());
        assert!(!nav(404).is_success());
    }

    #[test]
    fn test_class_list_matching_is_token_based() {
        assert!(class_list_contains(Some("nav-tab active"), "active"));
        assert!(!class_list_contains(Some("nav-tab inactive"), "active"));
        assert!(!class_list_contains(None, "active"));
    }

    #[tokio::test]
    async fn test_console_subscription_is_bounded() {
        let (feed, mut sub) = ConsoleSubscription::bounded(2);
        for i in 0..5 {
            assert!(feed.publish(ConsoleMessage::error(format!("e{}", i))));
        }
        let drained = sub.drain();
        assert_eq!(drained.len(), 2);
        assert_eq!(drained[0].text, "e0");
        assert_eq!(sub.dropped(), 3);
        assert_eq!(sub.dropped_errors(), 3);

        drop(sub);
        assert!(!feed.publish(ConsoleMessage::error("late")));
        assert!(feed.is_closed());
    }

    #[test]
    fn test_dropped_errors_counted_apart() {
        let (feed, sub) = ConsoleSubscription::bounded(1);
        feed.publish(ConsoleMessage::warning("w1"));
        feed.publish(ConsoleMessage::warning("w2"));
        feed.publish(ConsoleMessage::error("e1"));
        assert_eq!(sub.dropped(), 2);
        assert_eq!(sub.dropped_errors(), 1);
    }

    #[test]
    fn test_console_level_tolerates_unknown() {
        let msg: ConsoleMessage = serde_json::from_str(r#"{"level":"trace","text":"x"}"#).unwrap();
        assert_eq!(msg.level, ConsoleLevel::Other);
    }
}
