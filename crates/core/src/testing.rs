//! Scriptable in-memory [`PageHandle`] for exercising probes without a
//! browser.
//!
//! Selectors are plain keys: a query for `".nav-tab"` sees exactly the
//! elements registered under `".nav-tab"`. Clicks run the reactions
//! registered for that element, which is how tab switches, theme toggles
//! and accordions are modelled.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::config::Viewport;
use crate::handle::{
    BoxMetrics, ConsoleFeed, ConsoleMessage, ConsoleSubscription, HandleError, HandleResult,
    Navigation, PageHandle, WaitPolicy,
};

type Reaction = Arc<dyn Fn(&mut FakeDom) + Send + Sync>;

#[derive(Debug, Clone, Default)]
pub struct FakeElement {
    text: String,
    attrs: BTreeMap<String, String>,
    hidden: bool,
    properties: HashSet<String>,
    metrics: Option<BoxMetrics>,
    parent: Option<(String, usize)>,
}

impl FakeElement {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn text(mut self, text: &str) -> Self {
        self.text = text.to_string();
        self
    }

    pub fn id(self, id: &str) -> Self {
        self.attr("id", id)
    }

    pub fn class(self, classes: &str) -> Self {
        self.attr("class", classes)
    }

    pub fn attr(mut self, name: &str, value: &str) -> Self {
        self.attrs.insert(name.to_string(), value.to_string());
        self
    }

    pub fn hidden(mut self) -> Self {
        self.hidden = true;
        self
    }

    pub fn property(mut self, name: &str) -> Self {
        self.properties.insert(name.to_string());
        self
    }

    pub fn metrics(mut self, scroll_width: u32, client_width: u32) -> Self {
        self.metrics = Some(BoxMetrics {
            scroll_width,
            client_width,
            scroll_height: 0,
            client_height: 0,
        });
        self
    }

    /// Register the element registered as `selector[index]` as this one's parent
    pub fn child_of(mut self, selector: &str, index: usize) -> Self {
        self.parent = Some((selector.to_string(), index));
        self
    }
}

/// Mutable document state reactions operate on
#[derive(Debug, Clone, Default)]
pub struct FakeDom {
    elements: BTreeMap<String, Vec<FakeElement>>,
    storage: BTreeMap<String, String>,
}

impl FakeDom {
    fn get(&self, selector: &str, index: usize) -> Option<&FakeElement> {
        self.elements.get(selector).and_then(|els| els.get(index))
    }

    fn get_mut(&mut self, selector: &str, index: usize) -> Option<&mut FakeElement> {
        self.elements.get_mut(selector).and_then(|els| els.get_mut(index))
    }

    pub fn set_attr(&mut self, selector: &str, index: usize, name: &str, value: &str) {
        if let Some(el) = self.get_mut(selector, index) {
            el.attrs.insert(name.to_string(), value.to_string());
        }
    }

    pub fn attr(&self, selector: &str, index: usize, name: &str) -> Option<String> {
        self.get(selector, index).and_then(|el| el.attrs.get(name).cloned())
    }

    /// Append an element, as a script rendering new content would
    pub fn insert(&mut self, selector: &str, element: FakeElement) {
        self.elements.entry(selector.to_string()).or_default().push(element);
    }

    pub fn set_text(&mut self, selector: &str, index: usize, text: &str) {
        if let Some(el) = self.get_mut(selector, index) {
            el.text = text.to_string();
        }
    }

    pub fn set_hidden(&mut self, selector: &str, index: usize, hidden: bool) {
        if let Some(el) = self.get_mut(selector, index) {
            el.hidden = hidden;
        }
    }

    pub fn add_class(&mut self, selector: &str, index: usize, class: &str) {
        if let Some(el) = self.get_mut(selector, index) {
            let classes = el.attrs.entry("class".to_string()).or_default();
            if !classes.split_whitespace().any(|c| c == class) {
                if !classes.is_empty() {
                    classes.push(' ');
                }
                classes.push_str(class);
            }
        }
    }

    pub fn remove_class(&mut self, selector: &str, index: usize, class: &str) {
        if let Some(el) = self.get_mut(selector, index) {
            if let Some(classes) = el.attrs.get_mut("class") {
                *classes = classes
                    .split_whitespace()
                    .filter(|c| *c != class)
                    .collect::<Vec<_>>()
                    .join(" ");
            }
        }
    }

    pub fn toggle_class(&mut self, selector: &str, index: usize, class: &str) {
        let present = self
            .attr(selector, index, "class")
            .map(|c| c.split_whitespace().any(|c| c == class))
            .unwrap_or(false);
        if present {
            self.remove_class(selector, index, class);
        } else {
            self.add_class(selector, index, class);
        }
    }

    /// Remove `class` from every match of `selector`
    pub fn clear_class(&mut self, selector: &str, class: &str) {
        let len = self.elements.get(selector).map(Vec::len).unwrap_or(0);
        for i in 0..len {
            self.remove_class(selector, i, class);
        }
    }

    /// Make `selector[index]` the only match of `selector` carrying `class`
    pub fn activate_exclusive(&mut self, selector: &str, index: usize, class: &str) {
        self.clear_class(selector, class);
        self.add_class(selector, index, class);
    }

    pub fn set_storage(&mut self, key: &str, value: &str) {
        self.storage.insert(key.to_string(), value.to_string());
    }
}

/// Everything served for one URL
#[derive(Clone)]
pub struct FakeSite {
    status: u16,
    title: String,
    navigation_error: Option<HandleError>,
    navigation_panic: Option<String>,
    dom: FakeDom,
    reactions: HashMap<(String, usize), Vec<Reaction>>,
    viewport_reactions: Vec<(Viewport, Reaction)>,
    faulty: HashSet<String>,
    console_on_reload: Vec<ConsoleMessage>,
}

impl Default for FakeSite {
    fn default() -> Self {
        Self {
            status: 200,
            title: String::new(),
            navigation_error: None,
            navigation_panic: None,
            dom: FakeDom::default(),
            reactions: HashMap::new(),
            viewport_reactions: Vec::new(),
            faulty: HashSet::new(),
            console_on_reload: Vec::new(),
        }
    }
}

impl FakeSite {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn status(mut self, status: u16) -> Self {
        self.status = status;
        self
    }

    pub fn title(mut self, title: &str) -> Self {
        self.title = title.to_string();
        self
    }

    /// Navigation to this site raises instead of answering
    pub fn navigation_error(mut self, error: HandleError) -> Self {
        self.navigation_error = Some(error);
        self
    }

    /// Navigation to this site panics inside the handle
    pub fn navigation_panic(mut self, message: &str) -> Self {
        self.navigation_panic = Some(message.to_string());
        self
    }

    /// Append an element under `selector`
    pub fn element(mut self, selector: &str, element: FakeElement) -> Self {
        self.dom
            .elements
            .entry(selector.to_string())
            .or_default()
            .push(element);
        self
    }

    /// Append `n` copies of an element
    pub fn elements(mut self, selector: &str, n: usize, element: FakeElement) -> Self {
        for _ in 0..n {
            self = self.element(selector, element.clone());
        }
        self
    }

    pub fn storage(mut self, key: &str, value: &str) -> Self {
        self.dom.set_storage(key, value);
        self
    }

    /// Run `reaction` whenever `selector[index]` is clicked
    pub fn on_click<F>(mut self, selector: &str, index: usize, reaction: F) -> Self
    where
        F: Fn(&mut FakeDom) + Send + Sync + 'static,
    {
        self.reactions
            .entry((selector.to_string(), index))
            .or_default()
            .push(Arc::new(reaction));
        self
    }

    /// Run `reaction` when the viewport is set to `viewport`
    pub fn on_viewport<F>(mut self, viewport: Viewport, reaction: F) -> Self
    where
        F: Fn(&mut FakeDom) + Send + Sync + 'static,
    {
        self.viewport_reactions.push((viewport, Arc::new(reaction)));
        self
    }

    /// Every query touching `selector` fails with a driver error
    pub fn fail_on(mut self, selector: &str) -> Self {
        self.faulty.insert(selector.to_string());
        self
    }

    pub fn console_on_reload(mut self, messages: Vec<ConsoleMessage>) -> Self {
        self.console_on_reload = messages;
        self
    }

    /// The state a click on `selector[index]` would leave, for assertions
    pub fn dom(&self) -> &FakeDom {
        &self.dom
    }
}

/// In-memory page handle
pub struct FakePage {
    routes: Vec<(String, FakeSite)>,
    current: Option<FakeSite>,
    console: Option<ConsoleFeed>,
    viewport: Viewport,
    usable_for: Option<usize>,
    visited: Vec<String>,
    clicks: Vec<(String, usize)>,
}

impl Default for FakePage {
    fn default() -> Self {
        Self::new()
    }
}

impl FakePage {
    /// An empty page answering 200 for every URL
    pub fn new() -> Self {
        Self::serving(FakeSite::default())
    }

    /// Serve `site` for every URL; it is also loaded right away
    pub fn serving(site: FakeSite) -> Self {
        Self {
            routes: vec![(String::new(), site.clone())],
            current: Some(site),
            console: None,
            viewport: Viewport::DESKTOP,
            usable_for: None,
            visited: Vec::new(),
            clicks: Vec::new(),
        }
    }

    /// Serve a different site per locator (matched as a URL suffix).
    /// Unrouted URLs answer 404.
    pub fn routed(routes: Vec<(&str, FakeSite)>) -> Self {
        Self {
            routes: routes.into_iter().map(|(k, s)| (k.to_string(), s)).collect(),
            current: None,
            console: None,
            viewport: Viewport::DESKTOP,
            usable_for: None,
            visited: Vec::new(),
            clicks: Vec::new(),
        }
    }

    /// Report the session unusable once `n` navigations have happened
    pub fn usable_for(mut self, n: usize) -> Self {
        self.usable_for = Some(n);
        self
    }

    pub fn visited(&self) -> &[String] {
        &self.visited
    }

    pub fn clicks(&self) -> &[(String, usize)] {
        &self.clicks
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    pub fn dom(&self) -> Option<&FakeDom> {
        self.current.as_ref().map(|s| &s.dom)
    }

    fn site(&self, selector: &str) -> HandleResult<&FakeSite> {
        let site = self.current.as_ref().ok_or(HandleError::SessionClosed)?;
        if site.faulty.contains(selector) {
            return Err(HandleError::Driver(format!("query {} failed", selector)));
        }
        Ok(site)
    }

    fn element(&self, selector: &str, index: usize) -> HandleResult<Option<&FakeElement>> {
        Ok(self.site(selector)?.dom.get(selector, index))
    }

    fn load(&mut self, url: &str) -> HandleResult<Navigation> {
        let route = self
            .routes
            .iter()
            .filter(|(key, _)| url.ends_with(key.as_str()))
            .max_by_key(|(key, _)| key.len())
            .map(|(_, site)| site.clone());

        match route {
            Some(site) => {
                if let Some(message) = &site.navigation_panic {
                    panic!("{}", message);
                }
                if let Some(err) = &site.navigation_error {
                    let err = err.clone();
                    self.current = None;
                    return Err(err);
                }
                let status = site.status;
                self.current = Some(site);
                Ok(Navigation { status, url: url.to_string() })
            }
            None => {
                self.current = Some(FakeSite::default().status(404));
                Ok(Navigation { status: 404, url: url.to_string() })
            }
        }
    }
}

#[async_trait]
impl PageHandle for FakePage {
    async fn navigate(&mut self, url: &str, _wait: WaitPolicy, _timeout: Duration) -> HandleResult<Navigation> {
        self.visited.push(url.to_string());
        self.load(url)
    }

    async fn reload(&mut self, _wait: WaitPolicy, _timeout: Duration) -> HandleResult<Navigation> {
        let url = self.visited.last().cloned().unwrap_or_default();
        let nav = self.load(&url)?;
        let messages = self
            .current
            .as_ref()
            .map(|s| s.console_on_reload.clone())
            .unwrap_or_default();
        if let Some(feed) = &self.console {
            for message in messages {
                if !feed.publish(message) {
                    self.console = None;
                    break;
                }
            }
        }
        Ok(nav)
    }

    async fn title(&mut self) -> HandleResult<String> {
        Ok(self.site("title")?.title.clone())
    }

    async fn count(&mut self, selector: &str) -> HandleResult<usize> {
        Ok(self.site(selector)?.dom.elements.get(selector).map(Vec::len).unwrap_or(0))
    }

    async fn text(&mut self, selector: &str, index: usize) -> HandleResult<Option<String>> {
        Ok(self.element(selector, index)?.map(|el| el.text.clone()))
    }

    async fn inner_text(&mut self, selector: &str) -> HandleResult<String> {
        Ok(self
            .element(selector, 0)?
            .filter(|el| !el.hidden)
            .map(|el| el.text.clone())
            .unwrap_or_default())
    }

    async fn attribute(&mut self, selector: &str, index: usize, name: &str) -> HandleResult<Option<String>> {
        Ok(self.element(selector, index)?.and_then(|el| el.attrs.get(name).cloned()))
    }

    async fn closest_attribute(
        &mut self,
        selector: &str,
        index: usize,
        ancestor: &str,
        name: &str,
    ) -> HandleResult<Option<String>> {
        let site = self.site(selector)?;
        let mut cursor = Some((selector.to_string(), index));
        while let Some((sel, idx)) = cursor {
            let Some(el) = site.dom.get(&sel, idx) else {
                return Ok(None);
            };
            if sel == ancestor {
                return Ok(el.attrs.get(name).cloned());
            }
            cursor = el.parent.clone();
        }
        Ok(None)
    }

    async fn is_visible(&mut self, selector: &str, index: usize) -> HandleResult<bool> {
        Ok(self.element(selector, index)?.map(|el| !el.hidden).unwrap_or(false))
    }

    async fn has_property(&mut self, selector: &str, index: usize, property: &str) -> HandleResult<bool> {
        Ok(self
            .element(selector, index)?
            .map(|el| el.properties.contains(property))
            .unwrap_or(false))
    }

    async fn metrics(&mut self, selector: &str, index: usize) -> HandleResult<Option<BoxMetrics>> {
        Ok(self
            .element(selector, index)?
            .map(|el| el.metrics.unwrap_or_default()))
    }

    async fn click(&mut self, selector: &str, index: usize) -> HandleResult<()> {
        match self.element(selector, index)? {
            None => {
                return Err(HandleError::ElementNotFound {
                    selector: selector.to_string(),
                    index,
                })
            }
            Some(el) if el.hidden => {
                return Err(HandleError::Timeout {
                    what: format!("{}[{}] to become visible", selector, index),
                    timeout_ms: 0,
                })
            }
            Some(_) => {}
        }

        self.clicks.push((selector.to_string(), index));
        if let Some(site) = self.current.as_mut() {
            let reactions = site
                .reactions
                .get(&(selector.to_string(), index))
                .cloned()
                .unwrap_or_default();
            for reaction in reactions {
                reaction(&mut site.dom);
            }
        }
        Ok(())
    }

    async fn find_by_text(&mut self, selector: &str, text: &str) -> HandleResult<Option<usize>> {
        Ok(self
            .site(selector)?
            .dom
            .elements
            .get(selector)
            .and_then(|els| els.iter().position(|el| el.text.contains(text))))
    }

    async fn ids(&mut self, selector: &str) -> HandleResult<Vec<String>> {
        Ok(self
            .site(selector)?
            .dom
            .elements
            .get(selector)
            .map(|els| {
                els.iter()
                    .map(|el| el.attrs.get("id").cloned().unwrap_or_default())
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn storage_item(&mut self, key: &str) -> HandleResult<Option<String>> {
        let site = self.current.as_ref().ok_or(HandleError::SessionClosed)?;
        Ok(site.dom.storage.get(key).cloned())
    }

    async fn set_viewport(&mut self, viewport: Viewport) -> HandleResult<()> {
        self.viewport = viewport;
        if let Some(site) = self.current.as_mut() {
            let reactions: Vec<_> = site
                .viewport_reactions
                .iter()
                .filter(|(v, _)| *v == viewport)
                .map(|(_, r)| r.clone())
                .collect();
            for reaction in reactions {
                reaction(&mut site.dom);
            }
        }
        Ok(())
    }

    async fn subscribe_console(&mut self, capacity: usize) -> HandleResult<ConsoleSubscription> {
        let (feed, subscription) = ConsoleSubscription::bounded(capacity);
        self.console = Some(feed);
        Ok(subscription)
    }

    async fn is_usable(&mut self) -> bool {
        match self.usable_for {
            Some(n) => self.visited.len() < n,
            None => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handle::Condition;
    use crate::config::Settle;

    #[tokio::test]
    async fn test_click_runs_reactions() {
        let site = FakeSite::new()
            .elements(".nav-tab", 2, FakeElement::new().class("nav-tab"))
            .on_click(".nav-tab", 1, |dom| dom.activate_exclusive(".nav-tab", 1, "active"));
        let mut page = FakePage::serving(site);

        assert!(!page.has_class(".nav-tab", 1, "active").await.unwrap());
        page.click(".nav-tab", 1).await.unwrap();
        assert!(page
            .wait_for(&Condition::class_present(".nav-tab", 1, "active"), Settle::IMMEDIATE)
            .await
            .unwrap());
        assert_eq!(page.clicks(), [(".nav-tab".to_string(), 1)]);
    }

    #[tokio::test]
    async fn test_routes_and_unrouted_404() {
        let mut page = FakePage::routed(vec![("a.html", FakeSite::new().title("A"))]);
        let nav = page
            .navigate("http://h/a.html", WaitPolicy::NetworkIdle, Duration::ZERO)
            .await
            .unwrap();
        assert_eq!(nav.status, 200);
        assert_eq!(page.title().await.unwrap(), "A");

        let nav = page
            .navigate("http://h/b.html", WaitPolicy::NetworkIdle, Duration::ZERO)
            .await
            .unwrap();
        assert_eq!(nav.status, 404);
    }

    #[tokio::test]
    async fn test_closest_attribute_walks_parents() {
        let site = FakeSite::new()
            .element(".problem-type", FakeElement::new().class("problem-type collapsed"))
            .element(".problem-type-header", FakeElement::new().child_of(".problem-type", 0));
        let mut page = FakePage::serving(site);
        let class = page
            .closest_attribute(".problem-type-header", 0, ".problem-type", "class")
            .await
            .unwrap();
        assert_eq!(class.as_deref(), Some("problem-type collapsed"));
    }
}
