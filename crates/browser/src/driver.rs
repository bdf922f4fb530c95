//! Wire protocol of the node driver
//!
//! The driver is a small Playwright script that keeps one page open and
//! answers commands read line by line from stdin. Every line in either
//! direction is one JSON object.
//!
//! ```text
//! -> {"id":7,"op":"count","selector":".nav-tab"}
//! <- {"kind":"response","id":7,"ok":true,"value":7}
//! <- {"kind":"console","level":"error","text":"Uncaught TypeError: ..."}
//! ```

use serde::{Deserialize, Serialize};
use uiprobe_core::handle::{ConsoleMessage, HandleError};

/// Commands understood by [`DRIVER_SCRIPT`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Command {
    Navigate { url: String, wait_until: &'static str, timeout_ms: u64 },
    Reload { wait_until: &'static str, timeout_ms: u64 },
    Title,
    Count { selector: String },
    Text { selector: String, index: usize },
    InnerText { selector: String },
    Attribute { selector: String, index: usize, name: String },
    ClosestAttribute { selector: String, index: usize, ancestor: String, name: String },
    Visible { selector: String, index: usize },
    HasProperty { selector: String, index: usize, property: String },
    Metrics { selector: String, index: usize },
    Click { selector: String, index: usize },
    FindByText { selector: String, text: String },
    Ids { selector: String },
    StorageItem { key: String },
    SetViewport { width: u32, height: u32 },
    Close,
}

impl Command {
    /// Every op name, in declaration order
    pub const OPS: [&'static str; 17] = [
        "navigate",
        "reload",
        "title",
        "count",
        "text",
        "inner_text",
        "attribute",
        "closest_attribute",
        "visible",
        "has_property",
        "metrics",
        "click",
        "find_by_text",
        "ids",
        "storage_item",
        "set_viewport",
        "close",
    ];

    pub fn op(&self) -> &'static str {
        match self {
            Command::Navigate { .. } => "navigate",
            Command::Reload { .. } => "reload",
            Command::Title => "title",
            Command::Count { .. } => "count",
            Command::Text { .. } => "text",
            Command::InnerText { .. } => "inner_text",
            Command::Attribute { .. } => "attribute",
            Command::ClosestAttribute { .. } => "closest_attribute",
            Command::Visible { .. } => "visible",
            Command::HasProperty { .. } => "has_property",
            Command::Metrics { .. } => "metrics",
            Command::Click { .. } => "click",
            Command::FindByText { .. } => "find_by_text",
            Command::Ids { .. } => "ids",
            Command::StorageItem { .. } => "storage_item",
            Command::SetViewport { .. } => "set_viewport",
            Command::Close => "close",
        }
    }

    /// Short human-readable form for logs and timeout errors
    pub fn describe(&self) -> String {
        match self {
            Command::Navigate { url, .. } => format!("navigate {}", url),
            Command::Reload { .. } => "reload".to_string(),
            Command::Count { selector }
            | Command::InnerText { selector }
            | Command::Ids { selector } => format!("{} {}", self.op(), selector),
            Command::Text { selector, index }
            | Command::Attribute { selector, index, .. }
            | Command::ClosestAttribute { selector, index, .. }
            | Command::Visible { selector, index }
            | Command::HasProperty { selector, index, .. }
            | Command::Metrics { selector, index }
            | Command::Click { selector, index } => {
                format!("{} {}[{}]", self.op(), selector, index)
            }
            Command::FindByText { selector, text } => format!("find_by_text {} '{}'", selector, text),
            Command::StorageItem { key } => format!("storage_item {}", key),
            Command::SetViewport { width, height } => format!("set_viewport {}x{}", width, height),
            Command::Title | Command::Close => self.op().to_string(),
        }
    }

    /// Navigations carry their own budget
    pub fn own_timeout_ms(&self) -> Option<u64> {
        match self {
            Command::Navigate { timeout_ms, .. } | Command::Reload { timeout_ms, .. } => Some(*timeout_ms),
            _ => None,
        }
    }
}

/// A command with its correlation id, as written to the driver
#[derive(Debug, Serialize)]
pub struct Envelope<'a> {
    pub id: u64,
    #[serde(flatten)]
    pub command: &'a Command,
}

/// How the driver classified a failed command
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    Timeout,
    NotFound,
    Protocol,
    #[default]
    #[serde(other)]
    Driver,
}

/// One line written by the driver
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DriverEvent {
    /// Browser launched and page open
    Ready,
    Response {
        id: u64,
        ok: bool,
        #[serde(default)]
        value: serde_json::Value,
        #[serde(default)]
        error: Option<String>,
        #[serde(default)]
        error_kind: FailureKind,
    },
    Console(ConsoleMessage),
    /// The driver gave up and is about to exit
    Fatal { error: String },
}

impl DriverEvent {
    pub fn parse(line: &str) -> serde_json::Result<Self> {
        serde_json::from_str(line)
    }
}

/// Map a failed response onto the handle's error vocabulary
pub fn failure(command: &Command, kind: FailureKind, message: String, action_timeout_ms: u64) -> HandleError {
    match (command, kind) {
        (Command::Navigate { url, .. }, _) => HandleError::Navigation { url: url.clone(), reason: message },
        (Command::Reload { .. }, _) => HandleError::Navigation { url: "(reload)".to_string(), reason: message },
        (Command::Click { selector, index }, FailureKind::NotFound) => HandleError::ElementNotFound {
            selector: selector.clone(),
            index: *index,
        },
        (_, FailureKind::Timeout) => HandleError::Timeout {
            what: command.describe(),
            timeout_ms: action_timeout_ms,
        },
        (_, FailureKind::Protocol) => HandleError::Protocol(message),
        _ => HandleError::Driver(message),
    }
}

/// Environment the driver reads its launch options from
pub const ENV_BROWSER: &str = "UIPROBE_BROWSER";
pub const ENV_HEADLESS: &str = "UIPROBE_HEADLESS";
pub const ENV_WIDTH: &str = "UIPROBE_WIDTH";
pub const ENV_HEIGHT: &str = "UIPROBE_HEIGHT";
pub const ENV_ACTION_TIMEOUT: &str = "UIPROBE_ACTION_TIMEOUT_MS";

pub const DRIVER_SCRIPT: &str = r#"'use strict';
const readline = require('readline');
const playwright = require('playwright');

const engine = process.env.UIPROBE_BROWSER || 'chromium';
const headless = process.env.UIPROBE_HEADLESS !== '0';
const width = parseInt(process.env.UIPROBE_WIDTH || '1280', 10);
const height = parseInt(process.env.UIPROBE_HEIGHT || '800', 10);
const actionTimeout = parseInt(process.env.UIPROBE_ACTION_TIMEOUT_MS || '5000', 10);

function emit(message) {
  process.stdout.write(JSON.stringify(message) + '\n');
}

function kindOf(err) {
  if (err && err.name === 'TimeoutError') return 'timeout';
  if (err && err.name === 'NotFound') return 'not_found';
  return 'driver';
}

(async () => {
  const browser = await playwright[engine].launch({ headless });
  const context = await browser.newContext({ viewport: { width, height } });
  const page = await context.newPage();
  page.setDefaultTimeout(actionTimeout);
  page.on('console', (msg) => emit({ kind: 'console', level: msg.type(), text: msg.text() }));
  page.on('pageerror', (err) => emit({ kind: 'console', level: 'error', text: String(err) }));

  const nth = (c) => page.locator(c.selector).nth(c.index || 0);
  const exists = async (c) => (await page.locator(c.selector).count()) > (c.index || 0);
  const navigated = (resp) => ({ status: resp ? resp.status() : 0, url: page.url() });

  const ops = {
    navigate: async (c) => navigated(await page.goto(c.url, { waitUntil: c.wait_until, timeout: c.timeout_ms })),
    reload: async (c) => navigated(await page.reload({ waitUntil: c.wait_until, timeout: c.timeout_ms })),
    title: async () => page.title(),
    count: async (c) => page.locator(c.selector).count(),
    text: async (c) => ((await exists(c)) ? nth(c).textContent() : null),
    inner_text: async (c) => ((await exists(c)) ? nth(c).innerText() : ''),
    attribute: async (c) => ((await exists(c)) ? nth(c).getAttribute(c.name) : null),
    closest_attribute: async (c) =>
      (await exists(c))
        ? nth(c).evaluate((el, a) => {
            const found = el.closest(a.ancestor);
            return found ? found.getAttribute(a.name) : null;
          }, { ancestor: c.ancestor, name: c.name })
        : null,
    visible: async (c) => ((await exists(c)) ? nth(c).isVisible() : false),
    has_property: async (c) =>
      (await exists(c)) ? nth(c).evaluate((el, p) => el[p] !== undefined, c.property) : false,
    metrics: async (c) =>
      (await exists(c))
        ? nth(c).evaluate((el) => ({
            scroll_width: el.scrollWidth,
            client_width: el.clientWidth,
            scroll_height: el.scrollHeight,
            client_height: el.clientHeight,
          }))
        : null,
    click: async (c) => {
      if (!(await exists(c))) {
        const err = new Error(`no element matches ${c.selector}[${c.index}]`);
        err.name = 'NotFound';
        throw err;
      }
      await nth(c).click();
      return null;
    },
    find_by_text: async (c) => {
      const texts = await page.locator(c.selector).allTextContents();
      const index = texts.findIndex((t) => t.includes(c.text));
      return index < 0 ? null : index;
    },
    ids: async (c) => page.locator(c.selector).evaluateAll((els) => els.map((el) => el.id)),
    storage_item: async (c) => page.evaluate((key) => window.localStorage.getItem(key), c.key),
    set_viewport: async (c) => {
      await page.setViewportSize({ width: c.width, height: c.height });
      return null;
    },
    close: async () => {
      await browser.close();
      return null;
    },
  };

  emit({ kind: 'ready' });

  const input = readline.createInterface({ input: process.stdin });
  for await (const line of input) {
    if (!line.trim()) continue;
    let command;
    try {
      command = JSON.parse(line);
    } catch (err) {
      emit({ kind: 'response', id: 0, ok: false, error: 'malformed command', error_kind: 'protocol' });
      continue;
    }
    const op = ops[command.op];
    if (!op) {
      emit({ kind: 'response', id: command.id, ok: false, error: `unknown op ${command.op}`, error_kind: 'protocol' });
      continue;
    }
    try {
      const value = await op(command);
      emit({ kind: 'response', id: command.id, ok: true, value: value === undefined ? null : value });
    } catch (err) {
      emit({ kind: 'response', id: command.id, ok: false, error: String((err && err.message) || err), error_kind: kindOf(err) });
    }
    if (command.op === 'close') break;
  }
  process.exit(0);
})().catch((err) => {
  emit({ kind: 'fatal', error: String((err && err.stack) || err) });
  process.exit(1);
});
"#;
