//! A [`PageHandle`] backed by a long-lived Playwright driver process

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::{Command as StdCommand, Stdio};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use tempfile::TempDir;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, ChildStdin, ChildStdout, Command as TokioCommand};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tracing::{debug, error, info, warn};

use uiprobe_core::config::{BrowserKind, HarnessConfig, Viewport};
use uiprobe_core::handle::{
    BoxMetrics, ConsoleFeed, ConsoleSubscription, HandleError, HandleResult, Navigation, PageHandle,
    WaitPolicy,
};

use crate::driver::{self, Command, DriverEvent, Envelope};
use crate::error::{BrowserError, BrowserResult};

/// Launch options for a session
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// The node executable
    pub node: PathBuf,
    pub browser: BrowserKind,
    pub headless: bool,
    pub viewport: Viewport,
    /// Playwright's own timeout for clicks and locator waits
    pub action_timeout: Duration,
    /// Upper bound for any command that has no budget of its own
    pub command_timeout: Duration,
    /// How long the browser may take to come up
    pub launch_timeout: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            node: PathBuf::from("node"),
            browser: BrowserKind::Chromium,
            headless: true,
            viewport: Viewport::DESKTOP,
            action_timeout: Duration::from_millis(5000),
            command_timeout: Duration::from_secs(45),
            launch_timeout: Duration::from_secs(60),
        }
    }
}

impl SessionConfig {
    pub fn from_harness(config: &HarnessConfig) -> Self {
        Self {
            browser: config.browser,
            headless: config.headless,
            viewport: config.viewport,
            command_timeout: config.timing.command_timeout(),
            ..Self::default()
        }
    }
}

/// Check that node can be run
pub fn check_node_installed(node: &Path) -> BrowserResult<()> {
    let status = StdCommand::new(node)
        .arg("--version")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status();

    match status {
        Ok(status) if status.success() => Ok(()),
        _ => Err(BrowserError::NodeNotFound),
    }
}

/// Check if Playwright is installed
pub fn check_playwright_installed() -> BrowserResult<()> {
    let status = StdCommand::new("npx")
        .args(["playwright", "--version"])
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status();

    match status {
        Ok(status) if status.success() => Ok(()),
        _ => Err(BrowserError::PlaywrightNotFound),
    }
}

/// The driver runs from a temp dir, so point module resolution back at
/// the project's `node_modules`.
fn node_path() -> OsString {
    let mut paths = Vec::new();
    if let Ok(cwd) = std::env::current_dir() {
        paths.push(cwd.join("node_modules"));
    }
    if let Some(existing) = std::env::var_os("NODE_PATH") {
        paths.extend(std::env::split_paths(&existing));
    }
    std::env::join_paths(paths).unwrap_or_default()
}

pub struct PlaywrightSession {
    child: Child,
    stdin: ChildStdin,
    events: mpsc::UnboundedReceiver<DriverEvent>,
    console: Arc<Mutex<Option<ConsoleFeed>>>,
    closed: Arc<AtomicBool>,
    reader: JoinHandle<()>,
    next_id: u64,
    config: SessionConfig,
    _script_dir: TempDir,
}

impl PlaywrightSession {
    /// Start the driver and wait until the browser page is open
    pub async fn launch(config: SessionConfig) -> BrowserResult<Self> {
        check_node_installed(&config.node)?;
        check_playwright_installed()?;

        let script_dir = tempfile::tempdir()?;
        let script_path = script_dir.path().join("uiprobe-driver.js");
        std::fs::write(&script_path, driver::DRIVER_SCRIPT)?;
        debug!("Driver script written to {}", script_path.display());

        info!(
            "Launching {} ({}, {}x{})",
            config.browser.as_str(),
            if config.headless { "headless" } else { "headed" },
            config.viewport.width,
            config.viewport.height
        );

        let mut child = TokioCommand::new(&config.node)
            .arg(&script_path)
            .env("NODE_PATH", node_path())
            .env(driver::ENV_BROWSER, config.browser.as_str())
            .env(driver::ENV_HEADLESS, if config.headless { "1" } else { "0" })
            .env(driver::ENV_WIDTH, config.viewport.width.to_string())
            .env(driver::ENV_HEIGHT, config.viewport.height.to_string())
            .env(driver::ENV_ACTION_TIMEOUT, config.action_timeout.as_millis().to_string())
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| BrowserError::Driver(format!("Failed to spawn {}: {}", config.node.display(), e)))?;

        let stdin = child.stdin.take().ok_or_else(|| BrowserError::Driver("driver stdin unavailable".into()))?;
        let stdout = child.stdout.take().ok_or_else(|| BrowserError::Driver("driver stdout unavailable".into()))?;
        if let Some(stderr) = child.stderr.take() {
            tokio::spawn(async move {
                let mut lines = BufReader::new(stderr).lines();
                while let Ok(Some(line)) = lines.next_line().await {
                    debug!("driver: {}", line);
                }
            });
        }

        let (tx, mut events) = mpsc::unbounded_channel();
        let console = Arc::new(Mutex::new(None));
        let closed = Arc::new(AtomicBool::new(false));
        let reader = tokio::spawn(read_events(stdout, tx, console.clone(), closed.clone()));

        let launch_ms = config.launch_timeout.as_millis() as u64;
        let ready = timeout(config.launch_timeout, async {
            loop {
                match events.recv().await {
                    Some(DriverEvent::Ready) => return Ok(()),
                    Some(DriverEvent::Fatal { error }) => return Err(BrowserError::Driver(error)),
                    Some(other) => debug!("ignoring {:?} before ready", other),
                    None => return Err(BrowserError::Driver("driver exited before it was ready".into())),
                }
            }
        })
        .await;

        match ready {
            Ok(Ok(())) => {}
            Ok(Err(e)) => return Err(e),
            Err(_) => return Err(BrowserError::DriverStartup(launch_ms)),
        }
        info!("Browser ready");

        Ok(Self {
            child,
            stdin,
            events,
            console,
            closed,
            reader,
            next_id: 0,
            config,
            _script_dir: script_dir,
        })
    }

    /// Ask the driver to close the browser, then reap the process
    pub async fn close(mut self) -> BrowserResult<()> {
        if !self.closed.load(Ordering::SeqCst) {
            if let Err(e) = self.request(Command::Close).await {
                debug!("close command failed: {}", e);
            }
        }
        match timeout(Duration::from_secs(5), self.child.wait()).await {
            Ok(Ok(status)) => debug!("driver exited with {}", status),
            Ok(Err(e)) => warn!("waiting for driver failed: {}", e),
            Err(_) => self.terminate(),
        }
        Ok(())
    }

    fn terminate(&mut self) {
        #[cfg(unix)]
        {
            use nix::sys::signal::{kill, Signal};
            use nix::unistd::Pid;

            if let Some(pid) = self.child.id() {
                debug!("Sending SIGTERM to driver (pid: {})", pid);
                let _ = kill(Pid::from_raw(pid as i32), Signal::SIGTERM);
            }
        }
        let _ = self.child.start_kill();
    }

    fn mark_closed(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }

    /// Send one command and wait for its response
    async fn request(&mut self, command: Command) -> HandleResult<serde_json::Value> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(HandleError::SessionClosed);
        }

        self.next_id += 1;
        let id = self.next_id;
        let mut line = serde_json::to_string(&Envelope { id, command: &command })
            .map_err(|e| HandleError::Protocol(e.to_string()))?;
        line.push('\n');
        debug!(id, "-> {}", command.describe());

        let written = async {
            self.stdin.write_all(line.as_bytes()).await?;
            self.stdin.flush().await
        }
        .await;
        if let Err(e) = written {
            warn!("driver stdin closed: {}", e);
            self.mark_closed();
            return Err(HandleError::SessionClosed);
        }

        let budget = command
            .own_timeout_ms()
            .map(|ms| Duration::from_millis(ms) + self.config.action_timeout)
            .unwrap_or(self.config.command_timeout)
            .max(self.config.action_timeout);

        loop {
            let event = match timeout(budget, self.events.recv()).await {
                Ok(event) => event,
                Err(_) => {
                    return Err(HandleError::Timeout {
                        what: command.describe(),
                        timeout_ms: budget.as_millis() as u64,
                    })
                }
            };

            match event {
                None => {
                    self.mark_closed();
                    return Err(HandleError::SessionClosed);
                }
                Some(DriverEvent::Response { id: got, .. }) if got != id => {
                    // answer to a command that already timed out
                    debug!("discarding stale response {}", got);
                }
                Some(DriverEvent::Response { ok: true, value, .. }) => return Ok(value),
                Some(DriverEvent::Response { error, error_kind, .. }) => {
                    let message = error.unwrap_or_else(|| "unknown driver error".to_string());
                    return Err(driver::failure(
                        &command,
                        error_kind,
                        message,
                        self.config.action_timeout.as_millis() as u64,
                    ));
                }
                Some(DriverEvent::Fatal { error }) => {
                    error!("driver failed: {}", error);
                    self.mark_closed();
                    return Err(HandleError::Driver(error));
                }
                Some(other) => debug!("unexpected {:?}", other),
            }
        }
    }

    async fn query<T: DeserializeOwned>(&mut self, command: Command) -> HandleResult<T> {
        let op = command.op();
        let value = self.request(command).await?;
        serde_json::from_value(value).map_err(|e| HandleError::Protocol(format!("{} returned: {}", op, e)))
    }
}

/// Route driver output: console lines to the active subscription,
/// everything else to the waiting request.
async fn read_events(
    stdout: ChildStdout,
    tx: mpsc::UnboundedSender<DriverEvent>,
    console: Arc<Mutex<Option<ConsoleFeed>>>,
    closed: Arc<AtomicBool>,
) {
    let mut lines = BufReader::new(stdout).lines();
    loop {
        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => break,
            Err(e) => {
                warn!("reading driver output failed: {}", e);
                break;
            }
        };
        if line.trim().is_empty() {
            continue;
        }

        match DriverEvent::parse(&line) {
            Ok(DriverEvent::Console(message)) => {
                let mut feed = console.lock();
                if let Some(active) = feed.as_ref() {
                    if !active.publish(message) {
                        *feed = None;
                    }
                }
            }
            Ok(event) => {
                if tx.send(event).is_err() {
                    break;
                }
            }
            Err(e) => debug!("unparsable driver line ({}): {}", e, line),
        }
    }
    closed.store(true, Ordering::SeqCst);
    debug!("driver output closed");
}

#[async_trait]
impl PageHandle for PlaywrightSession {
    async fn navigate(&mut self, url: &str, wait: WaitPolicy, timeout: Duration) -> HandleResult<Navigation> {
        self.query(Command::Navigate {
            url: url.to_string(),
            wait_until: wait.as_str(),
            timeout_ms: timeout.as_millis() as u64,
        })
        .await
    }

    async fn reload(&mut self, wait: WaitPolicy, timeout: Duration) -> HandleResult<Navigation> {
        self.query(Command::Reload {
            wait_until: wait.as_str(),
            timeout_ms: timeout.as_millis() as u64,
        })
        .await
    }

    async fn title(&mut self) -> HandleResult<String> {
        self.query(Command::Title).await
    }

    async fn count(&mut self, selector: &str) -> HandleResult<usize> {
        self.query(Command::Count { selector: selector.to_string() }).await
    }

    async fn text(&mut self, selector: &str, index: usize) -> HandleResult<Option<String>> {
        self.query(Command::Text { selector: selector.to_string(), index }).await
    }

    async fn inner_text(&mut self, selector: &str) -> HandleResult<String> {
        self.query(Command::InnerText { selector: selector.to_string() }).await
    }

    async fn attribute(&mut self, selector: &str, index: usize, name: &str) -> HandleResult<Option<String>> {
        self.query(Command::Attribute {
            selector: selector.to_string(),
            index,
            name: name.to_string(),
        })
        .await
    }

    async fn closest_attribute(
        &mut self,
        selector: &str,
        index: usize,
        ancestor: &str,
        name: &str,
    ) -> HandleResult<Option<String>> {
        self.query(Command::ClosestAttribute {
            selector: selector.to_string(),
            index,
            ancestor: ancestor.to_string(),
            name: name.to_string(),
        })
        .await
    }

    async fn is_visible(&mut self, selector: &str, index: usize) -> HandleResult<bool> {
        self.query(Command::Visible { selector: selector.to_string(), index }).await
    }

    async fn has_property(&mut self, selector: &str, index: usize, property: &str) -> HandleResult<bool> {
        self.query(Command::HasProperty {
            selector: selector.to_string(),
            index,
            property: property.to_string(),
        })
        .await
    }

    async fn metrics(&mut self, selector: &str, index: usize) -> HandleResult<Option<BoxMetrics>> {
        self.query(Command::Metrics { selector: selector.to_string(), index }).await
    }

    async fn click(&mut self, selector: &str, index: usize) -> HandleResult<()> {
        self.request(Command::Click { selector: selector.to_string(), index }).await?;
        Ok(())
    }

    async fn find_by_text(&mut self, selector: &str, text: &str) -> HandleResult<Option<usize>> {
        self.query(Command::FindByText {
            selector: selector.to_string(),
            text: text.to_string(),
        })
        .await
    }

    async fn ids(&mut self, selector: &str) -> HandleResult<Vec<String>> {
        self.query(Command::Ids { selector: selector.to_string() }).await
    }

    async fn storage_item(&mut self, key: &str) -> HandleResult<Option<String>> {
        self.query(Command::StorageItem { key: key.to_string() }).await
    }

    async fn set_viewport(&mut self, viewport: Viewport) -> HandleResult<()> {
        self.request(Command::SetViewport {
            width: viewport.width,
            height: viewport.height,
        })
        .await?;
        Ok(())
    }

    async fn subscribe_console(&mut self, capacity: usize) -> HandleResult<ConsoleSubscription> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(HandleError::SessionClosed);
        }
        let (feed, subscription) = ConsoleSubscription::bounded(capacity);
        *self.console.lock() = Some(feed);
        Ok(subscription)
    }

    async fn is_usable(&mut self) -> bool {
        if self.closed.load(Ordering::SeqCst) {
            return false;
        }
        match self.child.try_wait() {
            Ok(None) => true,
            Ok(Some(status)) => {
                warn!("driver exited unexpectedly with {}", status);
                self.mark_closed();
                false
            }
            Err(_) => false,
        }
    }
}

impl Drop for PlaywrightSession {
    fn drop(&mut self) {
        self.reader.abort();
        if matches!(self.child.try_wait(), Ok(None)) {
            self.terminate();
        }
    }
}
