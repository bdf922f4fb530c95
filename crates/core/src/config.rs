//! Harness configuration

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{HarnessError, HarnessResult};

/// Top-level harness configuration, usually read from `uiprobe.toml`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HarnessConfig {
    /// Base URL page locators are resolved against
    pub base_url: String,

    /// Browser engine
    pub browser: BrowserKind,

    /// Run the browser without a window
    pub headless: bool,

    /// Maximum characters kept from a fault message
    pub fault_message_limit: usize,

    /// Console messages buffered per subscription
    pub console_capacity: usize,

    /// Where the structured report is written
    pub output: PathBuf,

    /// Desktop viewport; probes that resize restore this one
    pub viewport: Viewport,

    /// Settle intervals and timeouts
    pub timing: Timing,

    /// Page status thresholds
    pub thresholds: StatusThresholds,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8080".to_string(),
            browser: BrowserKind::Chromium,
            headless: true,
            fault_message_limit: 100,
            console_capacity: 256,
            output: PathBuf::from("test_results.json"),
            viewport: Viewport::DESKTOP,
            timing: Timing::default(),
            thresholds: StatusThresholds::default(),
        }
    }
}

impl HarnessConfig {
    /// Load configuration from file; a missing file yields the defaults
    pub fn load(path: &Path) -> HarnessResult<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            let config: Self = toml::from_str(&content)?;
            config.validate()?;
            Ok(config)
        } else {
            Ok(Self::default())
        }
    }

    pub fn validate(&self) -> HarnessResult<()> {
        if self.base_url.trim().is_empty() {
            return Err(HarnessError::InvalidConfig("base_url is empty".into()));
        }
        if self.console_capacity == 0 {
            return Err(HarnessError::InvalidConfig("console_capacity must be positive".into()));
        }
        if self.fault_message_limit == 0 {
            return Err(HarnessError::InvalidConfig("fault_message_limit must be positive".into()));
        }
        Ok(())
    }

    /// Save configuration to file
    pub fn save(&self, path: &Path) -> HarnessResult<()> {
        let content = toml::to_string_pretty(self)?;
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        std::fs::write(path, content)?;
        Ok(())
    }

    /// The subset handed to every probe
    pub fn probe_settings(&self) -> ProbeSettings {
        ProbeSettings {
            timing: self.timing.clone(),
            viewport: self.viewport,
            console_capacity: self.console_capacity,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BrowserKind {
    #[default]
    Chromium,
    Firefox,
    Webkit,
}

impl BrowserKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            BrowserKind::Chromium => "chromium",
            BrowserKind::Firefox => "firefox",
            BrowserKind::Webkit => "webkit",
        }
    }
}

impl std::str::FromStr for BrowserKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "chromium" | "chrome" => Ok(BrowserKind::Chromium),
            "firefox" => Ok(BrowserKind::Firefox),
            "webkit" | "safari" => Ok(BrowserKind::Webkit),
            other => Err(format!("unknown browser: {}", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

impl Viewport {
    pub const DESKTOP: Viewport = Viewport { width: 1280, height: 800 };
    pub const MOBILE: Viewport = Viewport { width: 375, height: 667 };
}

impl Default for Viewport {
    fn default() -> Self {
        Self::DESKTOP
    }
}

/// A bounded poll: check every `interval` until `timeout` has elapsed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Settle {
    pub interval: Duration,
    pub timeout: Duration,
}

impl Settle {
    /// Check exactly once, never sleep
    pub const IMMEDIATE: Settle = Settle {
        interval: Duration::ZERO,
        timeout: Duration::ZERO,
    };
}

/// Settle intervals, all in milliseconds
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Timing {
    /// Upper bound for a navigation or reload
    pub navigation_timeout_ms: u64,

    /// Fixed pause after a navigation so page scripts can initialize
    pub load_settle_ms: u64,

    /// Fixed pause after a reload before console output is read
    pub reload_settle_ms: u64,

    /// Poll budget for simple class toggles
    pub toggle_ms: u64,

    /// Poll budget for tab switches and accordion transitions
    pub transition_ms: u64,

    /// Poll interval for all settle waits
    pub poll_interval_ms: u64,

    /// Upper bound for any single driver command
    pub command_timeout_ms: u64,
}

impl Default for Timing {
    fn default() -> Self {
        Self {
            navigation_timeout_ms: 30_000,
            load_settle_ms: 2_000,
            reload_settle_ms: 2_000,
            toggle_ms: 500,
            transition_ms: 400,
            poll_interval_ms: 50,
            command_timeout_ms: 45_000,
        }
    }
}

impl Timing {
    /// No waiting at all; for in-memory page handles
    pub fn immediate() -> Self {
        Self {
            navigation_timeout_ms: 0,
            load_settle_ms: 0,
            reload_settle_ms: 0,
            toggle_ms: 0,
            transition_ms: 0,
            poll_interval_ms: 0,
            command_timeout_ms: 45_000,
        }
    }

    pub fn navigation_timeout(&self) -> Duration {
        Duration::from_millis(self.navigation_timeout_ms)
    }

    pub fn load_settle(&self) -> Duration {
        Duration::from_millis(self.load_settle_ms)
    }

    pub fn reload_settle(&self) -> Duration {
        Duration::from_millis(self.reload_settle_ms)
    }

    pub fn command_timeout(&self) -> Duration {
        Duration::from_millis(self.command_timeout_ms)
    }

    pub fn toggle(&self) -> Settle {
        self.settle(self.toggle_ms)
    }

    pub fn transition(&self) -> Settle {
        self.settle(self.transition_ms)
    }

    fn settle(&self, timeout_ms: u64) -> Settle {
        Settle {
            interval: Duration::from_millis(self.poll_interval_ms),
            timeout: Duration::from_millis(timeout_ms),
        }
    }
}

/// Failed-count thresholds for the derived page status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StatusThresholds {
    /// A page with more failures than this is broken
    pub broken_above: usize,
}

impl Default for StatusThresholds {
    fn default() -> Self {
        Self { broken_above: 3 }
    }
}

/// Run-wide settings visible to probes
#[derive(Debug, Clone)]
pub struct ProbeSettings {
    pub timing: Timing,
    pub viewport: Viewport,
    pub console_capacity: usize,
}

impl Default for ProbeSettings {
    fn default() -> Self {
        HarnessConfig::default().probe_settings()
    }
}

impl ProbeSettings {
    /// Settings that never sleep
    pub fn immediate() -> Self {
        Self {
            timing: Timing::immediate(),
            ..Self::default()
        }
    }
}
