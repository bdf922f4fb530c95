//! uiprobe browser layer
//!
//! Implements [`uiprobe_core::PageHandle`] on top of Playwright and manages
//! the site server the pages are loaded from.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                    uiprobe-browser                           │
//! ├──────────────────────────────────────────────────────────────┤
//! │  ┌──────────────┐  ┌──────────────────┐  ┌───────────────┐   │
//! │  │  SiteServer  │  │ PlaywrightSession│  │    driver     │   │
//! │  │ (spawn/ready)│  │  (PageHandle)    │  │ (JSON lines)  │   │
//! │  └──────┬───────┘  └────────┬─────────┘  └───────┬───────┘   │
//! │         │                   │                    │           │
//! │         ▼                   ▼                    ▼           │
//! │  ┌──────────────┐  ┌────────────────────────────────────┐    │
//! │  │ sh -c <cmd>  │  │  node uiprobe-driver.js            │    │
//! │  │ static site  │◀─│  (Playwright, one page, stdin/out) │    │
//! │  └──────────────┘  └────────────────────────────────────┘    │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! Console output and page errors arrive on the same stream as command
//! responses and are routed to whichever console subscription is active.

pub mod driver;
pub mod error;
pub mod server;
pub mod session;

pub use error::{BrowserError, BrowserResult};
pub use server::{ServerConfig, SiteServer};
pub use session::{check_playwright_installed, PlaywrightSession, SessionConfig};
