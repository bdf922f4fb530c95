//! uiprobe core
//!
//! Drives a single browser page through an ordered battery of probes for
//! every page in a catalog and rolls the outcomes up into page and run
//! reports.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                         Harness                             │
//! │    for each PageConfig (catalog order)                      │
//! │      └── PageRunner::run(handle, config) -> PageReport      │
//! │            ├── navigate (gate: 1.0 / 1.1)                   │
//! │            └── ProbeGroup::run (isolated, fixed order)      │
//! │                  ├── Setup (optional)                       │
//! │                  └── Probe* -> Emitter -> Outcome*          │
//! │    RunReportBuilder::seal() -> RunReport (Summary)          │
//! ├─────────────────────────────────────────────────────────────┤
//! │  ReportSink                                                 │
//! │    ├── ConsoleSink   render(RunReport) -> text              │
//! │    └── JsonFileSink  to_document(RunReport) -> JSON         │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! The browser itself is behind the [`PageHandle`] trait; this crate never
//! talks to a browser directly.

pub mod battery;
pub mod catalog;
pub mod config;
pub mod error;
pub mod handle;
pub mod harness;
pub mod outcome;
pub mod page;
pub mod probe;
pub mod report;
pub mod sink;
#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use catalog::{Catalog, PageConfig};
pub use config::{HarnessConfig, ProbeSettings, Settle, StatusThresholds, Timing, Viewport};
pub use error::{HarnessError, HarnessResult};
pub use handle::{Condition, HandleError, HandleResult, PageHandle};
pub use harness::Harness;
pub use outcome::{Category, Detail, Outcome};
pub use page::PageRunner;
pub use probe::{Emitter, Probe, ProbeContext, ProbeError, ProbeGroup, Setup};
pub use report::{PageReport, PageStatus, RunReport, RunReportBuilder, Summary};
pub use sink::{ConsoleSink, JsonFileSink, ReportSink};
