//! uiprobe CLI
//!
//! Command-line front end: loads configuration and the page catalog, runs
//! the probe battery in a real browser and reports the verdict.

pub mod commands;
pub mod output;

/// Exit status for errors that stop a run before it produces a report
pub const EXIT_FATAL: i32 = 2;
