//! `uiprobe render`: print a persisted run again

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Args;

use uiprobe_core::{ConsoleSink, HarnessConfig, JsonFileSink, ReportSink, RunReport};

#[derive(Args, Debug)]
pub struct RenderArgs {
    /// Results file written by `uiprobe run`
    #[arg(default_value = "test_results.json")]
    pub results: PathBuf,
}

/// Status thresholds come from the configuration, the outcomes from the file
pub fn load(args: &RenderArgs, config_path: &Path) -> Result<RunReport> {
    let config = HarnessConfig::load(config_path)
        .with_context(|| format!("loading configuration {}", config_path.display()))?;
    let run = JsonFileSink::load(&args.results, config.thresholds)
        .with_context(|| format!("reading results {}", args.results.display()))?;
    Ok(run)
}

pub fn execute(args: RenderArgs, config_path: &Path) -> Result<i32> {
    let run = load(&args, config_path)?;
    ConsoleSink::stdout().emit(&run)?;
    Ok(run.exit_code())
}
