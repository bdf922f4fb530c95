//! `uiprobe run`: drive the battery over the catalog in a real browser

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Args;
use tracing::{info, warn};

use uiprobe_browser::{PlaywrightSession, ServerConfig, SessionConfig, SiteServer};
use uiprobe_core::config::BrowserKind;
use uiprobe_core::{Catalog, ConsoleSink, Harness, HarnessConfig, JsonFileSink, PageConfig, ReportSink};

use crate::output;

#[derive(Args, Debug)]
pub struct RunArgs {
    /// Catalog file, or a directory of catalog files
    #[arg(default_value = "catalog")]
    pub catalog: PathBuf,

    /// Base URL the page locators are resolved against
    #[arg(long, env = "UIPROBE_BASE_URL")]
    pub base_url: Option<String>,

    /// Browser engine: chromium, firefox or webkit
    #[arg(long)]
    pub browser: Option<BrowserKind>,

    /// Show the browser window
    #[arg(long)]
    pub headed: bool,

    /// Only run these pages (repeatable); catalog order is kept
    #[arg(long = "page", value_name = "LOCATOR")]
    pub pages: Vec<String>,

    /// Where the structured results are written
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Command that serves the pages; `{port}` is replaced by the port
    #[arg(long, value_name = "CMD")]
    pub serve: Option<String>,

    /// Port for --serve (default: a free port)
    #[arg(long)]
    pub port: Option<u16>,

    /// Seconds to wait for --serve to answer
    #[arg(long, default_value = "30")]
    pub serve_timeout: u64,
}

/// Fold catalog and command-line values into the file configuration.
/// Command-line flags win over the catalog, the catalog over the file.
pub fn resolve(args: &RunArgs, mut config: HarnessConfig, catalog: &Catalog) -> HarnessConfig {
    if let Some(base_url) = &catalog.base_url {
        config.base_url = base_url.clone();
    }
    if let Some(base_url) = &args.base_url {
        config.base_url = base_url.clone();
    }
    if let Some(browser) = args.browser {
        config.browser = browser;
    }
    if args.headed {
        config.headless = false;
    }
    if let Some(output) = &args.output {
        config.output = output.clone();
    }
    config
}

fn load_pages(args: &RunArgs) -> Result<(Catalog, Vec<PageConfig>)> {
    let catalog = Catalog::load(&args.catalog)
        .with_context(|| format!("loading catalog {}", args.catalog.display()))?;
    let pages = catalog.select(&args.pages)?;
    Ok((catalog, pages))
}

pub async fn execute(args: RunArgs, config_path: &Path) -> Result<i32> {
    let file_config = HarnessConfig::load(config_path)
        .with_context(|| format!("loading configuration {}", config_path.display()))?;
    let (catalog, pages) = load_pages(&args)?;
    let mut config = resolve(&args, file_config, &catalog);

    let server = match &args.serve {
        Some(command) => {
            let server = SiteServer::spawn(ServerConfig {
                port: args.port,
                startup_timeout: Duration::from_secs(args.serve_timeout),
                ..ServerConfig::new(command.clone())
            })
            .await
            .context("starting site server")?;
            if args.base_url.is_none() {
                config.base_url = server.base_url().to_string();
            }
            output::print_info(&format!("Serving pages at {}", server.base_url()));
            Some(server)
        }
        None => None,
    };

    config.validate()?;
    info!("Testing {} page(s) at {}", pages.len(), config.base_url);

    let mut session = PlaywrightSession::launch(SessionConfig::from_harness(&config))
        .await
        .context("launching browser")?;

    let harness = Harness::new(&config);
    let result = harness.run(&mut session, &pages).await;

    if let Err(e) = session.close().await {
        warn!("closing browser failed: {}", e);
    }
    drop(server);

    let run = result?;

    output::print_banner("FINAL TEST SUMMARY");
    ConsoleSink::stdout().emit(&run)?;
    JsonFileSink::new(&config.output).emit(&run)?;

    if run.exit_code() == 0 {
        output::print_success("All checks passed");
    } else {
        output::print_warning(&format!("{} check(s) failed", run.summary().failed));
    }
    Ok(run.exit_code())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[derive(Parser)]
    struct Wrapper {
        #[command(flatten)]
        run: RunArgs,
    }

    fn args(argv: &[&str]) -> RunArgs {
        Wrapper::try_parse_from(std::iter::once("uiprobe").chain(argv.iter().copied()))
            .unwrap()
            .run
    }

    fn catalog(base_url: Option<&str>) -> Catalog {
        Catalog {
            base_url: base_url.map(String::from),
            pages: vec![PageConfig::new("a.html", "A")],
        }
    }

    #[test]
    fn test_flags_override_catalog_and_file() {
        let parsed = args(&["pages", "--base-url", "http://127.0.0.1:9000", "--browser", "firefox", "--headed"]);
        let config = resolve(&parsed, HarnessConfig::default(), &catalog(Some("http://catalog:1")));

        assert_eq!(config.base_url, "http://127.0.0.1:9000");
        assert_eq!(config.browser, BrowserKind::Firefox);
        assert!(!config.headless);
        assert_eq!(parsed.catalog, PathBuf::from("pages"));
    }

    #[test]
    fn test_catalog_base_url_beats_file() {
        let parsed = args(&[]);
        let config = resolve(&parsed, HarnessConfig::default(), &catalog(Some("http://catalog:1")));
        assert_eq!(config.base_url, "http://catalog:1");
        assert!(config.headless);

        let config = resolve(&parsed, HarnessConfig::default(), &catalog(None));
        assert_eq!(config.base_url, "http://localhost:8080");
    }

    #[test]
    fn test_page_selection_from_flags() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("unit.yaml");
        std::fs::write(
            &path,
            "pages:\n  - { locator: a.html, title: A }\n  - { locator: b.html, title: B }\n  - { locator: c.html, title: C }\n",
        )
        .unwrap();

        let parsed = args(&[path.to_str().unwrap(), "--page", "c.html", "--page", "a.html"]);
        let (_, pages) = load_pages(&parsed).unwrap();
        let locators: Vec<_> = pages.iter().map(|p| p.locator.as_str()).collect();
        assert_eq!(locators, ["a.html", "c.html"]);
    }

    #[test]
    fn test_unknown_browser_rejected() {
        assert!(Wrapper::try_parse_from(["uiprobe", "--browser", "lynx"]).is_err());
    }
}
