//! uiprobe - browser-driven UI verification for rendered course pages

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use uiprobe_cli::commands::{pages, render, run};
use uiprobe_cli::{output, EXIT_FATAL};

/// Probe rendered pages in a real browser and report a verdict
#[derive(Parser)]
#[command(name = "uiprobe")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Configuration file
    #[arg(long, default_value = "uiprobe.toml", global = true, env = "UIPROBE_CONFIG")]
    config: PathBuf,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the probe battery over the catalog
    Run(run::RunArgs),

    /// Print a persisted results file
    Render(render::RenderArgs),

    /// List the pages of a catalog
    Pages(pages::PagesArgs),
}

async fn execute(cli: Cli) -> anyhow::Result<i32> {
    match cli.command {
        Commands::Run(args) => run::execute(args, &cli.config).await,
        Commands::Render(args) => render::execute(args, &cli.config),
        Commands::Pages(args) => pages::execute(args),
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level)),
        )
        .with_target(false)
        .init();

    let code = match execute(cli).await {
        Ok(code) => code,
        Err(e) => {
            output::print_error(&format!("{:#}", e));
            EXIT_FATAL
        }
    };
    std::process::exit(code);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_run_with_global_flags() {
        let cli = Cli::try_parse_from([
            "uiprobe", "run", "catalog/unit1.yaml", "-v", "--config", "ci.toml", "--serve", "node server.js",
        ])
        .unwrap();
        assert!(cli.verbose);
        assert_eq!(cli.config, PathBuf::from("ci.toml"));
        match cli.command {
            Commands::Run(args) => {
                assert_eq!(args.catalog, PathBuf::from("catalog/unit1.yaml"));
                assert_eq!(args.serve.as_deref(), Some("node server.js"));
                assert_eq!(args.serve_timeout, 30);
            }
            _ => panic!("expected run"),
        }
    }

    #[test]
    fn test_render_defaults_to_results_file() {
        let cli = Cli::try_parse_from(["uiprobe", "render"]).unwrap();
        match cli.command {
            Commands::Render(args) => assert_eq!(args.results, PathBuf::from("test_results.json")),
            _ => panic!("expected render"),
        }
    }

    #[tokio::test]
    async fn test_broken_catalog_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let catalog = dir.path().join("empty.yaml");
        std::fs::write(&catalog, "pages: []\n").unwrap();
        let cli = Cli::try_parse_from([
            "uiprobe",
            "--config",
            dir.path().join("absent.toml").to_str().unwrap(),
            "pages",
            catalog.to_str().unwrap(),
        ])
        .unwrap();
        assert!(execute(cli).await.is_err());
    }
}
