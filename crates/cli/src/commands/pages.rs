//! `uiprobe pages`: list what a catalog would run

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;

use uiprobe_core::{Catalog, PageConfig};

#[derive(Args, Debug)]
pub struct PagesArgs {
    /// Catalog file, or a directory of catalog files
    #[arg(default_value = "catalog")]
    pub catalog: PathBuf,
}

fn describe(page: &PageConfig) -> String {
    format!(
        "{}  \"{}\"  topics [{}]  {} practice item(s), {} section(s)",
        page.locator,
        page.title,
        page.topics.join(", "),
        page.interactive_count,
        page.sections.len()
    )
}

pub fn execute(args: PagesArgs) -> Result<i32> {
    let catalog = Catalog::load(&args.catalog)
        .with_context(|| format!("loading catalog {}", args.catalog.display()))?;
    if let Some(base_url) = &catalog.base_url {
        println!("Base URL: {}", base_url);
    }
    for page in &catalog.pages {
        println!("{}", describe(page));
    }
    Ok(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_describe_page() {
        let mut page = PageConfig::new("U1.3-Squeeze-Theorem.html", "Squeeze Theorem");
        page.topics = vec!["1.8".into()];
        assert_eq!(
            describe(&page),
            "U1.3-Squeeze-Theorem.html  \"Squeeze Theorem\"  topics [1.8]  0 practice item(s), 0 section(s)"
        );
    }
}
