//! Page catalog: the ordered list of pages under test and what each one is
//! expected to contain

use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{HarnessError, HarnessResult};

/// Expectations for one page. Read-only for the lifetime of a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageConfig {
    /// Path (relative to the base URL) or absolute URL of the page
    pub locator: String,

    /// Fragment the document title must contain (case-insensitive)
    pub title: String,

    /// Topic codes expected in the header badges
    #[serde(default)]
    pub topics: Vec<String>,

    /// Number of interactive practice items the page should carry
    #[serde(default)]
    pub interactive_count: usize,

    /// CSS class carried by content panels, without the leading dot
    #[serde(default = "default_panel_class")]
    pub panel_class: String,

    /// Section identifiers, in tab order
    #[serde(default)]
    pub sections: Vec<String>,
}

fn default_panel_class() -> String {
    "section".to_string()
}

impl PageConfig {
    pub fn new(locator: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            locator: locator.into(),
            title: title.into(),
            topics: Vec::new(),
            interactive_count: 0,
            panel_class: default_panel_class(),
            sections: Vec::new(),
        }
    }

    /// Selector matching the currently active content panels
    pub fn active_panel_selector(&self) -> String {
        format!(".{}.active", self.panel_class.trim_start_matches('.'))
    }

    /// Full URL of the page against `base_url`
    pub fn url(&self, base_url: &str) -> String {
        if self.locator.starts_with("http://") || self.locator.starts_with("https://") {
            return self.locator.clone();
        }
        format!(
            "{}/{}",
            base_url.trim_end_matches('/'),
            self.locator.trim_start_matches('/')
        )
    }
}

/// A catalog file
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Catalog {
    /// Base URL the locators are resolved against; overrides the config value
    #[serde(default)]
    pub base_url: Option<String>,

    pub pages: Vec<PageConfig>,
}

impl Catalog {
    /// Parse a catalog from a YAML string
    pub fn from_yaml(yaml: &str) -> HarnessResult<Self> {
        let catalog: Self = serde_yaml::from_str(yaml)?;
        catalog.validate()?;
        Ok(catalog)
    }

    /// Parse a catalog from a YAML file
    pub fn from_file(path: &Path) -> HarnessResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content).map_err(|e| HarnessError::CatalogFile {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
    }

    /// Load a catalog from a file, or merge every YAML file of a directory.
    ///
    /// Directory entries are read in path order. The first file that sets a
    /// base URL wins.
    pub fn load(path: &Path) -> HarnessResult<Self> {
        if path.is_file() {
            return Self::from_file(path);
        }

        let mut files: Vec<_> = walkdir::WalkDir::new(path)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| {
                e.path()
                    .extension()
                    .map(|ext| ext == "yaml" || ext == "yml")
                    .unwrap_or(false)
            })
            .map(|e| e.into_path())
            .collect();
        files.sort();

        if files.is_empty() {
            return Err(HarnessError::Catalog(format!(
                "no catalog files under {}",
                path.display()
            )));
        }

        let mut merged = Catalog::default();
        for file in &files {
            let part = Self::from_file(file)?;
            if merged.base_url.is_none() {
                merged.base_url = part.base_url;
            }
            merged.pages.extend(part.pages);
        }
        merged.validate()?;
        Ok(merged)
    }

    /// Keep only the pages whose locator is listed, in catalog order
    pub fn select(&self, locators: &[String]) -> HarnessResult<Vec<PageConfig>> {
        if locators.is_empty() {
            return Ok(self.pages.clone());
        }
        if let Some(missing) = locators
            .iter()
            .find(|l| !self.pages.iter().any(|p| &p.locator == *l))
        {
            return Err(HarnessError::Catalog(format!("page not in catalog: {}", missing)));
        }
        Ok(self
            .pages
            .iter()
            .filter(|p| locators.contains(&p.locator))
            .cloned()
            .collect())
    }

    fn validate(&self) -> HarnessResult<()> {
        if self.pages.is_empty() {
            return Err(HarnessError::Catalog("catalog lists no pages".into()));
        }
        let mut seen = HashSet::new();
        for page in &self.pages {
            if page.locator.trim().is_empty() {
                return Err(HarnessError::Catalog("page with empty locator".into()));
            }
            if !seen.insert(page.locator.as_str()) {
                return Err(HarnessError::Catalog(format!(
                    "duplicate page locator: {}",
                    page.locator
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
base_url: http://localhost:8080
pages:
  - locator: U1.1-Existence-of-Limit.html
    title: Existence of Limit
    topics: ["1.1", "1.2"]
    interactive_count: 19
    panel_class: content-panel
    sections: [objectives, prerequisites]
  - locator: U1.3-Squeeze-Theorem.html
    title: Squeeze Theorem
"#;

    #[test]
    fn test_parse_catalog() {
        let catalog = Catalog::from_yaml(SAMPLE).unwrap();
        assert_eq!(catalog.base_url.as_deref(), Some("http://localhost:8080"));
        assert_eq!(catalog.pages.len(), 2);
        assert_eq!(catalog.pages[0].panel_class, "content-panel");
        assert_eq!(catalog.pages[1].panel_class, "section");
        assert!(catalog.pages[1].sections.is_empty());
    }

    #[test]
    fn test_url_resolution() {
        let page = PageConfig::new("/U1.1.html", "Limits");
        assert_eq!(page.url("http://localhost:8080/"), "http://localhost:8080/U1.1.html");

        let absolute = PageConfig::new("https://example.org/a.html", "A");
        assert_eq!(absolute.url("http://localhost:8080"), "https://example.org/a.html");
    }

    #[test]
    fn test_active_panel_selector() {
        let mut page = PageConfig::new("a.html", "A");
        page.panel_class = "content-panel".into();
        assert_eq!(page.active_panel_selector(), ".content-panel.active");
    }

    #[test]
    fn test_duplicate_locator_rejected() {
        let yaml = r#"
pages:
  - { locator: a.html, title: A }
  - { locator: a.html, title: B }
"#;
        assert!(matches!(Catalog::from_yaml(yaml), Err(HarnessError::Catalog(_))));
    }

    #[test]
    fn test_select_keeps_catalog_order() {
        let catalog = Catalog::from_yaml(SAMPLE).unwrap();
        let picked = catalog
            .select(&[
                "U1.3-Squeeze-Theorem.html".to_string(),
                "U1.1-Existence-of-Limit.html".to_string(),
            ])
            .unwrap();
        assert_eq!(picked[0].locator, "U1.1-Existence-of-Limit.html");
        assert!(catalog.select(&["nope.html".to_string()]).is_err());
    }

    #[test]
    fn test_load_directory_in_path_order() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("b.yaml"),
            "pages:\n  - { locator: b.html, title: B }\n",
        )
        .unwrap();
        std::fs::write(
            dir.path().join("a.yml"),
            "base_url: http://h\npages:\n  - { locator: a.html, title: A }\n",
        )
        .unwrap();

        let catalog = Catalog::load(dir.path()).unwrap();
        let locators: Vec<_> = catalog.pages.iter().map(|p| p.locator.as_str()).collect();
        assert_eq!(locators, ["a.html", "b.html"]);
        assert_eq!(catalog.base_url.as_deref(), Some("http://h"));
    }
}
