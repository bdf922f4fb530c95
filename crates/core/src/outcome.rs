//! Categorized results emitted by probes

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// The four-way outcome taxonomy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Passed,
    Failed,
    Warning,
    Info,
}

impl Category {
    pub const ALL: [Category; 4] = [
        Category::Passed,
        Category::Failed,
        Category::Warning,
        Category::Info,
    ];

    /// Short tag used in log lines
    pub fn tag(&self) -> &'static str {
        match self {
            Category::Passed => "PASS",
            Category::Failed => "FAIL",
            Category::Warning => "WARN",
            Category::Info => "INFO",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// Structured payload attached to an outcome.
///
/// Untagged so the persisted form stays plain JSON (a number, a string, an
/// array or an object). Map keys are ordered, which keeps the encoding stable
/// across re-serialization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Detail {
    Count(u64),
    Text(String),
    Items(Vec<String>),
    Counts(BTreeMap<String, u64>),
}

impl Detail {
    pub fn count(n: usize) -> Self {
        Detail::Count(n as u64)
    }

    pub fn items<I, S>(items: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Detail::Items(items.into_iter().map(Into::into).collect())
    }

    pub fn counts<'a, I>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (&'a str, usize)>,
    {
        Detail::Counts(
            pairs
                .into_iter()
                .map(|(k, v)| (k.to_string(), v as u64))
                .collect(),
        )
    }
}

/// A single categorized result. Immutable once recorded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outcome {
    category: Category,
    code: String,
    message: String,
    detail: Option<Detail>,
}

impl Outcome {
    pub fn new(category: Category, code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            category,
            code: code.into(),
            message: message.into(),
            detail: None,
        }
    }

    pub fn passed(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(Category::Passed, code, message)
    }

    pub fn failed(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(Category::Failed, code, message)
    }

    pub fn warning(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(Category::Warning, code, message)
    }

    pub fn info(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(Category::Info, code, message)
    }

    /// Attach a detail payload. Consumes the outcome, so it can only happen
    /// before the outcome is recorded anywhere.
    pub fn with_detail(mut self, detail: Detail) -> Self {
        self.detail = Some(detail);
        self
    }

    pub fn category(&self) -> Category {
        self.category
    }

    pub fn code(&self) -> &str {
        &self.code
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn detail(&self) -> Option<&Detail> {
        self.detail.as_ref()
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.code, self.message)
    }
}
