use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("search gateway failed: {0}")]
    Gateway(String),
    #[error("fetch failed: {0}")]
    Fetch(String),
    #[error("render service failed: {0}")]
    Render(String),
    #[error("llm failed: {0}")]
    Llm(String),
    #[error("not configured: {0}")]
    NotConfigured(String),
    #[error("invalid input: {0}")]
    InvalidInput(String),
}

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchQuery {
    pub query: String,
    /// Result count hint forwarded to the gateway as `num`.
    pub top_k: usize,
    /// Total request timeout for the gateway call.
    pub timeout_ms: u64,
}

impl SearchQuery {
    /// Absent queries are coerced to the empty string.
    pub fn new(query: Option<&str>, top_k: usize, timeout_ms: u64) -> Self {
        Self {
            query: query.unwrap_or_default().to_string(),
            top_k,
            timeout_ms,
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// One search hit. Fields are optional because the gateway format is loosely structured.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchResultItem {
    pub title: Option<String>,
    pub link: Option<String>,
    pub snippet: Option<String>,
}

impl SearchResultItem {
    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.link.is_none() && self.snippet.is_none()
    }

    pub fn title_str(&self) -> &str {
        self.title.as_deref().unwrap_or("")
    }

    pub fn link_str(&self) -> &str {
        self.link.as_deref().unwrap_or("")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FailureKind {
    /// Render service retries exhausted.
    FetchFailed,
    /// LLM summarization failed.
    SummaryFailed,
    /// Unexpected error inside a per-item task.
    FetchError,
    /// The URL handed to a fetcher was unusable.
    FormatError,
}

impl FailureKind {
    pub fn tag(&self) -> &'static str {
        match self {
            FailureKind::FetchFailed => "[FETCH_FAILED]",
            FailureKind::SummaryFailed => "[SUMMARY_FAILED]",
            FailureKind::FetchError => "[FETCH_ERROR]",
            FailureKind::FormatError => "[FORMAT_ERROR]",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Failure {
    pub kind: FailureKind,
    pub message: String,
}

impl Failure {
    pub fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.kind.tag(), self.message)
    }
}

/// Result of fetching (and optionally summarizing) one search hit.
///
/// Failures are data: they travel to the output as tagged text instead of aborting the batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum FetchOutcome {
    Content(String),
    /// Network or timeout error on the direct path; degrades to empty content.
    Miss,
    Failed(Failure),
}

impl FetchOutcome {
    pub fn failed(kind: FailureKind, message: impl Into<String>) -> Self {
        FetchOutcome::Failed(Failure::new(kind, message))
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, FetchOutcome::Failed(_))
    }

    /// Body text for successful fetches, `""` for misses and failures.
    pub fn content(&self) -> &str {
        match self {
            FetchOutcome::Content(s) => s,
            _ => "",
        }
    }
}

/// Fetch raw content for a URL. Implementations never return an error.
#[async_trait::async_trait]
pub trait ContentFetcher: Send + Sync {
    fn name(&self) -> &'static str;
    async fn fetch(&self, url: &str) -> FetchOutcome;
}

#[async_trait::async_trait]
pub trait SearchProvider: Send + Sync {
    fn name(&self) -> &'static str;
    async fn search(&self, q: &SearchQuery) -> Result<Vec<SearchResultItem>>;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Context {
    pub title: String,
    pub contents: String,
}

impl Context {
    pub fn into_document(self) -> ContextDocument {
        ContextDocument {
            document: DocumentBody {
                contents: format!("\"{}\"\n{}", self.title, self.contents),
            },
        }
    }
}

/// The pipeline output shape consumed downstream: `{"document": {"contents": "..."}}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContextDocument {
    pub document: DocumentBody,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentBody {
    pub contents: String,
}

impl ContextDocument {
    pub fn contents(&self) -> &str {
        &self.document.contents
    }
}
