//! LLM reduction of rendered page text to what matters for the query.

use crate::openai_compat::OpenAiCompatClient;
use ragctx_core::{FailureKind, FetchOutcome};
use std::sync::Arc;

const SYSTEM_PROMPT: &str = "You extract evidence from web pages for a downstream reasoning system. \
Answer with a single JSON object and nothing else.";

#[derive(Debug, Clone)]
pub struct Summarizer {
    llm: Arc<OpenAiCompatClient>,
}

impl Summarizer {
    pub fn new(llm: OpenAiCompatClient) -> Self {
        Self { llm: Arc::new(llm) }
    }

    /// Summarize fetched content for `query`/`snippet`. Never fails: errors come back as
    /// `[SUMMARY_FAILED]` outcomes, and upstream failures pass through untouched.
    pub async fn summarize(
        &self,
        fetched: FetchOutcome,
        url: &str,
        query: &str,
        snippet: &str,
    ) -> FetchOutcome {
        let content = match fetched {
            FetchOutcome::Content(c) => c,
            other => return other,
        };
        if content.trim().is_empty() {
            return FetchOutcome::Content(String::new());
        }

        let max_chars = self.llm.config().max_input_chars;
        let user = build_prompt(query, snippet, truncate_chars(&content, max_chars));

        // Own task and own client: a slow model must not hold up sibling fetches.
        let llm = self.llm.clone();
        let joined = tokio::spawn(async move { llm.chat(SYSTEM_PROMPT, &user).await }).await;
        match joined {
            Ok(Ok(completion)) => FetchOutcome::Content(render_completion(&completion)),
            Ok(Err(e)) => {
                tracing::warn!(url, error = %e, "summarization failed");
                FetchOutcome::failed(FailureKind::SummaryFailed, format!("{url}: {e}"))
            }
            Err(e) => {
                tracing::warn!(url, error = %e, "summarization task aborted");
                FetchOutcome::failed(
                    FailureKind::SummaryFailed,
                    format!("{url}: summarization task failed: {e}"),
                )
            }
        }
    }
}

pub fn truncate_chars(s: &str, max_chars: usize) -> &str {
    match s.char_indices().nth(max_chars) {
        Some((i, _)) => &s[..i],
        None => s,
    }
}

pub fn build_prompt(query: &str, snippet: &str, content: &str) -> String {
    format!(
        "Query: {query}\n\
         Search snippet: {snippet}\n\n\
         Web page content:\n{content}\n\n\
         Extract every passage from the page that directly helps answer the query. \
         Prefer copying the relevant sentences in full over paraphrasing them tersely; \
         keep numbers, names and dates exactly as written. Ignore navigation, ads and unrelated sections.\n\n\
         Return JSON with exactly these fields:\n\
         {{\"rationale\": \"why these passages are relevant\", \
         \"evidence\": \"the extracted passages, verbatim where possible\", \
         \"summary\": \"a concise summary of the information relevant to the query\"}}"
    )
}

/// Turn the model's JSON answer into context text. Models that ignore the format still
/// produce usable prose, so unparseable completions are kept as-is.
pub fn render_completion(completion: &str) -> String {
    let Some(v) = extract_json_object(completion) else {
        return completion.trim().to_string();
    };
    let evidence = field_text(&v, "evidence");
    let summary = field_text(&v, "summary");
    match (evidence.is_empty(), summary.is_empty()) {
        (false, false) => format!("Evidence: {evidence}\nSummary: {summary}"),
        (false, true) => format!("Evidence: {evidence}"),
        (true, false) => format!("Summary: {summary}"),
        (true, true) => String::new(),
    }
}

fn extract_json_object(s: &str) -> Option<serde_json::Value> {
    let start = s.find('{')?;
    let end = s.rfind('}')?;
    if end <= start {
        return None;
    }
    serde_json::from_str::<serde_json::Value>(&s[start..=end])
        .ok()
        .filter(|v| v.is_object())
}

fn field_text(v: &serde_json::Value, key: &str) -> String {
    match v.get(key) {
        Some(serde_json::Value::String(s)) => s.trim().to_string(),
        Some(serde_json::Value::Array(xs)) => xs
            .iter()
            .filter_map(|x| x.as_str())
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join("\n"),
        _ => String::new(),
    }
}
