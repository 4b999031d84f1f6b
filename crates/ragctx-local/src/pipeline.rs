//! Query → search → per-item enrichment → ordered contexts.

use crate::align::{collect_context, snippet_fragments};
use crate::assemble::assemble;
use crate::config::PipelineConfig;
use crate::fetch::DirectFetcher;
use crate::gate::{fan_out, Gate};
use crate::openai_compat::OpenAiCompatClient;
use crate::render::RemoteRenderFetcher;
use crate::sanitize::sanitize_query;
use crate::search::GatewaySearchClient;
use crate::summarize::Summarizer;
use ragctx_core::{
    ContentFetcher, ContextDocument, Error, FetchOutcome, Result, SearchProvider, SearchQuery,
    SearchResultItem,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, Instant};

pub const DEFAULT_TOP_K: usize = 5;
pub const DEFAULT_SEARCH_TIMEOUT: Duration = Duration::from_secs(60);

/// How each search hit is turned into context text.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineMode {
    /// No fetching; the snippet's long fragments are the context.
    SnippetOnly,
    /// Fetch the page and recover the paragraphs the snippet came from.
    #[default]
    Direct,
    /// Fetch through the render service and summarize with the LLM.
    Render,
}

impl PipelineMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            PipelineMode::SnippetOnly => "snippet",
            PipelineMode::Direct => "direct",
            PipelineMode::Render => "render",
        }
    }
}

#[derive(Clone)]
pub struct ContextPipeline {
    mode: PipelineMode,
    provider: Arc<dyn SearchProvider>,
    direct: Option<Arc<dyn ContentFetcher>>,
    render: Option<(Arc<dyn ContentFetcher>, Summarizer)>,
    concurrency: usize,
    top_k: usize,
    timeout: Duration,
    sanitize_query: bool,
}

impl ContextPipeline {
    pub fn new(mode: PipelineMode, provider: Arc<dyn SearchProvider>) -> Self {
        Self {
            mode,
            provider,
            direct: None,
            render: None,
            concurrency: crate::config::DEFAULT_CONCURRENCY,
            top_k: DEFAULT_TOP_K,
            timeout: DEFAULT_SEARCH_TIMEOUT,
            sanitize_query: false,
        }
    }

    /// Build the stock gateway/fetcher/LLM stack for `mode`. Only the collaborators the mode
    /// uses are constructed; render mode needs `cfg.llm`.
    pub fn from_config(cfg: &PipelineConfig, mode: PipelineMode) -> Result<Self> {
        let provider = Arc::new(GatewaySearchClient::new(cfg.gateway.clone())?);
        let mut p = Self::new(mode, provider).with_concurrency(cfg.concurrency);
        match mode {
            PipelineMode::SnippetOnly => {}
            PipelineMode::Direct => {
                p = p.with_direct_fetcher(Arc::new(DirectFetcher::new(cfg.direct.clone())?));
            }
            PipelineMode::Render => {
                let llm = cfg.llm.clone().ok_or_else(|| {
                    Error::NotConfigured(
                        "render mode needs RAGCTX_LLM_BASE_URL and RAGCTX_LLM_MODEL".to_string(),
                    )
                })?;
                let fetcher = Arc::new(RemoteRenderFetcher::new(cfg.render.clone())?);
                let summarizer = Summarizer::new(OpenAiCompatClient::new(llm)?);
                p = p.with_render(fetcher, summarizer);
            }
        }
        Ok(p)
    }

    pub fn from_env(mode: PipelineMode) -> Result<Self> {
        Self::from_config(&PipelineConfig::from_env(), mode)
    }

    pub fn with_direct_fetcher(mut self, fetcher: Arc<dyn ContentFetcher>) -> Self {
        self.direct = Some(fetcher);
        self
    }

    pub fn with_render(mut self, fetcher: Arc<dyn ContentFetcher>, summarizer: Summarizer) -> Self {
        self.render = Some((fetcher, summarizer));
        self
    }

    pub fn with_concurrency(mut self, n: usize) -> Self {
        self.concurrency = n.max(1);
        self
    }

    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_sanitize_query(mut self, on: bool) -> Self {
        self.sanitize_query = on;
        self
    }

    pub fn mode(&self) -> PipelineMode {
        self.mode
    }

    /// Run one query. Only a gateway failure (or a missing collaborator) is an error;
    /// per-item problems come back as placeholder or tagged context text.
    pub async fn run(&self, query: Option<&str>) -> Result<Vec<ContextDocument>> {
        let t0 = Instant::now();
        let raw = query.unwrap_or_default();
        let query = if self.sanitize_query {
            sanitize_query(raw)
        } else {
            raw.to_string()
        };
        let q = SearchQuery::new(
            Some(query.as_str()),
            self.top_k,
            self.timeout.as_millis() as u64,
        );
        let items = self.provider.search(&q).await?;

        let outcomes = match self.mode {
            PipelineMode::SnippetOnly => snippet_outcomes(&items),
            PipelineMode::Direct => self.enrich_direct(&items).await?,
            PipelineMode::Render => self.enrich_render(&query, &items).await?,
        };
        let failures = outcomes.iter().filter(|o| o.is_failure()).count();
        let docs = assemble(self.mode, &items, outcomes);

        tracing::info!(
            mode = self.mode.as_str(),
            provider = self.provider.name(),
            items = items.len(),
            contexts = docs.len(),
            failures,
            elapsed_ms = t0.elapsed().as_millis() as u64,
            "query complete"
        );
        Ok(docs)
    }

    async fn enrich_direct(&self, items: &[SearchResultItem]) -> Result<Vec<FetchOutcome>> {
        let fetcher = self
            .direct
            .clone()
            .ok_or_else(|| Error::NotConfigured("direct mode has no fetcher".to_string()))?;
        let gate = Gate::new(self.concurrency);
        let out = fan_out(task_inputs(items), &gate, move |_idx, (url, snippet), gate| {
            let fetcher = fetcher.clone();
            async move {
                let fetched = {
                    let _permit = gate.enter().await?;
                    fetcher.fetch(&url).await
                };
                Ok::<_, Error>(match fetched {
                    FetchOutcome::Content(doc) => {
                        FetchOutcome::Content(collect_context(&snippet, &doc))
                    }
                    other => other,
                })
            }
        })
        .await;
        Ok(out)
    }

    async fn enrich_render(
        &self,
        query: &str,
        items: &[SearchResultItem],
    ) -> Result<Vec<FetchOutcome>> {
        let (fetcher, summarizer) = self
            .render
            .clone()
            .ok_or_else(|| Error::NotConfigured("render mode has no fetcher".to_string()))?;
        let query: Arc<str> = Arc::from(query);
        let gate = Gate::new(self.concurrency);
        let out = fan_out(task_inputs(items), &gate, move |_idx, (url, snippet), gate| {
            let fetcher = fetcher.clone();
            let summarizer = summarizer.clone();
            let query = query.clone();
            async move {
                // The permit covers the fetch only; the model call runs outside the gate.
                let fetched = {
                    let _permit = gate.enter().await?;
                    fetcher.fetch(&url).await
                };
                Ok::<_, Error>(summarizer.summarize(fetched, &url, &query, &snippet).await)
            }
        })
        .await;
        Ok(out)
    }
}

/// `(url, snippet)` per item; items without a link fetch `""`.
fn task_inputs(items: &[SearchResultItem]) -> Vec<(String, String)> {
    items
        .iter()
        .map(|i| {
            (
                i.link_str().to_string(),
                i.snippet.clone().unwrap_or_default(),
            )
        })
        .collect()
}

fn snippet_outcomes(items: &[SearchResultItem]) -> Vec<FetchOutcome> {
    items
        .iter()
        .map(|i| {
            let snippet = i.snippet.as_deref().unwrap_or_default();
            FetchOutcome::Content(snippet_fragments(snippet).join(" "))
        })
        .collect()
}
