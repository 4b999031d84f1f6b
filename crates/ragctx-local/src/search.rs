use crate::config::GatewayConfig;
use crate::links;
use ragctx_core::{Error, Result, SearchProvider, SearchQuery, SearchResultItem};
use std::time::Instant;

const TITLE_MARK: &str = "Title:";
const URL_MARK: &str = "URL Source:";
const DESCRIPTION_MARK: &str = "Description:";

/// Client for the text-format search gateway.
#[derive(Debug, Clone)]
pub struct GatewaySearchClient {
    client: reqwest::Client,
    cfg: GatewayConfig,
}

impl GatewaySearchClient {
    pub fn new(cfg: GatewayConfig) -> Result<Self> {
        let mut b = reqwest::Client::builder().danger_accept_invalid_certs(!cfg.verify_tls);
        if let Some(p) = cfg.proxy.as_deref() {
            let proxy = reqwest::Proxy::all(p).map_err(|e| Error::InvalidInput(e.to_string()))?;
            b = b.proxy(proxy);
        }
        let client = b.build().map_err(|e| Error::Gateway(e.to_string()))?;
        Ok(Self { client, cfg })
    }

    pub fn from_env() -> Result<Self> {
        Self::new(GatewayConfig::from_env())
    }

    pub fn endpoint(&self) -> &str {
        &self.cfg.endpoint
    }
}

#[async_trait::async_trait]
impl SearchProvider for GatewaySearchClient {
    fn name(&self) -> &'static str {
        "gateway"
    }

    async fn search(&self, q: &SearchQuery) -> Result<Vec<SearchResultItem>> {
        let t0 = Instant::now();
        let top_k = q.top_k.to_string();
        let resp = self
            .client
            .get(&self.cfg.endpoint)
            .query(&[
                ("q", q.query.as_str()),
                ("provider", self.cfg.provider.as_str()),
                ("num", top_k.as_str()),
            ])
            .header(reqwest::header::AUTHORIZATION, &self.cfg.auth)
            .timeout(q.timeout())
            .send()
            .await
            .map_err(|e| Error::Gateway(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(Error::Gateway(format!("search gateway HTTP {status}")));
        }
        let body = resp.text().await.map_err(|e| Error::Gateway(e.to_string()))?;

        let items = parse_response(&body);
        tracing::debug!(
            items = items.len(),
            elapsed_ms = t0.elapsed().as_millis() as u64,
            "search gateway responded"
        );
        Ok(items)
    }
}

/// Dispatch on body shape: structured JSON groups go through the link filter, everything
/// else is treated as the plain-text block format.
pub fn parse_response(body: &str) -> Vec<SearchResultItem> {
    let trimmed = body.trim_start();
    if trimmed.starts_with('{') || trimmed.starts_with('[') {
        if let Some(groups) = links::parse_groups(trimmed) {
            return links::filter_items(&groups);
        }
        // Looks like JSON but is not the group shape; could still be a text block that
        // happens to start with a bracket, so fall through.
    }
    parse_text_blocks(body)
}

/// Parse blank-line separated blocks of `Title:` / `URL Source:` / `Description:` lines.
pub fn parse_text_blocks(body: &str) -> Vec<SearchResultItem> {
    let normalized = body.replace("\r\n", "\n");
    let mut items = Vec::new();
    for block in normalized.trim().split("\n\n") {
        if block.trim().is_empty() {
            continue;
        }
        let mut item = SearchResultItem::default();
        for line in block.split('\n') {
            if let Some(v) = value_after(line, TITLE_MARK) {
                item.title = Some(v);
            } else if let Some(v) = value_after(line, URL_MARK) {
                item.link = Some(v);
            } else if let Some(v) = value_after(line, DESCRIPTION_MARK) {
                item.snippet = Some(v);
            }
        }
        if !item.is_empty() {
            items.push(item);
        }
    }
    items
}

fn value_after(line: &str, mark: &str) -> Option<String> {
    line.split_once(mark).map(|(_, rest)| rest.trim().to_string())
}
