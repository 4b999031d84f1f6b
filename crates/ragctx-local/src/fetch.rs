use crate::config::DirectFetchConfig;
use rand::seq::SliceRandom;
use ragctx_core::{ContentFetcher, Error, FetchOutcome, Result};
use std::time::Instant;

/// Plain GET of the result page. Any network error degrades to a fetch miss.
#[derive(Debug, Clone)]
pub struct DirectFetcher {
    client: reqwest::Client,
    user_agents: Vec<String>,
}

impl DirectFetcher {
    pub fn new(cfg: DirectFetchConfig) -> Result<Self> {
        if cfg.user_agents.is_empty() {
            return Err(Error::InvalidInput(
                "direct fetcher needs at least one user agent".to_string(),
            ));
        }
        let client = reqwest::Client::builder()
            .timeout(cfg.timeout)
            .redirect(reqwest::redirect::Policy::limited(10))
            // Connections are not kept for reuse; the concurrency gate bounds in-flight
            // requests, reqwest has no per-host active connection cap of its own.
            .pool_max_idle_per_host(0)
            .build()
            .map_err(|e| Error::Fetch(e.to_string()))?;
        Ok(Self {
            client,
            user_agents: cfg.user_agents,
        })
    }

    fn pick_user_agent(&self) -> &str {
        self.user_agents
            .choose(&mut rand::thread_rng())
            .map(|s| s.as_str())
            .unwrap_or_default()
    }

    async fn get_bytes(&self, url: &str) -> Result<Vec<u8>> {
        let resp = self
            .client
            .get(url)
            .header(reqwest::header::USER_AGENT, self.pick_user_agent())
            .send()
            .await
            .map_err(|e| Error::Fetch(e.to_string()))?;
        let status = resp.status();
        if !status.is_success() {
            // Non-success bodies are still aligned against the snippet.
            tracing::debug!(url, %status, "direct fetch non-success status");
        }
        let bytes = resp.bytes().await.map_err(|e| Error::Fetch(e.to_string()))?;
        Ok(bytes.to_vec())
    }
}

#[async_trait::async_trait]
impl ContentFetcher for DirectFetcher {
    fn name(&self) -> &'static str {
        "direct"
    }

    async fn fetch(&self, url: &str) -> FetchOutcome {
        if url.is_empty() {
            return FetchOutcome::Miss;
        }
        let t0 = Instant::now();
        match self.get_bytes(url).await {
            Ok(bytes) => {
                let text = decode_detected(&bytes);
                tracing::debug!(
                    url,
                    bytes = bytes.len(),
                    elapsed_ms = t0.elapsed().as_millis() as u64,
                    "direct fetch ok"
                );
                FetchOutcome::Content(text)
            }
            Err(e) => {
                tracing::debug!(url, error = %e, "direct fetch miss");
                FetchOutcome::Miss
            }
        }
    }
}

/// Sniff the charset from the bytes themselves and decode, dropping undecodable sequences.
pub fn decode_detected(bytes: &[u8]) -> String {
    if bytes.is_empty() {
        return String::new();
    }
    let encoding = if std::str::from_utf8(bytes).is_ok() {
        encoding_rs::UTF_8
    } else {
        let mut det = chardetng::EncodingDetector::new();
        det.feed(bytes, true);
        det.guess(None, true)
    };
    let (text, had_errors) = encoding.decode_without_bom_handling(bytes);
    if !had_errors {
        return text.into_owned();
    }
    // Replacements here stand for undecodable input.
    text.chars()
        .filter(|&c| c != char::REPLACEMENT_CHARACTER)
        .collect()
}
