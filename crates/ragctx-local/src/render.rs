use crate::config::RenderConfig;
use ragctx_core::{ContentFetcher, Error, FailureKind, FetchOutcome, Result};
use serde::{Deserialize, Serialize};

/// Delegates page fetching to the local render microservice.
#[derive(Debug, Clone)]
pub struct RemoteRenderFetcher {
    client: reqwest::Client,
    cfg: RenderConfig,
}

#[derive(Debug, Serialize)]
struct RenderRequest<'a> {
    task_id: String,
    url: &'a str,
    use_proxy: bool,
}

#[derive(Debug, Deserialize)]
struct RenderEnvelope {
    result: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct RenderResult {
    response: String,
}

impl RemoteRenderFetcher {
    pub fn new(cfg: RenderConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .build()
            .map_err(|e| Error::Render(e.to_string()))?;
        Ok(Self { client, cfg })
    }

    pub fn from_env() -> Result<Self> {
        Self::new(RenderConfig::from_env())
    }

    async fn attempt(&self, url: &str) -> Result<String> {
        let req = RenderRequest {
            task_id: uuid::Uuid::new_v4().to_string(),
            url,
            use_proxy: true,
        };
        let resp = self
            .client
            .post(&self.cfg.endpoint)
            .timeout(self.cfg.timeout)
            .json(&req)
            .send()
            .await
            .map_err(|e| Error::Render(e.to_string()))?;
        let status = resp.status();
        if !status.is_success() {
            return Err(Error::Render(format!("render service HTTP {status}")));
        }
        let envelope: RenderEnvelope =
            resp.json().await.map_err(|e| Error::Render(e.to_string()))?;
        decode_result(envelope.result)
    }
}

/// The service double-encodes: `result` is a JSON string holding `{"response": ...}`.
fn decode_result(result: serde_json::Value) -> Result<String> {
    let parsed: RenderResult = match result {
        serde_json::Value::String(s) => {
            serde_json::from_str(&s).map_err(|e| Error::Render(format!("bad result: {e}")))?
        }
        other => {
            serde_json::from_value(other).map_err(|e| Error::Render(format!("bad result: {e}")))?
        }
    };
    Ok(parsed.response)
}

/// Drop blank lines and scraper separator lines made only of `*`.
pub fn strip_noise_lines(text: &str) -> String {
    text.lines()
        .filter(|line| {
            let t = line.trim();
            !t.is_empty() && !t.chars().all(|c| c == '*')
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[async_trait::async_trait]
impl ContentFetcher for RemoteRenderFetcher {
    fn name(&self) -> &'static str {
        "render"
    }

    async fn fetch(&self, url: &str) -> FetchOutcome {
        let url = url.trim();
        if url.is_empty() {
            return FetchOutcome::failed(FailureKind::FormatError, "empty URL");
        }
        let attempts = self.cfg.max_attempts.max(1);
        let mut last_err = String::new();
        for n in 1..=attempts {
            match self.attempt(url).await {
                Ok(text) => return FetchOutcome::Content(strip_noise_lines(&text)),
                Err(e) => {
                    tracing::debug!(url, attempt = n, error = %e, "render attempt failed");
                    last_err = e.to_string();
                    if n < attempts {
                        tokio::time::sleep(self.cfg.retry_delay).await;
                    }
                }
            }
        }
        tracing::warn!(url, attempts, error = %last_err, "render retries exhausted");
        FetchOutcome::failed(
            FailureKind::FetchFailed,
            format!("gave up after {attempts} attempts: {last_err}"),
        )
    }
}
