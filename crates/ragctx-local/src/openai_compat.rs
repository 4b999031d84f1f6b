use crate::config::LlmConfig;
use ragctx_core::{Error, Result};
use serde::{Deserialize, Serialize};

/// Minimal chat-completions client for OpenAI-compatible servers (vLLM, llama.cpp, hosted APIs).
#[derive(Debug, Clone)]
pub struct OpenAiCompatClient {
    client: reqwest::Client,
    cfg: LlmConfig,
}

impl OpenAiCompatClient {
    /// Builds its own HTTP client so model calls never share a connection pool with page fetches.
    pub fn new(cfg: LlmConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .build()
            .map_err(|e| Error::Llm(e.to_string()))?;
        Ok(Self { client, cfg })
    }

    pub fn from_env() -> Result<Self> {
        Self::new(LlmConfig::from_env()?)
    }

    pub fn config(&self) -> &LlmConfig {
        &self.cfg
    }

    fn endpoint_chat_completions(&self) -> String {
        format!(
            "{}/v1/chat/completions",
            self.cfg.base_url.trim_end_matches('/')
        )
    }

    pub async fn chat(&self, system: &str, user: &str) -> Result<String> {
        let req = ChatCompletionsRequest {
            model: self.cfg.model.clone(),
            messages: vec![
                Message {
                    role: "system".to_string(),
                    content: system.to_string(),
                },
                Message {
                    role: "user".to_string(),
                    content: user.to_string(),
                },
            ],
            max_tokens: Some(self.cfg.max_tokens),
            temperature: Some(self.cfg.temperature),
            stream: Some(false),
        };

        let mut rb = self
            .client
            .post(self.endpoint_chat_completions())
            .timeout(self.cfg.timeout)
            .header(reqwest::header::CONTENT_TYPE, "application/json");
        if let Some(k) = &self.cfg.api_key {
            rb = rb.header(reqwest::header::AUTHORIZATION, format!("Bearer {k}"));
        }

        let resp = rb
            .json(&req)
            .send()
            .await
            .map_err(|e| Error::Llm(e.to_string()))?;
        let status = resp.status();
        if !status.is_success() {
            return Err(Error::Llm(format!("chat.completions HTTP {status}")));
        }

        let parsed: ChatCompletionsResponse =
            resp.json().await.map_err(|e| Error::Llm(e.to_string()))?;
        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| Error::Llm("chat.completions returned no choices".to_string()))
    }
}

#[derive(Debug, Clone, Serialize)]
struct ChatCompletionsRequest {
    model: String,
    messages: Vec<Message>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    stream: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Message {
    role: String,
    content: String,
}

#[derive(Debug, Clone, Deserialize)]
struct ChatCompletionsResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Clone, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Clone, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{http::HeaderMap, routing::post, Json, Router};
    use std::net::SocketAddr;

    async fn serve(app: Router) -> SocketAddr {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr: SocketAddr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        addr
    }

    #[test]
    fn request_serializes_sampling_knobs() {
        let req = ChatCompletionsRequest {
            model: "m".to_string(),
            messages: vec![],
            max_tokens: Some(1024),
            temperature: Some(0.3),
            stream: Some(false),
        };
        let v = serde_json::to_value(&req).unwrap();
        assert_eq!(v["max_tokens"], 1024);
        assert_eq!(v["temperature"], 0.3);
        assert_eq!(v["stream"], false);
    }

    #[tokio::test]
    async fn chat_returns_first_choice_and_sends_bearer() {
        let app = Router::new().route(
            "/v1/chat/completions",
            post(
                |headers: HeaderMap, Json(body): Json<serde_json::Value>| async move {
                    let auth = headers
                        .get("authorization")
                        .and_then(|v| v.to_str().ok())
                        .unwrap_or("")
                        .to_string();
                    Json(serde_json::json!({
                        "choices": [{"message": {"role": "assistant",
                            "content": format!("{auth}|{}", body["model"].as_str().unwrap_or(""))}}]
                    }))
                },
            ),
        );
        let addr = serve(app).await;
        let mut cfg = LlmConfig::new(format!("http://{addr}/"), "tiny");
        cfg.api_key = Some("k".to_string());
        let c = OpenAiCompatClient::new(cfg).unwrap();
        assert_eq!(c.chat("sys", "user").await.unwrap(), "Bearer k|tiny");
    }

    #[tokio::test]
    async fn empty_choices_is_an_error() {
        let app = Router::new().route(
            "/v1/chat/completions",
            post(|| async { Json(serde_json::json!({ "choices": [] })) }),
        );
        let addr = serve(app).await;
        let c = OpenAiCompatClient::new(LlmConfig::new(format!("http://{addr}"), "m")).unwrap();
        assert!(matches!(c.chat("s", "u").await, Err(Error::Llm(_))));
    }
}
