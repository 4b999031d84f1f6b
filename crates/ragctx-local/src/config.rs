//! Env-driven configuration.
//!
//! Every value has a default so the pipeline can be built without any env; the LLM section
//! is the exception and is only required for render mode.

use ragctx_core::{Error, Result};
use std::time::Duration;

pub const DEFAULT_GATEWAY_ENDPOINT: &str = "https://reader.psmoe.com/glm/s/";
pub const DEFAULT_GATEWAY_PROVIDER: &str = "serper";
pub const DEFAULT_GATEWAY_AUTH: &str = "anonymous";
pub const DEFAULT_RENDER_ENDPOINT: &str = "http://127.0.0.1:9999/fetch";
pub const DEFAULT_CONCURRENCY: usize = 8;

pub fn default_user_agents() -> Vec<String> {
    vec![
        "Mozilla/5.0 (Linux; Android 6.0.1; Nexus 5X Build/MMB29P) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Mobile Safari/537.36".to_string(),
        "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36".to_string(),
        "Mozilla/5.0 (compatible; Googlebot/2.1; +https://www.google.com/bot.html)".to_string(),
    ]
}

pub(crate) fn env(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

fn env_bool(key: &str) -> bool {
    matches!(
        env(key).unwrap_or_default().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

fn env_u64(key: &str) -> Option<u64> {
    env(key).and_then(|s| s.parse::<u64>().ok())
}

#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub endpoint: String,
    pub provider: String,
    /// Sent verbatim as the `Authorization` header.
    pub auth: String,
    /// The upstream deployment runs with verification off; that is an operator opt-in here.
    pub verify_tls: bool,
    pub proxy: Option<String>,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_GATEWAY_ENDPOINT.to_string(),
            provider: DEFAULT_GATEWAY_PROVIDER.to_string(),
            auth: DEFAULT_GATEWAY_AUTH.to_string(),
            verify_tls: true,
            proxy: None,
        }
    }
}

impl GatewayConfig {
    pub fn from_env() -> Self {
        let d = Self::default();
        Self {
            endpoint: env("RAGCTX_GATEWAY_ENDPOINT").unwrap_or(d.endpoint),
            provider: env("RAGCTX_GATEWAY_PROVIDER").unwrap_or(d.provider),
            auth: env("RAGCTX_GATEWAY_AUTH").unwrap_or(d.auth),
            verify_tls: !env_bool("RAGCTX_GATEWAY_INSECURE_TLS"),
            proxy: env("RAGCTX_PROXY"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct DirectFetchConfig {
    pub timeout: Duration,
    /// Pool the per-request User-Agent is drawn from. A single entry makes requests deterministic.
    pub user_agents: Vec<String>,
}

impl Default for DirectFetchConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(5),
            user_agents: default_user_agents(),
        }
    }
}

impl DirectFetchConfig {
    pub fn from_env() -> Self {
        let d = Self::default();
        let user_agents = env("RAGCTX_USER_AGENTS")
            .map(|v| {
                v.split(['\n', '|'])
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect::<Vec<_>>()
            })
            .filter(|v| !v.is_empty())
            .unwrap_or(d.user_agents);
        Self {
            timeout: env_u64("RAGCTX_FETCH_TIMEOUT_MS")
                .map(Duration::from_millis)
                .unwrap_or(d.timeout),
            user_agents,
        }
    }
}

#[derive(Debug, Clone)]
pub struct RenderConfig {
    pub endpoint: String,
    pub max_attempts: u32,
    pub retry_delay: Duration,
    pub timeout: Duration,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_RENDER_ENDPOINT.to_string(),
            max_attempts: 3,
            retry_delay: Duration::from_millis(500),
            timeout: Duration::from_secs(50),
        }
    }
}

impl RenderConfig {
    pub fn from_env() -> Self {
        let d = Self::default();
        Self {
            endpoint: env("RAGCTX_RENDER_ENDPOINT").unwrap_or(d.endpoint),
            max_attempts: env_u64("RAGCTX_RENDER_MAX_ATTEMPTS")
                .map(|n| n.clamp(1, 10) as u32)
                .unwrap_or(d.max_attempts),
            retry_delay: env_u64("RAGCTX_RENDER_RETRY_DELAY_MS")
                .map(Duration::from_millis)
                .unwrap_or(d.retry_delay),
            timeout: env_u64("RAGCTX_RENDER_TIMEOUT_MS")
                .map(Duration::from_millis)
                .unwrap_or(d.timeout),
        }
    }
}

#[derive(Debug, Clone)]
pub struct LlmConfig {
    pub base_url: String,
    pub api_key: Option<String>,
    pub model: String,
    pub timeout: Duration,
    pub temperature: f64,
    pub max_tokens: u64,
    /// Content longer than this (in chars) is cut before prompting.
    pub max_input_chars: usize,
}

impl LlmConfig {
    pub fn new(base_url: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            api_key: None,
            model: model.into(),
            timeout: Duration::from_secs(120),
            temperature: 0.3,
            max_tokens: 1024,
            max_input_chars: 30_000,
        }
    }

    pub fn from_env() -> Result<Self> {
        let base_url = env("RAGCTX_LLM_BASE_URL")
            .ok_or_else(|| Error::NotConfigured("missing RAGCTX_LLM_BASE_URL".to_string()))?;
        let model = env("RAGCTX_LLM_MODEL")
            .ok_or_else(|| Error::NotConfigured("missing RAGCTX_LLM_MODEL".to_string()))?;
        let mut cfg = Self::new(base_url, model);
        cfg.api_key = env("RAGCTX_LLM_API_KEY");
        if let Some(ms) = env_u64("RAGCTX_LLM_TIMEOUT_MS") {
            cfg.timeout = Duration::from_millis(ms);
        }
        Ok(cfg)
    }
}

#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub gateway: GatewayConfig,
    pub direct: DirectFetchConfig,
    pub render: RenderConfig,
    /// `None` when the LLM env is incomplete; render mode then refuses to start.
    pub llm: Option<LlmConfig>,
    pub concurrency: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            gateway: GatewayConfig::default(),
            direct: DirectFetchConfig::default(),
            render: RenderConfig::default(),
            llm: None,
            concurrency: DEFAULT_CONCURRENCY,
        }
    }
}

impl PipelineConfig {
    pub fn from_env() -> Self {
        Self {
            gateway: GatewayConfig::from_env(),
            direct: DirectFetchConfig::from_env(),
            render: RenderConfig::from_env(),
            llm: LlmConfig::from_env().ok(),
            concurrency: env_u64("RAGCTX_CONCURRENCY")
                .map(|n| n.max(1) as usize)
                .unwrap_or(DEFAULT_CONCURRENCY),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    // Env vars are process-global; serialize tests that mutate them.
    static ENV_LOCK: Mutex<()> = Mutex::new(());

    struct EnvGuard {
        k: &'static str,
        prev: Option<String>,
    }

    impl EnvGuard {
        fn set(k: &'static str, v: &str) -> Self {
            let prev = std::env::var(k).ok();
            std::env::set_var(k, v);
            Self { k, prev }
        }
    }

    impl Drop for EnvGuard {
        fn drop(&mut self) {
            if let Some(v) = self.prev.take() {
                std::env::set_var(self.k, v);
            } else {
                std::env::remove_var(self.k);
            }
        }
    }

    #[test]
    fn gateway_defaults_verify_tls() {
        let _lock = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        let _g = EnvGuard::set("RAGCTX_GATEWAY_INSECURE_TLS", "");
        let cfg = GatewayConfig::from_env();
        assert!(cfg.verify_tls);
    }

    #[test]
    fn insecure_tls_is_an_explicit_opt_in() {
        let _lock = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        let _g = EnvGuard::set("RAGCTX_GATEWAY_INSECURE_TLS", "true");
        assert!(!GatewayConfig::from_env().verify_tls);
    }

    #[test]
    fn empty_llm_env_is_treated_as_missing() {
        let _lock = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        let _g1 = EnvGuard::set("RAGCTX_LLM_BASE_URL", "   ");
        let _g2 = EnvGuard::set("RAGCTX_LLM_MODEL", "m");
        assert!(matches!(LlmConfig::from_env(), Err(Error::NotConfigured(_))));
    }

    #[test]
    fn user_agent_pool_accepts_pipe_separated_list() {
        let _lock = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        let _g = EnvGuard::set("RAGCTX_USER_AGENTS", "ua-one | ua-two||");
        let cfg = DirectFetchConfig::from_env();
        assert_eq!(cfg.user_agents, vec!["ua-one".to_string(), "ua-two".to_string()]);
    }

    #[test]
    fn render_attempts_are_clamped() {
        let _lock = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        let _g = EnvGuard::set("RAGCTX_RENDER_MAX_ATTEMPTS", "0");
        assert_eq!(RenderConfig::from_env().max_attempts, 1);
    }
}
