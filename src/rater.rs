//! Rating service providers.
//!
//! Concrete [`Rater`] implementations behind the core crate's trait:
//!
//! - **[`DisabledRater`]**: fails every call, so the ranker falls back to
//!   keyword scores. Used when `[rater].provider = "disabled"`.
//! - **[`GeminiRater`]**: Google Generative Language `generateContent`.
//!   Requires `GEMINI_API_KEY` in the environment.
//! - **[`OllamaRater`]**: a local Ollama server's `/api/generate`.
//!
//! # Retry Strategy
//!
//! Both HTTP providers retry transient errors with exponential backoff:
//! - HTTP 429 (rate limited) and 5xx (server error) → retry
//! - HTTP 4xx (client error, not 429) → fail immediately
//! - Network errors → retry
//!
//! [`create_rater`] wraps whichever provider is configured in a
//! [`TimeoutRater`], which bounds each call (retries included) by
//! `rater.timeout_ms`.

use anyhow::{anyhow, bail, Result};
use async_trait::async_trait;
use docqa_context_core::rater::Rater;
use std::sync::Arc;
use std::time::Duration;

use crate::config::RaterConfig;

const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com";
const DEFAULT_GEMINI_MODEL: &str = "gemini-1.5-flash";
const OLLAMA_BASE_URL: &str = "http://localhost:11434";
const DEFAULT_OLLAMA_MODEL: &str = "llama3";

/// First retry delay; doubles on each further attempt.
const BASE_BACKOFF_MS: u64 = 250;

/// Build the rater described by `config`, wrapped in a per-call timeout.
pub fn create_rater(config: &RaterConfig) -> Result<Arc<dyn Rater>> {
    let inner: Box<dyn Rater> = match config.provider.as_str() {
        "disabled" => Box::new(DisabledRater),
        "gemini" => Box::new(GeminiRater::from_env(config)?),
        "ollama" => Box::new(OllamaRater::new(config)?),
        other => bail!("Unknown rater provider: {}", other),
    };
    tracing::debug!(provider = inner.name(), timeout_ms = config.timeout_ms, "rater ready");
    Ok(Arc::new(TimeoutRater::new(
        inner,
        Duration::from_millis(config.timeout_ms),
    )))
}

// ============ Disabled ============

pub struct DisabledRater;

#[async_trait]
impl Rater for DisabledRater {
    fn name(&self) -> &str {
        "disabled"
    }

    async fn rate(&self, _prompt: &str) -> Result<String> {
        bail!("rating is disabled. Set [rater].provider in config.")
    }
}

// ============ Timeout ============

/// Bounds every call of the wrapped rater by a fixed duration.
pub struct TimeoutRater {
    inner: Box<dyn Rater>,
    timeout: Duration,
}

impl TimeoutRater {
    pub fn new(inner: Box<dyn Rater>, timeout: Duration) -> Self {
        Self { inner, timeout }
    }
}

#[async_trait]
impl Rater for TimeoutRater {
    fn name(&self) -> &str {
        self.inner.name()
    }

    async fn rate(&self, prompt: &str) -> Result<String> {
        match tokio::time::timeout(self.timeout, self.inner.rate(prompt)).await {
            Ok(result) => result,
            Err(_) => Err(anyhow!(
                "{} rating timed out after {}ms",
                self.inner.name(),
                self.timeout.as_millis()
            )),
        }
    }
}

// ============ Gemini ============

pub struct GeminiRater {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
    max_retries: u32,
}

impl GeminiRater {
    pub fn from_env(config: &RaterConfig) -> Result<Self> {
        let api_key = std::env::var("GEMINI_API_KEY")
            .map_err(|_| anyhow!("GEMINI_API_KEY not set"))?;
        Self::new(config, api_key)
    }

    pub fn new(config: &RaterConfig, api_key: String) -> Result<Self> {
        let model = config.model.as_deref().unwrap_or(DEFAULT_GEMINI_MODEL);
        let base = config.url.as_deref().unwrap_or(GEMINI_BASE_URL);
        Ok(Self {
            client: http_client(config)?,
            endpoint: format!(
                "{}/v1beta/models/{}:generateContent",
                base.trim_end_matches('/'),
                model
            ),
            api_key,
            max_retries: config.max_retries,
        })
    }
}

#[async_trait]
impl Rater for GeminiRater {
    fn name(&self) -> &str {
        "gemini"
    }

    async fn rate(&self, prompt: &str) -> Result<String> {
        let body = serde_json::json!({
            "contents": [{ "parts": [{ "text": prompt }] }],
        });
        let json = post_json_with_retry(self.max_retries, "Gemini", || {
            self.client
                .post(&self.endpoint)
                .header("x-goog-api-key", &self.api_key)
                .json(&body)
        })
        .await?;
        parse_gemini_response(&json)
    }
}

/// Extract `candidates[0].content.parts[*].text`, concatenated.
fn parse_gemini_response(json: &serde_json::Value) -> Result<String> {
    let parts = json
        .pointer("/candidates/0/content/parts")
        .and_then(|p| p.as_array())
        .ok_or_else(|| anyhow!("Invalid Gemini response: missing candidates"))?;

    let text: String = parts
        .iter()
        .filter_map(|p| p.get("text").and_then(|t| t.as_str()))
        .collect();
    if text.is_empty() {
        bail!("Invalid Gemini response: empty text");
    }
    Ok(text)
}

// ============ Ollama ============

pub struct OllamaRater {
    client: reqwest::Client,
    endpoint: String,
    model: String,
    max_retries: u32,
}

impl OllamaRater {
    pub fn new(config: &RaterConfig) -> Result<Self> {
        let base = config.url.as_deref().unwrap_or(OLLAMA_BASE_URL);
        Ok(Self {
            client: http_client(config)?,
            endpoint: format!("{}/api/generate", base.trim_end_matches('/')),
            model: config
                .model
                .clone()
                .unwrap_or_else(|| DEFAULT_OLLAMA_MODEL.to_string()),
            max_retries: config.max_retries,
        })
    }
}

#[async_trait]
impl Rater for OllamaRater {
    fn name(&self) -> &str {
        "ollama"
    }

    async fn rate(&self, prompt: &str) -> Result<String> {
        let body = serde_json::json!({
            "model": self.model,
            "prompt": prompt,
            "stream": false,
        });
        let json = post_json_with_retry(self.max_retries, "Ollama", || {
            self.client.post(&self.endpoint).json(&body)
        })
        .await?;

        json.get("response")
            .and_then(|r| r.as_str())
            .map(str::to_string)
            .ok_or_else(|| anyhow!("Invalid Ollama response: missing response field"))
    }
}

// ============ Shared HTTP ============

fn http_client(config: &RaterConfig) -> Result<reqwest::Client> {
    Ok(reqwest::Client::builder()
        .timeout(Duration::from_millis(config.timeout_ms))
        .build()?)
}

/// Send the request built by `build` until it succeeds or retries run out.
///
/// - HTTP 429 or 5xx → retry with exponential backoff
/// - HTTP 4xx (not 429) → fail immediately
/// - Network error → retry
async fn post_json_with_retry<F>(
    max_retries: u32,
    label: &str,
    build: F,
) -> Result<serde_json::Value>
where
    F: Fn() -> reqwest::RequestBuilder,
{
    let mut last_err = None;

    for attempt in 0..=max_retries {
        if attempt > 0 {
            // 250ms, 500ms, 1s, 2s, ...
            let delay = Duration::from_millis(BASE_BACKOFF_MS << (attempt - 1).min(5));
            tokio::time::sleep(delay).await;
        }

        match build().send().await {
            Ok(response) => {
                let status = response.status();

                if status.is_success() {
                    return Ok(response.json().await?);
                }

                let body_text = response.text().await.unwrap_or_default();
                if status.as_u16() == 429 || status.is_server_error() {
                    tracing::debug!(%status, attempt, "{} API transient error", label);
                    last_err = Some(anyhow!("{} API error {}: {}", label, status, body_text));
                    continue;
                }

                bail!("{} API error {}: {}", label, status, body_text);
            }
            Err(e) => {
                last_err = Some(e.into());
                continue;
            }
        }
    }

    Err(last_err.unwrap_or_else(|| anyhow!("{} rating failed after retries", label)))
}
