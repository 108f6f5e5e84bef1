//! TOML configuration.
//!
//! Every section and field has a default, so an empty file (or no file at
//! all, see [`load_or_default`]) yields a working configuration with the
//! rating service disabled.
//!
//! ```toml
//! [chunking]
//! max_chunk_size = 2000
//! overlap = 200
//!
//! [retrieval]
//! top_k = 3
//! max_context_length = 6000
//!
//! [rater]
//! provider = "gemini"
//! model = "gemini-1.5-flash"
//!
//! [server]
//! bind = "127.0.0.1:7341"
//! ```

use anyhow::{bail, Context, Result};
use docqa_context_core::assemble::AssembleOptions;
use docqa_context_core::chunk::{ChunkingOptions, DEFAULT_MAX_CHUNK_SIZE, DEFAULT_OVERLAP};
use docqa_context_core::pipeline::RetrievalOptions;
use docqa_context_core::prefilter::PrefilterOptions;
use docqa_context_core::rank::RankOptions;
use docqa_context_core::rater::DEFAULT_EXCERPT_CHARS;
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub chunking: ChunkingConfig,
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    #[serde(default)]
    pub rater: RaterConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ChunkingConfig {
    #[serde(default = "default_max_chunk_size")]
    pub max_chunk_size: usize,
    #[serde(default = "default_overlap")]
    pub overlap: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            max_chunk_size: DEFAULT_MAX_CHUNK_SIZE,
            overlap: DEFAULT_OVERLAP,
        }
    }
}

fn default_max_chunk_size() -> usize {
    DEFAULT_MAX_CHUNK_SIZE
}
fn default_overlap() -> usize {
    DEFAULT_OVERLAP
}

#[derive(Debug, Deserialize, Clone)]
pub struct RetrievalConfig {
    /// Chunks kept after ranking.
    #[serde(default = "default_top_k")]
    pub top_k: usize,
    #[serde(default = "default_max_context_length")]
    pub max_context_length: usize,
    #[serde(default = "default_min_partial_space")]
    pub min_partial_space: usize,
    /// Keyword scores must be strictly above this to pass the prefilter.
    #[serde(default = "default_keyword_threshold")]
    pub keyword_threshold: f64,
    /// Candidates kept by the prefilter.
    #[serde(default = "default_prefilter_limit")]
    pub prefilter_limit: usize,
    /// Prefilter candidates sent to the rater.
    #[serde(default = "default_candidate_limit")]
    pub candidate_limit: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: default_top_k(),
            max_context_length: default_max_context_length(),
            min_partial_space: default_min_partial_space(),
            keyword_threshold: default_keyword_threshold(),
            prefilter_limit: default_prefilter_limit(),
            candidate_limit: default_candidate_limit(),
        }
    }
}

fn default_top_k() -> usize {
    3
}
fn default_max_context_length() -> usize {
    6000
}
fn default_min_partial_space() -> usize {
    200
}
fn default_keyword_threshold() -> f64 {
    0.1
}
fn default_prefilter_limit() -> usize {
    10
}
fn default_candidate_limit() -> usize {
    6
}

#[derive(Debug, Deserialize, Clone)]
pub struct RaterConfig {
    /// `disabled`, `gemini`, or `ollama`.
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default)]
    pub model: Option<String>,
    /// Overrides the provider's default endpoint.
    #[serde(default)]
    pub url: Option<String>,
    /// Upper bound on one rating call, retries included.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    /// Rating calls in flight at once.
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
    #[serde(default = "default_excerpt_chars")]
    pub excerpt_chars: usize,
}

impl Default for RaterConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            model: None,
            url: None,
            timeout_ms: default_timeout_ms(),
            max_retries: default_max_retries(),
            concurrency: default_concurrency(),
            excerpt_chars: default_excerpt_chars(),
        }
    }
}

impl RaterConfig {
    pub fn is_enabled(&self) -> bool {
        self.provider != "disabled"
    }
}

fn default_provider() -> String {
    "disabled".to_string()
}
fn default_timeout_ms() -> u64 {
    5000
}
fn default_max_retries() -> u32 {
    2
}
fn default_concurrency() -> usize {
    2
}
fn default_excerpt_chars() -> usize {
    DEFAULT_EXCERPT_CHARS
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

fn default_bind() -> String {
    "127.0.0.1:7341".to_string()
}

impl Config {
    /// All defaults, rating disabled.
    pub fn minimal() -> Self {
        Self::default()
    }

    pub fn chunking_options(&self) -> ChunkingOptions {
        ChunkingOptions {
            max_chunk_size: self.chunking.max_chunk_size,
            overlap: self.chunking.overlap,
        }
    }

    /// Pipeline options derived from the `[chunking]`, `[retrieval]`, and
    /// `[rater]` sections.
    pub fn retrieval_options(&self) -> RetrievalOptions {
        RetrievalOptions {
            chunking: self.chunking_options(),
            prefilter: PrefilterOptions {
                threshold: self.retrieval.keyword_threshold,
                top_n: self.retrieval.prefilter_limit,
            },
            rank: RankOptions {
                top_k: self.retrieval.top_k,
                candidate_limit: self.retrieval.candidate_limit,
                concurrency: self.rater.concurrency,
                excerpt_chars: self.rater.excerpt_chars,
            },
            assemble: AssembleOptions {
                max_context_length: self.retrieval.max_context_length,
                min_partial_space: self.retrieval.min_partial_space,
            },
        }
    }

    pub fn validate(&self) -> Result<()> {
        self.chunking_options()
            .validate()
            .context("invalid [chunking] section")?;

        let r = &self.retrieval;
        if r.top_k == 0 {
            bail!("retrieval.top_k must be >= 1");
        }
        if r.max_context_length == 0 {
            bail!("retrieval.max_context_length must be > 0");
        }
        if !(0.0..=1.0).contains(&r.keyword_threshold) {
            bail!("retrieval.keyword_threshold must be in [0.0, 1.0]");
        }
        if r.prefilter_limit == 0 {
            bail!("retrieval.prefilter_limit must be >= 1");
        }

        match self.rater.provider.as_str() {
            "disabled" | "gemini" | "ollama" => {}
            other => bail!(
                "Unknown rater provider: '{}'. Must be disabled, gemini, or ollama.",
                other
            ),
        }
        if self.rater.timeout_ms == 0 {
            bail!("rater.timeout_ms must be > 0");
        }
        if self.rater.concurrency == 0 {
            bail!("rater.concurrency must be >= 1");
        }

        Ok(())
    }
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;
    config.validate()?;
    Ok(config)
}

/// Like [`load_config`], but a missing file yields [`Config::minimal`].
pub fn load_or_default(path: &Path) -> Result<Config> {
    if path.exists() {
        load_config(path)
    } else {
        tracing::debug!(path = %path.display(), "config file not found, using defaults");
        Ok(Config::minimal())
    }
}
