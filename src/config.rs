use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub storage: StorageConfig,
    #[serde(default)]
    pub chunking: ChunkingConfig,
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    #[serde(default)]
    pub answer: AnswerConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct StorageConfig {
    /// Root directory owning `documents/` and `index/`. Created lazily on
    /// first ingest and removed entirely when the last document is evicted.
    pub root: PathBuf,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ChunkingConfig {
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
    #[serde(default = "default_overlap")]
    pub overlap: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: default_chunk_size(),
            overlap: default_overlap(),
        }
    }
}

fn default_chunk_size() -> usize {
    1000
}
fn default_overlap() -> usize {
    200
}

#[derive(Debug, Deserialize, Clone)]
pub struct RetrievalConfig {
    #[serde(default = "default_top_k")]
    pub top_k: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: default_top_k(),
        }
    }
}

fn default_top_k() -> usize {
    5
}

#[derive(Debug, Deserialize, Clone)]
pub struct EmbeddingConfig {
    /// `hash`, `openai`, or `disabled`.
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default = "default_dims")]
    pub dims: usize,
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            model: None,
            dims: default_dims(),
            batch_size: default_batch_size(),
            max_retries: default_max_retries(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_provider() -> String {
    "hash".to_string()
}
fn default_dims() -> usize {
    128
}
fn default_batch_size() -> usize {
    64
}
fn default_max_retries() -> u32 {
    5
}
fn default_timeout_secs() -> u64 {
    30
}

#[derive(Debug, Deserialize, Clone)]
pub struct AnswerConfig {
    /// Base URL of an OpenAI-compatible chat completions API.
    #[serde(default = "default_answer_base_url")]
    pub base_url: String,
    #[serde(default = "default_answer_model")]
    pub model: String,
    #[serde(default = "default_answer_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for AnswerConfig {
    fn default() -> Self {
        Self {
            base_url: default_answer_base_url(),
            model: default_answer_model(),
            timeout_secs: default_answer_timeout_secs(),
        }
    }
}

fn default_answer_base_url() -> String {
    "https://api.groq.com/openai/v1".to_string()
}
fn default_answer_model() -> String {
    "deepseek-r1-distill-llama-70b".to_string()
}
fn default_answer_timeout_secs() -> u64 {
    60
}

impl EmbeddingConfig {
    pub fn is_enabled(&self) -> bool {
        self.provider != "disabled"
    }

    /// Tag persisted alongside index vectors so a saved index built under
    /// one scheme is never silently served under another.
    pub fn scheme_tag(&self) -> String {
        match self.model {
            Some(ref m) => format!("{}:{}", self.provider, m),
            None => self.provider.clone(),
        }
    }
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;
    validate(&config)?;
    Ok(config)
}

pub fn validate(config: &Config) -> Result<()> {
    if config.chunking.chunk_size == 0 {
        anyhow::bail!("chunking.chunk_size must be > 0");
    }
    if config.chunking.overlap >= config.chunking.chunk_size {
        anyhow::bail!("chunking.overlap must be < chunking.chunk_size");
    }
    if config.retrieval.top_k == 0 {
        anyhow::bail!("retrieval.top_k must be >= 1");
    }

    if config.embedding.is_enabled() && config.embedding.dims == 0 {
        anyhow::bail!(
            "embedding.dims must be > 0 when provider is '{}'",
            config.embedding.provider
        );
    }
    if config.embedding.provider == "openai" && config.embedding.model.is_none() {
        anyhow::bail!("embedding.model must be specified when provider is 'openai'");
    }

    match config.embedding.provider.as_str() {
        "hash" | "openai" | "disabled" => {}
        other => anyhow::bail!(
            "Unknown embedding provider: '{}'. Must be hash, openai, or disabled.",
            other
        ),
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_config() -> Config {
        Config {
            storage: StorageConfig {
                root: PathBuf::from("/tmp/docket"),
            },
            chunking: ChunkingConfig::default(),
            retrieval: RetrievalConfig::default(),
            embedding: EmbeddingConfig::default(),
            answer: AnswerConfig::default(),
        }
    }

    #[test]
    fn test_defaults_valid() {
        assert!(validate(&base_config()).is_ok());
    }

    #[test]
    fn test_overlap_must_be_smaller_than_chunk_size() {
        let mut config = base_config();
        config.chunking.chunk_size = 100;
        config.chunking.overlap = 100;
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_openai_requires_model() {
        let mut config = base_config();
        config.embedding.provider = "openai".to_string();
        config.embedding.model = None;
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_unknown_provider_rejected() {
        let mut config = base_config();
        config.embedding.provider = "faiss".to_string();
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_scheme_tag_includes_model() {
        let mut embedding = EmbeddingConfig::default();
        assert_eq!(embedding.scheme_tag(), "hash");
        embedding.provider = "openai".to_string();
        embedding.model = Some("text-embedding-3-small".to_string());
        assert_eq!(embedding.scheme_tag(), "openai:text-embedding-3-small");
    }

    #[test]
    fn test_parse_minimal_toml() {
        let config: Config = toml::from_str("[storage]\nroot = \"./data\"\n").unwrap();
        assert_eq!(config.chunking.chunk_size, 1000);
        assert_eq!(config.chunking.overlap, 200);
        assert_eq!(config.embedding.provider, "hash");
        assert_eq!(config.embedding.dims, 128);
        assert_eq!(config.retrieval.top_k, 5);
    }
}
