//! Environment-driven settings.
//!
//! Every value has a default, so the server starts against a stock local
//! Ollama and Qdrant with no configuration at all. Values are read after
//! `.env` has been loaded by the binary.

use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

use localrag::ollama::OllamaConfig;
use localrag::{RagConfig, RagError, Result};
use serde::Serialize;

/// Output format of the log subscriber.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    /// Human-readable lines.
    #[default]
    Pretty,
    /// One JSON object per event.
    Json,
}

/// Runtime settings for the server and command line.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub ollama_url: String,
    pub embed_model: String,
    pub gen_model: String,
    /// Secondary model tried when the primary's answer is too short.
    pub fallback_model: Option<String>,
    pub qdrant_url: String,
    pub collection: String,
    pub embed_dim: usize,
    pub chunk_size: usize,
    pub chunk_overlap: usize,
    pub top_k: usize,
    pub request_timeout: Duration,
    pub max_retries: u32,
    pub bind_addr: SocketAddr,
    pub log_format: LogFormat,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            ollama_url: localrag::ollama::DEFAULT_BASE_URL.to_string(),
            embed_model: "mxbai-embed-large".to_string(),
            gen_model: "llama3.2".to_string(),
            fallback_model: None,
            qdrant_url: "http://localhost:6334".to_string(),
            collection: "docs".to_string(),
            embed_dim: 1024,
            chunk_size: 500,
            chunk_overlap: 50,
            top_k: 3,
            request_timeout: Duration::from_secs(120),
            max_retries: 2,
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 8080)),
            log_format: LogFormat::Pretty,
        }
    }
}

/// One line of the configuration summary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SettingEntry {
    pub name: &'static str,
    pub value: String,
}

impl Settings {
    /// Read settings from the process environment.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::ConfigError`] naming the variable when a value
    /// cannot be parsed.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read settings through `lookup`, falling back to defaults for
    /// missing or blank variables.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let defaults = Self::default();

        let request_timeout = match get("REQUEST_TIMEOUT_SECS") {
            Some(raw) => Duration::from_secs(parse("REQUEST_TIMEOUT_SECS", &raw)?),
            None => defaults.request_timeout,
        };
        let log_format = match get("LOG_FORMAT").as_deref() {
            Some("json") => LogFormat::Json,
            Some("pretty" | "text") | None => LogFormat::Pretty,
            Some(other) => {
                return Err(RagError::ConfigError(format!(
                    "LOG_FORMAT must be 'json' or 'pretty', got '{other}'"
                )));
            }
        };

        Ok(Self {
            ollama_url: get("OLLAMA_URL").unwrap_or(defaults.ollama_url),
            embed_model: get("EMBED_MODEL").unwrap_or(defaults.embed_model),
            gen_model: get("GEN_MODEL").unwrap_or(defaults.gen_model),
            fallback_model: get("FALLBACK_MODEL"),
            qdrant_url: get("QDRANT_URL").unwrap_or(defaults.qdrant_url),
            collection: get("QDRANT_COLLECTION").unwrap_or(defaults.collection),
            embed_dim: parse_or(&get, "EMBED_DIM", defaults.embed_dim)?,
            chunk_size: parse_or(&get, "CHUNK_SIZE", defaults.chunk_size)?,
            chunk_overlap: parse_or(&get, "CHUNK_OVERLAP", defaults.chunk_overlap)?,
            top_k: parse_or(&get, "TOP_K", defaults.top_k)?,
            request_timeout,
            max_retries: parse_or(&get, "MAX_RETRIES", defaults.max_retries)?,
            bind_addr: parse_or(&get, "BIND_ADDR", defaults.bind_addr)?,
            log_format,
        })
    }

    /// The pipeline configuration these settings describe.
    pub fn rag_config(&self) -> Result<RagConfig> {
        RagConfig::builder()
            .chunk_size(self.chunk_size)
            .chunk_overlap(self.chunk_overlap)
            .top_k(self.top_k)
            .collection(self.collection.clone())
            .embedding_dimension(self.embed_dim)
            .build()
    }

    /// Connection settings for the Ollama clients.
    pub fn ollama_config(&self) -> OllamaConfig {
        OllamaConfig::new(self.ollama_url.clone())
            .with_timeout(self.request_timeout)
            .with_retries(self.max_retries, OllamaConfig::default().retry_delay)
    }

    /// Human-readable settings in display order.
    pub fn summary(&self) -> Vec<SettingEntry> {
        let mut entries = vec![
            entry("Ollama URL", &self.ollama_url),
            entry("Embedding Model", &self.embed_model),
            entry("Generation Model", &self.gen_model),
        ];
        if let Some(fallback) = &self.fallback_model {
            entries.push(entry("Fallback Model", fallback));
        }
        entries.extend([
            entry("Qdrant URL", &self.qdrant_url),
            entry("Collection Name", &self.collection),
            entry("Embedding Dimension", self.embed_dim),
            entry("Chunk Size", self.chunk_size),
            entry("Chunk Overlap", self.chunk_overlap),
            entry("Top K Results", self.top_k),
        ]);
        entries
    }
}

fn entry(name: &'static str, value: impl ToString) -> SettingEntry {
    SettingEntry { name, value: value.to_string() }
}

fn parse<T>(key: &str, raw: &str) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    raw.parse()
        .map_err(|e| RagError::ConfigError(format!("invalid value '{raw}' for {key}: {e}")))
}

fn parse_or<T>(get: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match get(key) {
        Some(raw) => parse(key, &raw),
        None => Ok(default),
    }
}
