//! Ollama embedding and generation clients.
//!
//! This module is only available when the `ollama` feature is enabled.
//! It talks to a local Ollama server over its HTTP API:
//!
//! - `POST /api/embeddings` for embeddings (retried with exponential backoff)
//! - `POST /api/generate` for answers, whole or streamed as NDJSON
//! - `GET /api/tags` for health checks

use std::time::Duration;

use async_stream::try_stream;
use async_trait::async_trait;
use futures::StreamExt;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, warn};

use crate::embedding::EmbeddingProvider;
use crate::error::{RagError, Result};
use crate::generation::{Generator, TextStream};

/// The default Ollama endpoint.
pub const DEFAULT_BASE_URL: &str = "http://localhost:11434";

const PROVIDER: &str = "ollama";

/// Connection settings shared by the Ollama clients.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OllamaConfig {
    /// Server base URL, without a trailing slash.
    pub base_url: String,
    /// Deadline for a whole non-streaming request. Streaming responses are
    /// only bounded by this much silence between body reads.
    pub timeout: Duration,
    /// Retries after the first failed embedding attempt.
    pub max_retries: u32,
    /// Delay before the first retry; doubled on every further attempt.
    pub retry_delay: Duration,
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: Duration::from_secs(120),
            max_retries: 2,
            retry_delay: Duration::from_millis(500),
        }
    }
}

impl OllamaConfig {
    /// Settings for a server at `base_url` with default timeouts and retries.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self { base_url: base_url.into().trim_end_matches('/').to_string(), ..Self::default() }
    }

    /// Set the request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the retry budget for embedding requests.
    pub fn with_retries(mut self, max_retries: u32, retry_delay: Duration) -> Self {
        self.max_retries = max_retries;
        self.retry_delay = retry_delay;
        self
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    fn http_client(&self) -> Result<reqwest::Client> {
        reqwest::Client::builder()
            .connect_timeout(self.timeout)
            .read_timeout(self.timeout)
            .build()
            .map_err(|e| RagError::ConfigError(format!("failed to build Ollama HTTP client: {e}")))
    }
}

/// Doubling stops after this many retries.
const MAX_BACKOFF_EXPONENT: u32 = 10;

fn backoff_delay(base: Duration, attempt: u32) -> Duration {
    base.saturating_mul(1 << attempt.min(MAX_BACKOFF_EXPONENT))
}

async fn server_reachable(client: &reqwest::Client, config: &OllamaConfig) -> bool {
    match client.get(config.url("/api/tags")).timeout(config.timeout).send().await {
        Ok(response) => response.status().is_success(),
        Err(e) => {
            debug!(provider = PROVIDER, error = %e, "health check failed");
            false
        }
    }
}

// ── Ollama API request/response types ──────────────────────────────

#[derive(Serialize)]
struct EmbedRequest<'a> {
    model: &'a str,
    prompt: &'a str,
}

#[derive(Deserialize)]
struct EmbedResponse {
    embedding: Vec<f32>,
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
}

/// One object of a `/api/generate` response (whole or streamed).
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct GenerateChunk {
    /// Text produced since the previous chunk.
    #[serde(default)]
    pub response: String,
    /// Set on the final chunk.
    #[serde(default)]
    pub done: bool,
}

// ── Embeddings ─────────────────────────────────────────────────────

/// An [`EmbeddingProvider`] backed by an Ollama embedding model.
///
/// # Example
///
/// ```rust,ignore
/// use localrag::ollama::{OllamaConfig, OllamaEmbedder};
///
/// let embedder = OllamaEmbedder::new(OllamaConfig::default(), "mxbai-embed-large", 1024)?;
/// let embedding = embedder.embed("hello world").await?;
/// ```
pub struct OllamaEmbedder {
    client: reqwest::Client,
    config: OllamaConfig,
    model: String,
    dimensions: usize,
}

impl OllamaEmbedder {
    /// Create an embedder for `model`, which produces `dimensions`-long vectors.
    pub fn new(config: OllamaConfig, model: impl Into<String>, dimensions: usize) -> Result<Self> {
        Ok(Self { client: config.http_client()?, config, model: model.into(), dimensions })
    }

    /// The embedding model name.
    pub fn model(&self) -> &str {
        &self.model
    }

    async fn embed_once(&self, text: &str) -> Result<Vec<f32>> {
        let response = self
            .client
            .post(self.config.url("/api/embeddings"))
            .timeout(self.config.timeout)
            .json(&EmbedRequest { model: &self.model, prompt: text })
            .send()
            .await
            .map_err(|e| RagError::embedding(PROVIDER, format!("request failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(RagError::embedding(PROVIDER, format!("API returned {status}: {body}")));
        }

        let parsed: EmbedResponse = response.json().await.map_err(|e| {
            RagError::embedding(PROVIDER, format!("failed to parse response: {e}"))
        })?;
        Ok(parsed.embedding)
    }
}

#[async_trait]
impl EmbeddingProvider for OllamaEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        debug!(provider = PROVIDER, model = %self.model, text_len = text.len(), "embedding text");

        let mut attempt = 0;
        loop {
            match self.embed_once(text).await {
                Ok(embedding) => return Ok(embedding),
                Err(e) if attempt < self.config.max_retries => {
                    let delay = backoff_delay(self.config.retry_delay, attempt);
                    warn!(
                        provider = PROVIDER,
                        attempt = attempt + 1,
                        max_attempts = self.config.max_retries + 1,
                        ?delay,
                        error = %e,
                        "embedding request failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => {
                    error!(provider = PROVIDER, model = %self.model, error = %e, "embedding failed");
                    return Err(e);
                }
            }
        }
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    async fn health_check(&self) -> bool {
        server_reachable(&self.client, &self.config).await
    }
}

// ── Generation ─────────────────────────────────────────────────────

/// A [`Generator`] backed by an Ollama language model.
///
/// Generation requests are not retried.
pub struct OllamaGenerator {
    client: reqwest::Client,
    config: OllamaConfig,
    model: String,
}

impl OllamaGenerator {
    /// Create a generator for `model`.
    pub fn new(config: OllamaConfig, model: impl Into<String>) -> Result<Self> {
        Ok(Self { client: config.http_client()?, config, model: model.into() })
    }

    async fn send(&self, prompt: &str, stream: bool) -> Result<reqwest::Response> {
        let mut request = self
            .client
            .post(self.config.url("/api/generate"))
            .json(&GenerateRequest { model: &self.model, prompt, stream });
        if !stream {
            request = request.timeout(self.config.timeout);
        }
        let response = request
            .send()
            .await
            .map_err(|e| RagError::generation(PROVIDER, format!("request failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(RagError::generation(PROVIDER, format!("API returned {status}: {body}")));
        }
        Ok(response)
    }
}

#[async_trait]
impl Generator for OllamaGenerator {
    fn name(&self) -> &str {
        &self.model
    }

    async fn generate(&self, prompt: &str) -> Result<String> {
        debug!(provider = PROVIDER, model = %self.model, prompt_len = prompt.len(), "generating");
        let response = self.send(prompt, false).await?;
        let chunk: GenerateChunk = response.json().await.map_err(|e| {
            RagError::generation(PROVIDER, format!("failed to parse response: {e}"))
        })?;
        Ok(chunk.response.trim().to_string())
    }

    async fn generate_stream(&self, prompt: &str) -> Result<TextStream> {
        debug!(provider = PROVIDER, model = %self.model, prompt_len = prompt.len(), "streaming");
        let response = self.send(prompt, true).await?;

        let stream = try_stream! {
            let mut bytes = response.bytes_stream();
            let mut decoder = NdjsonDecoder::default();
            let mut done = false;

            while !done {
                let Some(next) = bytes.next().await else { break };
                let data = next
                    .map_err(|e| RagError::generation(PROVIDER, format!("stream error: {e}")))?;
                for chunk in decoder.push(&data) {
                    if !chunk.response.is_empty() {
                        yield chunk.response;
                    }
                    if chunk.done {
                        done = true;
                        break;
                    }
                }
            }

            if !done {
                if let Some(chunk) = decoder.finish() {
                    if !chunk.response.is_empty() {
                        yield chunk.response;
                    }
                }
            }
        };

        Ok(Box::pin(stream))
    }

    async fn health_check(&self) -> bool {
        server_reachable(&self.client, &self.config).await
    }
}

/// Splits a byte stream into newline-delimited JSON objects.
///
/// Lines may be split across network reads; partial lines are buffered
/// until their newline arrives. Blank and malformed lines are skipped.
#[derive(Debug, Default)]
pub struct NdjsonDecoder {
    buffer: Vec<u8>,
}

impl NdjsonDecoder {
    /// Feed bytes, returning every complete chunk they finish.
    pub fn push(&mut self, bytes: &[u8]) -> Vec<GenerateChunk> {
        self.buffer.extend_from_slice(bytes);
        let mut chunks = Vec::new();
        while let Some(pos) = self.buffer.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = self.buffer.drain(..=pos).collect();
            if let Some(chunk) = parse_line(&line) {
                chunks.push(chunk);
            }
        }
        chunks
    }

    /// Parse whatever remains after the stream ends without a final newline.
    pub fn finish(&mut self) -> Option<GenerateChunk> {
        let line = std::mem::take(&mut self.buffer);
        parse_line(&line)
    }
}

fn parse_line(line: &[u8]) -> Option<GenerateChunk> {
    let trimmed = line.trim_ascii();
    if trimmed.is_empty() {
        return None;
    }
    match serde_json::from_slice(trimmed) {
        Ok(chunk) => Some(chunk),
        Err(e) => {
            debug!(provider = PROVIDER, error = %e, "skipping malformed stream line");
            None
        }
    }
}
