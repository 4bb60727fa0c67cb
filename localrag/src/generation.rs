//! Answer generation.
//!
//! A [`Generator`] produces either a whole answer or a stream of text
//! fragments. Streams are lazy and finite; dropping one cancels the
//! underlying request, and fragments already yielded stay valid.

use std::pin::Pin;
use std::sync::Arc;

use async_trait::async_trait;
use futures::Stream;
use tracing::{info, warn};

use crate::error::Result;

/// A stream of generated text fragments.
pub type TextStream = Pin<Box<dyn Stream<Item = Result<String>> + Send>>;

/// A language model that answers a prompt.
#[async_trait]
pub trait Generator: Send + Sync {
    /// Model or provider name used in logs and errors.
    fn name(&self) -> &str;

    /// Generate a complete answer.
    async fn generate(&self, prompt: &str) -> Result<String>;

    /// Generate an answer as a stream of fragments.
    ///
    /// Each call opens a fresh stream. The default implementation yields
    /// the whole answer from [`generate`](Generator::generate) as one fragment.
    async fn generate_stream(&self, prompt: &str) -> Result<TextStream> {
        let answer = self.generate(prompt).await?;
        Ok(Box::pin(futures::stream::once(async move { Ok(answer) })))
    }

    /// Whether the backing service is reachable.
    async fn health_check(&self) -> bool {
        true
    }
}

/// Tries a secondary generator when the primary's answer is implausibly short.
///
/// This is a quality fallback, not error recovery: a primary failure is
/// returned unchanged, and a secondary failure keeps the primary's answer.
/// Streaming always uses the primary, since a fragment stream cannot be
/// judged until it has ended.
pub struct FallbackGenerator {
    primary: Arc<dyn Generator>,
    secondary: Arc<dyn Generator>,
    min_chars: usize,
}

impl FallbackGenerator {
    /// Answers shorter than this many characters trigger the fallback.
    pub const DEFAULT_MIN_CHARS: usize = 20;

    /// Create a fallback pair with [`DEFAULT_MIN_CHARS`](Self::DEFAULT_MIN_CHARS).
    pub fn new(primary: Arc<dyn Generator>, secondary: Arc<dyn Generator>) -> Self {
        Self { primary, secondary, min_chars: Self::DEFAULT_MIN_CHARS }
    }

    /// Set the minimum plausible answer length in characters.
    pub fn with_min_chars(mut self, min_chars: usize) -> Self {
        self.min_chars = min_chars;
        self
    }
}

#[async_trait]
impl Generator for FallbackGenerator {
    fn name(&self) -> &str {
        self.primary.name()
    }

    async fn generate(&self, prompt: &str) -> Result<String> {
        let answer = self.primary.generate(prompt).await?;
        let length = answer.trim().chars().count();
        if length >= self.min_chars {
            return Ok(answer);
        }

        info!(
            primary = self.primary.name(),
            secondary = self.secondary.name(),
            answer_chars = length,
            "primary answer too short, trying fallback generator"
        );
        match self.secondary.generate(prompt).await {
            Ok(fallback) => Ok(fallback),
            Err(e) => {
                warn!(secondary = self.secondary.name(), error = %e, "fallback generator failed");
                Ok(answer)
            }
        }
    }

    async fn generate_stream(&self, prompt: &str) -> Result<TextStream> {
        self.primary.generate_stream(prompt).await
    }

    async fn health_check(&self) -> bool {
        self.primary.health_check().await
    }
}
