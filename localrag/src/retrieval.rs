//! Retrieval and answering: embed → search → rank → prompt → generate.

use std::cmp::Ordering;

use serde::Serialize;
use tracing::{error, info, warn};

use crate::document::Hit;
use crate::error::{RagError, Result};
use crate::generation::{Generator, TextStream};
use crate::pipeline::RagPipeline;
use crate::vectorstore::ScoredRecord;

/// Order search results into ranked hits.
///
/// Sorts by descending score with a stable sort, so equal scores keep the
/// order the index returned them in. Results below `threshold` are dropped
/// and at most `top_k` hits are kept.
pub fn rank_hits(records: Vec<ScoredRecord>, top_k: usize, threshold: Option<f32>) -> Vec<Hit> {
    let mut records: Vec<ScoredRecord> = records
        .into_iter()
        .filter(|r| threshold.is_none_or(|min| r.score >= min))
        .collect();
    records.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal));
    records.truncate(top_k);
    records
        .into_iter()
        .enumerate()
        .map(|(rank, record)| Hit { id: record.id, score: record.score, rank, metadata: record.metadata })
        .collect()
}

/// The answer to a question.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Answer {
    /// Retrieval found nothing to answer from. Not an error.
    NoContext,
    /// A generated answer and the hits it was conditioned on.
    Generated {
        /// The generated text.
        text: String,
        /// Context hits in rank order.
        sources: Vec<Hit>,
    },
}

/// A streaming answer.
pub enum AnswerStream {
    /// Retrieval found nothing to answer from. Not an error.
    NoContext,
    /// Hits in rank order plus the generator's fragment stream.
    Streaming {
        /// Context hits in rank order.
        sources: Vec<Hit>,
        /// Generated fragments; drop to cancel.
        fragments: TextStream,
    },
}

impl RagPipeline {
    /// Retrieve the `top_k` chunks most similar to `question`.
    ///
    /// Returns an empty list when `top_k` is zero or the collection is empty
    /// or missing.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::EmbeddingError`] if the question cannot be
    /// embedded, or the vector store's error if the search fails.
    pub async fn retrieve(&self, question: &str, top_k: usize) -> Result<Vec<Hit>> {
        if top_k == 0 {
            return Ok(Vec::new());
        }

        // 1. Embed the question once
        let query_embedding = self.embedding_provider.embed(question).await.inspect_err(|e| {
            error!(error = %e, "embedding failed during query");
        })?;
        self.check_dimension(&query_embedding)?;

        // 2. Search the vector store
        let collection = &self.config.collection;
        let records = match self.vector_store.search(collection, &query_embedding, top_k).await {
            Ok(records) => records,
            Err(RagError::CollectionNotFound(_)) => {
                warn!(collection = %collection, "searched a missing collection, returning no hits");
                Vec::new()
            }
            Err(e) => {
                error!(collection = %collection, error = %e, "vector store search failed");
                return Err(e);
            }
        };

        // 3. Rank
        let hits = rank_hits(records, top_k, self.config.similarity_threshold);
        info!(result_count = hits.len(), top_k, "retrieval completed");
        Ok(hits)
    }

    /// Answer a question from the top `top_k` retrieved chunks.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::ConfigError`] if no generator is configured, or
    /// any retrieval or generation error.
    pub async fn ask(&self, question: &str, top_k: usize) -> Result<Answer> {
        let generator = self.require_generator()?;
        let sources = self.retrieve(question, top_k).await?;
        if sources.is_empty() {
            info!("no context found for question");
            return Ok(Answer::NoContext);
        }

        let prompt = self.prompt_builder.build_from_hits(question, &sources);
        let text = generator.generate(&prompt).await.inspect_err(|e| {
            error!(generator = generator.name(), error = %e, "generation failed");
        })?;
        info!(generator = generator.name(), source_count = sources.len(), "answer generated");
        Ok(Answer::Generated { text, sources })
    }

    /// Answer a question as a stream of fragments.
    ///
    /// # Errors
    ///
    /// Same as [`ask`](RagPipeline::ask); errors during streaming are
    /// yielded by the fragment stream.
    pub async fn ask_stream(&self, question: &str, top_k: usize) -> Result<AnswerStream> {
        let generator = self.require_generator()?;
        let sources = self.retrieve(question, top_k).await?;
        if sources.is_empty() {
            info!("no context found for question");
            return Ok(AnswerStream::NoContext);
        }

        let prompt = self.prompt_builder.build_from_hits(question, &sources);
        let fragments = generator.generate_stream(&prompt).await.inspect_err(|e| {
            error!(generator = generator.name(), error = %e, "failed to open generation stream");
        })?;
        Ok(AnswerStream::Streaming { sources, fragments })
    }

    fn require_generator(&self) -> Result<&dyn Generator> {
        self.generator
            .as_deref()
            .ok_or_else(|| RagError::ConfigError("no generator configured".to_string()))
    }
}
