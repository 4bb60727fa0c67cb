//! Prompt assembly for answer generation.
//!
//! The prompt layout is fixed: instructions, context, question, answer cue.
//! Evaluation harnesses depend on this order, so optional truncation only
//! ever removes whole context chunks from the end of the ranked list.

use crate::document::Hit;

const INSTRUCTIONS: &str = "You are a helpful assistant. Use the provided context to answer the question.\n\
If the answer isn't in the context, say you don't know.";

/// Builds generation prompts from ranked context chunks.
///
/// # Example
///
/// ```rust,ignore
/// use localrag::PromptBuilder;
///
/// let prompt = PromptBuilder::new().build("What is X?", &["X is a letter."]);
/// assert!(prompt.ends_with("Answer:"));
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PromptBuilder {
    max_context_chars: Option<usize>,
}

impl PromptBuilder {
    /// Create a builder that includes every context chunk.
    pub fn new() -> Self {
        Self::default()
    }

    /// Limit the joined context to `max_chars` characters.
    ///
    /// Lowest-ranked chunks that do not fit are dropped whole. The
    /// top-ranked chunk is always kept.
    pub fn with_max_context_chars(mut self, max_chars: usize) -> Self {
        self.max_context_chars = Some(max_chars);
        self
    }

    /// Build a prompt from context chunks in ranked order.
    pub fn build<S: AsRef<str>>(&self, question: &str, context_chunks: &[S]) -> String {
        let context = self.join_context(context_chunks);
        format!("{INSTRUCTIONS}\n\nContext:\n{context}\n\nQuestion: {question}\n\nAnswer:")
    }

    /// Build a prompt from ranked hits.
    pub fn build_from_hits(&self, question: &str, hits: &[Hit]) -> String {
        let chunks: Vec<&str> = hits.iter().map(Hit::text).collect();
        self.build(question, &chunks)
    }

    fn join_context<S: AsRef<str>>(&self, chunks: &[S]) -> String {
        let Some(limit) = self.max_context_chars else {
            return chunks.iter().map(AsRef::as_ref).collect::<Vec<_>>().join("\n\n");
        };

        let mut kept: Vec<&str> = Vec::new();
        let mut used = 0;
        for chunk in chunks.iter().map(AsRef::as_ref) {
            let separator = if kept.is_empty() { 0 } else { 2 };
            let cost = separator + chunk.chars().count();
            if !kept.is_empty() && used + cost > limit {
                break;
            }
            used += cost;
            kept.push(chunk);
        }
        kept.join("\n\n")
    }
}
