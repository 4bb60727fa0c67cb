//! End-to-end pipeline tests over the in-memory vector store.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use futures::StreamExt;
use localrag::{
    Answer, AnswerStream, CollectionStatus, Document, EmbeddingProvider, FileType, Generator,
    InMemoryVectorStore, IngestOutcome, RagConfig, RagError, RagPipeline, Result, Severity,
    SourceDocument,
};

const DIM: usize = 8;

/// Deterministic embedder: buckets characters by code point, plus a bias
/// component so no vector is zero. Texts containing `FAIL` are rejected.
struct MockEmbeddingProvider;

#[async_trait]
impl EmbeddingProvider for MockEmbeddingProvider {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        if text.contains("FAIL") {
            return Err(RagError::EmbeddingError {
                provider: "mock".into(),
                message: "model unavailable".into(),
            });
        }
        let mut vector = vec![0.0f32; DIM];
        for c in text.chars().filter(|c| !c.is_whitespace()) {
            vector[(c as usize) % (DIM - 1)] += 1.0;
        }
        vector[DIM - 1] = 1.0;
        Ok(vector)
    }

    fn dimensions(&self) -> usize {
        DIM
    }
}

/// Records every prompt and answers with a fixed sentence.
#[derive(Default)]
struct RecordingGenerator {
    prompts: Mutex<Vec<String>>,
}

#[async_trait]
impl Generator for RecordingGenerator {
    fn name(&self) -> &str {
        "recording"
    }

    async fn generate(&self, prompt: &str) -> Result<String> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        Ok("The warranty lasts two years.".to_string())
    }
}

fn config() -> RagConfig {
    RagConfig::builder()
        .chunk_size(40)
        .chunk_overlap(5)
        .top_k(3)
        .collection("test")
        .embedding_dimension(DIM)
        .build()
        .unwrap()
}

fn pipeline_with(generator: Option<Arc<RecordingGenerator>>) -> RagPipeline {
    let mut builder = RagPipeline::builder()
        .config(config())
        .embedding_provider(Arc::new(MockEmbeddingProvider))
        .vector_store(Arc::new(InMemoryVectorStore::new()));
    if let Some(generator) = generator {
        builder = builder.generator(generator);
    }
    builder.build().unwrap()
}

fn text_file(name: &str, text: &str) -> SourceDocument {
    SourceDocument::new(name, FileType::PlainText, text.as_bytes().to_vec())
}

#[tokio::test]
async fn ingest_stores_one_record_per_chunk_with_provenance() {
    let pipeline = pipeline_with(None);
    let text = "a".repeat(100);

    let outcome = pipeline.ingest(&text_file("long.txt", &text)).await.unwrap();

    // 100 chars, size 40, step 35: windows at 0, 35, 70
    assert_eq!(outcome.chunk_count(), 3);
    let info = pipeline.collection_info().await;
    assert_eq!(info.record_count, 3);
    assert_eq!(info.status, CollectionStatus::Ready);

    let hits = pipeline.retrieve(&"a".repeat(40), 3).await.unwrap();
    assert_eq!(hits.len(), 3);
    for hit in &hits {
        assert_eq!(hit.metadata.source_file, "long.txt");
        assert_eq!(hit.metadata.total_chunks, 3);
        assert_eq!(hit.metadata.file_type, FileType::PlainText);
    }
}

#[tokio::test]
async fn reingesting_duplicates_records_with_fresh_ids() {
    let pipeline = pipeline_with(None);
    let source = text_file("notes.txt", "The warranty lasts two years from purchase.");

    let first = pipeline.ingest(&source).await.unwrap();
    let second = pipeline.ingest(&source).await.unwrap();

    let (IngestOutcome::Stored { ids: a }, IngestOutcome::Stored { ids: b }) = (first, second)
    else {
        panic!("both ingestions should store records");
    };
    assert!(a.iter().all(|id| !b.contains(id)));
    assert_eq!(pipeline.collection_info().await.record_count, (a.len() + b.len()) as u64);
}

#[tokio::test]
async fn failed_document_stores_nothing_and_does_not_abort_batch() {
    let pipeline = pipeline_with(None);
    let batch = vec![
        text_file("good.txt", "first healthy document"),
        text_file("bad.txt", "this one will FAIL to embed"),
        text_file("also-good.txt", "second healthy document"),
    ];

    let report = pipeline.ingest_batch(&batch).await;

    assert_eq!(report.documents, 3);
    assert_eq!(report.stored_documents, 2);
    assert!(report.has_errors());
    assert_eq!(report.issues.len(), 1);
    assert_eq!(report.issues[0].source_file, "bad.txt");
    assert_eq!(report.issues[0].severity, Severity::Error);
    assert_eq!(pipeline.collection_info().await.record_count, report.chunk_count as u64);
}

#[tokio::test]
async fn failure_on_a_later_chunk_stores_none_of_the_document() {
    let pipeline = pipeline_with(None);
    pipeline.ingest(&text_file("good.txt", "The warranty covers two years.")).await.unwrap();
    let before = pipeline.collection_info().await.record_count;

    let text = format!("{} FAIL tail", "a".repeat(100));
    let chunks = localrag::chunk_text(&text, 40, 5).unwrap();
    assert!(chunks.len() >= 3);
    assert!(!chunks[0].text.contains("FAIL"));
    assert!(chunks.last().unwrap().chunk_index > 1);

    let err = pipeline.ingest(&text_file("partial.txt", &text)).await.unwrap_err();

    assert!(matches!(err, RagError::EmbeddingError { .. }));
    assert_eq!(pipeline.collection_info().await.record_count, before);
    let hits = pipeline.retrieve("aaaa", 10).await.unwrap();
    assert!(hits.iter().all(|hit| hit.metadata.source_file == "good.txt"));
}

#[tokio::test]
async fn empty_document_is_reported_as_warning() {
    let pipeline = pipeline_with(None);

    let outcome = pipeline.ingest(&text_file("blank.txt", "  \n\t ")).await.unwrap();
    assert_eq!(outcome, IngestOutcome::Empty);

    let report = pipeline
        .ingest_documents(&[Document::new("empty.txt", FileType::PlainText, "")])
        .await;
    assert!(!report.has_errors());
    assert_eq!(report.issues[0].severity, Severity::Warning);
    assert_eq!(report.chunk_count, 0);
}

#[tokio::test]
async fn invalid_utf8_is_an_extraction_error() {
    let pipeline = pipeline_with(None);
    let source = SourceDocument::new("broken.txt", FileType::PlainText, vec![0xff, 0xfe, 0x00]);

    let err = pipeline.ingest(&source).await.unwrap_err();
    assert!(matches!(err, RagError::ExtractionError { .. }));
    assert_eq!(pipeline.collection_info().await.status, CollectionStatus::Missing);
}

#[tokio::test]
async fn retrieval_on_missing_or_empty_collection_is_empty() {
    let pipeline = pipeline_with(None);
    assert!(pipeline.retrieve("anything", 3).await.unwrap().is_empty());

    pipeline.ensure_collection().await.unwrap();
    assert!(pipeline.retrieve("anything", 3).await.unwrap().is_empty());
    assert!(pipeline.retrieve("anything", 0).await.unwrap().is_empty());
}

#[tokio::test]
async fn identical_text_ranks_first_with_unit_score() {
    let pipeline = pipeline_with(None);
    pipeline.ingest(&text_file("z.txt", "zzzzzzzzzz")).await.unwrap();
    pipeline.ingest(&text_file("warranty.txt", "warranty two years")).await.unwrap();

    let hits = pipeline.retrieve("warranty two years", 2).await.unwrap();

    assert_eq!(hits.len(), 2);
    assert_eq!(hits[0].metadata.source_file, "warranty.txt");
    assert!((hits[0].score - 1.0).abs() < 1e-5, "score was {}", hits[0].score);
    assert!(hits[0].score >= hits[1].score);
    assert_eq!(hits[0].rank, 0);
}

#[tokio::test]
async fn ask_without_context_skips_generation() {
    let generator = Arc::new(RecordingGenerator::default());
    let pipeline = pipeline_with(Some(generator.clone()));

    let answer = pipeline.ask("What is the warranty?", 3).await.unwrap();

    assert_eq!(answer, Answer::NoContext);
    assert!(generator.prompts.lock().unwrap().is_empty());
}

#[tokio::test]
async fn ask_prompts_with_retrieved_context() {
    let generator = Arc::new(RecordingGenerator::default());
    let pipeline = pipeline_with(Some(generator.clone()));
    pipeline.ingest(&text_file("warranty.txt", "warranty two years")).await.unwrap();

    let answer = pipeline.ask("How long is the warranty?", 3).await.unwrap();

    let Answer::Generated { text, sources } = answer else {
        panic!("expected a generated answer");
    };
    assert_eq!(text, "The warranty lasts two years.");
    assert_eq!(sources.len(), 1);

    let prompts = generator.prompts.lock().unwrap();
    assert!(prompts[0].contains("Context:\nwarranty two years"));
    assert!(prompts[0].contains("Question: How long is the warranty?"));
}

#[tokio::test]
async fn ask_stream_yields_sources_then_fragments() {
    let generator = Arc::new(RecordingGenerator::default());
    let pipeline = pipeline_with(Some(generator));
    pipeline.ingest(&text_file("warranty.txt", "warranty two years")).await.unwrap();

    let AnswerStream::Streaming { sources, fragments } =
        pipeline.ask_stream("warranty?", 3).await.unwrap()
    else {
        panic!("expected a stream");
    };
    assert_eq!(sources.len(), 1);
    let text: String = fragments.map(|f| f.unwrap()).collect::<Vec<_>>().await.concat();
    assert_eq!(text, "The warranty lasts two years.");
}

#[tokio::test]
async fn ask_without_generator_is_config_error() {
    let pipeline = pipeline_with(None);
    let err = pipeline.ask("q", 3).await.unwrap_err();
    assert!(matches!(err, RagError::ConfigError(_)));
}

#[tokio::test]
async fn clear_empties_collection_but_keeps_it_usable() {
    let pipeline = pipeline_with(None);
    pipeline.ingest(&text_file("a.txt", "some text to store")).await.unwrap();

    pipeline.clear().await.unwrap();

    let info = pipeline.collection_info().await;
    assert_eq!(info.record_count, 0);
    assert_eq!(info.status, CollectionStatus::Ready);
    assert!(pipeline.retrieve("some text", 3).await.unwrap().is_empty());

    pipeline.ingest(&text_file("b.txt", "fresh text")).await.unwrap();
    assert_eq!(pipeline.collection_info().await.record_count, 1);
}

#[test]
fn builder_rejects_dimension_mismatch() {
    let config = RagConfig::builder().embedding_dimension(DIM + 1).build().unwrap();
    let result = RagPipeline::builder()
        .config(config)
        .embedding_provider(Arc::new(MockEmbeddingProvider))
        .vector_store(Arc::new(InMemoryVectorStore::new()))
        .build();
    assert!(matches!(result, Err(RagError::ConfigError(_))));
}
