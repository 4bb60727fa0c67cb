//! Wiring the pipeline from [`Settings`].

use std::sync::Arc;

use localrag::ollama::{OllamaEmbedder, OllamaGenerator};
use localrag::qdrant::QdrantVectorStore;
use localrag::{FallbackGenerator, Generator, RagPipeline, Result, ServiceHealth};
use tracing::{info, warn};

use crate::settings::Settings;

/// Build a pipeline backed by Ollama and Qdrant.
///
/// No connection is made here; unreachable services surface on first use
/// or through [`RagPipeline::health`].
pub fn build_pipeline(settings: &Settings) -> Result<RagPipeline> {
    let ollama = settings.ollama_config();
    let embedder = OllamaEmbedder::new(ollama.clone(), &settings.embed_model, settings.embed_dim)?;

    let primary: Arc<dyn Generator> = Arc::new(OllamaGenerator::new(ollama.clone(), &settings.gen_model)?);
    let generator: Arc<dyn Generator> = match &settings.fallback_model {
        Some(model) => {
            let secondary = Arc::new(OllamaGenerator::new(ollama, model)?);
            Arc::new(FallbackGenerator::new(primary, secondary))
        }
        None => primary,
    };

    let store = QdrantVectorStore::new(&settings.qdrant_url)?;

    info!(
        ollama_url = %settings.ollama_url,
        embed_model = %settings.embed_model,
        gen_model = %settings.gen_model,
        qdrant_url = %settings.qdrant_url,
        collection = %settings.collection,
        "pipeline configured"
    );

    RagPipeline::builder()
        .config(settings.rag_config()?)
        .embedding_provider(Arc::new(embedder))
        .vector_store(Arc::new(store))
        .generator(generator)
        .build()
}

/// Log a warning for every unreachable service.
pub fn report_health(settings: &Settings, health: &ServiceHealth) {
    if !health.embedder || health.generator == Some(false) {
        warn!(
            ollama_url = %settings.ollama_url,
            embed_model = %settings.embed_model,
            gen_model = %settings.gen_model,
            "Ollama is not reachable; start it with `ollama serve` and pull the models"
        );
    }
    if !health.vector_store {
        warn!(qdrant_url = %settings.qdrant_url, "Qdrant is not reachable");
    }
    if health.all_healthy() {
        info!("all services reachable");
    }
}
