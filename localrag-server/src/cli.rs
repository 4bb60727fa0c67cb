//! Command line interface.

use std::io::Write;
use std::path::PathBuf;

use anyhow::{Context, bail};
use clap::{Parser, Subcommand};
use futures::StreamExt;
use localrag::{
    Answer, AnswerStream, FileType, Hit, IngestReport, RagError, RagPipeline, Severity,
    SourceDocument,
};
use tracing::warn;

use crate::bootstrap;
use crate::server::{AppState, NO_CONTEXT_MESSAGE, run_server};
use crate::settings::Settings;

#[derive(Debug, Parser)]
#[command(name = "localrag", version, about = "Local retrieval-augmented generation over Ollama and Qdrant")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand, PartialEq, Eq)]
pub enum Command {
    /// Start the HTTP server.
    Serve,
    /// Ingest PDF or text files.
    Ingest {
        /// Files to ingest.
        #[arg(required = true)]
        paths: Vec<PathBuf>,
    },
    /// Answer a question from the ingested documents.
    Ask {
        question: String,
        /// Number of chunks to retrieve (defaults to TOP_K).
        #[arg(long)]
        top_k: Option<usize>,
        /// Print the answer once it is complete instead of streaming it.
        #[arg(long)]
        no_stream: bool,
    },
    /// Show settings, service health and collection size.
    Info,
    /// Delete every stored chunk.
    Clear {
        /// Confirm the deletion.
        #[arg(long)]
        yes: bool,
    },
}

/// Run a parsed command.
pub async fn run(cli: Cli, settings: Settings) -> anyhow::Result<()> {
    let pipeline = bootstrap::build_pipeline(&settings).context("failed to configure pipeline")?;

    match cli.command {
        Command::Serve => serve(pipeline, settings).await,
        Command::Ingest { paths } => ingest(&pipeline, &paths).await,
        Command::Ask { question, top_k, no_stream } => {
            let top_k = top_k.unwrap_or(settings.top_k);
            if no_stream {
                ask(&pipeline, &question, top_k).await
            } else {
                ask_streaming(&pipeline, &question, top_k).await
            }
        }
        Command::Info => info(&pipeline, &settings).await,
        Command::Clear { yes } => clear(&pipeline, yes).await,
    }
}

async fn serve(pipeline: RagPipeline, settings: Settings) -> anyhow::Result<()> {
    bootstrap::report_health(&settings, &pipeline.health().await);
    if let Err(e) = pipeline.ensure_collection().await {
        warn!(error = %e, "could not prepare collection; it will be created on first ingest");
    }
    run_server(AppState::new(pipeline, settings)).await
}

async fn ingest(pipeline: &RagPipeline, paths: &[PathBuf]) -> anyhow::Result<()> {
    let report = ingest_files(pipeline, paths).await;
    println!(
        "Processed {} file(s), added {} chunk(s)",
        report.documents, report.chunk_count
    );
    for issue in &report.issues {
        println!("  {:?} {}: {}", issue.severity, issue.source_file, issue.message);
    }
    if report.has_errors() {
        let failed = report.issues.iter().filter(|i| i.severity == Severity::Error).count();
        bail!("{failed} file(s) failed to ingest");
    }
    Ok(())
}

/// Read and ingest each file independently. A file that cannot be read is
/// reported as an extraction error and the rest of the batch continues.
async fn ingest_files(pipeline: &RagPipeline, paths: &[PathBuf]) -> IngestReport {
    let mut unreadable = IngestReport::default();
    let mut sources = Vec::with_capacity(paths.len());
    for path in paths {
        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        match tokio::fs::read(path).await {
            Ok(bytes) => sources.push(SourceDocument::new(file_name, FileType::from_path(path), bytes)),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "failed to read file");
                let err = RagError::ExtractionError {
                    source_file: file_name.clone(),
                    message: format!("failed to read {}: {e}", path.display()),
                };
                unreadable.record(&file_name, &Err(err));
            }
        }
    }

    let mut report = pipeline.ingest_batch(&sources).await;
    report.documents += unreadable.documents;
    report.issues.extend(unreadable.issues);
    report
}

async fn ask(pipeline: &RagPipeline, question: &str, top_k: usize) -> anyhow::Result<()> {
    match pipeline.ask(question, top_k).await? {
        Answer::NoContext => println!("{}", NO_CONTEXT_MESSAGE),
        Answer::Generated { text, sources } => {
            println!("{text}");
            print_sources(&sources);
        }
    }
    Ok(())
}

async fn ask_streaming(pipeline: &RagPipeline, question: &str, top_k: usize) -> anyhow::Result<()> {
    let (sources, mut fragments) = match pipeline.ask_stream(question, top_k).await? {
        AnswerStream::NoContext => {
            println!("{}", NO_CONTEXT_MESSAGE);
            return Ok(());
        }
        AnswerStream::Streaming { sources, fragments } => (sources, fragments),
    };

    let mut stdout = std::io::stdout();
    while let Some(fragment) = fragments.next().await {
        write!(stdout, "{}", fragment?)?;
        stdout.flush()?;
    }
    writeln!(stdout)?;
    print_sources(&sources);
    Ok(())
}

fn print_sources(sources: &[Hit]) {
    println!("\nSources:");
    for hit in sources {
        let metadata = &hit.metadata;
        println!(
            "  {}. {} (score {:.3}) chunk {} of {}, uploaded {}",
            hit.rank + 1,
            metadata.source_file,
            hit.score,
            metadata.chunk_index + 1,
            metadata.total_chunks,
            metadata.upload_timestamp.to_rfc3339(),
        );
    }
}

async fn info(pipeline: &RagPipeline, settings: &Settings) -> anyhow::Result<()> {
    println!("Configuration:");
    for entry in settings.summary() {
        println!("  {}: {}", entry.name, entry.value);
    }

    let health = pipeline.health().await;
    println!("\nServices:");
    println!("  Ollama embeddings: {}", up_down(health.embedder));
    if let Some(generator) = health.generator {
        println!("  Ollama generation: {}", up_down(generator));
    }
    println!("  Qdrant: {}", up_down(health.vector_store));

    let collection = pipeline.collection_info().await;
    println!(
        "\nCollection '{}': {} chunk(s), {:?}",
        collection.name, collection.record_count, collection.status
    );
    Ok(())
}

fn up_down(reachable: bool) -> &'static str {
    if reachable { "reachable" } else { "unreachable" }
}

async fn clear(pipeline: &RagPipeline, yes: bool) -> anyhow::Result<()> {
    if !yes {
        bail!("refusing to delete collection '{}' without --yes", pipeline.config().collection);
    }
    pipeline.clear().await?;
    println!("Cleared collection '{}'", pipeline.config().collection);
    Ok(())
}
