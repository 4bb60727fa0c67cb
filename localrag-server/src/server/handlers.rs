use std::collections::HashMap;

use axum::Json;
use axum::extract::{Multipart, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use localrag::{CollectionInfo, Document, FileType, Hit, IngestIssue, IngestReport, SourceDocument};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::info;

use super::AppState;
use crate::error::ApiError;

/// Shown when retrieval finds nothing to answer from.
pub const NO_CONTEXT_MESSAGE: &str = "No relevant context found. Try uploading documents first.";

#[derive(Debug, Deserialize)]
pub struct IngestRequest {
    pub items: Vec<IngestItem>,
}

#[derive(Debug, Deserialize)]
pub struct IngestItem {
    #[serde(default)]
    pub id: Option<String>,
    pub text: String,
    #[serde(default)]
    pub metadata: HashMap<String, Value>,
}

impl IngestItem {
    fn into_document(mut self, index: usize) -> Document {
        let source_file = take_string(&mut self.metadata, "source_file")
            .or_else(|| self.id.clone())
            .unwrap_or_else(|| format!("item-{index}"));
        let file_type = take_string(&mut self.metadata, "file_type")
            .map(|mime| FileType::from_mime(&mime))
            .unwrap_or(FileType::PlainText);
        let mut document = Document::new(source_file, file_type, self.text).with_extra(self.metadata);
        if let Some(id) = self.id {
            document = document.with_id(id);
        }
        document
    }
}

fn take_string(metadata: &mut HashMap<String, Value>, key: &str) -> Option<String> {
    match metadata.remove(key) {
        Some(Value::String(s)) if !s.trim().is_empty() => Some(s),
        _ => None,
    }
}

#[derive(Debug, Serialize)]
pub struct IngestResponse {
    pub ok: bool,
    pub documents: usize,
    pub count: usize,
    pub issues: Vec<IngestIssue>,
}

impl From<IngestReport> for IngestResponse {
    fn from(report: IngestReport) -> Self {
        Self {
            ok: !report.has_errors(),
            documents: report.documents,
            count: report.chunk_count,
            issues: report.issues,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct AskRequest {
    pub question: String,
    #[serde(default)]
    pub top_k: Option<i64>,
}

impl AskRequest {
    /// Validated question and result count. Non-positive counts mean zero.
    pub(super) fn resolve(&self, default_top_k: usize) -> Result<(&str, usize), ApiError> {
        let question = self.question.trim();
        if question.is_empty() {
            return Err(ApiError::BadRequest("question must not be empty".to_string()));
        }
        let top_k = match self.top_k {
            None => default_top_k,
            Some(k) if k <= 0 => 0,
            Some(k) => usize::try_from(k).unwrap_or(usize::MAX),
        };
        Ok((question, top_k))
    }
}

#[derive(Debug, Serialize)]
pub struct AskResponse {
    pub answer: Option<String>,
    pub sources: Vec<Hit>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

pub(super) async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let services = state.pipeline.health().await;
    let healthy = services.all_healthy();
    let status = if healthy { StatusCode::OK } else { StatusCode::SERVICE_UNAVAILABLE };
    (
        status,
        Json(json!({
            "status": if healthy { "ok" } else { "degraded" },
            "services": services,
        })),
    )
}

pub(super) async fn config(State(state): State<AppState>) -> impl IntoResponse {
    Json(json!({ "settings": state.settings.summary() }))
}

pub(super) async fn collection_info(State(state): State<AppState>) -> Json<CollectionInfo> {
    Json(state.pipeline.collection_info().await)
}

pub(super) async fn clear_collection(
    State(state): State<AppState>,
) -> Result<impl IntoResponse, ApiError> {
    state.pipeline.clear().await?;
    Ok(Json(json!({ "ok": true, "collection": state.pipeline.config().collection })))
}

pub(super) async fn ingest(
    State(state): State<AppState>,
    Json(request): Json<IngestRequest>,
) -> Result<Json<IngestResponse>, ApiError> {
    if request.items.is_empty() {
        return Err(ApiError::BadRequest("items must not be empty".to_string()));
    }
    let documents: Vec<Document> = request
        .items
        .into_iter()
        .enumerate()
        .map(|(index, item)| item.into_document(index))
        .collect();

    let report = state.pipeline.ingest_documents(&documents).await;
    Ok(Json(report.into()))
}

pub(super) async fn upload(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<IngestResponse>, ApiError> {
    let mut sources = Vec::new();
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(format!("invalid multipart body: {e}")))?
    {
        let Some(file_name) = field.file_name().map(str::to_string) else {
            continue;
        };
        let file_type = resolve_file_type(&file_name, field.content_type());
        let bytes = field
            .bytes()
            .await
            .map_err(|e| ApiError::BadRequest(format!("failed to read '{file_name}': {e}")))?;

        info!(source_file = %file_name, file_type = %file_type, bytes = bytes.len(), "received upload");
        sources.push(SourceDocument::new(file_name, file_type, bytes.to_vec()));
    }

    if sources.is_empty() {
        return Err(ApiError::BadRequest("no files in upload".to_string()));
    }
    let report = state.pipeline.ingest_batch(&sources).await;
    Ok(Json(report.into()))
}

/// Trust a specific declared content type, otherwise go by extension.
fn resolve_file_type(file_name: &str, content_type: Option<&str>) -> FileType {
    let declared = content_type
        .and_then(|ct| ct.split(';').next())
        .map(str::trim)
        .filter(|ct| !ct.is_empty() && *ct != "application/octet-stream");
    match declared {
        Some(mime) => FileType::from_mime(mime),
        None => FileType::from_path(file_name),
    }
}

pub(super) async fn ask(
    State(state): State<AppState>,
    Json(request): Json<AskRequest>,
) -> Result<Json<AskResponse>, ApiError> {
    let (question, top_k) = request.resolve(state.pipeline.config().top_k)?;

    let response = match state.pipeline.ask(question, top_k).await? {
        localrag::Answer::NoContext => AskResponse {
            answer: None,
            sources: Vec::new(),
            message: Some(NO_CONTEXT_MESSAGE.to_string()),
        },
        localrag::Answer::Generated { text, sources } => {
            AskResponse { answer: Some(text), sources, message: None }
        }
    };
    Ok(Json(response))
}
