//! HTTP surface tests driving the router in-process.

use std::sync::Arc;

use async_trait::async_trait;
use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use http_body_util::BodyExt;
use localrag::{
    EmbeddingProvider, Generator, InMemoryVectorStore, RagError, RagPipeline, Result, TextStream,
};
use localrag_server::{AppState, Settings, app_router};
use serde_json::{Value, json};
use tower::ServiceExt;

const DIM: usize = 8;

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

struct ScriptedGenerator {
    fragments: Vec<std::result::Result<&'static str, &'static str>>,
}

#[async_trait]
impl Generator for ScriptedGenerator {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn generate(&self, _prompt: &str) -> Result<String> {
        Ok(self.fragments.iter().filter_map(|f| f.ok()).collect())
    }

    async fn generate_stream(&self, _prompt: &str) -> Result<TextStream> {
        let items: Vec<Result<String>> = self
            .fragments
            .iter()
            .map(|f| {
                f.map(str::to_string).map_err(|m| RagError::GenerationError {
                    provider: "scripted".into(),
                    message: m.into(),
                })
            })
            .collect();
        Ok(Box::pin(futures::stream::iter(items)))
    }
}

fn app_with(fragments: Vec<std::result::Result<&'static str, &'static str>>) -> Router {
    let settings = Settings { embed_dim: DIM, chunk_size: 60, chunk_overlap: 10, ..Settings::default() };
    let pipeline = RagPipeline::builder()
        .config(settings.rag_config().unwrap())
        .embedding_provider(Arc::new(MockEmbeddingProvider))
        .vector_store(Arc::new(InMemoryVectorStore::new()))
        .generator(Arc::new(ScriptedGenerator { fragments }))
        .build()
        .unwrap();
    app_router(AppState::new(pipeline, settings))
}

fn app() -> Router {
    app_with(vec![Ok("The warranty "), Ok("lasts two years.")])
}

fn json_request(method: &str, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let (status, body) = send_raw(app, request).await;
    let value = if body.is_empty() { Value::Null } else { serde_json::from_str(&body).unwrap() };
    (status, value)
}

async fn send_raw(app: &Router, request: Request<Body>) -> (StatusCode, String) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    (status, String::from_utf8(bytes.to_vec()).unwrap())
}

async fn ingest_warranty(app: &Router) -> u64 {
    let (status, body) = send(
        app,
        json_request(
            "POST",
            "/ingest",
            json!({ "items": [{ "text": "warranty two years", "metadata": { "source_file": "warranty.txt" } }] }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    body["count"].as_u64().unwrap()
}

#[tokio::test]
async fn health_reports_each_service() {
    let (status, body) = send(&app(), get("/health")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["services"]["embedder"], true);
    assert_eq!(body["services"]["vector_store"], true);
    assert_eq!(body["services"]["generator"], true);
}

#[tokio::test]
async fn config_lists_settings_in_order() {
    let (status, body) = send(&app(), get("/config")).await;
    assert_eq!(status, StatusCode::OK);
    let settings = body["settings"].as_array().unwrap();
    assert_eq!(settings[0]["name"], "Ollama URL");
    assert_eq!(settings[0]["value"], "http://localhost:11434");
}

#[tokio::test]
async fn collection_is_missing_until_first_ingest() {
    let app = app();
    let (_, before) = send(&app, get("/collection")).await;
    assert_eq!(before["status"]["state"], "missing");
    assert_eq!(before["record_count"], 0);

    let count = ingest_warranty(&app).await;
    assert_eq!(count, 1);

    let (_, after) = send(&app, get("/collection")).await;
    assert_eq!(after["status"]["state"], "ready");
    assert_eq!(after["record_count"], 1);
    assert_eq!(after["name"], "docs");
}

#[tokio::test]
async fn ingest_rejects_empty_items() {
    let (status, body) = send(&app(), json_request("POST", "/ingest", json!({ "items": [] }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("items"));
}

#[tokio::test]
async fn ingest_reports_per_item_issues() {
    let (status, body) = send(
        &app(),
        json_request(
            "POST",
            "/ingest",
            json!({ "items": [
                { "id": "ok", "text": "healthy text" },
                { "id": "broken", "text": "this will FAIL" },
                { "id": "blank", "text": "   " },
            ] }),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["ok"], false);
    assert_eq!(body["documents"], 3);
    assert_eq!(body["count"], 1);
    let issues = body["issues"].as_array().unwrap();
    assert_eq!(issues[0]["source_file"], "broken");
    assert_eq!(issues[0]["severity"], "error");
    assert_eq!(issues[1]["source_file"], "blank");
    assert_eq!(issues[1]["severity"], "warning");
}

#[tokio::test]
async fn ask_without_documents_explains_missing_context() {
    let (status, body) =
        send(&app(), json_request("POST", "/ask", json!({ "question": "warranty?" }))).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["answer"].is_null());
    assert!(body["message"].as_str().unwrap().contains("No relevant context"));
    assert_eq!(body["sources"], json!([]));
}

#[tokio::test]
async fn ask_returns_answer_with_sources() {
    let app = app();
    ingest_warranty(&app).await;

    let (status, body) = send(
        &app,
        json_request("POST", "/ask", json!({ "question": "How long is the warranty?", "top_k": 3 })),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["answer"], "The warranty lasts two years.");
    let source = &body["sources"][0];
    assert_eq!(source["rank"], 0);
    assert_eq!(source["metadata"]["source_file"], "warranty.txt");
    assert_eq!(source["metadata"]["text"], "warranty two years");
    assert_eq!(source["metadata"]["chunk_index"], 0);
    assert_eq!(source["metadata"]["total_chunks"], 1);
    assert!(body.get("message").is_none());
}

#[tokio::test]
async fn ask_with_non_positive_top_k_has_no_context() {
    let app = app();
    ingest_warranty(&app).await;
    let (status, body) =
        send(&app, json_request("POST", "/ask", json!({ "question": "warranty", "top_k": -1 }))).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["answer"].is_null());
}

#[tokio::test]
async fn ask_rejects_blank_question() {
    let (status, _) = send(&app(), json_request("POST", "/ask", json!({ "question": " " }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn embedding_failure_is_bad_gateway() {
    let app = app();
    ingest_warranty(&app).await;
    let (status, body) =
        send(&app, json_request("POST", "/ask", json!({ "question": "FAIL please" }))).await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert!(body["error"].as_str().unwrap().contains("model unavailable"));
}

#[tokio::test]
async fn ask_stream_emits_sources_tokens_and_done() {
    let app = app();
    ingest_warranty(&app).await;

    let (status, body) =
        send_raw(&app, json_request("POST", "/ask/stream", json!({ "question": "warranty?" }))).await;

    assert_eq!(status, StatusCode::OK);
    let sources_at = body.find("event: sources").unwrap();
    let token_at = body.find("event: token").unwrap();
    let done_at = body.find("event: done").unwrap();
    assert!(sources_at < token_at && token_at < done_at);
    assert!(body.contains(r#"{"text":"The warranty "}"#));
    assert!(body.contains(r#"{"text":"lasts two years."}"#));
    assert!(!body.contains("event: error"));
}

#[tokio::test]
async fn ask_stream_reports_generation_failure_as_event() {
    let app = app_with(vec![Ok("partial"), Err("connection reset")]);
    ingest_warranty(&app).await;

    let (status, body) =
        send_raw(&app, json_request("POST", "/ask/stream", json!({ "question": "warranty?" }))).await;

    assert_eq!(status, StatusCode::OK);
    assert!(body.contains(r#"{"text":"partial"}"#));
    assert!(body.contains("event: error"));
    assert!(body.contains("connection reset"));
    assert!(!body.contains("event: done"));
}

#[tokio::test]
async fn ask_stream_without_context_finishes_immediately() {
    let (status, body) =
        send_raw(&app(), json_request("POST", "/ask/stream", json!({ "question": "anything" }))).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("event: sources"));
    assert!(body.contains("event: done"));
    assert!(!body.contains("event: token"));
}

#[tokio::test]
async fn upload_ingests_each_file_independently() {
    let boundary = "localrag-test-boundary";
    let mut body = Vec::new();
    let mut part = |name: &str, content_type: &str, content: &[u8]| {
        body.extend_from_slice(format!("--{boundary}\r\n").as_bytes());
        body.extend_from_slice(
            format!("Content-Disposition: form-data; name=\"files\"; filename=\"{name}\"\r\n")
                .as_bytes(),
        );
        body.extend_from_slice(format!("Content-Type: {content_type}\r\n\r\n").as_bytes());
        body.extend_from_slice(content);
        body.extend_from_slice(b"\r\n");
    };
    part("notes.txt", "text/plain", b"The warranty lasts two years from purchase.");
    part("broken.txt", "text/plain", &[0xff, 0xfe, 0xfd]);
    part("empty.txt", "text/plain", b"   ");
    body.extend_from_slice(format!("--{boundary}--\r\n").as_bytes());

    let request = Request::builder()
        .method("POST")
        .uri("/upload")
        .header(header::CONTENT_TYPE, format!("multipart/form-data; boundary={boundary}"))
        .body(Body::from(body))
        .unwrap();
    let app = app();
    let (status, report) = send(&app, request).await;

    assert_eq!(status, StatusCode::OK, "{report}");
    assert_eq!(report["documents"], 3);
    assert_eq!(report["count"], 1);
    assert_eq!(report["ok"], false);
    assert_eq!(report["issues"][0]["source_file"], "broken.txt");
    assert_eq!(report["issues"][0]["severity"], "error");
    assert_eq!(report["issues"][1]["severity"], "warning");

    let (_, info) = send(&app, get("/collection")).await;
    assert_eq!(info["record_count"], 1);
}

#[tokio::test]
async fn delete_collection_clears_records() {
    let app = app();
    ingest_warranty(&app).await;

    let request = Request::builder().method("DELETE").uri("/collection").body(Body::empty()).unwrap();
    let (status, body) = send(&app, request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["ok"], true);

    let (_, info) = send(&app, get("/collection")).await;
    assert_eq!(info["record_count"], 0);
    assert_eq!(info["status"]["state"], "ready");
}
