//! Streaming answers as server-sent events.
//!
//! Event sequence: one `sources` event with the ranked hits, zero or more
//! `token` events carrying `{ "text": fragment }`, then `done`. A failure
//! mid-stream emits a single `error` event and ends the stream. When no
//! context is found the sources are empty and `done` carries a message.

use std::convert::Infallible;

use async_stream::stream;
use axum::Json;
use axum::extract::State;
use axum::response::sse::{Event, KeepAlive, Sse};
use futures::{Stream, StreamExt};
use localrag::AnswerStream;
use serde_json::{Value, json};
use tracing::{info, warn};

use super::AppState;
use super::handlers::{AskRequest, NO_CONTEXT_MESSAGE};
use crate::error::ApiError;

fn event(name: &str, payload: Value) -> Event {
    Event::default().event(name).data(payload.to_string())
}

pub(super) async fn ask_stream(
    State(state): State<AppState>,
    Json(request): Json<AskRequest>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, ApiError> {
    let (question, top_k) = request.resolve(state.pipeline.config().top_k)?;
    let answer = state.pipeline.ask_stream(question, top_k).await?;

    let events = stream! {
        match answer {
            AnswerStream::NoContext => {
                yield Ok(event("sources", json!([])));
                yield Ok(event("done", json!({ "message": NO_CONTEXT_MESSAGE })));
            }
            AnswerStream::Streaming { sources, mut fragments } => {
                yield Ok(event("sources", json!(sources)));
                let mut fragment_count = 0usize;
                let mut failed = false;
                while let Some(fragment) = fragments.next().await {
                    match fragment {
                        Ok(text) => {
                            fragment_count += 1;
                            yield Ok(event("token", json!({ "text": text })));
                        }
                        Err(e) => {
                            warn!(error = %e, "answer stream failed");
                            yield Ok(event("error", json!({ "error": e.to_string() })));
                            failed = true;
                            break;
                        }
                    }
                }
                if !failed {
                    info!(fragment_count, "answer stream finished");
                    yield Ok(event("done", json!({})));
                }
            }
        }
    };

    Ok(Sse::new(events).keep_alive(KeepAlive::default()))
}
