//! Route handlers.

use std::convert::Infallible;
use std::sync::Arc;

use axum::extract::{Path, State};
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::Json;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tracing::instrument;

use super::dto::{
    check, AnalyzerRequest, AnalyzerResponse, ChatRequest, ChatResponse, HealthResponse, LessonsResponse,
    MessageResponse, MindmapRequest, MindmapResponse, StreamEvent,
};
use crate::error::AppError;
use crate::indexer::list_lessons;
use crate::models::SessionInfo;
use crate::state::AppState;

/// GET /
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        message: "Agentic RAG API đang hoạt động",
    })
}

/// GET /lessons
pub async fn lessons(State(state): State<Arc<AppState>>) -> Result<Json<LessonsResponse>, AppError> {
    let lessons = list_lessons(&state.transcripts_dir)?;
    Ok(Json(LessonsResponse { lessons }))
}

/// POST /chat
#[instrument(skip(state, request), fields(thread_id = %request.thread_id))]
pub async fn chat(
    State(state): State<Arc<AppState>>,
    Json(request): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, AppError> {
    check(&request)?;
    let outcome = state
        .supervisor
        .chat(request.thread_id.clone(), request.user_message, request.lesson_id)
        .await?;

    Ok(Json(ChatResponse {
        reply: outcome.reply,
        intent: outcome.intent,
        thread_id: request.thread_id,
    }))
}

type EventStream = ReceiverStream<Result<Event, Infallible>>;

fn event(payload: &StreamEvent) -> Event {
    Event::default().data(serde_json::to_string(payload).unwrap_or_default())
}

/// POST /chat/stream
///
/// Streams `{"chunk", "done": false}` events, then a final
/// `{"chunk": "", "done": true, "thread_id"}`, or `{"error"}` on failure.
#[instrument(skip(state, request), fields(thread_id = %request.thread_id))]
pub async fn chat_stream(
    State(state): State<Arc<AppState>>,
    Json(request): Json<ChatRequest>,
) -> Result<Sse<EventStream>, AppError> {
    check(&request)?;

    let (event_tx, event_rx) = mpsc::channel(32);
    let supervisor = state.supervisor.clone();

    tokio::spawn(async move {
        let (chunk_tx, mut chunk_rx) = mpsc::channel(32);
        let thread_id = request.thread_id.clone();

        let forward = async {
            while let Some(chunk) = chunk_rx.recv().await {
                // Keep draining after a client disconnect so generation can finish.
                if let Ok(text) = chunk {
                    let _ = event_tx.send(Ok(event(&StreamEvent::chunk(text)))).await;
                }
            }
        };
        let generate = supervisor.chat_stream(request.thread_id, request.user_message, request.lesson_id, chunk_tx);

        let (result, ()) = tokio::join!(generate, forward);
        let last = match result {
            Ok(_) => StreamEvent::done(thread_id),
            Err(e) => StreamEvent::Error { error: e.to_string() },
        };
        let _ = event_tx.send(Ok(event(&last))).await;
    });

    Ok(Sse::new(ReceiverStream::new(event_rx)).keep_alive(KeepAlive::default()))
}

/// POST /analyzer
#[instrument(skip(state, request), fields(thread_id = %request.thread_id))]
pub async fn analyzer(
    State(state): State<Arc<AppState>>,
    Json(request): Json<AnalyzerRequest>,
) -> Result<Json<AnalyzerResponse>, AppError> {
    check(&request)?;
    let analysis = state
        .supervisor
        .analyze(request.thread_id.clone(), request.lesson_id, request.topic)
        .await?;

    Ok(Json(AnalyzerResponse {
        analysis: analysis.analysis,
        level: analysis.level,
        level_reason: analysis.level_reason,
        thread_id: request.thread_id,
    }))
}

/// POST /mindmap
#[instrument(skip(state, request), fields(lesson_id = %request.lesson_id))]
pub async fn mindmap(
    State(state): State<Arc<AppState>>,
    Json(request): Json<MindmapRequest>,
) -> Result<Json<MindmapResponse>, AppError> {
    check(&request)?;
    let mindmap_data = state
        .supervisor
        .mindmap(request.lesson_id.clone(), request.topic)
        .await?;

    Ok(Json(MindmapResponse {
        mindmap_data,
        lesson_id: request.lesson_id,
    }))
}

/// GET /session/:thread_id
pub async fn get_session(
    State(state): State<Arc<AppState>>,
    Path(thread_id): Path<String>,
) -> Result<Json<SessionInfo>, AppError> {
    Ok(Json(state.supervisor.session_info(thread_id).await?))
}

/// DELETE /session/:thread_id
pub async fn clear_session(
    State(state): State<Arc<AppState>>,
    Path(thread_id): Path<String>,
) -> Result<Json<MessageResponse>, AppError> {
    state.supervisor.clear_session(thread_id.clone()).await?;
    Ok(Json(MessageResponse {
        message: format!("Đã xóa session {}", thread_id),
    }))
}
