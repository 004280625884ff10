use crate::actors::messages::{ActorError, AppError, ChunkSender, SupervisorMessage};
use crate::actors::traits::{LlmActor, RagActor};
use crate::agent::prompts::{EMPTY_REPLY, OUT_OF_LESSON_REPLY};
use crate::agent::{analyzer, classifier, explainer, mindmap, responder, summarizer, validator};
use crate::brain::curriculum;
use crate::brain::{IntentRouter, ResponseMode};
use crate::config::{ModelConfig, PipelineConfig};
use crate::models::{ChatMessage, ChatOutcome, CompletionRequest, SessionAnalysis, SessionInfo};
use crate::rate_limiter::RateLimiter;
use crate::retriever::Retriever;
use crate::session::SessionStore;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot, Mutex, OwnedMutexGuard};
use tokio::time::{timeout, Duration};
use tracing::{debug, error, info, instrument, warn};

/// Default topic when analysing a session.
const ANALYZE_TOPIC: &str = "Toán lớp 4";
const ANALYZE_K: usize = 5;
/// Default topic when drawing a mind map.
const MINDMAP_TOPIC: &str = "toàn bộ bài học";
const MINDMAP_K: usize = 7;

/// A chat turn makes up to four model calls.
const CHAT_TIMEOUT: Duration = Duration::from_secs(600);
const ANALYZE_TIMEOUT: Duration = Duration::from_secs(300);
const SESSION_TIMEOUT: Duration = Duration::from_secs(10);

/// A handle to the `SupervisorActor`.
///
/// This is the entry point for all tutoring logic. It orchestrates the
/// `LlmActor`, the `RagActor` and the session store for every request.
#[derive(Clone)]
pub struct SupervisorHandle {
    sender: mpsc::Sender<SupervisorMessage>,
}

impl SupervisorHandle {
    /// Spawns the supervisor over the given actors and session store.
    pub fn new<L, R>(
        llm: Arc<L>,
        rag: Arc<R>,
        sessions: Arc<dyn SessionStore>,
        models: ModelConfig,
        settings: PipelineConfig,
    ) -> Self
    where
        L: LlmActor + ?Sized,
        R: RagActor + ?Sized,
    {
        let (sender, receiver) = mpsc::channel(32);
        let pipeline = Pipeline {
            llm,
            retriever: Retriever::new(rag),
            sessions,
            router: IntentRouter::new(),
            models,
            settings,
            turn_locks: Mutex::new(HashMap::new()),
        };
        let actor = SupervisorRunner {
            receiver,
            pipeline: Arc::new(pipeline),
            limiter: RateLimiter::per_minute(settings.rate_limit_per_minute),
        };
        tokio::spawn(async move { actor.run().await });
        Self { sender }
    }

    async fn request<T>(
        &self,
        msg: SupervisorMessage,
        recv: oneshot::Receiver<Result<T, AppError>>,
        limit: Duration,
    ) -> Result<T, AppError> {
        self.sender
            .send(msg)
            .await
            .map_err(|e| ActorError::Internal(e.to_string()))?;
        timeout(limit, recv)
            .await?
            .map_err(|e| ActorError::Internal(e.to_string()))?
    }

    /// Answers one student message.
    ///
    /// 1. Records the message and compacts the working history if it grew too long.
    /// 2. Routes the message to normal or deep mode.
    /// 3. Retrieves lesson context (3 or 5 passages, optionally within one lesson).
    /// 4. Answers (normal) or explains (deep), with confidence gating and validation.
    /// 5. Records the reply.
    #[instrument(skip(self, message))]
    pub async fn chat(
        &self,
        thread_id: String,
        message: String,
        lesson_id: Option<String>,
    ) -> Result<ChatOutcome, AppError> {
        let (send, recv) = oneshot::channel();
        let msg = SupervisorMessage::Chat {
            thread_id,
            message,
            lesson_id,
            responder: send,
        };
        self.request(msg, recv, CHAT_TIMEOUT).await
    }

    /// Same routing and retrieval as [`chat`](Self::chat), but the generated
    /// text is streamed through `chunk_sender` as it arrives.
    #[instrument(skip(self, message, chunk_sender))]
    pub async fn chat_stream(
        &self,
        thread_id: String,
        message: String,
        lesson_id: Option<String>,
        chunk_sender: ChunkSender,
    ) -> Result<ChatOutcome, AppError> {
        let (send, recv) = oneshot::channel();
        let msg = SupervisorMessage::ChatStream {
            thread_id,
            message,
            lesson_id,
            chunk_sender,
            responder: send,
        };
        self.request(msg, recv, CHAT_TIMEOUT).await
    }

    #[instrument(skip(self))]
    pub async fn analyze(
        &self,
        thread_id: String,
        lesson_id: Option<String>,
        topic: Option<String>,
    ) -> Result<SessionAnalysis, AppError> {
        let (send, recv) = oneshot::channel();
        let msg = SupervisorMessage::Analyze {
            thread_id,
            lesson_id,
            topic,
            responder: send,
        };
        self.request(msg, recv, ANALYZE_TIMEOUT).await
    }

    #[instrument(skip(self))]
    pub async fn mindmap(&self, lesson_id: String, topic: Option<String>) -> Result<Value, AppError> {
        let (send, recv) = oneshot::channel();
        let msg = SupervisorMessage::Mindmap {
            lesson_id,
            topic,
            responder: send,
        };
        self.request(msg, recv, ANALYZE_TIMEOUT).await
    }

    pub async fn session_info(&self, thread_id: String) -> Result<SessionInfo, AppError> {
        let (send, recv) = oneshot::channel();
        let msg = SupervisorMessage::SessionInfo {
            thread_id,
            responder: send,
        };
        self.request(msg, recv, SESSION_TIMEOUT).await
    }

    pub async fn clear_session(&self, thread_id: String) -> Result<(), AppError> {
        let (send, recv) = oneshot::channel();
        let msg = SupervisorMessage::ClearSession {
            thread_id,
            responder: send,
        };
        self.request(msg, recv, SESSION_TIMEOUT).await
    }

    pub async fn shutdown(&self) {
        let _ = self.sender.send(SupervisorMessage::Shutdown).await;
    }
}

// --- Actor Runner ---
struct SupervisorRunner<L: ?Sized, R: ?Sized> {
    receiver: mpsc::Receiver<SupervisorMessage>,
    pipeline: Arc<Pipeline<L, R>>,
    limiter: RateLimiter,
}

impl<L, R> SupervisorRunner<L, R>
where
    L: LlmActor + ?Sized,
    R: RagActor + ?Sized,
{
    async fn run(mut self) {
        info!("Supervisor started");
        while let Some(msg) = self.receiver.recv().await {
            if matches!(msg, SupervisorMessage::Shutdown) {
                info!("Supervisor shutting down...");
                break;
            }
            self.handle_message(msg);
        }
        info!("Supervisor stopped");
    }

    /// Every request runs on its own task so a slow model call never blocks
    /// other threads. Only the rate limiter lives in the loop.
    fn handle_message(&mut self, msg: SupervisorMessage) {
        let pipeline = Arc::clone(&self.pipeline);
        match msg {
            SupervisorMessage::Chat {
                thread_id,
                message,
                lesson_id,
                responder,
            } => {
                if !self.limiter.check(&thread_id) {
                    warn!("Rate limit exceeded for thread {}", thread_id);
                    let _ = responder.send(Err(AppError::RateLimited));
                    return;
                }
                tokio::spawn(async move {
                    let result = pipeline.chat(&thread_id, &message, lesson_id.as_deref()).await;
                    if let Err(e) = &result {
                        error!("Error processing chat message: {:?}", e);
                    }
                    let _ = responder.send(result);
                });
            }
            SupervisorMessage::ChatStream {
                thread_id,
                message,
                lesson_id,
                chunk_sender,
                responder,
            } => {
                if !self.limiter.check(&thread_id) {
                    warn!("Rate limit exceeded for thread {}", thread_id);
                    let _ = responder.send(Err(AppError::RateLimited));
                    return;
                }
                tokio::spawn(async move {
                    let result = pipeline
                        .chat_stream(&thread_id, &message, lesson_id.as_deref(), chunk_sender)
                        .await;
                    if let Err(e) = &result {
                        error!("Error streaming chat message: {:?}", e);
                    }
                    let _ = responder.send(result);
                });
            }
            SupervisorMessage::Analyze {
                thread_id,
                lesson_id,
                topic,
                responder,
            } => {
                tokio::spawn(async move {
                    let result = pipeline.analyze(&thread_id, lesson_id.as_deref(), topic.as_deref()).await;
                    let _ = responder.send(result);
                });
            }
            SupervisorMessage::Mindmap {
                lesson_id,
                topic,
                responder,
            } => {
                tokio::spawn(async move {
                    let result = pipeline.mindmap(&lesson_id, topic.as_deref()).await;
                    let _ = responder.send(result);
                });
            }
            SupervisorMessage::SessionInfo { thread_id, responder } => {
                tokio::spawn(async move {
                    let _ = responder.send(pipeline.session_info(&thread_id).await);
                });
            }
            SupervisorMessage::ClearSession { thread_id, responder } => {
                self.limiter.forget(&thread_id);
                tokio::spawn(async move {
                    pipeline.release_thread(&thread_id).await;
                    let result = pipeline.sessions.clear(&thread_id).await.map(|existed| {
                        debug!(existed, "Session {} cleared", thread_id);
                    });
                    let _ = responder.send(result);
                });
            }
            SupervisorMessage::Shutdown => {}
        }
    }
}

/// The tutoring pipeline shared by every request task.
struct Pipeline<L: ?Sized, R: ?Sized> {
    llm: Arc<L>,
    retriever: Retriever<R>,
    sessions: Arc<dyn SessionStore>,
    router: IntentRouter,
    models: ModelConfig,
    settings: PipelineConfig,
    /// One lock per thread, held for a whole chat turn.
    turn_locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

/// Everything a turn needs before generation starts.
struct PreparedTurn {
    history: Vec<ChatMessage>,
    mode: ResponseMode,
    context: String,
}

impl<L, R> Pipeline<L, R>
where
    L: LlmActor + ?Sized,
    R: RagActor + ?Sized,
{
    #[instrument(skip(self, message), fields(mode))]
    async fn chat(&self, thread_id: &str, message: &str, lesson_id: Option<&str>) -> Result<ChatOutcome, AppError> {
        let _turn_guard = self.lock_thread(thread_id).await;
        let turn = self.prepare(thread_id, message, lesson_id).await?;
        tracing::Span::current().record("mode", turn.mode.as_str());

        let reply = match turn.mode {
            ResponseMode::Normal => self.respond_normal(message, &turn, lesson_id).await?,
            ResponseMode::Deep => self.respond_deep(message, &turn).await?,
        };

        let reply = self.finish(thread_id, message, turn.history, reply).await?;
        Ok(ChatOutcome {
            reply,
            intent: turn.mode,
        })
    }

    async fn chat_stream(
        &self,
        thread_id: &str,
        message: &str,
        lesson_id: Option<&str>,
        chunk_sender: ChunkSender,
    ) -> Result<ChatOutcome, AppError> {
        let _turn_guard = self.lock_thread(thread_id).await;
        let turn = self.prepare(thread_id, message, lesson_id).await?;

        let request = self.generation_request(message, &turn);
        let (tx, mut rx) = mpsc::channel::<Result<String, AppError>>(32);

        let forward = async {
            let mut full = String::new();
            let mut failure = None;
            while let Some(chunk) = rx.recv().await {
                match chunk {
                    Ok(token) => {
                        full.push_str(&token);
                        let _ = chunk_sender.send(Ok(token)).await;
                    }
                    Err(e) => {
                        error!("Streaming error: {}", e);
                        failure = Some(e);
                    }
                }
            }
            (full, failure)
        };

        let (generated, (full, failure)) = tokio::join!(self.llm.stream_complete(request, tx), forward);
        generated?;
        if let Some(e) = failure {
            return Err(e);
        }

        if full.trim().is_empty() {
            let _ = chunk_sender.send(Ok(EMPTY_REPLY.to_string())).await;
        }

        let reply = self.finish(thread_id, message, turn.history, full).await?;
        Ok(ChatOutcome {
            reply,
            intent: turn.mode,
        })
    }

    /// Waits for any other turn of the same thread to finish. Turns of
    /// different threads never wait on each other.
    async fn lock_thread(&self, thread_id: &str) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.turn_locks.lock().await;
            Arc::clone(locks.entry(thread_id.to_string()).or_default())
        };
        lock.lock_owned().await
    }

    async fn release_thread(&self, thread_id: &str) {
        self.turn_locks.lock().await.remove(thread_id);
    }

    /// Records the student message, compacts the working history, routes and retrieves.
    async fn prepare(&self, thread_id: &str, message: &str, lesson_id: Option<&str>) -> Result<PreparedTurn, AppError> {
        self.sessions.append(thread_id, ChatMessage::user(message)).await?;

        let mut history = self.sessions.working_history(thread_id).await?;
        if summarizer::needs_compaction(history.len() + 1) {
            info!("Compacting working history of {} messages", history.len());
            history = summarizer::compact(
                self.llm.as_ref(),
                &self.models.answer_model,
                history,
                summarizer::KEEP_RECENT,
            )
            .await;
        }

        let route = self.router.route(message);
        debug!(mode = %route.mode, keywords = ?route.matched_keywords, "Intent routed");

        let context = self.retriever.get_context(message, route.retrieval_k, lesson_id).await;

        Ok(PreparedTurn {
            history,
            mode: route.mode,
            context,
        })
    }

    fn generation_request(&self, message: &str, turn: &PreparedTurn) -> CompletionRequest {
        match turn.mode {
            ResponseMode::Normal => {
                responder::answer_request(&self.models.answer_model, message, &turn.context, &turn.history)
            }
            ResponseMode::Deep => {
                explainer::explain_request(&self.models.explain_model, message, &turn.context, &turn.history)
            }
        }
    }

    /// Short answer. With gating on, a low-confidence answer is classified:
    /// out-of-curriculum questions get the polite refusal, and questions that
    /// belong to another lesson are answered again from that lesson.
    async fn respond_normal(
        &self,
        message: &str,
        turn: &PreparedTurn,
        lesson_id: Option<&str>,
    ) -> Result<String, AppError> {
        let model = &self.models.answer_model;
        if !self.settings.confidence_gating {
            return responder::answer(self.llm.as_ref(), model, message, &turn.context, &turn.history).await;
        }

        let scored = responder::answer_scored(self.llm.as_ref(), model, message, &turn.context, &turn.history).await?;
        if !classifier::needs_classification(scored.confidence) {
            return Ok(scored.answer);
        }

        let classification = classifier::classify(self.llm.as_ref(), &self.models.explain_model, message).await;
        info!(
            confidence = scored.confidence,
            scope = classification.classification.as_str(),
            lesson = ?classification.lesson_id,
            keyword_hint = ?curriculum::best_lesson_for(message).map(|l| l.lesson_id),
            "Low-confidence answer classified"
        );

        if classification.is_out_of_scope() {
            return Ok(OUT_OF_LESSON_REPLY.to_string());
        }

        let current = lesson_id.map(str::trim).filter(|id| !id.is_empty());
        match classification.lesson_id.as_deref() {
            Some(suggested) if Some(suggested) != current && curriculum::lesson(suggested).is_some() => {
                info!("Re-retrieving from lesson {}", suggested);
                let k = turn.mode.retrieval_k();
                let context = self.retriever.get_context(message, k, Some(suggested)).await;
                responder::answer(self.llm.as_ref(), model, message, &context, &turn.history).await
            }
            _ => Ok(scored.answer),
        }
    }

    async fn respond_deep(&self, message: &str, turn: &PreparedTurn) -> Result<String, AppError> {
        let model = &self.models.explain_model;
        let explanation = explainer::explain(self.llm.as_ref(), model, message, &turn.context, &turn.history).await?;

        if !(self.settings.validate_deep && validator::should_validate(turn.mode)) {
            return Ok(explanation);
        }

        let report = validator::validate(self.llm.as_ref(), model, message, &explanation, &turn.context).await;
        Ok(explainer::apply_validation(explanation, &report))
    }

    /// Stores the reply in the transcript and the working history.
    async fn finish(
        &self,
        thread_id: &str,
        message: &str,
        mut history: Vec<ChatMessage>,
        reply: String,
    ) -> Result<String, AppError> {
        let reply = if reply.trim().is_empty() {
            EMPTY_REPLY.to_string()
        } else {
            reply
        };

        self.sessions.append(thread_id, ChatMessage::assistant(&reply)).await?;
        history.push(ChatMessage::user(message));
        history.push(ChatMessage::assistant(&reply));
        self.sessions.save_working_history(thread_id, history).await?;
        Ok(reply)
    }

    async fn analyze(
        &self,
        thread_id: &str,
        lesson_id: Option<&str>,
        topic: Option<&str>,
    ) -> Result<SessionAnalysis, AppError> {
        let conversation_history = self.sessions.conversation_history(thread_id).await?;
        if conversation_history.is_empty() {
            return Err(AppError::NotFound(format!(
                "Không tìm thấy lịch sử hội thoại cho thread_id: {}",
                thread_id
            )));
        }

        let topic = topic.map(str::trim).filter(|t| !t.is_empty()).unwrap_or(ANALYZE_TOPIC);
        let lesson_context = self.retriever.get_context(topic, ANALYZE_K, lesson_id).await;

        analyzer::analyze(
            self.llm.as_ref(),
            &self.models.answer_model,
            &conversation_history,
            &lesson_context,
        )
        .await
    }

    async fn mindmap(&self, lesson_id: &str, topic: Option<&str>) -> Result<Value, AppError> {
        let topic = topic.map(str::trim).filter(|t| !t.is_empty()).unwrap_or(MINDMAP_TOPIC);
        let context = self.retriever.get_context(topic, MINDMAP_K, Some(lesson_id)).await;
        mindmap::generate(self.llm.as_ref(), &self.models.mindmap_model, topic, &context).await
    }

    async fn session_info(&self, thread_id: &str) -> Result<SessionInfo, AppError> {
        let messages_count = self.sessions.transcript(thread_id).await?.map_or(0, |t| t.len());
        Ok(SessionInfo {
            thread_id: thread_id.to_string(),
            messages_count,
            conversation_history: self.sessions.conversation_history(thread_id).await?,
        })
    }
}
