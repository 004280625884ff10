use crate::actors::messages::{ActorError, AppError, ChunkSender, LlmMessage};
use crate::actors::traits::LlmActor;
use crate::config::AppConfig;
use crate::models::CompletionRequest;
use async_trait::async_trait;
use futures::StreamExt;
use reqwest::Client;
use serde_json::{json, Value};
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::time::timeout;
use tracing::{debug, info, instrument, warn};
use url::Url;

/// A handle to the `LlmActor`.
///
/// This struct provides a public, cloneable interface for sending messages to the
/// running LLM actor. It abstracts away the `mpsc::Sender`.
#[derive(Clone)]
pub struct LlmActorHandle {
    sender: mpsc::Sender<LlmMessage>,
}

impl LlmActorHandle {
    /// Creates a new `LlmActor` for the configured endpoint and returns a handle to it.
    ///
    /// This will spawn the `LlmActorRunner` in a new Tokio task.
    pub fn new(config: &AppConfig) -> Self {
        Self::with_endpoint(config.base_url.clone(), config.api_key.clone())
    }

    /// Creates an actor talking to any OpenAI-compatible `base_url`.
    pub fn with_endpoint(base_url: Url, api_key: Option<String>) -> Self {
        let (sender, receiver) = mpsc::channel(32);
        let client = ChatClient::new(base_url, api_key);
        let actor = LlmActorRunner::new(receiver, client);
        tokio::spawn(async move { actor.run().await });
        Self { sender }
    }
}

#[async_trait]
impl LlmActor for LlmActorHandle {
    async fn complete(&self, request: CompletionRequest) -> Result<String, AppError> {
        let (send, recv) = oneshot::channel();
        let msg = LlmMessage::Complete {
            request,
            responder: send,
        };

        self.sender
            .send(msg)
            .await
            .map_err(|e| ActorError::Internal(e.to_string()))?;
        timeout(HANDLE_TIMEOUT, recv)
            .await?
            .map_err(|e| ActorError::Internal(e.to_string()))?
    }

    async fn stream_complete(
        &self,
        request: CompletionRequest,
        chunk_sender: ChunkSender,
    ) -> Result<(), AppError> {
        let (send, recv) = oneshot::channel();
        let msg = LlmMessage::StreamComplete {
            request,
            chunk_sender,
            responder: send,
        };

        self.sender
            .send(msg)
            .await
            .map_err(|e| ActorError::Internal(e.to_string()))?;
        timeout(STREAM_HANDLE_TIMEOUT, recv)
            .await?
            .map_err(|e| ActorError::Internal(e.to_string()))?
    }
}

// --- Constants ---
const COMPLETION_TIMEOUT: Duration = Duration::from_secs(120);
const STREAM_CHUNK_TIMEOUT: Duration = Duration::from_secs(30);
const HANDLE_TIMEOUT: Duration = Duration::from_secs(150);
const STREAM_HANDLE_TIMEOUT: Duration = Duration::from_secs(300);

/// Minimal client for the `/chat/completions` endpoint.
#[derive(Clone)]
struct ChatClient {
    client: Client,
    endpoint: String,
    api_key: Option<String>,
}

impl ChatClient {
    fn new(base_url: Url, api_key: Option<String>) -> Self {
        let endpoint = format!("{}/chat/completions", base_url.as_str().trim_end_matches('/'));
        Self {
            client: Client::new(),
            endpoint,
            api_key,
        }
    }

    fn payload(request: &CompletionRequest, stream: bool) -> Value {
        let mut messages = Vec::with_capacity(2);
        if let Some(system) = &request.system_prompt {
            messages.push(json!({ "role": "system", "content": system }));
        }
        messages.push(json!({ "role": "user", "content": request.prompt }));

        let mut payload = json!({
            "model": request.model,
            "messages": messages,
            "temperature": request.temperature,
            "stream": stream,
        });
        if request.json_mode {
            payload["response_format"] = json!({ "type": "json_object" });
        }
        payload
    }

    async fn send(&self, payload: &Value) -> Result<reqwest::Response, AppError> {
        let mut builder = self.client.post(&self.endpoint).json(payload);
        if let Some(key) = &self.api_key {
            builder = builder.bearer_auth(key);
        }

        let res = timeout(COMPLETION_TIMEOUT, builder.send())
            .await?
            .map_err(|e| ActorError::LlmError(e.to_string()))?;

        let status = res.status();
        if !status.is_success() {
            let body = res.text().await.unwrap_or_default();
            return Err(ActorError::LlmError(format!(
                "Completion request failed with status {}: {}",
                status, body
            ))
            .into());
        }
        Ok(res)
    }

    #[instrument(skip(self, request), fields(model = %request.model, json = request.json_mode))]
    async fn complete(&self, request: CompletionRequest) -> Result<String, AppError> {
        debug!(prompt_len = request.prompt.len(), "Sending completion");
        let res = self.send(&Self::payload(&request, false)).await?;

        let body: Value = res
            .json()
            .await
            .map_err(|e| ActorError::LlmError(e.to_string()))?;

        body["choices"][0]["message"]["content"]
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| ActorError::LlmError(format!("Completion response has no content: {}", body)).into())
    }

    #[instrument(skip(self, request, chunk_sender), fields(model = %request.model))]
    async fn stream(&self, request: CompletionRequest, chunk_sender: ChunkSender) -> Result<(), AppError> {
        let res = self.send(&Self::payload(&request, true)).await?;
        let mut stream = res.bytes_stream();
        let mut pending: Vec<u8> = Vec::new();

        loop {
            let next = timeout(STREAM_CHUNK_TIMEOUT, stream.next())
                .await
                .map_err(|_| ActorError::Timeout("Stream chunk timeout".to_string()))?;
            let Some(chunk) = next else {
                break;
            };
            let chunk = chunk.map_err(|e| ActorError::LlmError(e.to_string()))?;
            pending.extend_from_slice(&chunk);

            // SSE events may be split across network chunks; only complete lines are parsed.
            while let Some(pos) = pending.iter().position(|b| *b == b'\n') {
                let line: Vec<u8> = pending.drain(..=pos).collect();
                let line = String::from_utf8_lossy(&line);
                match parse_sse_line(line.trim()) {
                    SseLine::Content(text) => {
                        if chunk_sender.send(Ok(text)).await.is_err() {
                            info!("Stream receiver dropped, stopping generation");
                            return Ok(());
                        }
                    }
                    SseLine::Done => return Ok(()),
                    SseLine::Skip => {}
                }
            }
        }

        Ok(())
    }
}

#[derive(Debug, PartialEq)]
enum SseLine {
    Content(String),
    Done,
    Skip,
}

fn parse_sse_line(line: &str) -> SseLine {
    let Some(data) = line.strip_prefix("data:") else {
        return SseLine::Skip;
    };
    let data = data.trim();
    if data == "[DONE]" {
        return SseLine::Done;
    }
    match serde_json::from_str::<Value>(data) {
        Ok(event) => match event["choices"][0]["delta"]["content"].as_str() {
            Some(text) if !text.is_empty() => SseLine::Content(text.to_string()),
            _ => SseLine::Skip,
        },
        Err(e) => {
            warn!("Skipping malformed stream event: {}", e);
            SseLine::Skip
        }
    }
}

// --- Actor Runner (Internal Logic) ---
struct LlmActorRunner {
    receiver: mpsc::Receiver<LlmMessage>,
    client: ChatClient,
}

impl LlmActorRunner {
    fn new(receiver: mpsc::Receiver<LlmMessage>, client: ChatClient) -> Self {
        Self { receiver, client }
    }

    async fn run(mut self) {
        info!(endpoint = %self.client.endpoint, "LlmActor started");

        while let Some(msg) = self.receiver.recv().await {
            self.handle_message(msg);
        }

        info!("LlmActor stopped");
    }

    /// Each request runs on its own task so slow generations do not block others.
    fn handle_message(&self, msg: LlmMessage) {
        let client = self.client.clone();
        match msg {
            LlmMessage::Complete { request, responder } => {
                tokio::spawn(async move {
                    let result = client.complete(request).await;
                    let _ = responder.send(result);
                });
            }
            LlmMessage::StreamComplete {
                request,
                chunk_sender,
                responder,
            } => {
                tokio::spawn(async move {
                    let result = client.stream(request, chunk_sender).await;
                    let _ = responder.send(result);
                });
            }
        }
    }
}
