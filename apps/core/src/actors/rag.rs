use crate::actors::messages::{ActorError, AppError, RagMessage};
use crate::actors::traits::RagActor;
use crate::models::{LessonChunk, Passage};
use arrow::array::{
    Array, FixedSizeListBuilder, Float32Array, Float32Builder, RecordBatch, RecordBatchIterator,
    StringArray, StringBuilder,
};
use arrow::datatypes::{DataType, Field, Schema, SchemaRef};
use async_trait::async_trait;
use fastembed::{EmbeddingModel, InitOptions, TextEmbedding};
use futures::TryStreamExt;
use lancedb::{
    connect,
    query::{ExecutableQuery, QueryBase},
    Connection,
};
use lru::LruCache;
use std::num::NonZeroUsize;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::time::timeout;
use tracing::{debug, error, info, instrument, warn};

/// Dimension of `AllMiniLML6V2` embeddings.
const EMBEDDING_DIM: i32 = 384;
const TABLE_NAME: &str = "lesson_chunks";
const SEARCH_TIMEOUT: Duration = Duration::from_secs(30);
const INGEST_TIMEOUT: Duration = Duration::from_secs(600);

/// A handle to the `RagActor`.
///
/// This provides a public, cloneable interface for sending messages to the running RAG actor,
/// which owns the embedding model and the lesson vector table.
#[derive(Clone)]
pub struct RagActorHandle {
    sender: mpsc::Sender<RagMessage>,
}

impl RagActorHandle {
    /// Creates a new `RagActor` and returns a handle to it.
    ///
    /// # Arguments
    ///
    /// * `db_path` - Directory of the LanceDB database.
    /// * `model_cache_dir` - Where the embedding model is downloaded and cached.
    pub fn new(db_path: PathBuf, model_cache_dir: PathBuf) -> Self {
        let (sender, receiver) = mpsc::channel(32);
        let actor = RagActorRunner::new(receiver, db_path, model_cache_dir);
        tokio::spawn(async move { actor.run().await });
        Self { sender }
    }

    async fn request<T>(
        &self,
        msg: RagMessage,
        recv: oneshot::Receiver<Result<T, AppError>>,
        limit: Duration,
    ) -> Result<T, AppError> {
        self.sender
            .send(msg)
            .await
            .map_err(|_| ActorError::Internal("RAG Actor closed".to_string()))?;
        timeout(limit, recv)
            .await?
            .map_err(|_| ActorError::Internal("RAG Actor failed to respond".to_string()))?
    }
}

#[async_trait]
impl RagActor for RagActorHandle {
    async fn ingest(&self, chunks: Vec<LessonChunk>) -> Result<usize, AppError> {
        let (send, recv) = oneshot::channel();
        let msg = RagMessage::Ingest {
            chunks,
            responder: send,
        };
        self.request(msg, recv, INGEST_TIMEOUT).await
    }

    async fn search(
        &self,
        query: String,
        limit: usize,
        lesson_id: Option<String>,
    ) -> Result<Vec<Passage>, AppError> {
        let (send, recv) = oneshot::channel();
        let msg = RagMessage::Search {
            query,
            limit,
            lesson_id,
            responder: send,
        };
        self.request(msg, recv, SEARCH_TIMEOUT).await
    }

    async fn reset(&self) -> Result<(), AppError> {
        let (send, recv) = oneshot::channel();
        let msg = RagMessage::Reset { responder: send };
        self.request(msg, recv, SEARCH_TIMEOUT).await
    }
}

// --- Actor Runner (Internal Logic) ---
struct RagActorRunner {
    receiver: mpsc::Receiver<RagMessage>,
    embedding_model: Option<TextEmbedding>,
    embedding_cache: LruCache<String, Vec<f32>>,
    db_connection: Option<Connection>,
    db_path: PathBuf,
    model_cache_dir: PathBuf,
}

impl RagActorRunner {
    const CACHE_SIZE: NonZeroUsize = match NonZeroUsize::new(1000) {
        Some(size) => size,
        None => panic!("Cache size must be non-zero"),
    };

    fn new(receiver: mpsc::Receiver<RagMessage>, db_path: PathBuf, model_cache_dir: PathBuf) -> Self {
        Self {
            receiver,
            embedding_model: None,
            embedding_cache: LruCache::new(Self::CACHE_SIZE),
            db_connection: None,
            db_path,
            model_cache_dir,
        }
    }

    async fn run(mut self) {
        info!("RagActor started");

        let options = InitOptions::new(EmbeddingModel::AllMiniLML6V2)
            .with_cache_dir(self.model_cache_dir.clone())
            .with_show_download_progress(false);

        match TextEmbedding::try_new(options) {
            Ok(model) => {
                info!("Embedding model loaded successfully");
                self.embedding_model = Some(model);
            }
            Err(e) => error!("Failed to load embedding model: {}", e),
        }

        if let Err(e) = std::fs::create_dir_all(&self.db_path) {
            error!("Failed to create vector directory at {:?}: {}", self.db_path, e);
        }

        match self.db_path.to_str() {
            Some(db_path) => match connect(db_path).execute().await {
                Ok(conn) => {
                    info!("Connected to LanceDB at {:?}", self.db_path);
                    self.db_connection = Some(conn);
                }
                Err(e) => error!("Failed to connect to LanceDB: {}", e),
            },
            None => error!("Vector database path is not valid UTF-8: {:?}", self.db_path),
        }

        while let Some(msg) = self.receiver.recv().await {
            self.handle_message(msg).await;
        }
        info!("RagActor stopped");
    }

    async fn handle_message(&mut self, msg: RagMessage) {
        match msg {
            RagMessage::Ingest { chunks, responder } => {
                let result = self.ingest_chunks(chunks).await;
                if responder.send(result.map_err(AppError::from)).is_err() {
                    warn!("Failed to send ingest response (channel closed)");
                }
            }
            RagMessage::Search {
                query,
                limit,
                lesson_id,
                responder,
            } => {
                let result = self.search_chunks(query, limit, lesson_id).await;
                if responder.send(result.map_err(AppError::from)).is_err() {
                    warn!("Failed to send search response (channel closed)");
                }
            }
            RagMessage::Reset { responder } => {
                let result = self.drop_table().await;
                if responder.send(result.map_err(AppError::from)).is_err() {
                    warn!("Failed to send reset response (channel closed)");
                }
            }
        }
    }

    fn index(&self) -> Result<(&TextEmbedding, &Connection), ActorError> {
        let model = self
            .embedding_model
            .as_ref()
            .ok_or_else(|| ActorError::IndexUnavailable("Embedding model not loaded".to_string()))?;
        let conn = self
            .db_connection
            .as_ref()
            .ok_or_else(|| ActorError::IndexUnavailable("DB not connected".to_string()))?;
        Ok((model, conn))
    }

    async fn table_exists(conn: &Connection) -> Result<bool, ActorError> {
        Ok(conn
            .table_names()
            .execute()
            .await
            .map_err(|e| ActorError::RagError(format!("Failed to list tables: {}", e)))?
            .iter()
            .any(|name| name == TABLE_NAME))
    }

    #[instrument(skip(self, chunks), fields(chunks = chunks.len()))]
    async fn ingest_chunks(&self, chunks: Vec<LessonChunk>) -> Result<usize, ActorError> {
        let (model, conn) = self.index()?;

        if chunks.is_empty() {
            warn!("Nothing to ingest");
            return Ok(0);
        }

        let texts: Vec<&str> = chunks.iter().map(|c| c.content.as_str()).collect();
        let embeddings = model
            .embed(texts, None)
            .map_err(|e| ActorError::RagError(format!("Embedding failed: {}", e)))?;

        let schema = chunk_schema();
        let batch = build_batch(schema.clone(), &chunks, &embeddings)?;
        let reader = RecordBatchIterator::new(vec![Ok(batch)], schema);

        if Self::table_exists(conn).await? {
            let table = conn
                .open_table(TABLE_NAME)
                .execute()
                .await
                .map_err(|e| ActorError::RagError(format!("Failed to open table: {}", e)))?;
            table
                .add(Box::new(reader))
                .execute()
                .await
                .map_err(|e| ActorError::RagError(format!("Failed to add data: {}", e)))?;
        } else {
            conn.create_table(TABLE_NAME, Box::new(reader))
                .execute()
                .await
                .map_err(|e| ActorError::RagError(format!("Failed to create table: {}", e)))?;
        }

        info!("Ingested {} chunks into LanceDB", chunks.len());
        Ok(chunks.len())
    }

    fn embed_query(&mut self, query: &str) -> Result<Vec<f32>, ActorError> {
        if let Some(embedding) = self.embedding_cache.get(query) {
            debug!("Cache hit for query");
            return Ok(embedding.clone());
        }

        let (model, _) = self.index()?;
        let embedding = model
            .embed(vec![query], None)
            .map_err(|e| ActorError::RagError(format!("Embedding failed: {}", e)))?
            .into_iter()
            .next()
            .ok_or_else(|| ActorError::RagError("No embedding generated".to_string()))?;

        self.embedding_cache.put(query.to_string(), embedding.clone());
        Ok(embedding)
    }

    #[instrument(skip(self, query), fields(query_len = query.len()))]
    async fn search_chunks(
        &mut self,
        query: String,
        limit: usize,
        lesson_id: Option<String>,
    ) -> Result<Vec<Passage>, ActorError> {
        let query_vec = self.embed_query(&query)?;
        let (_, conn) = self.index()?;

        if !Self::table_exists(conn).await? {
            info!("Lesson table does not exist yet, returning no passages");
            return Ok(Vec::new());
        }

        let table = conn
            .open_table(TABLE_NAME)
            .execute()
            .await
            .map_err(|e| ActorError::RagError(format!("Failed to open table: {}", e)))?;

        let mut query = table.query();
        if let Some(id) = lesson_id.as_deref() {
            query = query.only_if(lesson_filter(id));
        }

        let mut results = query
            .limit(limit)
            .nearest_to(query_vec)
            .map_err(|e| ActorError::RagError(format!("Query setup failed: {}", e)))?
            .execute()
            .await
            .map_err(|e| ActorError::RagError(format!("Search failed: {}", e)))?;

        let mut passages = Vec::new();
        while let Some(batch) = results
            .try_next()
            .await
            .map_err(|e| ActorError::RagError(format!("Stream error: {}", e)))?
        {
            passages.extend(read_passages(&batch)?);
        }

        debug!(found = passages.len(), "Search finished");
        Ok(passages)
    }

    async fn drop_table(&self) -> Result<(), ActorError> {
        let conn = self
            .db_connection
            .as_ref()
            .ok_or_else(|| ActorError::IndexUnavailable("DB not connected".to_string()))?;

        if !Self::table_exists(conn).await? {
            return Ok(());
        }

        conn.drop_table(TABLE_NAME)
            .await
            .map_err(|e| ActorError::RagError(format!("Failed to drop table: {}", e)))?;
        info!("Dropped lesson table");
        Ok(())
    }
}

/// SQL predicate selecting one lesson. Single quotes are doubled.
fn lesson_filter(lesson_id: &str) -> String {
    format!("lesson_id = '{}'", lesson_id.replace('\'', "''"))
}

fn chunk_schema() -> SchemaRef {
    Arc::new(Schema::new(vec![
        Field::new("id", DataType::Utf8, false),
        Field::new("content", DataType::Utf8, false),
        Field::new("lesson_id", DataType::Utf8, false),
        Field::new("lesson_name", DataType::Utf8, false),
        Field::new("source", DataType::Utf8, false),
        Field::new(
            "vector",
            DataType::FixedSizeList(Arc::new(Field::new("item", DataType::Float32, true)), EMBEDDING_DIM),
            true,
        ),
    ]))
}

fn build_batch(schema: SchemaRef, chunks: &[LessonChunk], embeddings: &[Vec<f32>]) -> Result<RecordBatch, ActorError> {
    if chunks.len() != embeddings.len() {
        return Err(ActorError::RagError(format!(
            "Got {} embeddings for {} chunks",
            embeddings.len(),
            chunks.len()
        )));
    }

    let total = chunks.len();
    let mut id_builder = StringBuilder::with_capacity(total, total * 36);
    let mut content_builder = StringBuilder::with_capacity(total, total * 1024);
    let mut lesson_id_builder = StringBuilder::with_capacity(total, total * 32);
    let mut lesson_name_builder = StringBuilder::with_capacity(total, total * 48);
    let mut source_builder = StringBuilder::with_capacity(total, total * 64);
    let values_builder = Float32Builder::with_capacity(total * EMBEDDING_DIM as usize);
    let mut vector_builder = FixedSizeListBuilder::new(values_builder, EMBEDDING_DIM);

    for (chunk, embedding) in chunks.iter().zip(embeddings) {
        if embedding.len() != EMBEDDING_DIM as usize {
            return Err(ActorError::RagError(format!(
                "Embedding has {} dimensions, expected {}",
                embedding.len(),
                EMBEDDING_DIM
            )));
        }
        id_builder.append_value(uuid::Uuid::new_v4().to_string());
        content_builder.append_value(&chunk.content);
        lesson_id_builder.append_value(&chunk.lesson_id);
        lesson_name_builder.append_value(&chunk.lesson_name);
        source_builder.append_value(&chunk.source);
        vector_builder.values().append_slice(embedding);
        vector_builder.append(true);
    }

    RecordBatch::try_new(
        schema,
        vec![
            Arc::new(id_builder.finish()),
            Arc::new(content_builder.finish()),
            Arc::new(lesson_id_builder.finish()),
            Arc::new(lesson_name_builder.finish()),
            Arc::new(source_builder.finish()),
            Arc::new(vector_builder.finish()),
        ],
    )
    .map_err(|e| ActorError::RagError(format!("Failed to create RecordBatch: {}", e)))
}

fn string_column<'a>(batch: &'a RecordBatch, name: &str) -> Result<&'a StringArray, ActorError> {
    batch
        .column_by_name(name)
        .ok_or_else(|| ActorError::RagError(format!("Column '{}' not found", name)))?
        .as_any()
        .downcast_ref::<StringArray>()
        .ok_or_else(|| ActorError::RagError(format!("Failed to downcast {} column", name)))
}

fn read_passages(batch: &RecordBatch) -> Result<Vec<Passage>, ActorError> {
    let content = string_column(batch, "content")?;
    let lesson_id = string_column(batch, "lesson_id")?;
    let distance = batch
        .column_by_name("_distance")
        .and_then(|col| col.as_any().downcast_ref::<Float32Array>());

    let mut passages = Vec::with_capacity(content.len());
    for i in 0..content.len() {
        if content.is_null(i) {
            continue;
        }
        passages.push(Passage {
            content: content.value(i).to_string(),
            lesson_id: (!lesson_id.is_null(i)).then(|| lesson_id.value(i).to_string()),
            score: distance
                .filter(|d| !d.is_null(i))
                .map(|d| d.value(i))
                .unwrap_or(0.0),
        });
    }
    Ok(passages)
}
