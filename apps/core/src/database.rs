use crate::error::AppError;
use crate::models::{ChatMessage, Role};
use crate::session::SessionStore;
use async_trait::async_trait;
use chrono::Utc;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use sqlx::types::Json;
use std::path::Path;
use tracing::{info, warn};

/// Opens (creating if missing) the session database and applies the schema.
pub async fn init_db(db_path: &Path) -> Result<SqlitePool, sqlx::Error> {
    if let Some(parent) = db_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    info!("Initializing session database at: {}", db_path.display());

    let options = SqliteConnectOptions::new()
        .filename(db_path)
        .create_if_missing(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await?;

    migrate(&pool).await?;
    Ok(pool)
}

/// In-memory database, for tests.
pub async fn init_memory_db() -> Result<SqlitePool, sqlx::Error> {
    // One connection: every `:memory:` connection is its own database.
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await?;
    migrate(&pool).await?;
    Ok(pool)
}

async fn migrate(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS messages (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            thread_id TEXT NOT NULL,
            role TEXT NOT NULL,
            content TEXT NOT NULL,
            created_at INTEGER NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_messages_thread ON messages(thread_id, id)")
        .execute(pool)
        .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS working_histories (
            thread_id TEXT PRIMARY KEY,
            history TEXT NOT NULL,
            updated_at INTEGER NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    info!("Session database ready");
    Ok(())
}

/// Sessions persisted in SQLite so they survive restarts.
#[derive(Clone)]
pub struct SqliteSessionStore {
    pool: SqlitePool,
}

impl SqliteSessionStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SessionStore for SqliteSessionStore {
    async fn append(&self, thread_id: &str, message: ChatMessage) -> Result<(), AppError> {
        sqlx::query("INSERT INTO messages (thread_id, role, content, created_at) VALUES (?, ?, ?, ?)")
            .bind(thread_id)
            .bind(message.role.as_str())
            .bind(&message.content)
            .bind(Utc::now().timestamp())
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn transcript(&self, thread_id: &str) -> Result<Option<Vec<ChatMessage>>, AppError> {
        let rows = sqlx::query_as::<_, (String, String)>(
            "SELECT role, content FROM messages WHERE thread_id = ? ORDER BY id ASC",
        )
        .bind(thread_id)
        .fetch_all(&self.pool)
        .await?;

        if rows.is_empty() {
            return Ok(None);
        }

        let messages = rows
            .into_iter()
            .filter_map(|(role, content)| match Role::parse(&role) {
                Some(role) => Some(ChatMessage { role, content }),
                None => {
                    warn!("Skipping stored message with unknown role '{}'", role);
                    None
                }
            })
            .collect();
        Ok(Some(messages))
    }

    async fn working_history(&self, thread_id: &str) -> Result<Vec<ChatMessage>, AppError> {
        let row = sqlx::query_as::<_, (Json<Vec<ChatMessage>>,)>(
            "SELECT history FROM working_histories WHERE thread_id = ?",
        )
        .bind(thread_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|(Json(history),)| history).unwrap_or_default())
    }

    async fn save_working_history(&self, thread_id: &str, history: Vec<ChatMessage>) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO working_histories (thread_id, history, updated_at)
            VALUES (?, ?, ?)
            ON CONFLICT(thread_id) DO UPDATE SET history = excluded.history, updated_at = excluded.updated_at
            "#,
        )
        .bind(thread_id)
        .bind(Json(history))
        .bind(Utc::now().timestamp())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn clear(&self, thread_id: &str) -> Result<bool, AppError> {
        let mut tx = self.pool.begin().await?;
        let removed = sqlx::query("DELETE FROM messages WHERE thread_id = ?")
            .bind(thread_id)
            .execute(&mut *tx)
            .await?
            .rows_affected();
        let removed_history = sqlx::query("DELETE FROM working_histories WHERE thread_id = ?")
            .bind(thread_id)
            .execute(&mut *tx)
            .await?
            .rows_affected();
        tx.commit().await?;
        Ok(removed + removed_history > 0)
    }
}
