//! Database Module Tests
//!
//! The SQLite session store against in-memory and on-disk databases.

use crate::database::{self, SqliteSessionStore};
use crate::models::{ChatMessage, Role};
use crate::session::SessionStore;
use tempfile::tempdir;

async fn create_test_store() -> SqliteSessionStore {
    let pool = database::init_memory_db()
        .await
        .expect("Failed to create test pool");
    SqliteSessionStore::new(pool)
}

#[cfg(test)]
mod transcript_tests {
    use super::*;

    #[tokio::test]
    async fn test_unknown_thread_has_no_transcript() {
        let store = create_test_store().await;
        assert!(store.transcript("missing").await.unwrap().is_none());
        assert_eq!(store.conversation_history("missing").await.unwrap(), "");
    }

    #[tokio::test]
    async fn test_messages_keep_order_and_roles() {
        let store = create_test_store().await;
        store.append("t1", ChatMessage::user("Số chẵn là gì?")).await.unwrap();
        store.append("t1", ChatMessage::assistant("Là số chia hết cho 2 em ạ.")).await.unwrap();
        store.append("t1", ChatMessage::user("Cho em ví dụ")).await.unwrap();
        store.append("t2", ChatMessage::user("Phân số là gì?")).await.unwrap();

        let transcript = store.transcript("t1").await.unwrap().unwrap();
        assert_eq!(transcript.len(), 3);
        assert_eq!(transcript[1].role, Role::Assistant);
        assert_eq!(transcript[2].content, "Cho em ví dụ");

        assert_eq!(
            store.conversation_history("t1").await.unwrap(),
            "Học sinh: Số chẵn là gì?\nTrợ giảng: Là số chia hết cho 2 em ạ.\nHọc sinh: Cho em ví dụ"
        );
    }

    #[tokio::test]
    async fn test_clear_removes_both_lists() {
        let store = create_test_store().await;
        store.append("t1", ChatMessage::user("a")).await.unwrap();
        store.save_working_history("t1", vec![ChatMessage::user("a")]).await.unwrap();
        store.append("t2", ChatMessage::user("b")).await.unwrap();

        assert!(store.clear("t1").await.unwrap());
        assert!(!store.clear("t1").await.unwrap());
        assert!(store.transcript("t1").await.unwrap().is_none());
        assert!(store.working_history("t1").await.unwrap().is_empty());
        assert!(store.transcript("t2").await.unwrap().is_some());
    }
}

#[cfg(test)]
mod working_history_tests {
    use super::*;

    #[tokio::test]
    async fn test_working_history_upsert() {
        let store = create_test_store().await;
        assert!(store.working_history("t1").await.unwrap().is_empty());

        store
            .save_working_history("t1", vec![ChatMessage::user("a"), ChatMessage::assistant("b")])
            .await
            .unwrap();
        store
            .save_working_history(
                "t1",
                vec![ChatMessage::system("Tóm tắt cuộc hội thoại trước: a"), ChatMessage::user("c")],
            )
            .await
            .unwrap();

        let history = store.working_history("t1").await.unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].role, Role::System);
        assert_eq!(history[1].content, "c");
    }
}

#[cfg(test)]
mod persistence_tests {
    use super::*;

    #[tokio::test]
    async fn test_sessions_survive_reopen() {
        let dir = tempdir().expect("Failed to create temp dir");
        let db_path = dir.path().join("db").join("sessions.sqlite");

        {
            let pool = database::init_db(&db_path).await.unwrap();
            let store = SqliteSessionStore::new(pool.clone());
            store.append("t1", ChatMessage::user("Số lẻ là gì?")).await.unwrap();
            store.save_working_history("t1", vec![ChatMessage::user("Số lẻ là gì?")]).await.unwrap();
            pool.close().await;
        }

        assert!(db_path.exists());
        let store = SqliteSessionStore::new(database::init_db(&db_path).await.unwrap());
        assert_eq!(
            store.transcript("t1").await.unwrap(),
            Some(vec![ChatMessage::user("Số lẻ là gì?")])
        );
        assert_eq!(store.working_history("t1").await.unwrap().len(), 1);
    }
}
