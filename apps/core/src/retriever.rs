//! Lesson context retrieval on top of the vector index.

use std::sync::Arc;

use tracing::{debug, instrument, warn};

use crate::actors::messages::ActorError;
use crate::actors::traits::RagActor;
use crate::brain::expansion::{dedup_by_prefix, expand_query, DEFAULT_PREFIX_LEN};
use crate::error::AppError;

/// Context used when the vector index cannot be opened.
pub const NO_INDEX_CONTEXT: &str = "Chưa có dữ liệu bài giảng trong hệ thống.";
/// Context used when a search fails.
pub const QUERY_FAILED_CONTEXT: &str = "Không thể truy vấn dữ liệu bài giảng.";

/// Expands queries, over-fetches and deduplicates passages from a [`RagActor`].
pub struct Retriever<R: ?Sized> {
    rag: Arc<R>,
    prefix_len: usize,
}

impl<R: ?Sized> Clone for Retriever<R> {
    fn clone(&self) -> Self {
        Self {
            rag: Arc::clone(&self.rag),
            prefix_len: self.prefix_len,
        }
    }
}

impl<R: RagActor + ?Sized> Retriever<R> {
    pub fn new(rag: Arc<R>) -> Self {
        Self {
            rag,
            prefix_len: DEFAULT_PREFIX_LEN,
        }
    }

    /// Up to `k` distinct passages for `query`, optionally within one lesson.
    ///
    /// Fetches `2k` candidates so that duplicates removed by the prefix check
    /// still leave `k` passages when the index has them.
    #[instrument(skip(self))]
    pub async fn passages(&self, query: &str, k: usize, lesson_id: Option<&str>) -> Result<Vec<String>, AppError> {
        let expanded = expand_query(query);
        let lesson_id = lesson_id.map(str::trim).filter(|id| !id.is_empty());

        let found = self
            .rag
            .search(expanded, k.saturating_mul(2), lesson_id.map(str::to_string))
            .await?;
        let fetched = found.len();

        let mut passages = dedup_by_prefix(found.into_iter().map(|p| p.content).collect(), self.prefix_len);
        passages.truncate(k);

        debug!(fetched, kept = passages.len(), "Passages retrieved");
        Ok(passages)
    }

    /// The lesson context for a prompt: passages joined by blank lines.
    ///
    /// Never fails; index problems are reported to the model as a short
    /// Vietnamese notice instead.
    pub async fn get_context(&self, query: &str, k: usize, lesson_id: Option<&str>) -> String {
        match self.passages(query, k, lesson_id).await {
            Ok(passages) => passages.join("\n\n"),
            Err(AppError::Actor(ActorError::IndexUnavailable(reason))) => {
                warn!("Vector index unavailable: {}", reason);
                NO_INDEX_CONTEXT.to_string()
            }
            Err(e) => {
                warn!("Lesson search failed: {}", e);
                QUERY_FAILED_CONTEXT.to_string()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::support::MockRag;

    #[tokio::test]
    async fn test_context_dedups_and_keeps_k() {
        let repeated = format!("{}A", "Số chẵn là số chia hết cho 2. ".repeat(5));
        let repeated_again = format!("{}B", "Số chẵn là số chia hết cho 2. ".repeat(5));
        let rag = Arc::new(MockRag::with_passages(vec![
            (repeated.as_str(), "bai_3"),
            (repeated_again.as_str(), "bai_3"),
            ("Số lẻ không chia hết cho 2.", "bai_3"),
            ("Phân số gồm tử số và mẫu số.", "bai_phan_so"),
        ]));
        let retriever = Retriever::new(rag.clone());

        let context = retriever.get_context("Số chẵn là gì?", 2, None).await;
        assert_eq!(context, format!("{}\n\nSố lẻ không chia hết cho 2.", repeated));

        let searches = rag.searches();
        assert_eq!(searches.len(), 1);
        assert_eq!(searches[0].limit, 4);
        assert!(searches[0].query.contains("số chẵn chia hết cho 2"));
        assert!(searches[0].lesson_id.is_none());
    }

    #[tokio::test]
    async fn test_lesson_filter_is_forwarded() {
        let rag = Arc::new(MockRag::with_passages(vec![
            ("Số lẻ không chia hết cho 2.", "bai_3"),
            ("Phân số gồm tử số và mẫu số.", "bai_phan_so"),
        ]));
        let retriever = Retriever::new(rag.clone());

        let context = retriever.get_context("tử số", 3, Some("bai_phan_so")).await;
        assert_eq!(context, "Phân số gồm tử số và mẫu số.");
        assert_eq!(rag.searches()[0].lesson_id.as_deref(), Some("bai_phan_so"));

        // Blank ids mean no filter.
        retriever.get_context("tử số", 3, Some("  ")).await;
        assert!(rag.searches()[1].lesson_id.is_none());
    }

    #[tokio::test]
    async fn test_index_errors_become_notices() {
        let retriever = Retriever::new(Arc::new(MockRag::failing(ActorError::IndexUnavailable(
            "no model".to_string(),
        ))));
        assert_eq!(retriever.get_context("q", 3, None).await, NO_INDEX_CONTEXT);

        let retriever = Retriever::new(Arc::new(MockRag::failing(ActorError::RagError("boom".to_string()))));
        assert_eq!(retriever.get_context("q", 3, None).await, QUERY_FAILED_CONTEXT);
    }

    #[tokio::test]
    async fn test_empty_index_gives_empty_context() {
        let retriever = Retriever::new(Arc::new(MockRag::with_passages(vec![])));
        assert_eq!(retriever.get_context("q", 3, None).await, "");
    }
}
