//! Builds the lesson index from the transcripts directory.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Serialize;
use text_splitter::{Characters, ChunkConfig, TextSplitter};
use tracing::{info, instrument, warn};

use crate::actors::traits::RagActor;
use crate::error::AppError;
use crate::models::{Lesson, LessonChunk};
use crate::text_extract::{extract_text_from_file, is_supported};

pub const DEFAULT_CHUNK_SIZE: usize = 1000;
pub const DEFAULT_CHUNK_OVERLAP: usize = 200;

/// Recursive character splitter for lesson transcripts: paragraphs first,
/// then lines, sentences and words. Sizes are counted in characters and the
/// chunks are trimmed.
pub fn lesson_splitter(chunk_size: usize, chunk_overlap: usize) -> Result<TextSplitter<Characters>, AppError> {
    let config = ChunkConfig::new(chunk_size)
        .with_overlap(chunk_overlap)
        .map_err(|e| AppError::Config(format!("Invalid chunk settings: {}", e)))?;
    Ok(TextSplitter::new(config))
}

/// Lists the transcripts in `dir` as lessons, sorted by id. A missing
/// directory has no lessons.
pub fn list_lessons(dir: &Path) -> Result<Vec<Lesson>, AppError> {
    Ok(transcript_files(dir)?
        .into_iter()
        .filter_map(|path| lesson_for(&path))
        .collect())
}

fn lesson_for(path: &Path) -> Option<Lesson> {
    let lesson_id = path.file_stem()?.to_str()?.to_string();
    let lesson_name = path.file_name()?.to_str()?.to_string();
    Some(Lesson {
        lesson_id,
        lesson_name,
    })
}

/// Supported transcript files in `dir`, sorted by file stem.
fn transcript_files(dir: &Path) -> Result<Vec<PathBuf>, AppError> {
    if !dir.is_dir() {
        return Ok(Vec::new());
    }

    let mut files = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if !path.is_file() {
            continue;
        }
        let name = path.file_name().and_then(|n| n.to_str()).unwrap_or_default();
        if is_supported(name) {
            files.push(path);
        } else {
            info!("Skipping unsupported file: {:?}", path);
        }
    }
    files.sort_by(|a, b| a.file_stem().cmp(&b.file_stem()));
    Ok(files)
}

/// Outcome of an index build.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct IndexReport {
    pub files_indexed: usize,
    pub files_failed: usize,
    pub chunks: usize,
}

/// Feeds lesson transcripts into a [`RagActor`].
pub struct Indexer<R: ?Sized> {
    rag: Arc<R>,
    splitter: TextSplitter<Characters>,
}

impl<R: RagActor + ?Sized> Indexer<R> {
    /// An indexer with the default chunking of 1000 characters, 200 overlapping.
    pub fn new(rag: Arc<R>) -> Result<Self, AppError> {
        Ok(Self {
            rag,
            splitter: lesson_splitter(DEFAULT_CHUNK_SIZE, DEFAULT_CHUNK_OVERLAP)?,
        })
    }

    /// Chunks of one transcript, tagged with its lesson metadata.
    pub async fn load_chunks(&self, path: &Path) -> Result<Vec<LessonChunk>, AppError> {
        let lesson = lesson_for(path)
            .ok_or_else(|| AppError::Validation(format!("Transcript name is not valid UTF-8: {:?}", path)))?;
        let data = tokio::fs::read(path).await?;
        let text = extract_text_from_file(&lesson.lesson_name, &data).map_err(AppError::Validation)?;
        let source = path.to_string_lossy().to_string();

        Ok(self
            .splitter
            .chunks(&text)
            .map(|content| LessonChunk {
                content: content.to_string(),
                lesson_id: lesson.lesson_id.clone(),
                lesson_name: lesson.lesson_name.clone(),
                source: source.clone(),
            })
            .collect())
    }

    /// Indexes every transcript in `dir`. With `rebuild` the existing index is
    /// dropped first. A file that fails is logged and skipped.
    #[instrument(skip(self))]
    pub async fn build(&self, dir: &Path, rebuild: bool) -> Result<IndexReport, AppError> {
        let files = transcript_files(dir)?;
        if files.is_empty() {
            warn!("No transcripts found in {:?}", dir);
        }

        if rebuild {
            self.rag.reset().await?;
        }

        let mut report = IndexReport::default();
        for path in files {
            let result = match self.load_chunks(&path).await {
                Ok(chunks) => self.rag.ingest(chunks).await,
                Err(e) => Err(e),
            };
            match result {
                Ok(count) => {
                    info!("Indexed {:?}: {} chunks", path, count);
                    report.files_indexed += 1;
                    report.chunks += count;
                }
                Err(e) => {
                    warn!("Failed to index {:?}: {}", path, e);
                    report.files_failed += 1;
                }
            }
        }

        info!(
            files = report.files_indexed,
            failed = report.files_failed,
            chunks = report.chunks,
            "Index build finished"
        );
        Ok(report)
    }
}
