use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

/// Directory layout under the configured data root.
///
/// ```text
/// data/
///   transcripts/   lesson .txt / .pdf files
///   vectors/       LanceDB lesson index
///   models/        embedding model cache
///   db/            session database (when persistence is on)
/// ```
#[derive(Debug, Clone)]
pub struct DataLayout {
    root: PathBuf,
}

impl DataLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn transcripts_dir(&self) -> PathBuf {
        self.root.join("transcripts")
    }

    pub fn vectors_dir(&self) -> PathBuf {
        self.root.join("vectors")
    }

    pub fn models_dir(&self) -> PathBuf {
        self.root.join("models")
    }

    pub fn db_dir(&self) -> PathBuf {
        self.root.join("db")
    }

    /// Creates every directory of the layout that does not exist yet.
    pub fn init(&self) -> Result<(), std::io::Error> {
        for dir in [
            self.root.clone(),
            self.transcripts_dir(),
            self.vectors_dir(),
            self.models_dir(),
            self.db_dir(),
        ] {
            if !dir.exists() {
                fs::create_dir_all(&dir)?;
                info!("Created directory: {:?}", dir);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_creates_layout() {
        let tmp = tempfile::tempdir().unwrap();
        let layout = DataLayout::new(tmp.path().join("data"));

        layout.init().unwrap();
        assert!(layout.transcripts_dir().is_dir());
        assert!(layout.vectors_dir().is_dir());
        assert!(layout.models_dir().is_dir());
        assert!(layout.db_dir().is_dir());

        // Idempotent.
        layout.init().unwrap();
        assert_eq!(layout.root(), tmp.path().join("data"));
    }
}
