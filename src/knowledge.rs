//! Knowledge document loading
//!
//! The document is read whole, fresh, on every answer request. Edits on disk
//! take effect on the next question without a restart.

use std::path::{Path, PathBuf};

use crate::{Error, Result};

/// Location of the single knowledge document
#[derive(Debug, Clone)]
pub struct KnowledgeSource {
    path: PathBuf,
}

impl KnowledgeSource {
    /// Create a source for the document at `path`
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Path of the document
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the whole document as text
    ///
    /// # Errors
    ///
    /// Returns a service error if the file is missing, unreadable, or not UTF-8
    pub async fn load(&self) -> Result<String> {
        let text = tokio::fs::read_to_string(&self.path).await.map_err(|e| {
            tracing::error!(path = %self.path.display(), error = %e, "failed to read knowledge document");
            Error::Service(format!(
                "failed to read knowledge document {}: {e}",
                self.path.display()
            ))
        })?;

        tracing::debug!(path = %self.path.display(), bytes = text.len(), "loaded knowledge document");
        Ok(text)
    }

    /// Whether the document can currently be opened
    pub async fn is_readable(&self) -> bool {
        tokio::fs::metadata(&self.path)
            .await
            .is_ok_and(|m| m.is_file())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[tokio::test]
    async fn reads_fresh_on_every_load() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "first").unwrap();

        let source = KnowledgeSource::new(file.path());
        assert_eq!(source.load().await.unwrap(), "first");

        std::fs::write(file.path(), "second").unwrap();
        assert_eq!(source.load().await.unwrap(), "second");
    }

    #[tokio::test]
    async fn missing_document_is_service_error() {
        let dir = tempfile::tempdir().unwrap();
        let source = KnowledgeSource::new(dir.path().join("absent.html"));

        assert!(!source.is_readable().await);
        let err = source.load().await.unwrap_err();
        assert!(matches!(err, Error::Service(ref msg) if msg.contains("absent.html")));
    }
}
