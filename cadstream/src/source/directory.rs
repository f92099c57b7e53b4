//! Model files on the local filesystem.

use std::path::{Path, PathBuf};

use bytes::Bytes;
use tracing::trace;

use crate::loading::{BoxFuture, FetchError};

use super::ModelSource;

/// Serves files from a directory using `tokio::fs`.
#[derive(Debug, Clone)]
pub struct DirectorySource {
    root: PathBuf,
}

impl DirectorySource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path of a named file.
    pub fn path_for(&self, name: &str) -> PathBuf {
        self.root.join(name)
    }
}

impl ModelSource for DirectorySource {
    fn fetch_file<'a>(&'a self, name: &'a str) -> BoxFuture<'a, Result<Bytes, FetchError>> {
        Box::pin(async move {
            let path = self.path_for(name);
            let data = tokio::fs::read(&path).await.map_err(|e| FetchError::io(&path, e))?;
            trace!(path = %path.display(), bytes = data.len(), "Read model file");
            Ok(Bytes::from(data))
        })
    }

    fn describe(&self) -> String {
        self.root.display().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_reads_named_file() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("mesh_1.ctm"), b"mesh").unwrap();

        let source = DirectorySource::new(dir.path());
        assert_eq!(source.fetch_file("mesh_1.ctm").await.unwrap(), Bytes::from_static(b"mesh"));
    }

    #[tokio::test]
    async fn test_missing_file_is_permanent_io_error() {
        let dir = TempDir::new().unwrap();
        let source = DirectorySource::new(dir.path());

        let err = source.fetch_file("absent.bin").await.unwrap_err();
        assert!(matches!(&err, FetchError::Io { path, .. } if path.ends_with("absent.bin")));
        assert!(err.is_permanent());
    }
}
