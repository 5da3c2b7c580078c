//! # Backup Archive
//!
//! Where exported documents and safety backups are kept.
//!
//! ```text
//! BackupCodec ──store(name, doc)──► BackupArchive
//!                                      │
//!                                      └── DirectoryArchive
//!                                            <backup dir>/
//!                                              safety-backup-20260520-101500000.json
//!                                              shop-2026-05.json
//! ```
//!
//! Names are plain file names; anything that looks like a path is refused.

use async_trait::async_trait;
use std::io;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::error::{DbError, DbResult};
use resell_core::backup::BackupDocument;

/// Named storage for backup documents.
#[async_trait]
pub trait BackupArchive: Send + Sync {
    /// Stores `document` under `name` and returns the stored name.
    async fn store(&self, name: &str, document: &BackupDocument) -> DbResult<String>;

    /// Raw JSON of a stored document.
    async fn read(&self, name: &str) -> DbResult<String>;

    /// Stored names, sorted.
    async fn list(&self) -> DbResult<Vec<String>>;
}

/// Archive backed by a directory of pretty-printed JSON files.
#[derive(Debug, Clone)]
pub struct DirectoryArchive {
    dir: PathBuf,
}

impl DirectoryArchive {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        DirectoryArchive { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, name: &str) -> DbResult<PathBuf> {
        let plain = !name.is_empty()
            && !name.contains(['/', '\\'])
            && name != "."
            && name != "..";
        if !plain {
            return Err(DbError::Io(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("invalid backup name: {:?}", name),
            )));
        }
        Ok(self.dir.join(name))
    }
}

#[async_trait]
impl BackupArchive for DirectoryArchive {
    async fn store(&self, name: &str, document: &BackupDocument) -> DbResult<String> {
        let path = self.path_for(name)?;
        let json = serde_json::to_vec_pretty(document)?;

        tokio::fs::create_dir_all(&self.dir).await?;
        tokio::fs::write(&path, json).await?;

        debug!(path = %path.display(), records = document.record_count(), "Backup written");
        Ok(name.to_string())
    }

    async fn read(&self, name: &str) -> DbResult<String> {
        let path = self.path_for(name)?;
        Ok(tokio::fs::read_to_string(path).await?)
    }

    async fn list(&self) -> DbResult<Vec<String>> {
        let mut entries = match tokio::fs::read_dir(&self.dir).await {
            Ok(entries) => entries,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => return Err(err.into()),
        };

        let mut names = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let name = entry.file_name().to_string_lossy().into_owned();
            if name.ends_with(".json") {
                names.push(name);
            }
        }
        names.sort();
        Ok(names)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use resell_core::Snapshot;

    fn temp_dir() -> PathBuf {
        std::env::temp_dir().join(format!("resell-archive-{}", uuid::Uuid::new_v4()))
    }

    #[tokio::test]
    async fn test_store_read_and_list() {
        let dir = temp_dir();
        let archive = DirectoryArchive::new(&dir);
        assert!(archive.list().await.unwrap().is_empty());

        let document = BackupDocument::from_snapshot(Snapshot::default(), Utc::now());
        archive.store("b.json", &document).await.unwrap();
        archive.store("a.json", &document).await.unwrap();
        tokio::fs::write(dir.join("notes.txt"), "x").await.unwrap();

        assert_eq!(archive.list().await.unwrap(), vec!["a.json", "b.json"]);

        let raw = archive.read("a.json").await.unwrap();
        let decoded: BackupDocument = serde_json::from_str(&raw).unwrap();
        assert_eq!(decoded, document);
        assert!(raw.contains("\"exportDate\""));

        let _ = std::fs::remove_dir_all(dir);
    }

    #[tokio::test]
    async fn test_path_like_names_are_refused() {
        let archive = DirectoryArchive::new(temp_dir());
        let document = BackupDocument::from_snapshot(Snapshot::default(), Utc::now());
        for name in ["", "..", "../escape.json", "nested/x.json"] {
            assert!(matches!(
                archive.store(name, &document).await,
                Err(DbError::Io(_))
            ));
        }
    }
}
