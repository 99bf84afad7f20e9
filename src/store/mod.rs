pub mod documents;

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("document I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("document is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("version conflict on {document}: expected {expected}, found {found}")]
    VersionConflict {
        document: String,
        expected: u64,
        found: u64,
    },
}

/// A persisted document with an optimistic-concurrency version. Version 0
/// means the document has never been written.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Versioned<T> {
    pub version: u64,
    pub updated_at: Option<DateTime<Utc>>,
    pub data: T,
}

#[derive(Deserialize)]
struct VersionHeader {
    version: u64,
}

/// JSON documents under a data directory, one file per document.
#[derive(Debug, Clone)]
pub struct DocumentStore {
    dir: PathBuf,
}

impl DocumentStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub async fn init(&self) -> Result<(), StoreError> {
        tokio::fs::create_dir_all(&self.dir).await?;
        Ok(())
    }

    fn path(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{name}.json"))
    }

    async fn read(&self, name: &str) -> Result<Option<String>, StoreError> {
        match tokio::fs::read_to_string(self.path(name)).await {
            Ok(raw) => Ok(Some(raw)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Load a document, or `default()` at version 0 if it does not exist.
    pub async fn load_or<T, F>(&self, name: &str, default: F) -> Result<Versioned<T>, StoreError>
    where
        T: DeserializeOwned,
        F: FnOnce() -> T,
    {
        match self.read(name).await? {
            Some(raw) => {
                let doc: Versioned<T> = serde_json::from_str(&raw)?;
                tracing::debug!(document = name, version = doc.version, "Document loaded");
                Ok(doc)
            }
            None => {
                tracing::debug!(document = name, "Document missing, using default");
                Ok(Versioned {
                    version: 0,
                    updated_at: None,
                    data: default(),
                })
            }
        }
    }

    pub async fn load<T>(&self, name: &str) -> Result<Versioned<T>, StoreError>
    where
        T: DeserializeOwned + Default,
    {
        self.load_or(name, T::default).await
    }

    async fn disk_version(&self, name: &str) -> Result<u64, StoreError> {
        match self.read(name).await? {
            Some(raw) => Ok(serde_json::from_str::<VersionHeader>(&raw)?.version),
            None => Ok(0),
        }
    }

    /// Write `doc` if the file is still at the version it was loaded with.
    /// On success the document's version is bumped in place. The write goes
    /// to a temp file first and is renamed over the old one.
    pub async fn save<T: Serialize>(
        &self,
        name: &str,
        doc: &mut Versioned<T>,
        now: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        let found = self.disk_version(name).await?;
        if found != doc.version {
            return Err(StoreError::VersionConflict {
                document: name.to_string(),
                expected: doc.version,
                found,
            });
        }

        let next = Versioned {
            version: doc.version + 1,
            updated_at: Some(now),
            data: &doc.data,
        };
        let body = serde_json::to_vec_pretty(&next)?;

        let tmp = self.dir.join(format!(".{name}.json.tmp"));
        tokio::fs::write(&tmp, body).await?;
        tokio::fs::rename(&tmp, self.path(name)).await?;

        doc.version = next.version;
        doc.updated_at = next.updated_at;
        tracing::debug!(document = name, version = doc.version, "Document saved");
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Default, PartialEq, Serialize, Deserialize)]
    struct Counter {
        hits: u32,
    }

    #[tokio::test]
    async fn test_missing_document_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let store = DocumentStore::new(dir.path());

        let doc: Versioned<Counter> = store.load("counter").await.unwrap();
        assert_eq!(doc.version, 0);
        assert_eq!(doc.data, Counter::default());
        assert!(doc.updated_at.is_none());
    }

    #[tokio::test]
    async fn test_save_bumps_version() {
        let dir = tempfile::tempdir().unwrap();
        let store = DocumentStore::new(dir.path());

        let mut doc: Versioned<Counter> = store.load("counter").await.unwrap();
        doc.data.hits = 3;
        store.save("counter", &mut doc, Utc::now()).await.unwrap();
        assert_eq!(doc.version, 1);

        let reloaded: Versioned<Counter> = store.load("counter").await.unwrap();
        assert_eq!(reloaded.version, 1);
        assert_eq!(reloaded.data.hits, 3);
        assert!(reloaded.updated_at.is_some());

        // No temp file left behind
        let names: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().into_string().unwrap())
            .collect();
        assert_eq!(names, vec!["counter.json".to_string()]);
    }

    #[tokio::test]
    async fn test_stale_writer_gets_conflict() {
        let dir = tempfile::tempdir().unwrap();
        let store = DocumentStore::new(dir.path());

        let mut first: Versioned<Counter> = store.load("counter").await.unwrap();
        let mut second: Versioned<Counter> = store.load("counter").await.unwrap();

        first.data.hits = 1;
        store.save("counter", &mut first, Utc::now()).await.unwrap();

        second.data.hits = 2;
        let err = store.save("counter", &mut second, Utc::now()).await.unwrap_err();
        assert!(matches!(
            err,
            StoreError::VersionConflict { expected: 0, found: 1, .. }
        ));

        let on_disk: Versioned<Counter> = store.load("counter").await.unwrap();
        assert_eq!(on_disk.data.hits, 1);
    }

    #[tokio::test]
    async fn test_corrupt_document_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("counter.json"), "{not json").unwrap();
        let store = DocumentStore::new(dir.path());

        let result: Result<Versioned<Counter>, _> = store.load("counter").await;
        assert!(matches!(result, Err(StoreError::Json(_))));
    }

    #[tokio::test]
    async fn test_init_creates_directory() {
        let dir = tempfile::tempdir().unwrap();
        let store = DocumentStore::new(dir.path().join("nested/data"));
        store.init().await.unwrap();
        assert!(store.dir().is_dir());
    }
}
