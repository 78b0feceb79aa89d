use std::path::{Path, PathBuf};

use bytes::Bytes;
use uuid::Uuid;

use crate::domain::SimplifiedDocument;

const UPLOAD_FOLDER: &str = "uploads";
const PROCESSED_FOLDER: &str = "processed";

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("no stored blob at {0}")]
    NotFound(String),
    #[error("storage io failure: {0}")]
    Io(#[from] std::io::Error),
    #[error("stored document is not valid JSON: {0}")]
    Corrupt(#[from] serde_json::Error),
}

/// Filesystem-backed blob store for raw uploads and processed results.
/// Layout mirrors an object store: `uploads/<id>/<filename>` for originals
/// and `processed/<id>/simplified.json` for results.
#[derive(Clone)]
pub struct BlobStore {
    root: PathBuf,
}

impl BlobStore {
    pub async fn new(root: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let root = root.into();
        tokio::fs::create_dir_all(root.join(UPLOAD_FOLDER)).await?;
        tokio::fs::create_dir_all(root.join(PROCESSED_FOLDER)).await?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Stores uploaded bytes and returns the relative storage path recorded
    /// in the document's metadata.
    pub async fn put_upload(
        &self,
        document_id: Uuid,
        filename: &str,
        data: &Bytes,
    ) -> Result<String, StorageError> {
        let safe_name = sanitize_filename(filename);
        let relative = format!("{UPLOAD_FOLDER}/{document_id}/{safe_name}");
        let full = self.root.join(&relative);
        if let Some(parent) = full.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&full, data).await?;
        Ok(relative)
    }

    pub async fn read(&self, relative: &str) -> Result<Bytes, StorageError> {
        let full = self.root.join(relative);
        match tokio::fs::read(&full).await {
            Ok(data) => Ok(Bytes::from(data)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(StorageError::NotFound(relative.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Persists a simplified document as JSON and returns its relative path.
    pub async fn put_simplified(
        &self,
        document: &SimplifiedDocument,
    ) -> Result<String, StorageError> {
        let relative = format!("{PROCESSED_FOLDER}/{}/simplified.json", document.document_id);
        let full = self.root.join(&relative);
        if let Some(parent) = full.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let json = serde_json::to_vec_pretty(document)?;
        tokio::fs::write(&full, json).await?;
        Ok(relative)
    }

    pub async fn read_simplified(
        &self,
        document_id: Uuid,
    ) -> Result<Option<SimplifiedDocument>, StorageError> {
        let full = self
            .root
            .join(PROCESSED_FOLDER)
            .join(document_id.to_string())
            .join("simplified.json");
        match tokio::fs::read(&full).await {
            Ok(data) => Ok(Some(serde_json::from_slice(&data)?)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Removes every blob associated with a document. Missing paths are not
    /// an error so deletion stays idempotent.
    pub async fn delete_document(&self, document_id: Uuid) -> Result<(), StorageError> {
        for folder in [UPLOAD_FOLDER, PROCESSED_FOLDER] {
            let dir = self.root.join(folder).join(document_id.to_string());
            match tokio::fs::remove_dir_all(&dir).await {
                Ok(()) => {}
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => return Err(e.into()),
            }
        }
        Ok(())
    }
}

/// Keeps only the final path component and replaces separators so a crafted
/// filename cannot escape the storage root.
fn sanitize_filename(filename: &str) -> String {
    let name = Path::new(filename)
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();
    let cleaned: String = name
        .chars()
        .map(|c| if matches!(c, '/' | '\\' | '\0') { '_' } else { c })
        .collect();
    if cleaned.is_empty() {
        "upload.bin".to_string()
    } else {
        cleaned
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_filename_strips_directories() {
        assert_eq!(sanitize_filename("../../etc/passwd"), "passwd");
        assert_eq!(sanitize_filename("contract.pdf"), "contract.pdf");
        assert_eq!(sanitize_filename(""), "upload.bin");
    }

    #[tokio::test]
    async fn test_upload_round_trip() {
        let dir = std::env::temp_dir().join(format!("plainlex-test-{}", Uuid::new_v4()));
        let store = BlobStore::new(&dir).await.unwrap();
        let id = Uuid::new_v4();
        let data = Bytes::from_static(b"hello legal world");

        let path = store.put_upload(id, "lease.txt", &data).await.unwrap();
        assert_eq!(path, format!("uploads/{id}/lease.txt"));
        assert_eq!(store.read(&path).await.unwrap(), data);

        store.delete_document(id).await.unwrap();
        assert!(matches!(
            store.read(&path).await,
            Err(StorageError::NotFound(_))
        ));
        let _ = tokio::fs::remove_dir_all(&dir).await;
    }

    #[tokio::test]
    async fn test_missing_simplified_document_is_none() {
        let dir = std::env::temp_dir().join(format!("plainlex-test-{}", Uuid::new_v4()));
        let store = BlobStore::new(&dir).await.unwrap();
        assert!(
            store
                .read_simplified(Uuid::new_v4())
                .await
                .unwrap()
                .is_none()
        );
        let _ = tokio::fs::remove_dir_all(&dir).await;
    }
}
