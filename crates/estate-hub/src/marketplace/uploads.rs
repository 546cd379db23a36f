use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use serde::Serialize;
use uuid::Uuid;

use super::error::MarketplaceError;

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("object storage request failed: {0}")]
    Backend(String),
    #[error("object storage rejected upload ({status}): {body}")]
    Rejected { status: u16, body: String },
}

/// Object stored in the bucket together with the URL persisted on the row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StoredObject {
    pub path: String,
    pub public_url: String,
}

#[async_trait::async_trait]
pub trait ObjectStorage: Send + Sync {
    async fn put(
        &self,
        path: &str,
        content_type: &str,
        bytes: Vec<u8>,
    ) -> Result<StoredObject, StorageError>;
    async fn remove(&self, path: &str) -> Result<(), StorageError>;
}

#[derive(Debug, Clone)]
struct MemoryObject {
    content_type: String,
    size: usize,
}

/// Bucket kept in process memory; URLs point at a fake public host.
#[derive(Default, Clone)]
pub struct InMemoryObjectStorage {
    objects: Arc<Mutex<BTreeMap<String, MemoryObject>>>,
}

impl InMemoryObjectStorage {
    pub const PUBLIC_BASE: &'static str = "memory://storage";

    pub fn paths(&self) -> Vec<String> {
        self.objects
            .lock()
            .map(|guard| guard.keys().cloned().collect())
            .unwrap_or_default()
    }

    pub fn content_type(&self, path: &str) -> Option<String> {
        self.objects
            .lock()
            .ok()
            .and_then(|guard| guard.get(path).map(|object| object.content_type.clone()))
    }

    pub fn size(&self, path: &str) -> Option<usize> {
        self.objects
            .lock()
            .ok()
            .and_then(|guard| guard.get(path).map(|object| object.size))
    }
}

#[async_trait::async_trait]
impl ObjectStorage for InMemoryObjectStorage {
    async fn put(
        &self,
        path: &str,
        content_type: &str,
        bytes: Vec<u8>,
    ) -> Result<StoredObject, StorageError> {
        let mut guard = self
            .objects
            .lock()
            .map_err(|_| StorageError::Backend("bucket lock poisoned".to_string()))?;
        guard.insert(
            path.to_string(),
            MemoryObject {
                content_type: content_type.to_string(),
                size: bytes.len(),
            },
        );
        Ok(StoredObject {
            path: path.to_string(),
            public_url: format!("{}/{path}", Self::PUBLIC_BASE),
        })
    }

    async fn remove(&self, path: &str) -> Result<(), StorageError> {
        let mut guard = self
            .objects
            .lock()
            .map_err(|_| StorageError::Backend("bucket lock poisoned".to_string()))?;
        guard.remove(path);
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadKind {
    PropertyImage,
    Avatar,
    VerificationDocument,
}

impl UploadKind {
    /// Multipart field name carrying files of this kind.
    pub const fn field(self) -> &'static str {
        match self {
            Self::PropertyImage => "images",
            Self::Avatar => "avatar",
            Self::VerificationDocument => "documents",
        }
    }

    const fn folder(self) -> &'static str {
        match self {
            Self::PropertyImage => "property-images",
            Self::Avatar => "avatars",
            Self::VerificationDocument => "verification-documents",
        }
    }

    fn accepts(self, content_type: &mime::Mime) -> bool {
        let image = content_type.type_() == mime::IMAGE
            && matches!(
                content_type.subtype().as_str(),
                "jpeg" | "png" | "webp" | "gif"
            );
        match self {
            Self::PropertyImage | Self::Avatar => image,
            Self::VerificationDocument => image || *content_type == mime::APPLICATION_PDF,
        }
    }
}

/// A file part pulled out of a multipart request.
#[derive(Debug, Clone)]
pub struct UploadFile {
    pub file_name: Option<String>,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

/// File accepted for upload with its resolved content type and bucket path.
#[derive(Debug, Clone)]
pub struct PreparedUpload {
    pub path: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Clone, Copy)]
pub struct UploadPolicy {
    pub max_bytes: usize,
    pub max_files: usize,
}

impl Default for UploadPolicy {
    fn default() -> Self {
        Self {
            max_bytes: 5 * 1024 * 1024,
            max_files: 10,
        }
    }
}

impl UploadPolicy {
    pub fn prepare(
        &self,
        kind: UploadKind,
        owner: &str,
        files: Vec<UploadFile>,
    ) -> Result<Vec<PreparedUpload>, MarketplaceError> {
        if files.is_empty() {
            return Err(MarketplaceError::invalid(format!(
                "No files provided in field '{}'",
                kind.field()
            )));
        }
        if files.len() > self.max_files {
            return Err(MarketplaceError::invalid(format!(
                "At most {} files may be uploaded at once",
                self.max_files
            )));
        }

        files
            .into_iter()
            .map(|file| self.prepare_one(kind, owner, file))
            .collect()
    }

    fn prepare_one(
        &self,
        kind: UploadKind,
        owner: &str,
        file: UploadFile,
    ) -> Result<PreparedUpload, MarketplaceError> {
        let label = file.file_name.clone().unwrap_or_else(|| "file".to_string());
        if file.bytes.is_empty() {
            return Err(MarketplaceError::invalid(format!("{label} is empty")));
        }
        if file.bytes.len() > self.max_bytes {
            return Err(MarketplaceError::invalid(format!(
                "{label} exceeds the {} byte limit",
                self.max_bytes
            )));
        }

        let declared = file
            .content_type
            .as_deref()
            .and_then(|raw| raw.parse::<mime::Mime>().ok())
            .filter(|parsed| *parsed != mime::APPLICATION_OCTET_STREAM);
        let content_type = declared
            .or_else(|| {
                file.file_name
                    .as_deref()
                    .and_then(|name| mime_guess::from_path(name).first())
            })
            .ok_or_else(|| {
                MarketplaceError::invalid(format!("{label} has an unknown content type"))
            })?;

        if !kind.accepts(&content_type) {
            return Err(MarketplaceError::invalid(format!(
                "{label} has unsupported type {content_type}"
            )));
        }

        let essence = content_type.essence_str().to_string();
        let extension = file_extension(file.file_name.as_deref(), &essence);
        let path = format!("{}/{owner}/{}.{extension}", kind.folder(), Uuid::new_v4());

        Ok(PreparedUpload {
            path,
            content_type: essence,
            bytes: file.bytes,
        })
    }
}

fn file_extension(file_name: Option<&str>, content_type: &str) -> String {
    let from_name = file_name
        .and_then(|name| name.rsplit_once('.'))
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .filter(|ext| !ext.is_empty() && ext.chars().all(|c| c.is_ascii_alphanumeric()));
    from_name
        .or_else(|| {
            mime_guess::get_mime_extensions_str(content_type)
                .and_then(|extensions| extensions.first())
                .map(|ext| ext.to_string())
        })
        .unwrap_or_else(|| "bin".to_string())
}

/// Uploads every file, removing the ones already stored if a later upload fails.
pub async fn store_all(
    storage: &dyn ObjectStorage,
    uploads: Vec<PreparedUpload>,
) -> Result<Vec<StoredObject>, MarketplaceError> {
    let mut stored = Vec::with_capacity(uploads.len());
    for upload in uploads {
        match storage
            .put(&upload.path, &upload.content_type, upload.bytes)
            .await
        {
            Ok(object) => stored.push(object),
            Err(err) => {
                discard(storage, &stored).await;
                return Err(err.into());
            }
        }
    }
    Ok(stored)
}

/// Best-effort removal of objects whose row update did not go through.
pub async fn discard(storage: &dyn ObjectStorage, objects: &[StoredObject]) {
    for object in objects {
        if let Err(err) = storage.remove(&object.path).await {
            tracing::warn!(path = %object.path, error = %err, "failed to remove orphaned upload");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn png(name: &str) -> UploadFile {
        UploadFile {
            file_name: Some(name.to_string()),
            content_type: Some("image/png".to_string()),
            bytes: vec![0x89, b'P', b'N', b'G'],
        }
    }

    #[test]
    fn prepare_builds_owner_scoped_paths() {
        let policy = UploadPolicy::default();
        let prepared = policy
            .prepare(UploadKind::PropertyImage, "owner-1", vec![png("Front.PNG")])
            .expect("accepted");
        assert_eq!(prepared.len(), 1);
        assert!(prepared[0].path.starts_with("property-images/owner-1/"));
        assert!(prepared[0].path.ends_with(".png"));
        assert_eq!(prepared[0].content_type, "image/png");
    }

    #[test]
    fn content_type_is_guessed_from_file_name() {
        let policy = UploadPolicy::default();
        let file = UploadFile {
            file_name: Some("license.pdf".to_string()),
            content_type: Some("application/octet-stream".to_string()),
            bytes: b"%PDF-1.7".to_vec(),
        };
        let prepared = policy
            .prepare(UploadKind::VerificationDocument, "agent", vec![file.clone()])
            .expect("pdf accepted for documents");
        assert_eq!(prepared[0].content_type, "application/pdf");

        let err = policy
            .prepare(UploadKind::Avatar, "agent", vec![file])
            .expect_err("pdf rejected for avatars");
        assert!(err.to_string().contains("unsupported type"));
    }

    #[test]
    fn rejects_oversized_and_empty_files() {
        let policy = UploadPolicy {
            max_bytes: 3,
            max_files: 2,
        };
        assert!(policy
            .prepare(UploadKind::Avatar, "me", vec![png("a.png")])
            .is_err());
        assert!(policy
            .prepare(UploadKind::Avatar, "me", Vec::new())
            .is_err());
        let mut empty = png("a.png");
        empty.bytes.clear();
        assert!(UploadPolicy::default()
            .prepare(UploadKind::Avatar, "me", vec![empty])
            .is_err());
    }

    struct FailingSecondPut {
        inner: InMemoryObjectStorage,
    }

    #[async_trait::async_trait]
    impl ObjectStorage for FailingSecondPut {
        async fn put(
            &self,
            path: &str,
            content_type: &str,
            bytes: Vec<u8>,
        ) -> Result<StoredObject, StorageError> {
            if !self.inner.paths().is_empty() {
                return Err(StorageError::Backend("bucket full".to_string()));
            }
            self.inner.put(path, content_type, bytes).await
        }

        async fn remove(&self, path: &str) -> Result<(), StorageError> {
            self.inner.remove(path).await
        }
    }

    #[tokio::test]
    async fn store_all_rolls_back_partial_batches() {
        let storage = FailingSecondPut {
            inner: InMemoryObjectStorage::default(),
        };
        let uploads = UploadPolicy::default()
            .prepare(
                UploadKind::PropertyImage,
                "owner",
                vec![png("a.png"), png("b.png")],
            )
            .expect("accepted");

        let err = store_all(&storage, uploads).await.expect_err("second put fails");
        assert!(matches!(err, MarketplaceError::Storage(_)));
        assert!(storage.inner.paths().is_empty());
    }
}
