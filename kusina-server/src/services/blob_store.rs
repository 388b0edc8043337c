//! Blob store - payment proofs and chat images
//!
//! Uploads are two-step: the client asks for a one-time upload URL, then
//! PUTs the bytes to it. Content is addressed by its SHA-256 hex digest, so
//! uploading the same image twice yields the same id.

use parking_lot::Mutex;
use serde::Serialize;
use sha2::{Digest, Sha256};
use shared::error::{AppError, ErrorCode};
use std::collections::HashMap;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Maximum file size (5MB)
pub const MAX_FILE_SIZE: usize = 5 * 1024 * 1024;

/// Supported image formats
pub const SUPPORTED_FORMATS: &[&str] = &["png", "jpg", "jpeg", "webp"];

/// Upload tokens expire after 15 minutes
const UPLOAD_TOKEN_TTL_MS: i64 = 15 * 60 * 1000;

#[derive(Debug, Error)]
pub enum BlobError {
    #[error("File too large: {size} bytes (max {max})")]
    TooLarge { size: usize, max: usize },

    #[error("Unsupported file format '{0}'. Supported: png, jpg, jpeg, webp")]
    UnsupportedFormat(String),

    #[error("File is empty")]
    Empty,

    #[error("Blob not found: {0}")]
    NotFound(String),

    #[error("Upload token is invalid or expired")]
    InvalidToken,

    #[error("Blob IO error: {0}")]
    Io(#[from] io::Error),
}

impl From<BlobError> for AppError {
    fn from(err: BlobError) -> Self {
        let code = match &err {
            BlobError::TooLarge { .. } => ErrorCode::FileTooLarge,
            BlobError::UnsupportedFormat(_) => ErrorCode::UnsupportedFileFormat,
            BlobError::Empty => ErrorCode::EmptyFile,
            BlobError::NotFound(_) => ErrorCode::NotFound,
            BlobError::InvalidToken => ErrorCode::UploadTokenInvalid,
            BlobError::Io(e) => {
                tracing::error!(error = %e, "Blob storage failure");
                ErrorCode::FileStorageFailed
            }
        };
        AppError::with_message(code, err.to_string())
    }
}

/// One-time upload URL
#[derive(Debug, Clone, Serialize)]
pub struct UploadTicket {
    pub token: String,
    pub upload_url: String,
    pub expires_at: i64,
}

/// Stored blob content
#[derive(Debug, Clone)]
pub struct Blob {
    pub bytes: Vec<u8>,
    pub content_type: &'static str,
}

pub trait BlobStore: Send + Sync + std::fmt::Debug {
    fn generate_upload_url(&self) -> UploadTicket;

    /// Redeem a one-time token; a token works once
    fn consume_upload_token(&self, token: &str) -> Result<(), BlobError>;

    /// Store an image, returning its storage id
    fn put(&self, bytes: &[u8], content_type: &str) -> Result<String, BlobError>;

    fn resolve_url(&self, id: &str) -> String;

    fn read(&self, id: &str) -> Result<Blob, BlobError>;
}

/// Identify an image by its magic bytes
pub fn sniff_image_type(data: &[u8]) -> Option<&'static str> {
    if data.starts_with(b"\x89PNG\r\n\x1a\n") {
        Some("image/png")
    } else if data.starts_with(&[0xFF, 0xD8, 0xFF]) {
        Some("image/jpeg")
    } else if data.len() >= 12 && &data[0..4] == b"RIFF" && &data[8..12] == b"WEBP" {
        Some("image/webp")
    } else {
        None
    }
}

/// Validate an image upload against size and format limits
pub fn validate_image(data: &[u8], content_type: &str) -> Result<&'static str, BlobError> {
    if data.is_empty() {
        return Err(BlobError::Empty);
    }
    if data.len() > MAX_FILE_SIZE {
        return Err(BlobError::TooLarge {
            size: data.len(),
            max: MAX_FILE_SIZE,
        });
    }

    let essence = content_type.split(';').next().unwrap_or_default().trim();
    let declared_ok = mime_guess::get_mime_extensions_str(essence)
        .is_some_and(|exts| exts.iter().any(|ext| SUPPORTED_FORMATS.contains(ext)));
    if !declared_ok {
        return Err(BlobError::UnsupportedFormat(content_type.to_string()));
    }

    // Declared type is advisory; the bytes decide
    sniff_image_type(data).ok_or_else(|| BlobError::UnsupportedFormat(content_type.to_string()))
}

/// Calculate SHA256 hash of data
fn calculate_hash(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

fn is_valid_blob_id(id: &str) -> bool {
    id.len() == 64 && id.chars().all(|c| c.is_ascii_hexdigit())
}

/// Filesystem blob store under `{work_dir}/blobs`
///
/// Files are sharded by the first two hex chars: `blobs/ab/abcd...`.
#[derive(Debug)]
pub struct LocalBlobStore {
    dir: PathBuf,
    public_base_url: String,
    /// token -> expires_at
    upload_tokens: Mutex<HashMap<String, i64>>,
}

impl LocalBlobStore {
    pub fn new(dir: impl Into<PathBuf>, public_base_url: impl Into<String>) -> Self {
        Self {
            dir: dir.into(),
            public_base_url: public_base_url.into(),
            upload_tokens: Mutex::new(HashMap::new()),
        }
    }

    fn blob_path(&self, id: &str) -> PathBuf {
        self.dir.join(&id[..2]).join(id)
    }
}

impl BlobStore for LocalBlobStore {
    fn generate_upload_url(&self) -> UploadTicket {
        let now = shared::util::now_millis();
        let token = uuid::Uuid::new_v4().simple().to_string();
        let expires_at = now + UPLOAD_TOKEN_TTL_MS;

        let mut tokens = self.upload_tokens.lock();
        tokens.retain(|_, exp| *exp > now);
        tokens.insert(token.clone(), expires_at);

        UploadTicket {
            upload_url: format!(
                "{}/api/uploads/{}",
                self.public_base_url.trim_end_matches('/'),
                token
            ),
            token,
            expires_at,
        }
    }

    fn consume_upload_token(&self, token: &str) -> Result<(), BlobError> {
        let now = shared::util::now_millis();
        match self.upload_tokens.lock().remove(token) {
            Some(expires_at) if expires_at > now => Ok(()),
            _ => Err(BlobError::InvalidToken),
        }
    }

    fn put(&self, bytes: &[u8], content_type: &str) -> Result<String, BlobError> {
        validate_image(bytes, content_type)?;

        let id = calculate_hash(bytes);
        let path = self.blob_path(&id);
        if path.exists() {
            tracing::debug!(blob_id = %id, "Duplicate upload, reusing stored blob");
            return Ok(id);
        }

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        // Write to a temp name first so readers never see a partial file
        let tmp = path.with_extension("tmp");
        std::fs::write(&tmp, bytes)?;
        std::fs::rename(&tmp, &path)?;

        tracing::info!(blob_id = %id, size = bytes.len(), "Blob stored");
        Ok(id)
    }

    fn resolve_url(&self, id: &str) -> String {
        format!(
            "{}/api/blobs/{}",
            self.public_base_url.trim_end_matches('/'),
            id
        )
    }

    fn read(&self, id: &str) -> Result<Blob, BlobError> {
        if !is_valid_blob_id(id) {
            return Err(BlobError::NotFound(id.to_string()));
        }
        let bytes = match std::fs::read(self.blob_path(id)) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(BlobError::NotFound(id.to_string()));
            }
            Err(e) => return Err(e.into()),
        };
        let content_type = sniff_image_type(&bytes).unwrap_or("application/octet-stream");
        Ok(Blob {
            bytes,
            content_type,
        })
    }
}


#[cfg(test)]
mod tests {
    use super::fixtures::png_bytes;
    use super::*;

    fn store() -> (tempfile::TempDir, LocalBlobStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalBlobStore::new(dir.path().join("blobs"), "http://localhost:3000/");
        (dir, store)
    }

    #[test]
    fn test_put_read_and_dedup() {
        let (_dir, store) = store();
        let data = png_bytes(1);

        let id = store.put(&data, "image/png").unwrap();
        assert_eq!(id.len(), 64);
        assert_eq!(store.put(&data, "image/png").unwrap(), id);

        let blob = store.read(&id).unwrap();
        assert_eq!(blob.bytes, data);
        assert_eq!(blob.content_type, "image/png");
        assert_eq!(
            store.resolve_url(&id),
            format!("http://localhost:3000/api/blobs/{id}")
        );
    }

    #[test]
    fn test_rejects_non_images() {
        let (_dir, store) = store();
        assert!(matches!(
            store.put(b"hello", "text/plain"),
            Err(BlobError::UnsupportedFormat(_))
        ));
        // Declared png, but bytes are not an image
        assert!(matches!(
            store.put(b"hello", "image/png"),
            Err(BlobError::UnsupportedFormat(_))
        ));
        assert!(matches!(store.put(b"", "image/png"), Err(BlobError::Empty)));

        let mut big = png_bytes(0);
        big.resize(MAX_FILE_SIZE + 1, 0);
        assert!(matches!(
            store.put(&big, "image/png"),
            Err(BlobError::TooLarge { .. })
        ));
    }

    #[test]
    fn test_read_rejects_traversal() {
        let (_dir, store) = store();
        assert!(matches!(
            store.read("../etc/passwd"),
            Err(BlobError::NotFound(_))
        ));
        assert!(matches!(
            store.read(&"a".repeat(64)),
            Err(BlobError::NotFound(_))
        ));
    }

    #[test]
    fn test_upload_token_is_single_use() {
        let (_dir, store) = store();
        let ticket = store.generate_upload_url();
        assert!(ticket.upload_url.ends_with(&ticket.token));
        assert!(ticket.upload_url.starts_with("http://localhost:3000/api/uploads/"));

        assert!(store.consume_upload_token(&ticket.token).is_ok());
        assert!(matches!(
            store.consume_upload_token(&ticket.token),
            Err(BlobError::InvalidToken)
        ));
        assert!(store.consume_upload_token("unknown").is_err());
    }
}
