//! Blob storage backend selection and content-type handling.
//!
//! | Backend | Module | Source of content type |
//! |---------|--------|------------------------|
//! | `supabase` | [`storage_supabase`](crate::storage_supabase) | `Content-Type` response header |
//! | `filesystem` | [`storage_fs`](crate::storage_fs) | file extension |
//!
//! When the backend reports nothing useful (missing, empty, or the generic
//! `application/octet-stream`), `storage.default_mime_type` applies.

use std::sync::Arc;

use crate::config::{Config, StorageBackend};
use crate::error::AnnotatorError;
use crate::storage_fs::FilesystemBlobStore;
use crate::storage_supabase::SupabaseBlobStore;
use crate::traits::BlobStore;

/// Build the blob store selected by `[storage].backend`.
pub fn create_blob_store(config: &Config) -> Result<Arc<dyn BlobStore>, AnnotatorError> {
    match config.storage.backend {
        StorageBackend::Supabase => {
            let creds = config.supabase()?;
            Ok(Arc::new(SupabaseBlobStore::new(
                creds.clone(),
                config.storage.bucket.clone(),
                config.storage.default_mime_type.clone(),
            )))
        }
        StorageBackend::Filesystem => {
            let root = config.storage.root.clone().ok_or_else(|| {
                AnnotatorError::Configuration("storage.root is not set".into())
            })?;
            Ok(Arc::new(FilesystemBlobStore::new(
                root,
                config.storage.default_mime_type.clone(),
            )))
        }
    }
}

/// Pick the reported content type if it is specific, else `default`.
///
/// Parameters such as `; charset=binary` are dropped.
pub fn resolve_mime_type(reported: Option<&str>, default: &str) -> String {
    let essence = reported
        .and_then(|v| v.split(';').next())
        .map(|v| v.trim().to_ascii_lowercase())
        .unwrap_or_default();

    if essence.is_empty() || essence == "application/octet-stream" || !essence.contains('/') {
        default.to_string()
    } else {
        essence
    }
}

/// Map a path's extension to a MIME type the annotation service accepts.
pub fn detect_content_type(path: &str) -> Option<&'static str> {
    let ext = path.rsplit_once('.')?.1.to_ascii_lowercase();
    match ext.as_str() {
        "pdf" => Some("application/pdf"),
        "png" => Some("image/png"),
        "jpg" | "jpeg" => Some("image/jpeg"),
        "webp" => Some("image/webp"),
        "heic" => Some("image/heic"),
        "txt" => Some("text/plain"),
        "csv" => Some("text/csv"),
        "html" | "htm" => Some("text/html"),
        _ => None,
    }
}
