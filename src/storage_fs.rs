//! Local-directory blob backend, for development and offline runs.
//!
//! Storage paths resolve relative to `[storage].root`. Absolute paths and
//! `..` components are rejected so a trigger cannot read outside the root.

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use std::path::{Component, Path, PathBuf};

use crate::models::RetrievedFile;
use crate::storage::{detect_content_type, resolve_mime_type};
use crate::traits::BlobStore;

pub struct FilesystemBlobStore {
    root: PathBuf,
    default_mime_type: String,
    label: String,
}

impl FilesystemBlobStore {
    pub fn new(root: PathBuf, default_mime_type: String) -> Self {
        let label = format!("filesystem:{}", root.display());
        Self {
            root,
            default_mime_type,
            label,
        }
    }

    fn resolve(&self, path: &str) -> Result<PathBuf> {
        let relative = Path::new(path);
        for component in relative.components() {
            match component {
                Component::Normal(_) | Component::CurDir => {}
                _ => bail!("storage path must stay inside the root: {}", path),
            }
        }
        Ok(self.root.join(relative))
    }
}

#[async_trait]
impl BlobStore for FilesystemBlobStore {
    fn name(&self) -> &str {
        &self.label
    }

    async fn download(&self, path: &str) -> Result<RetrievedFile> {
        let full = self.resolve(path)?;

        let bytes = match tokio::fs::read(&full).await {
            Ok(b) => b,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                bail!("object not found: {}", path)
            }
            Err(e) => return Err(e).with_context(|| format!("failed to read {}", full.display())),
        };

        Ok(RetrievedFile {
            bytes,
            mime_type: resolve_mime_type(detect_content_type(path), &self.default_mime_type),
        })
    }
}
