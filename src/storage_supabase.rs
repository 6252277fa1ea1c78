//! Supabase Storage blob backend.
//!
//! Downloads objects with a single authenticated REST call:
//!
//! ```text
//! GET {SUPABASE_URL}/storage/v1/object/{bucket}/{path}
//! Authorization: Bearer {key}
//! apikey: {key}
//! ```
//!
//! The whole body is buffered; there is no streaming and no retry.

use anyhow::{bail, Result};
use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::StatusCode;
use tracing::{debug, warn};

use crate::config::SupabaseCredentials;
use crate::models::RetrievedFile;
use crate::storage::resolve_mime_type;
use crate::traits::BlobStore;

pub struct SupabaseBlobStore {
    creds: SupabaseCredentials,
    bucket: String,
    default_mime_type: String,
    label: String,
    client: reqwest::Client,
}

impl SupabaseBlobStore {
    pub fn new(creds: SupabaseCredentials, bucket: String, default_mime_type: String) -> Self {
        let label = format!("supabase:{}", bucket);
        Self {
            creds,
            bucket,
            default_mime_type,
            label,
            client: reqwest::Client::new(),
        }
    }

    fn object_url(&self, path: &str) -> String {
        let encoded = path
            .trim_start_matches('/')
            .split('/')
            .map(uri_encode)
            .collect::<Vec<_>>()
            .join("/");
        format!(
            "{}/storage/v1/object/{}/{}",
            self.creds.url,
            uri_encode(&self.bucket),
            encoded
        )
    }
}

#[async_trait]
impl BlobStore for SupabaseBlobStore {
    fn name(&self) -> &str {
        &self.label
    }

    async fn download(&self, path: &str) -> Result<RetrievedFile> {
        let url = self.object_url(path);
        debug!(bucket = %self.bucket, path, "downloading object");

        let resp = self
            .client
            .get(&url)
            .bearer_auth(&self.creds.key)
            .header("apikey", &self.creds.key)
            .send()
            .await
            .map_err(|e| {
                anyhow::anyhow!(
                    "failed to reach Supabase Storage for {}/{}: {}",
                    self.bucket,
                    path,
                    e.without_url()
                )
            })?;

        let status = resp.status();
        if status == StatusCode::NOT_FOUND {
            bail!("object not found: {}/{}", self.bucket, path);
        }
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            if body.contains("not_found") || body.contains("Object not found") {
                bail!("object not found: {}/{}", self.bucket, path);
            }
            warn!(
                status = status.as_u16(),
                body = %body.chars().take(500).collect::<String>(),
                "storage download returned an error"
            );
            bail!(
                "Supabase Storage download failed (HTTP {}) for {}/{}",
                status,
                self.bucket,
                path
            );
        }

        let reported = resp
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let bytes = resp.bytes().await?;

        Ok(RetrievedFile {
            bytes: bytes.to_vec(),
            mime_type: resolve_mime_type(reported.as_deref(), &self.default_mime_type),
        })
    }
}

/// Percent-encode one path segment (RFC 3986 unreserved characters kept).
fn uri_encode(s: &str) -> String {
    let mut result = String::new();
    for byte in s.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                result.push(byte as char);
            }
            _ => {
                result.push_str(&format!("%{:02X}", byte));
            }
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> SupabaseBlobStore {
        SupabaseBlobStore::new(
            SupabaseCredentials {
                url: "https://abc.supabase.co".into(),
                key: "k".into(),
            },
            "documents".into(),
            "application/pdf".into(),
        )
    }

    #[test]
    fn test_object_url_keeps_slashes() {
        assert_eq!(
            store().object_url("clients/7/w2 2023.pdf"),
            "https://abc.supabase.co/storage/v1/object/documents/clients/7/w2%202023.pdf"
        );
    }

    #[test]
    fn test_object_url_strips_leading_slash() {
        assert_eq!(
            store().object_url("/docs/w2.pdf"),
            "https://abc.supabase.co/storage/v1/object/documents/docs/w2.pdf"
        );
    }

    #[test]
    fn test_uri_encode_non_ascii() {
        assert_eq!(uri_encode("año"), "a%C3%B1o");
    }
}
