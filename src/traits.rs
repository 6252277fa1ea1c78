//! Collaborator seams for the annotation pipeline.
//!
//! The pipeline only talks to the outside world through these three
//! traits, so each backend can be swapped (Supabase, local filesystem,
//! SQLite) and tests can count calls with in-process fakes.
//!
//! ```text
//!  BlobStore ──▶ AnnotationService ──▶ AnalysisStore
//!  (download)      (generate)            (insert)
//! ```
//!
//! Implementations return `anyhow::Result`; the pipeline decides which
//! [`AnnotatorError`](crate::error::AnnotatorError) variant a failure becomes.

use anyhow::Result;
use async_trait::async_trait;
use serde_json::Value;

use crate::models::{AnnotationRequest, PersistedAnalysis, RetrievedFile};

/// Object storage holding uploaded documents.
///
/// # Example
///
/// ```rust
/// use anyhow::Result;
/// use async_trait::async_trait;
/// use doc_annotator::models::RetrievedFile;
/// use doc_annotator::traits::BlobStore;
///
/// struct FixedBlob;
///
/// #[async_trait]
/// impl BlobStore for FixedBlob {
///     fn name(&self) -> &str { "fixed" }
///
///     async fn download(&self, _path: &str) -> Result<RetrievedFile> {
///         Ok(RetrievedFile { bytes: b"%PDF-1.7".to_vec(), mime_type: "application/pdf".into() })
///     }
/// }
/// ```
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Backend label used in logs (e.g. `"supabase:documents"`).
    fn name(&self) -> &str;

    /// Fetch the whole object at `path`. Single attempt, no retry.
    ///
    /// The returned `mime_type` is never empty; backends apply the
    /// configured default when storage does not report one.
    async fn download(&self, path: &str) -> Result<RetrievedFile>;
}

/// External generative model.
#[async_trait]
pub trait AnnotationService: Send + Sync {
    fn name(&self) -> &str;

    /// Send one request and return the decoded response envelope:
    ///
    /// ```json
    /// { "candidates": [ { "content": { "parts": [ { "text": "..." } ] } } ] }
    /// ```
    ///
    /// Errors are transport failures and non-success statuses only; the
    /// envelope's shape is checked by [`parse`](crate::parse).
    async fn annotate(&self, request: &AnnotationRequest) -> Result<Value>;
}

/// Durable storage for finished analyses.
#[async_trait]
pub trait AnalysisStore: Send + Sync {
    fn name(&self) -> &str;

    /// Insert exactly one row. No upsert.
    async fn insert(&self, row: &PersistedAnalysis) -> Result<()>;
}
