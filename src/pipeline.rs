//! The document annotation pipeline.
//!
//! ```text
//! trigger ─▶ download ─▶ build request ─▶ annotate ─▶ parse ─▶ insert ─▶ respond
//! ```
//!
//! Each invocation is a straight sequence of awaits with no shared state
//! between invocations. A failing stage stops the chain, so a storage
//! failure never reaches the model and a parse failure never reaches the
//! database.
//!
//! If the insert fails the invocation fails too: the caller gets a
//! `Persistence` error instead of an analysis that was never stored.

use serde::Serialize;
use std::sync::Arc;
use tracing::{error, info, Instrument};
use uuid::Uuid;

use crate::config::{Config, PersistenceBackend};
use crate::error::AnnotatorError;
use crate::gemini::GeminiClient;
use crate::models::{IngestionEvent, PersistedAnalysis};
use crate::parse::{extract_completion, parse_annotation};
use crate::prompt::{document_request, text_request};
use crate::storage::create_blob_store;
use crate::store_sqlite::SqliteAnalysisStore;
use crate::store_supabase::SupabaseAnalysisStore;
use crate::traits::{AnalysisStore, AnnotationService, BlobStore};
use crate::trigger::{parse_trigger, Trigger};

/// What a successful invocation hands back to the caller.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum Outcome {
    /// Document mode: the row that was persisted.
    Analysis(PersistedAnalysis),
    /// Prompt mode: the completion text as returned.
    Completion(String),
}

#[derive(Clone)]
pub struct Pipeline {
    blobs: Arc<dyn BlobStore>,
    annotator: Arc<dyn AnnotationService>,
    store: Arc<dyn AnalysisStore>,
}

impl Pipeline {
    pub fn new(
        blobs: Arc<dyn BlobStore>,
        annotator: Arc<dyn AnnotationService>,
        store: Arc<dyn AnalysisStore>,
    ) -> Self {
        Self {
            blobs,
            annotator,
            store,
        }
    }

    /// Wire the collaborators selected in `config`.
    ///
    /// The SQLite table must already exist (`annotator init`).
    pub async fn from_config(config: &Config) -> Result<Self, AnnotatorError> {
        let blobs = create_blob_store(config)?;

        let annotator: Arc<dyn AnnotationService> = Arc::new(GeminiClient::new(
            config.annotation.endpoint.clone(),
            config.secrets.gemini_api_key.clone(),
        ));

        let store: Arc<dyn AnalysisStore> = match config.persistence.backend {
            PersistenceBackend::Supabase => Arc::new(SupabaseAnalysisStore::new(
                config.supabase()?.clone(),
                config.persistence.table.clone(),
            )),
            PersistenceBackend::Sqlite => Arc::new(
                SqliteAnalysisStore::open(&config.persistence.sqlite_path, &config.persistence.table)
                    .await
                    .map_err(|e| AnnotatorError::Configuration(format!("{:#}", e)))?,
            ),
        };

        info!(
            storage = blobs.name(),
            annotation = annotator.name(),
            persistence = store.name(),
            "pipeline ready"
        );

        Ok(Self::new(blobs, annotator, store))
    }

    /// Handle one raw request body end to end.
    pub async fn handle(&self, body: &[u8]) -> Result<Outcome, AnnotatorError> {
        let span = tracing::info_span!("invocation", id = %Uuid::new_v4());
        async move {
            let result = match parse_trigger(body) {
                Ok(trigger) => self.run(trigger).await,
                Err(e) => Err(e),
            };
            if let Err(e) = &result {
                error!(kind = e.kind(), error = %e, "invocation failed");
            }
            result
        }
        .instrument(span)
        .await
    }

    /// Run an already-validated trigger.
    pub async fn run(&self, trigger: Trigger) -> Result<Outcome, AnnotatorError> {
        info!(trigger = trigger.kind(), "invocation started");
        match trigger {
            Trigger::Document(event) => self.analyze_document(&event).await.map(Outcome::Analysis),
            Trigger::Prompt(prompt) => self.annotate_prompt(&prompt).await.map(Outcome::Completion),
        }
    }

    /// Download, annotate, parse and persist one document.
    pub async fn analyze_document(
        &self,
        event: &IngestionEvent,
    ) -> Result<PersistedAnalysis, AnnotatorError> {
        info!(
            document_id = event.record_id,
            client_id = ?event.client_id,
            path = %event.storage_path,
            "analyzing document"
        );

        let file = self
            .blobs
            .download(&event.storage_path)
            .await
            .map_err(AnnotatorError::storage)?;
        info!(
            bytes = file.bytes.len(),
            mime_type = %file.mime_type,
            sha256 = %file.digest(),
            "document downloaded"
        );

        let request = document_request(file);
        let envelope = self
            .annotator
            .annotate(&request)
            .await
            .map_err(AnnotatorError::service)?;
        drop(request);

        let completion = extract_completion(&envelope)?;
        let result = parse_annotation(&completion)?;

        let row = PersistedAnalysis::completed(event.record_id, result);
        if let Err(e) = self.store.insert(&row).await {
            error!(
                document_id = row.document_id,
                analysis = %serde_json::to_string(&row).unwrap_or_default(),
                "analysis computed but not stored"
            );
            return Err(AnnotatorError::persistence(e));
        }

        info!(document_id = row.document_id, "analysis stored");
        Ok(row)
    }

    /// Text-only mode: send `prompt` with no attachment, return the completion.
    pub async fn annotate_prompt(&self, prompt: &str) -> Result<String, AnnotatorError> {
        let envelope = self
            .annotator
            .annotate(&text_request(prompt))
            .await
            .map_err(AnnotatorError::service)?;
        extract_completion(&envelope)
    }
}
