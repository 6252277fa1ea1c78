//! Core data types that flow through one annotation invocation.
//!
//! ```text
//! IngestionEvent ──▶ RetrievedFile ──▶ AnnotationRequest
//!                                             │
//!                  PersistedAnalysis ◀── AnnotationResult
//! ```

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;

/// A storage-insert notification, already validated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngestionEvent {
    /// Row id of the uploaded document; becomes `document_id` downstream.
    pub record_id: i64,
    pub client_id: Option<i64>,
    /// Object path inside the configured bucket. Never empty.
    pub storage_path: String,
}

/// A downloaded blob, buffered in memory for the length of one invocation.
#[derive(Clone, PartialEq, Eq)]
pub struct RetrievedFile {
    pub bytes: Vec<u8>,
    pub mime_type: String,
}

impl RetrievedFile {
    /// Hex SHA-256 of the content, logged to correlate re-delivered triggers.
    pub fn digest(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(&self.bytes);
        hex::encode(hasher.finalize())
    }
}

impl std::fmt::Debug for RetrievedFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RetrievedFile")
            .field("len", &self.bytes.len())
            .field("mime_type", &self.mime_type)
            .finish()
    }
}

/// Instruction plus optional inline attachment, sent as one request.
///
/// `attachment` is `None` only in text-only prompt mode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnnotationRequest {
    pub instruction_text: String,
    pub attachment: Option<RetrievedFile>,
}

/// Fiscal year as returned by the model: usually a number, sometimes text
/// such as `"2023-2024"`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TaxYear {
    Year(i64),
    Text(String),
}

impl std::fmt::Display for TaxYear {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TaxYear::Year(y) => write!(f, "{}", y),
            TaxYear::Text(s) => f.write_str(s),
        }
    }
}

/// A single key figure value. Numbers keep their integer/float form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FigureValue {
    Number(serde_json::Number),
    Text(String),
}

/// Structured fields extracted from a document.
///
/// Deserializes from the Spanish keys the extraction instruction asks for,
/// with English aliases; always serializes with snake_case English keys.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnnotationResult {
    #[serde(
        rename(deserialize = "tipo_de_documento", serialize = "document_type"),
        alias = "document_type",
        alias = "documentType"
    )]
    pub document_type: String,

    #[serde(
        rename(deserialize = "año_fiscal", serialize = "tax_year"),
        alias = "anio_fiscal",
        alias = "tax_year",
        alias = "taxYear"
    )]
    pub tax_year: TaxYear,

    #[serde(
        rename(deserialize = "nombre_del_emisor", serialize = "issuer_name"),
        alias = "issuer_name",
        alias = "issuerName"
    )]
    pub issuer_name: String,

    #[serde(
        rename(deserialize = "cifras_clave", serialize = "key_figures"),
        alias = "key_figures",
        alias = "keyFigures"
    )]
    pub key_figures: BTreeMap<String, FigureValue>,

    #[serde(
        rename(deserialize = "resumen", serialize = "summary"),
        alias = "summary",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub summary: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnalysisStatus {
    Completed,
    Failed,
}

impl AnalysisStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AnalysisStatus::Completed => "completed",
            AnalysisStatus::Failed => "failed",
        }
    }
}

/// The row written to `document_analyses`, also echoed to the caller.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PersistedAnalysis {
    pub document_id: i64,
    pub status: AnalysisStatus,
    #[serde(flatten)]
    pub result: AnnotationResult,
}

impl PersistedAnalysis {
    pub fn completed(document_id: i64, result: AnnotationResult) -> Self {
        Self {
            document_id,
            status: AnalysisStatus::Completed,
            result,
        }
    }
}
