//! Error taxonomy for a single annotation invocation.
//!
//! Every stage of the pipeline fails with exactly one [`AnnotatorError`]
//! variant. The HTTP layer converts the variant into a status code via
//! [`AnnotatorError::status_code`] and a `{ "error": ... }` body.
//!
//! | Variant | Raised by | HTTP |
//! |---------|-----------|------|
//! | `Validation` | trigger parsing | 400 |
//! | `Storage` | blob download | 500 |
//! | `Service` | annotation service call | 500 |
//! | `Parse` | completion parsing | 500 |
//! | `Persistence` | database insert | 500 |
//! | `Configuration` | config / secret loading | 500 |

use axum::http::StatusCode;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AnnotatorError {
    #[error("invalid trigger payload: {0}")]
    Validation(String),

    #[error("storage error: {0}")]
    Storage(String),

    #[error("annotation service error: {0}")]
    Service(String),

    #[error("could not parse annotation: {0}")]
    Parse(String),

    #[error("could not persist analysis: {0}")]
    Persistence(String),

    #[error("configuration error: {0}")]
    Configuration(String),
}

impl AnnotatorError {
    /// Only malformed triggers are the caller's fault.
    pub fn status_code(&self) -> StatusCode {
        match self {
            AnnotatorError::Validation(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Short machine-readable name, used as a tracing field.
    pub fn kind(&self) -> &'static str {
        match self {
            AnnotatorError::Validation(_) => "validation",
            AnnotatorError::Storage(_) => "storage",
            AnnotatorError::Service(_) => "service",
            AnnotatorError::Parse(_) => "parse",
            AnnotatorError::Persistence(_) => "persistence",
            AnnotatorError::Configuration(_) => "configuration",
        }
    }

    pub(crate) fn storage(err: anyhow::Error) -> Self {
        AnnotatorError::Storage(format!("{:#}", err))
    }

    pub(crate) fn service(err: anyhow::Error) -> Self {
        AnnotatorError::Service(format!("{:#}", err))
    }

    pub(crate) fn persistence(err: anyhow::Error) -> Self {
        AnnotatorError::Persistence(format!("{:#}", err))
    }
}
