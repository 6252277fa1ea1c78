//! Trigger payload validation.
//!
//! Two body shapes are accepted:
//!
//! ```json
//! { "type": "INSERT", "record": { "id": 42, "client_id": 7, "file_path": "docs/w2.pdf" } }
//! { "prompt": "Summarise the 1040 instructions" }
//! ```
//!
//! The first is a database webhook and runs the full document pipeline.
//! The second is the text-only mode. Unknown top-level fields are ignored.

use serde::Deserialize;

use crate::error::AnnotatorError;
use crate::models::IngestionEvent;

/// What an inbound request asks the pipeline to do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Trigger {
    Document(IngestionEvent),
    Prompt(String),
}

impl Trigger {
    pub fn kind(&self) -> &'static str {
        match self {
            Trigger::Document(_) => "document",
            Trigger::Prompt(_) => "prompt",
        }
    }
}

#[derive(Deserialize)]
struct RawTrigger {
    #[serde(default)]
    record: Option<RawRecord>,
    #[serde(default)]
    prompt: Option<String>,
}

#[derive(Deserialize)]
struct RawRecord {
    id: i64,
    #[serde(default)]
    client_id: Option<i64>,
    #[serde(default)]
    file_path: Option<String>,
}

/// Parse a raw request body into a [`Trigger`].
///
/// A `record` always wins over `prompt`. Fails with
/// [`AnnotatorError::Validation`] on anything else.
pub fn parse_trigger(body: &[u8]) -> Result<Trigger, AnnotatorError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Err(AnnotatorError::Validation("request body is empty".into()));
    }

    let raw: RawTrigger = serde_json::from_slice(body)
        .map_err(|e| AnnotatorError::Validation(format!("body is not a valid trigger: {}", e)))?;

    if let Some(record) = raw.record {
        let storage_path = record
            .file_path
            .map(|p| p.trim().to_string())
            .filter(|p| !p.is_empty())
            .ok_or_else(|| AnnotatorError::Validation("record.file_path is required".into()))?;

        return Ok(Trigger::Document(IngestionEvent {
            record_id: record.id,
            client_id: record.client_id,
            storage_path,
        }));
    }

    match raw.prompt {
        Some(prompt) if !prompt.trim().is_empty() => Ok(Trigger::Prompt(prompt)),
        _ => Err(AnnotatorError::Validation(
            "either record.file_path or prompt is required".into(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn validation_message(body: &str) -> String {
        match parse_trigger(body.as_bytes()) {
            Err(AnnotatorError::Validation(msg)) => msg,
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[test]
    fn test_webhook_record() {
        let trigger = parse_trigger(
            br#"{"type":"INSERT","table":"documents","record":{"id":42,"client_id":7,"file_path":"docs/w2.pdf"},"old_record":null}"#,
        )
        .unwrap();
        assert_eq!(
            trigger,
            Trigger::Document(IngestionEvent {
                record_id: 42,
                client_id: Some(7),
                storage_path: "docs/w2.pdf".into(),
            })
        );
    }

    #[test]
    fn test_client_id_optional() {
        let trigger = parse_trigger(br#"{"record":{"id":1,"file_path":"a.pdf"}}"#).unwrap();
        assert!(matches!(
            trigger,
            Trigger::Document(IngestionEvent { client_id: None, .. })
        ));
    }

    #[test]
    fn test_prompt_mode() {
        let trigger = parse_trigger(br#"{"prompt":"hola"}"#).unwrap();
        assert_eq!(trigger, Trigger::Prompt("hola".into()));
        assert_eq!(trigger.kind(), "prompt");
    }

    #[test]
    fn test_missing_file_path() {
        assert!(validation_message(r#"{"record":{"id":42}}"#).contains("file_path"));
    }

    #[test]
    fn test_blank_file_path() {
        assert!(validation_message(r#"{"record":{"id":42,"file_path":"   "}}"#).contains("file_path"));
    }

    #[test]
    fn test_non_integer_id() {
        assert!(validation_message(r#"{"record":{"id":"abc","file_path":"a.pdf"}}"#)
            .contains("not a valid trigger"));
    }

    #[test]
    fn test_neither_record_nor_prompt() {
        assert!(validation_message(r#"{"hello":"world"}"#).contains("prompt"));
        assert!(validation_message(r#"{"prompt":""}"#).contains("prompt"));
    }

    #[test]
    fn test_empty_and_garbage_bodies() {
        assert!(validation_message("").contains("empty"));
        assert!(validation_message("not json").contains("not a valid trigger"));
        assert!(validation_message("[1,2]").contains("not a valid trigger"));
    }
}
