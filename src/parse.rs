//! Completion parsing.
//!
//! Three steps, all-or-nothing:
//!
//! 1. [`extract_completion`] pulls the text out of the response envelope.
//! 2. [`strip_code_fences`] removes a surrounding ```` ```json ... ``` ````
//!    wrapper, which the model adds despite being told not to.
//! 3. [`parse_annotation`] decodes the JSON into an [`AnnotationResult`].
//!
//! Any failure is an [`AnnotatorError::Parse`].

use serde_json::Value;

use crate::error::AnnotatorError;
use crate::models::AnnotationResult;

/// Concatenate the text parts of the first candidate.
pub fn extract_completion(envelope: &Value) -> Result<String, AnnotatorError> {
    let candidate = envelope
        .get("candidates")
        .and_then(|c| c.as_array())
        .and_then(|c| c.first())
        .ok_or_else(|| AnnotatorError::Parse("response has no candidates".into()))?;

    let parts = candidate
        .pointer("/content/parts")
        .and_then(|p| p.as_array())
        .ok_or_else(|| AnnotatorError::Parse("candidate has no content parts".into()))?;

    let text: String = parts
        .iter()
        .filter_map(|p| p.get("text").and_then(|t| t.as_str()))
        .collect();

    if text.trim().is_empty() {
        return Err(AnnotatorError::Parse("completion text is empty".into()));
    }

    Ok(text)
}

/// Remove a markdown code fence around the whole text, if present.
pub fn strip_code_fences(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // Language tag, e.g. `json` or ` json`; a newline ends the fence line
    let rest = rest
        .trim_start_matches([' ', '\t'])
        .trim_start_matches(|c: char| c.is_ascii_alphanumeric());
    let rest = rest.strip_suffix("```").unwrap_or(rest);
    rest.trim()
}

/// Strip fences and decode the completion as arbitrary JSON.
pub fn parse_json_completion(text: &str) -> Result<Value, AnnotatorError> {
    serde_json::from_str(strip_code_fences(text))
        .map_err(|e| AnnotatorError::Parse(format!("completion is not valid JSON: {}", e)))
}

/// Decode a completion into an [`AnnotationResult`].
pub fn parse_annotation(text: &str) -> Result<AnnotationResult, AnnotatorError> {
    let value = parse_json_completion(text)?;
    if !value.is_object() {
        return Err(AnnotatorError::Parse(
            "completion is not a JSON object".into(),
        ));
    }
    serde_json::from_value(value)
        .map_err(|e| AnnotatorError::Parse(format!("completion has the wrong shape: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{FigureValue, TaxYear};
    use serde_json::json;

    fn envelope(text: &str) -> Value {
        json!({ "candidates": [{ "content": { "parts": [{ "text": text }], "role": "model" } }] })
    }

    #[test]
    fn test_fenced_json_round_trip() {
        assert_eq!(
            parse_json_completion("```json\n{\"a\":1}\n```").unwrap(),
            json!({ "a": 1 })
        );
    }

    #[test]
    fn test_fence_variants() {
        assert_eq!(strip_code_fences("```\n{}\n```"), "{}");
        assert_eq!(strip_code_fences("  ```json {\"b\":2} ```  "), "{\"b\":2}");
        assert_eq!(strip_code_fences("{\"plain\":true}\n"), "{\"plain\":true}");
        // Unterminated fence still loses its opener
        assert_eq!(strip_code_fences("```json\n{}"), "{}");
    }

    #[test]
    fn test_fence_tag_after_space() {
        assert_eq!(strip_code_fences("``` json\n{\"a\":1}\n```"), "{\"a\":1}");
        assert_eq!(strip_code_fences("```\tJSON\n[]\n```"), "[]");
        assert_eq!(
            parse_json_completion("``` json\n{\"a\":1}\n```").unwrap(),
            json!({ "a": 1 })
        );
        // A bare fence keeps content that starts with a word on the next line
        assert_eq!(strip_code_fences("```\ntrue\n```"), "true");
    }

    #[test]
    fn test_extract_joins_parts() {
        let env = json!({ "candidates": [{ "content": { "parts": [
            { "text": "{\"a\":" }, { "text": "1}" }
        ] } }] });
        assert_eq!(extract_completion(&env).unwrap(), "{\"a\":1}");
    }

    #[test]
    fn test_extract_missing_fields() {
        for env in [
            json!({}),
            json!({ "candidates": [] }),
            json!({ "candidates": [{ "finishReason": "SAFETY" }] }),
            envelope("   "),
        ] {
            assert!(matches!(
                extract_completion(&env),
                Err(AnnotatorError::Parse(_))
            ));
        }
    }

    #[test]
    fn test_parse_w2_completion() {
        let text = extract_completion(&envelope(
            "```json\n{\"tipo_de_documento\":\"W-2\",\"año_fiscal\":2023,\"nombre_del_emisor\":\"Acme Corp\",\"cifras_clave\":{\"wages\":50000},\"resumen\":\"Salarios de 2023\"}\n```",
        ))
        .unwrap();
        let result = parse_annotation(&text).unwrap();
        assert_eq!(result.document_type, "W-2");
        assert_eq!(result.tax_year, TaxYear::Year(2023));
        assert_eq!(result.issuer_name, "Acme Corp");
        assert_eq!(
            result.key_figures.get("wages"),
            Some(&FigureValue::Number(50000i64.into()))
        );
        assert_eq!(result.summary.as_deref(), Some("Salarios de 2023"));
    }

    #[test]
    fn test_not_json_is_parse_error() {
        let err = parse_annotation("I could not read this document.").unwrap_err();
        assert!(matches!(err, AnnotatorError::Parse(_)));
        assert!(err.to_string().contains("not valid JSON"));
    }

    #[test]
    fn test_missing_required_field() {
        let err = parse_annotation(
            r#"{"tipo_de_documento":"W-2","año_fiscal":2023,"cifras_clave":{}}"#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("nombre_del_emisor"));
    }

    #[test]
    fn test_wrong_figure_type_rejected() {
        let err = parse_annotation(
            r#"{"tipo_de_documento":"W-2","año_fiscal":2023,"nombre_del_emisor":"A","cifras_clave":{"x":[1,2]}}"#,
        )
        .unwrap_err();
        assert!(matches!(err, AnnotatorError::Parse(_)));
    }

    #[test]
    fn test_array_completion_rejected() {
        let err = parse_annotation("[]").unwrap_err();
        assert!(err.to_string().contains("not a JSON object"));
    }
}
