//! Gemini `generateContent` client.
//!
//! Sends one JSON request per invocation:
//!
//! ```json
//! {
//!   "contents": [{
//!     "parts": [
//!       { "text": "<instruction>" },
//!       { "inlineData": { "mimeType": "application/pdf", "data": "<base64>" } }
//!     ]
//!   }]
//! }
//! ```
//!
//! The API key travels as the `key` query parameter. Because that puts the
//! secret in the URL, transport errors are stripped of their URL before
//! they are reported, and only the endpoint (without query) is logged.
//!
//! No retries and no timeout beyond the transport default.

use anyhow::{bail, Result};
use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::Serialize;
use serde_json::Value;
use std::time::Instant;
use tracing::{info, warn};

use crate::models::AnnotationRequest;
use crate::traits::AnnotationService;

pub struct GeminiClient {
    endpoint: String,
    api_key: String,
    client: reqwest::Client,
}

impl GeminiClient {
    pub fn new(endpoint: String, api_key: String) -> Self {
        Self {
            endpoint,
            api_key,
            client: reqwest::Client::new(),
        }
    }
}

#[derive(Debug, Serialize)]
struct GenerateContentRequest<'a> {
    contents: Vec<Content<'a>>,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    parts: Vec<Part<'a>>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum Part<'a> {
    Text {
        text: &'a str,
    },
    InlineData {
        #[serde(rename = "inlineData")]
        inline_data: InlineData<'a>,
    },
}

#[derive(Debug, Serialize)]
struct InlineData<'a> {
    #[serde(rename = "mimeType")]
    mime_type: &'a str,
    data: String,
}

/// Build the wire body: instruction first, then the base64 attachment.
fn build_body(request: &AnnotationRequest) -> GenerateContentRequest<'_> {
    let mut parts = vec![Part::Text {
        text: &request.instruction_text,
    }];

    if let Some(file) = &request.attachment {
        parts.push(Part::InlineData {
            inline_data: InlineData {
                mime_type: &file.mime_type,
                data: STANDARD.encode(&file.bytes),
            },
        });
    }

    GenerateContentRequest {
        contents: vec![Content { parts }],
    }
}

#[async_trait]
impl AnnotationService for GeminiClient {
    fn name(&self) -> &str {
        "gemini"
    }

    async fn annotate(&self, request: &AnnotationRequest) -> Result<Value> {
        let body = build_body(request);
        let started = Instant::now();

        let resp = self
            .client
            .post(&self.endpoint)
            .query(&[("key", self.api_key.as_str())])
            .json(&body)
            .send()
            .await
            .map_err(|e| anyhow::anyhow!("request to Gemini API failed: {}", e.without_url()))?;

        let status = resp.status();
        info!(
            endpoint = %self.endpoint,
            status = status.as_u16(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "annotation service responded"
        );

        if !status.is_success() {
            let detail = resp.text().await.unwrap_or_default();
            warn!(
                status = status.as_u16(),
                body = %detail.chars().take(500).collect::<String>(),
                "annotation service returned an error"
            );
            bail!("Gemini API error: {}", status);
        }

        resp.json::<Value>()
            .await
            .map_err(|e| anyhow::anyhow!("Gemini API returned an unreadable body: {}", e.without_url()))
    }
}
