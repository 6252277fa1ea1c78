//! In-process fakes for the pipeline collaborators.
//!
//! Each fake counts its calls so tests can assert which stages ran.

#![allow(dead_code)]

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use doc_annotator::models::{AnnotationRequest, PersistedAnalysis, RetrievedFile};
use doc_annotator::pipeline::Pipeline;
use doc_annotator::traits::{AnalysisStore, AnnotationService, BlobStore};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

pub const W2_COMPLETION: &str = r#"{"tipo_de_documento":"W-2","año_fiscal":2023,"nombre_del_emisor":"Acme Corp","cifras_clave":{"wages":50000}}"#;

pub fn envelope(text: &str) -> Value {
    json!({ "candidates": [{ "content": { "parts": [{ "text": text }], "role": "model" } }] })
}

pub fn pdf() -> RetrievedFile {
    RetrievedFile {
        bytes: b"%PDF-1.7\n%fake w2\n".to_vec(),
        mime_type: "application/pdf".to_string(),
    }
}

// ─── Blob store ─────────────────────────────────────────────────────

pub struct FakeBlobs {
    pub calls: AtomicUsize,
    pub paths: Mutex<Vec<String>>,
    reply: std::result::Result<RetrievedFile, String>,
}

impl FakeBlobs {
    pub fn returning(file: RetrievedFile) -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
            paths: Mutex::new(Vec::new()),
            reply: Ok(file),
        })
    }

    pub fn failing(message: &str) -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
            paths: Mutex::new(Vec::new()),
            reply: Err(message.to_string()),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl BlobStore for FakeBlobs {
    fn name(&self) -> &str {
        "fake-blobs"
    }

    async fn download(&self, path: &str) -> Result<RetrievedFile> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.paths.lock().unwrap().push(path.to_string());
        self.reply.clone().map_err(|m| anyhow!(m))
    }
}

// ─── Annotation service ─────────────────────────────────────────────

pub struct FakeService {
    pub calls: AtomicUsize,
    pub requests: Mutex<Vec<AnnotationRequest>>,
    reply: std::result::Result<Value, String>,
}

impl FakeService {
    pub fn replying(text: &str) -> Arc<Self> {
        Self::with_envelope(envelope(text))
    }

    pub fn with_envelope(envelope: Value) -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
            requests: Mutex::new(Vec::new()),
            reply: Ok(envelope),
        })
    }

    pub fn failing(message: &str) -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
            requests: Mutex::new(Vec::new()),
            reply: Err(message.to_string()),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AnnotationService for FakeService {
    fn name(&self) -> &str {
        "fake-service"
    }

    async fn annotate(&self, request: &AnnotationRequest) -> Result<Value> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().unwrap().push(request.clone());
        self.reply.clone().map_err(|m| anyhow!(m))
    }
}

// ─── Analysis store ─────────────────────────────────────────────────

pub struct FakeStore {
    pub calls: AtomicUsize,
    pub rows: Mutex<Vec<PersistedAnalysis>>,
    fail: bool,
}

impl FakeStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
            rows: Mutex::new(Vec::new()),
            fail: false,
        })
    }

    pub fn failing() -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
            rows: Mutex::new(Vec::new()),
            fail: true,
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn rows(&self) -> Vec<PersistedAnalysis> {
        self.rows.lock().unwrap().clone()
    }
}

#[async_trait]
impl AnalysisStore for FakeStore {
    fn name(&self) -> &str {
        "fake-store"
    }

    async fn insert(&self, row: &PersistedAnalysis) -> Result<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(anyhow!("relation \"document_analyses\" does not exist"));
        }
        self.rows.lock().unwrap().push(row.clone());
        Ok(())
    }
}

pub fn pipeline(blobs: &Arc<FakeBlobs>, service: &Arc<FakeService>, store: &Arc<FakeStore>) -> Pipeline {
    Pipeline::new(blobs.clone(), service.clone(), store.clone())
}
