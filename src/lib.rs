//! # Doc Annotator
//!
//! Webhook service that annotates uploaded documents with a generative
//! model and stores the structured result.
//!
//! A storage-insert webhook names an uploaded file. The service downloads
//! it, sends it inline with a fixed extraction instruction to Gemini,
//! parses the JSON reply into an [`AnnotationResult`](models::AnnotationResult),
//! and inserts one row into `document_analyses`.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────┐   ┌───────────┐   ┌──────────┐   ┌───────────┐
//! │  HTTP    │──▶│ BlobStore │──▶│  Gemini  │──▶│ Analysis  │
//! │ webhook  │   │ Supabase/ │   │ generate │   │  Store    │
//! │ (axum)   │   │ local dir │   │ Content  │   │ PG/SQLite │
//! └──────────┘   └───────────┘   └──────────┘   └───────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! export GEMINI_API_KEY=... SUPABASE_URL=... SUPABASE_SERVICE_KEY=...
//! annotator serve
//! annotator analyze --id 42 --path docs/w2.pdf
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML settings and environment secrets |
//! | [`error`] | Error taxonomy and HTTP status mapping |
//! | [`models`] | Core data types |
//! | [`trigger`] | Webhook / prompt body validation |
//! | [`traits`] | Collaborator seams |
//! | [`storage`] | Blob backend selection and MIME handling |
//! | [`storage_supabase`] | Supabase Storage downloads |
//! | [`storage_fs`] | Local-directory blob store |
//! | [`prompt`] | Fixed extraction instruction |
//! | [`gemini`] | Gemini API client |
//! | [`parse`] | Completion parsing |
//! | [`store_supabase`] | PostgREST insert |
//! | [`store_sqlite`] | Local SQLite persistence |
//! | [`pipeline`] | The end-to-end annotation chain |
//! | [`server`] | HTTP ingress |

pub mod config;
pub mod error;
pub mod gemini;
pub mod models;
pub mod parse;
pub mod pipeline;
pub mod prompt;
pub mod server;
pub mod storage;
pub mod storage_fs;
pub mod storage_supabase;
pub mod store_sqlite;
pub mod store_supabase;
pub mod traits;
pub mod trigger;
