//! Supabase (PostgREST) persistence backend.
//!
//! ```text
//! POST {SUPABASE_URL}/rest/v1/{table}
//! apikey: {key}
//! Authorization: Bearer {key}
//! Prefer: return=minimal
//! ```
//!
//! A plain insert: re-delivered triggers produce duplicate rows. Error
//! bodies from PostgREST are logged, never returned.

use anyhow::{bail, Result};
use async_trait::async_trait;
use tracing::warn;

use crate::config::SupabaseCredentials;
use crate::models::PersistedAnalysis;
use crate::traits::AnalysisStore;

pub struct SupabaseAnalysisStore {
    creds: SupabaseCredentials,
    table: String,
    label: String,
    client: reqwest::Client,
}

impl SupabaseAnalysisStore {
    pub fn new(creds: SupabaseCredentials, table: String) -> Self {
        let label = format!("supabase:{}", table);
        Self {
            creds,
            table,
            label,
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl AnalysisStore for SupabaseAnalysisStore {
    fn name(&self) -> &str {
        &self.label
    }

    async fn insert(&self, row: &PersistedAnalysis) -> Result<()> {
        let url = format!("{}/rest/v1/{}", self.creds.url, self.table);

        let resp = self
            .client
            .post(&url)
            .bearer_auth(&self.creds.key)
            .header("apikey", &self.creds.key)
            .header("Prefer", "return=minimal")
            .json(row)
            .send()
            .await
            .map_err(|e| {
                anyhow::anyhow!("failed to reach Supabase for {}: {}", self.table, e.without_url())
            })?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            warn!(
                table = %self.table,
                status = status.as_u16(),
                body = %body.chars().take(500).collect::<String>(),
                "insert returned an error"
            );
            bail!("insert into {} failed (HTTP {})", self.table, status);
        }

        Ok(())
    }
}
