//! Local SQLite persistence backend.
//!
//! Mirrors the Supabase `document_analyses` table closely enough for local
//! runs. `key_figures` is stored as JSON text and `tax_year` as text, since
//! the model returns either a number or a string.
//!
//! Run `annotator init` once to create the table.

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};
use std::path::Path;
use std::str::FromStr;

use crate::models::PersistedAnalysis;
use crate::traits::AnalysisStore;

pub struct SqliteAnalysisStore {
    pool: SqlitePool,
    table: String,
    label: String,
}

impl SqliteAnalysisStore {
    /// Open (creating if needed) the database at `path`.
    pub async fn open(path: &Path, table: &str) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }

        let options = SqliteConnectOptions::from_str(&format!("sqlite:{}", path.display()))?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await
            .with_context(|| format!("Failed to open database {}", path.display()))?;

        Ok(Self {
            pool,
            table: table.to_string(),
            label: format!("sqlite:{}", table),
        })
    }

    /// Create the analyses table. Idempotent.
    pub async fn run_migrations(&self) -> Result<()> {
        sqlx::query(&format!(
            r#"
            CREATE TABLE IF NOT EXISTS {} (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                document_id INTEGER NOT NULL,
                status TEXT NOT NULL CHECK (status IN ('completed', 'failed')),
                document_type TEXT,
                tax_year TEXT,
                issuer_name TEXT,
                key_figures TEXT NOT NULL DEFAULT '{{}}',
                summary TEXT,
                analyzed_at INTEGER NOT NULL
            )
            "#,
            self.table
        ))
        .execute(&self.pool)
        .await?;

        sqlx::query(&format!(
            "CREATE INDEX IF NOT EXISTS idx_{0}_document ON {0}(document_id)",
            self.table
        ))
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Number of rows stored for `document_id`.
    pub async fn count_for_document(&self, document_id: i64) -> Result<i64> {
        let count: i64 = sqlx::query_scalar(&format!(
            "SELECT COUNT(*) FROM {} WHERE document_id = ?",
            self.table
        ))
        .bind(document_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(count)
    }
}

#[async_trait]
impl AnalysisStore for SqliteAnalysisStore {
    fn name(&self) -> &str {
        &self.label
    }

    async fn insert(&self, row: &PersistedAnalysis) -> Result<()> {
        let key_figures = serde_json::to_string(&row.result.key_figures)?;

        sqlx::query(&format!(
            r#"
            INSERT INTO {} (document_id, status, document_type, tax_year, issuer_name,
                            key_figures, summary, analyzed_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
            self.table
        ))
        .bind(row.document_id)
        .bind(row.status.as_str())
        .bind(&row.result.document_type)
        .bind(row.result.tax_year.to_string())
        .bind(&row.result.issuer_name)
        .bind(key_figures)
        .bind(row.result.summary.as_deref())
        .bind(Utc::now().timestamp())
        .execute(&self.pool)
        .await
        .with_context(|| format!("insert into {} failed", self.table))?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AnnotationResult, FigureValue, TaxYear};
    use std::collections::BTreeMap;
    use tempfile::TempDir;

    fn analysis(document_id: i64) -> PersistedAnalysis {
        let mut key_figures = BTreeMap::new();
        key_figures.insert("wages".to_string(), FigureValue::Number(50000i64.into()));
        PersistedAnalysis::completed(
            document_id,
            AnnotationResult {
                document_type: "W-2".into(),
                tax_year: TaxYear::Year(2023),
                issuer_name: "Acme Corp".into(),
                key_figures,
                summary: None,
            },
        )
    }

    #[tokio::test]
    async fn test_insert_and_count() {
        let tmp = TempDir::new().unwrap();
        let store = SqliteAnalysisStore::open(&tmp.path().join("data/a.sqlite"), "document_analyses")
            .await
            .unwrap();
        store.run_migrations().await.unwrap();
        // Idempotent
        store.run_migrations().await.unwrap();

        store.insert(&analysis(42)).await.unwrap();
        assert_eq!(store.count_for_document(42).await.unwrap(), 1);

        let (tax_year, figures): (String, String) = sqlx::query_as(
            "SELECT tax_year, key_figures FROM document_analyses WHERE document_id = 42",
        )
        .fetch_one(&store.pool)
        .await
        .unwrap();
        assert_eq!(tax_year, "2023");
        assert_eq!(figures, r#"{"wages":50000}"#);
    }

    #[tokio::test]
    async fn test_redelivery_inserts_again() {
        let tmp = TempDir::new().unwrap();
        let store = SqliteAnalysisStore::open(&tmp.path().join("a.sqlite"), "document_analyses")
            .await
            .unwrap();
        store.run_migrations().await.unwrap();

        store.insert(&analysis(7)).await.unwrap();
        store.insert(&analysis(7)).await.unwrap();
        assert_eq!(store.count_for_document(7).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_insert_without_table_fails() {
        let tmp = TempDir::new().unwrap();
        let store = SqliteAnalysisStore::open(&tmp.path().join("a.sqlite"), "document_analyses")
            .await
            .unwrap();
        assert!(store.insert(&analysis(1)).await.is_err());
    }
}
