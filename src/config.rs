//! Service configuration.
//!
//! Non-secret settings come from an optional TOML file; secrets come only
//! from the environment. Both are resolved once at process start into a
//! [`Config`] that is passed down explicitly.
//!
//! ```toml
//! [server]
//! bind = "0.0.0.0:8888"
//!
//! [storage]
//! backend = "supabase"        # or "filesystem"
//! bucket = "documents"
//! default_mime_type = "application/pdf"
//!
//! [annotation]
//! endpoint = "https://generativelanguage.googleapis.com/v1beta/models/gemini-1.5-flash:generateContent"
//!
//! [persistence]
//! backend = "supabase"        # or "sqlite"
//! table = "document_analyses"
//! ```
//!
//! # Environment Variables
//!
//! - `GEMINI_API_KEY`: always required
//! - `SUPABASE_URL`: required when either backend is `supabase`
//! - `SUPABASE_SERVICE_KEY`: preferred Supabase key
//! - `SUPABASE_ANON_KEY`: fallback when no service key is set

use anyhow::{bail, Context};
use serde::Deserialize;
use std::fmt;
use std::path::{Path, PathBuf};

use crate::error::AnnotatorError;

/// Used when `--config` is not given. Missing file means built-in defaults.
pub const DEFAULT_CONFIG_PATH: &str = "./config/annotator.toml";

pub const DEFAULT_GEMINI_ENDPOINT: &str =
    "https://generativelanguage.googleapis.com/v1beta/models/gemini-1.5-flash:generateContent";

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub annotation: AnnotationConfig,
    #[serde(default)]
    pub persistence: PersistenceConfig,
    #[serde(skip)]
    pub secrets: Secrets,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

fn default_bind() -> String {
    "0.0.0.0:8888".to_string()
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    #[default]
    Supabase,
    Filesystem,
}

#[derive(Debug, Deserialize, Clone)]
pub struct StorageConfig {
    #[serde(default)]
    pub backend: StorageBackend,
    #[serde(default = "default_bucket")]
    pub bucket: String,
    /// Root directory for the filesystem backend.
    #[serde(default)]
    pub root: Option<PathBuf>,
    /// Applied when storage does not report a usable content type.
    #[serde(default = "default_mime_type")]
    pub default_mime_type: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::default(),
            bucket: default_bucket(),
            root: None,
            default_mime_type: default_mime_type(),
        }
    }
}

fn default_bucket() -> String {
    "documents".to_string()
}
fn default_mime_type() -> String {
    "application/pdf".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct AnnotationConfig {
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
}

impl Default for AnnotationConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
        }
    }
}

fn default_endpoint() -> String {
    DEFAULT_GEMINI_ENDPOINT.to_string()
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum PersistenceBackend {
    #[default]
    Supabase,
    Sqlite,
}

#[derive(Debug, Deserialize, Clone)]
pub struct PersistenceConfig {
    #[serde(default)]
    pub backend: PersistenceBackend,
    #[serde(default = "default_table")]
    pub table: String,
    #[serde(default = "default_sqlite_path")]
    pub sqlite_path: PathBuf,
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self {
            backend: PersistenceBackend::default(),
            table: default_table(),
            sqlite_path: default_sqlite_path(),
        }
    }
}

fn default_table() -> String {
    "document_analyses".to_string()
}
fn default_sqlite_path() -> PathBuf {
    PathBuf::from("./data/annotator.sqlite")
}

/// Credentials read from the environment. `Debug` never prints values.
#[derive(Clone, Default)]
pub struct Secrets {
    pub gemini_api_key: String,
    pub supabase: Option<SupabaseCredentials>,
}

#[derive(Clone)]
pub struct SupabaseCredentials {
    /// Project URL without trailing slash.
    pub url: String,
    pub key: String,
}

impl fmt::Debug for Secrets {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Secrets")
            .field("gemini_api_key", &"<redacted>")
            .field("supabase", &self.supabase)
            .finish()
    }
}

impl fmt::Debug for SupabaseCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SupabaseCredentials")
            .field("url", &self.url)
            .field("key", &"<redacted>")
            .finish()
    }
}

impl Secrets {
    /// Resolve secrets through `lookup` (normally `std::env::var`).
    ///
    /// Empty values count as missing.
    pub fn from_lookup<F>(needs_supabase: bool, lookup: F) -> Result<Self, AnnotatorError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let gemini_api_key = get("GEMINI_API_KEY").ok_or_else(|| {
            AnnotatorError::Configuration("GEMINI_API_KEY environment variable not set".into())
        })?;

        let supabase = if needs_supabase {
            let url = get("SUPABASE_URL").ok_or_else(|| {
                AnnotatorError::Configuration("SUPABASE_URL environment variable not set".into())
            })?;
            let key = get("SUPABASE_SERVICE_KEY")
                .or_else(|| get("SUPABASE_ANON_KEY"))
                .ok_or_else(|| {
                    AnnotatorError::Configuration(
                        "SUPABASE_SERVICE_KEY or SUPABASE_ANON_KEY environment variable not set"
                            .into(),
                    )
                })?;
            Some(SupabaseCredentials {
                url: url.trim_end_matches('/').to_string(),
                key,
            })
        } else {
            None
        };

        Ok(Self {
            gemini_api_key,
            supabase,
        })
    }
}

impl Config {
    pub fn needs_supabase(&self) -> bool {
        self.storage.backend == StorageBackend::Supabase
            || self.persistence.backend == PersistenceBackend::Supabase
    }

    /// Supabase credentials, or a configuration error if they were not resolved.
    pub fn supabase(&self) -> Result<&SupabaseCredentials, AnnotatorError> {
        self.secrets.supabase.as_ref().ok_or_else(|| {
            AnnotatorError::Configuration("Supabase credentials were not loaded".into())
        })
    }
}

/// Parse and validate TOML settings. Secrets are left empty.
pub fn parse_config(content: &str) -> anyhow::Result<Config> {
    let config: Config = toml::from_str(content).context("Failed to parse config file")?;
    validate(&config)?;
    Ok(config)
}

fn validate(config: &Config) -> anyhow::Result<()> {
    if config.server.bind.trim().is_empty() {
        bail!("server.bind must not be empty");
    }

    if config.storage.bucket.trim().is_empty() {
        bail!("storage.bucket must not be empty");
    }

    if !config.storage.default_mime_type.contains('/') {
        bail!(
            "storage.default_mime_type must look like 'type/subtype', got '{}'",
            config.storage.default_mime_type
        );
    }

    if config.storage.backend == StorageBackend::Filesystem && config.storage.root.is_none() {
        bail!("storage.root must be set when backend is 'filesystem'");
    }

    let endpoint = &config.annotation.endpoint;
    if !endpoint.starts_with("https://") && !endpoint.starts_with("http://") {
        bail!("annotation.endpoint must be an http(s) URL, got '{}'", endpoint);
    }

    let table = &config.persistence.table;
    if table.is_empty()
        || !table
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_')
    {
        bail!("persistence.table must be a plain identifier, got '{}'", table);
    }

    Ok(())
}

/// Load settings from `path` (or [`DEFAULT_CONFIG_PATH`] if present) and
/// resolve secrets from the process environment.
pub fn load_config(path: Option<&Path>) -> Result<Config, AnnotatorError> {
    let mut config = load_settings(path)?;
    config.secrets = Secrets::from_lookup(config.needs_supabase(), |name| {
        std::env::var(name).ok()
    })?;
    Ok(config)
}

/// Like [`load_config`] but leaves secrets empty, for commands that never
/// call out (`annotator init`).
pub fn load_settings(path: Option<&Path>) -> Result<Config, AnnotatorError> {
    let config = match path {
        Some(p) => read_config_file(p)?,
        None => {
            let default = Path::new(DEFAULT_CONFIG_PATH);
            if default.exists() {
                read_config_file(default)?
            } else {
                Config::default()
            }
        }
    };
    Ok(config)
}

fn read_config_file(path: &Path) -> Result<Config, AnnotatorError> {
    std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))
        .and_then(|content| parse_config(&content))
        .map_err(|e| AnnotatorError::Configuration(format!("{:#}", e)))
}
