//! Configuration types for provider-batch

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::{net::SocketAddr, path::PathBuf, time::Duration};
use utoipa::ToSchema;

/// Main configuration for [`BatchCoordinator`](crate::BatchCoordinator)
///
/// Fields are organized into logical sub-configs:
/// - [`batch`](BatchConfig): fetch concurrency, retries, timeouts, input limits
/// - [`export`](ExportConfig): format thresholds, chunking, output directory
/// - [`persistence`](PersistenceConfig): database location
/// - [`provider`](ProviderConfig): HTTP provider endpoint
/// - [`api`](ApiConfig): REST server settings
#[derive(Clone, Debug, Default, Serialize, Deserialize, ToSchema)]
pub struct Config {
    /// Fetch engine settings
    #[serde(default)]
    pub batch: BatchConfig,

    /// Export pipeline settings
    #[serde(default)]
    pub export: ExportConfig,

    /// Data storage
    #[serde(default)]
    pub persistence: PersistenceConfig,

    /// HTTP provider endpoint
    #[serde(default)]
    pub provider: ProviderConfig,

    /// REST API configuration
    #[serde(default)]
    pub api: ApiConfig,
}

impl Config {
    /// Reject values that would stall or misconfigure the engine
    pub fn validate(&self) -> Result<()> {
        if self.batch.max_concurrent_fetches == 0 {
            return Err(config_error(
                "max_concurrent_fetches must be at least 1",
                "batch.max_concurrent_fetches",
            ));
        }
        if self.batch.max_attempts == 0 {
            return Err(config_error(
                "max_attempts must be at least 1",
                "batch.max_attempts",
            ));
        }
        if self.batch.max_identifiers == 0 {
            return Err(config_error(
                "max_identifiers must be at least 1",
                "batch.max_identifiers",
            ));
        }
        if self.batch.fetch_timeout.is_zero() {
            return Err(config_error(
                "fetch_timeout must be greater than zero",
                "batch.fetch_timeout",
            ));
        }
        if self.export.full_max_rows > self.export.streaming_max_rows {
            return Err(config_error(
                "full_max_rows must not exceed streaming_max_rows",
                "export.full_max_rows",
            ));
        }
        if self.export.chunk_size == 0 {
            return Err(config_error(
                "chunk_size must be at least 1",
                "export.chunk_size",
            ));
        }
        if self.export.top_categories == 0 {
            return Err(config_error(
                "top_categories must be at least 1",
                "export.top_categories",
            ));
        }
        Ok(())
    }
}

fn config_error(message: &str, key: &str) -> Error {
    Error::Config {
        message: message.to_string(),
        key: Some(key.to_string()),
    }
}

/// Fetch engine configuration
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct BatchConfig {
    /// Global bound on simultaneous provider calls across all jobs (default: 20)
    #[serde(default = "default_max_concurrent_fetches")]
    pub max_concurrent_fetches: usize,

    /// Maximum identifiers accepted per job (default: 50000)
    #[serde(default = "default_max_identifiers")]
    pub max_identifiers: usize,

    /// Attempts per item, first try included (default: 3)
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Base backoff; the wait before retry n is n * base (default: 1000 ms)
    #[serde(default = "default_retry_base_delay", with = "duration_millis_serde")]
    #[schema(value_type = u64)]
    pub retry_base_delay: Duration,

    /// Per-call provider timeout (default: 30 seconds)
    #[serde(default = "default_fetch_timeout", with = "duration_serde")]
    #[schema(value_type = u64)]
    pub fetch_timeout: Duration,

    /// How long shutdown waits for in-flight executions (default: 30 seconds)
    #[serde(default = "default_shutdown_grace", with = "duration_serde")]
    #[schema(value_type = u64)]
    pub shutdown_grace: Duration,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            max_concurrent_fetches: default_max_concurrent_fetches(),
            max_identifiers: default_max_identifiers(),
            max_attempts: default_max_attempts(),
            retry_base_delay: default_retry_base_delay(),
            fetch_timeout: default_fetch_timeout(),
            shutdown_grace: default_shutdown_grace(),
        }
    }
}

/// Export pipeline configuration
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct ExportConfig {
    /// Directory receiving `job-{id}.{ext}` documents (default: "./exports")
    #[serde(default = "default_export_dir")]
    pub export_dir: PathBuf,

    /// Largest volume written as a styled in-memory workbook (default: 1000)
    #[serde(default = "default_full_max_rows")]
    pub full_max_rows: u64,

    /// Largest volume written as a streamed workbook (default: 10000)
    #[serde(default = "default_streaming_max_rows")]
    pub streaming_max_rows: u64,

    /// Rows read from the store per page while streaming (default: 5000)
    #[serde(default = "default_chunk_size")]
    pub chunk_size: u32,

    /// Entries kept in the taxpayer-type breakdown (default: 10)
    #[serde(default = "default_top_categories")]
    pub top_categories: usize,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            export_dir: default_export_dir(),
            full_max_rows: default_full_max_rows(),
            streaming_max_rows: default_streaming_max_rows(),
            chunk_size: default_chunk_size(),
            top_categories: default_top_categories(),
        }
    }
}

/// Data storage configuration
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct PersistenceConfig {
    /// Database path (default: "./provider-batch.db")
    #[serde(default = "default_database_path")]
    pub database_path: PathBuf,
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
        }
    }
}

/// HTTP provider configuration
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct ProviderConfig {
    /// Base URL; lookups are `GET {base_url}/{identifier}`
    #[serde(default = "default_provider_base_url")]
    pub base_url: String,

    /// Optional bearer token sent with every lookup
    #[serde(default)]
    pub api_token: Option<String>,

    /// Client-level request timeout (default: 30 seconds)
    #[serde(default = "default_fetch_timeout", with = "duration_serde")]
    #[schema(value_type = u64)]
    pub request_timeout: Duration,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            base_url: default_provider_base_url(),
            api_token: None,
            request_timeout: default_fetch_timeout(),
        }
    }
}

/// REST API configuration
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct ApiConfig {
    /// Address to bind to (default: 127.0.0.1:6790)
    #[serde(default = "default_bind_address")]
    #[schema(value_type = String)]
    pub bind_address: SocketAddr,

    /// Enable CORS for browser access (default: true)
    #[serde(default = "default_true")]
    pub cors_enabled: bool,

    /// Allowed CORS origins (default: ["*"])
    #[serde(default = "default_cors_origins")]
    pub cors_origins: Vec<String>,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            cors_enabled: true,
            cors_origins: default_cors_origins(),
        }
    }
}

fn default_max_concurrent_fetches() -> usize {
    20
}

fn default_max_identifiers() -> usize {
    50_000
}

fn default_max_attempts() -> u32 {
    3
}

fn default_retry_base_delay() -> Duration {
    Duration::from_millis(1000)
}

fn default_fetch_timeout() -> Duration {
    Duration::from_secs(30)
}

fn default_shutdown_grace() -> Duration {
    Duration::from_secs(30)
}

fn default_export_dir() -> PathBuf {
    PathBuf::from("./exports")
}

fn default_full_max_rows() -> u64 {
    1_000
}

fn default_streaming_max_rows() -> u64 {
    10_000
}

fn default_chunk_size() -> u32 {
    5_000
}

fn default_top_categories() -> usize {
    10
}

fn default_database_path() -> PathBuf {
    PathBuf::from("./provider-batch.db")
}

fn default_provider_base_url() -> String {
    "http://127.0.0.1:8080/records".to_string()
}

fn default_bind_address() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 6790))
}

fn default_cors_origins() -> Vec<String> {
    vec!["*".to_string()]
}

fn default_true() -> bool {
    true
}

// Duration serialization helper (whole seconds)
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_secs())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}

// Duration serialization helper (milliseconds)
mod duration_millis_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(u64::try_from(duration.as_millis()).unwrap_or(u64::MAX))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}
