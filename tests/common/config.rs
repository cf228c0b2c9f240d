//! Test configuration helpers for temp-dir coordinators and live provider settings

use provider_batch::config::ProviderConfig;
use provider_batch::{BatchCoordinator, Config, Database, ProviderClient};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

/// Error type for test configuration
#[derive(Debug)]
pub struct ConfigError(pub String);

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Config error: {}", self.0)
    }
}

impl std::error::Error for ConfigError {}

/// Config whose database and export directory live under `root`, with fast retries
pub fn test_config(root: &Path) -> Config {
    let mut config = Config::default();
    config.persistence.database_path = root.join("batch.db");
    config.export.export_dir = root.join("exports");
    config.batch.max_concurrent_fetches = 8;
    config.batch.retry_base_delay = Duration::from_millis(10);
    config.batch.fetch_timeout = Duration::from_secs(5);
    config.batch.shutdown_grace = Duration::from_secs(10);
    config
}

/// Open a coordinator over the database configured in `config`
pub async fn open_coordinator(
    config: Config,
    provider: Arc<dyn ProviderClient>,
) -> Arc<BatchCoordinator> {
    let db = Database::new(&config.persistence.database_path)
        .await
        .expect("open database");
    Arc::new(BatchCoordinator::new(Arc::new(db), provider, config).expect("valid config"))
}

/// Create a coordinator in a fresh temp dir
///
/// Returns the coordinator and temp directory (keep temp_dir alive for test duration)
pub async fn create_coordinator(
    provider: Arc<dyn ProviderClient>,
    configure: impl FnOnce(&mut Config),
) -> (Arc<BatchCoordinator>, TempDir) {
    let temp_dir = TempDir::new().expect("create temp dir");
    let mut config = test_config(temp_dir.path());
    configure(&mut config);
    (open_coordinator(config, provider).await, temp_dir)
}

/// Load the live provider endpoint from environment variables
///
/// Required environment variables:
/// - `PROVIDER_BASE_URL` - Lookup endpoint; requests go to `{base}/{identifier}`
/// - `PROVIDER_IDENTIFIER` - An identifier the provider knows
///
/// Optional environment variables:
/// - `PROVIDER_API_TOKEN` - Bearer token
pub fn load_live_provider() -> Result<(ProviderConfig, String), ConfigError> {
    dotenvy::dotenv().ok();

    let base_url = std::env::var("PROVIDER_BASE_URL")
        .map_err(|_| ConfigError("PROVIDER_BASE_URL not set in environment".to_string()))?;
    let identifier = std::env::var("PROVIDER_IDENTIFIER")
        .map_err(|_| ConfigError("PROVIDER_IDENTIFIER not set in environment".to_string()))?;

    let config = ProviderConfig {
        base_url,
        api_token: std::env::var("PROVIDER_API_TOKEN").ok(),
        request_timeout: Duration::from_secs(30),
    };
    Ok((config, identifier))
}

/// Whether live provider settings are present
pub fn has_live_provider() -> bool {
    load_live_provider().is_ok()
}
