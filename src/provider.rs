//! Provider client seam and HTTP implementation
//!
//! [`ProviderClient`] is the only way the fetch engine talks to the outside
//! world. Lookups either return a [`ProviderRecord`] or a [`FetchErrorKind`];
//! transport details never leak past this module.

use crate::config::ProviderConfig;
use crate::error::Result;
use crate::record::ProviderRecord;
use crate::types::FetchErrorKind;
use async_trait::async_trait;
use reqwest::StatusCode;

/// Longest identifier accepted by the HTTP provider
pub const MAX_IDENTIFIER_LEN: usize = 32;

/// Fetches one external record per identifier
#[async_trait]
pub trait ProviderClient: Send + Sync {
    /// Look up the record for `identifier`
    async fn fetch(&self, identifier: &str) -> std::result::Result<ProviderRecord, FetchErrorKind>;
}

/// Whether `identifier` is well-formed enough to send to the provider
pub fn is_valid_identifier(identifier: &str) -> bool {
    !identifier.is_empty()
        && identifier.len() <= MAX_IDENTIFIER_LEN
        && identifier.chars().all(|c| c.is_ascii_alphanumeric())
}

/// [`ProviderClient`] backed by a JSON HTTP endpoint
///
/// Lookups are `GET {base_url}/{identifier}`. Status mapping:
/// 404 is `NotFound`, 429 is `RateLimited`, every other non-success status and
/// connection failures are `ServerError`, client timeouts are `Timeout`, and an
/// undecodable body is `Malformed`.
#[derive(Clone, Debug)]
pub struct HttpProviderClient {
    client: reqwest::Client,
    base_url: String,
    api_token: Option<String>,
}

impl HttpProviderClient {
    /// Build a client from provider configuration
    pub fn new(config: &ProviderConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_token: config.api_token.clone(),
        })
    }

    fn url_for(&self, identifier: &str) -> String {
        format!("{}/{}", self.base_url, identifier)
    }
}

#[async_trait]
impl ProviderClient for HttpProviderClient {
    async fn fetch(&self, identifier: &str) -> std::result::Result<ProviderRecord, FetchErrorKind> {
        if !is_valid_identifier(identifier) {
            tracing::debug!(identifier, "rejecting malformed identifier without a request");
            return Err(FetchErrorKind::Malformed);
        }

        let mut request = self.client.get(self.url_for(identifier));
        if let Some(token) = &self.api_token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                FetchErrorKind::Timeout
            } else {
                tracing::debug!(identifier, error = %e, "provider request failed");
                FetchErrorKind::ServerError
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(classify_status(status));
        }

        response.json::<ProviderRecord>().await.map_err(|e| {
            if e.is_timeout() {
                FetchErrorKind::Timeout
            } else {
                tracing::debug!(identifier, error = %e, "undecodable provider response");
                FetchErrorKind::Malformed
            }
        })
    }
}

fn classify_status(status: StatusCode) -> FetchErrorKind {
    match status {
        StatusCode::NOT_FOUND => FetchErrorKind::NotFound,
        StatusCode::TOO_MANY_REQUESTS => FetchErrorKind::RateLimited,
        _ => FetchErrorKind::ServerError,
    }
}
