//! HTTP transport for the Civis matching service.

use async_trait::async_trait;
use matchbook_core::{BulkRequest, MatchDescriptor, MatchbookError, MatchbookResult};
use std::fmt;
use std::time::Duration;

/// Endpoint identifier for single lookups, also the cache-key domain.
pub const MATCH_ENDPOINT: &str = "match";

/// Endpoint identifier for bulk lookups, also the cache-key domain.
pub const BULK_ENDPOINT: &str = "multimatch";

/// Default request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Configuration for the matching-service client.
#[derive(Clone)]
pub struct MatcherConfig {
    /// Base URL of the matching service.
    pub base_url: String,
    /// HTTP basic auth username.
    pub username: String,
    /// HTTP basic auth password.
    pub password: String,
    /// Per-request timeout; a timeout surfaces as a transport failure.
    pub timeout: Duration,
}

impl Default for MatcherConfig {
    fn default() -> Self {
        Self {
            base_url: "http://match.civisanalytics.com".to_string(),
            username: String::new(),
            password: String::new(),
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

impl MatcherConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_credentials(
        mut self,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        self.username = username.into();
        self.password = password.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

impl fmt::Debug for MatcherConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MatcherConfig")
            .field("base_url", &self.base_url)
            .field("username", &self.username)
            .field("password", &"[REDACTED]")
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// Raw response surface handed back for classification.
///
/// The transport performs no status or payload interpretation; the
/// coordinator owns the error taxonomy.
#[derive(Debug, Clone)]
pub struct TransportResponse {
    pub status: u16,
    /// Resolved request URL, query included.
    pub url: String,
    pub body: Vec<u8>,
}

/// Seam to the remote matching service.
#[async_trait]
pub trait MatchTransport: Send + Sync {
    /// Resolved request URL for a descriptor. Also attached to results
    /// served from cache, where no response URL exists.
    fn match_url(&self, descriptor: &MatchDescriptor) -> String;

    /// Resolved request URL for bulk lookups.
    fn bulk_url(&self) -> String;

    /// GET the match endpoint with the descriptor as query parameters.
    async fn get_match(&self, descriptor: &MatchDescriptor) -> MatchbookResult<TransportResponse>;

    /// POST the full bulk body to the multimatch endpoint.
    async fn post_bulk(&self, request: &BulkRequest) -> MatchbookResult<TransportResponse>;
}

/// reqwest-backed transport with HTTP basic auth.
pub struct HttpTransport {
    client: reqwest::Client,
    config: MatcherConfig,
}

impl HttpTransport {
    pub fn new(config: MatcherConfig) -> MatchbookResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| MatchbookError::RequestFailed {
                url: config.base_url.clone(),
                reason: e.to_string(),
            })?;

        Ok(Self { client, config })
    }

    pub fn config(&self) -> &MatcherConfig {
        &self.config
    }

    fn endpoint_url(&self, endpoint: &str) -> String {
        format!("{}/{}", self.config.base_url.trim_end_matches('/'), endpoint)
    }

    async fn read_response(
        &self,
        response: reqwest::Response,
    ) -> MatchbookResult<TransportResponse> {
        let status = response.status().as_u16();
        let url = response.url().to_string();
        let body = response
            .bytes()
            .await
            .map_err(|e| MatchbookError::RequestFailed {
                url: url.clone(),
                reason: e.to_string(),
            })?
            .to_vec();

        Ok(TransportResponse { status, url, body })
    }
}

#[async_trait]
impl MatchTransport for HttpTransport {
    fn match_url(&self, descriptor: &MatchDescriptor) -> String {
        let base = self.endpoint_url(MATCH_ENDPOINT);
        match reqwest::Url::parse_with_params(&base, descriptor.to_query()) {
            Ok(url) => url.to_string(),
            Err(_) => base,
        }
    }

    fn bulk_url(&self) -> String {
        self.endpoint_url(BULK_ENDPOINT)
    }

    async fn get_match(&self, descriptor: &MatchDescriptor) -> MatchbookResult<TransportResponse> {
        let url = self.endpoint_url(MATCH_ENDPOINT);
        let response = self
            .client
            .get(&url)
            .basic_auth(&self.config.username, Some(&self.config.password))
            .query(&descriptor.to_query())
            .send()
            .await
            .map_err(|e| MatchbookError::RequestFailed {
                url: url.clone(),
                reason: e.to_string(),
            })?;

        self.read_response(response).await
    }

    async fn post_bulk(&self, request: &BulkRequest) -> MatchbookResult<TransportResponse> {
        let url = self.endpoint_url(BULK_ENDPOINT);
        let response = self
            .client
            .post(&url)
            .basic_auth(&self.config.username, Some(&self.config.password))
            .json(&request.to_params())
            .send()
            .await
            .map_err(|e| MatchbookError::RequestFailed {
                url: url.clone(),
                reason: e.to_string(),
            })?;

        self.read_response(response).await
    }
}

impl fmt::Debug for HttpTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpTransport")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults() {
        let config = MatcherConfig::default();
        assert_eq!(config.base_url, "http://match.civisanalytics.com");
        assert_eq!(config.timeout, DEFAULT_TIMEOUT);
        assert!(config.username.is_empty());
    }

    #[test]
    fn test_config_builders() {
        let config = MatcherConfig::new()
            .with_base_url("http://example.com")
            .with_credentials("user", "secret")
            .with_timeout(Duration::from_secs(5));

        assert_eq!(config.base_url, "http://example.com");
        assert_eq!(config.username, "user");
        assert_eq!(config.password, "secret");
        assert_eq!(config.timeout, Duration::from_secs(5));
    }

    #[test]
    fn test_config_debug_redacts_password() {
        let config = MatcherConfig::new().with_credentials("user", "secret");
        let rendered = format!("{:?}", config);
        assert!(rendered.contains("[REDACTED]"));
        assert!(!rendered.contains("secret"));
    }

    #[test]
    fn test_match_url_includes_query() {
        let transport = HttpTransport::new(
            MatcherConfig::new().with_base_url("http://example.com"),
        )
        .expect("build transport");
        let descriptor = matchbook_core::MatchDescriptor::new("Alice", "Smith")
            .with_birth_year(1985);

        let url = transport.match_url(&descriptor);
        assert!(url.starts_with("http://example.com/match?"));
        assert!(url.contains("first_name=Alice"));
        assert!(url.contains("last_name=Smith"));
        assert!(url.contains("birth_year=1985"));
    }

    #[test]
    fn test_bulk_url() {
        let transport = HttpTransport::new(
            MatcherConfig::new().with_base_url("http://example.com/"),
        )
        .expect("build transport");
        assert_eq!(transport.bulk_url(), "http://example.com/multimatch");
    }
}
