//! Shared HTTP client

use bunosh_config::HttpConfig;
use reqwest::Client;
use tracing::debug;

use crate::errors::HttpError;
use crate::types::HttpMethod;

/// Owns one configured reqwest client for every request of a run
#[derive(Debug, Clone)]
pub struct HttpManager {
    client: Client,
    config: HttpConfig,
}

impl HttpManager {
    /// Create a manager with default configuration
    pub fn new() -> Result<Self, HttpError> {
        Self::with_config(HttpConfig::default())
    }

    /// Create a manager with specific configuration
    pub fn with_config(config: HttpConfig) -> Result<Self, HttpError> {
        debug!(
            "Creating HttpManager with timeout: {}s",
            config.timeout.as_secs()
        );
        let client = Client::builder()
            .timeout(config.timeout)
            .user_agent(&config.user_agent)
            .danger_accept_invalid_certs(!config.verify_ssl)
            .redirect(reqwest::redirect::Policy::limited(
                config.max_redirects as usize,
            ))
            .build()
            .map_err(|e| HttpError::Client(e.to_string()))?;
        Ok(Self { client, config })
    }

    pub fn config(&self) -> &HttpConfig {
        &self.config
    }

    pub fn client(&self) -> &Client {
        &self.client
    }

    /// Start a request with the shared client
    pub fn request(&self, method: HttpMethod, url: &str) -> Result<reqwest::RequestBuilder, HttpError> {
        let url = reqwest::Url::parse(url).map_err(|e| HttpError::InvalidUrl(format!("{}: {}", url, e)))?;
        Ok(self.client.request(method.into(), url))
    }
}
