//! Errors raised while performing a request; a `fetch` task turns them into
//! its failure output

use crate::types::UnsupportedMethod;

#[derive(Debug, thiserror::Error)]
pub enum HttpError {
    /// Connection, TLS, timeout or body read failure
    #[error("Request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error(transparent)]
    UnsupportedMethod(#[from] UnsupportedMethod),

    #[error("Invalid URL {0}")]
    InvalidUrl(String),

    #[error("Invalid header name '{0}'")]
    InvalidHeaderName(String),

    #[error("Invalid value for header '{0}'")]
    InvalidHeaderValue(String),

    #[error("Response is not valid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),

    #[error("Cannot build HTTP client: {0}")]
    Client(String),
}
