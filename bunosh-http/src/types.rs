//! Request methods accepted by `fetch`

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    #[default]
    Get,
    Post,
    Put,
    Delete,
    Patch,
    Head,
    Options,
}

const METHODS: [(HttpMethod, &str); 7] = [
    (HttpMethod::Get, "GET"),
    (HttpMethod::Post, "POST"),
    (HttpMethod::Put, "PUT"),
    (HttpMethod::Delete, "DELETE"),
    (HttpMethod::Patch, "PATCH"),
    (HttpMethod::Head, "HEAD"),
    (HttpMethod::Options, "OPTIONS"),
];

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        METHODS
            .iter()
            .find(|(method, _)| method == self)
            .map(|(_, name)| *name)
            .unwrap_or("GET")
    }

    /// Whether a `fetch` with this method may carry a body
    pub fn allows_body(&self) -> bool {
        !matches!(self, HttpMethod::Get | HttpMethod::Head)
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HttpMethod {
    type Err = UnsupportedMethod;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        METHODS
            .iter()
            .find(|(_, name)| name.eq_ignore_ascii_case(s))
            .map(|(method, _)| *method)
            .ok_or_else(|| UnsupportedMethod(s.to_string()))
    }
}

impl From<HttpMethod> for reqwest::Method {
    fn from(method: HttpMethod) -> Self {
        // every entry of METHODS is a standard method name
        reqwest::Method::from_bytes(method.as_str().as_bytes()).unwrap_or(reqwest::Method::GET)
    }
}

/// A `method` given to `fetch` that is not supported
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Unsupported method '{0}' (expected one of GET, POST, PUT, DELETE, PATCH, HEAD, OPTIONS)")]
pub struct UnsupportedMethod(pub String);
