//! HTTP fetch primitive

use std::collections::BTreeMap;
use std::str::FromStr;

use bunosh_core::{TaskEngine, TaskKind, TaskOptions, TaskResult, TaskScope};
use futures::StreamExt;
use reqwest::header::{HeaderName, HeaderValue};
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::client::HttpManager;
use crate::errors::HttpError;
use crate::types::HttpMethod;

/// Request body
#[derive(Debug, Clone, PartialEq)]
pub enum FetchBody {
    Text(String),
    Json(Value),
}

/// One request performed as a task
#[derive(Debug, Clone, PartialEq)]
pub struct FetchRequest {
    pub url: String,
    pub method: HttpMethod,
    pub headers: BTreeMap<String, String>,
    pub body: Option<FetchBody>,
}

impl FetchRequest {
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            method: HttpMethod::Get,
            headers: BTreeMap::new(),
            body: None,
        }
    }

    pub fn with_method(mut self, method: HttpMethod) -> Self {
        self.method = method;
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    pub fn with_body(mut self, body: FetchBody) -> Self {
        self.body = Some(body);
        self
    }

    pub fn task_name(&self) -> String {
        format!("{} {}", self.method, self.url)
    }
}

/// What came back from the server
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FetchResponse {
    pub url: String,
    pub status: u16,
    pub status_text: String,
    pub headers: BTreeMap<String, String>,
    pub body: String,
}

impl FetchResponse {
    /// 2xx status
    pub fn ok(&self) -> bool {
        (200..300).contains(&self.status)
    }

    fn failure_message(&self) -> String {
        if self.body.trim().is_empty() {
            format!("Request failed with status {} {}", self.status, self.status_text)
        } else {
            self.body.clone()
        }
    }
}

/// Perform a request as a task; output is the body text
pub async fn fetch(engine: &TaskEngine, http: &HttpManager, request: FetchRequest) -> TaskResult {
    fetch_response(engine, http, request).await.0
}

/// Perform a request as a task and also hand back the full response.
///
/// The task succeeds for 2xx statuses. Other statuses fail with the body
/// as output; transport errors fail without a response.
pub async fn fetch_response(
    engine: &TaskEngine,
    http: &HttpManager,
    request: FetchRequest,
) -> (TaskResult, Option<FetchResponse>) {
    let task = engine.begin(request.task_name(), TaskOptions::kind(TaskKind::Fetch));
    let scope = task.scope();

    match perform(&scope, http, request).await {
        Ok(response) if response.ok() => {
            let result = task.complete(Ok(Value::String(response.body.clone())));
            (result, Some(response))
        }
        Ok(response) => {
            let result = task.complete(Err(response.failure_message()));
            (result, Some(response))
        }
        Err(err) => (task.complete(Err(err.to_string())), None),
    }
}

async fn perform(
    scope: &TaskScope,
    http: &HttpManager,
    request: FetchRequest,
) -> Result<FetchResponse, HttpError> {
    debug!("Fetching {} {}", request.method, request.url);
    let mut builder = http.request(request.method, &request.url)?;

    for (name, value) in &request.headers {
        let header_name = HeaderName::from_str(name)
            .map_err(|_| HttpError::InvalidHeaderName(name.clone()))?;
        let header_value =
            HeaderValue::from_str(value).map_err(|_| HttpError::InvalidHeaderValue(name.clone()))?;
        builder = builder.header(header_name, header_value);
    }
    builder = match request.body {
        Some(_) if !request.method.allows_body() => {
            warn!("Ignoring body of {} request to {}", request.method, request.url);
            builder
        }
        Some(FetchBody::Text(text)) => builder.body(text),
        Some(FetchBody::Json(json)) => builder.json(&json),
        None => builder,
    };

    let response = builder.send().await?;
    let status = response.status();
    scope.set_status_code(status.as_u16());
    debug!("{} {} responded {}", request.method, request.url, status);

    let url = response.url().to_string();
    let headers = response
        .headers()
        .iter()
        .filter_map(|(name, value)| {
            value
                .to_str()
                .ok()
                .map(|v| (name.to_string(), v.to_string()))
        })
        .collect();

    let mut lines = LineBuffer::default();
    let mut body = Vec::new();
    let mut stream = std::pin::pin!(response.bytes_stream());
    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        for line in lines.push(&chunk) {
            scope.output(&line);
        }
        body.extend_from_slice(&chunk);
    }
    if let Some(line) = lines.finish() {
        scope.output(&line);
    }

    Ok(FetchResponse {
        url,
        status: status.as_u16(),
        status_text: status.canonical_reason().unwrap_or("Unknown Status").to_string(),
        headers,
        body: String::from_utf8_lossy(&body).into_owned(),
    })
}

/// Splits a chunked byte stream into complete lines
#[derive(Debug, Default)]
pub(crate) struct LineBuffer {
    pending: Vec<u8>,
}

impl LineBuffer {
    pub(crate) fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        self.pending.extend_from_slice(chunk);
        let mut lines = Vec::new();
        while let Some(pos) = self.pending.iter().position(|b| *b == b'\n') {
            let rest = self.pending.split_off(pos + 1);
            let line = std::mem::replace(&mut self.pending, rest);
            lines.push(decode(&line[..pos]));
        }
        lines
    }

    pub(crate) fn finish(&mut self) -> Option<String> {
        if self.pending.is_empty() {
            return None;
        }
        let line = std::mem::take(&mut self.pending);
        Some(decode(&line))
    }
}

fn decode(bytes: &[u8]) -> String {
    let line = String::from_utf8_lossy(bytes);
    line.strip_suffix('\r').unwrap_or(&line).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_buffer_joins_split_chunks() {
        let mut buffer = LineBuffer::default();
        assert!(buffer.push(b"hel").is_empty());
        assert_eq!(buffer.push(b"lo\r\nwor"), vec!["hello"]);
        assert_eq!(buffer.push(b"ld\n\nend"), vec!["world", ""]);
        assert_eq!(buffer.finish().as_deref(), Some("end"));
        assert_eq!(buffer.finish(), None);
    }

    #[test]
    fn test_request_builder() {
        let request = FetchRequest::get("https://example.com/api")
            .with_method(HttpMethod::Post)
            .with_header("Accept", "application/json");
        assert_eq!(request.task_name(), "POST https://example.com/api");
        assert_eq!(request.headers.get("Accept").map(String::as_str), Some("application/json"));
    }
}
