//! Structured generation through pluggable AI providers
//!
//! Providers are registered by key together with the environment variables
//! that hold their credentials. The registry is resolved once per run; the
//! first provider with credentials wins unless one is configured explicitly.

use std::sync::Arc;

use async_trait::async_trait;
use bunosh_config::AiConfig;
use bunosh_core::{infer_task_name, TaskEngine, TaskKind, TaskOptions, TaskResult};
use serde_json::{json, Value};
use thiserror::Error;
use tracing::debug;

use crate::client::HttpManager;
use crate::errors::HttpError;
use crate::types::HttpMethod;

/// AI configuration and provider errors
#[derive(Error, Debug)]
pub enum AiError {
    #[error("No AI provider is configured. Set one of:\n{}", format_remediations(.remediations))]
    MissingCredential { remediations: Vec<String> },

    #[error("Unknown AI provider '{name}'. Available providers: {}", join_keys(.available))]
    UnknownProvider { name: String, available: Vec<String> },

    #[error(transparent)]
    Http(#[from] HttpError),

    #[error("{provider} returned status {status}: {body}")]
    Status {
        provider: String,
        status: u16,
        body: String,
    },

    #[error("{provider} response did not contain structured output")]
    MalformedResponse { provider: String },
}

fn join_keys(keys: &[String]) -> String {
    keys.join(", ")
}

fn format_remediations(remediations: &[String]) -> String {
    remediations
        .iter()
        .map(|r| format!("  - {}", r))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Everything a provider needs to talk to its API
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderSettings {
    pub api_key: String,
    pub model: Option<String>,
    pub base_url: Option<String>,
}

#[async_trait]
pub trait AiProvider: Send + Sync {
    fn name(&self) -> &str;

    fn model(&self) -> &str;

    /// Ask for a JSON object matching `schema`
    async fn generate_structured(
        &self,
        http: &HttpManager,
        prompt: &str,
        schema: &Value,
    ) -> Result<Value, AiError>;
}

type Constructor = fn(ProviderSettings) -> Arc<dyn AiProvider>;

struct ProviderEntry {
    key: &'static str,
    credential_var: &'static str,
    construct: Constructor,
}

/// Map from provider key to its constructor
pub struct ProviderRegistry {
    entries: Vec<ProviderEntry>,
}

impl std::fmt::Debug for ProviderRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.keys()).finish()
    }
}

impl Default for ProviderRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

impl ProviderRegistry {
    pub fn empty() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// OpenAI-compatible and Anthropic providers, in that priority order
    pub fn builtin() -> Self {
        Self::empty()
            .with_provider("openai", "OPENAI_API_KEY", |settings| {
                Arc::new(OpenAiProvider::new(settings))
            })
            .with_provider("anthropic", "ANTHROPIC_API_KEY", |settings| {
                Arc::new(AnthropicProvider::new(settings))
            })
    }

    pub fn with_provider(
        mut self,
        key: &'static str,
        credential_var: &'static str,
        construct: Constructor,
    ) -> Self {
        self.entries.push(ProviderEntry {
            key,
            credential_var,
            construct,
        });
        self
    }

    pub fn keys(&self) -> Vec<&'static str> {
        self.entries.iter().map(|e| e.key).collect()
    }

    /// Pick a provider from configuration and credentials found by `lookup`
    pub fn resolve(
        &self,
        config: &AiConfig,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Arc<dyn AiProvider>, AiError> {
        let credential = |entry: &ProviderEntry| {
            lookup(entry.credential_var).filter(|value| !value.trim().is_empty())
        };
        let settings = |api_key: String| ProviderSettings {
            api_key,
            model: config.model.clone(),
            base_url: config.base_url.clone(),
        };

        if let Some(ref name) = config.provider {
            let entry = self
                .entries
                .iter()
                .find(|e| e.key.eq_ignore_ascii_case(name))
                .ok_or_else(|| AiError::UnknownProvider {
                    name: name.clone(),
                    available: self.keys().iter().map(|k| k.to_string()).collect(),
                })?;
            let api_key = credential(entry).ok_or_else(|| AiError::MissingCredential {
                remediations: vec![remediation(entry)],
            })?;
            debug!("Using configured AI provider {}", entry.key);
            return Ok((entry.construct)(settings(api_key)));
        }

        for entry in &self.entries {
            if let Some(api_key) = credential(entry) {
                debug!("Using AI provider {} found via {}", entry.key, entry.credential_var);
                return Ok((entry.construct)(settings(api_key)));
            }
        }
        Err(AiError::MissingCredential {
            remediations: self.entries.iter().map(remediation).collect(),
        })
    }

    /// Resolve against the process environment
    pub fn resolve_from_env(&self, config: &AiConfig) -> Result<Arc<dyn AiProvider>, AiError> {
        self.resolve(config, |name| std::env::var(name).ok())
    }
}

fn remediation(entry: &ProviderEntry) -> String {
    format!("{} (provider '{}')", entry.credential_var, entry.key)
}

/// Run a structured generation as a task; output is the generated object
pub async fn generate_structured(
    engine: &TaskEngine,
    http: &HttpManager,
    provider: &Result<Arc<dyn AiProvider>, AiError>,
    prompt: &str,
    schema: &Value,
) -> TaskResult {
    let name = format!("AI: {}", infer_task_name(prompt));
    engine
        .run_with(name, TaskOptions::kind(TaskKind::Ai), |scope| async move {
            let provider = match provider {
                Ok(provider) => provider,
                Err(err) => return Err(err.to_string()),
            };
            scope.output(&format!("{} ({})", provider.name(), provider.model()));
            provider
                .generate_structured(http, prompt, schema)
                .await
                .map_err(|e| e.to_string())
        })
        .await
}

async fn post_json(
    provider: &str,
    http: &HttpManager,
    url: &str,
    headers: &[(&str, &str)],
    body: &Value,
) -> Result<Value, AiError> {
    let mut request = http.request(HttpMethod::Post, url)?.json(body);
    for (name, value) in headers {
        request = request.header(*name, *value);
    }
    let response = request.send().await.map_err(HttpError::from)?;
    let status = response.status();
    let text = response.text().await.map_err(HttpError::from)?;
    if !status.is_success() {
        return Err(AiError::Status {
            provider: provider.to_string(),
            status: status.as_u16(),
            body: text,
        });
    }
    serde_json::from_str(&text).map_err(|e| AiError::Http(HttpError::InvalidJson(e)))
}

/// Chat completions API with JSON schema response format
pub struct OpenAiProvider {
    settings: ProviderSettings,
    model: String,
}

impl OpenAiProvider {
    pub const DEFAULT_BASE_URL: &'static str = "https://api.openai.com/v1";
    pub const DEFAULT_MODEL: &'static str = "gpt-4o-mini";

    pub fn new(settings: ProviderSettings) -> Self {
        let model = settings
            .model
            .clone()
            .unwrap_or_else(|| Self::DEFAULT_MODEL.to_string());
        Self { settings, model }
    }
}

#[async_trait]
impl AiProvider for OpenAiProvider {
    fn name(&self) -> &str {
        "openai"
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn generate_structured(
        &self,
        http: &HttpManager,
        prompt: &str,
        schema: &Value,
    ) -> Result<Value, AiError> {
        let base = self
            .settings
            .base_url
            .as_deref()
            .unwrap_or(Self::DEFAULT_BASE_URL)
            .trim_end_matches('/');
        let body = json!({
            "model": self.model,
            "messages": [{ "role": "user", "content": prompt }],
            "response_format": {
                "type": "json_schema",
                "json_schema": { "name": "response", "schema": schema },
            },
        });
        let auth = format!("Bearer {}", self.settings.api_key);
        let reply = post_json(
            self.name(),
            http,
            &format!("{}/chat/completions", base),
            &[("Authorization", auth.as_str())],
            &body,
        )
        .await?;

        reply
            .pointer("/choices/0/message/content")
            .and_then(Value::as_str)
            .and_then(|content| serde_json::from_str(content).ok())
            .ok_or_else(|| AiError::MalformedResponse {
                provider: self.name().to_string(),
            })
    }
}

/// Messages API, forcing a single tool call whose input is the object
pub struct AnthropicProvider {
    settings: ProviderSettings,
    model: String,
}

impl AnthropicProvider {
    pub const DEFAULT_BASE_URL: &'static str = "https://api.anthropic.com/v1";
    pub const DEFAULT_MODEL: &'static str = "claude-3-5-haiku-latest";
    const API_VERSION: &'static str = "2023-06-01";

    pub fn new(settings: ProviderSettings) -> Self {
        let model = settings
            .model
            .clone()
            .unwrap_or_else(|| Self::DEFAULT_MODEL.to_string());
        Self { settings, model }
    }
}

#[async_trait]
impl AiProvider for AnthropicProvider {
    fn name(&self) -> &str {
        "anthropic"
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn generate_structured(
        &self,
        http: &HttpManager,
        prompt: &str,
        schema: &Value,
    ) -> Result<Value, AiError> {
        let base = self
            .settings
            .base_url
            .as_deref()
            .unwrap_or(Self::DEFAULT_BASE_URL)
            .trim_end_matches('/');
        let body = json!({
            "model": self.model,
            "max_tokens": 4096,
            "messages": [{ "role": "user", "content": prompt }],
            "tools": [{
                "name": "respond",
                "description": "Respond with the requested data",
                "input_schema": schema,
            }],
            "tool_choice": { "type": "tool", "name": "respond" },
        });
        let reply = post_json(
            self.name(),
            http,
            &format!("{}/messages", base),
            &[
                ("x-api-key", self.settings.api_key.as_str()),
                ("anthropic-version", Self::API_VERSION),
            ],
            &body,
        )
        .await?;

        reply
            .get("content")
            .and_then(Value::as_array)
            .and_then(|blocks| {
                blocks
                    .iter()
                    .find(|b| b.get("type").and_then(Value::as_str) == Some("tool_use"))
            })
            .and_then(|block| block.get("input").cloned())
            .ok_or_else(|| AiError::MalformedResponse {
                provider: self.name().to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name: &str| vars.get(name).cloned()
    }

    #[test]
    fn test_first_provider_with_credentials_wins() {
        let registry = ProviderRegistry::builtin();
        let provider = registry
            .resolve(&AiConfig::default(), env(&[("ANTHROPIC_API_KEY", "k")]))
            .unwrap();
        assert_eq!(provider.name(), "anthropic");
        assert_eq!(provider.model(), AnthropicProvider::DEFAULT_MODEL);

        let provider = registry
            .resolve(
                &AiConfig::default(),
                env(&[("ANTHROPIC_API_KEY", "k"), ("OPENAI_API_KEY", "k")]),
            )
            .unwrap();
        assert_eq!(provider.name(), "openai");
    }

    #[test]
    fn test_configured_provider_and_model() {
        let config = AiConfig {
            provider: Some("Anthropic".into()),
            model: Some("claude-custom".into()),
            base_url: None,
        };
        let provider = ProviderRegistry::builtin()
            .resolve(&config, env(&[("OPENAI_API_KEY", "k"), ("ANTHROPIC_API_KEY", "k")]))
            .unwrap();
        assert_eq!(provider.name(), "anthropic");
        assert_eq!(provider.model(), "claude-custom");
    }

    #[test]
    fn test_missing_credentials_list_remediations() {
        let err = ProviderRegistry::builtin()
            .resolve(&AiConfig::default(), env(&[("OPENAI_API_KEY", " ")]))
            .err()
            .unwrap();
        let message = err.to_string();
        assert!(message.contains("  - OPENAI_API_KEY (provider 'openai')"));
        assert!(message.contains("  - ANTHROPIC_API_KEY (provider 'anthropic')"));
    }

    #[test]
    fn test_unknown_provider() {
        let config = AiConfig {
            provider: Some("oracle".into()),
            ..Default::default()
        };
        let err = ProviderRegistry::builtin().resolve(&config, env(&[])).err().unwrap();
        assert!(matches!(err, AiError::UnknownProvider { .. }));
        assert!(err.to_string().contains("openai, anthropic"));
    }
}
