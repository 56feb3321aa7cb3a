//! AI assistant configuration

use crate::error::ConfigResult;
use crate::validation::{validate_required_string, validate_url, Validatable};
use serde::{Deserialize, Serialize};

/// AI provider selection; credentials always come from the environment
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AiConfig {
    /// Provider key (`openai`, `anthropic`); unset picks the first provider with credentials
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,

    /// Model name passed to the provider
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,

    /// Override of the provider API base URL
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
}

impl Validatable for AiConfig {
    fn validate(&self) -> ConfigResult<()> {
        if let Some(ref provider) = self.provider {
            validate_required_string(provider, "provider", self.domain_name())?;
        }
        if let Some(ref model) = self.model {
            validate_required_string(model, "model", self.domain_name())?;
        }
        if let Some(ref url) = self.base_url {
            validate_url(url, "base_url", self.domain_name())?;
        }
        Ok(())
    }

    fn domain_name(&self) -> &'static str {
        "ai"
    }
}
