//! Domain-specific configuration modules

pub mod ai;
pub mod execution;
pub mod http;
pub mod logging;
pub mod output;
pub mod utils;

use crate::error::ConfigResult;
use crate::validation::Validatable;
use serde::{Deserialize, Serialize};

/// Bunosh configuration combining all domains
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BunoshConfig {
    /// Task execution configuration
    pub execution: execution::ExecutionConfig,

    /// HTTP client configuration
    pub http: http::HttpConfig,

    /// Logging configuration
    pub logging: logging::LoggingConfig,

    /// Task output configuration
    pub output: output::OutputConfig,

    /// AI assistant configuration
    pub ai: ai::AiConfig,
}

impl BunoshConfig {
    /// Validate all domain configurations
    pub fn validate_all(&self) -> ConfigResult<()> {
        self.execution.validate()?;
        self.http.validate()?;
        self.logging.validate()?;
        self.output.validate()?;
        self.ai.validate()?;
        Ok(())
    }

    /// Generate a sample configuration file
    pub fn generate_sample() -> String {
        serde_yaml::to_string(&BunoshConfig::default())
            .unwrap_or_else(|_| "# Failed to generate sample config".to_string())
    }
}
