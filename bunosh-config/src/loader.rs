//! Configuration loading and environment variable handling

use crate::domains::utils::parse_bool;
use crate::domains::BunoshConfig;
use crate::error::{ConfigError, ConfigResult};
use std::path::Path;
use std::str::FromStr;
use tracing::debug;

/// Configuration loader with environment variable support
pub struct ConfigLoader {
    /// Environment variable prefix
    prefix: String,
}

impl ConfigLoader {
    /// Create a new config loader with the `BUNOSH` prefix
    pub fn new() -> Self {
        Self {
            prefix: "BUNOSH".to_string(),
        }
    }

    /// Create a new config loader with custom prefix
    pub fn with_prefix(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    /// Load configuration from a YAML file with environment overrides
    pub fn from_file(&self, path: impl AsRef<Path>) -> ConfigResult<BunoshConfig> {
        let path = path.as_ref();
        debug!("Loading configuration from {}", path.display());
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::FileReadError {
            path: path.to_path_buf(),
            source,
        })?;
        let mut config: BunoshConfig = if content.trim().is_empty() {
            BunoshConfig::default()
        } else {
            serde_yaml::from_str(&content).map_err(|source| ConfigError::ParseError {
                path: path.to_path_buf(),
                source,
            })?
        };

        self.apply_env_overrides(&mut config)?;
        config.validate_all()?;
        Ok(config)
    }

    /// Load configuration from environment variables only
    pub fn from_env(&self) -> ConfigResult<BunoshConfig> {
        let mut config = BunoshConfig::default();
        self.apply_env_overrides(&mut config)?;
        config.validate_all()?;
        Ok(config)
    }

    /// Load configuration with fallback chain
    pub fn load(&self, config_path: Option<impl AsRef<Path>>) -> ConfigResult<BunoshConfig> {
        match config_path {
            Some(path) => self.from_file(path),
            None => self.from_env(),
        }
    }

    fn apply_env_overrides(&self, config: &mut BunoshConfig) -> ConfigResult<()> {
        self.apply_execution_overrides(&mut config.execution)?;
        self.apply_http_overrides(&mut config.http)?;
        self.apply_logging_overrides(&mut config.logging)?;
        self.apply_output_overrides(&mut config.output)?;
        self.apply_ai_overrides(&mut config.ai);
        Ok(())
    }

    fn apply_execution_overrides(
        &self,
        config: &mut crate::domains::execution::ExecutionConfig,
    ) -> ConfigResult<()> {
        if let Some(value) = self.bool_var("STOP_ON_FAILURE")? {
            config.stop_on_failure = value;
        }
        if let Some(value) = self.bool_var("IGNORE_FAILURES")? {
            config.ignore_failures = value;
        }
        if let Some(value) = self.bool_var("TEST_MODE")? {
            config.test_mode = value;
        }
        if let Ok(shell) = self.get_env_var("SHELL") {
            config.shell = shell;
        }
        Ok(())
    }

    fn apply_http_overrides(
        &self,
        config: &mut crate::domains::http::HttpConfig,
    ) -> ConfigResult<()> {
        if let Ok(timeout) = self.get_env_var("HTTP_TIMEOUT") {
            let seconds: u64 = timeout
                .parse()
                .map_err(|e| ConfigError::EnvError(format!("Invalid HTTP_TIMEOUT: {}", e)))?;
            config.timeout = std::time::Duration::from_secs(seconds);
        }

        if let Ok(user_agent) = self.get_env_var("HTTP_USER_AGENT") {
            config.user_agent = user_agent;
        }

        if let Some(verify_ssl) = self.bool_var("HTTP_VERIFY_SSL")? {
            config.verify_ssl = verify_ssl;
        }

        Ok(())
    }

    fn apply_logging_overrides(
        &self,
        config: &mut crate::domains::logging::LoggingConfig,
    ) -> ConfigResult<()> {
        if let Ok(log_level) = self.get_env_var("LOG_LEVEL") {
            config.level = Some(
                crate::domains::logging::LogLevel::from_str(&log_level)
                    .map_err(|_| ConfigError::EnvError(format!("Invalid LOG_LEVEL: {}", log_level)))?,
            );
        }

        if let Ok(format) = self.get_env_var("LOG_FORMAT") {
            config.format = crate::domains::logging::LogFormat::from_str(&format)
                .map_err(|_| ConfigError::EnvError(format!("Invalid LOG_FORMAT: {}", format)))?;
        }

        Ok(())
    }

    fn apply_output_overrides(
        &self,
        config: &mut crate::domains::output::OutputConfig,
    ) -> ConfigResult<()> {
        if let Ok(mode) = self.get_env_var("OUTPUT") {
            config.mode = crate::domains::output::OutputMode::from_str(&mode)
                .map_err(|_| ConfigError::EnvError(format!("Invalid OUTPUT: {}", mode)))?;
        }
        Ok(())
    }

    fn apply_ai_overrides(&self, config: &mut crate::domains::ai::AiConfig) {
        if let Ok(provider) = self.get_env_var("AI_PROVIDER") {
            config.provider = Some(provider);
        }
        if let Ok(model) = self.get_env_var("AI_MODEL") {
            config.model = Some(model);
        }
        if let Ok(url) = self.get_env_var("AI_BASE_URL") {
            config.base_url = Some(url);
        }
    }

    fn bool_var(&self, name: &str) -> ConfigResult<Option<bool>> {
        match self.get_env_var(name) {
            Ok(value) => parse_bool(&value)
                .map(Some)
                .ok_or_else(|| ConfigError::EnvError(format!("Invalid {}: {}", name, value))),
            Err(_) => Ok(None),
        }
    }

    /// Get environment variable with prefix
    fn get_env_var(&self, name: &str) -> Result<String, std::env::VarError> {
        std::env::var(format!("{}_{}", self.prefix, name))
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}
