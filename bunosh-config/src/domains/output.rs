//! Task output configuration

use crate::error::ConfigResult;
use crate::validation::Validatable;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// How task events are rendered
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub mode: OutputMode,
}

/// Output formatter selection
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputMode {
    /// Console for terminals, CI grouping when `CI` is set
    #[default]
    Auto,
    Console,
    Ci,
    Silent,
}

impl OutputMode {
    /// Resolve `Auto` against the `CI` environment variable
    pub fn resolve(self, ci: Option<&str>) -> OutputMode {
        match self {
            OutputMode::Auto => match ci {
                Some(value) if !value.is_empty() && value != "0" && value != "false" => {
                    OutputMode::Ci
                }
                _ => OutputMode::Console,
            },
            other => other,
        }
    }

    /// Resolve against the current process environment
    pub fn detect(self) -> OutputMode {
        self.resolve(std::env::var("CI").ok().as_deref())
    }
}

impl FromStr for OutputMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "auto" => Ok(OutputMode::Auto),
            "console" => Ok(OutputMode::Console),
            "ci" => Ok(OutputMode::Ci),
            "silent" => Ok(OutputMode::Silent),
            _ => Err(format!("Invalid output mode: {}", s)),
        }
    }
}

impl Validatable for OutputConfig {
    fn validate(&self) -> ConfigResult<()> {
        Ok(())
    }

    fn domain_name(&self) -> &'static str {
        "output"
    }
}
