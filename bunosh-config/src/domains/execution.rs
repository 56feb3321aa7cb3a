//! Task execution configuration

use crate::error::ConfigResult;
use crate::validation::{validate_required_string, Validatable};
use serde::{Deserialize, Serialize};

/// Task execution configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutionConfig {
    /// Terminate the process as soon as a task fails
    pub stop_on_failure: bool,

    /// Never report a failing exit code
    pub ignore_failures: bool,

    /// Test mode: failures are recorded but the exit code stays 0
    pub test_mode: bool,

    /// Shell used by `exec`; invoked as `<shell> -c <command>`
    pub shell: String,
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            stop_on_failure: false,
            ignore_failures: false,
            test_mode: false,
            shell: default_shell().to_string(),
        }
    }
}

/// Platform shell used when none is configured
pub fn default_shell() -> &'static str {
    if cfg!(windows) {
        "cmd"
    } else {
        "sh"
    }
}

impl Validatable for ExecutionConfig {
    fn validate(&self) -> ConfigResult<()> {
        validate_required_string(&self.shell, "shell", self.domain_name())?;
        if self.stop_on_failure && self.ignore_failures {
            return Err(self.validation_error(
                "stop_on_failure and ignore_failures cannot both be enabled",
            ));
        }
        Ok(())
    }

    fn domain_name(&self) -> &'static str {
        "execution"
    }
}
