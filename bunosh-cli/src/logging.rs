//! Tracing subscriber setup
//!
//! Logs go to stderr so task output on stdout stays clean.

use anyhow::Result;
use bunosh_config::{LogFormat, LoggingConfig};
use tracing::debug;
use tracing_subscriber::EnvFilter;

const DEFAULT_LEVEL: &str = "warn";

/// Filter directive: `--log-level`, then configuration, then `RUST_LOG`
pub fn filter_directive(
    cli_level: Option<&str>,
    config: &LoggingConfig,
    rust_log: Option<&str>,
) -> String {
    cli_level
        .map(str::to_string)
        .or_else(|| config.level.map(|level| level.as_str().to_string()))
        .or_else(|| rust_log.filter(|v| !v.trim().is_empty()).map(str::to_string))
        .unwrap_or_else(|| DEFAULT_LEVEL.to_string())
}

pub fn init_tracing(cli_level: Option<&str>, config: &LoggingConfig) -> Result<()> {
    let rust_log = std::env::var("RUST_LOG").ok();
    let directive = filter_directive(cli_level, config, rust_log.as_deref());
    let env_filter = EnvFilter::try_new(&directive).unwrap_or_else(|_| {
        eprintln!("Invalid log level '{}', falling back to '{}'", directive, DEFAULT_LEVEL);
        EnvFilter::new(DEFAULT_LEVEL)
    });

    let builder = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr);
    let installed = match config.format {
        LogFormat::Text => builder.try_init(),
        LogFormat::Compact => builder.compact().try_init(),
        LogFormat::Json => builder.json().try_init(),
    };
    // a subscriber may already be installed when embedded in tests
    if installed.is_ok() {
        debug!("Tracing initialized with '{}'", directive);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use bunosh_config::LogLevel;

    #[test]
    fn test_precedence() {
        let config = LoggingConfig {
            level: Some(LogLevel::Info),
            ..LoggingConfig::default()
        };
        assert_eq!(filter_directive(Some("trace"), &config, Some("debug")), "trace");
        assert_eq!(filter_directive(None, &config, Some("debug")), "info");
        assert_eq!(
            filter_directive(None, &LoggingConfig::default(), Some("bunosh=debug")),
            "bunosh=debug"
        );
        assert_eq!(filter_directive(None, &LoggingConfig::default(), Some(" ")), "warn");
        assert_eq!(filter_directive(None, &LoggingConfig::default(), None), "warn");
    }
}
