//! Domain-driven configuration for bunosh
//!
//! Settings are grouped by functional domain, loaded from an optional YAML
//! file and then overridden by `BUNOSH_*` environment variables.

pub mod domains;
pub mod error;
pub mod loader;
pub mod validation;

pub use domains::{
    ai::AiConfig,
    execution::ExecutionConfig,
    http::HttpConfig,
    logging::{LogFormat, LogLevel, LoggingConfig},
    output::{OutputConfig, OutputMode},
    BunoshConfig,
};
pub use error::{ConfigError, ConfigResult};
pub use loader::ConfigLoader;
pub use validation::Validatable;
