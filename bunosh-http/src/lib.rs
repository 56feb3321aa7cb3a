//! HTTP primitives for bunosh
//!
//! A single configured client is shared by `fetch` tasks and the AI
//! providers.

pub mod ai;
pub mod client;
pub mod errors;
pub mod fetch;
pub mod types;

pub use ai::{generate_structured, AiError, AiProvider, ProviderRegistry, ProviderSettings};
pub use bunosh_config::HttpConfig;
pub use client::HttpManager;
pub use errors::HttpError;
pub use fetch::{fetch, fetch_response, FetchBody, FetchRequest, FetchResponse};
pub use types::{HttpMethod, UnsupportedMethod};
