use std::time::Duration;

use thiserror::Error;

/// Failures of the language-model service itself.
///
/// A response that arrived but cannot be used is not a `ProviderError`; the
/// caller decides what a malformed answer means.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ProviderError {
    /// The environment variable holding the API key is unset or empty
    #[error("API key not found in environment variable `{var}`")]
    MissingApiKey { var: String },

    #[error("language model did not answer within {}s", after.as_secs())]
    Timeout { after: Duration },

    /// Authentication failed (never includes key details)
    #[error("authentication with the language model service failed")]
    Auth,

    #[error("rate limited by the language model service")]
    RateLimited,

    #[error("language model service returned HTTP {status}")]
    Status { status: u16 },

    #[error("network error: {0}")]
    Network(String),

    #[error("language model returned an empty response")]
    EmptyResponse,

    /// The HTTP body was not a chat completion document
    #[error("unexpected response body: {0}")]
    Decode(String),

    #[error("configuration error: {0}")]
    Config(String),
}

impl ProviderError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, ProviderError::Timeout { .. })
    }
}

impl From<reqwest::Error> for ProviderError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ProviderError::Network("request timed out".to_string())
        } else if err.is_decode() {
            ProviderError::Decode(err.to_string())
        } else {
            ProviderError::Network(err.to_string())
        }
    }
}

/// A prompt template failed to render.
#[derive(Debug, Error)]
#[error("failed to render the `{name}` prompt")]
pub struct PromptError {
    pub name: &'static str,
    #[source]
    pub source: minijinja::Error,
}
