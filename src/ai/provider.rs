use async_trait::async_trait;
use serde::Serialize;
use std::time::Duration;
use tracing::debug;

use super::error::ProviderError;

/// Hint asking the service for a single JSON document.
pub const JSON_FORMAT: &str = "json";

/// One prompt sent to a [`LanguageModel`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompletionRequest {
    /// Role instruction placed before the prompt
    pub system: Option<String>,
    pub prompt: String,
    /// `"json"` or `"text"`; providers map it onto their own knobs
    pub response_format_hint: String,
    pub temperature: f32,
    pub max_tokens: u32,
}

impl CompletionRequest {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            system: None,
            prompt: prompt.into(),
            response_format_hint: "text".to_string(),
            temperature: 0.7,
            max_tokens: 1024,
        }
    }

    pub fn with_system(mut self, system: impl Into<String>) -> Self {
        self.system = Some(system.into());
        self
    }

    pub fn json(mut self) -> Self {
        self.response_format_hint = JSON_FORMAT.to_string();
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn wants_json(&self) -> bool {
        self.response_format_hint == JSON_FORMAT
    }
}

/// The service's raw textual answer. Nothing about its structure is trusted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Completion {
    pub text: String,
}

impl Completion {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }
}

/// An opaque text-in, text-out oracle.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// Short identifier used in logs
    fn name(&self) -> &str;

    async fn complete(&self, request: CompletionRequest) -> Result<Completion, ProviderError>;
}

/// Run one completion with a hard deadline.
///
/// Elapsed deadlines become [`ProviderError::Timeout`] and blank answers
/// become [`ProviderError::EmptyResponse`].
pub async fn complete_within(
    model: &dyn LanguageModel,
    request: CompletionRequest,
    limit: Duration,
) -> Result<Completion, ProviderError> {
    debug!(
        provider = model.name(),
        prompt_chars = request.prompt.len(),
        max_tokens = request.max_tokens,
        "sending completion request"
    );
    let completion = tokio::time::timeout(limit, model.complete(request))
        .await
        .map_err(|_| ProviderError::Timeout { after: limit })??;
    if completion.text.trim().is_empty() {
        return Err(ProviderError::EmptyResponse);
    }
    debug!(
        provider = model.name(),
        response_chars = completion.text.len(),
        "completion received"
    );
    Ok(completion)
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Fixed(&'static str);

    #[async_trait]
    impl LanguageModel for Fixed {
        fn name(&self) -> &str {
            "fixed"
        }

        async fn complete(&self, _: CompletionRequest) -> Result<Completion, ProviderError> {
            Ok(Completion::new(self.0))
        }
    }

    struct Stalled;

    #[async_trait]
    impl LanguageModel for Stalled {
        fn name(&self) -> &str {
            "stalled"
        }

        async fn complete(&self, _: CompletionRequest) -> Result<Completion, ProviderError> {
            tokio::time::sleep(Duration::from_secs(30)).await;
            Ok(Completion::new("late"))
        }
    }

    #[test]
    fn test_request_builder() {
        let request = CompletionRequest::new("hi")
            .with_system("be brief")
            .json()
            .with_temperature(0.2)
            .with_max_tokens(10);
        assert!(request.wants_json());
        assert_eq!(request.system.as_deref(), Some("be brief"));
        assert_eq!(request.max_tokens, 10);
        assert!(!CompletionRequest::new("hi").wants_json());
    }

    #[tokio::test]
    async fn test_blank_answer_is_empty_response() {
        let err = complete_within(&Fixed("  \n"), CompletionRequest::new("p"), Duration::from_secs(1))
            .await
            .unwrap_err();
        assert_eq!(err, ProviderError::EmptyResponse);
    }

    #[tokio::test(start_paused = true)]
    async fn test_deadline_becomes_timeout() {
        let err = complete_within(&Stalled, CompletionRequest::new("p"), Duration::from_secs(2))
            .await
            .unwrap_err();
        assert!(err.is_timeout());
    }
}
