//! `ApiGenerator`: the operations an outer surface (CLI, HTTP) exposes.
//!
//! Each call is independent. The only shared state is the configuration and
//! the language-model handle, both read-only.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use tracing::{debug, info, info_span, warn, Instrument};

use crate::ai::{LanguageModel, OpenAiClient, ProviderError};
use crate::config::GeneratorConfig;
use crate::enhance::{enhance_with_report, EnhancementError, EnhancementReport};
use crate::examples;
use crate::extract::{extract_detailed, ExtractedSpec, ExtractionError, ExtractionHints};
use crate::generator::{synthesize, ArtifactSet, SynthesisError};
use crate::ids::RunId;
use crate::logic::{enhance_endpoint_logic, LogicReport};
use crate::spec::ApiSpec;

/// How much of a project the language model writes.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "snake_case")]
pub enum GenerationMode {
    /// Templates only, no model involved
    #[default]
    #[value(name = "template")]
    Template,
    /// Templates, then one review pass
    #[value(name = "ai_assisted")]
    AiAssisted,
    /// Generated handler bodies for every endpoint, then the review pass
    #[value(name = "fully_ai")]
    FullyAi,
}

impl GenerationMode {
    pub const ALL: [GenerationMode; 3] = [
        GenerationMode::Template,
        GenerationMode::AiAssisted,
        GenerationMode::FullyAi,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            GenerationMode::Template => "template",
            GenerationMode::AiAssisted => "ai_assisted",
            GenerationMode::FullyAi => "fully_ai",
        }
    }

    pub fn needs_model(&self) -> bool {
        *self != GenerationMode::Template
    }
}

impl fmt::Display for GenerationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for GenerationMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "template" => Ok(GenerationMode::Template),
            "ai_assisted" => Ok(GenerationMode::AiAssisted),
            "fully_ai" => Ok(GenerationMode::FullyAi),
            other => Err(format!("unknown generation mode `{other}`")),
        }
    }
}

/// Result of [`ApiGenerator::generate_with_mode`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GenerationOutcome {
    pub artifacts: ArtifactSet,
    /// The mode asked for
    pub mode: GenerationMode,
    /// Handler logic pass, `fully_ai` only
    pub logic: Option<LogicReport>,
    /// Review pass, `ai_assisted` and `fully_ai`
    pub review: Option<EnhancementReport>,
    /// Set when an AI stage could not run; `artifacts` is then the output of
    /// the stages before it
    pub fallback: Option<String>,
}

/// Whether the AI operations can run, and with what.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AiStatus {
    pub available: bool,
    /// Provider name, when a model is configured
    pub provider: Option<String>,
    pub model: String,
    pub base_url: String,
    /// Why the model is unavailable
    pub reason: Option<String>,
    pub natural_language_generation: bool,
    pub code_review: bool,
    pub handler_generation: bool,
    /// Modes that can run right now
    pub modes: Vec<GenerationMode>,
}

pub struct ApiGenerator {
    config: GeneratorConfig,
    model: Result<Arc<dyn LanguageModel>, ProviderError>,
}

impl ApiGenerator {
    /// A generator with an explicit language model.
    pub fn new(config: GeneratorConfig, model: Arc<dyn LanguageModel>) -> Self {
        Self {
            config,
            model: Ok(model),
        }
    }

    /// A generator backed by [`OpenAiClient`].
    ///
    /// A missing API key is not an error here: template generation still
    /// works, and the AI operations report [`ProviderError::MissingApiKey`].
    pub fn from_config(config: GeneratorConfig) -> Self {
        let model = OpenAiClient::from_config(&config.ai)
            .map(|client| Arc::new(client) as Arc<dyn LanguageModel>);
        if let Err(err) = &model {
            debug!(error = %err, "language model not configured");
        }
        Self { config, model }
    }

    pub fn config(&self) -> &GeneratorConfig {
        &self.config
    }

    /// Whether the AI operations can run.
    pub fn has_model(&self) -> bool {
        self.model.is_ok()
    }

    /// [`has_model`](Self::has_model), with the details an operator needs.
    pub fn ai_status(&self) -> AiStatus {
        let available = self.has_model();
        AiStatus {
            available,
            provider: self.model.as_ref().ok().map(|model| model.name().to_string()),
            model: self.config.ai.model.clone(),
            base_url: self.config.ai.base_url.clone(),
            reason: self.model.as_ref().err().map(ToString::to_string),
            natural_language_generation: available,
            code_review: available,
            handler_generation: available,
            modes: GenerationMode::ALL
                .into_iter()
                .filter(|mode| available || !mode.needs_model())
                .collect(),
        }
    }

    fn model(&self) -> Result<&dyn LanguageModel, ProviderError> {
        self.model.as_deref().map_err(Clone::clone)
    }

    pub fn list_example_specs(&self) -> anyhow::Result<Vec<ApiSpec>> {
        examples::list_example_specs()
    }

    pub fn generate(&self, spec: &ApiSpec) -> Result<ArtifactSet, SynthesisError> {
        let span = info_span!("generate", run_id = %RunId::new());
        let _entered = span.enter();
        synthesize(spec)
    }

    /// Generate in `mode`.
    ///
    /// AI stages are best-effort: when one cannot run, the outcome carries
    /// the artifacts produced so far and the reason in `fallback`.
    ///
    /// # Errors
    ///
    /// Only when the template output itself cannot be produced.
    pub async fn generate_with_mode(
        &self,
        spec: &ApiSpec,
        mode: GenerationMode,
    ) -> Result<GenerationOutcome, SynthesisError> {
        let span = info_span!("generate", run_id = %RunId::new(), mode = %mode);
        self.run_mode(spec, mode).instrument(span).await
    }

    async fn run_mode(
        &self,
        spec: &ApiSpec,
        mode: GenerationMode,
    ) -> Result<GenerationOutcome, SynthesisError> {
        let mut outcome = GenerationOutcome {
            artifacts: synthesize(spec)?,
            mode,
            logic: None,
            review: None,
            fallback: None,
        };
        if !mode.needs_model() {
            return Ok(outcome);
        }
        let model = match self.model() {
            Ok(model) => model,
            Err(err) => {
                warn!(error = %err, "language model unavailable, keeping template output");
                outcome.fallback = Some(err.to_string());
                return Ok(outcome);
            }
        };

        if mode == GenerationMode::FullyAi {
            match enhance_endpoint_logic(model, &self.config.ai, spec, &outcome.artifacts).await {
                Ok(report) => {
                    outcome.artifacts = report.artifacts.clone();
                    outcome.logic = Some(report);
                }
                Err(err) => {
                    warn!(error = %err, "handler logic pass failed, keeping template output");
                    outcome.fallback = Some(err.to_string());
                    return Ok(outcome);
                }
            }
        }

        match enhance_with_report(model, &self.config.ai, spec, &outcome.artifacts).await {
            Ok(report) => {
                outcome.artifacts = report.artifacts.clone();
                outcome.review = Some(report);
            }
            Err(err) => {
                warn!(error = %err, "review pass failed, keeping earlier output");
                outcome.fallback = Some(err.to_string());
            }
        }
        info!(
            digest = %outcome.artifacts.digest(),
            fallback = outcome.fallback.is_some(),
            "generation finished"
        );
        Ok(outcome)
    }

    pub async fn generate_from_description(
        &self,
        description: &str,
        hints: &ExtractionHints,
    ) -> Result<ApiSpec, ExtractionError> {
        self.generate_from_description_detailed(description, hints)
            .await
            .map(|extracted| extracted.spec)
    }

    pub async fn generate_from_description_detailed(
        &self,
        description: &str,
        hints: &ExtractionHints,
    ) -> Result<ExtractedSpec, ExtractionError> {
        let model = self.model().map_err(ExtractionError::ProviderUnavailable)?;
        extract_detailed(model, &self.config.ai, description, hints)
            .instrument(info_span!("extract", run_id = %RunId::new()))
            .await
    }

    pub async fn enhance(
        &self,
        spec: &ApiSpec,
        artifacts: &ArtifactSet,
    ) -> Result<ArtifactSet, EnhancementError> {
        self.enhance_with_report(spec, artifacts)
            .await
            .map(|report| report.artifacts)
    }

    pub async fn enhance_with_report(
        &self,
        spec: &ApiSpec,
        artifacts: &ArtifactSet,
    ) -> Result<EnhancementReport, EnhancementError> {
        let model = self.model().map_err(EnhancementError::ProviderUnavailable)?;
        enhance_with_report(model, &self.config.ai, spec, artifacts)
            .instrument(info_span!("enhance", run_id = %RunId::new()))
            .await
    }

    /// One generated handler body per endpoint, see [`crate::logic`].
    pub async fn enhance_endpoint_logic(
        &self,
        spec: &ApiSpec,
        artifacts: &ArtifactSet,
    ) -> Result<LogicReport, EnhancementError> {
        let model = self.model().map_err(EnhancementError::ProviderUnavailable)?;
        enhance_endpoint_logic(model, &self.config.ai, spec, artifacts)
            .instrument(info_span!("logic", run_id = %RunId::new()))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generation_works_without_a_model() {
        let mut config = GeneratorConfig::default();
        config.ai.api_key_env = "APIFORGE_TEST_UNSET_KEY".to_string();
        let generator = ApiGenerator::from_config(config);
        assert!(!generator.has_model());

        let status = generator.ai_status();
        assert!(!status.available);
        assert!(status.provider.is_none());
        assert!(status.reason.unwrap().contains("APIFORGE_TEST_UNSET_KEY"));
        assert_eq!(status.modes, vec![GenerationMode::Template]);

        let specs = generator.list_example_specs().unwrap();
        assert_eq!(specs.len(), 3);
        assert_eq!(generator.generate(&specs[0]).unwrap().len(), 5);
    }

    #[tokio::test]
    async fn test_ai_operations_report_missing_key() {
        let mut config = GeneratorConfig::default();
        config.ai.api_key_env = "APIFORGE_TEST_UNSET_KEY".to_string();
        let generator = ApiGenerator::from_config(config);

        let err = generator
            .generate_from_description("a todo list", &ExtractionHints::default())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ExtractionError::ProviderUnavailable(ProviderError::MissingApiKey { .. })
        ));

        let spec = generator.list_example_specs().unwrap().remove(0);
        let artifacts = generator.generate(&spec).unwrap();
        assert!(matches!(
            generator.enhance(&spec, &artifacts).await,
            Err(EnhancementError::ProviderUnavailable(ProviderError::MissingApiKey { .. }))
        ));
    }

    #[test]
    fn test_generation_mode_names() {
        for mode in GenerationMode::ALL {
            assert_eq!(mode.as_str().parse::<GenerationMode>(), Ok(mode));
        }
        assert_eq!("fully-ai".parse::<GenerationMode>(), Ok(GenerationMode::FullyAi));
        assert!("magic".parse::<GenerationMode>().is_err());
        assert_eq!(
            serde_json::to_string(&GenerationMode::AiAssisted).unwrap(),
            "\"ai_assisted\""
        );
    }

    #[tokio::test]
    async fn test_ai_modes_fall_back_without_a_model() {
        let mut config = GeneratorConfig::default();
        config.ai.api_key_env = "APIFORGE_TEST_UNSET_KEY".to_string();
        let generator = ApiGenerator::from_config(config);
        let spec = generator.list_example_specs().unwrap().remove(0);
        let baseline = generator.generate(&spec).unwrap();

        let outcome = generator
            .generate_with_mode(&spec, GenerationMode::FullyAi)
            .await
            .unwrap();
        assert_eq!(outcome.artifacts, baseline);
        assert!(outcome.fallback.is_some());
        assert!(outcome.logic.is_none() && outcome.review.is_none());
    }
}
