//! # Natural-Language Spec Extractor
//!
//! Turns a free-text request ("an API for a lending library...") into a
//! validated [`ApiSpec`] by asking a [`LanguageModel`] for a JSON document and
//! interpreting that document field by field.
//!
//! The answer is never deserialized straight into an `ApiSpec`. Each field is
//! read from an untyped JSON value, defaults are filled in, enum spellings go
//! through the alias table, and only then does the candidate meet
//! [`ApiSpec::validate`].
//!
//! ## Calls per extraction
//!
//! At most two calls per extraction:
//!
//! - provider failure on the first call: the same prompt is sent again
//! - unusable answer on the first call: a corrective prompt echoing the problem is sent
//!
//! Whatever the second call yields is final.

use serde::Serialize;
use serde_json::{Map, Value};
use tracing::{info, warn};

use crate::ai::prompts::{self, ExtractionPrompt, EXTRACTION_SYSTEM};
use crate::ai::{complete_within, json, CompletionRequest, LanguageModel, PromptError, ProviderError};
use crate::config::AiConfig;
use crate::spec::{
    ApiSpec, AuthMethod, Database, Endpoint, Framework, HttpMethod, Parameter, ParameterLocation,
    SpecError,
};

const DEFAULT_CONFIDENCE: f64 = 0.8;

/// Why no specification could be extracted.
#[derive(Debug, thiserror::Error)]
pub enum ExtractionError {
    /// The service failed, timed out or answered with nothing
    #[error("language model unavailable")]
    ProviderUnavailable(#[source] ProviderError),

    /// The service answered, twice, with something that is not a specification document
    #[error("language model response could not be used: {reason}")]
    MalformedResponse { reason: String },

    #[error("extracted specification is invalid")]
    InvalidSpec(#[source] SpecError),

    #[error(transparent)]
    Prompt(#[from] PromptError),
}

/// Steering for the extraction prompt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExtractionHints {
    pub domain: Option<String>,
    /// `simple`, `medium` or `complex`
    pub complexity: String,
    pub include_auth: bool,
    pub include_admin: bool,
}

impl Default for ExtractionHints {
    fn default() -> Self {
        Self {
            domain: None,
            complexity: "medium".to_string(),
            include_auth: true,
            include_admin: false,
        }
    }
}

impl ExtractionHints {
    pub fn with_domain(mut self, domain: impl Into<String>) -> Self {
        self.domain = Some(domain.into());
        self
    }

    pub fn with_complexity(mut self, complexity: impl Into<String>) -> Self {
        self.complexity = complexity.into();
        self
    }
}

/// A validated spec plus the model's commentary on it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExtractedSpec {
    pub spec: ApiSpec,
    pub reasoning: String,
    pub suggestions: Vec<String>,
    /// Self-reported, clamped into `[0, 1]`
    pub confidence_score: f64,
}

/// Extract a specification from `description`.
///
/// # Errors
///
/// See [`ExtractionError`]. An invalid candidate is returned as
/// [`ExtractionError::InvalidSpec`] without being repaired or re-prompted.
/// A blank `description` is rejected the same way before the model is called.
pub async fn extract(
    model: &dyn LanguageModel,
    config: &AiConfig,
    description: &str,
    hints: &ExtractionHints,
) -> Result<ApiSpec, ExtractionError> {
    extract_detailed(model, config, description, hints)
        .await
        .map(|extracted| extracted.spec)
}

/// [`extract`], keeping the reasoning, suggestions and confidence score.
pub async fn extract_detailed(
    model: &dyn LanguageModel,
    config: &AiConfig,
    description: &str,
    hints: &ExtractionHints,
) -> Result<ExtractedSpec, ExtractionError> {
    if description.trim().is_empty() {
        return Err(ExtractionError::InvalidSpec(SpecError::EmptyField {
            field: "description".to_string(),
        }));
    }
    let input = ExtractionPrompt {
        description: description.trim(),
        domain: hints.domain.as_deref().unwrap_or("general"),
        complexity: &hints.complexity,
        include_auth: hints.include_auth,
        include_admin: hints.include_admin,
    };
    let request = |prompt: String| {
        CompletionRequest::new(prompt)
            .with_system(EXTRACTION_SYSTEM)
            .json()
            .with_temperature(config.extraction_temperature)
            .with_max_tokens(config.extraction_max_tokens)
    };
    let first = request(prompts::extraction(&input)?);

    let (text, retried) = match complete_within(model, first.clone(), config.timeout()).await {
        Ok(completion) => (completion.text, false),
        Err(err) => {
            warn!(provider = model.name(), error = %err, "extraction call failed, retrying once");
            let completion = complete_within(model, first, config.timeout())
                .await
                .map_err(ExtractionError::ProviderUnavailable)?;
            (completion.text, true)
        }
    };

    let extracted = match interpret(&text) {
        Ok(extracted) => extracted,
        Err(Rejection::Invalid(err)) => return Err(ExtractionError::InvalidSpec(err)),
        Err(Rejection::Malformed(reason)) if retried => {
            return Err(ExtractionError::MalformedResponse { reason })
        }
        Err(Rejection::Malformed(reason)) => {
            warn!(reason = %reason, "extraction answer unusable, sending corrective prompt");
            let corrective = request(prompts::correction(&input, &reason)?);
            let completion = complete_within(model, corrective, config.timeout())
                .await
                .map_err(ExtractionError::ProviderUnavailable)?;
            match interpret(&completion.text) {
                Ok(extracted) => extracted,
                Err(Rejection::Invalid(err)) => return Err(ExtractionError::InvalidSpec(err)),
                Err(Rejection::Malformed(reason)) => {
                    return Err(ExtractionError::MalformedResponse { reason })
                }
            }
        }
    };

    info!(
        api = %extracted.spec.name,
        framework = %extracted.spec.framework,
        database = %extracted.spec.database,
        auth = %extracted.spec.auth_method,
        endpoints = extracted.spec.endpoints.len(),
        confidence = extracted.confidence_score,
        "extracted specification"
    );
    Ok(extracted)
}

/// Why an answer was not accepted.
#[derive(Debug, Clone, PartialEq)]
enum Rejection {
    /// Syntax or shape problem; worth a corrective prompt
    Malformed(String),
    /// Well-formed but not a valid specification
    Invalid(SpecError),
}

impl From<SpecError> for Rejection {
    fn from(err: SpecError) -> Self {
        Rejection::Invalid(err)
    }
}

/// Read a model answer into a validated spec.
fn interpret(text: &str) -> Result<ExtractedSpec, Rejection> {
    let document =
        json::parse_document(text).map_err(|e| Rejection::Malformed(format!("invalid JSON: {e}")))?;
    let root = document
        .as_object()
        .ok_or_else(|| Rejection::Malformed("top level must be a JSON object".to_string()))?;

    let spec = ApiSpec {
        name: required_str(root, &["name", "api_name"], "name")?,
        description: required_str(root, &["description"], "description")?,
        version: optional_str(root, &["version"], "version")?
            .unwrap_or_else(|| "1.0.0".to_string()),
        framework: optional_enum(root, &["framework"], Framework::FastApi)?,
        database: optional_enum(root, &["database"], Database::Sqlite)?,
        auth_method: optional_enum(root, &["auth_method", "authentication"], AuthMethod::None)?,
        endpoints: endpoints(root)?,
    };
    spec.validate()?;

    Ok(ExtractedSpec {
        spec,
        reasoning: root
            .get("reasoning")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string(),
        suggestions: strings(root.get("suggestions")),
        confidence_score: root
            .get("confidence_score")
            .and_then(Value::as_f64)
            .unwrap_or(DEFAULT_CONFIDENCE)
            .clamp(0.0, 1.0),
    })
}

/// First present, non-null key among `keys`.
fn lookup<'a>(object: &'a Map<String, Value>, keys: &[&str]) -> Option<&'a Value> {
    keys.iter()
        .filter_map(|key| object.get(*key))
        .find(|value| !value.is_null())
}

fn optional_str(
    object: &Map<String, Value>,
    keys: &[&str],
    field: &str,
) -> Result<Option<String>, Rejection> {
    match lookup(object, keys) {
        None => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(_) => Err(Rejection::Malformed(format!("`{field}` must be a string"))),
    }
}

fn required_str(object: &Map<String, Value>, keys: &[&str], field: &str) -> Result<String, Rejection> {
    optional_str(object, keys, field)?
        .ok_or_else(|| Rejection::Malformed(format!("missing string field `{field}`")))
}

/// Absent means `default`; unknown spellings are [`SpecError::UnknownEnumValue`].
fn optional_enum<T>(object: &Map<String, Value>, keys: &[&str], default: T) -> Result<T, Rejection>
where
    T: std::str::FromStr<Err = SpecError>,
{
    match optional_str(object, keys, keys[0])? {
        Some(raw) => Ok(raw.parse()?),
        None => Ok(default),
    }
}

fn endpoints(root: &Map<String, Value>) -> Result<Vec<Endpoint>, Rejection> {
    let items = root
        .get("endpoints")
        .and_then(Value::as_array)
        .ok_or_else(|| Rejection::Malformed("`endpoints` must be an array".to_string()))?;

    items
        .iter()
        .enumerate()
        .map(|(index, item)| {
            let object = item.as_object().ok_or_else(|| {
                Rejection::Malformed(format!("endpoints[{index}] must be an object"))
            })?;
            endpoint(index, object)
        })
        .collect()
}

fn endpoint(index: usize, object: &Map<String, Value>) -> Result<Endpoint, Rejection> {
    let field = |name: &str| format!("endpoints[{index}].{name}");
    let method: HttpMethod = required_str(object, &["method"], &field("method"))?.parse()?;

    let mut endpoint = Endpoint::new(
        method,
        required_str(object, &["path"], &field("path"))?,
        required_str(object, &["description"], &field("description"))?,
    );
    endpoint.parameters = parameters(index, object)?;
    endpoint.request_body_example = example(object, &["request_body_example", "request_body"]);
    endpoint.response_example = example(object, &["response_example", "responses"]);
    endpoint.tags = strings(object.get("tags"));
    Ok(endpoint)
}

fn parameters(index: usize, object: &Map<String, Value>) -> Result<Vec<Parameter>, Rejection> {
    let items = match lookup(object, &["parameters"]) {
        None => return Ok(Vec::new()),
        Some(Value::Array(items)) => items,
        Some(_) => {
            return Err(Rejection::Malformed(format!(
                "endpoints[{index}].parameters must be an array of objects"
            )))
        }
    };

    items
        .iter()
        .enumerate()
        .map(|(p, item)| {
            let field = |name: &str| format!("endpoints[{index}].parameters[{p}].{name}");
            let param = item.as_object().ok_or_else(|| {
                Rejection::Malformed(format!("endpoints[{index}].parameters[{p}] must be an object"))
            })?;
            let name = required_str(param, &["name"], &field("name"))?;
            let location: ParameterLocation =
                required_str(param, &["location", "in"], &field("location"))?.parse()?;
            let required = match lookup(param, &["required"]) {
                None => location == ParameterLocation::Path,
                Some(Value::Bool(b)) => *b,
                Some(_) => {
                    return Err(Rejection::Malformed(format!(
                        "{} must be a boolean",
                        field("required")
                    )))
                }
            };
            Ok(Parameter {
                name,
                location,
                required,
            })
        })
        .collect()
}

/// Example payloads are documentation only; a string holding JSON is unpacked.
fn example(object: &Map<String, Value>, keys: &[&str]) -> Option<Value> {
    match lookup(object, keys)? {
        Value::String(s) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                return None;
            }
            Some(serde_json::from_str(trimmed).unwrap_or_else(|_| Value::String(s.clone())))
        }
        other => Some(other.clone()),
    }
}

fn strings(value: Option<&Value>) -> Vec<String> {
    value
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}
