//! # AI Enhancement Pass
//!
//! Best-effort review of a synthesized [`ArtifactSet`]. The model is asked for
//! improved versions of individual artifacts; each proposal is checked before
//! it replaces anything, and a proposal that fails a check is dropped, not
//! reported as an error.
//!
//! ## Checks
//!
//! | Proposal | Discarded when |
//! |---|---|
//! | any | role is not one of the five, content is not text, empty, or unchanged |
//! | `main` | registers routes outside the recognised forms, or declared routes differ from the specification's endpoints |
//! | `documentation` | `### METHOD /path` headings differ from the endpoints, in order |
//! | `dependencies` (Express) | `package.json` is not a JSON object |
//!
//! The worst outcome is the input set returned unchanged. There are no retries.

use serde::Serialize;
use serde_json::{Map, Value};
use std::fmt;
use std::time::Duration;
use tracing::{info, warn};

use crate::ai::prompts::{self, REVIEW_SYSTEM};
use crate::ai::{complete_within, json, CompletionRequest, LanguageModel, PromptError, ProviderError};
use crate::config::AiConfig;
use crate::generator::scan::{
    documentation_matches_spec, has_unrecognised_routing, main_matches_spec,
};
use crate::generator::{ArtifactRole, ArtifactSet, SynthesisError};
use crate::spec::{ApiSpec, Framework, SpecError};

/// Why the enhancement pass could not run at all.
#[derive(Debug, thiserror::Error)]
pub enum EnhancementError {
    #[error("language model did not answer within {}s", after.as_secs())]
    Timeout { after: Duration },

    #[error("language model unavailable")]
    ProviderUnavailable(#[source] ProviderError),

    #[error("cannot enhance an invalid specification")]
    InvalidSpec(#[from] SpecError),

    #[error("artifacts were generated for {artifacts}, the specification targets {spec}")]
    FrameworkMismatch { spec: Framework, artifacts: Framework },

    #[error(transparent)]
    Prompt(#[from] PromptError),

    #[error(transparent)]
    Synthesis(#[from] SynthesisError),
}

impl From<ProviderError> for EnhancementError {
    fn from(err: ProviderError) -> Self {
        match err {
            ProviderError::Timeout { after } => EnhancementError::Timeout { after },
            other => EnhancementError::ProviderUnavailable(other),
        }
    }
}

/// Why a proposal was not merged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DiscardReason {
    UnknownRole,
    NotText,
    Empty,
    Unchanged,
    EndpointSetChanged,
    UnrecognisedRouting,
    DocumentationIncomplete,
    InvalidManifest,
}

impl fmt::Display for DiscardReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            DiscardReason::UnknownRole => "not an artifact role",
            DiscardReason::NotText => "content is not a string",
            DiscardReason::Empty => "content is empty",
            DiscardReason::Unchanged => "content is unchanged",
            DiscardReason::EndpointSetChanged => "declared routes differ from the specification",
            DiscardReason::UnrecognisedRouting => "registers routes the scan cannot verify",
            DiscardReason::DocumentationIncomplete => {
                "endpoint headings differ from the specification"
            }
            DiscardReason::InvalidManifest => "package manifest is not a JSON object",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DiscardedProposal {
    /// As named by the model, which may not be a real role
    pub role: String,
    pub reason: DiscardReason,
}

/// One finding of the review.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReviewIssue {
    /// `security`, `performance`, `style` or `logic`
    pub kind: String,
    pub description: String,
    pub severity: String,
    pub suggestion: String,
}

/// Everything the pass produced.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnhancementReport {
    pub artifacts: ArtifactSet,
    pub accepted: Vec<ArtifactRole>,
    pub discarded: Vec<DiscardedProposal>,
    /// Suggestions that would need a specification change, plus free-text tips
    pub recommendations: Vec<String>,
    pub issues: Vec<ReviewIssue>,
    /// 0-100, when the model reported one
    pub quality_score: Option<u8>,
}

impl EnhancementReport {
    fn unchanged(artifacts: &ArtifactSet) -> Self {
        Self {
            artifacts: artifacts.clone(),
            accepted: Vec::new(),
            discarded: Vec::new(),
            recommendations: Vec::new(),
            issues: Vec::new(),
            quality_score: None,
        }
    }

    pub fn is_noop(&self) -> bool {
        self.accepted.is_empty()
    }
}

/// Review `artifacts` and merge the proposals that keep them consistent with `spec`.
///
/// # Errors
///
/// Only when the pass cannot run: provider failure, timeout, or inputs that
/// do not belong together. Unusable proposals are never errors.
pub async fn enhance(
    model: &dyn LanguageModel,
    config: &AiConfig,
    spec: &ApiSpec,
    artifacts: &ArtifactSet,
) -> Result<ArtifactSet, EnhancementError> {
    enhance_with_report(model, config, spec, artifacts)
        .await
        .map(|report| report.artifacts)
}

/// [`enhance`], reporting what was accepted, discarded and recommended.
pub async fn enhance_with_report(
    model: &dyn LanguageModel,
    config: &AiConfig,
    spec: &ApiSpec,
    artifacts: &ArtifactSet,
) -> Result<EnhancementReport, EnhancementError> {
    spec.validate()?;
    if artifacts.framework() != spec.framework {
        return Err(EnhancementError::FrameworkMismatch {
            spec: spec.framework,
            artifacts: artifacts.framework(),
        });
    }

    let request = CompletionRequest::new(prompts::review(spec, artifacts)?)
        .with_system(REVIEW_SYSTEM)
        .json()
        .with_temperature(config.review_temperature)
        .with_max_tokens(config.review_max_tokens);
    let completion = complete_within(model, request, config.timeout()).await?;

    let report = merge_review(spec, artifacts, &completion.text);
    info!(
        api = %spec.name,
        accepted = report.accepted.len(),
        discarded = report.discarded.len(),
        recommendations = report.recommendations.len(),
        quality_score = ?report.quality_score,
        digest = %report.artifacts.digest(),
        "enhancement pass finished"
    );
    Ok(report)
}

/// Apply a raw review answer to `artifacts`. Never fails.
pub fn merge_review(spec: &ApiSpec, artifacts: &ArtifactSet, answer: &str) -> EnhancementReport {
    let mut report = EnhancementReport::unchanged(artifacts);

    let document = match json::parse_document(answer) {
        Ok(Value::Object(document)) => document,
        Ok(_) => {
            warn!("review answer is not a JSON object, keeping artifacts");
            return report;
        }
        Err(err) => {
            warn!(error = %err, "review answer is not JSON, keeping artifacts");
            return report;
        }
    };

    report.quality_score = document
        .get("quality_score")
        .and_then(Value::as_f64)
        .map(|score| score.clamp(0.0, 100.0).round() as u8);
    report.issues = issues(document.get("issues"));
    report.recommendations = ["recommendations", "performance_tips", "security_recommendations"]
        .iter()
        .flat_map(|key| strings(document.get(*key)))
        .collect();

    for (name, content) in proposals(&document) {
        let Some(role) = ArtifactRole::parse(&name) else {
            discard(&mut report, name, DiscardReason::UnknownRole);
            continue;
        };
        let Some(content) = content.as_str() else {
            discard(&mut report, name, DiscardReason::NotText);
            continue;
        };
        match check(spec, &report.artifacts, role, content) {
            Ok(()) => {
                report.artifacts = report.artifacts.with_content(role, content.to_string());
                report.accepted.push(role);
            }
            Err(reason) => discard(&mut report, name, reason),
        }
    }
    report
}

fn discard(report: &mut EnhancementReport, role: String, reason: DiscardReason) {
    warn!(role = %role, reason = %reason, "discarding proposed artifact");
    report.discarded.push(DiscardedProposal { role, reason });
}

fn check(
    spec: &ApiSpec,
    current: &ArtifactSet,
    role: ArtifactRole,
    content: &str,
) -> Result<(), DiscardReason> {
    if content.trim().is_empty() {
        return Err(DiscardReason::Empty);
    }
    if content.trim_end() == current.content(role).trim_end() {
        return Err(DiscardReason::Unchanged);
    }
    match role {
        ArtifactRole::Main if has_unrecognised_routing(spec.framework, content) => {
            Err(DiscardReason::UnrecognisedRouting)
        }
        ArtifactRole::Main if !main_matches_spec(spec, content) => {
            Err(DiscardReason::EndpointSetChanged)
        }
        ArtifactRole::Documentation if !documentation_matches_spec(spec, content) => {
            Err(DiscardReason::DocumentationIncomplete)
        }
        ArtifactRole::Dependencies
            if spec.framework == Framework::Express
                && !matches!(serde_json::from_str::<Value>(content), Ok(Value::Object(_))) =>
        {
            Err(DiscardReason::InvalidManifest)
        }
        _ => Ok(()),
    }
}

/// Proposals in a stable order: `artifacts` as an object or as a list of
/// `{role, content}` entries, then the legacy `optimized_code` as `main`
/// unless `main` was already proposed.
fn proposals(document: &Map<String, Value>) -> Vec<(String, Value)> {
    let mut out: Vec<(String, Value)> = match document.get("artifacts") {
        Some(Value::Object(map)) => map.iter().map(|(k, v)| (k.clone(), v.clone())).collect(),
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(Value::as_object)
            .filter_map(|item| {
                let role = item
                    .get("role")
                    .or_else(|| item.get("name"))
                    .and_then(Value::as_str)?;
                Some((role.to_string(), item.get("content").cloned().unwrap_or(Value::Null)))
            })
            .collect(),
        _ => Vec::new(),
    };
    if let Some(code) = document.get("optimized_code") {
        if !out.iter().any(|(role, _)| role == ArtifactRole::Main.as_str()) {
            out.push((ArtifactRole::Main.as_str().to_string(), code.clone()));
        }
    }
    out
}

fn issues(value: Option<&Value>) -> Vec<ReviewIssue> {
    let text = |item: &Map<String, Value>, key: &str| {
        item.get(key)
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string()
    };
    value
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_object)
                .map(|item| ReviewIssue {
                    kind: text(item, "type"),
                    description: text(item, "description"),
                    severity: text(item, "severity"),
                    suggestion: text(item, "suggestion"),
                })
                .collect()
        })
        .unwrap_or_default()
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generator::synthesize;
    use crate::spec::{AuthMethod, Database, Endpoint, HttpMethod, Parameter};
    use serde_json::json;

    fn spec() -> ApiSpec {
        ApiSpec::new("Notes", "Keeps notes")
            .with_endpoint(Endpoint::new(HttpMethod::Get, "/notes", "List notes"))
            .with_endpoint(
                Endpoint::new(HttpMethod::Delete, "/notes/{note_id}", "Delete a note")
                    .with_parameter(Parameter::path("note_id")),
            )
    }

    const GOOD_MAIN: &str = r#"from fastapi import FastAPI

app = FastAPI()


@app.get("/notes")
async def list_notes():
    return {"success": True, "data": []}


@app.delete("/notes/{note_id}")
async def delete_note(note_id: str):
    return {"success": True, "data": None}
"#;

    #[test]
    fn test_unparseable_answer_is_noop() {
        let spec = spec();
        let artifacts = synthesize(&spec).unwrap();
        let report = merge_review(&spec, &artifacts, "I cannot help with that.");
        assert!(report.is_noop());
        assert_eq!(report.artifacts, artifacts);
        assert!(report.discarded.is_empty());
    }

    #[test]
    fn test_valid_main_is_merged() {
        let spec = spec();
        let artifacts = synthesize(&spec).unwrap();
        let answer = json!({
            "quality_score": 91.6,
            "artifacts": {"main": GOOD_MAIN},
            "recommendations": ["Add PATCH /notes/{note_id}"],
            "security_recommendations": ["Rate-limit deletes"]
        })
        .to_string();
        let report = merge_review(&spec, &artifacts, &answer);
        assert_eq!(report.accepted, vec![ArtifactRole::Main]);
        assert_eq!(report.artifacts.content(ArtifactRole::Main), GOOD_MAIN);
        assert_eq!(
            report.artifacts.content(ArtifactRole::Models),
            artifacts.content(ArtifactRole::Models)
        );
        assert_eq!(report.quality_score, Some(92));
        assert_eq!(
            report.recommendations,
            vec!["Add PATCH /notes/{note_id}", "Rate-limit deletes"]
        );
    }

    #[test]
    fn test_extra_route_is_discarded() {
        let spec = spec();
        let artifacts = synthesize(&spec).unwrap();
        let main = format!("{GOOD_MAIN}\n\n@app.get(\"/admin\")\nasync def admin():\n    pass\n");
        let answer = json!({"artifacts": [{"role": "main", "content": main}]}).to_string();
        let report = merge_review(&spec, &artifacts, &answer);
        assert!(report.is_noop());
        assert_eq!(
            report.discarded,
            vec![DiscardedProposal {
                role: "main".to_string(),
                reason: DiscardReason::EndpointSetChanged
            }]
        );
        assert_eq!(report.artifacts, artifacts);
    }

    #[test]
    fn test_legacy_optimized_code() {
        let spec = spec();
        let artifacts = synthesize(&spec).unwrap();
        let answer = json!({"quality_score": 70, "issues": [
            {"type": "style", "description": "d", "severity": "low", "suggestion": "s"}
        ], "optimized_code": GOOD_MAIN})
        .to_string();
        let report = merge_review(&spec, &artifacts, &answer);
        assert_eq!(report.accepted, vec![ArtifactRole::Main]);
        assert_eq!(report.issues[0].kind, "style");
    }

    #[test]
    fn test_unknown_empty_and_unchanged_proposals() {
        let spec = spec();
        let artifacts = synthesize(&spec).unwrap();
        let answer = json!({"artifacts": {
            "dockerfile": "FROM python:3.12",
            "models": "   ",
            "database": artifacts.content(ArtifactRole::Database),
            "dependencies": 42
        }})
        .to_string();
        let report = merge_review(&spec, &artifacts, &answer);
        assert!(report.is_noop());
        let reasons: Vec<DiscardReason> = report.discarded.iter().map(|d| d.reason).collect();
        assert!(reasons.contains(&DiscardReason::UnknownRole));
        assert!(reasons.contains(&DiscardReason::Empty));
        assert!(reasons.contains(&DiscardReason::Unchanged));
        assert!(reasons.contains(&DiscardReason::NotText));
    }

    #[test]
    fn test_documentation_must_keep_headings_in_order() {
        let spec = spec();
        let artifacts = synthesize(&spec).unwrap();
        let swapped = "# Notes\n\n### DELETE /notes/{note_id}\n\n### GET /notes\n";
        let good = "# Notes\n\nBetter intro.\n\n### GET /notes\n\nList.\n\n### DELETE /notes/{note_id}\n\nDelete.\n";

        let report = merge_review(
            &spec,
            &artifacts,
            &json!({"artifacts": {"documentation": swapped}}).to_string(),
        );
        assert_eq!(report.discarded[0].reason, DiscardReason::DocumentationIncomplete);

        let report = merge_review(
            &spec,
            &artifacts,
            &json!({"artifacts": {"documentation": good}}).to_string(),
        );
        assert_eq!(report.accepted, vec![ArtifactRole::Documentation]);
    }

    #[test]
    fn test_express_manifest_must_be_json() {
        let spec = spec().with_stack(Framework::Express, Database::Sqlite, AuthMethod::None);
        let artifacts = synthesize(&spec).unwrap();
        let report = merge_review(
            &spec,
            &artifacts,
            &json!({"artifacts": {"dependencies": "express@4"}}).to_string(),
        );
        assert_eq!(report.discarded[0].reason, DiscardReason::InvalidManifest);
    }

    #[test]
    fn test_provider_error_mapping() {
        let after = Duration::from_secs(3);
        assert!(matches!(
            EnhancementError::from(ProviderError::Timeout { after }),
            EnhancementError::Timeout { .. }
        ));
        assert!(matches!(
            EnhancementError::from(ProviderError::RateLimited),
            EnhancementError::ProviderUnavailable(ProviderError::RateLimited)
        ));
    }
}
