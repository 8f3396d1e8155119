//! # Handler Logic Pass
//!
//! Fully-AI generation: one prompt per endpoint asks the model for the body
//! of that endpoint's handler. Every body is a proposal. The main artifact is
//! re-rendered with it, and the body is kept only when the result still
//! registers exactly the specification's endpoints.
//!
//! | Body | Discarded when |
//! |---|---|
//! | any | answer is not a JSON object, `implementation` is not text, or it is empty |
//! | any | it registers a route in any form |
//! | any | the re-rendered main artifact no longer matches the specification |
//!
//! A provider failure stops the pass; bodies collected so far are dropped
//! with it, since a caller falls back to the template output anyway.

use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::ai::prompts::{self, LogicPrompt, LOGIC_SYSTEM};
use crate::ai::{complete_within, json, CompletionRequest, LanguageModel};
use crate::config::AiConfig;
use crate::enhance::{DiscardReason, EnhancementError};
use crate::generator::scan::{declared_routes, has_unrecognised_routing, main_matches_spec};
use crate::generator::{render_main_with_logic, ArtifactRole, ArtifactSet, EndpointView, SpecView};
use crate::spec::{ApiSpec, Framework};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DiscardedHandler {
    /// `METHOD /path`
    pub endpoint: String,
    pub reason: DiscardReason,
}

/// What the model said about one accepted handler besides its code.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct HandlerNotes {
    pub endpoint: String,
    pub validation: String,
    pub error_handling: String,
    pub database_operations: String,
    pub test_cases: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LogicReport {
    pub artifacts: ArtifactSet,
    /// `METHOD /path` of every endpoint whose generated body was kept
    pub accepted: Vec<String>,
    pub discarded: Vec<DiscardedHandler>,
    pub notes: Vec<HandlerNotes>,
}

impl LogicReport {
    pub fn is_noop(&self) -> bool {
        self.accepted.is_empty()
    }
}

/// Ask for every endpoint's handler body and merge the ones that keep the
/// main artifact consistent with `spec`.
///
/// # Errors
///
/// When the pass cannot run or the model fails: provider failure, timeout,
/// or inputs that do not belong together. Unusable bodies are never errors.
pub async fn enhance_endpoint_logic(
    model: &dyn LanguageModel,
    config: &AiConfig,
    spec: &ApiSpec,
    artifacts: &ArtifactSet,
) -> Result<LogicReport, EnhancementError> {
    spec.validate()?;
    if artifacts.framework() != spec.framework {
        return Err(EnhancementError::FrameworkMismatch {
            spec: spec.framework,
            artifacts: artifacts.framework(),
        });
    }

    let view = SpecView::new(spec);
    let mut answers = Vec::with_capacity(spec.endpoints.len());
    for endpoint in &view.endpoints {
        let prompt = prompts::endpoint_logic(&logic_prompt(&view, endpoint))?;
        let request = CompletionRequest::new(prompt)
            .with_system(LOGIC_SYSTEM)
            .json()
            .with_temperature(config.logic_temperature)
            .with_max_tokens(config.logic_max_tokens);
        let completion = complete_within(model, request, config.timeout()).await?;
        debug!(endpoint = %endpoint.method, path = %endpoint.path, "handler body received");
        answers.push(completion.text);
    }

    let report = merge_logic(spec, artifacts, &answers)?;
    info!(
        api = %spec.name,
        accepted = report.accepted.len(),
        discarded = report.discarded.len(),
        digest = %report.artifacts.digest(),
        "handler logic pass finished"
    );
    Ok(report)
}

/// Apply raw per-endpoint answers, in endpoint order, to `artifacts`.
///
/// # Errors
///
/// Only when the main artifact cannot be rendered at all.
pub fn merge_logic(
    spec: &ApiSpec,
    artifacts: &ArtifactSet,
    answers: &[String],
) -> Result<LogicReport, EnhancementError> {
    let mut report = LogicReport {
        artifacts: artifacts.clone(),
        accepted: Vec::new(),
        discarded: Vec::new(),
        notes: Vec::new(),
    };
    let mut bodies: Vec<Option<String>> = vec![None; spec.endpoints.len()];
    let mut main = None;

    for ((index, endpoint), answer) in spec.endpoints.iter().enumerate().zip(answers) {
        let signature = endpoint.signature();
        let (body, notes) = match proposal(answer) {
            Ok(found) => found,
            Err(reason) => {
                discard(&mut report, signature, reason);
                continue;
            }
        };
        if let Err(reason) = check_body(spec.framework, &body) {
            discard(&mut report, signature, reason);
            continue;
        }

        bodies[index] = Some(body);
        let candidate = render_main_with_logic(spec, &bodies)?;
        if !main_matches_spec(spec, &candidate) {
            bodies[index] = None;
            discard(&mut report, signature, DiscardReason::EndpointSetChanged);
            continue;
        }
        main = Some(candidate);
        report.notes.push(HandlerNotes {
            endpoint: signature.clone(),
            ..notes
        });
        report.accepted.push(signature);
    }

    if let Some(main) = main {
        report.artifacts = report.artifacts.with_content(ArtifactRole::Main, main);
    }
    Ok(report)
}

fn discard(report: &mut LogicReport, endpoint: String, reason: DiscardReason) {
    warn!(endpoint = %endpoint, reason = %reason, "discarding generated handler");
    report.discarded.push(DiscardedHandler { endpoint, reason });
}

fn proposal(answer: &str) -> Result<(String, HandlerNotes), DiscardReason> {
    let document = match json::parse_document(answer) {
        Ok(Value::Object(document)) => document,
        _ => return Err(DiscardReason::NotText),
    };
    let body = document
        .get("implementation")
        .or_else(|| document.get("code"))
        .and_then(Value::as_str)
        .ok_or(DiscardReason::NotText)?;
    if body.trim().is_empty() {
        return Err(DiscardReason::Empty);
    }

    let text = |key: &str| {
        match document.get(key) {
            Some(Value::String(text)) => text.clone(),
            Some(Value::Null) | None => String::new(),
            Some(other) => other.to_string(),
        }
    };
    let test_cases = match document.get("test_cases") {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(Value::as_str)
            .map(str::to_string)
            .collect(),
        Some(Value::String(case)) => vec![case.clone()],
        _ => Vec::new(),
    };
    let notes = HandlerNotes {
        endpoint: String::new(),
        validation: text("validation"),
        error_handling: text("error_handling"),
        database_operations: text("database_operations"),
        test_cases,
    };
    Ok((body.to_string(), notes))
}

/// A body may not register anything itself.
fn check_body(framework: Framework, body: &str) -> Result<(), DiscardReason> {
    if has_unrecognised_routing(framework, body) {
        return Err(DiscardReason::UnrecognisedRouting);
    }
    if !declared_routes(framework, body).is_empty() {
        return Err(DiscardReason::EndpointSetChanged);
    }
    Ok(())
}

fn logic_prompt<'a>(view: &'a SpecView, endpoint: &'a EndpointView) -> LogicPrompt<'a> {
    LogicPrompt {
        api_name: &view.name,
        api_description: &view.description,
        framework: view.framework_label,
        language: match view.framework {
            Framework::FastApi | Framework::Flask => "Python",
            Framework::Express => "JavaScript",
        },
        database: view.database_label,
        method: &endpoint.method,
        path: &endpoint.path,
        description: &endpoint.description,
        function_name: &endpoint.function_name,
        scope: handler_scope(view.framework, endpoint),
    }
}

/// The names a generated body can rely on, as the templates bind them.
fn handler_scope(framework: Framework, endpoint: &EndpointView) -> Vec<String> {
    let mut scope = Vec::new();
    match framework {
        Framework::FastApi => {
            for p in &endpoint.path_params {
                scope.push(format!("`{}` (str): path parameter `{}`", p.ident, p.name));
            }
            if endpoint.has_body {
                scope.push(format!(
                    "`payload` ({}): validated request body, `payload.model_dump()` gives a dict",
                    endpoint.request_model
                ));
            }
            for p in &endpoint.query_params {
                let kind = if p.required { "str" } else { "Optional[str]" };
                scope.push(format!("`{}` ({kind}): query parameter `{}`", p.ident, p.name));
            }
            scope.push("`db`: database session from `get_db()`".to_string());
            if endpoint.auth_required {
                scope.push("`current_user` (dict): the authenticated caller".to_string());
            }
            scope.push(format!(
                "`envelope(data, message)`: builds the APIResponse to return; status {} is set by the route",
                endpoint.action.status_code()
            ));
            scope.push("`HTTPException` and `status` from fastapi, for error responses".to_string());
        }
        Framework::Flask => {
            for p in &endpoint.path_params {
                scope.push(format!("`{}` (str): path parameter `{}`", p.ident, p.name));
            }
            scope.push("`db`: database handle from `get_db()`".to_string());
            if endpoint.has_body {
                scope.push(format!(
                    "`{}.model_validate(request.get_json(silent=True) or {{}})` validates the request body",
                    endpoint.request_model
                ));
            }
            for p in &endpoint.query_params {
                scope.push(format!("`request.args.get(\"{}\")`: query parameter", p.name));
            }
            if endpoint.auth_required {
                scope.push("`g.current_user` (dict): the authenticated caller".to_string());
            }
            scope.push(format!(
                "`envelope(data, message, status)`: the response to return, use status {} on success",
                endpoint.action.status_code()
            ));
            scope.push("`jsonify` and `request` from flask".to_string());
        }
        Framework::Express => {
            for p in &endpoint.path_params {
                scope.push(format!("`req.params.{}`: path parameter `{}`", p.ident, p.name));
            }
            for p in &endpoint.query_params {
                scope.push(format!("`req.query[{}]`: query parameter", p.literal));
            }
            if endpoint.has_body {
                scope.push("`req.body`: request body, already validated".to_string());
            }
            if endpoint.auth_required {
                scope.push("`req.user`: the authenticated caller".to_string());
            }
            scope.push(format!(
                "`res` and `envelope(data, message)`: return `res.status({}).json(envelope(...))` on success",
                endpoint.action.status_code()
            ));
        }
    }
    scope
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generator::synthesize;
    use crate::spec::{AuthMethod, Database, Endpoint, HttpMethod, Parameter};
    use serde_json::json;

    fn spec() -> ApiSpec {
        ApiSpec::new("Notes", "Keeps notes")
            .with_stack(Framework::Flask, Database::Sqlite, AuthMethod::ApiKey)
            .with_endpoint(Endpoint::new(HttpMethod::Get, "/notes", "List notes"))
            .with_endpoint(
                Endpoint::new(HttpMethod::Delete, "/notes/{class}", "Delete a note")
                    .with_parameter(Parameter::path("class")),
            )
    }

    fn answer(body: &str) -> String {
        json!({
            "implementation": body,
            "validation": "none needed",
            "test_cases": ["returns 200"]
        })
        .to_string()
    }

    #[test]
    fn test_bodies_are_merged_in_endpoint_order() {
        let spec = spec();
        let artifacts = synthesize(&spec).unwrap();
        let answers = [
            answer("rows = db.execute(\"SELECT * FROM notes\").fetchall()\nreturn envelope([dict(r) for r in rows], \"Notes\")"),
            answer("db.execute(\"DELETE FROM notes WHERE id = ?\", (class_,))\nreturn envelope(None, \"Deleted\")"),
        ];
        let report = merge_logic(&spec, &artifacts, &answers).unwrap();

        assert_eq!(report.accepted, vec!["GET /notes", "DELETE /notes/{class}"]);
        assert!(report.discarded.is_empty());
        let main = report.artifacts.content(ArtifactRole::Main);
        assert!(main.contains("def delete_notes_by_class(class_):"));
        assert!(main.contains("    db.execute(\"DELETE FROM notes WHERE id = ?\", (class_,))\n"));
        assert!(main_matches_spec(&spec, main));
        assert_eq!(
            report.artifacts.content(ArtifactRole::Models),
            artifacts.content(ArtifactRole::Models)
        );
        assert_eq!(report.notes[0].validation, "none needed");
        assert_eq!(report.notes[1].test_cases, vec!["returns 200"]);
    }

    #[test]
    fn test_bodies_that_route_are_discarded() {
        let spec = spec();
        let artifacts = synthesize(&spec).unwrap();
        let answers = [
            answer("return envelope([], \"ok\")\n\n@app.route(\"/admin\", methods=[\"DELETE\"])\ndef wipe():\n    return \"\""),
            answer("app.add_url_rule(\"/admin\", view_func=wipe)\nreturn envelope(None, \"ok\")"),
        ];
        let report = merge_logic(&spec, &artifacts, &answers).unwrap();
        assert!(report.is_noop());
        assert_eq!(report.artifacts, artifacts);
        let reasons: Vec<DiscardReason> = report.discarded.iter().map(|d| d.reason).collect();
        assert_eq!(
            reasons,
            vec![DiscardReason::EndpointSetChanged, DiscardReason::UnrecognisedRouting]
        );
    }

    #[test]
    fn test_unusable_answers_keep_the_default_body() {
        let spec = spec();
        let artifacts = synthesize(&spec).unwrap();
        let answers = [
            "no code for you".to_string(),
            json!({"implementation": "   "}).to_string(),
        ];
        let report = merge_logic(&spec, &artifacts, &answers).unwrap();
        assert!(report.is_noop());
        assert_eq!(report.artifacts, artifacts);
        assert_eq!(report.discarded[0].reason, DiscardReason::NotText);
        assert_eq!(report.discarded[1].reason, DiscardReason::Empty);
    }

    #[test]
    fn test_scope_names_follow_the_templates() {
        let view = SpecView::new(&spec());
        let scope = handler_scope(Framework::Flask, &view.endpoints[1]);
        assert_eq!(scope[0], "`class_` (str): path parameter `class`");
        assert!(scope.iter().any(|line| line.starts_with("`g.current_user`")));

        let express = handler_scope(Framework::Express, &view.endpoints[1]);
        assert_eq!(express[0], "`req.params.class_`: path parameter `class`");
    }
}
