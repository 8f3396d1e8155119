//! Prompt templates, rendered with minijinja at call time.
//!
//! Prompts are text templates rather than code so wording can change without
//! touching the parsing logic that consumes the answers.

use minijinja::{context, Environment};
use serde::Serialize;

use super::error::PromptError;
use crate::generator::ArtifactSet;
use crate::spec::ApiSpec;

pub const EXTRACTION_SYSTEM: &str =
    "You are an expert REST API designer. Always answer with a single valid JSON document.";

pub const REVIEW_SYSTEM: &str =
    "You are a code review expert. Give objective, constructive feedback as a single valid JSON document.";

pub const LOGIC_SYSTEM: &str =
    "You are a senior backend developer writing production-quality handler code. Always answer with a single valid JSON document.";

const EXTRACT: &str = r#"Design a complete REST API specification for the requirements below.

Requirements: {{ description }}
Domain: {{ domain }}
Complexity: {{ complexity }}
{% if include_auth -%}
Include authentication endpoints (for example register and login) and protect every other endpoint.
{%- else -%}
The API does not need authentication: set "auth_method" to "none".
{%- endif %}
{% if include_admin -%}
Include administrator endpoints for managing the main resources.
{% endif %}
Answer with a JSON document of exactly this shape:
{
  "name": "API name",
  "description": "What the API does",
  "version": "1.0.0",
  "framework": "fastapi",
  "database": "postgresql",
  "auth_method": "jwt",
  "endpoints": [
    {
      "path": "/api/resources/{resource_id}",
      "method": "GET",
      "description": "What the endpoint does",
      "parameters": [
        { "name": "resource_id", "location": "path", "required": true }
      ],
      "request_body_example": null,
      "response_example": { "success": true, "data": { "id": 1 } },
      "tags": ["resources"]
    }
  ],
  "reasoning": "Why the API is designed this way",
  "suggestions": ["Further points to consider"],
  "confidence_score": 0.95
}

Rules:
- "framework" is one of: {{ frameworks }}.
- "database" is one of: {{ databases }}. Omit it when the requirements say nothing about storage.
- "auth_method" is one of: {{ auth_methods }}.
- "method" is one of: GET, POST, PUT, PATCH, DELETE. Each (path, method) pair appears once.
- Every `{placeholder}` in a path has a parameter with "location": "path". Query parameters use "location": "query".
- Follow RESTful conventions, use appropriate status codes and keep the design extensible.

Answer with the JSON document only."#;

const CORRECT: &str = r#"{% include "extract" %}

Your previous answer could not be used: {{ error }}
Answer again with only the JSON document described above."#;

const LOGIC: &str = r#"Write the body of one request handler in a {{ framework }} project for the API "{{ api_name }}".
API purpose: {{ api_description }}

Endpoint: {{ method }} {{ path }}
What it does: {{ description }}
Handler: {{ function_name }}
Database: {{ database }}

Names in scope inside the handler:
{% for name in scope -%}
- {{ name }}
{% endfor %}
Write only the {{ language }} statements inside the handler, without the function header and
without registering, mounting or routing anything. Every code path ends with a response.
Validate the inputs, handle errors with appropriate status codes and log failures.

Answer with a JSON document of this shape:
{
  "implementation": "the statements of the handler body",
  "validation": "how the inputs are checked",
  "error_handling": "which errors are handled and how",
  "database_operations": "what is read or written",
  "test_cases": ["an example test case"]
}

Answer with the JSON document only."#;

const REVIEW: &str = r#"Review the generated {{ framework }} project for the API "{{ spec.name }}" (version {{ spec.version }}).

Specification:
{{ spec_json }}
{% for artifact in artifacts %}
=== {{ artifact.role }} ({{ artifact.file_name }}) ===
{{ artifact.content }}
{% endfor %}
Improve error handling, input validation and documentation completeness.
Do not add, remove or rename endpoints: every route registered in the main file and every
documentation heading of the form ### METHOD /path must stay exactly as it is, in the same order.
If an improvement would need a change to the specification itself, list it under "recommendations" instead.

Answer with a JSON document of this shape:
{
  "quality_score": 85,
  "issues": [
    {
      "type": "security|performance|style|logic",
      "description": "What is wrong",
      "severity": "low|medium|high|critical",
      "suggestion": "How to fix it"
    }
  ],
  "artifacts": { "main": "complete revised file content" },
  "recommendations": ["Specification changes worth considering"],
  "performance_tips": ["Performance advice"],
  "security_recommendations": ["Security advice"]
}

Only include in "artifacts" the roles you changed ({{ roles }}), each with its complete file content.
Answer with the JSON document only."#;

/// Rendering inputs for the extraction prompts.
#[derive(Debug, Clone, Serialize)]
pub struct ExtractionPrompt<'a> {
    pub description: &'a str,
    pub domain: &'a str,
    pub complexity: &'a str,
    pub include_auth: bool,
    pub include_admin: bool,
}

/// Rendering inputs for one endpoint's handler body.
#[derive(Debug, Clone, Serialize)]
pub struct LogicPrompt<'a> {
    pub api_name: &'a str,
    pub api_description: &'a str,
    pub framework: &'a str,
    /// `Python` or `JavaScript`
    pub language: &'a str,
    pub database: &'a str,
    pub method: &'a str,
    pub path: &'a str,
    pub description: &'a str,
    pub function_name: &'a str,
    /// One line per name the body may use, with a short explanation
    pub scope: Vec<String>,
}

fn environment() -> Result<Environment<'static>, PromptError> {
    let mut env = Environment::new();
    for (name, source) in [
        ("extract", EXTRACT),
        ("correct", CORRECT),
        ("logic", LOGIC),
        ("review", REVIEW),
    ] {
        env.add_template(name, source)
            .map_err(|source| PromptError { name, source })?;
    }
    Ok(env)
}

fn render(name: &'static str, ctx: minijinja::Value) -> Result<String, PromptError> {
    let env = environment()?;
    env.get_template(name)
        .and_then(|template| template.render(ctx))
        .map_err(|source| PromptError { name, source })
}

fn extraction_context(input: &ExtractionPrompt<'_>, error: Option<&str>) -> minijinja::Value {
    context! {
        description => input.description,
        domain => input.domain,
        complexity => input.complexity,
        include_auth => input.include_auth,
        include_admin => input.include_admin,
        frameworks => "fastapi, flask, express",
        databases => "postgresql, mysql, mongodb, sqlite",
        auth_methods => "jwt, oauth2, api-key, none",
        error => error,
    }
}

pub fn extraction(input: &ExtractionPrompt<'_>) -> Result<String, PromptError> {
    render("extract", extraction_context(input, None))
}

/// The extraction prompt followed by the reason the previous answer was rejected.
pub fn correction(input: &ExtractionPrompt<'_>, error: &str) -> Result<String, PromptError> {
    render("correct", extraction_context(input, Some(error)))
}

pub fn endpoint_logic(input: &LogicPrompt<'_>) -> Result<String, PromptError> {
    render("logic", minijinja::Value::from_serialize(input))
}

pub fn review(spec: &ApiSpec, artifacts: &ArtifactSet) -> Result<String, PromptError> {
    let spec_json = serde_json::to_string_pretty(spec).unwrap_or_default();
    let artifacts: Vec<_> = artifacts.iter().collect();
    render(
        "review",
        context! {
            framework => spec.framework.label(),
            spec => spec,
            spec_json => spec_json,
            artifacts => artifacts,
            roles => "main, models, database, dependencies, documentation",
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generator::synthesize;
    use crate::spec::{Endpoint, HttpMethod};

    fn input(include_auth: bool) -> ExtractionPrompt<'static> {
        ExtractionPrompt {
            description: "A library that lends books",
            domain: "education",
            complexity: "simple",
            include_auth,
            include_admin: true,
        }
    }

    #[test]
    fn test_extraction_prompt() {
        let text = extraction(&input(true)).unwrap();
        assert!(text.contains("Requirements: A library that lends books"));
        assert!(text.contains("Domain: education"));
        assert!(text.contains("Include authentication endpoints"));
        assert!(text.contains("administrator endpoints"));
        assert!(text.contains("\"path\": \"/api/resources/{resource_id}\""));
        assert!(text.contains("postgresql, mysql, mongodb, sqlite"));

        let no_auth = extraction(&input(false)).unwrap();
        assert!(no_auth.contains("set \"auth_method\" to \"none\""));
    }

    #[test]
    fn test_correction_echoes_error() {
        let text = correction(&input(true), "expected `,` at line 3").unwrap();
        assert!(text.starts_with("Design a complete REST API"));
        assert!(text.contains("could not be used: expected `,` at line 3"));
    }

    #[test]
    fn test_review_prompt_lists_every_artifact() {
        let spec = ApiSpec::new("Pets", "Pet store")
            .with_endpoint(Endpoint::new(HttpMethod::Get, "/pets", "List pets"));
        let artifacts = synthesize(&spec).unwrap();
        let text = review(&spec, &artifacts).unwrap();
        assert!(text.contains("API \"Pets\""));
        for artifact in artifacts.iter() {
            assert!(text.contains(&format!("=== {} ({})", artifact.role, artifact.file_name)));
        }
        assert!(text.contains("\"quality_score\": 85"));
        assert!(text.contains("heading of the form ### METHOD /path must stay"));
        assert!(text.trim_end().ends_with("Answer with the JSON document only."));
        assert!(text.contains("\"security_recommendations\""));
    }

    #[test]
    fn test_logic_prompt_lists_scope() {
        let input = LogicPrompt {
            api_name: "Library API",
            api_description: "Lends books",
            framework: "Flask",
            language: "Python",
            database: "PostgreSQL",
            method: "POST",
            path: "/loans/{book_id}",
            description: "Borrow a book",
            function_name: "post_loans_by_book_id",
            scope: vec!["`book_id` (str): path parameter".to_string(), "`db`: database session".to_string()],
        };
        let text = endpoint_logic(&input).unwrap();
        assert!(text.contains("Endpoint: POST /loans/{book_id}"));
        assert!(text.contains("- `book_id` (str): path parameter\n- `db`: database session\n"));
        assert!(text.contains("Write only the Python statements"));
        assert!(text.contains("\"implementation\""));
    }
}
