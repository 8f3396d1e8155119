//! View models handed to the askama templates.
//!
//! Templates only see plain strings, flags and vectors. All naming and
//! framework path conversion happens here, so the templates stay free of logic.

use serde_json::Value;
use std::collections::HashSet;

use super::profiles::{
    auth_profile, database_profile, framework_profile, AuthProfile, DatabaseProfile, EnvVar,
    FrameworkProfile,
};
use crate::spec::{ApiSpec, AuthMethod, Database, Endpoint, Framework, HttpMethod};

/// A path or query parameter as templates see it.
#[derive(Debug, Clone)]
pub struct ParamView {
    /// Name as declared; used as the wire name.
    pub name: String,
    /// `name` made safe as a Python/JavaScript identifier, unique within its handler.
    pub ident: String,
    /// `name` as a double-quoted string literal.
    pub literal: String,
    /// `name` on a single Markdown-safe line.
    pub label: String,
    pub required: bool,
}

impl ParamView {
    fn new(name: &str, required: bool, taken: &mut HashSet<String>) -> Self {
        Self {
            name: name.to_string(),
            ident: handler_identifier(name, taken),
            literal: string_literal(name),
            label: markdown_line(name),
            required,
        }
    }
}

/// One endpoint, pre-digested for every framework.
#[derive(Debug, Clone)]
pub struct EndpointView {
    /// `GET`
    pub method: String,
    /// `get`
    pub method_lower: String,
    /// Path as declared, `{param}` placeholders.
    pub path: String,
    /// Path in the target framework's placeholder syntax.
    pub route_path: String,
    /// `route_path` as a double-quoted string literal.
    pub route_literal: String,
    /// Declared path as a double-quoted string literal.
    pub path_literal: String,
    pub function_name: String,
    /// CamelCase name of the request body model, e.g. `CreateUsersRequest`.
    pub request_model: String,
    pub description: String,
    /// Description safe to place inside a double-quoted string literal.
    pub description_literal: String,
    /// Description safe inside a triple-quoted Python docstring or JS block comment.
    pub description_doc: String,
    /// Description as one Markdown line that cannot open a heading.
    pub description_line: String,
    pub path_params: Vec<ParamView>,
    pub query_params: Vec<ParamView>,
    pub has_body: bool,
    pub auth_required: bool,
    pub tags: Vec<String>,
    /// `"a", "b"` for FastAPI `tags=[...]`.
    pub tags_literal: String,
    /// `a, b` for the documentation.
    pub tags_line: String,
    /// Pretty-printed JSON examples, documentation only.
    pub request_example: Option<String>,
    pub response_example: Option<String>,
    /// Single-line JSON request example, or `null`.
    pub request_example_inline: String,
    /// Lines of the pretty request example, for comment blocks.
    pub request_example_lines: Vec<String>,
    pub action: Action,
    /// Generated handler body replacing the default one, already indented.
    pub logic_body: Option<String>,
}

/// Default handler behaviour derived from method and path shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    List,
    Fetch,
    Create,
    Update,
    Delete,
}

impl Action {
    fn of(endpoint: &Endpoint) -> Self {
        match endpoint.method {
            HttpMethod::Get if endpoint.path_parameters().next().is_some() => Action::Fetch,
            HttpMethod::Get => Action::List,
            HttpMethod::Post => Action::Create,
            HttpMethod::Put | HttpMethod::Patch => Action::Update,
            HttpMethod::Delete => Action::Delete,
        }
    }

    pub fn is_list(&self) -> bool {
        *self == Action::List
    }

    pub fn is_fetch(&self) -> bool {
        *self == Action::Fetch
    }

    pub fn is_create(&self) -> bool {
        *self == Action::Create
    }

    pub fn is_update(&self) -> bool {
        *self == Action::Update
    }

    pub fn is_delete(&self) -> bool {
        *self == Action::Delete
    }

    /// Success message placed in the response envelope.
    pub fn message(&self) -> &'static str {
        match self {
            Action::List => "Items retrieved",
            Action::Fetch => "Item retrieved",
            Action::Create => "Item created",
            Action::Update => "Item updated",
            Action::Delete => "Item deleted",
        }
    }

    pub fn status_code(&self) -> u16 {
        match self {
            Action::Create => 201,
            _ => 200,
        }
    }
}

/// Everything about the spec that templates render, shared by all roles.
#[derive(Debug)]
pub struct SpecView {
    pub name: String,
    pub name_literal: String,
    pub name_doc: String,
    pub name_line: String,
    pub description: String,
    pub description_literal: String,
    pub description_doc: String,
    pub description_line: String,
    pub version: String,
    pub slug: String,
    pub framework: Framework,
    pub database: Database,
    pub auth_method: AuthMethod,
    pub framework_label: &'static str,
    pub database_label: &'static str,
    pub auth_label: &'static str,
    pub database_url: &'static str,
    pub relational: bool,
    pub sqlite: bool,
    pub sequelize_dialect: &'static str,
    pub auth_enabled: bool,
    pub auth_jwt: bool,
    pub auth_oauth2: bool,
    pub auth_api_key: bool,
    pub credential_hint: &'static str,
    pub auth_env: Vec<EnvVar>,
    pub run_command: &'static str,
    pub install_command: &'static str,
    pub port: u16,
    pub endpoints: Vec<EndpointView>,
    /// Request models for endpoints that carry a body, in endpoint order.
    pub body_endpoints: Vec<EndpointView>,
    pub uses_query: bool,
}

impl SpecView {
    pub fn new(spec: &ApiSpec) -> Self {
        let fw: &FrameworkProfile = framework_profile(spec.framework);
        let db: &DatabaseProfile = database_profile(spec.database);
        let auth: &AuthProfile = auth_profile(spec.auth_method);

        let mut seen = HashSet::new();
        let endpoints: Vec<EndpointView> = spec
            .endpoints
            .iter()
            .map(|endpoint| {
                let mut view = EndpointView::new(endpoint, spec.framework, spec.auth_method);
                let unique = unique_function_name(&mut seen, &view.function_name);
                if unique != view.function_name {
                    view.request_model = format!("{}Request", camel_case(&unique));
                    view.function_name = unique;
                }
                view
            })
            .collect();
        let body_endpoints = endpoints.iter().filter(|e| e.has_body).cloned().collect();
        let uses_query = endpoints.iter().any(|e| !e.query_params.is_empty());

        Self {
            name: spec.name.clone(),
            name_literal: string_literal(&spec.name),
            name_doc: doc_text(&spec.name),
            name_line: markdown_line(&spec.name),
            description: spec.description.clone(),
            description_literal: string_literal(&spec.description),
            description_doc: doc_text(&spec.description),
            description_line: markdown_line(&spec.description),
            version: spec.version.clone(),
            slug: spec.slug(),
            framework: spec.framework,
            database: spec.database,
            auth_method: spec.auth_method,
            framework_label: spec.framework.label(),
            database_label: spec.database.label(),
            auth_label: spec.auth_method.label(),
            database_url: db.default_url,
            relational: spec.database.is_relational(),
            sqlite: spec.database == Database::Sqlite,
            sequelize_dialect: db.sequelize_dialect.unwrap_or_default(),
            auth_enabled: spec.auth_method.is_enabled(),
            auth_jwt: spec.auth_method == AuthMethod::Jwt,
            auth_oauth2: spec.auth_method == AuthMethod::OAuth2,
            auth_api_key: spec.auth_method == AuthMethod::ApiKey,
            credential_hint: auth.credential_hint,
            auth_env: auth.env.to_vec(),
            run_command: fw.run_command,
            install_command: fw.install_command,
            port: fw.default_port,
            endpoints,
            body_endpoints,
            uses_query,
        }
    }

    /// npm package name derived from the slug.
    pub fn package_name(&self) -> String {
        self.slug.replace('_', "-")
    }
}

impl EndpointView {
    pub fn new(endpoint: &Endpoint, framework: Framework, auth: AuthMethod) -> Self {
        let function_name = function_name(endpoint.method, &endpoint.path);
        let tags_literal = endpoint
            .tags
            .iter()
            .map(|tag| string_literal(tag))
            .collect::<Vec<_>>()
            .join(", ");
        let tags_line = markdown_line(&endpoint.tags.join(", "));

        let mut taken = HashSet::new();
        let path_params: Vec<ParamView> = endpoint
            .path_parameters()
            .map(|p| ParamView::new(&p.name, true, &mut taken))
            .collect();
        let query_params: Vec<ParamView> = endpoint
            .query_parameters()
            .map(|p| ParamView::new(&p.name, p.required, &mut taken))
            .collect();

        let route_path = route_path(framework, &endpoint.path, &path_params);
        let request_example = endpoint.request_body_example.as_ref().map(pretty);
        let request_example_lines = request_example
            .as_deref()
            .map(|text| text.lines().map(str::to_string).collect())
            .unwrap_or_default();
        Self {
            method: endpoint.method.as_str().to_string(),
            method_lower: endpoint.method.as_lower().to_string(),
            path: endpoint.path.clone(),
            route_literal: string_literal(&route_path),
            path_literal: string_literal(&endpoint.path),
            route_path,
            request_model: format!("{}Request", camel_case(&function_name)),
            function_name,
            description: endpoint.description.clone(),
            description_literal: string_literal(&endpoint.description),
            description_doc: doc_text(&endpoint.description),
            description_line: markdown_line(&endpoint.description),
            path_params,
            query_params,
            has_body: endpoint.method.has_body(),
            auth_required: auth.is_enabled() && !is_public_path(&endpoint.path),
            tags: endpoint.tags.clone(),
            tags_literal,
            tags_line,
            request_example,
            request_example_lines,
            response_example: endpoint.response_example.as_ref().map(pretty),
            request_example_inline: endpoint
                .request_body_example
                .as_ref()
                .map_or_else(|| "null".to_string(), Value::to_string),
            action: Action::of(endpoint),
            logic_body: None,
        }
    }

    /// Replace the default handler body with `body`, re-indented for `framework`.
    pub fn set_logic(&mut self, framework: Framework, body: &str) {
        let indent = match framework {
            Framework::FastApi | Framework::Flask => "    ",
            Framework::Express => "  ",
        };
        self.logic_body = Some(indent_block(body, indent));
    }
}

/// Handler name: method plus path segments, `api` skipped, `{x}` as `by_x`.
///
/// `/api/users/{user_id}` with GET becomes `get_users_by_user_id`.
pub fn function_name(method: HttpMethod, path: &str) -> String {
    let mut parts = vec![method.as_lower().to_string()];
    for segment in path.split('/').filter(|s| !s.is_empty()) {
        if let Some(param) = segment
            .strip_prefix('{')
            .and_then(|s| s.strip_suffix('}'))
        {
            parts.push("by".to_string());
            parts.push(param.to_string());
        } else if segment != "api" {
            parts.push(
                segment
                    .chars()
                    .map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_lowercase() } else { '_' })
                    .collect(),
            );
        }
    }
    if parts.len() == 1 {
        parts.push("root".to_string());
    }
    parts.join("_")
}

/// Suffix `_1`, `_2`, ... until the name has not been used yet.
pub(crate) fn unique_function_name(seen: &mut HashSet<String>, name: &str) -> String {
    if seen.insert(name.to_string()) {
        return name.to_string();
    }
    let mut counter = 1;
    loop {
        let candidate = format!("{name}_{counter}");
        if seen.insert(candidate.clone()) {
            tracing::debug!(name, candidate = %candidate, "duplicate handler name");
            return candidate;
        }
        counter += 1;
    }
}

/// `get_users_by_id` -> `GetUsersById`
pub fn camel_case(snake: &str) -> String {
    snake
        .split('_')
        .filter(|s| !s.is_empty())
        .map(|part| {
            let mut chars = part.chars();
            match chars.next() {
                Some(first) => first.to_ascii_uppercase().to_string() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect()
}

/// Convert `{param}` placeholders to the framework's own syntax.
///
/// Placeholders are renamed to the matching parameter's identifier, since
/// every framework binds a path segment to the handler argument of the same
/// name. Placeholders without a matching entry in `params` keep their name.
pub fn route_path(framework: Framework, path: &str, params: &[ParamView]) -> String {
    let (open, close) = match framework {
        Framework::FastApi => ("{", "}"),
        Framework::Flask => ("<", ">"),
        Framework::Express => (":", ""),
    };
    path.split('/')
        .map(|segment| {
            match segment
                .strip_prefix('{')
                .and_then(|s| s.strip_suffix('}'))
            {
                Some(param) => {
                    let ident = params
                        .iter()
                        .find(|p| p.name == param)
                        .map_or(param, |p| p.ident.as_str());
                    format!("{open}{ident}{close}")
                }
                None => segment.to_string(),
            }
        })
        .collect::<Vec<_>>()
        .join("/")
}

/// Endpoints under an `auth` segment (register, login, token refresh) stay public.
pub fn is_public_path(path: &str) -> bool {
    path.split('/').any(|segment| segment.eq_ignore_ascii_case("auth"))
}

/// Double-quoted literal valid in both Python and JavaScript.
pub fn string_literal(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 2);
    out.push('"');
    for c in text.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if c.is_control() => out.push_str(&format!("\\u{:04x}", c as u32)),
            c => out.push(c),
        }
    }
    out.push('"');
    out
}

/// Python and JavaScript reserved words.
const RESERVED_WORDS: &[&str] = &[
    // Python
    "False", "None", "True", "and", "as", "assert", "async", "await", "break", "class",
    "continue", "def", "del", "elif", "else", "except", "finally", "for", "from", "global",
    "if", "import", "in", "is", "lambda", "nonlocal", "not", "or", "pass", "raise", "return",
    "try", "while", "with", "yield",
    // JavaScript
    "case", "catch", "const", "debugger", "default", "delete", "do", "enum", "export",
    "extends", "false", "function", "implements", "instanceof", "interface", "let", "new",
    "null", "package", "private", "protected", "public", "static", "super", "switch", "this",
    "throw", "true", "typeof", "var", "void",
];

/// Names the generated handlers bind or call themselves.
const HANDLER_NAMES: &[&str] = &[
    "db", "payload", "current_user", "item", "items", "filters", "envelope", "status",
    "request", "jsonify", "g", "req", "res", "next", "Query", "Depends", "HTTPException",
    "Any", "Dict", "List", "Optional", "len", "str",
];

/// Replace anything that is not valid in an identifier with `_`, and suffix
/// reserved words with `_`.
pub fn identifier(name: &str) -> String {
    let mut ident: String = name
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
        .collect();
    if ident.is_empty() || ident.starts_with(|c: char| c.is_ascii_digit()) {
        ident.insert(0, '_');
    }
    if RESERVED_WORDS.contains(&ident.as_str()) {
        ident.push('_');
    }
    ident
}

/// [`identifier`], also clear of the handler's own names and of `taken`.
fn handler_identifier(name: &str, taken: &mut HashSet<String>) -> String {
    let mut ident = identifier(name);
    while HANDLER_NAMES.contains(&ident.as_str()) || taken.contains(&ident) {
        ident.push('_');
    }
    taken.insert(ident.clone());
    ident
}

/// Single-line text that cannot terminate a `"""` docstring or a `*/` comment.
fn doc_text(text: &str) -> String {
    text.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .replace('\\', "\\\\")
        .replace('"', "\\\"")
        .replace("*/", "* /")
}

/// Single Markdown line that cannot start a heading.
fn markdown_line(text: &str) -> String {
    let line = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if line.starts_with('#') {
        format!("\\{line}")
    } else {
        line
    }
}

/// Strip the common indentation of `body` and indent every non-blank line by `indent`.
fn indent_block(body: &str, indent: &str) -> String {
    let lines: Vec<&str> = body.trim_matches('\n').lines().collect();
    let common = lines
        .iter()
        .filter(|line| !line.trim().is_empty())
        .map(|line| line.len() - line.trim_start().len())
        .min()
        .unwrap_or(0);
    lines
        .iter()
        .map(|line| {
            if line.trim().is_empty() {
                String::new()
            } else {
                format!("{indent}{}", line.get(common..).unwrap_or(line.trim_start()).trim_end())
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn pretty(value: &Value) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
}
