use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

use super::validate::SpecError;

/// HTTP verbs an endpoint may declare.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl HttpMethod {
    pub const ALL: [HttpMethod; 5] = [
        HttpMethod::Get,
        HttpMethod::Post,
        HttpMethod::Put,
        HttpMethod::Patch,
        HttpMethod::Delete,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Patch => "PATCH",
            HttpMethod::Delete => "DELETE",
        }
    }

    /// Lower-case verb, as used by `@app.get(...)` / `app.get(...)` style registrations.
    pub fn as_lower(&self) -> &'static str {
        match self {
            HttpMethod::Get => "get",
            HttpMethod::Post => "post",
            HttpMethod::Put => "put",
            HttpMethod::Patch => "patch",
            HttpMethod::Delete => "delete",
        }
    }

    /// Whether requests with this verb conventionally carry a JSON body.
    pub fn has_body(&self) -> bool {
        matches!(self, HttpMethod::Post | HttpMethod::Put | HttpMethod::Patch)
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HttpMethod {
    type Err = SpecError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        coerce("method", s, METHOD_ALIASES)
    }
}

/// Target web framework of the generated project.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Framework {
    #[serde(rename = "fastapi")]
    FastApi,
    #[serde(rename = "flask")]
    Flask,
    #[serde(rename = "express")]
    Express,
}

impl Framework {
    pub const ALL: [Framework; 3] = [Framework::FastApi, Framework::Flask, Framework::Express];

    pub fn as_str(&self) -> &'static str {
        match self {
            Framework::FastApi => "fastapi",
            Framework::Flask => "flask",
            Framework::Express => "express",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Framework::FastApi => "FastAPI",
            Framework::Flask => "Flask",
            Framework::Express => "Express",
        }
    }
}

impl fmt::Display for Framework {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Framework {
    type Err = SpecError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        coerce("framework", s, FRAMEWORK_ALIASES)
    }
}

/// Persistence backend of the generated project.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Database {
    #[serde(rename = "postgresql")]
    Postgresql,
    #[serde(rename = "mysql")]
    Mysql,
    #[serde(rename = "mongodb")]
    Mongodb,
    #[serde(rename = "sqlite")]
    Sqlite,
}

impl Database {
    pub const ALL: [Database; 4] = [
        Database::Postgresql,
        Database::Mysql,
        Database::Mongodb,
        Database::Sqlite,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Database::Postgresql => "postgresql",
            Database::Mysql => "mysql",
            Database::Mongodb => "mongodb",
            Database::Sqlite => "sqlite",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Database::Postgresql => "PostgreSQL",
            Database::Mysql => "MySQL",
            Database::Mongodb => "MongoDB",
            Database::Sqlite => "SQLite",
        }
    }

    /// Relational backends share the ORM-based fragments.
    pub fn is_relational(&self) -> bool {
        !matches!(self, Database::Mongodb)
    }
}

impl fmt::Display for Database {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Database {
    type Err = SpecError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        coerce("database", s, DATABASE_ALIASES)
    }
}

/// Authentication strategy applied to non-public endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum AuthMethod {
    #[serde(rename = "jwt")]
    Jwt,
    #[serde(rename = "oauth2")]
    OAuth2,
    #[serde(rename = "api-key")]
    ApiKey,
    #[serde(rename = "none")]
    None,
}

impl AuthMethod {
    pub const ALL: [AuthMethod; 4] = [
        AuthMethod::Jwt,
        AuthMethod::OAuth2,
        AuthMethod::ApiKey,
        AuthMethod::None,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AuthMethod::Jwt => "jwt",
            AuthMethod::OAuth2 => "oauth2",
            AuthMethod::ApiKey => "api-key",
            AuthMethod::None => "none",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            AuthMethod::Jwt => "JWT bearer token",
            AuthMethod::OAuth2 => "OAuth2 authorization code",
            AuthMethod::ApiKey => "API key header",
            AuthMethod::None => "none",
        }
    }

    pub fn is_enabled(&self) -> bool {
        !matches!(self, AuthMethod::None)
    }
}

impl fmt::Display for AuthMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AuthMethod {
    type Err = SpecError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        coerce("auth_method", s, AUTH_ALIASES)
    }
}

/// Where a declared parameter is read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParameterLocation {
    Path,
    Query,
}

impl ParameterLocation {
    pub fn as_str(&self) -> &'static str {
        match self {
            ParameterLocation::Path => "path",
            ParameterLocation::Query => "query",
        }
    }
}

impl fmt::Display for ParameterLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ParameterLocation {
    type Err = SpecError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        coerce("location", s, LOCATION_ALIASES)
    }
}

// Accepted spellings, matched after trimming and lower-casing. Anything else is
// an `UnknownEnumValue`.
const METHOD_ALIASES: &[(&str, HttpMethod)] = &[
    ("get", HttpMethod::Get),
    ("post", HttpMethod::Post),
    ("put", HttpMethod::Put),
    ("patch", HttpMethod::Patch),
    ("delete", HttpMethod::Delete),
];

const FRAMEWORK_ALIASES: &[(&str, Framework)] = &[
    ("fastapi", Framework::FastApi),
    ("fast-api", Framework::FastApi),
    ("fast_api", Framework::FastApi),
    ("flask", Framework::Flask),
    ("express", Framework::Express),
    ("expressjs", Framework::Express),
    ("express.js", Framework::Express),
];

const DATABASE_ALIASES: &[(&str, Database)] = &[
    ("postgresql", Database::Postgresql),
    ("postgres", Database::Postgresql),
    ("pg", Database::Postgresql),
    ("mysql", Database::Mysql),
    ("mariadb", Database::Mysql),
    ("mongodb", Database::Mongodb),
    ("mongo", Database::Mongodb),
    ("sqlite", Database::Sqlite),
    ("sqlite3", Database::Sqlite),
];

const AUTH_ALIASES: &[(&str, AuthMethod)] = &[
    ("jwt", AuthMethod::Jwt),
    ("bearer", AuthMethod::Jwt),
    ("token", AuthMethod::Jwt),
    ("oauth2", AuthMethod::OAuth2),
    ("oauth", AuthMethod::OAuth2),
    ("oauth 2.0", AuthMethod::OAuth2),
    ("api-key", AuthMethod::ApiKey),
    ("api_key", AuthMethod::ApiKey),
    ("apikey", AuthMethod::ApiKey),
    ("api key", AuthMethod::ApiKey),
    ("none", AuthMethod::None),
    ("no", AuthMethod::None),
];

const LOCATION_ALIASES: &[(&str, ParameterLocation)] = &[
    ("path", ParameterLocation::Path),
    ("query", ParameterLocation::Query),
];

fn coerce<T: Copy>(field: &str, raw: &str, aliases: &[(&str, T)]) -> Result<T, SpecError> {
    let needle = raw.trim().to_ascii_lowercase();
    aliases
        .iter()
        .find(|(alias, _)| *alias == needle)
        .map(|(_, value)| *value)
        .ok_or_else(|| SpecError::UnknownEnumValue {
            field: field.to_string(),
            value: raw.to_string(),
        })
}

/// A named parameter of an endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Parameter {
    pub name: String,
    pub location: ParameterLocation,
    #[serde(default)]
    pub required: bool,
}

impl Parameter {
    /// A path parameter; always required.
    pub fn path(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            location: ParameterLocation::Path,
            required: true,
        }
    }

    pub fn query(name: impl Into<String>, required: bool) -> Self {
        Self {
            name: name.into(),
            location: ParameterLocation::Query,
            required,
        }
    }
}

/// One HTTP surface point of the API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Endpoint {
    pub path: String,
    pub method: HttpMethod,
    pub description: String,
    #[serde(default)]
    pub parameters: Vec<Parameter>,
    /// Documentation-only example; never validated against anything.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_body_example: Option<Value>,
    /// Documentation-only example; never validated against anything.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_example: Option<Value>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
}

impl Endpoint {
    pub fn new(method: HttpMethod, path: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            method,
            description: description.into(),
            parameters: Vec::new(),
            request_body_example: None,
            response_example: None,
            tags: Vec::new(),
        }
    }

    pub fn with_parameter(mut self, parameter: Parameter) -> Self {
        self.parameters.push(parameter);
        self
    }

    pub fn with_request_example(mut self, example: Value) -> Self {
        self.request_body_example = Some(example);
        self
    }

    pub fn with_response_example(mut self, example: Value) -> Self {
        self.response_example = Some(example);
        self
    }

    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    /// `METHOD /path`, the identity of an endpoint within a spec.
    pub fn signature(&self) -> String {
        format!("{} {}", self.method, self.path)
    }

    pub fn path_parameters(&self) -> impl Iterator<Item = &Parameter> {
        self.parameters
            .iter()
            .filter(|p| p.location == ParameterLocation::Path)
    }

    pub fn query_parameters(&self) -> impl Iterator<Item = &Parameter> {
        self.parameters
            .iter()
            .filter(|p| p.location == ParameterLocation::Query)
    }
}

pub(crate) fn default_version() -> String {
    "1.0.0".to_string()
}

/// The complete description of an API that synthesis consumes.
///
/// Field names and enum spellings are the persisted format shared with stored
/// example specifications; do not rename them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiSpec {
    pub name: String,
    pub description: String,
    #[serde(default = "default_version")]
    pub version: String,
    pub framework: Framework,
    pub database: Database,
    #[serde(alias = "authentication")]
    pub auth_method: AuthMethod,
    pub endpoints: Vec<Endpoint>,
}

impl ApiSpec {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            version: default_version(),
            framework: Framework::FastApi,
            database: Database::Sqlite,
            auth_method: AuthMethod::None,
            endpoints: Vec::new(),
        }
    }

    pub fn with_stack(mut self, framework: Framework, database: Database, auth: AuthMethod) -> Self {
        self.framework = framework;
        self.database = database;
        self.auth_method = auth;
        self
    }

    pub fn with_endpoint(mut self, endpoint: Endpoint) -> Self {
        self.endpoints.push(endpoint);
        self
    }

    /// Check every structural invariant. See [`super::validate`].
    pub fn validate(&self) -> Result<(), SpecError> {
        super::validate::validate(self)
    }

    /// Lower-case, underscore-separated identifier derived from the name.
    pub fn slug(&self) -> String {
        let slug = self
            .name
            .to_lowercase()
            .replace(|c: char| !c.is_ascii_alphanumeric(), "_");
        let mut collapsed = String::with_capacity(slug.len());
        for c in slug.chars() {
            if c == '_' && collapsed.ends_with('_') {
                continue;
            }
            collapsed.push(c);
        }
        let trimmed = collapsed.trim_matches('_');
        if trimmed.is_empty() {
            "api".to_string()
        } else {
            trimmed.to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_enum_wire_spellings() {
        assert_eq!(serde_json::to_value(HttpMethod::Patch).unwrap(), json!("PATCH"));
        assert_eq!(serde_json::to_value(Framework::FastApi).unwrap(), json!("fastapi"));
        assert_eq!(serde_json::to_value(Database::Sqlite).unwrap(), json!("sqlite"));
        assert_eq!(serde_json::to_value(AuthMethod::ApiKey).unwrap(), json!("api-key"));
        assert_eq!(serde_json::to_value(AuthMethod::OAuth2).unwrap(), json!("oauth2"));
        assert_eq!(
            serde_json::to_value(ParameterLocation::Query).unwrap(),
            json!("query")
        );
    }

    #[test]
    fn test_alias_coercion() {
        assert_eq!("FastAPI".parse::<Framework>().unwrap(), Framework::FastApi);
        assert_eq!(" Postgres ".parse::<Database>().unwrap(), Database::Postgresql);
        assert_eq!("JWT".parse::<AuthMethod>().unwrap(), AuthMethod::Jwt);
        assert_eq!("api_key".parse::<AuthMethod>().unwrap(), AuthMethod::ApiKey);
        assert_eq!("get".parse::<HttpMethod>().unwrap(), HttpMethod::Get);
    }

    #[test]
    fn test_unknown_value_is_rejected() {
        let err = "django".parse::<Framework>().unwrap_err();
        assert_eq!(
            err,
            SpecError::UnknownEnumValue {
                field: "framework".into(),
                value: "django".into()
            }
        );
        assert!("HEAD".parse::<HttpMethod>().is_err());
        assert!("redis".parse::<Database>().is_err());
    }

    #[test]
    fn test_authentication_alias_and_version_default() {
        let spec: ApiSpec = serde_json::from_value(json!({
            "name": "Todo",
            "description": "Todo items",
            "framework": "flask",
            "database": "sqlite",
            "authentication": "none",
            "endpoints": [
                {"path": "/todos", "method": "GET", "description": "List todos"}
            ]
        }))
        .unwrap();
        assert_eq!(spec.version, "1.0.0");
        assert_eq!(spec.auth_method, AuthMethod::None);
        assert!(spec.endpoints[0].parameters.is_empty());

        let out = serde_json::to_value(&spec).unwrap();
        assert_eq!(out["auth_method"], json!("none"));
        assert!(out.get("authentication").is_none());
    }

    #[test]
    fn test_slug() {
        let spec = ApiSpec::new("User Management API", "d");
        assert_eq!(spec.slug(), "user_management_api");
        assert_eq!(ApiSpec::new("E-commerce  API!", "d").slug(), "e_commerce_api");
        assert_eq!(ApiSpec::new("***", "d").slug(), "api");
    }
}
