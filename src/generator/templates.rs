use askama::Template;

use super::profiles::{auth_profile, database_profile, framework_profile, Package};
use super::view::SpecView;
use crate::spec::Framework;

/// Signature shared by every fragment builder in the registry.
pub type FragmentBuilder = fn(&SpecView) -> Result<String, askama::Error>;

/// Template data for the FastAPI application module (`main.py`)
#[derive(Template)]
#[template(path = "fastapi/main.py.txt", escape = "none")]
pub struct FastApiMainTemplate<'a> {
    pub spec: &'a SpecView,
}

/// Template data for the Flask application module (`app.py`)
#[derive(Template)]
#[template(path = "flask/app.py.txt", escape = "none")]
pub struct FlaskAppTemplate<'a> {
    pub spec: &'a SpecView,
}

/// Template data for the Express entry point (`index.js`)
#[derive(Template)]
#[template(path = "express/index.js.txt", escape = "none")]
pub struct ExpressIndexTemplate<'a> {
    pub spec: &'a SpecView,
}

/// Pydantic models, shared by both Python frameworks
#[derive(Template)]
#[template(path = "python/models.py.txt", escape = "none")]
pub struct PythonModelsTemplate<'a> {
    pub spec: &'a SpecView,
}

#[derive(Template)]
#[template(path = "express/models.js.txt", escape = "none")]
pub struct ExpressModelsTemplate<'a> {
    pub spec: &'a SpecView,
}

/// SQLAlchemy (sync engine) or motor setup for FastAPI
#[derive(Template)]
#[template(path = "fastapi/database.py.txt", escape = "none")]
pub struct FastApiDatabaseTemplate<'a> {
    pub spec: &'a SpecView,
}

/// SQLAlchemy or pymongo setup bound to the Flask app context
#[derive(Template)]
#[template(path = "flask/database.py.txt", escape = "none")]
pub struct FlaskDatabaseTemplate<'a> {
    pub spec: &'a SpecView,
}

/// Sequelize or mongoose setup for Express
#[derive(Template)]
#[template(path = "express/database.js.txt", escape = "none")]
pub struct ExpressDatabaseTemplate<'a> {
    pub spec: &'a SpecView,
}

#[derive(Template)]
#[template(path = "python/requirements.txt.txt", escape = "none")]
pub struct RequirementsTemplate {
    /// `name==version` lines, in install order
    pub pins: Vec<String>,
}

#[derive(Template)]
#[template(path = "express/package.json.txt", escape = "none")]
pub struct PackageJsonTemplate<'a> {
    pub spec: &'a SpecView,
    pub packages: Vec<Package>,
}

/// Markdown documentation, identical layout for every framework
#[derive(Template)]
#[template(path = "README.md.txt", escape = "none")]
pub struct ReadmeTemplate<'a> {
    pub spec: &'a SpecView,
}

pub fn fastapi_main(spec: &SpecView) -> Result<String, askama::Error> {
    FastApiMainTemplate { spec }.render()
}

pub fn flask_app(spec: &SpecView) -> Result<String, askama::Error> {
    FlaskAppTemplate { spec }.render()
}

pub fn express_index(spec: &SpecView) -> Result<String, askama::Error> {
    ExpressIndexTemplate { spec }.render()
}

pub fn python_models(spec: &SpecView) -> Result<String, askama::Error> {
    PythonModelsTemplate { spec }.render()
}

pub fn express_models(spec: &SpecView) -> Result<String, askama::Error> {
    ExpressModelsTemplate { spec }.render()
}

pub fn fastapi_database(spec: &SpecView) -> Result<String, askama::Error> {
    FastApiDatabaseTemplate { spec }.render()
}

pub fn flask_database(spec: &SpecView) -> Result<String, askama::Error> {
    FlaskDatabaseTemplate { spec }.render()
}

pub fn express_database(spec: &SpecView) -> Result<String, askama::Error> {
    ExpressDatabaseTemplate { spec }.render()
}

pub fn python_requirements(spec: &SpecView) -> Result<String, askama::Error> {
    let pins = python_packages(spec)
        .iter()
        .map(Package::pip_pin)
        .collect();
    RequirementsTemplate { pins }.render()
}

pub fn package_json(spec: &SpecView) -> Result<String, askama::Error> {
    PackageJsonTemplate {
        spec,
        packages: node_packages(spec),
    }
    .render()
}

pub fn readme(spec: &SpecView) -> Result<String, askama::Error> {
    ReadmeTemplate { spec }.render()
}

/// Framework, database and auth packages, first occurrence wins.
pub fn python_packages(spec: &SpecView) -> Vec<Package> {
    let database = database_profile(spec.database);
    let driver = match spec.framework {
        Framework::Flask => database.python_sync,
        Framework::FastApi | Framework::Express => database.python_async,
    };
    dedup(
        framework_profile(spec.framework)
            .python
            .iter()
            .chain(driver)
            .chain(auth_profile(spec.auth_method).python),
    )
}

pub fn node_packages(spec: &SpecView) -> Vec<Package> {
    dedup(
        framework_profile(spec.framework)
            .node
            .iter()
            .chain(database_profile(spec.database).node)
            .chain(auth_profile(spec.auth_method).node),
    )
}

fn dedup<'a>(packages: impl Iterator<Item = &'a Package>) -> Vec<Package> {
    let mut out: Vec<Package> = Vec::new();
    for package in packages {
        if !out.iter().any(|p| p.name == package.name) {
            out.push(*package);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spec::{ApiSpec, AuthMethod, Database, Endpoint, HttpMethod, Parameter};
    use serde_json::json;

    fn spec(framework: Framework, database: Database, auth: AuthMethod) -> SpecView {
        SpecView::new(
            &ApiSpec::new("Notes API", "Keeps notes")
                .with_stack(framework, database, auth)
                .with_endpoint(Endpoint::new(HttpMethod::Get, "/notes", "List notes"))
                .with_endpoint(
                    Endpoint::new(HttpMethod::Put, "/notes/{note_id}", "Update a note")
                        .with_parameter(Parameter::path("note_id"))
                        .with_request_example(json!({"title": "t"})),
                ),
        )
    }

    #[test]
    fn test_requirements_for_fastapi_postgres_jwt() {
        let text =
            python_requirements(&spec(Framework::FastApi, Database::Postgresql, AuthMethod::Jwt))
                .unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(
            lines,
            vec![
                "fastapi==0.104.1",
                "uvicorn[standard]==0.24.0",
                "pydantic==2.5.0",
                "sqlalchemy==2.0.23",
                "alembic==1.13.0",
                "psycopg2-binary==2.9.9",
                "python-jose[cryptography]==3.3.0",
                "passlib[bcrypt]==1.7.4",
            ]
        );
    }

    #[test]
    fn test_mongodb_driver_follows_framework() {
        let fastapi =
            python_requirements(&spec(Framework::FastApi, Database::Mongodb, AuthMethod::None))
                .unwrap();
        assert!(fastapi.contains("motor==3.3.2"));
        assert!(!fastapi.contains("sqlalchemy"));

        let flask =
            python_requirements(&spec(Framework::Flask, Database::Mongodb, AuthMethod::None))
                .unwrap();
        assert!(flask.contains("pymongo==4.6.1"));
        assert!(!flask.contains("motor"));
    }

    #[test]
    fn test_package_json_is_valid_json() {
        let text =
            package_json(&spec(Framework::Express, Database::Sqlite, AuthMethod::ApiKey)).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(parsed["name"], "notes-api");
        assert_eq!(parsed["dependencies"]["express"], "^4.18.2");
        assert_eq!(parsed["dependencies"]["sqlite3"], "^5.1.6");
        assert!(parsed["dependencies"].get("jsonwebtoken").is_none());
    }

    #[test]
    fn test_readme_lists_parameters_and_examples() {
        let text = readme(&spec(Framework::Flask, Database::Mysql, AuthMethod::None)).unwrap();
        assert!(text.contains("### GET /notes"));
        assert!(text.contains("| `note_id` | path | yes |"));
        assert!(text.contains("\"title\": \"t\""));
        assert!(!text.contains("## Authentication"));
    }

    #[test]
    fn test_sqlite_engine_disables_thread_check() {
        let text =
            fastapi_database(&spec(Framework::FastApi, Database::Sqlite, AuthMethod::None))
                .unwrap();
        assert!(text.contains("check_same_thread"));
        assert!(text.contains("sqlite:///./app.db"));
    }

    #[test]
    fn test_oauth2_tables() {
        let text = flask_database(&spec(Framework::Flask, Database::Postgresql, AuthMethod::OAuth2))
            .unwrap();
        assert!(text.contains("class User(Base):"));
        assert!(text.contains("class OAuthAccount(Base):"));
    }
}
