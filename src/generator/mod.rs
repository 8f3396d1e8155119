//! # Generator Module
//!
//! Deterministic synthesis of a complete service project from an [`ApiSpec`].
//!
//! ## Overview
//!
//! Every run produces exactly five artifacts, one per [`ArtifactRole`]:
//!
//! - **main** - application wiring and one route registration per endpoint
//! - **models** - request/response shapes
//! - **database** - connection setup plus the tables the auth method needs
//! - **dependencies** - pinned packages (`requirements.txt` or `package.json`)
//! - **documentation** - a `README.md` describing every endpoint
//!
//! ## Architecture
//!
//! ```text
//! ApiSpec → validate → registry lookup (role, framework, database, auth) → SpecView → askama → ArtifactSet
//! ```
//!
//! 1. **Validation** - the spec is checked before anything is looked up
//! 2. **Registry** - a static table keyed by the four-tuple; unsupported
//!    pairs (`mongodb` + `oauth2`) fail with `UnsupportedCombination`
//! 3. **View** - names, framework path syntax and literals are computed once
//! 4. **Rendering** - askama templates under `templates/`, compiled into the binary
//!
//! Endpoint fragments in the main and documentation artifacts follow the
//! order of `spec.endpoints` exactly.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use apiforge::generator::{synthesize, ArtifactRole};
//! use apiforge::spec::load_spec;
//!
//! # fn main() -> anyhow::Result<()> {
//! let spec = load_spec("user_management.json".as_ref())?;
//! let artifacts = synthesize(&spec)?;
//! println!("{}", artifacts.content(ArtifactRole::Main));
//! # Ok(())
//! # }
//! ```
//!
//! ## Templates
//!
//! - `fastapi/main.py.txt`, `flask/app.py.txt`, `express/index.js.txt` - main
//! - `python/models.py.txt`, `express/models.js.txt` - models
//! - `fastapi/database.py.txt`, `flask/database.py.txt`, `express/database.js.txt` - database
//! - `python/requirements.txt.txt`, `express/package.json.txt` - dependencies
//! - `README.md.txt` - documentation
//!
//! [`ApiSpec`]: crate::spec::ApiSpec

mod artifact;
mod profiles;
mod project;
mod registry;
pub mod scan;
mod synthesize;
mod templates;
mod view;

pub use artifact::{Artifact, ArtifactRole, ArtifactSet};
pub use profiles::{
    auth_profile, database_profile, framework_profile, is_supported, AuthProfile,
    DatabaseProfile, EnvVar, FrameworkProfile, Package,
};
pub use project::{write_project, WriteOptions, WriteReport};
pub use registry::{registry, Fragment, FragmentKey, TemplateRegistry, BUILDERS};
pub use synthesize::{render_main_with_logic, synthesize, synthesize_with, SynthesisError};
pub use templates::{node_packages, python_packages, FragmentBuilder};
pub use view::{
    camel_case, function_name, is_public_path, route_path, Action, EndpointView, ParamView, SpecView,
};
