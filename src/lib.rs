//! # apiforge
//!
//! **apiforge** turns a structured description of a REST API into a runnable,
//! multi-file service project, and can derive that description from a
//! plain-language request with the help of a language model.
//!
//! ## Architecture
//!
//! - **[`spec`]** - the specification model, its persisted format and validation
//! - **[`generator`]** - deterministic synthesis of five artifacts from a spec
//! - **[`extract`]** - natural language to a validated spec, through a language model
//! - **[`enhance`]** - best-effort AI review that never breaks spec consistency
//! - **[`logic`]** - fully-AI mode: generated handler bodies, merged under the same checks
//! - **[`ai`]** - the [`ai::LanguageModel`] seam and its OpenAI-compatible client
//! - **[`service`]** - the [`ApiGenerator`] facade tying the pieces together
//! - **[`examples`]** - built-in example specifications
//! - **[`config`]**, **[`logging`]**, **[`cli`]** - the application shell
//!
//! ### Generation Flow
//!
//! ```mermaid
//! sequenceDiagram
//!     participant Caller
//!     participant Extract as extract
//!     participant LM as LanguageModel
//!     participant Gen as generator::synthesize
//!     participant Enh as enhance
//!
//!     opt free-text request
//!         Caller->>Extract: extract(description, hints)
//!         Extract->>LM: extraction prompt
//!         LM-->>Extract: JSON text
//!         Extract->>Extract: interpret, default, validate
//!         Extract-->>Caller: ApiSpec
//!     end
//!     Caller->>Gen: synthesize(&spec)
//!     Gen-->>Caller: ArtifactSet (main, models, database, dependencies, documentation)
//!     opt fully_ai mode
//!         Caller->>Enh: enhance_endpoint_logic(&spec, &artifacts)
//!         Enh->>LM: one logic prompt per endpoint
//!         LM-->>Enh: handler bodies
//!         Enh->>Enh: re-render main, keep bodies that pass the scan
//!     end
//!     opt ai_assisted or fully_ai mode
//!         Caller->>Enh: enhance(&spec, &artifacts)
//!         Enh->>LM: review prompt
//!         LM-->>Enh: proposals
//!         Enh->>Enh: scan and merge accepted proposals
//!         Enh-->>Caller: ArtifactSet
//!     end
//! ```
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use apiforge::generator::{synthesize, ArtifactRole};
//! use apiforge::spec::{ApiSpec, AuthMethod, Database, Endpoint, Framework, HttpMethod, Parameter};
//!
//! let spec = ApiSpec::new("Notes API", "Personal notes")
//!     .with_stack(Framework::Flask, Database::Sqlite, AuthMethod::ApiKey)
//!     .with_endpoint(Endpoint::new(HttpMethod::Get, "/notes", "List notes"))
//!     .with_endpoint(
//!         Endpoint::new(HttpMethod::Get, "/notes/{note_id}", "Fetch a note")
//!             .with_parameter(Parameter::path("note_id")),
//!     );
//!
//! let artifacts = synthesize(&spec)?;
//! assert_eq!(artifacts.get(ArtifactRole::Main).file_name, "app.py");
//! ```
//!
//! ## Supported stacks
//!
//! | Framework | Databases | Auth |
//! |---|---|---|
//! | FastAPI, Flask, Express | PostgreSQL, MySQL, MongoDB, SQLite | JWT, OAuth2, API key, none |
//!
//! Every combination is registered except MongoDB with OAuth2.

pub mod ai;
pub mod cli;
pub mod config;
pub mod enhance;
pub mod examples;
pub mod extract;
pub mod generator;
pub mod ids;
pub mod logging;
pub mod logic;
pub mod service;
pub mod spec;

pub use generator::{synthesize, ArtifactRole, ArtifactSet, SynthesisError};
pub use service::{AiStatus, ApiGenerator, GenerationMode, GenerationOutcome};
pub use spec::{load_spec, ApiSpec};
