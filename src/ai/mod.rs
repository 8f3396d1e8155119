//! # AI Module
//!
//! Everything that talks to a language-model service.
//!
//! The service is an untrusted oracle: it receives a prompt and returns text.
//! Callers ([`crate::extract`], [`crate::enhance`]) own all parsing and
//! validation of that text; this module only moves it.
//!
//! - [`LanguageModel`] - the async seam, implemented by [`OpenAiClient`] and by test fakes
//! - [`complete_within`] - one call with a hard deadline
//! - [`prompts`] - minijinja prompt templates
//! - [`json`] - fence stripping and JSON salvage

mod error;
pub mod json;
mod openai;
pub mod prompts;
mod provider;

pub use error::{PromptError, ProviderError};
pub use openai::OpenAiClient;
pub use provider::{complete_within, Completion, CompletionRequest, LanguageModel, JSON_FORMAT};
