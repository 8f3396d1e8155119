//! # Configuration Module
//!
//! Settings for the language-model service, loaded in three layers:
//!
//! 1. built-in defaults
//! 2. an optional TOML file (`apiforge.toml` in the working directory, or `--config`)
//! 3. environment overrides
//!
//! ## File format
//!
//! ```toml
//! [ai]
//! base_url = "https://api.openai.com/v1"
//! model = "gpt-4o"
//! api_key_env = "OPENAI_API_KEY"
//! timeout_secs = 60
//! extraction_max_tokens = 3000
//! review_max_tokens = 2500
//! logic_max_tokens = 2000
//! extraction_temperature = 0.7
//! review_temperature = 0.2
//! logic_temperature = 0.3
//! ```
//!
//! ## Environment Variables
//!
//! - `OPENAI_URL` - overrides `ai.base_url`
//! - `OPENAI_API_MODEL` - overrides `ai.model`
//! - `APIFORGE_AI_TIMEOUT_SECS` - overrides `ai.timeout_secs`
//!
//! The API key itself is never part of the configuration; only the name of the
//! variable that holds it is.

use anyhow::{bail, Context};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

/// File looked up in the working directory when no `--config` is given.
pub const DEFAULT_CONFIG_FILE: &str = "apiforge.toml";

/// Language-model settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AiConfig {
    /// Base URL of an OpenAI-compatible API (default: `https://api.openai.com/v1`)
    pub base_url: String,
    pub model: String,
    /// Name of the environment variable holding the API key
    pub api_key_env: String,
    /// Upper bound on a single call (default: 60)
    pub timeout_secs: u64,
    pub extraction_max_tokens: u32,
    pub review_max_tokens: u32,
    /// Per-endpoint handler generation (fully-AI mode)
    pub logic_max_tokens: u32,
    pub extraction_temperature: f32,
    pub review_temperature: f32,
    pub logic_temperature: f32,
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com/v1".to_string(),
            model: "gpt-4o".to_string(),
            api_key_env: "OPENAI_API_KEY".to_string(),
            timeout_secs: 60,
            extraction_max_tokens: 3000,
            review_max_tokens: 2500,
            logic_max_tokens: 2000,
            extraction_temperature: 0.7,
            review_temperature: 0.2,
            logic_temperature: 0.3,
        }
    }
}

impl AiConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorConfig {
    pub ai: AiConfig,
}

impl GeneratorConfig {
    /// Defaults, then the config file, then the process environment.
    ///
    /// An explicit `path` must exist; the default `apiforge.toml` is optional.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let mut config = match path {
            Some(path) => {
                if !path.exists() {
                    bail!("Config file not found: {}", path.display());
                }
                load_config_file(path)?.unwrap_or_default()
            }
            None => load_config_file(&default_config_path())?.unwrap_or_default(),
        };
        config.apply_overrides(|name| std::env::var(name).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Apply `OPENAI_URL`, `OPENAI_API_MODEL` and `APIFORGE_AI_TIMEOUT_SECS` from `lookup`.
    pub fn apply_overrides(
        &mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> anyhow::Result<()> {
        let present = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        if let Some(url) = present("OPENAI_URL") {
            debug!(base_url = %url, "base URL overridden from environment");
            self.ai.base_url = url.trim().to_string();
        }
        if let Some(model) = present("OPENAI_API_MODEL") {
            self.ai.model = model.trim().to_string();
        }
        if let Some(secs) = present("APIFORGE_AI_TIMEOUT_SECS") {
            self.ai.timeout_secs = secs
                .trim()
                .parse()
                .with_context(|| format!("APIFORGE_AI_TIMEOUT_SECS is not a number: {secs}"))?;
        }
        Ok(())
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        url::Url::parse(&self.ai.base_url)
            .with_context(|| format!("ai.base_url is not a valid URL: {}", self.ai.base_url))?;
        if self.ai.timeout_secs == 0 {
            bail!("ai.timeout_secs must be greater than zero");
        }
        if self.ai.model.trim().is_empty() {
            bail!("ai.model must not be empty");
        }
        if self.ai.api_key_env.trim().is_empty() {
            bail!("ai.api_key_env must not be empty");
        }
        Ok(())
    }
}

/// `apiforge.toml` in the working directory.
pub fn default_config_path() -> PathBuf {
    PathBuf::from(DEFAULT_CONFIG_FILE)
}

/// Load a configuration file.
///
/// Returns `Ok(None)` if the file doesn't exist (not an error),
/// `Err` if it exists but fails to parse.
pub fn load_config_file(path: &Path) -> anyhow::Result<Option<GeneratorConfig>> {
    if !path.exists() {
        return Ok(None);
    }
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config: {}", path.display()))?;
    let config: GeneratorConfig = toml::from_str(&contents)
        .with_context(|| format!("Failed to parse config: {}", path.display()))?;
    debug!(path = %path.display(), "loaded configuration file");
    Ok(Some(config))
}
