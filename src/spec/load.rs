use anyhow::Context;
use std::path::Path;

use super::types::ApiSpec;

/// Encoding of a persisted specification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpecFormat {
    Json,
    Yaml,
}

impl SpecFormat {
    /// Pick the format from a file extension; anything but `.yaml`/`.yml` is JSON.
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|s| s.to_str()) {
            Some("yaml") | Some("yml") => SpecFormat::Yaml,
            _ => SpecFormat::Json,
        }
    }
}

/// Parse a persisted specification. The result is not validated.
pub fn parse_spec(content: &str, format: SpecFormat) -> anyhow::Result<ApiSpec> {
    let spec = match format {
        SpecFormat::Json => serde_json::from_str(content)?,
        SpecFormat::Yaml => serde_yaml::from_str(content)?,
    };
    Ok(spec)
}

/// Load and validate a specification from a JSON or YAML file.
pub fn load_spec(path: &Path) -> anyhow::Result<ApiSpec> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read spec: {}", path.display()))?;
    let spec = parse_spec(&content, SpecFormat::from_path(path))
        .with_context(|| format!("Failed to parse spec: {}", path.display()))?;
    spec.validate()
        .with_context(|| format!("Invalid spec: {}", path.display()))?;
    Ok(spec)
}

/// Serialize a specification in the persisted format.
pub fn to_spec_string(spec: &ApiSpec, format: SpecFormat) -> anyhow::Result<String> {
    let out = match format {
        SpecFormat::Json => serde_json::to_string_pretty(spec)?,
        SpecFormat::Yaml => serde_yaml::to_string(spec)?,
    };
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spec::{AuthMethod, Framework};

    const YAML: &str = r#"
name: Notes API
description: Personal notes
framework: express
database: mongodb
auth_method: api-key
endpoints:
  - path: /notes/{note_id}
    method: DELETE
    description: Delete a note
    parameters:
      - name: note_id
        location: path
        required: true
"#;

    #[test]
    fn test_parse_yaml() {
        let spec = parse_spec(YAML, SpecFormat::Yaml).unwrap();
        assert_eq!(spec.framework, Framework::Express);
        assert_eq!(spec.auth_method, AuthMethod::ApiKey);
        assert_eq!(spec.version, "1.0.0");
        assert!(spec.validate().is_ok());
    }

    #[test]
    fn test_format_from_path() {
        assert_eq!(SpecFormat::from_path(Path::new("a.yml")), SpecFormat::Yaml);
        assert_eq!(SpecFormat::from_path(Path::new("a.json")), SpecFormat::Json);
        assert_eq!(SpecFormat::from_path(Path::new("a")), SpecFormat::Json);
    }

    #[test]
    fn test_load_rejects_invalid_spec() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.yaml");
        std::fs::write(&path, YAML.replace("name: note_id", "name: id")).unwrap();
        let err = load_spec(&path).unwrap_err();
        assert!(format!("{err:#}").contains("note_id"));
    }
}
