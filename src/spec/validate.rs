//! Structural validation of an [`ApiSpec`].
//!
//! Runs before synthesis and before any AI-produced candidate is handed back to
//! a caller. Nothing here repairs a spec; the first violation found is returned.

use std::collections::HashSet;

use super::types::{ApiSpec, HttpMethod};

/// Why a specification is invalid.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SpecError {
    #[error("duplicate endpoint {method} {path}")]
    DuplicateEndpoint { path: String, method: HttpMethod },

    #[error("invalid path `{path}`: must start with `/` and use well-formed `{{param}}` placeholders")]
    InvalidPath { path: String },

    #[error("path `{path}` references `{{{param}}}` but declares no path parameter named `{param}`")]
    UnresolvedPathParameter { path: String, param: String },

    #[error("specification declares no endpoints")]
    EmptyEndpointSet,

    #[error("unknown {field} value `{value}`")]
    UnknownEnumValue { field: String, value: String },

    #[error("{field} must not be empty")]
    EmptyField { field: String },

    #[error("version `{version}` is not a semantic version")]
    InvalidVersion { version: String },
}

/// Check every invariant of `spec`.
///
/// # Errors
///
/// Returns the first [`SpecError`] encountered, in this order: top-level
/// fields, endpoint set, then each endpoint in declaration order.
pub fn validate(spec: &ApiSpec) -> Result<(), SpecError> {
    require_text("name", &spec.name)?;
    require_text("description", &spec.description)?;
    if !is_semver(&spec.version) {
        return Err(SpecError::InvalidVersion {
            version: spec.version.clone(),
        });
    }
    if spec.endpoints.is_empty() {
        return Err(SpecError::EmptyEndpointSet);
    }

    let mut seen: HashSet<(&str, HttpMethod)> = HashSet::new();
    for (index, endpoint) in spec.endpoints.iter().enumerate() {
        let placeholders =
            path_placeholders(&endpoint.path).ok_or_else(|| SpecError::InvalidPath {
                path: endpoint.path.clone(),
            })?;

        require_text(&format!("endpoints[{index}].description"), &endpoint.description)?;
        for (p, param) in endpoint.parameters.iter().enumerate() {
            require_text(&format!("endpoints[{index}].parameters[{p}].name"), &param.name)?;
        }

        for placeholder in placeholders {
            let resolved = endpoint
                .path_parameters()
                .any(|param| param.name == placeholder);
            if !resolved {
                return Err(SpecError::UnresolvedPathParameter {
                    path: endpoint.path.clone(),
                    param: placeholder,
                });
            }
        }

        if !seen.insert((endpoint.path.as_str(), endpoint.method)) {
            return Err(SpecError::DuplicateEndpoint {
                path: endpoint.path.clone(),
                method: endpoint.method,
            });
        }
    }
    Ok(())
}

fn require_text(field: &str, value: &str) -> Result<(), SpecError> {
    if value.trim().is_empty() {
        return Err(SpecError::EmptyField {
            field: field.to_string(),
        });
    }
    Ok(())
}

/// Extract the `{param}` placeholder names of a path, in order.
///
/// Returns `None` when the path is malformed: missing leading `/`, whitespace,
/// query or fragment characters, a brace anywhere but around a whole segment,
/// a placeholder that is not an identifier, or the same placeholder used twice.
pub fn path_placeholders(path: &str) -> Option<Vec<String>> {
    if !path.starts_with('/') {
        return None;
    }
    if path
        .chars()
        .any(|c| c.is_whitespace() || c == '?' || c == '#')
    {
        return None;
    }

    let mut names: Vec<String> = Vec::new();
    for segment in path.split('/') {
        if !segment.contains(['{', '}']) {
            continue;
        }
        // `{name}` must fill the segment: frameworks bind nothing else.
        let name = segment.strip_prefix('{')?.strip_suffix('}')?;
        if !is_identifier(name) || names.iter().any(|n| n == name) {
            return None;
        }
        names.push(name.to_string());
    }
    Some(names)
}

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) if first.is_ascii_alphabetic() || first == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// `MAJOR.MINOR.PATCH` with optional `-pre` and `+build` suffixes.
///
/// Pre-release and build identifiers are dot-separated runs of
/// `[0-9A-Za-z-]`, so a version is always safe to quote.
pub fn is_semver(version: &str) -> bool {
    let (rest, build) = match version.split_once('+') {
        Some((head, build)) => (head, Some(build)),
        None => (version, None),
    };
    let (core, pre) = match rest.split_once('-') {
        Some((head, pre)) => (head, Some(pre)),
        None => (rest, None),
    };
    let parts: Vec<&str> = core.split('.').collect();
    parts.len() == 3
        && parts
            .iter()
            .all(|p| !p.is_empty() && p.chars().all(|c| c.is_ascii_digit()))
        && pre.map_or(true, dot_separated_identifiers)
        && build.map_or(true, dot_separated_identifiers)
}

fn dot_separated_identifiers(text: &str) -> bool {
    text.split('.').all(|part| {
        !part.is_empty() && part.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
    })
}
