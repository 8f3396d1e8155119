use tracing::{debug, info};

use super::artifact::{ArtifactRole, ArtifactSet};
use super::registry::{registry, FragmentKey, TemplateRegistry};
use super::view::SpecView;
use crate::spec::{ApiSpec, AuthMethod, Database, SpecError};

/// Why a specification could not be turned into artifacts.
#[derive(Debug, thiserror::Error)]
pub enum SynthesisError {
    #[error(transparent)]
    Spec(#[from] SpecError),

    #[error("no fragment registered for database `{database}` with auth method `{auth_method}`")]
    UnsupportedCombination {
        database: Database,
        auth_method: AuthMethod,
    },

    #[error("failed to render the {role} artifact")]
    Render {
        role: ArtifactRole,
        #[source]
        source: askama::Error,
    },
}

/// Turn a specification into its five artifacts using the built-in registry.
///
/// Pure: no filesystem or network access, and the same spec always yields a
/// byte-identical [`ArtifactSet`].
///
/// # Errors
///
/// - [`SynthesisError::Spec`] when `spec` fails validation
/// - [`SynthesisError::UnsupportedCombination`] when no fragment exists for the stack
pub fn synthesize(spec: &ApiSpec) -> Result<ArtifactSet, SynthesisError> {
    synthesize_with(registry(), spec)
}

/// [`synthesize`] against an explicit registry.
pub fn synthesize_with(
    registry: &TemplateRegistry,
    spec: &ApiSpec,
) -> Result<ArtifactSet, SynthesisError> {
    spec.validate()?;

    // Resolve every role before rendering anything.
    let mut fragments = Vec::with_capacity(ArtifactRole::ALL.len());
    for role in ArtifactRole::ALL {
        let key = FragmentKey::new(role, spec.framework, spec.database, spec.auth_method);
        debug!(%key, "resolving fragment");
        fragments.push(*registry.lookup(&key)?);
    }

    let view = SpecView::new(spec);
    let artifacts = ArtifactSet::try_build(spec.framework, |role| {
        let fragment = fragments
            .iter()
            .find(|f| f.key.role == role)
            .ok_or(SynthesisError::UnsupportedCombination {
                database: spec.database,
                auth_method: spec.auth_method,
            })?;
        fragment
            .render(&view)
            .map_err(|source| SynthesisError::Render { role, source })
    })?;

    info!(
        api = %spec.name,
        framework = %spec.framework,
        database = %spec.database,
        auth = %spec.auth_method,
        endpoints = spec.endpoints.len(),
        digest = %artifacts.digest(),
        "synthesized artifact set"
    );
    Ok(artifacts)
}

/// Render only the main artifact, with generated handler bodies.
///
/// `bodies[i]` replaces the default body of `spec.endpoints[i]`; `None`, or
/// an index past the end, keeps the default.
pub fn render_main_with_logic(
    spec: &ApiSpec,
    bodies: &[Option<String>],
) -> Result<String, SynthesisError> {
    spec.validate()?;
    let key = FragmentKey::new(
        ArtifactRole::Main,
        spec.framework,
        spec.database,
        spec.auth_method,
    );
    let fragment = registry().lookup(&key)?;

    let mut view = SpecView::new(spec);
    for (endpoint, body) in view.endpoints.iter_mut().zip(bodies) {
        if let Some(body) = body {
            endpoint.set_logic(spec.framework, body);
        }
    }
    fragment
        .render(&view)
        .map_err(|source| SynthesisError::Render {
            role: ArtifactRole::Main,
            source,
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spec::{Endpoint, Framework, HttpMethod, Parameter};

    fn notes() -> ApiSpec {
        ApiSpec::new("Notes", "Keeps notes")
            .with_endpoint(Endpoint::new(HttpMethod::Get, "/notes", "List notes"))
            .with_endpoint(
                Endpoint::new(HttpMethod::Delete, "/notes/{id}", "Delete a note")
                    .with_parameter(Parameter::path("id")),
            )
    }

    #[test]
    fn test_invalid_spec_is_rejected_before_lookup() {
        let spec = ApiSpec::new("Empty", "Nothing").with_stack(
            Framework::FastApi,
            Database::Mongodb,
            AuthMethod::OAuth2,
        );
        assert!(matches!(
            synthesize(&spec),
            Err(SynthesisError::Spec(SpecError::EmptyEndpointSet))
        ));
    }

    #[test]
    fn test_unsupported_combination() {
        let spec = notes().with_stack(Framework::Express, Database::Mongodb, AuthMethod::OAuth2);
        assert!(matches!(
            synthesize(&spec),
            Err(SynthesisError::UnsupportedCombination {
                database: Database::Mongodb,
                auth_method: AuthMethod::OAuth2
            })
        ));
    }

    #[test]
    fn test_empty_registry_is_unsupported() {
        let registry = TemplateRegistry::empty();
        assert!(matches!(
            synthesize_with(&registry, &notes()),
            Err(SynthesisError::UnsupportedCombination { .. })
        ));
    }

    #[test]
    fn test_main_with_logic() {
        let spec = notes().with_stack(Framework::Flask, Database::Sqlite, AuthMethod::None);
        let baseline = synthesize(&spec).unwrap();
        assert_eq!(
            render_main_with_logic(&spec, &[]).unwrap(),
            baseline.content(ArtifactRole::Main)
        );

        let body = "rows = db.execute(\"SELECT * FROM notes\").fetchall()\nreturn envelope([dict(r) for r in rows], \"Notes\")";
        let main = render_main_with_logic(&spec, &[Some(body.to_string()), None]).unwrap();
        assert!(main.contains("    db = get_db()\n    rows = db.execute("));
        assert!(main.contains("\n    return envelope([dict(r) for r in rows], \"Notes\")\n"));
        assert!(!main.contains("items: List[Dict[str, Any]] = []"));
        assert!(main.contains("item[\"id\"] = id"));
    }

    #[test]
    fn test_every_supported_stack_renders() {
        for framework in Framework::ALL {
            for database in Database::ALL {
                for auth in AuthMethod::ALL {
                    let spec = notes().with_stack(framework, database, auth);
                    let result = synthesize(&spec);
                    if database == Database::Mongodb && auth == AuthMethod::OAuth2 {
                        assert!(result.is_err());
                        continue;
                    }
                    let artifacts = result.unwrap();
                    for artifact in artifacts.iter() {
                        assert!(
                            !artifact.content.trim().is_empty(),
                            "{framework}/{database}/{auth}: empty {}",
                            artifact.role
                        );
                    }
                }
            }
        }
    }
}
