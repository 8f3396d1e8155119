//! Tuple-keyed catalog of fragment builders.
//!
//! The built-in table is assembled once from [`BUILDERS`] and the supported
//! database/auth pairs. Adding a framework or choice is a data change here,
//! not a new branch in the synthesizer.

use once_cell::sync::Lazy;
use std::collections::HashMap;
use std::fmt;

use super::artifact::ArtifactRole;
use super::profiles::is_supported;
use super::synthesize::SynthesisError;
use super::templates::{self, FragmentBuilder};
use super::view::SpecView;
use crate::spec::{AuthMethod, Database, Framework};

/// Registry key: one artifact role under one stack choice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FragmentKey {
    pub role: ArtifactRole,
    pub framework: Framework,
    pub database: Database,
    pub auth_method: AuthMethod,
}

impl FragmentKey {
    pub fn new(
        role: ArtifactRole,
        framework: Framework,
        database: Database,
        auth_method: AuthMethod,
    ) -> Self {
        Self {
            role,
            framework,
            database,
            auth_method,
        }
    }
}

impl fmt::Display for FragmentKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{}/{}/{}",
            self.role, self.framework, self.database, self.auth_method
        )
    }
}

/// A registered fragment builder.
#[derive(Clone, Copy)]
pub struct Fragment {
    pub key: FragmentKey,
    build: FragmentBuilder,
}

impl Fragment {
    pub fn render(&self, spec: &SpecView) -> Result<String, askama::Error> {
        (self.build)(spec)
    }
}

impl fmt::Debug for Fragment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Fragment").field("key", &self.key).finish()
    }
}

/// Builder per (role, framework). Database and auth variation is carried by
/// the profiles inside the view.
pub const BUILDERS: [(ArtifactRole, Framework, FragmentBuilder); 15] = [
    (ArtifactRole::Main, Framework::FastApi, templates::fastapi_main),
    (ArtifactRole::Main, Framework::Flask, templates::flask_app),
    (ArtifactRole::Main, Framework::Express, templates::express_index),
    (ArtifactRole::Models, Framework::FastApi, templates::python_models),
    (ArtifactRole::Models, Framework::Flask, templates::python_models),
    (ArtifactRole::Models, Framework::Express, templates::express_models),
    (ArtifactRole::Database, Framework::FastApi, templates::fastapi_database),
    (ArtifactRole::Database, Framework::Flask, templates::flask_database),
    (ArtifactRole::Database, Framework::Express, templates::express_database),
    (ArtifactRole::Dependencies, Framework::FastApi, templates::python_requirements),
    (ArtifactRole::Dependencies, Framework::Flask, templates::python_requirements),
    (ArtifactRole::Dependencies, Framework::Express, templates::package_json),
    (ArtifactRole::Documentation, Framework::FastApi, templates::readme),
    (ArtifactRole::Documentation, Framework::Flask, templates::readme),
    (ArtifactRole::Documentation, Framework::Express, templates::readme),
];

static BUILTIN: Lazy<TemplateRegistry> = Lazy::new(TemplateRegistry::builtin);

/// The process-wide, read-only registry.
pub fn registry() -> &'static TemplateRegistry {
    &BUILTIN
}

/// Lookup table from [`FragmentKey`] to [`Fragment`].
#[derive(Debug, Default)]
pub struct TemplateRegistry {
    fragments: HashMap<FragmentKey, Fragment>,
}

impl TemplateRegistry {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Every role for every framework, for each supported database/auth pair.
    pub fn builtin() -> Self {
        let mut registry = Self::empty();
        for database in Database::ALL {
            for auth_method in AuthMethod::ALL {
                if !is_supported(database, auth_method) {
                    continue;
                }
                for (role, framework, build) in BUILDERS {
                    registry.register(FragmentKey::new(role, framework, database, auth_method), build);
                }
            }
        }
        tracing::debug!(fragments = registry.len(), "template registry built");
        registry
    }

    /// Add or replace the builder for `key`.
    pub fn register(&mut self, key: FragmentKey, build: FragmentBuilder) {
        self.fragments.insert(key, Fragment { key, build });
    }

    /// # Errors
    ///
    /// [`SynthesisError::UnsupportedCombination`] when nothing is registered for `key`.
    pub fn lookup(&self, key: &FragmentKey) -> Result<&Fragment, SynthesisError> {
        self.fragments
            .get(key)
            .ok_or(SynthesisError::UnsupportedCombination {
                database: key.database,
                auth_method: key.auth_method,
            })
    }

    pub fn contains(&self, key: &FragmentKey) -> bool {
        self.fragments.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.fragments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fragments.is_empty()
    }

    /// Registered keys in a stable order.
    pub fn keys(&self) -> Vec<FragmentKey> {
        let mut keys: Vec<FragmentKey> = self.fragments.keys().copied().collect();
        keys.sort();
        keys
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builders_cover_every_role_and_framework_once() {
        for role in ArtifactRole::ALL {
            for framework in Framework::ALL {
                let count = BUILDERS
                    .iter()
                    .filter(|(r, f, _)| *r == role && *f == framework)
                    .count();
                assert_eq!(count, 1, "{role} / {framework}");
            }
        }
    }

    #[test]
    fn test_builtin_size() {
        // 4 databases x 4 auth methods, minus mongodb + oauth2, x 15 builders
        assert_eq!(registry().len(), 15 * 15);
    }

    #[test]
    fn test_unsupported_pair_is_reported() {
        let key = FragmentKey::new(
            ArtifactRole::Database,
            Framework::FastApi,
            Database::Mongodb,
            AuthMethod::OAuth2,
        );
        assert!(!registry().contains(&key));
        match registry().lookup(&key) {
            Err(SynthesisError::UnsupportedCombination {
                database,
                auth_method,
            }) => {
                assert_eq!(database, Database::Mongodb);
                assert_eq!(auth_method, AuthMethod::OAuth2);
            }
            other => panic!("unexpected lookup result: {other:?}"),
        }
    }

    #[test]
    fn test_custom_registry() {
        fn fixed(_: &SpecView) -> Result<String, askama::Error> {
            Ok("fixed".to_string())
        }
        let key = FragmentKey::new(
            ArtifactRole::Main,
            Framework::Flask,
            Database::Sqlite,
            AuthMethod::None,
        );
        let mut registry = TemplateRegistry::empty();
        assert!(registry.lookup(&key).is_err());
        registry.register(key, fixed);
        assert_eq!(registry.keys(), vec![key]);
        assert_eq!(registry.lookup(&key).unwrap().key, key);
    }
}
