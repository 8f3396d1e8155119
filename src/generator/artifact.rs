use serde::Serialize;
use sha2::{Digest, Sha256};
use std::fmt;

use crate::spec::Framework;

/// Logical role of a generated file. Every generation run produces exactly one
/// artifact per role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ArtifactRole {
    /// Application wiring and route registration
    Main,
    /// Request/response/data-shape declarations
    Models,
    /// Persistence configuration and schema/ORM setup
    Database,
    /// Third-party packages with version constraints
    Dependencies,
    /// Human-readable description of every endpoint
    Documentation,
}

impl ArtifactRole {
    pub const ALL: [ArtifactRole; 5] = [
        ArtifactRole::Main,
        ArtifactRole::Models,
        ArtifactRole::Database,
        ArtifactRole::Dependencies,
        ArtifactRole::Documentation,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ArtifactRole::Main => "main",
            ArtifactRole::Models => "models",
            ArtifactRole::Database => "database",
            ArtifactRole::Dependencies => "dependencies",
            ArtifactRole::Documentation => "documentation",
        }
    }

    /// Exact, case-sensitive role lookup. Anything else is not a role.
    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|role| role.as_str() == s)
    }

    /// Conventional file name of this role for a framework.
    pub fn file_name(&self, framework: Framework) -> &'static str {
        match (framework, self) {
            (_, ArtifactRole::Documentation) => "README.md",
            (Framework::FastApi, ArtifactRole::Main) => "main.py",
            (Framework::Flask, ArtifactRole::Main) => "app.py",
            (Framework::Express, ArtifactRole::Main) => "index.js",
            (Framework::FastApi | Framework::Flask, ArtifactRole::Models) => "models.py",
            (Framework::Express, ArtifactRole::Models) => "models.js",
            (Framework::FastApi | Framework::Flask, ArtifactRole::Database) => "database.py",
            (Framework::Express, ArtifactRole::Database) => "database.js",
            (Framework::FastApi | Framework::Flask, ArtifactRole::Dependencies) => {
                "requirements.txt"
            }
            (Framework::Express, ArtifactRole::Dependencies) => "package.json",
        }
    }
}

impl fmt::Display for ArtifactRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One generated text file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Artifact {
    pub role: ArtifactRole,
    pub file_name: String,
    pub content: String,
}

/// The complete output of one generation run: one [`Artifact`] per role.
///
/// The set cannot be built with a role missing, so every accessor is total.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArtifactSet {
    framework: Framework,
    main: Artifact,
    models: Artifact,
    database: Artifact,
    dependencies: Artifact,
    documentation: Artifact,
}

impl ArtifactSet {
    /// Build a set by producing the content of every role in [`ArtifactRole::ALL`] order.
    pub fn try_build<E>(
        framework: Framework,
        mut content_for: impl FnMut(ArtifactRole) -> Result<String, E>,
    ) -> Result<Self, E> {
        let mut make = |role: ArtifactRole| -> Result<Artifact, E> {
            Ok(Artifact {
                role,
                file_name: role.file_name(framework).to_string(),
                content: content_for(role)?,
            })
        };
        Ok(Self {
            framework,
            main: make(ArtifactRole::Main)?,
            models: make(ArtifactRole::Models)?,
            database: make(ArtifactRole::Database)?,
            dependencies: make(ArtifactRole::Dependencies)?,
            documentation: make(ArtifactRole::Documentation)?,
        })
    }

    pub fn framework(&self) -> Framework {
        self.framework
    }

    pub fn get(&self, role: ArtifactRole) -> &Artifact {
        match role {
            ArtifactRole::Main => &self.main,
            ArtifactRole::Models => &self.models,
            ArtifactRole::Database => &self.database,
            ArtifactRole::Dependencies => &self.dependencies,
            ArtifactRole::Documentation => &self.documentation,
        }
    }

    pub fn content(&self, role: ArtifactRole) -> &str {
        &self.get(role).content
    }

    /// Return a copy with the content of `role` replaced.
    pub fn with_content(&self, role: ArtifactRole, content: String) -> Self {
        let mut next = self.clone();
        let slot = match role {
            ArtifactRole::Main => &mut next.main,
            ArtifactRole::Models => &mut next.models,
            ArtifactRole::Database => &mut next.database,
            ArtifactRole::Dependencies => &mut next.dependencies,
            ArtifactRole::Documentation => &mut next.documentation,
        };
        slot.content = content;
        next
    }

    /// Artifacts in role order.
    pub fn iter(&self) -> impl Iterator<Item = &Artifact> {
        ArtifactRole::ALL.into_iter().map(move |role| self.get(role))
    }

    pub fn len(&self) -> usize {
        ArtifactRole::ALL.len()
    }

    pub fn is_empty(&self) -> bool {
        false
    }

    /// SHA-256 over every role name and content, in role order (lower-case hex).
    pub fn digest(&self) -> String {
        let mut hasher = Sha256::new();
        for artifact in self.iter() {
            hasher.update(artifact.role.as_str().as_bytes());
            hasher.update([0u8]);
            hasher.update(artifact.content.as_bytes());
            hasher.update([0u8]);
        }
        hasher
            .finalize()
            .iter()
            .map(|b| format!("{b:02x}"))
            .collect()
    }
}
