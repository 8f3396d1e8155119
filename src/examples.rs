//! Built-in example specifications, embedded from `specs/*.json`.

use anyhow::Context;

use crate::spec::{parse_spec, ApiSpec, SpecFormat};

/// An embedded example in the persisted JSON format.
#[derive(Debug, Clone, Copy)]
pub struct ExampleSpec {
    pub slug: &'static str,
    pub source: &'static str,
}

impl ExampleSpec {
    pub fn load(&self) -> anyhow::Result<ApiSpec> {
        parse_spec(self.source, SpecFormat::Json)
            .with_context(|| format!("Failed to parse built-in example `{}`", self.slug))
    }
}

pub const EXAMPLES: [ExampleSpec; 3] = [
    ExampleSpec {
        slug: "user_management",
        source: include_str!("../specs/user_management.json"),
    },
    ExampleSpec {
        slug: "blog_system",
        source: include_str!("../specs/blog_system.json"),
    },
    ExampleSpec {
        slug: "ecommerce",
        source: include_str!("../specs/ecommerce.json"),
    },
];

/// Every built-in example, in a fixed order.
pub fn list_example_specs() -> anyhow::Result<Vec<ApiSpec>> {
    EXAMPLES.iter().map(ExampleSpec::load).collect()
}

/// The example called `slug`, if there is one.
pub fn example_spec(slug: &str) -> anyhow::Result<Option<ApiSpec>> {
    EXAMPLES
        .iter()
        .find(|example| example.slug == slug)
        .map(ExampleSpec::load)
        .transpose()
}
