use crate::extract::IndependentExtractor;
use crate::model::Fingerprint;
use crate::project::Project;
use anyhow::Result;
use async_trait::async_trait;
use serde_json::json;

/// Build manifests recognised at a project root, with their ecosystem.
pub const KNOWN_MANIFESTS: &[(&str, &str)] = &[
    ("Cargo.toml", "cargo"),
    ("package.json", "npm"),
    ("pom.xml", "maven"),
    ("build.gradle", "gradle"),
    ("build.gradle.kts", "gradle"),
    ("go.mod", "go"),
    ("pyproject.toml", "python"),
    ("requirements.txt", "python"),
    ("Gemfile", "ruby"),
    ("composer.json", "php"),
    ("mix.exs", "elixir"),
];

pub fn ecosystem_for(manifest: &str) -> Option<&'static str> {
    KNOWN_MANIFESTS
        .iter()
        .find(|(name, _)| *name == manifest)
        .map(|(_, eco)| *eco)
}

/// One `manifest` fingerprint per known build file at the root
pub struct ManifestExtractor;

#[async_trait]
impl IndependentExtractor for ManifestExtractor {
    fn name(&self) -> &str {
        "manifest"
    }

    async fn extract(&self, project: &Project) -> Result<Vec<Fingerprint>> {
        Ok(KNOWN_MANIFESTS
            .iter()
            .filter(|(file, _)| project.has_file(file))
            .map(|(file, ecosystem)| {
                Fingerprint::new("manifest", *file, json!({ "ecosystem": ecosystem }))
            })
            .collect())
    }
}
