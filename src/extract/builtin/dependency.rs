use crate::extract::IndependentExtractor;
use crate::model::Fingerprint;
use crate::project::Project;
use anyhow::{Context, Result};
use async_trait::async_trait;
use serde_json::{json, Value};

const CARGO_SECTIONS: &[(&str, &str)] = &[
    ("dependencies", "runtime"),
    ("dev-dependencies", "dev"),
    ("build-dependencies", "build"),
];

const NPM_SECTIONS: &[(&str, &str)] = &[
    ("dependencies", "runtime"),
    ("devDependencies", "dev"),
    ("peerDependencies", "peer"),
    ("optionalDependencies", "optional"),
];

/// Declared dependencies from `Cargo.toml` and `package.json`.
///
/// Fingerprint names are `<ecosystem>:<package>`; a package listed in more
/// than one section is reported once, under its first section.
pub struct DependencyExtractor;

fn dependency(ecosystem: &str, name: &str, version: Option<&str>, scope: &str) -> Fingerprint {
    Fingerprint::new(
        "dependency",
        format!("{}:{}", ecosystem, name),
        json!({
            "ecosystem": ecosystem,
            "name": name,
            "version": version,
            "scope": scope,
        }),
    )
}

fn cargo_dependencies(content: &str) -> Result<Vec<Fingerprint>> {
    let parsed: toml::Value = toml::from_str(content).context("Cargo.toml is not valid TOML")?;
    let mut seen = std::collections::HashSet::new();
    let mut out = Vec::new();

    for (section, scope) in CARGO_SECTIONS {
        let Some(deps) = parsed.get(section).and_then(|v| v.as_table()) else {
            continue;
        };
        for (name, value) in deps {
            if !seen.insert(name.clone()) {
                continue;
            }
            let version = match value {
                toml::Value::String(v) => Some(v.as_str()),
                toml::Value::Table(t) => t.get("version").and_then(|v| v.as_str()),
                _ => None,
            };
            out.push(dependency("cargo", name, version, scope));
        }
    }
    Ok(out)
}

fn npm_dependencies(content: &str) -> Result<Vec<Fingerprint>> {
    let parsed: Value = serde_json::from_str(content).context("package.json is not valid JSON")?;
    let mut seen = std::collections::HashSet::new();
    let mut out = Vec::new();

    for (section, scope) in NPM_SECTIONS {
        let Some(deps) = parsed.get(section).and_then(Value::as_object) else {
            continue;
        };
        for (name, version) in deps {
            if seen.insert(name.clone()) {
                out.push(dependency("npm", name, version.as_str(), scope));
            }
        }
    }
    Ok(out)
}

#[async_trait]
impl IndependentExtractor for DependencyExtractor {
    fn name(&self) -> &str {
        "dependency"
    }

    async fn extract(&self, project: &Project) -> Result<Vec<Fingerprint>> {
        let mut fingerprints = Vec::new();
        if project.has_file("Cargo.toml") {
            fingerprints.extend(cargo_dependencies(&project.read_file("Cargo.toml")?)?);
        }
        if project.has_file("package.json") {
            fingerprints.extend(npm_dependencies(&project.read_file("package.json")?)?);
        }
        Ok(fingerprints)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::builtin::test_support::project_with;

    #[tokio::test]
    async fn test_cargo_dependencies() {
        let project = project_with(&[(
            "Cargo.toml",
            r#"
[package]
name = "demo"

[dependencies]
serde = { version = "1.0", features = ["derive"] }
anyhow = "1.0"
local = { path = "../local" }

[dev-dependencies]
anyhow = "1.0"
tempfile = "3"
"#,
        )]);

        let fps = DependencyExtractor.extract(&project).await.unwrap();
        let names: Vec<&str> = fps.iter().map(|f| f.name.as_str()).collect();

        assert_eq!(names, vec!["cargo:anyhow", "cargo:local", "cargo:serde", "cargo:tempfile"]);
        assert_eq!(fps[2].data["version"], "1.0");
        assert_eq!(fps[1].data["version"], Value::Null);
        assert_eq!(fps[3].data["scope"], "dev");
    }

    #[tokio::test]
    async fn test_npm_dependencies() {
        let project = project_with(&[(
            "package.json",
            r#"{"dependencies": {"react": "^18.0.0"}, "devDependencies": {"jest": "29"}}"#,
        )]);

        let fps = DependencyExtractor.extract(&project).await.unwrap();
        assert_eq!(fps.len(), 2);
        assert_eq!(fps[0].name, "npm:react");
        assert_eq!(fps[1].data["scope"], "dev");
    }

    #[tokio::test]
    async fn test_malformed_manifest_fails() {
        let project = project_with(&[("Cargo.toml", "[dependencies")]);
        let err = DependencyExtractor.extract(&project).await.unwrap_err();
        assert!(err.to_string().contains("Cargo.toml"));
    }
}
