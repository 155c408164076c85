//! Monorepo splitting

use crate::project::Project;
use anyhow::Result;
use std::path::PathBuf;

/// Finds sub-projects inside a materialized project. Returned paths are
/// relative to the project root and `/`-separated; an empty list means the
/// project is analysed as a whole.
pub trait SubprojectFinder: Send + Sync {
    fn find(&self, project: &Project) -> Result<Vec<String>>;
}

const SUBPROJECT_MANIFESTS: &[&str] = &[
    "Cargo.toml",
    "package.json",
    "pom.xml",
    "go.mod",
    "pyproject.toml",
    "build.gradle",
];

const SKIPPED_DIRS: &[&str] = &["node_modules", "target", "vendor", "dist", "build"];

const DEFAULT_MAX_DEPTH: usize = 4;

/// Reports directories below the root that hold a build manifest.
///
/// Only applies when the root itself has no manifest. A directory that
/// matches is not searched further, so nested packages inside a reported
/// sub-project are not reported separately. Hidden directories and common
/// build output directories are skipped.
#[derive(Debug, Clone)]
pub struct ManifestSubprojectFinder {
    max_depth: usize,
}

impl ManifestSubprojectFinder {
    pub fn new() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }
}

impl Default for ManifestSubprojectFinder {
    fn default() -> Self {
        Self::new()
    }
}

fn has_manifest(project: &Project, relative: &str) -> bool {
    SUBPROJECT_MANIFESTS.iter().any(|manifest| {
        let path = if relative.is_empty() {
            manifest.to_string()
        } else {
            format!("{}/{}", relative, manifest)
        };
        project.has_file(&path)
    })
}

impl SubprojectFinder for ManifestSubprojectFinder {
    fn find(&self, project: &Project) -> Result<Vec<String>> {
        if has_manifest(project, "") {
            return Ok(Vec::new());
        }

        let mut found = Vec::new();
        let mut pending: Vec<(String, usize)> = vec![(String::new(), 0)];

        while let Some((relative, depth)) = pending.pop() {
            if depth >= self.max_depth {
                continue;
            }
            let dir: PathBuf = project.path(&relative);
            let mut children = Vec::new();
            for entry in project.fs().read_dir(&dir)? {
                let name = entry.file_name();
                if !entry.is_dir() || name.starts_with('.') || SKIPPED_DIRS.contains(&name) {
                    continue;
                }
                let child = if relative.is_empty() {
                    name.to_string()
                } else {
                    format!("{}/{}", relative, name)
                };
                if has_manifest(project, &child) {
                    found.push(child);
                } else {
                    children.push((child, depth + 1));
                }
            }
            pending.extend(children.into_iter().rev());
        }

        found.sort();
        Ok(found)
    }
}
