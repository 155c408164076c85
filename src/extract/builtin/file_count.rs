use crate::extract::IndependentExtractor;
use crate::model::Fingerprint;
use crate::project::Project;
use anyhow::Result;
use async_trait::async_trait;
use serde_json::json;
use std::collections::BTreeMap;

const DEFAULT_FILE_LIMIT: usize = 50_000;

/// File totals per extension; honours ignore files via the project's
/// file system walk.
pub struct FileCountExtractor {
    limit: usize,
}

impl FileCountExtractor {
    pub fn with_limit(limit: usize) -> Self {
        Self { limit }
    }
}

impl Default for FileCountExtractor {
    fn default() -> Self {
        Self::with_limit(DEFAULT_FILE_LIMIT)
    }
}

fn extension_of(path: &str) -> String {
    let file_name = path.rsplit('/').next().unwrap_or(path);
    match file_name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() && !ext.is_empty() => ext.to_lowercase(),
        _ => "(none)".to_string(),
    }
}

#[async_trait]
impl IndependentExtractor for FileCountExtractor {
    fn name(&self) -> &str {
        "file-stats"
    }

    async fn extract(&self, project: &Project) -> Result<Vec<Fingerprint>> {
        let files = project.list_files(self.limit)?;
        let mut by_extension: BTreeMap<String, usize> = BTreeMap::new();
        for file in &files {
            *by_extension.entry(extension_of(file)).or_default() += 1;
        }

        Ok(vec![Fingerprint::new(
            "file-stats",
            "extensions",
            json!({
                "total": files.len(),
                "truncated": files.len() >= self.limit,
                "byExtension": by_extension,
            }),
        )])
    }
}
