//! Idempotent persistence of analysis results
//!
//! Every identity maps to exactly one location (`owner/repo[/path].json`),
//! ignoring revision. Persisting again overwrites: last write wins.

mod file;
mod memory;

pub use file::FileAnalysisStore;
pub use memory::InMemoryAnalysisStore;

use crate::model::{AnalysisResult, PersistOutcome, RepoIdentity};
use async_trait::async_trait;
use std::io;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("I/O error at {location}: {source}")]
    Io {
        location: String,
        #[source]
        source: io::Error,
    },

    #[error("Failed to serialize analysis for {location}: {source}")]
    Serialize {
        location: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Corrupt record at {location}: {message}")]
    Corrupt { location: String, message: String },
}

#[async_trait]
pub trait AnalysisStore: Send + Sync {
    /// Upserts every analysis. Individual write failures land in
    /// `PersistOutcome::failed`; they never abort the batch.
    async fn persist(&self, analyses: &[AnalysisResult]) -> PersistOutcome;

    /// The record stored for this identity's location, if any. `sha` is
    /// ignored, so this is the most recently persisted revision.
    async fn load_by_identity(
        &self,
        identity: &RepoIdentity,
    ) -> Result<Option<AnalysisResult>, PersistenceError>;

    /// Every stored record, in no particular order.
    async fn load_all(&self) -> Result<Vec<AnalysisResult>, PersistenceError>;

    /// The root record and every sub-project record of the repository
    /// `identity` belongs to. `identity.path` and `sha` are ignored.
    async fn load_repository(
        &self,
        identity: &RepoIdentity,
    ) -> Result<Vec<AnalysisResult>, PersistenceError> {
        Ok(self
            .load_all()
            .await?
            .into_iter()
            .filter(|record| record.identity.same_repository(identity))
            .collect())
    }

    async fn persist_one(&self, analysis: &AnalysisResult) -> PersistOutcome {
        self.persist(std::slice::from_ref(analysis)).await
    }
}

fn sanitize_segment(segment: &str) -> String {
    let cleaned: String = segment
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();
    match cleaned.as_str() {
        "" | "." | ".." => "_".to_string(),
        _ => cleaned,
    }
}

/// Store-relative directory holding a repository's sub-project records:
/// `owner/repo`.
pub fn repository_location(identity: &RepoIdentity) -> String {
    format!(
        "{}/{}",
        sanitize_segment(&identity.owner),
        sanitize_segment(&identity.name)
    )
}

/// Store-relative location for an identity: `owner/repo[/path].json`.
pub fn location_for(identity: &RepoIdentity) -> String {
    let mut segments = vec![repository_location(identity)];
    if let Some(path) = &identity.path {
        segments.extend(
            path.split('/')
                .filter(|s| !s.is_empty())
                .map(sanitize_segment),
        );
    }
    format!("{}.json", segments.join("/"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use yare::parameterized;

    #[parameterized(
        plain = { "atomist", "sdm", None, "atomist/sdm.json" },
        monorepo = { "atomist", "sdm", Some("packages/web"), "atomist/sdm/packages/web.json" },
        unsafe_chars = { "a b", "c:d", None, "a_b/c_d.json" },
        traversal = { "..", "x", Some("../etc"), "_/x/_/etc.json" },
    )]
    fn test_location_for(owner: &str, name: &str, path: Option<&str>, expected: &str) {
        let mut identity = RepoIdentity::new(owner, name, "u", "main");
        if let Some(p) = path {
            identity = identity.with_path(p);
        }
        assert_eq!(location_for(&identity), expected);
    }

    #[test]
    fn test_sub_project_locations_nest_under_repository() {
        let root = RepoIdentity::new("a b", "sdm", "u", "main");
        let sub = root.clone().with_path("packages/web");
        assert_eq!(repository_location(&sub), "a_b/sdm");
        assert!(location_for(&sub).starts_with(&format!("{}/", repository_location(&root))));
    }

    #[test]
    fn test_location_ignores_sha() {
        let a = RepoIdentity::new("o", "n", "u", "main").with_sha("1");
        let b = RepoIdentity::new("o", "n", "u", "main").with_sha("2");
        assert_eq!(location_for(&a), location_for(&b));
    }
}
