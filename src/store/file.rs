use super::{location_for, repository_location, AnalysisStore, PersistenceError};
use crate::model::{AnalysisResult, PersistFailure, PersistOutcome, RepoIdentity, Stage};
use async_trait::async_trait;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// One pretty-printed JSON document per identity under
/// `<root>/<workspace>/owner/repo[/path].json`.
///
/// Writes go to a sibling temporary file that is renamed into place, so a
/// reader never observes a partially written record.
#[derive(Debug, Clone)]
pub struct FileAnalysisStore {
    base: PathBuf,
}

impl FileAnalysisStore {
    pub fn new(root: impl AsRef<Path>, workspace_id: &str) -> Self {
        Self {
            base: root.as_ref().join(workspace_id),
        }
    }

    /// Directory holding this workspace's records
    pub fn base(&self) -> &Path {
        &self.base
    }

    pub fn path_for(&self, identity: &RepoIdentity) -> PathBuf {
        self.base.join(location_for(identity))
    }

    async fn write_one(&self, analysis: &AnalysisResult) -> Result<String, PersistenceError> {
        let location = location_for(&analysis.identity);
        let target = self.base.join(&location);
        let io_err = |source: io::Error| PersistenceError::Io {
            location: location.clone(),
            source,
        };

        let body = serde_json::to_vec_pretty(analysis).map_err(|source| {
            PersistenceError::Serialize {
                location: location.clone(),
                source,
            }
        })?;

        if let Some(parent) = target.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(io_err)?;
        }

        let tmp = target.with_extension(format!("{}.tmp", uuid::Uuid::new_v4().simple()));
        tokio::fs::write(&tmp, &body).await.map_err(io_err)?;
        if let Err(e) = tokio::fs::rename(&tmp, &target).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(io_err(e));
        }

        debug!(location = %location, bytes = body.len(), "Persisted analysis");
        Ok(location)
    }

    async fn read_record(&self, path: &Path) -> Result<Option<AnalysisResult>, PersistenceError> {
        let location = self.relative_location(path);
        let text = match tokio::fs::read_to_string(path).await {
            Ok(text) => text,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(source) => return Err(PersistenceError::Io { location, source }),
        };
        serde_json::from_str(&text)
            .map(Some)
            .map_err(|e| PersistenceError::Corrupt {
                location,
                message: e.to_string(),
            })
    }

    /// Every readable record below `root`. Corrupt records are logged and
    /// skipped.
    async fn collect_records(&self, root: PathBuf) -> Result<Vec<AnalysisResult>, PersistenceError> {
        let mut records = Vec::new();
        let mut pending = vec![root];

        while let Some(dir) = pending.pop() {
            let mut entries = match tokio::fs::read_dir(&dir).await {
                Ok(entries) => entries,
                Err(e) if e.kind() == io::ErrorKind::NotFound => continue,
                Err(source) => {
                    return Err(PersistenceError::Io {
                        location: self.relative_location(&dir),
                        source,
                    })
                }
            };

            while let Some(entry) = entries.next_entry().await.map_err(|source| {
                PersistenceError::Io {
                    location: self.relative_location(&dir),
                    source,
                }
            })? {
                let path = entry.path();
                let is_dir = entry
                    .file_type()
                    .await
                    .map(|t| t.is_dir())
                    .unwrap_or(false);
                if is_dir {
                    pending.push(path);
                    continue;
                }
                if path.extension().and_then(|e| e.to_str()) != Some("json") {
                    continue;
                }
                match self.read_record(&path).await {
                    Ok(Some(record)) => records.push(record),
                    Ok(None) => {}
                    Err(PersistenceError::Corrupt { location, message }) => {
                        warn!(location = %location, error = %message, "Skipping unreadable record");
                    }
                    Err(e) => return Err(e),
                }
            }
        }

        Ok(records)
    }

    fn relative_location(&self, path: &Path) -> String {
        path.strip_prefix(&self.base)
            .unwrap_or(path)
            .to_string_lossy()
            .replace('\\', "/")
    }
}

#[async_trait]
impl AnalysisStore for FileAnalysisStore {
    async fn persist(&self, analyses: &[AnalysisResult]) -> PersistOutcome {
        let mut outcome = PersistOutcome {
            attempted: analyses.len(),
            ..Default::default()
        };

        for analysis in analyses {
            match self.write_one(analysis).await {
                Ok(location) => outcome.succeeded.push(location),
                Err(e) => {
                    warn!(identity = %analysis.identity, error = %e, "Failed to persist analysis");
                    outcome.failed.push(PersistFailure {
                        identity: analysis.identity.clone(),
                        stage: Stage::Persist,
                        message: e.to_string(),
                    });
                }
            }
        }

        outcome
    }

    async fn load_by_identity(
        &self,
        identity: &RepoIdentity,
    ) -> Result<Option<AnalysisResult>, PersistenceError> {
        self.read_record(&self.path_for(identity)).await
    }

    async fn load_all(&self) -> Result<Vec<AnalysisResult>, PersistenceError> {
        self.collect_records(self.base.clone()).await
    }

    async fn load_repository(
        &self,
        identity: &RepoIdentity,
    ) -> Result<Vec<AnalysisResult>, PersistenceError> {
        let root = identity.clone().with_path("");
        let mut records = match self.read_record(&self.path_for(&root)).await {
            Ok(record) => record.into_iter().collect(),
            Err(PersistenceError::Corrupt { location, message }) => {
                warn!(location = %location, error = %message, "Skipping unreadable record");
                Vec::new()
            }
            Err(e) => return Err(e),
        };
        records.extend(
            self.collect_records(self.base.join(repository_location(identity)))
                .await?,
        );
        Ok(records)
    }
}
