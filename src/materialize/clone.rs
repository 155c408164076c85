use super::{MaterializationError, MaterializationErrorKind, Materializer};
use crate::fs::RealFileSystem;
use crate::model::Candidate;
use crate::project::git::{is_repository, read_vcs_info, run_git};
use crate::project::Project;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Default)]
pub struct CloneConfig {
    /// Reusable clone root. `None` clones into temporary directories that
    /// are removed once extraction finishes.
    pub clone_dir: Option<PathBuf>,
    /// Token injected into https clone URLs for private repositories.
    pub token: Option<String>,
}

/// Shallow, single-branch clones of remote candidates
pub struct CloneMaterializer {
    config: CloneConfig,
}

impl CloneMaterializer {
    pub fn new(config: CloneConfig) -> Self {
        Self { config }
    }

    fn authenticated_url(&self, url: &str) -> String {
        match (&self.config.token, url.strip_prefix("https://")) {
            (Some(token), Some(rest)) if !rest.contains('@') => {
                format!("https://x-access-token:{}@{}", token, rest)
            }
            _ => url.to_string(),
        }
    }

    async fn clone_into(
        &self,
        candidate: &Candidate,
        destination: &Path,
    ) -> Result<(), MaterializationError> {
        let parent = destination.parent().unwrap_or_else(|| Path::new("."));
        let url = self.authenticated_url(&candidate.identity.url);
        let dest = destination.to_string_lossy().to_string();

        let mut args = vec!["clone", "--depth", "1", "--single-branch"];
        let branch = candidate.identity.default_branch.as_str();
        if !branch.is_empty() {
            args.extend(["--branch", branch]);
        }
        args.extend([url.as_str(), dest.as_str()]);

        run_git(parent, &args)
            .await
            .map(|_| ())
            .map_err(|e| MaterializationError::from_vcs(MaterializationErrorKind::CloneFailed, e))
    }

    async fn refresh(&self, candidate: &Candidate, checkout: &Path) -> Result<(), MaterializationError> {
        let branch = candidate.identity.default_branch.as_str();
        let refspec = if branch.is_empty() { "HEAD" } else { branch };

        run_git(checkout, &["fetch", "--depth", "1", "origin", refspec])
            .await
            .map_err(|e| MaterializationError::from_vcs(MaterializationErrorKind::CloneFailed, e))?;
        run_git(checkout, &["reset", "--hard", "FETCH_HEAD"])
            .await
            .map_err(|e| MaterializationError::from_vcs(MaterializationErrorKind::CloneFailed, e))?;
        Ok(())
    }

    async fn open(
        &self,
        candidate: &Candidate,
        root: PathBuf,
    ) -> Result<Project, MaterializationError> {
        let vcs = read_vcs_info(&root).await.map_err(|e| {
            MaterializationError::from_vcs(MaterializationErrorKind::NotARepository, e)
        })?;
        Ok(Project::new(candidate.identity.clone(), root, Arc::new(RealFileSystem)).with_vcs(vcs))
    }

    async fn materialize_reused(
        &self,
        candidate: &Candidate,
        clone_dir: &Path,
    ) -> Result<Project, MaterializationError> {
        let identity = &candidate.identity;
        let checkout = clone_dir.join(&identity.owner).join(&identity.name);

        if is_repository(&checkout) {
            match self.refresh(candidate, &checkout).await {
                Ok(()) => {
                    debug!(repo = %identity.url, path = %checkout.display(), "Reused existing clone");
                    return self.open(candidate, checkout).await;
                }
                Err(e) => {
                    warn!(repo = %identity.url, error = %e, "Refreshing existing clone failed, cloning again");
                    tokio::fs::remove_dir_all(&checkout)
                        .await
                        .map_err(|e| MaterializationError::from_io("remove stale clone", e))?;
                }
            }
        } else if checkout.exists() {
            tokio::fs::remove_dir_all(&checkout)
                .await
                .map_err(|e| MaterializationError::from_io("remove stale clone", e))?;
        }

        if let Some(parent) = checkout.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| MaterializationError::from_io("create clone directory", e))?;
        }
        self.clone_into(candidate, &checkout).await?;
        self.open(candidate, checkout).await
    }

    async fn materialize_temporary(
        &self,
        candidate: &Candidate,
    ) -> Result<Project, MaterializationError> {
        let workspace = tempfile::Builder::new()
            .prefix("repo-spider-")
            .tempdir()
            .map_err(|e| MaterializationError::from_io("create temporary directory", e))?;
        let checkout = workspace.path().join(&candidate.identity.name);

        self.clone_into(candidate, &checkout).await?;
        let project = self.open(candidate, checkout).await?;
        Ok(project.with_workspace(workspace))
    }
}

#[async_trait]
impl Materializer for CloneMaterializer {
    async fn materialize(&self, candidate: &Candidate) -> Result<Project, MaterializationError> {
        let start = Instant::now();
        let result = match &self.config.clone_dir {
            Some(dir) => self.materialize_reused(candidate, dir).await,
            None => self.materialize_temporary(candidate).await,
        };

        if let Ok(project) = &result {
            info!(
                repo = %candidate.identity.url,
                sha = project.vcs().head_sha.as_deref().unwrap_or("unknown"),
                elapsed_ms = start.elapsed().as_millis() as u64,
                "Cloned repository"
            );
        }
        result
    }
}
