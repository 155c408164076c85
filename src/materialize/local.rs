use super::{MaterializationError, MaterializationErrorKind, Materializer};
use crate::fs::RealFileSystem;
use crate::model::{parse_remote_url, Candidate, RepoIdentity};
use crate::project::git::{is_repository, read_vcs_info, remote_url, run_git};
use crate::project::Project;
use async_trait::async_trait;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

/// Directory of a local candidate, recorded by the local source under
/// `sourceMetadata.path`.
pub fn candidate_path(candidate: &Candidate) -> Option<PathBuf> {
    candidate
        .source_metadata
        .get("path")
        .and_then(|p| p.as_str())
        .map(PathBuf::from)
}

/// Identity of a local checkout.
///
/// Prefers the `origin` remote URL. Without one, the directory name becomes
/// the repository name and its parent directory name the owner.
pub async fn derive_local_identity(dir: &Path) -> RepoIdentity {
    let branch = run_git(dir, &["symbolic-ref", "--short", "--quiet", "HEAD"])
        .await
        .ok()
        .filter(|b| !b.is_empty())
        .unwrap_or_else(|| "HEAD".to_string());

    if let Some(url) = remote_url(dir).await {
        if let Some((owner, name)) = parse_remote_url(&url) {
            return RepoIdentity::new(owner, name, url, branch);
        }
        debug!(dir = %dir.display(), url = %url, "Unrecognised remote URL, synthesizing identity");
    }

    synthesized_identity(dir, branch)
}

fn synthesized_identity(dir: &Path, branch: String) -> RepoIdentity {
    let name = dir
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| "root".to_string());
    let owner = dir
        .parent()
        .and_then(|p| p.file_name())
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| "local".to_string());
    RepoIdentity::new(owner, name, dir.display().to_string(), branch)
}

/// Opens local checkouts in place; nothing is copied.
#[derive(Debug, Default, Clone, Copy)]
pub struct LocalMaterializer;

impl LocalMaterializer {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Materializer for LocalMaterializer {
    async fn materialize(&self, candidate: &Candidate) -> Result<Project, MaterializationError> {
        let dir = candidate_path(candidate).ok_or_else(|| {
            MaterializationError::not_a_repository(format!(
                "candidate {} has no local path",
                candidate.identity
            ))
        })?;

        match tokio::fs::read_dir(&dir).await {
            Ok(_) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(MaterializationError::not_a_repository(format!(
                    "{} does not exist",
                    dir.display()
                )));
            }
            Err(e) => return Err(MaterializationError::from_io(&dir.display().to_string(), e)),
        }

        if !is_repository(&dir) {
            return Err(MaterializationError::not_a_repository(format!(
                "{} is not a git repository",
                dir.display()
            )));
        }

        let vcs = read_vcs_info(&dir).await.map_err(|e| {
            MaterializationError::from_vcs(MaterializationErrorKind::NotARepository, e)
        })?;

        debug!(path = %dir.display(), sha = ?vcs.head_sha, "Opened local repository");
        Ok(Project::new(candidate.identity.clone(), dir, Arc::new(RealFileSystem)).with_vcs(vcs))
    }
}
