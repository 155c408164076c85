//! Local directory tree walker

use super::{CandidateStream, EnumerationError, RepositorySource, SearchCriteria};
use crate::materialize::derive_local_identity;
use crate::model::Candidate;
use crate::project::git::is_repository;
use futures_util::stream::{self, StreamExt};
use serde_json::json;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Yields every git checkout below a root directory.
///
/// A directory holding `.git` is reported and never descended into; any
/// other directory is expanded with no depth limit. The walk keeps its own
/// stack of pending directories, siblings are visited in name order and
/// symlinked directories are not followed.
#[derive(Debug, Clone)]
pub struct LocalTreeSource {
    root: PathBuf,
}

impl LocalTreeSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

struct WalkState {
    pending: Vec<PathBuf>,
    yielded: usize,
    max_kept: usize,
    failed: bool,
}

impl WalkState {
    async fn advance(mut self) -> Option<(Result<Candidate, EnumerationError>, Self)> {
        if self.failed || self.yielded >= self.max_kept {
            return None;
        }

        while let Some(dir) = self.pending.pop() {
            if is_repository(&dir) {
                debug!(dir = %dir.display(), "Found repository");
                let identity = derive_local_identity(&dir).await;
                let candidate = Candidate::new(identity, json!({ "path": dir }));
                self.yielded += 1;
                return Some((Ok(candidate), self));
            }

            match child_directories(&dir).await {
                // Reversed so the smallest name is popped first.
                Ok(children) => self.pending.extend(children.into_iter().rev()),
                Err(e) => {
                    self.failed = true;
                    return Some((Err(e), self));
                }
            }
        }

        None
    }
}

async fn child_directories(dir: &Path) -> Result<Vec<PathBuf>, EnumerationError> {
    let io_err = |source| EnumerationError::Io {
        path: dir.to_path_buf(),
        source,
    };

    let mut entries = tokio::fs::read_dir(dir).await.map_err(io_err)?;
    let mut children = Vec::new();
    while let Some(entry) = entries.next_entry().await.map_err(io_err)? {
        // file_type() does not follow symlinks
        let file_type = entry.file_type().await.map_err(io_err)?;
        if file_type.is_dir() {
            children.push(entry.path());
        }
    }
    children.sort();
    Ok(children)
}

impl RepositorySource for LocalTreeSource {
    fn enumerate(&self, criteria: &SearchCriteria) -> CandidateStream {
        info!(root = %self.root.display(), "Walking local directory tree");
        let state = WalkState {
            pending: vec![self.root.clone()],
            yielded: 0,
            max_kept: criteria.max_kept.unwrap_or(usize::MAX),
            failed: false,
        };
        stream::unfold(state, WalkState::advance).boxed()
    }

    fn describe(&self) -> String {
        format!("local tree {}", self.root.display())
    }
}
