//! Turning candidates into readable working copies
//!
//! Materialization failures are per-candidate: the orchestrator records them
//! under the `clone` stage and moves on.

mod clone;
mod local;

pub use clone::{CloneConfig, CloneMaterializer};
pub use local::{candidate_path, derive_local_identity, LocalMaterializer};

use crate::model::Candidate;
use crate::project::{Project, VcsError};
use async_trait::async_trait;
use serde::Serialize;
use std::fmt;
use std::io;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum MaterializationErrorKind {
    CloneFailed,
    NotARepository,
    PermissionDenied,
}

impl fmt::Display for MaterializationErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            MaterializationErrorKind::CloneFailed => "clone-failed",
            MaterializationErrorKind::NotARepository => "not-a-repository",
            MaterializationErrorKind::PermissionDenied => "permission-denied",
        };
        f.write_str(s)
    }
}

/// Displays as the bare message so it can be reported verbatim.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct MaterializationError {
    pub kind: MaterializationErrorKind,
    pub message: String,
}

impl MaterializationError {
    pub fn new(kind: MaterializationErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn clone_failed(message: impl Into<String>) -> Self {
        Self::new(MaterializationErrorKind::CloneFailed, message)
    }

    pub fn not_a_repository(message: impl Into<String>) -> Self {
        Self::new(MaterializationErrorKind::NotARepository, message)
    }

    pub(crate) fn from_io(context: &str, err: io::Error) -> Self {
        let kind = if err.kind() == io::ErrorKind::PermissionDenied {
            MaterializationErrorKind::PermissionDenied
        } else {
            MaterializationErrorKind::CloneFailed
        };
        Self::new(kind, format!("{}: {}", context, err))
    }

    pub(crate) fn from_vcs(kind: MaterializationErrorKind, err: VcsError) -> Self {
        match err {
            VcsError::Spawn(e) if e.kind() == io::ErrorKind::PermissionDenied => {
                Self::new(MaterializationErrorKind::PermissionDenied, e.to_string())
            }
            other => Self::new(kind, other.detail()),
        }
    }
}

#[async_trait]
pub trait Materializer: Send + Sync {
    async fn materialize(&self, candidate: &Candidate) -> Result<Project, MaterializationError>;
}
