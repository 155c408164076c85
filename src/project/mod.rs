//! Opened working copies
//!
//! A [`Project`] is what extractors see: a root directory, read access to
//! the file tree under it, and the VCS metadata of the checkout. It is owned
//! by the candidate that materialized it and released (temporary clones are
//! deleted) once the last handle is dropped.

pub mod git;

use crate::fs::FileSystem;
use crate::model::RepoIdentity;
use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;

pub use git::VcsError;

/// Git metadata of a working copy
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VcsInfo {
    pub head_sha: Option<String>,
    pub branch: Option<String>,
    pub author: Option<String>,
    pub committed_at: Option<DateTime<Utc>>,
    pub remote_url: Option<String>,
}

pub struct Project {
    identity: RepoIdentity,
    root: PathBuf,
    fs: Arc<dyn FileSystem>,
    vcs: VcsInfo,
    workspace: Option<Arc<TempDir>>,
}

impl Project {
    pub fn new(identity: RepoIdentity, root: PathBuf, fs: Arc<dyn FileSystem>) -> Self {
        Self {
            identity,
            root,
            fs,
            vcs: VcsInfo::default(),
            workspace: None,
        }
    }

    pub fn with_vcs(mut self, vcs: VcsInfo) -> Self {
        if let Some(sha) = &vcs.head_sha {
            self.identity.sha = Some(sha.clone());
        }
        self.vcs = vcs;
        self
    }

    /// Ties a temporary checkout directory to this handle; the directory is
    /// removed when the last handle referencing it is dropped.
    pub fn with_workspace(mut self, workspace: TempDir) -> Self {
        self.workspace = Some(Arc::new(workspace));
        self
    }

    pub fn identity(&self) -> &RepoIdentity {
        &self.identity
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn fs(&self) -> &dyn FileSystem {
        self.fs.as_ref()
    }

    pub fn vcs(&self) -> &VcsInfo {
        &self.vcs
    }

    pub fn is_temporary(&self) -> bool {
        self.workspace.is_some()
    }

    /// Absolute path of `relative` inside the project
    pub fn path(&self, relative: &str) -> PathBuf {
        self.root.join(relative)
    }

    pub fn has_file(&self, relative: &str) -> bool {
        self.fs.is_file(&self.path(relative))
    }

    pub fn read_file(&self, relative: &str) -> Result<String> {
        self.fs.read_to_string(&self.path(relative))
    }

    /// Project-relative paths of every file, `/`-separated
    pub fn list_files(&self, limit: usize) -> Result<Vec<String>> {
        let files = self.fs.walk_files(&self.root, limit)?;
        Ok(files
            .iter()
            .filter_map(|p| p.strip_prefix(&self.root).ok())
            .map(|p| p.to_string_lossy().replace('\\', "/"))
            .collect())
    }

    /// A view of the sub-project at `relative`, sharing this checkout
    pub fn subproject(&self, relative: &str) -> Project {
        Project {
            identity: self.identity.clone().with_path(relative),
            root: self.root.join(relative),
            fs: Arc::clone(&self.fs),
            vcs: self.vcs.clone(),
            workspace: self.workspace.clone(),
        }
    }
}

impl fmt::Debug for Project {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Project")
            .field("identity", &self.identity)
            .field("root", &self.root)
            .field("vcs", &self.vcs)
            .field("temporary", &self.is_temporary())
            .finish()
    }
}
