use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::OnceLock;

/// Identifies a repository snapshot.
///
/// `sha` distinguishes revisions of the same repository. `path` selects a
/// sub-project inside a monorepo. Gating and persistence locations ignore
/// `sha`, so two snapshots of the same repository share one record.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RepoIdentity {
    pub owner: String,
    pub name: String,
    pub url: String,
    pub default_branch: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sha: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
}

impl RepoIdentity {
    pub fn new(
        owner: impl Into<String>,
        name: impl Into<String>,
        url: impl Into<String>,
        default_branch: impl Into<String>,
    ) -> Self {
        Self {
            owner: owner.into(),
            name: name.into(),
            url: url.into(),
            default_branch: default_branch.into(),
            sha: None,
            path: None,
        }
    }

    pub fn with_sha(mut self, sha: impl Into<String>) -> Self {
        self.sha = Some(sha.into());
        self
    }

    /// Returns the identity of a sub-project at `path`. Empty and `.` paths
    /// address the repository root.
    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        let path = path.into();
        let trimmed = path.trim_matches('/');
        self.path = if trimmed.is_empty() || trimmed == "." {
            None
        } else {
            Some(trimmed.to_string())
        };
        self
    }

    /// `owner/name`, without sub-project path.
    pub fn slug(&self) -> String {
        format!("{}/{}", self.owner, self.name)
    }

    /// True when both identities belong to the same repository, regardless
    /// of revision or sub-project.
    pub fn same_repository(&self, other: &RepoIdentity) -> bool {
        self.owner == other.owner && self.name == other.name
    }
}

impl fmt::Display for RepoIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)?;
        if let Some(path) = &self.path {
            write!(f, "/{}", path)?;
        }
        if let Some(sha) = &self.sha {
            let short: String = sha.chars().take(7).collect();
            write!(f, "@{}", short)?;
        }
        Ok(())
    }
}

fn remote_url_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(
            r"^(?:[a-z+]+://)?(?:[^@/]+@)?[^/:]+(?::\d+)?[:/](?:.*/)?(?P<owner>[^/]+)/(?P<name>[^/]+?)(?:\.git)?/?$",
        )
        .expect("remote url pattern is valid")
    })
}

/// Extracts `(owner, name)` from a git remote URL.
///
/// Handles `https://host/owner/name(.git)`, `ssh://git@host/owner/name` and
/// scp-like `git@host:owner/name.git` forms.
pub fn parse_remote_url(url: &str) -> Option<(String, String)> {
    let caps = remote_url_pattern().captures(url.trim())?;
    let owner = caps.name("owner")?.as_str();
    let name = caps.name("name")?.as_str();
    if owner.is_empty() || name.is_empty() {
        return None;
    }
    Some((owner.to_string(), name.to_string()))
}
