//! Repository enumeration
//!
//! A [`RepositorySource`] turns [`SearchCriteria`] into a lazy stream of
//! [`Candidate`]s. Any `Err` item is fatal: the orchestrator stops pulling
//! and the run fails with that error.

mod github;
mod local;

pub use github::{GitHubSearchClient, GitHubSearchSource, SearchClient, SearchPage, MAX_SEARCH_RESULTS};
pub use local::LocalTreeSource;

use crate::model::Candidate;
use futures_util::stream::BoxStream;
use std::path::PathBuf;
use thiserror::Error;

pub type CandidateStream = BoxStream<'static, Result<Candidate, EnumerationError>>;

#[derive(Debug, Error)]
pub enum EnumerationError {
    #[error("Failed to read directory {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Search request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Search API returned {status}: {message}")]
    Api { status: u16, message: String },

    #[error("Malformed search response: {0}")]
    InvalidResponse(String),

    #[error("Invalid search criteria: {0}")]
    InvalidCriteria(String),
}

impl EnumerationError {
    /// Returns a user-friendly error message with troubleshooting hints
    pub fn help_message(&self) -> String {
        match self {
            EnumerationError::Io { path, source } => format!(
                "Error: Cannot walk directory tree\nPath: {}\n\n\
                Help: Check that the directory exists and is readable.\n\n\
                Details: {}",
                path.display(),
                source
            ),
            EnumerationError::Api { status, message } if *status == 401 || *status == 403 => {
                format!(
                    "Error: GitHub rejected the search request ({})\n\n\
                    Help: Set a valid token with search access:\n\
                    export GITHUB_TOKEN=your-token-here\n\
                    Unauthenticated requests are heavily rate limited.\n\n\
                    Details: {}",
                    status, message
                )
            }
            EnumerationError::Http(e) => format!(
                "Error: Cannot reach the search API\n\n\
                Help: Check network access and REPO_SPIDER_GITHUB_API.\n\n\
                Details: {}",
                e
            ),
            other => format!("Error: {}", other),
        }
    }
}

/// What to enumerate and when to stop.
///
/// Thresholds apply per query: `max_examined` bounds the raw results looked
/// at, `max_kept` bounds the distinct candidates yielded. Sources without
/// queries (the local walker) apply `max_kept` to the whole walk.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchCriteria {
    pub queries: Vec<String>,
    pub max_examined: Option<usize>,
    pub max_kept: Option<usize>,
}

impl SearchCriteria {
    pub fn new<I, S>(queries: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            queries: queries.into_iter().map(Into::into).collect(),
            ..Default::default()
        }
    }

    pub fn with_max_examined(mut self, max: usize) -> Self {
        self.max_examined = Some(max);
        self
    }

    pub fn with_max_kept(mut self, max: usize) -> Self {
        self.max_kept = Some(max);
        self
    }
}

pub trait RepositorySource: Send + Sync {
    fn enumerate(&self, criteria: &SearchCriteria) -> CandidateStream;

    /// Short human label for logs
    fn describe(&self) -> String;
}
