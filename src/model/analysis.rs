use super::{Fingerprint, RepoIdentity};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// A discovered repository that has not been materialized yet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Candidate {
    pub identity: RepoIdentity,
    /// Opaque payload from the source (search API item, local path, ...).
    pub source_metadata: Value,
    /// The query that produced this candidate, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub query: Option<String>,
    pub discovered_at: DateTime<Utc>,
}

impl Candidate {
    pub fn new(identity: RepoIdentity, source_metadata: Value) -> Self {
        Self {
            identity,
            source_metadata,
            query: None,
            discovered_at: Utc::now(),
        }
    }

    pub fn with_query(mut self, query: impl Into<String>) -> Self {
        self.query = Some(query.into());
        self
    }
}

/// Where a persisted analysis came from.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Provenance {
    #[serde(default)]
    pub workspace_id: String,
    #[serde(default)]
    pub source_metadata: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub query: Option<String>,
}

/// The atomic persisted unit: every fingerprint extracted for one identity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResult {
    pub identity: RepoIdentity,
    pub fingerprints: Vec<Fingerprint>,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub provenance: Provenance,
}

impl AnalysisResult {
    pub fn new(identity: RepoIdentity, fingerprints: Vec<Fingerprint>) -> Self {
        Self {
            identity,
            fingerprints,
            timestamp: Utc::now(),
            provenance: Provenance::default(),
        }
    }

    pub fn with_provenance(mut self, provenance: Provenance) -> Self {
        self.provenance = provenance;
        self
    }

    pub fn fingerprints_of_type<'a>(
        &'a self,
        fp_type: &'a str,
    ) -> impl Iterator<Item = &'a Fingerprint> + 'a {
        self.fingerprints.iter().filter(move |fp| fp.fp_type == fp_type)
    }
}

/// The step a candidate was in when it failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Clone,
    Extract,
    Persist,
    Timeout,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Stage::Clone => "clone",
            Stage::Extract => "extract",
            Stage::Persist => "persist",
            Stage::Timeout => "timeout",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistFailure {
    pub identity: RepoIdentity,
    pub stage: Stage,
    pub message: String,
}

/// Result of one `persist` call over any number of analyses.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistOutcome {
    pub attempted: usize,
    /// Locations written, relative to the store root.
    pub succeeded: Vec<String>,
    pub failed: Vec<PersistFailure>,
}

impl PersistOutcome {
    pub fn is_complete_success(&self) -> bool {
        self.failed.is_empty() && self.succeeded.len() == self.attempted
    }
}
