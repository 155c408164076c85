//! Existing-record gate
//!
//! Decides whether a candidate's previous analysis is good enough to keep.
//! The lookup ignores `sha` and `path`: every record persisted for the
//! repository, root or sub-project, is handed to the predicate.

use crate::model::{AnalysisResult, RepoIdentity};
use crate::store::AnalysisStore;
use chrono::{Duration, Utc};
use std::sync::Arc;
use tracing::{debug, warn};

/// Returns true when an existing record should be kept as-is.
pub type KeepExisting = Arc<dyn Fn(&AnalysisResult) -> bool + Send + Sync>;

/// Ready-made gate predicates
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FreshnessPolicy {
    /// Any prior record suppresses re-analysis.
    AlwaysKeep,
    /// Always re-analyse (the `--update` behaviour).
    NeverKeep,
    /// Keep records persisted less than this long ago.
    KeepYoungerThan(Duration),
}

impl FreshnessPolicy {
    pub fn into_predicate(self) -> KeepExisting {
        match self {
            FreshnessPolicy::AlwaysKeep => Arc::new(|_| true),
            FreshnessPolicy::NeverKeep => Arc::new(|_| false),
            FreshnessPolicy::KeepYoungerThan(max_age) => {
                Arc::new(move |existing| Utc::now() - existing.timestamp < max_age)
            }
        }
    }
}

pub struct ExistingRecordGate {
    store: Arc<dyn AnalysisStore>,
}

impl ExistingRecordGate {
    pub fn new(store: Arc<dyn AnalysisStore>) -> Self {
        Self { store }
    }

    /// False when nothing was persisted for this repository; otherwise true
    /// only if the predicate keeps every stored record. A split repository
    /// has no root record, so its sub-project records decide.
    ///
    /// A store read failure is treated as "no record" so the candidate is
    /// re-analysed rather than silently dropped.
    pub async fn should_skip(&self, identity: &RepoIdentity, keep: &KeepExisting) -> bool {
        let existing = match self.store.load_repository(identity).await {
            Ok(existing) if existing.is_empty() => return false,
            Ok(existing) => existing,
            Err(e) => {
                warn!(identity = %identity, error = %e, "Could not read existing records");
                return false;
            }
        };

        let skip = existing.iter().all(|record| keep(record));
        debug!(
            identity = %identity,
            records = existing.len(),
            skip,
            "Existing records found"
        );
        skip
    }
}
