//! Pluggable predicates and side effects around the per-candidate pipeline

use crate::model::{AnalysisResult, Fingerprint};
use crate::project::Project;
use async_trait::async_trait;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use thiserror::Error;

/// Failure of a post-persist hook. Logged only.
#[derive(Debug, Clone, Error)]
#[error("Hook '{hook}' failed: {message}")]
pub struct HookError {
    pub hook: String,
    pub message: String,
}

impl HookError {
    pub fn new(hook: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            hook: hook.into(),
            message: message.into(),
        }
    }
}

/// Runs after each successful persist.
#[async_trait]
pub trait PersistHook: Send + Sync {
    async fn after_persist(&self, analysis: &AnalysisResult, location: &str) -> Result<(), HookError>;
}

/// Cheap pre-extraction check against the materialized project.
///
/// `Ok(false)` drops the project without recording a failure; `Err` records
/// a failure at the extract stage.
#[async_trait]
pub trait ProjectFilter: Send + Sync {
    async fn accept(&self, project: &Project) -> anyhow::Result<bool>;
}

/// Higher-level view of an analysis used to decide whether it is worth
/// persisting.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Interpretation {
    pub fingerprint_count: usize,
    pub types: BTreeSet<String>,
    pub per_type: BTreeMap<String, usize>,
}

impl Interpretation {
    pub fn from_fingerprints(fingerprints: &[Fingerprint]) -> Self {
        let mut per_type: BTreeMap<String, usize> = BTreeMap::new();
        for fp in fingerprints {
            *per_type.entry(fp.fp_type.clone()).or_default() += 1;
        }
        Self {
            fingerprint_count: fingerprints.len(),
            types: per_type.keys().cloned().collect(),
            per_type,
        }
    }

    pub fn has_type(&self, fp_type: &str) -> bool {
        self.types.contains(fp_type)
    }

    pub fn count_of(&self, fp_type: &str) -> usize {
        self.per_type.get(fp_type).copied().unwrap_or(0)
    }
}

/// Returns false to suppress persistence of an analysis.
pub type InterpretationFilter = Arc<dyn Fn(&Interpretation) -> bool + Send + Sync>;
