use crate::extract::ExtractionTimings;
use crate::model::Stage;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpiderFailure {
    pub repo_url: String,
    pub while_trying_to: Stage,
    pub message: String,
}

/// Totals for a whole run, folded batch by batch.
///
/// A run with no candidates at all returns [`SpiderSummary::empty`], which
/// is distinguishable from a run where every candidate failed.
///
/// A repository split into sub-projects contributes one outcome per
/// sub-project, so its URL can appear in `failed` while some of its
/// sub-project locations appear in `persisted_analyses`. Such failures name
/// the sub-project path at the start of `message`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpiderSummary {
    pub repositories_detected: usize,
    pub projects_detected: usize,
    pub failed: Vec<SpiderFailure>,
    pub persisted_analyses: Vec<String>,
    pub kept_existing: Vec<String>,
    #[serde(default, skip_serializing_if = "ExtractionTimings::is_empty")]
    pub timings: ExtractionTimings,
}

impl SpiderSummary {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::empty()
    }

    pub fn has_failures(&self) -> bool {
        !self.failed.is_empty()
    }

    pub(crate) fn absorb(&mut self, report: CandidateReport) {
        self.repositories_detected += 1;
        self.projects_detected += report.projects;
        self.failed.extend(report.failures);
        self.persisted_analyses.extend(report.persisted);
        self.kept_existing.extend(report.kept_existing);
        self.timings.merge(&report.timings);
    }
}

/// Everything one candidate contributes to the summary
#[derive(Debug, Default)]
pub(crate) struct CandidateReport {
    pub repo_url: String,
    pub projects: usize,
    pub failures: Vec<SpiderFailure>,
    pub persisted: Vec<String>,
    pub kept_existing: Option<String>,
    pub timings: ExtractionTimings,
}

impl CandidateReport {
    pub fn new(repo_url: impl Into<String>) -> Self {
        Self {
            repo_url: repo_url.into(),
            ..Default::default()
        }
    }

    pub fn fail(&mut self, stage: Stage, message: impl Into<String>) {
        self.failures.push(SpiderFailure {
            repo_url: self.repo_url.clone(),
            while_trying_to: stage,
            message: message.into(),
        });
    }
}
