//! Run orchestration
//!
//! [`Spider::run`] pulls candidates from a source in fixed-size batches,
//! processes every candidate of a batch concurrently and waits for the whole
//! batch before pulling the next one. Per candidate:
//!
//! ```text
//! discovered -> gated (keep | proceed) -> materialized | clone failed
//!            -> extracted | extract failed -> persisted | persist failed
//! ```
//!
//! Only enumeration errors end a run early; every other failure is recorded
//! in the summary and the run moves on.

mod hooks;
mod subproject;
mod summary;

pub use hooks::{HookError, Interpretation, InterpretationFilter, PersistHook, ProjectFilter};
pub use subproject::{ManifestSubprojectFinder, SubprojectFinder};
pub use summary::{SpiderFailure, SpiderSummary};

use crate::extract::ExtractionEngine;
use crate::gate::{ExistingRecordGate, FreshnessPolicy, KeepExisting};
use crate::materialize::Materializer;
use crate::model::{AnalysisResult, Candidate, Provenance, Stage};
use crate::project::Project;
use crate::source::{EnumerationError, RepositorySource, SearchCriteria};
use crate::store::AnalysisStore;
use futures_util::future::join_all;
use futures_util::StreamExt;
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};
use summary::CandidateReport;
use tracing::{debug, info, warn};

pub const DEFAULT_POOL_SIZE: usize = 40;
pub const DEFAULT_WORKSPACE_ID: &str = "local";

#[derive(Clone)]
pub struct SpiderOptions {
    /// Namespace for persisted records
    pub workspace_id: String,
    /// Candidates per batch
    pub pool_size: usize,
    pub keep_existing: KeepExisting,
    pub candidate_timeout: Option<Duration>,
    pub hook: Option<Arc<dyn PersistHook>>,
    pub project_filter: Option<Arc<dyn ProjectFilter>>,
    pub interpretation_filter: Option<InterpretationFilter>,
    pub subproject_finder: Option<Arc<dyn SubprojectFinder>>,
}

impl Default for SpiderOptions {
    fn default() -> Self {
        Self {
            workspace_id: DEFAULT_WORKSPACE_ID.to_string(),
            pool_size: DEFAULT_POOL_SIZE,
            keep_existing: FreshnessPolicy::AlwaysKeep.into_predicate(),
            candidate_timeout: None,
            hook: None,
            project_filter: None,
            interpretation_filter: None,
            subproject_finder: None,
        }
    }
}

impl SpiderOptions {
    pub fn with_workspace(mut self, workspace_id: impl Into<String>) -> Self {
        self.workspace_id = workspace_id.into();
        self
    }

    /// Zero is treated as one.
    pub fn with_pool_size(mut self, pool_size: usize) -> Self {
        self.pool_size = pool_size.max(1);
        self
    }

    pub fn with_keep_existing(mut self, keep: KeepExisting) -> Self {
        self.keep_existing = keep;
        self
    }

    pub fn with_freshness(self, policy: FreshnessPolicy) -> Self {
        self.with_keep_existing(policy.into_predicate())
    }

    pub fn with_candidate_timeout(mut self, timeout: Duration) -> Self {
        self.candidate_timeout = Some(timeout);
        self
    }

    pub fn with_hook(mut self, hook: Arc<dyn PersistHook>) -> Self {
        self.hook = Some(hook);
        self
    }

    pub fn with_project_filter(mut self, filter: Arc<dyn ProjectFilter>) -> Self {
        self.project_filter = Some(filter);
        self
    }

    pub fn with_interpretation_filter(mut self, filter: InterpretationFilter) -> Self {
        self.interpretation_filter = Some(filter);
        self
    }

    pub fn with_subproject_finder(mut self, finder: Arc<dyn SubprojectFinder>) -> Self {
        self.subproject_finder = Some(finder);
        self
    }
}

impl fmt::Debug for SpiderOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SpiderOptions")
            .field("workspace_id", &self.workspace_id)
            .field("pool_size", &self.pool_size)
            .field("candidate_timeout", &self.candidate_timeout)
            .field("hook", &self.hook.is_some())
            .field("project_filter", &self.project_filter.is_some())
            .field("interpretation_filter", &self.interpretation_filter.is_some())
            .field("subproject_finder", &self.subproject_finder.is_some())
            .finish()
    }
}

pub struct Spider {
    materializer: Arc<dyn Materializer>,
    engine: Arc<ExtractionEngine>,
    store: Arc<dyn AnalysisStore>,
    gate: ExistingRecordGate,
    options: SpiderOptions,
}

impl Spider {
    pub fn new(
        materializer: Arc<dyn Materializer>,
        engine: Arc<ExtractionEngine>,
        store: Arc<dyn AnalysisStore>,
        options: SpiderOptions,
    ) -> Self {
        Self {
            gate: ExistingRecordGate::new(Arc::clone(&store)),
            materializer,
            engine,
            store,
            options,
        }
    }

    pub fn options(&self) -> &SpiderOptions {
        &self.options
    }

    /// Spiders every candidate `source` yields for `criteria`.
    pub async fn run(
        &self,
        source: &dyn RepositorySource,
        criteria: &SearchCriteria,
    ) -> Result<SpiderSummary, EnumerationError> {
        let started = Instant::now();
        let pool_size = self.options.pool_size.max(1);
        info!(
            source = %source.describe(),
            workspace = %self.options.workspace_id,
            pool_size,
            extractors = self.engine.extractor_count(),
            "Starting spider run"
        );

        let mut candidates = source.enumerate(criteria);
        let mut summary = SpiderSummary::empty();
        let mut batch_number = 0usize;
        let mut exhausted = false;

        while !exhausted {
            let mut batch = Vec::with_capacity(pool_size);
            while batch.len() < pool_size {
                match candidates.next().await {
                    Some(Ok(candidate)) => batch.push(candidate),
                    Some(Err(e)) => {
                        warn!(error = %e, "Enumeration failed, aborting run");
                        return Err(e);
                    }
                    None => {
                        exhausted = true;
                        break;
                    }
                }
            }
            if batch.is_empty() {
                break;
            }

            batch_number += 1;
            debug!(batch = batch_number, size = batch.len(), "Dispatching batch");
            let reports = join_all(batch.into_iter().map(|c| self.process_bounded(c))).await;
            for report in reports {
                summary.absorb(report);
            }
        }

        info!(
            repositories = summary.repositories_detected,
            projects = summary.projects_detected,
            persisted = summary.persisted_analyses.len(),
            kept = summary.kept_existing.len(),
            failed = summary.failed.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Spider run complete"
        );
        Ok(summary)
    }

    async fn process_bounded(&self, candidate: Candidate) -> CandidateReport {
        let Some(limit) = self.options.candidate_timeout else {
            return self.process(&candidate).await;
        };

        match tokio::time::timeout(limit, self.process(&candidate)).await {
            Ok(report) => report,
            Err(_) => {
                warn!(repo = %candidate.identity.url, timeout_secs = limit.as_secs(), "Candidate timed out");
                let mut report = CandidateReport::new(&candidate.identity.url);
                report.fail(Stage::Timeout, format!("timed out after {}s", limit.as_secs()));
                report
            }
        }
    }

    async fn process(&self, candidate: &Candidate) -> CandidateReport {
        let identity = &candidate.identity;
        let mut report = CandidateReport::new(&identity.url);

        if self
            .gate
            .should_skip(identity, &self.options.keep_existing)
            .await
        {
            info!(repo = %identity.url, "Keeping existing analysis");
            report.kept_existing = Some(identity.url.clone());
            return report;
        }

        let project = match self.materializer.materialize(candidate).await {
            Ok(project) => project,
            Err(e) => {
                warn!(repo = %identity.url, kind = %e.kind, error = %e, "Materialization failed");
                report.fail(Stage::Clone, e.to_string());
                return report;
            }
        };

        if let Some(filter) = &self.options.project_filter {
            match filter.accept(&project).await {
                Ok(true) => {}
                Ok(false) => {
                    info!(repo = %identity.url, "Project excluded by filter");
                    return report;
                }
                Err(e) => {
                    warn!(repo = %identity.url, error = %e, "Project filter failed");
                    report.fail(Stage::Extract, format!("{:#}", e));
                    return report;
                }
            }
        }

        for target in self.targets(&project) {
            self.extract_and_persist(candidate, &target, &mut report).await;
        }

        report
    }

    /// Sub-projects to analyse separately, or the project itself.
    fn targets(&self, project: &Project) -> Vec<Project> {
        let Some(finder) = &self.options.subproject_finder else {
            return vec![project.subproject("")];
        };

        match finder.find(project) {
            Ok(paths) if !paths.is_empty() => {
                info!(repo = %project.identity().url, count = paths.len(), "Splitting into sub-projects");
                paths.iter().map(|p| project.subproject(p)).collect()
            }
            Ok(_) => vec![project.subproject("")],
            Err(e) => {
                warn!(repo = %project.identity().url, error = %e, "Sub-project discovery failed, analysing root");
                vec![project.subproject("")]
            }
        }
    }

    async fn extract_and_persist(
        &self,
        candidate: &Candidate,
        project: &Project,
        report: &mut CandidateReport,
    ) {
        let identity = project.identity();
        let extraction = self.engine.extract(project).await;
        report.projects += 1;
        report.timings.merge(&extraction.timings);

        if let Some(filter) = &self.options.interpretation_filter {
            let interpretation = Interpretation::from_fingerprints(&extraction.fingerprints);
            if !filter(&interpretation) {
                info!(identity = %identity, "Analysis excluded by interpretation filter");
                return;
            }
        }

        let analysis = AnalysisResult::new(identity.clone(), extraction.fingerprints).with_provenance(
            Provenance {
                workspace_id: self.options.workspace_id.clone(),
                source_metadata: candidate.source_metadata.clone(),
                query: candidate.query.clone(),
            },
        );

        let outcome = self.store.persist_one(&analysis).await;
        for failure in outcome.failed {
            let message = match &identity.path {
                Some(path) => format!("{}: {}", path, failure.message),
                None => failure.message,
            };
            report.fail(Stage::Persist, message);
        }
        for location in outcome.succeeded {
            info!(identity = %identity, location = %location, "Persisted analysis");
            if let Some(hook) = &self.options.hook {
                if let Err(e) = hook.after_persist(&analysis, &location).await {
                    warn!(identity = %identity, error = %e, "Post-persist hook failed");
                }
            }
            report.persisted.push(location);
        }
    }
}
