//! End-to-end spider runs against scripted sources, materializers and stores

mod support;

use anyhow::anyhow;
use async_trait::async_trait;
use repo_spider::extract::builtin::ManifestExtractor;
use repo_spider::model::PersistFailure;
use repo_spider::{
    default_extractors, AnalysisResult, AnalysisStore, ExtractionEngine, Extractor, Fingerprint,
    FreshnessPolicy, HookError, InMemoryAnalysisStore, IndependentExtractor, Interpretation,
    ManifestSubprojectFinder, PersistHook, PersistOutcome, PersistenceError, Project,
    ProjectFilter, RepoIdentity, SearchCriteria, Spider, SpiderOptions, SpiderSummary, Stage,
};
use serde_json::json;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use support::{candidate, identity, FailingStore, ScriptedMaterializer, VecSource, CARGO_TOML};

fn spider_with(
    materializer: &ScriptedMaterializer,
    store: Arc<dyn AnalysisStore>,
    options: SpiderOptions,
) -> Spider {
    Spider::new(
        Arc::new(materializer.clone()),
        Arc::new(ExtractionEngine::new(default_extractors())),
        store,
        options,
    )
}

async fn run(spider: &Spider, source: &VecSource) -> SpiderSummary {
    spider
        .run(source, &SearchCriteria::new(["org:acme"]))
        .await
        .expect("run should not fail")
}

#[tokio::test]
async fn test_empty_source_returns_empty_summary() {
    let materializer = ScriptedMaterializer::new();
    let spider = spider_with(
        &materializer,
        Arc::new(InMemoryAnalysisStore::new()),
        SpiderOptions::default(),
    );

    let summary = run(&spider, &VecSource::of(&[])).await;

    assert_eq!(summary, SpiderSummary::empty());
    assert!(summary.is_empty());
    assert_eq!(materializer.calls(), 0);
}

#[tokio::test]
async fn test_clone_failure_is_recorded_and_run_continues() {
    let materializer = ScriptedMaterializer::new().fail("broken", "cannot clone");
    let spider = spider_with(
        &materializer,
        Arc::new(InMemoryAnalysisStore::new()),
        SpiderOptions::default(),
    );

    let summary = run(&spider, &VecSource::of(&["broken"])).await;

    assert_eq!(
        serde_json::to_value(&summary).unwrap(),
        json!({
            "repositoriesDetected": 1,
            "projectsDetected": 0,
            "failed": [{
                "repoUrl": "https://github.com/acme/broken",
                "whileTryingTo": "clone",
                "message": "cannot clone"
            }],
            "persistedAnalyses": [],
            "keptExisting": []
        })
    );
}

#[tokio::test]
async fn test_successful_candidate_is_persisted_with_provenance() {
    let materializer = ScriptedMaterializer::new()
        .files("widget", &[("Cargo.toml", CARGO_TOML), ("LICENSE", "MIT License\n")]);
    let store = Arc::new(InMemoryAnalysisStore::new());
    let spider = spider_with(
        &materializer,
        store.clone(),
        SpiderOptions::default().with_workspace("team"),
    );

    let summary = run(&spider, &VecSource::of(&["widget", "gadget"])).await;

    assert_eq!(summary.repositories_detected, 2);
    assert_eq!(summary.projects_detected, 2);
    assert_eq!(
        summary.persisted_analyses,
        vec!["acme/widget.json".to_string(), "acme/gadget.json".to_string()]
    );
    assert!(summary.failed.is_empty());
    assert!(summary.timings.get("manifest").is_some());

    let stored = store
        .load_by_identity(&identity("widget"))
        .await
        .unwrap()
        .expect("record persisted");
    assert!(stored
        .fingerprints_of_type("manifest")
        .any(|fp| fp.name == "Cargo.toml"));
    assert!(stored
        .fingerprints_of_type("dependency")
        .any(|fp| fp.name == "cargo:serde"));
    assert_eq!(stored.provenance.workspace_id, "team");
    assert_eq!(stored.provenance.query.as_deref(), Some("org:acme"));
    assert_eq!(stored.provenance.source_metadata, json!({ "id": "widget" }));
}

#[tokio::test]
async fn test_existing_record_is_kept_without_materializing() {
    let store = Arc::new(InMemoryAnalysisStore::new());
    store
        .persist_one(&AnalysisResult::new(identity("widget"), Vec::new()))
        .await;
    let materializer = ScriptedMaterializer::new();
    let spider = spider_with(&materializer, store, SpiderOptions::default());

    let summary = run(&spider, &VecSource::of(&["widget"])).await;

    assert_eq!(summary.repositories_detected, 1);
    assert_eq!(summary.projects_detected, 0);
    assert_eq!(
        summary.kept_existing,
        vec!["https://github.com/acme/widget".to_string()]
    );
    assert!(summary.persisted_analyses.is_empty());
    assert_eq!(materializer.calls(), 0);
}

#[tokio::test]
async fn test_never_keep_reprocesses_existing_record() {
    let store = Arc::new(InMemoryAnalysisStore::new());
    store
        .persist_one(&AnalysisResult::new(identity("widget"), Vec::new()))
        .await;
    let materializer = ScriptedMaterializer::new().files("widget", &[("Cargo.toml", CARGO_TOML)]);
    let spider = spider_with(
        &materializer,
        store.clone(),
        SpiderOptions::default().with_freshness(FreshnessPolicy::NeverKeep),
    );

    let summary = run(&spider, &VecSource::of(&["widget"])).await;

    assert!(summary.kept_existing.is_empty());
    assert_eq!(summary.persisted_analyses, vec!["acme/widget.json".to_string()]);
    assert_eq!(materializer.calls(), 1);

    let stored = store.load_by_identity(&identity("widget")).await.unwrap().unwrap();
    assert!(!stored.fingerprints.is_empty());
}

/// Records when each analysis finished its post-persist hook.
#[derive(Default)]
struct SettlementClock {
    settled: Mutex<HashMap<String, Instant>>,
}

#[async_trait]
impl PersistHook for SettlementClock {
    async fn after_persist(&self, analysis: &AnalysisResult, _location: &str) -> Result<(), HookError> {
        tokio::time::sleep(Duration::from_millis(20)).await;
        self.settled
            .lock()
            .unwrap()
            .insert(analysis.identity.url.clone(), Instant::now());
        Ok(())
    }
}

#[tokio::test]
async fn test_batches_never_overlap() {
    let names = ["a", "b", "c", "d", "e"];
    let clock = Arc::new(SettlementClock::default());
    let materializer = ScriptedMaterializer::new().with_delay(Duration::from_millis(30));
    let spider = spider_with(
        &materializer,
        Arc::new(InMemoryAnalysisStore::new()),
        SpiderOptions::default()
            .with_pool_size(2)
            .with_hook(clock.clone()),
    );

    let summary = run(&spider, &VecSource::of(&names)).await;
    assert_eq!(summary.repositories_detected, 5);
    assert_eq!(summary.persisted_analyses.len(), 5);

    let spans = materializer.spans();
    let settled = clock.settled.lock().unwrap().clone();
    let started = |name: &str| {
        spans
            .iter()
            .find(|s| s.url == identity(name).url)
            .map(|s| s.start)
            .expect("candidate materialized")
    };
    let finished = |name: &str| *settled.get(&identity(name).url).expect("candidate settled");

    let batches: Vec<&[&str]> = names.chunks(2).collect();
    for pair in batches.windows(2) {
        let previous_settled = pair[0].iter().map(|n| finished(n)).max().unwrap();
        let next_start = pair[1].iter().map(|n| started(n)).min().unwrap();
        assert!(
            next_start >= previous_settled,
            "a batch started before the previous one settled"
        );
    }
}

struct ExplodingExtractor;

#[async_trait]
impl IndependentExtractor for ExplodingExtractor {
    fn name(&self) -> &str {
        "exploding"
    }

    async fn extract(&self, _project: &Project) -> anyhow::Result<Vec<Fingerprint>> {
        Err(anyhow!("boom"))
    }
}

#[tokio::test]
async fn test_failing_extractor_does_not_fail_candidate() {
    let materializer = ScriptedMaterializer::new().files("widget", &[("Cargo.toml", CARGO_TOML)]);
    let store = Arc::new(InMemoryAnalysisStore::new());
    let spider = Spider::new(
        Arc::new(materializer.clone()),
        Arc::new(ExtractionEngine::new([
            Extractor::independent(ExplodingExtractor),
            Extractor::independent(ManifestExtractor),
        ])),
        store.clone(),
        SpiderOptions::default(),
    );

    let summary = run(&spider, &VecSource::of(&["widget"])).await;

    assert!(summary.failed.is_empty());
    assert_eq!(summary.persisted_analyses.len(), 1);
    let stored = store.load_by_identity(&identity("widget")).await.unwrap().unwrap();
    assert_eq!(stored.fingerprints.len(), 1);
    assert_eq!(stored.fingerprints[0].fp_type, "manifest");
}

#[tokio::test]
async fn test_persist_failure_is_recorded() {
    let materializer = ScriptedMaterializer::new();
    let spider = spider_with(
        &materializer,
        Arc::new(FailingStore {
            message: "disk full".to_string(),
        }),
        SpiderOptions::default(),
    );

    let summary = run(&spider, &VecSource::of(&["widget"])).await;

    assert_eq!(summary.projects_detected, 1);
    assert!(summary.persisted_analyses.is_empty());
    assert_eq!(summary.failed.len(), 1);
    assert_eq!(summary.failed[0].while_trying_to, Stage::Persist);
    assert_eq!(summary.failed[0].message, "disk full");
    assert_eq!(summary.failed[0].repo_url, "https://github.com/acme/widget");
}

struct CountingHook {
    calls: AtomicUsize,
}

#[async_trait]
impl PersistHook for CountingHook {
    async fn after_persist(&self, _analysis: &AnalysisResult, _location: &str) -> Result<(), HookError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(HookError::new("notify", "webhook unreachable"))
    }
}

#[tokio::test]
async fn test_hook_failure_does_not_change_outcome() {
    let hook = Arc::new(CountingHook {
        calls: AtomicUsize::new(0),
    });
    let materializer = ScriptedMaterializer::new();
    let spider = spider_with(
        &materializer,
        Arc::new(InMemoryAnalysisStore::new()),
        SpiderOptions::default().with_hook(hook.clone()),
    );

    let summary = run(&spider, &VecSource::of(&["widget", "gadget"])).await;

    assert_eq!(hook.calls.load(Ordering::SeqCst), 2);
    assert_eq!(summary.persisted_analyses.len(), 2);
    assert!(summary.failed.is_empty());
}

struct ManifestRequired;

#[async_trait]
impl ProjectFilter for ManifestRequired {
    async fn accept(&self, project: &Project) -> anyhow::Result<bool> {
        if project.identity().name == "weird" {
            return Err(anyhow!("cannot inspect project"));
        }
        Ok(project.has_file("Cargo.toml"))
    }
}

#[tokio::test]
async fn test_project_filter_drops_or_fails_candidates() {
    let materializer = ScriptedMaterializer::new().files("widget", &[("Cargo.toml", CARGO_TOML)]);
    let spider = spider_with(
        &materializer,
        Arc::new(InMemoryAnalysisStore::new()),
        SpiderOptions::default().with_project_filter(Arc::new(ManifestRequired)),
    );

    let summary = run(&spider, &VecSource::of(&["widget", "docs", "weird"])).await;

    assert_eq!(summary.repositories_detected, 3);
    assert_eq!(summary.projects_detected, 1);
    assert_eq!(summary.persisted_analyses, vec!["acme/widget.json".to_string()]);
    assert_eq!(summary.failed.len(), 1);
    assert_eq!(summary.failed[0].repo_url, "https://github.com/acme/weird");
    assert_eq!(summary.failed[0].while_trying_to, Stage::Extract);
    assert!(summary.failed[0].message.contains("cannot inspect project"));
}

#[tokio::test]
async fn test_interpretation_filter_suppresses_persist() {
    let materializer = ScriptedMaterializer::new().files("widget", &[("Cargo.toml", CARGO_TOML)]);
    let store = Arc::new(InMemoryAnalysisStore::new());
    let spider = spider_with(
        &materializer,
        store.clone(),
        SpiderOptions::default()
            .with_interpretation_filter(Arc::new(|i: &Interpretation| i.has_type("manifest"))),
    );

    let summary = run(&spider, &VecSource::of(&["widget", "docs"])).await;

    assert_eq!(summary.projects_detected, 2);
    assert_eq!(summary.persisted_analyses, vec!["acme/widget.json".to_string()]);
    assert!(summary.failed.is_empty());
    assert_eq!(store.len(), 1);
}

#[tokio::test]
async fn test_slow_candidate_times_out() {
    let materializer = ScriptedMaterializer::new().with_delay(Duration::from_secs(3));
    let spider = spider_with(
        &materializer,
        Arc::new(InMemoryAnalysisStore::new()),
        SpiderOptions::default().with_candidate_timeout(Duration::from_secs(1)),
    );

    let summary = run(&spider, &VecSource::of(&["slow"])).await;

    assert_eq!(summary.repositories_detected, 1);
    assert_eq!(summary.failed.len(), 1);
    assert_eq!(summary.failed[0].while_trying_to, Stage::Timeout);
    assert_eq!(summary.failed[0].message, "timed out after 1s");
}

fn monorepo_materializer() -> ScriptedMaterializer {
    ScriptedMaterializer::new().files(
        "mono",
        &[
            ("api/Cargo.toml", CARGO_TOML),
            ("web/package.json", r#"{"name": "web", "dependencies": {"react": "^18.0.0"}}"#),
            ("README.md", "# mono"),
        ],
    )
}

fn splitting() -> SpiderOptions {
    SpiderOptions::default().with_subproject_finder(Arc::new(ManifestSubprojectFinder::new()))
}

#[tokio::test]
async fn test_monorepo_is_split_into_subprojects() {
    let materializer = monorepo_materializer();
    let store = Arc::new(InMemoryAnalysisStore::new());
    let spider = spider_with(&materializer, store.clone(), splitting());

    let summary = run(&spider, &VecSource::of(&["mono"])).await;

    assert_eq!(summary.repositories_detected, 1);
    assert_eq!(summary.projects_detected, 2);
    let mut persisted = summary.persisted_analyses.clone();
    persisted.sort();
    assert_eq!(persisted, vec!["acme/mono/api.json", "acme/mono/web.json"]);

    let web = store
        .load_by_identity(&identity("mono").with_path("web"))
        .await
        .unwrap()
        .expect("web sub-project persisted");
    assert!(web.fingerprints_of_type("dependency").any(|fp| fp.name == "npm:react"));
}

#[tokio::test]
async fn test_split_repository_is_kept_on_rerun() {
    let materializer = monorepo_materializer();
    let store = Arc::new(InMemoryAnalysisStore::new());
    let spider = spider_with(&materializer, store.clone(), splitting());

    let first = run(&spider, &VecSource::of(&["mono"])).await;
    assert_eq!(first.persisted_analyses.len(), 2);
    assert_eq!(materializer.calls(), 1);

    let second = run(&spider, &VecSource::of(&["mono"])).await;

    assert_eq!(second.kept_existing, vec![identity("mono").url]);
    assert!(second.persisted_analyses.is_empty());
    assert_eq!(second.projects_detected, 0);
    assert_eq!(materializer.calls(), 1);
}

/// Delegates to an in-memory store but rejects one sub-project path.
struct RejectsPath {
    inner: InMemoryAnalysisStore,
    path: &'static str,
}

#[async_trait]
impl AnalysisStore for RejectsPath {
    async fn persist(&self, analyses: &[AnalysisResult]) -> PersistOutcome {
        let (rejected, accepted): (Vec<_>, Vec<_>) = analyses
            .iter()
            .cloned()
            .partition(|a| a.identity.path.as_deref() == Some(self.path));
        let mut outcome = self.inner.persist(&accepted).await;
        outcome.attempted += rejected.len();
        outcome.failed.extend(rejected.into_iter().map(|a| PersistFailure {
            identity: a.identity,
            stage: Stage::Persist,
            message: "quota exceeded".to_string(),
        }));
        outcome
    }

    async fn load_by_identity(
        &self,
        identity: &RepoIdentity,
    ) -> Result<Option<AnalysisResult>, PersistenceError> {
        self.inner.load_by_identity(identity).await
    }

    async fn load_all(&self) -> Result<Vec<AnalysisResult>, PersistenceError> {
        self.inner.load_all().await
    }
}

#[tokio::test]
async fn test_split_repository_reports_each_sub_project() {
    let materializer = monorepo_materializer();
    let spider = spider_with(
        &materializer,
        Arc::new(RejectsPath {
            inner: InMemoryAnalysisStore::new(),
            path: "web",
        }),
        splitting(),
    );

    let summary = run(&spider, &VecSource::of(&["mono"])).await;

    assert_eq!(summary.projects_detected, 2);
    assert_eq!(summary.persisted_analyses, vec!["acme/mono/api.json".to_string()]);
    assert_eq!(summary.failed.len(), 1);
    assert_eq!(summary.failed[0].repo_url, identity("mono").url);
    assert_eq!(summary.failed[0].while_trying_to, Stage::Persist);
    assert_eq!(summary.failed[0].message, "web: quota exceeded");
}

struct PanickingExtractor;

#[async_trait]
impl IndependentExtractor for PanickingExtractor {
    fn name(&self) -> &str {
        "panicking"
    }

    async fn extract(&self, _project: &Project) -> anyhow::Result<Vec<Fingerprint>> {
        panic!("extractor bug")
    }
}

#[tokio::test]
async fn test_panicking_extractor_does_not_abort_run() {
    let materializer = ScriptedMaterializer::new().files("widget", &[("Cargo.toml", CARGO_TOML)]);
    let store = Arc::new(InMemoryAnalysisStore::new());
    let spider = Spider::new(
        Arc::new(materializer.clone()),
        Arc::new(ExtractionEngine::new([
            Extractor::independent(PanickingExtractor),
            Extractor::independent(ManifestExtractor),
        ])),
        store.clone(),
        SpiderOptions::default(),
    );

    let summary = run(&spider, &VecSource::of(&["widget", "gadget"])).await;

    assert_eq!(summary.repositories_detected, 2);
    assert_eq!(summary.persisted_analyses.len(), 2);
    assert!(summary.failed.is_empty());
    let stored = store.load_by_identity(&identity("widget")).await.unwrap().unwrap();
    assert!(stored.fingerprints_of_type("manifest").next().is_some());
}

#[tokio::test]
async fn test_enumeration_error_aborts_run() {
    let materializer = ScriptedMaterializer::new();
    let spider = spider_with(
        &materializer,
        Arc::new(InMemoryAnalysisStore::new()),
        SpiderOptions::default().with_pool_size(1),
    );
    let source = VecSource::new(vec![candidate("first")]).then_fail("rate limited");

    let err = spider
        .run(&source, &SearchCriteria::new(["org:acme"]))
        .await
        .unwrap_err();

    assert!(err.to_string().contains("rate limited"));
    assert_eq!(materializer.calls(), 1);
}
