//! Scripted collaborators shared by the spider integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use futures_util::stream::{self, StreamExt};
use repo_spider::fs::MockFileSystem;
use repo_spider::model::{PersistFailure, PersistOutcome};
use repo_spider::{
    AnalysisResult, AnalysisStore, Candidate, CandidateStream, EnumerationError,
    MaterializationError, Materializer, PersistenceError, Project, RepoIdentity, RepositorySource,
    SearchCriteria, Stage,
};
use serde_json::json;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

pub fn identity(name: &str) -> RepoIdentity {
    RepoIdentity::new("acme", name, format!("https://github.com/acme/{}", name), "main")
}

pub fn candidate(name: &str) -> Candidate {
    Candidate::new(identity(name), json!({ "id": name })).with_query("org:acme")
}

/// Yields fixed candidates, optionally followed by an enumeration error.
pub struct VecSource {
    candidates: Vec<Candidate>,
    fail_with: Option<String>,
}

impl VecSource {
    pub fn new(candidates: Vec<Candidate>) -> Self {
        Self {
            candidates,
            fail_with: None,
        }
    }

    pub fn of(names: &[&str]) -> Self {
        Self::new(names.iter().map(|n| candidate(n)).collect())
    }

    pub fn then_fail(mut self, message: &str) -> Self {
        self.fail_with = Some(message.to_string());
        self
    }
}

impl RepositorySource for VecSource {
    fn enumerate(&self, _criteria: &SearchCriteria) -> CandidateStream {
        let mut items: Vec<Result<Candidate, EnumerationError>> =
            self.candidates.iter().cloned().map(Ok).collect();
        if let Some(message) = &self.fail_with {
            items.push(Err(EnumerationError::InvalidResponse(message.clone())));
        }
        stream::iter(items).boxed()
    }

    fn describe(&self) -> String {
        format!("{} scripted candidates", self.candidates.len())
    }
}

enum Script {
    Files(Vec<(String, String)>),
    Fail(String),
}

/// Start and end of one `materialize` call
#[derive(Debug, Clone)]
pub struct Span {
    pub url: String,
    pub start: Instant,
    pub end: Instant,
}

/// Builds in-memory projects per repository URL and records every call.
#[derive(Clone)]
pub struct ScriptedMaterializer {
    scripts: Arc<Mutex<HashMap<String, Script>>>,
    delay: Duration,
    calls: Arc<AtomicUsize>,
    spans: Arc<Mutex<Vec<Span>>>,
}

impl ScriptedMaterializer {
    pub fn new() -> Self {
        Self {
            scripts: Arc::new(Mutex::new(HashMap::new())),
            delay: Duration::ZERO,
            calls: Arc::new(AtomicUsize::new(0)),
            spans: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn files(self, name: &str, files: &[(&str, &str)]) -> Self {
        let files = files
            .iter()
            .map(|(p, c)| (p.to_string(), c.to_string()))
            .collect();
        self.scripts
            .lock()
            .unwrap()
            .insert(identity(name).url, Script::Files(files));
        self
    }

    pub fn fail(self, name: &str, message: &str) -> Self {
        self.scripts
            .lock()
            .unwrap()
            .insert(identity(name).url, Script::Fail(message.to_string()));
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn spans(&self) -> Vec<Span> {
        self.spans.lock().unwrap().clone()
    }
}

#[async_trait]
impl Materializer for ScriptedMaterializer {
    async fn materialize(&self, candidate: &Candidate) -> Result<Project, MaterializationError> {
        let start = Instant::now();
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        let url = candidate.identity.url.clone();
        let result = {
            let scripts = self.scripts.lock().unwrap();
            match scripts.get(&url) {
                Some(Script::Fail(message)) => Err(MaterializationError::clone_failed(message.clone())),
                Some(Script::Files(files)) => Ok(mock_project(&candidate.identity, files)),
                None => Ok(mock_project(
                    &candidate.identity,
                    &[("README.md".to_string(), "# readme".to_string())],
                )),
            }
        };

        self.spans.lock().unwrap().push(Span {
            url,
            start,
            end: Instant::now(),
        });
        result
    }
}

fn mock_project(identity: &RepoIdentity, files: &[(String, String)]) -> Project {
    let root = PathBuf::from(format!("/repos/{}", identity.name));
    let fs = MockFileSystem::with_root(root.clone());
    for (path, content) in files {
        fs.add_file(path, content);
    }
    Project::new(identity.clone(), root, Arc::new(fs))
}

/// Rejects every write with the given message.
pub struct FailingStore {
    pub message: String,
}

#[async_trait]
impl AnalysisStore for FailingStore {
    async fn persist(&self, analyses: &[AnalysisResult]) -> PersistOutcome {
        PersistOutcome {
            attempted: analyses.len(),
            succeeded: Vec::new(),
            failed: analyses
                .iter()
                .map(|a| PersistFailure {
                    identity: a.identity.clone(),
                    stage: Stage::Persist,
                    message: self.message.clone(),
                })
                .collect(),
        }
    }

    async fn load_by_identity(
        &self,
        _identity: &RepoIdentity,
    ) -> Result<Option<AnalysisResult>, PersistenceError> {
        Ok(None)
    }

    async fn load_all(&self) -> Result<Vec<AnalysisResult>, PersistenceError> {
        Ok(Vec::new())
    }
}

pub const CARGO_TOML: &str = r#"[package]
name = "widget"
version = "0.1.0"

[dependencies]
serde = "1.0"
"#;
