use super::{ConsolidatingExtractor, Extractor, ExtractionTimings, IndependentExtractor};
use crate::model::{dedupe_fingerprints, Fingerprint, RepoIdentity};
use crate::project::Project;
use anyhow::anyhow;
use futures_util::future::join_all;
use futures_util::FutureExt;
use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;
use tracing::{debug, warn};

/// One extractor's failure; never aborts the extraction.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Extractor '{extractor}' failed: {message}")]
pub struct ExtractionError {
    pub extractor: String,
    pub message: String,
}

#[derive(Debug, Default)]
pub struct Extraction {
    pub fingerprints: Vec<Fingerprint>,
    pub timings: ExtractionTimings,
    pub failures: Vec<ExtractionError>,
}

pub struct ExtractionEngine {
    independent: Vec<Arc<dyn IndependentExtractor>>,
    consolidating: Vec<Arc<dyn ConsolidatingExtractor>>,
}

impl ExtractionEngine {
    pub fn new(extractors: impl IntoIterator<Item = Extractor>) -> Self {
        let mut independent = Vec::new();
        let mut consolidating = Vec::new();
        for extractor in extractors {
            match extractor {
                Extractor::Independent(e) => independent.push(e),
                Extractor::Consolidating(e) => consolidating.push(e),
            }
        }
        Self {
            independent,
            consolidating,
        }
    }

    pub fn extractor_count(&self) -> usize {
        self.independent.len() + self.consolidating.len()
    }

    /// Runs every independent extractor concurrently, then every
    /// consolidating extractor concurrently over the full phase-one output.
    ///
    /// Fingerprint order is unspecified; compare results by
    /// [`Fingerprint::key`].
    pub async fn extract(&self, project: &Project) -> Extraction {
        let identity = project.identity();
        let mut extraction = Extraction::default();

        let phase_one = join_all(self.independent.iter().map(|extractor| async move {
            let started = Instant::now();
            let result = contain(extractor.extract(project)).await;
            (extractor.name(), started.elapsed(), result)
        }))
        .await;

        for (name, elapsed, result) in phase_one {
            extraction.timings.record(name, elapsed);
            match result {
                Ok(fingerprints) => {
                    debug!(
                        identity = %identity,
                        extractor = name,
                        count = fingerprints.len(),
                        elapsed_ms = elapsed.as_millis() as u64,
                        "Extractor finished"
                    );
                    extraction.fingerprints.extend(fingerprints);
                }
                Err(e) => extraction.failures.push(isolate(identity, name, &e)),
            }
        }

        let base = &extraction.fingerprints;
        let phase_two = join_all(self.consolidating.iter().map(|extractor| async move {
            let started = Instant::now();
            let result = contain(extractor.consolidate(base)).await;
            (extractor.name(), started.elapsed(), result)
        }))
        .await;

        let mut derived = Vec::new();
        for (name, elapsed, result) in phase_two {
            extraction.timings.record(name, elapsed);
            match result {
                Ok(fingerprints) => derived.extend(fingerprints),
                Err(e) => extraction.failures.push(isolate(identity, name, &e)),
            }
        }
        extraction.fingerprints.extend(derived);
        extraction.fingerprints = dedupe_fingerprints(std::mem::take(&mut extraction.fingerprints));

        extraction
    }
}

/// Turns a panic inside an extractor into an ordinary error.
async fn contain<F>(extraction: F) -> anyhow::Result<Vec<Fingerprint>>
where
    F: Future<Output = anyhow::Result<Vec<Fingerprint>>>,
{
    match AssertUnwindSafe(extraction).catch_unwind().await {
        Ok(result) => result,
        Err(payload) => Err(anyhow!("panicked: {}", panic_message(payload.as_ref()))),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("unknown panic")
}

fn isolate(
    identity: &RepoIdentity,
    extractor: &str,
    error: &anyhow::Error,
) -> ExtractionError {
    warn!(
        identity = %identity,
        extractor,
        error = %error,
        "Extractor failed, continuing without its fingerprints"
    );
    ExtractionError {
        extractor: extractor.to_string(),
        message: format!("{:#}", error),
    }
}
