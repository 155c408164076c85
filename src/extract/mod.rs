//! Two-phase fingerprint extraction
//!
//! Independent extractors read the [`Project`]; consolidating extractors read
//! the complete output of the independent phase. The engine isolates every
//! extractor: a failure is logged, reported in [`Extraction::failures`] and
//! contributes nothing.

pub mod builtin;
mod engine;
mod timings;

pub use builtin::default_extractors;
pub use engine::{Extraction, ExtractionEngine, ExtractionError};
pub use timings::{ExtractionTimings, ExtractorTiming};

use crate::model::Fingerprint;
use crate::project::Project;
use anyhow::Result;
use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;

#[async_trait]
pub trait IndependentExtractor: Send + Sync {
    fn name(&self) -> &str;

    async fn extract(&self, project: &Project) -> Result<Vec<Fingerprint>>;
}

#[async_trait]
pub trait ConsolidatingExtractor: Send + Sync {
    fn name(&self) -> &str;

    /// Derives fingerprints from the independent phase's output. Must not
    /// depend on the order of `fingerprints`.
    async fn consolidate(&self, fingerprints: &[Fingerprint]) -> Result<Vec<Fingerprint>>;
}

#[derive(Clone)]
pub enum Extractor {
    Independent(Arc<dyn IndependentExtractor>),
    Consolidating(Arc<dyn ConsolidatingExtractor>),
}

impl Extractor {
    pub fn independent(extractor: impl IndependentExtractor + 'static) -> Self {
        Extractor::Independent(Arc::new(extractor))
    }

    pub fn consolidating(extractor: impl ConsolidatingExtractor + 'static) -> Self {
        Extractor::Consolidating(Arc::new(extractor))
    }

    pub fn name(&self) -> &str {
        match self {
            Extractor::Independent(e) => e.name(),
            Extractor::Consolidating(e) => e.name(),
        }
    }

    pub fn is_consolidating(&self) -> bool {
        matches!(self, Extractor::Consolidating(_))
    }
}

impl fmt::Debug for Extractor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = if self.is_consolidating() {
            "Consolidating"
        } else {
            "Independent"
        };
        write!(f, "{}({})", kind, self.name())
    }
}
