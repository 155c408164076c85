//! repo-spider - repository spidering and fingerprint extraction
//!
//! Repositories are discovered by a [`RepositorySource`] (GitHub search or a
//! local directory walk), materialized into readable working copies, run
//! through a two-phase [`ExtractionEngine`] and persisted as one
//! [`AnalysisResult`] per repository identity. A [`Spider`] drives the whole
//! pipeline in fixed-size batches and folds every outcome into a
//! [`SpiderSummary`].
//!
//! # Example Usage
//!
//! ```no_run
//! use repo_spider::{
//!     default_extractors, ExtractionEngine, FileAnalysisStore, LocalMaterializer,
//!     LocalTreeSource, SearchCriteria, Spider, SpiderOptions,
//! };
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let spider = Spider::new(
//!     Arc::new(LocalMaterializer::new()),
//!     Arc::new(ExtractionEngine::new(default_extractors())),
//!     Arc::new(FileAnalysisStore::new("/tmp/analyses", "local")),
//!     SpiderOptions::default().with_pool_size(1),
//! );
//!
//! let summary = spider
//!     .run(&LocalTreeSource::new("/home/me/src"), &SearchCriteria::default())
//!     .await?;
//! println!("{} analyses persisted", summary.persisted_analyses.len());
//! # Ok(())
//! # }
//! ```
//!
//! # Project Structure
//!
//! - [`source`]: candidate enumeration
//! - [`materialize`] and [`project`]: clones and opened working copies
//! - [`gate`]: existing-record freshness check
//! - [`extract`]: extractor traits, engine and built-in extractors
//! - [`store`]: idempotent analysis persistence
//! - [`spider`]: batched orchestration and run summary

pub mod cli;
pub mod config;
pub mod extract;
pub mod fs;
pub mod gate;
pub mod materialize;
pub mod model;
pub mod project;
pub mod source;
pub mod spider;
pub mod store;
pub mod util;

pub use config::{ConfigError, SpiderConfig};
pub use extract::{
    default_extractors, ConsolidatingExtractor, Extraction, ExtractionEngine, ExtractionError,
    ExtractionTimings, Extractor, IndependentExtractor,
};
pub use gate::{ExistingRecordGate, FreshnessPolicy, KeepExisting};
pub use materialize::{
    CloneConfig, CloneMaterializer, LocalMaterializer, MaterializationError,
    MaterializationErrorKind, Materializer,
};
pub use model::{AnalysisResult, Candidate, Fingerprint, PersistOutcome, RepoIdentity, Stage};
pub use project::Project;
pub use source::{
    CandidateStream, EnumerationError, GitHubSearchClient, GitHubSearchSource, LocalTreeSource,
    RepositorySource, SearchClient, SearchCriteria,
};
pub use spider::{
    HookError, Interpretation, InterpretationFilter, ManifestSubprojectFinder, PersistHook,
    ProjectFilter, Spider, SpiderFailure, SpiderOptions, SpiderSummary, SubprojectFinder,
};
pub use store::{AnalysisStore, FileAnalysisStore, InMemoryAnalysisStore, PersistenceError};
pub use util::{init_from_env, init_logging, LoggingConfig};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");
