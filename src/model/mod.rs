//! Core data model shared by every stage of a spider run
//!
//! A run moves each repository through `Candidate` → `Project` →
//! `AnalysisResult` → `PersistOutcome`. Only the aggregated summary and the
//! persisted records outlive the processing of a single candidate.

mod analysis;
mod fingerprint;
mod identity;

pub use analysis::{AnalysisResult, Candidate, PersistFailure, PersistOutcome, Provenance, Stage};
pub use fingerprint::{content_hash, dedupe_fingerprints, Fingerprint};
pub use identity::{parse_remote_url, RepoIdentity};
