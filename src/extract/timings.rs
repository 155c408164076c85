use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractorTiming {
    pub count: u64,
    pub total_ms: u64,
}

/// Per-extractor run counts and accumulated wall time.
///
/// Each extraction returns its own accumulator; the orchestrator merges them
/// so no timing state is shared between concurrent candidates.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExtractionTimings {
    by_extractor: BTreeMap<String, ExtractorTiming>,
}

impl ExtractionTimings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, extractor: &str, elapsed: Duration) {
        let entry = self.by_extractor.entry(extractor.to_string()).or_default();
        entry.count += 1;
        entry.total_ms += elapsed.as_millis() as u64;
    }

    pub fn merge(&mut self, other: &ExtractionTimings) {
        for (name, timing) in &other.by_extractor {
            let entry = self.by_extractor.entry(name.clone()).or_default();
            entry.count += timing.count;
            entry.total_ms += timing.total_ms;
        }
    }

    pub fn get(&self, extractor: &str) -> Option<&ExtractorTiming> {
        self.by_extractor.get(extractor)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ExtractorTiming)> {
        self.by_extractor.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn is_empty(&self) -> bool {
        self.by_extractor.is_empty()
    }
}
