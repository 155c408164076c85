use super::ecosystem_for;
use crate::extract::ConsolidatingExtractor;
use crate::model::Fingerprint;
use anyhow::Result;
use async_trait::async_trait;
use serde_json::json;
use std::collections::BTreeSet;

/// Summarises `manifest` fingerprints into one `stack` fingerprint listing
/// the ecosystems in use, sorted. Nothing is emitted when no manifest was
/// found.
pub struct StackExtractor;

#[async_trait]
impl ConsolidatingExtractor for StackExtractor {
    fn name(&self) -> &str {
        "stack"
    }

    async fn consolidate(&self, fingerprints: &[Fingerprint]) -> Result<Vec<Fingerprint>> {
        let ecosystems: BTreeSet<String> = fingerprints
            .iter()
            .filter(|fp| fp.fp_type == "manifest")
            .filter_map(|fp| {
                fp.data
                    .get("ecosystem")
                    .and_then(|e| e.as_str())
                    .map(str::to_string)
                    .or_else(|| ecosystem_for(&fp.name).map(str::to_string))
            })
            .collect();

        if ecosystems.is_empty() {
            return Ok(Vec::new());
        }

        Ok(vec![Fingerprint::new(
            "stack",
            "ecosystems",
            json!(ecosystems),
        )])
    }
}
