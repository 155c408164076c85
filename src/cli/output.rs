//! Output formatting for run summaries and configuration
//!
//! Everything here goes to stdout; logs go to stderr.

use crate::config::SpiderConfig;
use crate::spider::SpiderSummary;
use anyhow::{Context, Result};
use std::collections::BTreeMap;

const RULE: &str = "\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// JSON format (machine-readable)
    Json,
    /// YAML format
    Yaml,
    /// Human-readable formatted text
    Human,
}

pub struct OutputFormatter {
    format: OutputFormat,
}

impl OutputFormatter {
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    pub fn format_summary(&self, summary: &SpiderSummary) -> Result<String> {
        match self.format {
            OutputFormat::Json => serde_json::to_string_pretty(summary)
                .context("Failed to serialize spider summary to JSON"),
            OutputFormat::Yaml => {
                serde_yaml::to_string(summary).context("Failed to serialize spider summary to YAML")
            }
            OutputFormat::Human => Ok(self.format_summary_human(summary)),
        }
    }

    pub fn format_config(&self, config: &SpiderConfig) -> Result<String> {
        let config_map: BTreeMap<String, String> = config.to_display_map().into_iter().collect();
        match self.format {
            OutputFormat::Json => serde_json::to_string_pretty(&config_map)
                .context("Failed to serialize config to JSON"),
            OutputFormat::Yaml => {
                serde_yaml::to_string(&config_map).context("Failed to serialize config to YAML")
            }
            OutputFormat::Human => Ok(config.to_string()),
        }
    }

    fn format_summary_human(&self, summary: &SpiderSummary) -> String {
        let mut output = String::new();

        if summary.is_empty() {
            output.push_str("No repositories found\n");
            return output;
        }

        if summary.has_failures() {
            output.push_str("\u{26A0} Spider Summary (with failures)\n");
        } else {
            output.push_str("\u{2713} Spider Summary\n");
        }
        output.push_str(RULE);
        output.push_str("\n\n");

        output.push_str(&format!("Repositories detected:  {}\n", summary.repositories_detected));
        output.push_str(&format!("Projects detected:      {}\n", summary.projects_detected));
        output.push_str(&format!("Persisted analyses:     {}\n", summary.persisted_analyses.len()));
        output.push_str(&format!("Kept existing:          {}\n", summary.kept_existing.len()));
        output.push_str(&format!("Failed:                 {}\n", summary.failed.len()));

        if !summary.failed.is_empty() {
            output.push_str("\nFailures:\n");
            for (i, failure) in summary.failed.iter().enumerate() {
                let connector = if i == summary.failed.len() - 1 {
                    "\u{2514}"
                } else {
                    "\u{251C}"
                };
                output.push_str(&format!(
                    "{}\u{2500} {} ({}): {}\n",
                    connector, failure.repo_url, failure.while_trying_to, failure.message
                ));
            }
        }

        if !summary.timings.is_empty() {
            output.push_str("\nExtractor timings:\n");
            for (name, timing) in summary.timings.iter() {
                output.push_str(&format!(
                    "  {:<16} {:>6} runs {:>8}ms\n",
                    name, timing.count, timing.total_ms
                ));
            }
        }

        output
    }
}
