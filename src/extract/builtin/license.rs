use crate::extract::IndependentExtractor;
use crate::model::Fingerprint;
use crate::project::Project;
use anyhow::Result;
use async_trait::async_trait;
use serde_json::json;

const LICENSE_FILES: &[&str] = &[
    "LICENSE",
    "LICENSE.md",
    "LICENSE.txt",
    "LICENCE",
    "LICENCE.md",
    "COPYING",
    "UNLICENSE",
];

/// Best-effort SPDX id from license text
fn guess_spdx(text: &str) -> &'static str {
    let lower = text.to_lowercase();
    if lower.contains("apache license") && lower.contains("version 2.0") {
        "Apache-2.0"
    } else if lower.contains("mit license") || lower.contains("permission is hereby granted, free of charge") {
        "MIT"
    } else if lower.contains("gnu lesser general public license") {
        "LGPL"
    } else if lower.contains("gnu affero general public license") {
        "AGPL-3.0"
    } else if lower.contains("gnu general public license") {
        if lower.contains("version 3") {
            "GPL-3.0"
        } else {
            "GPL-2.0"
        }
    } else if lower.contains("mozilla public license") {
        "MPL-2.0"
    } else if lower.contains("this is free and unencumbered software") {
        "Unlicense"
    } else if lower.contains("redistribution and use in source and binary forms") {
        if lower.contains("neither the name") {
            "BSD-3-Clause"
        } else {
            "BSD-2-Clause"
        }
    } else {
        "unknown"
    }
}

/// Emits a single `license` fingerprint; name `none` when no license file
/// exists at the root.
pub struct LicenseExtractor;

#[async_trait]
impl IndependentExtractor for LicenseExtractor {
    fn name(&self) -> &str {
        "license"
    }

    async fn extract(&self, project: &Project) -> Result<Vec<Fingerprint>> {
        let Some(file) = LICENSE_FILES.iter().find(|f| project.has_file(f)) else {
            return Ok(vec![Fingerprint::new(
                "license",
                "none",
                json!({ "file": null, "spdx": null }),
            )]);
        };

        let spdx = guess_spdx(&project.read_file(file)?);
        Ok(vec![Fingerprint::new(
            "license",
            spdx,
            json!({ "file": file, "spdx": spdx }),
        )])
    }
}
