//! Extractors shipped with the binary

mod dependency;
mod file_count;
mod license;
mod manifest;
mod stack;

pub use dependency::DependencyExtractor;
pub use file_count::FileCountExtractor;
pub use license::LicenseExtractor;
pub use manifest::{ecosystem_for, ManifestExtractor, KNOWN_MANIFESTS};
pub use stack::StackExtractor;

use super::Extractor;

/// The full built-in set, in registration order.
pub fn default_extractors() -> Vec<Extractor> {
    vec![
        Extractor::independent(ManifestExtractor),
        Extractor::independent(DependencyExtractor),
        Extractor::independent(LicenseExtractor),
        Extractor::independent(FileCountExtractor::default()),
        Extractor::consolidating(StackExtractor),
    ]
}

#[cfg(test)]
pub(crate) mod test_support {
    use crate::fs::MockFileSystem;
    use crate::model::RepoIdentity;
    use crate::project::Project;
    use std::path::PathBuf;
    use std::sync::Arc;

    /// A project rooted at `/mock` holding the given files.
    pub fn project_with(files: &[(&str, &str)]) -> Project {
        let fs = MockFileSystem::new();
        for (path, content) in files {
            fs.add_file(path, content);
        }
        Project::new(
            RepoIdentity::new("o", "n", "https://example.com/o/n", "main"),
            PathBuf::from("/mock"),
            Arc::new(fs),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_set_has_one_consolidator() {
        let extractors = default_extractors();
        assert_eq!(extractors.len(), 5);
        assert_eq!(extractors.iter().filter(|e| e.is_consolidating()).count(), 1);
        assert_eq!(extractors[4].name(), "stack");
    }
}
