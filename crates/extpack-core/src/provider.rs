use anyhow::Result;

use crate::manifest::{ExtensionDependency, ExtensionMetadata};

/// Source of candidate extension versions.
///
/// Implementations return every known version of `dependency.id` that lies in
/// `dependency.range`. An empty list means "no candidates"; callers treat an
/// error the same way after reporting it.
pub trait ExtensionProvider {
    fn dependency_metadata(&self, dependency: &ExtensionDependency)
        -> Result<Vec<ExtensionMetadata>>;
}

impl<F> ExtensionProvider for F
where
    F: Fn(&ExtensionDependency) -> Result<Vec<ExtensionMetadata>>,
{
    fn dependency_metadata(
        &self,
        dependency: &ExtensionDependency,
    ) -> Result<Vec<ExtensionMetadata>> {
        self(dependency)
    }
}

pub fn select_matching(
    versions: &[ExtensionMetadata],
    dependency: &ExtensionDependency,
) -> Vec<ExtensionMetadata> {
    let mut matched: Vec<ExtensionMetadata> = versions
        .iter()
        .filter(|metadata| metadata.id == dependency.id)
        .filter(|metadata| dependency.range.contains(&metadata.version))
        .cloned()
        .collect();
    matched.sort_by(|a, b| b.version.cmp(&a.version));
    matched
}
