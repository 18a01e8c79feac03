use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use extpack_core::{select_matching, ExtensionDependency, ExtensionMetadata, ExtensionProvider};

#[derive(Debug, Clone)]
pub struct RegistryIndex {
    root: PathBuf,
}

impl RegistryIndex {
    pub fn open(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn search_ids(&self, needle: &str) -> Result<Vec<String>> {
        let index_root = self.root.join("index");
        if !index_root.exists() {
            return Ok(Vec::new());
        }

        let mut ids = Vec::new();
        for entry in fs::read_dir(&index_root).context("failed to read registry index")? {
            let entry = entry?;
            if entry.file_type()?.is_dir() {
                let id = entry.file_name().to_string_lossy().to_string();
                if id.contains(needle) && !self.extension_versions(&id)?.is_empty() {
                    ids.push(id);
                }
            }
        }

        ids.sort();
        Ok(ids)
    }

    pub fn extension_versions(&self, extension_id: &str) -> Result<Vec<ExtensionMetadata>> {
        validate_index_id(extension_id)?;
        let extension_dir = self.root.join("index").join(extension_id);
        if !extension_dir.exists() {
            return Ok(Vec::new());
        }

        let mut manifests = Vec::new();
        for entry in fs::read_dir(&extension_dir)
            .with_context(|| format!("failed to read extension directory: {extension_id}"))?
        {
            let entry = entry?;
            if !entry.file_type()?.is_file() {
                continue;
            }

            let path = entry.path();
            if path.extension().and_then(|v| v.to_str()) != Some("toml") {
                continue;
            }

            let content = fs::read_to_string(&path)
                .with_context(|| format!("failed reading manifest: {}", path.display()))?;
            let manifest = ExtensionMetadata::from_toml_str(&content)
                .with_context(|| format!("failed parsing manifest: {}", path.display()))?;
            if manifest.id != extension_id {
                anyhow::bail!(
                    "manifest {} declares extension '{}' but is stored under '{}'",
                    path.display(),
                    manifest.id,
                    extension_id
                );
            }
            manifests.push(manifest);
        }

        manifests.sort_by(|a, b| b.version.cmp(&a.version));
        Ok(manifests)
    }
}

impl ExtensionProvider for RegistryIndex {
    fn dependency_metadata(
        &self,
        dependency: &ExtensionDependency,
    ) -> Result<Vec<ExtensionMetadata>> {
        let versions = self.extension_versions(&dependency.id)?;
        Ok(select_matching(&versions, dependency))
    }
}

fn validate_index_id(extension_id: &str) -> Result<()> {
    let is_path_like = extension_id.is_empty()
        || extension_id == "."
        || extension_id == ".."
        || extension_id.contains(['/', '\\']);
    if is_path_like {
        anyhow::bail!("invalid extension id for registry lookup: '{extension_id}'");
    }
    Ok(())
}
