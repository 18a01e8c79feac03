use std::collections::HashSet;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use extpack_core::ExtensionMetadata;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstalledState {
    #[serde(default)]
    pub extensions: Vec<ExtensionMetadata>,
}

impl InstalledState {
    pub fn new(extensions: Vec<ExtensionMetadata>) -> Result<Self> {
        let state = Self { extensions };
        state.validate()?;
        Ok(state)
    }

    pub fn load(path: &Path) -> Result<Self> {
        match fs::read_to_string(path) {
            Ok(content) => Self::from_toml_str(&content)
                .with_context(|| format!("failed parsing installed state: {}", path.display())),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(err) => Err(err)
                .with_context(|| format!("failed reading installed state: {}", path.display())),
        }
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let state: Self = toml::from_str(content).context("invalid installed state document")?;
        state.validate()?;
        Ok(state)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create state dir: {}", parent.display()))?;
        }
        let content = toml::to_string(self).context("failed to serialize installed state")?;
        fs::write(path, content)
            .with_context(|| format!("failed writing installed state: {}", path.display()))
    }

    pub fn get(&self, extension_id: &str) -> Option<&ExtensionMetadata> {
        self.extensions
            .iter()
            .find(|extension| extension.id == extension_id)
    }

    pub fn upsert(&mut self, extension: ExtensionMetadata) {
        self.extensions.retain(|existing| existing.id != extension.id);
        self.extensions.push(extension);
        self.extensions.sort_by(|a, b| a.id.cmp(&b.id));
    }

    pub fn into_extensions(self) -> Vec<ExtensionMetadata> {
        self.extensions
    }

    fn validate(&self) -> Result<()> {
        let mut seen = HashSet::new();
        for extension in &self.extensions {
            extension
                .validate()
                .with_context(|| format!("invalid installed extension '{extension}'"))?;
            if !seen.insert(extension.id.as_str()) {
                anyhow::bail!("extension '{}' is installed more than once", extension.id);
            }
        }
        Ok(())
    }
}
