use std::collections::HashSet;
use std::fmt;

use anyhow::{anyhow, Context};
use semver::Version;
use serde::{Deserialize, Serialize};

use crate::version::{serde_version, VersionRange};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct ExtensionDependency {
    pub id: String,
    #[serde(flatten)]
    pub range: VersionRange,
}

impl ExtensionDependency {
    pub fn new(id: impl Into<String>, range: VersionRange) -> Self {
        Self {
            id: id.into(),
            range,
        }
    }

    pub fn exact(id: impl Into<String>, version: Version) -> Self {
        Self::new(id, VersionRange::exact(version))
    }

    pub fn unbounded(id: impl Into<String>) -> Self {
        Self::new(id, VersionRange::unbounded())
    }
}

impl fmt::Display for ExtensionDependency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.id, self.range)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct LibDependency {
    pub id: String,
    #[serde(with = "serde_version")]
    pub version: Version,
    #[serde(flatten)]
    pub range: VersionRange,
}

impl LibDependency {
    pub fn new(id: impl Into<String>, version: Version, range: VersionRange) -> Self {
        Self {
            id: id.into(),
            version,
            range,
        }
    }
}

impl fmt::Display for LibDependency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.id, self.version, self.range)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ExtensionMetadata {
    pub id: String,
    #[serde(with = "serde_version")]
    pub version: Version,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub platform: Option<VersionRange>,
    #[serde(default, rename = "dependencies")]
    pub extension_dependencies: Vec<ExtensionDependency>,
    #[serde(default, rename = "libs")]
    pub lib_dependencies: Vec<LibDependency>,
}

impl ExtensionMetadata {
    pub fn new(id: impl Into<String>, version: Version) -> Self {
        Self {
            id: id.into(),
            version,
            platform: None,
            extension_dependencies: Vec::new(),
            lib_dependencies: Vec::new(),
        }
    }

    pub fn with_platform(mut self, range: VersionRange) -> Self {
        self.platform = Some(range);
        self
    }

    pub fn with_dependency(mut self, dependency: ExtensionDependency) -> Self {
        self.extension_dependencies.push(dependency);
        self
    }

    pub fn with_lib(mut self, lib: LibDependency) -> Self {
        self.lib_dependencies.push(lib);
        self
    }

    pub fn is_same(&self, other: &ExtensionMetadata) -> bool {
        self.id == other.id && self.version == other.version
    }

    pub fn dependency_on(&self, id: &str) -> Option<&ExtensionDependency> {
        self.extension_dependencies
            .iter()
            .find(|dependency| dependency.id == id)
    }

    pub fn supports_platform(&self, platform_version: &Version) -> bool {
        self.platform
            .as_ref()
            .map_or(true, |range| range.contains(platform_version))
    }

    pub fn from_toml_str(input: &str) -> anyhow::Result<Self> {
        let metadata: Self =
            toml::from_str(input).context("failed to parse extension manifest")?;
        metadata.validate()?;
        Ok(metadata)
    }

    pub fn to_toml_string(&self) -> anyhow::Result<String> {
        toml::to_string(self)
            .with_context(|| format!("failed to serialize extension manifest '{self}'"))
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.id.trim().is_empty() {
            return Err(anyhow!("extension id must not be empty"));
        }
        if let Some(platform) = &self.platform {
            platform
                .validate()
                .with_context(|| format!("invalid platform range for extension '{self}'"))?;
        }

        let mut seen_dependencies = HashSet::new();
        for dependency in &self.extension_dependencies {
            if dependency.id == self.id {
                return Err(anyhow!("extension '{}' depends on itself", self.id));
            }
            if !seen_dependencies.insert(dependency.id.as_str()) {
                return Err(anyhow!(
                    "duplicate dependency '{}' declared by extension '{self}'",
                    dependency.id
                ));
            }
            dependency.range.validate().with_context(|| {
                format!(
                    "invalid range for dependency '{}' of extension '{self}'",
                    dependency.id
                )
            })?;
        }

        let mut seen_libs = HashSet::new();
        for lib in &self.lib_dependencies {
            if !seen_libs.insert(lib.id.as_str()) {
                return Err(anyhow!(
                    "duplicate library '{}' declared by extension '{self}'",
                    lib.id
                ));
            }
            lib.range.validate().with_context(|| {
                format!("invalid range for library '{}' of extension '{self}'", lib.id)
            })?;
            if !lib.range.contains(&lib.version) {
                return Err(anyhow!(
                    "library '{}' of extension '{self}' ships version {} outside its own range {}",
                    lib.id,
                    lib.version,
                    lib.range
                ));
            }
        }

        Ok(())
    }
}

impl fmt::Display for ExtensionMetadata {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.id, self.version)
    }
}
