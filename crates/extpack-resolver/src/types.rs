use std::fmt;

use extpack_core::{ExtensionMetadata, LibDependency};
use semver::Version;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct ExtensionRef {
    pub id: String,
    pub version: Version,
}

impl ExtensionRef {
    pub fn of(metadata: &ExtensionMetadata) -> Self {
        Self {
            id: metadata.id.clone(),
            version: metadata.version.clone(),
        }
    }
}

impl fmt::Display for ExtensionRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.id, self.version)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExtensionNode {
    pub extension_id: String,
    pub new_version: Version,
    pub old_version: Option<Version>,
}

impl ExtensionNode {
    pub fn install(extension_id: impl Into<String>, new_version: Version) -> Self {
        Self {
            extension_id: extension_id.into(),
            new_version,
            old_version: None,
        }
    }

    pub fn replace(
        extension_id: impl Into<String>,
        new_version: Version,
        old_version: Version,
    ) -> Self {
        Self {
            extension_id: extension_id.into(),
            new_version,
            old_version: Some(old_version),
        }
    }

    pub fn is_replace(&self) -> bool {
        self.old_version.is_some()
    }
}

impl fmt::Display for ExtensionNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.old_version {
            Some(old) => write!(
                f,
                "replace {} {} -> {}",
                self.extension_id, old, self.new_version
            ),
            None => write!(f, "install {}@{}", self.extension_id, self.new_version),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TrackableLibDependency {
    pub lib: LibDependency,
    pub declared_by: String,
}

impl TrackableLibDependency {
    pub fn new(lib: LibDependency, declared_by: impl Into<String>) -> Self {
        Self {
            lib,
            declared_by: declared_by.into(),
        }
    }
}

impl fmt::Display for TrackableLibDependency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} (declared by '{}')",
            self.lib.version, self.lib.range, self.declared_by
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LibChoice {
    pub lib_id: String,
    pub conflict: bool,
    pub declarations: Vec<TrackableLibDependency>,
}

impl fmt::Display for LibChoice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let declarations = self
            .declarations
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(", ");
        write!(f, "{}: {}", self.lib_id, declarations)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DependencyPath {
    pub nodes: Vec<ExtensionNode>,
    pub lib_choices: Vec<LibChoice>,
    pub install_order: Vec<String>,
}

impl DependencyPath {
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn node(&self, extension_id: &str) -> Option<&ExtensionNode> {
        self.nodes
            .iter()
            .find(|node| node.extension_id == extension_id)
    }

    pub fn replacements(&self) -> impl Iterator<Item = &ExtensionNode> {
        self.nodes.iter().filter(|node| node.is_replace())
    }

    pub fn has_lib_conflicts(&self) -> bool {
        self.lib_choices.iter().any(|choice| choice.conflict)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolverConfig {
    pub platform_version: Version,
    pub ignore_lib_conflicts: bool,
    pub max_visits: Option<usize>,
}

impl ResolverConfig {
    pub fn new(platform_version: Version) -> Self {
        Self {
            platform_version,
            ignore_lib_conflicts: false,
            max_visits: None,
        }
    }

    pub fn with_ignore_lib_conflicts(mut self, ignore: bool) -> Self {
        self.ignore_lib_conflicts = ignore;
        self
    }

    pub fn with_max_visits(mut self, max_visits: Option<usize>) -> Self {
        self.max_visits = max_visits;
        self
    }
}
