use extpack_core::{ExtensionDependency, VersionRange};
use semver::Version;
use serde::Serialize;

use crate::types::{ExtensionRef, LibChoice};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, thiserror::Error)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FailReason {
    #[error("cannot resolve extension ('{id}', {version}): catalog returned {matches} matching entries")]
    RootNotFound {
        id: String,
        version: Version,
        matches: usize,
    },

    #[error("extension {extension} is not compatible with platform version {platform_version} (supported {supported})")]
    IncompatiblePlatform {
        extension: ExtensionRef,
        platform_version: Version,
        supported: VersionRange,
    },

    #[error("extension '{id}' is required twice with different versions ({on_path}, {required})")]
    DuplicateVersion {
        id: String,
        on_path: Version,
        required: Version,
    },

    #[error("cannot find a compatible version for dependency {dependency} of {required_by}")]
    MissingDependency {
        required_by: ExtensionRef,
        dependency: ExtensionDependency,
    },

    #[error("replacing installed extension with {replacement} would break {broken} and no compatible version of it exists")]
    BrokenDependency {
        replacement: ExtensionRef,
        broken: ExtensionRef,
    },

    #[error("library dependency incompatibility for lib id '{lib_id}' declared by {extension}")]
    LibIncompatible {
        lib_id: String,
        extension: ExtensionRef,
    },

    #[error("library dependency incompatibility for lib id '{}': {}", .choice.lib_id, .choice)]
    LibConflict { choice: LibChoice },

    #[error("catalog lookup for {dependency} failed: {message}")]
    ProviderFailure {
        dependency: ExtensionDependency,
        message: String,
    },

    #[error("search stopped after {limit} visits; results may be incomplete")]
    SearchLimitReached { limit: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum FailKind {
    RootNotFound,
    IncompatiblePlatform,
    DuplicateVersion,
    MissingDependency,
    BrokenDependency,
    LibIncompatible,
    LibConflict,
    ProviderFailure,
    SearchLimitReached,
}

impl FailReason {
    pub fn kind(&self) -> FailKind {
        match self {
            Self::RootNotFound { .. } => FailKind::RootNotFound,
            Self::IncompatiblePlatform { .. } => FailKind::IncompatiblePlatform,
            Self::DuplicateVersion { .. } => FailKind::DuplicateVersion,
            Self::MissingDependency { .. } => FailKind::MissingDependency,
            Self::BrokenDependency { .. } => FailKind::BrokenDependency,
            Self::LibIncompatible { .. } => FailKind::LibIncompatible,
            Self::LibConflict { .. } => FailKind::LibConflict,
            Self::ProviderFailure { .. } => FailKind::ProviderFailure,
            Self::SearchLimitReached { .. } => FailKind::SearchLimitReached,
        }
    }

    pub fn lib_id(&self) -> Option<&str> {
        match self {
            Self::LibIncompatible { lib_id, .. } => Some(lib_id),
            Self::LibConflict { choice } => Some(&choice.lib_id),
            _ => None,
        }
    }
}
