mod manifest;
mod provider;
pub mod version;

pub use manifest::{ExtensionDependency, ExtensionMetadata, LibDependency};
pub use provider::{select_matching, ExtensionProvider};
pub use version::{parse_version, VersionRange};
