use anyhow::{anyhow, Context, Result};
use extpack_core::{parse_version, ExtensionDependency, ExtensionMetadata, ExtensionProvider};
use extpack_registry::{CachingProvider, MarketplaceProvider, RegistryIndex};
use semver::Version;

use crate::config::Settings;

const SEARCH_REQUIRES_LOCAL_GUIDANCE: &str =
    "search needs a local registry: pass --registry-root <dir>";

#[derive(Debug)]
pub(crate) enum MetadataBackend {
    Local(RegistryIndex),
    Marketplace(CachingProvider<MarketplaceProvider>),
}

impl MetadataBackend {
    pub(crate) fn search_ids(&self, query: &str) -> Result<Vec<String>> {
        match self {
            Self::Local(index) => index.search_ids(query),
            Self::Marketplace(_) => Err(anyhow!(SEARCH_REQUIRES_LOCAL_GUIDANCE)),
        }
    }

    pub(crate) fn extension_versions(&self, id: &str) -> Result<Vec<Version>> {
        match self {
            Self::Local(index) => Ok(index
                .extension_versions(id)?
                .into_iter()
                .map(|manifest| manifest.version)
                .collect()),
            Self::Marketplace(provider) => provider.inner().versions(id),
        }
    }

    pub(crate) fn catalog_messages(&self) -> Vec<String> {
        match self {
            Self::Local(_) => Vec::new(),
            Self::Marketplace(provider) => provider.inner().messages(),
        }
    }

    pub(crate) fn describe(&self) -> String {
        match self {
            Self::Local(index) => format!("registry {}", index.root().display()),
            Self::Marketplace(provider) => format!("marketplace {}", provider.inner().base_url()),
        }
    }
}

impl ExtensionProvider for MetadataBackend {
    fn dependency_metadata(
        &self,
        dependency: &ExtensionDependency,
    ) -> Result<Vec<ExtensionMetadata>> {
        match self {
            Self::Local(index) => index.dependency_metadata(dependency),
            Self::Marketplace(provider) => provider.dependency_metadata(dependency),
        }
    }
}

pub(crate) fn select_metadata_backend(settings: &Settings) -> Result<MetadataBackend> {
    if let Some(root) = &settings.registry_root {
        return Ok(MetadataBackend::Local(RegistryIndex::open(root)));
    }
    if let Some(url) = &settings.marketplace_url {
        let marketplace = MarketplaceProvider::new(url)?;
        return Ok(MetadataBackend::Marketplace(CachingProvider::new(marketplace)));
    }
    Err(anyhow!(
        "no extension catalog configured: pass --registry-root <dir> or --marketplace-url <url>"
    ))
}

pub(crate) fn parse_resolve_spec(spec: &str) -> Result<(String, Version)> {
    let Some((id, version)) = spec.split_once('@') else {
        return Err(anyhow!(
            "resolve requires an exact version: use '<id>@<version>'"
        ));
    };
    let id = id.trim();
    if id.is_empty() {
        return Err(anyhow!("extension id must not be empty"));
    }
    let version =
        parse_version(version).with_context(|| format!("invalid version for '{id}': {version}"))?;
    Ok((id.to_string(), version))
}
