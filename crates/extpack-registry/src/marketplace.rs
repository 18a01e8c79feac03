use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use extpack_core::{parse_version, ExtensionDependency, ExtensionMetadata, ExtensionProvider};
use reqwest::blocking::Client;
use reqwest::{StatusCode, Url};
use semver::Version;

const USER_AGENT: &str = concat!("extpack/", env!("CARGO_PKG_VERSION"));

#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct ListedVersion {
    pub(crate) version: Version,
    pub(crate) raw: String,
}

// `GET {base}/versions/{id}` answers a JSON array of version strings and
// `GET {base}/manifest/{id}/{version}` the TOML manifest of one version.
// Version lists are cached per id for the lifetime of the provider, and
// manifests are fetched with the version string exactly as listed.
#[derive(Debug)]
pub struct MarketplaceProvider {
    base_url: Url,
    client: Client,
    versions_cache: Mutex<HashMap<String, Vec<ListedVersion>>>,
    messages: Mutex<Vec<String>>,
}

impl MarketplaceProvider {
    pub fn new(base_url: &str) -> Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .connect_timeout(Duration::from_secs(10))
            .timeout(Duration::from_secs(30))
            .build()
            .context("failed to initialize marketplace HTTP client")?;
        Self::with_client(base_url, client)
    }

    pub fn with_client(base_url: &str, client: Client) -> Result<Self> {
        Ok(Self {
            base_url: parse_base_url(base_url)?,
            client,
            versions_cache: Mutex::new(HashMap::new()),
            messages: Mutex::new(Vec::new()),
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn messages(&self) -> Vec<String> {
        self.messages
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn clear_messages(&self) {
        self.messages
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    pub fn versions(&self, extension_id: &str) -> Result<Vec<Version>> {
        Ok(self
            .listed_versions(extension_id)?
            .into_iter()
            .map(|listed| listed.version)
            .collect())
    }

    pub fn manifest(&self, extension_id: &str, listed: &str) -> Result<ExtensionMetadata> {
        let version = parse_version(listed)
            .with_context(|| format!("invalid version '{listed}' for '{extension_id}'"))?;
        let url = manifest_url(&self.base_url, extension_id, listed)?;
        let payload = self
            .get_text(&url)?
            .ok_or_else(|| anyhow!("manifest for {extension_id}@{listed} not found at {url}"))?;
        parse_manifest_payload(&payload, extension_id, &version)
            .with_context(|| format!("failed parsing manifest from {url}"))
    }

    fn listed_versions(&self, extension_id: &str) -> Result<Vec<ListedVersion>> {
        if let Some(cached) = self
            .versions_cache
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(extension_id)
        {
            return Ok(cached.clone());
        }

        let url = versions_url(&self.base_url, extension_id)?;
        let versions = match self.get_text(&url)? {
            Some(payload) => parse_versions_payload(&payload)
                .with_context(|| format!("failed parsing version list from {url}"))?,
            None => Vec::new(),
        };
        tracing::debug!(
            extension = extension_id,
            versions = versions.len(),
            "fetched version list"
        );

        self.versions_cache
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(extension_id.to_string(), versions.clone());
        Ok(versions)
    }

    fn get_text(&self, url: &Url) -> Result<Option<String>> {
        let response = self
            .client
            .get(url.clone())
            .send()
            .with_context(|| format!("failed to request {url}"))?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            anyhow::bail!("request to {url} failed: HTTP {}", status.as_u16());
        }

        response
            .text()
            .map(Some)
            .with_context(|| format!("failed reading response body from {url}"))
    }

    fn push_message(&self, message: String) {
        self.messages
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(message);
    }
}

impl ExtensionProvider for MarketplaceProvider {
    fn dependency_metadata(
        &self,
        dependency: &ExtensionDependency,
    ) -> Result<Vec<ExtensionMetadata>> {
        let listed = self.listed_versions(&dependency.id)?;

        let mut found = Vec::new();
        for ListedVersion { version, raw } in listed
            .iter()
            .filter(|listed| dependency.range.contains(&listed.version))
        {
            match self.manifest(&dependency.id, raw) {
                Ok(manifest) => found.push(manifest),
                Err(err) => {
                    let message = format!("{err:#}");
                    tracing::warn!(
                        extension = %dependency.id,
                        version = %version,
                        error = %message,
                        "skipping unreadable catalog entry"
                    );
                    self.push_message(message);
                }
            }
        }

        found.sort_by(|a, b| b.version.cmp(&a.version));
        Ok(found)
    }
}

pub(crate) fn parse_base_url(raw: &str) -> Result<Url> {
    let url = Url::parse(raw.trim()).with_context(|| format!("invalid marketplace url '{raw}'"))?;
    if url.cannot_be_a_base() || !matches!(url.scheme(), "http" | "https") {
        anyhow::bail!("invalid marketplace url '{raw}': expected an http(s) base url");
    }
    Ok(url)
}

pub(crate) fn versions_url(base: &Url, extension_id: &str) -> Result<Url> {
    endpoint(base, &["versions", extension_id])
}

pub(crate) fn manifest_url(base: &Url, extension_id: &str, listed: &str) -> Result<Url> {
    endpoint(base, &["manifest", extension_id, listed])
}

fn endpoint(base: &Url, segments: &[&str]) -> Result<Url> {
    let mut url = base.clone();
    url.path_segments_mut()
        .map_err(|()| anyhow!("marketplace url '{base}' cannot be a base"))?
        .pop_if_empty()
        .extend(segments);
    Ok(url)
}

pub(crate) fn parse_versions_payload(payload: &str) -> Result<Vec<ListedVersion>> {
    let raw: Vec<String> =
        serde_json::from_str(payload).context("version list must be a JSON array of strings")?;
    let mut versions = raw
        .into_iter()
        .map(|raw| {
            parse_version(&raw).map(|version| ListedVersion {
                version,
                raw: raw.trim().to_string(),
            })
        })
        .collect::<Result<Vec<_>>>()?;
    versions.sort_by(|a, b| b.version.cmp(&a.version));
    versions.dedup_by(|later, earlier| later.version == earlier.version);
    Ok(versions)
}

pub(crate) fn parse_manifest_payload(
    payload: &str,
    extension_id: &str,
    version: &Version,
) -> Result<ExtensionMetadata> {
    let manifest = ExtensionMetadata::from_toml_str(payload)?;
    if manifest.id != extension_id || manifest.version != *version {
        anyhow::bail!("catalog returned {manifest} when asked for {extension_id}@{version}");
    }
    Ok(manifest)
}
