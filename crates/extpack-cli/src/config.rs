use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use extpack_core::parse_version;
use semver::Version;
use serde::Deserialize;

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct PrefixLayout {
    prefix: PathBuf,
}

impl PrefixLayout {
    pub(crate) fn new(prefix: impl Into<PathBuf>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    pub(crate) fn prefix(&self) -> &Path {
        &self.prefix
    }

    pub(crate) fn state_dir(&self) -> PathBuf {
        self.prefix.join("state")
    }

    pub(crate) fn installed_state_path(&self) -> PathBuf {
        self.state_dir().join("installed.toml")
    }

    pub(crate) fn config_path(&self) -> PathBuf {
        self.prefix.join("config.toml")
    }
}

pub(crate) fn default_user_prefix() -> Result<PathBuf> {
    if cfg!(windows) {
        let app_data = std::env::var("LOCALAPPDATA")
            .context("LOCALAPPDATA is not set; cannot resolve Windows user prefix")?;
        return Ok(PathBuf::from(app_data).join("Extpack"));
    }

    let home = std::env::var("HOME").context("HOME is not set; cannot resolve user prefix")?;
    Ok(PathBuf::from(home).join(".extpack"))
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct ConfigFile {
    pub(crate) platform_version: Option<String>,
    pub(crate) marketplace_url: Option<String>,
    pub(crate) ignore_lib_conflicts: Option<bool>,
    pub(crate) max_visits: Option<usize>,
}

impl ConfigFile {
    pub(crate) fn load(path: &Path) -> Result<Self> {
        match fs::read_to_string(path) {
            Ok(content) => toml::from_str(&content)
                .with_context(|| format!("failed parsing config file: {}", path.display())),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(err) => {
                Err(err).with_context(|| format!("failed reading config file: {}", path.display()))
            }
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct CliOverrides {
    pub(crate) registry_root: Option<PathBuf>,
    pub(crate) marketplace_url: Option<String>,
    pub(crate) platform_version: Option<String>,
    pub(crate) ignore_lib_conflicts: Option<bool>,
    pub(crate) max_visits: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Settings {
    pub(crate) registry_root: Option<PathBuf>,
    pub(crate) marketplace_url: Option<String>,
    pub(crate) platform_version: Option<String>,
    pub(crate) ignore_lib_conflicts: bool,
    pub(crate) max_visits: Option<usize>,
}

impl Settings {
    pub(crate) fn merge(overrides: CliOverrides, file: ConfigFile) -> Self {
        Self {
            registry_root: overrides.registry_root,
            marketplace_url: overrides.marketplace_url.or(file.marketplace_url),
            platform_version: overrides.platform_version.or(file.platform_version),
            ignore_lib_conflicts: overrides
                .ignore_lib_conflicts
                .or(file.ignore_lib_conflicts)
                .unwrap_or(false),
            max_visits: overrides.max_visits.or(file.max_visits),
        }
    }

    pub(crate) fn platform_version(&self, layout: &PrefixLayout) -> Result<Version> {
        let raw = self.platform_version.as_deref().ok_or_else(|| {
            anyhow!(
                "platform version is not configured: pass --platform-version, set EXTPACK_PLATFORM_VERSION, or add platform_version to {}",
                layout.config_path().display()
            )
        })?;
        parse_version(raw).with_context(|| format!("invalid platform version '{raw}'"))
    }
}
