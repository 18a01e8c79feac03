use std::fmt;

use anyhow::{anyhow, Context, Result};
use semver::Version;
use serde::{Deserialize, Serialize};

pub fn parse_version(input: &str) -> Result<Version> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(anyhow!("version must not be empty"));
    }

    let (core, suffix) = match trimmed.find(|ch| ch == '-' || ch == '+') {
        Some(index) => trimmed.split_at(index),
        None => (trimmed, ""),
    };

    let parts: Vec<&str> = core.split('.').collect();
    if parts.len() > 3 {
        anyhow::bail!("version '{input}' has more than three numeric components");
    }

    let mut numbers = [0_u64; 3];
    for (slot, part) in numbers.iter_mut().zip(&parts) {
        *slot = part
            .parse()
            .with_context(|| format!("invalid version '{input}'"))?;
    }

    if suffix.is_empty() {
        return Ok(Version::new(numbers[0], numbers[1], numbers[2]));
    }
    Version::parse(&format!(
        "{}.{}.{}{suffix}",
        numbers[0], numbers[1], numbers[2]
    ))
    .with_context(|| format!("invalid version '{input}'"))
}

/// Inclusive version interval; a missing bound is unbounded.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VersionRange {
    #[serde(
        default,
        with = "serde_opt_version",
        skip_serializing_if = "Option::is_none"
    )]
    pub min: Option<Version>,
    #[serde(
        default,
        with = "serde_opt_version",
        skip_serializing_if = "Option::is_none"
    )]
    pub max: Option<Version>,
}

impl VersionRange {
    pub fn new(min: Option<Version>, max: Option<Version>) -> Self {
        Self { min, max }
    }

    pub fn unbounded() -> Self {
        Self::default()
    }

    pub fn exact(version: Version) -> Self {
        Self {
            min: Some(version.clone()),
            max: Some(version),
        }
    }

    pub fn between(min: Version, max: Version) -> Self {
        Self {
            min: Some(min),
            max: Some(max),
        }
    }

    pub fn parse(min: Option<&str>, max: Option<&str>) -> Result<Self> {
        let range = Self {
            min: min.map(parse_version).transpose()?,
            max: max.map(parse_version).transpose()?,
        };
        range.validate()?;
        Ok(range)
    }

    pub fn is_unbounded(&self) -> bool {
        self.min.is_none() && self.max.is_none()
    }

    pub fn contains(&self, version: &Version) -> bool {
        let above_min = self.min.as_ref().map_or(true, |min| version >= min);
        let below_max = self.max.as_ref().map_or(true, |max| version <= max);
        above_min && below_max
    }

    pub fn validate(&self) -> Result<()> {
        if let (Some(min), Some(max)) = (&self.min, &self.max) {
            if min > max {
                anyhow::bail!("version range lower bound {min} is above upper bound {max}");
            }
        }
        Ok(())
    }
}

impl fmt::Display for VersionRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let bound = |value: &Option<Version>| {
            value
                .as_ref()
                .map(ToString::to_string)
                .unwrap_or_else(|| "*".to_string())
        };
        write!(f, "[{}, {}]", bound(&self.min), bound(&self.max))
    }
}

pub mod serde_version {
    use semver::Version;
    use serde::{de::Error, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(version: &Version, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(version)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Version, D::Error> {
        let raw = String::deserialize(deserializer)?;
        super::parse_version(&raw).map_err(|err| D::Error::custom(format!("{err:#}")))
    }
}

pub mod serde_opt_version {
    use semver::Version;
    use serde::{de::Error, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(
        version: &Option<Version>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match version {
            Some(version) => serializer.collect_str(version),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<Version>, D::Error> {
        let raw = Option::<String>::deserialize(deserializer)?;
        raw.map(|raw| super::parse_version(&raw))
            .transpose()
            .map_err(|err| D::Error::custom(format!("{err:#}")))
    }
}
