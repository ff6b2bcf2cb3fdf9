use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

/// The categorical fields that together identify one aggregated data point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Dimension {
    Company,
    Project,
    Cohort,
    User,
    Stage,
    VersionTag,
}

impl Dimension {
    /// Destination column order.
    pub const ALL: [Dimension; 6] = [
        Dimension::Company,
        Dimension::Project,
        Dimension::Cohort,
        Dimension::User,
        Dimension::Stage,
        Dimension::VersionTag,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Dimension::Company => "company",
            Dimension::Project => "project",
            Dimension::Cohort => "cohort",
            Dimension::User => "user",
            Dimension::Stage => "stage",
            Dimension::VersionTag => "version_tag",
        }
    }
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Source-side field names for each dimension.
///
/// Every key except the version tag matches the dimension name; the version
/// tag is carried under `java` in the measurement schema this tool was built
/// for, so it is configurable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DimensionKeys {
    pub version_tag: String,
}

impl Default for DimensionKeys {
    fn default() -> Self {
        Self {
            version_tag: "java".to_string(),
        }
    }
}

impl DimensionKeys {
    pub fn new(version_tag: impl Into<String>) -> Self {
        Self {
            version_tag: version_tag.into(),
        }
    }

    pub fn key(&self, dimension: Dimension) -> &str {
        match dimension {
            Dimension::VersionTag => &self.version_tag,
            other => other.as_str(),
        }
    }

    /// Keys in destination column order, as used for the source grouping.
    pub fn group_keys(&self) -> Vec<String> {
        Dimension::ALL
            .iter()
            .map(|d| self.key(*d).to_string())
            .collect()
    }
}

/// What to do with a row whose dimension is absent or null.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MissingDimensionPolicy {
    /// Substitute an empty string, keeping the row.
    #[default]
    Empty,
    /// Reject the row; it is counted as skipped.
    Skip,
}

impl MissingDimensionPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            MissingDimensionPolicy::Empty => "empty",
            MissingDimensionPolicy::Skip => "skip",
        }
    }
}

impl FromStr for MissingDimensionPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "empty" => Ok(MissingDimensionPolicy::Empty),
            "skip" => Ok(MissingDimensionPolicy::Skip),
            other => Err(format!("expected `empty` or `skip`, got `{other}`")),
        }
    }
}
