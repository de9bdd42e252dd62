use std::fmt;
use std::str::FromStr;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ReportFormat {
    Tsv,
    Json,
}

impl ReportFormat {
    pub fn extension(self) -> &'static str {
        match self {
            ReportFormat::Tsv => "tsv",
            ReportFormat::Json => "json",
        }
    }
}

impl fmt::Display for ReportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.extension())
    }
}

/// A FlyBase curie such as `FBgn0000490`. Accepts an optional `FB:` prefix,
/// as found in Alliance files.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct FlyBaseId(String);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidFlyBaseId(pub String);

impl fmt::Display for InvalidFlyBaseId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid FlyBase id: {}", self.0)
    }
}

impl std::error::Error for InvalidFlyBaseId {}

impl FlyBaseId {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The two-letter type code, e.g. `gn` for genes, `al` for alleles.
    pub fn kind(&self) -> &str {
        &self.0[2..4]
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for FlyBaseId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for FlyBaseId {
    type Err = InvalidFlyBaseId;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let trimmed = value.trim();
        let normalized = trimmed.strip_prefix("FB:").unwrap_or(trimmed);
        let bytes = normalized.as_bytes();
        let digits = bytes.len().saturating_sub(4);
        let is_valid = normalized.starts_with("FB")
            && bytes.len() > 4
            && bytes[2..4].iter().all(|ch| ch.is_ascii_lowercase())
            && (7..=10).contains(&digits)
            && bytes[4..].iter().all(|ch| ch.is_ascii_digit());
        if !is_valid {
            return Err(InvalidFlyBaseId(value.to_string()));
        }
        Ok(Self(normalized.to_string()))
    }
}
